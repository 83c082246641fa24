//! Subscriber faults and the optional sink they are forwarded to.
//!
//! A fault is a panic raised by a callback while it is being dispatched. It
//! never reaches the caller of `resolve`/`reject`/`notify` or of a
//! registration method; instead it is logged and, when configured, handed to a
//! [`FaultSink`].
use std::any::Any;
use std::fmt;

/// The channel a faulting subscriber was registered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    Done,
    Fail,
    Progress,
    Always,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackKind::Done => "done",
            CallbackKind::Fail => "fail",
            CallbackKind::Progress => "progress",
            CallbackKind::Always => "always",
        };
        f.write_str(name)
    }
}

/// Identifies one subscriber within its promise, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub(crate) u64);

impl SubscriberId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A panic caught while invoking a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} subscriber {subscriber} panicked: {message}")]
pub struct SubscriberFault {
    pub kind: CallbackKind,
    pub subscriber: SubscriberId,
    pub message: String,
}

impl SubscriberFault {
    pub(crate) fn from_panic(
        kind: CallbackKind,
        subscriber: SubscriberId,
        payload: &(dyn Any + Send),
    ) -> Self {
        Self {
            kind,
            subscriber,
            message: panic_message(payload),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Receives every fault raised by a subscriber of the promise it is configured on.
///
/// A sink that panics is itself caught and logged; it is never retried.
///
/// # Examples
///
/// ```
/// use promise_deferred::{Config, Producer, Promise};
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let config = Config::with_fault_sink(move |fault: &promise_deferred::SubscriberFault| {
///     sink.lock().unwrap().push(fault.kind);
/// });
/// let (producer, consumer) = Producer::<i32, (), ()>::with_config(config);
/// consumer.done(|_| panic!("boom"));
/// producer.resolve(1).unwrap();
/// assert_eq!(seen.lock().unwrap().len(), 1);
/// ```
pub trait FaultSink: Send + Sync {
    fn on_fault(&self, fault: &SubscriberFault);
}

impl<T> FaultSink for T
where
    T: Fn(&SubscriberFault) + Send + Sync,
{
    fn on_fault(&self, fault: &SubscriberFault) {
        self(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_fault_display() {
        let fault = SubscriberFault {
            kind: CallbackKind::Always,
            subscriber: SubscriberId(3),
            message: "bad".into(),
        };
        assert_eq!(fault.to_string(), "always subscriber #3 panicked: bad");
    }
}
