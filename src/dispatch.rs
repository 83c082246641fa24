//! Fan-out of settled values and progress notes to subscribers.
//!
//! All four channels go through one loop: a subscriber is a tagged
//! [`Subscriber`] and a delivery is a [`Signal`]. The dispatcher never runs
//! while the cell's lock is held.
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::Config;
use crate::fault::{panic_message, CallbackKind, FaultSink, SubscriberFault, SubscriberId};

pub(crate) type DoneFn<D> = Box<dyn FnOnce(&D) + Send>;
pub(crate) type FailFn<F> = Box<dyn FnOnce(&F) + Send>;
pub(crate) type ProgressFn<P> = Arc<dyn Fn(&P) + Send + Sync>;
pub(crate) type AlwaysFn<D, F> = Box<dyn FnOnce(Result<&D, &F>) + Send>;

pub(crate) enum Subscriber<D, F, P> {
    Done(DoneFn<D>),
    Fail(FailFn<F>),
    Progress(ProgressFn<P>),
    Always(AlwaysFn<D, F>),
}

impl<D, F, P> Subscriber<D, F, P> {
    pub(crate) fn kind(&self) -> CallbackKind {
        match self {
            Subscriber::Done(_) => CallbackKind::Done,
            Subscriber::Fail(_) => CallbackKind::Fail,
            Subscriber::Progress(_) => CallbackKind::Progress,
            Subscriber::Always(_) => CallbackKind::Always,
        }
    }
}

pub(crate) struct Entry<D, F, P> {
    pub(crate) id: SubscriberId,
    pub(crate) subscriber: Subscriber<D, F, P>,
}

pub(crate) enum Signal<'a, D, F, P> {
    Resolved(&'a D),
    Rejected(&'a F),
    Progress(&'a P),
}

impl<D, F, P> Clone for Signal<'_, D, F, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D, F, P> Copy for Signal<'_, D, F, P> {}

pub(crate) struct Dispatcher {
    sink: Option<Arc<dyn FaultSink>>,
}

impl Dispatcher {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            sink: config.fault_sink.clone(),
        }
    }

    /// Invoke every entry in order. A panicking entry does not stop the loop.
    pub(crate) fn broadcast<D, F, P, I>(&self, entries: I, signal: Signal<'_, D, F, P>)
    where
        I: IntoIterator<Item = Entry<D, F, P>>,
    {
        for entry in entries {
            self.invoke(entry, signal);
        }
    }

    /// Invoke one entry, isolating a panic raised by it.
    ///
    /// An entry whose channel does not match the signal is dropped without
    /// being called.
    pub(crate) fn invoke<D, F, P>(&self, entry: Entry<D, F, P>, signal: Signal<'_, D, F, P>) {
        let Entry { id, subscriber } = entry;
        let kind = subscriber.kind();
        let result = catch_unwind(AssertUnwindSafe(|| match (subscriber, signal) {
            (Subscriber::Done(cb), Signal::Resolved(value)) => cb(value),
            (Subscriber::Fail(cb), Signal::Rejected(reason)) => cb(reason),
            (Subscriber::Progress(cb), Signal::Progress(note)) => cb(note),
            (Subscriber::Always(cb), Signal::Resolved(value)) => cb(Ok(value)),
            (Subscriber::Always(cb), Signal::Rejected(reason)) => cb(Err(reason)),
            _ => {}
        }));
        if let Err(payload) = result {
            let fault = SubscriberFault::from_panic(kind, id, payload.as_ref());
            self.report(&fault);
        }
    }

    fn report(&self, fault: &SubscriberFault) {
        if let Some(sink) = &self.sink {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sink.on_fault(fault))) {
                tracing::error!(
                    kind = %fault.kind,
                    subscriber = %fault.subscriber,
                    error = %panic_message(payload.as_ref()),
                    "fault sink panicked while handling a subscriber fault"
                );
            }
        }
        tracing::error!(
            kind = %fault.kind,
            subscriber = %fault.subscriber,
            fault = %fault.message,
            "an uncaught panic occurred in a {} callback",
            fault.kind
        );
    }
}
