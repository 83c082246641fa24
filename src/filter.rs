//! Promises derived from another promise through value filters.
//!
//! A derived promise has no privileged access to its source: it is an
//! ordinary [`Producer`] driven by `done`, `fail` and `progress` callbacks
//! registered on the source.
use crate::{Consumer, Error, Producer, Promise};

pub(crate) fn derive<S, D, F, P, D2, F2, P2>(
    source: &S,
    done: impl FnOnce(&D) -> D2 + Send + 'static,
    fail: impl FnOnce(&F) -> F2 + Send + 'static,
    progress: impl Fn(&P) -> P2 + Send + Sync + 'static,
) -> Consumer<D2, F2, P2>
where
    S: Promise<D, F, P>,
    D: 'static,
    F: 'static,
    P: 'static,
    D2: Send + Sync + 'static,
    F2: Send + Sync + 'static,
    P2: 'static,
{
    let (producer, consumer) = Producer::with_config(source.config());
    let notifier = producer.clone();
    let resolver = producer.clone();
    source
        .progress(move |note| forward(notifier.notify(progress(note))))
        .done(move |value| forward(resolver.resolve(done(value))))
        .fail(move |reason| forward(producer.reject(fail(reason))));
    consumer
}

fn forward(result: Result<(), Error>) {
    if let Err(err) = result {
        tracing::warn!(error = %err, "derived promise dropped a forwarded event");
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, Producer, Promise, State, SubscriberFault};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_then_transforms_all_three_channels() {
        let (source, consumer) = Producer::<i32, String, u8>::new();
        let derived = consumer.then(|v| v * 2, |e| e.len(), |p| format!("{p}%"));
        let log = Arc::new(Mutex::new(Vec::new()));
        let (progress, done) = (log.clone(), log.clone());
        derived
            .progress(move |p: &String| progress.lock().unwrap().push(p.clone()))
            .done(move |v| done.lock().unwrap().push(v.to_string()));

        source.notify(25).unwrap();
        source.notify(50).unwrap();
        source.resolve(21).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["25%", "50%", "42"]);
        assert_eq!(derived.state(), State::Resolved);
    }

    #[test]
    fn test_map_err_passes_through_rejection() {
        let (source, consumer) = Producer::<i32, &'static str, ()>::new();
        source.reject("bad").unwrap();
        let derived = consumer.map_err(|e| e.to_uppercase());
        assert!(matches!(derived.outcome(), Some(Err(e)) if *e == "BAD"));
    }

    #[test]
    fn test_map_keeps_failure_and_inherits_config() {
        let faults = Arc::new(Mutex::new(0));
        let sink = faults.clone();
        let config = Config::with_fault_sink(move |_: &SubscriberFault| *sink.lock().unwrap() += 1);
        let (source, consumer) = Producer::<i32, String, ()>::with_config(config);
        let derived = consumer.map(|v| v + 1);
        assert!(derived.config().has_fault_sink());
        derived.fail(|_| panic!("derived fail subscriber"));
        source.reject("nope".into()).unwrap();
        assert!(matches!(derived.outcome(), Some(Err(e)) if *e == "nope"));
        assert_eq!(*faults.lock().unwrap(), 1);
    }

    #[test]
    fn test_panicking_filter_leaves_derived_pending() {
        let (source, consumer) = Producer::<i32, (), ()>::new();
        let derived = consumer.map(|_| -> i32 { panic!("filter failed") });
        source.resolve(1).unwrap();
        assert!(derived.is_pending());
    }
}
