//! Bridge from a foreign, callback-based promise into a deferred.
//!
//! The foreign side only has to accept three callbacks. `NativePromise` wires
//! them to `resolve`, `reject` and `notify` of a deferred it owns and exposes
//! that deferred through [`Promise`].
use std::fmt;
use std::sync::Arc;

use crate::{Config, Consumer, Error, Producer, Promise, State};

/// A promise implementation living outside this crate, e.g. one driven by a
/// single-threaded event loop.
pub trait ForeignPromise<D, F, P> {
    fn on_done(&self, callback: Box<dyn FnOnce(D) + Send>);
    fn on_fail(&self, callback: Box<dyn FnOnce(F) + Send>);
    fn on_progress(&self, callback: Box<dyn FnMut(P) + Send>);
}

pub struct NativePromise<T, D, F, P> {
    foreign: T,
    consumer: Consumer<D, F, P>,
}

impl<T, D, F, P> NativePromise<T, D, F, P>
where
    T: ForeignPromise<D, F, P>,
    D: Send + Sync + 'static,
    F: Send + Sync + 'static,
    P: 'static,
{
    pub fn bridge(foreign: T) -> Self {
        Self::bridge_with_config(foreign, Config::default())
    }

    pub fn bridge_with_config(foreign: T, config: Config) -> Self {
        let (producer, consumer) = Producer::with_config(config);
        let notifier = producer.clone();
        let resolver = producer.clone();
        foreign.on_progress(Box::new(move |note: P| relay(notifier.notify(note))));
        foreign.on_done(Box::new(move |value: D| relay(resolver.resolve(value))));
        foreign.on_fail(Box::new(move |reason: F| relay(producer.reject(reason))));
        Self { foreign, consumer }
    }
}

impl<T, D, F, P> NativePromise<T, D, F, P> {
    pub fn foreign(&self) -> &T {
        &self.foreign
    }

    pub fn into_foreign(self) -> T {
        self.foreign
    }
}

fn relay(result: Result<(), Error>) {
    if let Err(err) = result {
        tracing::warn!(error = %err, "foreign promise emitted after settling");
    }
}

impl<T, D, F, P> Promise<D, F, P> for NativePromise<T, D, F, P> {
    fn done(&self, callback: impl FnOnce(&D) + Send + 'static) -> &Self {
        self.consumer.done(callback);
        self
    }

    fn fail(&self, callback: impl FnOnce(&F) + Send + 'static) -> &Self {
        self.consumer.fail(callback);
        self
    }

    fn progress(&self, callback: impl Fn(&P) + Send + Sync + 'static) -> &Self {
        self.consumer.progress(callback);
        self
    }

    fn always(&self, callback: impl FnOnce(Result<&D, &F>) + Send + 'static) -> &Self {
        self.consumer.always(callback);
        self
    }

    fn state(&self) -> State {
        self.consumer.state()
    }

    fn outcome(&self) -> Option<Result<Arc<D>, Arc<F>>> {
        self.consumer.outcome()
    }

    fn config(&self) -> Config {
        self.consumer.config()
    }
}

impl<T: Clone, D, F, P> Clone for NativePromise<T, D, F, P> {
    fn clone(&self) -> Self {
        Self {
            foreign: self.foreign.clone(),
            consumer: self.consumer.clone(),
        }
    }
}

impl<T: fmt::Debug, D, F, P> fmt::Debug for NativePromise<T, D, F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativePromise")
            .field("foreign", &self.foreign)
            .field("state", &self.consumer.state())
            .finish()
    }
}
