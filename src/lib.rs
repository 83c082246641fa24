//! A thread-safe deferred: a promise that is pending, resolved or rejected,
//! that can report progress while pending, and that accepts `done`, `fail`,
//! `progress` and `always` callbacks before or after it settles.
//!
//! ```
//! use promise_deferred::{Producer, Promise};
//! use std::thread;
//!
//! let (producer, consumer) = Producer::<u32, String, u8>::new();
//! consumer
//!     .progress(|pct| println!("{pct}%"))
//!     .done(|sum| println!("sum = {sum}"))
//!     .fail(|why| println!("failed: {why}"));
//!
//! let worker = thread::spawn(move || {
//!     let mut sum = 0;
//!     for i in 0..100 {
//!         sum += i;
//!         producer.notify(i as u8).unwrap();
//!     }
//!     producer.resolve(sum).unwrap();
//! });
//! worker.join().expect("The worker thread has panicked.");
//! assert!(consumer.is_resolved());
//! ```
use std::fmt;
use std::sync::Arc;

mod cell;
pub mod config;
mod dispatch;
pub mod fault;
pub mod filter;
pub mod native;
pub mod pair;
pub mod waiter;

pub use config::Config;
pub use fault::{CallbackKind, FaultSink, SubscriberFault, SubscriberId};
pub use native::{ForeignPromise, NativePromise};
pub use pair::{Consumer, Producer};
pub use waiter::Settled;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Pending,
    Resolved,
    Rejected,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Pending => "pending",
            State::Resolved => "resolved",
            State::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// The producer operation that was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Resolve,
    Reject,
    Notify,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Resolve => "resolve",
            Action::Reject => "reject",
            Action::Notify => "notify",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("promise already {state}, cannot {action}")]
    AlreadySettled { state: State, action: Action },
}

/// The subscribing side of a deferred.
///
/// Every callback is invoked at most once per event: `done`, `fail` and
/// `always` either right away, on the registering thread, when the promise
/// has already settled, or later by the thread that settles it. Callbacks of
/// one channel run in registration order. A panicking callback is isolated,
/// see [`FaultSink`].
pub trait Promise<D, F, P> {
    fn done(&self, callback: impl FnOnce(&D) + Send + 'static) -> &Self;

    fn fail(&self, callback: impl FnOnce(&F) + Send + 'static) -> &Self;

    /// Progress notes are not replayed: a callback only sees notes emitted
    /// after it was registered.
    fn progress(&self, callback: impl Fn(&P) + Send + Sync + 'static) -> &Self;

    /// Runs once the promise settles, with `Ok` on resolve and `Err` on reject.
    fn always(&self, callback: impl FnOnce(Result<&D, &F>) + Send + 'static) -> &Self;

    fn state(&self) -> State;

    /// The settled value, if any.
    fn outcome(&self) -> Option<Result<Arc<D>, Arc<F>>>;

    /// Settings that promises derived from this one inherit.
    fn config(&self) -> Config;

    fn is_pending(&self) -> bool {
        self.state() == State::Pending
    }

    fn is_resolved(&self) -> bool {
        self.state() == State::Resolved
    }

    fn is_rejected(&self) -> bool {
        self.state() == State::Rejected
    }

    /// Register a `done` and a `fail` callback in one call.
    fn then_callbacks(
        &self,
        done: impl FnOnce(&D) + Send + 'static,
        fail: impl FnOnce(&F) + Send + 'static,
    ) -> &Self {
        self.done(done).fail(fail)
    }

    /// Derive a new promise whose values are produced by the three filters.
    ///
    /// The derived promise is driven only through this promise's callbacks.
    /// If a filter panics the panic is reported like any subscriber fault and
    /// the derived promise stays pending.
    fn then<D2, F2, P2>(
        &self,
        done: impl FnOnce(&D) -> D2 + Send + 'static,
        fail: impl FnOnce(&F) -> F2 + Send + 'static,
        progress: impl Fn(&P) -> P2 + Send + Sync + 'static,
    ) -> Consumer<D2, F2, P2>
    where
        Self: Sized,
        D: 'static,
        F: 'static,
        P: 'static,
        D2: Send + Sync + 'static,
        F2: Send + Sync + 'static,
        P2: 'static,
    {
        filter::derive(self, done, fail, progress)
    }

    fn map<D2>(&self, done: impl FnOnce(&D) -> D2 + Send + 'static) -> Consumer<D2, F, P>
    where
        Self: Sized,
        D: 'static,
        D2: Send + Sync + 'static,
        F: Clone + Send + Sync + 'static,
        P: Clone + 'static,
    {
        self.then(done, F::clone, P::clone)
    }

    fn map_err<F2>(&self, fail: impl FnOnce(&F) -> F2 + Send + 'static) -> Consumer<D, F2, P>
    where
        Self: Sized,
        D: Clone + Send + Sync + 'static,
        F: 'static,
        F2: Send + Sync + 'static,
        P: Clone + 'static,
    {
        self.then(D::clone, fail, P::clone)
    }

    /// A future that completes when this promise settles.
    fn settled(&self) -> Settled<Self, D, F, P>
    where
        Self: Clone + Sized,
    {
        Settled::new(self.clone())
    }
}
