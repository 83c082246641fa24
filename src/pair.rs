use std::fmt;
use std::sync::Arc;

use crate::cell::SettlementCell;
use crate::dispatch::Subscriber;
use crate::{Config, Error, Promise, State};

/// The settling side of a deferred. It may be cloned and moved to other
/// threads; whichever clone settles first wins and the others get
/// [`Error::AlreadySettled`].
///
/// # Examples
///
/// ```
/// use promise_deferred::{Producer, Promise};
/// use std::thread;
/// let (producer, consumer) = Producer::<String, String, ()>::new();
///
/// consumer.done(|value| println!("Received {value:?}"));
/// let task1 = thread::spawn(move || producer.resolve("Hi".into()));
/// task1.join().expect("The task1 thread has panicked.").unwrap();
/// assert!(consumer.is_resolved());
/// ```
pub struct Producer<D, F, P> {
    cell: Arc<SettlementCell<D, F, P>>,
}

/// The subscribing side of a deferred. Cloning it is cheap.
pub struct Consumer<D, F, P> {
    cell: Arc<SettlementCell<D, F, P>>,
}

impl<D, F, P> Producer<D, F, P> {
    pub fn new() -> (Self, Consumer<D, F, P>) {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> (Self, Consumer<D, F, P>) {
        let cell = Arc::new(SettlementCell::new(config));
        (
            Self { cell: cell.clone() },
            Consumer { cell },
        )
    }

    /// Settle with `value`, then run the `done` and afterwards the `always`
    /// callbacks on this thread.
    ///
    /// ```
    /// use promise_deferred::{Action, Error, Producer, State};
    /// let (op, _consumer) = Producer::<i32, (), ()>::new();
    /// op.resolve(1).unwrap();
    /// assert_eq!(
    ///     op.resolve(2),
    ///     Err(Error::AlreadySettled { state: State::Resolved, action: Action::Resolve })
    /// );
    /// ```
    pub fn resolve(&self, value: D) -> Result<(), Error> {
        self.cell.resolve(value)
    }

    /// Settle with `reason`, then run the `fail` and afterwards the `always`
    /// callbacks on this thread.
    pub fn reject(&self, reason: F) -> Result<(), Error> {
        self.cell.reject(reason)
    }

    /// Deliver `note` to the progress callbacks registered so far.
    pub fn notify(&self, note: P) -> Result<(), Error> {
        self.cell.notify(note)
    }

    pub fn consumer(&self) -> Consumer<D, F, P> {
        Consumer {
            cell: self.cell.clone(),
        }
    }
}

impl<D, F, P> Clone for Producer<D, F, P> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<D, F, P> Clone for Consumer<D, F, P> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

macro_rules! impl_promise {
    ($handle:ident) => {
        impl<D, F, P> Promise<D, F, P> for $handle<D, F, P> {
            fn done(&self, callback: impl FnOnce(&D) + Send + 'static) -> &Self {
                self.cell.subscribe(Subscriber::Done(Box::new(callback)));
                self
            }

            fn fail(&self, callback: impl FnOnce(&F) + Send + 'static) -> &Self {
                self.cell.subscribe(Subscriber::Fail(Box::new(callback)));
                self
            }

            fn progress(&self, callback: impl Fn(&P) + Send + Sync + 'static) -> &Self {
                self.cell.subscribe(Subscriber::Progress(Arc::new(callback)));
                self
            }

            fn always(&self, callback: impl FnOnce(Result<&D, &F>) + Send + 'static) -> &Self {
                self.cell.subscribe(Subscriber::Always(Box::new(callback)));
                self
            }

            fn state(&self) -> State {
                self.cell.state()
            }

            fn outcome(&self) -> Option<Result<Arc<D>, Arc<F>>> {
                self.cell.outcome()
            }

            fn config(&self) -> Config {
                self.cell.config().clone()
            }
        }

        impl<D, F, P> fmt::Debug for $handle<D, F, P> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($handle))
                    .field("state", &self.cell.state())
                    .finish()
            }
        }
    };
}

impl_promise!(Producer);
impl_promise!(Consumer);
