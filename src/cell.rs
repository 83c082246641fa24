use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::dispatch::{Dispatcher, Entry, ProgressFn, Signal, Subscriber};
use crate::fault::SubscriberId;
use crate::{Action, Error, State};

enum Outcome<D, F> {
    Pending,
    Resolved(Arc<D>),
    Rejected(Arc<F>),
}

impl<D, F> Outcome<D, F> {
    fn state(&self) -> State {
        match self {
            Outcome::Pending => State::Pending,
            Outcome::Resolved(_) => State::Resolved,
            Outcome::Rejected(_) => State::Rejected,
        }
    }

    fn settled(&self) -> Option<Result<Arc<D>, Arc<F>>> {
        match self {
            Outcome::Pending => None,
            Outcome::Resolved(value) => Some(Ok(Arc::clone(value))),
            Outcome::Rejected(reason) => Some(Err(Arc::clone(reason))),
        }
    }
}

struct Inner<D, F, P> {
    outcome: Outcome<D, F>,
    next_id: u64,
    done: Vec<Entry<D, F, P>>,
    fail: Vec<Entry<D, F, P>>,
    always: Vec<Entry<D, F, P>>,
    progress: Vec<(SubscriberId, ProgressFn<P>)>,
}

impl<D, F, P> Inner<D, F, P> {
    fn next_id(&mut self) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, entry: Entry<D, F, P>) {
        match entry.subscriber {
            Subscriber::Progress(cb) => self.progress.push((entry.id, cb)),
            Subscriber::Done(_) => self.done.push(entry),
            Subscriber::Fail(_) => self.fail.push(entry),
            Subscriber::Always(_) => self.always.push(entry),
        }
    }
}

/// Subscribers taken out of a cell as it settles.
struct Drained<D, F, P> {
    channel: Vec<Entry<D, F, P>>,
    always: Vec<Entry<D, F, P>>,
    // Never invoked again; dropped after the lock is released.
    _unused: (Vec<Entry<D, F, P>>, Vec<(SubscriberId, ProgressFn<P>)>),
}

/// State holder shared by every handle of one deferred.
///
/// The lock guards the outcome and all four registries. Settlement closes the
/// done, fail and always registries in the same critical section that flips
/// the state, so a subscriber is either drained by the settling call or sees
/// the outcome and is replayed on registration, never both.
pub(crate) struct SettlementCell<D, F, P> {
    inner: Mutex<Inner<D, F, P>>,
    dispatcher: Dispatcher,
    config: Config,
}

impl<D, F, P> SettlementCell<D, F, P> {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            inner: Mutex::new(Inner {
                outcome: Outcome::Pending,
                next_id: 0,
                done: Vec::new(),
                fail: Vec::new(),
                always: Vec::new(),
                progress: Vec::new(),
            }),
            dispatcher: Dispatcher::new(&config),
            config,
        }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn state(&self) -> State {
        self.inner.lock().outcome.state()
    }

    pub(crate) fn outcome(&self) -> Option<Result<Arc<D>, Arc<F>>> {
        self.inner.lock().outcome.settled()
    }

    pub(crate) fn resolve(&self, value: D) -> Result<(), Error> {
        let value = Arc::new(value);
        let drained = self.settle(Outcome::Resolved(Arc::clone(&value)), Action::Resolve)?;
        tracing::trace!(
            done = drained.channel.len(),
            always = drained.always.len(),
            "promise resolved"
        );
        self.dispatcher
            .broadcast(drained.channel, Signal::Resolved(&*value));
        self.dispatcher
            .broadcast(drained.always, Signal::Resolved(&*value));
        Ok(())
    }

    pub(crate) fn reject(&self, reason: F) -> Result<(), Error> {
        let reason = Arc::new(reason);
        let drained = self.settle(Outcome::Rejected(Arc::clone(&reason)), Action::Reject)?;
        tracing::trace!(
            fail = drained.channel.len(),
            always = drained.always.len(),
            "promise rejected"
        );
        self.dispatcher
            .broadcast(drained.channel, Signal::Rejected(&*reason));
        self.dispatcher
            .broadcast(drained.always, Signal::Rejected(&*reason));
        Ok(())
    }

    fn settle(&self, outcome: Outcome<D, F>, action: Action) -> Result<Drained<D, F, P>, Error> {
        let mut inner = self.inner.lock();
        let state = inner.outcome.state();
        if state != State::Pending {
            return Err(Error::AlreadySettled { state, action });
        }
        let resolved = matches!(outcome, Outcome::Resolved(_));
        inner.outcome = outcome;
        let (done, fail) = (mem::take(&mut inner.done), mem::take(&mut inner.fail));
        let (channel, other) = if resolved { (done, fail) } else { (fail, done) };
        Ok(Drained {
            channel,
            always: mem::take(&mut inner.always),
            _unused: (other, mem::take(&mut inner.progress)),
        })
    }

    pub(crate) fn notify(&self, note: P) -> Result<(), Error> {
        let subscribers: Vec<Entry<D, F, P>> = {
            let inner = self.inner.lock();
            let state = inner.outcome.state();
            if state != State::Pending {
                return Err(Error::AlreadySettled {
                    state,
                    action: Action::Notify,
                });
            }
            inner
                .progress
                .iter()
                .map(|(id, cb)| Entry {
                    id: *id,
                    subscriber: Subscriber::Progress(Arc::clone(cb)),
                })
                .collect()
        };
        tracing::trace!(progress = subscribers.len(), "promise notified");
        self.dispatcher.broadcast(subscribers, Signal::Progress(&note));
        Ok(())
    }

    /// Store `subscriber` while pending, otherwise replay the outcome to it
    /// on the calling thread.
    pub(crate) fn subscribe(&self, subscriber: Subscriber<D, F, P>) -> SubscriberId {
        let (entry, settled) = {
            let mut inner = self.inner.lock();
            let id = inner.next_id();
            let entry = Entry { id, subscriber };
            match inner.outcome.settled() {
                None => {
                    inner.push(entry);
                    return id;
                }
                Some(settled) => (entry, settled),
            }
        };
        let id = entry.id;
        match settled {
            Ok(value) => self.dispatcher.invoke(entry, Signal::Resolved(&*value)),
            Err(reason) => self.dispatcher.invoke(entry, Signal::Rejected(&*reason)),
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let c = Arc::new(AtomicUsize::new(0));
        (c.clone(), c)
    }

    #[test]
    fn test_subscribe_before_and_after_resolve() {
        let cell = SettlementCell::<i32, (), ()>::new(Config::default());
        let (early, e) = counter();
        let (late, l) = counter();
        cell.subscribe(Subscriber::Done(Box::new(move |v: &i32| {
            e.fetch_add(*v as usize, Ordering::SeqCst);
        })));
        cell.resolve(5).unwrap();
        cell.subscribe(Subscriber::Done(Box::new(move |v: &i32| {
            l.fetch_add(*v as usize, Ordering::SeqCst);
        })));
        assert_eq!(early.load(Ordering::SeqCst), 5);
        assert_eq!(late.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_second_settlement_is_refused_and_state_kept() {
        let cell = SettlementCell::<i32, &str, ()>::new(Config::default());
        cell.reject("first").unwrap();
        assert_eq!(
            cell.resolve(1),
            Err(Error::AlreadySettled {
                state: State::Rejected,
                action: Action::Resolve
            })
        );
        assert_eq!(
            cell.notify(()),
            Err(Error::AlreadySettled {
                state: State::Rejected,
                action: Action::Notify
            })
        );
        assert_eq!(cell.state(), State::Rejected);
        assert!(matches!(cell.outcome(), Some(Err(r)) if *r == "first"));
    }

    #[test]
    fn test_registries_are_closed_on_settle() {
        let cell = SettlementCell::<i32, (), u8>::new(Config::default());
        cell.subscribe(Subscriber::Done(Box::new(|_: &i32| {})));
        cell.subscribe(Subscriber::Fail(Box::new(|_: &()| {})));
        cell.subscribe(Subscriber::Progress(Arc::new(|_: &u8| {})));
        cell.resolve(1).unwrap();
        let inner = cell.inner.lock();
        assert!(inner.done.is_empty());
        assert!(inner.fail.is_empty());
        assert!(inner.always.is_empty());
        assert!(inner.progress.is_empty());
        assert_eq!(inner.next_id, 3);
    }

    #[test]
    fn test_subscriber_may_reenter_cell() {
        let cell = Arc::new(SettlementCell::<i32, (), ()>::new(Config::default()));
        let (seen, s) = counter();
        let inner_cell = cell.clone();
        cell.subscribe(Subscriber::Done(Box::new(move |_: &i32| {
            assert_eq!(inner_cell.state(), State::Resolved);
            inner_cell.subscribe(Subscriber::Done(Box::new(move |v: &i32| {
                s.fetch_add(*v as usize, Ordering::SeqCst);
            })));
        })));
        cell.resolve(7).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }
}
