use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::Promise;

/// Future returned by [`Promise::settled`]. Many of them may wait on the
/// same promise.
///
/// # Examples
///
/// ```
/// use promise_deferred::{Producer, Promise};
/// use futures::executor::block_on;
/// use std::thread;
/// let (op, op_a) = Producer::<String, (), ()>::new();
/// let task1 = thread::spawn(move || block_on(op_a.settled()));
/// op.resolve(String::from("🍓")).unwrap();
/// let value = task1.join().expect("The task1 thread has panicked").unwrap();
/// assert_eq!(*value, "🍓");
/// ```
pub struct Settled<T, D, F, P> {
    promise: T,
    waker: Arc<Mutex<Result<Waker, WakerState>>>,
    _marker: PhantomData<fn() -> (D, F, P)>,
}

#[derive(Debug)]
enum WakerState {
    /// No waker stored and no `always` callback registered yet.
    Fresh,
    /// The promise settled.
    Tainted,
}

impl<T, D, F, P> Settled<T, D, F, P> {
    pub(crate) fn new(promise: T) -> Self {
        Self {
            promise,
            waker: Arc::new(Mutex::new(Err(WakerState::Fresh))),
            _marker: PhantomData,
        }
    }
}

impl<T, D, F, P> Future for Settled<T, D, F, P>
where
    T: Promise<D, F, P>,
{
    type Output = Result<Arc<D>, Arc<F>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.promise.outcome() {
            return Poll::Ready(outcome);
        }
        let previous = std::mem::replace(&mut *self.waker.lock(), Ok(cx.waker().clone()));
        match previous {
            Err(WakerState::Fresh) => {
                // Registered outside the slot lock: a settled promise runs the
                // callback right here.
                let slot = Arc::clone(&self.waker);
                self.promise.always(move |_| {
                    if let Ok(waker) = std::mem::replace(&mut *slot.lock(), Err(WakerState::Tainted))
                    {
                        waker.wake()
                    }
                });
                Poll::Pending
            }
            Err(WakerState::Tainted) => self.promise.outcome().map_or(Poll::Pending, Poll::Ready),
            Ok(_) => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Producer, Promise};
    use futures::executor::block_on;
    use std::thread;

    #[test]
    fn test_settled_after_reject() {
        let (op, op_a) = Producer::<(), String, ()>::new();
        let task1 = thread::spawn(move || block_on(op_a.settled()));
        let task2 = thread::spawn(move || op.reject(String::from("reject!!")));
        task2.join().expect("The task2 thread has panicked").unwrap();
        let outcome = task1.join().expect("The task1 thread has panicked");
        assert_eq!(outcome.unwrap_err().as_str(), "reject!!");
    }

    #[test]
    fn test_two_waiters_on_one_promise() {
        let (op, op_a) = Producer::<i32, (), ()>::new();
        let op_b = op_a.clone();
        let task1 = thread::spawn(move || block_on(op_a.settled()));
        let task2 = thread::spawn(move || block_on(op_b.settled()));
        op.resolve(3).unwrap();
        assert_eq!(*task1.join().expect("The task1 thread has panicked").unwrap(), 3);
        assert_eq!(*task2.join().expect("The task2 thread has panicked").unwrap(), 3);
    }

    #[test]
    fn test_settled_already_resolved() {
        let (op, op_a) = Producer::<i32, (), ()>::new();
        op.resolve(9).unwrap();
        assert_eq!(*block_on(op_a.settled()).unwrap(), 9);
    }
}
