//! Coalesce concurrent callers onto one in-flight future.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};

type Flight<T> = Shared<BoxFuture<'static, T>>;

struct Slot<T: Clone> {
    next_id: u64,
    current: Option<(u64, Flight<T>)>,
}

/// At most one call in flight; concurrent callers share its output.
///
/// The first caller's future is published; everyone arriving before it
/// settles awaits the same [`Shared`] future. The slot is cleared when the
/// future completes, so the next caller starts a fresh call. The lock is
/// never held across an await, and a flight keeps running as long as any
/// caller is still polling it.
pub struct SingleFlight<T: Clone> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                next_id: 0,
                current: None,
            })),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight call, or start one from `start` if none is running.
    pub async fn run<F>(&self, start: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let flight = {
            let mut slot = lock(&self.slot);
            match &slot.current {
                Some((_, flight)) => {
                    tracing::debug!("Joining in-flight call");
                    flight.clone()
                }
                None => {
                    let id = slot.next_id;
                    slot.next_id = slot.next_id.wrapping_add(1);
                    let inner = start();
                    let owner = Arc::clone(&self.slot);
                    let flight = async move {
                        let output = inner.await;
                        let mut slot = lock(&owner);
                        if slot.current.as_ref().is_some_and(|(current, _)| *current == id) {
                            slot.current = None;
                        }
                        output
                    }
                    .boxed()
                    .shared();
                    slot.current = Some((id, flight.clone()));
                    flight
                }
            }
        };
        flight.await
    }

    pub fn is_in_flight(&self) -> bool {
        lock(&self.slot).current.is_some()
    }
}

fn lock<T: Clone>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
