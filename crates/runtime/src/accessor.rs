//! A stateful accessor: one instance of the request state machine driving
//! real calls.
//!
//! Each accessor holds at most one in-flight call. What a second
//! [`Accessor::execute`] does while one is pending depends on the
//! accessor's [`Policy`]. Completions of calls that were superseded or reset
//! are discarded by generation, so a stale response never overwrites a newer
//! state.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures_util::future::{AbortHandle, Abortable};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::abort::{AbortController, AbortSignal};
use crate::error::{RequestError, TransitionError};
use crate::machine::transition;
use crate::state::{Event, Progress, RequestState};

/// Debounce window used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// How a second `execute` behaves while a call is pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// Abort the in-flight call and issue the new one immediately.
    #[default]
    Supersede,
    /// Delay issuing by the window; executes inside the window restart it
    /// and only the last one is issued. Executes while a call is in flight
    /// are dropped.
    Debounce(Duration),
}

impl Policy {
    pub const fn debounce_ms(window_ms: u64) -> Self {
        Self::Debounce(Duration::from_millis(window_ms))
    }
}

/// What [`Accessor::execute`] did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The call started.
    Issued,
    /// The call will start when the debounce window closes.
    Scheduled,
    /// Dropped because a call is already in flight.
    Suppressed,
}

/// Handed to each call.
#[derive(Debug)]
pub struct CallContext<T, E> {
    /// Set when the call is superseded or reset.
    pub signal: AbortSignal,
    /// Reports transfer progress into the accessor state.
    pub progress: ProgressReporter<T, E>,
}

/// Forwards progress of one call; reports after the call was superseded are
/// ignored.
pub struct ProgressReporter<T, E> {
    inner: Weak<Inner<T, E>>,
    generation: u64,
}

impl<T, E> fmt::Debug for ProgressReporter<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl<T, E> ProgressReporter<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn report(&self, progress: Progress) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        // The call closure may report before returning its future, while
        // `execute` still holds the slot lock, so only the atomic is read.
        if inner.generation() == self.generation {
            inner.state.send_if_modified(|state| {
                if state.is_pending() {
                    *state = RequestState::Pending {
                        progress: Some(progress),
                    };
                    true
                } else {
                    false
                }
            });
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    in_flight: Option<AbortController>,
    scheduled: Option<AbortHandle>,
}

struct Inner<T, E> {
    policy: Policy,
    slot: Mutex<Slot>,
    /// Bumped under the slot lock; read without it.
    generation: AtomicU64,
    state: watch::Sender<RequestState<T, E>>,
}

impl<T, E> Inner<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate every outstanding call and timer. Caller holds the slot lock.
    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn apply(&self, event: Event<T, E>) -> Result<(), TransitionError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| match transition(state, event) {
            Ok(next) => {
                *state = next;
                true
            }
            Err(error) => {
                outcome = Err(error);
                false
            }
        });
        outcome
    }

    fn issue<F, Fut>(self: &Arc<Self>, slot: &mut Slot, run: F)
    where
        F: FnOnce(CallContext<T, E>) -> Fut,
        Fut: Future<Output = Result<T, RequestError<E>>> + Send + 'static,
    {
        if let Some(previous) = slot.in_flight.take() {
            debug!(generation = self.generation(), "superseding in-flight call");
            previous.abort();
        }
        let generation = self.bump();

        let (controller, registration) = AbortController::new();
        let ctx = CallContext {
            signal: controller.signal(),
            progress: ProgressReporter {
                inner: Arc::downgrade(self),
                generation,
            },
        };
        slot.in_flight = Some(controller);
        // execute is accepted from every state
        self.state
            .send_replace(RequestState::Pending { progress: None });

        let call = Abortable::new(run(ctx), registration);
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let Ok(outcome) = call.await else {
                debug!(generation, "call aborted");
                return;
            };
            inner.settle(generation, outcome);
        });
    }

    fn settle(&self, generation: u64, outcome: Result<T, RequestError<E>>) {
        let mut slot = self.lock();
        if self.generation() != generation {
            debug!(generation, current = self.generation(), "discarding stale completion");
            return;
        }
        slot.in_flight = None;
        let event = match outcome {
            Ok(data) => Event::Succeed(data),
            Err(error) => Event::Fail(error),
        };
        if let Err(error) = self.apply(event) {
            warn!(%error, "discarding completion");
        }
    }
}

/// One independent instance of the request state machine.
///
/// Cloning yields another handle to the same instance.
pub struct Accessor<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for Accessor<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Accessor<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("policy", &self.inner.policy)
            .field("state", &self.inner.state.borrow().kind())
            .finish_non_exhaustive()
    }
}

impl<T, E> Accessor<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// A new instance in `Init`.
    pub fn new(policy: Policy) -> Self {
        let (state, _) = watch::channel(RequestState::Init);
        Self {
            inner: Arc::new(Inner {
                policy,
                slot: Mutex::new(Slot::default()),
                generation: AtomicU64::new(0),
                state,
            }),
        }
    }

    pub fn policy(&self) -> Policy {
        self.inner.policy
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RequestState<T, E> {
        self.inner.state.borrow().clone()
    }

    /// Receives every state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T, E>> {
        self.inner.state.subscribe()
    }

    /// Wait until no call is pending and return the settled state.
    pub async fn settled(&self) -> RequestState<T, E> {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| !state.is_pending()).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.state(),
        }
    }

    /// Run a call under this accessor's policy.
    ///
    /// Must be called from within a tokio runtime; the call runs on a
    /// spawned task.
    pub fn execute<F, Fut>(&self, run: F) -> ExecuteOutcome
    where
        F: FnOnce(CallContext<T, E>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, RequestError<E>>> + Send + 'static,
    {
        let mut slot = self.inner.lock();
        match self.inner.policy {
            Policy::Supersede => {
                if let Some(timer) = slot.scheduled.take() {
                    timer.abort();
                }
                self.inner.issue(&mut slot, run);
                ExecuteOutcome::Issued
            }
            Policy::Debounce(window) => {
                if slot.in_flight.is_some() {
                    debug!("call in flight; execute suppressed");
                    return ExecuteOutcome::Suppressed;
                }
                if let Some(timer) = slot.scheduled.take() {
                    timer.abort();
                }
                let token = self.inner.bump();
                let (handle, registration) = AbortHandle::new_pair();
                slot.scheduled = Some(handle);

                let timer = Abortable::new(tokio::time::sleep(window), registration);
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    if timer.await.is_err() {
                        return;
                    }
                    let mut slot = inner.lock();
                    if inner.generation() != token {
                        return;
                    }
                    slot.scheduled = None;
                    inner.issue(&mut slot, run);
                });
                ExecuteOutcome::Scheduled
            }
        }
    }

    /// Abort any in-flight or scheduled call and return to `Init`.
    pub fn reset(&self) {
        let mut slot = self.inner.lock();
        if let Some(call) = slot.in_flight.take() {
            call.abort();
        }
        if let Some(timer) = slot.scheduled.take() {
            timer.abort();
        }
        self.inner.bump();
        self.inner.state.send_replace(RequestState::Init);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use tokio::time::sleep;

    use super::*;
    use crate::state::StateKind;

    type Pets = Accessor<&'static str, String>;

    #[tokio::test(start_paused = true)]
    async fn test_execute_settles_success_then_reset() {
        let accessor = Pets::new(Policy::Supersede);
        assert_eq!(accessor.state().kind(), StateKind::Init);

        let outcome = accessor.execute(|_| async {
            sleep(Duration::from_millis(10)).await;
            Ok("rex")
        });
        assert_eq!(outcome, ExecuteOutcome::Issued);
        assert!(accessor.state().is_pending());

        assert_eq!(accessor.settled().await, RequestState::Success("rex"));
        accessor.reset();
        assert_eq!(accessor.state(), RequestState::Init);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_kept_distinct() {
        let accessor = Pets::new(Policy::Supersede);
        accessor.execute(|_| async {
            Err(RequestError::Server {
                status: 404,
                payload: "no such pet".to_string(),
            })
        });

        let state = accessor.settled().await;
        assert_eq!(state.error().map(RequestError::kind), Some("server"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_supersede_aborts_previous_call() {
        let accessor = Pets::new(Policy::Supersede);
        let first_finished = Arc::new(AtomicBool::new(false));
        let (signal_tx, signal_rx) = tokio::sync::oneshot::channel();

        let finished = Arc::clone(&first_finished);
        accessor.execute(move |ctx| {
            let _ = signal_tx.send(ctx.signal);
            async move {
                sleep(Duration::from_secs(10)).await;
                finished.store(true, Ordering::SeqCst);
                Ok("stale")
            }
        });

        accessor.execute(|_| async {
            sleep(Duration::from_millis(5)).await;
            Ok("fresh")
        });

        assert_eq!(accessor.settled().await, RequestState::Success("fresh"));
        sleep(Duration::from_secs(20)).await;

        assert!(!first_finished.load(Ordering::SeqCst));
        assert!(signal_rx.await.unwrap().is_aborted());
        assert_eq!(accessor.state(), RequestState::Success("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_executes_in_window() {
        let accessor = Pets::new(Policy::debounce_ms(100));
        let issued = Arc::new(AtomicUsize::new(0));

        for name in ["a", "b", "c"] {
            let issued = Arc::clone(&issued);
            let outcome = accessor.execute(move |_| async move {
                issued.fetch_add(1, Ordering::SeqCst);
                Ok(name)
            });
            assert_eq!(outcome, ExecuteOutcome::Scheduled);
            sleep(Duration::from_millis(40)).await;
        }
        assert_eq!(accessor.state(), RequestState::Init);

        sleep(Duration::from_millis(100)).await;
        assert_eq!(accessor.settled().await, RequestState::Success("c"));
        assert_eq!(issued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_suppresses_while_in_flight() {
        let accessor = Pets::new(Policy::debounce_ms(10));
        accessor.execute(|_| async {
            sleep(Duration::from_millis(500)).await;
            Ok("slow")
        });
        sleep(Duration::from_millis(20)).await;
        assert!(accessor.state().is_pending());

        let outcome = accessor.execute(|_| async { Ok("ignored") });
        assert_eq!(outcome, ExecuteOutcome::Suppressed);
        assert_eq!(accessor.settled().await, RequestState::Success("slow"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_in_flight_completion() {
        let accessor = Pets::new(Policy::Supersede);
        accessor.execute(|_| async {
            sleep(Duration::from_millis(50)).await;
            Ok("late")
        });
        accessor.reset();

        sleep(Duration::from_millis(100)).await;
        assert_eq!(accessor.state(), RequestState::Init);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_updates_pending_state() {
        let accessor = Pets::new(Policy::Supersede);
        let mut rx = accessor.subscribe();
        accessor.execute(|ctx| async move {
            ctx.progress.report(Progress {
                loaded: 512,
                total: Some(1024),
            });
            sleep(Duration::from_millis(10)).await;
            Ok("done")
        });

        let pending = rx
            .wait_for(|state| matches!(state, RequestState::Pending { progress: Some(_) }))
            .await
            .unwrap()
            .clone();
        assert_eq!(
            pending,
            RequestState::Pending {
                progress: Some(Progress {
                    loaded: 512,
                    total: Some(1024)
                })
            }
        );
        assert_eq!(accessor.settled().await, RequestState::Success("done"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_reported_before_the_future_is_built() {
        let accessor = Pets::new(Policy::Supersede);
        let outcome = accessor.execute(|ctx| {
            ctx.progress.report(Progress {
                loaded: 1,
                total: None,
            });
            async { Ok("ready") }
        });

        assert_eq!(outcome, ExecuteOutcome::Issued);
        assert_eq!(
            accessor.state(),
            RequestState::Pending {
                progress: Some(Progress {
                    loaded: 1,
                    total: None
                })
            }
        );
        assert_eq!(accessor.settled().await, RequestState::Success("ready"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_after_debounced_issue_does_not_block() {
        let accessor = Pets::new(Policy::debounce_ms(10));
        accessor.execute(|ctx| {
            ctx.progress.report(Progress {
                loaded: 3,
                total: Some(4),
            });
            async { Ok("late") }
        });

        sleep(Duration::from_millis(20)).await;
        assert_eq!(accessor.settled().await, RequestState::Success("late"));
    }
}
