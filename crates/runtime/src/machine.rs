//! The request state machine.
//!
//! ```text
//! Init ──execute──▶ Pending ──success──▶ Success
//!   ▲                │  ▲ └────error───▶ Error
//!   │                └──┘ execute (progress)
//!   └──────reset────── any state
//! ```
//!
//! `execute` is accepted from every state; `success` and `error` only while
//! pending. There is no terminal state.

use crate::error::TransitionError;
use crate::state::{Event, RequestState};

/// Apply `event` to `state`.
pub fn transition<T, E>(
    state: &RequestState<T, E>,
    event: Event<T, E>,
) -> Result<RequestState<T, E>, TransitionError> {
    match (state, event) {
        (_, Event::Execute(progress)) => Ok(RequestState::Pending { progress }),
        (RequestState::Pending { .. }, Event::Succeed(data)) => Ok(RequestState::Success(data)),
        (RequestState::Pending { .. }, Event::Fail(error)) => Ok(RequestState::Error(error)),
        (_, Event::Reset) => Ok(RequestState::Init),
        (state, event) => Err(TransitionError {
            from: state.kind(),
            event: event.kind(),
        }),
    }
}

/// One instance's state plus the transitions it has gone through.
#[derive(Debug, Clone)]
pub struct RequestMachine<T, E> {
    state: RequestState<T, E>,
}

impl<T, E> Default for RequestMachine<T, E> {
    fn default() -> Self {
        Self {
            state: RequestState::Init,
        }
    }
}

impl<T, E> RequestMachine<T, E> {
    /// A machine in `Init`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub const fn state(&self) -> &RequestState<T, E> {
        &self.state
    }

    /// Apply an event; the state is unchanged when it is rejected.
    pub fn apply(&mut self, event: Event<T, E>) -> Result<&RequestState<T, E>, TransitionError> {
        self.state = transition(&self.state, event)?;
        Ok(&self.state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::state::{EventKind, Progress, StateKind};

    type Machine = RequestMachine<u32, String>;

    #[test]
    fn test_lifecycle_visits_expected_states() {
        let mut machine = Machine::new();
        let mut visited = vec![machine.state().kind()];

        visited.push(machine.apply(Event::Execute(None)).unwrap().kind());
        visited.push(machine.apply(Event::Succeed(7)).unwrap().kind());
        visited.push(machine.apply(Event::Reset).unwrap().kind());
        visited.push(machine.apply(Event::Execute(None)).unwrap().kind());
        visited.push(
            machine
                .apply(Event::Fail(RequestError::Transport("offline".into())))
                .unwrap()
                .kind(),
        );

        assert_eq!(
            visited,
            [
                StateKind::Init,
                StateKind::Pending,
                StateKind::Success,
                StateKind::Init,
                StateKind::Pending,
                StateKind::Error,
            ]
        );
    }

    #[test]
    fn test_settled_states_only_accept_execute_and_reset() {
        let settled: [RequestState<u32, String>; 2] = [
            RequestState::Success(1),
            RequestState::Error(RequestError::Validation("bad".into())),
        ];
        for state in settled {
            let from = state.kind();
            assert_eq!(
                transition(&state, Event::Succeed(2)),
                Err(TransitionError {
                    from,
                    event: EventKind::Succeed
                })
            );
            assert!(transition(&state, Event::Fail(RequestError::Transport("x".into()))).is_err());
            assert_eq!(transition(&state, Event::Reset), Ok(RequestState::Init));
            assert!(transition(&state, Event::Execute(None)).unwrap().is_pending());
        }
    }

    #[test]
    fn test_init_rejects_completion() {
        let mut machine = Machine::new();
        let err = machine.apply(Event::Succeed(1)).unwrap_err();
        assert_eq!(err.to_string(), "cannot apply success while init");
        assert_eq!(machine.state(), &RequestState::Init);
    }

    #[test]
    fn test_pending_carries_progress() {
        let mut machine = Machine::new();
        machine.apply(Event::Execute(None)).unwrap();
        let progress = Progress {
            loaded: 10,
            total: Some(100),
        };
        assert_eq!(
            machine.apply(Event::Execute(Some(progress))).unwrap(),
            &RequestState::Pending {
                progress: Some(progress)
            }
        );
    }

    #[test]
    fn test_error_kinds_stay_distinct() {
        let errors: [RequestError<String>; 3] = [
            RequestError::Transport("reset by peer".into()),
            RequestError::Server {
                status: 404,
                payload: "missing".into(),
            },
            RequestError::Validation("name: expected string".into()),
        ];
        let kinds: Vec<_> = errors.iter().map(RequestError::kind).collect();
        assert_eq!(kinds, ["transport", "server", "validation"]);
        assert_eq!(errors[1].to_string(), "server responded with status 404");
    }
}
