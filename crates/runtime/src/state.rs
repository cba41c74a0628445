//! Request states and the events that move between them.

use std::fmt;

use crate::error::RequestError;

/// Bytes transferred so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    /// Unknown when the transport sends no length.
    pub total: Option<u64>,
}

/// Lifecycle state of one accessor instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState<T, E> {
    /// Nothing issued, or reset.
    Init,
    /// A call is in flight.
    Pending {
        /// Latest progress report, if the call reports any.
        progress: Option<Progress>,
    },
    /// The last call succeeded.
    Success(T),
    /// The last call failed.
    Error(RequestError<E>),
}

impl<T, E> RequestState<T, E> {
    /// Payload-free name of the state.
    pub const fn kind(&self) -> StateKind {
        match self {
            Self::Init => StateKind::Init,
            Self::Pending { .. } => StateKind::Pending,
            Self::Success(_) => StateKind::Success,
            Self::Error(_) => StateKind::Error,
        }
    }

    /// Whether a call is in flight.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Successful payload, if any.
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Failure, if any.
    pub const fn error(&self) -> Option<&RequestError<E>> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Name of a [`RequestState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Init,
    Pending,
    Success,
    Error,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        })
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T, E> {
    /// Issue a call, or report progress of the one in flight.
    Execute(Option<Progress>),
    Succeed(T),
    Fail(RequestError<E>),
    Reset,
}

impl<T, E> Event<T, E> {
    /// Payload-free name of the event.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Execute(_) => EventKind::Execute,
            Self::Succeed(_) => EventKind::Succeed,
            Self::Fail(_) => EventKind::Fail,
            Self::Reset => EventKind::Reset,
        }
    }
}

/// Name of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Execute,
    Succeed,
    Fail,
    Reset,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Execute => "execute",
            Self::Succeed => "success",
            Self::Fail => "error",
            Self::Reset => "reset",
        })
    }
}
