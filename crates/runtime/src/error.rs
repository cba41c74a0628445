//! Errors of the request lifecycle.

use thiserror::Error;

use crate::state::{EventKind, StateKind};

/// Why a call failed. The kinds stay distinct so callers can render each
/// one differently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError<E> {
    /// The request never produced a response (network, abort, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server responded with status {status}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Decoded error body.
        payload: E,
    },

    /// The response did not match its schema.
    #[error("validation error: {0}")]
    Validation(String),
}

impl<E> RequestError<E> {
    /// Short name of the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Server { .. } => "server",
            Self::Validation(_) => "validation",
        }
    }
}

/// An event that is not allowed in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {event} while {from}")]
pub struct TransitionError {
    /// State the machine was in.
    pub from: StateKind,
    /// Rejected event.
    pub event: EventKind,
}
