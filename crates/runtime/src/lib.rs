//! Async request state machine shared by every generated accessor.
//!
//! Each accessor instance moves through `Init`, `Pending`, `Success` and
//! `Error` (see [`machine`]). An [`Accessor`] drives real calls on tokio
//! tasks under an explicit [`Policy`], and a [`RequestStore`] addresses
//! instances by `(source, operation, instance)`.

pub mod abort;
pub mod accessor;
pub mod error;
pub mod machine;
pub mod state;
pub mod store;

pub use abort::{AbortController, AbortSignal};
pub use accessor::{
    Accessor, CallContext, DEFAULT_DEBOUNCE, ExecuteOutcome, Policy, ProgressReporter,
};
pub use error::{RequestError, TransitionError};
pub use machine::{RequestMachine, transition};
pub use state::{Event, EventKind, Progress, RequestState, StateKind};
pub use store::{AccessorKey, DEFAULT_INSTANCE, RequestStore};
