//! Error type shared by the store, the container and the builder

use thiserror::Error;

/// Errors surfaced by uni-dispatch.
///
/// Misuse errors ([`Error::is_misuse`]) indicate a programming mistake and are
/// reported synchronously. [`Error::ReducerPanicked`] is a runtime failure of
/// the user reducer and stops the container that hit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// `dispatch` was called after the container was disposed or stopped.
    #[error("container is disposed; dispatch is no longer accepted")]
    Disposed,

    /// `start` was called without registering a reducer.
    #[error("no reducer registered before start")]
    MissingReducer,

    /// A reducer was registered more than once.
    #[error("a reducer is already registered; it cannot be replaced")]
    ReducerAlreadySet,

    /// `start` was called outside of a tokio runtime.
    #[error("start must be called from within a tokio runtime")]
    NoRuntime,

    /// The reducer panicked while handling an action. State was left untouched.
    #[error("reducer panicked while handling `{action}`: {message}")]
    ReducerPanicked {
        /// Name of the action being reduced
        action: &'static str,
        /// Panic payload, if it was a string
        message: String,
    },
}

impl Error {
    /// Whether this error signals a programming mistake rather than a runtime condition.
    pub fn is_misuse(&self) -> bool {
        !matches!(self, Error::ReducerPanicked { .. })
    }
}

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
