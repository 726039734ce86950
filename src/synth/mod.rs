//! Synthesized keyboard/mouse input
//!
//! Events are dispatched to the OS input queue in atomic batches. Unlike
//! gamepad queries, a failed batch is a hard error for the caller: a
//! partially delivered chord can leave synthesized keys stuck down.

pub mod event;
pub mod keys;
pub mod shadow;

#[cfg(windows)]
pub mod dispatcher;

use thiserror::Error;

pub use event::{InputEvent, MouseButton};
pub use keys::VirtualKey;
pub use shadow::KeyShadow;

#[cfg(windows)]
pub use dispatcher::SendInputDispatcher;

/// Failure to deliver a batch of synthesized input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    /// The OS accepted only part of the batch; synthesized keys may be left
    /// in an inconsistent held state.
    #[error("input batch partially dispatched: {sent} of {expected} events")]
    PartialDispatch { sent: usize, expected: usize },
    /// The OS rejected the batch outright.
    #[error("input batch rejected by the OS")]
    Rejected,
}

/// Sink for synthesized input batches
///
/// Each call delivers the whole slice as one atomic batch or fails.
pub trait InputSink {
    fn send(&mut self, events: &[InputEvent]) -> Result<(), SynthError>;
}
