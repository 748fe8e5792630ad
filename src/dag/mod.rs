//! DAG intake: event model, ordering buffer and the processor that feeds
//! peer-delivered events into consensus

pub mod buffer;
pub mod event;
pub mod processor;
pub mod semaphore;
pub mod workers;

pub use buffer::{BufferCallbacks, BufferLimit, OrderingBuffer};
pub use event::{Event, EventBuilder, EventError, GasPowerLeft, Payload, PayloadV3};
pub use processor::{Processor, ProcessorCallbacks, ProcessorConfig};
pub use semaphore::{DataSemaphore, Metric};

use crate::validators::ValidatorSet;
use crate::Epoch;

/// Standard parentless check: the event must belong to the current epoch
/// and its creator must be a known validator. Wired into
/// [`ProcessorCallbacks::check_parentless`] by node owners, alongside any
/// application-specific checks.
pub fn check_epoch_and_creator(
    event: &Event,
    current_epoch: Epoch,
    validators: &ValidatorSet,
) -> Result<(), EventError> {
    if event.epoch() != current_epoch {
        return Err(EventError::NotRelevant);
    }
    if !validators.contains(event.creator()) {
        return Err(EventError::Auth);
    }
    Ok(())
}

/// Flow-control and validation errors of the DAG intake path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DagError {
    /// The same event was delivered twice while still buffered
    #[error("duplicated event")]
    DuplicateEvent,

    /// The event is already connected into the DAG
    #[error("event is already connected")]
    AlreadyConnectedEvent,

    /// The event was evicted from the buffer by overflow or lamport
    /// distance
    #[error("event spilled out of the buffer")]
    SpilledEvent,

    /// The semaphore could not be acquired before the deadline
    #[error("processor is busy")]
    Busy,

    /// The processor is shutting down
    #[error("processor is terminated")]
    Terminated,

    /// The event failed validation
    #[error(transparent)]
    Validation(#[from] EventError),
}
