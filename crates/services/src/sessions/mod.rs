mod coordinator;
mod progress;

// Public API of the session subsystem.
pub use crate::error::CoordinatorError;
pub use coordinator::{ReviewCoordinator, SessionAnswerResult};
pub use progress::SessionProgress;
