use super::commands::OrderCommand;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// A lifecycle step was requested out of sequence. Retrying the same
    /// call without another step in between fails the same way.
    #[error("Cannot {command} order: required status {required}, current status {actual}")]
    InvalidTransition {
        command: OrderCommand,
        required: OrderStatus,
        actual: OrderStatus,
    },
}
