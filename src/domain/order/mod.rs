// ============================================================================
// Order Domain - Business Logic for the Order Aggregate
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (LineItem, Location, Milk, Size, OrderStatus)
// - Commands (MarkPaid, MarkInPreparation, MarkPrepared, MarkTaken)
// - Errors (OrderError)
// - Aggregate (Order lifecycle state machine)
// - Command Handler (OrderCommandHandler)
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
