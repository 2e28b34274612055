// ============================================================================
// User Domain
// ============================================================================
//
// - Aggregate (User, NewUser, UserChanges)
// - Errors (UserError)
//
// ============================================================================

pub mod aggregate;
pub mod errors;

pub use aggregate::*;
pub use errors::*;
