// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory. This layer knows nothing about
// HTTP; persistence is reached only through the repository traits.
//
// ============================================================================

pub mod order;
pub mod user;
