// ============================================================================
// Restbucks Orders
// ============================================================================
//
// - domain       - Order lifecycle and User aggregates
// - persistence  - repositories (in-memory, PostgreSQL)
// - api          - actix-web REST layer
// - metrics      - Prometheus counters
// - config       - environment configuration
//
// ============================================================================

pub mod api;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod persistence;
