// Private module declaration
mod server;

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

use crate::domain::order::{OrderCommand, OrderStatus};

// Re-export for public API
pub use server::{health_handler, metrics_handler};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Counters for:
// - Orders placed and deleted
// - Lifecycle transitions applied / rejected
// - Users created
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_placed: IntCounter,
    pub orders_deleted: IntCounter,
    pub transitions_applied: IntCounterVec,
    pub transitions_rejected: IntCounterVec,
    pub users_created: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_placed = IntCounter::new("orders_placed_total", "Total orders placed")?;
        registry.register(Box::new(orders_placed.clone()))?;

        let orders_deleted = IntCounter::new("orders_deleted_total", "Total orders deleted")?;
        registry.register(Box::new(orders_deleted.clone()))?;

        let transitions_applied = IntCounterVec::new(
            Opts::new("order_transitions_applied_total", "Lifecycle transitions applied"),
            &["command"],
        )?;
        registry.register(Box::new(transitions_applied.clone()))?;

        let transitions_rejected = IntCounterVec::new(
            Opts::new(
                "order_transitions_rejected_total",
                "Lifecycle transitions rejected as out of sequence",
            ),
            &["command", "status"],
        )?;
        registry.register(Box::new(transitions_rejected.clone()))?;

        let users_created = IntCounter::new("users_created_total", "Total users created")?;
        registry.register(Box::new(users_created.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            orders_deleted,
            transitions_applied,
            transitions_rejected,
            users_created,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, command: OrderCommand) {
        self.transitions_applied
            .with_label_values(&[command_label(command)])
            .inc();
    }

    pub fn record_rejected_transition(&self, command: OrderCommand, status: OrderStatus) {
        self.transitions_rejected
            .with_label_values(&[command_label(command), status.as_str()])
            .inc();
    }
}

fn command_label(command: OrderCommand) -> &'static str {
    match command {
        OrderCommand::MarkPaid => "MARK_PAID",
        OrderCommand::MarkInPreparation => "MARK_IN_PREPARATION",
        OrderCommand::MarkPrepared => "MARK_PREPARED",
        OrderCommand::MarkTaken => "MARK_TAKEN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.orders_placed.inc();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_transitions() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transition(OrderCommand::MarkPaid);
        metrics.record_transition(OrderCommand::MarkPaid);
        metrics.record_rejected_transition(OrderCommand::MarkTaken, OrderStatus::Paid);

        assert_eq!(
            metrics.transitions_applied.with_label_values(&["MARK_PAID"]).get(),
            2
        );
        assert_eq!(
            metrics
                .transitions_rejected
                .with_label_values(&["MARK_TAKEN", "PAID"])
                .get(),
            1
        );
    }
}
