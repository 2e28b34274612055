use std::sync::Arc;
use uuid::Uuid;

use crate::metrics::Metrics;
use crate::persistence::{OrderRepository, RepositoryError};

use super::aggregate::Order;
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::value_objects::{LineItem, Location};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Load → Command → Aggregate → Save
//
// An invalid transition never reaches the repository. A concurrent writer
// that saved first makes the save fail with a version conflict.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order {order_id} is at version {actual}, request expected {expected}")]
    PreconditionFailed {
        order_id: Uuid,
        expected: i64,
        actual: i64,
    },

    #[error(transparent)]
    Domain(#[from] OrderError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Clone)]
pub struct OrderCommandHandler {
    repository: Arc<dyn OrderRepository>,
    metrics: Arc<Metrics>,
}

impl OrderCommandHandler {
    pub fn new(repository: Arc<dyn OrderRepository>, metrics: Arc<Metrics>) -> Self {
        Self { repository, metrics }
    }

    /// Create and persist a new order
    pub async fn place(
        &self,
        line_items: Vec<LineItem>,
        location: Option<Location>,
    ) -> Result<Order, CommandError> {
        let order = self.repository.save(Order::new(line_items, location)).await?;
        self.metrics.orders_placed.inc();

        tracing::info!(
            order_id = ?order.id(),
            location = ?order.location(),
            item_count = order.line_items().len(),
            "Placed new order"
        );

        Ok(order)
    }

    /// Apply a lifecycle command and persist the result
    pub async fn handle(
        &self,
        order_id: Uuid,
        command: OrderCommand,
        expected_version: Option<i64>,
    ) -> Result<Order, CommandError> {
        let mut order = self
            .repository
            .find_by_id(order_id)
            .await?
            .ok_or(CommandError::NotFound(order_id))?;

        if let Some(expected) = expected_version {
            if expected != order.version() {
                return Err(CommandError::PreconditionFailed {
                    order_id,
                    expected,
                    actual: order.version(),
                });
            }
        }

        let previous = order.status();
        if let Err(e) = order.apply(command) {
            self.metrics.record_rejected_transition(command, previous);
            tracing::warn!(
                order_id = %order_id,
                command = %command,
                status = %previous,
                "Rejected lifecycle command"
            );
            return Err(e.into());
        }

        let order = self.repository.save(order).await?;
        self.metrics.record_transition(command);

        tracing::info!(
            order_id = %order_id,
            command = %command,
            from = %previous,
            to = %order.status(),
            version = order.version(),
            "Applied lifecycle command"
        );

        Ok(order)
    }

    /// Delete an order. With an expected version, the stored version is
    /// checked in the same step as the delete.
    pub async fn delete(
        &self,
        order_id: Uuid,
        expected_version: Option<i64>,
    ) -> Result<(), CommandError> {
        let result = match expected_version {
            Some(expected) => self.repository.delete_versioned(order_id, expected).await,
            None => self.repository.delete_by_id(order_id).await,
        };

        result.map_err(|e| match e {
            RepositoryError::NotFound(id) => CommandError::NotFound(id),
            RepositoryError::VersionConflict { expected, actual } => {
                CommandError::PreconditionFailed {
                    order_id,
                    expected,
                    actual,
                }
            }
            other => other.into(),
        })?;
        self.metrics.orders_deleted.inc();

        tracing::info!(order_id = %order_id, "Deleted order");
        Ok(())
    }
}
