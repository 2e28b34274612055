use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::commands::OrderCommand;
use super::errors::OrderError;
use super::value_objects::{LineItem, Location, OrderStatus};

// ============================================================================
// Order Aggregate - Lifecycle State Machine
// ============================================================================
//
// PAYMENT_EXPECTED -> PAID -> PREPARING -> READY -> TAKEN
//
// Location, ordered date and line items are fixed at construction. Status is
// the only field that changes afterwards, and only one step forward at a time.
// Identity and version belong to the repository.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(skip)]
    id: Option<Uuid>,
    #[serde(skip)]
    version: i64,

    #[schema(inline)]
    location: Location,
    #[schema(read_only)]
    ordered_date: DateTime<Utc>,
    #[schema(inline, read_only)]
    status: OrderStatus,
    #[schema(inline)]
    line_items: Vec<LineItem>,
}

impl Order {
    /// Creates an unsaved order. A missing location means take-away.
    pub fn new(line_items: impl IntoIterator<Item = LineItem>, location: Option<Location>) -> Self {
        Self {
            id: None,
            version: 0,
            location: location.unwrap_or_default(),
            // Microsecond precision, as stored by PostgreSQL.
            ordered_date: Utc::now().trunc_subsecs(6),
            status: OrderStatus::PaymentExpected,
            line_items: line_items.into_iter().collect(),
        }
    }

    pub fn with_items(line_items: impl IntoIterator<Item = LineItem>) -> Self {
        Self::new(line_items, None)
    }

    /// Rebuilds an order from storage.
    pub(crate) fn restore(
        id: Uuid,
        version: i64,
        location: Location,
        ordered_date: DateTime<Utc>,
        status: OrderStatus,
        line_items: Vec<LineItem>,
    ) -> Self {
        Self {
            id: Some(id),
            version,
            location,
            ordered_date,
            status,
            line_items,
        }
    }

    pub fn mark_paid(&mut self) -> Result<&mut Self, OrderError> {
        self.transition(OrderCommand::MarkPaid)
    }

    pub fn mark_in_preparation(&mut self) -> Result<&mut Self, OrderError> {
        self.transition(OrderCommand::MarkInPreparation)
    }

    pub fn mark_prepared(&mut self) -> Result<&mut Self, OrderError> {
        self.transition(OrderCommand::MarkPrepared)
    }

    pub fn mark_taken(&mut self) -> Result<&mut Self, OrderError> {
        self.transition(OrderCommand::MarkTaken)
    }

    /// Dispatches a lifecycle command to the matching `mark_*` method.
    pub fn apply(&mut self, command: OrderCommand) -> Result<&mut Self, OrderError> {
        match command {
            OrderCommand::MarkPaid => self.mark_paid(),
            OrderCommand::MarkInPreparation => self.mark_in_preparation(),
            OrderCommand::MarkPrepared => self.mark_prepared(),
            OrderCommand::MarkTaken => self.mark_taken(),
        }
    }

    fn transition(&mut self, command: OrderCommand) -> Result<&mut Self, OrderError> {
        let required = command.required_status();
        if self.status != required {
            return Err(OrderError::InvalidTransition {
                command,
                required,
                actual: self.status,
            });
        }

        self.status = command.target_status();
        Ok(self)
    }

    pub fn is_paid(&self) -> bool {
        self.status != OrderStatus::PaymentExpected
    }

    pub fn is_ready(&self) -> bool {
        self.status == OrderStatus::Ready
    }

    pub fn is_taken(&self) -> bool {
        self.status == OrderStatus::Taken
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn ordered_date(&self) -> DateTime<Utc> {
        self.ordered_date
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub(crate) fn assign_identity(&mut self, id: Uuid, version: i64) {
        self.id = Some(id);
        self.version = version;
    }

    pub(crate) fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Milk, Size};
    use std::num::NonZeroU32;

    fn item(name: &str, quantity: u32) -> LineItem {
        LineItem::new(name, NonZeroU32::new(quantity).unwrap(), Milk::Semi, Size::Large)
    }

    fn order_in(status: OrderStatus) -> Order {
        let mut order = Order::default();
        for command in OrderCommand::ALL {
            if order.status() == status {
                break;
            }
            order.apply(command).unwrap();
        }
        assert_eq!(order.status(), status);
        order
    }

    #[test]
    fn test_default_order() {
        let order = Order::default();

        assert_eq!(order.status(), OrderStatus::PaymentExpected);
        assert_eq!(order.location(), Location::TakeAway);
        assert!(order.line_items().is_empty());
        assert_eq!(order.id(), None);
        assert_eq!(order.version(), 0);
    }

    #[test]
    fn test_missing_location_defaults_to_take_away() {
        let order = Order::new(vec![item("Latte", 1)], None);
        assert_eq!(order.location(), Location::TakeAway);

        let order = Order::new(vec![item("Latte", 1)], Some(Location::InStore));
        assert_eq!(order.location(), Location::InStore);
    }

    #[test]
    fn test_line_items_keep_insertion_order() {
        let items = vec![item("Latte", 1), item("Espresso", 2), item("Mocha", 3)];
        let order = Order::with_items(items.clone());

        assert_eq!(order.line_items(), items.as_slice());
    }

    #[test]
    fn test_mark_paid_on_fresh_order() {
        let mut order = Order::default();

        order.mark_paid().unwrap();
        assert_eq!(order.status(), OrderStatus::Paid);

        let err = order.mark_paid().unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidTransition {
                command: OrderCommand::MarkPaid,
                required: OrderStatus::PaymentExpected,
                actual: OrderStatus::Paid,
            }
        );
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[test]
    fn test_full_lifecycle_chains() {
        let mut order = Order::default();

        order
            .mark_paid()
            .and_then(Order::mark_in_preparation)
            .and_then(Order::mark_prepared)
            .and_then(Order::mark_taken)
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Taken);
        assert!(order.is_taken());
    }

    #[test]
    fn test_preparation_requires_payment() {
        let mut order = Order::default();

        let err = order.mark_in_preparation().unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                required: OrderStatus::Paid,
                actual: OrderStatus::PaymentExpected,
                ..
            }
        ));
        assert_eq!(order.status(), OrderStatus::PaymentExpected);
    }

    #[test]
    fn test_cannot_take_before_ready() {
        let mut order = Order::default();
        order.mark_paid().unwrap();

        let err = order.mark_taken().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot mark taken order: required status READY, current status PAID"
        );
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[test]
    fn test_every_out_of_sequence_command_is_rejected() {
        for status in OrderStatus::ALL {
            for command in OrderCommand::ALL {
                let mut order = order_in(status);
                let result = order.apply(command).map(|o| o.status());

                if command.required_status() == status {
                    assert_eq!(result, Ok(command.target_status()));
                } else {
                    assert!(result.is_err(), "{command} accepted from {status}");
                    assert_eq!(order.status(), status);
                }
            }
        }
    }

    #[test]
    fn test_predicates_follow_status() {
        for status in OrderStatus::ALL {
            let order = order_in(status);
            assert_eq!(order.is_paid(), status != OrderStatus::PaymentExpected);
            assert_eq!(order.is_ready(), status == OrderStatus::Ready);
            assert_eq!(order.is_taken(), status == OrderStatus::Taken);
        }
    }

    #[test]
    fn test_ordered_date_has_microsecond_precision() {
        use chrono::Timelike;

        for _ in 0..50 {
            let order = Order::default();
            assert_eq!(order.ordered_date().nanosecond() % 1_000, 0);
        }
    }

    #[test]
    fn test_json_hides_identity_and_predicates() {
        let mut order = Order::with_items(vec![item("Latte", 2)]);
        order.assign_identity(Uuid::now_v7(), 3);

        let json = serde_json::to_value(&order).unwrap();
        let fields = json.as_object().unwrap();

        assert_eq!(json["status"], "PAYMENT_EXPECTED");
        assert_eq!(json["location"], "TAKE_AWAY");
        assert_eq!(json["lineItems"][0]["name"], "Latte");
        assert!(fields.contains_key("orderedDate"));
        assert!(!fields.contains_key("id"));
        assert!(!fields.contains_key("version"));
        assert!(!fields.contains_key("paid"));
    }
}
