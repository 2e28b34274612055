use std::fmt;

use super::value_objects::OrderStatus;

// ============================================================================
// Order Commands - The four lifecycle steps
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderCommand {
    MarkPaid,
    MarkInPreparation,
    MarkPrepared,
    MarkTaken,
}

impl OrderCommand {
    pub const ALL: [OrderCommand; 4] = [
        OrderCommand::MarkPaid,
        OrderCommand::MarkInPreparation,
        OrderCommand::MarkPrepared,
        OrderCommand::MarkTaken,
    ];

    /// Status the order must be in for this command to apply.
    pub fn required_status(&self) -> OrderStatus {
        match self {
            OrderCommand::MarkPaid => OrderStatus::PaymentExpected,
            OrderCommand::MarkInPreparation => OrderStatus::Paid,
            OrderCommand::MarkPrepared => OrderStatus::Preparing,
            OrderCommand::MarkTaken => OrderStatus::Ready,
        }
    }

    pub fn target_status(&self) -> OrderStatus {
        match self {
            OrderCommand::MarkPaid => OrderStatus::Paid,
            OrderCommand::MarkInPreparation => OrderStatus::Preparing,
            OrderCommand::MarkPrepared => OrderStatus::Ready,
            OrderCommand::MarkTaken => OrderStatus::Taken,
        }
    }

    /// Path segment used by the HTTP layer, e.g. `mark-paid`.
    pub fn action_name(&self) -> &'static str {
        match self {
            OrderCommand::MarkPaid => "mark-paid",
            OrderCommand::MarkInPreparation => "mark-in-preparation",
            OrderCommand::MarkPrepared => "mark-prepared",
            OrderCommand::MarkTaken => "mark-taken",
        }
    }

    pub fn from_action_name(name: &str) -> Option<Self> {
        OrderCommand::ALL
            .into_iter()
            .find(|command| command.action_name() == name)
    }
}

impl fmt::Display for OrderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderCommand::MarkPaid => "mark paid",
            OrderCommand::MarkInPreparation => "mark in preparation",
            OrderCommand::MarkPrepared => "mark prepared",
            OrderCommand::MarkTaken => "mark taken",
        };
        f.write_str(name)
    }
}
