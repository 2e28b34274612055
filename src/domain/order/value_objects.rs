use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use utoipa::ToSchema;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Where the customer consumes the order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Location {
    InStore,
    #[default]
    TakeAway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Milk {
    Skimmed,
    Semi,
    Whole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Size {
    Small,
    Medium,
    Large,
}

/// Fulfillment status. Moves strictly forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, but not paid yet.
    PaymentExpected,
    /// Paid. No changes allowed to the order anymore.
    Paid,
    /// Currently being prepared.
    Preparing,
    /// Ready to be picked up by the customer.
    Ready,
    /// Completed.
    Taken,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::PaymentExpected,
        OrderStatus::Paid,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Taken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PaymentExpected => "PAYMENT_EXPECTED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Taken => "TAKEN",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored or requested name matches no enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

// Storage names for the remaining enums match their JSON names.
macro_rules! storage_names {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

storage_names!(Location, "location", { InStore => "IN_STORE", TakeAway => "TAKE_AWAY" });
storage_names!(Milk, "milk", { Skimmed => "SKIMMED", Semi => "SEMI", Whole => "WHOLE" });
storage_names!(Size, "size", { Small => "SMALL", Medium => "MEDIUM", Large => "LARGE" });

/// A single product request within an order. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    name: String,
    #[schema(value_type = u32, minimum = 1)]
    quantity: NonZeroU32,
    #[schema(inline)]
    milk: Milk,
    #[schema(inline)]
    size: Size,
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: NonZeroU32, milk: Milk, size: Size) -> Self {
        Self {
            name: name.into(),
            quantity,
            milk,
            size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> NonZeroU32 {
        self.quantity
    }

    pub fn milk(&self) -> Milk {
        self.milk
    }

    pub fn size(&self) -> Size {
        self.size
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_defaults_to_take_away() {
        assert_eq!(Location::default(), Location::TakeAway);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::PaymentExpected).unwrap(),
            "\"PAYMENT_EXPECTED\""
        );
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "CANCELLED".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "status");
        assert_eq!(err.value, "CANCELLED");
    }

    #[test]
    fn test_storage_names_parse_back() {
        assert_eq!("IN_STORE".parse::<Location>().unwrap(), Location::InStore);
        assert_eq!(Milk::Semi.as_str(), "SEMI");
        assert_eq!("LARGE".parse::<Size>().unwrap(), Size::Large);
        assert!("HUGE".parse::<Size>().is_err());
    }

    #[test]
    fn test_line_item_value_equality() {
        let quantity = NonZeroU32::new(2).unwrap();
        let a = LineItem::new("Cappuccino", quantity, Milk::Semi, Size::Large);
        let b = LineItem::new("Cappuccino", quantity, Milk::Semi, Size::Large);
        let c = LineItem::new("Cappuccino", quantity, Milk::Whole, Size::Large);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_line_item_rejects_zero_quantity() {
        let json = r#"{"name":"Latte","quantity":0,"milk":"WHOLE","size":"SMALL"}"#;
        assert!(serde_json::from_str::<LineItem>(json).is_err());

        let json = r#"{"name":"Latte","quantity":3,"milk":"WHOLE","size":"SMALL"}"#;
        let item: LineItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.quantity().get(), 3);
        assert_eq!(item.milk(), Milk::Whole);
    }
}
