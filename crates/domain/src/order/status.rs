//! Order status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Created ──┬──► Accepted ──► ShippingInProgress ──► Shipped
///           │
///           └──► Rejected
/// ```
///
/// Rejected and Shipped are terminal. Once shipping begins an order can
/// never re-enter Created or Accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order has been placed and awaits the seller's decision.
    #[default]
    Created,

    /// Seller accepted the order.
    Accepted,

    /// Seller rejected the order (terminal state).
    Rejected,

    /// Order is being prepared for shipment.
    #[serde(rename = "Shipping in progress")]
    ShippingInProgress,

    /// Order has been shipped (terminal state).
    Shipped,
}

impl OrderStatus {
    /// Returns true if the order may move from this status to `to`.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// The statuses reachable in one step from this status.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Created => &[OrderStatus::Accepted, OrderStatus::Rejected],
            OrderStatus::Accepted => &[OrderStatus::ShippingInProgress],
            OrderStatus::Rejected => &[],
            OrderStatus::ShippingInProgress => &[OrderStatus::Shipped],
            OrderStatus::Shipped => &[],
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Rejected | OrderStatus::Shipped)
    }

    /// Returns the canonical status string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::ShippingInProgress => "Shipping in progress",
            OrderStatus::Shipped => "Shipped",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    /// Parses a status from its lexical form.
    ///
    /// Matching is case-insensitive over a fixed mapping, with one alias:
    /// the spaceless spelling of `Shipping in progress`. Anything absent
    /// from the mapping is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "created" => Ok(OrderStatus::Created),
            "accepted" => Ok(OrderStatus::Accepted),
            "rejected" => Ok(OrderStatus::Rejected),
            "shipping in progress" | "shippinginprogress" => Ok(OrderStatus::ShippingInProgress),
            "shipped" => Ok(OrderStatus::Shipped),
            _ => Err(OrderError::UnknownStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 5] = [
        OrderStatus::Created,
        OrderStatus::Accepted,
        OrderStatus::Rejected,
        OrderStatus::ShippingInProgress,
        OrderStatus::Shipped,
    ];

    #[test]
    fn test_default_status_is_created() {
        assert_eq!(OrderStatus::default(), OrderStatus::Created);
    }

    #[test]
    fn test_created_transitions() {
        assert!(OrderStatus::Created.can_transition_to(OrderStatus::Accepted));
        assert!(OrderStatus::Created.can_transition_to(OrderStatus::Rejected));
        assert!(!OrderStatus::Created.can_transition_to(OrderStatus::ShippingInProgress));
        assert!(!OrderStatus::Created.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Created.can_transition_to(OrderStatus::Created));
    }

    #[test]
    fn test_accepted_transitions() {
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::ShippingInProgress));
        assert!(!OrderStatus::Accepted.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Accepted.can_transition_to(OrderStatus::Created));
        assert!(!OrderStatus::Accepted.can_transition_to(OrderStatus::Rejected));
    }

    #[test]
    fn test_shipping_in_progress_transitions() {
        assert!(OrderStatus::ShippingInProgress.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::ShippingInProgress.can_transition_to(OrderStatus::Accepted));
        assert!(!OrderStatus::ShippingInProgress.can_transition_to(OrderStatus::Created));
    }

    #[test]
    fn test_terminal_states_allow_nothing() {
        for to in ALL {
            assert!(!OrderStatus::Rejected.can_transition_to(to));
            assert!(!OrderStatus::Shipped.can_transition_to(to));
        }
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Shipped.is_terminal());
        assert!(!OrderStatus::Created.is_terminal());
        assert!(!OrderStatus::Accepted.is_terminal());
        assert!(!OrderStatus::ShippingInProgress.is_terminal());
    }

    #[test]
    fn test_no_self_loops() {
        for status in ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("created".parse::<OrderStatus>().unwrap(), OrderStatus::Created);
        assert_eq!("ACCEPTED".parse::<OrderStatus>().unwrap(), OrderStatus::Accepted);
        assert_eq!("Rejected".parse::<OrderStatus>().unwrap(), OrderStatus::Rejected);
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
    }

    #[test]
    fn test_parse_shipping_in_progress_variants() {
        for input in [
            "shipping in progress",
            "Shipping In Progress",
            "shippinginprogress",
            "ShippingInProgress",
        ] {
            assert_eq!(
                input.parse::<OrderStatus>().unwrap(),
                OrderStatus::ShippingInProgress,
                "failed to parse {input:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        let err = "bogus".parse::<OrderStatus>().unwrap_err();
        assert!(matches!(err, OrderError::UnknownStatus(ref s) if s == "bogus"));
    }

    #[test]
    fn test_display_uses_canonical_strings() {
        assert_eq!(OrderStatus::Created.to_string(), "Created");
        assert_eq!(
            OrderStatus::ShippingInProgress.to_string(),
            "Shipping in progress"
        );
    }

    #[test]
    fn test_serialization_uses_canonical_strings() {
        let json = serde_json::to_string(&OrderStatus::ShippingInProgress).unwrap();
        assert_eq!(json, "\"Shipping in progress\"");

        let deserialized: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, OrderStatus::ShippingInProgress);
    }
}
