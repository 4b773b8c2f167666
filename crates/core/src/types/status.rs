//! Order status machine.
//!
//! An order carries two independent status axes: what happened to the money
//! ([`PaymentStatus`]) and where the shipment is ([`OrderStatus`]). Status
//! transitions arrive from three sources - the payment callback, manual admin
//! updates, and the periodic fulfillment sweep - so every mutation funnels
//! through the single [`OrderStatus::can_advance_to`] table here and the
//! conditional updates in the order store. Callers never write a status
//! directly.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days an order sits in `Processing` before the sweep marks it `Shipped`.
pub const SHIP_AFTER_DAYS: i64 = 3;

/// Days an order sits in `Shipped` before the sweep marks it `Delivered`.
pub const DELIVER_AFTER_DAYS: i64 = 2;

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment initiated but not yet verified.
    #[default]
    Pending,
    /// Gateway verified the transaction as successful.
    Paid,
    /// Gateway verified the transaction as failed.
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}

/// Fulfillment status of an order.
///
/// Legal edges, regardless of which caller requests them:
///
/// ```text
/// pending -> processing -> shipped -> delivered
/// pending -> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created at checkout; awaiting payment confirmation.
    #[default]
    Pending,
    /// Payment confirmed; being prepared for shipment.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer. Terminal.
    Delivered,
    /// Cancelled before payment was confirmed. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Whether the fulfillment sequence may advance from `self` to `next`.
    ///
    /// Forward-only along pending -> processing -> shipped -> delivered;
    /// cancellation is reachable from `Pending` alone. `Delivered` and
    /// `Cancelled` are terminal.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Whether this status is terminal (no further transitions).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Time-based fulfillment promotion rule used by the sweep.
///
/// Returns the status a paid order should advance to given how long it has
/// sat unmodified, or `None` when the order must be left alone. Orders whose
/// payment is not verified never move.
#[must_use]
pub fn next_fulfillment(
    status: OrderStatus,
    payment: PaymentStatus,
    last_update: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<OrderStatus> {
    if payment != PaymentStatus::Paid {
        return None;
    }
    let stale = now.signed_duration_since(last_update);
    match status {
        OrderStatus::Processing if stale >= Duration::days(SHIP_AFTER_DAYS) => {
            Some(OrderStatus::Shipped)
        }
        OrderStatus::Shipped if stale >= Duration::days(DELIVER_AFTER_DAYS) => {
            Some(OrderStatus::Delivered)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_edges_are_legal() {
        assert!(OrderStatus::Pending.can_advance_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_advance_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_advance_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_cancel_only_from_pending() {
        assert!(OrderStatus::Pending.can_advance_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Processing.can_advance_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_advance_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_advance_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_no_regression() {
        assert!(!OrderStatus::Processing.can_advance_to(OrderStatus::Pending));
        assert!(!OrderStatus::Shipped.can_advance_to(OrderStatus::Processing));
        assert!(!OrderStatus::Delivered.can_advance_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_no_skipping() {
        assert!(!OrderStatus::Pending.can_advance_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_advance_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Processing.can_advance_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_terminal_states() {
        for next in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert!(!OrderStatus::Delivered.can_advance_to(next));
            assert!(!OrderStatus::Cancelled.can_advance_to(next));
        }
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_status_roundtrip() {
        use std::str::FromStr;

        for status in ["pending", "processing", "shipped", "delivered", "cancelled"] {
            let parsed = OrderStatus::from_str(status).expect("valid status");
            assert_eq!(parsed.to_string(), status);
        }
        for status in ["pending", "paid", "failed"] {
            let parsed = PaymentStatus::from_str(status).expect("valid status");
            assert_eq!(parsed.to_string(), status);
        }
        assert!(OrderStatus::from_str("refunded").is_err());
    }

    #[test]
    fn test_sweep_rule_ships_after_three_days() {
        let now = Utc::now();
        let stale = now - Duration::days(3);
        let fresh = now - Duration::days(2);

        assert_eq!(
            next_fulfillment(OrderStatus::Processing, PaymentStatus::Paid, stale, now),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(
            next_fulfillment(OrderStatus::Processing, PaymentStatus::Paid, fresh, now),
            None
        );
    }

    #[test]
    fn test_sweep_rule_delivers_after_two_days() {
        let now = Utc::now();
        let stale = now - Duration::days(2);
        let fresh = now - Duration::hours(47);

        assert_eq!(
            next_fulfillment(OrderStatus::Shipped, PaymentStatus::Paid, stale, now),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(
            next_fulfillment(OrderStatus::Shipped, PaymentStatus::Paid, fresh, now),
            None
        );
    }

    #[test]
    fn test_sweep_never_touches_unpaid_orders() {
        let now = Utc::now();
        let stale = now - Duration::days(30);

        for payment in [PaymentStatus::Pending, PaymentStatus::Failed] {
            assert_eq!(
                next_fulfillment(OrderStatus::Processing, payment, stale, now),
                None
            );
            assert_eq!(
                next_fulfillment(OrderStatus::Shipped, payment, stale, now),
                None
            );
        }
    }

    #[test]
    fn test_sweep_ignores_other_statuses() {
        let now = Utc::now();
        let stale = now - Duration::days(30);

        for status in [
            OrderStatus::Pending,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(
                next_fulfillment(status, PaymentStatus::Paid, stale, now),
                None
            );
        }
    }
}
