//! Order and payment status enums.

use serde::{Deserialize, Serialize};

/// The fulfilment status of an order.
///
/// Transitions are deliberately unguarded except for cancellation, which is
/// only reachable from `Pending` or `Confirmed` via the dedicated cancel
/// path. This mirrors how the business actually operates: staff move orders
/// freely between states from the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the cancel path may transition from this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    /// Returns the status name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::InProgress => "In Progress",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The payment status of an order. Transitions are unguarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Processing => "Processing",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the customer chose to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Stripe,
    #[serde(rename = "PayPal")]
    PayPal,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    Invoice,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "Stripe",
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Invoice => "Invoice",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_statuses_are_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }

    #[test]
    fn cancel_only_from_pending_or_confirmed() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Confirmed.can_cancel());
        assert!(!OrderStatus::InProgress.can_cancel());
        assert!(!OrderStatus::Completed.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn in_progress_uses_spaced_wire_name() {
        let json = serde_json::to_string(&OrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let back: OrderStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(back, OrderStatus::InProgress);
    }

    #[test]
    fn payment_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"Bank Transfer\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::PayPal).unwrap(),
            "\"PayPal\""
        );
    }
}
