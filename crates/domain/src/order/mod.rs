//! Order documents: customer snapshots, line items, totals and lifecycle.

mod lifecycle;
mod state;

pub use lifecycle::{VAT_RATE, compute_totals, generate_order_number, round_to_pence};
pub use state::{OrderStatus, PaymentMethod, PaymentStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// A postal address captured with the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "United Kingdom".to_string()
}

/// Customer details snapshotted at order time, independent of any user
/// record. Later user edits never alter historical orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

/// One purchased course, with title and price snapshotted at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub course: Uuid,
    pub title: String,
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

/// Derived order totals. Never set directly; always computed from the lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub subtotal: f64,
    pub vat: f64,
    pub total: f64,
    pub currency: String,
}

/// Payment sub-document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gateway: Option<String>,
}

/// Optional booking preferences captured at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(default)]
    pub preferred_dates: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub special_requirements: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub accessibility_needs: Option<String>,
}

/// Free-text notes attached to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotes {
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub internal: Option<String>,
}

/// A document (certificate, invoice, joining instructions) attached to an
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDocument {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Channel of a logged customer communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunicationChannel {
    Email,
    #[serde(rename = "SMS")]
    Sms,
    Phone,
    System,
}

/// Delivery status of a logged communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeliveryStatus {
    #[default]
    Sent,
    Delivered,
    Failed,
}

/// One entry in the order's communication log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationEntry {
    #[serde(rename = "type")]
    pub channel: CommunicationChannel,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub status: DeliveryStatus,
}

/// A customer's purchase record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    /// Human-readable unique reference, generated once at creation.
    pub order_number: String,
    pub customer: CustomerDetails,
    pub courses: Vec<OrderLine>,
    pub order_summary: OrderSummary,
    pub payment: PaymentDetails,
    pub status: OrderStatus,
    #[serde(default)]
    pub booking_details: Option<BookingDetails>,
    #[serde(default)]
    pub notes: Option<OrderNotes>,
    #[serde(default)]
    pub documents: Vec<OrderDocument>,
    #[serde(default)]
    pub communication: Vec<CommunicationEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new Pending order with computed totals and a fresh order
    /// number.
    ///
    /// Validates that at least one line item exists and every line carries a
    /// positive price and a quantity of at least 1. The customer email is
    /// lowercased on the way in.
    pub fn create(
        mut customer: CustomerDetails,
        courses: Vec<OrderLine>,
        method: PaymentMethod,
    ) -> Result<Self, DomainError> {
        if courses.is_empty() {
            return Err(DomainError::NoLineItems);
        }
        for line in &courses {
            if line.price <= 0.0 {
                return Err(DomainError::InvalidPrice { price: line.price });
            }
            if line.quantity == 0 {
                return Err(DomainError::InvalidQuantity {
                    quantity: line.quantity,
                });
            }
        }
        for (field, value) in [
            ("first name", &customer.first_name),
            ("last name", &customer.last_name),
            ("email", &customer.email),
            ("phone", &customer.phone),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::MissingCustomerField { field });
            }
        }
        customer.email = customer.email.to_lowercase();

        let now = Utc::now();
        let order_summary = compute_totals(&courses);

        Ok(Self {
            id: Uuid::new_v4(),
            order_number: generate_order_number(),
            customer,
            courses,
            order_summary,
            payment: PaymentDetails {
                method,
                status: PaymentStatus::Pending,
                transaction_id: None,
                payment_date: None,
                gateway: None,
            },
            status: OrderStatus::Pending,
            booking_details: None,
            notes: None,
            documents: vec![],
            communication: vec![],
            created_at: now,
            updated_at: now,
        })
    }

    /// Sets the order status. Unguarded by design; the cancel path is the
    /// only transition with a precondition.
    pub fn set_status(&mut self, new_status: OrderStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }

    /// Cancels the order. Only permitted from Pending or Confirmed.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if !self.status.can_cancel() {
            return Err(DomainError::NotCancellable {
                current: self.status,
            });
        }
        self.status = OrderStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Sets the payment status, optionally recording a transaction id.
    ///
    /// Stamps `payment.payment_date` when the new status is Completed.
    pub fn set_payment_status(&mut self, new_status: PaymentStatus, transaction_id: Option<String>) {
        self.payment.status = new_status;
        if let Some(txn) = transaction_id {
            self.payment.transaction_id = Some(txn);
        }
        if new_status == PaymentStatus::Completed {
            self.payment.payment_date = Some(Utc::now());
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_customer() -> CustomerDetails {
        CustomerDetails {
            first_name: "Amira".to_string(),
            last_name: "Khan".to_string(),
            email: "Amira.Khan@Example.co.uk".to_string(),
            phone: "07700 900123".to_string(),
            company: None,
            address: None,
        }
    }

    fn line(price: f64, quantity: u32) -> OrderLine {
        OrderLine {
            course: Uuid::new_v4(),
            title: "Fire Marshal Training".to_string(),
            price,
            quantity,
            start_date: None,
            location: None,
        }
    }

    #[test]
    fn create_computes_totals_and_defaults() {
        let order = Order::create(
            sample_customer(),
            vec![line(100.0, 1), line(50.0, 2)],
            PaymentMethod::Stripe,
        )
        .unwrap();

        assert_eq!(order.order_summary.subtotal, 200.0);
        assert_eq!(order.order_summary.vat, 40.0);
        assert_eq!(order.order_summary.total, 240.0);
        assert_eq!(order.order_summary.currency, "GBP");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment.status, PaymentStatus::Pending);
        assert!(order.payment.payment_date.is_none());
    }

    #[test]
    fn create_lowercases_customer_email() {
        let order =
            Order::create(sample_customer(), vec![line(80.0, 1)], PaymentMethod::Invoice).unwrap();
        assert_eq!(order.customer.email, "amira.khan@example.co.uk");
    }

    #[test]
    fn create_rejects_empty_line_items() {
        let err = Order::create(sample_customer(), vec![], PaymentMethod::Stripe).unwrap_err();
        assert!(matches!(err, DomainError::NoLineItems));
    }

    #[test]
    fn create_rejects_non_positive_price() {
        let err =
            Order::create(sample_customer(), vec![line(0.0, 1)], PaymentMethod::Stripe).unwrap_err();
        assert!(matches!(err, DomainError::InvalidPrice { .. }));
    }

    #[test]
    fn create_rejects_zero_quantity() {
        let err =
            Order::create(sample_customer(), vec![line(50.0, 0)], PaymentMethod::Stripe).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity { .. }));
    }

    #[test]
    fn create_rejects_blank_customer_fields() {
        let mut customer = sample_customer();
        customer.phone = "   ".to_string();
        let err = Order::create(customer, vec![line(50.0, 1)], PaymentMethod::Stripe).unwrap_err();
        assert!(matches!(
            err,
            DomainError::MissingCustomerField { field: "phone" }
        ));
    }

    #[test]
    fn cancel_allowed_from_pending_and_confirmed() {
        let mut order =
            Order::create(sample_customer(), vec![line(50.0, 1)], PaymentMethod::Stripe).unwrap();
        order.cancel().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);

        let mut order =
            Order::create(sample_customer(), vec![line(50.0, 1)], PaymentMethod::Stripe).unwrap();
        order.set_status(OrderStatus::Confirmed);
        order.cancel().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn cancel_rejected_elsewhere_and_leaves_status_unchanged() {
        for status in [
            OrderStatus::InProgress,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            let mut order =
                Order::create(sample_customer(), vec![line(50.0, 1)], PaymentMethod::Stripe)
                    .unwrap();
            order.set_status(status);
            let err = order.cancel().unwrap_err();
            assert!(matches!(err, DomainError::NotCancellable { .. }));
            assert_eq!(order.status, status);
        }
    }

    #[test]
    fn completed_payment_stamps_payment_date() {
        let mut order =
            Order::create(sample_customer(), vec![line(50.0, 1)], PaymentMethod::Stripe).unwrap();
        order.set_payment_status(PaymentStatus::Completed, Some("pi_123".to_string()));

        assert_eq!(order.payment.status, PaymentStatus::Completed);
        assert_eq!(order.payment.transaction_id.as_deref(), Some("pi_123"));
        assert!(order.payment.payment_date.is_some());
    }

    #[test]
    fn non_completed_payment_leaves_date_unset() {
        let mut order =
            Order::create(sample_customer(), vec![line(50.0, 1)], PaymentMethod::Stripe).unwrap();
        order.set_payment_status(PaymentStatus::Processing, None);
        assert!(order.payment.payment_date.is_none());
    }

    #[test]
    fn order_serializes_with_camel_case_fields() {
        let order =
            Order::create(sample_customer(), vec![line(50.0, 1)], PaymentMethod::Stripe).unwrap();
        let value = serde_json::to_value(&order).unwrap();
        assert!(value.get("orderNumber").is_some());
        assert!(value.get("orderSummary").is_some());
        assert!(value["payment"].get("transactionId").is_some());
    }
}
