//! Domain layer for the safety-training catalogue and order system.
//!
//! This crate provides the core domain types:
//! - Course catalogue entries with embedded reviews and derived ratings
//! - Order documents with customer/line-item snapshots and computed totals
//! - User accounts with role lists
//! - The order lifecycle (order numbers, VAT totals, status transitions)

pub mod course;
pub mod error;
pub mod order;
pub mod user;

pub use course::{Category, Course, Instructor, Level, Review, SyllabusEntry, slugify};
pub use error::DomainError;
pub use order::{
    Address, BookingDetails, CommunicationChannel, CommunicationEntry, CustomerDetails,
    DeliveryStatus, Order, OrderDocument, OrderLine, OrderNotes, OrderStatus, OrderSummary,
    PaymentDetails, PaymentMethod, PaymentStatus, VAT_RATE, compute_totals,
    generate_order_number, round_to_pence,
};
pub use user::User;
