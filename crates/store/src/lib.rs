//! Persistence layer: a document-store abstraction over Users, Courses and
//! Orders, with two interchangeable backends.
//!
//! The [`Store`] trait is the seam between the HTTP layer and the database.
//! [`PgStore`] persists each entity as one row (a `doc` jsonb column plus the
//! filterable fields); [`InMemoryStore`] backs tests and local development
//! with the same semantics.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use store::{CourseQuery, CourseSort, OrderQuery, OrderSort, Page, SortOrder, Store};
