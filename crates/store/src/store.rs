//! Core store trait and query types.

use async_trait::async_trait;
use domain::{Category, Course, Order, OrderStatus, Review, User};
use serde::Serialize;
use uuid::Uuid;

use crate::Result;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parses `"asc"`/`"desc"`; anything else falls back to ascending.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Fields a course listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CourseSort {
    #[default]
    Title,
    Price,
    CreatedAt,
    AverageRating,
}

impl CourseSort {
    /// Parses a caller-supplied sort field; unknown fields fall back to
    /// title, keeping the sort column a closed set.
    pub fn parse(s: &str) -> Self {
        match s {
            "price" => CourseSort::Price,
            "createdAt" => CourseSort::CreatedAt,
            "averageRating" => CourseSort::AverageRating,
            _ => CourseSort::Title,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            CourseSort::Title => "title",
            CourseSort::Price => "price",
            CourseSort::CreatedAt => "created_at",
            CourseSort::AverageRating => "average_rating",
        }
    }
}

/// Fields an order listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSort {
    #[default]
    CreatedAt,
    OrderNumber,
    Status,
}

impl OrderSort {
    pub fn parse(s: &str) -> Self {
        match s {
            "orderNumber" => OrderSort::OrderNumber,
            "status" => OrderSort::Status,
            _ => OrderSort::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            OrderSort::CreatedAt => "created_at",
            OrderSort::OrderNumber => "order_number",
            OrderSort::Status => "status",
        }
    }
}

/// Filter, sort and pagination parameters for course listings.
///
/// Only active courses are ever returned by listing queries.
#[derive(Debug, Clone)]
pub struct CourseQuery {
    pub category: Option<Category>,
    pub level: Option<domain::Level>,
    pub is_online: Option<bool>,
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
    pub sort_by: CourseSort,
    pub sort_order: SortOrder,
}

impl Default for CourseQuery {
    fn default() -> Self {
        Self {
            category: None,
            level: None,
            is_online: None,
            search: None,
            min_price: None,
            max_price: None,
            page: 1,
            limit: 12,
            sort_by: CourseSort::Title,
            sort_order: SortOrder::Asc,
        }
    }
}

/// Filter, sort and pagination parameters for order listings.
#[derive(Debug, Clone)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub customer_email: Option<String>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: OrderSort,
    pub sort_order: SortOrder,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            status: None,
            customer_email: None,
            page: 1,
            limit: 20,
            sort_by: OrderSort::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

/// One page of a listing, with the pagination metadata the API returns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(skip)]
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
}

impl<T> Page<T> {
    /// Builds a page from the fetched items and the total match count.
    pub fn new(items: Vec<T>, page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            ((total + u64::from(limit) - 1) / u64::from(limit)) as u32
        };
        Self {
            items,
            current_page: page,
            total_pages,
            total_items: total,
            items_per_page: limit,
        }
    }
}

/// Document store over Users, Courses and Orders.
///
/// Each write is a single-document operation; there is no multi-document
/// transaction coordination. Implementations must be thread-safe.
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks database connectivity for the health endpoint.
    async fn ping(&self) -> Result<()>;

    // -- Courses --

    /// Inserts a new course. Fails on a duplicate slug.
    async fn insert_course(&self, course: Course) -> Result<Course>;

    /// Lists active courses matching the query, with pagination metadata.
    async fn list_courses(&self, query: CourseQuery) -> Result<Page<Course>>;

    /// Fetches a course by id regardless of active flag.
    async fn get_course(&self, id: Uuid) -> Result<Option<Course>>;

    /// Fetches an active course by slug.
    async fn get_course_by_slug(&self, slug: &str) -> Result<Option<Course>>;

    /// Lists active courses in a category.
    async fn list_courses_by_category(&self, category: Category) -> Result<Vec<Course>>;

    /// Free-text search over active courses (title, descriptions and
    /// category name).
    async fn search_courses(&self, query: &str) -> Result<Vec<Course>>;

    /// Atomically appends a review to a course and recomputes its rating.
    ///
    /// Concurrent appends against the same course must both survive; the
    /// backend serializes per-course writes. Returns the updated course, or
    /// None if the course does not exist.
    async fn add_review(&self, course_id: Uuid, review: Review) -> Result<Option<Course>>;

    // -- Orders --

    /// Persists a new order as one document write. Fails on a duplicate
    /// order number.
    async fn insert_order(&self, order: Order) -> Result<Order>;

    /// Lists orders matching the query, with pagination metadata.
    async fn list_orders(&self, query: OrderQuery) -> Result<Page<Order>>;

    /// Fetches an order by its order number.
    async fn get_order(&self, order_number: &str) -> Result<Option<Order>>;

    /// Replaces an existing order document, keyed by order number.
    async fn update_order(&self, order: &Order) -> Result<()>;

    // -- Users --

    /// Inserts a new user. Fails with `DuplicateEmail` if the email is
    /// already registered.
    async fn insert_user(&self, user: User) -> Result<User>;

    /// Looks a user up by (lowercased) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Looks a user up by id.
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_metadata_rounds_total_pages_up() {
        let page: Page<u32> = Page::new(vec![], 1, 12, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 25);
        assert_eq!(page.items_per_page, 12);
    }

    #[test]
    fn page_metadata_for_empty_result() {
        let page: Page<u32> = Page::new(vec![], 1, 12, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn sort_parsing_falls_back_to_defaults() {
        assert_eq!(CourseSort::parse("price"), CourseSort::Price);
        assert_eq!(CourseSort::parse("bogus"), CourseSort::Title);
        assert_eq!(OrderSort::parse("bogus"), OrderSort::CreatedAt);
        assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("DESC"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("sideways"), SortOrder::Asc);
    }
}
