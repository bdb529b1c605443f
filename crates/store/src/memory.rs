//! In-memory store implementation.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domain::{Category, Course, Order, Review, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{CourseQuery, CourseSort, OrderQuery, OrderSort, Page, SortOrder, Store},
};

/// In-memory store backing tests and local development.
///
/// Provides the same interface and semantics as the PostgreSQL
/// implementation. Review appends take the course map's write lock, so
/// concurrent appends are serialized and none is lost.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    courses: Arc<RwLock<HashMap<Uuid, Course>>>,
    orders: Arc<RwLock<HashMap<String, Order>>>,
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

fn compare_courses(a: &Course, b: &Course, sort: CourseSort) -> Ordering {
    match sort {
        CourseSort::Title => a.title.cmp(&b.title),
        CourseSort::Price => a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal),
        CourseSort::CreatedAt => a.created_at.cmp(&b.created_at),
        CourseSort::AverageRating => a
            .average_rating
            .partial_cmp(&b.average_rating)
            .unwrap_or(Ordering::Equal),
    }
}

fn compare_orders(a: &Order, b: &Order, sort: OrderSort) -> Ordering {
    match sort {
        OrderSort::CreatedAt => a.created_at.cmp(&b.created_at),
        OrderSort::OrderNumber => a.order_number.cmp(&b.order_number),
        OrderSort::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}

fn paginate<T>(mut items: Vec<T>, page: u32, limit: u32) -> Page<T> {
    let total = items.len() as u64;
    let skip = (page.saturating_sub(1) as usize) * limit as usize;
    let items = if skip >= items.len() {
        vec![]
    } else {
        items.drain(skip..).take(limit as usize).collect()
    };
    Page::new(items, page, limit, total)
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_course(&self, course: Course) -> Result<Course> {
        let mut courses = self.courses.write().await;
        if courses.values().any(|c| c.slug == course.slug) {
            return Err(StoreError::DuplicateSlug(course.slug));
        }
        courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn list_courses(&self, query: CourseQuery) -> Result<Page<Course>> {
        let courses = self.courses.read().await;
        let mut matches: Vec<Course> = courses
            .values()
            .filter(|c| c.is_active)
            .filter(|c| query.category.is_none_or(|cat| c.category == cat))
            .filter(|c| query.level.is_none_or(|l| c.level == l))
            .filter(|c| query.is_online.is_none_or(|o| c.is_online == o))
            .filter(|c| query.min_price.is_none_or(|min| c.price >= min))
            .filter(|c| query.max_price.is_none_or(|max| c.price <= max))
            .filter(|c| {
                query
                    .search
                    .as_deref()
                    .is_none_or(|q| c.matches_search(q))
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            let ord = compare_courses(a, b, query.sort_by);
            match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        Ok(paginate(matches, query.page, query.limit))
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
        Ok(self.courses.read().await.get(&id).cloned())
    }

    async fn get_course_by_slug(&self, slug: &str) -> Result<Option<Course>> {
        let courses = self.courses.read().await;
        Ok(courses
            .values()
            .find(|c| c.slug == slug && c.is_active)
            .cloned())
    }

    async fn list_courses_by_category(&self, category: Category) -> Result<Vec<Course>> {
        let courses = self.courses.read().await;
        let mut matches: Vec<Course> = courses
            .values()
            .filter(|c| c.is_active && c.category == category)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(matches)
    }

    async fn search_courses(&self, query: &str) -> Result<Vec<Course>> {
        let q = query.to_lowercase();
        let courses = self.courses.read().await;
        let mut matches: Vec<Course> = courses
            .values()
            .filter(|c| c.is_active)
            .filter(|c| {
                c.matches_search(query) || c.category.as_str().to_lowercase().contains(&q)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(matches)
    }

    async fn add_review(&self, course_id: Uuid, review: Review) -> Result<Option<Course>> {
        let mut courses = self.courses.write().await;
        match courses.get_mut(&course_id) {
            Some(course) => {
                course.push_review(review);
                Ok(Some(course.clone()))
            }
            None => Ok(None),
        }
    }

    async fn insert_order(&self, order: Order) -> Result<Order> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_number) {
            return Err(StoreError::DuplicateOrderNumber(order.order_number));
        }
        orders.insert(order.order_number.clone(), order.clone());
        Ok(order)
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Page<Order>> {
        let orders = self.orders.read().await;
        let mut matches: Vec<Order> = orders
            .values()
            .filter(|o| query.status.is_none_or(|s| o.status == s))
            .filter(|o| {
                query
                    .customer_email
                    .as_deref()
                    .is_none_or(|e| o.customer.email.eq_ignore_ascii_case(e))
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            let ord = compare_orders(a, b, query.sort_by);
            match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        Ok(paginate(matches, query.page, query.limit))
    }

    async fn get_order(&self, order_number: &str) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(order_number).cloned())
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.order_number) {
            Some(existing) => {
                let mut updated = order.clone();
                updated.updated_at = Utc::now();
                *existing = updated;
                Ok(())
            }
            None => Err(StoreError::NotFound("Order")),
        }
    }

    async fn insert_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::DuplicateEmail(user.email));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}
