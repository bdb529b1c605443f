//! PostgreSQL store implementation.
//!
//! Each entity is persisted as one row: a `doc` jsonb column holding the
//! full document plus the columns the listing queries filter and sort on.
//! Every write is a single-row statement, so status updates and review
//! appends get the row-level atomicity the domain relies on.

use async_trait::async_trait;
use domain::{Category, Course, Order, Review, User};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{CourseQuery, OrderQuery, Page, Store},
};

/// PostgreSQL-backed document store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and runs pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        let store = Self::new(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_doc<T: serde::de::DeserializeOwned>(row: &PgRow) -> Result<T> {
        let doc: serde_json::Value = row.try_get("doc")?;
        Ok(serde_json::from_value(doc)?)
    }
}

/// Appends the course listing filters to a query builder whose statement
/// already ends in `WHERE is_active = TRUE`.
fn push_course_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &CourseQuery) {
    if let Some(category) = query.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(level) = query.level {
        qb.push(" AND level = ").push_bind(level.as_str());
    }
    if let Some(is_online) = query.is_online {
        qb.push(" AND is_online = ").push_bind(is_online);
    }
    if let Some(min) = query.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
    if let Some(search) = query.search.as_deref() {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR doc->>'description' ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR doc->>'shortDescription' ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Appends the order listing filters to a query builder whose statement
/// already ends in `WHERE TRUE`.
fn push_order_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &OrderQuery) {
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(email) = query.customer_email.as_deref() {
        qb.push(" AND customer_email = ").push_bind(email.to_lowercase());
    }
}

/// Escapes LIKE metacharacters so user-supplied search text matches
/// literally.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn constraint_error(e: sqlx::Error, constraint: &str, mk: impl FnOnce() -> StoreError) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some(constraint)
    {
        return mk();
    }
    StoreError::Database(e)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_course(&self, course: Course) -> Result<Course> {
        let doc = serde_json::to_value(&course)?;
        sqlx::query(
            r#"
            INSERT INTO courses (id, slug, title, category, level, price, is_online, is_active, average_rating, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(course.id)
        .bind(&course.slug)
        .bind(&course.title)
        .bind(course.category.as_str())
        .bind(course.level.as_str())
        .bind(course.price)
        .bind(course.is_online)
        .bind(course.is_active)
        .bind(course.average_rating)
        .bind(course.created_at)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let slug = course.slug.clone();
            constraint_error(e, "courses_slug_key", || StoreError::DuplicateSlug(slug))
        })?;
        Ok(course)
    }

    #[tracing::instrument(skip(self))]
    async fn list_courses(&self, query: CourseQuery) -> Result<Page<Course>> {
        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM courses WHERE is_active = TRUE");
        push_course_filters(&mut count_qb, &query);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT doc FROM courses WHERE is_active = TRUE");
        push_course_filters(&mut qb, &query);
        // Sort column comes from a closed enum, never from caller input.
        qb.push(format!(
            " ORDER BY {} {}",
            query.sort_by.column(),
            query.sort_order.sql()
        ));
        qb.push(" LIMIT ").push_bind(i64::from(query.limit));
        qb.push(" OFFSET ")
            .push_bind(i64::from(query.page.saturating_sub(1)) * i64::from(query.limit));

        let rows = qb.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(Self::row_to_doc)
            .collect::<Result<Vec<Course>>>()?;

        Ok(Page::new(items, query.page, query.limit, total as u64))
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT doc FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::row_to_doc(&r)).transpose()
    }

    async fn get_course_by_slug(&self, slug: &str) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT doc FROM courses WHERE slug = $1 AND is_active = TRUE")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::row_to_doc(&r)).transpose()
    }

    async fn list_courses_by_category(&self, category: Category) -> Result<Vec<Course>> {
        let rows = sqlx::query(
            "SELECT doc FROM courses WHERE category = $1 AND is_active = TRUE ORDER BY title ASC",
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_doc).collect()
    }

    async fn search_courses(&self, query: &str) -> Result<Vec<Course>> {
        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query(
            r#"
            SELECT doc FROM courses
            WHERE is_active = TRUE
              AND (title ILIKE $1
                   OR doc->>'description' ILIKE $1
                   OR doc->>'shortDescription' ILIKE $1
                   OR category ILIKE $1)
            ORDER BY title ASC
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_doc).collect()
    }

    #[tracing::instrument(skip(self, review))]
    async fn add_review(&self, course_id: Uuid, review: Review) -> Result<Option<Course>> {
        // Read-modify-write under a row lock so concurrent appends against
        // the same course are serialized and neither is lost.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT doc FROM courses WHERE id = $1 FOR UPDATE")
            .bind(course_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut course: Course = Self::row_to_doc(&row)?;
        course.push_review(review);
        let doc = serde_json::to_value(&course)?;

        sqlx::query("UPDATE courses SET doc = $2, average_rating = $3 WHERE id = $1")
            .bind(course_id)
            .bind(doc)
            .bind(course.average_rating)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(course))
    }

    async fn insert_order(&self, order: Order) -> Result<Order> {
        let doc = serde_json::to_value(&order)?;
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, status, customer_email, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.status.as_str())
        .bind(&order.customer.email)
        .bind(order.created_at)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let number = order.order_number.clone();
            constraint_error(e, "orders_order_number_key", || {
                StoreError::DuplicateOrderNumber(number)
            })
        })?;
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    async fn list_orders(&self, query: OrderQuery) -> Result<Page<Order>> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders WHERE TRUE");
        push_order_filters(&mut count_qb, &query);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT doc FROM orders WHERE TRUE");
        push_order_filters(&mut qb, &query);
        qb.push(format!(
            " ORDER BY {} {}",
            query.sort_by.column(),
            query.sort_order.sql()
        ));
        qb.push(" LIMIT ").push_bind(i64::from(query.limit));
        qb.push(" OFFSET ")
            .push_bind(i64::from(query.page.saturating_sub(1)) * i64::from(query.limit));

        let rows = qb.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(Self::row_to_doc)
            .collect::<Result<Vec<Order>>>()?;

        Ok(Page::new(items, query.page, query.limit, total as u64))
    }

    async fn get_order(&self, order_number: &str) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT doc FROM orders WHERE order_number = $1")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::row_to_doc(&r)).transpose()
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let doc = serde_json::to_value(order)?;
        let result = sqlx::query(
            "UPDATE orders SET status = $2, customer_email = $3, doc = $4 WHERE order_number = $1",
        )
        .bind(&order.order_number)
        .bind(order.status.as_str())
        .bind(&order.customer.email)
        .bind(doc)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Order"));
        }
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<User> {
        let doc = serde_json::to_value(&user)?;
        sqlx::query(
            r#"
            INSERT INTO users (id, email, created_at, doc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(user.created_at)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let email = user.email.clone();
            constraint_error(e, "users_email_key", || StoreError::DuplicateEmail(email))
        })?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT doc FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::row_to_doc(&r)).transpose()
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT doc FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::row_to_doc(&r)).transpose()
    }
}
