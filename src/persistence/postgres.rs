use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::str::FromStr;
use uuid::Uuid;

use super::{check_unique_line_items, OrderRepository, Page, PageRequest, RepositoryError, UserRepository};
use crate::domain::order::{LineItem, Location, Milk, Order, OrderStatus, Size};
use crate::domain::user::User;

// ============================================================================
// PostgreSQL Repositories
// ============================================================================
//
// Tables:
// - rb_order   (id, version, location, ordered_date, status)
// - line_item  (order_id, position, name, quantity, milk, size)
//              unique per order over the item values
// - app_user   (id, version, username, password, status)
//
// Line items never change after insert, so updates only touch rb_order.
//
// ============================================================================

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS rb_order (
        id UUID PRIMARY KEY,
        version BIGINT NOT NULL,
        location TEXT NOT NULL,
        ordered_date TIMESTAMPTZ NOT NULL,
        status TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS rb_order_status_idx ON rb_order (status)",
    "CREATE TABLE IF NOT EXISTS line_item (
        order_id UUID NOT NULL REFERENCES rb_order (id) ON DELETE CASCADE,
        position INT NOT NULL,
        name TEXT NOT NULL,
        quantity INT NOT NULL CHECK (quantity > 0),
        milk TEXT NOT NULL,
        size TEXT NOT NULL,
        PRIMARY KEY (order_id, position),
        UNIQUE (order_id, name, quantity, milk, size)
    )",
    "CREATE TABLE IF NOT EXISTS app_user (
        id UUID PRIMARY KEY,
        version BIGINT NOT NULL,
        username TEXT NOT NULL,
        password TEXT NOT NULL,
        status TEXT
    )",
];

/// Opens a pool and creates the schema if needed.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, RepositoryError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    tracing::info!(max_connections, "Connected to PostgreSQL, schema ready");
    Ok(pool)
}

fn parse<T>(value: String) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| RepositoryError::Corrupt(e.to_string()))
}

fn map_write_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Constraint(db.message().to_string())
        }
        _ => RepositoryError::Database(err),
    }
}

fn line_item_from_row(row: &PgRow) -> Result<(Uuid, LineItem), RepositoryError> {
    let quantity: i32 = row.try_get("quantity")?;
    let quantity = u32::try_from(quantity)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| RepositoryError::Corrupt(format!("line item quantity {quantity}")))?;

    let item = LineItem::new(
        row.try_get::<String, _>("name")?,
        quantity,
        parse::<Milk>(row.try_get("milk")?)?,
        parse::<Size>(row.try_get("size")?)?,
    );
    Ok((row.try_get("order_id")?, item))
}

fn order_from_row(row: &PgRow, line_items: Vec<LineItem>) -> Result<Order, RepositoryError> {
    Ok(Order::restore(
        row.try_get("id")?,
        row.try_get("version")?,
        parse::<Location>(row.try_get("location")?)?,
        row.try_get::<DateTime<Utc>, _>("ordered_date")?,
        parse::<OrderStatus>(row.try_get("status")?)?,
        line_items,
    ))
}

fn user_from_row(row: &PgRow) -> Result<User, RepositoryError> {
    Ok(User::restore(
        row.try_get("id")?,
        row.try_get("version")?,
        row.try_get("username")?,
        row.try_get("password")?,
        row.try_get("status")?,
    ))
}

fn page_bounds(request: PageRequest) -> (i64, i64) {
    let limit = i64::from(request.size);
    let offset = i64::try_from(request.offset()).unwrap_or(i64::MAX);
    (limit, offset)
}

/// Looks up the stored version after a conditional update matched no row.
async fn conflict_or_missing(
    pool: &PgPool,
    table: &str,
    id: Uuid,
    expected: i64,
) -> RepositoryError {
    let query = format!("SELECT version FROM {table} WHERE id = $1");
    match sqlx::query_scalar::<_, i64>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(actual)) => RepositoryError::VersionConflict { expected, actual },
        Ok(None) => RepositoryError::NotFound(id),
        Err(e) => RepositoryError::Database(e),
    }
}

const SNAPSHOT_ISOLATION: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY";

/// Opens a transaction whose reads all see one snapshot, so a page and its
/// total count agree.
async fn begin_snapshot(pool: &PgPool) -> Result<Transaction<'static, Postgres>, RepositoryError> {
    let mut tx = pool.begin().await?;
    sqlx::query(SNAPSHOT_ISOLATION).execute(&mut *tx).await?;
    Ok(tx)
}

async fn load_line_items(
    conn: &mut PgConnection,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<LineItem>>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT order_id, position, name, quantity, milk, size
         FROM line_item
         WHERE order_id = ANY($1)
         ORDER BY order_id, position",
    )
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut items: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
    for row in &rows {
        let (order_id, item) = line_item_from_row(row)?;
        items.entry(order_id).or_default().push(item);
    }
    Ok(items)
}

/// Attaches line items to order rows read on the same connection.
async fn hydrate(conn: &mut PgConnection, rows: Vec<PgRow>) -> Result<Vec<Order>, RepositoryError> {
    let ids = rows
        .iter()
        .map(|row| row.try_get::<Uuid, _>("id"))
        .collect::<Result<Vec<_>, _>>()?;
    let mut items = load_line_items(conn, &ids).await?;

    rows.iter()
        .zip(ids)
        .map(|(row, id)| order_from_row(row, items.remove(&id).unwrap_or_default()))
        .collect()
}

#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, mut order: Order) -> Result<Order, RepositoryError> {
        let id = Uuid::now_v7();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO rb_order (id, version, location, ordered_date, status)
             VALUES ($1, 0, $2, $3, $4)",
        )
        .bind(id)
        .bind(order.location().as_str())
        .bind(order.ordered_date())
        .bind(order.status().as_str())
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.line_items().iter().enumerate() {
            let quantity = i32::try_from(item.quantity().get())
                .map_err(|_| RepositoryError::Constraint(format!("quantity too large for '{}'", item.name())))?;
            sqlx::query(
                "INSERT INTO line_item (order_id, position, name, quantity, milk, size)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(id)
            .bind(position as i32)
            .bind(item.name())
            .bind(quantity)
            .bind(item.milk().as_str())
            .bind(item.size().as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        }

        tx.commit().await?;
        order.assign_identity(id, 0);

        tracing::debug!(order_id = %id, items = order.line_items().len(), "Inserted order");
        Ok(order)
    }

    async fn update(&self, id: Uuid, mut order: Order) -> Result<Order, RepositoryError> {
        let expected = order.version();
        let result = sqlx::query(
            "UPDATE rb_order SET status = $1, version = version + 1
             WHERE id = $2 AND version = $3",
        )
        .bind(order.status().as_str())
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(conflict_or_missing(&self.pool, "rb_order", id, expected).await);
        }

        order.set_version(expected + 1);
        tracing::debug!(order_id = %id, version = expected + 1, status = %order.status(), "Updated order");
        Ok(order)
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn save(&self, order: Order) -> Result<Order, RepositoryError> {
        check_unique_line_items(&order)?;
        match order.id() {
            None => self.insert(order).await,
            Some(id) => self.update(id, order).await,
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        let mut tx = begin_snapshot(&self.pool).await?;
        let row = sqlx::query(
            "SELECT id, version, location, ordered_date, status FROM rb_order WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let order = match row {
            Some(row) => hydrate(&mut tx, vec![row]).await?.pop(),
            None => None,
        };
        tx.commit().await?;
        Ok(order)
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<Order>, RepositoryError> {
        let (limit, offset) = page_bounds(page);
        let mut tx = begin_snapshot(&self.pool).await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rb_order")
            .fetch_one(&mut *tx)
            .await?;

        let rows = sqlx::query(
            "SELECT id, version, location, ordered_date, status FROM rb_order
             ORDER BY id
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await?;

        let content = hydrate(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(Page::new(content, page, total.max(0) as u64))
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        let mut tx = begin_snapshot(&self.pool).await?;
        let rows = sqlx::query(
            "SELECT id, version, location, ordered_date, status FROM rb_order
             WHERE status = $1
             ORDER BY id",
        )
        .bind(status.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let orders = hydrate(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(orders)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM rb_order WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn delete_versioned(&self, id: Uuid, expected_version: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM rb_order WHERE id = $1 AND version = $2")
            .bind(id)
            .bind(expected_version)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(conflict_or_missing(&self.pool, "rb_order", id, expected_version).await);
        }
        tracing::debug!(order_id = %id, version = expected_version, "Deleted order");
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn save(&self, mut user: User) -> Result<User, RepositoryError> {
        match user.id() {
            None => {
                let id = Uuid::now_v7();
                sqlx::query(
                    "INSERT INTO app_user (id, version, username, password, status)
                     VALUES ($1, 0, $2, $3, $4)",
                )
                .bind(id)
                .bind(user.username())
                .bind(user.password())
                .bind(user.status())
                .execute(&self.pool)
                .await
                .map_err(map_write_error)?;

                user.assign_identity(id, 0);
            }
            Some(id) => {
                let expected = user.version();
                let result = sqlx::query(
                    "UPDATE app_user SET password = $1, version = version + 1
                     WHERE id = $2 AND version = $3",
                )
                .bind(user.password())
                .bind(id)
                .bind(expected)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(conflict_or_missing(&self.pool, "app_user", id, expected).await);
                }
                user.set_version(expected + 1);
            }
        }

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        sqlx::query("SELECT id, version, username, password, status FROM app_user WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<User>, RepositoryError> {
        let (limit, offset) = page_bounds(page);
        let mut tx = begin_snapshot(&self.pool).await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_user")
            .fetch_one(&mut *tx)
            .await?;

        let rows = sqlx::query(
            "SELECT id, version, username, password, status FROM app_user
             ORDER BY id
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let content = rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(content, page, total.max(0) as u64))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM app_user WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
//
// Queries need a live PostgreSQL instance; only the pure helpers are
// covered here.
//
// ============================================================================
