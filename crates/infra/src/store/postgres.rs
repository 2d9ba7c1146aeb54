//! Postgres storage backend.
//!
//! All placement work runs on one `sqlx::Transaction`; an uncommitted
//! transaction is rolled back by sqlx when dropped.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (foreign key violation) | `23503` | `Database` (referenced row missing) |
//! | Database (check constraint violation) | `23514` | `Database` (constraint name in message) |
//! | Database (other) | Any other | `Database` |
//! | PoolClosed | N/A | `Database` |
//! | Other | N/A | `Database` |
//!
//! Missing rows are never reported by sqlx here: every single-row lookup uses
//! `fetch_optional` and turns `None` into `StoreError::NotFound`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use storefront_core::{Money, OrderId, ProductId, UserId};
use storefront_inventory::{InsufficientStock, StockLevel, StockReservation};
use storefront_orders::{NewOrder, Order, OrderItem, OrderStatus};

use super::r#trait::{CartStore, InventoryLedger, OrderStore, StoreError, UnitOfWork};

const SCHEMA: &str = include_str!("schema.sql");

const ORDER_COLUMNS: &str = "id, user_id, amount_minor, shipping_amount_minor, shipping_address, \
     status, updated_by, created_at, updated_at";

const ITEM_COLUMNS: &str = "order_id, product_id, quantity, price_minor, color, size";

/// Transaction handle used by every Postgres component.
pub type PgTx = Transaction<'static, Postgres>;

/// Owner of the connection pool; hands out the per-concern components.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: Arc<PgPool>,
}

impl PgDatabase {
    /// Connect with at most `max_connections` pooled connections. The pool
    /// size is the only bound on concurrent placements.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn unit_of_work(&self) -> PgUnitOfWork {
        PgUnitOfWork {
            pool: self.pool.clone(),
        }
    }

    pub fn ledger(&self) -> PgInventoryLedger {
        PgInventoryLedger
    }

    pub fn orders(&self) -> PgOrderStore {
        PgOrderStore {
            pool: self.pool.clone(),
        }
    }

    pub fn carts(&self) -> PgCartStore {
        PgCartStore
    }

    /// Create or overwrite a product's stock counter.
    pub async fn put_product(&self, product_id: ProductId, quantity: u32) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, quantity)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
            "#,
        )
        .bind(product_id.get())
        .bind(to_db_quantity(quantity)?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_product", e))?;
        Ok(())
    }

    pub async fn stock_of(&self, product_id: ProductId) -> Result<Option<u32>, StoreError> {
        let row = sqlx::query("SELECT quantity FROM products WHERE id = $1")
            .bind(product_id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("stock_of", e))?;

        row.map(|r| read_quantity(&r, "products", "quantity")).transpose()
    }

    /// Add `quantity` of a product to a user's cart (accumulates).
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(user_id.get())
        .bind(product_id.get())
        .bind(to_db_quantity(quantity)?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_to_cart", e))?;
        Ok(())
    }

    pub async fn cart_of(&self, user_id: UserId) -> Result<Vec<(ProductId, u32)>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY product_id",
        )
        .bind(user_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_of", e))?;

        rows.iter()
            .map(|row| {
                let product_id: i64 = row
                    .try_get("product_id")
                    .map_err(|e| corrupt("cart_items", e))?;
                Ok((
                    ProductId::new(product_id),
                    read_quantity(row, "cart_items", "quantity")?,
                ))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PgUnitOfWork {
    pool: Arc<PgPool>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    async fn commit(&self, tx: PgTx) -> Result<(), StoreError> {
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(&self, tx: PgTx) -> Result<(), StoreError> {
        tx.rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PgInventoryLedger;

#[async_trait]
impl InventoryLedger<PgTx> for PgInventoryLedger {
    async fn stock(&self, tx: &mut PgTx, product_id: ProductId) -> Result<StockLevel, StoreError> {
        let row = sqlx::query("SELECT quantity FROM products WHERE id = $1")
            .bind(product_id.get())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("read_stock", e))?
            .ok_or_else(|| StoreError::product_not_found(product_id))?;

        Ok(StockLevel::new(
            product_id,
            read_quantity(&row, "products", "quantity")?,
        ))
    }

    /// The decrement is one conditional `UPDATE`: the row lock it takes makes
    /// concurrent reservations of the same product queue behind this
    /// transaction, and the `quantity >= $2` guard is re-evaluated against the
    /// committed value once the lock is granted.
    #[instrument(
        skip(self, tx),
        fields(
            operation = "check_and_reserve",
            product_id = %reservation.product_id(),
            quantity = reservation.quantity(),
            available = tracing::field::Empty
        ),
        err
    )]
    async fn check_and_reserve(
        &self,
        tx: &mut PgTx,
        reservation: &StockReservation,
    ) -> Result<StockLevel, StoreError> {
        let product_id = reservation.product_id();

        let row = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity - $2, updated_at = NOW()
            WHERE id = $1 AND quantity >= $2
            RETURNING quantity
            "#,
        )
        .bind(product_id.get())
        .bind(to_db_quantity(reservation.quantity())?)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("reserve_stock", e))?;

        if let Some(row) = row {
            return Ok(StockLevel::new(
                product_id,
                read_quantity(&row, "products", "quantity")?,
            ));
        }

        // Zero rows: either the product is absent or it is short.
        let current = self.stock(tx, product_id).await?;
        Span::current().record("available", current.available);
        Err(InsufficientStock {
            product_id,
            available: current.available,
            requested: reservation.quantity(),
        }
        .into())
    }
}

#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: Arc<PgPool>,
}

impl PgOrderStore {
    async fn fetch_orders(
        &self,
        operation: &'static str,
        filter: &str,
        bind: Option<BindValue<'_>>,
    ) -> Result<Vec<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders {filter} ORDER BY id");
        let mut query = sqlx::query(&sql);
        query = match bind {
            Some(BindValue::Int(v)) => query.bind(v),
            Some(BindValue::Text(v)) => query.bind(v),
            None => query,
        };

        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let orders = rows
            .iter()
            .map(|row| {
                OrderRow::from_row(row)
                    .map_err(|e| corrupt("orders", e))
                    .and_then(Order::try_from)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Span::current().record("row_count", orders.len());
        Ok(orders)
    }

    async fn fetch_items(
        &self,
        operation: &'static str,
        column: &str,
        value: i64,
    ) -> Result<Vec<OrderItem>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE {column} = $1 ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(value)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        rows.iter()
            .map(|row| {
                OrderItemRow::from_row(row)
                    .map_err(|e| corrupt("order_items", e))
                    .and_then(OrderItem::try_from)
            })
            .collect()
    }
}

enum BindValue<'a> {
    Int(i64),
    Text(&'a str),
}

#[async_trait]
impl OrderStore<PgTx> for PgOrderStore {
    #[instrument(skip(self, tx, order), fields(operation = "insert_order", user_id = %order.user_id), err)]
    async fn insert(&self, tx: &mut PgTx, order: &NewOrder) -> Result<Order, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO orders (
                user_id,
                amount_minor,
                shipping_amount_minor,
                shipping_address,
                status,
                updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $1)
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(order.user_id.get())
            .bind(order.amount.minor_units())
            .bind(order.shipping_amount.minor_units())
            .bind(&order.shipping_address)
            .bind(OrderStatus::INITIAL.as_str())
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order", e))?;

        let order = OrderRow::from_row(&row)
            .map_err(|e| corrupt("orders", e))
            .and_then(Order::try_from)?;
        Span::current().record("order_id", order.id.get());
        Ok(order)
    }

    #[instrument(
        skip(self, tx, item),
        fields(operation = "insert_item", order_id = %item.order_id, product_id = %item.product_id),
        err
    )]
    async fn insert_item(&self, tx: &mut PgTx, item: &OrderItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price_minor, color, size)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.order_id.get())
        .bind(item.product_id.get())
        .bind(to_db_quantity(item.quantity)?)
        .bind(item.price.minor_units())
        .bind(item.color.as_deref())
        .bind(item.size.as_deref())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(operation = "get_order", order_id = %id), err)]
    async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?
            .ok_or_else(|| StoreError::order_not_found(id))?;

        OrderRow::from_row(&row)
            .map_err(|e| corrupt("orders", e))
            .and_then(Order::try_from)
    }

    #[instrument(skip(self), fields(operation = "list_items", order_id = %order_id), err)]
    async fn list_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        self.fetch_items("list_items", "order_id", order_id.get()).await
    }

    #[instrument(skip(self, order_ids), fields(operation = "list_items_for", order_count = order_ids.len()), err)]
    async fn list_items_for(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItem>, StoreError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = order_ids.iter().map(|id| id.get()).collect();
        let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items_for", e))?;

        rows.iter()
            .map(|row| {
                OrderItemRow::from_row(row)
                    .map_err(|e| corrupt("order_items", e))
                    .and_then(OrderItem::try_from)
            })
            .collect()
    }

    #[instrument(skip(self), fields(operation = "list_product_items", product_id = %product_id), err)]
    async fn list_product_items(&self, product_id: ProductId) -> Result<Vec<OrderItem>, StoreError> {
        self.fetch_items("list_product_items", "product_id", product_id.get())
            .await
    }

    #[instrument(skip(self), fields(operation = "list_orders", row_count), err)]
    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        self.fetch_orders("list_orders", "", None).await
    }

    #[instrument(skip(self), fields(operation = "list_orders_by_status", %status, row_count), err)]
    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError> {
        self.fetch_orders(
            "list_orders_by_status",
            "WHERE status = $1",
            Some(BindValue::Text(status.as_str())),
        )
        .await
    }

    #[instrument(skip(self), fields(operation = "list_orders_by_user", %user_id, row_count), err)]
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        self.fetch_orders(
            "list_orders_by_user",
            "WHERE user_id = $1",
            Some(BindValue::Int(user_id.get())),
        )
        .await
    }

    #[instrument(skip(self), fields(operation = "update_status", order_id = %id, %status), err)]
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        updated_by: UserId,
    ) -> Result<Order, StoreError> {
        let sql = format!(
            r#"
            UPDATE orders
            SET status = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(status.as_str())
            .bind(updated_by.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_status", e))?
            .ok_or_else(|| StoreError::order_not_found(id))?;

        OrderRow::from_row(&row)
            .map_err(|e| corrupt("orders", e))
            .and_then(Order::try_from)
    }

    #[instrument(skip(self), fields(operation = "delete_order", order_id = %id), err)]
    async fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PgCartStore;

#[async_trait]
impl CartStore<PgTx> for PgCartStore {
    #[instrument(skip(self, tx), fields(operation = "clear_cart", %user_id), err)]
    async fn clear(&self, tx: &mut PgTx, user_id: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.get())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;
        Ok(result.rows_affected())
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    let message = match err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23503") => format!("referenced row missing: {}", db_err.message()),
            Some("23514") => format!(
                "check constraint {} violated: {}",
                db_err.constraint().unwrap_or("<unnamed>"),
                db_err.message()
            ),
            _ => db_err.message().to_string(),
        },
        sqlx::Error::PoolClosed => "connection pool closed".to_string(),
        other => other.to_string(),
    };
    StoreError::Database { operation, message }
}

fn corrupt(table: &'static str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        table,
        message: err.to_string(),
    }
}

fn read_quantity(row: &PgRow, table: &'static str, column: &str) -> Result<u32, StoreError> {
    let raw: i32 = row.try_get(column).map_err(|e| corrupt(table, e))?;
    u32::try_from(raw).map_err(|_| corrupt(table, format!("negative {column}: {raw}")))
}

fn to_db_quantity(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity).map_err(|_| StoreError::Database {
        operation: "bind_quantity",
        message: format!("quantity {quantity} exceeds the column range"),
    })
}

// SQLx row types

#[derive(Debug)]
struct OrderRow {
    id: i64,
    user_id: i64,
    amount_minor: i64,
    shipping_amount_minor: i64,
    shipping_address: String,
    status: String,
    updated_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            amount_minor: row.try_get("amount_minor")?,
            shipping_amount_minor: row.try_get("shipping_amount_minor")?,
            shipping_address: row.try_get("shipping_address")?,
            status: row.try_get("status")?,
            updated_by: row.try_get("updated_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<OrderStatus>().map_err(|e| corrupt("orders", e))?;
        Ok(Order {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            amount: Money::from_minor(row.amount_minor),
            shipping_amount: Money::from_minor(row.shipping_amount_minor),
            shipping_address: row.shipping_address,
            status,
            updated_by: UserId::new(row.updated_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug)]
struct OrderItemRow {
    order_id: i64,
    product_id: i64,
    quantity: i32,
    price_minor: i64,
    color: Option<String>,
    size: Option<String>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for OrderItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderItemRow {
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            price_minor: row.try_get("price_minor")?,
            color: row.try_get("color")?,
            size: row.try_get("size")?,
        })
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| corrupt("order_items", format!("negative quantity: {}", row.quantity)))?;
        Ok(OrderItem {
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            quantity,
            price: Money::from_minor(row.price_minor),
            color: row.color,
            size: row.size,
        })
    }
}
