use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BuyerId, OrderId, ProductId, SupplierId};
use domain::{DomainError, Money, Order, OrderItem, OrderStatus, Product};
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    Result, StoreError, TransactionState,
    store::{OrderStore, StoreTransaction, ensure_open},
};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

const ORDER_COLUMNS: &str = "id, buyer_id, supplier_id, total_cents, status, created_at";

/// PostgreSQL-backed store implementation.
///
/// Stock is guarded by row locks: a transaction re-reads a product with
/// `SELECT ... FOR UPDATE`, so concurrent checkouts touching the same product
/// queue behind each other and each sees the stock left by the previous one.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Opens a connection pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Sets how long a transaction may wait for a row lock before it fails
    /// with `StoreError::Conflict`.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
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

    fn row_to_product(row: &PgRow) -> Result<Product> {
        let id = ProductId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let stock = Product::stock_from_db(id, row.try_get("stock")?)?;

        Ok(Product {
            id,
            supplier_id: SupplierId::from_uuid(row.try_get::<Uuid, _>("supplier_id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<(OrderId, OrderItem)> {
        let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?);
        let product_id = ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?);
        let quantity = OrderItem::quantity_from_db(product_id, row.try_get("quantity")?)?;

        Ok((
            order_id,
            OrderItem::new(
                product_id,
                quantity,
                Money::from_cents(row.try_get("unit_price_cents")?),
            ),
        ))
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status: String = row.try_get("status")?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            buyer_id: BuyerId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            supplier_id: SupplierId::from_uuid(row.try_get::<Uuid, _>("supplier_id")?),
            items,
            total_amount: Money::from_cents(row.try_get("total_cents")?),
            status: OrderStatus::parse(&status).ok_or(DomainError::UnknownStatus(status))?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    /// Attaches items to already-fetched order rows, preserving row order.
    async fn hydrate_orders(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<_, _>>()?;

        let item_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let (order_id, item) = Self::row_to_item(row)?;
            items.entry(order_id).or_default().push(item);
        }

        rows.iter()
            .map(|row| {
                let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
                Self::row_to_order(row, items.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    type Transaction = PgStoreTransaction;

    async fn begin(&self) -> Result<PgStoreTransaction> {
        let mut tx = self.pool.begin().await?;

        // SET does not take bind parameters; the value is an integer we format.
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;

        Ok(PgStoreTransaction {
            tx: Some(tx),
            state: TransactionState::Open,
        })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, supplier_id, name, price_cents, stock
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, supplier_id, name, price_cents, stock
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, supplier_id, name, price_cents, stock)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price_cents = EXCLUDED.price_cents,
                stock = EXCLUDED.stock,
                updated_at = NOW()
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.supplier_id.as_uuid())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(buyer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_orders(rows).await
    }

    async fn orders_for_supplier(&self, supplier_id: SupplierId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE supplier_id = $1 ORDER BY created_at DESC"
        ))
        .bind(supplier_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_orders(rows).await
    }
}

/// A transaction over [`PostgresOrderStore`].
///
/// Wraps a `sqlx` transaction, which rolls back when dropped uncommitted.
pub struct PgStoreTransaction {
    tx: Option<Transaction<'static, Postgres>>,
    state: TransactionState,
}

impl PgStoreTransaction {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        ensure_open(self.state)?;
        self.tx.as_mut().ok_or(StoreError::InvalidTransactionState {
            expected: TransactionState::Open,
            actual: self.state,
        })
    }

    fn take(&mut self) -> Result<Transaction<'static, Postgres>> {
        ensure_open(self.state)?;
        self.tx.take().ok_or(StoreError::InvalidTransactionState {
            expected: TransactionState::Open,
            actual: self.state,
        })
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    fn state(&self) -> TransactionState {
        self.state
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let tx = self.tx()?;
        let row = sqlx::query(
            r#"
            SELECT id, supplier_id, name, price_cents, stock
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;

        row.as_ref()
            .map(PostgresOrderStore::row_to_product)
            .transpose()
    }

    async fn set_stock(&mut self, id: ProductId, stock: u32) -> Result<()> {
        let tx = self.tx()?;
        sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(i64::from(stock))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let tx = self.tx()?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, buyer_id, supplier_id, total_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(order.supplier_id.as_uuid())
        .bind(order.total_amount.cents())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&mut **tx)
        .await?;

        for (line_no, item) in order.items.iter().enumerate() {
            let line_no = i32::try_from(line_no)
                .map_err(|err| StoreError::Database(sqlx::Error::Encode(Box::new(err))))?;
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, line_no, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line_no)
            .bind(item.product_id.as_uuid())
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self.take()?;
        match tx.commit().await {
            Ok(()) => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(e) => {
                self.state = TransactionState::Aborted;
                Err(e.into())
            }
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self.take()?;
        self.state = TransactionState::Aborted;
        tx.rollback().await?;
        Ok(())
    }
}
