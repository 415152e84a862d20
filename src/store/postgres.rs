use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error as SqlxError, PgConnection, PgPool};
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::geo::Coordinates;
use crate::models::product::{
    BuyerAction, BuyerActionUpsert, NewProduct, NewTier, Product, ProductListing, ProductPatch,
    WholesaleTier,
};
use crate::models::user::{NewUser, Role, RoleUpdate, Seller, User};
use crate::store::MarketStore;

const USER_COLUMNS: &str = "u.id, u.username, u.password_hash, u.role, u.city, u.state,
    u.lat::FLOAT8 AS lat, u.lng::FLOAT8 AS lng, u.created_at, u.updated_at";

const PRODUCT_COLUMNS: &str = "p.id, p.seller_id, p.name, p.description, p.category,
    p.retail_price::FLOAT8    AS retail_price,
    p.wholesale_price::FLOAT8 AS wholesale_price,
    p.image_url, p.quantity, p.city, p.state,
    p.lat::FLOAT8 AS lat, p.lng::FLOAT8 AS lng,
    p.is_active, p.created_at, p.updated_at";

const SELLER_COLUMNS: &str = "u.id AS seller_user_id, u.username AS seller_username,
    u.role AS seller_role, u.city AS seller_city, u.state AS seller_state,
    u.lat::FLOAT8 AS seller_lat, u.lng::FLOAT8 AS seller_lng";

const TIER_COLUMNS: &str = "id, product_id, min_quantity,
    price_per_unit::FLOAT8 AS price_per_unit, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: Option<String>,
    city: Option<String>,
    state: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    seller_id: i64,
    name: String,
    description: Option<String>,
    category: Option<String>,
    retail_price: f64,
    wholesale_price: Option<f64>,
    image_url: Option<String>,
    quantity: i32,
    city: Option<String>,
    state: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    product: ProductRow,
    seller_user_id: i64,
    seller_username: String,
    seller_role: Option<String>,
    seller_city: Option<String>,
    seller_state: Option<String>,
    seller_lat: Option<f64>,
    seller_lng: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct TierRow {
    id: i64,
    product_id: i64,
    min_quantity: i32,
    price_per_unit: f64,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct BuyerActionRow {
    id: i64,
    buyer_id: i64,
    product_id: i64,
    saved: bool,
    viewed: bool,
    timestamp: DateTime<Utc>,
}

fn parse_role(role: Option<String>) -> AppResult<Option<Role>> {
    role.map(|r| r.parse::<Role>())
        .transpose()
        .map_err(|e| AppError::internal(format!("Stored role is invalid: {e}")))
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: parse_role(row.role)?,
            city: row.city,
            state: row.state,
            location: Coordinates::from_parts(row.lat, row.lng),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            seller_id: row.seller_id,
            name: row.name,
            description: row.description,
            category: row.category,
            retail_price: row.retail_price,
            wholesale_price: row.wholesale_price,
            image_url: row.image_url,
            quantity: row.quantity,
            city: row.city,
            state: row.state,
            location: Coordinates::from_parts(row.lat, row.lng),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl TryFrom<ListingRow> for ProductListing {
    type Error = AppError;

    fn try_from(row: ListingRow) -> AppResult<Self> {
        Ok(Self {
            seller: Seller {
                id: row.seller_user_id,
                username: row.seller_username,
                role: parse_role(row.seller_role)?,
                city: row.seller_city,
                state: row.seller_state,
                location: Coordinates::from_parts(row.seller_lat, row.seller_lng),
            },
            product: row.product.into(),
        })
    }
}

impl From<TierRow> for WholesaleTier {
    fn from(row: TierRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            min_quantity: row.min_quantity,
            price_per_unit: row.price_per_unit,
            created_at: row.created_at,
        }
    }
}

impl From<BuyerActionRow> for BuyerAction {
    fn from(row: BuyerActionRow) -> Self {
        Self {
            id: row.id,
            buyer_id: row.buyer_id,
            product_id: row.product_id,
            saved: row.saved,
            viewed: row.viewed,
            timestamp: row.timestamp,
        }
    }
}

fn map_unique_violation(err: SqlxError, message: &str) -> AppError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AppError::conflict(message)
        }
        other => other.into(),
    }
}

// Foreign key target vanished between the handler's lookup and the write.
fn map_foreign_key_violation(err: SqlxError, message: &str) -> AppError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
            AppError::not_found(message)
        }
        other => other.into(),
    }
}

/// `(set, value)` bind pair for a nullable PATCH column.
fn nullable<T>(field: &Option<Option<T>>) -> (bool, Option<&T>) {
    match field {
        Some(value) => (true, value.as_ref()),
        None => (false, None),
    }
}

async fn insert_tiers(conn: &mut PgConnection, product_id: i64, tiers: &[NewTier]) -> AppResult<()> {
    for tier in tiers {
        sqlx::query(
            "INSERT INTO wholesale_tiers (product_id, min_quantity, price_per_unit)
             VALUES ($1, $2, $3::FLOAT8)",
        )
        .bind(product_id)
        .bind(tier.min_quantity)
        .bind(tier.price_per_unit)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl MarketStore for PgStore {
    #[instrument(skip(self, new_user), fields(username = %new_user.username))]
    async fn create_user(&self, new_user: &NewUser) -> AppResult<User> {
        let (lat, lng) = split(new_user.location);
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users AS u (username, password_hash, role, city, state, lat, lng)
             VALUES ($1, $2, $3, $4, $5, $6::FLOAT8, $7::FLOAT8)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(new_user.role.map(|r| r.as_str()))
        .bind(&new_user.city)
        .bind(&new_user.state)
        .bind(lat)
        .bind(lng)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Username already exists"))?;

        row.try_into()
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    #[instrument(skip(self, update))]
    async fn update_user_role(&self, id: i64, update: &RoleUpdate) -> AppResult<Option<User>> {
        let (lat, lng) = split(update.location);
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users AS u SET
                role = $2,
                city = COALESCE($3, u.city),
                state = COALESCE($4, u.state),
                lat = COALESCE($5::FLOAT8, u.lat),
                lng = COALESCE($6::FLOAT8, u.lng),
                updated_at = NOW()
             WHERE u.id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.role.as_str())
        .bind(&update.city)
        .bind(&update.state)
        .bind(lat)
        .bind(lng)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    #[instrument(skip(self, product, tiers), fields(seller_id = product.seller_id, tiers = tiers.len()))]
    async fn create_product(&self, product: &NewProduct, tiers: &[NewTier]) -> AppResult<Product> {
        let (lat, lng) = split(product.location);
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products AS p
                (seller_id, name, description, category, retail_price, wholesale_price,
                 image_url, quantity, city, state, lat, lng)
             VALUES ($1, $2, $3, $4, $5::FLOAT8, $6::FLOAT8, $7, $8, $9, $10, $11::FLOAT8, $12::FLOAT8)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product.seller_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.retail_price)
        .bind(product.wholesale_price)
        .bind(&product.image_url)
        .bind(product.quantity)
        .bind(&product.city)
        .bind(&product.state)
        .bind(lat)
        .bind(lng)
        .fetch_one(&mut *tx)
        .await?;

        insert_tiers(&mut tx, row.id, tiers).await?;
        tx.commit().await?;

        Ok(row.into())
    }

    async fn get_product(&self, id: i64) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn list_products_by_seller(&self, seller_id: i64) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p
             WHERE p.seller_id = $1
             ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list_active_listings(&self) -> AppResult<Vec<ProductListing>> {
        sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {PRODUCT_COLUMNS}, {SELLER_COLUMNS}
             FROM products p
             JOIN users u ON p.seller_id = u.id
             WHERE p.is_active
             ORDER BY p.created_at DESC, p.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ProductListing::try_from)
        .collect()
    }

    async fn list_wholesale_listings(&self) -> AppResult<Vec<ProductListing>> {
        sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {PRODUCT_COLUMNS}, {SELLER_COLUMNS}
             FROM products p
             JOIN users u ON p.seller_id = u.id
             WHERE p.is_active AND u.role = 'wholesaler'
             ORDER BY p.created_at DESC, p.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ProductListing::try_from)
        .collect()
    }

    #[instrument(skip(self, patch, tiers), fields(replace_tiers = tiers.is_some()))]
    async fn update_product(
        &self,
        id: i64,
        patch: &ProductPatch,
        tiers: Option<&[NewTier]>,
    ) -> AppResult<Option<Product>> {
        let (set_description, description) = nullable(&patch.description);
        let (set_category, category) = nullable(&patch.category);
        let (set_wholesale, wholesale_price) = nullable(&patch.wholesale_price);
        let (set_image, image_url) = nullable(&patch.image_url);
        let (set_city, city) = nullable(&patch.city);
        let (set_state, state) = nullable(&patch.state);
        let (set_location, location) = nullable(&patch.location);
        let (lat, lng) = split(location.copied());
        let mut tx = self.pool.begin().await?;

        // Nullable columns take a (set, value) pair so an explicit null clears them.
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products AS p SET
                name = COALESCE($2, p.name),
                description = CASE WHEN $3 THEN $4 ELSE p.description END,
                category = CASE WHEN $5 THEN $6 ELSE p.category END,
                retail_price = COALESCE($7::FLOAT8, p.retail_price),
                wholesale_price = CASE WHEN $8 THEN $9::FLOAT8 ELSE p.wholesale_price END,
                image_url = CASE WHEN $10 THEN $11 ELSE p.image_url END,
                quantity = COALESCE($12, p.quantity),
                city = CASE WHEN $13 THEN $14 ELSE p.city END,
                state = CASE WHEN $15 THEN $16 ELSE p.state END,
                lat = CASE WHEN $17 THEN $18::FLOAT8 ELSE p.lat END,
                lng = CASE WHEN $17 THEN $19::FLOAT8 ELSE p.lng END,
                is_active = COALESCE($20, p.is_active),
                updated_at = NOW()
             WHERE p.id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(set_description)
        .bind(description)
        .bind(set_category)
        .bind(category)
        .bind(patch.retail_price)
        .bind(set_wholesale)
        .bind(wholesale_price.copied())
        .bind(set_image)
        .bind(image_url)
        .bind(patch.quantity)
        .bind(set_city)
        .bind(city)
        .bind(set_state)
        .bind(state)
        .bind(set_location)
        .bind(lat)
        .bind(lng)
        .bind(patch.is_active)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if let Some(tiers) = tiers {
            sqlx::query("DELETE FROM wholesale_tiers WHERE product_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_tiers(&mut tx, id, tiers).await?;
        }

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn delete_product(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_tiers(&self, product_id: i64) -> AppResult<Vec<WholesaleTier>> {
        let mut by_product = self.list_tiers_for(&[product_id]).await?;
        Ok(by_product.remove(&product_id).unwrap_or_default())
    }

    async fn list_tiers_for(&self, product_ids: &[i64]) -> AppResult<HashMap<i64, Vec<WholesaleTier>>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, TierRow>(&format!(
            "SELECT {TIER_COLUMNS} FROM wholesale_tiers
             WHERE product_id = ANY($1)
             ORDER BY product_id, min_quantity ASC, id ASC"
        ))
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut map: HashMap<i64, Vec<WholesaleTier>> = HashMap::new();
        for row in rows {
            map.entry(row.product_id).or_default().push(row.into());
        }
        Ok(map)
    }

    #[instrument(skip(self))]
    async fn upsert_buyer_action(&self, action: &BuyerActionUpsert) -> AppResult<BuyerAction> {
        let row = sqlx::query_as::<_, BuyerActionRow>(
            "INSERT INTO buyer_actions AS b (buyer_id, product_id, saved, viewed)
             VALUES ($1, $2, COALESCE($3::BOOLEAN, FALSE), $4)
             ON CONFLICT (buyer_id, product_id) DO UPDATE SET
                saved = COALESCE($3::BOOLEAN, b.saved),
                viewed = EXCLUDED.viewed,
                timestamp = NOW()
             RETURNING id, buyer_id, product_id, saved, viewed, timestamp",
        )
        .bind(action.buyer_id)
        .bind(action.product_id)
        .bind(action.saved)
        .bind(action.viewed)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_foreign_key_violation(e, "Product not found"))?;

        Ok(row.into())
    }

    async fn list_saved_products(&self, buyer_id: i64) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM buyer_actions b
             JOIN products p ON b.product_id = p.id
             WHERE b.buyer_id = $1 AND b.saved
             ORDER BY b.timestamp DESC, b.id DESC"
        ))
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn count_views_for(&self, product_ids: &[i64]) -> AppResult<HashMap<i64, i64>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT product_id, COUNT(*) AS views
             FROM buyer_actions
             WHERE product_id = ANY($1) AND viewed
             GROUP BY product_id",
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

fn split(location: Option<Coordinates>) -> (Option<f64>, Option<f64>) {
    match location {
        Some(c) => (Some(c.lat), Some(c.lng)),
        None => (None, None),
    }
}
