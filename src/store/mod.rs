//! Persistence seam. Handlers only see [`MarketStore`]; PostgreSQL backs it
//! in production and [`MemoryStore`] backs the test-suite.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::product::{
    BuyerAction, BuyerActionUpsert, NewProduct, NewTier, Product, ProductListing, ProductPatch,
    WholesaleTier,
};
use crate::models::user::{NewUser, RoleUpdate, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, new_user: &NewUser) -> AppResult<User>;
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn update_user_role(&self, id: i64, update: &RoleUpdate) -> AppResult<Option<User>>;

    /// Inserts the product and its tiers as one unit.
    async fn create_product(&self, product: &NewProduct, tiers: &[NewTier]) -> AppResult<Product>;
    async fn get_product(&self, id: i64) -> AppResult<Option<Product>>;
    /// All of a seller's products, newest first.
    async fn list_products_by_seller(&self, seller_id: i64) -> AppResult<Vec<Product>>;
    /// Active products joined with their sellers, newest first.
    async fn list_active_listings(&self) -> AppResult<Vec<ProductListing>>;
    /// Active products of sellers with the wholesaler role, newest first.
    async fn list_wholesale_listings(&self) -> AppResult<Vec<ProductListing>>;
    /// Applies `patch`; when `tiers` is given the existing tiers are replaced
    /// in the same unit of work.
    async fn update_product(
        &self,
        id: i64,
        patch: &ProductPatch,
        tiers: Option<&[NewTier]>,
    ) -> AppResult<Option<Product>>;
    /// Returns false when nothing was deleted.
    async fn delete_product(&self, id: i64) -> AppResult<bool>;

    /// Tiers ascending by minimum quantity.
    async fn list_tiers(&self, product_id: i64) -> AppResult<Vec<WholesaleTier>>;
    async fn list_tiers_for(&self, product_ids: &[i64]) -> AppResult<HashMap<i64, Vec<WholesaleTier>>>;

    async fn upsert_buyer_action(&self, action: &BuyerActionUpsert) -> AppResult<BuyerAction>;
    /// Products the buyer has saved, most recently touched first.
    async fn list_saved_products(&self, buyer_id: i64) -> AppResult<Vec<Product>>;
    async fn count_views_for(&self, product_ids: &[i64]) -> AppResult<HashMap<i64, i64>>;
}
