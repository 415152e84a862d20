use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::models::product::{
    BuyerAction, BuyerActionUpsert, NewProduct, NewTier, Product, ProductListing, ProductPatch,
    WholesaleTier,
};
use crate::models::user::{NewUser, Role, RoleUpdate, Seller, User};
use crate::store::MarketStore;
use crate::tiers::sort_tiers;

/// In-process store with the same ordering and cascade rules as the
/// PostgreSQL schema.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: Vec<User>,
    products: Vec<Product>,
    tiers: Vec<WholesaleTier>,
    actions: Vec<BuyerAction>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_tiers(&mut self, product_id: i64, tiers: &[NewTier]) {
        for tier in tiers {
            let id = self.next_id();
            self.tiers.push(WholesaleTier {
                id,
                product_id,
                min_quantity: tier.min_quantity,
                price_per_unit: tier.price_per_unit,
                created_at: Utc::now(),
            });
        }
    }

    fn listings(&self, keep: impl Fn(&Product, &User) -> bool) -> Vec<ProductListing> {
        let mut listings: Vec<ProductListing> = self
            .products
            .iter()
            .filter(|p| p.is_active)
            .filter_map(|p| {
                let seller = self.users.iter().find(|u| u.id == p.seller_id)?;
                keep(p, seller).then(|| ProductListing { product: p.clone(), seller: Seller::from(seller) })
            })
            .collect();
        listings.sort_by(|a, b| newest_first(&a.product, &b.product));
        listings
    }
}

fn newest_first(a: &Product, b: &Product) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn create_user(&self, new_user: &NewUser) -> AppResult<User> {
        let mut inner = self.inner.lock().await;
        if inner.users.iter().any(|u| u.username == new_user.username) {
            return Err(AppError::conflict("Username already exists"));
        }

        let now = Utc::now();
        let user = User {
            id: inner.next_id(),
            username: new_user.username.clone(),
            password_hash: new_user.password_hash.clone(),
            role: new_user.role,
            city: new_user.city.clone(),
            state: new_user.state.clone(),
            location: new_user.location,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn update_user_role(&self, id: i64, update: &RoleUpdate) -> AppResult<Option<User>> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        user.role = Some(update.role);
        if update.city.is_some() {
            user.city = update.city.clone();
        }
        if update.state.is_some() {
            user.state = update.state.clone();
        }
        if update.location.is_some() {
            user.location = update.location;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn create_product(&self, product: &NewProduct, tiers: &[NewTier]) -> AppResult<Product> {
        let mut inner = self.inner.lock().await;
        if !inner.users.iter().any(|u| u.id == product.seller_id) {
            return Err(AppError::internal("products.seller_id references a missing user"));
        }

        let now = Utc::now();
        let created = Product {
            id: inner.next_id(),
            seller_id: product.seller_id,
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            retail_price: product.retail_price,
            wholesale_price: product.wholesale_price,
            image_url: product.image_url.clone(),
            quantity: product.quantity,
            city: product.city.clone(),
            state: product.state.clone(),
            location: product.location,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.products.push(created.clone());
        inner.insert_tiers(created.id, tiers);
        Ok(created)
    }

    async fn get_product(&self, id: i64) -> AppResult<Option<Product>> {
        let inner = self.inner.lock().await;
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products_by_seller(&self, seller_id: i64) -> AppResult<Vec<Product>> {
        let inner = self.inner.lock().await;
        let mut products: Vec<Product> =
            inner.products.iter().filter(|p| p.seller_id == seller_id).cloned().collect();
        products.sort_by(newest_first);
        Ok(products)
    }

    async fn list_active_listings(&self) -> AppResult<Vec<ProductListing>> {
        let inner = self.inner.lock().await;
        Ok(inner.listings(|_, _| true))
    }

    async fn list_wholesale_listings(&self) -> AppResult<Vec<ProductListing>> {
        let inner = self.inner.lock().await;
        Ok(inner.listings(|_, seller| seller.role == Some(Role::Wholesaler)))
    }

    async fn update_product(
        &self,
        id: i64,
        patch: &ProductPatch,
        tiers: Option<&[NewTier]>,
    ) -> AppResult<Option<Product>> {
        let mut inner = self.inner.lock().await;
        let Some(product) = inner.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            product.name = name.clone();
        }
        if let Some(description) = &patch.description {
            product.description = description.clone();
        }
        if let Some(category) = &patch.category {
            product.category = category.clone();
        }
        if let Some(price) = patch.retail_price {
            product.retail_price = price;
        }
        if let Some(price) = patch.wholesale_price {
            product.wholesale_price = price;
        }
        if let Some(image_url) = &patch.image_url {
            product.image_url = image_url.clone();
        }
        if let Some(quantity) = patch.quantity {
            product.quantity = quantity;
        }
        if let Some(city) = &patch.city {
            product.city = city.clone();
        }
        if let Some(state) = &patch.state {
            product.state = state.clone();
        }
        if let Some(location) = patch.location {
            product.location = location;
        }
        if let Some(active) = patch.is_active {
            product.is_active = active;
        }
        product.updated_at = Utc::now();
        let updated = product.clone();

        if let Some(tiers) = tiers {
            inner.tiers.retain(|t| t.product_id != id);
            inner.insert_tiers(id, tiers);
        }

        Ok(Some(updated))
    }

    async fn delete_product(&self, id: i64) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.products.len();
        inner.products.retain(|p| p.id != id);
        if inner.products.len() == before {
            return Ok(false);
        }

        inner.tiers.retain(|t| t.product_id != id);
        inner.actions.retain(|a| a.product_id != id);
        Ok(true)
    }

    async fn list_tiers(&self, product_id: i64) -> AppResult<Vec<WholesaleTier>> {
        let mut by_product = self.list_tiers_for(&[product_id]).await?;
        Ok(by_product.remove(&product_id).unwrap_or_default())
    }

    async fn list_tiers_for(&self, product_ids: &[i64]) -> AppResult<HashMap<i64, Vec<WholesaleTier>>> {
        let inner = self.inner.lock().await;
        let mut map: HashMap<i64, Vec<WholesaleTier>> = HashMap::new();
        for tier in inner.tiers.iter().filter(|t| product_ids.contains(&t.product_id)) {
            map.entry(tier.product_id).or_default().push(tier.clone());
        }
        for tiers in map.values_mut() {
            sort_tiers(tiers);
        }
        Ok(map)
    }

    async fn upsert_buyer_action(&self, action: &BuyerActionUpsert) -> AppResult<BuyerAction> {
        let mut inner = self.inner.lock().await;
        if !inner.products.iter().any(|p| p.id == action.product_id) {
            return Err(AppError::not_found("Product not found"));
        }
        let now = Utc::now();

        if let Some(existing) = inner
            .actions
            .iter_mut()
            .find(|a| a.buyer_id == action.buyer_id && a.product_id == action.product_id)
        {
            if let Some(saved) = action.saved {
                existing.saved = saved;
            }
            existing.viewed = action.viewed;
            existing.timestamp = now;
            return Ok(existing.clone());
        }

        let created = BuyerAction {
            id: inner.next_id(),
            buyer_id: action.buyer_id,
            product_id: action.product_id,
            saved: action.saved.unwrap_or(false),
            viewed: action.viewed,
            timestamp: now,
        };
        inner.actions.push(created.clone());
        Ok(created)
    }

    async fn list_saved_products(&self, buyer_id: i64) -> AppResult<Vec<Product>> {
        let inner = self.inner.lock().await;
        let mut saved: Vec<&BuyerAction> =
            inner.actions.iter().filter(|a| a.buyer_id == buyer_id && a.saved).collect();
        saved.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        Ok(saved
            .into_iter()
            .filter_map(|a| inner.products.iter().find(|p| p.id == a.product_id).cloned())
            .collect())
    }

    async fn count_views_for(&self, product_ids: &[i64]) -> AppResult<HashMap<i64, i64>> {
        let inner = self.inner.lock().await;
        let mut counts = HashMap::new();
        for action in inner.actions.iter().filter(|a| a.viewed && product_ids.contains(&a.product_id)) {
            *counts.entry(action.product_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
