pub mod buyer;
pub mod compare;
pub mod product;
pub mod user;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::user::User;
use crate::store::MarketStore;

/// Loads the caller's current profile; a token for a deleted user is rejected.
pub(crate) async fn current_user(store: &dyn MarketStore, auth: &AuthContext) -> Result<User, AppError> {
    store
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))
}
