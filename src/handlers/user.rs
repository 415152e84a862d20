use bcrypt::{hash, verify};
use crate::dtos::user::{RegisterUserRequest, UserResponse, LoginRequest, LoginResponse, UpdateRoleRequest};
use crate::dtos::{clean, ValidatedJson};
use crate::auth::jwt::sign_token;
use crate::error::AppError;
use crate::geo::Coordinates;
use crate::handlers::current_user;
use crate::models::user::{NewUser, Role, RoleUpdate};
use axum::{extract::State, http::StatusCode, Json};
use crate::state::AppState;
use crate::middleware::auth::AuthContext;
use axum::extract::Extension;
use tracing::{info, instrument};

fn parse_role(role: &str) -> Result<Role, AppError> {
    role.parse()
        .map_err(|_| AppError::invalid_field("role", "Invalid role"))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::invalid_field("username", "Username required"));
    }
    let role = payload.role.as_deref().map(parse_role).transpose()?;
    let location = Coordinates::parse_pair(payload.lat, payload.lng)?;

    let password_hash = hash(&payload.password, state.config.bcrypt_cost)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;

    let user = state
        .store
        .create_user(&NewUser {
            username,
            password_hash,
            role,
            city: clean(payload.city),
            state: clean(payload.state),
            location,
        })
        .await?;

    info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .store
        .get_user_by_username(payload.username.trim())
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    let ok = verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))?;

    if !ok {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let config = &state.config;
    let token = sign_token(user.id, &user.username, &config.jwt_secret, config.token_ttl_hours)?;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in_seconds: config.token_ttl_seconds(),
    }))
}

// Authenticated endpoint: returns full user profile using the id in AuthContext
pub async fn get_me(
    State(AppState { store, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>
) -> Result<Json<UserResponse>, AppError> {
    let user = current_user(store.as_ref(), &auth).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(store, auth, payload), fields(user_id = auth.user_id))]
pub async fn update_role(
    State(AppState { store, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let update = RoleUpdate {
        role: parse_role(&payload.role)?,
        city: clean(payload.city),
        state: clean(payload.state),
        location: Coordinates::parse_pair(payload.lat, payload.lng)?,
    };

    let user = store
        .update_user_role(auth.user_id, &update)
        .await?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

    info!(role = %update.role, "Role updated");
    Ok(Json(user.into()))
}
