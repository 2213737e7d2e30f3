use actix_web::{HttpRequest, http::header::AUTHORIZATION, web};
use sea_orm::EntityTrait;

use crate::{
    app_state::AppState,
    database::models::user,
    errors::AppError,
    services::jwt::{Claims, TokenKind},
};

/// The authenticated caller of a protected route.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub claims: Claims,
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Expected a Bearer token".to_string()))
}

/// Validates the access token on `req`.
pub fn resolve_auth_context(
    req: &HttpRequest,
    app_state: &web::Data<AppState>,
) -> Result<AuthContext, AppError> {
    let token = bearer_token(req)?;
    let claims = app_state.jwt.verify(token, TokenKind::Access)?;
    Ok(AuthContext {
        user_id: claims.sub,
        claims,
    })
}

/// Loads the caller's row; a token for a deleted user is treated as unauthenticated.
pub async fn load_current_user(
    ctx: &AuthContext,
    app_state: &web::Data<AppState>,
) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(ctx.user_id)
        .one(&app_state.db)
        .await?
        .ok_or_else(|| {
            log::warn!("Token presented for missing user {}", ctx.user_id);
            AppError::Unauthorized("User no longer exists".to_string())
        })
}
