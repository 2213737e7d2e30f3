use actix_web::{HttpRequest, HttpResponse, get, put, web};
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    api::{
        context::{load_current_user, resolve_auth_context},
        validation::require_name,
    },
    app_state::AppState,
    database::models::user,
    errors::AppError,
};

// --- DTOs ---

/// Public view of a user; never includes credentials.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mfa_enabled: bool,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&user::Model> for UserProfile {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            email: model.email.clone(),
            mfa_enabled: model.mfa_enabled,
            created_at: model.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema, Clone)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

// --- Route Handlers ---

#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile of the authenticated user", body = UserProfile),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[get("/profile")]
pub async fn get_profile(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let ctx = resolve_auth_context(&req, &app_state)?;
    let current = load_current_user(&ctx, &app_state).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(&current)))
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Blank or oversized name"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[put("/profile")]
pub async fn update_profile(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let ctx = resolve_auth_context(&req, &app_state)?;
    let payload = body.into_inner();

    let first_name = payload
        .first_name
        .as_deref()
        .map(|v| require_name("first_name", v))
        .transpose()?;
    let last_name = payload
        .last_name
        .as_deref()
        .map(|v| require_name("last_name", v))
        .transpose()?;

    let current = load_current_user(&ctx, &app_state).await?;
    if first_name.is_none() && last_name.is_none() {
        return Ok(HttpResponse::Ok().json(UserProfile::from(&current)));
    }

    let mut active = current.into_active_model();
    if let Some(first_name) = first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = last_name {
        active.last_name = Set(last_name);
    }
    let updated = active.update(&app_state.db).await?;

    log::info!("User {} updated their profile", updated.id);
    Ok(HttpResponse::Ok().json(UserProfile::from(&updated)))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .service(get_profile)
            .service(update_profile),
    );
}
