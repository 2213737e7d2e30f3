use actix_web::{HttpRequest, HttpResponse, get, patch, web};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    api::context::{AuthContext, resolve_auth_context},
    app_state::AppState,
    database::{models::card, types::CardStatus},
    errors::AppError,
};

#[derive(Deserialize, ToSchema, Clone)]
pub struct UpdateCardStatusRequest {
    pub status: CardStatus,
}

/// Cards are only visible to their owner; anything else looks like a missing card.
async fn find_owned_card(
    app_state: &AppState,
    ctx: &AuthContext,
    card_id: i64,
) -> Result<card::Model, AppError> {
    card::Entity::find_by_id(card_id)
        .filter(card::Column::UserId.eq(ctx.user_id))
        .one(&app_state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Card {} not found", card_id)))
}

#[utoipa::path(
    get,
    path = "/api/cards/",
    tag = "Cards",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cards owned by the caller", body = [card::Model]),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_cards(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let ctx = resolve_auth_context(&req, &app_state)?;
    let cards = card::Entity::find()
        .filter(card::Column::UserId.eq(ctx.user_id))
        .order_by_asc(card::Column::Id)
        .all(&app_state.db)
        .await?;
    Ok(HttpResponse::Ok().json(cards))
}

#[utoipa::path(
    get,
    path = "/api/cards/{id}",
    tag = "Cards",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card details", body = card::Model),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Card not found")
    )
)]
#[get("/{id}")]
pub async fn get_card(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let ctx = resolve_auth_context(&req, &app_state)?;
    let found = find_owned_card(&app_state, &ctx, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(found))
}

#[utoipa::path(
    patch,
    path = "/api/cards/{id}/status",
    tag = "Cards",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Card ID")
    ),
    request_body = UpdateCardStatusRequest,
    responses(
        (status = 200, description = "Card updated", body = card::Model),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Card not found")
    )
)]
#[patch("/{id}/status")]
pub async fn update_card_status(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateCardStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let ctx = resolve_auth_context(&req, &app_state)?;
    let found = find_owned_card(&app_state, &ctx, path.into_inner()).await?;
    let status = body.into_inner().status;

    if found.status == status.as_str() {
        return Ok(HttpResponse::Ok().json(found));
    }

    let mut active = found.into_active_model();
    active.status = Set(status.to_string());
    let updated = active.update(&app_state.db).await?;

    log::info!("Card {} of user {} is now {}", updated.id, ctx.user_id, status);
    Ok(HttpResponse::Ok().json(updated))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cards")
            .route("", web::get().to(list_cards))
            .route("/", web::get().to(list_cards))
            .service(get_card)
            .service(update_card_status),
    );
}
