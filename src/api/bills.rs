use actix_web::{HttpRequest, HttpResponse, post, web};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    api::context::resolve_auth_context,
    app_state::AppState,
    database::{models::bill, types::BillStatus},
    errors::AppError,
};

#[derive(Deserialize, ToSchema, Clone)]
pub struct PayBillRequest {
    pub bill_id: i64,
}

#[utoipa::path(
    get,
    path = "/api/bills",
    tag = "Bills",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Bills owned by the caller, earliest due first", body = [bill::Model]),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_bills(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let ctx = resolve_auth_context(&req, &app_state)?;
    let bills = bill::Entity::find()
        .filter(bill::Column::UserId.eq(ctx.user_id))
        .order_by_asc(bill::Column::DueDate)
        .order_by_asc(bill::Column::Id)
        .all(&app_state.db)
        .await?;
    Ok(HttpResponse::Ok().json(bills))
}

#[utoipa::path(
    post,
    path = "/api/bills/pay",
    tag = "Bills",
    security(("bearer_auth" = [])),
    request_body = PayBillRequest,
    responses(
        (status = 200, description = "Bill marked as paid", body = bill::Model),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Bill not found"),
        (status = 409, description = "Bill already paid")
    )
)]
#[post("/pay")]
pub async fn pay_bill(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<PayBillRequest>,
) -> Result<HttpResponse, AppError> {
    let ctx = resolve_auth_context(&req, &app_state)?;
    let bill_id = body.into_inner().bill_id;

    let found = bill::Entity::find_by_id(bill_id)
        .filter(bill::Column::UserId.eq(ctx.user_id))
        .one(&app_state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bill {} not found", bill_id)))?;

    if found.status == BillStatus::Paid.as_str() {
        return Err(AppError::Conflict(format!("Bill {} is already paid", bill_id)));
    }

    let mut active = found.into_active_model();
    active.status = Set(BillStatus::Paid.to_string());
    active.paid_at = Set(Some(Utc::now()));
    let updated = active.update(&app_state.db).await?;

    log::info!(
        "User {} paid bill {} ({} cents to {})",
        ctx.user_id,
        updated.id,
        updated.amount_cents,
        updated.payee
    );
    Ok(HttpResponse::Ok().json(updated))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bills")
            .route("", web::get().to(list_bills))
            .route("/", web::get().to(list_bills))
            .service(pay_bill),
    );
}
