use actix_files::NamedFile;
use actix_web::{
    HttpRequest, HttpResponse, get,
    http::header::{CACHE_CONTROL, EXPIRES, HeaderValue, PRAGMA},
    web,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    api::{auth, bills, cards, health, users},
    app_state::AppState,
    database::{
        models::{bill, card},
        types::{BillStatus, CardStatus},
    },
    errors::AppError,
};

pub const SWAGGER_URL: &str = "/swagger";
pub const API_URL: &str = "/static/swagger.json";

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "FinSec Banking API", description = "Authentication, profile, card and bill management"),
    paths(
        // Health
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::verify_mfa,
        auth::generate_mfa_secret,
        // Users
        users::get_profile,
        users::update_profile,
        // Cards
        cards::list_cards,
        cards::get_card,
        cards::update_card_status,
        // Bills
        bills::list_bills,
        bills::pay_bill,
    ),
    components(
        schemas(
            // --- Models ---
            card::Model,
            bill::Model,
            CardStatus,
            BillStatus,

            // --- DTOs ---
            health::HealthResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::MfaChallenge,
            auth::TokenResponse,
            auth::VerifyMfaRequest,
            auth::MfaSecretResponse,
            users::UserProfile,
            users::UpdateProfileRequest,
            cards::UpdateCardStatusRequest,
            bills::PayBillRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness probe"),
        (name = "Auth", description = "Registration, login and multi-factor authentication"),
        (name = "Users", description = "Profile of the authenticated user"),
        (name = "Cards", description = "Card management"),
        (name = "Bills", description = "Bill listing and payment")
    )
)]
pub struct ApiDoc;

fn disable_caching(response: &mut HttpResponse) {
    let headers = response.headers_mut();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
}

/// Serves the static OpenAPI document, or the generated one when no file is deployed.
/// Never cached, so the UI always shows the current document.
#[get("/static/swagger.json")]
pub async fn serve_swagger(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let path = &app_state.config.server.swagger_spec_path;
    let mut response = if path.is_file() {
        NamedFile::open_async(path)
            .await?
            .use_etag(false)
            .use_last_modified(false)
            .into_response(&req)
    } else {
        log::debug!("{} not found, serving generated OpenAPI document", path.display());
        HttpResponse::Ok().json(ApiDoc::openapi())
    };
    disable_caching(&mut response);
    Ok(response)
}
