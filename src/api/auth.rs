use actix_web::{HttpRequest, HttpResponse, post, web};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::{
    api::{
        context::{load_current_user, resolve_auth_context},
        users::UserProfile,
        validation::{self, MAX_PASSWORD_LEN},
    },
    app_state::AppState,
    database::models::user,
    errors::{self, AppError},
    services::{jwt::TokenKind, password, totp},
};

// --- DTOs ---

#[derive(Deserialize, ToSchema, Clone)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued once credentials (and MFA, when enabled) are verified.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub user: UserProfile,
}

/// Second step required: present `mfa_token` and a TOTP code to `/api/auth/verify-mfa`.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct MfaChallenge {
    #[serde(rename = "requireMfa")]
    pub require_mfa: bool,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub mfa_token: String,
}

#[derive(Serialize, ToSchema)]
#[serde(untagged)]
pub enum LoginResponse {
    MfaRequired(MfaChallenge),
    Authenticated(TokenResponse),
}

/// Second login step. The first factor is proven either by `mfa_token` from `/login`
/// or by sending `email` and `password` again, as the mobile client does.
#[derive(Deserialize, ToSchema, Clone)]
pub struct VerifyMfaRequest {
    /// Numeric id, as a number or a string.
    #[serde(rename = "userId", alias = "user_id", deserialize_with = "id_from_number_or_string")]
    #[schema(example = 7)]
    pub user_id: i64,
    pub mfa_token: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "otpCode")]
    #[schema(example = "123456")]
    pub code: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    Text(String),
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(id) => Ok(id),
        NumberOrString::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct MfaSecretResponse {
    /// Base32 secret for manual entry.
    pub secret: String,
    pub otpauth_url: String,
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}

fn token_response(app_state: &AppState, account: &user::Model) -> Result<TokenResponse, AppError> {
    Ok(TokenResponse {
        access_token: app_state.jwt.issue(account.id, TokenKind::Access)?,
        user: UserProfile::from(account),
    })
}

async fn find_by_email(app_state: &AppState, email: &str) -> Result<Option<user::Model>, AppError> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(&app_state.db)
        .await?)
}

/// Looks the account up by email and checks the password. Every failure is the same 401.
async fn check_credentials(
    app_state: &AppState,
    email: &str,
    candidate: String,
) -> Result<user::Model, AppError> {
    let email = email.trim().to_ascii_lowercase();
    if candidate.len() > MAX_PASSWORD_LEN {
        return Err(invalid_credentials());
    }

    let Some(account) = find_by_email(app_state, &email).await? else {
        log::warn!("Login attempt for unknown email");
        return Err(invalid_credentials());
    };

    if !password::verify_password(candidate, account.password_hash.clone()).await? {
        log::warn!("Failed login for user {}", account.id);
        return Err(invalid_credentials());
    }
    Ok(account)
}

/// Resolves the account whose first factor was proven for `user_id`.
async fn first_factor(
    app_state: &AppState,
    user_id: i64,
    mfa_token: Option<String>,
    email: Option<String>,
    candidate: Option<String>,
) -> Result<user::Model, AppError> {
    if let Some(token) = mfa_token {
        let claims = app_state.jwt.verify(&token, TokenKind::Mfa)?;
        if claims.sub != user_id {
            return Err(AppError::Unauthorized("MFA token does not match user".to_string()));
        }
        return user::Entity::find_by_id(user_id)
            .one(&app_state.db)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()));
    }

    let (Some(email), Some(candidate)) = (email, candidate) else {
        return Err(AppError::Unauthorized(
            "Either mfa_token or email and password are required".to_string(),
        ));
    };
    let account = check_credentials(app_state, &email, candidate).await?;
    if account.id != user_id {
        log::warn!("Credentials of user {} presented for user {}", account.id, user_id);
        return Err(invalid_credentials());
    }
    Ok(account)
}

// --- Route Handlers ---

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Invalid email, name or password"),
        (status = 409, description = "Email already registered")
    )
)]
#[post("/register")]
pub async fn register(
    app_state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = body.into_inner();
    let email = validation::normalize_email(&payload.email)
        .ok_or_else(|| AppError::InvalidInput("Invalid email address".to_string()))?;
    let first_name = validation::require_name("first_name", &payload.first_name)?;
    let last_name = validation::require_name("last_name", &payload.last_name)?;
    validation::require_password(&payload.password)?;

    if find_by_email(&app_state, &email).await?.is_some() {
        return Err(AppError::Conflict(format!("User with email {} already exists", email)));
    }

    let password_hash = password::hash_password(payload.password).await?;
    let new_user = user::ActiveModel {
        first_name: Set(first_name),
        last_name: Set(last_name),
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        mfa_enabled: Set(false),
        mfa_secret: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    // A concurrent registration can still win the race to the unique index.
    let created = new_user.insert(&app_state.db).await.map_err(|err| {
        if errors::is_unique_violation(&err) {
            AppError::Conflict(format!("User with email {} already exists", email))
        } else {
            AppError::DbError(err)
        }
    })?;

    log::info!("Registered user {}", created.id);
    Ok(HttpResponse::Created().json(UserProfile::from(&created)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token, or an MFA challenge when MFA is enabled", body = LoginResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
#[post("/login")]
pub async fn login(
    app_state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = body.into_inner();
    let account = check_credentials(&app_state, &payload.email, payload.password).await?;

    let response = if account.mfa_enabled && account.mfa_secret.is_some() {
        LoginResponse::MfaRequired(MfaChallenge {
            require_mfa: true,
            user_id: account.id,
            mfa_token: app_state.jwt.issue(account.id, TokenKind::Mfa)?,
        })
    } else {
        LoginResponse::Authenticated(token_response(&app_state, &account)?)
    };

    log::info!("User {} passed password check", account.id);
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-mfa",
    tag = "Auth",
    request_body = VerifyMfaRequest,
    responses(
        (status = 200, description = "MFA verified", body = TokenResponse),
        (status = 401, description = "Invalid MFA token, credentials or code")
    )
)]
#[post("/verify-mfa")]
pub async fn verify_mfa(
    app_state: web::Data<AppState>,
    body: web::Json<VerifyMfaRequest>,
) -> Result<HttpResponse, AppError> {
    let VerifyMfaRequest {
        user_id,
        mfa_token,
        email,
        password: candidate,
        code,
    } = body.into_inner();
    let account = first_factor(&app_state, user_id, mfa_token, email, candidate).await?;

    let secret = account
        .mfa_secret
        .as_deref()
        .and_then(totp::decode_secret)
        .ok_or_else(|| AppError::Unauthorized("MFA is not configured".to_string()))?;

    if !totp::verify_code(&secret, code.trim(), totp::unix_now()) {
        log::warn!("Invalid MFA code for user {}", account.id);
        return Err(AppError::Unauthorized("Invalid MFA code".to_string()));
    }

    log::info!("User {} completed MFA", account.id);
    Ok(HttpResponse::Ok().json(token_response(&app_state, &account)?))
}

#[utoipa::path(
    post,
    path = "/api/auth/generate-mfa-secret",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "New TOTP secret; MFA is now enabled", body = MfaSecretResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[post("/generate-mfa-secret")]
pub async fn generate_mfa_secret(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let ctx = resolve_auth_context(&req, &app_state)?;
    let account = load_current_user(&ctx, &app_state).await?;

    let secret = totp::encode_secret(&totp::generate_secret()?);
    let otpauth_url = totp::otpauth_url(&app_state.config.jwt.totp_issuer, &account.email, &secret);

    let mut active = account.into_active_model();
    active.mfa_secret = Set(Some(secret.clone()));
    active.mfa_enabled = Set(true);
    let updated = active.update(&app_state.db).await?;

    log::info!("MFA enabled for user {}", updated.id);
    Ok(HttpResponse::Ok().json(MfaSecretResponse { secret, otpauth_url }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(verify_mfa)
            .service(generate_mfa_secret),
    );
}
