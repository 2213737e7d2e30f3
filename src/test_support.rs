//! Fixtures shared by the handler tests.

use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::DatabaseConnection;

use crate::{
    app_state::AppState,
    config::Config,
    database::{
        models::{bill, card, user},
        types::{BillStatus, CardStatus},
    },
    services::jwt::TokenKind,
};

pub fn test_config() -> Config {
    Config::from_vars([
        ("MYSQL_USER", "bank"),
        ("MYSQL_PASSWORD", "s3cret"),
        ("MYSQL_HOST", "localhost"),
        ("MYSQL_DB", "finsec_test"),
        ("JWT_SECRET_KEY", "test-signing-key"),
        ("SWAGGER_SPEC_PATH", "does-not-exist/swagger.json"),
    ])
    .expect("test configuration is complete")
}

pub fn test_app_state(db: DatabaseConnection) -> AppState {
    test_app_state_with(test_config(), db)
}

pub fn test_app_state_with(config: Config, db: DatabaseConnection) -> AppState {
    AppState::new(config, db)
}

/// `Authorization` header value carrying a fresh access token.
pub fn bearer(state: &AppState, user_id: i64) -> String {
    let token = state
        .jwt
        .issue(user_id, TokenKind::Access)
        .expect("token signs");
    format!("Bearer {}", token)
}

pub fn sample_user(id: i64, password_hash: &str, mfa_secret: Option<&str>) -> user::Model {
    user::Model {
        id,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        password_hash: password_hash.to_string(),
        mfa_enabled: mfa_secret.is_some(),
        mfa_secret: mfa_secret.map(str::to_string),
        created_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
    }
}

pub fn sample_card(id: i64, user_id: i64, status: CardStatus) -> card::Model {
    card::Model {
        id,
        user_id,
        card_holder: "Ada Lovelace".to_string(),
        last4: format!("{:04}", 4000 + id),
        card_type: "debit".to_string(),
        expiry: "09/28".to_string(),
        balance_cents: 125_000,
        status: status.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap(),
    }
}

pub fn sample_bill(id: i64, user_id: i64, status: BillStatus) -> bill::Model {
    bill::Model {
        id,
        user_id,
        payee: "City Power".to_string(),
        description: Some("Electricity".to_string()),
        amount_cents: 8_450,
        due_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        status: status.to_string(),
        paid_at: match status {
            BillStatus::Paid => Some(Utc.with_ymd_and_hms(2024, 2, 20, 8, 0, 0).unwrap()),
            BillStatus::Pending => None,
        },
    }
}
