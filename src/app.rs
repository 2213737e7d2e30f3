use actix_cors::Cors;
use actix_web::{
    App, Error,
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web,
};
use utoipa_swagger_ui::{Config as SwaggerConfig, SwaggerUi};

use crate::{
    api::{
        auth, bills, cards,
        docs::{self, API_URL, SWAGGER_URL},
        health, middleware::RequestId, users,
    },
    app_state::AppState,
    errors::AppError,
};

pub const CORS_MAX_AGE_SECS: usize = 3600;

pub const CORS_METHODS: [&str; 6] = ["GET", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"];

/// Header set both accepted from and exposed to browsers.
pub const CORS_HEADERS: [&str; 6] = [
    "Content-Type",
    "Authorization",
    "X-Requested-With",
    "Access-Control-Allow-Origin",
    "Access-Control-Allow-Headers",
    "Access-Control-Allow-Methods",
];

/// Any origin, no credentials.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(CORS_METHODS)
        .allowed_headers(CORS_HEADERS)
        .expose_headers(CORS_HEADERS)
        .max_age(CORS_MAX_AGE_SECS)
}

/// Malformed JSON bodies get the same error shape as every other client error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::InvalidInput(err.to_string()).into())
}

/// Same envelope for path parameters that fail to parse, e.g. `/api/cards/abc`.
fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::InvalidInput(err.to_string()).into())
}

/// Mounts the four route groups under `/api`.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(auth::init_routes)
            .configure(users::init_routes)
            .configure(cards::init_routes)
            .configure(bills::init_routes),
    );
}

/// Builds one application instance around already-constructed dependencies.
///
/// Called once per worker by the server; cloning `state` only bumps reference counts.
pub fn create_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(RequestId)
        .wrap(cors())
        .app_data(web::Data::new(state))
        .app_data(json_config())
        .app_data(path_config())
        .service(health::health_check)
        .service(docs::serve_swagger)
        .service(
            SwaggerUi::new(format!("{}/{{_:.*}}", SWAGGER_URL))
                .config(SwaggerConfig::new([API_URL])),
        )
        .configure(api_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_app_state, test_app_state_with, test_config};
    use actix_web::{
        http::{Method, StatusCode, header},
        test,
    };
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::io::Write;

    fn mock_db() -> sea_orm::DatabaseConnection {
        MockDatabase::new(DatabaseBackend::MySql).into_connection()
    }

    #[actix_web::test]
    async fn health_check_is_static() {
        let app = test::init_service(create_app(test_app_state(mock_db()))).await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));

        let body = test::read_body(resp).await;
        assert_eq!(body, r#"{"status":"healthy"}"#);
    }

    #[actix_web::test]
    async fn generated_swagger_document_is_not_cached() {
        let app = test::init_service(create_app(test_app_state(mock_db()))).await;

        let req = test::TestRequest::get().uri(API_URL).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_no_cache(&resp);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["info"]["title"], "FinSec Banking API");
        assert!(body["paths"].get("/").is_some());
    }

    #[actix_web::test]
    async fn static_swagger_file_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swagger.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"openapi":"3.0.0","info":{{"title":"static copy"}}}}"#).unwrap();

        let mut config = test_config();
        config.server.swagger_spec_path = path;
        let app = test::init_service(create_app(test_app_state_with(config, mock_db()))).await;

        let req = test::TestRequest::get().uri(API_URL).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_no_cache(&resp);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["info"]["title"], "static copy");
    }

    #[actix_web::test]
    async fn swagger_ui_is_mounted() {
        let app = test::init_service(create_app(test_app_state(mock_db()))).await;

        let req = test::TestRequest::get().uri("/swagger/").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn preflight_allows_every_method_without_credentials() {
        let app = test::init_service(create_app(test_app_state(mock_db()))).await;

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/cards/1/status")
            .insert_header((header::ORIGIN, "https://mobile.example.com"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let headers = resp.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let methods = headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        for method in CORS_METHODS {
            assert!(methods.contains(method), "{} missing from {}", method, methods);
        }
        assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "3600");
        assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));
    }

    #[actix_web::test]
    async fn simple_cross_origin_request_gets_wildcard() {
        let app = test::init_service(create_app(test_app_state(mock_db()))).await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://mobile.example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert!(!resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));
    }

    #[actix_web::test]
    async fn malformed_json_uses_error_envelope() {
        let app = test::init_service(create_app(test_app_state(mock_db()))).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[actix_web::test]
    async fn unparseable_path_parameter_uses_error_envelope() {
        let app = test::init_service(create_app(test_app_state(mock_db()))).await;

        let req = test::TestRequest::get().uri("/api/cards/abc").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    fn assert_no_cache<B>(resp: &ServiceResponse<B>) {
        let headers = resp.headers();
        assert_eq!(
            headers.get(header::CACHE_CONTROL).unwrap(),
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(headers.get(header::PRAGMA).unwrap(), "no-cache");
        assert_eq!(headers.get(header::EXPIRES).unwrap(), "0");
    }
}
