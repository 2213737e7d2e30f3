use actix_web::HttpServer;
use dotenvy::dotenv;
use std::io;

use finsec_api::{
    api::docs::SWAGGER_URL, app::create_app, app_state::AppState, config::Config, database,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Nothing is bound until the whole environment has been validated.
    let config = Config::from_env().map_err(|err| {
        log::error!("{}", err);
        io::Error::new(io::ErrorKind::InvalidInput, err.to_string())
    })?;

    log::info!("Using database {}", config.mysql.redacted_url());
    let db = database::connect_lazy(&config.database).await.map_err(|err| {
        log::error!("Failed to set up database pool: {}", err);
        io::Error::other(err.to_string())
    })?;

    let host = config.server.host.clone();
    let port = config.server.port;
    let workers = config.server.workers;
    let state = AppState::new(config, db);

    log::info!("Starting server at http://{}:{} with {} workers", host, port, workers);
    log::info!("Swagger UI available at http://{}:{}{}/", host, port, SWAGGER_URL);

    HttpServer::new(move || create_app(state.clone()))
        .workers(workers)
        .bind((host, port))?
        .run()
        .await
}
