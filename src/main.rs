//! Account Service Server
//!
//! Serves the account pages: user directory, profile view and edit, password
//! change and email change, plus login, logout and signup.

use dotenv::dotenv;

use account_service::{
    api::{create_app, AppState, PageTemplates},
    config::AppConfig,
    database::run_migrations,
    service::{ActivityLog, SessionService, UserService},
    utils::logging::init_logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv().ok();

    let config = AppConfig::from_env()?;
    init_logging(&config.logging)?;
    config.validate()?;

    log::info!("Starting account service v{}", account_service::VERSION);

    let database_pool = config.database.create_pool().await?;

    log::info!("Running database migrations...");
    run_migrations(&database_pool).await?;
    log::info!("Database migrations completed");

    let user_service = UserService::new(database_pool).with_bcrypt_cost(config.bcrypt_cost);
    let session_service = SessionService::from_config(&config.session);
    let pages = PageTemplates::new()?;

    let app_state = AppState::new(user_service, session_service, pages)
        .with_activity_log(ActivityLog::default())
        .with_secure_cookies(config.session.cookie_secure);

    let app = create_app(app_state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Session lifetime: {} hours", config.session.ttl_hours);
    if let Some(file) = &config.logging.file {
        log::info!("Writing logs to {}", file);
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
