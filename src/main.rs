mod app;
mod auth;
mod config;
mod email;
mod error;
mod middleware;
mod state;
mod tours;
mod users;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tourista=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // Panics are programmer errors: log and die, the supervisor restarts us.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(%info, "fatal: panic, shutting down");
        std::process::exit(1);
    }));

    let app_state = AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }

    let app = app::build_app(app_state.clone());
    app::serve(app, &app_state.config).await
}
