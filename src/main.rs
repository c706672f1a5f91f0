use referral_desk::{app, auth, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "referral_desk=debug,axum=info,tower_http=info".to_string());
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

    let app_state = AppState::init().await?;

    if let Some(admin) = app_state.config.bootstrap_admin.clone() {
        if let Err(e) = auth::services::ensure_admin(&app_state, &admin).await {
            tracing::warn!(error = %e, "admin bootstrap failed; continuing");
        }
    }

    app::serve(app::build_app(app_state)).await
}
