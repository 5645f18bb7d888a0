//! Appgen server.
//!
//! Serves the generation API on `APPGEN_BIND_ADDR`. With `APPGEN_PROJECT_FILE` and `APPGEN_OUT_DIR`
//! set, generates once into the directory and exits.
//!
//! Run from repo root: `cargo run -p appgen-server`

use appgen_sdk::{
    app, build_bundle, ensure_database_exists, generate_and_record, load_project_file, AppState, HistoryStore,
    MemoryHistoryStore, PgHistoryStore, Settings,
};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn history_store(settings: &Settings) -> Result<Arc<dyn HistoryStore>, Box<dyn std::error::Error>> {
    let Some(database_url) = settings.database_url.as_deref() else {
        tracing::info!("DATABASE_URL not set, keeping history in memory");
        return Ok(Arc::new(MemoryHistoryStore::default()));
    };
    ensure_database_exists(database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    let store = PgHistoryStore::new(pool, &settings.history_schema)?;
    store.ensure_history_table().await?;
    tracing::info!(schema = %settings.history_schema, "history kept in PostgreSQL");
    Ok(Arc::new(store))
}

async fn generate_once(state: &AppState, project_file: &Path, out_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project_file(project_file).await?;
    let outcome = generate_and_record(&state.recorder, &project, "cli").await?;
    for warning in &outcome.warnings {
        tracing::warn!(kind = warning.kind, "{}", warning.message);
    }
    tokio::fs::create_dir_all(out_dir).await?;
    let artifacts = &outcome.artifacts;
    for (name, text) in [
        (&artifacts.names.sql_script, &artifacts.sql_script),
        (&artifacts.names.app_source, &artifacts.app_source),
        (&artifacts.names.documentation, &artifacts.documentation),
    ] {
        tokio::fs::write(out_dir.join(name), text).await?;
        tracing::info!(file = %out_dir.join(name).display(), "written");
    }
    let bundle_path = out_dir.join(appgen_sdk::bundle::bundle_file_name(artifacts));
    tokio::fs::write(&bundle_path, build_bundle(artifacts)?).await?;
    tracing::info!(file = %bundle_path.display(), "written");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("appgen_sdk=info,appgen_server=info")),
        )
        .init();

    let settings = Settings::from_env();
    let state = AppState::new(history_store(&settings).await?, settings.history_timeout);

    if let Some((project_file, out_dir)) = settings.one_shot() {
        return generate_once(&state, project_file, out_dir).await;
    }

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Appgen server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
