use std::sync::Arc;

use fibro_intake::config::IntakeConfig;
use fibro_intake::intake::SystemClock;
use fibro_intake::model::{PredictionService, load_model};
use fibro_intake::routes::intake_routes;
use fibro_intake::schema::FeatureSchema;
use fibro_intake::session::{self, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = IntakeConfig::from_env();
    config.validate()?;
    let schema = FeatureSchema::fibromyalgia();

    eprintln!("🩺 Fibro Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model_path.display());
    eprintln!("   Completeness: {:?}", config.completeness);
    eprintln!("   API: http://{}/api/sessions", config.listen_addr());

    // ── Model ───────────────────────────────────────────────────────────
    // Without a model there is nothing to serve.
    let model = load_model(&config.model_path, schema).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let service = PredictionService::new(Arc::new(model));

    // ── Sessions ────────────────────────────────────────────────────────
    let sessions = SessionStore::new(
        schema,
        Arc::new(SystemClock),
        config.completeness,
        config.session_idle_timeout,
    );
    let _prune_handle = session::spawn_prune_task(Arc::clone(&sessions), config.prune_interval);

    // ── HTTP ────────────────────────────────────────────────────────────
    let app = intake_routes(sessions, service);
    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    tracing::info!(addr = %config.listen_addr(), "Intake server started");
    axum::serve(listener, app).await?;

    Ok(())
}
