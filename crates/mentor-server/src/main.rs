mod configuration;
mod error;
mod routes;
mod state;

use anyhow::Context;
use configuration::Settings;
use mentor::{
    agent::Agent,
    prompt_template::load_template_file,
    providers::openai::OpenAiProvider,
    store::JsonFileStore,
    systems::practice::PracticeSystem,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match std::env::var("MENTOR_CONFIG") {
        Ok(path) => Settings::from_file(path)?,
        Err(_) => Settings::new()?,
    };
    let addr = settings.server.socket_addr()?;
    let request_timeout = settings.agent.request_timeout();

    info!(
        host = %settings.provider.host,
        max_steps = settings.agent.max_steps,
        "starting mentor"
    );

    let provider = OpenAiProvider::new(settings.provider.into_config())?;
    let store = JsonFileStore::new(settings.agent.data_dir.clone());
    info!(
        model = provider.model(),
        data_dir = %store.dir().display(),
        "agent ready"
    );

    let mut agent = Agent::new(Arc::new(provider)).with_max_steps(settings.agent.max_steps);
    if let Some(path) = &settings.agent.prompt_file {
        // Rendered once here so template errors surface at startup
        let template = load_template_file(path, &serde_json::json!({ "systems": [] }))
            .with_context(|| format!("invalid prompt template {}", path.display()))?;
        agent = agent.with_prompt_template(template);
    }
    agent.add_system(Box::new(PracticeSystem::new(Arc::new(store))));

    let state = state::AppState::new(agent).with_request_timeout(request_timeout);

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
