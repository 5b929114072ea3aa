use clap::Parser;
use masgent_web::adapters::api_handler::AppState;
use masgent_web::adapters::gemini_responder::GeminiResponderFactory;
use masgent_web::adapters::structure_preview::StructurePreview;
use masgent_web::cli::Cli;
use masgent_web::config::Settings;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("masgent_web=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting Masgent Web on {}:{}", host, port);
    info!("Session files live under {}", settings.sessions.root_dir.display());

    let responders = Arc::new(GeminiResponderFactory::new(&settings.chat));
    let state = AppState::new(settings, responders, Arc::new(StructurePreview::new()))?;

    let idle_timeout = state.settings.sessions.idle_timeout_secs;
    if idle_timeout > 0 {
        info!("Idle sessions are released after {}s", idle_timeout);
        state.sessions.clone().spawn_idle_sweeper(Duration::from_secs(idle_timeout));
    }
    let app = masgent_web::create_app(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
