use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use axum::Router;
use clap::{Parser, Subcommand};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use relay_domain::config::{Config, ConfigSeverity};
use relay_gateway::chat_client::ChatClient;
use relay_gateway::registry::AgentRegistry;
use relay_gateway::state::{default_calendar, default_leads, default_web_search, tool_catalog, AppState};
use relay_gateway::transcriber::WhisperTranscriber;

#[derive(Parser)]
#[command(name = "relay-gateway", about = "Conversational gateway server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Print the build version and exit.
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Version => {
            println!("relay-gateway {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Serve => run_server(&cli.config).await,
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

async fn run_server(config_path: &PathBuf) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", config_path.display()))?;
    let config: Config = toml::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", config_path.display()))?;

    let issues = config.validate();
    let mut has_error = false;
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Error => {
                has_error = true;
                tracing::error!(message = %issue.message, "configuration error");
            }
            ConfigSeverity::Warning => {
                tracing::warn!(message = %issue.message, "configuration warning");
            }
        }
    }
    if has_error {
        anyhow::bail!("invalid configuration, see logged errors above");
    }
    tracing::info!("configuration loaded and validated");

    let llm_api_key = std::env::var(&config.llm.api_key_env).unwrap_or_default();
    let llm = Arc::new(relay_providers::OpenAiCompatProvider::new(
        "llm",
        config.llm.base_url.clone(),
        llm_api_key.clone(),
    ));
    tracing::info!(model = %config.llm.default_model, "LLM provider ready");

    let chat_api_key = std::env::var(&config.chat.api_key_env).unwrap_or_default();
    let chat = Arc::new(ChatClient::new(config.chat.base_url.clone(), chat_api_key));
    tracing::info!(base_url = %config.chat.base_url, "chat provider ready");

    let transcriber = Arc::new(WhisperTranscriber::new(
        config.llm.base_url.clone(),
        llm_api_key,
        "whisper-1",
    ));

    let fragment_store = Arc::new(relay_fragments::FragmentStore::new());
    let context_store = Arc::new(relay_context::ContextStore::new(std::path::Path::new(
        &config.context.state_dir,
    ))?);
    let group_cache = relay_authz::GroupMembershipCache::new(config.groups.cache_ttl_minutes);
    tracing::info!("conversation pipeline ready");

    let catalog: HashMap<_, _> = tool_catalog();
    let registry = Arc::new(AgentRegistry::from_config(&config, &catalog));
    tracing::info!(agents = registry.agent_ids().len(), "agent registry ready");

    let turn_semaphore = Arc::new(tokio::sync::Semaphore::new(config.turns.max_concurrent_turns));
    let quiet_period = Duration::from_secs(config.fragments.quiet_period_seconds);
    let dedupe_ttl = Duration::from_secs(config.fragments.dedupe_ttl_seconds);

    let state = Arc::new_cyclic(|weak: &std::sync::Weak<AppState>| {
        let weak = weak.clone();
        let callback: relay_fragments::TurnCallback = Arc::new(move |user, utterance| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(state) = weak.upgrade() {
                    relay_gateway::turn::run(state, user, utterance).await;
                }
            })
        });
        let debouncer = Arc::new(relay_fragments::Debouncer::new(
            fragment_store.clone(),
            quiet_period,
            callback,
        ));

        AppState {
            config,
            fragment_store,
            debouncer,
            context_store,
            group_cache,
            llm,
            chat,
            transcriber,
            calendar: default_calendar(),
            web_search: default_web_search(),
            leads: default_leads(),
            registry,
            dedupe: relay_gateway::dedupe::DedupeStore::new(dedupe_ttl),
            turn_semaphore,
        }
    });
    tracing::info!("application state assembled");

    let webhook_path = state
        .config
        .server
        .webhook_path
        .clone()
        .unwrap_or_else(|| "/webhook".to_string());
    let port = state.config.server.port;

    let app = Router::new()
        .route(&webhook_path, post(relay_gateway::webhook::handle))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(ConcurrencyLimitLayer::new(
            state.config.turns.max_concurrent_turns * 4,
        ))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, path = %webhook_path, "relay-gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
