// This is the entry point of the campus assistant.
//
// **Architecture Overview:**
// - `core/` = Business logic (tools, dispatch, Canvas harvesting, OAuth)
// - `infra/` = Implementations of core traits (Gemini, Google, Canvas, stores)
// - `http/` = axum routes over the core services
// - `cli/` = Command-line parsing and the harvest command
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Register the model's tools
// 4. Run the requested command

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "cli/cli_layer.rs"]
mod cli;
#[path = "config.rs"]
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::cli::{harvest, Cli, Commands};
use crate::config::{AppConfig, StoreBackend};
use crate::core::ai::{AiProvider, AiService};
use crate::core::auth::OAuthService;
use crate::core::canvas::{CanvasService, ExportCache, ExportPolling};
use crate::core::chat::ChatService;
use crate::core::clock::{Clock, SystemClock};
use crate::core::store::KeyValueStore;
use crate::core::tools::{
    CreateCalendarEventTool, CreateGoogleDocTool, HelloWorldTool, ReadCalendarEventsTool,
    ToolRegistry, UpcomingAssignmentsTool,
};
use crate::core::workspace::DocumentService;
use crate::http::AppState;
use crate::infra::ai::GeminiClient;
use crate::infra::canvas::CanvasClient;
use crate::infra::google::{GoogleTokenExchanger, GoogleWorkspaceClient};
use crate::infra::store::{FileStore, InMemoryStore, SqliteStore};

/// Key-value stores for long-lived data (tokens, OAuth state) and for the
/// course export cache.
struct Stores {
    data: Arc<dyn KeyValueStore>,
    cache: Arc<dyn KeyValueStore>,
}

async fn build_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match config.store_backend {
        StoreBackend::File => Ok(Stores {
            data: Arc::new(FileStore::new(&config.data_dir)),
            cache: Arc::new(FileStore::new(&config.cache_dir)),
        }),
        StoreBackend::Sqlite => {
            let db_path = config.data_dir.join("assistant.db");
            let store = SqliteStore::new(&db_path.to_string_lossy())
                .await
                .context("Failed to initialize SQLite store")?;
            let store: Arc<dyn KeyValueStore> = Arc::new(store);
            Ok(Stores {
                data: store.clone(),
                cache: store,
            })
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; tokens and cached exports are lost on exit");
            let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
            Ok(Stores {
                data: store.clone(),
                cache: store,
            })
        }
    }
}

fn build_canvas(
    config: &AppConfig,
    client: &reqwest::Client,
    stores: &Stores,
    clock: Arc<dyn Clock>,
    term: String,
) -> Option<Arc<CanvasService>> {
    let canvas = config.canvas.as_ref()?;
    let api = CanvasClient::new(client.clone(), &canvas.api_url, canvas.api_key.clone());
    let cache = ExportCache::new(stores.cache.clone(), clock.clone(), config.export_max_age);
    Some(Arc::new(CanvasService::new(
        Arc::new(api),
        cache,
        clock,
        term,
        ExportPolling::default(),
    )))
}

async fn serve(
    config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
    client: reqwest::Client,
    stores: Stores,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<()> {
    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let google = Arc::new(GoogleWorkspaceClient::new(client.clone()));
    let documents = Arc::new(DocumentService::new(
        google.clone(),
        clock.clone(),
        config.time_zone,
        config.downloads_dir.clone(),
    ));

    let mut registry = ToolRegistry::new();
    registry.register(HelloWorldTool)?;
    registry.register(CreateCalendarEventTool::new(google.clone(), config.time_zone))?;
    registry.register(ReadCalendarEventsTool::new(
        google.clone(),
        clock.clone(),
        config.time_zone,
    ))?;
    registry.register(CreateGoogleDocTool::new(documents.clone()))?;
    let term = config.canvas_term.clone();
    if let Some(canvas) = build_canvas(&config, &client, &stores, clock.clone(), term) {
        registry.register(UpcomingAssignmentsTool::new(canvas))?;
    }
    tracing::info!(tools = ?registry.names(), "Registered tools");

    let provider: Box<dyn AiProvider> =
        Box::new(GeminiClient::new(client.clone(), config.gemini_api_key.clone()));
    let ai = AiService::new(provider, config.ai.clone(), Arc::new(registry));

    let oauth = OAuthService::new(
        config.oauth.clone(),
        Arc::new(GoogleTokenExchanger::new(client)),
        stores.data.clone(),
        clock,
    );

    let state = AppState {
        chat: ChatService::new(ai, documents),
        oauth,
    };

    let host = host.unwrap_or_else(|| config.host.clone());
    let port = port.unwrap_or(config.port);
    http::serve(&host, port, state).await
}

async fn run_harvest_command(
    config: AppConfig,
    term: Option<String>,
    output_dir: std::path::PathBuf,
    course: Option<u64>,
    client: reqwest::Client,
    stores: Stores,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<()> {
    let term = term.unwrap_or_else(|| config.canvas_term.clone());
    let canvas = build_canvas(&config, &client, &stores, clock.clone(), term)
        .context("CANVAS_API_KEY is not set; cannot harvest Canvas data")?;

    let upcoming = harvest::run_harvest(&canvas, &output_dir, course, clock.now()).await?;
    harvest::print_upcoming(&upcoming);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;
    for feature in config.disabled_features() {
        tracing::warn!("{} is not configured; the feature is disabled", feature);
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("campus_assistant/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let stores = build_stores(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => serve(config, host, port, client, stores, clock).await,
        Commands::Harvest {
            term,
            output_dir,
            course,
        } => run_harvest_command(config, term, output_dir, course, client, stores, clock).await,
    }
}
