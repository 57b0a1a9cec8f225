//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{seed_content, DbAdapter, RedisCacheAdapter},
    config::Config,
    error::ApiError,
    grpc::ContentGrpcService,
    web::{rest::ApiDoc, router, state::AppState},
};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use clap::Parser;
use scripture_core::{BookmarkService, CacheStore, ContentService, NoCache};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Parser, Debug)]
#[command(version, about = "Serves scripture content over REST and gRPC")]
struct Args {
    /// Drop every table, flush the cache, then migrate and reseed from scratch.
    #[arg(long)]
    refresh: bool,
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let args = Args::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Database and the Cache ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));

    let cache: Arc<dyn CacheStore> = match &config.redis_url {
        Some(url) => match RedisCacheAdapter::connect(url).await {
            Ok(adapter) => {
                info!("Connected to Redis.");
                Arc::new(adapter)
            }
            Err(e) => {
                warn!("Redis unavailable ({}), serving without a cache.", e);
                Arc::new(NoCache)
            }
        },
        None => {
            info!("REDIS_URL not set, serving without a cache.");
            Arc::new(NoCache)
        }
    };

    // --- 3. Reset (optional), Migrate & Seed ---
    if args.refresh {
        warn!("Refresh requested: dropping all tables and flushing the cache...");
        db_adapter.reset_schema().await?;
        cache.flush_all().await?;
    }
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    let seeded = seed_content(&db_adapter, &config.seed_path).await?;

    // --- 4. Build the Core Services ---
    let content = Arc::new(ContentService::new(
        db_adapter.clone(),
        cache,
        config.content_policy(),
    ));
    if seeded > 0 {
        match content.invalidate_all().await {
            Ok(removed) => info!(removed, "Cleared cached content after seeding."),
            Err(e) => warn!("Could not clear cached content after seeding: {}", e),
        }
    }
    let bookmarks = Arc::new(BookmarkService::new(db_adapter, config.store_timeout));

    let app_state = Arc::new(AppState {
        content: content.clone(),
        bookmarks,
    });

    // --- 5. Create the Web Router ---
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = router(app_state)
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start Both Servers ---
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for the shutdown signal: {}", e);
                return;
            }
            info!("Shutdown signal received.");
            shutdown.cancel();
        }
    });

    info!("Starting HTTP server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let http = {
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .map_err(ApiError::from)
        }
    };

    info!("Starting gRPC server on {}", config.grpc_bind_address);
    let grpc = {
        let shutdown = shutdown.clone();
        let addr = config.grpc_bind_address;
        async move {
            Server::builder()
                .add_service(ContentGrpcService::new(content).into_server())
                .serve_with_shutdown(addr, async move { shutdown.cancelled().await })
                .await
                .map_err(ApiError::from)
        }
    };

    // Either server failing brings the other one down with it.
    let result = tokio::try_join!(http, grpc);
    shutdown.cancel();
    result?;

    info!("Servers stopped.");
    Ok(())
}
