use std::sync::Arc;

use ib_agentic::SqlGenerator;
use ib_ingest::{Extractor, HttpExtractor, IngestPipeline, LocalBlobStore};
use ib_portal::api::{create_router, AppState, SessionStore};
use ib_portal::database::{
    connect_pool, BrokerService, ClaimService, CommitExecutor, DocumentMetadataService,
    FacilityService, PolicyService, QuotationService, WarehouseService,
};
use ib_portal::PortalConfig;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "ib_portal=info,tower_http=info".to_string()),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = PortalConfig::from_env();

    info!("Connecting to database: {}", config.database_url);
    let pool = connect_pool(&config.database_url).await?;

    let policies = PolicyService::new(pool.clone());
    let claims = ClaimService::new(pool.clone());
    let brokers = BrokerService::new(pool.clone());
    let facilities = FacilityService::new(pool.clone());
    let quotes = QuotationService::new(pool.clone());
    let documents = DocumentMetadataService::new(pool.clone());
    let warehouse = WarehouseService::new(pool.clone(), config.agent_max_rows);
    let executor = CommitExecutor::new(policies.clone(), claims.clone());

    // First fetch of the day must already see fresh lapse flags.
    let swept = policies.recompute_lapse_flags().await?;
    info!(changed = swept, "boot lapse sweep complete");

    let blob = Arc::new(LocalBlobStore::new(&config.blob_root));
    let extractor: Arc<dyn Extractor> = match HttpExtractor::from_env() {
        Ok(extractor) => Arc::new(extractor),
        Err(e) => {
            warn!("extraction service not configured ({e}); uploads will fail until EXTRACTION_API_URL is set");
            Arc::new(HttpExtractor::new("http://localhost:8000/api/extract")?)
        }
    };
    let pipeline = Arc::new(
        IngestPipeline::new(blob, extractor, Arc::new(documents.clone()))
            .with_fallback(config.extraction_fallback),
    );

    let generator = match SqlGenerator::from_env() {
        Ok(generator) => Some(Arc::new(generator)),
        Err(e) => {
            warn!("warehouse agent disabled: {e}");
            None
        }
    };

    let state = AppState {
        policies,
        claims,
        brokers,
        facilities,
        quotes,
        documents,
        warehouse,
        executor,
        sessions: SessionStore::new(),
        pipeline,
        generator,
    };

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Starting portal server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
