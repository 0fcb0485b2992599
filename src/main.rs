use std::sync::Arc;

use anyhow::Context;

use finch_core::provider::ChatProvider;
use finch_engine::{AgentRegistry, SubAgentOrchestrator, ToolRegistry};
use finch_llm::OpenAiProvider;
use finch_server::{prompt, AppConfig, AppState, ServerConfig};
use finch_tools::clients::{
    AlphaVantageNews, ChartApiMarketData, DocumentIndex, MarketData, NewsProvider,
    RetrievalApiIndex,
};
use finch_tools::{
    CompanyDataAgent, DelegateTool, FilingsTool, HistoricalDataTool, NewsTool, PortfolioTool,
    StockPriceTool,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting finch chat server");

    let config = AppConfig::from_env().context("loading configuration")?;

    // Model-streaming collaborator
    let provider: Arc<dyn ChatProvider> = Arc::new(match &config.openai_base_url {
        Some(base_url) => OpenAiProvider::with_base_url(
            config.openai_api_key.clone(),
            config.model.clone(),
            base_url,
        ),
        None => OpenAiProvider::new(config.openai_api_key.clone(), config.model.clone()),
    });

    // Data collaborators
    let market: Arc<dyn MarketData> = Arc::new(match &config.market_base_url {
        Some(base_url) => ChartApiMarketData::with_base_url(base_url),
        None => ChartApiMarketData::new(),
    });
    let news: Arc<dyn NewsProvider> =
        Arc::new(AlphaVantageNews::new(config.alpha_vantage_key.clone()));
    let index: Arc<dyn DocumentIndex> =
        Arc::new(RetrievalApiIndex::new(config.retrieval_base_url.clone()));

    // Sub-agents and the delegation orchestrator
    let mut agents = AgentRegistry::new();
    agents.register(Arc::new(CompanyDataAgent::new(Arc::clone(&provider))));
    let orchestrator = Arc::new(SubAgentOrchestrator::new(
        Arc::clone(&provider),
        Arc::new(agents),
        prompt::ORCHESTRATOR_PROMPT,
    ));

    // Tool registry
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(StockPriceTool::new(Arc::clone(&market))));
    registry.register(Arc::new(HistoricalDataTool::new(Arc::clone(&market))));
    registry.register(Arc::new(NewsTool::new(Arc::clone(&news))));
    registry.register(Arc::new(FilingsTool::new(Arc::clone(&index))));
    registry.register(Arc::new(PortfolioTool::new(config.portfolio_path.clone())));
    registry.register(Arc::new(DelegateTool::new(orchestrator)));
    tracing::info!(tools = ?registry.names(), "tool registry assembled");

    let state = AppState {
        provider,
        registry: Arc::new(registry),
        system_prompt: prompt::advisor_prompt(),
    };

    let server_config = ServerConfig {
        port: config.port,
        allowed_origins: config.allowed_origins.clone(),
    };
    let handle = finch_server::start(server_config, state)
        .await
        .context("starting server")?;

    tracing::info!(port = handle.port, "finch ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("listening for ctrl+c")?;

    tracing::info!("Shutting down");
    Ok(())
}
