use std::sync::Arc;

use coinlens_analytics::forecast::ForecastConfig;
use coinlens_analytics::{
    Forecaster, InsightsService, MarketService, ProgressHub, Simulation, SocialService,
    TechnicalService, TrendService,
};
use coinlens_market_data::{
    CoinGeckoSource, DataGateway, EphemeralCache, FearGreedSource, GatewayConfig,
    RandomSynthesizer, UpstreamSource,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub gateway: Arc<DataGateway>,
    pub simulation: Arc<Simulation>,
    pub market_service: Arc<MarketService>,
    pub trend_service: TrendService,
    pub technical_service: TechnicalService,
    pub social_service: SocialService,
    pub insights_service: InsightsService,
    pub forecaster: Forecaster,
}

impl AppState {
    /// Wire the analytics services over an existing gateway.
    pub fn new(
        gateway: Arc<DataGateway>,
        simulation: Arc<Simulation>,
        forecast: ForecastConfig,
    ) -> Self {
        let market_service = Arc::new(MarketService::new(gateway.clone(), simulation.clone()));
        Self {
            trend_service: TrendService::new(market_service.clone()),
            technical_service: TechnicalService::new(market_service.clone()),
            social_service: SocialService::new(market_service.clone()),
            insights_service: InsightsService::new(market_service.clone()),
            forecaster: Forecaster::with_config(
                forecast,
                Arc::new(ProgressHub::new()),
                simulation.clone(),
            ),
            gateway,
            simulation,
            market_service,
        }
    }

    pub fn progress(&self) -> &Arc<ProgressHub> {
        self.forecaster.progress()
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("COINLENS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    let sources: Vec<Arc<dyn UpstreamSource>> = vec![
        Arc::new(CoinGeckoSource::with_base_url(&config.coingecko_url, config.upstream_timeout)),
        Arc::new(FearGreedSource::with_base_url(&config.fear_greed_url, config.upstream_timeout)),
    ];
    let gateway = Arc::new(DataGateway::with_config(
        sources,
        Arc::new(EphemeralCache::with_capacity(config.cache_max_entries)),
        Arc::new(RandomSynthesizer::new()),
        GatewayConfig {
            ttl: config.ttl.clone(),
            ..GatewayConfig::default()
        },
    ));
    tracing::info!(
        "Market data gateway ready (CoinGecko: {}, Fear & Greed: {})",
        config.coingecko_url,
        config.fear_greed_url
    );

    Arc::new(AppState::new(
        gateway,
        Arc::new(Simulation::new()),
        ForecastConfig::default(),
    ))
}
