//! End-to-end pipeline over the segment store

use crate::analysis::{StationarityAnalyzer, StationarityTest};
use crate::config::Config;
use crate::data::{RawPriceLoader, SegmentKey};
use crate::engine::ForecastEngine;
use crate::error::Result;
use crate::exogenous::ExogenousProviders;
use crate::models::{Evaluation, ForecastResult, ModelVariant};
use crate::profile::{profile_segment, SegmentProfile};
use crate::segment_store::{SegmentMetadata, SegmentStore};
use std::path::Path;
use std::sync::Arc;

/// Store, analyzer and engine wired from one configuration
#[derive(Clone)]
pub struct Pipeline {
    config: Config,
    store: SegmentStore,
    analyzer: StationarityAnalyzer,
    test: Arc<dyn StationarityTest>,
    engine: ForecastEngine,
}

impl Pipeline {
    /// Pipeline reading covariates from the configured files
    pub fn from_config(config: Config) -> Self {
        let providers = ExogenousProviders::from_config(&config);
        Self::with_providers(config, providers)
    }

    pub fn with_providers(config: Config, providers: ExogenousProviders) -> Self {
        let engine = ForecastEngine::from_config(&config, providers);
        let test: Arc<dyn StationarityTest> = Arc::new(crate::analysis::AdfKpssTest);
        Self {
            store: SegmentStore::from_config(&config),
            analyzer: StationarityAnalyzer::new(Arc::clone(&test)),
            test,
            engine,
            config,
        }
    }

    /// Replace the stationarity test pair
    pub fn with_stationarity_test(mut self, test: Arc<dyn StationarityTest>) -> Self {
        self.analyzer = StationarityAnalyzer::new(Arc::clone(&test));
        self.test = test;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn engine(&self) -> &ForecastEngine {
        &self.engine
    }

    pub fn ingest_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<SegmentKey>> {
        self.store.ingest_file(path, &RawPriceLoader::new())
    }

    pub fn analyze(&self, key: &SegmentKey) -> Result<SegmentMetadata> {
        self.analyzer.analyze_segment(&self.store, key)
    }

    /// Exploratory profile of the raw series against its covariates
    pub fn profile(&self, key: &SegmentKey) -> Result<SegmentProfile> {
        let series = self.store.load(key)?;
        let frame = self.engine.exogenous_frame(key, series.dates())?;
        Ok(profile_segment(key, &series, &frame, self.test.as_ref()))
    }

    pub fn train(&self, key: &SegmentKey, variant: ModelVariant) -> Result<Evaluation> {
        self.engine.train_segment(key, variant)
    }

    pub fn forecast(
        &self,
        key: &SegmentKey,
        variant: ModelVariant,
        horizon_days: i64,
    ) -> Result<ForecastResult> {
        self.engine.forecast_variant(key, variant, horizon_days)
    }

    /// Variants named in the batch configuration
    pub fn configured_variants(&self) -> Result<Vec<ModelVariant>> {
        self.config
            .batch
            .variants
            .iter()
            .map(|name| name.parse())
            .collect()
    }
}
