// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Pipeline orchestrator
//!
//! Chains the seven pipes in fixed order over one [`PipelineState`]. A run
//! stops at the first failing stage, or right after the target stage of a
//! partial run.

use std::sync::Arc;

use super::pipes::{
    handle, DownloadPipe, FilterPipe, ImagesPreparePipe, MapPipe, Pipe, PreparePipe, ReadPipe,
    SavePipe,
};
use super::{MemorySampler, PipelineState, RunResult, Stage};
use crate::cache::Cache;
use crate::config::PipelineConfig;
use crate::downloaders::DownloaderRegistry;
use crate::filter::OperatorRegistry;
use crate::readers::ReaderRegistry;
use crate::resolvers::ResolverRegistry;
use crate::saver::{ImageFetcher, ResultSaver};
use crate::transform::TransformerRegistry;

/// Pipeline orchestrator
pub struct PipelineOrchestrator {
    downloaders: Arc<DownloaderRegistry>,
    readers: Arc<ReaderRegistry>,
    operators: Arc<OperatorRegistry>,
    transformers: Arc<TransformerRegistry>,
    resolvers: Arc<ResolverRegistry>,
    saver: Option<Arc<dyn ResultSaver>>,
    image_fetcher: Option<Arc<dyn ImageFetcher>>,
    cache: Option<Arc<dyn Cache>>,
    sampler: MemorySampler,
}

impl PipelineOrchestrator {
    /// Create an orchestrator with every built-in strategy and no saver
    pub fn new() -> Self {
        Self {
            downloaders: Arc::new(DownloaderRegistry::with_defaults()),
            readers: Arc::new(ReaderRegistry::with_defaults()),
            operators: Arc::new(OperatorRegistry::with_defaults()),
            transformers: Arc::new(TransformerRegistry::with_defaults()),
            resolvers: Arc::new(ResolverRegistry::with_defaults()),
            saver: None,
            image_fetcher: None,
            cache: None,
            sampler: MemorySampler::new(),
        }
    }

    pub fn with_downloaders(mut self, downloaders: DownloaderRegistry) -> Self {
        self.downloaders = Arc::new(downloaders);
        self
    }

    pub fn with_readers(mut self, readers: ReaderRegistry) -> Self {
        self.readers = Arc::new(readers);
        self
    }

    pub fn with_operators(mut self, operators: OperatorRegistry) -> Self {
        self.operators = Arc::new(operators);
        self
    }

    pub fn with_transformers(mut self, transformers: TransformerRegistry) -> Self {
        self.transformers = Arc::new(transformers);
        self
    }

    pub fn with_resolvers(mut self, resolvers: ResolverRegistry) -> Self {
        self.resolvers = Arc::new(resolvers);
        self
    }

    /// Set the persistence collaborator used by the Save stage
    pub fn with_saver(mut self, saver: Arc<dyn ResultSaver>) -> Self {
        self.saver = Some(saver);
        self
    }

    pub fn with_image_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.image_fetcher = Some(fetcher);
        self
    }

    /// Set the download cache; only consulted when `options.cache` is on
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn pipes(&self) -> Vec<Box<dyn Pipe>> {
        vec![
            Box::new(DownloadPipe::new(Arc::clone(&self.downloaders), self.cache.clone())),
            Box::new(ReadPipe::new(Arc::clone(&self.readers))),
            Box::new(FilterPipe::new(Arc::clone(&self.operators))),
            Box::new(MapPipe::new(Arc::clone(&self.transformers))),
            Box::new(ImagesPreparePipe),
            Box::new(PreparePipe::new(Arc::clone(&self.resolvers))),
            Box::new(SavePipe::new(self.saver.clone(), self.image_fetcher.clone())),
        ]
    }

    /// Run every stage
    pub async fn run(&self, config: &PipelineConfig) -> RunResult {
        self.execute(config, None).await
    }

    /// Run stages up to and including `target`
    pub async fn run_to_stage(&self, config: &PipelineConfig, target: Stage) -> RunResult {
        self.execute(config, Some(target)).await
    }

    async fn execute(&self, config: &PipelineConfig, target: Option<Stage>) -> RunResult {
        let mut state =
            PipelineState::new(Arc::new(config.clone()), target).with_baseline(self.sampler.sample());
        tracing::info!(
            pipeline = %config.name,
            target = target.map(|s| s.as_ref().to_string()).unwrap_or_else(|| "all".into()),
            "pipeline started"
        );

        for pipe in self.pipes() {
            if !handle(pipe.as_ref(), &mut state, &self.sampler).await {
                break;
            }
            if state.reached_target() {
                tracing::debug!(stage = %pipe.stage(), "target stage reached");
                break;
            }
        }

        let result = state.into_result(self.sampler.sample());
        tracing::info!(
            pipeline = %result.pipeline,
            success = result.success,
            duration_ms = result.duration_ms,
            errors = result.errors.len(),
            "pipeline finished"
        );
        result
    }
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FilesystemCache;
    use crate::config::{FilterConfig, ImageDownloadMode, ImagesConfig};
    use crate::downloaders::{DownloadConfig, Downloader, DownloaderType};
    use crate::errors::{FeedflowError, FeedflowResult};
    use crate::filter::{FilterOperator, FilterRule};
    use crate::mapping::{MappingConfig, MappingRule};
    use crate::pipeline::DownloadResult;
    use crate::readers::{ReadConfig, ReaderType};
    use crate::resolvers::{Category, CategoryConfig, PrepareConfig, ResolveOutcome, Resolver, ResolverKind};
    use crate::saver::{SaveResult, SavedEntity};
    use crate::transform::{TransformOptions, Transformer, TransformerKind};
    use crate::record::Record;
    use crate::errors::RecordError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    const FEED: &str = "sku,make,model,year,price,images\n\
                        A1,Volvo,XC60,2019,\"21.500,00\",a.jpg|b.jpg|c.jpg\n\
                        A2,Audi,A4,2011,9000,\n\
                        A3,Volvo,V70,2015,12000,d.jpg\n";

    /// Serves a fixed payload and counts calls
    struct StaticDownloader {
        payload: &'static str,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Downloader for StaticDownloader {
        fn name(&self) -> &'static str {
            "static"
        }

        fn accepted_options(&self) -> &'static [&'static str] {
            &[]
        }

        async fn download(&self, _config: &DownloadConfig) -> FeedflowResult<DownloadResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(DownloadResult::from_payload(
                self.payload.as_bytes().to_vec(),
                Some("feed".into()),
                None,
            ))
        }
    }

    struct CountingTransformer(Arc<AtomicUsize>);

    impl Transformer for CountingTransformer {
        fn transform(&self, value: Value, _options: &TransformOptions) -> Result<Value, String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    struct CountingResolver(Arc<AtomicUsize>);

    impl Resolver for CountingResolver {
        fn resolve(&self, _record: &mut Record, _config: &PrepareConfig) -> Result<ResolveOutcome, RecordError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ResolveOutcome::Skipped)
        }
    }

    /// Saves every record; even rows are new products, odd rows updates with images
    #[derive(Default)]
    struct CountingSaver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResultSaver for CountingSaver {
        async fn save(&self, state: &PipelineState, _target_id: i64) -> FeedflowResult<SaveResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let records = &state.results.prepare.as_ref().unwrap().records;
            let entities: Vec<SavedEntity> = records
                .iter()
                .enumerate()
                .map(|(row_index, record)| SavedEntity {
                    row_index,
                    reference: record["sku"].as_str().unwrap_or_default().to_string(),
                    created: row_index % 2 == 0,
                    has_images: row_index % 2 == 1,
                })
                .collect();
            Ok(SaveResult {
                created: entities.iter().filter(|e| e.created).count(),
                updated: entities.iter().filter(|e| !e.created).count(),
                entities,
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct RecordingFetcher {
        seen: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl ImageFetcher for RecordingFetcher {
        async fn dispatch(&self, entity: &SavedEntity, images: &[String]) -> FeedflowResult<()> {
            self.seen
                .lock()
                .unwrap()
                .push((entity.reference.clone(), images.to_vec()));
            Ok(())
        }
    }

    /// Rejects one reference, accepts the rest
    #[derive(Default)]
    struct RejectingFetcher {
        reject: &'static str,
        accepted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageFetcher for RejectingFetcher {
        async fn dispatch(&self, entity: &SavedEntity, _images: &[String]) -> FeedflowResult<()> {
            if entity.reference == self.reject {
                return Err(FeedflowError::SaveFailed {
                    message: "image queue unavailable".into(),
                });
            }
            self.accepted.lock().unwrap().push(entity.reference.clone());
            Ok(())
        }
    }

    fn downloaders(payload: &'static str, delay: Duration, calls: Arc<AtomicUsize>) -> DownloaderRegistry {
        let mut registry = DownloaderRegistry::new();
        registry.register(
            DownloaderType::Http,
            Box::new(StaticDownloader { payload, delay, calls }),
        );
        registry
    }

    fn orchestrator(payload: &'static str) -> PipelineOrchestrator {
        PipelineOrchestrator::new().with_downloaders(downloaders(payload, Duration::ZERO, Arc::default()))
    }

    fn config(read: ReaderType) -> PipelineConfig {
        let mut config = PipelineConfig::new(
            "test",
            DownloadConfig::new(DownloaderType::Http, "http://feeds.test/stock"),
            ReadConfig::new(read),
        );
        config.target_id = 3;
        config.options.logging = false;
        config
    }

    fn full_config() -> PipelineConfig {
        let mut config = config(ReaderType::Csv);
        config.filter = Some(FilterConfig::new(vec![FilterRule::new(
            "year",
            FilterOperator::GreaterThanOrEqual,
            json!(2015),
        )]));
        config.map = Some(MappingConfig {
            rules: vec![
                MappingRule::new("sku", "sku").required(),
                MappingRule::new("make", "make").with_transformation(TransformerKind::Upper),
                MappingRule::new("model", "model"),
                MappingRule::new("year", "year").with_transformation(TransformerKind::Int),
                MappingRule::new("price", "price"),
                MappingRule::new("images", "images"),
            ],
            ..Default::default()
        });
        config.images_prepare = Some(ImagesConfig {
            separator: "|".into(),
            skip_indexes: vec![0],
            download_mode: ImageDownloadMode::NewProductsOnly,
            ..Default::default()
        });
        config.prepare = Some(PrepareConfig::with_transformations([
            ResolverKind::Title,
            ResolverKind::Pricing,
        ]));
        config
    }

    #[tokio::test]
    async fn test_full_run() {
        let saver = Arc::new(CountingSaver::default());
        let fetcher = Arc::new(RecordingFetcher::default());
        let orchestrator = orchestrator(FEED)
            .with_saver(saver.clone())
            .with_image_fetcher(fetcher.clone());

        let result = orchestrator.run(&full_config()).await;

        assert!(result.success, "{:?}", result.errors);
        assert!(!result.has_errors());
        assert_eq!(result.last_stage, Some(Stage::Save));
        assert_eq!(result.stages.len(), 7);

        let filter = result.results.filter.as_ref().unwrap();
        assert_eq!((filter.total, filter.filtered_count, filter.excluded_count), (3, 2, 1));

        let prepare = result.results.prepare.as_ref().unwrap();
        assert_eq!(prepare.records[0]["make"], json!("VOLVO"));
        assert_eq!(prepare.records[0]["title"], json!("2019 VOLVO XC60"));
        assert_eq!(prepare.records[0]["images"], json!(["b.jpg", "c.jpg"]));
        assert_eq!(prepare.records[1]["images"], json!([]));

        let save = result.results.save.as_ref().unwrap();
        assert_eq!((save.created, save.updated), (1, 1));
        assert_eq!(save.images_dispatched, 1);
        assert_eq!(
            *fetcher.seen.lock().unwrap(),
            vec![("A1".to_string(), vec!["b.jpg".to_string(), "c.jpg".to_string()])]
        );
        assert_eq!(saver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_to_filter_leaves_later_stages_untouched() {
        let transformer_calls = Arc::new(AtomicUsize::new(0));
        let resolver_calls = Arc::new(AtomicUsize::new(0));
        let mut transformers = TransformerRegistry::with_defaults();
        transformers.register(TransformerKind::Upper, Box::new(CountingTransformer(transformer_calls.clone())));
        let mut resolvers = ResolverRegistry::new();
        resolvers.register(ResolverKind::Title, Box::new(CountingResolver(resolver_calls.clone())));
        resolvers.register(ResolverKind::Pricing, Box::new(CountingResolver(resolver_calls.clone())));
        let saver = Arc::new(CountingSaver::default());

        let orchestrator = orchestrator(FEED)
            .with_transformers(transformers)
            .with_resolvers(resolvers)
            .with_saver(saver.clone());

        let result = orchestrator.run_to_stage(&full_config(), Stage::Filter).await;

        assert!(result.success);
        assert_eq!(result.last_stage, Some(Stage::Filter));
        assert!(result.results.download.is_some());
        assert!(result.results.read.is_some());
        assert!(result.results.filter.is_some());
        assert!(result.results.mapping.is_none());
        assert!(result.results.prepare.is_none());
        assert!(result.results.save.is_none());
        assert_eq!(transformer_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver_calls.load(Ordering::SeqCst), 0);
        assert_eq!(saver.calls.load(Ordering::SeqCst), 0);

        let (stage, records) = result.last_records().unwrap();
        assert_eq!(stage, Stage::Filter);
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_read_failure_halts_run() {
        let orchestrator = orchestrator("{\"items\": [unterminated").with_saver(Arc::new(CountingSaver::default()));
        let mut config = config(ReaderType::Json);
        config.filter = Some(FilterConfig::default());
        config.prepare = Some(PrepareConfig::default());

        let result = orchestrator.run(&config).await;

        assert!(result.is_failed());
        assert_eq!(result.halted_stage, Some(Stage::Read));
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Read failed: "));
        assert!(result.results.download.is_some());
        assert!(result.results.filter.is_none());
        assert!(result.results.mapping.is_none());
        assert!(result.results.prepare.is_none());
        assert!(result.results.save.is_none());
    }

    #[tokio::test]
    async fn test_record_errors_do_not_fail_run() {
        let mut config = config(ReaderType::Json);
        config.map = Some(MappingConfig {
            rules: vec![MappingRule::new("price", "amount").required()],
            ..Default::default()
        });

        let result = orchestrator(r#"[{"price": 10}, {}]"#)
            .run_to_stage(&config, Stage::Prepare)
            .await;

        assert!(result.success);
        assert!(result.has_errors());
        assert_eq!(result.errors, vec!["Map row 1: required field 'price' is missing"]);
        assert_eq!(result.results.mapping.as_ref().unwrap().mapped_count, 1);
    }

    #[tokio::test]
    async fn test_stop_on_error_escalates() {
        let mut config = config(ReaderType::Json);
        config.options.stop_on_error = true;
        config.map = Some(MappingConfig {
            rules: vec![MappingRule::new("price", "amount").required()],
            ..Default::default()
        });

        let result = orchestrator(r#"[{}]"#).run(&config).await;

        assert_eq!(result.halted_stage, Some(Stage::Map));
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[1].starts_with("Map failed: 1 record error(s)"));
        assert!(result.results.prepare.is_none());
    }

    #[tokio::test]
    async fn test_save_without_saver_fails() {
        let result = orchestrator(r#"[{"a": 1}]"#).run(&config(ReaderType::Json)).await;
        assert_eq!(result.halted_stage, Some(Stage::Save));
        assert_eq!(result.errors, vec!["Save failed: no result saver configured"]);
        assert_eq!(result.results.prepare.as_ref().unwrap().records.len(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_downloader_fails_download() {
        let mut config = config(ReaderType::Json);
        config.download.kind = DownloaderType::Sftp;
        let result = orchestrator("[]").run(&config).await;
        assert_eq!(result.halted_stage, Some(Stage::Download));
        assert!(result.errors[0].starts_with("Download failed: "));
        assert!(result.results.download.is_none());
    }

    #[tokio::test]
    async fn test_download_timeout() {
        let orchestrator = PipelineOrchestrator::new().with_downloaders(downloaders(
            "[]",
            Duration::from_secs(5),
            Arc::default(),
        ));
        let mut config = config(ReaderType::Json);
        config.options.timeout_secs = Some(1);

        let result = orchestrator.run(&config).await;
        assert_eq!(result.errors, vec!["Download failed: Stage timed out after 1s"]);
    }

    #[tokio::test]
    async fn test_intermediate_records_released() {
        let saver = Arc::new(CountingSaver::default());
        let result = orchestrator(FEED).with_saver(saver.clone()).run(&full_config()).await;
        let read = result.results.read.as_ref().unwrap();
        assert!(read.records.is_empty());
        assert_eq!(read.total, 3);
        assert!(result.results.download.as_ref().unwrap().payload.is_none());

        let mut keep = full_config();
        keep.options.release_intermediate = false;
        let result = orchestrator(FEED).with_saver(saver).run(&keep).await;
        assert_eq!(result.results.read.as_ref().unwrap().records.len(), 3);
        assert_eq!(result.results.filter.as_ref().unwrap().records.len(), 2);
        assert_eq!(result.results.mapping.as_ref().unwrap().records.len(), 2);
        assert_eq!(result.results.prepare.as_ref().unwrap().records.len(), 2);
    }

    #[tokio::test]
    async fn test_mapped_records_move_into_prepare() {
        let saver = Arc::new(CountingSaver::default());
        let result = orchestrator(FEED).with_saver(saver).run(&full_config()).await;
        let mapping = result.results.mapping.as_ref().unwrap();
        assert!(mapping.records.is_empty());
        assert_eq!(mapping.mapped_count, 2);
        assert_eq!(result.results.prepare.as_ref().unwrap().records.len(), 2);
    }

    #[tokio::test]
    async fn test_resolver_failure_keeps_record() {
        let mut config = config(ReaderType::Json);
        let mut prepare = PrepareConfig::with_transformations([ResolverKind::Category, ResolverKind::Title]);
        prepare.category = Some(CategoryConfig {
            categories: vec![Category {
                id: 7,
                slug: "suv".into(),
                name: "SUV".into(),
            }],
            ..Default::default()
        });
        config.prepare = Some(prepare);

        let result = orchestrator(r#"[{"category": "zzz", "year": 2019, "make": "A", "model": "B"}]"#)
            .run_to_stage(&config, Stage::Prepare)
            .await;

        assert!(result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Prepare row 0: resolver 'category': no category matches 'zzz'"));

        let prepare = result.results.prepare.as_ref().unwrap();
        assert_eq!(prepare.records.len(), 1);
        assert_eq!(prepare.records[0]["title"], json!("2019 A B"));
        assert!(!prepare.records[0].contains_key("category_id"));
        assert_eq!(prepare.resolver_stats[0].failed, 1);
        assert_eq!(prepare.resolver_stats[1].applied, 1);
        assert_eq!(prepare.prepared, 1);
    }

    #[tokio::test]
    async fn test_image_download_modes() {
        // Row 0 (A1) is a new product without images, row 1 (A3) an update that has images
        let cases = [
            (ImageDownloadMode::All, vec![], vec!["A1", "A3"]),
            (ImageDownloadMode::NewProductsOnly, vec![], vec!["A1"]),
            (ImageDownloadMode::ProductsWithoutImages, vec![], vec!["A1"]),
            // A3's only image is skipped, so there is nothing to fetch for it
            (ImageDownloadMode::All, vec![0], vec!["A1"]),
        ];

        for (mode, skip_indexes, expected) in cases {
            let fetcher = Arc::new(RecordingFetcher::default());
            let mut config = full_config();
            if let Some(images) = config.images_prepare.as_mut() {
                images.download_mode = mode;
                images.skip_indexes = skip_indexes.clone();
            }

            let result = orchestrator(FEED)
                .with_saver(Arc::new(CountingSaver::default()))
                .with_image_fetcher(fetcher.clone())
                .run(&config)
                .await;

            assert!(result.success, "{mode}: {:?}", result.errors);
            let seen: Vec<String> = fetcher.seen.lock().unwrap().iter().map(|(r, _)| r.clone()).collect();
            assert_eq!(seen, expected, "{mode} skip {skip_indexes:?}");
            assert_eq!(result.results.save.as_ref().unwrap().images_dispatched, expected.len());
        }
    }

    #[tokio::test]
    async fn test_failed_image_dispatch_is_a_save_row_error() {
        let fetcher = Arc::new(RejectingFetcher {
            reject: "A1",
            ..Default::default()
        });
        let mut config = full_config();
        if let Some(images) = config.images_prepare.as_mut() {
            images.download_mode = ImageDownloadMode::All;
            images.skip_indexes.clear();
        }

        let result = orchestrator(FEED)
            .with_saver(Arc::new(CountingSaver::default()))
            .with_image_fetcher(fetcher.clone())
            .run(&config)
            .await;

        assert!(result.success);
        assert_eq!(result.last_stage, Some(Stage::Save));
        assert_eq!(
            result.errors,
            vec!["Save row 0: image dispatch for 'A1' failed: image queue unavailable"]
        );
        let save = result.results.save.as_ref().unwrap();
        assert_eq!(save.images_dispatched, 1);
        assert_eq!(save.created + save.updated, 2);
        assert_eq!(*fetcher.accepted.lock().unwrap(), vec!["A3".to_string()]);
    }

    #[tokio::test]
    async fn test_cached_download_skips_downloader() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let cache: Arc<dyn Cache> = Arc::new(FilesystemCache::new(temp.path().to_path_buf()).unwrap());
        let orchestrator = PipelineOrchestrator::new()
            .with_downloaders(downloaders(r#"[{"a": 1}]"#, Duration::ZERO, calls.clone()))
            .with_cache(cache);
        let mut config = config(ReaderType::Json);
        config.options.cache = true;

        let first = orchestrator.run_to_stage(&config, Stage::Read).await;
        let second = orchestrator.run_to_stage(&config, Stage::Read).await;

        assert!(!first.results.download.as_ref().unwrap().from_cache);
        assert!(second.results.download.as_ref().unwrap().from_cache);
        assert_eq!(second.results.read.as_ref().unwrap().records.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_upstream_message() {
        let err = PipelineState::missing(Stage::Save, Stage::Prepare);
        assert!(matches!(err, FeedflowError::MissingUpstream { .. }));
        assert_eq!(
            err.to_string(),
            "Save requires the Prepare result, which is not available"
        );
    }
}
