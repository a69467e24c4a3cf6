//! Two-stage measurement pipeline
//!
//! Source -> latency stage -> top `ping_count` -> throughput stage ->
//! top `download_count`. Each stage runs behind the previous stage's
//! completion barrier.

use crate::{
    error::{AppError, Result},
    executor::{Probe, WorkerPool},
    log_info, log_warn,
    logging::{LogLevel, Logger, LoggerFactory, PerformanceLogger},
    models::{Config, Endpoint},
    probe::{LatencyProbe, ThroughputProbe},
    ranking::RankedSelector,
    source::{CandidateSource, FallbackSource},
    types::Stage,
};
use serde::Serialize;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Sizing of the two stages
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub ping_concurrency: usize,
    pub ping_count: usize,
    pub download_concurrency: usize,
    pub download_count: usize,
    /// Overall time budget; when it runs out the run stops early
    pub deadline: Option<Duration>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ping_concurrency: config.ping_concurrency,
            ping_count: config.ping_count,
            download_concurrency: config.download_concurrency,
            download_count: config.download_count,
            deadline: config.deadline(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What one probe stage did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    /// Endpoints handed to the stage
    pub input: usize,
    /// Probes that ran to completion
    pub probed: usize,
    /// Endpoints with a real measurement after the stage
    pub succeeded: usize,
    /// Endpoints surviving the funnel
    pub kept: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_ms")]
    pub elapsed: Duration,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub candidates: usize,
    pub latency_stage: Option<StageSummary>,
    pub throughput_stage: Option<StageSummary>,
    /// Ranked best first
    pub results: Vec<Endpoint>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_ms")]
    pub elapsed: Duration,
    /// The run was cancelled or hit its deadline
    pub interrupted: bool,
}

impl PipelineReport {
    fn new(candidates: usize) -> Self {
        Self {
            candidates,
            latency_stage: None,
            throughput_stage: None,
            results: Vec::new(),
            elapsed: Duration::ZERO,
            interrupted: false,
        }
    }

    pub fn stages(&self) -> impl Iterator<Item = &StageSummary> {
        self.latency_stage.iter().chain(self.throughput_stage.iter())
    }
}

fn serialize_ms<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}

/// Aborts the deadline timer when the run ends
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The measurement pipeline
pub struct Pipeline {
    settings: PipelineSettings,
    source: Box<dyn CandidateSource>,
    latency_probe: Arc<dyn Probe<Endpoint>>,
    throughput_probe: Arc<dyn Probe<Endpoint>>,
    logger: Logger,
    perf: Option<PerformanceLogger>,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        source: Box<dyn CandidateSource>,
        latency_probe: Arc<dyn Probe<Endpoint>>,
        throughput_probe: Arc<dyn Probe<Endpoint>>,
    ) -> Self {
        let mut logger = Logger::new("PIPE".to_string());
        logger.set_level(LogLevel::Warn);

        Self {
            settings,
            source,
            latency_probe,
            throughput_probe,
            logger,
            perf: None,
        }
    }

    /// Wire the real source and probes from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_factory(&LoggerFactory::new(config.clone()))
    }

    /// Wire the real source and probes from the factory's configuration,
    /// logging every stage under the factory's session
    pub fn from_factory(factory: &LoggerFactory) -> Result<Self> {
        let config = factory.config();
        let source = FallbackSource::from_config(config)?.with_loggers(factory);
        let latency = LatencyProbe::from_config(config).with_logger(factory.create_probe_logger());
        let throughput = ThroughputProbe::from_config(config)?.with_logger(factory.create_probe_logger());

        let mut pipeline = Self::new(
            PipelineSettings::from_config(config),
            Box::new(source),
            Arc::new(latency),
            Arc::new(throughput),
        );
        pipeline.logger = factory.create_logger("PIPE");
        pipeline.perf = Some(factory.create_performance_logger());
        Ok(pipeline)
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run to completion (or until the configured deadline)
    pub async fn run(&self) -> Result<PipelineReport> {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Run until done or until `cancel` fires.
    ///
    /// Cancellation lets the current stage drain, skips later stages and
    /// reports what has been ranked so far.
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> Result<PipelineReport> {
        let start_time = Instant::now();
        let token = cancel.child_token();

        let _deadline = self.settings.deadline.map(|deadline| {
            let token = token.clone();
            AbortOnDrop(tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                token.cancel();
            }))
        });

        // Stage 1: candidates
        let candidates = tokio::select! {
            biased;
            _ = token.cancelled() => {
                log_warn!(self.logger, "Interrupted while loading candidates");
                let mut report = PipelineReport::new(0);
                report.interrupted = true;
                report.elapsed = start_time.elapsed();
                return Ok(report);
            }
            loaded = self.source.candidates() => loaded?,
        };
        if candidates.is_empty() {
            return Err(AppError::source_unavailable(format!(
                "{} returned no candidates",
                self.source.describe()
            )));
        }
        log_info!(self.logger, "{} candidates from {}", candidates.len(), self.source.describe());

        let mut report = PipelineReport::new(candidates.len());

        // Stages 2 and 3: latency, funnel to ping_count
        let (shortlist, summary) = self
            .run_stage(
                Stage::Latency,
                candidates,
                self.latency_probe.clone(),
                self.settings.ping_concurrency,
                self.settings.ping_count,
                &token,
                Endpoint::has_latency,
            )
            .await?;
        report.latency_stage = Some(summary);

        if token.is_cancelled() {
            log_warn!(self.logger, "Interrupted after latency stage, skipping throughput stage");
            report.results = RankedSelector::new(self.settings.download_count).select(shortlist);
            report.interrupted = true;
            report.elapsed = start_time.elapsed();
            return Ok(report);
        }

        // Stages 4 and 5: throughput, funnel to download_count
        let (results, summary) = self
            .run_stage(
                Stage::Throughput,
                shortlist,
                self.throughput_probe.clone(),
                self.settings.download_concurrency,
                self.settings.download_count,
                &token,
                Endpoint::has_throughput,
            )
            .await?;
        report.throughput_stage = Some(summary);
        report.results = results;
        report.interrupted = token.is_cancelled();
        report.elapsed = start_time.elapsed();

        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_stage(
        &self,
        stage: Stage,
        input: Vec<Endpoint>,
        probe: Arc<dyn Probe<Endpoint>>,
        workers: usize,
        keep: usize,
        cancel: &CancellationToken,
        succeeded: fn(&Endpoint) -> bool,
    ) -> Result<(Vec<Endpoint>, StageSummary)> {
        let correlation_id = self.logger.start_operation(stage.as_str()).await;
        let input_len = input.len();

        let outcome = match WorkerPool::new(workers).run(input, probe, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.logger.end_operation(&correlation_id, stage.as_str(), false).await;
                return Err(e);
            }
        };

        let succeeded_count = outcome.items.iter().filter(|e| succeeded(e)).count();
        if let Some(perf) = &self.perf {
            perf.log_pool_run(stage.as_str(), &outcome.stats, succeeded_count).await;
        }

        let kept = RankedSelector::new(keep).select(outcome.items);
        let summary = StageSummary {
            stage,
            input: input_len,
            probed: outcome.stats.completed(),
            succeeded: succeeded_count,
            kept: kept.len(),
            elapsed: outcome.stats.elapsed,
        };

        self.logger.end_operation(&correlation_id, stage.as_str(), true).await;
        Ok((kept, summary))
    }
}
