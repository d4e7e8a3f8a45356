//! Runs one (location, date) combine through every phase

use super::context::AggregationContext;
use super::phase::{PhaseTracker, RunPhase};
use super::{CombineRequest, RunReport};
use crate::aggregate::{aggregate_sources, AggregateOptions};
use crate::config::EngineConfig;
use crate::error::{ConsensusError, ErrorCode, Result};
use crate::jobs::{extract_all, ExtractedMask, JobLocator};
use crate::mask::{MaskContainer, MaskSource, Shape};
use crate::store::{build_grids, MaskStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Consensus engine bound to one configuration
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    locator: JobLocator,
    store: MaskStore,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            locator: JobLocator::new(&config.source_root),
            store: MaskStore::new(config.output_root()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &MaskStore {
        &self.store
    }

    /// Fold the jobs of one date into the location's consensus mask
    ///
    /// Nothing becomes visible to readers unless every phase up to
    /// `PersistMetadata` succeeds. Scratch files are removed on every path.
    pub async fn combine(
        &self,
        request: &CombineRequest,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        self.combine_with_progress(request, cancel, |_| {}).await
    }

    /// [`Engine::combine`], reporting every phase the run enters to `on_phase`
    pub async fn combine_with_progress<F>(
        &self,
        request: &CombineRequest,
        cancel: &CancellationToken,
        on_phase: F,
    ) -> Result<RunReport>
    where
        F: Fn(RunPhase) + Send + Sync + 'static,
    {
        request.validate()?;
        let scratch = self.scratch_dir()?;
        let mut phases = PhaseTracker::new(&request.location).with_observer(Arc::new(on_phase));

        let result = self.run(request, scratch.path(), &mut phases, cancel).await;

        if let Err(e) = phases.enter(RunPhase::Cleanup) {
            debug!("{}", e);
        }
        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(
                "Failed to remove scratch directory {}: {}",
                scratch_path.display(),
                e
            );
        }

        let records = phases.into_records();
        match result {
            Ok(mut report) => {
                report.phases = records;
                Ok(report)
            }
            Err(e) => {
                if e.is_cancelled() {
                    warn!("[{}] run cancelled, consensus left unchanged", request.location);
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &CombineRequest,
        scratch: &Path,
        phases: &mut PhaseTracker,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let location = request.location.as_str();

        phases.enter(RunPhase::LoadState)?;
        let lock = self.store.lock(location)?;
        let state = self.store.load(location)?;
        let mut ctx = AggregationContext::new(location, &request.date, state, &request.classes);
        debug!(
            "[{}] prior jobs: {}, classes: {}, shape: {:?}",
            location,
            ctx.prior.jobs,
            ctx.classes.len(),
            ctx.shape
        );
        ensure_running(cancel)?;

        phases.enter(RunPhase::DiscoverJobs)?;
        let archives = self.locator.locate(location, &request.date)?;
        if archives.is_empty() {
            info!("No job archives for location {} on {}", location, request.date);
        }

        phases.enter(RunPhase::Extract)?;
        let extracted = extract_all(
            archives,
            &self.config.mask_extension,
            scratch,
            self.config.max_parallel,
            cancel,
        )
        .await?;
        ctx.new_jobs = extracted.len() as u64;

        let shape = match ctx.shape {
            Some(shape) => shape,
            None => {
                phases.enter(RunPhase::DetermineShape)?;
                let Some(shape) = determine_shape(&extracted, ctx.prior_mask.as_deref())? else {
                    lock.release_unused();
                    return Err(ConsensusError::no_shape(location));
                };
                info!("Location {} shape fixed at {}", location, shape);
                shape
            }
        };
        ctx.shape = Some(shape);

        phases.enter(RunPhase::Aggregate)?;
        let mut sources: Vec<MaskSource> = extracted
            .iter()
            .map(|mask| MaskSource::job(&mask.path))
            .collect();
        if let Some(prior) = &ctx.prior_mask {
            sources.push(MaskSource::consensus(prior));
        }
        let options = AggregateOptions {
            max_parallel: self.config.max_parallel,
            shards: self.config.shards,
        };
        let aggregation = aggregate_sources(sources, shape, options, cancel).await?;
        for skipped in &aggregation.skipped {
            debug!(
                "Skipped dataset '{}' in {}: {}",
                skipped.class,
                skipped.path.display(),
                skipped.reason
            );
        }

        phases.enter(RunPhase::Resolve)?;
        ctx.classes.extend(aggregation.votes.classes());
        let source_count = aggregation.sources;
        let skipped = aggregation.skipped;
        let votes = aggregation.votes;
        let resolved = tokio::task::spawn_blocking(move || votes.resolve())
            .await
            .map_err(|e| {
                ConsensusError::aggregation(
                    ErrorCode::AGG_TASK_FAILED,
                    "resolver task panicked",
                    Some(location.to_string()),
                )
                .with_source(e)
            })?;
        let grids = build_grids(&ctx.classes, shape, resolved)?;
        ensure_running(cancel)?;

        phases.enter(RunPhase::Write)?;
        let mut writer = self.store.stage(&lock)?;
        writer.write_mask(&grids)?;

        phases.enter(RunPhase::PersistMetadata)?;
        let metadata = ctx.next_metadata(shape);
        writer.write_metadata(&metadata)?;
        ensure_running(cancel)?;
        let snapshot = writer.commit()?;
        info!(
            "Location {} now combines {} job(s) over {} class(es) ({})",
            location,
            metadata.jobs,
            metadata.classes.len(),
            snapshot.display()
        );

        Ok(RunReport {
            location: ctx.location,
            date: ctx.date,
            new_jobs: ctx.new_jobs,
            total_jobs: metadata.jobs,
            sources: source_count,
            classes: metadata.classes.into_iter().collect(),
            shape,
            skipped_datasets: skipped,
            phases: Vec::new(),
        })
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let scratch_err = |e: std::io::Error| {
            ConsensusError::extraction(
                ErrorCode::EXTRACT_SCRATCH_FAILED,
                "failed to create scratch directory",
                self.config.scratch_dir.clone(),
            )
            .with_source(e)
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix("mask-consensus-");
        match &self.config.scratch_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(scratch_err)?;
                builder.tempdir_in(parent).map_err(scratch_err)
            }
            None => builder.tempdir().map_err(scratch_err),
        }
    }
}

/// Shape of the first extracted job mask that has a rectangular dataset,
/// falling back to the live consensus mask
fn determine_shape(extracted: &[ExtractedMask], prior_mask: Option<&Path>) -> Result<Option<Shape>> {
    for mask in extracted {
        if let Some(shape) = MaskContainer::open(&mask.path)?.first_shape() {
            debug!("Shape {} taken from {}", shape, mask.archive.display());
            return Ok(Some(shape));
        }
    }
    match prior_mask {
        Some(path) => Ok(MaskContainer::open(path)?.first_shape()),
        None => Ok(None),
    }
}

fn ensure_running(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(ConsensusError::cancelled())
    } else {
        Ok(())
    }
}
