//! Vote aggregation across mask sources
//!
//! Each source is read and folded into its own partial [`ShardedVotes`] on a
//! blocking worker. Partials are merged as workers finish; because the merge
//! is plain addition, completion order does not matter. The returned
//! [`Aggregation`] is complete only after every worker has finished, which is
//! the barrier before resolution.

pub mod shard;

pub use shard::ShardedVotes;

use crate::error::{ConsensusError, ErrorCode, Result};
use crate::mask::{read_mask, MaskSource, Shape, SkippedDataset};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Votes between cancellation checks inside a worker
const CANCEL_CHECK_INTERVAL: usize = 1 << 14;

/// Worker pool settings for one aggregation
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    pub max_parallel: usize,
    pub shards: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            shards: 16,
        }
    }
}

/// Reduced votes of every source in one run
#[derive(Debug)]
pub struct Aggregation {
    pub votes: ShardedVotes,
    pub skipped: Vec<SkippedDataset>,
    pub sources: usize,
    pub total_votes: usize,
}

/// Read and sum every source against the location shape
///
/// A shape mismatch, unreadable source or cancellation fails the whole
/// aggregation; remaining workers are told to stop.
pub async fn aggregate_sources(
    sources: Vec<MaskSource>,
    shape: Shape,
    options: AggregateOptions,
    cancel: &CancellationToken,
) -> Result<Aggregation> {
    let worker_cancel = cancel.child_token();
    let result = run_workers(sources, shape, options, &worker_cancel).await;
    if result.is_err() {
        worker_cancel.cancel();
    }
    result
}

async fn run_workers(
    sources: Vec<MaskSource>,
    shape: Shape,
    options: AggregateOptions,
    cancel: &CancellationToken,
) -> Result<Aggregation> {
    let source_count = sources.len();
    info!(
        "Aggregating {} source(s) (max parallel: {}, shards: {})",
        source_count, options.max_parallel, options.shards
    );

    let semaphore = Arc::new(Semaphore::new(options.max_parallel.max(1)));
    let mut futures = FuturesUnordered::new();

    for source in sources {
        if cancel.is_cancelled() {
            return Err(ConsensusError::cancelled());
        }
        let permit = semaphore.clone().acquire_owned().await.map_err(|e| {
            ConsensusError::aggregation(ErrorCode::AGG_TASK_FAILED, "worker semaphore closed", None)
                .with_source(e)
        })?;
        let cancel = cancel.clone();
        let shards = options.shards;

        futures.push(tokio::task::spawn_blocking(move || {
            let result = fold_source(&source, shape, shards, &cancel);
            drop(permit);
            result
        }));
    }

    let mut votes = ShardedVotes::new(options.shards);
    let mut skipped = Vec::new();
    let mut total_votes = 0;
    while let Some(joined) = futures.next().await {
        let (partial, partial_skipped, count) = joined.map_err(|e| {
            ConsensusError::aggregation(ErrorCode::AGG_TASK_FAILED, "aggregation worker panicked", None)
                .with_source(e)
        })??;
        votes = votes.merge(partial);
        skipped.extend(partial_skipped);
        total_votes += count;
    }

    if cancel.is_cancelled() {
        return Err(ConsensusError::cancelled());
    }

    skipped.sort_by(|a, b| (&a.path, &a.class).cmp(&(&b.path, &b.class)));
    info!(
        "Reduced {} vote(s) into {} key(s)",
        total_votes,
        votes.len()
    );
    Ok(Aggregation {
        votes,
        skipped,
        sources: source_count,
        total_votes,
    })
}

fn fold_source(
    source: &MaskSource,
    shape: Shape,
    shards: usize,
    cancel: &CancellationToken,
) -> Result<(ShardedVotes, Vec<SkippedDataset>, usize)> {
    let read = read_mask(source, Some(shape))?;
    let mut partial = ShardedVotes::new(shards);
    let mut count = 0;
    for (key, vote) in read.votes {
        if count % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return Err(ConsensusError::cancelled());
        }
        partial.add(key, vote);
        count += 1;
    }
    debug!(
        "Folded {} vote(s) from {} ({:?})",
        count,
        source.path.display(),
        source.kind
    );
    Ok((partial, read.skipped, count))
}
