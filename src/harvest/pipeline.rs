//! Harvest coordinator.
//!
//! [`HarvestPipeline`] fetches the place list once, fans out one task per
//! place through a [`HarvesterExecutor`], and merges the per-place buffers
//! after every task has joined:
//! - Bounded parallelism via a `tokio` semaphore
//! - Per-place failure isolation, including panics
//! - Cooperative cancellation and an optional run deadline
//! - Structured logging via `tracing`

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::executor::{HarvesterExecutor, PlaceOutcome};
use crate::model::{HarvestError, OutputRow, Place, UnitFailure};
use crate::traits::{CatalogSource, FetchError};

// ============================================================================
// Pipeline Types
// ============================================================================

/// Which places of the catalog a run harvests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceSelection {
    #[default]
    All,
    /// The first `n` places in catalog order
    First(usize),
    /// `n` places drawn at random without replacement
    Sample(usize),
}

impl PlaceSelection {
    pub fn apply(&self, places: Vec<Place>) -> Vec<Place> {
        match *self {
            PlaceSelection::All => places,
            PlaceSelection::First(n) => places.into_iter().take(n).collect(),
            PlaceSelection::Sample(n) => {
                use rand::seq::IndexedRandom;
                let mut rng = rand::rng();
                places.choose_multiple(&mut rng, n).cloned().collect()
            }
        }
    }
}

/// Complete output of one harvest run.
#[derive(Debug)]
pub struct HarvestResult {
    /// Places the run was scheduled over, after selection
    pub places: Vec<Place>,

    /// Rows of every successful place, grouped by place index, channels in
    /// listing order
    pub rows: Vec<OutputRow>,

    /// One entry per place that contributed no rows because of a failure
    pub errors: Vec<HarvestError>,

    pub stats: HarvestStats,

    /// Whether the run was cut short by cancellation or its deadline
    pub cancelled: bool,
}

#[derive(Debug, Default, Clone)]
pub struct HarvestStats {
    pub places_attempted: usize,
    pub places_succeeded: usize,
    pub channels_seen: usize,
    /// Channels for which no row could be built, e.g. a URL without an id
    pub channels_skipped: usize,
    pub streams_resolved: usize,
    pub streams_unresolved: usize,
    pub total_duration_ms: u64,
}

impl HarvestStats {
    pub fn places_failed(&self) -> usize {
        self.places_attempted - self.places_succeeded
    }

    /// Succeeded / attempted; `1.0` for an empty run.
    pub fn success_ratio(&self) -> f64 {
        if self.places_attempted == 0 {
            return 1.0;
        }
        self.places_succeeded as f64 / self.places_attempted as f64
    }

    pub fn success_percent(&self) -> f64 {
        self.success_ratio() * 100.0
    }

    fn absorb(&mut self, outcome: &PlaceOutcome) {
        self.places_succeeded += 1;
        self.channels_seen += outcome.channels_seen;
        self.channels_skipped += outcome.channels_skipped;
        self.streams_resolved += outcome.streams_resolved;
        self.streams_unresolved += outcome.streams_unresolved;
    }
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that abort a whole run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Concurrency limit must be positive, got {0}")]
    InvalidConcurrency(usize),

    /// The single place-list call failed
    #[error("Failed to list places: {0}")]
    PlaceListFailed(#[source] FetchError),
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Coordinates a harvest run over an injected [`CatalogSource`].
///
/// # Example
///
/// ```ignore
/// let client = Arc::new(RadioGardenClient::new()?);
/// let result = HarvestPipeline::new(client, 20)
///     .with_deadline(Duration::from_secs(3600))
///     .execute()
///     .await?;
/// println!("{} rows, {} failed places", result.rows.len(), result.errors.len());
/// ```
pub struct HarvestPipeline<S>
where
    S: CatalogSource + 'static,
{
    source: Arc<S>,

    /// Maximum number of place units in flight
    concurrency: usize,

    selection: PlaceSelection,

    cancel: CancellationToken,

    /// Cancels the run when elapsed (default: none)
    deadline: Option<Duration>,
}

impl<S> HarvestPipeline<S>
where
    S: CatalogSource + 'static,
{
    pub fn new(source: Arc<S>, concurrency: usize) -> Self {
        Self {
            source,
            concurrency,
            selection: PlaceSelection::All,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_selection(mut self, selection: PlaceSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Uses `token` as the parent of the run's cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Runs the full place → channel → stream expansion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] only if the concurrency limit is zero or the
    /// place list cannot be fetched. Every later failure is recorded in the
    /// returned [`HarvestResult`].
    ///
    /// Dropping the returned future before it completes cancels the run:
    /// waiting units are never admitted and in-flight calls stop.
    pub async fn execute(&self) -> Result<HarvestResult, PipelineError> {
        if self.concurrency == 0 {
            return Err(PipelineError::InvalidConcurrency(self.concurrency));
        }

        let start = Instant::now();
        let cancel = self.cancel.child_token();
        // Dropping this future cancels every unit it spawned.
        let _cancel_on_drop = cancel.clone().drop_guard();
        let _deadline = self.deadline.map(|d| DeadlineTimer::start(d, cancel.clone()));

        info!("GET Places");
        let listed = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.source.list_places() => result,
        };
        let places = listed.map_err(PipelineError::PlaceListFailed)?;
        info!("Successfully got {} places", places.len());

        let places = self.selection.apply(places);
        let executor = Arc::new(HarvesterExecutor::new(self.concurrency, cancel.clone()));

        let handles: Vec<JoinHandle<Result<PlaceOutcome, FetchError>>> = places
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, place)| {
                let executor = Arc::clone(&executor);
                let source = Arc::clone(&self.source);
                tokio::spawn(async move { executor.execute(source.as_ref(), index, &place).await })
            })
            .collect();

        let mut rows = Vec::new();
        let mut errors = Vec::new();
        let mut stats = HarvestStats {
            places_attempted: places.len(),
            ..HarvestStats::default()
        };

        // Join barrier: buffers are merged in place order only after each task ends.
        for (index, handle) in handles.into_iter().enumerate() {
            let place = &places[index];
            let failure = match handle.await {
                Ok(Ok(outcome)) => {
                    stats.absorb(&outcome);
                    rows.extend(outcome.rows);
                    continue;
                }
                Ok(Err(err)) => UnitFailure::Fetch(err),
                Err(join_err) => UnitFailure::Panicked(panic_message(join_err)),
            };
            if !failure.is_cancelled() {
                error!("ERROR [{}] - {}: {}", index, place.title, failure);
            }
            errors.push(HarvestError::new(index, place, failure));
        }

        let skipped = errors.iter().filter(|e| e.cause.is_cancelled()).count();
        let cancelled = skipped > 0;
        if cancelled {
            warn!(skipped, "Harvest cancelled before completion");
        }

        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            rows = rows.len(),
            streams_unresolved = stats.streams_unresolved,
            duration_ms = stats.total_duration_ms,
            "Successfully got {}/{} ({:.2}%) places",
            stats.places_succeeded,
            stats.places_attempted,
            stats.success_percent()
        );

        Ok(HarvestResult {
            places,
            rows,
            errors,
            stats,
            cancelled,
        })
    }
}

/// Cancels a token after a delay; the timer is aborted when dropped.
struct DeadlineTimer(JoinHandle<()>);

impl DeadlineTimer {
    fn start(deadline: Duration, token: CancellationToken) -> Self {
        Self(tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!(deadline_secs = deadline.as_secs_f64(), "Harvest deadline reached");
            token.cancel();
        }))
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoPoint;

    fn places(n: usize) -> Vec<Place> {
        (0..n)
            .map(|i| Place {
                id: format!("p{i}"),
                title: format!("Place {i}"),
                country: "Nowhere".to_string(),
                size: 1,
                boost: false,
                geo: GeoPoint { lat: 0.0, lon: 0.0 },
                url: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_selection_first() {
        let picked = PlaceSelection::First(3).apply(places(10));
        let ids: Vec<_> = picked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p0", "p1", "p2"]);
    }

    #[test]
    fn test_selection_sample_has_no_duplicates() {
        let mut picked: Vec<_> = PlaceSelection::Sample(5)
            .apply(places(10))
            .into_iter()
            .map(|p| p.id)
            .collect();
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn test_selection_larger_than_catalog() {
        assert_eq!(PlaceSelection::First(50).apply(places(4)).len(), 4);
        assert_eq!(PlaceSelection::Sample(50).apply(places(4)).len(), 4);
    }

    #[test]
    fn test_success_ratio() {
        let stats = HarvestStats {
            places_attempted: 3,
            places_succeeded: 2,
            ..HarvestStats::default()
        };
        assert!((stats.success_ratio() - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(stats.places_failed(), 1);
        assert_eq!(HarvestStats::default().success_ratio(), 1.0);
    }
}
