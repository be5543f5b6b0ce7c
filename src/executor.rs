use crate::harvest::row::{build_row, channel_id_from_url};
use crate::model::{OutputRow, Place, ResolvedStream};
use crate::traits::{CatalogSource, FetchError};
use std::future::Future;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Rows and counters produced by one place unit.
#[derive(Debug, Default)]
pub struct PlaceOutcome {
    pub rows: Vec<OutputRow>,
    pub channels_seen: usize,
    pub channels_skipped: usize,
    pub streams_resolved: usize,
    pub streams_unresolved: usize,
}

/// Runs place units with at most `concurrency_limit` of them in flight.
///
/// Every wait (slot admission and each catalog call) races against the
/// cancellation token; once it fires, waiting units are never admitted and
/// in-flight ones return [`FetchError::Cancelled`].
pub struct HarvesterExecutor {
    semaphore: Semaphore,
    cancel: CancellationToken,
}

impl HarvesterExecutor {
    pub fn new(concurrency_limit: usize, cancel: CancellationToken) -> Self {
        Self {
            semaphore: Semaphore::new(concurrency_limit),
            cancel,
        }
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    #[instrument(skip(self, source, place), fields(place_id = %place.id))]
    pub async fn execute<S>(
        &self,
        source: &S,
        index: usize,
        place: &Place,
    ) -> Result<PlaceOutcome, FetchError>
    where
        S: CatalogSource + ?Sized,
    {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
            permit = self.semaphore.acquire() => permit.map_err(|_| FetchError::Cancelled)?,
        };

        info!("GET [{}] - {}", index, place.title);

        let channels = self.guard(source.list_channels(&place.id)).await?;
        info!(channels = channels.len(), "[{}] - {} channels listed", index, place.title);

        let mut outcome = PlaceOutcome {
            rows: Vec::with_capacity(channels.len()),
            channels_seen: channels.len(),
            ..PlaceOutcome::default()
        };

        for channel in &channels {
            let channel_id = match channel_id_from_url(&channel.url) {
                Ok(id) => id,
                Err(e) => {
                    error!("[{}] - {}: skipping channel '{}': {}", index, place.title, channel.title, e);
                    outcome.channels_skipped += 1;
                    continue;
                }
            };

            let resolved = match self.guard(source.resolve_stream_url(channel_id)).await {
                Ok(url) => {
                    outcome.streams_resolved += 1;
                    Some(ResolvedStream::new(channel_id, url))
                }
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(e) => {
                    warn!("could not resolve stream for {}: {}", channel_id, e);
                    outcome.streams_unresolved += 1;
                    None
                }
            };

            match build_row(place, channel, channel_id, resolved.as_ref()) {
                Ok(row) => outcome.rows.push(row),
                Err(e) => {
                    error!("[{}] - {}: {}", index, place.title, e);
                    outcome.channels_skipped += 1;
                }
            }
        }

        info!(rows = outcome.rows.len(), "Finished [{}] - {}", index, place.title);
        Ok(outcome)
    }

    async fn guard<T, F>(&self, call: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
            result = call => result,
        }
    }
}
