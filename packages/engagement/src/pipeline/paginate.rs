//! Cursor pagination for one target.
//!
//! The paginator drives an [`EngagementSource`] until the upstream signals
//! completion, the result cap is reached, a fetch fails or the caller's stop
//! signal is raised. It never retries; a failed page ends the extraction with
//! whatever was gathered so far.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{SourceError, SourceResult};
use crate::traits::source::{Cursor, EngagementSource, Page};
use crate::types::{
    actor::ActorProfile,
    config::PaginatorConfig,
    extraction::{ExtractionResult, ExtractionStatus},
    target::Target,
};

/// Drives page-by-page extraction for a single target.
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    config: PaginatorConfig,
}

impl Paginator {
    pub fn new(config: PaginatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaginatorConfig {
        &self.config
    }

    /// Extract every actor for `target`, up to `max_results`.
    pub async fn extract<S>(
        &self,
        source: &S,
        target: &Target,
        max_results: Option<usize>,
    ) -> ExtractionResult
    where
        S: EngagementSource + ?Sized,
    {
        self.extract_with_cancel(source, target, max_results, &CancellationToken::new())
            .await
    }

    /// Like [`Paginator::extract`], stopping early once `cancel` fires.
    ///
    /// A fetch already in flight is allowed to finish; the inter-page delay
    /// is not.
    #[instrument(skip(self, source, target, cancel), fields(target_id = %target.id))]
    pub async fn extract_with_cancel<S>(
        &self,
        source: &S,
        target: &Target,
        max_results: Option<usize>,
        cancel: &CancellationToken,
    ) -> ExtractionResult
    where
        S: EngagementSource + ?Sized,
    {
        let started_at = Utc::now();
        let delay = self.config.page_delay();
        let mut actors: Vec<ActorProfile> = Vec::new();
        let mut cursor: Option<Cursor> = None;
        let mut pages = 0usize;

        let status = loop {
            if max_results == Some(0) {
                break ExtractionStatus::Truncated;
            }
            if cancel.is_cancelled() {
                break ExtractionStatus::Cancelled;
            }

            if pages > 0 && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => break ExtractionStatus::Cancelled,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let page = match self.fetch_page(source, &target.id, cursor.take()).await {
                Ok(page) => page,
                Err(err) => {
                    warn!(page = pages + 1, actors = actors.len(), error = %err, "Page fetch failed");
                    break ExtractionStatus::Incomplete {
                        error: err.to_string(),
                        status: err.status(),
                        malformed: err.is_malformed(),
                    };
                }
            };
            pages += 1;

            if page.is_empty() {
                break ExtractionStatus::Complete;
            }

            actors.extend(page.actors);
            debug!(page = pages, actors = actors.len(), "Fetched page");

            if let Some(max) = max_results {
                if actors.len() >= max {
                    actors.truncate(max);
                    break ExtractionStatus::Truncated;
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break ExtractionStatus::Complete,
            }
        };

        info!(
            pages,
            actors = actors.len(),
            status = ?status,
            "Extraction finished"
        );

        ExtractionResult::new(target.id.clone(), actors, status)
            .with_extracted_at(started_at)
            .with_pages_fetched(pages)
    }

    async fn fetch_page<S>(
        &self,
        source: &S,
        target_id: &str,
        cursor: Option<Cursor>,
    ) -> SourceResult<Page>
    where
        S: EngagementSource + ?Sized,
    {
        let timeout = self.config.page_timeout();
        tokio::time::timeout(timeout, source.fetch_page(target_id, cursor))
            .await
            .map_err(|_| SourceError::Timeout {
                elapsed_ms: timeout.as_millis() as u64,
            })?
    }
}
