use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::data_models::{CandidateSummary, EnumerationOutcome, SearchSpec};
use crate::error::HarvestError;
use crate::retry::RetryPolicy;
use crate::sources::CandidateApi;

/// Summaries gathered by one enumeration and why it stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct Enumeration {
    pub summaries: Vec<CandidateSummary>,
    pub pages_fetched: u32,
    pub outcome: EnumerationOutcome,
}

/// Walks the bulk search one page at a time.
///
/// Pages are strictly sequential: the page number is a server-side cursor,
/// so the next request is only built once the previous one (with its retries
/// and the inter-page pause) has finished.
pub struct Enumerator {
    api: Arc<dyn CandidateApi>,
    policy: RetryPolicy,
    page_delay: Duration,
    max_pages: Option<u32>,
}

impl Enumerator {
    pub fn new(api: Arc<dyn CandidateApi>, policy: RetryPolicy, page_delay: Duration) -> Self {
        Self {
            api,
            policy,
            page_delay,
            max_pages: None,
        }
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetches pages from 1 upwards until a short page, the page limit, a
    /// failed page or cancellation. Whatever was gathered before the stop is
    /// returned.
    pub async fn enumerate(&self, spec: &SearchSpec, cancel: &CancellationToken) -> Enumeration {
        let page_size = spec.page_size as usize;
        let mut summaries = Vec::new();
        let mut pages_fetched = 0u32;
        let mut page = 1u32;

        let outcome = loop {
            let request = spec.request_for_page(page);
            let label = format!("{} search page {page}", self.api.name());

            match self
                .policy
                .attempt(&label, cancel, || self.api.search(&request))
                .await
            {
                Ok(batch) => {
                    pages_fetched += 1;
                    let count = batch.len();
                    summaries.extend(batch.documents);
                    log::info!(
                        "page {page} processed, {count} records ({} total)",
                        summaries.len()
                    );

                    if count < page_size {
                        log::info!("short page at {page}, end of data reached");
                        break EnumerationOutcome::Exhausted;
                    }
                    if self.max_pages.is_some_and(|max| page >= max) {
                        log::info!("page limit {page} reached");
                        break EnumerationOutcome::PageLimit;
                    }

                    page += 1;
                    let interrupted = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => true,
                        _ = tokio::time::sleep(self.page_delay) => false,
                    };
                    if interrupted {
                        log::warn!("enumeration cancelled before page {page}");
                        break EnumerationOutcome::Cancelled;
                    }
                }
                Err(HarvestError::Cancelled) => {
                    log::warn!("enumeration cancelled at page {page}");
                    break EnumerationOutcome::Cancelled;
                }
                Err(e) => {
                    log::error!(
                        "error fetching search page {page}, keeping {} summaries: {e}",
                        summaries.len()
                    );
                    break EnumerationOutcome::Truncated;
                }
            }
        };

        Enumeration {
            summaries,
            pages_fetched,
            outcome,
        }
    }
}
