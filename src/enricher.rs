use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::data_models::{CandidateDetail, CandidateId, CandidateSummary};
use crate::error::HarvestError;
use crate::retry::RetryPolicy;
use crate::sources::CandidateApi;

/// Fetches the full record of every summary, at most `max_concurrent`
/// at a time.
///
/// Each fetch runs in its own task and reports `(index, detail)` to a single
/// collector over a channel, so the output lines up with the input. A fetch
/// that fails after its retries becomes `None` and never affects the others.
pub struct Enricher {
    api: Arc<dyn CandidateApi>,
    policy: RetryPolicy,
    concurrent_fetches: Arc<Semaphore>,
}

impl Enricher {
    pub fn new(api: Arc<dyn CandidateApi>, policy: RetryPolicy, max_concurrent: usize) -> Self {
        Self {
            api,
            policy,
            concurrent_fetches: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub async fn enrich(
        &self,
        summaries: &[CandidateSummary],
        cancel: &CancellationToken,
    ) -> Vec<Option<CandidateDetail>> {
        let (fetched_tx, mut fetched_rx) = mpsc::unbounded_channel();

        for (idx, summary) in summaries.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = self.concurrent_fetches.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                log::warn!(
                    "enrichment cancelled, {} candidates not started",
                    summaries.len() - idx
                );
                break;
            };

            let api = self.api.clone();
            let policy = self.policy.clone();
            let cancel = cancel.clone();
            let id = summary.resume_id.clone();
            let fetched_tx = fetched_tx.clone();
            tokio::spawn(async move {
                let detail = fetch_one(api.as_ref(), &policy, &id, &cancel).await;
                drop(permit);
                // the collector only goes away if enrich() itself was dropped
                let _ = fetched_tx.send((idx, detail));
            });
        }
        drop(fetched_tx);

        let mut results: Vec<Option<CandidateDetail>> = vec![None; summaries.len()];
        while let Some((idx, detail)) = fetched_rx.recv().await {
            results[idx] = detail;
        }

        let missing = results.iter().filter(|d| d.is_none()).count();
        if missing > 0 {
            log::warn!("{missing} of {} candidates could not be fetched", summaries.len());
        }
        results
    }
}

async fn fetch_one(
    api: &dyn CandidateApi,
    policy: &RetryPolicy,
    id: &CandidateId,
    cancel: &CancellationToken,
) -> Option<CandidateDetail> {
    let label = format!("{} candidate {id}", api.name());
    match policy.attempt(&label, cancel, || api.detail(id)).await {
        Ok(detail) => {
            log::debug!("fetched candidate {id}");
            Some(detail)
        }
        Err(HarvestError::Cancelled) => None,
        Err(e) => {
            log::error!("error fetching candidate {id}: {e}");
            None
        }
    }
}
