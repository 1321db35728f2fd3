use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::HarvestConfig;
use crate::data_models::{
    CandidateDetail, EnrichedCandidate, HarvestResult, HarvestStats, NOT_SPECIFIED, SearchSpec,
};
use crate::enricher::Enricher;
use crate::enumerator::Enumerator;
use crate::error::HarvestError;
use crate::sanitizer::{CharacterFilter, FilterChain};
use crate::sources::CandidateApi;
use crate::tenure::{self, Clock, SystemClock};
use crate::writer::ResultWriter;

/// One harvest: enumerate summaries, enrich them, then clean and derive
/// fields for every candidate that could be fetched.
pub struct HarvestPipeline {
    enumerator: Enumerator,
    enricher: Enricher,
    sanitizer: Box<dyn CharacterFilter>,
    clock: Arc<dyn Clock>,
}

impl HarvestPipeline {
    /// Fails only when the configuration is unusable.
    pub fn new(api: Arc<dyn CandidateApi>, config: &HarvestConfig) -> Result<Self, HarvestError> {
        config.validate()?;
        let enumerator = Enumerator::new(api.clone(), config.search_policy(), config.page_delay)
            .with_max_pages(config.max_pages);
        let enricher = Enricher::new(api, config.detail_policy(), config.concurrency);
        Ok(Self {
            enumerator,
            enricher,
            sanitizer: Box::new(FilterChain::default()),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Box<dyn CharacterFilter>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub async fn run(&self, spec: &SearchSpec, cancel: &CancellationToken) -> HarvestResult {
        let enumeration = self.enumerator.enumerate(spec, cancel).await;
        log::info!(
            "enumeration finished: {} summaries from {} pages ({:?})",
            enumeration.summaries.len(),
            enumeration.pages_fetched,
            enumeration.outcome
        );

        if enumeration.summaries.is_empty() {
            return HarvestResult::empty(enumeration.pages_fetched, enumeration.outcome);
        }

        let details = self.enricher.enrich(&enumeration.summaries, cancel).await;
        let candidates: Vec<EnrichedCandidate> = details
            .into_iter()
            .flatten()
            .map(|detail| self.assemble(detail))
            .collect();

        let stats = HarvestStats {
            pages_fetched: enumeration.pages_fetched,
            summaries: enumeration.summaries.len(),
            enriched: candidates.len(),
            dropped: enumeration.summaries.len() - candidates.len(),
            enumeration: enumeration.outcome,
        };
        log::info!(
            "harvest finished: {} candidates, {} dropped",
            stats.enriched,
            stats.dropped
        );

        HarvestResult { candidates, stats }
    }

    /// Runs the harvest and hands the result, partial or not, to `writer`.
    pub async fn run_and_persist(
        &self,
        spec: &SearchSpec,
        cancel: &CancellationToken,
        writer: &dyn ResultWriter,
    ) -> Result<HarvestResult, HarvestError> {
        let result = self.run(spec, cancel).await;
        writer.write(&result).await?;
        Ok(result)
    }

    pub fn assemble(&self, detail: CandidateDetail) -> EnrichedCandidate {
        let skills = detail
            .skills
            .into_iter()
            .map(|s| self.sanitizer.filter(s.description.unwrap_or_default()))
            .collect();
        let tenure = tenure::total(&detail.experiences, self.clock.as_ref());
        // markup sources publish no periods, only their own summary
        let experience = match (&detail.declared_experience, detail.experiences.is_empty()) {
            (Some(declared), true) => declared.clone(),
            _ => tenure.to_string(),
        };

        EnrichedCandidate {
            resume_id: detail.resume_id,
            name: or_not_specified(detail.name),
            age: or_not_specified(detail.age),
            speciality: or_not_specified(detail.speciality),
            salary_full: or_not_specified(detail.salary_full),
            skills,
            experience,
            tenure,
            declared_experience: detail.declared_experience,
            willingness_to_work: detail.willingness_to_work,
        }
    }
}

fn or_not_specified(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_SPECIFIED.to_string())
}
