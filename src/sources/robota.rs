use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::{CandidateApi, detail_url, fetch_text, http_client};
use crate::config::HarvestConfig;
use crate::data_models::{CandidateDetail, CandidateId, SearchPage, SearchRequest};
use crate::error::HarvestError;

/// Employer JSON API: POST the search body, GET each resume by id.
pub struct RobotaClient {
    client: reqwest::Client,
    search_url: String,
    detail_url_template: String,
}

impl RobotaClient {
    pub fn new(config: &HarvestConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            client: http_client(&config.headers, config.request_timeout)?,
            search_url: config.search_url.clone(),
            detail_url_template: config.detail_url_template.clone(),
        })
    }
}

#[async_trait]
impl CandidateApi for RobotaClient {
    fn name(&self) -> &str {
        "robota"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, HarvestError> {
        let body = fetch_text(
            self.client
                .post(&self.search_url)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json")
                .json(request),
        )
        .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn detail(&self, id: &CandidateId) -> Result<CandidateDetail, HarvestError> {
        let url = detail_url(&self.detail_url_template, id);
        let body = fetch_text(self.client.get(&url).header(ACCEPT, "application/json")).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
