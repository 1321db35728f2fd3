use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{HarvestConfig, Source};
use crate::data_models::{CandidateDetail, CandidateId, SearchPage, SearchRequest};
use crate::error::HarvestError;

pub mod robota;
pub mod workua;

pub use robota::RobotaClient;
pub use workua::WorkUaClient;

/// Remote side of a harvest: one paged search and one per-candidate lookup.
///
/// Implementations perform a single attempt per call. Retrying, pacing and
/// timeouts belong to the caller.
#[async_trait]
pub trait CandidateApi: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, HarvestError>;

    async fn detail(&self, id: &CandidateId) -> Result<CandidateDetail, HarvestError>;
}

/// Builds the client for the configured source.
pub fn build_api(config: &HarvestConfig) -> Result<Arc<dyn CandidateApi>, HarvestError> {
    let api: Arc<dyn CandidateApi> = match config.source {
        Source::Robota => Arc::new(RobotaClient::new(config)?),
        Source::WorkUa => Arc::new(WorkUaClient::new(config)?),
    };
    Ok(api)
}

pub(crate) fn http_client(
    headers: &[(String, String)],
    connect_timeout: Duration,
) -> Result<reqwest::Client, HarvestError> {
    reqwest::Client::builder()
        .default_headers(header_map(headers)?)
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| HarvestError::Config(format!("failed to create HTTP client: {e}")))
}

pub(crate) fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, HarvestError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HarvestError::Config(format!("bad header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HarvestError::Config(format!("bad header value for {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

pub(crate) fn detail_url(template: &str, id: &CandidateId) -> String {
    template.replace("{id}", id.as_str())
}

/// Sends the request and returns the body of a 2xx response.
pub(crate) async fn fetch_text(request: RequestBuilder) -> Result<String, HarvestError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_url_substitutes_id() {
        assert_eq!(
            detail_url(
                "https://api/resume/{id}?markView=true",
                &CandidateId::new("42")
            ),
            "https://api/resume/42?markView=true"
        );
    }

    #[test]
    fn test_header_map_rejects_bad_names() {
        let ok = header_map(&[("X-Token".into(), "abc".into())]).unwrap();
        assert_eq!(ok.get("x-token").unwrap(), "abc");
        assert!(matches!(
            header_map(&[("bad header".into(), "v".into())]),
            Err(HarvestError::Config(_))
        ));
    }
}
