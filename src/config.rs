use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::data_models::{SearchFilters, SearchSpec};
use crate::error::HarvestError;
use crate::retry::RetryPolicy;

/// Which platform to harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    /// JSON employer API, paged by `requestedCount`.
    #[default]
    Robota,
    /// Public HTML listing, paged by URL.
    WorkUa,
}

impl FromStr for Source {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "robota" | "robotaua" | "robota.ua" => Ok(Source::Robota),
            "workua" | "work.ua" => Ok(Source::WorkUa),
            other => Err(HarvestError::Config(format!("unknown source: {other}"))),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Robota => f.write_str("robota"),
            Source::WorkUa => f.write_str("workua"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarvestConfig {
    pub source: Source,
    pub search_url: String,
    /// Must contain `{id}`.
    pub detail_url_template: String,
    pub page_size: u32,
    pub max_pages: Option<u32>,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub page_delay: Duration,
    pub concurrency: usize,
    pub request_timeout: Duration,
    /// Apply the retry policy to detail fetches too, not just search pages.
    pub retry_details: bool,
    pub output_path: PathBuf,
    pub headers: Vec<(String, String)>,
    pub filters: SearchFilters,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self::for_source(Source::Robota)
    }
}

impl HarvestConfig {
    pub fn for_source(source: Source) -> Self {
        let (search_url, detail_url_template, page_size, max_pages, output) = match source {
            Source::Robota => (
                "https://employer-api.robota.ua/cvdb/resumes",
                "https://employer-api.robota.ua/resume/{id}?markView=true",
                20,
                None,
                "extracted_data.json",
            ),
            // The listing has no requested count, so only an empty page (or the
            // page limit) ends it.
            Source::WorkUa => (
                "https://www.work.ua/resumes-web+developer/?page=",
                "https://www.work.ua/resumes/{id}/",
                1,
                Some(5),
                "resume_data.json",
            ),
        };

        Self {
            source,
            search_url: search_url.to_string(),
            detail_url_template: detail_url_template.to_string(),
            page_size,
            max_pages,
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            page_delay: Duration::from_secs(2),
            concurrency: 8,
            request_timeout: Duration::from_secs(30),
            retry_details: true,
            output_path: PathBuf::from(output),
            headers: vec![],
            filters: SearchFilters::default(),
        }
    }

    /// Loads `.env` if present, then reads `HARVEST_*` variables. An explicit
    /// `source` wins over `HARVEST_SOURCE`.
    pub fn from_env(source: Option<Source>) -> Result<Self, HarvestError> {
        dotenv().ok();
        Self::from_lookup(|key| match (key, source) {
            ("HARVEST_SOURCE", Some(source)) => Some(source.to_string()),
            _ => env::var(key).ok(),
        })
    }

    /// Builds a config from any key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HarvestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = match lookup("HARVEST_SOURCE") {
            Some(raw) => raw.parse()?,
            None => Source::default(),
        };
        let mut config = Self::for_source(source);

        if let Some(url) = lookup("HARVEST_SEARCH_URL") {
            config.search_url = url;
        }
        if let Some(template) = lookup("HARVEST_DETAIL_URL") {
            config.detail_url_template = template;
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_PAGE_SIZE")? {
            config.page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_MAX_PAGES")? {
            config.max_pages = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_MAX_ATTEMPTS")? {
            config.max_attempts = v;
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_RETRY_DELAY_SECS")? {
            config.retry_delay = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_PAGE_DELAY_SECS")? {
            config.page_delay = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_CONCURRENCY")? {
            config.concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_RETRY_DETAILS")? {
            config.retry_details = v;
        }
        if let Some(path) = lookup("HARVEST_OUTPUT") {
            config.output_path = PathBuf::from(path);
        }
        if let Some(token) = lookup("HARVEST_AUTHORIZATION") {
            config.headers.push(("Authorization".to_string(), token));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.page_size == 0 {
            return Err(HarvestError::Config("page size must be positive".into()));
        }
        if self.max_attempts == 0 {
            return Err(HarvestError::Config("max attempts must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(HarvestError::Config("concurrency must be positive".into()));
        }
        if self.max_pages == Some(0) {
            return Err(HarvestError::Config("max pages must be positive".into()));
        }
        if !self.detail_url_template.contains("{id}") {
            return Err(HarvestError::Config(format!(
                "detail url template has no {{id}} placeholder: {}",
                self.detail_url_template
            )));
        }
        reqwest::Url::parse(&self.search_url)
            .map_err(|e| HarvestError::Config(format!("bad search url {}: {e}", self.search_url)))?;
        Ok(())
    }

    pub fn search_spec(&self) -> SearchSpec {
        SearchSpec::new(self.filters.clone(), self.page_size)
    }

    pub fn search_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_delay)
            .with_attempt_timeout(self.request_timeout)
    }

    pub fn detail_policy(&self) -> RetryPolicy {
        if self.retry_details {
            self.search_policy()
        } else {
            RetryPolicy::once().with_attempt_timeout(self.request_timeout)
        }
    }
}

/// Reads a JSON filters file. Keys left out keep their defaults.
pub fn load_filters(path: &Path) -> Result<SearchFilters, HarvestError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| HarvestError::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| HarvestError::Config(format!("bad filters in {}: {e}", path.display())))
}

/// Splits `Name: value`.
pub fn parse_header(raw: &str) -> Result<(String, String), HarvestError> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(HarvestError::Config(format!("bad header: {raw}"))),
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, HarvestError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| HarvestError::Config(format!("{key}={raw}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_follow_platform_values() {
        let config = HarvestConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.source, Source::Robota);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.page_delay, Duration::from_secs(2));
        assert_eq!(config.max_pages, None);
        assert!(config.retry_details);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = HarvestConfig::from_lookup(lookup_from(&[
            ("HARVEST_PAGE_SIZE", "50"),
            ("HARVEST_MAX_PAGES", "4"),
            ("HARVEST_RETRY_DELAY_SECS", "0"),
            ("HARVEST_RETRY_DETAILS", "false"),
            ("HARVEST_AUTHORIZATION", "Bearer abc"),
            ("HARVEST_OUTPUT", "out/candidates.json"),
        ]))
        .unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.max_pages, Some(4));
        assert_eq!(config.retry_delay, Duration::ZERO);
        assert!(!config.retry_details);
        assert_eq!(config.detail_policy().max_attempts(), 1);
        assert_eq!(
            config.headers,
            vec![("Authorization".to_string(), "Bearer abc".to_string())]
        );
        assert_eq!(config.output_path, PathBuf::from("out/candidates.json"));
    }

    #[test]
    fn test_workua_source_defaults() {
        let config =
            HarvestConfig::from_lookup(lookup_from(&[("HARVEST_SOURCE", "work.ua")])).unwrap();
        assert_eq!(config.source, Source::WorkUa);
        assert_eq!(config.page_size, 1);
        assert_eq!(config.max_pages, Some(5));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for pairs in [
            vec![("HARVEST_PAGE_SIZE", "0")],
            vec![("HARVEST_PAGE_SIZE", "twenty")],
            vec![("HARVEST_CONCURRENCY", "0")],
            vec![("HARVEST_MAX_ATTEMPTS", "0")],
            vec![("HARVEST_DETAIL_URL", "https://api/resume/")],
            vec![("HARVEST_SEARCH_URL", "not a url")],
            vec![("HARVEST_SOURCE", "linkedin")],
        ] {
            let res = HarvestConfig::from_lookup(lookup_from(&pairs));
            assert!(
                matches!(res, Err(HarvestError::Config(_))),
                "expected config error for {pairs:?}"
            );
        }
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Authorization: Bearer x:y").unwrap(),
            ("Authorization".to_string(), "Bearer x:y".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }
}
