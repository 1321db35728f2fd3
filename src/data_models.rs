use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::tenure::Tenure;

/// Placeholder for text fields the platform left out.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Opaque candidate identifier. The platform sends it as a number in some
/// payloads and as a string in others.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CandidateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match lenient::string_or_number(deserializer)? {
            Some(id) if !id.is_empty() => Ok(CandidateId(id)),
            _ => Err(serde::de::Error::custom("missing candidate identifier")),
        }
    }
}

/// Fixed filter fields of the bulk search, sent verbatim with every page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    pub period: String,
    pub sort: String,
    pub search_type: String,
    pub ukrainian: bool,
    pub only_disliked: bool,
    pub only_favorite: bool,
    pub only_with_current_notebook_notes: bool,
    pub show_cv_without_salary: bool,
    pub sex: String,
    pub city_id: i64,
    pub inside: bool,
    pub only_new: bool,
    pub moveability: bool,
    pub only_moveability: bool,
    pub rubrics: Vec<String>,
    pub languages: Vec<serde_json::Value>,
    pub schedule_ids: Vec<serde_json::Value>,
    pub education_ids: Vec<serde_json::Value>,
    pub branch_ids: Vec<serde_json::Value>,
    pub experience_ids: Vec<serde_json::Value>,
    pub key_words: String,
    pub has_photo: bool,
    pub only_viewed: bool,
    pub only_with_opened_contacts: bool,
    pub resume_filling_type_ids: Vec<serde_json::Value>,
    pub district_ids: Vec<serde_json::Value>,
    pub only_students: bool,
    pub search_context: String,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            period: "ThreeMonths".to_string(),
            sort: "UpdateDate".to_string(),
            search_type: "default".to_string(),
            ukrainian: true,
            only_disliked: false,
            only_favorite: false,
            only_with_current_notebook_notes: false,
            show_cv_without_salary: true,
            sex: "Any".to_string(),
            city_id: 0,
            inside: false,
            only_new: false,
            moveability: true,
            only_moveability: false,
            rubrics: vec!["1-7".to_string()],
            languages: vec![],
            schedule_ids: vec![],
            education_ids: vec![],
            branch_ids: vec![],
            experience_ids: vec![],
            key_words: String::new(),
            has_photo: false,
            only_viewed: false,
            only_with_opened_contacts: false,
            resume_filling_type_ids: vec![],
            district_ids: vec![],
            only_students: false,
            search_context: "Filters".to_string(),
        }
    }
}

/// What to enumerate: the filters plus the page size, both fixed for the
/// lifetime of one enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpec {
    pub filters: SearchFilters,
    pub page_size: u32,
}

impl SearchSpec {
    pub fn new(filters: SearchFilters, page_size: u32) -> Self {
        Self { filters, page_size }
    }

    /// Builds a fresh request for one page. Nothing is shared between pages.
    pub fn request_for_page(&self, page: u32) -> SearchRequest {
        SearchRequest {
            page,
            filters: self.filters.clone(),
            requested_count: self.page_size,
        }
    }
}

/// Body of one bulk-search call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub page: u32,
    #[serde(flatten)]
    pub filters: SearchFilters,
    pub requested_count: u32,
}

/// One batch returned by the bulk search.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    #[serde(default)]
    pub documents: Vec<CandidateSummary>,
}

impl SearchPage {
    pub fn new(documents: Vec<CandidateSummary>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub resume_id: CandidateId,
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub city_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub salary: Option<String>,
}

impl CandidateSummary {
    pub fn new(resume_id: CandidateId) -> Self {
        Self {
            resume_id,
            name: None,
            city_name: None,
            salary: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Skill {
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub description: Option<String>,
}

impl Skill {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
        }
    }
}

/// One job held by a candidate. A missing end means the job is ongoing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkPeriod {
    #[serde(rename = "startWork", deserialize_with = "lenient::timestamp")]
    pub start: NaiveDateTime,
    #[serde(
        rename = "endWork",
        default,
        deserialize_with = "lenient::optional_timestamp"
    )]
    pub end: Option<NaiveDateTime>,
}

impl WorkPeriod {
    pub fn new(start: NaiveDateTime, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }
}

/// Full record returned by the per-identifier fetch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDetail {
    pub resume_id: CandidateId,
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub speciality: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub salary_full: Option<String>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub experiences: Vec<WorkPeriod>,
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub city_name: Option<String>,
    /// Free-text experience shown by markup sources that publish no dates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_experience: Option<String>,
    /// Work formats the candidate accepts (office, remote, relocation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub willingness_to_work: Option<String>,
}

impl CandidateDetail {
    pub fn new(resume_id: CandidateId) -> Self {
        Self {
            resume_id,
            name: None,
            age: None,
            speciality: None,
            salary_full: None,
            skills: vec![],
            experiences: vec![],
            city_name: None,
            declared_experience: None,
            willingness_to_work: None,
        }
    }
}

/// Final output unit of a harvest.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnrichedCandidate {
    pub resume_id: CandidateId,
    pub name: String,
    pub age: String,
    pub speciality: String,
    #[serde(rename = "salaryFull")]
    pub salary_full: String,
    pub skills: Vec<String>,
    pub experience: String,
    pub tenure: Tenure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_experience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub willingness_to_work: Option<String>,
}

/// Why enumeration stopped.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnumerationOutcome {
    /// A short page signalled end of data.
    Exhausted,
    /// The configured page limit was reached.
    PageLimit,
    /// A page could not be fetched; earlier pages are kept.
    Truncated,
    Cancelled,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HarvestStats {
    pub pages_fetched: u32,
    pub summaries: usize,
    pub enriched: usize,
    pub dropped: usize,
    pub enumeration: EnumerationOutcome,
}

/// Everything one pipeline run produced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HarvestResult {
    pub candidates: Vec<EnrichedCandidate>,
    pub stats: HarvestStats,
}

impl HarvestResult {
    pub fn empty(pages_fetched: u32, enumeration: EnumerationOutcome) -> Self {
        Self {
            candidates: vec![],
            stats: HarvestStats {
                pages_fetched,
                summaries: 0,
                enriched: 0,
                dropped: 0,
                enumeration,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Deserializers tolerant of the platform's loose typing.
pub mod lenient {
    use super::*;

    pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
            Some(other) => Some(other.to_string()),
        })
    }

    pub fn timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }

    pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    /// Parses `YYYY-MM-DDTHH:MM:SS`, ignoring any fractional seconds or zone
    /// suffix. A bare date is taken as midnight.
    pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
        let raw = raw.trim();
        let head = raw.get(..19).unwrap_or(raw);
        if let Ok(ts) = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S") {
            return Ok(ts);
        }
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| format!("unrecognised timestamp: {raw}"))
    }
}
