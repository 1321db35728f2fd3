use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use super::{CandidateApi, detail_url, fetch_text, http_client};
use crate::config::HarvestConfig;
use crate::data_models::{
    CandidateDetail, CandidateId, CandidateSummary, SearchPage, SearchRequest, Skill,
};
use crate::error::HarvestError;

const NBSP: char = '\u{a0}';

static SALARY_PATTERN: OnceLock<Regex> = OnceLock::new();
static PARENTHESISED: OnceLock<Regex> = OnceLock::new();
static DIGITS: OnceLock<Regex> = OnceLock::new();

fn salary_pattern() -> &'static Regex {
    SALARY_PATTERN
        .get_or_init(|| Regex::new(r"(\d[\d\s]*)\s*грн").expect("salary pattern is a valid regex"))
}

fn parenthesised() -> &'static Regex {
    PARENTHESISED.get_or_init(|| Regex::new(r"\((.*?)\)").expect("paren pattern is a valid regex"))
}

fn digits() -> &'static Regex {
    DIGITS.get_or_init(|| Regex::new(r"\d+").expect("digit pattern is a valid regex"))
}

/// Public resume listing scraped from HTML. Listing pages are addressed by
/// appending the page number to the search URL; resumes by the detail
/// template.
pub struct WorkUaClient {
    client: reqwest::Client,
    listing_url: String,
    detail_url_template: String,
}

impl WorkUaClient {
    pub fn new(config: &HarvestConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            client: http_client(&config.headers, config.request_timeout)?,
            listing_url: config.search_url.clone(),
            detail_url_template: config.detail_url_template.clone(),
        })
    }
}

#[async_trait]
impl CandidateApi for WorkUaClient {
    fn name(&self) -> &str {
        "workua"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, HarvestError> {
        let url = format!("{}{}", self.listing_url, request.page);
        let html = fetch_text(self.client.get(&url)).await?;
        parse_listing(&url, &html)
    }

    async fn detail(&self, id: &CandidateId) -> Result<CandidateDetail, HarvestError> {
        let url = detail_url(&self.detail_url_template, id);
        let html = fetch_text(self.client.get(&url)).await?;
        parse_resume(id, &html)
    }
}

fn selector(css: &str) -> Result<Selector, HarvestError> {
    Selector::parse(css).map_err(|e| HarvestError::Parse(format!("bad selector {css}: {e}")))
}

/// Text nodes trimmed and joined by a single space.
fn spaced_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text nodes trimmed and concatenated.
fn compact_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect::<String>()
}

/// Last non-empty path segment, e.g. `/resumes/1234567/` -> `1234567`.
pub fn resume_id_from_url(url: &Url) -> Option<CandidateId> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()
        .map(CandidateId::new)
}

/// Resume cards on one listing page, in page order.
pub fn parse_listing(page_url: &str, html: &str) -> Result<SearchPage, HarvestError> {
    let base = Url::parse(page_url).map_err(|e| HarvestError::Parse(e.to_string()))?;
    let document = Html::parse_document(html);
    let links = selector(".card h2 a, .card h5 a")?;

    let mut documents = Vec::new();
    for link in document.select(&links) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            log::debug!("skipping unresolvable link {href}");
            continue;
        };
        let Some(id) = resume_id_from_url(&resolved) else {
            continue;
        };
        let mut summary = CandidateSummary::new(id);
        let name = spaced_text(link);
        summary.name = (!name.is_empty()).then_some(name);
        documents.push(summary);
    }

    Ok(SearchPage::new(documents))
}

/// Splits the headline into position and salary. The salary is either in a
/// muted span or written inline as `NNN грн`.
pub fn split_position_and_salary(headline: ElementRef<'_>) -> (String, Option<String>) {
    let full_text = spaced_text(headline);
    let muted = Selector::parse("span.text-muted-print").ok();
    let salary_span = muted.as_ref().and_then(|s| headline.select(s).next());

    if let Some(span) = salary_span {
        let salary_text = compact_text(span);
        let position = full_text.replace(&salary_text, "").trim().to_string();
        let numbers: Vec<&str> = digits()
            .find_iter(&salary_text)
            .map(|m| m.as_str())
            .collect();
        let salary = (!numbers.is_empty()).then(|| numbers.join(" "));
        return (position, salary);
    }

    if let Some(caps) = salary_pattern().captures(&full_text) {
        let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let position = full_text
            .replace(raw, "")
            .replace("грн", "")
            .trim()
            .to_string();
        let salary = raw.replace(NBSP, " ").trim().to_string();
        return (position, Some(salary));
    }

    (full_text, None)
}

pub fn parse_resume(id: &CandidateId, html: &str) -> Result<CandidateDetail, HarvestError> {
    let document = Html::parse_document(html);
    let root = format!("#resume_{}", id.as_str());
    let header = format!("{root} > div:nth-of-type(1) > div > div");

    let mut detail = CandidateDetail::new(id.clone());

    let name_sel = selector(&format!("{header} > h1"))?;
    detail.name = document
        .select(&name_sel)
        .next()
        .map(compact_text)
        .filter(|s| !s.is_empty());

    let position_sel = selector(&format!("{header} > h2"))?;
    if let Some(headline) = document.select(&position_sel).next() {
        let (position, salary) = split_position_and_salary(headline);
        detail.speciality = (!position.is_empty()).then_some(position);
        detail.salary_full = salary.map(|s| format!("{s} грн."));
    }

    let dl_sel = selector(&format!("{header} > dl"))?;
    let dt_sel = selector("dt")?;
    if let Some(dl) = document.select(&dl_sel).next() {
        for dt in dl.select(&dt_sel) {
            let label = compact_text(dt);
            let Some(dd) = dt
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "dd")
            else {
                continue;
            };
            if label.contains("Місто проживання") {
                detail.city_name = Some(compact_text(dd));
            } else if label.contains("Вік") {
                detail.age = Some(compact_text(dd).replace(NBSP, " "));
            } else if label.contains("Готовий працювати") {
                detail.willingness_to_work = Some(spaced_text(dd));
            }
        }
    }

    let skill_sel = selector("li.no-style.mr-sm.mt-sm")?;
    detail.skills = document
        .select(&skill_sel)
        .map(compact_text)
        .filter(|s| !s.is_empty())
        .map(Skill::new)
        .collect();

    let section_sel = selector(&format!("{root} > h2:nth-of-type(2)"))?;
    let has_experience = document
        .select(&section_sel)
        .next()
        .is_some_and(|h| compact_text(h).contains("Досвід роботи"));
    if has_experience {
        let exp_sel = selector(&format!("{root} > p:nth-of-type(3) > span:nth-of-type(1)"))?;
        detail.declared_experience = document
            .select(&exp_sel)
            .next()
            .map(compact_text)
            .and_then(|text| {
                parenthesised()
                    .captures(&text)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().replace(NBSP, " "))
            });
    }

    Ok(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_id_from_url() {
        let url = Url::parse("https://www.work.ua/resumes/8841520/").unwrap();
        assert_eq!(resume_id_from_url(&url), Some(CandidateId::new("8841520")));
        let root = Url::parse("https://www.work.ua/").unwrap();
        assert_eq!(resume_id_from_url(&root), None);
    }

    #[test]
    fn test_inline_salary_is_split_from_position() {
        let html = Html::parse_fragment("<h2>Web developer, 30\u{a0}000 грн</h2>");
        let sel = Selector::parse("h2").unwrap();
        let h2 = html.select(&sel).next().unwrap();
        let (position, salary) = split_position_and_salary(h2);
        assert_eq!(position, "Web developer,");
        assert_eq!(salary.as_deref(), Some("30 000"));
    }

    #[test]
    fn test_muted_salary_span_keeps_digits_only() {
        let html = Html::parse_fragment(
            r#"<h2>Frontend developer <span class="text-muted-print">25 000 грн</span></h2>"#,
        );
        let sel = Selector::parse("h2").unwrap();
        let h2 = html.select(&sel).next().unwrap();
        let (position, salary) = split_position_and_salary(h2);
        assert_eq!(position, "Frontend developer");
        assert_eq!(salary.as_deref(), Some("25 000"));
    }

    #[test]
    fn test_resume_dl_pairs() {
        let html = r#"<div id="resume_77"><div><div><div>
            <h1>Olena</h1>
            <dl>
              <dt>Вік:</dt><dd>31&nbsp;рік</dd>
              <dt>Місто проживання:</dt><dd>Львів</dd>
              <dt>Готовий працювати:</dt><dd>Віддалено</dd>
            </dl>
          </div></div></div></div>"#;
        let detail = parse_resume(&CandidateId::new("77"), html).unwrap();
        assert_eq!(detail.age.as_deref(), Some("31 рік"));
        assert_eq!(detail.city_name.as_deref(), Some("Львів"));
        assert_eq!(detail.willingness_to_work.as_deref(), Some("Віддалено"));
    }

    #[test]
    fn test_headline_without_salary() {
        let html = Html::parse_fragment("<h2>QA engineer</h2>");
        let sel = Selector::parse("h2").unwrap();
        let h2 = html.select(&sel).next().unwrap();
        assert_eq!(
            split_position_and_salary(h2),
            ("QA engineer".to_string(), None)
        );
    }
}
