use regex::Regex;
use std::sync::OnceLock;

static TAG_PATTERN: OnceLock<Regex> = OnceLock::new();

fn tag_pattern() -> &'static Regex {
    // Non-greedy so text between two tags survives.
    TAG_PATTERN.get_or_init(|| Regex::new(r"(?i)<.*?>").expect("tag pattern is a valid regex"))
}

/// A character filter receives the original text and may add, remove or change characters.
/// Skill descriptions on the platform are authored in a rich-text editor, so they arrive with
/// inline markup that has to go before the text is stored.
pub trait CharacterFilter: Send + Sync {
    fn filter(&self, text: String) -> String;
}

/// Removes anything that looks like a tag. Entities are left as they are and nothing is trimmed.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkupStripFilter;

impl CharacterFilter for MarkupStripFilter {
    fn filter(&self, text: String) -> String {
        strip_markup(&text)
    }
}

pub fn strip_markup(text: &str) -> String {
    tag_pattern().replace_all(text, "").into_owned()
}

/// Runs filters in order.
pub struct FilterChain {
    filters: Vec<Box<dyn CharacterFilter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn CharacterFilter>>) -> Self {
        Self { filters }
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new(vec![Box::new(MarkupStripFilter)])
    }
}

impl CharacterFilter for FilterChain {
    fn filter(&self, text: String) -> String {
        self.filters.iter().fold(text, |acc, f| f.filter(acc))
    }
}
