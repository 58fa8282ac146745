//! Canned replies for GREETING queries

use serde::{Deserialize, Serialize};

/// Which canned reply a greeting-class query gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Greeting,
    Thanks,
    Farewell,
}

const THANKS_WORDS: &[&str] = &["thank", "thanks", "thx"];
const FAREWELL_WORDS: &[&str] = &["bye", "goodbye"];
const FAREWELL_PHRASES: &[&str] = &["see you"];

impl TemplateKind {
    /// Pick the reply kind from the query's words. Thanks is checked before
    /// farewell; anything else gets the generic greeting.
    pub fn detect(query: &str) -> Self {
        let lower = query.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let has_word = |set: &[&str]| words.iter().any(|w| set.contains(w));

        if has_word(THANKS_WORDS) {
            TemplateKind::Thanks
        } else if has_word(FAREWELL_WORDS) || FAREWELL_PHRASES.iter().any(|p| words.join(" ").contains(p)) {
            TemplateKind::Farewell
        } else {
            TemplateKind::Greeting
        }
    }

    pub fn reply(&self) -> &'static str {
        match self {
            TemplateKind::Greeting => {
                "👋 Hello! How can I help you today? Ask me a question or send me an image!"
            }
            TemplateKind::Thanks => "😊 You're welcome! Let me know if you need anything else.",
            TemplateKind::Farewell => "👋 Goodbye! Come back anytime you need help!",
        }
    }

    /// Every reply the template step can produce
    pub fn all_replies() -> [&'static str; 3] {
        [
            TemplateKind::Greeting.reply(),
            TemplateKind::Thanks.reply(),
            TemplateKind::Farewell.reply(),
        ]
    }
}
