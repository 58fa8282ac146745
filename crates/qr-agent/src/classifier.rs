//! Intent classification for text queries
//!
//! Classification is an ordered table of pattern rules evaluated against the
//! lowercased query; the first rule that matches wins. Priority, highest
//! first: GREETING, KNOWLEDGE_SEARCH, SUMMARIZATION, CALCULATION. When nothing
//! matches the query is GENERAL_CHAT. Image input never reaches this module.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Symbolic category assigned to every query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Greeting,
    KnowledgeSearch,
    ImageAnalysis,
    Calculation,
    Summarization,
    GeneralChat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "GREETING",
            Intent::KnowledgeSearch => "KNOWLEDGE_SEARCH",
            Intent::ImageAnalysis => "IMAGE_ANALYSIS",
            Intent::Calculation => "CALCULATION",
            Intent::Summarization => "SUMMARIZATION",
            Intent::GeneralChat => "GENERAL_CHAT",
        }
    }

    /// Human-readable name, e.g. "Knowledge Search"
    pub fn display_name(&self) -> &'static str {
        match self {
            Intent::Greeting => "Greeting",
            Intent::KnowledgeSearch => "Knowledge Search",
            Intent::ImageAnalysis => "Image Analysis",
            Intent::Calculation => "Calculation",
            Intent::Summarization => "Summarization",
            Intent::GeneralChat => "General Chat",
        }
    }

    pub fn all() -> [Intent; 6] {
        [
            Intent::Greeting,
            Intent::KnowledgeSearch,
            Intent::ImageAnalysis,
            Intent::Calculation,
            Intent::Summarization,
            Intent::GeneralChat,
        ]
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    /// Pattern that matched, `None` when the default was used
    pub matched_pattern: Option<String>,
}

impl Classification {
    pub fn is_fallback(&self) -> bool {
        self.matched_pattern.is_none()
    }
}

/// One row of the rule table
pub struct IntentRule {
    pub intent: Intent,
    patterns: Vec<Regex>,
}

impl IntentRule {
    pub fn new(intent: Intent, patterns: &[&str]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        Self { intent, patterns }
    }

    fn find_match(&self, text: &str) -> Option<&Regex> {
        self.patterns.iter().find(|pattern| pattern.is_match(text))
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

const GREETING_PATTERNS: &[&str] = &[
    r"^\s*(hi|hello|hey|greetings|good\s+(morning|afternoon|evening))\b",
    r"^\s*(thank\s+you|thanks|thx)\b",
    r"^\s*(bye|goodbye|see\s+you)\b",
];

const KNOWLEDGE_PATTERNS: &[&str] = &[
    r"\b(what\s+is|what\s+are|explain|describe|tell\s+me\s+about)\b",
    r"\b(how\s+does|how\s+to|how\s+can)\b",
    r"\b(why\s+is|why\s+does|why\s+do)\b",
    r"\b(define|definition\s+of)\b",
    r"\b(benefits\s+of|advantages\s+of|disadvantages\s+of)\b",
    r"\b(compare|difference\s+between|vs)\b",
];

const SUMMARIZATION_PATTERNS: &[&str] = &[
    r"\b(summarize|summarise|summary|recap|overview)\b",
    r"\b(in\s+short|briefly|tldr)\b",
];

const CALCULATION_PATTERNS: &[&str] = &[
    r"\b(calculate|compute|solve|evaluate)\b",
    // the whole query is an expression, optionally followed by punctuation
    r"^\s*-?\(*\s*\d+(\.\d+)?\s*[-+*/]\s*-?\(*\s*\d[\d\s.+\-*/()]*($|[^\w\s.+\-*/()])",
];

/// Maps query text to an `Intent`
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::with_rules(vec![
            IntentRule::new(Intent::Greeting, GREETING_PATTERNS),
            IntentRule::new(Intent::KnowledgeSearch, KNOWLEDGE_PATTERNS),
            IntentRule::new(Intent::Summarization, SUMMARIZATION_PATTERNS),
            IntentRule::new(Intent::Calculation, CALCULATION_PATTERNS),
        ])
    }

    /// Build a classifier from a custom table; earlier rules take priority
    pub fn with_rules(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Classify a query; never fails
    pub fn classify(&self, query: &str) -> Intent {
        self.classify_detailed(query).intent
    }

    /// Classify and report which pattern decided
    pub fn classify_detailed(&self, query: &str) -> Classification {
        let query_lower = query.to_lowercase();

        for rule in &self.rules {
            if let Some(pattern) = rule.find_match(&query_lower) {
                return Classification {
                    intent: rule.intent,
                    matched_pattern: Some(pattern.as_str().to_string()),
                };
            }
        }

        Classification {
            intent: Intent::GeneralChat,
            matched_pattern: None,
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        let classifier = IntentClassifier::new();
        let expected = [
            GREETING_PATTERNS.len(),
            KNOWLEDGE_PATTERNS.len(),
            SUMMARIZATION_PATTERNS.len(),
            CALCULATION_PATTERNS.len(),
        ];
        let actual: Vec<_> = classifier.rules().iter().map(|r| r.pattern_count()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_greetings() {
        let classifier = IntentClassifier::new();
        for query in ["hi", "Hello there", "HEY", "good morning!", "thanks a lot", "Thank you", "bye", "see you later"] {
            assert_eq!(classifier.classify(query), Intent::Greeting, "{}", query);
        }
    }

    #[test]
    fn test_greeting_words_inside_other_words() {
        let classifier = IntentClassifier::new();
        assert_eq!(classifier.classify("history of rome"), Intent::GeneralChat);
        assert_eq!(classifier.classify("highway traffic"), Intent::GeneralChat);
    }

    #[test]
    fn test_knowledge_search() {
        let classifier = IntentClassifier::new();
        for query in [
            "What is Docker?",
            "explain kubernetes pods",
            "How does git branching work",
            "benefits of docker",
            "python vs rust",
        ] {
            assert_eq!(classifier.classify(query), Intent::KnowledgeSearch, "{}", query);
        }
    }

    #[test]
    fn test_summarization() {
        let classifier = IntentClassifier::new();
        assert_eq!(classifier.classify("summarize our chat"), Intent::Summarization);
        assert_eq!(classifier.classify("give me a quick recap"), Intent::Summarization);
        assert_eq!(classifier.classify("tldr please"), Intent::Summarization);
    }

    #[test]
    fn test_calculation() {
        let classifier = IntentClassifier::new();
        for query in ["5+3", "12 * 4", "calculate 2 / 7", "(1+2)*3", "5+3; rm -rf /", "3.5 - (2", "7*6?"] {
            assert_eq!(classifier.classify(query), Intent::Calculation, "{}", query);
        }
    }

    #[test]
    fn test_numbers_inside_prose_are_not_arithmetic() {
        let classifier = IntentClassifier::new();
        for query in ["2024-01-15 standup notes", "meeting at 10/12 with the team", "chapter 3-4 was great"] {
            assert_eq!(classifier.classify(query), Intent::GeneralChat, "{}", query);
        }
    }

    #[test]
    fn test_priority_favors_earlier_rule() {
        let classifier = IntentClassifier::new();
        // knowledge outranks calculation and summarization
        assert_eq!(classifier.classify("explain how to compute 5+3"), Intent::KnowledgeSearch);
        assert_eq!(classifier.classify("describe the summary"), Intent::KnowledgeSearch);
        // summarization outranks calculation
        assert_eq!(classifier.classify("summary of 2+2"), Intent::Summarization);
        // greeting outranks everything
        assert_eq!(classifier.classify("hi, what is docker?"), Intent::Greeting);
    }

    #[test]
    fn test_fallback_is_general_chat() {
        let classifier = IntentClassifier::new();

        let empty = classifier.classify_detailed("");
        assert_eq!(empty.intent, Intent::GeneralChat);
        assert!(empty.is_fallback());

        assert_eq!(classifier.classify("   \t\n "), Intent::GeneralChat);
        assert_eq!(classifier.classify("write me a poem"), Intent::GeneralChat);
        assert_ne!(classifier.classify("ÄÖÜ 🤖 ∑"), Intent::ImageAnalysis);
    }

    #[test]
    fn test_classification_reports_pattern() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify_detailed("5+3");
        assert_eq!(result.intent, Intent::Calculation);
        assert!(!result.is_fallback());
        assert!(result.matched_pattern.unwrap().contains("[-+*/]"));
    }
}
