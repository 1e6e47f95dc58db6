use tracing::trace;

use super::TextClassifier;

/// Texts with at most this many words are never a policy.
pub const MIN_WORDS: usize = 500;

/// Keyword hits per word at which a text counts as a policy.
pub const MATCH_RATIO: f64 = 0.04;

/// English and German policy vocabulary, checked in this order.
pub const POLICY_KEYWORDS: &[&str] = &[
    "privacy",
    "policy",
    "policies",
    "data",
    "term",
    "condition",
    "use",
    "tos",
    "tou",
    "pp",
    "collect",
    "eula",
    "legal",
    "personal",
    "save",
    "store",
    "daten",
    "schutz",
    "erklärung",
    "agb",
    "dse",
    "allgemeine",
    "geschäft",
    "bedingung",
    "richt",
    "linie",
    "information",
    "erheben",
    "sammeln",
    "verarbeiten",
    "erhoben",
    "speichern",
    "erfassen",
    "persönlich",
];

/// Outcome of one classification, with the counts behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyVerdict {
    pub is_policy: bool,
    pub words: usize,
    pub matches: usize,
}

/// Keyword-ratio heuristic for privacy policy texts.
#[derive(Debug, Clone)]
pub struct PolicyClassifier {
    min_words: usize,
    ratio: f64,
    keywords: Vec<String>,
}

impl Default for PolicyClassifier {
    fn default() -> Self {
        Self {
            min_words: MIN_WORDS,
            ratio: MATCH_RATIO,
            keywords: POLICY_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl PolicyClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(min_words: usize, ratio: f64) -> Self {
        Self {
            min_words,
            ratio,
            ..Self::default()
        }
    }

    /// Count keyword hits until the running ratio reaches the threshold.
    ///
    /// The check runs after every keyword, so the verdict (and the reported
    /// match count) depends on keyword order.
    pub fn evaluate(&self, text: &str) -> PolicyVerdict {
        let words = text.split_whitespace().count();
        let mut verdict = PolicyVerdict {
            is_policy: false,
            words,
            matches: 0,
        };
        if words <= self.min_words {
            return verdict;
        }

        let lowered = text.to_lowercase();
        for keyword in &self.keywords {
            verdict.matches += lowered.matches(keyword.as_str()).count();
            if verdict.matches as f64 / words as f64 >= self.ratio {
                verdict.is_policy = true;
                break;
            }
        }

        trace!(words, matches = verdict.matches, is_policy = verdict.is_policy, "classified text");
        verdict
    }

    pub fn is_policy(&self, text: &str) -> bool {
        self.evaluate(text).is_policy
    }
}

impl TextClassifier for PolicyClassifier {
    fn is_match(&self, text: &str) -> bool {
        self.is_policy(text)
    }
}
