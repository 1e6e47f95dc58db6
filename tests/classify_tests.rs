use pretty_assertions::assert_eq;

use policy_crawler::classify::TextClassifier;
use policy_crawler::classify::policy::{MIN_WORDS, PolicyClassifier, PolicyVerdict};

mod common;

use common::policy_text;

fn mixed_text(privacy: usize, policy: usize, policies: usize, words: usize) -> String {
    let mut parts = Vec::new();
    parts.extend(std::iter::repeat_n("privacy", privacy));
    parts.extend(std::iter::repeat_n("policy", policy));
    parts.extend(std::iter::repeat_n("policies", policies));
    parts.extend(std::iter::repeat_n("lorem", words - privacy - policy - policies));
    parts.join(" ")
}

// ============================================================================
// Word threshold
// ============================================================================

#[test]
fn short_text_is_never_a_policy() {
    let classifier = PolicyClassifier::default();
    let text = policy_text(MIN_WORDS, MIN_WORDS);
    let verdict = classifier.evaluate(&text);
    assert_eq!(
        verdict,
        PolicyVerdict {
            is_policy: false,
            words: 500,
            matches: 0,
        }
    );
}

#[test]
fn empty_text_is_not_a_policy() {
    assert!(!PolicyClassifier::default().is_policy(""));
}

// ============================================================================
// Keyword ratio
// ============================================================================

#[test]
fn ratio_is_reached_at_third_keyword() {
    let text = mixed_text(10, 10, 10, 600);
    let verdict = PolicyClassifier::default().evaluate(&text);
    assert!(verdict.is_policy);
    assert_eq!(verdict.words, 600);
    assert_eq!(verdict.matches, 30);
}

/// Replace the first `n` filler words of `text` with `word`.
fn with_filler_replaced(text: &str, word: &str, n: usize) -> String {
    text.replacen("lorem", word, n)
}

#[test]
fn later_keywords_are_not_counted_once_ratio_is_reached() {
    let text = mixed_text(10, 10, 10, 600);
    let text = with_filler_replaced(&text, "data", 20);
    let text = with_filler_replaced(&text, "information", 20);

    let verdict = PolicyClassifier::default().evaluate(&text);
    assert_eq!(
        verdict,
        PolicyVerdict {
            is_policy: true,
            words: 600,
            matches: 30,
        }
    );
}

#[test]
fn later_keywords_count_until_ratio_is_reached() {
    let text = with_filler_replaced(&mixed_text(10, 10, 0, 600), "data", 5);
    let verdict = PolicyClassifier::default().evaluate(&text);
    assert!(verdict.is_policy);
    assert_eq!(verdict.matches, 25);
}

#[test]
fn below_ratio_is_not_a_policy() {
    let text = mixed_text(10, 10, 0, 600);
    let verdict = PolicyClassifier::default().evaluate(&text);
    assert!(!verdict.is_policy);
    assert_eq!(verdict.matches, 20);
}

#[test]
fn matching_ignores_case() {
    let text = policy_text(600, 30).replace("privacy", "PRIVACY");
    assert!(PolicyClassifier::default().is_policy(&text));
}

#[test]
fn more_keywords_never_flip_a_policy_back() {
    let classifier = PolicyClassifier::default();
    let verdicts: Vec<bool> = (0..=60).map(|hits| classifier.is_policy(&policy_text(600, hits))).collect();

    assert!(!verdicts[20]);
    assert!(verdicts[30]);
    let first = verdicts.iter().position(|&v| v).unwrap();
    assert!(verdicts[first..].iter().all(|&v| v));
}

#[test]
fn custom_thresholds() {
    let classifier = PolicyClassifier::with_thresholds(5, 0.5);
    assert!(!classifier.is_policy("privacy privacy lorem lorem lorem lorem"));

    let verdict = classifier.evaluate("privacy policy privacy policy lorem lorem");
    assert!(verdict.is_policy);
    assert_eq!(verdict.matches, 4);
}

#[test]
fn text_classifier_trait_delegates() {
    let classifier = PolicyClassifier::new();
    let text = policy_text(600, 30);
    assert_eq!(classifier.is_match(&text), classifier.is_policy(&text));
}
