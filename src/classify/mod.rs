pub mod policy;

/// Decides whether a blob of screen text belongs to the class being searched for.
pub trait TextClassifier {
    fn is_match(&self, text: &str) -> bool;
}
