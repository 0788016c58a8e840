use serde::Serialize;

/// Number of monitored categories per shop
pub const CATEGORY_COUNT: usize = 4;

/// Raw status code -> category index
const CODE_TABLE: [(i64, usize); CATEGORY_COUNT] = [(1, 0), (2, 1), (3, 2), (6, 3)];

/// A monitored category, addressed by its index in a shop's counter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Category(usize);

impl Category {
    pub fn index(self) -> usize {
        self.0
    }

    /// Raw code that maps to this category
    pub fn code(self) -> i64 {
        CODE_TABLE
            .iter()
            .find(|(_, index)| *index == self.0)
            .map(|(code, _)| *code)
            .unwrap_or_default()
    }
}

/// Maps raw event codes to monitored categories using a static lookup table
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeClassifier;

impl CodeClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a raw code, rejecting codes that are not monitored
    pub fn classify(&self, raw_code: i64) -> Result<Category, ClassifyError> {
        CODE_TABLE
            .iter()
            .find(|(code, _)| *code == raw_code)
            .map(|(_, index)| Category(*index))
            .ok_or(ClassifyError::UnknownCode(raw_code))
    }

    /// All monitored categories, in index order
    pub fn categories(&self) -> impl Iterator<Item = Category> {
        (0..CATEGORY_COUNT).map(Category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("Unknown code {0}")]
    UnknownCode(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_codes() {
        let classifier = CodeClassifier::new();

        assert_eq!(classifier.classify(1).unwrap().index(), 0);
        assert_eq!(classifier.classify(2).unwrap().index(), 1);
        assert_eq!(classifier.classify(3).unwrap().index(), 2);
        assert_eq!(classifier.classify(6).unwrap().index(), 3);
    }

    #[test]
    fn test_unmapped_codes() {
        let classifier = CodeClassifier::new();

        for code in [0, 4, 5, 7, 99, -1, i64::MAX] {
            assert_eq!(
                classifier.classify(code),
                Err(ClassifyError::UnknownCode(code))
            );
        }
    }

    #[test]
    fn test_category_codes_in_order() {
        let classifier = CodeClassifier::new();
        let codes: Vec<i64> = classifier.categories().map(Category::code).collect();
        assert_eq!(codes, vec![1, 2, 3, 6]);
    }
}
