use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};

/// Sorted, bidirectional mapping between feature names and column indices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVocabulary {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureVocabulary {
    pub fn new() -> FeatureVocabulary {
        FeatureVocabulary::default()
    }

    /// Build a vocabulary from any collection of names; duplicates collapse and columns follow sorted order.
    pub fn from_names<I, S>(names: I) -> FeatureVocabulary
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let names: Vec<String> = sorted.into_iter().collect();
        let index = names.iter().enumerate().map(|(j, name)| (name.clone(), j)).collect();
        FeatureVocabulary { names, index }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn name_of(&self, column: usize) -> Option<&str> {
        self.names.get(column).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn union(&self, other: &FeatureVocabulary) -> FeatureVocabulary {
        FeatureVocabulary::from_names(self.names.iter().chain(other.names.iter()).cloned())
    }

    /// Names present in both vocabularies, in sorted order.
    pub fn intersection(&self, other: &FeatureVocabulary) -> Vec<String> {
        self.names.iter().filter(|name| other.contains(name)).cloned().collect()
    }
}

/// Fixed-width hashing of feature names into `n_features` buckets.
///
/// The bucket comes from the first eight bytes of the SHA-256 digest of the name and the
/// sign from the ninth, so the mapping is stable across runs and platforms. Colliding
/// features are summed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureHasher {
    pub n_features: usize,
}

impl FeatureHasher {
    pub fn new(n_features: usize) -> FeatureHasher {
        FeatureHasher { n_features }
    }

    pub fn bucket(&self, name: &str) -> (usize, f64) {
        let digest = Sha256::digest(name.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let column = (u64::from_le_bytes(head) % self.n_features.max(1) as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (column, sign)
    }
}

/// How a feature set exposes its columns to a model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Vectorizer {
    /// One column per distinct feature name.
    #[default]
    Dict,
    Hasher(FeatureHasher),
}

impl Vectorizer {
    pub fn hashing(n_features: usize) -> Vectorizer {
        Vectorizer::Hasher(FeatureHasher::new(n_features))
    }

    pub fn n_columns(&self, vocabulary: &FeatureVocabulary) -> usize {
        match self {
            Vectorizer::Dict => vocabulary.len(),
            Vectorizer::Hasher(hasher) => hasher.n_features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_is_sorted_and_deduplicated() {
        let vocabulary = FeatureVocabulary::from_names(vec!["f3", "f1", "f2", "f1"]);
        assert_eq!(vocabulary.names(), ["f1", "f2", "f3"], "names should be sorted and unique");
        assert_eq!(vocabulary.index_of("f2"), Some(1), "f2 should sit in the second column");
        assert_eq!(vocabulary.name_of(2), Some("f3"), "the inverse index should agree with the forward one");
        assert_eq!(vocabulary.index_of("f4"), None, "unknown names have no column");
    }

    #[test]
    fn test_vocabulary_union_and_intersection() {
        let a = FeatureVocabulary::from_names(vec!["a", "c"]);
        let b = FeatureVocabulary::from_names(vec!["b", "c"]);
        assert_eq!(a.union(&b).names(), ["a", "b", "c"]);
        assert_eq!(a.intersection(&b), vec!["c".to_string()]);
        assert!(a.intersection(&FeatureVocabulary::new()).is_empty());
    }

    #[test]
    fn test_hasher_is_deterministic_and_bounded() {
        let hasher = FeatureHasher::new(7);
        for name in ["f000", "f001", "is_dog0", ""] {
            let (column, sign) = hasher.bucket(name);
            assert!(column < 7, "bucket {} is out of range for {:?}", column, name);
            assert!(sign == 1.0 || sign == -1.0, "sign must be +/-1");
            assert_eq!(hasher.bucket(name), (column, sign), "hashing must be deterministic");
        }
    }

    #[test]
    fn test_vectorizer_columns() {
        let vocabulary = FeatureVocabulary::from_names(vec!["a", "b", "c"]);
        assert_eq!(Vectorizer::Dict.n_columns(&vocabulary), 3);
        assert_eq!(Vectorizer::hashing(10).n_columns(&vocabulary), 10);
    }
}
