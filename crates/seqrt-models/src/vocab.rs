//! Token tables loaded next to a model

use seqrt_common::{Result, SeqrtError};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const SHARED_VOCABULARY_FILE: &str = "shared_vocabulary.txt";
pub const SOURCE_VOCABULARY_FILE: &str = "source_vocabulary.txt";
pub const TARGET_VOCABULARY_FILE: &str = "target_vocabulary.txt";
pub const VOCABULARY_MAP_FILE: &str = "vmap.txt";

/// Bidirectional token <-> id table, one token per line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let mut ids = HashMap::with_capacity(tokens.len());
        for (id, token) in tokens.iter().enumerate() {
            // First occurrence wins for duplicated tokens.
            ids.entry(token.clone()).or_insert(id);
        }
        Self { tokens, ids }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_tokens(content.lines().map(|line| line.trim_end_matches('\r'))))
    }

    pub fn size(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn to_token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    pub fn to_id(&self, token: &str) -> Option<usize> {
        self.ids.get(token).copied()
    }
}

/// Source n-gram -> candidate target ids, used to restrict the output
/// vocabulary.
///
/// File format: `<source tokens>\t<target token> <target token> ...` per line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VocabularyMap {
    entries: HashMap<String, Vec<usize>>,
}

impl VocabularyMap {
    pub fn from_file(path: &Path, target: &Vocabulary) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut entries = HashMap::new();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (key, values) = line.split_once('\t').ok_or_else(|| {
                SeqrtError::format(format!("{}:{}: missing tab separator", path.display(), number + 1))
            })?;
            let ids = values.split_whitespace().filter_map(|token| target.to_id(token)).collect();
            entries.insert(key.to_string(), ids);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, source: &str) -> Option<&[usize]> {
        self.entries.get(source).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Vocabularies of a model. Shared vocabularies are one table behind both
/// sides.
#[derive(Debug, Clone, Default)]
pub struct Vocabularies {
    pub source: Arc<Vocabulary>,
    pub target: Arc<Vocabulary>,
    pub map: Option<VocabularyMap>,
}

impl Vocabularies {
    /// Loads the vocabulary files found in `dir`. Missing files yield empty
    /// vocabularies.
    pub fn load(dir: &Path) -> Result<Self> {
        let shared = dir.join(SHARED_VOCABULARY_FILE);
        let (source, target) = if shared.is_file() {
            let vocabulary = Arc::new(Vocabulary::from_file(&shared)?);
            (Arc::clone(&vocabulary), vocabulary)
        } else {
            let source = load_optional(&dir.join(SOURCE_VOCABULARY_FILE))?;
            let target = load_optional(&dir.join(TARGET_VOCABULARY_FILE))?;
            (Arc::new(source), Arc::new(target))
        };

        let map_path = dir.join(VOCABULARY_MAP_FILE);
        let map = if map_path.is_file() {
            Some(VocabularyMap::from_file(&map_path, &target)?)
        } else {
            None
        };

        debug!(
            dir = %dir.display(),
            source = source.size(),
            target = target.size(),
            shared = Arc::ptr_eq(&source, &target),
            "loaded vocabularies"
        );
        Ok(Self { source, target, map })
    }
}

fn load_optional(path: &Path) -> Result<Vocabulary> {
    if path.is_file() { Vocabulary::from_file(path) } else { Ok(Vocabulary::default()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_lookup() {
        let vocab = Vocabulary::from_tokens(["<unk>", "<s>", "</s>", "hello", "<s>"]);
        assert_eq!(vocab.size(), 5);
        assert_eq!(vocab.to_id("hello"), Some(3));
        assert_eq!(vocab.to_id("<s>"), Some(1));
        assert_eq!(vocab.to_token(2), Some("</s>"));
        assert_eq!(vocab.to_token(9), None);
    }

    #[test]
    fn shared_vocabulary_backs_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SHARED_VOCABULARY_FILE), "a\nb\nc\n").unwrap();
        fs::write(dir.path().join(VOCABULARY_MAP_FILE), "a b\tb c zz\n\nc\ta\n").unwrap();

        let vocabularies = Vocabularies::load(dir.path()).unwrap();
        assert!(Arc::ptr_eq(&vocabularies.source, &vocabularies.target));
        let map = vocabularies.map.unwrap();
        assert_eq!(map.get("a b"), Some(&[1, 2][..]));
        assert_eq!(map.get("c"), Some(&[0][..]));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn missing_files_give_empty_vocabularies() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TARGET_VOCABULARY_FILE), "x\ny\n").unwrap();
        let vocabularies = Vocabularies::load(dir.path()).unwrap();
        assert!(vocabularies.source.is_empty());
        assert_eq!(vocabularies.target.size(), 2);
        assert!(vocabularies.map.is_none());
    }

    #[test]
    fn malformed_map_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VOCABULARY_MAP_FILE), "no tab here\n").unwrap();
        assert!(Vocabularies::load(dir.path()).is_err());
    }
}
