// Vocabulary module - the word lists the parser matches questions against
// A vocabulary is built once at startup and shared read-only (behind an Arc)
// by every parser that needs it

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Raw vocabulary as it appears in a JSON configuration file
///
/// ```json
/// {
///   "entities": { "todos": ["todo", "todos", "task", "tasks"] },
///   "completion": { "column": "is_done", "done": ["done"], "not_done": ["not done"] }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyConfig {
    /// Canonical table name -> the words that refer to it
    pub entities: BTreeMap<String, Vec<String>>,
    pub completion: CompletionConfig,
}

/// Phrases describing the completion state of a row
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    /// Boolean column the phrases filter on
    pub column: String,
    pub done: Vec<String>,
    pub not_done: Vec<String>,
}

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to read vocabulary file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid vocabulary JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("vocabulary defines no tables")]
    NoTables,

    #[error("'{0}' is not a valid table or column name")]
    InvalidIdentifier(String),

    #[error("table '{0}' has no synonyms")]
    NoSynonyms(String),

    #[error("synonym '{0}' must be a single word")]
    MultiWordSynonym(String),

    #[error("synonym '{synonym}' maps to both '{first}' and '{second}'")]
    ConflictingSynonym {
        synonym: String,
        first: String,
        second: String,
    },

    #[error("completion phrases must contain at least one word")]
    EmptyPhrase,

    #[error("phrase '{0}' is listed as both done and not done")]
    ConflictingPhrase(String),
}

/// A completion-state phrase, pre-split into tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPhrase {
    /// Normalized phrase text (tokens joined by single spaces)
    pub text: String,
    pub tokens: Vec<String>,
    /// true for "done" phrases, false for "not done" phrases
    pub done: bool,
}

/// Immutable lookup tables used by the parser
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tables: BTreeSet<String>,
    /// synonym -> canonical table
    synonyms: HashMap<String, String>,
    completion_column: String,
    /// Sorted longest first so "not done" is tried before "done"
    phrases: Vec<CompletionPhrase>,
}

impl Vocabulary {
    /// The vocabulary shipped with the crate: todos, users and posts
    pub fn builtin() -> Self {
        Self::assemble(builtin_config())
    }

    /// Validate a configuration and build a vocabulary from it
    pub fn from_config(config: VocabularyConfig) -> Result<Self, VocabularyError> {
        validate(&config)?;
        Ok(Self::assemble(config))
    }

    /// Parse and validate a JSON vocabulary document
    pub fn from_json(json: &str) -> Result<Self, VocabularyError> {
        let config: VocabularyConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    /// Load a JSON vocabulary file from disk
    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let json = std::fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Look up the canonical table for a single normalized token
    pub fn table_for(&self, token: &str) -> Option<&str> {
        self.synonyms.get(token).map(String::as_str)
    }

    pub fn is_table(&self, name: &str) -> bool {
        self.tables.contains(name)
    }

    /// Canonical table names in sorted order
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    pub fn completion_column(&self) -> &str {
        &self.completion_column
    }

    pub fn completion_phrases(&self) -> &[CompletionPhrase] {
        &self.phrases
    }

    // Assumes `config` has already been validated (or is the builtin one)
    fn assemble(config: VocabularyConfig) -> Self {
        let mut tables = BTreeSet::new();
        let mut synonyms = HashMap::new();

        for (table, words) in config.entities {
            for word in words {
                synonyms.insert(word.trim().to_lowercase(), table.clone());
            }
            // The canonical name always refers to itself
            synonyms.insert(table.clone(), table.clone());
            tables.insert(table);
        }

        let done = config.completion.done.iter().map(|p| (p, true));
        let not_done = config.completion.not_done.iter().map(|p| (p, false));

        let mut phrases: Vec<CompletionPhrase> = done
            .chain(not_done)
            .map(|(phrase, done)| {
                let tokens = tokenize(phrase);
                CompletionPhrase {
                    text: tokens.join(" "),
                    tokens,
                    done,
                }
            })
            .collect();
        phrases.sort_by(|a, b| b.tokens.len().cmp(&a.tokens.len()));

        Self {
            tables,
            synonyms,
            completion_column: config.completion.column,
            phrases,
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Split text into lowercase word tokens
/// Any character that is not a letter or digit separates tokens, so
/// punctuation and repeated whitespace disappear. Numeric literals stay
/// whole: a leading `-` before a digit and a decimal point between digits
/// are kept ("-5", "1.5")
pub fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.to_lowercase().chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let digit_follows = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());

        if c.is_alphanumeric() {
            current.push(c);
        } else if c == '-' && current.is_empty() && digit_follows {
            current.push(c);
        } else if c == '.' && digit_follows && is_number_prefix(&current) {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

// "-12" or "12": digits with an optional sign, no decimal point yet
fn is_number_prefix(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn validate(config: &VocabularyConfig) -> Result<(), VocabularyError> {
    if config.entities.is_empty() {
        return Err(VocabularyError::NoTables);
    }

    let mut seen: HashMap<String, &str> = HashMap::new();
    for (table, words) in &config.entities {
        if !is_identifier(table) {
            return Err(VocabularyError::InvalidIdentifier(table.clone()));
        }
        if words.is_empty() {
            return Err(VocabularyError::NoSynonyms(table.clone()));
        }

        let names = words.iter().map(String::as_str).chain(std::iter::once(table.as_str()));
        for word in names {
            let tokens = tokenize(word);
            if tokens.len() != 1 || tokens[0] != word.trim().to_lowercase() {
                return Err(VocabularyError::MultiWordSynonym(word.to_string()));
            }
            let synonym = tokens[0].clone();
            if let Some(first) = seen.get(&synonym) {
                if *first != table.as_str() {
                    return Err(VocabularyError::ConflictingSynonym {
                        synonym,
                        first: first.to_string(),
                        second: table.clone(),
                    });
                }
            }
            seen.insert(synonym, table.as_str());
        }
    }

    if !is_identifier(&config.completion.column) {
        return Err(VocabularyError::InvalidIdentifier(
            config.completion.column.clone(),
        ));
    }

    let mut done = BTreeSet::new();
    for phrase in &config.completion.done {
        let tokens = tokenize(phrase);
        if tokens.is_empty() {
            return Err(VocabularyError::EmptyPhrase);
        }
        done.insert(tokens.join(" "));
    }
    for phrase in &config.completion.not_done {
        let tokens = tokenize(phrase);
        if tokens.is_empty() {
            return Err(VocabularyError::EmptyPhrase);
        }
        let text = tokens.join(" ");
        if done.contains(&text) {
            return Err(VocabularyError::ConflictingPhrase(text));
        }
    }

    Ok(())
}

fn builtin_config() -> VocabularyConfig {
    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    let mut entities = BTreeMap::new();
    entities.insert("todos".to_string(), words(&["todo", "todos", "task", "tasks"]));
    entities.insert("users".to_string(), words(&["user", "users"]));
    entities.insert("posts".to_string(), words(&["post", "posts"]));

    VocabularyConfig {
        entities,
        completion: CompletionConfig {
            column: "is_done".to_string(),
            done: words(&["completed", "complete", "done", "finished"]),
            not_done: words(&[
                "incomplete",
                "unfinished",
                "pending",
                "undone",
                "not done",
                "not completed",
                "not complete",
                "not finished",
            ]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config_is_valid() {
        assert!(validate(&builtin_config()).is_ok());
    }

    #[test]
    fn test_tokenize_normalizes_case_and_punctuation() {
        assert_eq!(
            tokenize("  Show   ME the TODOS, with id=7!  "),
            vec!["show", "me", "the", "todos", "with", "id", "7"]
        );
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_tokenize_keeps_numeric_literals_whole() {
        assert_eq!(
            tokenize("id -5, id 1.5 and pre-2."),
            vec!["id", "-5", "id", "1.5", "and", "pre", "2"]
        );
        assert_eq!(tokenize("id: 7. done"), vec!["id", "7", "done"]);
        assert_eq!(tokenize("1.5.3 - x"), vec!["1.5", "3", "x"]);
    }

    #[test]
    fn test_synonyms_resolve_to_canonical_tables() {
        let vocab = Vocabulary::builtin();
        assert_eq!(vocab.table_for("tasks"), Some("todos"));
        assert_eq!(vocab.table_for("todo"), Some("todos"));
        assert_eq!(vocab.table_for("user"), Some("users"));
        assert_eq!(vocab.table_for("posted"), None);
        assert!(vocab.is_table("posts"));
        assert!(!vocab.is_table("post"));
        assert_eq!(vocab.tables().collect::<Vec<_>>(), vec!["posts", "todos", "users"]);
    }

    #[test]
    fn test_phrases_sorted_longest_first() {
        let vocab = Vocabulary::builtin();
        let phrases = vocab.completion_phrases();
        assert_eq!(phrases[0].tokens.len(), 2);
        assert!(phrases.windows(2).all(|w| w[0].tokens.len() >= w[1].tokens.len()));
        assert_eq!(vocab.completion_column(), "is_done");
    }

    #[test]
    fn test_from_json() {
        let vocab = Vocabulary::from_json(
            r#"{
                "entities": { "orders": ["Order", "orders", "purchase"] },
                "completion": { "column": "shipped", "done": ["shipped"], "not_done": ["not shipped"] }
            }"#,
        )
        .unwrap();

        assert_eq!(vocab.table_for("order"), Some("orders"));
        assert_eq!(vocab.table_for("purchase"), Some("orders"));
        assert_eq!(vocab.completion_column(), "shipped");
    }

    #[test]
    fn test_rejects_conflicting_synonym() {
        let err = Vocabulary::from_json(
            r#"{
                "entities": { "posts": ["entry"], "todos": ["entry"] },
                "completion": { "column": "is_done", "done": ["done"], "not_done": ["open"] }
            }"#,
        )
        .unwrap_err();

        assert!(matches!(err, VocabularyError::ConflictingSynonym { ref synonym, .. } if synonym == "entry"));
    }

    #[test]
    fn test_rejects_multi_word_synonym() {
        let err = Vocabulary::from_json(
            r#"{
                "entities": { "todos": ["to do"] },
                "completion": { "column": "is_done", "done": ["done"], "not_done": ["open"] }
            }"#,
        )
        .unwrap_err();

        assert!(matches!(err, VocabularyError::MultiWordSynonym(_)));
    }

    #[test]
    fn test_rejects_bad_column_and_phrases() {
        let bad_column = Vocabulary::from_json(
            r#"{
                "entities": { "todos": ["todo"] },
                "completion": { "column": "is done", "done": ["done"], "not_done": ["open"] }
            }"#,
        );
        assert!(matches!(bad_column, Err(VocabularyError::InvalidIdentifier(_))));

        let conflicting = Vocabulary::from_json(
            r#"{
                "entities": { "todos": ["todo"] },
                "completion": { "column": "is_done", "done": ["Done"], "not_done": ["done"] }
            }"#,
        );
        assert!(matches!(conflicting, Err(VocabularyError::ConflictingPhrase(_))));

        let empty = Vocabulary::from_json(
            r#"{
                "entities": { "todos": ["todo"] },
                "completion": { "column": "is_done", "done": ["?!"], "not_done": [] }
            }"#,
        );
        assert!(matches!(empty, Err(VocabularyError::EmptyPhrase)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Vocabulary::from_json("{ not json"),
            Err(VocabularyError::Json(_))
        ));
    }
}
