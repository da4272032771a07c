// Natural-language query parser
// This module compiles a free-text question into a table name plus a
// PostgREST-style filter (`column=operator.value`)
//
// Parsing is a pure function of the input text and the vocabulary:
// no I/O, no hidden state, so the same question always compiles the same way

use crate::vocab::{tokenize, Vocabulary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// The token that introduces a numeric identity predicate
const ID_TOKEN: &str = "id";
const ID_COLUMN: &str = "id";

/// How many tokens after `id` the integer literal may appear
const ID_WINDOW: usize = 2;

/// Filter operators understood by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Lt,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
        }
    }

    /// Operator implied by a word sitting between `id` and its number
    /// ("id above 3", "id not 4"); any other filler word keeps equality
    fn from_comparison_word(word: &str) -> Self {
        match word {
            "above" | "over" | "after" => Operator::Gt,
            "below" | "under" | "before" => Operator::Lt,
            "not" => Operator::Neq,
            _ => Operator::Eq,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single filter condition: `column=operator.value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    pub value: String,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}.{}", self.column, self.operator, self.value)
    }
}

/// The compiled form of a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Canonical table name, always a member of the vocabulary's table set
    pub table: String,
    /// `column=operator.value`, or empty to select every row
    pub filter: String,
    /// The word in the question that selected `table`
    pub matched_table_synonym: String,
    /// The phrase in the question that produced `filter`, if any
    pub matched_predicate_phrase: Option<String>,
}

impl ParsedQuery {
    pub fn has_filter(&self) -> bool {
        !self.filter.is_empty()
    }
}

/// Reasons a question cannot be compiled
/// Each variant carries the original input so callers can echo it back
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("query is empty")]
    EmptyInput,

    #[error("could not identify a table in '{0}'")]
    UnknownEntity(String),

    #[error("'{0}' asks for both completed and incomplete rows")]
    AmbiguousPredicate(String),
}

/// The query parser
/// Cheap to clone; clones share the same vocabulary
#[derive(Debug, Clone)]
pub struct QueryParser {
    vocabulary: Arc<Vocabulary>,
}

impl QueryParser {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Compile a natural-language question into a ParsedQuery
    ///
    /// The table is chosen by the first word (in reading order) that names a
    /// known entity, so "users with todos" reads `users`. A numeric identity
    /// ("id 3") takes precedence over a completion phrase ("done").
    pub fn parse(&self, text: &str) -> Result<ParsedQuery, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let tokens = tokenize(text);

        let (table, synonym) = self
            .resolve_table(&tokens)
            .ok_or_else(|| ParseError::UnknownEntity(text.to_string()))?;

        let predicate = match resolve_identity(&tokens) {
            Some(found) => Some(found),
            None => self.resolve_completion(&tokens, text)?,
        };

        let (filter, phrase) = match predicate {
            Some((predicate, phrase)) => (predicate.to_string(), Some(phrase)),
            None => (String::new(), None),
        };

        debug!(table, synonym, filter = %filter, "compiled question");

        Ok(ParsedQuery {
            table: table.to_string(),
            filter,
            matched_table_synonym: synonym.to_string(),
            matched_predicate_phrase: phrase,
        })
    }

    /// First token that is a known entity synonym, with its canonical table
    fn resolve_table<'a>(&'a self, tokens: &'a [String]) -> Option<(&'a str, &'a str)> {
        tokens.iter().find_map(|token| {
            self.vocabulary
                .table_for(token)
                .map(|table| (table, token.as_str()))
        })
    }

    /// Scan for completion-state phrases, longest phrase first at each position
    fn resolve_completion(
        &self,
        tokens: &[String],
        text: &str,
    ) -> Result<Option<(Predicate, String)>, ParseError> {
        let phrases = self.vocabulary.completion_phrases();
        let mut matches = Vec::new();

        let mut i = 0;
        while i < tokens.len() {
            let hit = phrases.iter().find(|p| {
                tokens.len() - i >= p.tokens.len() && tokens[i..i + p.tokens.len()] == p.tokens[..]
            });
            match hit {
                Some(phrase) => {
                    matches.push(phrase);
                    i += phrase.tokens.len();
                }
                None => i += 1,
            }
        }

        let Some(first) = matches.first() else {
            return Ok(None);
        };
        if matches.iter().any(|p| p.done != first.done) {
            return Err(ParseError::AmbiguousPredicate(text.to_string()));
        }

        let predicate = Predicate {
            column: self.vocabulary.completion_column().to_string(),
            operator: Operator::Eq,
            value: first.done.to_string(),
        };
        Ok(Some((predicate, first.text.clone())))
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new(Arc::new(Vocabulary::builtin()))
    }
}

/// A number as it appeared in the question
enum NumericLiteral {
    /// Digits with an optional sign, already in canonical form
    Integer(String),
    /// Anything else that starts with a digit, such as "1.5"
    Fractional,
}

impl NumericLiteral {
    fn classify(token: &str) -> Option<Self> {
        let digits = token.strip_prefix('-').unwrap_or(token);
        if !digits.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Some(NumericLiteral::Fractional);
        }
        // Out-of-range literals are passed through verbatim for the backend to compare
        let canonical = token
            .parse::<i64>()
            .map(|n| n.to_string())
            .unwrap_or_else(|_| token.to_string());
        Some(NumericLiteral::Integer(canonical))
    }
}

/// Find `id` followed within ID_WINDOW tokens by an integer literal
/// A non-integer number after `id` ends the search for that `id`: it never
/// yields a truncated filter
fn resolve_identity(tokens: &[String]) -> Option<(Predicate, String)> {
    for (i, token) in tokens.iter().enumerate() {
        if token != ID_TOKEN {
            continue;
        }

        for offset in 1..=ID_WINDOW {
            let Some(candidate) = tokens.get(i + offset) else {
                break;
            };
            let value = match NumericLiteral::classify(candidate) {
                Some(NumericLiteral::Integer(value)) => value,
                Some(NumericLiteral::Fractional) => break,
                None => continue,
            };

            let operator = tokens[i + 1..i + offset]
                .first()
                .map(|word| Operator::from_comparison_word(word))
                .unwrap_or(Operator::Eq);

            let predicate = Predicate {
                column: ID_COLUMN.to_string(),
                operator,
                value,
            };
            return Some((predicate, tokens[i..=i + offset].join(" ")));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ParsedQuery, ParseError> {
        QueryParser::default().parse(text)
    }

    fn table_and_filter(text: &str) -> (String, String) {
        let parsed = parse(text).unwrap();
        (parsed.table, parsed.filter)
    }

    fn pair(table: &str, filter: &str) -> (String, String) {
        (table.to_string(), filter.to_string())
    }

    #[test]
    fn test_all_rows() {
        assert_eq!(table_and_filter("get all todos"), pair("todos", ""));
        assert_eq!(table_and_filter("list all users"), pair("users", ""));

        let parsed = parse("list all users").unwrap();
        assert_eq!(parsed.matched_table_synonym, "users");
        assert_eq!(parsed.matched_predicate_phrase, None);
        assert!(!parsed.has_filter());
    }

    #[test]
    fn test_completed() {
        let parsed = parse("show completed todos").unwrap();
        assert_eq!(parsed.table, "todos");
        assert_eq!(parsed.filter, "is_done=eq.true");
        assert_eq!(parsed.matched_predicate_phrase.as_deref(), Some("completed"));
    }

    #[test]
    fn test_incomplete_synonyms_are_equivalent() {
        assert_eq!(
            table_and_filter("find incomplete todos"),
            pair("todos", "is_done=eq.false")
        );
        assert_eq!(
            table_and_filter("show me unfinished tasks"),
            pair("todos", "is_done=eq.false")
        );
        assert_eq!(
            table_and_filter("which tasks are pending?"),
            pair("todos", "is_done=eq.false")
        );
    }

    #[test]
    fn test_negated_phrase_beats_its_suffix() {
        let parsed = parse("todos that are not done").unwrap();
        assert_eq!(parsed.filter, "is_done=eq.false");
        assert_eq!(parsed.matched_predicate_phrase.as_deref(), Some("not done"));
    }

    #[test]
    fn test_id() {
        let parsed = parse("find todos with id 1").unwrap();
        assert_eq!(parsed.table, "todos");
        assert_eq!(parsed.filter, "id=eq.1");
        assert_eq!(parsed.matched_predicate_phrase.as_deref(), Some("id 1"));
    }

    #[test]
    fn test_id_window_and_punctuation() {
        assert_eq!(table_and_filter("user id=42"), pair("users", "id=eq.42"));
        assert_eq!(table_and_filter("post with ID: 7"), pair("posts", "id=eq.7"));
        assert_eq!(table_and_filter("task id number 12"), pair("todos", "id=eq.12"));
        // Integer too far away from "id"
        assert_eq!(table_and_filter("task id is really 12"), pair("todos", ""));
        // "id" without a number is not a filter
        assert_eq!(table_and_filter("show todos by id"), pair("todos", ""));
    }

    #[test]
    fn test_negative_id_keeps_its_sign() {
        let parsed = parse("todos with id -5").unwrap();
        assert_eq!(parsed.filter, "id=eq.-5");
        assert_eq!(parsed.matched_predicate_phrase.as_deref(), Some("id -5"));
        assert_eq!(table_and_filter("users with id below -2"), pair("users", "id=lt.-2"));
    }

    #[test]
    fn test_fractional_id_is_not_truncated() {
        assert_eq!(table_and_filter("todos with id 1.5"), pair("todos", ""));
        assert_eq!(table_and_filter("todo id 2.0 or id 3"), pair("todos", "id=eq.3"));
    }

    #[test]
    fn test_oversized_id_is_passed_through() {
        assert_eq!(
            table_and_filter("todos with id 99999999999999999999"),
            pair("todos", "id=eq.99999999999999999999")
        );
        assert_eq!(
            table_and_filter("completed todos with id 99999999999999999999"),
            pair("todos", "id=eq.99999999999999999999")
        );
        assert_eq!(table_and_filter("task id 007"), pair("todos", "id=eq.7"));
    }

    #[test]
    fn test_id_comparison_words() {
        assert_eq!(table_and_filter("todos with id above 3"), pair("todos", "id=gt.3"));
        assert_eq!(table_and_filter("users with id under 10"), pair("users", "id=lt.10"));
        assert_eq!(table_and_filter("posts with id not 4"), pair("posts", "id=neq.4"));
    }

    #[test]
    fn test_id_takes_precedence_over_completion() {
        assert_eq!(
            table_and_filter("show completed todos with id 5"),
            pair("todos", "id=eq.5")
        );
        // Even when the completion phrases would conflict
        assert_eq!(
            table_and_filter("done or unfinished todo id 9"),
            pair("todos", "id=eq.9")
        );
    }

    #[test]
    fn test_conflicting_completion_is_ambiguous() {
        let text = "show completed and incomplete todos";
        assert_eq!(
            parse(text),
            Err(ParseError::AmbiguousPredicate(text.to_string()))
        );
    }

    #[test]
    fn test_repeated_same_polarity_is_not_ambiguous() {
        assert_eq!(
            table_and_filter("finished tasks, the done ones"),
            pair("todos", "is_done=eq.true")
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), Err(ParseError::EmptyInput));
        assert_eq!(parse("   \t\n"), Err(ParseError::EmptyInput));
    }

    #[test]
    fn test_unknown_entity() {
        assert_eq!(
            parse("asdfqwer"),
            Err(ParseError::UnknownEntity("asdfqwer".to_string()))
        );
        assert!(matches!(parse("?!"), Err(ParseError::UnknownEntity(_))));
    }

    #[test]
    fn test_whole_token_matching() {
        // "posted" must not be read as "post"
        assert!(matches!(
            parse("what was posted yesterday"),
            Err(ParseError::UnknownEntity(_))
        ));
        assert_eq!(table_and_filter("posted todos"), pair("todos", ""));
        // "incomplete" must not be read as "complete"
        assert_eq!(
            table_and_filter("incomplete tasks"),
            pair("todos", "is_done=eq.false")
        );
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(
            parse("SHOW   Completed\tTODOS").unwrap(),
            parse("show completed todos").unwrap()
        );
    }

    #[test]
    fn test_earliest_entity_wins() {
        let vocab = Vocabulary::builtin();
        let parser = QueryParser::default();
        let words = ["todo", "tasks", "users", "user", "posts", "post"];

        for first in words {
            for second in words {
                let text = format!("show {} and {}", first, second);
                let parsed = parser.parse(&text).unwrap();
                assert_eq!(Some(parsed.table.as_str()), vocab.table_for(first), "{}", text);
                assert_eq!(parsed.matched_table_synonym, first);
            }
        }

        assert_eq!(table_and_filter("users who own todos"), pair("users", ""));
        assert_eq!(table_and_filter("todos owned by users"), pair("todos", ""));
    }

    #[test]
    fn test_parse_is_pure() {
        let questions = [
            "show completed todos",
            "find todos with id 1",
            "list all users",
            "asdfqwer",
            "",
            "completed and incomplete todos",
        ];
        let first = QueryParser::default();
        let second = QueryParser::default();

        for text in questions {
            let expected = first.parse(text);
            for _ in 0..3 {
                assert_eq!(first.parse(text), expected);
                assert_eq!(second.parse(text), expected);
            }
        }
    }

    #[test]
    fn test_filter_shape() {
        let questions = [
            "get all todos",
            "show completed todos",
            "not finished tasks",
            "user id 3",
            "posts with id over 100",
            "todo id before 2",
        ];

        for text in questions {
            let parsed = parse(text).unwrap();
            assert!(QueryParser::default().vocabulary().is_table(&parsed.table));
            if parsed.filter.is_empty() {
                continue;
            }
            let (column, rest) = parsed.filter.split_once('=').unwrap();
            let (operator, value) = rest.split_once('.').unwrap();
            assert!(!column.is_empty());
            assert!(["eq", "neq", "gt", "lt"].contains(&operator), "{}", parsed.filter);
            assert!(!value.is_empty());
        }
    }

    #[test]
    fn test_custom_vocabulary() {
        let vocab = Vocabulary::from_json(
            r#"{
                "entities": { "orders": ["order", "purchases"] },
                "completion": { "column": "shipped", "done": ["shipped"], "not_done": ["waiting"] }
            }"#,
        )
        .unwrap();
        let parser = QueryParser::new(Arc::new(vocab));

        let parsed = parser.parse("purchases still waiting").unwrap();
        assert_eq!(parsed.table, "orders");
        assert_eq!(parsed.filter, "shipped=eq.false");
        assert!(matches!(parser.parse("show todos"), Err(ParseError::UnknownEntity(_))));
    }

    #[test]
    fn test_shared_across_threads() {
        let parser = QueryParser::default();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let parsed = parser.parse("show completed todos").unwrap();
                    assert_eq!(parsed.filter, "is_done=eq.true");
                });
            }
        });
    }

    #[test]
    fn test_error_messages_echo_input() {
        let err = parse("asdfqwer").unwrap_err();
        assert_eq!(err.to_string(), "could not identify a table in 'asdfqwer'");
    }
}
