//! # Statement Classifier
//!
//! Extracts the operation kind, target table and (for inserts) the primary
//! key value from a normalized statement. Prefixes are checked in a fixed
//! order and the first match wins.

use crate::error::ClassifyError;
use crate::model::{OperationKind, Statement};

/// Classifies one statement produced by [`crate::splitter`].
pub fn classify(normalized: &str) -> Result<Statement, ClassifyError> {
    let text = normalized.trim();
    let tokens: Vec<&str> = text.split_whitespace().collect();

    let (kind, table, primary_key) = if text.starts_with("CREATE TABLE") {
        let table = nth_token(&tokens, 2, "CREATE TABLE")?;
        (OperationKind::CreateTable, table, None)
    } else if text.starts_with("SELECT") {
        (OperationKind::Query, identifier_after_from(text)?, None)
    } else if text.starts_with("DROP TABLE") {
        let table = nth_token(&tokens, 2, "DROP TABLE")?;
        (OperationKind::DropTable, table, None)
    } else if text.starts_with("INSERT INTO") {
        let table = nth_token(&tokens, 2, "INSERT INTO")?;
        (OperationKind::Insert, table, insert_primary_key(text))
    } else if text.starts_with("UPDATE") {
        (OperationKind::Update, nth_token(&tokens, 1, "UPDATE")?, None)
    } else if text.starts_with("DELETE") {
        (OperationKind::Delete, identifier_after_from(text)?, None)
    } else {
        return Err(ClassifyError::Unsupported);
    };

    Ok(Statement::new(text, kind, table, primary_key))
}

fn nth_token(tokens: &[&str], idx: usize, keyword: &'static str) -> Result<String, ClassifyError> {
    tokens
        .get(idx)
        .filter(|token| **token != ";" && !token.starts_with('('))
        .map(|token| token.to_string())
        .ok_or(ClassifyError::MissingTable { keyword })
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// First identifier following the first standalone `FROM` keyword.
fn identifier_after_from(text: &str) -> Result<String, ClassifyError> {
    let missing = ClassifyError::MissingTable { keyword: "FROM" };
    let from = find_keyword(text, "FROM").ok_or(missing.clone())?;
    let tail = &text[from + "FROM".len()..];
    let start = tail.find(is_word_char).ok_or(missing.clone())?;
    let ident: String = tail[start..].chars().take_while(|c| is_word_char(*c)).collect();
    if ident.is_empty() {
        return Err(missing);
    }
    Ok(ident)
}

fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    text.match_indices(keyword).map(|(idx, _)| idx).find(|&idx| {
        let before = text[..idx].chars().next_back();
        let after = text[idx + keyword.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// First element of the VALUES list, parentheses stripped.
fn insert_primary_key(text: &str) -> Option<String> {
    let values = find_keyword(text, "VALUES")?;
    let list = text[values + "VALUES".len()..]
        .trim_end()
        .trim_end_matches(';');
    let first = list.split(',').next()?;
    let key = first.replace(['(', ')'], "");
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
