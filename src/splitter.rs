//! # Statement Splitter
//!
//! Turns raw multi-statement SQL text into individually executable,
//! canonical statements. Keywords are upper-cased; anything inside single
//! quotes or parentheses keeps its original case and spacing.

/// Terminator appended to every normalized statement.
pub const TERMINATOR: &str = " ;";

/// Lazily splits `sql` into normalized statements.
///
/// The iterator is a pure function of its input: calling this twice on the
/// same text yields the same sequence.
pub fn split_statements(sql: &str) -> Statements<'_> {
    Statements { rest: sql }
}

/// Iterator returned by [`split_statements`].
#[derive(Debug, Clone)]
pub struct Statements<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Statements<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.rest.is_empty() {
            let (chunk, rest) = match statement_end(self.rest) {
                Some(idx) => (&self.rest[..idx], &self.rest[idx + 1..]),
                None => (self.rest, ""),
            };
            self.rest = rest;

            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                return Some(normalize_statement(trimmed));
            }
        }
        None
    }
}

/// Tracks single-quoted literals across a character stream. Inside a
/// literal a backslash escapes the next character, so `\'` stays open and
/// `\\'` closes.
#[derive(Debug, Default)]
struct QuoteScanner {
    in_quote: bool,
    escaped: bool,
}

impl QuoteScanner {
    /// Advances past `c`, returning true when `c` belongs to a literal
    /// (delimiters included).
    fn step(&mut self, c: char) -> bool {
        if !self.in_quote {
            self.in_quote = c == '\'';
            return self.in_quote;
        }
        if self.escaped {
            self.escaped = false;
        } else if c == '\\' {
            self.escaped = true;
        } else if c == '\'' {
            self.in_quote = false;
        }
        true
    }
}

/// Byte offset of the first `;` that is not inside a quoted literal.
fn statement_end(text: &str) -> Option<usize> {
    let mut quotes = QuoteScanner::default();
    text.char_indices()
        .find(|&(_, c)| !quotes.step(c) && c == ';')
        .map(|(idx, _)| idx)
}

/// Canonicalizes a single statement (without its trailing semicolon).
///
/// Newlines fold to spaces, text outside quotes and parentheses is
/// upper-cased, and a top-level parenthesized group is re-emitted as
/// `" (" ... ")"` so that column lists never touch the preceding keyword.
pub fn normalize_statement(statement: &str) -> String {
    let mut out = String::with_capacity(statement.len() + 4);
    let mut quotes = QuoteScanner::default();
    let mut depth = 0usize;

    for c in statement.chars() {
        let c = if c == '\n' || c == '\r' { ' ' } else { c };
        if quotes.step(c) {
            out.push(c);
        } else if depth > 0 {
            out.push(c);
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        } else if c == '(' {
            depth = 1;
            out.push_str(" (");
        } else if c == ')' {
            out.push_str(" )");
        } else {
            out.extend(c.to_uppercase());
        }
    }

    if !out.ends_with(';') {
        out.push_str(TERMINATOR);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_counts_non_empty_statements() {
        let sql = "create table t (id int);\n\n;  ;select * from t;\ninsert into t values (1)";
        let statements: Vec<String> = split_statements(sql).collect();
        assert_eq!(statements.len(), 3);
        assert!(statements.iter().all(|s| s.ends_with(';')));
    }

    #[test]
    fn test_keywords_uppercased_literals_preserved() {
        let statements: Vec<String> =
            split_statements("update People set name = 'Mixed Case' where id = 3;").collect();
        assert_eq!(
            statements,
            vec!["UPDATE PEOPLE SET NAME = 'Mixed Case' WHERE ID = 3 ;"]
        );
    }

    #[test]
    fn test_parenthesized_group_is_padded() {
        let normalized = normalize_statement("create table Foo(id int, Name varchar(20))");
        assert_eq!(
            normalized,
            "CREATE TABLE FOO (id int, Name varchar(20)) ;"
        );
    }

    #[test]
    fn test_newlines_fold_to_spaces() {
        let normalized = normalize_statement("select *\nfrom\r\nOrders");
        assert_eq!(normalized, "SELECT * FROM  ORDERS ;");
    }

    #[test]
    fn test_escaped_quote_does_not_close_literal() {
        let statements: Vec<String> =
            split_statements(r"insert into t values (1, 'it\'s; fine'); select * from t").collect();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], r"INSERT INTO T VALUES  (1, 'it\'s; fine') ;");

        let normalized = normalize_statement(r"update t set a = 'x\' y' where b = 'z'");
        assert_eq!(normalized, r"UPDATE T SET A = 'x\' y' WHERE B = 'z' ;");
    }

    #[test]
    fn test_escaped_backslash_closes_literal() {
        let statements: Vec<String> =
            split_statements(r"insert into t values (1, 'C:\\'); select * from t").collect();
        assert_eq!(
            statements,
            vec![r"INSERT INTO T VALUES  (1, 'C:\\') ;", "SELECT * FROM T ;"]
        );

        let normalized = normalize_statement(r"update t set p = 'a\\' where q = 'it\'s'");
        assert_eq!(normalized, r"UPDATE T SET P = 'a\\' WHERE Q = 'it\'s' ;");
    }

    #[test]
    fn test_stray_closing_paren_is_padded() {
        assert_eq!(normalize_statement("select a) from t"), "SELECT A ) FROM T ;");
    }

    #[test]
    fn test_split_is_restartable() {
        let sql = "select * from a; select * from b";
        let first: Vec<String> = split_statements(sql).collect();
        let second: Vec<String> = split_statements(sql).collect();
        assert_eq!(first, second);
        assert_eq!(split_statements("  ;\n; ").count(), 0);
    }
}
