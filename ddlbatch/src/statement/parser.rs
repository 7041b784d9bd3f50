// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement parser: comment stripping, classification and script splitting

use std::time::Duration;

use super::{ClientSideStatement, ParsedStatement, StatementType};
use crate::exec::{ConnectionError, Result};

const DDL_KEYWORDS: &[&str] = &["CREATE", "ALTER", "DROP", "ANALYZE", "GRANT", "REVOKE", "RENAME"];
const QUERY_KEYWORDS: &[&str] = &["SELECT", "WITH"];
const UPDATE_KEYWORDS: &[&str] = &["INSERT", "UPDATE", "DELETE"];

/// Classifies SQL text without understanding more than its leading keywords
#[derive(Debug, Default, Clone, Copy)]
pub struct StatementParser;

impl StatementParser {
    pub const fn new() -> Self {
        Self
    }

    /// Strip comments, classify and wrap a single statement
    pub fn parse(&self, sql: &str) -> Result<ParsedStatement> {
        let stripped = self.strip_comments(sql)?;
        let client_side = parse_client_side(&stripped)?;
        let statement_type = match client_side {
            Some(_) => StatementType::ClientSide,
            None => classify_keyword(&stripped),
        };
        Ok(ParsedStatement::new(
            sql.to_string(),
            stripped,
            statement_type,
            client_side,
        ))
    }

    /// Classification of a statement, without building a [`ParsedStatement`]
    pub fn classify(&self, sql: &str) -> Result<StatementType> {
        self.parse(sql).map(|statement| statement.statement_type())
    }

    /// Remove `--`, `#` and `/* */` comments outside quotes
    ///
    /// The result is trimmed and loses a trailing `;`.
    pub fn strip_comments(&self, sql: &str) -> Result<String> {
        let segments = scan(sql, Mode::StripComments)?;
        let text = segments.into_iter().next().unwrap_or_default();
        let trimmed = text.trim();
        let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
        Ok(trimmed.to_string())
    }

    /// Split a script on `;` outside comments and quotes
    ///
    /// Comments stay attached to the statement they precede. Pieces that
    /// contain nothing but whitespace and comments are dropped.
    pub fn split_script(&self, script: &str) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        for segment in scan(script, Mode::SplitStatements)? {
            if !self.strip_comments(&segment)?.is_empty() {
                statements.push(segment.trim().to_string());
            }
        }
        Ok(statements)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    StripComments,
    SplitStatements,
}

fn scan(text: &str, mode: Mode) -> Result<Vec<String>> {
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '\'' | '"' | '`' => {
                current.push(c);
                i += 1;
                while i < chars.len() {
                    let q = chars[i];
                    current.push(q);
                    i += 1;
                    if q == '\\' && i < chars.len() {
                        current.push(chars[i]);
                        i += 1;
                    } else if q == c {
                        break;
                    }
                }
            }
            '-' if next == Some('-') => {
                i = copy_or_skip_line(&chars, i, mode, &mut current);
            }
            '#' => {
                i = copy_or_skip_line(&chars, i, mode, &mut current);
            }
            '/' if next == Some('*') => {
                let start = i;
                i += 2;
                loop {
                    if i + 1 >= chars.len() {
                        return Err(ConnectionError::InvalidArgument(
                            "SQL statement contains an unterminated block comment".to_string(),
                        ));
                    }
                    if chars[i] == '*' && chars[i + 1] == '/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                match mode {
                    Mode::StripComments => current.push(' '),
                    Mode::SplitStatements => current.extend(&chars[start..i]),
                }
            }
            ';' if mode == Mode::SplitStatements => {
                segments.push(std::mem::take(&mut current));
                i += 1;
            }
            _ => {
                current.push(c);
                i += 1;
            }
        }
    }

    segments.push(current);
    Ok(segments)
}

/// Handle a line comment starting at `start`; returns the index of the newline
fn copy_or_skip_line(chars: &[char], start: usize, mode: Mode, current: &mut String) -> usize {
    let end = chars[start..]
        .iter()
        .position(|c| *c == '\n')
        .map(|offset| start + offset)
        .unwrap_or(chars.len());
    if mode == Mode::SplitStatements {
        current.extend(&chars[start..end]);
    }
    end
}

fn classify_keyword(sql: &str) -> StatementType {
    let keyword = leading_keyword(sql).to_ascii_uppercase();
    if DDL_KEYWORDS.contains(&keyword.as_str()) {
        StatementType::Ddl
    } else if QUERY_KEYWORDS.contains(&keyword.as_str()) {
        StatementType::Query
    } else if UPDATE_KEYWORDS.contains(&keyword.as_str()) {
        StatementType::Update
    } else {
        StatementType::Unknown
    }
}

/// First keyword, skipping opening parentheses and a leading `@{...}` hint
fn leading_keyword(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    if let Some(after_hint) = rest.strip_prefix("@{") {
        rest = match after_hint.find('}') {
            Some(end) => &after_hint[end + 1..],
            None => "",
        };
    }
    let rest = rest.trim_start_matches(|c: char| c == '(' || c.is_whitespace());
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    &rest[..end]
}

fn parse_client_side(sql: &str) -> Result<Option<ClientSideStatement>> {
    let words: Vec<String> = sql
        .split_whitespace()
        .map(|word| word.to_ascii_uppercase())
        .collect();
    let words: Vec<&str> = words.iter().map(String::as_str).collect();

    let statement = match words.as_slice() {
        ["START", "BATCH", "DDL"] => Some(ClientSideStatement::StartBatchDdl),
        ["RUN", "BATCH"] => Some(ClientSideStatement::RunBatch),
        ["ABORT", "BATCH"] => Some(ClientSideStatement::AbortBatch),
        ["SET", rest @ ..] if rest.first().is_some_and(|w| w.starts_with("STATEMENT_TIMEOUT")) => {
            Some(ClientSideStatement::SetStatementTimeout(
                parse_statement_timeout(sql)?,
            ))
        }
        _ => None,
    };
    Ok(statement)
}

/// Parse the value of `SET STATEMENT_TIMEOUT = '<n><unit>' | NULL`
fn parse_statement_timeout(sql: &str) -> Result<Option<Duration>> {
    let invalid = || {
        ConnectionError::InvalidArgument(format!(
            "Invalid statement timeout: \"{}\". Expected '<n>ms', '<n>s', '<n>m' or NULL",
            sql
        ))
    };

    let upper = sql.to_ascii_uppercase();
    let position = upper.find("STATEMENT_TIMEOUT").ok_or_else(invalid)?;
    let rest = sql[position + "STATEMENT_TIMEOUT".len()..].trim_start();
    let value = if let Some(value) = rest.strip_prefix('=') {
        value
    } else if rest.get(..2).is_some_and(|word| word.eq_ignore_ascii_case("TO")) {
        &rest[2..]
    } else {
        return Err(invalid());
    };
    let value = value.trim();

    if value.eq_ignore_ascii_case("NULL") {
        return Ok(None);
    }
    let value = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .ok_or_else(invalid)?
        .trim();

    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let amount: u64 = value[..digits_end].parse().map_err(|_| invalid())?;
    let duration = match value[digits_end..].trim() {
        "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.checked_mul(60).ok_or_else(invalid)?),
        _ => return Err(invalid()),
    };
    if duration.is_zero() {
        return Err(ConnectionError::InvalidArgument(
            "Statement timeout must be greater than zero, use NULL to clear it".to_string(),
        ));
    }
    Ok(Some(duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> StatementParser {
        StatementParser::new()
    }

    #[test]
    fn test_classifies_leading_keywords() {
        let cases = [
            ("CREATE TABLE Singers (Id INT64) PRIMARY KEY (Id)", StatementType::Ddl),
            ("alter table Singers add column Name STRING(MAX)", StatementType::Ddl),
            ("DROP INDEX SingersByName", StatementType::Ddl),
            ("GRANT SELECT ON TABLE Singers TO ROLE reader", StatementType::Ddl),
            ("SELECT * FROM Singers", StatementType::Query),
            ("(SELECT 1)", StatementType::Query),
            ("WITH t AS (SELECT 1) SELECT * FROM t", StatementType::Query),
            ("@{FORCE_INDEX=idx} SELECT 1", StatementType::Query),
            ("INSERT INTO Singers (Id) VALUES (1)", StatementType::Update),
            ("update Singers set Name = 'x' where true", StatementType::Update),
            ("DELETE FROM Singers WHERE TRUE", StatementType::Update),
            ("EXPLAIN SELECT 1", StatementType::Unknown),
        ];
        for (sql, expected) in cases {
            assert_eq!(parser().classify(sql).unwrap(), expected, "{}", sql);
        }
    }

    #[test]
    fn test_strips_comments_outside_quotes() {
        let sql = "-- leading comment\nCREATE TABLE T ( /* inline */ Id INT64 # trailing\n) PRIMARY KEY (Id);";
        let stripped = parser().strip_comments(sql).unwrap();
        assert!(!stripped.contains("comment"));
        assert!(!stripped.contains("inline"));
        assert!(!stripped.contains("trailing"));
        assert!(stripped.starts_with("CREATE TABLE T"));
        assert!(stripped.ends_with("PRIMARY KEY (Id)"));
    }

    #[test]
    fn test_keeps_comment_markers_inside_literals() {
        let sql = "SELECT '-- not a comment', \"/* nor this */\", `#col` FROM T";
        let stripped = parser().strip_comments(sql).unwrap();
        assert_eq!(stripped, sql);
    }

    #[test]
    fn test_unterminated_block_comment_is_rejected() {
        let err = parser().parse("CREATE TABLE T /* oops").unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidArgument(_)));
    }

    #[test]
    fn test_client_side_statements() {
        let cases = [
            ("START BATCH DDL", ClientSideStatement::StartBatchDdl),
            ("  run   batch ; ", ClientSideStatement::RunBatch),
            ("ABORT BATCH -- never mind", ClientSideStatement::AbortBatch),
            (
                "SET STATEMENT_TIMEOUT = '250ms'",
                ClientSideStatement::SetStatementTimeout(Some(Duration::from_millis(250))),
            ),
            (
                "set statement_timeout='2s'",
                ClientSideStatement::SetStatementTimeout(Some(Duration::from_secs(2))),
            ),
            (
                "SET STATEMENT_TIMEOUT TO '1m'",
                ClientSideStatement::SetStatementTimeout(Some(Duration::from_secs(60))),
            ),
            (
                "SET STATEMENT_TIMEOUT = NULL",
                ClientSideStatement::SetStatementTimeout(None),
            ),
        ];
        for (sql, expected) in cases {
            let statement = parser().parse(sql).unwrap();
            assert_eq!(statement.statement_type(), StatementType::ClientSide, "{}", sql);
            assert_eq!(statement.client_side_statement(), Some(expected), "{}", sql);
        }
    }

    #[test]
    fn test_invalid_statement_timeout() {
        for sql in [
            "SET STATEMENT_TIMEOUT = '10 parsecs'",
            "SET STATEMENT_TIMEOUT = 10s",
            "SET STATEMENT_TIMEOUT = '0s'",
            "SET STATEMENT_TIMEOUT = '400000000000000000m'",
            "SET STATEMENT_TIMEOUT = '99999999999999999999ms'",
        ] {
            assert!(parser().parse(sql).is_err(), "{}", sql);
        }
    }

    #[test]
    fn test_split_script() {
        let script = "CREATE TABLE A (Id INT64) PRIMARY KEY (Id);\n\
                      -- index on A; not a separator\n\
                      CREATE INDEX AById ON A (Id);\n\
                      ;\n\
                      /* only a comment */;\n\
                      INSERT INTO A (Id) VALUES (';')";
        let statements = parser().split_script(script).unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0], "CREATE TABLE A (Id INT64) PRIMARY KEY (Id)");
        assert!(statements[1].starts_with("-- index on A; not a separator"));
        assert!(statements[1].ends_with("CREATE INDEX AById ON A (Id)"));
        assert_eq!(statements[2], "INSERT INTO A (Id) VALUES (';')");
        assert_eq!(
            parser().strip_comments(&statements[1]).unwrap(),
            "CREATE INDEX AById ON A (Id)"
        );
    }
}
