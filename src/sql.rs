//! Surface-level checks on model-generated SQL.
//!
//! The model is untrusted for anything beyond a single read query. These
//! checks are the last line of defense before execution and are deliberately
//! heuristic: a rejection is reported back to the user with the raw model
//! text, never treated as fatal.

use crate::error::PipelineError;
use regex::Regex;
use std::fmt;

/// SQL text that has passed the single-SELECT-statement surface checks.
///
/// Derived once per request and never cached or reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedSql(String);

impl SanitizedSql {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SanitizedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips formatting artifacts from raw model output and verifies it is a
/// single read-only statement.
///
/// Steps: unwrap a code fence if present (with or without a language tag),
/// drop a trailing statement terminator, require the first keyword to be
/// `SELECT`, and reject any second top-level statement. The second-statement
/// check is a semicolon heuristic, not a SQL parser; a semicolon inside a
/// string literal will be a false positive.
pub fn sanitize(raw: &str) -> Result<SanitizedSql, PipelineError> {
    let mut text = raw.trim().to_string();

    // Extract fenced content, e.g. ```sql ... ``` or ``` ... ```
    let fence = Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").unwrap();
    if let Some(caps) = fence.captures(&text) {
        text = caps[1].trim().to_string();
    }

    // Drop the trailing terminator so an ordinary single statement passes
    // the separator check below.
    while let Some(stripped) = text.strip_suffix(';') {
        text = stripped.trim_end().to_string();
    }

    if !starts_with_select(&text) {
        return Err(PipelineError::UnsafeOrInvalidSql {
            raw: raw.to_string(),
        });
    }

    // Any remaining semicolon followed by non-whitespace is a second statement.
    if let Some(pos) = text.find(';') {
        if !text[pos + 1..].trim().is_empty() {
            return Err(PipelineError::UnsafeOrInvalidSql {
                raw: raw.to_string(),
            });
        }
    }

    Ok(SanitizedSql(text))
}

fn starts_with_select(text: &str) -> bool {
    let Some(head) = text.get(..6) else {
        return false;
    };
    if !head.eq_ignore_ascii_case("select") {
        return false;
    }
    // Guard against identifiers like "selector"
    text[6..]
        .chars()
        .next()
        .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_select() {
        let sql = sanitize("SELECT region FROM public.sales_daily;").unwrap();
        assert_eq!(sql.as_str(), "SELECT region FROM public.sales_daily");
    }

    #[test]
    fn accepts_lowercase_select() {
        let sql = sanitize("select 1").unwrap();
        assert_eq!(sql.as_str(), "select 1");
    }

    #[test]
    fn extracts_fenced_content_with_language_tag() {
        let raw = "```sql\nSELECT date, revenue FROM public.sales_daily;\n```";
        let sql = sanitize(raw).unwrap();
        assert_eq!(sql.as_str(), "SELECT date, revenue FROM public.sales_daily");
    }

    #[test]
    fn extracts_fenced_content_without_language_tag() {
        let raw = "```\nSELECT 1;\n```";
        assert_eq!(sanitize(raw).unwrap().as_str(), "SELECT 1");
    }

    #[test]
    fn discards_prose_around_fence() {
        let raw = "Here is your query:\n```sql\nSELECT region FROM public.sales_daily\n```\nLet me know!";
        assert_eq!(
            sanitize(raw).unwrap().as_str(),
            "SELECT region FROM public.sales_daily"
        );
    }

    #[test]
    fn rejects_prose_output() {
        let raw = "I cannot answer that";
        match sanitize(raw) {
            Err(PipelineError::UnsafeOrInvalidSql { raw: echoed }) => {
                assert_eq!(echoed, "I cannot answer that");
            }
            other => panic!("expected UnsafeOrInvalidSql, got {:?}", other),
        }
    }

    #[test]
    fn rejects_non_select_statements() {
        assert!(sanitize("DROP TABLE public.sales_daily;").is_err());
        assert!(sanitize("UPDATE public.sales_daily SET revenue = 0;").is_err());
        assert!(sanitize("INSERT INTO public.sales_daily VALUES (1);").is_err());
    }

    #[test]
    fn rejects_select_like_identifier() {
        assert!(sanitize("selector FROM x").is_err());
    }

    #[test]
    fn rejects_second_statement() {
        assert!(sanitize("SELECT 1; DROP TABLE public.sales_daily;").is_err());
        assert!(sanitize("SELECT 1;DELETE FROM public.sales_daily").is_err());
    }

    #[test]
    fn trailing_terminator_alone_is_fine() {
        assert!(sanitize("SELECT 1;").is_ok());
        assert!(sanitize("SELECT 1;  ").is_ok());
    }

    #[test]
    fn rejects_empty_output() {
        assert!(sanitize("").is_err());
        assert!(sanitize("   \n").is_err());
    }
}
