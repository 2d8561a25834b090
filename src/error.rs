use std::error::Error;
use std::fmt;

/// Request-level failures in the question-to-answer pipeline.
///
/// Every variant is recoverable: it is rendered as a Slack message to the
/// requesting user and never tears down the process. Variants carry whatever
/// context the user-facing report needs (the raw model text for sanitizer
/// rejections, the generated SQL for execution failures).
#[derive(Debug)]
pub enum PipelineError {
    /// The model endpoint could not produce a completion: network failure,
    /// bad credentials, non-2xx response, or an empty completion.
    ModelUnavailable(String),
    /// The model call ran past its request timeout.
    ModelTimeout,
    /// The model output failed the single-SELECT surface checks.
    UnsafeOrInvalidSql { raw: String },
    /// The database rejected or failed the query. Also covers timing out
    /// while waiting for a pooled connection.
    QueryExecution { message: String, sql: String },
    /// The query itself ran past the per-query deadline.
    QueryTimeout { sql: String },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ModelUnavailable(msg) => write!(f, "model unavailable: {}", msg),
            PipelineError::ModelTimeout => write!(f, "model request timed out"),
            PipelineError::UnsafeOrInvalidSql { raw } => {
                write!(f, "model did not return a valid SELECT statement: {}", raw)
            }
            PipelineError::QueryExecution { message, .. } => {
                write!(f, "query execution failed: {}", message)
            }
            PipelineError::QueryTimeout { .. } => write!(f, "query timed out"),
        }
    }
}

impl Error for PipelineError {}

impl PipelineError {
    /// Slack mrkdwn rendering of the failure, one message per request.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ModelUnavailable(msg) => {
                format!(":x: *Failed to generate SQL.*\n```{}```", msg)
            }
            PipelineError::ModelTimeout => {
                ":x: *The model took too long to respond.* Please try again in a moment."
                    .to_string()
            }
            PipelineError::UnsafeOrInvalidSql { raw } => format!(
                ":x: *Model did not return a valid SELECT statement.*\n\
                 Raw model output:\n```{}```",
                raw
            ),
            PipelineError::QueryExecution { message, sql } => format!(
                ":x: *Query execution failed.*\n```{}```\n\n*Generated SQL was:*\n```{}```",
                message, sql
            ),
            PipelineError::QueryTimeout { sql } => format!(
                ":x: *The query took too long to run.*\n\n*Generated SQL was:*\n```{}```",
                sql
            ),
        }
    }
}
