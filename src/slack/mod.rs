//! Slash-command plumbing: inbound `/ask-data` handling, immediate
//! acknowledgment inside Slack's 3-second response window, and asynchronous
//! result delivery from a detached task.

pub mod client;
pub mod signature;
pub mod state;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::pipeline::{self, Answer};
use self::state::AppState;

/// The fields of Slack's form-encoded slash command payload that the bot
/// uses; everything else is ignored.
#[derive(Debug, Deserialize, Clone)]
pub struct SlashCommandPayload {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub response_url: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/slack/command", post(ask_data_command))
}

/// Handles `POST /slack/command`. The direct response is only the ack; the
/// pipeline runs on a spawned task and delivers through the response_url.
pub async fn ask_data_command(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !signature::verify(&app_state.config.slack.signing_secret, &headers, &body) {
        warn!("Rejected slash command with bad or missing signature");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let payload: SlashCommandPayload = match serde_urlencoded::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Malformed slash command payload: {}", e);
            return (StatusCode::BAD_REQUEST, "malformed payload").into_response();
        }
    };

    let question = payload.text.trim().to_string();
    if question.is_empty() {
        return Json(json!({
            "response_type": "ephemeral",
            "text": ":warning: Please provide a question.\n\
                     Usage: `/ask-data show revenue by region for 2025-09-01`",
        }))
        .into_response();
    }

    info!("User {} asked: {}", payload.user_id, question);

    let ack = Json(json!({
        "response_type": "ephemeral",
        "text": format!(
            ":hourglass_flowing_sand: Working on it, <@{}>... \
             _(first request may take ~15s due to model cold start)_",
            payload.user_id
        ),
    }));

    // Decouple the slow work from Slack's response deadline.
    tokio::spawn(process_question(app_state, payload, question));

    ack.into_response()
}

/// Runs the pipeline and delivers the outcome. Every pipeline failure turns
/// into one user-facing report; only delivery failures end up log-only.
async fn process_question(
    app_state: Arc<AppState>,
    command: SlashCommandPayload,
    question: String,
) {
    let answer = match pipeline::run(
        app_state.generator.as_ref(),
        app_state.runner.as_ref(),
        &question,
    )
    .await
    {
        Ok(answer) => answer,
        Err(e) => {
            error!("Request failed: {}", e);
            if let Err(send_err) = app_state
                .slack
                .respond_text(&command.response_url, &e.user_message())
                .await
            {
                error!("Failed to deliver error report: {}", send_err);
            }
            return;
        }
    };

    let blocks = result_blocks(&command.user_id, &question, &answer);
    if let Err(e) = app_state
        .slack
        .respond_blocks(&command.response_url, blocks)
        .await
    {
        error!("Failed to deliver result: {}", e);
        return;
    }
    info!(
        "Replied to {} with {} rows",
        command.user_id, answer.total_rows
    );

    if let Some(png) = answer.chart_png {
        let title = format!("Chart: {}", truncate_chars(&question, 50));
        let comment = format!(
            ":bar_chart: Here's a chart for your query, <@{}>!",
            command.user_id
        );
        match app_state
            .slack
            .upload_png(&command.channel_id, png, "chart.png", &title, &comment)
            .await
        {
            Ok(()) => info!("Chart uploaded successfully"),
            // Non-critical: the table already went out.
            Err(e) => warn!("Chart upload failed (non-critical): {}", e),
        }
    }
}

fn result_blocks(user_id: &str, question: &str, answer: &Answer) -> serde_json::Value {
    json!([
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(":mag: *Query from <@{}>*\n>{}", user_id, question),
            },
        },
        { "type": "divider" },
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*Generated SQL:*\n```{}```", answer.sql),
            },
        },
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*Results:*\n```{}```", answer.table),
            },
        },
    ])
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        text.chars().take(max).collect()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slash_command_form_body() {
        let body = "token=abc&team_id=T1&channel_id=C123&user_id=U42\
                    &command=%2Fask-data&text=show+revenue+by+region\
                    &response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2F123";
        let payload: SlashCommandPayload = serde_urlencoded::from_str(body).unwrap();
        assert_eq!(payload.text, "show revenue by region");
        assert_eq!(payload.user_id, "U42");
        assert_eq!(payload.channel_id, "C123");
        assert_eq!(
            payload.response_url,
            "https://hooks.slack.com/commands/123"
        );
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let payload: SlashCommandPayload = serde_urlencoded::from_str("token=abc").unwrap();
        assert!(payload.text.is_empty());
        assert!(payload.response_url.is_empty());
    }

    #[test]
    fn result_blocks_carry_sql_and_table() {
        let answer = Answer {
            sql: "SELECT 1".to_string(),
            table: "| n |".to_string(),
            total_rows: 1,
            chart_triggered: false,
            chart_png: None,
        };
        let blocks = result_blocks("U42", "how many?", &answer);
        let rendered = blocks.to_string();
        assert!(rendered.contains("SELECT 1"));
        assert!(rendered.contains("| n |"));
        assert!(rendered.contains("<@U42>"));
    }

    #[test]
    fn truncates_long_questions_for_chart_titles() {
        let long = "a".repeat(80);
        assert_eq!(truncate_chars(&long, 50).len(), 50);
        assert_eq!(truncate_chars("short", 50), "short");
    }
}
