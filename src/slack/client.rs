use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Outbound Slack calls: delayed responses through a slash command's
/// `response_url`, and file uploads through the external upload flow.
pub struct SlackClient {
    http: reqwest::Client,
    bot_token: String,
}

#[derive(Deserialize)]
struct UploadUrlResponse {
    ok: bool,
    error: Option<String>,
    upload_url: Option<String>,
    file_id: Option<String>,
}

#[derive(Deserialize)]
struct CompleteUploadResponse {
    ok: bool,
    error: Option<String>,
}

impl SlackClient {
    pub fn new(bot_token: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, bot_token })
    }

    /// Ephemeral text message back to the requesting user.
    pub async fn respond_text(
        &self,
        response_url: &str,
        text: &str,
    ) -> Result<(), reqwest::Error> {
        self.respond(
            response_url,
            json!({ "response_type": "ephemeral", "text": text }),
        )
        .await
    }

    /// Block Kit message posted into the originating channel.
    pub async fn respond_blocks(
        &self,
        response_url: &str,
        blocks: Value,
    ) -> Result<(), reqwest::Error> {
        self.respond(
            response_url,
            json!({ "response_type": "in_channel", "blocks": blocks }),
        )
        .await
    }

    async fn respond(&self, response_url: &str, payload: Value) -> Result<(), reqwest::Error> {
        debug!("Posting delayed response to {}", response_url);
        self.http
            .post(response_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Uploads a PNG to a channel via files.getUploadURLExternal /
    /// files.completeUploadExternal.
    pub async fn upload_png(
        &self,
        channel_id: &str,
        png: Vec<u8>,
        filename: &str,
        title: &str,
        initial_comment: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let ticket: UploadUrlResponse = self
            .http
            .post("https://slack.com/api/files.getUploadURLExternal")
            .bearer_auth(&self.bot_token)
            .form(&[
                ("filename", filename.to_string()),
                ("length", png.len().to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !ticket.ok {
            return Err(format!(
                "files.getUploadURLExternal failed: {}",
                ticket.error.unwrap_or_else(|| "unknown error".to_string())
            )
            .into());
        }
        let (upload_url, file_id) = match (ticket.upload_url, ticket.file_id) {
            (Some(url), Some(id)) => (url, id),
            _ => return Err("upload ticket missing upload_url or file_id".into()),
        };

        self.http
            .post(&upload_url)
            .body(png)
            .send()
            .await?
            .error_for_status()?;

        let complete: CompleteUploadResponse = self
            .http
            .post("https://slack.com/api/files.completeUploadExternal")
            .bearer_auth(&self.bot_token)
            .json(&json!({
                "files": [{ "id": file_id, "title": title }],
                "channel_id": channel_id,
                "initial_comment": initial_comment,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !complete.ok {
            return Err(format!(
                "files.completeUploadExternal failed: {}",
                complete.error.unwrap_or_else(|| "unknown error".to_string())
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upload_ticket() {
        let body = r#"{
            "ok": true,
            "upload_url": "https://files.slack.com/upload/v1/abc",
            "file_id": "F12345"
        }"#;
        let ticket: UploadUrlResponse = serde_json::from_str(body).unwrap();
        assert!(ticket.ok);
        assert_eq!(ticket.file_id.as_deref(), Some("F12345"));
    }

    #[test]
    fn parses_upload_failure() {
        let body = r#"{ "ok": false, "error": "invalid_auth" }"#;
        let ticket: UploadUrlResponse = serde_json::from_str(body).unwrap();
        assert!(!ticket.ok);
        assert_eq!(ticket.error.as_deref(), Some("invalid_auth"));
    }
}
