use crate::config::AppConfig;
use crate::db::executor::QueryRunner;
use crate::llm::SqlGenerator;
use crate::slack::client::SlackClient;

/// Shared application state, constructed once at startup and handed to each
/// request's background task. The generator and runner sit behind traits so
/// tests can substitute fakes.
pub struct AppState {
    pub config: AppConfig,
    pub generator: Box<dyn SqlGenerator>,
    pub runner: Box<dyn QueryRunner>,
    pub slack: SlackClient,
}
