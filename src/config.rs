// Runtime settings for the client, filled from command line flags and environment

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::api::{ApiClient, CHAT_PATH};
use crate::chat::{CannedReplies, DispatchTiming, RemoteReplies, ReplySource};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    Canned,
    Remote,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    /// Full chat endpoint URL, derived from `api_url` when unset
    pub chat_url: Option<String>,
    pub reply_mode: ReplyMode,
    pub request_timeout: Duration,
    pub timing: DispatchTiming,
    /// Skip authentication entirely
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            chat_url: None,
            reply_mode: ReplyMode::Canned,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            timing: DispatchTiming::default(),
            offline: false,
        }
    }
}

impl Config {
    pub fn chat_url(&self) -> String {
        match &self.chat_url {
            Some(url) => url.clone(),
            None => format!("{}{}", self.api_url.trim_end_matches('/'), CHAT_PATH),
        }
    }

    pub fn api_client(&self) -> Result<ApiClient> {
        ApiClient::new(&self.api_url, self.request_timeout)
    }

    /// Reply source for the dispatcher. Remote replies reuse `api` so they carry its token.
    pub fn reply_source(&self, api: ApiClient) -> Arc<dyn ReplySource> {
        match self.reply_mode {
            ReplyMode::Canned => Arc::new(CannedReplies),
            ReplyMode::Remote => Arc::new(RemoteReplies::new(api, &self.chat_url())),
        }
    }
}
