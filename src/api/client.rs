// Thin wrapper around reqwest: base URL, bearer token and JSON in/out

use std::time::Duration;

use anyhow::Result;
use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::{ChatReply, ChatRequest};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Connection error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("Invalid response from server: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status of a rejected request, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Set or clear the bearer token sent with every request
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Resolve a path against the base URL. Absolute URLs pass through untouched.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("POST {}", url);
        let request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        let response = self.authorize(request).send().await?;
        Self::read_json(response).await
    }

    pub async fn get_json<R>(&self, path: &str) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.authorize(self.http.get(&url)).send().await?;
        Self::read_json(response).await
    }

    /// Post a message to the chat endpoint and return the reply text, if any
    pub async fn send_chat(
        &self,
        chat_url: &str,
        request: &ChatRequest,
    ) -> Result<Option<String>, ApiError> {
        let reply: ChatReply = self.post_json(chat_url, request).await?;
        Ok(reply.text())
    }

    async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = server_message(&body)
                .unwrap_or_else(|| format!("Request failed with status {}", status));
            error!("Request failed with status {}: {}", status, message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

// Error bodies carry a human-readable `message` or `error` field
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "msg"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}
