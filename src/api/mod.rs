// Request and response bodies for the chat backend, plus the HTTP client wrapper

use serde::{Deserialize, Serialize};

use crate::models::User;

pub mod client;

pub use client::{ApiClient, ApiError};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const VERIFY_PATH: &str = "/api/auth/verify";
pub const CHAT_PATH: &str = "/api/chat";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    pub conversation_id: u64,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatReply {
    /// The reply text, preferring `response` over `message`
    pub fn text(self) -> Option<String> {
        self.response
            .filter(|s| !s.is_empty())
            .or(self.message.filter(|s| !s.is_empty()))
    }
}

#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Debug)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

/// The verify endpoint may wrap the user or return it bare
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum VerifyResponse {
    Wrapped { user: User },
    Bare(User),
}

impl VerifyResponse {
    pub fn into_user(self) -> User {
        match self {
            VerifyResponse::Wrapped { user } => user,
            VerifyResponse::Bare(user) => user,
        }
    }
}
