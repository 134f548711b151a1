// Auth gateway: login/register against the backend, bearer token persistence

use log::{error, info, warn};
use thiserror::Error;

use crate::api::{
    ApiClient, ApiError, AuthResponse, LoginRequest, RegisterRequest, VerifyResponse, LOGIN_PATH,
    REGISTER_PATH, VERIFY_PATH,
};
use crate::models::User;

pub mod token_store;

pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

#[derive(Debug, Error)]
pub enum AuthError {
    /// The server refused the request, or the input was unusable
    #[error("{0}")]
    Rejected(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Could not store session: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<ApiError> for AuthError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Transport(e) => AuthError::Connection(e.to_string()),
            ApiError::Status { message, .. } => AuthError::Rejected(message),
            ApiError::Decode(msg) => {
                AuthError::Rejected(format!("Invalid response from server: {}", msg))
            }
        }
    }
}

pub struct AuthGateway {
    api: ApiClient,
    store: Box<dyn TokenStore>,
    user: Option<User>,
}

impl AuthGateway {
    pub fn new(api: ApiClient, store: Box<dyn TokenStore>) -> Self {
        AuthGateway { api, store, user: None }
    }

    /// API client carrying the current bearer token
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.api.token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Rejected("Email and password are required".to_string()));
        }

        info!("Logging in as {}", email);
        let request = LoginRequest { email, password };
        match self.api.post_json::<_, AuthResponse>(LOGIN_PATH, &request).await {
            Ok(response) => self.establish(response),
            Err(e) => {
                error!("Login failed: {}", e);
                Err(e.into())
            }
        }
    }

    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::Rejected("Name, email and password are required".to_string()));
        }

        info!("Registering {}", email);
        let request = RegisterRequest { name, email, password };
        match self.api.post_json::<_, AuthResponse>(REGISTER_PATH, &request).await {
            Ok(response) => self.establish(response),
            Err(e) => {
                error!("Registration failed: {}", e);
                Err(e.into())
            }
        }
    }

    fn establish(&mut self, response: AuthResponse) -> Result<User, AuthError> {
        self.store.save(&response.access_token)?;
        self.api.set_token(Some(response.access_token));
        info!("Authenticated as {} ({})", response.user.email, response.user.id);
        self.user = Some(response.user.clone());
        Ok(response.user)
    }

    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.api.set_token(None);
        self.user = None;
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }

    /// Ask the backend who the current token belongs to
    pub async fn verify(&self) -> Result<User, ApiError> {
        let response: VerifyResponse = self.api.get_json(VERIFY_PATH).await?;
        Ok(response.into_user())
    }

    /// Pick up a token persisted by an earlier run.
    ///
    /// A token the server rejects (401/403) is discarded. When the server cannot
    /// confirm it for any other reason the token is kept and a placeholder user is assumed.
    pub async fn restore(&mut self) -> Result<Option<User>, AuthError> {
        let Some(token) = self.store.load()? else {
            return Ok(None);
        };
        self.api.set_token(Some(token));

        let user = match self.verify().await {
            Ok(user) => {
                info!("Restored session for {}", user.email);
                user
            }
            Err(e) if matches!(e.status(), Some(401) | Some(403)) => {
                warn!("Stored token was rejected, discarding it: {}", e);
                self.logout()?;
                return Ok(None);
            }
            Err(e) => {
                warn!("Could not verify stored token, assuming it is still valid: {}", e);
                persisted_user()
            }
        };

        self.user = Some(user.clone());
        Ok(Some(user))
    }
}

fn persisted_user() -> User {
    User {
        id: "persisted".to_string(),
        name: "Logged-in user".to_string(),
        email: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // Nothing listens on port 9 locally
    fn unreachable_gateway(store: MemoryTokenStore) -> AuthGateway {
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        AuthGateway::new(api, Box::new(store))
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let mut gateway = unreachable_gateway(MemoryTokenStore::default());
        let err = gateway.login("  ", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        assert!(!gateway.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_connection_failure_is_reported() {
        let mut gateway = unreachable_gateway(MemoryTokenStore::default());
        let err = gateway.login("ana@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Connection(_)));
        assert!(err.to_string().starts_with("Connection error"));
        assert!(gateway.token().is_none());
    }

    #[tokio::test]
    async fn test_restore_without_token() {
        let mut gateway = unreachable_gateway(MemoryTokenStore::default());
        assert_eq!(gateway.restore().await.unwrap(), None);
        assert!(!gateway.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_keeps_token_when_server_unreachable() {
        let mut gateway = unreachable_gateway(MemoryTokenStore::with_token("tok"));
        let user = gateway.restore().await.unwrap().unwrap();
        assert_eq!(user.id, "persisted");
        assert_eq!(gateway.token(), Some("tok"));
        assert!(gateway.is_authenticated());
    }

    #[test]
    fn test_logout_clears_everything() {
        let mut gateway = unreachable_gateway(MemoryTokenStore::with_token("tok"));
        gateway.api.set_token(Some("tok".to_string()));
        gateway.user = Some(persisted_user());

        gateway.logout().unwrap();
        assert!(gateway.token().is_none());
        assert!(gateway.user().is_none());
        assert_eq!(gateway.store.load().unwrap(), None);
    }
}
