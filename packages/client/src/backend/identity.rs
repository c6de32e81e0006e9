//! Firebase Authentication over the Identity Toolkit REST API.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::backend::{AccountService, BackendError, IdTokenSlot};
use crate::config::Config;
use crate::models::UserProfile;

pub struct IdentityClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    id_token: IdTokenSlot,
    current: RwLock<Option<UserProfile>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    /// Milliseconds since the epoch, as a string.
    created_at: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl AccountInfo {
    fn into_profile(self) -> UserProfile {
        let created_at = self
            .created_at
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        UserProfile {
            uid: self.local_id,
            display_name: self.display_name,
            email: self.email,
            created_at,
        }
    }
}

impl IdentityClient {
    pub fn new(config: &Config, id_token: IdTokenSlot) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| network_error(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.identity_base_url.trim_end_matches('/').to_string(),
            api_key: config.firebase_api_key.clone(),
            id_token,
            current: RwLock::new(None),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::new("auth/invalid-api-key", "FIREBASE_API_KEY is not set"))?;

        let url = format!("{}/v1/accounts:{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error(&body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::new("auth/internal-error", e.to_string()))
    }

    async fn lookup(&self, id_token: &str) -> Result<UserProfile, BackendError> {
        let response: LookupResponse = self.call("lookup", &LookupRequest { id_token }).await?;
        response
            .users
            .into_iter()
            .next()
            .map(AccountInfo::into_profile)
            .ok_or_else(|| BackendError::new("auth/user-not-found", "USER_NOT_FOUND"))
    }

    async fn establish(&self, id_token: String) -> Result<UserProfile, BackendError> {
        let profile = self.lookup(&id_token).await?;
        *self.id_token.write() = Some(id_token);
        *self.current.write() = Some(profile.clone());
        Ok(profile)
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, BackendError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let tokens: TokenResponse = self.call(method, &request).await?;
        self.establish(tokens.id_token).await
    }
}

#[async_trait]
impl AccountService for IdentityClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile, BackendError> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<UserProfile, BackendError> {
        self.password_call("signUp", email, password).await
    }

    async fn update_display_name(&self, display_name: &str) -> Result<UserProfile, BackendError> {
        let id_token = self
            .id_token
            .read()
            .clone()
            .ok_or_else(|| BackendError::new("auth/no-current-user", "no signed-in account"))?;

        let request = UpdateRequest {
            id_token: &id_token,
            display_name,
            return_secure_token: false,
        };
        let _: serde_json::Value = self.call("update", &request).await?;

        let mut current = self.current.write();
        let profile = current
            .as_mut()
            .ok_or_else(|| BackendError::new("auth/no-current-user", "no signed-in account"))?;
        profile.display_name = Some(display_name.to_string());
        Ok(profile.clone())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        *self.id_token.write() = None;
        *self.current.write() = None;
        Ok(())
    }

    fn current_user(&self) -> Option<UserProfile> {
        self.current.read().clone()
    }
}

fn network_error(message: String) -> BackendError {
    BackendError::new("auth/network-request-failed", message)
}

/// Identity Toolkit reports failures as an upper-case message, optionally
/// followed by ` : details` (e.g. `WEAK_PASSWORD : Password should be ...`).
fn parse_error(body: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());

    let reason = message.split(" : ").next().unwrap_or_default().trim();
    let code = match reason {
        "EMAIL_NOT_FOUND" => "auth/user-not-found",
        "INVALID_PASSWORD" => "auth/wrong-password",
        "INVALID_EMAIL" => "auth/invalid-email",
        "USER_DISABLED" => "auth/user-disabled",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "auth/too-many-requests",
        "INVALID_LOGIN_CREDENTIALS" => "auth/invalid-credential",
        "EMAIL_EXISTS" => "auth/email-already-in-use",
        "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => "auth/operation-not-allowed",
        "WEAK_PASSWORD" => "auth/weak-password",
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" => "auth/user-token-expired",
        _ => "auth/internal-error",
    };

    BackendError::new(code, message)
}
