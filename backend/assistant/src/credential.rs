//! Session issuance over the REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use solarops_core::{Credential, CredentialError, CredentialProvider, SiteId};

const SESSION_PATH: &str = "chatbot/session";

/// Issues assistant sessions via `POST {base}/chatbot/session`.
pub struct HttpCredentialProvider {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpCredentialProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CredentialError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CredentialError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_token: None,
        })
    }

    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token;
        self
    }

    fn session_url(&self) -> String {
        format!("{}/{SESSION_PATH}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    site_id: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    token: TokenBody,
    #[serde(alias = "session_id")]
    session_id: Value,
}

#[derive(Deserialize)]
struct TokenBody {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Parse the issuance response body. The session id may be a string or a number.
fn parse_session(body: &str) -> Result<Credential, CredentialError> {
    let parsed: SessionResponse =
        serde_json::from_str(body).map_err(|e| CredentialError::Decode(e.to_string()))?;

    let session_id = match parsed.session_id {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => {
            return Err(CredentialError::Decode(format!(
                "unexpected sessionId {other}"
            )))
        }
    };
    if parsed.token.access_token.is_empty() {
        return Err(CredentialError::Decode("empty access_token".into()));
    }

    Ok(Credential {
        access_token: parsed.token.access_token,
        token_type: parsed.token.token_type,
        session_id,
    })
}

#[async_trait]
impl CredentialProvider for HttpCredentialProvider {
    async fn issue_session(&self, site_id: SiteId) -> Result<Credential, CredentialError> {
        let url = self.session_url();
        debug!(%url, %site_id, "Requesting assistant session");

        let mut request = self
            .client
            .post(&url)
            .json(&SessionRequest { site_id: site_id.0 });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CredentialError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CredentialError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(CredentialError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_session(&body)
    }
}
