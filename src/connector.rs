//! Connector transport boundary.
//!
//! The trait is what the dispatch core and the Teams strategy program
//! against; `HttpConnector` is the real transport, speaking the
//! connector service's REST surface with a cached service token.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::activity::{Address, OutboundPayload, PayloadKind};
use crate::error::TransportError;

const LOGIN_URL: &str = "https://login.microsoftonline.com/botframework.com/oauth2/v2.0/token";
const TOKEN_SCOPE: &str = "https://api.botframework.com/.default";

/// Refresh the token this long before it actually expires.
const TOKEN_EXPIRY_SLACK_SECS: i64 = 60;

/// A member of a conversation, as the roster endpoint reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "aadObjectId")]
    pub object_id: Option<String>,
}

/// Outbound transport to the chat service.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Deliver one ordered batch of payloads for a single response
    /// message. A failure fails the whole batch; the bridge does not
    /// retry.
    async fn send(
        &self,
        address: &Address,
        payloads: &[OutboundPayload],
    ) -> Result<(), TransportError>;

    /// Fetch the current conversation roster. Completes exactly once,
    /// with the members or an error.
    async fn fetch_roster(
        &self,
        service_url: &str,
        conversation_id: &str,
    ) -> Result<Vec<RosterMember>, TransportError>;
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// REST connector authenticated via client credentials.
pub struct HttpConnector {
    app_id: String,
    app_password: SecretString,
    client: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

impl HttpConnector {
    pub fn new(app_id: String, app_password: SecretString) -> Self {
        Self {
            app_id,
            app_password,
            client: reqwest::Client::new(),
            token: RwLock::new(None),
        }
    }

    async fn bearer_token(&self) -> Result<String, TransportError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Utc::now() {
                    return Ok(token.value.clone());
                }
            }
        }

        let response = self
            .client
            .post(LOGIN_URL)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_password.expose_secret()),
                ("scope", TOKEN_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| TransportError::Token(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Token(format!("{status}: {body}")));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Token(e.to_string()))?;

        let expires_at =
            Utc::now() + Duration::seconds(parsed.expires_in - TOKEN_EXPIRY_SLACK_SECS);
        let mut cached = self.token.write().await;
        *cached = Some(CachedToken {
            value: parsed.access_token.clone(),
            expires_at,
        });
        debug!("service token refreshed");
        Ok(parsed.access_token)
    }

    fn activity_body(payload: &OutboundPayload) -> serde_json::Value {
        let kind = match payload.kind {
            PayloadKind::Typing => "typing",
            PayloadKind::Message => "message",
        };
        let mut body = serde_json::json!({
            "type": kind,
            "from": payload.address.bot,
            "recipient": payload.address.user,
            "conversation": payload.address.conversation,
        });
        if let Some(text) = &payload.text {
            body["text"] = serde_json::json!(text);
        }
        if !payload.attachments.is_empty() {
            body["attachments"] = serde_json::json!(payload.attachments);
        }
        if !payload.entities.is_empty() {
            body["entities"] = serde_json::json!(payload.entities);
        }
        body
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn send(
        &self,
        address: &Address,
        payloads: &[OutboundPayload],
    ) -> Result<(), TransportError> {
        let service_url = address
            .service_url
            .as_deref()
            .ok_or(TransportError::MissingServiceUrl)?;
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/v3/conversations/{}/activities",
            service_url.trim_end_matches('/'),
            address.conversation.id
        );

        for payload in payloads {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&token)
                .json(&Self::activity_body(payload))
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(TransportError::Status { status, body });
            }
        }
        Ok(())
    }

    async fn fetch_roster(
        &self,
        service_url: &str,
        conversation_id: &str,
    ) -> Result<Vec<RosterMember>, TransportError> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/v3/conversations/{}/members",
            service_url.trim_end_matches('/'),
            conversation_id
        );

        let response = self.client.get(&url).bearer_auth(&token).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let members = response.json::<Vec<RosterMember>>().await?;
        Ok(members)
    }
}
