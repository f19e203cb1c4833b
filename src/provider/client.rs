use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    MessagingProvider, OutboundMessage, ProviderAccount, ProviderError, ProviderResult,
    SendResponse,
};
use crate::config::ProviderConfig;

/// Bound on every provider call so a hung request cannot starve a batch worker.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const SEND_PATH: &str = "messages/send";
const ACCOUNTS_PATH: &str = "accounts";
const WEBHOOK_SET_PATH: &str = "webhooks/set";

/// HTTP client for the WhatsApp messaging provider API.
#[derive(Clone)]
pub struct WhatsappClient {
    client: Client,
    base_url: Arc<str>,
    token: Arc<str>,
    account_id: Arc<str>,
}

#[derive(Serialize)]
struct SendBody {
    whatsapp_account_id: String,
    to: String,
    message: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interactive: Option<serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct AccountsBody {
    #[serde(default)]
    accounts: Vec<ProviderAccount>,
}

impl WhatsappClient {
    /// Build a client from the explicit provider configuration.
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ProviderError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            token: Arc::<str>::from(config.token),
            account_id: Arc::<str>::from(config.account_id),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send_message(
        &self,
        to: String,
        message: OutboundMessage,
    ) -> ProviderResult<SendResponse> {
        let body = match message {
            OutboundMessage::Text { body } => SendBody {
                whatsapp_account_id: self.account_id.to_string(),
                to,
                message: body,
                kind: None,
                interactive: None,
            },
            OutboundMessage::Interactive { body, buttons } => {
                let buttons: Vec<serde_json::Value> = buttons
                    .into_iter()
                    .map(|button| {
                        json!({
                            "type": "reply",
                            "reply": { "id": button.id, "title": button.title },
                        })
                    })
                    .collect();

                SendBody {
                    whatsapp_account_id: self.account_id.to_string(),
                    to,
                    message: body.clone(),
                    kind: Some("interactive"),
                    interactive: Some(json!({
                        "type": "button",
                        "body": { "text": body },
                        "action": { "buttons": buttons },
                    })),
                }
            }
        };

        let response = self
            .client
            .post(self.url(SEND_PATH))
            .header("token", self.token.as_ref())
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::RequestSend {
                path: SEND_PATH,
                source,
            })?;

        // The provider reports rejections inside a 200 body, so any non-2xx
        // status is a transport-level problem.
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::RequestStatus {
                path: SEND_PATH,
                status,
            });
        }

        response
            .json::<SendResponse>()
            .await
            .map_err(|source| ProviderError::DecodeResponse {
                path: SEND_PATH,
                source,
            })
    }

    async fn list_accounts(&self) -> ProviderResult<Vec<ProviderAccount>> {
        let response = self
            .client
            .get(self.url(ACCOUNTS_PATH))
            .header("token", self.token.as_ref())
            .send()
            .await
            .map_err(|source| ProviderError::RequestSend {
                path: ACCOUNTS_PATH,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::RequestStatus {
                path: ACCOUNTS_PATH,
                status,
            });
        }

        let body: AccountsBody =
            response
                .json()
                .await
                .map_err(|source| ProviderError::DecodeResponse {
                    path: ACCOUNTS_PATH,
                    source,
                })?;
        Ok(body.accounts)
    }

    async fn register_webhook(&self, url: String, token: Option<String>) -> ProviderResult<()> {
        let response = self
            .client
            .post(self.url(WEBHOOK_SET_PATH))
            .header("token", self.token.as_ref())
            .json(&json!({ "url": url, "token": token }))
            .send()
            .await
            .map_err(|source| ProviderError::RequestSend {
                path: WEBHOOK_SET_PATH,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::RequestStatus {
                path: WEBHOOK_SET_PATH,
                status,
            });
        }

        Ok(())
    }
}

impl MessagingProvider for WhatsappClient {
    fn send_message(
        &self,
        to: String,
        message: OutboundMessage,
    ) -> BoxFuture<'static, ProviderResult<SendResponse>> {
        let client = self.clone();
        Box::pin(async move { client.send_message(to, message).await })
    }

    fn list_accounts(&self) -> BoxFuture<'static, ProviderResult<Vec<ProviderAccount>>> {
        let client = self.clone();
        Box::pin(async move { client.list_accounts().await })
    }

    fn register_webhook(
        &self,
        url: String,
        token: Option<String>,
    ) -> BoxFuture<'static, ProviderResult<()>> {
        let client = self.clone();
        Box::pin(async move { client.register_webhook(url, token).await })
    }
}
