//! Twin-side client of the gateway's monitored-account registry.

use async_trait::async_trait;
use serde_json::json;

use piggybank_accounts::Account;

use super::ClientError;

/// Registration of freshly created twin accounts with the gateway.
///
/// This is a best-effort hop: the twin logs failures and carries on, so
/// account creation never depends on the gateway being up.
#[async_trait]
pub trait MonitorRegistration: Send + Sync {
    /// Returns true when newly registered, false when the gateway already
    /// monitored the account.
    async fn register_account(&self, account: &Account) -> Result<bool, ClientError>;
}

/// HTTP implementation talking to a running transfer gateway.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MonitorRegistration for HttpGatewayClient {
    async fn register_account(&self, account: &Account) -> Result<bool, ClientError> {
        let body = json!({
            "account": {
                "type": account.account_type,
                "identifier": account.identifier,
                "accountId": account.id,
            }
        });

        let response = self
            .http
            .post(format!("{}/api/accounts", self.base_url))
            .json(&body)
            .send()
            .await?;

        match response.status().as_u16() {
            201 => Ok(true),
            409 => Ok(false),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(ClientError::Status { status, message })
            }
        }
    }
}
