//! Gateway-side client of the account twin's transaction intake.

use async_trait::async_trait;

use super::{ClientError, TransactionRequest};

/// How the twin answered an intake call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStatus {
    /// 201: the entry was applied and the balance moved.
    Applied,
    /// 200: the entry already existed; nothing changed.
    Replayed,
}

/// The twin service's transaction-intake operation.
#[async_trait]
pub trait TransactionIntake: Send + Sync {
    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<IntakeStatus, ClientError>;
}

/// HTTP implementation talking to a running twin service.
#[derive(Debug, Clone)]
pub struct HttpTwinClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTwinClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TransactionIntake for HttpTwinClient {
    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<IntakeStatus, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/transactions", self.base_url))
            .json(request)
            .send()
            .await?;

        match response.status().as_u16() {
            201 => Ok(IntakeStatus::Applied),
            200 => Ok(IntakeStatus::Replayed),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(ClientError::Status { status, message })
            }
        }
    }
}
