//! HTTP registry client
//!
//! Implements the `Registry` trait over the server's REST surface, mapping
//! transport failures to `Unreachable` (retriable) and error bodies back to
//! the typed taxonomy via their stable codes.

use crate::api::{
    ErrorBody, HeartbeatRequest, HeartbeatResponse, RegisterResponse, UnregisterRequest,
    UnregisterResponse, ERROR_CODE_INVALID_COMPONENT, ERROR_CODE_STALE_EPOCH,
    ERROR_CODE_UNKNOWN_COMPONENT,
};
use argos_core::{ComponentId, ComponentRecord, ComponentStatus, Epoch};
use argos_registry::{QueryFilter, Registration, Registry, RegistryError, RegistryResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default request timeout in seconds
pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Registry client speaking the argos-server REST API
pub struct HttpRegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistryClient {
    /// Create a client for the given base URL
    pub fn new(base_url: impl Into<String>) -> RegistryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| RegistryError::Internal {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        sent_epoch: Option<Epoch>,
    ) -> RegistryResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RegistryError::unreachable(e.to_string()))?;

        Self::decode(response, sent_epoch).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> RegistryResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if !query.is_empty() {
            // reqwest percent-encodes the values
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::unreachable(e.to_string()))?;

        Self::decode(response, None).await
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        sent_epoch: Option<Epoch>,
    ) -> RegistryResult<T> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RegistryError::unreachable(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| RegistryError::Internal {
                reason: format!("failed to parse response: {}", e),
            });
        }

        let body: ErrorBody =
            serde_json::from_slice(&bytes).unwrap_or_else(|_| ErrorBody {
                error: "internal".into(),
                message: format!("HTTP {}", status),
                id: None,
                stored_epoch: None,
            });

        Err(Self::map_error_body(body, sent_epoch))
    }

    fn map_error_body(body: ErrorBody, sent_epoch: Option<Epoch>) -> RegistryError {
        let id = body.id.clone().unwrap_or_default();
        match body.error.as_str() {
            ERROR_CODE_INVALID_COMPONENT => RegistryError::InvalidComponent {
                id,
                reason: body.message,
            },
            ERROR_CODE_UNKNOWN_COMPONENT => RegistryError::UnknownComponent { id },
            ERROR_CODE_STALE_EPOCH => {
                let given = sent_epoch.unwrap_or_default();
                let stored = body
                    .stored_epoch
                    .map(Epoch::from)
                    .unwrap_or_else(|| given.next());
                RegistryError::StaleEpoch { id, given, stored }
            }
            _ => RegistryError::Internal {
                reason: body.message,
            },
        }
    }
}

#[async_trait]
impl Registry for HttpRegistryClient {
    async fn register(&self, registration: Registration) -> RegistryResult<Epoch> {
        let response: RegisterResponse = self
            .post("/v1/components/register", &registration, None)
            .await?;
        Ok(Epoch::from(response.epoch))
    }

    async fn heartbeat(&self, id: &ComponentId, epoch: Epoch) -> RegistryResult<ComponentStatus> {
        let request = HeartbeatRequest {
            id: id.to_string(),
            epoch: epoch.value(),
        };
        let response: HeartbeatResponse = self
            .post("/v1/components/heartbeat", &request, Some(epoch))
            .await?;
        Ok(response.status)
    }

    async fn unregister(&self, id: &ComponentId, epoch: Epoch) -> RegistryResult<()> {
        let request = UnregisterRequest {
            id: id.to_string(),
            epoch: epoch.value(),
        };
        let _: UnregisterResponse = self
            .post("/v1/components/unregister", &request, Some(epoch))
            .await?;
        Ok(())
    }

    async fn query(&self, filter: &QueryFilter) -> RegistryResult<Vec<ComponentRecord>> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(ref capability) = filter.capability {
            params.push(("capability", capability.clone()));
        }
        if let Some(status) = filter.status {
            params.push(("status", status.to_string()));
        }

        self.get_json("/v1/components", &params).await
    }

    async fn get(&self, id: &ComponentId) -> RegistryResult<Option<ComponentRecord>> {
        match self
            .get_json::<ComponentRecord>(&format!("/v1/components/{}", id), &[])
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(RegistryError::UnknownComponent { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
