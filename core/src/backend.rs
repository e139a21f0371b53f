//! HTTP client for the knowledge backend.
//!
//! All persistence and business rules live server-side; this module only
//! shapes requests and turns non-success responses into [`DeskError`]s that
//! carry the server's `detail` message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::assistants::{Persona, User};
use crate::config::BackendSettings;
use crate::document_sets::{ConnectorIndexingStatus, DocumentSet};
use crate::errors::DeskError;
use crate::llm::ProviderDescriptor;
use crate::preferences::AssistantId;

#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn list_llm_providers(&self) -> Result<Vec<ProviderDescriptor>, DeskError>;

    async fn list_personas(&self) -> Result<Vec<Persona>, DeskError>;

    /// `None` when the backend reports no authenticated user.
    async fn current_user(&self) -> Result<Option<User>, DeskError>;

    /// Replace the user's chosen assistant order wholesale.
    async fn update_chosen_assistants(&self, ids: &[AssistantId]) -> Result<(), DeskError>;

    async fn list_document_sets(&self) -> Result<Vec<DocumentSet>, DeskError>;

    async fn delete_document_set(&self, id: i64) -> Result<(), DeskError>;

    async fn connector_indexing_status(&self) -> Result<Vec<ConnectorIndexingStatus>, DeskError>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, DeskError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("assistdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| DeskError::BackendUnavailable(err.to_string()))?;
        Ok(Self::with_client(client, settings))
    }

    /// Use a preconfigured client; the timeout in `settings` is not applied.
    pub fn with_client(client: Client, settings: &BackendSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("{method} {url}");
        let request = self.client.request(method, url);
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DeskError> {
        let response = request
            .send()
            .await
            .map_err(|err| DeskError::BackendUnavailable(err.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(remote_error(status, &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeskError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| DeskError::Decode(format!("{path}: {err}")))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn list_llm_providers(&self) -> Result<Vec<ProviderDescriptor>, DeskError> {
        self.get_json("/api/llm/provider").await
    }

    async fn list_personas(&self) -> Result<Vec<Persona>, DeskError> {
        self.get_json("/api/persona").await
    }

    async fn current_user(&self) -> Result<Option<User>, DeskError> {
        match self.get_json::<User>("/api/me").await {
            Ok(user) => Ok(Some(user)),
            Err(DeskError::Remote { status: 401 | 403, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn update_chosen_assistants(&self, ids: &[AssistantId]) -> Result<(), DeskError> {
        let request = self
            .request(Method::PATCH, "/api/user/assistant-list")
            .json(&json!({ "chosen_assistants": ids }));
        self.send(request).await.map(|_| ())
    }

    async fn list_document_sets(&self) -> Result<Vec<DocumentSet>, DeskError> {
        self.get_json("/api/manage/document-set").await
    }

    async fn delete_document_set(&self, id: i64) -> Result<(), DeskError> {
        let path = format!("/api/manage/admin/document-set/{id}");
        self.send(self.request(Method::DELETE, &path)).await.map(|_| ())
    }

    async fn connector_indexing_status(&self) -> Result<Vec<ConnectorIndexingStatus>, DeskError> {
        self.get_json("/api/manage/admin/connector/indexing-status")
            .await
    }
}

/// Build the error for a non-success response, preferring the JSON `detail`.
pub fn remote_error(status: StatusCode, body: &str) -> DeskError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("detail").cloned())
        .map(|detail| match detail {
            Value::String(text) => text,
            other => other.to_string(),
        })
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
    DeskError::Remote {
        status: status.as_u16(),
        detail,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// In-memory backend that records writes and can be told to fail them.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub(crate) providers: Vec<ProviderDescriptor>,
        pub(crate) personas: Vec<Persona>,
        pub(crate) user: Option<User>,
        pub(crate) document_sets: Vec<DocumentSet>,
        pub(crate) statuses: Vec<ConnectorIndexingStatus>,
        pub(crate) update_failure: Option<String>,
        pub(crate) delete_failure: Option<String>,
        pub(crate) chosen_updates: Mutex<Vec<Vec<AssistantId>>>,
        pub(crate) deleted_sets: Mutex<Vec<i64>>,
    }

    impl RecordingBackend {
        pub(crate) fn failing_updates(detail: &str) -> Self {
            Self {
                update_failure: Some(detail.to_string()),
                ..Default::default()
            }
        }

        pub(crate) fn failing_deletes(detail: &str) -> Self {
            Self {
                delete_failure: Some(detail.to_string()),
                ..Default::default()
            }
        }

        pub(crate) fn chosen_updates(&self) -> Vec<Vec<AssistantId>> {
            self.chosen_updates.lock().unwrap().clone()
        }

        pub(crate) fn deleted_sets(&self) -> Vec<i64> {
            self.deleted_sets.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BackendApi for RecordingBackend {
        async fn list_llm_providers(&self) -> Result<Vec<ProviderDescriptor>, DeskError> {
            Ok(self.providers.clone())
        }

        async fn list_personas(&self) -> Result<Vec<Persona>, DeskError> {
            Ok(self.personas.clone())
        }

        async fn current_user(&self) -> Result<Option<User>, DeskError> {
            Ok(self.user.clone())
        }

        async fn update_chosen_assistants(&self, ids: &[AssistantId]) -> Result<(), DeskError> {
            if let Some(detail) = &self.update_failure {
                return Err(DeskError::Remote {
                    status: 500,
                    detail: detail.clone(),
                });
            }
            self.chosen_updates.lock().unwrap().push(ids.to_vec());
            Ok(())
        }

        async fn list_document_sets(&self) -> Result<Vec<DocumentSet>, DeskError> {
            Ok(self.document_sets.clone())
        }

        async fn delete_document_set(&self, id: i64) -> Result<(), DeskError> {
            if let Some(detail) = &self.delete_failure {
                return Err(DeskError::Remote {
                    status: 400,
                    detail: detail.clone(),
                });
            }
            self.deleted_sets.lock().unwrap().push(id);
            Ok(())
        }

        async fn connector_indexing_status(
            &self,
        ) -> Result<Vec<ConnectorIndexingStatus>, DeskError> {
            Ok(self.statuses.clone())
        }
    }
}
