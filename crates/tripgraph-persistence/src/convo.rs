//! Client for the Convo checkpoint service.
//!
//! Threads and checkpoints are plain REST resources under the configured base
//! URL, authenticated with a bearer API key:
//!
//! | operation       | request                                          |
//! |-----------------|--------------------------------------------------|
//! | new thread      | `POST /threads` -> `{"thread_id": ...}`          |
//! | put             | `PUT /threads/{thread}/checkpoints/{id}`         |
//! | latest          | `GET /threads/{thread}/checkpoints/latest`       |
//! | by id           | `GET /threads/{thread}/checkpoints/{id}`         |
//! | history         | `GET /threads/{thread}/checkpoints?limit=n`      |
//! | delete thread   | `DELETE /threads/{thread}`                       |
//! | list threads    | `GET /threads`                                   |

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tripgraph_core::persistence::{Checkpoint, Checkpointer, ThreadId};

#[derive(Clone)]
pub struct ConvoConfig {
    pub api_key: String,
    pub api_url: String,
}

impl ConvoConfig {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }
}

impl std::fmt::Debug for ConvoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvoConfig")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

struct Inner {
    client: Client,
    config: ConvoConfig,
    base: Url,
}

impl Inner {
    /// Appends `segments` to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Convo API URL cannot be a base: {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.config.api_key)
    }
}

/// Entry point to Convo: creates threads and hands out a [`Checkpointer`]
/// bound to the same credentials.
#[derive(Clone)]
pub struct ConvoClient {
    inner: Arc<Inner>,
}

#[derive(Deserialize)]
struct NewThread {
    thread_id: ThreadId,
}

impl ConvoClient {
    pub fn new(config: ConvoConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(!config.api_key.is_empty(), "Convo API key must not be empty");
        let base = Url::parse(&config.api_url)
            .with_context(|| format!("Invalid Convo API URL `{}`", config.api_url))?;
        let client = Client::builder()
            .user_agent("tripgraph/0.1")
            .build()
            .context("Failed to build Convo HTTP client")?;
        Ok(Self {
            inner: Arc::new(Inner { client, config, base }),
        })
    }

    /// Registers a new conversation thread and returns its id.
    pub async fn new_thread(&self) -> anyhow::Result<ThreadId> {
        let response = self
            .inner
            .authed(self.inner.client.post(self.inner.url(&["threads"])?))
            .send()
            .await
            .context("Failed to reach Convo")?;
        let created: NewThread = ensure_success(response).await?.json().await?;
        tracing::debug!(thread_id = %created.thread_id, "Created Convo thread");
        Ok(created.thread_id)
    }

    pub fn checkpointer(&self) -> ConvoCheckpointer {
        ConvoCheckpointer {
            inner: self.inner.clone(),
        }
    }
}

/// [`Checkpointer`] that stores every checkpoint in Convo.
#[derive(Clone)]
pub struct ConvoCheckpointer {
    inner: Arc<Inner>,
}

async fn ensure_success(response: Response) -> anyhow::Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(anyhow::anyhow!("Convo API error: {} - {}", status, body))
}

#[async_trait]
impl Checkpointer for ConvoCheckpointer {
    async fn put(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        let url = self.inner.url(&[
            "threads",
            checkpoint.thread_id.as_str(),
            "checkpoints",
            checkpoint.id.as_str(),
        ])?;
        let response = self
            .inner
            .authed(self.inner.client.put(url))
            .json(checkpoint)
            .send()
            .await
            .context("Failed to save checkpoint to Convo")?;
        ensure_success(response).await?;
        tracing::debug!(
            thread_id = %checkpoint.thread_id,
            checkpoint_id = %checkpoint.id,
            "Saved checkpoint to Convo"
        );
        Ok(())
    }

    async fn get(
        &self,
        thread_id: &ThreadId,
        checkpoint_id: Option<&str>,
    ) -> anyhow::Result<Option<Checkpoint>> {
        let url = self.inner.url(&[
            "threads",
            thread_id.as_str(),
            "checkpoints",
            checkpoint_id.unwrap_or("latest"),
        ])?;
        let response = self
            .inner
            .authed(self.inner.client.get(url))
            .send()
            .await
            .context("Failed to load checkpoint from Convo")?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(thread_id = %thread_id, "No checkpoint found in Convo");
            return Ok(None);
        }
        let checkpoint = ensure_success(response)
            .await?
            .json::<Checkpoint>()
            .await
            .context("Failed to decode Convo checkpoint")?;
        Ok(Some(checkpoint))
    }

    async fn list(
        &self,
        thread_id: &ThreadId,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Checkpoint>> {
        let url = self.inner.url(&["threads", thread_id.as_str(), "checkpoints"])?;
        let mut request = self.inner.client.get(url);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        let response = self
            .inner
            .authed(request)
            .send()
            .await
            .context("Failed to list checkpoints from Convo")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> anyhow::Result<()> {
        let url = self.inner.url(&["threads", thread_id.as_str()])?;
        let response = self
            .inner
            .authed(self.inner.client.delete(url))
            .send()
            .await
            .context("Failed to delete Convo thread")?;
        if response.status() != StatusCode::NOT_FOUND {
            ensure_success(response).await?;
        }
        tracing::debug!(thread_id = %thread_id, "Deleted Convo thread");
        Ok(())
    }

    async fn list_threads(&self) -> anyhow::Result<Vec<ThreadId>> {
        let response = self
            .inner
            .authed(self.inner.client.get(self.inner.url(&["threads"])?))
            .send()
            .await
            .context("Failed to list Convo threads")?;
        Ok(ensure_success(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tripgraph_core::persistence::{CheckpointMetadata, CheckpointSource};
    use wiremock::matchers::{bearer_token, body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ConvoClient {
        ConvoClient::new(ConvoConfig::new("convo-key", format!("{}/v1/", server.uri()))).unwrap()
    }

    fn checkpoint(thread: &str, id: &str) -> Checkpoint {
        Checkpoint {
            id: id.to_string(),
            thread_id: thread.to_string(),
            parent_id: None,
            values: json!({"destination": "dubai"}),
            next: vec!["flightsFinder".to_string()],
            metadata: CheckpointMetadata {
                source: CheckpointSource::Input,
                step: -1,
                writes: Default::default(),
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(ConvoClient::new(ConvoConfig::new("", "http://localhost")).is_err());
    }

    #[tokio::test]
    async fn new_thread_returns_server_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/threads"))
            .and(bearer_token("convo-key"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"thread_id": "th-42"})))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).new_thread().await.unwrap(), "th-42");
    }

    #[tokio::test]
    async fn put_sends_checkpoint_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/threads/th-1/checkpoints/cp-1"))
            .and(body_partial_json(json!({"id": "cp-1", "next": ["flightsFinder"]})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .checkpointer()
            .put(&checkpoint("th-1", "cp-1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn get_latest_and_missing() {
        let server = MockServer::start().await;
        let saved = checkpoint("th-1", "cp-9");
        Mock::given(method("GET"))
            .and(path("/v1/threads/th-1/checkpoints/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&saved))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/threads/th-2/checkpoints/latest"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let saver = client_for(&server).checkpointer();
        let loaded = saver.get(&"th-1".to_string(), None).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(saver.get(&"th-2".to_string(), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_passes_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/threads/th-1/checkpoints"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                checkpoint("th-1", "cp-2"),
                checkpoint("th-1", "cp-1")
            ])))
            .mount(&server)
            .await;

        let history = client_for(&server)
            .checkpointer()
            .list(&"th-1".to_string(), Some(2))
            .await
            .unwrap();
        let ids: Vec<_> = history.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["cp-2", "cp-1"]);
    }

    #[tokio::test]
    async fn server_errors_carry_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/threads"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database offline"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .checkpointer()
            .list_threads()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("database offline"));
    }

    #[tokio::test]
    async fn delete_tolerates_missing_thread() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/threads/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        client_for(&server)
            .checkpointer()
            .delete_thread(&"gone".to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn thread_ids_are_percent_encoded() {
        let server = MockServer::start().await;
        let saved = checkpoint("trip/1?x#y", "cp-1");
        Mock::given(method("GET"))
            .and(path("/v1/threads/trip%2F1%3Fx%23y/checkpoints/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&saved))
            .expect(1)
            .mount(&server)
            .await;

        let loaded = client_for(&server)
            .checkpointer()
            .get(&"trip/1?x#y".to_string(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ConvoClient::new(ConvoConfig::new("convo-key", "not a url")).err().unwrap();
        assert!(err.to_string().contains("Invalid Convo API URL"));
    }
}
