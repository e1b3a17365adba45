use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::{Collection, Record, RecordStore, StoreError, StoreResult};

/// Record store that talks to a remote JSON record API.
///
/// Collections map to `{base}/{collection}` and records to `{base}/{collection}/{id}`.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    base_url: Url,
    token: Option<String>,
    client: Client,
}

impl RemoteStore {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::Unavailable(format!("failed to build HTTP client: {err}")))?;
        Self::with_client(base_url, token, client)
    }

    /// Use a preconfigured client (proxies, custom TLS roots).
    pub fn with_client(base_url: &str, token: Option<String>, client: Client) -> StoreResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| StoreError::Unavailable(format!("invalid base URL '{base_url}': {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Unavailable(format!(
                "invalid base URL '{base_url}': cannot hold path segments"
            )));
        }
        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, collection: Collection, id: Option<&str>) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                StoreError::Unavailable(format!("invalid base URL '{}'", self.base_url))
            })?;
            segments.pop_if_empty().push(collection.as_str());
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        collection: Collection,
        id: Option<&str>,
    ) -> StoreResult<reqwest::Response> {
        let response = builder.send().await.map_err(|err| {
            StoreError::Unavailable(format!("{} request failed: {err}", collection.as_str()))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(classify_status(status, collection, id, &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        collection: Collection,
        id: Option<&str>,
    ) -> StoreResult<T> {
        let response = self.send(builder, collection, id).await?;
        response.json::<T>().await.map_err(|err| StoreError::Codec {
            collection,
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    async fn list(&self, collection: Collection) -> StoreResult<Vec<Record>> {
        let url = self.endpoint(collection, None)?;
        self.send_json(self.request(Method::GET, url), collection, None)
            .await
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Record> {
        let url = self.endpoint(collection, Some(id))?;
        self.send_json(self.request(Method::GET, url), collection, Some(id))
            .await
    }

    async fn create(&self, collection: Collection, data: Record) -> StoreResult<Record> {
        let url = self.endpoint(collection, None)?;
        let builder = self.request(Method::POST, url).json(&data);
        self.send_json(builder, collection, None).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Record,
    ) -> StoreResult<Record> {
        let url = self.endpoint(collection, Some(id))?;
        let builder = self.request(Method::PATCH, url).json(&patch);
        self.send_json(builder, collection, Some(id)).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let url = self.endpoint(collection, Some(id))?;
        let response = self
            .send(self.request(Method::DELETE, url), collection, Some(id))
            .await?;
        let body = response.text().await.map_err(|err| {
            StoreError::Unavailable(format!("{} response unreadable: {err}", collection.as_str()))
        })?;
        if delete_reports_absent(&body) {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }
}

/// A delete may answer with a bare boolean; `false` means nothing was removed.
fn delete_reports_absent(body: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(body.trim()),
        Ok(serde_json::Value::Bool(false))
    )
}

fn classify_status(
    status: StatusCode,
    collection: Collection,
    id: Option<&str>,
    body: &str,
) -> StoreError {
    match (status, id) {
        (StatusCode::NOT_FOUND, Some(id)) => StoreError::not_found(collection, id),
        _ => StoreError::Unavailable(format!(
            "record API error ({}) on {}: {}",
            status,
            collection.as_str(),
            body.trim()
        )),
    }
}
