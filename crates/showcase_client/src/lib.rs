use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use showcase_core::prelude::*;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShowcaseClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned error {0}: {1}")]
    ServerError(StatusCode, String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ShowcaseClientError>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub commit_message: String,
    pub committed: bool,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    pub branch: String,
    pub commit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogList {
    pub logs: Vec<String>,
    pub latest: Option<String>,
}

#[derive(Deserialize)]
struct LogContent {
    content: String,
}

#[derive(Clone)]
pub struct ShowcaseClient {
    base_url: String,
    client: Client,
}

impl ShowcaseClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ShowcaseClientError::ServerError(status, text));
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| ShowcaseClientError::Validation(format!("Failed to parse response: {e}")))
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.json(self.client.get(self.url("/products"))).await
    }

    pub async fn get_product(&self, id: &str) -> Result<Product> {
        self.json(self.client.get(self.url(&format!("/products/{id}"))))
            .await
    }

    pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
        self.json(self.client.post(self.url("/products")).json(draft))
            .await
    }

    pub async fn update_product(&self, id: &str, patch: &ProductPatch) -> Result<Product> {
        self.json(
            self.client
                .put(self.url(&format!("/products/{id}")))
                .json(patch),
        )
        .await
    }

    pub async fn delete_product(&self, id: &str) -> Result<()> {
        self.send(self.client.delete(self.url(&format!("/products/{id}"))))
            .await?;
        Ok(())
    }

    pub async fn upload_file(&self, path: &Path) -> Result<StoredAsset> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ShowcaseClientError::Validation(format!("Invalid file name: {path:?}")))?
            .to_string();

        let part = reqwest::multipart::Part::bytes(data).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);
        self.json(self.client.post(self.url("/upload")).multipart(form))
            .await
    }

    pub async fn push(&self) -> Result<PushResponse> {
        self.json(self.client.post(self.url("/deploy/push"))).await
    }

    /// Sends a signed webhook, mostly useful to exercise a deployment by hand.
    pub async fn send_webhook(&self, body: Vec<u8>, signature: &str) -> Result<WebhookResponse> {
        self.json(
            self.client
                .post(self.url("/deploy/webhook"))
                .header(SIGNATURE_HEADER, signature)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body),
        )
        .await
    }

    pub async fn list_logs(&self) -> Result<LogList> {
        self.json(self.client.get(self.url("/deploy/logs"))).await
    }

    pub async fn read_log(&self, file: &str) -> Result<String> {
        let log: LogContent = self
            .json(
                self.client
                    .get(self.url("/deploy/logs"))
                    .query(&[("file", file)]),
            )
            .await?;
        Ok(log.content)
    }
}
