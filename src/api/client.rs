//! Document API client
//!
//! [`DocumentApi`] is the seam between the engine and the server. The
//! engine only ever talks to the trait; [`HttpApi`] is the reqwest-backed
//! implementation used by the binary.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::types::{Annotation, DocumentRecord, DocumentUpdate, ErrorBody, NewAnnotation};
use crate::config::ApiConfig;
use crate::error::{ClientError, Result};

/// Operations the client needs from the server
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn get_document(&self, document_id: &str) -> Result<DocumentRecord>;

    async fn update_document(&self, document_id: &str, update: &DocumentUpdate) -> Result<DocumentRecord>;

    async fn delete_document(&self, document_id: &str) -> Result<()>;

    /// Annotations in server order (oldest first)
    async fn list_annotations(&self, document_id: &str) -> Result<Vec<Annotation>>;

    async fn create_annotation(&self, document_id: &str, annotation: &NewAnnotation) -> Result<Annotation>;

    async fn add_favorite(&self, document_id: &str) -> Result<()>;

    async fn remove_favorite(&self, document_id: &str) -> Result<()>;
}

/// HTTP implementation of [`DocumentApi`]
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    api_root: String,
    token: Option<String>,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &ApiConfig) -> Self {
        Self {
            client,
            api_root: config.api_root(),
            token: config.token.clone(),
        }
    }

    fn document_url(&self, document_id: &str, tail: &str) -> String {
        format!(
            "{}/documents/{}{}",
            self.api_root,
            urlencoding::encode(document_id),
            tail
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message())
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        tracing::warn!("API returned {}: {}", status, detail);
        Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl DocumentApi for HttpApi {
    async fn get_document(&self, document_id: &str) -> Result<DocumentRecord> {
        let url = self.document_url(document_id, "");
        let response = self.send(self.request(Method::GET, &url)).await?;
        Self::decode(response).await
    }

    async fn update_document(&self, document_id: &str, update: &DocumentUpdate) -> Result<DocumentRecord> {
        let url = self.document_url(document_id, "");
        let response = self
            .send(self.request(Method::PUT, &url).json(update))
            .await?;
        Self::decode(response).await
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let url = self.document_url(document_id, "");
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn list_annotations(&self, document_id: &str) -> Result<Vec<Annotation>> {
        let url = self.document_url(document_id, "/comments");
        let response = self.send(self.request(Method::GET, &url)).await?;
        Self::decode(response).await
    }

    async fn create_annotation(&self, document_id: &str, annotation: &NewAnnotation) -> Result<Annotation> {
        let url = self.document_url(document_id, "/comments");
        let response = self
            .send(self.request(Method::POST, &url).json(annotation))
            .await?;
        Self::decode(response).await
    }

    async fn add_favorite(&self, document_id: &str) -> Result<()> {
        let url = self.document_url(document_id, "/favorite");
        self.send(self.request(Method::POST, &url)).await?;
        Ok(())
    }

    async fn remove_favorite(&self, document_id: &str) -> Result<()> {
        let url = self.document_url(document_id, "/favorite");
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }
}
