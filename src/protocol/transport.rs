use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Raw HTTP response: status plus body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Decode the body of a 200 reply; any other status is `Error::Status`.
    pub fn ok_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        if !self.is_ok() {
            return Err(Error::Status {
                status: self.status,
                path: path.to_string(),
            });
        }
        self.json()
    }
}

/// The only seam between the client and the backend.
///
/// Implementations return `Err` for transport-level failures only; any
/// response that arrived, whatever its status, is an `Ok(HttpReply)`.
#[async_trait]
pub trait TileTransport: Send + Sync {
    async fn get(&self, path: &str) -> Result<HttpReply>;

    async fn post(&self, path: &str, body: Vec<u8>) -> Result<HttpReply>;
}

/// reqwest-backed transport against a base URL
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn finish(response: reqwest::Response) -> Result<HttpReply> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(HttpReply::new(status, body.to_vec()))
    }
}

#[async_trait]
impl TileTransport for HttpTransport {
    async fn get(&self, path: &str) -> Result<HttpReply> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Self::finish(response).await
    }

    async fn post(&self, path: &str, body: Vec<u8>) -> Result<HttpReply> {
        let response = self
            .client
            .post(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Self::finish(response).await
    }
}
