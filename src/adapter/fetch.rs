use crate::error::{Result, StudioError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImage {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage>;
}

#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let _timer = crate::logger::timer("image download");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StudioError::TransportError(format!("image download failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!(
                "Failed to fetch image from URL: {}. Status: {}. Body: {}",
                url,
                status,
                body
            );
            return Err(StudioError::fetch_failed(url, status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from);
        let bytes = response.bytes().await?;

        log::debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}
