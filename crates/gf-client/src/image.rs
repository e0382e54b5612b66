//! Image bytes over HTTP, optionally through the image proxy.

use async_trait::async_trait;
use gf_core::config::EngineConfig;
use gf_engine::host::{HostError, ImageFetcher};
use reqwest::{Client, Url};

/// Fetches images with no timeout; any non-success status is an error the
/// populator turns into a placeholder.
#[derive(Debug, Clone)]
pub struct ProxyImageFetcher {
    http: Client,
    proxy: Option<String>,
}

impl ProxyImageFetcher {
    pub fn new(http: Client, config: &EngineConfig) -> Self {
        Self {
            http,
            proxy: config.image_proxy.clone().filter(|p| !p.is_empty()),
        }
    }

    /// `{proxy}?url={encoded}`, or the URL itself without a proxy.
    pub fn request_url(&self, url: &str) -> Result<Url, HostError> {
        let parsed = match &self.proxy {
            Some(proxy) => Url::parse_with_params(proxy, &[("url", url)]),
            None => Url::parse(url),
        };
        parsed.map_err(|e| HostError::Fetch(format!("invalid image URL {url}: {e}")))
    }
}

#[async_trait(?Send)]
impl ImageFetcher for ProxyImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HostError> {
        let target = self.request_url(url)?;
        let response = self
            .http
            .get(target)
            .send()
            .await
            .map_err(|e| HostError::Fetch(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HostError::Fetch(format!("HTTP {}", status.as_u16())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| HostError::Fetch(e.to_string()))?;
        log::debug!("fetched {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn proxied_urls_are_encoded() {
        let fetcher = ProxyImageFetcher::new(Client::new(), &EngineConfig::default());
        let url = fetcher
            .request_url("https://cdn.example.com/a b.jpg?w=300&h=200")
            .unwrap();
        assert_eq!(url.path(), "/api/image-proxy");
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "url");
        assert_eq!(value, "https://cdn.example.com/a b.jpg?w=300&h=200");
    }

    #[test]
    fn direct_fetch_without_proxy() {
        let config = EngineConfig {
            image_proxy: None,
            ..EngineConfig::default()
        };
        let fetcher = ProxyImageFetcher::new(Client::new(), &config);
        assert_eq!(
            fetcher
                .request_url("https://cdn.example.com/poster.jpg")
                .unwrap()
                .as_str(),
            "https://cdn.example.com/poster.jpg"
        );
        assert!(matches!(
            fetcher.request_url("not a url"),
            Err(HostError::Fetch(_))
        ));
    }
}
