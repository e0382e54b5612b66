//! Content feed client: one GraphQL query, paged with a scroll cursor.

use gf_core::config::EngineConfig;
use gf_core::normalize::Hit;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Page size the query declares as its default.
pub const DEFAULT_PAGE_SIZE: u32 = 24;

pub const FEATURE_GRID_QUERY: &str = r#"
query FeatureGrid($brand: String!, $size: Int = 24, $scrollId: String, $allowUnpublishedContent: Boolean = false) {
  featureScroll(brand: $brand, size: $size, scrollId: $scrollId, allowUnpublishedContent: $allowUnpublishedContent) {
    hits {
      id
      title { short full }
      releaseYear
      runtime
      runtimeDisplay
      runtimeFormatted
      genres
      contentAdvisories
      ratingCode
      mpaaRatingCode
      featuredImage {
        imageUrl
        cuts { url }
      }
      images
    }
    scrollId
  }
}
"#;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    TimedOut,

    #[error("{0}")]
    Network(String),

    #[error("Proxy {status}: {body}")]
    Status { status: u16, body: String },

    /// First message of a non-empty `errors` array.
    #[error("{0}")]
    GraphQl(String),
}

/// One page of `featureScroll`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    #[serde(default)]
    pub hits: Vec<Hit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
}

/// Client for the GraphQL proxy.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: Client,
    endpoint: String,
    timeout: Duration,
    page_size: u32,
}

impl FeedClient {
    pub fn new(http: Client, config: &EngineConfig) -> Self {
        Self {
            http,
            endpoint: config.graphql_endpoint.clone(),
            timeout: Duration::from_secs(config.query_timeout_secs),
            page_size: config.page_size,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch one page for `brand`. `size` defaults to the configured page size.
    pub async fn fetch_page(
        &self,
        brand: &str,
        size: Option<u32>,
        scroll_id: Option<&str>,
    ) -> Result<FeedPage, FetchError> {
        let variables = query_variables(
            brand,
            size.unwrap_or(self.page_size),
            scroll_id,
            unix_millis(),
        );
        log::debug!("querying {} for {brand}", self.endpoint);

        let request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": FEATURE_GRID_QUERY, "variables": variables }))
            .send();
        let response = match tokio::time::timeout(self.timeout, request).await {
            Err(_) => return Err(FetchError::TimedOut),
            Ok(Err(e)) if e.is_timeout() => return Err(FetchError::TimedOut),
            Ok(Err(e)) => return Err(FetchError::Network(e.to_string())),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let body = if body.is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                body
            };
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let page = parse_response(&body)?;
        log::info!("fetched {} hits for {brand}", page.hits.len());
        Ok(page)
    }
}

/// Request variables. `scrollId` is only sent when there is one.
pub fn query_variables(brand: &str, size: u32, scroll_id: Option<&str>, now_ms: u128) -> Value {
    let mut variables = json!({
        "brand": brand,
        "size": size,
        "allowUnpublishedContent": false,
        "_cacheBust": now_ms as u64,
    });
    if let Some(scroll_id) = scroll_id.filter(|s| !s.is_empty()) {
        variables["scrollId"] = Value::from(scroll_id);
    }
    variables
}

/// Decode a response body.
///
/// A non-empty `errors` array fails with its first message. A body that is
/// not JSON, or has no `data.featureScroll`, is an empty page. Hits that do
/// not decode are dropped one by one.
pub fn parse_response(body: &str) -> Result<FeedPage, FetchError> {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        log::warn!("feed response is not JSON; treating as empty");
        return Ok(FeedPage::default());
    };

    if let Some(errors) = json.get("errors").and_then(Value::as_array)
        && let Some(first) = errors.first()
    {
        let message = first
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or("GraphQL error");
        return Err(FetchError::GraphQl(message.to_string()));
    }

    let Some(scroll) = json.pointer("/data/featureScroll").filter(|v| v.is_object()) else {
        return Ok(FeedPage::default());
    };
    let hits = scroll
        .get("hits")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| match serde_json::from_value::<Hit>(hit.clone()) {
                    Ok(hit) => Some(hit),
                    Err(e) => {
                        log::warn!("dropping hit that is not a record: {e}");
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    let scroll_id = scroll
        .get("scrollId")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(FeedPage { hits, scroll_id })
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn variables_include_cursor_only_when_set() {
        let first = query_variables("tcm", 24, None, 1_700_000_000_000);
        assert_eq!(
            first,
            json!({
                "brand": "tcm",
                "size": 24,
                "allowUnpublishedContent": false,
                "_cacheBust": 1_700_000_000_000u64
            })
        );
        let next = query_variables("tcm", 12, Some("cursor-2"), 0);
        assert_eq!(next["scrollId"], "cursor-2");
        assert_eq!(next["size"], 12);
        assert!(query_variables("tcm", 12, Some(""), 0).get("scrollId").is_none());
    }

    #[test]
    fn graphql_errors_surface_first_message() {
        let err = parse_response(
            r#"{ "errors": [{ "message": "Unknown brand" }, { "message": "second" }] }"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Unknown brand");

        let err = parse_response(r#"{ "errors": [{}] }"#).unwrap_err();
        assert_eq!(err.to_string(), "GraphQL error");
    }

    #[test]
    fn empty_errors_array_is_not_a_failure() {
        let page = parse_response(
            r#"{ "errors": [], "data": { "featureScroll": { "hits": [{ "id": "x" }], "scrollId": "s" } } }"#,
        )
        .unwrap();
        assert_eq!(page.hits.len(), 1);
        assert_eq!(page.scroll_id.as_deref(), Some("s"));
    }

    #[test]
    fn missing_data_is_an_empty_page() {
        assert!(parse_response("<html>").unwrap().hits.is_empty());
        assert!(parse_response(r#"{ "data": null }"#).unwrap().hits.is_empty());
        assert!(
            parse_response(r#"{ "data": { "featureScroll": null } }"#)
                .unwrap()
                .hits
                .is_empty()
        );
    }

    #[test]
    fn only_non_record_hits_are_dropped() {
        let page = parse_response(
            r#"{ "data": { "featureScroll": { "hits": [
                { "id": "ok" },
                "stray",
                { "id": "mistyped", "genres": "not-a-list", "releaseYear": "1999",
                  "contentAdvisories": [null], "ratingCode": "PG" },
                null
            ] } } }"#,
        )
        .unwrap();
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.hits[0].id, "ok");
        assert_eq!(page.hits[1].id, "mistyped");
        assert!(page.hits[1].genres.is_none());
        assert_eq!(page.hits[1].release_year, None);
        assert_eq!(page.hits[1].content_advisories, Some(vec![]));
    }

    #[test]
    fn error_messages() {
        assert_eq!(FetchError::TimedOut.to_string(), "Request timed out");
        assert_eq!(
            FetchError::Status {
                status: 502,
                body: "Bad Gateway".into()
            }
            .to_string(),
            "Proxy 502: Bad Gateway"
        );
    }
}
