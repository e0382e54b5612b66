//! Relay handlers for the GraphQL and image proxies.
//!
//! The relays sit between the design tool and upstream services that do
//! not send cross-origin headers. They are transport-agnostic: a server
//! adapter turns its request into a [`ProxyRequest`] and writes back the
//! [`ProxyResponse`]. Upstream traffic goes through the [`Upstream`] trait.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

/// Cache policy for relayed images.
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Content type assumed when the image upstream does not send one.
pub const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

// ─── Request / response ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyRequest {
    pub method: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ProxyRequest {
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn is(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProxyBody {
    Empty,
    Json(Value),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ProxyBody,
}

impl ProxyResponse {
    fn new(status: u16, headers: &[(&str, &str)], body: ProxyBody) -> Self {
        Self {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body,
        }
    }

    #[must_use]
    fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

// ─── Upstream ────────────────────────────────────────────────────────────

/// What an upstream image response carried.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamImage {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Outbound HTTP used by the relays. Errors are transport-level messages.
#[async_trait(?Send)]
pub trait Upstream {
    /// POST a JSON body; returns the status and the decoded JSON response.
    async fn post_json(&self, url: &str, body: &Value) -> Result<(u16, Value), String>;

    async fn get_image(&self, url: &str) -> Result<UpstreamImage, String>;
}

/// `Upstream` over a reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpUpstream {
    http: Client,
}

impl HttpUpstream {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait(?Send)]
impl Upstream for HttpUpstream {
    async fn post_json(&self, url: &str, body: &Value) -> Result<(u16, Value), String> {
        let response = self
            .http
            .post(url)
            .header("Cache-Control", NO_CACHE)
            .header("Pragma", "no-cache")
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let json = response.json::<Value>().await.map_err(|e| e.to_string())?;
        Ok((status, json))
    }

    async fn get_image(&self, url: &str) -> Result<UpstreamImage, String> {
        let response = self.http.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| e.to_string())?.to_vec();
        Ok(UpstreamImage {
            status,
            content_type,
            bytes,
        })
    }
}

// ─── GraphQL relay ───────────────────────────────────────────────────────

const GRAPHQL_CORS: &[(&str, &str)] = &[
    ("Access-Control-Allow-Credentials", "true"),
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET,OPTIONS,PATCH,DELETE,POST,PUT"),
    (
        "Access-Control-Allow-Headers",
        "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, Content-MD5, Content-Type, Date, X-Api-Version, Authorization, Cache-Control, Pragma",
    ),
    ("Cache-Control", NO_CACHE),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// Forwards `{query, variables}` to the GraphQL upstream, uncached.
pub struct GraphQlRelay<U> {
    upstream: U,
    endpoint: String,
}

impl<U: Upstream> GraphQlRelay<U> {
    pub fn new(upstream: U, endpoint: &str) -> Self {
        Self {
            upstream,
            endpoint: endpoint.to_string(),
        }
    }

    pub async fn handle(&self, req: &ProxyRequest) -> ProxyResponse {
        let respond = |status, body| ProxyResponse::new(status, GRAPHQL_CORS, body);
        if req.is("OPTIONS") {
            return respond(200, ProxyBody::Empty);
        }
        if !req.is("POST") {
            return respond(405, ProxyBody::Json(json!({ "error": "Method not allowed" })));
        }

        let body = req.body.clone().unwrap_or_else(|| json!({}));
        let forwarded = json!({
            "query": body.get("query").cloned().unwrap_or(Value::Null),
            "variables": body.get("variables").cloned().unwrap_or(Value::Null),
        });
        match self.upstream.post_json(&self.endpoint, &forwarded).await {
            Ok((status, json)) => respond(status, ProxyBody::Json(json)),
            Err(message) => {
                log::error!("proxy error: {message}");
                respond(
                    500,
                    ProxyBody::Json(json!({ "error": "Proxy error", "message": message })),
                )
            }
        }
    }
}

// ─── Image relay ─────────────────────────────────────────────────────────

const IMAGE_CORS: &[(&str, &str)] = &[
    ("Access-Control-Allow-Credentials", "true"),
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type, Authorization"),
];

/// Relays image bytes from `?url=` with a one-day cache policy.
pub struct ImageRelay<U> {
    upstream: U,
}

impl<U: Upstream> ImageRelay<U> {
    pub fn new(upstream: U) -> Self {
        Self { upstream }
    }

    pub async fn handle(&self, req: &ProxyRequest) -> ProxyResponse {
        let respond = |status, body| ProxyResponse::new(status, IMAGE_CORS, body);
        if req.is("OPTIONS") {
            return respond(200, ProxyBody::Empty);
        }
        if !req.is("GET") {
            return respond(405, ProxyBody::Json(json!({ "error": "Method not allowed" })));
        }
        let Some(url) = req.query_param("url").filter(|u| !u.is_empty()) else {
            return respond(
                400,
                ProxyBody::Json(json!({ "error": "Missing 'url' query parameter" })),
            );
        };

        match self.upstream.get_image(url).await {
            Ok(image) if image.status != 200 => respond(
                image.status,
                ProxyBody::Json(json!({
                    "error": format!("Failed to fetch image: HTTP {}", image.status)
                })),
            ),
            Ok(image) => {
                let content_type = image
                    .content_type
                    .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string());
                respond(200, ProxyBody::Bytes(image.bytes))
                    .with_header("Content-Type", &content_type)
                    .with_header("Cache-Control", IMAGE_CACHE_CONTROL)
            }
            Err(message) => {
                log::error!("image proxy error: {message}");
                respond(
                    500,
                    ProxyBody::Json(json!({ "error": "Image proxy error", "message": message })),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Records outbound calls and answers from canned results.
    #[derive(Default)]
    struct FakeUpstream {
        json: Option<Result<(u16, Value), String>>,
        image: Option<Result<UpstreamImage, String>>,
        calls: RefCell<Vec<(String, Option<Value>)>>,
    }

    #[async_trait(?Send)]
    impl Upstream for FakeUpstream {
        async fn post_json(&self, url: &str, body: &Value) -> Result<(u16, Value), String> {
            self.calls
                .borrow_mut()
                .push((url.to_string(), Some(body.clone())));
            self.json.clone().unwrap_or(Err("unexpected call".into()))
        }

        async fn get_image(&self, url: &str) -> Result<UpstreamImage, String> {
            self.calls.borrow_mut().push((url.to_string(), None));
            self.image.clone().unwrap_or(Err("unexpected call".into()))
        }
    }

    fn graphql(json: Result<(u16, Value), String>) -> GraphQlRelay<FakeUpstream> {
        GraphQlRelay::new(
            FakeUpstream {
                json: Some(json),
                ..Default::default()
            },
            "https://upstream.example.com/graphql",
        )
    }

    fn images(image: Result<UpstreamImage, String>) -> ImageRelay<FakeUpstream> {
        ImageRelay::new(FakeUpstream {
            image: Some(image),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn graphql_preflight_and_wrong_method() {
        let relay = graphql(Ok((200, json!({}))));
        let preflight = relay.handle(&ProxyRequest::new("OPTIONS")).await;
        assert_eq!(preflight.status, 200);
        assert_eq!(preflight.body, ProxyBody::Empty);
        assert_eq!(preflight.header("access-control-allow-origin"), Some("*"));

        let get = relay.handle(&ProxyRequest::new("GET")).await;
        assert_eq!(get.status, 405);
        assert_eq!(get.body, ProxyBody::Json(json!({ "error": "Method not allowed" })));
        assert!(relay.upstream.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn graphql_forwards_query_and_variables_only() {
        let upstream_body = json!({ "data": { "featureScroll": { "hits": [] } } });
        let relay = graphql(Ok((200, upstream_body.clone())));
        let req = ProxyRequest::new("POST").with_body(json!({
            "query": "query { x }",
            "variables": { "brand": "tcm" },
            "operationName": "ignored"
        }));

        let resp = relay.handle(&req).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, ProxyBody::Json(upstream_body));
        assert_eq!(resp.header("Cache-Control"), Some(NO_CACHE));
        assert_eq!(resp.header("Expires"), Some("0"));

        let calls = relay.upstream.calls.borrow();
        assert_eq!(calls[0].0, "https://upstream.example.com/graphql");
        assert_eq!(
            calls[0].1,
            Some(json!({ "query": "query { x }", "variables": { "brand": "tcm" } }))
        );
    }

    #[tokio::test]
    async fn graphql_passes_upstream_status_through() {
        let relay = graphql(Ok((502, json!({ "errors": [{ "message": "down" }] }))));
        let resp = relay.handle(&ProxyRequest::new("post").with_body(json!({}))).await;
        assert_eq!(resp.status, 502);
        assert_eq!(
            resp.body,
            ProxyBody::Json(json!({ "errors": [{ "message": "down" }] }))
        );
    }

    #[tokio::test]
    async fn graphql_transport_failure_is_500() {
        let relay = graphql(Err("connection refused".into()));
        let resp = relay.handle(&ProxyRequest::new("POST")).await;
        assert_eq!(resp.status, 500);
        assert_eq!(
            resp.body,
            ProxyBody::Json(json!({ "error": "Proxy error", "message": "connection refused" }))
        );
    }

    #[tokio::test]
    async fn image_requires_url() {
        let relay = images(Err("unused".into()));
        let resp = relay.handle(&ProxyRequest::new("GET")).await;
        assert_eq!(resp.status, 400);
        assert_eq!(
            resp.body,
            ProxyBody::Json(json!({ "error": "Missing 'url' query parameter" }))
        );
        assert_eq!(relay.handle(&ProxyRequest::new("OPTIONS")).await.status, 200);
        assert_eq!(relay.handle(&ProxyRequest::new("POST")).await.status, 405);
    }

    #[tokio::test]
    async fn image_bytes_relay_with_cache_policy() {
        let relay = images(Ok(UpstreamImage {
            status: 200,
            content_type: None,
            bytes: vec![1, 2, 3],
        }));
        let req = ProxyRequest::new("GET").with_query("url", "https://cdn.example.com/p.jpg");

        let resp = relay.handle(&req).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, ProxyBody::Bytes(vec![1, 2, 3]));
        assert_eq!(resp.header("content-type"), Some(DEFAULT_IMAGE_TYPE));
        assert_eq!(resp.header("cache-control"), Some(IMAGE_CACHE_CONTROL));
        assert_eq!(
            relay.upstream.calls.borrow()[0].0,
            "https://cdn.example.com/p.jpg"
        );
    }

    #[tokio::test]
    async fn image_upstream_errors() {
        let relay = images(Ok(UpstreamImage {
            status: 404,
            content_type: Some("text/html".into()),
            bytes: b"nope".to_vec(),
        }));
        let req = ProxyRequest::new("GET").with_query("url", "https://cdn.example.com/x.png");
        let resp = relay.handle(&req).await;
        assert_eq!(resp.status, 404);
        assert_eq!(
            resp.body,
            ProxyBody::Json(json!({ "error": "Failed to fetch image: HTTP 404" }))
        );

        let relay = images(Err("dns failure".into()));
        let resp = relay.handle(&req).await;
        assert_eq!(resp.status, 500);
        assert_eq!(
            resp.body,
            ProxyBody::Json(json!({ "error": "Image proxy error", "message": "dns failure" }))
        );
    }
}
