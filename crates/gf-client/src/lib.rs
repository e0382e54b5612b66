pub mod graphql;
pub mod image;
pub mod proxy;

pub use graphql::{FeedClient, FeedPage, FetchError, parse_response, query_variables};
pub use image::ProxyImageFetcher;
pub use proxy::{
    GraphQlRelay, HttpUpstream, ImageRelay, ProxyBody, ProxyRequest, ProxyResponse, Upstream,
    UpstreamImage,
};
