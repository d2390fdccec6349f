use async_trait::async_trait;
use reqwest::{Method, Request, Response};

/// Executes prepared requests against the feed provider.
///
/// Decorators such as [`UrlParam`](super::auth::UrlParam) wrap another client
/// to attach credentials before delegating.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    async fn get(&self, url: reqwest::Url) -> reqwest::Result<Response> {
        self.execute(Request::new(Method::GET, url)).await
    }
}
