use crate::config::Credentials;
use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter.
///
/// The Open Bus Data position feed authenticates with `api_key=<key>`.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    /// Wraps `inner` with the feed key from `credentials` under `api_key`.
    pub fn api_key(inner: C, credentials: &Credentials) -> Self {
        Self {
            inner,
            param_name: "api_key".to_string(),
            key: credentials.feed_api_key.clone(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the URL of the last request instead of sending it.
    struct Recorder(Mutex<Option<String>>);

    #[async_trait]
    impl HttpClient for Recorder {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            *self.0.lock().unwrap() = Some(req.url().to_string());
            let resp = http::Response::builder().status(200).body(Vec::<u8>::new()).unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    #[tokio::test]
    async fn test_api_key_appended_as_query_param() {
        let creds = Credentials {
            feed_api_key: "abc123".to_string(),
        };
        let client = UrlParam::api_key(Recorder(Mutex::new(None)), &creds);
        let url = reqwest::Url::parse("https://example.org/feed?boundingBox=1,2,3,4").unwrap();

        client.get(url).await.unwrap();

        let seen = client.inner.0.lock().unwrap().clone().unwrap();
        assert!(seen.ends_with("&api_key=abc123"));
    }
}
