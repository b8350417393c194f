use std::future::Future;
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::debug;

use crate::error::FetchError;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Anonymous GET returning the response body as text.
pub trait Transport {
    fn get_text(&self, url: &str) -> impl Future<Output = Result<String, FetchError>>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Self::from_builder(Client::builder().timeout(timeout))
    }

    fn from_builder(builder: ClientBuilder) -> Result<Self, FetchError> {
        let client = builder
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::transport("<client>", e))?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::transport(url, e))
    }
}
