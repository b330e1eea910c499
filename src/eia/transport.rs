use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Raw upstream answer; status checks are left to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Minimal GET abstraction used by [`EiaClient`](super::EiaClient)
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse>;
}

/// reqwest-backed transport with a per-request timeout
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(env!("APP_USER_AGENT"))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        let resp = self.client.get(url).query(query).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpResponse { status, body })
    }
}
