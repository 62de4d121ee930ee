//! HTTP client for the Consul agent's local API.
//!
//! Only three endpoints are used:
//! - `PUT /v1/agent/service/register` with the raw service JSON as the body;
//! - `GET /v1/agent/service/deregister/<service_id>`;
//! - `GET /v1/agent/check/pass/<check_id>`.
//!
//! The ACL token, when present, rides along as the `token` query parameter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Response};

use super::AgentConnector;
use crate::config::ServiceDefinition;
use crate::errors::Error;

/// Consul agent HTTP API port when the address doesn't name one.
pub const DEFAULT_AGENT_PORT: u16 = 8500;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ConsulClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ConsulClient {
    /// `agent_address` is `hostname[:port]`, e.g. `localhost` or `10.0.0.5:8501`.
    pub fn new(agent_address: &str, token: Option<String>) -> Result<Self, Error> {
        let (host, port) = match agent_address.split_once(':') {
            Some((host, port)) => (host, port.to_string()),
            None => (agent_address, DEFAULT_AGENT_PORT.to_string()),
        };
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: format!("http://{}:{}", host, port),
            token,
            http,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.query(&[("token", token)]);
        }
        builder
    }

    /// 2xx = accepted. Anything else is a rejection, reported to the caller as
    /// `Ok(false)` with the body logged for diagnostics.
    async fn accepted(&self, path: &str, response: Response) -> Result<bool, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("Agent rejected {} ({}): {}", path, status.as_u16(), body);
        Ok(false)
    }
}

#[async_trait]
impl AgentConnector for ConsulClient {
    async fn register(&self, service: &ServiceDefinition) -> Result<bool, Error> {
        let path = "/v1/agent/service/register";
        let response = self
            .request(Method::PUT, path)
            .json(&service.raw)
            .send()
            .await?;
        self.accepted(path, response).await
    }

    async fn deregister(&self, service_id: &str) -> Result<bool, Error> {
        let path = format!(
            "/v1/agent/service/deregister/{}",
            urlencoding::encode(service_id)
        );
        let response = self.request(Method::GET, &path).send().await?;
        self.accepted(&path, response).await
    }

    async fn pass_ttl_check(&self, check_id: &str) -> Result<bool, Error> {
        let path = format!("/v1/agent/check/pass/{}", urlencoding::encode(check_id));
        let response = self.request(Method::GET, &path).send().await?;
        self.accepted(&path, response).await
    }
}
