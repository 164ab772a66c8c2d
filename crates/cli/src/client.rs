//! HTTP client for the fleet daemon

use anyhow::{Context, Result};
use fleet_lib::{InstanceSummary, RedirectionRule, ReplicaDescriptor};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// Client for the daemon's deploy and inventory endpoints
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // Provisioning large fleets can take a while
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => anyhow::bail!("{}", err.describe(status.as_u16())),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        response.json().await.context("Failed to parse response")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub message: String,
    pub state: String,
    pub replicas: Vec<ReplicaDescriptor>,
    pub rules: Vec<RedirectionRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetResponse {
    pub name: String,
    pub instances: Vec<InstanceSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
}

impl ErrorResponse {
    pub fn describe(&self, status: u16) -> String {
        match (&self.phase, self.index) {
            (Some(phase), Some(index)) => {
                format!("{} failed at replica {} ({}): {}", phase, index, status, self.error)
            }
            (Some(phase), None) => format!("{} failed ({}): {}", phase, status, self.error),
            _ => format!("API error ({}): {}", status, self.error),
        }
    }
}
