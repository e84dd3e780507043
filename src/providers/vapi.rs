//! Vapi REST client for outbound calls and campaigns

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;

use super::{CallCreated, CallProvider, CampaignCreated, extract_call_id, extract_campaign_id};
use crate::outbound::{OutboundCall, OutboundCampaign};
use crate::{Error, Result};

/// Client for the Vapi call-creation API
#[derive(Debug, Clone)]
pub struct VapiClient {
    /// HTTP client
    client: Client,
    /// Base URL for the Vapi API
    base_url: String,
    /// Private API key
    api_key: SecretString,
}

impl VapiClient {
    /// Create a new Vapi client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL for the Vapi API (e.g., <https://api.vapi.ai>)
    /// * `api_key` - Private API key
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<Value> {
        let url = format!("{}/{path}", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("Vapi API error: {status} - {body}")));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CallProvider for VapiClient {
    fn name(&self) -> &'static str {
        "vapi"
    }

    async fn create_call(&self, call: &OutboundCall) -> Result<CallCreated> {
        let body = self.post("call", call).await?;
        let id = extract_call_id(&body);
        tracing::info!(call_id = ?id, assistant_id = %call.assistant_id, "vapi call created");
        Ok(CallCreated { id, call: body })
    }

    async fn create_campaign(&self, campaign: &OutboundCampaign) -> Result<CampaignCreated> {
        let body = self.post("campaign", campaign).await?;
        let id = extract_campaign_id(&body);
        tracing::info!(campaign_id = ?id, name = %campaign.name, "vapi campaign created");
        Ok(CampaignCreated { id, campaign: body })
    }
}
