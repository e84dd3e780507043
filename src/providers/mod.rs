//! Voice platform call-creation capability
//!
//! Handlers only see the [`CallProvider`] trait; [`VapiClient`] is the
//! production implementation.

mod vapi;

pub use vapi::VapiClient;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::Result;
use crate::outbound::{OutboundCall, OutboundCampaign};

/// A call accepted by the voice platform
#[derive(Debug, Clone, PartialEq)]
pub struct CallCreated {
    /// First call identifier in the response, if any
    pub id: Option<String>,
    /// Raw platform response
    pub call: Value,
}

/// A campaign accepted by the voice platform
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignCreated {
    pub id: Option<String>,
    /// Raw platform response
    pub campaign: Value,
}

/// Places calls and campaigns on the voice platform
#[async_trait]
pub trait CallProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Create a single outbound call
    async fn create_call(&self, call: &OutboundCall) -> Result<CallCreated>;

    /// Create a single-customer campaign
    async fn create_campaign(&self, campaign: &OutboundCampaign) -> Result<CampaignCreated>;
}

/// Shapes the call-creation endpoint may answer with
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CallCreateResponse {
    Single {
        id: String,
    },
    Batch {
        #[serde(default)]
        results: Vec<CallRef>,
    },
}

#[derive(Debug, Deserialize)]
struct CallRef {
    id: String,
}

/// Pull the first call identifier out of either `{id}` or `{results: [{id}]}`
#[must_use]
pub fn extract_call_id(body: &Value) -> Option<String> {
    match CallCreateResponse::deserialize(body).ok()? {
        CallCreateResponse::Single { id } => Some(id),
        CallCreateResponse::Batch { results } => results.into_iter().next().map(|r| r.id),
    }
}

/// Campaign identifier from a campaign response
#[must_use]
pub fn extract_campaign_id(body: &Value) -> Option<String> {
    body.get("id").and_then(Value::as_str).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn single_call_response() {
        assert_eq!(
            extract_call_id(&json!({ "id": "call_1", "status": "queued" })).as_deref(),
            Some("call_1")
        );
    }

    #[test]
    fn batch_call_response_takes_first() {
        let body = json!({
            "results": [{ "id": "call_a" }, { "id": "call_b" }],
            "errors": []
        });
        assert_eq!(extract_call_id(&body).as_deref(), Some("call_a"));
    }

    #[test]
    fn empty_batch_has_no_id() {
        assert_eq!(extract_call_id(&json!({ "results": [], "errors": ["x"] })), None);
        assert_eq!(extract_call_id(&json!({})), None);
    }

    #[test]
    fn campaign_id() {
        assert_eq!(
            extract_campaign_id(&json!({ "id": "camp_1", "name": "Web Campaign" })).as_deref(),
            Some("camp_1")
        );
        assert_eq!(extract_campaign_id(&json!({ "id": 7 })), None);
    }
}
