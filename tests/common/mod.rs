//! Shared test utilities

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use dialwave::api::ApiServerBuilder;
use dialwave::config::Environment;
use dialwave::providers::{extract_call_id, extract_campaign_id};
use dialwave::{
    CallCreated, CallProvider, CampaignCreated, Error, OutboundCall, OutboundCampaign, Result,
};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Provider double that records what reached it
#[derive(Default)]
pub struct RecordingProvider {
    calls: Mutex<Vec<OutboundCall>>,
    campaigns: Mutex<Vec<OutboundCampaign>>,
    requests: AtomicUsize,
    response: Option<Value>,
    fail: bool,
}

impl RecordingProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request with `body`
    #[must_use]
    pub fn responding(body: Value) -> Self {
        Self {
            response: Some(body),
            ..Self::default()
        }
    }

    /// Fail every request
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<OutboundCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn campaigns(&self) -> Vec<OutboundCampaign> {
        self.campaigns.lock().unwrap().clone()
    }

    fn respond(&self, default: Value) -> Result<Value> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Provider("Vapi API error: 500 - upstream down".to_string()));
        }
        Ok(self.response.clone().unwrap_or(default))
    }
}

#[async_trait]
impl CallProvider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn create_call(&self, call: &OutboundCall) -> Result<CallCreated> {
        self.calls.lock().unwrap().push(call.clone());
        let body = self.respond(json!({ "id": "call_1", "status": "queued" }))?;
        Ok(CallCreated {
            id: extract_call_id(&body),
            call: body,
        })
    }

    async fn create_campaign(&self, campaign: &OutboundCampaign) -> Result<CampaignCreated> {
        self.campaigns.lock().unwrap().push(campaign.clone());
        let body = self.respond(json!({ "id": "camp_1", "name": campaign.name }))?;
        Ok(CampaignCreated {
            id: extract_campaign_id(&body),
            campaign: body,
        })
    }
}

/// Router backed by `provider`, or unconfigured when `None`
pub fn router(provider: Option<Arc<RecordingProvider>>, environment: Environment) -> axum::Router {
    let provider = provider.map(|p| p as Arc<dyn CallProvider>);
    ApiServerBuilder::new(0)
        .environment(environment)
        .provider(provider)
        .build()
        .router()
}

/// Send one request and return status plus JSON body
pub async fn send(router: axum::Router, request: Request<Body>) -> (axum::http::StatusCode, Value) {
    let response: Response<Body> = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// JSON POST request
pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// GET request
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
