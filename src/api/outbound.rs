//! Outbound call and campaign endpoints

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use super::ApiState;
use crate::outbound::{self, ValidationErrors};
use crate::providers::CallProvider;
use crate::Error;

/// Created call response
#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub id: Option<String>,
    pub call: Value,
}

/// Created campaign response
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Option<String>,
    pub campaign: Value,
}

/// Which platform operation failed, for the 502 message
#[derive(Debug, Clone, Copy)]
enum Operation {
    Call,
    Campaign,
}

impl Operation {
    const fn failure_message(self) -> &'static str {
        match self {
            Self::Call => "Failed to create call",
            Self::Campaign => "Failed to create campaign",
        }
    }
}

/// Error returned by the outbound handlers
#[derive(Debug)]
pub enum OutboundError {
    /// No platform credential configured
    NotConfigured,
    /// Body failed schema validation
    InvalidPayload(ValidationErrors),
    /// Customer number could not be normalized
    InvalidNumber,
    /// The platform call failed
    Upstream(&'static str),
}

impl OutboundError {
    fn from_validation(error: Error, operation: Operation) -> Self {
        match error {
            Error::Validation(errors) => Self::InvalidPayload(errors),
            Error::InvalidNumber => Self::InvalidNumber,
            other => {
                tracing::error!(error = %other, "unexpected validation failure");
                Self::Upstream(operation.failure_message())
            }
        }
    }
}

impl IntoResponse for OutboundError {
    fn into_response(self) -> Response {
        match self {
            Self::NotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Server not configured for Vapi" })),
            ),
            Self::InvalidPayload(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid payload", "details": details })),
            ),
            Self::InvalidNumber => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid customer number" })),
            ),
            Self::Upstream(message) => (StatusCode::BAD_GATEWAY, Json(json!({ "error": message }))),
        }
        .into_response()
    }
}

/// `POST /api/vapi/outbound-call`
///
/// # Errors
///
/// See [`OutboundError`]
pub async fn create_call(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<CallResponse>), OutboundError> {
    let provider = configured_provider(&state)?;
    let body = parse_body(&body)?;

    let call = outbound::validate_call(&body, &state.default_country_code)
        .map_err(|e| OutboundError::from_validation(e, Operation::Call))?;

    let created = provider.create_call(&call).await.map_err(|e| {
        tracing::error!(
            provider = provider.name(),
            assistant_id = %call.assistant_id,
            error = %e,
            "failed to create call"
        );
        OutboundError::Upstream(Operation::Call.failure_message())
    })?;

    tracing::info!(id = ?created.id, "outbound call created");

    Ok((
        StatusCode::CREATED,
        Json(CallResponse {
            id: created.id,
            call: created.call,
        }),
    ))
}

/// `POST /api/vapi/outbound-campaign`
///
/// # Errors
///
/// See [`OutboundError`]
pub async fn create_campaign(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<CampaignResponse>), OutboundError> {
    let provider = configured_provider(&state)?;
    let body = parse_body(&body)?;

    let campaign = outbound::validate_campaign(&body, &state.default_country_code)
        .map_err(|e| OutboundError::from_validation(e, Operation::Campaign))?;

    let created = provider.create_campaign(&campaign).await.map_err(|e| {
        tracing::error!(
            provider = provider.name(),
            campaign = %campaign.name,
            error = %e,
            "failed to create campaign"
        );
        OutboundError::Upstream(Operation::Campaign.failure_message())
    })?;

    tracing::info!(id = ?created.id, name = %campaign.name, "outbound campaign created");

    Ok((
        StatusCode::CREATED,
        Json(CampaignResponse {
            id: created.id,
            campaign: created.campaign,
        }),
    ))
}

fn configured_provider(state: &ApiState) -> Result<&dyn CallProvider, OutboundError> {
    state
        .provider
        .as_deref()
        .ok_or(OutboundError::NotConfigured)
}

/// Parse the raw body; malformed JSON is a form-level payload error
fn parse_body(body: &[u8]) -> Result<Value, OutboundError> {
    serde_json::from_slice(body).map_err(|e| {
        let mut errors = ValidationErrors::default();
        errors.add_form(format!("Malformed JSON: {e}"));
        OutboundError::InvalidPayload(errors)
    })
}
