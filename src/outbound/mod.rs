//! Outbound call and campaign requests
//!
//! A request goes through two gates before it may reach the voice platform:
//! schema validation (field-level diagnostics) and then normalization of the
//! destination number. Only the resulting [`OutboundCall`] /
//! [`OutboundCampaign`] values are accepted by a
//! [`CallProvider`](crate::providers::CallProvider).

mod validation;

pub use validation::ValidationErrors;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::phone::{self, NormalizedNumber};
use crate::{Error, Result};
use validation::FieldReader;

/// Campaign name used when the client does not supply one
pub const DEFAULT_CAMPAIGN_NAME: &str = "Web Campaign";

/// Minimum length of the raw customer number, before normalization
pub const MIN_RAW_NUMBER_LEN: usize = 7;

/// Destination of an outbound call, as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Intent to place one outbound call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    /// Originating line
    pub phone_number_id: String,
    /// Voice agent configuration
    pub assistant_id: String,
    pub customer: Customer,
}

/// A named single-customer campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRequest {
    pub name: String,
    pub phone_number_id: String,
    pub assistant_id: String,
    pub customer: Customer,
}

/// Customer with a dial-able number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundCustomer {
    pub number: NormalizedNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A validated call, ready for the voice platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundCall {
    pub phone_number_id: String,
    pub assistant_id: String,
    pub customer: OutboundCustomer,
}

/// A validated campaign, ready for the voice platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundCampaign {
    pub name: String,
    pub phone_number_id: String,
    pub assistant_id: String,
    pub customers: Vec<OutboundCustomer>,
}

impl CallRequest {
    /// Schema-check an untrusted JSON body
    ///
    /// # Errors
    ///
    /// Returns every field-level problem found
    pub fn from_json(body: &Value) -> std::result::Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let root = FieldReader::root(body, &mut errors);
        let fields = read_common(&root, &mut errors);

        match fields {
            Some((phone_number_id, assistant_id, customer)) if errors.is_empty() => Ok(Self {
                phone_number_id,
                assistant_id,
                customer,
            }),
            _ => Err(errors),
        }
    }

    /// Normalize the destination number
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidNumber` if the number cannot be dialed
    pub fn normalize(self, default_country_code: &str) -> Result<OutboundCall> {
        let customer = normalize_customer(self.customer, default_country_code)?;
        Ok(OutboundCall {
            phone_number_id: self.phone_number_id,
            assistant_id: self.assistant_id,
            customer,
        })
    }
}

impl CampaignRequest {
    /// Schema-check an untrusted JSON body, defaulting an absent name
    ///
    /// # Errors
    ///
    /// Returns every field-level problem found
    pub fn from_json(body: &Value) -> std::result::Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let root = FieldReader::root(body, &mut errors);
        let fields = read_common(&root, &mut errors);
        let name = root.optional_str("name", 1, "name is required", &mut errors);

        match fields {
            Some((phone_number_id, assistant_id, customer)) if errors.is_empty() => Ok(Self {
                name: name.unwrap_or_else(|| DEFAULT_CAMPAIGN_NAME.to_string()),
                phone_number_id,
                assistant_id,
                customer,
            }),
            _ => Err(errors),
        }
    }

    /// Normalize the destination number
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidNumber` if the number cannot be dialed
    pub fn normalize(self, default_country_code: &str) -> Result<OutboundCampaign> {
        let customer = normalize_customer(self.customer, default_country_code)?;
        Ok(OutboundCampaign {
            name: self.name,
            phone_number_id: self.phone_number_id,
            assistant_id: self.assistant_id,
            customers: vec![customer],
        })
    }
}

/// Validate and normalize an outbound call body
///
/// # Errors
///
/// `Error::Validation` for schema problems, then `Error::InvalidNumber`
pub fn validate_call(body: &Value, default_country_code: &str) -> Result<OutboundCall> {
    CallRequest::from_json(body)?.normalize(default_country_code)
}

/// Validate and normalize an outbound campaign body
///
/// # Errors
///
/// `Error::Validation` for schema problems, then `Error::InvalidNumber`
pub fn validate_campaign(body: &Value, default_country_code: &str) -> Result<OutboundCampaign> {
    CampaignRequest::from_json(body)?.normalize(default_country_code)
}

fn read_common(
    root: &FieldReader<'_>,
    errors: &mut ValidationErrors,
) -> Option<(String, String, Customer)> {
    let phone_number_id =
        root.required_str("phoneNumberId", 1, "phoneNumberId is required", errors);
    let assistant_id = root.required_str("assistantId", 1, "assistantId is required", errors);

    let customer = root.nested("customer", errors).and_then(|customer| {
        let number = customer.required_str(
            "number",
            MIN_RAW_NUMBER_LEN,
            "customer.number is required",
            errors,
        );
        let name = customer.optional_str("name", 0, "", errors);
        number.map(|number| Customer { number, name })
    });

    Some((phone_number_id?, assistant_id?, customer?))
}

fn normalize_customer(customer: Customer, default_country_code: &str) -> Result<OutboundCustomer> {
    let number =
        phone::normalize(&customer.number, default_country_code).ok_or(Error::InvalidNumber)?;
    Ok(OutboundCustomer {
        number,
        name: customer.name,
    })
}
