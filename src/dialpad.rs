//! Dial pad entry buffer
//!
//! Mirrors the keypad of the web form: digits and a leading `+`, capped at
//! [`MAX_LEN`] characters. Submitting yields a single-customer campaign.

use crate::outbound::{CampaignRequest, Customer, DEFAULT_CAMPAIGN_NAME, MIN_RAW_NUMBER_LEN};
use crate::phone::sanitize_input;

/// Longest entry accepted from the keypad, `+` included
pub const MAX_LEN: usize = 16;

/// Backspace key
pub const BACKSPACE: char = '<';

/// Why the form cannot be submitted yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("Phone Number ID is required.")]
    MissingPhoneNumberId,
    #[error("Assistant ID is required.")]
    MissingAssistantId,
    #[error("Customer phone number is invalid.")]
    InvalidNumber,
}

/// Number being entered on the dial pad
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialPad {
    buffer: String,
}

impl DialPad {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entry
    #[must_use]
    pub fn number(&self) -> &str {
        &self.buffer
    }

    /// Handle one keypad press
    ///
    /// Returns `true` if the entry changed.
    pub fn press(&mut self, key: char) -> bool {
        match key {
            BACKSPACE => self.buffer.pop().is_some(),
            '+' => {
                if self.buffer.is_empty() {
                    self.buffer.push('+');
                    true
                } else {
                    false
                }
            }
            _ => {
                let mut next = self.buffer.clone();
                next.push(key);
                let next = sanitize_input(&next);
                if next.len() > MAX_LEN || next == self.buffer {
                    return false;
                }
                self.buffer = next;
                true
            }
        }
    }

    /// Replace the entry with pasted text
    pub fn paste(&mut self, text: &str) {
        self.set(text);
    }

    /// Replace the entry with typed text, keeping only digits and `+`
    ///
    /// Unlike keypad presses, typed text is not length-capped.
    pub fn set(&mut self, text: &str) {
        self.buffer = sanitize_input(text);
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Whether the entry is long enough to submit
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.buffer.trim().len() >= MIN_RAW_NUMBER_LEN
    }

    /// Build the campaign request the form posts
    ///
    /// # Errors
    ///
    /// Returns the first missing or invalid field, in form order
    pub fn submission(
        &self,
        phone_number_id: &str,
        assistant_id: &str,
    ) -> Result<CampaignRequest, SubmitError> {
        let phone_number_id = phone_number_id.trim();
        let assistant_id = assistant_id.trim();
        let number = sanitize_input(&self.buffer);

        if phone_number_id.is_empty() {
            return Err(SubmitError::MissingPhoneNumberId);
        }
        if assistant_id.is_empty() {
            return Err(SubmitError::MissingAssistantId);
        }
        if number.len() < MIN_RAW_NUMBER_LEN {
            return Err(SubmitError::InvalidNumber);
        }

        Ok(CampaignRequest {
            name: DEFAULT_CAMPAIGN_NAME.to_string(),
            phone_number_id: phone_number_id.to_string(),
            assistant_id: assistant_id.to_string(),
            customer: Customer { number, name: None },
        })
    }
}
