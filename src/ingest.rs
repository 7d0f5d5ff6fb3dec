//! Scan payload parsing, manual entry validation and scan debouncing.

use serde_json::{Map, Value};
use tokio::time::{Duration, Instant};

use crate::{error::CheckInError, record::CheckInDraft};

/// JSON key holding the attendee identifier in a scanned code.
pub const IDENTIFIER_KEY: &str = "NIK";
/// JSON key holding the attendee name in a scanned code.
pub const NAME_KEY: &str = "Nama";

/// Parses a decoded QR payload of the form `{"NIK": "...", "Nama": "..."}`.
///
/// Extra keys are ignored. Anything else is [`CheckInError::InvalidPayload`].
pub fn parse_scan_payload(text: &str) -> Result<CheckInDraft, CheckInError> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| CheckInError::InvalidPayload(format!("not JSON: {e}")))?;
    let Value::Object(fields) = value else {
        return Err(CheckInError::InvalidPayload(
            "expected a JSON object".to_string(),
        ));
    };

    CheckInDraft::new(
        string_field(&fields, IDENTIFIER_KEY)?,
        string_field(&fields, NAME_KEY)?,
    )
}

fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a str, CheckInError> {
    match fields.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(CheckInError::InvalidPayload(format!("{key} is not a string"))),
        None => Err(CheckInError::InvalidPayload(format!("missing {key}"))),
    }
}

/// Validates a manually typed identifier and name.
pub fn validate_manual(identifier: &str, display_name: &str) -> Result<CheckInDraft, CheckInError> {
    CheckInDraft::new(identifier, display_name)
}

/// Suppresses scans for a fixed window after each accepted scan.
#[derive(Debug, Clone)]
pub struct ScanDebouncer {
    cooldown: Duration,
    quiet_until: Option<Instant>,
}

impl ScanDebouncer {
    /// Debouncer with no window armed. A zero `cooldown` never suppresses.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            quiet_until: None,
        }
    }

    /// True while the window armed by the last accepted scan is still open.
    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.quiet_until.is_some_and(|until| now < until)
    }

    /// Opens a new window starting at `now`.
    pub fn arm(&mut self, now: Instant) {
        if self.cooldown.is_zero() {
            return;
        }
        self.quiet_until = Some(now + self.cooldown);
    }
}
