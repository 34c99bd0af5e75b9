//! Activity Log
//!
//! Per-request outcome records for the account flows. Handlers receive an
//! [`ActivityLog`] through the application state instead of configuring a
//! logger themselves; the sink behind it is whatever `log` backend the binary
//! installed.

use log::Level;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::utils::security::is_sensitive_field;

/// Replacement written in place of credential values
pub const MASK: &str = "********";

/// Emits one structured line per handled submission
#[derive(Debug, Clone)]
pub struct ActivityLog {
    target: String,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TARGET)
    }
}

impl ActivityLog {
    pub const DEFAULT_TARGET: &'static str = "account_service::activity";

    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Records a successful submission at info level
    pub fn success<T: Serialize>(&self, message: &str, fields: &T) {
        self.emit(Level::Info, message, fields);
    }

    /// Records a rejected or failed submission at error level
    pub fn failure<T: Serialize>(&self, message: &str, fields: &T) {
        self.emit(Level::Error, message, fields);
    }

    fn emit<T: Serialize>(&self, level: Level, message: &str, fields: &T) {
        log::log!(target: self.target.as_str(), level, "{}", format_entry(message, fields));
    }
}

/// Renders `message` followed by the masked submitted fields
pub fn format_entry<T: Serialize>(message: &str, fields: &T) -> String {
    let fields = serde_json::to_value(fields)
        .map(|value| mask_sensitive(&value))
        .unwrap_or(JsonValue::Null);
    format!("{}. Request: {}", message.trim_end_matches('.'), fields)
}

/// Copy of `value` with every credential-like field replaced by [`MASK`]
pub fn mask_sensitive(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let masked: Map<String, JsonValue> = map
                .iter()
                .map(|(key, val)| {
                    let val = if is_sensitive_field(key) {
                        JsonValue::String(MASK.to_string())
                    } else {
                        mask_sensitive(val)
                    };
                    (key.clone(), val)
                })
                .collect();
            JsonValue::Object(masked)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(mask_sensitive).collect()),
        other => other.clone(),
    }
}
