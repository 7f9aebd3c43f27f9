//! Application configuration document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::AppInfo;
use crate::error::{CompanionError, Result};

const DEFAULT_SYSTEM_PROMPT: &str = "Eres un asistente útil y paciente, optimizado para usuarios mayores. \
Tus respuestas deben ser breves, claras y sin tecnicismos. Siempre sé empático y considera que el \
usuario puede tener limitaciones visuales o auditivas.";

/// Top-level string fields that must be present and non-empty.
const REQUIRED_TEXT_FIELDS: [&str; 3] = ["appVersion", "apiEndpoint", "systemPrompt"];
/// Top-level sections that must be present as JSON objects.
const REQUIRED_SECTIONS: [&str; 4] = ["features", "accessibility", "network", "ui"];

/// Accessibility defaults pushed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilitySettings {
    pub min_font_size: u32,
    pub allow_font_scaling: bool,
    pub min_touch_size: u32,
    pub high_contrast: bool,
}

/// Network tunables delivered with the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettings {
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    pub allow_cleartext_traffic: bool,
}

/// UI color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSettings {
    pub theme: Theme,
    pub language: String,
}

/// The full application configuration.
///
/// Instances are never mutated after construction; a newer config replaces
/// the current one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub app_version: String,
    pub api_endpoint: String,
    pub system_prompt: String,
    pub features: BTreeMap<String, bool>,
    pub accessibility: AccessibilitySettings,
    pub network: NetworkSettings,
    pub ui: UiSettings,
}

impl AppConfig {
    /// Build a config from an untrusted JSON value.
    ///
    /// The payload must be an object carrying every required top-level field
    /// before it is decoded into the typed record.
    pub fn from_value(value: Value) -> Result<Self> {
        validate_structure(&value)?;
        serde_json::from_value(value).map_err(|e| CompanionError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Parse and validate a config from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Check whether a named feature is switched on. Unknown features are off.
    pub fn is_feature_enabled(&self, feature: &str) -> bool {
        self.features.get(feature).copied().unwrap_or(false)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let features = [
            "voiceAssistant",
            "healthTracking",
            "reminders",
            "emergencyContacts",
            "offlineMode",
        ]
        .into_iter()
        .map(|name| (name.to_string(), true))
        .collect();

        Self {
            app_version: AppInfo::APP_VERSION.to_string(),
            api_endpoint: "https://api.manus.im".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            features,
            accessibility: AccessibilitySettings {
                min_font_size: 16,
                allow_font_scaling: true,
                min_touch_size: 60,
                high_contrast: false,
            },
            network: NetworkSettings {
                retry_attempts: 3,
                retry_delay_ms: 2000,
                timeout_ms: 10_000,
                allow_cleartext_traffic: true,
            },
            ui: UiSettings {
                theme: Theme::Light,
                language: "es".to_string(),
            },
        }
    }
}

fn validate_structure(value: &Value) -> Result<()> {
    let object = value.as_object().ok_or_else(|| CompanionError::InvalidConfig {
        message: "config payload is not a JSON object".to_string(),
    })?;

    for field in REQUIRED_TEXT_FIELDS {
        match object.get(field).and_then(Value::as_str) {
            Some(text) if !text.is_empty() => {}
            _ => {
                return Err(CompanionError::InvalidConfig {
                    message: format!("missing or empty field `{}`", field),
                })
            }
        }
    }

    for section in REQUIRED_SECTIONS {
        if !object.get(section).is_some_and(Value::is_object) {
            return Err(CompanionError::InvalidConfig {
                message: format!("missing section `{}`", section),
            });
        }
    }

    Ok(())
}
