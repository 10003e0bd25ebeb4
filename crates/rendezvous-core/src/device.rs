//! Device descriptors shown to other peers.

use serde::{Deserialize, Serialize};

/// Fallback when neither OS, model nor browser could be determined.
pub const UNKNOWN_DEVICE: &str = "Unknown Device";

/// Structured result of classifying a client's user agent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceClassification {
    /// Hardware model, e.g. `iPhone`.
    pub model: Option<String>,
    /// Operating system name, e.g. `Mac OS`.
    pub os: Option<String>,
    /// Browser name, e.g. `Firefox`.
    pub browser: Option<String>,
    /// Device form factor, e.g. `mobile` or `tablet`.
    pub device_type: Option<String>,
}

/// Public device descriptor of a peer (the `name` field of peer info).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceName {
    /// Hardware model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Operating system name, verbatim from classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// Browser name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    /// Device form factor.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    /// Human-readable device label composed from OS and model/browser.
    pub device_name: String,
    /// Deterministic display name derived from the peer id.
    pub display_name: String,
}

impl DeviceName {
    /// Assemble a descriptor from a classification and a display name.
    pub fn new(classification: DeviceClassification, display_name: String) -> Self {
        let device_name = compose_device_name(&classification);
        Self {
            model: classification.model,
            os: classification.os,
            browser: classification.browser,
            device_type: classification.device_type,
            device_name,
            display_name,
        }
    }
}

/// Build the `"<OS> <model|browser>"` label.
///
/// `Mac OS` is shortened to `Mac`. Falls back to [`UNKNOWN_DEVICE`].
pub fn compose_device_name(classification: &DeviceClassification) -> String {
    let mut name = String::new();
    if let Some(os) = non_empty(classification.os.as_deref()) {
        name.push_str(&os.replace("Mac OS", "Mac"));
        name.push(' ');
    }
    if let Some(model) = non_empty(classification.model.as_deref()) {
        name.push_str(model);
    } else if let Some(browser) = non_empty(classification.browser.as_deref()) {
        name.push_str(browser);
    }

    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNKNOWN_DEVICE.to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
