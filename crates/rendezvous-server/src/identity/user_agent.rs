//! Heuristic `User-Agent` classification.

use std::sync::LazyLock;

use regex::Regex;
use rendezvous_core::DeviceClassification;

static ANDROID_MODEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Android [\d.]+; ([^;)]+?)(?: Build/|\))").ok());

// Order matters: Chromium-based browsers also advertise `Chrome/` and `Safari/`.
static BROWSERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"Edg(?:e|A|iOS)?/", "Edge"),
        (r"OPR/|Opera", "Opera"),
        (r"SamsungBrowser/", "Samsung Browser"),
        (r"Firefox/|FxiOS/", "Firefox"),
        (r"Chrome/|CriOS/", "Chrome"),
        (r"Mobile/.*Safari/|Version/.*Mobile.*Safari/", "Mobile Safari"),
        (r"Version/.*Safari/", "Safari"),
    ]
    .into_iter()
    .filter_map(|(pattern, name)| Some((Regex::new(pattern).ok()?, name)))
    .collect()
});

/// Classify a `User-Agent` header into OS, model, browser and form factor.
///
/// Unrecognized parts are left as `None`.
pub fn classify(user_agent: &str) -> DeviceClassification {
    let mut device = DeviceClassification::default();

    if let Some(model) = ["iPhone", "iPad", "iPod"]
        .into_iter()
        .find(|model| user_agent.contains(model))
    {
        device.os = Some("iOS".into());
        device.model = Some(model.into());
        device.device_type = Some(if model == "iPad" { "tablet" } else { "mobile" }.into());
    } else if user_agent.contains("Android") {
        device.os = Some("Android".into());
        device.model = ANDROID_MODEL
            .as_ref()
            .and_then(|re| re.captures(user_agent))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_owned())
            .filter(|m| !m.is_empty() && m != "K");
        device.device_type = Some(if user_agent.contains("Mobile") { "mobile" } else { "tablet" }.into());
    } else if user_agent.contains("Windows") {
        device.os = Some("Windows".into());
    } else if user_agent.contains("CrOS") {
        device.os = Some("Chromium OS".into());
    } else if user_agent.contains("Macintosh") || user_agent.contains("Mac OS X") {
        device.os = Some("Mac OS".into());
    } else if user_agent.contains("Linux") {
        device.os = Some("Linux".into());
    }

    device.browser = BROWSERS
        .iter()
        .find(|(pattern, _)| pattern.is_match(user_agent))
        .map(|(_, name)| (*name).to_owned());

    device
}
