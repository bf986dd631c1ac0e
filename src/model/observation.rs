use std::fmt;

use serde::{Deserialize, Serialize};

use super::feedback::ActionFeedback;
use super::timestamp::UtcTimestamp;

/// 视口坐标下的元素边界
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// 含 NaN 的坐标视为无效
    pub fn is_valid(&self) -> bool {
        self.x_min <= self.x_max && self.y_min <= self.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x_min + self.width() / 2.0,
            self.y_min + self.height() / 2.0,
        )
    }
}

/// 感知层报告的可交互 DOM 元素
///
/// 屏幕外元素可以 `is_clickable` 为真而 `is_visible` 为假。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyElement {
    pub element_id: String,
    pub tag_name: String,
    pub xpath: String,
    pub inner_text: String,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub is_clickable: bool,
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_hint: Option<String>,
}

impl KeyElement {
    pub fn new(
        element_id: impl Into<String>,
        tag_name: impl Into<String>,
        xpath: impl Into<String>,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            element_id: element_id.into(),
            tag_name: tag_name.into(),
            xpath: xpath.into(),
            inner_text: String::new(),
            is_visible: false,
            is_clickable: false,
            bbox,
            purpose_hint: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.inner_text = text.into();
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.is_visible = visible;
        self
    }

    pub fn clickable(mut self, clickable: bool) -> Self {
        self.is_clickable = clickable;
        self
    }

    pub fn with_purpose_hint(mut self, hint: impl Into<String>) -> Self {
        self.purpose_hint = Some(hint.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BrowserHealth {
    #[default]
    Healthy,
    Degraded,
    Unresponsive,
    Other(String),
}

impl BrowserHealth {
    pub fn as_str(&self) -> &str {
        match self {
            BrowserHealth::Healthy => "healthy",
            BrowserHealth::Degraded => "degraded",
            BrowserHealth::Unresponsive => "unresponsive",
            BrowserHealth::Other(raw) => raw,
        }
    }
}

impl From<String> for BrowserHealth {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "healthy" => BrowserHealth::Healthy,
            "degraded" => BrowserHealth::Degraded,
            "unresponsive" => BrowserHealth::Unresponsive,
            _ => BrowserHealth::Other(raw),
        }
    }
}

impl From<BrowserHealth> for String {
    fn from(health: BrowserHealth) -> Self {
        health.as_str().to_string()
    }
}

impl fmt::Display for BrowserHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 浏览器的一次感知快照
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebObservation {
    #[serde(default = "UtcTimestamp::now")]
    pub observation_timestamp_utc: UtcTimestamp,
    pub current_url: String,
    pub http_status_code: i32,
    pub page_load_time_ms: i64,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub key_elements: Vec<KeyElement>,
    #[serde(default)]
    pub screenshot_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action_feedback: Option<ActionFeedback>,
    #[serde(default)]
    pub memory_context: String,
    #[serde(default)]
    pub browser_health_status: BrowserHealth,
}

impl WebObservation {
    pub fn builder(current_url: impl Into<String>) -> ObservationBuilder {
        ObservationBuilder::new(current_url)
    }

    pub fn element(&self, element_id: &str) -> Option<&KeyElement> {
        self.key_elements
            .iter()
            .find(|element| element.element_id == element_id)
    }

    pub fn clickable_elements(&self) -> impl Iterator<Item = &KeyElement> {
        self.key_elements.iter().filter(|element| element.is_clickable)
    }

    /// 用给定的反馈与记忆覆盖感知层填入的值
    pub fn with_feedback(
        mut self,
        feedback: Option<ActionFeedback>,
        memory_context: impl Into<String>,
    ) -> WebObservation {
        self.last_action_feedback = feedback;
        self.memory_context = memory_context.into();
        self
    }

    pub fn carries(&self, feedback: Option<&ActionFeedback>, memory_context: &str) -> bool {
        self.last_action_feedback.as_ref() == feedback && self.memory_context == memory_context
    }
}

pub struct ObservationBuilder {
    observation: WebObservation,
}

impl ObservationBuilder {
    pub fn new(current_url: impl Into<String>) -> Self {
        Self {
            observation: WebObservation {
                observation_timestamp_utc: UtcTimestamp::now(),
                current_url: current_url.into(),
                http_status_code: 200,
                page_load_time_ms: 0,
                is_authenticated: false,
                key_elements: Vec::new(),
                screenshot_available: false,
                last_action_feedback: None,
                memory_context: String::new(),
                browser_health_status: BrowserHealth::Healthy,
            },
        }
    }

    pub fn timestamp(mut self, timestamp: UtcTimestamp) -> Self {
        self.observation.observation_timestamp_utc = timestamp;
        self
    }

    pub fn http_status(mut self, status: i32) -> Self {
        self.observation.http_status_code = status;
        self
    }

    pub fn page_load_time_ms(mut self, millis: i64) -> Self {
        self.observation.page_load_time_ms = millis;
        self
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.observation.is_authenticated = authenticated;
        self
    }

    pub fn element(mut self, element: KeyElement) -> Self {
        self.observation.key_elements.push(element);
        self
    }

    pub fn elements(mut self, elements: impl IntoIterator<Item = KeyElement>) -> Self {
        self.observation.key_elements.extend(elements);
        self
    }

    pub fn screenshot_available(mut self, available: bool) -> Self {
        self.observation.screenshot_available = available;
        self
    }

    pub fn feedback(mut self, feedback: Option<ActionFeedback>) -> Self {
        self.observation.last_action_feedback = feedback;
        self
    }

    pub fn memory_context(mut self, memory: impl Into<String>) -> Self {
        self.observation.memory_context = memory.into();
        self
    }

    pub fn health(mut self, health: BrowserHealth) -> Self {
        self.observation.browser_health_status = health;
        self
    }

    pub fn build(self) -> WebObservation {
        self.observation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bbox_validity() {
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 0.0).is_valid());
        assert!(BoundingBox::new(10.0, 20.0, 110.0, 40.0).is_valid());
        assert!(!BoundingBox::new(10.0, 20.0, 5.0, 40.0).is_valid());
        assert!(!BoundingBox::new(0.0, 50.0, 10.0, 40.0).is_valid());
        assert!(!BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
        assert_eq!(BoundingBox::new(0.0, 0.0, 10.0, 20.0).center(), (5.0, 10.0));
    }

    #[test]
    fn health_parses_closed_set_and_keeps_unknown() {
        assert_eq!(BrowserHealth::from("Degraded".to_string()), BrowserHealth::Degraded);
        let other: BrowserHealth = serde_json::from_value(json!("crashed")).unwrap();
        assert_eq!(other, BrowserHealth::Other("crashed".into()));
        assert_eq!(serde_json::to_value(&other).unwrap(), json!("crashed"));
    }

    #[test]
    fn missing_timestamp_defaults_to_now() {
        let observation: WebObservation = serde_json::from_value(json!({
            "current_url": "https://example.com",
            "http_status_code": 200,
            "page_load_time_ms": 120,
            "memory_context": ""
        }))
        .unwrap();
        assert!(observation.key_elements.is_empty());
        assert_eq!(observation.browser_health_status, BrowserHealth::Healthy);
        assert!(observation.last_action_feedback.is_none());
    }

    #[test]
    fn offscreen_clickable_elements_are_allowed() {
        let bbox = BoundingBox::new(0.0, 900.0, 80.0, 930.0);
        let element = KeyElement::new("btn-1", "button", "//button[1]", bbox)
            .clickable(true)
            .visible(false);
        let observation = WebObservation::builder("https://example.com").element(element).build();
        assert_eq!(observation.clickable_elements().count(), 1);
        assert!(observation.element("btn-1").is_some());
    }

    #[test]
    fn with_feedback_replaces_carried_state() {
        let observation = WebObservation::builder("https://example.com")
            .memory_context("stale")
            .build();
        let feedback = ActionFeedback::failed("E_X", "boom");
        assert!(!observation.carries(Some(&feedback), "#1 click -> FAILED"));

        let seeded = observation.with_feedback(Some(feedback.clone()), "#1 click -> FAILED");
        assert!(seeded.carries(Some(&feedback), "#1 click -> FAILED"));
        assert_eq!(seeded.current_url, "https://example.com");
    }
}
