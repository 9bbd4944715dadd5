//! Screen capability: what is currently visible.
//!
//! Capture and OCR are outside this crate; the module serves the last frame
//! pushed into it by whatever observes the display.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use deskpilot_core::{
    traits::CapabilityModule,
    types::{CapabilityOutput, ParamBag},
    Error, Result,
};

pub const MODULE_NAME: &str = "screen";

/// Last observed screen contents.
#[derive(Debug, Default, Clone)]
pub struct ScreenFrame {
    /// Frontmost application or page.
    pub active_surface: String,
    /// Text recognised on screen.
    pub text: String,
    /// Labels of detected buttons.
    pub buttons: Vec<String>,
}

pub struct ScreenModule {
    frame: RwLock<ScreenFrame>,
}

impl ScreenModule {
    pub fn new() -> Self {
        Self {
            frame: RwLock::new(ScreenFrame::default()),
        }
    }

    /// Start with a given frame.
    pub fn with_frame(frame: ScreenFrame) -> Self {
        Self {
            frame: RwLock::new(frame),
        }
    }

    /// Replace the current frame.
    pub async fn update(&self, frame: ScreenFrame) {
        *self.frame.write().await = frame;
    }

    pub async fn frame(&self) -> ScreenFrame {
        self.frame.read().await.clone()
    }
}

impl Default for ScreenModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapabilityModule for ScreenModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn description(&self) -> &str {
        "Reports the active application, visible text and detected buttons"
    }

    fn operations(&self) -> Vec<String> {
        vec![
            "capture".into(),
            "detect_buttons".into(),
            "extract_text".into(),
        ]
    }

    async fn invoke(&self, operation: &str, _params: ParamBag) -> Result<CapabilityOutput> {
        let frame = self.frame.read().await;

        match operation {
            "capture" => {
                let surface = if frame.active_surface.is_empty() {
                    "desktop"
                } else {
                    frame.active_surface.as_str()
                };
                Ok(CapabilityOutput::ok(format!("Captured {}", surface))
                    .with_field("activeSurface", frame.active_surface.clone())
                    .with_field("text", frame.text.clone())
                    .with_field("buttons", json!(frame.buttons)))
            }
            "detect_buttons" => Ok(CapabilityOutput::ok(format!(
                "Detected {} buttons",
                frame.buttons.len()
            ))
            .with_verification(!frame.buttons.is_empty())
            .with_field("buttons", json!(frame.buttons))),
            "extract_text" => Ok(CapabilityOutput::ok(format!(
                "Extracted {} characters",
                frame.text.chars().count()
            ))
            .with_verification(!frame.text.is_empty())
            .with_field("text", frame.text.clone())),
            other => Err(Error::operation_not_found(MODULE_NAME, other)),
        }
    }
}
