//! Window plan for the two kiosk displays.

use std::time::Duration;

pub const MAIN_WINDOW: &str = "main";
pub const CLOUD_WINDOW: &str = "cloud";

pub const DEFAULT_WIDTH: f64 = 900.0;
pub const DEFAULT_HEIGHT: f64 = 600.0;

/// Delay before each window goes fullscreen, counted from the previous step.
pub const FULLSCREEN_STEP: Duration = Duration::from_millis(1500);

/// Windows go fullscreen in this order.
pub const FULLSCREEN_ORDER: [&str; 2] = [CLOUD_WINDOW, MAIN_WINDOW];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub label: &'static str,
    /// `None` keeps the platform's default placement.
    pub bounds: Option<DisplayBounds>,
}

/// `main` on the first display and `cloud` on the second, when there is a
/// second one. Otherwise both windows stay where the platform puts them.
pub fn plan_windows(displays: &[DisplayBounds]) -> [WindowPlan; 2] {
    let spread = displays.len() > 1;
    let bounds = |index: usize| spread.then(|| displays[index]);
    [
        WindowPlan {
            label: MAIN_WINDOW,
            bounds: bounds(0),
        },
        WindowPlan {
            label: CLOUD_WINDOW,
            bounds: bounds(1),
        },
    ]
}

/// Event telling a freshly loaded page which role its window plays.
pub fn role_event(label: &str) -> Option<&'static str> {
    match label {
        MAIN_WINDOW => Some("become-main"),
        CLOUD_WINDOW => Some("become-cloud"),
        _ => None,
    }
}
