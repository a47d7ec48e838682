use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Capability key listing the orientations a device can face (`user`, `environment`).
pub const FACING_MODE: &str = "facingMode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One advertised capability: a numeric range or a set of allowed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Capability {
    Range { min: f64, max: f64 },
    Values(Vec<String>),
}

pub type Capabilities = BTreeMap<String, Capability>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// A device as listed by a backend, before its capabilities are probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub label: String,
    pub kind: DeviceKind,
}

/// A video input produced by one enumeration pass.
///
/// Descriptors go stale when hardware changes; nothing watches for that, so a
/// fresh enumeration is the only way to refresh them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub device_id: String,
    pub label: String,
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl DeviceDescriptor {
    pub fn facing_modes(&self) -> &[String] {
        match self.capabilities.get(FACING_MODE) {
            Some(Capability::Values(values)) => values,
            _ => &[],
        }
    }
}

/// Stream request. `device_id = None` asks for any camera, which is what the
/// permission probe uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub device_id: Option<String>,
    pub ideal: Dimensions,
}

impl StreamConstraints {
    pub fn any(ideal: Dimensions) -> Self {
        Self {
            device_id: None,
            ideal,
        }
    }

    pub fn exact(device_id: impl Into<String>, ideal: Dimensions) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ideal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_serialize_like_media_track_capabilities() {
        let mut caps = Capabilities::new();
        caps.insert("width".into(), Capability::Range { min: 320.0, max: 1920.0 });
        caps.insert(FACING_MODE.into(), Capability::Values(vec!["user".into()]));

        let json = serde_json::to_value(&caps).unwrap();
        assert_eq!(json["width"]["max"], 1920.0);
        assert_eq!(json["facingMode"][0], "user");

        let back: Capabilities = serde_json::from_value(json).unwrap();
        assert_eq!(back, caps);
    }

    #[test]
    fn facing_modes_ignore_ranges() {
        let mut device = DeviceDescriptor {
            device_id: "a".into(),
            label: "Cam".into(),
            capabilities: Capabilities::new(),
        };
        assert!(device.facing_modes().is_empty());

        device
            .capabilities
            .insert(FACING_MODE.into(), Capability::Range { min: 0.0, max: 1.0 });
        assert!(device.facing_modes().is_empty());
    }
}
