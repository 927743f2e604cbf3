use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera on phones.
    Environment,
    User,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub ideal: u32,
    pub min: Option<u32>,
}

/// One rung of the fallback ladder. `None` fields are left to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub facing_mode: Option<FacingMode>,
}

impl VideoConstraints {
    pub fn preferred() -> Self {
        Self {
            width: Some(Dimension {
                ideal: 640,
                min: Some(320),
            }),
            height: Some(Dimension {
                ideal: 480,
                min: Some(240),
            }),
            facing_mode: Some(FacingMode::Environment),
        }
    }

    pub fn relaxed() -> Self {
        Self {
            width: Some(Dimension {
                ideal: 640,
                min: None,
            }),
            height: Some(Dimension {
                ideal: 480,
                min: None,
            }),
            facing_mode: None,
        }
    }

    pub fn any() -> Self {
        Self {
            width: None,
            height: None,
            facing_mode: None,
        }
    }

    /// Tried in order until one opens.
    pub fn ladder() -> [Self; 3] {
        [Self::preferred(), Self::relaxed(), Self::any()]
    }

    pub fn is_any(&self) -> bool {
        *self == Self::any()
    }

    /// The `getUserMedia`-shaped constraint object, for adapters that hand
    /// constraints to a media capture API.
    pub fn to_media_constraints(&self) -> Value {
        if self.is_any() {
            return json!({ "video": true });
        }

        let mut video = Map::new();
        if let Some(width) = self.width {
            video.insert("width".to_string(), dimension_json(width));
        }
        if let Some(height) = self.height {
            video.insert("height".to_string(), dimension_json(height));
        }
        if let Some(facing_mode) = self.facing_mode {
            video.insert("facingMode".to_string(), json!(facing_mode.as_str()));
        }
        json!({ "video": video })
    }
}

fn dimension_json(dimension: Dimension) -> Value {
    match dimension.min {
        Some(min) => json!({ "ideal": dimension.ideal, "min": min }),
        None => json!({ "ideal": dimension.ideal }),
    }
}
