//! Session configuration.
//!
//! Both structs deserialize from partial input: every missing field takes its
//! default, so a host only sends what it wants to change.

use serde::{Deserialize, Serialize};

use crate::decode::FilterType;
use crate::error::CropError;
use crate::transform::Rotation;

/// Default hit-test radius around region edges, in screen pixels.
pub const DEFAULT_HIT_TOLERANCE: f64 = 20.0;

/// Default minimum crop width/height, in image pixels.
pub const DEFAULT_MIN_CROP_SIZE: f64 = 25.0;

/// Default JPEG quality for the output sink.
pub const DEFAULT_QUALITY: u8 = 90;

/// Largest output width or height; crop geometry is `i32`.
pub const MAX_OUTPUT_DIMENSION: u32 = i32::MAX as u32;

/// How the cropped pixels are sized before delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSpec {
    /// Fixed output width. Only honored together with `height`.
    pub width: Option<u32>,
    /// Fixed output height. Only honored together with `width`.
    pub height: Option<u32>,
    /// With a fixed size: scale to fit (true) or center without scaling (false).
    pub scale: bool,
    /// Whether the fit policy may enlarge crops smaller than the target.
    pub scale_up: bool,
    /// Downscale-only bound used when no fixed size is set.
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Carried to the result for downstream masking; never applied here.
    pub circular: bool,
    /// Resampling filter for every scaling step.
    pub filter: FilterType,
    /// JPEG quality (1-100) used when writing to a sink.
    pub quality: u8,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            scale: false,
            scale_up: true,
            max_width: None,
            max_height: None,
            circular: false,
            filter: FilterType::default(),
            quality: DEFAULT_QUALITY,
        }
    }
}

impl OutputSpec {
    /// Fixed output size when both dimensions are set and non-zero.
    pub fn fixed_size(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    pub fn has_max_box(&self) -> bool {
        self.max_width.is_some_and(|m| m > 0) || self.max_height.is_some_and(|m| m > 0)
    }

    pub fn validate(&self) -> Result<(), CropError> {
        if !(1..=100).contains(&self.quality) {
            return Err(CropError::InvalidConfig(format!(
                "quality must be within 1..=100, got {}",
                self.quality
            )));
        }
        if self.width.is_some() != self.height.is_some() {
            return Err(CropError::InvalidConfig(
                "output width and height must be set together".to_string(),
            ));
        }
        if self.fixed_size().is_none() && self.width.is_some() {
            return Err(CropError::InvalidConfig(
                "output width and height must be non-zero".to_string(),
            ));
        }
        let dimensions = [
            ("width", self.width),
            ("height", self.height),
            ("max_width", self.max_width),
            ("max_height", self.max_height),
        ];
        for (name, value) in dimensions {
            if let Some(value) = value.filter(|&v| v > MAX_OUTPUT_DIMENSION) {
                return Err(CropError::InvalidConfig(format!(
                    "output {name} must be at most {MAX_OUTPUT_DIMENSION}, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Everything a crop session needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Aspect lock numerator; 0 in either component means unlocked.
    pub aspect_x: u32,
    pub aspect_y: u32,
    /// Display rotation override. `None` reads the EXIF orientation.
    pub rotation: Option<Rotation>,
    pub output: OutputSpec,
    /// Screen-space radius for edge hit-testing.
    pub hit_tolerance: f64,
    /// Image-space floor for the crop width and height.
    pub min_crop_size: f64,
    /// Upper bound in bytes for source plus output buffers on the full-decode
    /// path. `None` relies on the allocator alone.
    pub memory_budget: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            aspect_x: 0,
            aspect_y: 0,
            rotation: None,
            output: OutputSpec::default(),
            hit_tolerance: DEFAULT_HIT_TOLERANCE,
            min_crop_size: DEFAULT_MIN_CROP_SIZE,
            memory_budget: None,
        }
    }
}

impl SessionConfig {
    /// Locked aspect ratio as `(x, y)`, if both components are non-zero.
    pub fn aspect(&self) -> Option<(u32, u32)> {
        (self.aspect_x != 0 && self.aspect_y != 0).then_some((self.aspect_x, self.aspect_y))
    }

    /// Reject values the session cannot work with.
    pub fn validate(&self) -> Result<(), CropError> {
        if !self.hit_tolerance.is_finite() || self.hit_tolerance < 0.0 {
            return Err(CropError::InvalidConfig(format!(
                "hit_tolerance must be a non-negative number, got {}",
                self.hit_tolerance
            )));
        }
        if !self.min_crop_size.is_finite() || self.min_crop_size < 1.0 {
            return Err(CropError::InvalidConfig(format!(
                "min_crop_size must be at least 1, got {}",
                self.min_crop_size
            )));
        }
        self.output.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.hit_tolerance, 20.0);
        assert_eq!(config.min_crop_size, 25.0);
        assert_eq!(config.output.quality, 90);
        assert!(config.output.scale_up);
        assert_eq!(config.aspect(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{ "aspect_x": 16, "aspect_y": 9, "rotation": 270, "output": { "max_width": 800 } }"#,
        )
        .unwrap();

        assert_eq!(config.aspect(), Some((16, 9)));
        assert_eq!(config.rotation, Some(Rotation::Deg270));
        assert_eq!(config.output.max_width, Some(800));
        assert_eq!(config.output.quality, 90);
        assert_eq!(config.hit_tolerance, 20.0);
    }

    #[test]
    fn test_bad_rotation_rejected_on_deserialize() {
        let result: Result<SessionConfig, _> = serde_json::from_str(r#"{ "rotation": 45 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_single_aspect_component_is_unlocked() {
        let config = SessionConfig {
            aspect_x: 3,
            ..Default::default()
        };
        assert_eq!(config.aspect(), None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SessionConfig::default();
        config.min_crop_size = 0.0;
        assert!(matches!(config.validate(), Err(CropError::InvalidConfig(_))));

        let mut config = SessionConfig::default();
        config.hit_tolerance = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.output.quality = 0;
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.output.width = Some(100);
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.output.width = Some(0);
        config.output.height = Some(100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_output_dimensions() {
        let mut config = SessionConfig::default();
        config.output.width = Some(u32::MAX);
        config.output.height = Some(u32::MAX);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output width must be at most 2147483647"), "{err}");

        let mut config = SessionConfig::default();
        config.output.max_height = Some(MAX_OUTPUT_DIMENSION + 1);
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.output.width = Some(MAX_OUTPUT_DIMENSION);
        config.output.height = Some(MAX_OUTPUT_DIMENSION);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fixed_size_and_max_box() {
        let mut spec = OutputSpec::default();
        assert_eq!(spec.fixed_size(), None);
        assert!(!spec.has_max_box());

        spec.width = Some(200);
        spec.height = Some(100);
        assert_eq!(spec.fixed_size(), Some((200, 100)));

        spec.max_height = Some(50);
        assert!(spec.has_max_box());
    }
}
