//! Compbatch Core Type Definitions
//!
//! Defines fundamental types used throughout the engine.

// =============================================================================
// ID Types
// =============================================================================

/// Library item unique identifier (ULID)
pub type ItemId = String;

/// Library folder unique identifier (ULID)
pub type FolderId = String;

/// Render job unique identifier (ULID)
pub type JobId = String;

/// Generates a new ULID string identifier
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

// =============================================================================
// Scene Format
// =============================================================================

use serde::{Deserialize, Serialize};

/// Output format of a scene (canvas size, frame rate, duration)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFormat {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Frame rate
    pub fps: f64,
    /// Duration in seconds
    pub duration_sec: f64,
}

impl SceneFormat {
    /// Creates a format, falling back to sane values for degenerate input
    pub fn new(width: u32, height: u32, fps: f64, duration_sec: f64) -> Self {
        let (width, height) = if width == 0 || height == 0 {
            tracing::warn!("SceneFormat created with zero canvas, defaulting to 1920x1080");
            (1920, 1080)
        } else {
            (width, height)
        };
        let fps = if fps <= 0.0 { 25.0 } else { fps };
        let duration_sec = duration_sec.max(0.0);
        Self {
            width,
            height,
            fps,
            duration_sec,
        }
    }

    /// Returns the aspect ratio as a float
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for SceneFormat {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 25.0,
            duration_sec: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 26);
    }

    #[test]
    fn test_scene_format_fallbacks() {
        let fmt = SceneFormat::new(0, 0, -1.0, -5.0);
        assert_eq!(fmt.width, 1920);
        assert_eq!(fmt.height, 1080);
        assert_eq!(fmt.fps, 25.0);
        assert_eq!(fmt.duration_sec, 0.0);
    }

    #[test]
    fn test_scene_format_aspect_ratio() {
        let fmt = SceneFormat::new(1920, 1080, 25.0, 10.0);
        assert!((fmt.aspect_ratio() - 16.0 / 9.0).abs() < 1e-9);
    }
}
