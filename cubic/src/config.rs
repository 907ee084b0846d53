//! Config - Tunables for the cube grid, camera and controls
//!
//! Every field has a default matching the stock CuBiC scene, so an empty JSON
//! object (or no config at all) gives the 16x16x16 grid inside a 128-unit cube.
//!
//! # Example
//!
//! ```rust
//! let config = cubic::Config::new()
//!     .damping_factor(0.1)
//!     .camera_fov(60.0);
//! assert!(config.validate().is_ok());
//! ```

use crate::{Error, Result};
use serde::Deserialize;

/// Cells per axis
pub const GRID_SIZE: u32 = 16;
/// Edge length of the containing cube, in world units
pub const EXTENT: f32 = 128.0;
/// Orbit damping applied per update
pub const DAMPING_FACTOR: f32 = 0.05;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid_size: u32,
    pub extent: f32,
    pub damping_factor: f32,
    pub camera_fov: f32,
    pub camera_near: f32,
    pub camera_far: f32,
    pub background: [f32; 4],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            extent: EXTENT,
            damping_factor: DAMPING_FACTOR,
            camera_fov: 75.0,
            camera_near: 0.1,
            camera_far: 1000.0,
            background: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn extent(mut self, extent: f32) -> Self {
        self.extent = extent;
        self
    }

    pub fn damping_factor(mut self, damping_factor: f32) -> Self {
        self.damping_factor = damping_factor;
        self
    }

    /// Vertical field of view in degrees.
    pub fn camera_fov(mut self, fov_degrees: f32) -> Self {
        self.camera_fov = fov_degrees;
        self
    }

    pub fn background(mut self, color: [f32; 4]) -> Self {
        self.background = color;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_size < 2 {
            return Err(Error::InvalidConfig(format!(
                "grid_size must be at least 2, got {}",
                self.grid_size
            )));
        }
        if !(self.extent > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "extent must be positive, got {}",
                self.extent
            )));
        }
        if !(self.damping_factor > 0.0 && self.damping_factor <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "damping_factor must be in (0, 1], got {}",
                self.damping_factor
            )));
        }
        if !(self.camera_fov > 0.0 && self.camera_fov < 180.0) {
            return Err(Error::InvalidConfig(format!(
                "camera_fov must be in (0, 180), got {}",
                self.camera_fov
            )));
        }
        if !(self.camera_near > 0.0 && self.camera_far > self.camera_near) {
            return Err(Error::InvalidConfig(format!(
                "camera clip planes must satisfy 0 < near < far, got {}..{}",
                self.camera_near, self.camera_far
            )));
        }
        Ok(())
    }
}
