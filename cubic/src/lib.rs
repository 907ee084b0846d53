//! CuBiC - An interactive 16x16x16 grid of colored cubes
//!
//! This crate is the platform-agnostic core. It maps every grid cell to a
//! world position and a color, keeps the single-cube selection, runs the
//! damped orbit controls and answers shell `Event`s with `Command`s.
//!
//! # Quick Start
//!
//! ```rust
//! use cubic::{Config, CubicCore};
//! use cubic_protocol::{Core, Event, InitEvent, LifecycleEvent, Platform};
//!
//! let mut core = CubicCore::new(&Config::default());
//! let commands = core.handle(Event::Lifecycle(LifecycleEvent::Init(InitEvent {
//!     platform: Platform::Desktop,
//!     viewport_width: 1280,
//!     viewport_height: 720,
//!     dpr: 1.0,
//!     xr_supported: false,
//! })));
//! assert!(commands.len() > 4096);
//! ```

mod app;
pub mod camera;
mod config;
mod error;
pub mod grid;
pub mod info;
pub mod mesh;
pub mod pick;
pub mod render_loop;
pub mod scene;

pub use app::CubicCore;
pub use camera::{OrbitControls, PerspectiveCamera, Viewport};
pub use config::{Config, DAMPING_FACTOR, EXTENT, GRID_SIZE};
pub use error::{Error, Result};
pub use grid::{CubeDescriptor, GridCell, GridLayout, Rgb};
pub use mesh::{CubeInstance, InstanceBuffer, Vertex};
pub use pick::{Aabb, Hit, Ray, SelectionState};
pub use render_loop::{FrameClock, RenderLoop, Shell};
pub use scene::{CubeEntity, Scene, SceneBuilder, EMISSIVE_NORMAL, EMISSIVE_SELECTED};

/// Re-export the protocol for shells
pub use cubic_protocol as protocol;
