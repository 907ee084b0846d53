//! wgpu renderer for CuBiC
//!
//! Draws the cube grid with two instanced draw calls (filled cubes, then
//! their outlines) and executes the scene/environment commands the core
//! emits. Used by the native shell; the browser shell renders through
//! WebGL2 directly so it can share its context with WebXR.

mod error;
mod renderer;

pub use error::RenderError;
pub use renderer::Renderer;
