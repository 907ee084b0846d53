//! Shell-Core Protocol
//!
//! CuBiC uses a shell-core architecture:
//! - **Shell**: Platform-specific (browser WebGL2/WebXR, native winit/wgpu)
//!   - Owns the canvas/window and the GPU
//!   - Captures pointer, controller and resize events
//!   - Executes rendering and DOM commands
//!
//! - **Core**: Platform-agnostic Rust code
//!   - Receives Events from shell
//!   - Owns the cube grid, selection and orbit controls
//!   - Emits Commands for shell to execute
//!   - No threads, purely event-driven
//!
//! ## Architecture
//!
//! Events and Commands use an enum-of-enums pattern:
//! - Handlers implement one trait per event category
//! - Modules only see events relevant to them

use serde::{Deserialize, Serialize};

// ============================================================================
// IDs
// ============================================================================

/// Index of a cube in the scene, equal to its grid index.
pub type CubeId = u32;

/// Index of an XR controller (0 or 1 for the two tracked controllers).
pub type ControllerId = u32;

// ============================================================================
// EVENTS (Shell -> Core)
// ============================================================================

/// Top-level events sent from Shell to Core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", content = "event")]
pub enum Event {
    /// Application lifecycle events
    Lifecycle(LifecycleEvent),
    /// Pointer input events
    Input(InputEvent),
    /// XR/immersive events
    Xr(XrEvent),
}

// ----------------------------------------------------------------------------
// Lifecycle Events
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    /// Shell initialized, provides viewport and capabilities
    Init(InitEvent),
    /// Render frame requested (called every frame)
    Frame(FrameEvent),
    /// Viewport/window resized
    Resize(ResizeEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitEvent {
    pub platform: Platform,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub dpr: f32,
    pub xr_supported: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    WebGL,
    Desktop,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameEvent {
    /// Milliseconds since the shell started
    pub time: f64,
    /// Seconds since the previous frame
    pub dt: f32,
    pub frame: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResizeEvent {
    pub width: u32,
    pub height: u32,
    pub dpr: f32,
}

// ----------------------------------------------------------------------------
// Input Events
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InputEvent {
    Mouse(MouseEvent),
}

/// Mouse events. Coordinates are in CSS/logical pixels from the top-left
/// corner of the viewport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum MouseEvent {
    Move(MouseMoveData),
    Down(MouseButtonData),
    Up(MouseButtonData),
    /// A completed click. `count` is 2 for the second click of a double click.
    Click(MouseClickData),
    Wheel(MouseWheelData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MouseMoveData {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MouseButtonData {
    pub x: f32,
    pub y: f32,
    pub button: MouseButton,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MouseClickData {
    pub x: f32,
    pub y: f32,
    pub button: MouseButton,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MouseWheelData {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

// ----------------------------------------------------------------------------
// XR Events
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum XrEvent {
    /// The on-screen VR button was activated
    EnterRequested,
    SessionChanged { state: XrSessionState },
    /// A controller's primary action ("select") fired
    Select(XrSelectData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XrSessionState {
    None,
    Starting,
    Active,
    Ending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseData {
    pub position: [f32; 3],
    /// Quaternion as [x, y, z, w]
    pub orientation: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrSelectData {
    pub controller: ControllerId,
    pub hand: Option<Hand>,
    /// Target-ray pose in world space
    pub pose: PoseData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hand {
    Left,
    Right,
}

// ============================================================================
// COMMANDS (Core -> Shell)
// ============================================================================

/// Top-level commands sent from Core to Shell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "command")]
pub enum Command {
    /// Cube creation and material updates
    Scene(SceneCommand),
    /// Camera, background, lighting
    Environment(EnvironmentCommand),
    /// DOM overlay (info panel, VR button)
    Ui(UiCommand),
    /// Immersive session commands
    Xr(XrCommand),
    /// Debug/logging commands
    Debug(DebugCommand),
}

// ----------------------------------------------------------------------------
// Scene Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum SceneCommand {
    CreateCube(CreateCubeData),
    SetEmissiveIntensity { cube_id: CubeId, intensity: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCubeData {
    pub cube_id: CubeId,
    pub position: [f32; 3],
    /// Edge length
    pub size: f32,
    pub material: CubeMaterial,
    /// Line color of the cube outline
    pub edge_color: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeMaterial {
    pub color: [f32; 3],
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
}

// ----------------------------------------------------------------------------
// Environment Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum EnvironmentCommand {
    SetCamera(CameraData),
    SetBackground(BackgroundData),
    SetLighting(LightingData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraData {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackgroundData {
    Color([f32; 4]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingData {
    pub ambient: AmbientLight,
    pub directional: Option<DirectionalLight>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction the light travels (from the light toward the scene)
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
}

// ----------------------------------------------------------------------------
// UI Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum UiCommand {
    /// Replace the info panel text; lines are separated by `\n`
    SetInfoPanel { text: String },
    HideVrButton,
}

// ----------------------------------------------------------------------------
// XR Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum XrCommand {
    Enter { mode: XrMode },
    /// Show controller pointers and start forwarding their select events
    AttachControllers { count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XrMode {
    ImmersiveVr,
}

// ----------------------------------------------------------------------------
// Debug Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum DebugCommand {
    Log { level: LogLevel, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

// ============================================================================
// CORE TRAIT
// ============================================================================

/// Trait that the application implements
pub trait Core {
    /// Handle an event from the shell
    /// Returns commands for the shell to execute
    fn handle(&mut self, event: Event) -> Vec<Command>;
}

// ============================================================================
// HELPER TRAITS FOR MODULAR HANDLERS
// ============================================================================

/// Handler for lifecycle events
pub trait LifecycleHandler {
    fn handle_lifecycle(&mut self, event: LifecycleEvent) -> Vec<Command>;
}

/// Handler for input events
pub trait InputHandler {
    fn handle_input(&mut self, event: InputEvent) -> Vec<Command>;
}

/// Handler for XR events
pub trait XrHandler {
    fn handle_xr(&mut self, event: XrEvent) -> Vec<Command>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_click_json() {
        let json = r#"{"category":"Input","event":{"type":"Mouse","action":"Click","x":10.0,"y":20.0,"button":"Left","count":2}}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        match event {
            Event::Input(InputEvent::Mouse(MouseEvent::Click(data))) => {
                assert_eq!(data.count, 2);
                assert_eq!(data.button, MouseButton::Left);
            }
            _ => panic!("Expected Input::Mouse::Click event"),
        }
    }

    #[test]
    fn test_lifecycle_init_json() {
        let json = r#"{"category":"Lifecycle","event":{"type":"Init","platform":"WebGL","viewport_width":1280,"viewport_height":720,"dpr":2.0,"xr_supported":true}}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        match event {
            Event::Lifecycle(LifecycleEvent::Init(data)) => {
                assert_eq!(data.viewport_width, 1280);
                assert!(data.xr_supported);
            }
            _ => panic!("Expected Lifecycle::Init event"),
        }
    }

    #[test]
    fn test_xr_select_json() {
        let json = r#"{"category":"Xr","event":{"type":"Select","controller":1,"hand":"Right","pose":{"position":[0.0,1.6,0.0],"orientation":[0.0,0.0,0.0,1.0]}}}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        match event {
            Event::Xr(XrEvent::Select(data)) => {
                assert_eq!(data.controller, 1);
                assert_eq!(data.hand, Some(Hand::Right));
                assert_eq!(data.pose.position, [0.0, 1.6, 0.0]);
            }
            _ => panic!("Expected Xr::Select event"),
        }
    }

    #[test]
    fn test_emissive_command_json() {
        let command = Command::Scene(SceneCommand::SetEmissiveIntensity {
            cube_id: 7,
            intensity: 1.0,
        });
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(
            json,
            r#"{"category":"Scene","command":{"action":"SetEmissiveIntensity","cube_id":7,"intensity":1.0}}"#
        );
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, command);
    }
}
