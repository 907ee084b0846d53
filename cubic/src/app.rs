//! CubicCore - The platform-agnostic application
//!
//! Owns the scene, the selection and the orbit controls. Shells feed it
//! `Event`s and execute the `Command`s it returns.

use crate::camera::{OrbitControls, PerspectiveCamera, Viewport};
use crate::info;
use crate::pick::{Hit, Ray, SelectionChange, SelectionState};
use crate::scene::{Scene, SceneBuilder};
use crate::Config;
use cubic_protocol::*;
use glam::Vec3;

/// Number of tracked controllers attached when entering VR
const XR_CONTROLLERS: u32 = 2;

pub struct CubicCore {
    scene: Scene,
    selection: SelectionState,
    controls: OrbitControls,
    viewport: Viewport,
    initialized: bool,
    xr_supported: bool,
    /// Set once the VR button has been used; never cleared
    xr_requested: bool,
    xr_active: bool,
}

impl CubicCore {
    /// `config` is expected to be validated already (`Config::from_json` does).
    pub fn new(config: &Config) -> Self {
        let scene = SceneBuilder::new(config).build();
        let controls = OrbitControls::new(
            Vec3::ZERO,
            config.damping_factor,
            scene.grid.cube_size() * 2.0,
            scene.grid.extent() * 3.0,
        );
        Self {
            scene,
            selection: SelectionState::new(),
            controls,
            viewport: Viewport::new(1.0, 1.0),
            initialized: false,
            xr_supported: false,
            xr_requested: false,
            xr_active: false,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.scene.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn selected(&self) -> Option<usize> {
        self.selection.selected()
    }

    pub fn xr_active(&self) -> bool {
        self.xr_active
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) -> Command {
        Command::Debug(DebugCommand::Log {
            level,
            message: message.into(),
        })
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width.max(1) as f32, height.max(1) as f32);
        self.scene.camera.aspect = self.viewport.aspect();
    }

    /// Select whatever `ray` hits first. A miss returns `None` and changes nothing.
    fn pick(&mut self, ray: &Ray) -> Option<(Hit, Vec<Command>)> {
        let (hit, change) = self.selection.pick(ray, &mut self.scene.cubes)?;
        let commands = self.selection_commands(change);
        Some((hit, commands))
    }

    fn selection_commands(&self, change: SelectionChange) -> Vec<Command> {
        let mut commands = Vec::with_capacity(3);
        if let Some(previous) = change.previous.filter(|&p| p != change.current) {
            commands.push(self.emissive_command(previous));
        }
        commands.push(self.emissive_command(change.current));

        let cube = &self.scene.cubes[change.current];
        log::debug!("Selected cube {} {}", cube.cell, cube.color);
        commands.push(Command::Ui(UiCommand::SetInfoPanel {
            text: info::selection_text(cube.cell, cube.color),
        }));
        commands
    }

    fn emissive_command(&self, index: usize) -> Command {
        Command::Scene(SceneCommand::SetEmissiveIntensity {
            cube_id: index as CubeId,
            intensity: self.scene.cubes[index].emissive_intensity,
        })
    }

    /// Jump in front of cube `index`: one grid spacing along +Z, looking at it.
    fn teleport_to(&mut self, index: usize) -> Command {
        let target = self.scene.cubes[index].position;
        let position = target + Vec3::new(0.0, 0.0, self.scene.grid.spacing());
        self.controls.teleport(&mut self.scene.camera, position, target);
        log::info!("First-person view of cube {}", self.scene.cubes[index].cell);
        self.scene.camera.to_command()
    }

    fn handle_click(&mut self, data: MouseClickData) -> Vec<Command> {
        if data.button != MouseButton::Left || self.xr_active {
            return Vec::new();
        }
        let ray = self.scene.camera.ray_through(data.x, data.y, self.viewport);
        let Some((hit, mut commands)) = self.pick(&ray) else {
            return Vec::new();
        };
        if data.count == 2 {
            commands.push(self.teleport_to(hit.index));
        }
        commands
    }
}

impl Core for CubicCore {
    fn handle(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::Lifecycle(e) => self.handle_lifecycle(e),
            Event::Input(e) => self.handle_input(e),
            Event::Xr(e) => self.handle_xr(e),
        }
    }
}

impl LifecycleHandler for CubicCore {
    fn handle_lifecycle(&mut self, event: LifecycleEvent) -> Vec<Command> {
        let mut commands = Vec::new();

        match event {
            LifecycleEvent::Init(init) => {
                if self.initialized {
                    log::warn!("Ignoring repeated Init");
                    return commands;
                }
                self.set_viewport(init.viewport_width, init.viewport_height);
                self.xr_supported = init.xr_supported;

                commands.push(self.log(
                    LogLevel::Info,
                    format!(
                        "Core initialized on {:?}, viewport: {}x{}, XR: {}",
                        init.platform, init.viewport_width, init.viewport_height, init.xr_supported
                    ),
                ));
                commands.extend(self.scene.to_commands());
                self.initialized = true;
            }

            LifecycleEvent::Frame(_) => {
                // The headset drives the view while immersive
                if !self.xr_active && self.controls.update(&mut self.scene.camera) {
                    commands.push(self.scene.camera.to_command());
                }
            }

            LifecycleEvent::Resize(resize) => {
                self.set_viewport(resize.width, resize.height);
                commands.push(self.scene.camera.to_command());
            }
        }

        commands
    }
}

impl InputHandler for CubicCore {
    fn handle_input(&mut self, event: InputEvent) -> Vec<Command> {
        let InputEvent::Mouse(mouse) = event;

        match mouse {
            MouseEvent::Move(data) => {
                self.controls
                    .pointer_move(data.x, data.y, &self.scene.camera, self.viewport);
                Vec::new()
            }
            MouseEvent::Down(data) => {
                self.controls.pointer_down(data.button, data.x, data.y);
                Vec::new()
            }
            MouseEvent::Up(_) => {
                self.controls.pointer_up();
                Vec::new()
            }
            MouseEvent::Wheel(data) => {
                self.controls.wheel(data.dy);
                Vec::new()
            }
            MouseEvent::Click(data) => self.handle_click(data),
        }
    }
}

impl XrHandler for CubicCore {
    fn handle_xr(&mut self, event: XrEvent) -> Vec<Command> {
        let mut commands = Vec::new();

        match event {
            XrEvent::EnterRequested => {
                if self.xr_requested {
                    return commands;
                }
                if !self.xr_supported {
                    commands.push(self.log(LogLevel::Warn, "Immersive VR is not supported"));
                    return commands;
                }
                self.xr_requested = true;
                commands.push(Command::Ui(UiCommand::HideVrButton));
                commands.push(Command::Xr(XrCommand::Enter {
                    mode: XrMode::ImmersiveVr,
                }));
                commands.push(Command::Xr(XrCommand::AttachControllers {
                    count: XR_CONTROLLERS,
                }));
            }

            XrEvent::SessionChanged { state } => {
                self.xr_active = state == XrSessionState::Active;
                self.controls.enabled = !self.xr_active;
                if self.xr_active {
                    self.controls.pointer_up();
                }
                commands.push(self.log(LogLevel::Info, format!("XR session: {:?}", state)));
            }

            XrEvent::Select(select) => {
                let ray = Ray::from_pose_data(&select.pose);
                if let Some((_, picked)) = self.pick(&ray) {
                    commands.extend(picked);
                } else {
                    log::debug!("Controller {} select missed", select.controller);
                }
            }
        }

        commands
    }
}

impl Default for CubicCore {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{EMISSIVE_NORMAL, EMISSIVE_SELECTED};

    fn init(core: &mut CubicCore, xr_supported: bool) -> Vec<Command> {
        core.handle(Event::Lifecycle(LifecycleEvent::Init(InitEvent {
            platform: Platform::Desktop,
            viewport_width: 800,
            viewport_height: 600,
            dpr: 1.0,
            xr_supported,
        })))
    }

    fn frame(core: &mut CubicCore, n: u64) -> Vec<Command> {
        core.handle(Event::Lifecycle(LifecycleEvent::Frame(FrameEvent {
            time: n as f64 * 16.0,
            dt: 0.016,
            frame: n,
        })))
    }

    #[test]
    fn test_init_emits_scene_once() {
        let mut core = CubicCore::default();
        let commands = init(&mut core, false);
        let creates = commands
            .iter()
            .filter(|c| matches!(c, Command::Scene(SceneCommand::CreateCube(_))))
            .count();
        assert_eq!(creates, 4096);
        assert_eq!(core.camera().aspect, 800.0 / 600.0);
        assert!(init(&mut core, false).is_empty());
    }

    #[test]
    fn test_idle_frames_emit_nothing() {
        let mut core = CubicCore::default();
        init(&mut core, false);
        for n in 0..5 {
            assert!(frame(&mut core, n).is_empty());
        }
    }

    #[test]
    fn test_drag_keeps_camera_gliding() {
        let mut core = CubicCore::default();
        init(&mut core, false);
        let mouse = |e| Event::Input(InputEvent::Mouse(e));
        core.handle(mouse(MouseEvent::Down(MouseButtonData {
            x: 400.0,
            y: 300.0,
            button: MouseButton::Left,
        })));
        core.handle(mouse(MouseEvent::Move(MouseMoveData {
            x: 450.0,
            y: 300.0,
            dx: 50.0,
            dy: 0.0,
        })));
        core.handle(mouse(MouseEvent::Up(MouseButtonData {
            x: 450.0,
            y: 300.0,
            button: MouseButton::Left,
        })));

        // Released, but damping keeps the orbit moving for several frames
        for n in 0..10 {
            let commands = frame(&mut core, n);
            assert!(matches!(
                commands.as_slice(),
                [Command::Environment(EnvironmentCommand::SetCamera(_))]
            ));
        }
        let distance = core.camera().position.length();
        assert!((distance - Vec3::splat(128.0).length()).abs() < 1e-2);
    }

    #[test]
    fn test_center_click_selects_nearest_corner() {
        let mut core = CubicCore::default();
        init(&mut core, false);
        let commands = core.handle(Event::Input(InputEvent::Mouse(MouseEvent::Click(
            MouseClickData {
                x: 400.0,
                y: 300.0,
                button: MouseButton::Left,
                count: 1,
            },
        ))));

        assert_eq!(core.selected(), Some(4095));
        assert_eq!(core.scene().cubes[4095].emissive_intensity, EMISSIVE_SELECTED);
        assert_eq!(
            commands[0],
            Command::Scene(SceneCommand::SetEmissiveIntensity {
                cube_id: 4095,
                intensity: EMISSIVE_SELECTED
            })
        );
        match &commands[1] {
            Command::Ui(UiCommand::SetInfoPanel { text }) => {
                assert!(text.starts_with("Selected Cube:\nPosition: (15, 15, 15)\nColor: RGB(255, 255, 255)"));
            }
            other => panic!("Expected info panel update, got {other:?}"),
        }
    }

    #[test]
    fn test_right_click_does_not_pick() {
        let mut core = CubicCore::default();
        init(&mut core, false);
        let commands = core.handle(Event::Input(InputEvent::Mouse(MouseEvent::Click(
            MouseClickData {
                x: 400.0,
                y: 300.0,
                button: MouseButton::Right,
                count: 1,
            },
        ))));
        assert!(commands.is_empty());
        assert_eq!(core.selected(), None);
    }

    #[test]
    fn test_reselecting_same_cube_sends_one_update() {
        let mut core = CubicCore::default();
        init(&mut core, false);
        let click = || {
            Event::Input(InputEvent::Mouse(MouseEvent::Click(MouseClickData {
                x: 400.0,
                y: 300.0,
                button: MouseButton::Left,
                count: 1,
            })))
        };
        core.handle(click());
        let commands = core.handle(click());
        let emissive = commands
            .iter()
            .filter(|c| matches!(c, Command::Scene(SceneCommand::SetEmissiveIntensity { .. })))
            .count();
        assert_eq!(emissive, 1);
        assert!(
            core.scene()
                .cubes
                .iter()
                .enumerate()
                .all(|(i, c)| c.emissive_intensity
                    == if i == 4095 { EMISSIVE_SELECTED } else { EMISSIVE_NORMAL })
        );
    }

    #[test]
    fn test_session_disables_orbit() {
        let mut core = CubicCore::default();
        init(&mut core, true);
        core.handle(Event::Xr(XrEvent::SessionChanged {
            state: XrSessionState::Active,
        }));
        assert!(core.xr_active());
        assert!(!core.controls().enabled);

        core.handle(Event::Xr(XrEvent::SessionChanged {
            state: XrSessionState::Ending,
        }));
        assert!(!core.xr_active());
        assert!(core.controls().enabled);
    }

    #[test]
    fn test_enter_without_xr_support() {
        let mut core = CubicCore::default();
        init(&mut core, false);
        let commands = core.handle(Event::Xr(XrEvent::EnterRequested));
        assert!(matches!(
            commands.as_slice(),
            [Command::Debug(DebugCommand::Log {
                level: LogLevel::Warn,
                ..
            })]
        ));
    }
}
