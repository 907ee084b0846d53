//! End-to-end behaviour of the core driven through protocol events.

use cubic::protocol::*;
use cubic::{Config, CubicCore, EMISSIVE_NORMAL, EMISSIVE_SELECTED, RenderLoop, Shell};
use glam::{Quat, Vec3};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

fn started_core(xr_supported: bool) -> CubicCore {
    let mut core = CubicCore::new(&Config::default());
    core.handle(Event::Lifecycle(LifecycleEvent::Init(InitEvent {
        platform: Platform::WebGL,
        viewport_width: WIDTH,
        viewport_height: HEIGHT,
        dpr: 1.0,
        xr_supported,
    })));
    core
}

fn click(x: f32, y: f32, count: u32) -> Event {
    Event::Input(InputEvent::Mouse(MouseEvent::Click(MouseClickData {
        x,
        y,
        button: MouseButton::Left,
        count,
    })))
}

/// Screen position of the center of grid cell (x, y, z).
fn pixel_of(core: &CubicCore, x: u32, y: u32, z: u32) -> (f32, f32) {
    let grid = &core.scene().grid;
    let position = grid.position(grid.cell(x, y, z).unwrap());
    let pixel = core
        .camera()
        .project(position, core.viewport())
        .expect("cube in front of camera");
    (pixel.x, pixel.y)
}

fn index_of(core: &CubicCore, x: u32, y: u32, z: u32) -> usize {
    let grid = &core.scene().grid;
    grid.index_of(grid.cell(x, y, z).unwrap())
}

fn highlighted(core: &CubicCore) -> Vec<usize> {
    core.scene()
        .cubes
        .iter()
        .enumerate()
        .filter(|(_, cube)| cube.emissive_intensity == EMISSIVE_SELECTED)
        .map(|(index, _)| index)
        .collect()
}

#[test]
fn click_selects_cube_under_pointer() {
    let mut core = started_core(false);
    let (x, y) = pixel_of(&core, 0, 15, 15);
    let commands = core.handle(click(x, y, 1));

    let expected = index_of(&core, 0, 15, 15);
    assert_eq!(core.selected(), Some(expected));
    assert_eq!(highlighted(&core), vec![expected]);

    let text = commands
        .iter()
        .find_map(|c| match c {
            Command::Ui(UiCommand::SetInfoPanel { text }) => Some(text.clone()),
            _ => None,
        })
        .unwrap();
    assert!(text.contains("Position: (0, 15, 15)"));
    assert!(text.contains("Color: RGB(0, 255, 255)"));
}

#[test]
fn only_one_cube_is_ever_highlighted() {
    let mut core = started_core(false);
    for (x, y, z) in [(15, 15, 15), (0, 15, 15), (15, 15, 0), (15, 0, 15)] {
        let (px, py) = pixel_of(&core, x, y, z);
        core.handle(click(px, py, 1));
        assert_eq!(highlighted(&core), vec![index_of(&core, x, y, z)]);
    }
    let others = core
        .scene()
        .cubes
        .iter()
        .filter(|cube| cube.emissive_intensity == EMISSIVE_NORMAL)
        .count();
    assert_eq!(others, 4095);
}

#[test]
fn switching_selection_dims_previous_cube() {
    let mut core = started_core(false);
    let (x, y) = pixel_of(&core, 15, 15, 15);
    core.handle(click(x, y, 1));
    let (x, y) = pixel_of(&core, 0, 15, 15);
    let commands = core.handle(click(x, y, 1));

    assert!(commands.contains(&Command::Scene(SceneCommand::SetEmissiveIntensity {
        cube_id: 4095,
        intensity: EMISSIVE_NORMAL,
    })));
    assert!(commands.contains(&Command::Scene(SceneCommand::SetEmissiveIntensity {
        cube_id: index_of(&core, 0, 15, 15) as CubeId,
        intensity: EMISSIVE_SELECTED,
    })));
}

#[test]
fn click_on_empty_space_changes_nothing() {
    let mut core = started_core(false);
    let (x, y) = pixel_of(&core, 15, 15, 15);
    core.handle(click(x, y, 1));
    let camera = core.camera().clone();

    // Top-left corner looks past the grid
    let commands = core.handle(click(1.0, 1.0, 2));
    assert!(commands.is_empty());
    assert_eq!(core.selected(), Some(4095));
    assert_eq!(highlighted(&core), vec![4095]);
    assert_eq!(core.camera(), &camera);
}

#[test]
fn double_click_moves_camera_in_front_of_cube() {
    let mut core = started_core(false);
    let (x, y) = pixel_of(&core, 0, 15, 15);
    let commands = core.handle(click(x, y, 2));

    let grid = &core.scene().grid;
    let p = grid.position(grid.cell(0, 15, 15).unwrap());
    let expected_position = p + Vec3::new(0.0, 0.0, grid.spacing());

    assert!((core.camera().position - expected_position).length() < 1e-4);
    assert_eq!(core.camera().target, p);
    assert_eq!(core.controls().target, p);
    assert!(matches!(
        commands.last(),
        Some(Command::Environment(EnvironmentCommand::SetCamera(_)))
    ));

    // The next frames keep the camera there
    core.handle(Event::Lifecycle(LifecycleEvent::Frame(FrameEvent {
        time: 16.0,
        dt: 0.016,
        frame: 1,
    })));
    assert!((core.camera().position - expected_position).length() < 1e-3);
}

#[test]
fn vr_entry_is_one_way() {
    let mut core = started_core(true);
    let first = core.handle(Event::Xr(XrEvent::EnterRequested));
    assert_eq!(
        first,
        vec![
            Command::Ui(UiCommand::HideVrButton),
            Command::Xr(XrCommand::Enter {
                mode: XrMode::ImmersiveVr
            }),
            Command::Xr(XrCommand::AttachControllers { count: 2 }),
        ]
    );
    assert!(core.handle(Event::Xr(XrEvent::EnterRequested)).is_empty());

    // Ending the session does not re-arm the button
    core.handle(Event::Xr(XrEvent::SessionChanged {
        state: XrSessionState::Ending,
    }));
    assert!(core.handle(Event::Xr(XrEvent::EnterRequested)).is_empty());
}

#[test]
fn controller_select_picks_along_target_ray() {
    let mut core = started_core(true);
    core.handle(Event::Xr(XrEvent::SessionChanged {
        state: XrSessionState::Active,
    }));
    let camera = core.camera().clone();

    // Standing inside the (0, 0, *) column, pointing down -Z
    let commands = core.handle(Event::Xr(XrEvent::Select(XrSelectData {
        controller: 0,
        hand: Some(Hand::Right),
        pose: PoseData {
            position: [-64.0, -64.0, 0.0],
            orientation: Quat::IDENTITY.to_array(),
        },
    })));

    assert_eq!(core.selected(), Some(index_of(&core, 0, 0, 7)));
    assert!(!commands
        .iter()
        .any(|c| matches!(c, Command::Environment(EnvironmentCommand::SetCamera(_)))));
    assert_eq!(core.camera(), &camera);
}

#[test]
fn controller_select_miss_is_noop() {
    let mut core = started_core(true);
    let commands = core.handle(Event::Xr(XrEvent::Select(XrSelectData {
        controller: 1,
        hand: Some(Hand::Left),
        pose: PoseData {
            position: [0.0, 200.0, 0.0],
            // Pointing straight up
            orientation: Quat::from_rotation_x(std::f32::consts::FRAC_PI_2).to_array(),
        },
    })));
    assert!(commands.is_empty());
    assert_eq!(core.selected(), None);
}

#[test]
fn orbit_motion_decays_after_release() {
    let mut core = started_core(false);
    let mouse = |e| Event::Input(InputEvent::Mouse(e));
    core.handle(mouse(MouseEvent::Down(MouseButtonData {
        x: 100.0,
        y: 100.0,
        button: MouseButton::Left,
    })));
    core.handle(mouse(MouseEvent::Move(MouseMoveData {
        x: 160.0,
        y: 100.0,
        dx: 60.0,
        dy: 0.0,
    })));
    core.handle(mouse(MouseEvent::Up(MouseButtonData {
        x: 160.0,
        y: 100.0,
        button: MouseButton::Left,
    })));

    let azimuth = |core: &CubicCore| {
        let p = core.camera().position;
        p.x.atan2(p.z)
    };

    let mut previous = azimuth(&core);
    let mut steps = Vec::new();
    for n in 0..4 {
        core.handle(Event::Lifecycle(LifecycleEvent::Frame(FrameEvent {
            time: n as f64 * 16.0,
            dt: 0.016,
            frame: n,
        })));
        let current = azimuth(&core);
        steps.push(current - previous);
        previous = current;
    }
    for pair in steps.windows(2) {
        assert!((pair[1] / pair[0] - 0.95).abs() < 1e-3, "steps {steps:?}");
    }
}

#[test]
fn wheel_zooms_toward_target_within_limits() {
    let mut core = started_core(false);
    let wheel = |dy| {
        Event::Input(InputEvent::Mouse(MouseEvent::Wheel(MouseWheelData {
            x: 0.0,
            y: 0.0,
            dx: 0.0,
            dy,
        })))
    };
    let frame = Event::Lifecycle(LifecycleEvent::Frame(FrameEvent {
        time: 0.0,
        dt: 0.016,
        frame: 0,
    }));

    for _ in 0..200 {
        core.handle(wheel(-100.0));
        core.handle(frame.clone());
    }
    assert!((core.camera().position.length() - 4.0).abs() < 1e-3);

    for _ in 0..200 {
        core.handle(wheel(100.0));
        core.handle(frame.clone());
    }
    assert!((core.camera().position.length() - 384.0).abs() < 1e-2);
}

#[test]
fn resize_updates_aspect_and_picking() {
    let mut core = started_core(false);
    core.handle(Event::Lifecycle(LifecycleEvent::Resize(ResizeEvent {
        width: 1000,
        height: 500,
        dpr: 2.0,
    })));
    assert_eq!(core.camera().aspect, 2.0);

    let (x, y) = pixel_of(&core, 0, 15, 15);
    core.handle(click(x, y, 1));
    assert_eq!(core.selected(), Some(index_of(&core, 0, 15, 15)));
}

#[derive(Default)]
struct RecordingShell {
    cameras: usize,
    draws: usize,
}

impl Shell for RecordingShell {
    fn execute(&mut self, commands: Vec<Command>) {
        self.cameras += commands
            .iter()
            .filter(|c| matches!(c, Command::Environment(EnvironmentCommand::SetCamera(_))))
            .count();
    }

    fn draw(&mut self) {
        self.draws += 1;
    }
}

#[test]
fn render_loop_redraws_and_forwards_camera_motion() {
    let mut core = started_core(false);
    let mut shell = RecordingShell::default();
    let mut render_loop = RenderLoop::new();

    for n in 0..3 {
        render_loop.tick(&mut core, &mut shell, n as f64 * 16.0);
    }
    assert_eq!(shell.draws, 3);
    assert_eq!(shell.cameras, 0);

    core.handle(Event::Input(InputEvent::Mouse(MouseEvent::Wheel(MouseWheelData {
        x: 0.0,
        y: 0.0,
        dx: 0.0,
        dy: -1.0,
    }))));
    render_loop.tick(&mut core, &mut shell, 48.0);
    assert_eq!(shell.cameras, 1);
}
