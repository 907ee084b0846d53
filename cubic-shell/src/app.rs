//! winit application: window, input translation and the redraw loop

use crate::{ClickTracker, ShellError};
use cubic::{Config, CubicCore, RenderLoop, Shell};
use cubic_protocol::*;
use cubic_render::Renderer;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

/// Pixels per wheel line, matching a browser's line-mode delta
const LINE_HEIGHT: f32 = 100.0;

/// Executes core commands against the wgpu renderer.
struct NativeShell {
    window: Arc<Window>,
    renderer: Renderer,
}

impl Shell for NativeShell {
    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            if self.renderer.apply(&command) {
                continue;
            }
            match command {
                Command::Ui(UiCommand::SetInfoPanel { text }) => {
                    for line in text.lines().filter(|l| !l.is_empty()) {
                        log::info!("{}", line);
                    }
                    if let Some(position) = text.lines().find(|l| l.starts_with("Position:")) {
                        self.window.set_title(&format!("CuBiC - {}", position));
                    }
                }
                Command::Debug(DebugCommand::Log { level, message }) => match level {
                    LogLevel::Debug => log::debug!("[core] {}", message),
                    LogLevel::Info => log::info!("[core] {}", message),
                    LogLevel::Warn => log::warn!("[core] {}", message),
                    LogLevel::Error => log::error!("[core] {}", message),
                },
                Command::Ui(UiCommand::HideVrButton) | Command::Xr(_) => {
                    log::debug!("Ignoring {:?}: no XR on desktop", command);
                }
                _ => {}
            }
        }
    }

    fn draw(&mut self) {
        self.renderer.render();
    }
}

pub(crate) struct App {
    core: CubicCore,
    render_loop: RenderLoop,
    shell: Option<NativeShell>,
    started: Instant,
    cursor: (f32, f32),
    clicks: ClickTracker,
    error: Option<ShellError>,
}

impl App {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            core: CubicCore::new(config),
            render_loop: RenderLoop::new(),
            shell: None,
            started: Instant::now(),
            cursor: (0.0, 0.0),
            clicks: ClickTracker::new(),
            error: None,
        }
    }

    pub(crate) fn into_result(self) -> Result<(), ShellError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ShellError> {
        let attrs = Window::default_attributes()
            .with_title("CuBiC")
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = Arc::new(event_loop.create_window(attrs)?);
        let renderer = pollster::block_on(Renderer::new(window.clone()))?;

        let size = logical_size(&window, window.inner_size());
        let mut shell = NativeShell {
            window: window.clone(),
            renderer,
        };
        let commands = self.core.handle(Event::Lifecycle(LifecycleEvent::Init(InitEvent {
            platform: Platform::Desktop,
            viewport_width: size.width,
            viewport_height: size.height,
            dpr: window.scale_factor() as f32,
            xr_supported: false,
        })));
        shell.execute(commands);

        log::info!("CuBiC desktop shell started: {}x{}", size.width, size.height);
        window.request_redraw();
        self.shell = Some(shell);
        Ok(())
    }

    fn send(&mut self, event: Event) {
        let commands = self.core.handle(event);
        if let Some(shell) = self.shell.as_mut() {
            shell.execute(commands);
        }
    }

    fn mouse(&mut self, event: MouseEvent) {
        self.send(Event::Input(InputEvent::Mouse(event)));
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.shell.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(shell) = self.shell.as_mut() else {
            return;
        };
        let window = shell.window.clone();

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Window closed");
                event_loop.exit();
            }

            WindowEvent::Resized(physical) => {
                shell.renderer.resize(physical.width, physical.height);
                let size = logical_size(&window, physical);
                self.send(Event::Lifecycle(LifecycleEvent::Resize(ResizeEvent {
                    width: size.width,
                    height: size.height,
                    dpr: window.scale_factor() as f32,
                })));
            }

            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = logical_position(&window, position);
                let (dx, dy) = (x - self.cursor.0, y - self.cursor.1);
                self.cursor = (x, y);
                self.mouse(MouseEvent::Move(MouseMoveData { x, y, dx, dy }));
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = map_button(button) else {
                    return;
                };
                let (x, y) = self.cursor;
                match state {
                    ElementState::Pressed => {
                        if button == MouseButton::Left {
                            self.clicks.press(x, y);
                        }
                        self.mouse(MouseEvent::Down(MouseButtonData { x, y, button }));
                    }
                    ElementState::Released => {
                        self.mouse(MouseEvent::Up(MouseButtonData { x, y, button }));
                        if button == MouseButton::Left {
                            if let Some(count) = self.clicks.release(x, y, Instant::now()) {
                                self.mouse(MouseEvent::Click(MouseClickData { x, y, button, count }));
                            }
                        }
                    }
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports scrolling up as positive; browsers the opposite
                let (dx, dy) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (-x * LINE_HEIGHT, -y * LINE_HEIGHT),
                    MouseScrollDelta::PixelDelta(p) => (-p.x as f32, -p.y as f32),
                };
                let (x, y) = self.cursor;
                self.mouse(MouseEvent::Wheel(MouseWheelData { x, y, dx, dy }));
            }

            WindowEvent::RedrawRequested => {
                let now = self.started.elapsed().as_secs_f64() * 1000.0;
                self.render_loop.tick(&mut self.core, shell, now);
                window.request_redraw();
            }

            _ => {}
        }
    }
}

fn logical_size(window: &Window, physical: PhysicalSize<u32>) -> LogicalSize<u32> {
    physical.to_logical(window.scale_factor())
}

fn logical_position(window: &Window, physical: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = physical.to_logical::<f32>(window.scale_factor());
    (logical.x, logical.y)
}

fn map_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        _ => None,
    }
}
