//! Browser shell: executes core commands against WebGL2 and the DOM

use crate::controllers;
use crate::gl::{GlRenderer, ViewTarget};
use crate::xr;
use cubic::{CubicCore, PerspectiveCamera, RenderLoop, Shell};
use cubic_protocol::*;
use glam::{Mat4, Vec3};
use web_sys::{
    HtmlButtonElement, HtmlCanvasElement, HtmlElement, XrFrame, XrReferenceSpace, XrSession,
    XrWebGlLayer,
};

/// A running immersive session.
pub struct XrState {
    pub session: XrSession,
    pub layer: XrWebGlLayer,
    pub reference_space: XrReferenceSpace,
}

pub struct WebShell {
    renderer: GlRenderer,
    canvas: HtmlCanvasElement,
    info: HtmlElement,
    vr_button: HtmlButtonElement,
    enter_requested: bool,
    controllers: u32,
    pub(crate) xr: Option<XrState>,
    /// Set by the session's frame callback for the duration of one tick
    pub(crate) xr_frame: Option<XrFrame>,
}

impl WebShell {
    pub fn new(
        renderer: GlRenderer,
        canvas: HtmlCanvasElement,
        info: HtmlElement,
        vr_button: HtmlButtonElement,
    ) -> Self {
        Self {
            renderer,
            canvas,
            info,
            vr_button,
            enter_requested: false,
            controllers: 0,
            xr: None,
            xr_frame: None,
        }
    }

    pub fn renderer(&self) -> &GlRenderer {
        &self.renderer
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn vr_button(&self) -> &HtmlButtonElement {
        &self.vr_button
    }

    pub fn xr_active(&self) -> bool {
        self.xr.is_some()
    }

    /// True once after the core asked to enter immersive mode.
    pub fn take_enter_request(&mut self) -> bool {
        std::mem::take(&mut self.enter_requested)
    }

    fn draw_flat(&mut self) {
        let width = self.canvas.width() as i32;
        let height = self.canvas.height() as i32;
        if width == 0 || height == 0 {
            return;
        }
        let Some(camera) = self.renderer.camera() else {
            return;
        };
        let camera = PerspectiveCamera::from_camera_data(camera, width as f32 / height as f32);

        self.renderer.begin_frame(None, (width, height));
        self.renderer.draw_view(
            &ViewTarget {
                framebuffer: None,
                viewport: [0, 0, width, height],
                view_proj: camera.view_projection(),
                eye: camera.position,
            },
            &[],
        );
    }

    fn draw_xr(&mut self, frame: &XrFrame) {
        let Some(state) = &self.xr else {
            return;
        };
        let Some(viewer) = frame.get_viewer_pose(&state.reference_space) else {
            return;
        };

        let mut poses = xr::input_poses(&state.session, frame, &state.reference_space);
        poses.truncate(self.controllers as usize);
        let pointers = controllers::pointer_lines(&poses);

        let framebuffer = state.layer.framebuffer();
        let size = (
            state.layer.framebuffer_width() as i32,
            state.layer.framebuffer_height() as i32,
        );
        self.renderer.begin_frame(framebuffer.as_ref(), size);

        for view in xr::views(&viewer) {
            let Some(viewport) = state.layer.get_viewport(&view) else {
                continue;
            };
            let transform = view.transform();
            let projection = Mat4::from_cols_slice(&view.projection_matrix());
            let view_matrix = Mat4::from_cols_slice(&transform.inverse().matrix());
            let eye = transform.position();

            self.renderer.draw_view(
                &ViewTarget {
                    framebuffer: framebuffer.as_ref(),
                    viewport: [viewport.x(), viewport.y(), viewport.width(), viewport.height()],
                    view_proj: projection * view_matrix,
                    eye: Vec3::new(eye.x() as f32, eye.y() as f32, eye.z() as f32),
                },
                &pointers,
            );
        }
    }
}

impl Shell for WebShell {
    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            if self.renderer.apply(&command) {
                continue;
            }
            match command {
                Command::Ui(UiCommand::SetInfoPanel { text }) => {
                    self.info.set_text_content(Some(&text));
                }
                Command::Ui(UiCommand::HideVrButton) => crate::dom::hide(&self.vr_button),
                Command::Xr(XrCommand::Enter { mode: XrMode::ImmersiveVr }) => {
                    self.enter_requested = true;
                }
                Command::Xr(XrCommand::AttachControllers { count }) => {
                    log::info!("Attaching {} controllers", count);
                    self.controllers = count;
                }
                Command::Debug(DebugCommand::Log { level, message }) => match level {
                    LogLevel::Debug => log::debug!("[core] {}", message),
                    LogLevel::Info => log::info!("[core] {}", message),
                    LogLevel::Warn => log::warn!("[core] {}", message),
                    LogLevel::Error => log::error!("[core] {}", message),
                },
                other => log::debug!("Unhandled command: {:?}", other),
            }
        }
    }

    fn draw(&mut self) {
        match self.xr_frame.take() {
            Some(frame) => self.draw_xr(&frame),
            None => self.draw_flat(),
        }
    }
}

/// Core, render loop and shell behind the `Rc<RefCell<_>>` that every DOM
/// and XR callback shares.
pub struct WebApp {
    core: CubicCore,
    render_loop: RenderLoop,
    pub(crate) shell: WebShell,
}

impl WebApp {
    pub fn new(core: CubicCore, shell: WebShell) -> Self {
        Self {
            core,
            render_loop: RenderLoop::new(),
            shell,
        }
    }

    pub fn send(&mut self, event: Event) {
        let commands = self.core.handle(event);
        self.shell.execute(commands);
    }

    pub fn tick(&mut self, now_ms: f64) {
        self.render_loop.tick(&mut self.core, &mut self.shell, now_ms);
    }
}
