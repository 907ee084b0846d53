use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Failed to read config {path}: {source}")]
    ReadConfig {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] cubic::Error),

    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("Renderer error: {0}")]
    Render(#[from] cubic_render::RenderError),
}
