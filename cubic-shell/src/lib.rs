//! Native shell for CuBiC
//!
//! Opens a winit window, renders with `cubic-render` and forwards mouse
//! input to the core. Immersive VR is only available in the browser shell.

mod app;
mod clicks;
mod error;

pub use clicks::ClickTracker;
pub use error::ShellError;

use cubic::Config;
use std::path::Path;
use winit::event_loop::{ControlFlow, EventLoop};

/// Read a JSON config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<Config, ShellError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let json = std::fs::read_to_string(path).map_err(|source| ShellError::ReadConfig {
        path: path.display().to_string(),
        source,
    })?;
    let config = Config::from_json(&json)?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Run the event loop until the window is closed.
pub fn run(config: Config) -> Result<(), ShellError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::App::new(&config);
    event_loop.run_app(&mut app)?;
    app.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), Config::default());
    }

    #[test]
    fn test_unreadable_config() {
        let err = load_config(Some(Path::new("/nonexistent/cubic.json"))).unwrap_err();
        assert!(matches!(err, ShellError::ReadConfig { .. }));
    }
}
