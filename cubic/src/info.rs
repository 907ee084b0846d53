//! Info panel text

use crate::grid::{GridCell, Rgb};

const CONTROLS: &str = "Controls:
- Click and drag to rotate
- Scroll wheel to zoom
- Click cube to select
- Double-click for first-person view";

/// Panel shown before anything has been selected.
pub fn idle_text() -> String {
    format!("Click a cube to select it\n\n{CONTROLS}")
}

/// Panel describing the selected cube.
pub fn selection_text(cell: GridCell, color: Rgb) -> String {
    format!("Selected Cube:\nPosition: {cell}\nColor: {color}\n\n{CONTROLS}")
}
