//! DOM setup: full-window canvas, info panel, VR button, embedded config

use crate::error::{Result, WebError};
use cubic::Config;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlButtonElement, HtmlCanvasElement, HtmlElement, Window};

const CONFIG_ELEMENT_ID: &str = "cubic-config";
const INFO_ELEMENT_ID: &str = "info";

fn set_styles(element: &HtmlElement, styles: &[(&str, &str)]) -> Result<()> {
    let style = element.style();
    for (name, value) in styles {
        style.set_property(name, value)?;
    }
    Ok(())
}

/// CSS viewport size and device pixel ratio.
pub fn viewport_size(window: &Window) -> Result<(u32, u32, f64)> {
    let width = window
        .inner_width()?
        .as_f64()
        .ok_or(WebError::Missing("window width"))?;
    let height = window
        .inner_height()?
        .as_f64()
        .ok_or(WebError::Missing("window height"))?;
    Ok((width as u32, height as u32, window.device_pixel_ratio()))
}

/// Size the drawing buffer to the window in device pixels.
pub fn fit_canvas(window: &Window, canvas: &HtmlCanvasElement) -> Result<(u32, u32, f64)> {
    let (width, height, dpr) = viewport_size(window)?;
    canvas.set_width((width as f64 * dpr).round() as u32);
    canvas.set_height((height as f64 * dpr).round() as u32);
    Ok((width, height, dpr))
}

pub fn create_canvas(document: &Document) -> Result<HtmlCanvasElement> {
    let body = document.body().ok_or(WebError::Missing("body"))?;
    set_styles(&body, &[("margin", "0"), ("padding", "0"), ("overflow", "hidden")])?;

    let canvas = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| WebError::Missing("HtmlCanvasElement"))?;
    canvas.set_id("cubic-canvas");
    set_styles(
        &canvas,
        &[("display", "block"), ("width", "100vw"), ("height", "100vh")],
    )?;
    body.append_child(&canvas)?;
    Ok(canvas)
}

/// The `#info` element, created in the top-left corner if the page has none.
pub fn info_panel(document: &Document) -> Result<HtmlElement> {
    if let Some(existing) = document.get_element_by_id(INFO_ELEMENT_ID) {
        return existing
            .dyn_into::<HtmlElement>()
            .map_err(|_| WebError::Missing("HtmlElement #info"));
    }

    let body = document.body().ok_or(WebError::Missing("body"))?;
    let info = document
        .create_element("div")?
        .dyn_into::<HtmlElement>()
        .map_err(|_| WebError::Missing("HtmlElement"))?;
    info.set_id(INFO_ELEMENT_ID);
    set_styles(
        &info,
        &[
            ("position", "absolute"),
            ("top", "10px"),
            ("left", "10px"),
            ("padding", "10px"),
            ("color", "white"),
            ("background", "rgba(0, 0, 0, 0.5)"),
            ("font-family", "Arial, sans-serif"),
            ("font-size", "14px"),
            ("white-space", "pre-line"),
            ("pointer-events", "none"),
        ],
    )?;
    body.append_child(&info)?;
    Ok(info)
}

pub fn vr_button(document: &Document, xr_supported: bool) -> Result<HtmlButtonElement> {
    let body = document.body().ok_or(WebError::Missing("body"))?;
    let button = document
        .create_element("button")?
        .dyn_into::<HtmlButtonElement>()
        .map_err(|_| WebError::Missing("HtmlButtonElement"))?;

    set_styles(
        &button,
        &[
            ("position", "absolute"),
            ("bottom", "20px"),
            ("right", "20px"),
            ("padding", "12px 24px"),
            ("border", "none"),
            ("border-radius", "4px"),
            ("background-color", "#2196F3"),
            ("color", "white"),
            ("cursor", "pointer"),
            ("font-family", "Arial, sans-serif"),
            ("font-size", "16px"),
        ],
    )?;

    if xr_supported {
        button.set_text_content(Some("Enter VR"));
    } else {
        button.set_text_content(Some("VR not supported"));
        button.set_disabled(true);
        set_styles(&button, &[("opacity", "0.5"), ("cursor", "default")])?;
    }

    body.append_child(&button)?;
    Ok(button)
}

pub fn hide(element: &HtmlElement) {
    if let Err(e) = element.style().set_property("display", "none") {
        log::warn!("Failed to hide element: {:?}", e);
    }
}

/// Config from `<script id="cubic-config" type="application/json">`, or defaults.
pub fn read_config(document: &Document) -> Result<Config> {
    match document
        .get_element_by_id(CONFIG_ELEMENT_ID)
        .and_then(|element| element.text_content())
    {
        Some(json) if !json.trim().is_empty() => {
            let config = Config::from_json(&json)?;
            log::info!("Using config from #{}", CONFIG_ELEMENT_ID);
            Ok(config)
        }
        _ => Ok(Config::default()),
    }
}
