use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("No {0} found")]
    Missing(&'static str),

    #[error("JavaScript error: {0}")]
    Js(String),

    #[error("Shader compile error: {0}")]
    Shader(String),

    #[error("Program link error: {0}")]
    Link(String),

    #[error("WebXR is not available")]
    XrUnavailable,

    #[error(transparent)]
    Config(#[from] cubic::Error),
}

impl From<JsValue> for WebError {
    fn from(value: JsValue) -> Self {
        WebError::Js(format!("{:?}", value))
    }
}

pub type Result<T> = std::result::Result<T, WebError>;
