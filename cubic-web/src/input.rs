//! DOM listeners that turn browser input into core events
//!
//! Pointer presses, clicks and the wheel are taken from the canvas only, so
//! pressing the VR button never picks a cube. Moves and releases come from
//! the window so a drag keeps orbiting when it leaves the canvas.

use crate::dom;
use crate::error::Result;
use crate::shell::WebApp;
use crate::xr;
use cubic_protocol::*;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{EventTarget, MouseEvent as DomMouseEvent, WheelEvent, Window};

/// CSS pixels per wheel line, for `deltaMode == DOM_DELTA_LINE`
const LINE_HEIGHT: f64 = 100.0;

fn listen<E, F>(target: &EventTarget, name: &str, mut handler: F) -> Result<()>
where
    E: JsCast,
    F: FnMut(E) + 'static,
{
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        handler(event.unchecked_into::<E>())
    });
    target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn mouse_button(event: &DomMouseEvent) -> Option<MouseButton> {
    match event.button() {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Middle),
        2 => Some(MouseButton::Right),
        _ => None,
    }
}

fn wheel_delta(event: &WheelEvent) -> (f32, f32) {
    let scale = match event.delta_mode() {
        WheelEvent::DOM_DELTA_LINE => LINE_HEIGHT,
        WheelEvent::DOM_DELTA_PAGE => 800.0,
        _ => 1.0,
    };
    (
        (event.delta_x() * scale) as f32,
        (event.delta_y() * scale) as f32,
    )
}

pub fn install(window: &Window, app: &Rc<RefCell<WebApp>>) -> Result<()> {
    let canvas = app.borrow().shell.canvas().clone();
    let button = app.borrow().shell.vr_button().clone();

    {
        let app = app.clone();
        listen(&canvas, "mousedown", move |event: DomMouseEvent| {
            let Some(button) = mouse_button(&event) else {
                return;
            };
            app.borrow_mut().send(Event::Input(InputEvent::Mouse(MouseEvent::Down(
                MouseButtonData {
                    x: event.client_x() as f32,
                    y: event.client_y() as f32,
                    button,
                },
            ))));
        })?;
    }

    {
        let app = app.clone();
        listen(&canvas, "click", move |event: DomMouseEvent| {
            let Some(button) = mouse_button(&event) else {
                return;
            };
            app.borrow_mut().send(Event::Input(InputEvent::Mouse(MouseEvent::Click(
                MouseClickData {
                    x: event.client_x() as f32,
                    y: event.client_y() as f32,
                    button,
                    count: event.detail().max(1) as u32,
                },
            ))));
        })?;
    }

    {
        let app = app.clone();
        listen(&canvas, "wheel", move |event: WheelEvent| {
            event.prevent_default();
            let (dx, dy) = wheel_delta(&event);
            app.borrow_mut().send(Event::Input(InputEvent::Mouse(MouseEvent::Wheel(
                MouseWheelData {
                    x: event.client_x() as f32,
                    y: event.client_y() as f32,
                    dx,
                    dy,
                },
            ))));
        })?;
    }

    listen(&canvas, "contextmenu", |event: web_sys::Event| event.prevent_default())?;

    {
        let app = app.clone();
        listen(window, "mousemove", move |event: DomMouseEvent| {
            app.borrow_mut().send(Event::Input(InputEvent::Mouse(MouseEvent::Move(
                MouseMoveData {
                    x: event.client_x() as f32,
                    y: event.client_y() as f32,
                    dx: event.movement_x() as f32,
                    dy: event.movement_y() as f32,
                },
            ))));
        })?;
    }

    {
        let app = app.clone();
        listen(window, "mouseup", move |event: DomMouseEvent| {
            let Some(button) = mouse_button(&event) else {
                return;
            };
            app.borrow_mut().send(Event::Input(InputEvent::Mouse(MouseEvent::Up(
                MouseButtonData {
                    x: event.client_x() as f32,
                    y: event.client_y() as f32,
                    button,
                },
            ))));
        })?;
    }

    {
        let app = app.clone();
        let resized = window.clone();
        listen(window, "resize", move |_: web_sys::Event| {
            let mut app = app.borrow_mut();
            match dom::fit_canvas(&resized, app.shell.canvas()) {
                Ok((width, height, dpr)) => {
                    app.send(Event::Lifecycle(LifecycleEvent::Resize(ResizeEvent {
                        width,
                        height,
                        dpr: dpr as f32,
                    })));
                }
                Err(e) => log::error!("Resize failed: {}", e),
            }
        })?;
    }

    {
        let app = app.clone();
        let window = window.clone();
        listen(&button, "click", move |_: web_sys::Event| {
            let requested = {
                let mut app = app.borrow_mut();
                app.send(Event::Xr(XrEvent::EnterRequested));
                app.shell.take_enter_request()
            };
            if !requested {
                return;
            }
            // requestSession needs the click's user activation
            match xr::request_session(&window) {
                Ok(request) => wasm_bindgen_futures::spawn_local(xr::enter(app.clone(), request)),
                Err(e) => log::error!("Failed to request XR session: {}", e),
            }
        })?;
    }

    Ok(())
}
