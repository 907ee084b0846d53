//! WebXR session: support check, session start, select events and the
//! per-frame callback that renders both eyes.

use crate::controllers;
use crate::error::{Result, WebError};
use crate::shell::{WebApp, XrState};
use cubic_protocol::{Event, Hand, PoseData, XrEvent, XrSelectData, XrSessionState};
use js_sys::{Array, Promise, Reflect};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Window, XrFrame, XrHandedness, XrInputSource, XrInputSourceEvent, XrReferenceSpace,
    XrReferenceSpaceType, XrRenderStateInit, XrRigidTransform, XrSession, XrSessionInit,
    XrSessionMode, XrSystem, XrView, XrViewerPose, XrWebGlLayer,
};

type FrameCallback = Closure<dyn FnMut(f64, XrFrame)>;

/// `navigator.xr`, absent on browsers without WebXR.
fn system(window: &Window) -> Option<XrSystem> {
    let navigator = window.navigator();
    Reflect::get(&navigator, &JsValue::from_str("xr"))
        .ok()
        .filter(|xr| !xr.is_undefined() && !xr.is_null())
        .map(|xr| xr.unchecked_into::<XrSystem>())
}

pub async fn is_supported(window: &Window) -> bool {
    let Some(xr) = system(window) else {
        log::info!("WebXR not available");
        return false;
    };
    match JsFuture::from(xr.is_session_supported(XrSessionMode::ImmersiveVr)).await {
        Ok(supported) => supported.as_bool().unwrap_or(false),
        Err(e) => {
            log::warn!("isSessionSupported failed: {:?}", e);
            false
        }
    }
}

/// Ask for an immersive-vr session. Must run inside the user gesture that
/// triggered it, so the returned promise is awaited later.
pub fn request_session(window: &Window) -> Result<Promise> {
    let xr = system(window).ok_or(WebError::XrUnavailable)?;
    let init = XrSessionInit::new();
    let features = Array::of1(&JsValue::from_str("local-floor"));
    Reflect::set(&init, &JsValue::from_str("optionalFeatures"), &features)?;
    Ok(xr.request_session_with_options(XrSessionMode::ImmersiveVr, &init).unchecked_into())
}

/// Finish what `request_session` started; tells the core the session went
/// back to `None` if anything fails.
pub async fn enter(app: Rc<RefCell<WebApp>>, request: Promise) {
    if let Err(e) = start_session(app.clone(), request).await {
        log::error!("Failed to start XR session: {}", e);
        let mut app = app.borrow_mut();
        app.shell.xr = None;
        app.send(Event::Xr(XrEvent::SessionChanged {
            state: XrSessionState::None,
        }));
    }
}

async fn start_session(app: Rc<RefCell<WebApp>>, request: Promise) -> Result<()> {
    let session: XrSession = JsFuture::from(request).await?.unchecked_into();
    app.borrow_mut().send(Event::Xr(XrEvent::SessionChanged {
        state: XrSessionState::Starting,
    }));

    let gl = app.borrow().shell.renderer().context().clone();
    let layer = XrWebGlLayer::new_with_web_gl2_rendering_context(&session, &gl)?;
    let render_state = XrRenderStateInit::new();
    render_state.set_base_layer(Some(&layer));
    session.update_render_state_with_state(&render_state);

    let reference_space: XrReferenceSpace =
        JsFuture::from(session.request_reference_space(XrReferenceSpaceType::LocalFloor))
            .await?
            .unchecked_into();

    listen_select(&app, &session)?;
    listen_end(&app, &session)?;

    {
        let mut app = app.borrow_mut();
        app.shell.xr = Some(XrState {
            session: session.clone(),
            layer,
            reference_space,
        });
        app.send(Event::Xr(XrEvent::SessionChanged {
            state: XrSessionState::Active,
        }));
    }

    start_frame_loop(app, &session);
    log::info!("XR session started");
    Ok(())
}

fn listen_select(app: &Rc<RefCell<WebApp>>, session: &XrSession) -> Result<()> {
    let app = app.clone();
    let closure = Closure::<dyn FnMut(XrInputSourceEvent)>::new(move |event: XrInputSourceEvent| {
        let select = {
            let app = app.borrow();
            let Some(state) = &app.shell.xr else {
                return;
            };
            let source = event.input_source();
            let Some(pose) = event
                .frame()
                .get_pose(&source.target_ray_space(), &state.reference_space)
            else {
                return;
            };
            let hand = hand_of(&source);
            XrSelectData {
                controller: controllers::controller_id(hand, 0),
                hand,
                pose: transform_pose(&pose.transform()),
            }
        };
        app.borrow_mut().send(Event::Xr(XrEvent::Select(select)));
    });
    session.add_event_listener_with_callback("selectstart", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn listen_end(app: &Rc<RefCell<WebApp>>, session: &XrSession) -> Result<()> {
    let app = app.clone();
    let closure = Closure::<dyn FnMut()>::new(move || {
        log::info!("XR session ended");
        let mut app = app.borrow_mut();
        app.shell.xr = None;
        app.shell.xr_frame = None;
        app.send(Event::Xr(XrEvent::SessionChanged {
            state: XrSessionState::Ending,
        }));
        app.send(Event::Xr(XrEvent::SessionChanged {
            state: XrSessionState::None,
        }));
    });
    session.add_event_listener_with_callback("end", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

/// The session's animation frames replace the window's while immersive.
fn start_frame_loop(app: Rc<RefCell<WebApp>>, session: &XrSession) {
    let callback: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
    let next = callback.clone();

    *callback.borrow_mut() = Some(Closure::new(move |time: f64, frame: XrFrame| {
        let session = frame.session();
        {
            let mut app = app.borrow_mut();
            if !app.shell.xr_active() {
                return;
            }
            app.shell.xr_frame = Some(frame);
            app.tick(time);
        }
        if let Some(callback) = next.borrow().as_ref() {
            session.request_animation_frame(callback.as_ref().unchecked_ref());
        }
    }));

    if let Some(callback) = callback.borrow().as_ref() {
        session.request_animation_frame(callback.as_ref().unchecked_ref());
    }
}

pub(crate) fn views(viewer: &XrViewerPose) -> Vec<XrView> {
    viewer
        .views()
        .iter()
        .map(|view| view.unchecked_into::<XrView>())
        .collect()
}

/// Target-ray poses of the session's current input sources.
pub(crate) fn input_poses(
    session: &XrSession,
    frame: &XrFrame,
    space: &XrReferenceSpace,
) -> Vec<PoseData> {
    let sources = session.input_sources();
    (0..sources.length())
        .filter_map(|i| {
            let source = sources.get(i)?;
            let pose = frame.get_pose(&source.target_ray_space(), space)?;
            Some(transform_pose(&pose.transform()))
        })
        .collect()
}

fn transform_pose(transform: &XrRigidTransform) -> PoseData {
    let p = transform.position();
    let o = transform.orientation();
    controllers::pose_data([p.x(), p.y(), p.z()], [o.x(), o.y(), o.z(), o.w()])
}

fn hand_of(source: &XrInputSource) -> Option<Hand> {
    match source.handedness() {
        XrHandedness::Left => Some(Hand::Left),
        XrHandedness::Right => Some(Hand::Right),
        _ => None,
    }
}
