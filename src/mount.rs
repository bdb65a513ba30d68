//! Browser glue: mounting into a DOM element, page listeners and the
//! `requestAnimationFrame` loop, exported to JavaScript.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use three_d::{Event as InputEvent, Modifiers, MouseButton, PhysicalPoint};
use tracing::{error, info};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{AddEventListenerOptions, Event, EventTarget, HtmlCanvasElement, HtmlElement, MouseEvent, WheelEvent};

use crate::assets::HttpAssetLoader;
use crate::camera::PointerInput;
use crate::config::SceneConfig;
use crate::engine::MountTarget;
use crate::error::{Result, SceneError};
use crate::frame::{FrameLoop, FrameScheduler};
use crate::lifecycle::SceneLifecycle;
use crate::panel::{EguiPanel, SharedEvents};
use crate::renderer::WebGlRenderer;
use crate::utils::execute_future;


type WebLifecycle = SceneLifecycle<WebGlRenderer, EguiPanel, ElementTarget>;


/// A DOM element the canvas is appended to.
pub struct ElementTarget {
    element: HtmlElement,
}

impl ElementTarget {
    pub fn new(element: HtmlElement) -> Self {
        Self { element }
    }
}

impl MountTarget for ElementTarget {
    type Surface = HtmlCanvasElement;

    fn client_size(&self) -> (u32, u32) {
        (self.element.client_width().max(0) as u32, self.element.client_height().max(0) as u32)
    }

    fn attach(&self, surface: &HtmlCanvasElement) -> Result<()> {
        self.element.append_child(surface)?;
        Ok(())
    }

    fn detach(&self, surface: &HtmlCanvasElement) -> Result<()> {
        self.element.remove_child(surface)?;
        Ok(())
    }

    fn contains(&self, surface: &HtmlCanvasElement) -> bool {
        surface
            .parent_node()
            .map_or(false, |parent| parent.is_same_node(Some(&self.element)))
    }
}


pub struct AnimationFrames {
    window: web_sys::Window,
    callback: Closure<dyn FnMut(f64)>,
}

impl AnimationFrames {
    pub fn new(window: web_sys::Window, callback: Closure<dyn FnMut(f64)>) -> Self {
        Self { window, callback }
    }
}

impl FrameScheduler for AnimationFrames {
    type Handle = i32;

    fn request_frame(&mut self) -> Result<i32> {
        Ok(self.window.request_animation_frame(self.callback.as_ref().unchecked_ref())?)
    }

    fn cancel_frame(&mut self, handle: i32) {
        let _ = self.window.cancel_animation_frame(handle);
    }
}


/// Event listener that unregisters itself when dropped
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn new(target: &EventTarget, kind: &'static str, f: impl FnMut(Event) + 'static) -> Result<Self> {
        let callback = Closure::wrap(Box::new(f) as Box<dyn FnMut(Event)>);
        // not passive, so wheel and contextmenu can be cancelled
        let mut options = AddEventListenerOptions::new();
        options.passive(false);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            kind,
            callback.as_ref().unchecked_ref(),
            &options,
        )?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
    }
}


fn mouse_button(button: i16) -> Option<MouseButton> {
    match button {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Middle),
        2 => Some(MouseButton::Right),
        _ => None,
    }
}


/// Everything alive while a scene is mounted
struct Mounted {
    lifecycle: WebLifecycle,
    frames: FrameLoop<AnimationFrames>,
    events: SharedEvents,
    device_pixel_ratio: f64,
    listeners: Vec<Listener>,
}

impl Mounted {
    /// Physical pixels with the origin at the bottom left
    fn position(&self, e: &MouseEvent) -> PhysicalPoint {
        let height = self.lifecycle.size().1 as f64;
        PhysicalPoint {
            x: (e.offset_x() as f64 * self.device_pixel_ratio) as f32,
            y: ((height - e.offset_y() as f64) * self.device_pixel_ratio) as f32,
        }
    }

    fn on_mouse(&mut self, kind: &str, e: &MouseEvent) {
        let position = self.position(e);
        let modifiers = Modifiers::default();
        match kind {
            "mousedown" | "mouseup" => {
                let button = match mouse_button(e.button()) {
                    Some(button) => button,
                    None => return,
                };
                let event = if kind == "mousedown" {
                    InputEvent::MousePress { button, position, modifiers, handled: false }
                } else {
                    InputEvent::MouseRelease { button, position, modifiers, handled: false }
                };
                self.events.borrow_mut().push(event);
            },
            "mousemove" => {
                let buttons = e.buttons();
                let button = if buttons & 1 != 0 {
                    Some(MouseButton::Left)
                } else if buttons & 2 != 0 {
                    Some(MouseButton::Right)
                } else if buttons & 4 != 0 {
                    Some(MouseButton::Middle)
                } else {
                    None
                };
                let (dx, dy) = (e.movement_x() as f32, e.movement_y() as f32);
                self.events.borrow_mut().push(InputEvent::MouseMotion {
                    button,
                    delta: (dx, dy),
                    position,
                    modifiers,
                    handled: false,
                });
                let input = match button {
                    Some(MouseButton::Left) => PointerInput::Rotate { dx, dy },
                    Some(MouseButton::Right) => PointerInput::Pan { dx, dy },
                    Some(MouseButton::Middle) => PointerInput::Zoom { delta: dy },
                    None => return,
                };
                self.lifecycle.handle_pointer(input);
            },
            _ => {},
        }
    }

    fn on_wheel(&mut self, e: &WheelEvent) {
        let position = self.position(e);
        self.events.borrow_mut().push(InputEvent::MouseWheel {
            delta: (-e.delta_x() as f32, -e.delta_y() as f32),
            position,
            modifiers: Modifiers::default(),
            handled: false,
        });
        if self.lifecycle.handle_pointer(PointerInput::Zoom { delta: e.delta_y() as f32 }) {
            e.prevent_default();
        }
    }

    fn shutdown(&mut self) {
        self.frames.cancel();
        self.listeners.clear();
        self.lifecycle.cleanup();
    }
}


fn frame_callback(weak: Weak<RefCell<Mounted>>) -> Closure<dyn FnMut(f64)> {
    Closure::wrap(Box::new(move |time: f64| {
        let mounted = match weak.upgrade() {
            Some(mounted) => mounted,
            None => return,
        };
        let mut guard = mounted.borrow_mut();
        let m = &mut *guard;
        let control = m.lifecycle.tick(time);
        if let Err(e) = m.frames.on_frame(control) {
            error!("frame_callback(): could not schedule next frame: {}", e);
        }
    }) as Box<dyn FnMut(f64)>)
}


/// Wraps `f` so it runs against the mounted state, if it is still alive and not busy
fn with_mounted(weak: Weak<RefCell<Mounted>>, mut f: impl FnMut(&mut Mounted, Event) + 'static) -> impl FnMut(Event) + 'static {
    move |event: Event| {
        if let Some(mounted) = weak.upgrade() {
            if let Ok(mut m) = mounted.try_borrow_mut() {
                f(&mut m, event);
            }
        }
    }
}


fn listeners(mounted: &Rc<RefCell<Mounted>>, window: &web_sys::Window) -> Result<Vec<Listener>> {
    let canvas = mounted.borrow().lifecycle.surface().clone();
    let canvas: &EventTarget = canvas.as_ref();
    let weak = Rc::downgrade(mounted);
    let mut listeners = Vec::new();

    listeners.push(Listener::new(
        window.as_ref(),
        "resize",
        with_mounted(weak.clone(), |m, _| {
            m.lifecycle.resize();
        }),
    )?);

    for kind in ["mousedown", "mouseup", "mousemove"] {
        listeners.push(Listener::new(
            canvas,
            kind,
            with_mounted(weak.clone(), move |m, event| {
                if let Some(e) = event.dyn_ref::<MouseEvent>() {
                    m.on_mouse(kind, e);
                }
            }),
        )?);
    }

    listeners.push(Listener::new(
        canvas,
        "wheel",
        with_mounted(weak.clone(), |m, event| {
            if let Some(e) = event.dyn_ref::<WheelEvent>() {
                m.on_wheel(e);
            }
        }),
    )?);

    // right drag pans, keep the browser menu out of the way
    listeners.push(Listener::new(canvas, "contextmenu", |event: Event| event.prevent_default())?);

    Ok(listeners)
}


/// A scene that can be mounted into and unmounted from a DOM element.
#[wasm_bindgen]
pub struct SceneMount {
    config: SceneConfig,
    mounted: Option<Rc<RefCell<Mounted>>>,
}

impl SceneMount {
    pub fn with_config(config: SceneConfig) -> Self {
        Self { config, mounted: None }
    }

    fn mount(&self, element: HtmlElement) -> Result<Rc<RefCell<Mounted>>> {
        let window = web_sys::window().ok_or_else(|| SceneError::Surface("no window".into()))?;
        let engine = WebGlRenderer::new()?;
        let device_pixel_ratio = engine.device_pixel_ratio();
        let events: SharedEvents = Rc::new(RefCell::new(Vec::new()));
        let panel = EguiPanel::new(engine.context().clone(), events.clone(), device_pixel_ratio);

        let mut lifecycle = SceneLifecycle::new(self.config.clone(), engine, panel)?;
        lifecycle.init(ElementTarget::new(element))?;
        execute_future(lifecycle.begin_loading(&HttpAssetLoader));

        let frames_window = window.clone();
        let mounted = Rc::new_cyclic(move |weak| {
            RefCell::new(Mounted {
                lifecycle,
                frames: FrameLoop::new(AnimationFrames::new(frames_window, frame_callback(weak.clone()))),
                events,
                device_pixel_ratio,
                listeners: Vec::new(),
            })
        });

        let registered = listeners(&mounted, &window);
        {
            let mut m = mounted.borrow_mut();
            let started = registered.and_then(|l| {
                m.listeners = l;
                m.frames.start()
            });
            if let Err(e) = started {
                m.shutdown();
                return Err(e);
            }
        }
        Ok(mounted)
    }
}

#[wasm_bindgen]
impl SceneMount {
    /// `config_json` overrides any subset of the defaults
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> std::result::Result<SceneMount, JsValue> {
        let config = match config_json {
            Some(json) => SceneConfig::from_json(&json)?,
            None => SceneConfig::default(),
        };
        Ok(Self::with_config(config))
    }

    /// Mounts into `element`. Mounting again while mounted moves the canvas to the new element.
    pub fn init(&mut self, element: HtmlElement) -> std::result::Result<(), JsValue> {
        if let Some(mounted) = self.mounted.as_ref() {
            let mut m = mounted.borrow_mut();
            // a failed attach keeps the current element
            m.lifecycle.init(ElementTarget::new(element))?;
            m.frames.start()?;
            return Ok(());
        }
        self.mounted = Some(self.mount(element)?);
        info!("SceneMount::init(): mounted");
        Ok(())
    }

    pub fn resize(&self) {
        if let Some(mounted) = self.mounted.as_ref() {
            mounted.borrow_mut().lifecycle.resize();
        }
    }

    /// Stops the frame loop, removes listeners and the canvas. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            mounted.borrow_mut().shutdown();
            info!("SceneMount::cleanup(): unmounted");
        }
    }

    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.mounted
            .as_ref()
            .map_or(false, |m| m.borrow().lifecycle.is_mounted())
    }
}

impl Drop for SceneMount {
    fn drop(&mut self) {
        self.cleanup();
    }
}


thread_local! {
    static DEFAULT_MOUNT: RefCell<Option<SceneMount>> = RefCell::new(None);
}

/// Mounts the default scene into `element`
#[wasm_bindgen(js_name = initScene)]
pub fn init_scene(element: HtmlElement) -> std::result::Result<(), JsValue> {
    DEFAULT_MOUNT.with(|cell| {
        cell.borrow_mut()
            .get_or_insert_with(|| SceneMount::with_config(SceneConfig::default()))
            .init(element)
    })
}

/// Unmounts the default scene
#[wasm_bindgen(js_name = cleanUpScene)]
pub fn clean_up_scene() {
    DEFAULT_MOUNT.with(|cell| {
        if let Some(mount) = cell.borrow_mut().as_mut() {
            mount.cleanup();
        }
    });
}
