//! DOM container mount: a wrapper `div` holding the canvas and the overlay.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use stlview_core::{
    raster, Camera, ControlInput, FrameHandle, Framebuffer, LoadError, LoadProgress, LoadRequest,
    LoadTicket, Mesh, Mount, RenderSurface, Scene, ViewerError,
};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{
    CanvasRenderingContext2d, Document, Event, HtmlCanvasElement, HtmlElement, ImageData,
    MouseEvent, Node, WheelEvent, Window,
};

use crate::fetch;

const WRAPPER_STYLE: &str = "position: relative; display: inline-block; line-height: 0;";
const OVERLAY_STYLE: &str = "position: absolute; top: 50%; left: 0; right: 0; \
    transform: translateY(-50%); text-align: center; line-height: normal; \
    font-family: sans-serif; color: #333; pointer-events: none; z-index: 1;";

pub type LoadedCallback = Rc<dyn Fn(LoadTicket, Result<Mesh, LoadError>)>;
pub type ProgressCallback = Rc<dyn Fn(LoadTicket, LoadProgress)>;

/// Callbacks back into the owning viewer
pub struct ViewerHooks {
    pub frame: Closure<dyn FnMut(f64)>,
    pub on_loaded: LoadedCallback,
    pub on_progress: ProgressCallback,
}

fn js_error(context: &str, value: JsValue) -> ViewerError {
    ViewerError::Surface(format!("{}: {:?}", context, value))
}

/// Device-pixel size of the canvas backing store
pub fn backing_size(width: u32, height: u32, pixel_ratio: f32) -> (u32, u32) {
    let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio
    } else {
        1.0
    };
    (
        ((width as f32 * ratio).round() as u32).max(1),
        ((height as f32 * ratio).round() as u32).max(1),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

/// Primary button rotates; secondary, middle or shift-drag pans.
pub fn drag_mode(button: i16, shift: bool) -> Option<DragMode> {
    match (button, shift) {
        (0, false) => Some(DragMode::Rotate),
        (0, true) | (1, _) | (2, _) => Some(DragMode::Pan),
        _ => None,
    }
}

pub fn drag_input(mode: DragMode, dx: f32, dy: f32) -> ControlInput {
    match mode {
        DragMode::Rotate => ControlInput::Rotate { dx, dy },
        DragMode::Pan => ControlInput::Pan { dx, dy },
    }
}

pub fn wheel_input(delta_y: f64) -> Option<ControlInput> {
    if delta_y == 0.0 || !delta_y.is_finite() {
        return None;
    }
    Some(ControlInput::Zoom {
        delta: delta_y.signum() as f32,
    })
}

type Listener = (&'static str, Closure<dyn FnMut(Event)>);

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    framebuffer: Framebuffer,
    pixels: Vec<u8>,
    listeners: Vec<Listener>,
}

impl CanvasSurface {
    fn new(
        document: &Document,
        width: u32,
        height: u32,
        pixel_ratio: f32,
        input: Rc<RefCell<Vec<ControlInput>>>,
    ) -> Result<Self, ViewerError> {
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")
            .map_err(|e| js_error("create canvas", e))?
            .dyn_into()
            .map_err(|_| ViewerError::Surface("element is not a canvas".to_string()))?;

        let (device_width, device_height) = backing_size(width, height, pixel_ratio);
        canvas.set_width(device_width);
        canvas.set_height(device_height);
        let style = canvas.style();
        style
            .set_property("width", &format!("{}px", width))
            .and_then(|_| style.set_property("height", &format!("{}px", height)))
            .and_then(|_| style.set_property("display", "block"))
            .map_err(|e| js_error("style canvas", e))?;

        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(|e| js_error("get 2d context", e))?
            .ok_or_else(|| ViewerError::Surface("2d context unavailable".to_string()))?
            .dyn_into()
            .map_err(|_| ViewerError::Surface("unexpected context type".to_string()))?;

        let mut surface = Self {
            canvas,
            context,
            framebuffer: Framebuffer::new(device_width, device_height),
            pixels: Vec::new(),
            listeners: Vec::new(),
        };
        surface.bind_controls(input)?;
        Ok(surface)
    }

    fn bind_controls(&mut self, input: Rc<RefCell<Vec<ControlInput>>>) -> Result<(), ViewerError> {
        let drag: Rc<Cell<Option<DragMode>>> = Rc::new(Cell::new(None));

        let down = {
            let drag = drag.clone();
            Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                    drag.set(drag_mode(mouse.button(), mouse.shift_key()));
                    event.prevent_default();
                }
            })
        };
        let moved = {
            let drag = drag.clone();
            let input = input.clone();
            Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                let (Some(mode), Some(mouse)) = (drag.get(), event.dyn_ref::<MouseEvent>()) else {
                    return;
                };
                let (dx, dy) = (mouse.movement_x() as f32, mouse.movement_y() as f32);
                input.borrow_mut().push(drag_input(mode, dx, dy));
            })
        };
        let release = {
            let drag = drag.clone();
            Closure::<dyn FnMut(Event)>::new(move |_event: Event| drag.set(None))
        };
        let leave = Closure::<dyn FnMut(Event)>::new(move |_event: Event| drag.set(None));
        let wheel = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            if let Some(wheel) = event.dyn_ref::<WheelEvent>() {
                if let Some(zoom) = wheel_input(wheel.delta_y()) {
                    input.borrow_mut().push(zoom);
                }
                event.prevent_default();
            }
        });
        let menu = Closure::<dyn FnMut(Event)>::new(move |event: Event| event.prevent_default());

        for (name, listener) in [
            ("mousedown", down),
            ("mousemove", moved),
            ("mouseup", release),
            ("mouseleave", leave),
            ("wheel", wheel),
            ("contextmenu", menu),
        ] {
            self.canvas
                .add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
                .map_err(|e| js_error("bind controls", e))?;
            self.listeners.push((name, listener));
        }
        Ok(())
    }

    fn blit(&mut self) -> Result<(), JsValue> {
        self.framebuffer.write_rgba8(&mut self.pixels);
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(self.pixels.as_slice()),
            self.framebuffer.width(),
            self.framebuffer.height(),
        )?;
        self.context.put_image_data(&image, 0.0, 0.0)
    }
}

impl RenderSurface for CanvasSurface {
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        raster::render(&mut self.framebuffer, scene, camera);
        if let Err(e) = self.blit() {
            warn!("failed to present frame: {:?}", e);
        }
    }

    fn dispose(&mut self) {
        for (name, listener) in self.listeners.drain(..) {
            let _ = self
                .canvas
                .remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref());
        }
        self.pixels = Vec::new();
        self.framebuffer = Framebuffer::new(0, 0);
        // Release the backing store
        self.canvas.set_width(0);
        self.canvas.set_height(0);
    }
}

pub struct WebMount {
    window: Window,
    document: Document,
    wrapper: HtmlElement,
    overlay: HtmlElement,
    hooks: ViewerHooks,
    input: Rc<RefCell<Vec<ControlInput>>>,
}

impl WebMount {
    pub fn new(container: &HtmlElement, hooks: ViewerHooks) -> Result<Self, ViewerError> {
        let window = web_sys::window().ok_or_else(|| ViewerError::Surface("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| ViewerError::Surface("no document".to_string()))?;

        let wrapper = create_div(&document, WRAPPER_STYLE)?;
        let overlay = create_div(&document, OVERLAY_STYLE)?;
        wrapper
            .append_child(&overlay)
            .and_then(|_| container.append_child(&wrapper))
            .map_err(|e| js_error("mount wrapper", e))?;

        let mut mount = Self {
            window,
            document,
            wrapper,
            overlay,
            hooks,
            input: Rc::new(RefCell::new(Vec::new())),
        };
        mount.show_overlay(None);
        Ok(mount)
    }
}

fn create_div(document: &Document, style: &str) -> Result<HtmlElement, ViewerError> {
    let div: HtmlElement = document
        .create_element("div")
        .map_err(|e| js_error("create div", e))?
        .dyn_into()
        .map_err(|_| ViewerError::Surface("element is not an HtmlElement".to_string()))?;
    div.set_attribute("style", style)
        .map_err(|e| js_error("style div", e))?;
    Ok(div)
}

impl Mount for WebMount {
    type Surface = CanvasSurface;

    fn create_surface(
        &mut self,
        width: u32,
        height: u32,
        pixel_ratio: f32,
    ) -> Result<CanvasSurface, ViewerError> {
        CanvasSurface::new(&self.document, width, height, pixel_ratio, self.input.clone())
    }

    fn attach(&mut self, surface: &CanvasSurface) -> Result<(), ViewerError> {
        self.wrapper
            .append_child(&surface.canvas)
            .map(|_| ())
            .map_err(|e| js_error("attach canvas", e))
    }

    fn contains(&self, surface: &CanvasSurface) -> bool {
        let wrapper: &Node = self.wrapper.as_ref();
        surface
            .canvas
            .parent_node()
            .is_some_and(|parent| parent.is_same_node(Some(wrapper)))
    }

    fn detach(&mut self, surface: &CanvasSurface) {
        if let Err(e) = self.wrapper.remove_child(&surface.canvas) {
            warn!("failed to detach canvas: {:?}", e);
        }
    }

    fn pixel_ratio(&self) -> f32 {
        self.window.device_pixel_ratio() as f32
    }

    fn request_frame(&mut self) -> Result<FrameHandle, ViewerError> {
        self.window
            .request_animation_frame(self.hooks.frame.as_ref().unchecked_ref())
            .map(|id| FrameHandle(id as i64))
            .map_err(|e| ViewerError::Scheduler(format!("{:?}", e)))
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Err(e) = self.window.cancel_animation_frame(handle.0 as i32) {
            warn!("failed to cancel animation frame: {:?}", e);
        }
    }

    fn begin_load(&mut self, request: LoadRequest) {
        let on_loaded = self.hooks.on_loaded.clone();
        let on_progress = self.hooks.on_progress.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let ticket = request.ticket;
            let result =
                fetch::fetch_mesh(&request.url, |progress| on_progress(ticket, progress)).await;
            on_loaded(ticket, result);
        });
    }

    fn show_overlay(&mut self, message: Option<&str>) {
        self.overlay.set_text_content(message);
        let display = if message.is_some() { "block" } else { "none" };
        if let Err(e) = self.overlay.style().set_property("display", display) {
            warn!("failed to toggle overlay: {:?}", e);
        }
    }

    fn drain_input(&mut self) -> Vec<ControlInput> {
        std::mem::take(&mut *self.input.borrow_mut())
    }
}

impl Drop for WebMount {
    fn drop(&mut self) {
        self.wrapper.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_size_scales_with_ratio() {
        assert_eq!(backing_size(400, 300, 2.0), (800, 600));
        assert_eq!(backing_size(400, 300, 1.5), (600, 450));
        assert_eq!(backing_size(400, 300, f32::NAN), (400, 300));
    }

    #[test]
    fn test_drag_modes() {
        assert_eq!(drag_mode(0, false), Some(DragMode::Rotate));
        assert_eq!(drag_mode(0, true), Some(DragMode::Pan));
        assert_eq!(drag_mode(2, false), Some(DragMode::Pan));
        assert_eq!(drag_mode(4, false), None);
    }

    #[test]
    fn test_wheel_maps_to_zoom_direction() {
        assert_eq!(wheel_input(120.0), Some(ControlInput::Zoom { delta: 1.0 }));
        assert_eq!(wheel_input(-3.0), Some(ControlInput::Zoom { delta: -1.0 }));
        assert_eq!(wheel_input(0.0), None);
    }

    #[test]
    fn test_drag_input() {
        assert_eq!(
            drag_input(DragMode::Pan, 3.0, -2.0),
            ControlInput::Pan { dx: 3.0, dy: -2.0 }
        );
    }
}
