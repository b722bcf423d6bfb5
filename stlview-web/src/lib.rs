//! stlview web - the STL viewer as a browser component
//!
//! `StlViewer` mounts a canvas into a host element, fetches the model over
//! HTTP and renders it with the core software rasterizer on each animation
//! frame.

mod fetch;
mod mount;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use stlview_core::{LoadError, LoadProgress, LoadState, LoadTicket, Mesh, Viewer, ViewerConfig};
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

pub use mount::{CanvasSurface, ViewerHooks, WebMount};

type Slot = Rc<RefCell<Option<Viewer<WebMount>>>>;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .build(),
    );
}

fn js_error(error: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&error.to_string()).into()
}

/// Run `f` against the viewer if it is still alive and not busy.
fn with_viewer<R>(
    slot: &Weak<RefCell<Option<Viewer<WebMount>>>>,
    f: impl FnOnce(&mut Viewer<WebMount>) -> R,
) -> Option<R> {
    let slot = slot.upgrade()?;
    let mut guard = match slot.try_borrow_mut() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("viewer busy, dropping callback");
            return None;
        }
    };
    guard.as_mut().map(f)
}

fn hooks_for(slot: &Slot) -> ViewerHooks {
    let frame_slot = Rc::downgrade(slot);
    let loaded_slot = Rc::downgrade(slot);
    let progress_slot = Rc::downgrade(slot);

    ViewerHooks {
        frame: Closure::<dyn FnMut(f64)>::new(move |_timestamp: f64| {
            with_viewer(&frame_slot, |viewer| viewer.frame());
        }),
        on_loaded: Rc::new(move |ticket: LoadTicket, result: Result<Mesh, LoadError>| {
            with_viewer(&loaded_slot, |viewer| viewer.finish_load(ticket, result));
        }),
        on_progress: Rc::new(move |ticket: LoadTicket, progress: LoadProgress| {
            with_viewer(&progress_slot, |viewer| viewer.report_progress(ticket, progress));
        }),
    }
}

#[wasm_bindgen]
pub struct StlViewer {
    slot: Slot,
}

#[wasm_bindgen]
impl StlViewer {
    /// Mount a viewer into `container`. `config` is a JSON object with
    /// `sourceUrl` and optional `width`, `height`, `backgroundColor` and
    /// `modelColor`.
    #[wasm_bindgen(constructor)]
    pub fn new(container: HtmlElement, config: &str) -> Result<StlViewer, JsValue> {
        let config = ViewerConfig::from_json(config).map_err(js_error)?;
        let slot: Slot = Rc::new(RefCell::new(None));

        let mount = WebMount::new(&container, hooks_for(&slot)).map_err(js_error)?;
        let viewer = Viewer::new(mount, config).map_err(js_error)?;
        info!(url = %viewer.config().source_url, "viewer mounted");
        *slot.borrow_mut() = Some(viewer);

        Ok(StlViewer { slot })
    }

    /// Apply a new configuration. Returns `false` when nothing changed.
    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&self, config: &str) -> Result<bool, JsValue> {
        let config = ViewerConfig::from_json(config).map_err(js_error)?;
        let mut guard = self.slot.try_borrow_mut().map_err(js_error)?;
        match guard.as_mut() {
            Some(viewer) => viewer.reconfigure(config).map_err(js_error),
            None => Err(js_error("viewer has been disposed")),
        }
    }

    /// Tear down and fetch the model again.
    pub fn reload(&self) -> Result<(), JsValue> {
        let mut guard = self.slot.try_borrow_mut().map_err(js_error)?;
        match guard.as_mut() {
            Some(viewer) => viewer.reload().map_err(js_error),
            None => Err(js_error("viewer has been disposed")),
        }
    }

    /// `"loading"`, `"ready"`, `"failed"` or `"disposed"`
    pub fn status(&self) -> String {
        let Ok(guard) = self.slot.try_borrow() else {
            return "busy".to_string();
        };
        let state = guard.as_ref().and_then(|viewer| viewer.load_state());
        match state {
            Some(LoadState::Loading) => "loading",
            Some(LoadState::Ready) => "ready",
            Some(LoadState::Failed(_)) => "failed",
            None => "disposed",
        }
        .to_string()
    }

    /// Overlay text currently shown over the canvas
    #[wasm_bindgen(getter)]
    pub fn message(&self) -> Option<String> {
        let guard = self.slot.try_borrow().ok()?;
        guard
            .as_ref()
            .and_then(|viewer| viewer.overlay_message())
            .map(str::to_string)
    }

    /// Stop rendering and remove everything the viewer added to the page.
    pub fn dispose(&self) {
        let viewer = match self.slot.try_borrow_mut() {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                warn!("dispose called while the viewer is busy");
                return;
            }
        };
        if let Some(mut viewer) = viewer {
            viewer.teardown();
            info!("viewer disposed");
        }
    }
}

impl Drop for StlViewer {
    fn drop(&mut self) {
        self.dispose();
    }
}
