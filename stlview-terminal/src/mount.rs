//! The terminal screen as a viewer mount point.
//!
//! Row 0 is reserved for the status line; surfaces draw from row 1 down.
//! Frames are "scheduled" by marking one pending handle which the app loop
//! fires on its next tick.

use crossterm::{cursor, terminal, QueueableCommand};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::sync::mpsc::Sender;
use stlview_core::{
    raster, Camera, ControlInput, FrameHandle, Framebuffer, LoadRequest, Mount, RenderSurface,
    Scene, ViewerError,
};
use tracing::warn;

use crate::loader::{self, LoaderEvent};
use crate::renderer::{self, PresentMode};

pub type SharedWriter = Rc<RefCell<Box<dyn Write>>>;

/// First terminal row used by surfaces
pub const SURFACE_TOP: u16 = 1;

pub struct TerminalSurface {
    id: u64,
    framebuffer: Framebuffer,
    mode: PresentMode,
    writer: SharedWriter,
    disposed: bool,
}

impl TerminalSurface {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }
}

impl RenderSurface for TerminalSurface {
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        if self.disposed {
            return;
        }
        raster::render(&mut self.framebuffer, scene, camera);

        let mut writer = self.writer.borrow_mut();
        if let Err(e) = renderer::present(&self.framebuffer, self.mode, SURFACE_TOP, &mut **writer) {
            warn!(error = %e, "failed to draw frame");
        }
    }

    fn dispose(&mut self) {
        self.framebuffer = Framebuffer::new(0, 0);
        self.disposed = true;
    }
}

pub struct TerminalMount {
    writer: SharedWriter,
    mode: PresentMode,
    events: Sender<LoaderEvent>,
    next_id: u64,
    attached: Option<u64>,
    next_frame: i64,
    pending_frame: Option<FrameHandle>,
    overlay: Option<String>,
    input: Vec<ControlInput>,
}

impl TerminalMount {
    pub fn new(writer: SharedWriter, mode: PresentMode, events: Sender<LoaderEvent>) -> Self {
        Self {
            writer,
            mode,
            events,
            next_id: 0,
            attached: None,
            next_frame: 0,
            pending_frame: None,
            overlay: None,
            input: Vec::new(),
        }
    }

    pub fn mode(&self) -> PresentMode {
        self.mode
    }

    pub fn writer(&self) -> SharedWriter {
        self.writer.clone()
    }

    /// Take the pending frame, if one is scheduled.
    pub fn take_due_frame(&mut self) -> Option<FrameHandle> {
        self.pending_frame.take()
    }

    pub fn push_input(&mut self, input: ControlInput) {
        self.input.push(input);
    }

    pub fn overlay(&self) -> Option<&str> {
        self.overlay.as_deref()
    }

    pub fn attached_surface(&self) -> Option<u64> {
        self.attached
    }

    fn clear_screen(&self) {
        let mut writer = self.writer.borrow_mut();
        if let Err(e) = writer.queue(terminal::Clear(terminal::ClearType::All)) {
            warn!(error = %e, "failed to clear screen");
        }
    }
}

impl Mount for TerminalMount {
    type Surface = TerminalSurface;

    fn create_surface(
        &mut self,
        width: u32,
        height: u32,
        pixel_ratio: f32,
    ) -> Result<TerminalSurface, ViewerError> {
        // Config height is already in framebuffer rows
        let scale = pixel_ratio.max(1.0);
        let width = (width as f32 * scale).round() as u32;
        let height = (height as f32 * scale).round() as u32;
        if width == 0 || height == 0 {
            return Err(ViewerError::Surface(format!(
                "terminal too small ({}x{})",
                width, height
            )));
        }

        self.next_id += 1;
        Ok(TerminalSurface {
            id: self.next_id,
            framebuffer: Framebuffer::new(width, height),
            mode: self.mode,
            writer: self.writer.clone(),
            disposed: false,
        })
    }

    fn attach(&mut self, surface: &TerminalSurface) -> Result<(), ViewerError> {
        if let Some(existing) = self.attached {
            return Err(ViewerError::Surface(format!(
                "surface {} is still attached",
                existing
            )));
        }
        self.attached = Some(surface.id);
        self.clear_screen();
        Ok(())
    }

    fn contains(&self, surface: &TerminalSurface) -> bool {
        self.attached == Some(surface.id)
    }

    fn detach(&mut self, surface: &TerminalSurface) {
        if self.attached == Some(surface.id) {
            self.attached = None;
            self.clear_screen();
        }
    }

    fn request_frame(&mut self) -> Result<FrameHandle, ViewerError> {
        self.next_frame += 1;
        let handle = FrameHandle(self.next_frame);
        self.pending_frame = Some(handle);
        Ok(handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending_frame == Some(handle) {
            self.pending_frame = None;
        }
    }

    fn begin_load(&mut self, request: LoadRequest) {
        loader::spawn(request, self.events.clone());
    }

    fn show_overlay(&mut self, message: Option<&str>) {
        self.overlay = message.map(str::to_string);
    }

    fn drain_input(&mut self) -> Vec<ControlInput> {
        std::mem::take(&mut self.input)
    }
}
