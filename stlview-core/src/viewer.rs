//! Viewer lifecycle: mount a surface, load one mesh, frame it and render
//! until torn down.
//!
//! Hosts implement [`Mount`] for their container and scheduler. The viewer
//! drives it through a strict cycle: [`Viewer::new`] (or a config change)
//! tears down whatever the previous cycle created, builds a fresh scene,
//! camera, controls and surface, and asks the mount to fetch the model.
//! Load completions are matched against the live cycle by [`LoadTicket`],
//! so a fetch that finishes after teardown never touches a disposed scene.

use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::controls::{ControlInput, OrbitControls};
use crate::error::{LoadError, ViewerError};
use crate::fit::CameraFit;
use crate::geometry::Mesh;
use crate::lighting::{Light, PhongMaterial};
use crate::loader::{LoadProgress, LoadRequest, LoadTicket};
use crate::projection::Camera;
use crate::scene::{Scene, SceneMesh};

pub const LOADING_MESSAGE: &str = "Loading model...";

/// Handle of a scheduled frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub i64);

/// A drawable output owned by one viewer cycle
pub trait RenderSurface {
    fn render(&mut self, scene: &Scene, camera: &Camera);

    /// Release GPU/host resources. Called exactly once per surface.
    fn dispose(&mut self);
}

/// The host container and scheduler a viewer is mounted into
pub trait Mount {
    type Surface: RenderSurface;

    /// Create a surface of `width`×`height` logical pixels at `pixel_ratio`.
    fn create_surface(
        &mut self,
        width: u32,
        height: u32,
        pixel_ratio: f32,
    ) -> Result<Self::Surface, ViewerError>;

    fn attach(&mut self, surface: &Self::Surface) -> Result<(), ViewerError>;

    /// Whether `surface` is still part of the container
    fn contains(&self, surface: &Self::Surface) -> bool;

    fn detach(&mut self, surface: &Self::Surface);

    /// Device pixels per logical pixel
    fn pixel_ratio(&self) -> f32 {
        1.0
    }

    /// Schedule one call to [`Viewer::frame`].
    fn request_frame(&mut self) -> Result<FrameHandle, ViewerError>;

    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Start fetching `request.url`; report back through
    /// [`Viewer::report_progress`] and [`Viewer::finish_load`].
    fn begin_load(&mut self, request: LoadRequest);

    /// Show `message` over the surface, or hide the overlay on `None`.
    fn show_overlay(&mut self, message: Option<&str>);

    /// Input gathered since the previous frame
    fn drain_input(&mut self) -> Vec<ControlInput> {
        Vec::new()
    }
}

/// Outcome of the current cycle's load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

struct SceneState<S> {
    scene: Scene,
    camera: Camera,
    controls: OrbitControls,
    surface: Option<S>,
    frame: Option<FrameHandle>,
    load: LoadState,
}

pub struct Viewer<M: Mount> {
    mount: M,
    config: ViewerConfig,
    state: Option<SceneState<M::Surface>>,
    generation: u64,
}

impl<M: Mount> Viewer<M> {
    /// Mount a viewer and start loading `config.source_url`.
    pub fn new(mount: M, config: ViewerConfig) -> Result<Self, ViewerError> {
        let mut viewer = Self {
            mount,
            config,
            state: None,
            generation: 0,
        };
        viewer.initialize()?;
        Ok(viewer)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn mount(&self) -> &M {
        &self.mount
    }

    pub fn mount_mut(&mut self) -> &mut M {
        &mut self.mount
    }

    /// Apply a new config; re-initializes only when it differs.
    ///
    /// Returns whether a new cycle was started.
    pub fn reconfigure(&mut self, config: ViewerConfig) -> Result<bool, ViewerError> {
        if config == self.config && self.state.is_some() {
            return Ok(false);
        }
        config.validate()?;
        self.config = config;
        self.initialize()?;
        Ok(true)
    }

    /// Tear down and rebuild with the current config, fetching the model again.
    pub fn reload(&mut self) -> Result<(), ViewerError> {
        self.initialize()
    }

    fn initialize(&mut self) -> Result<(), ViewerError> {
        self.teardown();
        self.config.validate()?;

        let ViewerConfig {
            width,
            height,
            background_color,
            ..
        } = self.config;

        let mut scene = Scene::new(background_color);
        let camera = Camera::new(width, height);

        let pixel_ratio = self.mount.pixel_ratio();
        let surface = self.mount.create_surface(width, height, pixel_ratio)?;
        if let Err(e) = self.mount.attach(&surface) {
            let mut surface = surface;
            surface.dispose();
            return Err(e);
        }

        let controls = OrbitControls::new();
        for light in Light::studio_rig() {
            scene.add_light(light);
        }

        self.generation += 1;
        let ticket = LoadTicket {
            generation: self.generation,
        };

        // Stored before scheduling so a failure below still tears it down
        self.state = Some(SceneState {
            scene,
            camera,
            controls,
            surface: Some(surface),
            frame: None,
            load: LoadState::Loading,
        });

        let frame = match self.mount.request_frame() {
            Ok(handle) => handle,
            Err(e) => {
                self.teardown();
                return Err(e);
            }
        };
        if let Some(state) = self.state.as_mut() {
            state.frame = Some(frame);
        }

        info!(
            url = %self.config.source_url,
            width,
            height,
            pixel_ratio,
            generation = self.generation,
            "viewer initialized"
        );

        self.mount.show_overlay(Some(LOADING_MESSAGE));
        self.mount.begin_load(LoadRequest {
            ticket,
            url: self.config.source_url.clone(),
        });
        Ok(())
    }

    /// Informational progress from the host's loader.
    pub fn report_progress(&mut self, ticket: LoadTicket, progress: LoadProgress) {
        if live_state(&mut self.state, self.generation, ticket).is_none() {
            return;
        }
        match progress.fraction() {
            Some(fraction) => debug!(
                loaded = progress.loaded,
                percent = (fraction * 100.0).round(),
                "model loading"
            ),
            None => debug!(loaded = progress.loaded, "model loading"),
        }
    }

    /// Apply the outcome of a load.
    ///
    /// Returns false when the ticket is stale (torn down, superseded or
    /// already completed) and the result was dropped.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Mesh, LoadError>) -> bool {
        let model_color = self.config.model_color;
        let Some(state) = live_state(&mut self.state, self.generation, ticket) else {
            debug!(
                generation = ticket.generation,
                "dropping load result for inactive viewer"
            );
            return false;
        };

        let overlay = match result {
            Ok(mut mesh) => {
                mesh.center();
                let Some(bounds) = mesh.bounding_box() else {
                    return Self::fail(state, &mut self.mount, LoadError::EmptyMesh);
                };
                let extent = bounds.max_dimension();
                if !extent.is_finite() || extent <= 0.0 {
                    return Self::fail(state, &mut self.mount, LoadError::Degenerate);
                }
                let fit = CameraFit::for_bounds(&bounds, state.camera.fov);
                fit.apply(&mut state.camera);

                info!(
                    triangles = mesh.triangles.len(),
                    max_dimension = bounds.max_dimension(),
                    camera_z = fit.camera_z,
                    near = fit.near,
                    far = fit.far,
                    "model framed"
                );

                state.scene.set_mesh(SceneMesh {
                    mesh,
                    material: PhongMaterial::new(model_color),
                    bounds,
                });
                state.load = LoadState::Ready;
                None
            }
            Err(e) => return Self::fail(state, &mut self.mount, e),
        };

        self.mount.show_overlay(overlay);
        true
    }

    fn fail(state: &mut SceneState<M::Surface>, mount: &mut M, error: LoadError) -> bool {
        warn!(error = %error, "model failed to load");
        let message = error.user_message();
        mount.show_overlay(Some(&message));
        state.load = LoadState::Failed(message);
        true
    }

    /// One render-loop iteration: update controls, draw, reschedule.
    pub fn frame(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.frame = None;

        let viewport_height = self.config.height as f32;
        for input in self.mount.drain_input() {
            state
                .controls
                .handle_input(input, &state.camera, viewport_height);
        }
        state.controls.update(&mut state.camera);

        if let Some(surface) = state.surface.as_mut() {
            surface.render(&state.scene, &state.camera);
        }

        match self.mount.request_frame() {
            Ok(handle) => state.frame = Some(handle),
            Err(e) => warn!(error = %e, "render loop stopped"),
        }
    }

    /// Release everything the current cycle created. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        let Some(mut state) = self.state.take() else {
            return;
        };

        if let Some(handle) = state.frame.take() {
            self.mount.cancel_frame(handle);
        }
        state.scene.clear();
        state.controls.dispose();
        if let Some(mut surface) = state.surface.take() {
            surface.dispose();
            if self.mount.contains(&surface) {
                self.mount.detach(&surface);
            }
        }
        self.mount.show_overlay(None);

        debug!(generation = self.generation, "viewer torn down");
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn load_state(&self) -> Option<&LoadState> {
        self.state.as_ref().map(|s| &s.load)
    }

    /// Overlay text for the current cycle, if any
    pub fn overlay_message(&self) -> Option<&str> {
        match self.load_state()? {
            LoadState::Loading => Some(LOADING_MESSAGE),
            LoadState::Failed(message) => Some(message),
            LoadState::Ready => None,
        }
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.state.as_ref().map(|s| &s.scene)
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.state.as_ref().map(|s| &s.camera)
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.state.as_ref().map(|s| &s.controls)
    }

    /// Ticket of the load still pending in the live cycle
    pub fn load_ticket(&self) -> Option<LoadTicket> {
        let state = self.state.as_ref()?;
        (state.load == LoadState::Loading).then_some(LoadTicket {
            generation: self.generation,
        })
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.state.as_ref().and_then(|s| s.frame)
    }
}

/// The scene state `ticket` may still mutate, if its cycle is live and loading.
fn live_state<S>(
    state: &mut Option<SceneState<S>>,
    generation: u64,
    ticket: LoadTicket,
) -> Option<&mut SceneState<S>> {
    if ticket.generation != generation {
        return None;
    }
    state
        .as_mut()
        .filter(|state| state.load == LoadState::Loading)
}

impl<M: Mount> Drop for Viewer<M> {
    fn drop(&mut self) {
        self.teardown();
    }
}
