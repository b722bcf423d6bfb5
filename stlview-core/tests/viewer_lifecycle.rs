use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::{Point3, Vector3};
use proptest::prelude::*;
use stlview_core::*;

#[derive(Default)]
struct HostLog {
    next_surface: u32,
    attached: Vec<u32>,
    disposed: Vec<u32>,
    detach_calls: u32,
    renders: Vec<(u32, bool)>,
    next_frame: i64,
    pending_frames: Vec<FrameHandle>,
    loads: Vec<LoadRequest>,
    overlay: Option<String>,
    input: Vec<ControlInput>,
}

struct FakeSurface {
    id: u32,
    log: Rc<RefCell<HostLog>>,
}

impl RenderSurface for FakeSurface {
    fn render(&mut self, scene: &Scene, _camera: &Camera) {
        self.log.borrow_mut().renders.push((self.id, scene.has_mesh()));
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().disposed.push(self.id);
    }
}

struct FakeMount {
    log: Rc<RefCell<HostLog>>,
}

impl Mount for FakeMount {
    type Surface = FakeSurface;

    fn create_surface(&mut self, _w: u32, _h: u32, _ratio: f32) -> Result<FakeSurface, ViewerError> {
        let mut log = self.log.borrow_mut();
        log.next_surface += 1;
        Ok(FakeSurface {
            id: log.next_surface,
            log: self.log.clone(),
        })
    }

    fn attach(&mut self, surface: &FakeSurface) -> Result<(), ViewerError> {
        self.log.borrow_mut().attached.push(surface.id);
        Ok(())
    }

    fn contains(&self, surface: &FakeSurface) -> bool {
        self.log.borrow().attached.contains(&surface.id)
    }

    fn detach(&mut self, surface: &FakeSurface) {
        let mut log = self.log.borrow_mut();
        log.detach_calls += 1;
        log.attached.retain(|id| *id != surface.id);
    }

    fn request_frame(&mut self) -> Result<FrameHandle, ViewerError> {
        let mut log = self.log.borrow_mut();
        log.next_frame += 1;
        let handle = FrameHandle(log.next_frame);
        log.pending_frames.push(handle);
        Ok(handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.log.borrow_mut().pending_frames.retain(|h| *h != handle);
    }

    fn begin_load(&mut self, request: LoadRequest) {
        self.log.borrow_mut().loads.push(request);
    }

    fn show_overlay(&mut self, message: Option<&str>) {
        self.log.borrow_mut().overlay = message.map(str::to_string);
    }

    fn drain_input(&mut self) -> Vec<ControlInput> {
        std::mem::take(&mut self.log.borrow_mut().input)
    }
}

fn mounted(config: ViewerConfig) -> (Viewer<FakeMount>, Rc<RefCell<HostLog>>) {
    let log = Rc::new(RefCell::new(HostLog::default()));
    let viewer = Viewer::new(FakeMount { log: log.clone() }, config).unwrap();
    (viewer, log)
}

/// Fire the host's pending frame the way a scheduler would.
fn run_frame(viewer: &mut Viewer<FakeMount>, log: &Rc<RefCell<HostLog>>) {
    let handle = viewer.pending_frame().expect("frame scheduled");
    log.borrow_mut().pending_frames.retain(|h| *h != handle);
    viewer.frame();
}

fn last_ticket(log: &Rc<RefCell<HostLog>>) -> LoadTicket {
    log.borrow().loads.last().unwrap().ticket
}

fn offset_cube() -> Mesh {
    let mut mesh = Mesh::cube(2.0);
    mesh.translate(Vector3::new(12.0, -3.0, 40.0));
    mesh
}

#[test]
fn test_initialize_mounts_one_surface_and_requests_load() {
    let (viewer, log) = mounted(ViewerConfig::new("models/bracket.stl"));
    let log = log.borrow();

    assert_eq!(log.attached, vec![1]);
    assert_eq!(log.pending_frames.len(), 1);
    assert_eq!(log.loads.len(), 1);
    assert_eq!(log.loads[0].url, "models/bracket.stl");
    assert_eq!(log.overlay.as_deref(), Some(LOADING_MESSAGE));
    assert_eq!(viewer.load_state(), Some(&LoadState::Loading));

    let camera = viewer.camera().unwrap();
    assert_eq!(camera.fov, 75.0);
    assert_eq!(camera.position.z, 5.0);
    assert_eq!(viewer.scene().unwrap().lights.len(), 3);
}

#[test]
fn test_successful_load_centers_and_frames_mesh() {
    let (mut viewer, log) = mounted(ViewerConfig::new("cube.stl"));
    let ticket = last_ticket(&log);

    assert!(viewer.finish_load(ticket, Ok(offset_cube())));

    let model = viewer.scene().unwrap().mesh().unwrap();
    let center = model.mesh.bounding_box().unwrap().center();
    assert!(center.coords.norm() < 1e-4);
    assert_eq!(model.material.color, viewer.config().model_color);

    let camera = viewer.camera().unwrap();
    assert!((camera.position.z - 2.464).abs() < 1e-3);
    assert!((camera.near - 0.1).abs() < 1e-6);
    assert!((camera.far - 6.928).abs() < 1e-3);

    assert_eq!(viewer.load_state(), Some(&LoadState::Ready));
    assert_eq!(viewer.overlay_message(), None);
    assert_eq!(log.borrow().overlay, None);
}

#[test]
fn test_failed_load_shows_error_and_keeps_rendering() {
    let (mut viewer, log) = mounted(ViewerConfig::new("missing.stl"));
    let ticket = last_ticket(&log);

    let error = LoadError::Status {
        url: "missing.stl".to_string(),
        status: 404,
    };
    assert!(viewer.finish_load(ticket, Err(error.clone())));

    assert!(!viewer.scene().unwrap().has_mesh());
    assert_eq!(
        viewer.load_state(),
        Some(&LoadState::Failed(error.user_message()))
    );
    assert_eq!(viewer.overlay_message(), Some(error.user_message().as_str()));
    assert_eq!(log.borrow().overlay, Some(error.user_message()));

    run_frame(&mut viewer, &log);
    run_frame(&mut viewer, &log);
    let log = log.borrow();
    assert_eq!(log.renders, vec![(1, false), (1, false)]);
    assert_eq!(log.pending_frames.len(), 1);
}

#[test]
fn test_reconfigure_replaces_surface() {
    let (mut viewer, log) = mounted(ViewerConfig::new("a.stl"));
    let first = last_ticket(&log);

    let changed = viewer.config().clone().with_size(640, 480);
    assert!(viewer.reconfigure(changed).unwrap());

    let log_ref = log.borrow();
    assert_eq!(log_ref.attached, vec![2]);
    assert_eq!(log_ref.disposed, vec![1]);
    assert_eq!(log_ref.pending_frames.len(), 1);
    assert_eq!(log_ref.loads.len(), 2);
    assert_ne!(log_ref.loads[1].ticket, first);
    drop(log_ref);

    assert!((viewer.camera().unwrap().aspect - 640.0 / 480.0).abs() < 1e-6);
}

#[test]
fn test_unchanged_config_does_not_reinitialize() {
    let (mut viewer, log) = mounted(ViewerConfig::new("a.stl"));
    let same = viewer.config().clone();
    assert!(!viewer.reconfigure(same).unwrap());
    assert_eq!(log.borrow().loads.len(), 1);
    assert_eq!(log.borrow().attached, vec![1]);
}

#[test]
fn test_invalid_reconfigure_keeps_current_cycle() {
    let (mut viewer, log) = mounted(ViewerConfig::new("a.stl"));
    let bad = viewer.config().clone().with_size(0, 10);
    assert!(viewer.reconfigure(bad).is_err());
    assert!(viewer.is_active());
    assert_eq!(log.borrow().attached, vec![1]);
}

#[test]
fn test_stale_load_is_ignored() {
    let (mut viewer, log) = mounted(ViewerConfig::new("a.stl"));
    let stale = last_ticket(&log);
    viewer
        .reconfigure(ViewerConfig::new("b.stl"))
        .unwrap();

    assert!(!viewer.finish_load(stale, Ok(Mesh::cube(1.0))));
    assert!(!viewer.scene().unwrap().has_mesh());
    assert_eq!(viewer.load_state(), Some(&LoadState::Loading));

    let live = last_ticket(&log);
    assert!(viewer.finish_load(live, Ok(Mesh::cube(1.0))));
}

#[test]
fn test_load_after_teardown_is_ignored() {
    let (mut viewer, log) = mounted(ViewerConfig::new("a.stl"));
    let ticket = last_ticket(&log);
    viewer.teardown();

    assert!(!viewer.finish_load(ticket, Ok(Mesh::cube(1.0))));
    viewer.report_progress(
        ticket,
        LoadProgress {
            loaded: 10,
            total: Some(20),
        },
    );
    assert!(viewer.scene().is_none());
    assert_eq!(log.borrow().overlay, None);
}

#[test]
fn test_load_outcome_is_terminal() {
    let (mut viewer, log) = mounted(ViewerConfig::new("a.stl"));
    let ticket = last_ticket(&log);

    assert!(viewer.finish_load(ticket, Err(LoadError::EmptyMesh)));
    assert!(!viewer.finish_load(ticket, Ok(Mesh::cube(1.0))));
    assert!(!viewer.scene().unwrap().has_mesh());
    assert!(matches!(viewer.load_state(), Some(LoadState::Failed(_))));
}

#[test]
fn test_teardown_is_idempotent() {
    let (mut viewer, log) = mounted(ViewerConfig::new("a.stl"));
    viewer.teardown();
    viewer.teardown();

    assert!(!viewer.is_active());
    viewer.frame();

    let log = log.borrow();
    assert!(log.attached.is_empty());
    assert_eq!(log.disposed, vec![1]);
    assert!(log.pending_frames.is_empty());
    assert!(log.renders.is_empty());
    assert_eq!(log.overlay, None);
}

#[test]
fn test_teardown_skips_detach_when_already_removed() {
    let (mut viewer, log) = mounted(ViewerConfig::new("a.stl"));
    log.borrow_mut().attached.clear();

    viewer.teardown();
    let log = log.borrow();
    assert_eq!(log.detach_calls, 0);
    assert_eq!(log.disposed, vec![1]);
}

#[test]
fn test_frame_applies_input_through_controls() {
    let (mut viewer, log) = mounted(ViewerConfig::new("a.stl"));
    let before = viewer.camera().unwrap().position;

    log.borrow_mut()
        .input
        .push(ControlInput::Rotate { dx: 80.0, dy: 0.0 });
    run_frame(&mut viewer, &log);

    let after = viewer.camera().unwrap().position;
    assert!((after - before).norm() > 1e-3);
    assert!(viewer.controls().unwrap().is_moving());
    assert_eq!(log.borrow().renders.len(), 1);
}

#[test]
fn test_drop_releases_resources() {
    let (viewer, log) = mounted(ViewerConfig::new("a.stl"));
    drop(viewer);

    let log = log.borrow();
    assert!(log.attached.is_empty());
    assert!(log.pending_frames.is_empty());
    assert_eq!(log.disposed, vec![1]);
}

#[test]
fn test_zero_extent_mesh_fails_as_degenerate() {
    let (mut viewer, log) = mounted(ViewerConfig::new("point.stl"));
    let ticket = last_ticket(&log);

    let corner = Point3::new(3.0, 3.0, 3.0);
    let mut mesh = Mesh::new();
    mesh.add_triangle(Triangle::from_facet(Vector3::z(), [corner; 3]));
    assert!(viewer.finish_load(ticket, Ok(mesh)));

    assert!(!viewer.scene().unwrap().has_mesh());
    assert_eq!(
        viewer.load_state(),
        Some(&LoadState::Failed(LoadError::Degenerate.user_message()))
    );
    let camera = viewer.camera().unwrap();
    assert!(camera.view_projection().iter().all(|v| v.is_finite()));
}

#[test]
fn test_load_ticket_only_while_loading() {
    let (mut viewer, log) = mounted(ViewerConfig::new("a.stl"));
    assert_eq!(viewer.load_ticket(), Some(last_ticket(&log)));

    assert!(viewer.finish_load(last_ticket(&log), Ok(Mesh::cube(1.0))));
    assert_eq!(viewer.load_ticket(), None);

    viewer.teardown();
    assert_eq!(viewer.load_ticket(), None);
}

proptest! {
    #[test]
    fn loaded_mesh_is_centered_at_origin(
        size in 1e-2f32..1e3,
        x in -1e3f32..1e3,
        y in -1e3f32..1e3,
        z in -1e3f32..1e3,
    ) {
        let (mut viewer, log) = mounted(ViewerConfig::new("part.stl"));
        let ticket = last_ticket(&log);

        let mut mesh = Mesh::cube(size);
        mesh.translate(Vector3::new(x, y, z));
        prop_assert!(viewer.finish_load(ticket, Ok(mesh)));

        let model = viewer.scene().unwrap().mesh().unwrap();
        let center = model.mesh.bounding_box().unwrap().center();
        let tolerance = 1e-4 * (1.0 + size + x.abs().max(y.abs()).max(z.abs()));
        prop_assert!(center.coords.norm() < tolerance, "center {:?}", center);

        let camera = viewer.camera().unwrap();
        prop_assert!(camera.near < camera.far);
        prop_assert!(camera.position.z > 0.0);
    }
}
