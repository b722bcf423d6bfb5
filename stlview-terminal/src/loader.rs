/// Background loading of STL files from the local filesystem
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use stlview_core::{decode_mesh, LoadError, LoadProgress, LoadRequest, LoadTicket, Mesh};
use tracing::{debug, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// Messages from a loader thread to the UI loop
#[derive(Debug)]
pub enum LoaderEvent {
    Progress(LoadTicket, LoadProgress),
    Finished(LoadTicket, Result<Mesh, LoadError>),
}

/// Accept plain paths and `file://` URLs.
pub fn resolve_path(source: &str) -> PathBuf {
    PathBuf::from(source.strip_prefix("file://").unwrap_or(source))
}

type LoaderJob = Box<dyn FnOnce() + Send>;

/// Read, decode and report on a separate thread.
pub fn spawn(request: LoadRequest, events: Sender<LoaderEvent>) {
    spawn_with(request, events, |job| {
        thread::Builder::new()
            .name("stl-loader".to_string())
            .spawn(job)
            .map(|_| ())
    });
}

/// Run the load through `spawner`; if it cannot start, post the failure
/// so the viewer still leaves the loading state.
fn spawn_with<S>(request: LoadRequest, events: Sender<LoaderEvent>, spawner: S)
where
    S: FnOnce(LoaderJob) -> io::Result<()>,
{
    let ticket = request.ticket;
    let url = request.url.clone();
    let fallback = events.clone();

    let job: LoaderJob = Box::new(move || {
        let result = load(&request.url, |progress| {
            // Receiver may be gone after shutdown
            let _ = events.send(LoaderEvent::Progress(ticket, progress));
        });
        let _ = events.send(LoaderEvent::Finished(ticket, result));
    });

    if let Err(e) = spawner(job) {
        warn!(error = %e, "failed to start loader thread");
        let _ = fallback.send(LoaderEvent::Finished(
            ticket,
            Err(LoadError::Fetch {
                url,
                reason: format!("cannot start loader: {}", e),
            }),
        ));
    }
}

/// Read the file at `source` in chunks, then decode it.
pub fn load<F>(source: &str, mut on_progress: F) -> Result<Mesh, LoadError>
where
    F: FnMut(LoadProgress),
{
    let path = resolve_path(source);
    let bytes = read_with_progress(&path, &mut on_progress).map_err(|e| LoadError::Fetch {
        url: source.to_string(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read model file");
    decode_mesh(&bytes)
}

fn read_with_progress<F>(path: &Path, on_progress: &mut F) -> std::io::Result<Vec<u8>>
where
    F: FnMut(LoadProgress),
{
    let mut file = File::open(path)?;
    let total = file.metadata().ok().map(|m| m.len());
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        on_progress(LoadProgress {
            loaded: bytes.len() as u64,
            total,
        });
    }
    Ok(bytes)
}
