/// Terminal host for the STL viewer
use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use std::cell::RefCell;
use std::io::{stdout, Write};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use stlview_core::{ControlInput, LoadState, Viewer, ViewerConfig};
use tracing::{info, warn};

pub mod loader;
pub mod mount;
pub mod renderer;

pub use loader::LoaderEvent;
pub use mount::{SharedWriter, TerminalMount, TerminalSurface};
pub use renderer::PresentMode;

/// Pixels of pointer travel simulated per key press
const ROTATE_STEP: f32 = 12.0;
const PAN_STEP: f32 = 4.0;

/// Main application struct for terminal model viewing
pub struct TerminalApp {
    template: ViewerConfig,
    mode: PresentMode,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    /// `template` supplies the source and colors; its size is replaced by
    /// the terminal's.
    pub fn new(template: ViewerConfig, mode: PresentMode) -> Self {
        Self {
            template,
            mode,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    /// Viewer config for a terminal of `cols`×`rows` cells.
    pub fn config_for(&self, (cols, rows): (u16, u16)) -> ViewerConfig {
        let rows = rows.saturating_sub(mount::SURFACE_TOP);
        self.template
            .clone()
            .with_size(cols as u32, self.mode.pixel_rows(rows))
    }

    pub fn run(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.session();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn session(&mut self) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let writer: SharedWriter = Rc::new(RefCell::new(Box::new(stdout()) as Box<dyn Write>));
        let mount = TerminalMount::new(writer.clone(), self.mode, tx);

        let mut viewer = Viewer::new(mount, self.config_for(terminal::size()?))?;
        let result = self.main_loop(&mut viewer, &rx, &writer);
        viewer.teardown();
        result
    }

    fn main_loop(
        &mut self,
        viewer: &mut Viewer<TerminalMount>,
        events: &Receiver<LoaderEvent>,
        writer: &SharedWriter,
    ) -> Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?, viewer);
            }

            // Loader results
            while let Ok(event) = events.try_recv() {
                match event {
                    LoaderEvent::Progress(ticket, progress) => {
                        viewer.report_progress(ticket, progress)
                    }
                    LoaderEvent::Finished(ticket, result) => {
                        viewer.finish_load(ticket, result);
                    }
                }
            }

            // Render
            if viewer.mount_mut().take_due_frame().is_some() {
                viewer.frame();
                self.frame_count += 1;
            }
            self.draw_status(viewer, writer)?;
            writer.borrow_mut().flush()?;

            // Frame timing
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event, viewer: &mut Viewer<TerminalMount>) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => self.handle_key(code, viewer),
            Event::Resize(cols, rows) => {
                let config = self.config_for((cols, rows));
                match viewer.reconfigure(config) {
                    Ok(true) => info!(cols, rows, "terminal resized"),
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "cannot fit viewer into terminal"),
                }
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode, viewer: &mut Viewer<TerminalMount>) {
        let input = match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
                return;
            }
            KeyCode::Char('r') => {
                if let Err(e) = viewer.reload() {
                    warn!(error = %e, "reload failed");
                }
                return;
            }
            KeyCode::Char('w') | KeyCode::Up => ControlInput::Rotate {
                dx: 0.0,
                dy: -ROTATE_STEP,
            },
            KeyCode::Char('s') | KeyCode::Down => ControlInput::Rotate {
                dx: 0.0,
                dy: ROTATE_STEP,
            },
            KeyCode::Char('a') | KeyCode::Left => ControlInput::Rotate {
                dx: -ROTATE_STEP,
                dy: 0.0,
            },
            KeyCode::Char('d') | KeyCode::Right => ControlInput::Rotate {
                dx: ROTATE_STEP,
                dy: 0.0,
            },
            KeyCode::Char('i') => ControlInput::Pan {
                dx: 0.0,
                dy: PAN_STEP,
            },
            KeyCode::Char('k') => ControlInput::Pan {
                dx: 0.0,
                dy: -PAN_STEP,
            },
            KeyCode::Char('j') => ControlInput::Pan {
                dx: PAN_STEP,
                dy: 0.0,
            },
            KeyCode::Char('l') => ControlInput::Pan {
                dx: -PAN_STEP,
                dy: 0.0,
            },
            KeyCode::Char('+') | KeyCode::Char('=') => ControlInput::Zoom { delta: -1.0 },
            KeyCode::Char('-') => ControlInput::Zoom { delta: 1.0 },
            _ => return,
        };
        viewer.mount_mut().push_input(input);
    }

    fn draw_status(&self, viewer: &Viewer<TerminalMount>, writer: &SharedWriter) -> Result<()> {
        let (text, color) = match (viewer.load_state(), viewer.mount().overlay()) {
            (Some(LoadState::Failed(_)), Some(message)) => (message.to_string(), Color::Red),
            (_, Some(message)) => (message.to_string(), Color::Yellow),
            _ => (
                format!(
                    "stlview | FPS: {:.1} | WASD/Arrows=Rotate IJKL=Pan +/-=Zoom R=Reload Q=Quit",
                    self.fps
                ),
                Color::Yellow,
            ),
        };

        let width = viewer.config().width as usize;
        let line: String = text.chars().take(width).collect();

        let mut out = writer.borrow_mut();
        queue!(
            out,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            SetForegroundColor(color),
            Print(line),
            ResetColor
        )?;
        Ok(())
    }
}
