//! Windowed viewer
//!
//! Hosts the coordinator in a resizable minifb window. An X display is
//! sampled with GetImage into the logical backing buffer, which is then
//! presented letterboxed inside the window. The render loop thread is the
//! UI thread.

use crate::coordinator::{
    Collaborators, HostSurface, NativeInitializer, NativeSurfaceSink, PixelFormat, SurfaceCoordinator,
    SurfaceHandle, SurfaceUpdate, UiTask, UiThread,
};
use crate::render_state::RenderState;
use crate::resolution::{LogicalSize, Size};
use crate::settings::{DisplaySettings, SettingsSource, ViewOptions};
use crate::thermal::{self, TemperatureTier, ThermalSampler};
use anyhow::{Context, Result};
use minifb::{Key, MouseMode, Window, WindowOptions};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, ImageFormat};
use x11rb::rust_connection::RustConnection;

const BACKGROUND: u32 = 0x000000;
const CURSOR_COLOR: u32 = 0xffffff;
const TITLE_REFRESH: Duration = Duration::from_secs(1);

/// Backing buffer bookkeeping for the window.
#[derive(Default)]
struct WindowHost {
    format: Mutex<Option<PixelFormat>>,
    fixed: Mutex<Option<LogicalSize>>,
}

impl WindowHost {
    fn format(&self) -> Option<PixelFormat> {
        *self.format.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fixed_size(&self) -> Option<LogicalSize> {
        *self.fixed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HostSurface for WindowHost {
    fn set_format(&self, format: PixelFormat) {
        *self.format.lock().unwrap_or_else(PoisonError::into_inner) = Some(format);
    }

    fn set_fixed_size(&self, size: LogicalSize) {
        *self.fixed.lock().unwrap_or_else(PoisonError::into_inner) = Some(size);
    }
}

/// Logs what a native backend binding would receive.
struct LoggingBackend;

impl NativeInitializer for LoggingBackend {
    fn native_init(&self) {
        tracing::info!("native backend initialized");
    }
}

impl NativeSurfaceSink for LoggingBackend {
    fn surface_changed(&self, surface: Option<SurfaceHandle>) {
        tracing::debug!("native surface handle {:?}", surface);
    }
}

/// Tasks posted from other threads, drained once per frame.
struct LoopUi {
    thread: ThreadId,
    tx: mpsc::UnboundedSender<UiTask>,
}

impl LoopUi {
    fn new() -> (Self, mpsc::UnboundedReceiver<UiTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                thread: thread::current().id(),
                tx,
            },
            rx,
        )
    }
}

impl UiThread for LoopUi {
    fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    fn post(&self, task: UiTask) {
        if self.tx.send(task).is_err() {
            tracing::warn!("ui loop gone, dropping task");
        }
    }
}

/// Pixels of the remote display in 0RGB.
enum FrameSource {
    X11 {
        conn: RustConnection,
        root: u32,
        size: Size,
    },
    Pattern {
        size: Size,
    },
}

impl FrameSource {
    fn connect(display: Option<&str>) -> Result<Self> {
        let Some(display) = display else {
            return Ok(Self::Pattern {
                size: Size::new(1280, 720),
            });
        };

        let (conn, screen_num) =
            x11rb::connect(Some(display)).context("failed to connect to X display")?;
        let screen = &conn.setup().roots[screen_num];
        let size = Size::new(
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        );
        let root = screen.root;
        eprintln!("Screen: {}", size);
        Ok(Self::X11 { conn, root, size })
    }

    fn size(&self) -> Size {
        match self {
            Self::X11 { size, .. } | Self::Pattern { size } => *size,
        }
    }

    fn grab(&self, frame: &mut Vec<u32>, tick: u32) -> Result<()> {
        let size = self.size();
        frame.resize(size.width as usize * size.height as usize, BACKGROUND);

        match self {
            Self::X11 { conn, root, .. } => {
                let image = conn
                    .get_image(
                        ImageFormat::Z_PIXMAP,
                        *root,
                        0,
                        0,
                        size.width as u16,
                        size.height as u16,
                        !0,
                    )?
                    .reply()?;

                // BGRA -> 0RGB
                for (px, chunk) in frame.iter_mut().zip(image.data.chunks_exact(4)) {
                    let b = u32::from(chunk[0]);
                    let g = u32::from(chunk[1]);
                    let r = u32::from(chunk[2]);
                    *px = (r << 16) | (g << 8) | b;
                }
            }
            Self::Pattern { .. } => {
                let w = size.width as usize;
                for (i, px) in frame.iter_mut().enumerate() {
                    let x = (i % w) as u32;
                    let y = (i / w) as u32;
                    let checker = ((x / 64) + (y / 64)) % 2 == 0;
                    let shade = ((x.wrapping_add(tick) & 0xff) << 8) | (y & 0xff);
                    *px = if checker { 0x202020 | shade } else { 0x101010 };
                }
            }
        }
        Ok(())
    }
}

/// Nearest-neighbour scale of `src` into `dst`.
fn scale_into(src: &[u32], src_size: Size, dst: &mut [u32], dst_size: Size) {
    if !src_size.is_resolved() || !dst_size.is_resolved() {
        return;
    }
    let (sw, sh) = (src_size.width as usize, src_size.height as usize);
    let (dw, dh) = (dst_size.width as usize, dst_size.height as usize);
    for dy in 0..dh {
        let sy = dy * sh / dh;
        for dx in 0..dw {
            let sx = dx * sw / dw;
            dst[dy * dw + dx] = src[sy * sw + sx];
        }
    }
}

/// Top-left of the presentation area centered in the window.
fn presentation_origin(window: Size, presentation: Size) -> (u32, u32) {
    (
        window.width.saturating_sub(presentation.width) / 2,
        window.height.saturating_sub(presentation.height) / 2,
    )
}

/// Copy the backing buffer into the window, letterboxed.
fn present(backing: &[u32], logical: Size, window_buf: &mut [u32], window: Size, presentation: Size) {
    window_buf.fill(BACKGROUND);
    let (ox, oy) = presentation_origin(window, presentation);
    let (lw, lh) = (logical.width as usize, logical.height as usize);
    let (pw, ph) = (
        presentation.width.min(window.width) as usize,
        presentation.height.min(window.height) as usize,
    );
    if lw == 0 || lh == 0 || pw == 0 || ph == 0 {
        return;
    }
    let ww = window.width as usize;
    for py in 0..ph {
        let sy = py * lh / ph;
        let row = (oy as usize + py) * ww + ox as usize;
        for px in 0..pw {
            window_buf[row + px] = backing[sy * lw + px * lw / pw];
        }
    }
}

fn draw_cursor(buf: &mut [u32], size: Size, x: f32, y: f32) {
    let (w, h) = (size.width as i64, size.height as i64);
    let (cx, cy) = (x as i64, y as i64);
    for d in -6i64..=6 {
        for (px, py) in [(cx + d, cy), (cx, cy + d)] {
            if (0..w).contains(&px) && (0..h).contains(&py) {
                buf[(py * w + px) as usize] = CURSOR_COLOR;
            }
        }
    }
}

fn window_title(display: &str, logical: Size, celsius: f32) -> String {
    let tier = TemperatureTier::classify(celsius);
    format!(
        "x11q-surface {} - {} - {} [{:?}]",
        display,
        logical,
        thermal::overlay_text(celsius),
        tier
    )
}

fn window_size(window: &Window) -> Size {
    let (w, h) = window.get_size();
    Size::new(w as u32, h as u32)
}

/// Run the viewer until the window closes or Escape is pressed.
pub async fn run_viewer(display: Option<&str>, settings: DisplaySettings, options: ViewOptions) -> Result<()> {
    let source = FrameSource::connect(display)?;
    let remote = source.size();
    let label = display.unwrap_or("pattern");

    let mut window = Window::new(
        &format!("x11q-surface {}", label),
        remote.width as usize,
        remote.height as usize,
        WindowOptions {
            resize: true,
            scale: minifb::Scale::X1,
            ..Default::default()
        },
    )
    .context("failed to create window")?;
    window.set_target_fps(60);

    let render = Arc::new(RenderState::new());
    let host = Arc::new(WindowHost::default());
    let (ui, mut ui_tasks) = LoopUi::new();
    let backend = Arc::new(LoggingBackend);

    let coordinator = SurfaceCoordinator::new(
        Collaborators {
            host: host.clone(),
            native: backend.clone(),
            ui: Arc::new(ui),
            settings: Some(Arc::new(settings) as Arc<dyn SettingsSource>),
            render: Arc::clone(&render),
        },
        backend.as_ref(),
        options,
    );
    tracing::debug!("view options {:?}", coordinator.options());

    let mut thermal_task = ThermalSampler::new(Arc::clone(&render)).start(thermal::SAMPLE_INTERVAL);

    let surface = SurfaceHandle(u64::from(std::process::id()));
    let mut win_size = window_size(&window);
    coordinator.on_measure(win_size)?;
    coordinator.set_observer(Some(Arc::new(|u: &SurfaceUpdate| {
        if u.is_destroyed() {
            tracing::info!("surface {:?} detached", u.surface);
        } else {
            tracing::info!(
                "surface {:?} presenting {} at logical {}",
                u.surface,
                u.physical,
                u.logical
            );
        }
    })));
    coordinator.on_surface_created(surface);
    tracing::debug!("surface format {:?}", host.format());
    coordinator.on_surface_changed(Some(surface), win_size)?;

    let mut remote_frame: Vec<u32> = Vec::new();
    let mut backing: Vec<u32> = Vec::new();
    let mut window_buf: Vec<u32> = Vec::new();
    let mut tick = 0u32;
    let mut last_title: Option<Instant> = None;

    eprintln!("x11q-surface viewer ready ({})", label);

    loop {
        if !window.is_open() || window.is_key_down(Key::Escape) {
            break;
        }

        while let Ok(task) = ui_tasks.try_recv() {
            task();
        }

        let current = window_size(&window);
        if current != win_size {
            win_size = current;
            coordinator.on_measure(win_size)?;
            coordinator.on_surface_changed(Some(surface), win_size)?;
        }

        let logical = host.fixed_size().unwrap_or(remote);
        let presentation = coordinator.measured_size();

        source.grab(&mut remote_frame, tick)?;
        backing.resize(logical.width as usize * logical.height as usize, BACKGROUND);
        scale_into(&remote_frame, remote, &mut backing, logical);

        if let Some((mx, my)) = window.get_mouse_pos(MouseMode::Discard) {
            let (ox, oy) = presentation_origin(win_size, presentation);
            let p = render.map_to_image(mx - ox as f32, my - oy as f32);
            if render.set_cursor_position(p.x, p.y) {
                tracing::trace!("cursor {:.1},{:.1}", p.x, p.y);
            }
        }
        let cursor = render.cursor_position();
        draw_cursor(&mut backing, logical, cursor.x, cursor.y);

        window_buf.resize(win_size.width as usize * win_size.height as usize, BACKGROUND);
        present(&backing, logical, &mut window_buf, win_size, presentation);
        window
            .update_with_buffer(&window_buf, win_size.width as usize, win_size.height as usize)
            .context("render error")?;

        if last_title.map_or(true, |t| t.elapsed() >= TITLE_REFRESH) {
            window.set_title(&window_title(label, logical, render.cpu_temperature()));
            last_title = Some(Instant::now());
        }
        tick = tick.wrapping_add(1);
    }

    coordinator.on_surface_destroyed(Some(surface));
    thermal_task.stop();
    eprintln!("viewer closed");
    Ok(())
}
