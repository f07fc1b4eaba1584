//! Surface coordinator
//!
//! Single source of truth for the current drawable surface and the size
//! contract that applies to it. All lifecycle callbacks arrive on the host
//! UI thread; only [`SurfaceCoordinator::set_observer`] may be called from
//! elsewhere, in which case the re-sync is posted to the UI thread.

use crate::error::Result;
use crate::render_state::{Geometry, RenderState};
use crate::resolution::{self, LogicalSize, Measurement, PhysicalSize, Size};
use crate::settings::{self, SettingsSource, ViewOptions};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Opaque identity of a host drawable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Pixel formats the native backend accepts. Only one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PixelFormat {
    /// HAL_PIXEL_FORMAT_BGRA_8888
    Bgra8888 = 5,
}

/// What the observer learns on every surface transition.
///
/// A destroyed surface is reported with all-zero sizes. Zero sizes alone
/// don't mean destroyed: a surface that exists before the first measure
/// reports zeros too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceUpdate {
    pub surface: Option<SurfaceHandle>,
    pub physical: PhysicalSize,
    pub logical: LogicalSize,
    destroyed: bool,
}

impl SurfaceUpdate {
    pub fn new(surface: Option<SurfaceHandle>, physical: PhysicalSize, logical: LogicalSize) -> Self {
        Self {
            surface,
            physical,
            logical,
            destroyed: false,
        }
    }

    pub fn destroyed(surface: Option<SurfaceHandle>) -> Self {
        Self {
            surface,
            physical: Size::ZERO,
            logical: Size::ZERO,
            destroyed: true,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

/// The host-provided drawable.
pub trait HostSurface: Send + Sync {
    fn set_format(&self, format: PixelFormat);
    /// Fix the backing buffer to `size` regardless of on-screen size.
    fn set_fixed_size(&self, size: LogicalSize);
}

/// One-time native backend setup.
pub trait NativeInitializer {
    fn native_init(&self);
}

/// Raw surface handle notifications for the native backend.
pub trait NativeSurfaceSink: Send + Sync {
    fn surface_changed(&self, surface: Option<SurfaceHandle>);
}

/// Receives every surface transition.
pub trait SurfaceObserver: Send + Sync {
    fn on_surface_changed(&self, update: &SurfaceUpdate);
}

impl<F> SurfaceObserver for F
where
    F: Fn(&SurfaceUpdate) + Send + Sync,
{
    fn on_surface_changed(&self, update: &SurfaceUpdate) {
        self(update)
    }
}

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// "Run on UI thread" capability.
pub trait UiThread: Send + Sync {
    /// Whether the caller is already on the UI thread.
    fn is_current(&self) -> bool;
    /// Queue `task` for the UI thread. Must not block.
    fn post(&self, task: UiTask);
}

/// Everything the coordinator talks to.
pub struct Collaborators {
    pub host: Arc<dyn HostSurface>,
    pub native: Arc<dyn NativeSurfaceSink>,
    pub ui: Arc<dyn UiThread>,
    /// `None` behaves as native resolution.
    pub settings: Option<Arc<dyn SettingsSource>>,
    pub render: Arc<RenderState>,
}

#[derive(Default)]
struct SurfaceState {
    observer: Option<Arc<dyn SurfaceObserver>>,
    surface: Option<SurfaceHandle>,
    /// Size granted by the last measurement pass.
    measured: PhysicalSize,
    logical: LogicalSize,
}

struct Shared {
    parts: Collaborators,
    options: ViewOptions,
    state: Mutex<SurfaceState>,
}

#[derive(Clone)]
pub struct SurfaceCoordinator {
    shared: Arc<Shared>,
}

impl SurfaceCoordinator {
    /// Runs `initializer` once, then takes ownership of the collaborators.
    pub fn new(parts: Collaborators, initializer: &dyn NativeInitializer, options: ViewOptions) -> Self {
        initializer.native_init();
        Self {
            shared: Arc::new(Shared {
                parts,
                options,
                state: Mutex::new(SurfaceState::default()),
            }),
        }
    }

    pub fn options(&self) -> ViewOptions {
        self.shared.options
    }

    pub fn render_state(&self) -> &Arc<RenderState> {
        &self.shared.parts.render
    }

    pub fn current_surface(&self) -> Option<SurfaceHandle> {
        self.state().surface
    }

    pub fn measured_size(&self) -> PhysicalSize {
        self.state().measured
    }

    pub fn logical_size(&self) -> LogicalSize {
        self.state().logical
    }

    /// Logical size for `physical` under the current settings.
    pub fn configure_resolution(&self, physical: PhysicalSize) -> Result<LogicalSize> {
        let config = settings::resolution_config(self.shared.parts.settings.as_deref());
        resolution::configure_resolution(&config, physical)
    }

    /// Layout pass: fit the logical size into `physical` and pin the
    /// backing buffer to it.
    pub fn on_measure(&self, physical: PhysicalSize) -> Result<Measurement> {
        let logical = self.configure_resolution(physical)?;
        let m = resolution::measure(physical, logical);

        if let Some(buffer) = m.fixed_buffer {
            self.shared.parts.host.set_fixed_size(buffer);
        }

        {
            let mut state = self.state();
            state.measured = m.presentation;
            state.logical = logical;
        }
        self.shared
            .parts
            .render
            .set_geometry(Geometry::new(m.presentation, logical));

        tracing::trace!("measured {} -> {} (buffer {})", physical, m.presentation, logical);
        Ok(m)
    }

    pub fn on_surface_created(&self, surface: SurfaceHandle) {
        self.shared.parts.host.set_format(PixelFormat::Bgra8888);
        self.state().surface = Some(surface);
        tracing::debug!("surface {:?} created", surface);
    }

    /// The size carried by the host event is ignored: the last measured
    /// size is reported instead.
    pub fn on_surface_changed(&self, surface: Option<SurfaceHandle>, event_size: PhysicalSize) -> Result<()> {
        let measured = self.measured_size();
        tracing::debug!("surface changed: {} (event {})", measured, event_size);

        let logical = self.configure_resolution(measured)?;
        let observer = {
            let mut state = self.state();
            state.surface = surface;
            state.logical = logical;
            state.observer.clone()
        };
        self.shared
            .parts
            .render
            .set_geometry(Geometry::new(measured, logical));

        if let Some(observer) = observer {
            observer.on_surface_changed(&SurfaceUpdate::new(surface, measured, logical));
        }
        self.shared.parts.native.surface_changed(surface);
        Ok(())
    }

    pub fn on_surface_destroyed(&self, surface: Option<SurfaceHandle>) {
        tracing::debug!("surface {:?} destroyed", surface);
        let observer = {
            let mut state = self.state();
            state.surface = None;
            state.observer.clone()
        };

        if let Some(observer) = observer {
            observer.on_surface_changed(&SurfaceUpdate::destroyed(surface));
        }
        self.shared.parts.native.surface_changed(surface);
    }

    /// Replace the observer and re-deliver the current surface state to it.
    pub fn set_observer(&self, observer: Option<Arc<dyn SurfaceObserver>>) {
        self.state().observer = observer;
        tracing::debug!("observer attached");

        let ui = &self.shared.parts.ui;
        if ui.is_current() {
            self.resync();
        } else {
            let this = self.clone();
            ui.post(Box::new(move || this.resync()));
        }
    }

    fn resync(&self) {
        let surface = self.current_surface();
        let measured = self.measured_size();
        if let Err(e) = self.on_surface_changed(surface, measured) {
            tracing::error!("surface resync failed: {e}");
        }
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
