//! x11q-surface - surface and resolution negotiation for a remote X11 framebuffer
//!
//! Decides what size the virtual display should have, fits it into the
//! host drawing area without distorting it, and tells the native
//! rendering backend whenever the surface identity or size changes.
//!
//! ```text
//! settings ──> configure_resolution ──> logical size
//!                                          │
//! host layout ──> on_measure ──> presentation size + fixed buffer
//!                                          │
//! surface lifecycle ──> observer(surface, physical, logical) ──> native sink
//! ```

pub mod coordinator;
pub mod error;
pub mod render_state;
pub mod resolution;
pub mod settings;
pub mod thermal;
pub mod viewer;

pub use coordinator::{SurfaceCoordinator, SurfaceHandle, SurfaceObserver, SurfaceUpdate};
pub use error::SurfaceError;
pub use render_state::RenderState;
pub use resolution::{configure_resolution, measure, ResolutionConfig, Size};
