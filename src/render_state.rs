//! Render state shared with the frame renderer
//!
//! Geometry is written by the surface negotiation path and read on every
//! frame. The cursor position is written from the input path without a
//! lock: each axis is its own relaxed atomic, so a reader may pair `x`
//! from one update with `y` from another. That is accepted; the value
//! only positions the drawn pointer.

use crate::resolution::Size;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Screen (presentation) and image (backing buffer) dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Image pixels per screen pixel, per axis.
    pub scale: PointF,
    pub screen_width: u32,
    pub screen_height: u32,
    pub image_width: u32,
    pub image_height: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            scale: PointF::new(1.0, 1.0),
            screen_width: 0,
            screen_height: 0,
            image_width: 0,
            image_height: 0,
        }
    }
}

impl Geometry {
    pub fn new(screen: Size, image: Size) -> Self {
        Self {
            scale: PointF::new(ratio(image.width, screen.width), ratio(image.height, screen.height)),
            screen_width: screen.width,
            screen_height: screen.height,
            image_width: image.width,
            image_height: image.height,
        }
    }

    pub fn screen(&self) -> Size {
        Size::new(self.screen_width, self.screen_height)
    }

    pub fn image(&self) -> Size {
        Size::new(self.image_width, self.image_height)
    }
}

fn ratio(image: u32, screen: u32) -> f32 {
    if image == 0 || screen == 0 {
        1.0
    } else {
        image as f32 / screen as f32
    }
}

/// f32 stored as raw bits.
#[derive(Debug, Default)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
pub struct RenderState {
    geometry: RwLock<Geometry>,
    cursor_x: AtomicF32,
    cursor_y: AtomicF32,
    cpu_temperature: AtomicF32,
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current geometry.
    pub fn geometry(&self) -> Geometry {
        *self.geometry.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_geometry(&self, geometry: Geometry) {
        *self.geometry.write().unwrap_or_else(PoisonError::into_inner) = geometry;
    }

    /// Copy of the last reported pointer position.
    pub fn cursor_position(&self) -> PointF {
        PointF::new(self.cursor_x.load(), self.cursor_y.load())
    }

    /// Store a new pointer position. Returns true if either axis changed.
    pub fn set_cursor_position(&self, x: f32, y: f32) -> bool {
        let mut moved = false;
        if x != self.cursor_x.load() {
            self.cursor_x.store(x);
            moved = true;
        }
        if y != self.cursor_y.load() {
            self.cursor_y.store(y);
            moved = true;
        }
        moved
    }

    /// Convert a point on screen into image coordinates.
    pub fn map_to_image(&self, x: f32, y: f32) -> PointF {
        let scale = self.geometry().scale;
        PointF::new(x * scale.x, y * scale.y)
    }

    /// Last sampled CPU temperature in degrees Celsius.
    pub fn cpu_temperature(&self) -> f32 {
        self.cpu_temperature.load()
    }

    pub fn set_cpu_temperature(&self, celsius: f32) {
        self.cpu_temperature.store(celsius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_cursor_change_detection() {
        let state = RenderState::new();
        assert!(state.set_cursor_position(10.0, 20.0));
        assert!(!state.set_cursor_position(10.0, 20.0));
        assert!(state.set_cursor_position(11.0, 20.0));
        assert!(state.set_cursor_position(11.0, 21.0));
        assert!(!state.set_cursor_position(11.0, 21.0));
        assert_eq!(state.cursor_position(), PointF::new(11.0, 21.0));
    }

    #[test]
    fn test_cursor_exact_comparison() {
        let state = RenderState::new();
        state.set_cursor_position(1.0, 1.0);
        assert!(state.set_cursor_position(1.0 + f32::EPSILON, 1.0));
    }

    #[test]
    fn test_cursor_position_is_a_copy() {
        let state = RenderState::new();
        state.set_cursor_position(5.0, 6.0);
        let mut snapshot = state.cursor_position();
        snapshot.x = 99.0;
        assert_eq!(snapshot.x, 99.0);
        assert_eq!(state.cursor_position(), PointF::new(5.0, 6.0));
    }

    #[test]
    fn test_cursor_written_from_other_thread() {
        let state = Arc::new(RenderState::new());
        let writer = Arc::clone(&state);
        std::thread::spawn(move || {
            writer.set_cursor_position(3.0, 4.0);
        })
        .join()
        .unwrap();
        assert_eq!(state.cursor_position(), PointF::new(3.0, 4.0));
    }

    #[test]
    fn test_geometry_scale() {
        let g = Geometry::new(Size::new(960, 540), Size::new(1920, 1080));
        assert_eq!(g.scale, PointF::new(2.0, 2.0));
        assert_eq!(g.image(), Size::new(1920, 1080));
        assert_eq!(g.screen(), Size::new(960, 540));

        let state = RenderState::new();
        state.set_geometry(g);
        assert_eq!(state.map_to_image(100.0, 50.0), PointF::new(200.0, 100.0));
    }

    #[test]
    fn test_geometry_unresolved_scale_is_identity() {
        let g = Geometry::new(Size::new(640, 480), Size::ZERO);
        assert_eq!(g.scale, PointF::new(1.0, 1.0));
        assert_eq!(RenderState::new().geometry(), Geometry::default());
    }
}
