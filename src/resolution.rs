//! Resolution negotiation
//!
//! Decides the logical (framebuffer) size from the configured mode and
//! fits it into the physical area the host offers. The backing buffer is
//! always allocated at logical resolution; only the on-screen presentation
//! is letterboxed or pillarboxed.
//!
//! All arithmetic truncates. The native backend computes the same values
//! and expects them to match exactly.

use crate::error::{Result, SurfaceError};
use std::fmt;
use std::num::NonZeroU32;

/// Logical size used when a custom resolution string can't be parsed.
pub const CUSTOM_FALLBACK: Size = Size::new(1280, 1024);

/// Width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Resolution the virtual display produces. `(0, 0)` means unresolved.
pub type LogicalSize = Size;
/// Area offered by the host layout; may be zero before the first measure.
pub type PhysicalSize = Size;
/// Sub-area of the physical size actually used after aspect correction.
pub type PresentationSize = Size;

impl Size {
    pub const ZERO: Size = Size::new(0, 0);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are non-zero.
    pub fn is_resolved(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How the logical size is derived.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolutionConfig {
    /// Logical size follows the physical size.
    #[default]
    Native,
    /// Logical size is the physical size scaled by `100 / percent`.
    Scaled(NonZeroU32),
    /// Fixed "WxH"; malformed input is an error.
    Exact(String),
    /// Fixed "WxH"; malformed input falls back to [`CUSTOM_FALLBACK`].
    Custom(String),
}

/// Parse a "WxH" string.
///
/// Splits on `x`, ignores trailing empty pieces, and reads the first two
/// pieces as non-zero integers. Anything after the second piece is ignored.
pub fn parse_resolution(s: &str) -> Option<Size> {
    let mut parts: Vec<&str> = s.split('x').collect();
    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    let [w, h, ..] = parts.as_slice() else {
        return None;
    };
    let size = Size::new(w.parse().ok()?, h.parse().ok()?);
    size.is_resolved().then_some(size)
}

/// Compute the logical size for `config` given the current physical size.
///
/// Pure: callers store the result.
pub fn configure_resolution(config: &ResolutionConfig, physical: PhysicalSize) -> Result<LogicalSize> {
    match config {
        ResolutionConfig::Native => Ok(physical),
        ResolutionConfig::Scaled(percent) => {
            let percent = u64::from(percent.get());
            Ok(Size::new(
                clamp_u32(u64::from(physical.width) * 100 / percent),
                clamp_u32(u64::from(physical.height) * 100 / percent),
            ))
        }
        ResolutionConfig::Exact(raw) => {
            parse_resolution(raw).ok_or_else(|| SurfaceError::ConfigFormat {
                setting: "exact",
                value: raw.clone(),
            })
        }
        ResolutionConfig::Custom(raw) => Ok(parse_resolution(raw).unwrap_or_else(|| {
            tracing::warn!("custom resolution {:?} unparsable, using {}", raw, CUSTOM_FALLBACK);
            CUSTOM_FALLBACK
        })),
    }
}

/// Outcome of a measurement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Size granted to the drawable on screen.
    pub presentation: PresentationSize,
    /// Backing buffer size to request from the host, if any.
    pub fixed_buffer: Option<LogicalSize>,
}

/// Fit `logical` into `physical`, preserving the logical aspect ratio.
///
/// An unresolved logical size leaves the physical size untouched and
/// requests no fixed buffer.
pub fn measure(physical: PhysicalSize, logical: LogicalSize) -> Measurement {
    if !logical.is_resolved() {
        return Measurement {
            presentation: physical,
            fixed_buffer: None,
        };
    }

    let (lw, lh) = (u64::from(logical.width), u64::from(logical.height));
    let (pw, ph) = (u64::from(physical.width), u64::from(physical.height));

    let candidate_width = ph * lw / lh;
    let presentation = if candidate_width <= pw {
        // pillarbox
        Size::new(clamp_u32(candidate_width), physical.height)
    } else {
        // letterbox
        Size::new(physical.width, clamp_u32(pw * lh / lw))
    };

    Measurement {
        presentation,
        fixed_buffer: Some(logical),
    }
}

fn clamp_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaled(p: u32) -> ResolutionConfig {
        ResolutionConfig::Scaled(NonZeroU32::new(p).unwrap())
    }

    #[test]
    fn test_native_follows_physical() {
        let physical = Size::new(1080, 2340);
        assert_eq!(
            configure_resolution(&ResolutionConfig::Native, physical).unwrap(),
            physical
        );
    }

    #[test]
    fn test_scaled_truncates() {
        let physical = Size::new(1081, 2339);
        for percent in [25u32, 50, 100, 200] {
            let got = configure_resolution(&scaled(percent), physical).unwrap();
            assert_eq!(got, Size::new(1081 * 100 / percent, 2339 * 100 / percent));
        }
        assert_eq!(
            configure_resolution(&scaled(150), Size::new(1000, 1001)).unwrap(),
            Size::new(666, 667)
        );
    }

    #[test]
    fn test_exact_well_formed() {
        let cfg = ResolutionConfig::Exact("1920x1080".into());
        assert_eq!(
            configure_resolution(&cfg, Size::ZERO).unwrap(),
            Size::new(1920, 1080)
        );
    }

    #[test]
    fn test_exact_malformed_is_error() {
        for bad in ["abc", "100x", "", "x100", "1920*1080", "-1x5", "0x0", "xx", "1920xx1080"] {
            let err = configure_resolution(&ResolutionConfig::Exact(bad.into()), Size::new(800, 600))
                .unwrap_err();
            assert_eq!(
                err,
                SurfaceError::ConfigFormat {
                    setting: "exact",
                    value: bad.to_string()
                }
            );
        }
    }

    #[test]
    fn test_custom_malformed_falls_back() {
        for bad in ["abc", "100x", "", "x", " 800x600"] {
            let got = configure_resolution(&ResolutionConfig::Custom(bad.into()), Size::new(800, 600))
                .unwrap();
            assert_eq!(got, Size::new(1280, 1024), "input {:?}", bad);
        }
        let got = configure_resolution(&ResolutionConfig::Custom("640x480".into()), Size::ZERO).unwrap();
        assert_eq!(got, Size::new(640, 480));
    }

    #[test]
    fn test_extra_pieces_are_ignored() {
        let custom = ResolutionConfig::Custom("800x600x".into());
        assert_eq!(configure_resolution(&custom, Size::ZERO).unwrap(), Size::new(800, 600));

        let exact = ResolutionConfig::Exact("1920x1080x2".into());
        assert_eq!(configure_resolution(&exact, Size::ZERO).unwrap(), Size::new(1920, 1080));

        assert_eq!(parse_resolution("1024x768xx"), Some(Size::new(1024, 768)));
        assert_eq!(parse_resolution("1024x768xabc"), Some(Size::new(1024, 768)));
    }

    #[test]
    fn test_measure_height_constrained() {
        let m = measure(Size::new(800, 600), Size::new(1920, 1080));
        assert_eq!(m.presentation, Size::new(800, 450));
        assert_eq!(m.fixed_buffer, Some(Size::new(1920, 1080)));
    }

    #[test]
    fn test_measure_square_physical() {
        let m = measure(Size::new(1000, 1000), Size::new(800, 600));
        assert_eq!(m.presentation, Size::new(1000, 750));
    }

    #[test]
    fn test_measure_pillarbox() {
        // candidate 1080 * 4 / 3 = 1440 fits in 2340
        let m = measure(Size::new(2340, 1080), Size::new(1024, 768));
        assert_eq!(m.presentation, Size::new(1440, 1080));
        assert_eq!(m.fixed_buffer, Some(Size::new(1024, 768)));
    }

    #[test]
    fn test_measure_matching_aspect_fills() {
        let m = measure(Size::new(1280, 720), Size::new(1920, 1080));
        assert_eq!(m.presentation, Size::new(1280, 720));
    }

    #[test]
    fn test_measure_exact_fit_takes_pillarbox_branch() {
        // candidate 10 * 3 / 7 = 4 equals the physical width
        let m = measure(Size::new(4, 10), Size::new(3, 7));
        assert_eq!(m.presentation, Size::new(4, 10));
    }

    #[test]
    fn test_measure_unresolved_passthrough() {
        let m = measure(Size::new(640, 480), Size::ZERO);
        assert_eq!(m.presentation, Size::new(640, 480));
        assert_eq!(m.fixed_buffer, None);

        let m = measure(Size::new(640, 480), Size::new(100, 0));
        assert_eq!(m.fixed_buffer, None);
    }

    #[test]
    fn test_presentation_never_exceeds_physical() {
        let physical = Size::new(777, 333);
        for logical in [Size::new(1, 1000), Size::new(1000, 1), Size::new(1920, 1080), Size::new(3, 7)] {
            let p = measure(physical, logical).presentation;
            assert!(p.width <= physical.width && p.height <= physical.height, "{logical} -> {p}");
        }
    }
}
