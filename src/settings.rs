//! Display settings, consumed read-only

use crate::resolution::ResolutionConfig;
use clap::Args;
use std::num::NonZeroU32;

const DEFAULT_SCALE: NonZeroU32 = match NonZeroU32::new(100) {
    Some(v) => v,
    None => unreachable!(),
};

/// The four resolution settings as the preferences store keeps them.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    /// Resolution mode: native, scaled, exact or custom
    #[arg(long = "resolution-mode", default_value = "native")]
    pub mode: String,

    /// Scale percent for scaled mode (200 halves the framebuffer)
    #[arg(long, default_value = "100")]
    pub scale: NonZeroU32,

    /// Resolution for exact mode, e.g. 1920x1080
    #[arg(long, default_value = "1280x1024")]
    pub exact: String,

    /// Resolution for custom mode, e.g. 1280x1024
    #[arg(long, default_value = "1280x1024")]
    pub custom: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            mode: "native".to_string(),
            scale: DEFAULT_SCALE,
            exact: "1280x1024".to_string(),
            custom: "1280x1024".to_string(),
        }
    }
}

impl DisplaySettings {
    /// Select the config for the current mode. Unknown modes act as native.
    pub fn resolution_config(&self) -> ResolutionConfig {
        match self.mode.as_str() {
            "scaled" => ResolutionConfig::Scaled(self.scale),
            "exact" => ResolutionConfig::Exact(self.exact.clone()),
            "custom" => ResolutionConfig::Custom(self.custom.clone()),
            _ => ResolutionConfig::Native,
        }
    }
}

/// Read access to the preferences store.
pub trait SettingsSource: Send + Sync {
    fn display_settings(&self) -> DisplaySettings;
}

impl SettingsSource for DisplaySettings {
    fn display_settings(&self) -> DisplaySettings {
        self.clone()
    }
}

/// Resolve the config from an optional source; no source means native.
pub fn resolution_config(source: Option<&dyn SettingsSource>) -> ResolutionConfig {
    source
        .map(|s| s.display_settings().resolution_config())
        .unwrap_or_default()
}

/// Toggles read by the input and clipboard collaborators.
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    /// Mirror the host clipboard into the X selection
    #[arg(long)]
    pub clipboard_sync: bool,

    /// Send raw scancodes for hardware keyboards
    #[arg(long)]
    pub hardware_kbd_scancodes_workaround: bool,

    /// Enable CJK composition for Gboard
    #[arg(long)]
    pub gboard_cjk: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_mode(mode: &str) -> DisplaySettings {
        DisplaySettings {
            mode: mode.to_string(),
            scale: NonZeroU32::new(50).unwrap(),
            exact: "1920x1080".to_string(),
            custom: "800x600".to_string(),
        }
    }

    #[test]
    fn test_mode_dispatch() {
        assert_eq!(
            with_mode("scaled").resolution_config(),
            ResolutionConfig::Scaled(NonZeroU32::new(50).unwrap())
        );
        assert_eq!(
            with_mode("exact").resolution_config(),
            ResolutionConfig::Exact("1920x1080".into())
        );
        assert_eq!(
            with_mode("custom").resolution_config(),
            ResolutionConfig::Custom("800x600".into())
        );
        assert_eq!(with_mode("native").resolution_config(), ResolutionConfig::Native);
        assert_eq!(with_mode("bogus").resolution_config(), ResolutionConfig::Native);
    }

    #[test]
    fn test_missing_source_is_native() {
        assert_eq!(resolution_config(None), ResolutionConfig::Native);
        let s = with_mode("exact");
        assert_eq!(
            resolution_config(Some(&s)),
            ResolutionConfig::Exact("1920x1080".into())
        );
    }

    #[test]
    fn test_default_settings() {
        let s = DisplaySettings::default();
        assert_eq!(s.mode, "native");
        assert_eq!(s.scale.get(), 100);
    }
}
