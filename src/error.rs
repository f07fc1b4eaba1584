//! Errors surfaced by the negotiation core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// A fixed "WxH" resolution setting could not be parsed.
    #[error("malformed {setting} resolution {value:?} (expected WIDTHxHEIGHT)")]
    ConfigFormat { setting: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, SurfaceError>;
