//! Controller error taxonomy.
//!
//! None of these ever escape the level controller: outbound presentation
//! calls hand them back, the controller logs them and carries on.
//!
//! | Variant                    | Severity | Controller reaction            |
//! |----------------------------|----------|--------------------------------|
//! | `MissingOptionalAsset`     | warn     | step skipped                   |
//! | `MissingRequiredReference` | error    | dependent respawn step skipped |
//! | `UnknownLevelIndex`        | debug    | permissive default rules       |
//! | `Config`                   | warn     | built-in defaults              |

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    /// An effect, sound clip or UI panel is not configured in the presentation layer.
    MissingOptionalAsset {
        asset: String,
    },

    /// Something the respawn sequence depends on is absent (player, spawn point).
    MissingRequiredReference {
        what: &'static str,
    },

    /// No rule entry exists for this level index.
    UnknownLevelIndex {
        index: usize,
    },

    /// `config.toml` could not be read or parsed.
    Config {
        path: String,
        message: String,
    },
}

impl ControlError {
    pub fn missing_asset(asset: impl Into<String>) -> Self {
        ControlError::MissingOptionalAsset { asset: asset.into() }
    }
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::MissingOptionalAsset { asset } => {
                write!(f, "optional asset '{}' is not configured", asset)
            }
            ControlError::MissingRequiredReference { what } => {
                write!(f, "required reference missing: {}", what)
            }
            ControlError::UnknownLevelIndex { index } => {
                write!(f, "no rules defined for level index {}", index)
            }
            ControlError::Config { path, message } => {
                write!(f, "config error in {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for ControlError {}

/// Convenience alias: a `Result` using `ControlError` as the error type.
pub type ControlResult<T> = Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_missing_piece() {
        let e = ControlError::missing_asset("death_effect");
        assert_eq!(e.to_string(), "optional asset 'death_effect' is not configured");

        let e = ControlError::MissingRequiredReference { what: "spawn point" };
        assert!(e.to_string().contains("spawn point"));

        let e = ControlError::UnknownLevelIndex { index: 42 };
        assert!(e.to_string().contains("42"));
    }
}
