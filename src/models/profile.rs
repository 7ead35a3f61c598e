//! Instance profiles

use crate::error::{Error, Result};

/// Selects the configuration template and debug switches for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Profile {
    #[default]
    Default,
    Minimal,
    Debug,
}

impl Profile {
    /// Pick the profile from the `--minimal` and `--debug` switches
    pub fn from_flags(minimal: bool, debug: bool) -> Result<Self> {
        match (minimal, debug) {
            (true, true) => Err(Error::bad_input(
                "minimal and debug profiles cannot be combined",
            )),
            (true, false) => Ok(Profile::Minimal),
            (false, true) => Ok(Profile::Debug),
            (false, false) => Ok(Profile::Default),
        }
    }

    /// File name of the user-local template for this profile
    pub fn template_file(&self) -> &'static str {
        match self {
            Profile::Default | Profile::Debug => "default.yaml",
            Profile::Minimal => "minimal.yaml",
        }
    }

    /// Configuration template key recorded on the instance
    pub fn configuration_template(&self) -> &'static str {
        match self {
            Profile::Default | Profile::Debug => "default",
            Profile::Minimal => "minimal",
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, Profile::Debug)
    }
}
