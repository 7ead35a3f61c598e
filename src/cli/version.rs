//! Version command

use crate::error::Result;
use crate::render::substitute_with;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Text printed by `version`
pub fn version_text(short: bool, template: Option<&str>) -> Result<String> {
    if let Some(template) = template {
        return substitute_with(template, |variable| match variable {
            "Version" => Some(VERSION.to_string()),
            "Name" => Some(NAME.to_string()),
            _ => None,
        });
    }
    if short {
        return Ok(VERSION.to_string());
    }
    Ok(format!(
        "{} {}\n  {}\n  License: {}\n  Repository: {}",
        NAME,
        VERSION,
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_LICENSE"),
        env!("CARGO_PKG_REPOSITORY"),
    ))
}
