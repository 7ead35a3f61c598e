//! Templates shipped with the binary

use crate::models::Profile;

/// Embedded template for a profile
pub fn embedded_template(profile: Profile) -> &'static str {
    match profile {
        Profile::Default | Profile::Debug => include_str!("templates/default.yaml"),
        Profile::Minimal => include_str!("templates/minimal.yaml"),
    }
}
