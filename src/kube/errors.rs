//! Classification of kube-rs errors into swctl error kinds

use crate::error::Error;

/// Map a kube-rs error for `(kind, name)` onto the swctl taxonomy
///
/// - 404 → `NotFound`
/// - 409 with reason `AlreadyExists` → `AlreadyExists`
/// - any other 409 → `Conflict`
/// - transport failures → `Unreachable`
/// - everything else → `Other`, with the resource named in the context
pub fn classify(err: kube::Error, kind: &str, name: &str) -> Error {
    match &err {
        kube::Error::Api(response) => match response.code {
            404 => Error::not_found(kind, name),
            409 if response.reason == "AlreadyExists" => Error::already_exists(kind, name),
            409 => Error::Conflict {
                kind: kind.to_string(),
                name: name.to_string(),
                message: response.message.clone(),
            },
            _ => other(err, kind, name),
        },
        kube::Error::HyperError(_) | kube::Error::Service(_) => {
            Error::Unreachable(err.to_string())
        }
        _ => other(err, kind, name),
    }
}

fn other(err: kube::Error, kind: &str, name: &str) -> Error {
    let context = if name.is_empty() {
        format!("Request for {} failed", kind)
    } else {
        format!("Request for {} '{}' failed", kind, name)
    };
    Error::Other(anyhow::Error::new(err).context(context))
}
