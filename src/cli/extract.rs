//! Positional argument extraction
//!
//! Commands take their resource name as an optional single positional
//! argument. Zero arguments yield the empty string, which callers replace
//! with a default.

use crate::error::Error;

/// More positional arguments than a command accepts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{what} accepts at most one argument, got {count}: {args:?}")]
pub struct TooManyArgs {
    pub what: &'static str,
    /// The argument that would have been used
    pub first: String,
    pub count: usize,
    pub args: Vec<String>,
}

impl From<TooManyArgs> for Error {
    fn from(err: TooManyArgs) -> Self {
        Error::BadInput(err.to_string())
    }
}

fn extract_single(what: &'static str, args: &[String]) -> Result<String, TooManyArgs> {
    match args {
        [] => Ok(String::new()),
        [single] => Ok(single.clone()),
        [first, ..] => Err(TooManyArgs {
            what,
            first: first.clone(),
            count: args.len(),
            args: args.to_vec(),
        }),
    }
}

pub fn extract_instance_name(args: &[String]) -> Result<String, TooManyArgs> {
    extract_single("instance name", args)
}

pub fn extract_tenant_name(args: &[String]) -> Result<String, TooManyArgs> {
    extract_single("tenant name", args)
}
