//! Idempotent create and delete
//!
//! `create_if_absent` is the single implementation of
//! get → (absent) → create → swallow `AlreadyExists`, shared by instances,
//! tenants, namespaces and every manifest applied through generic apply.

use std::future::Future;

use crate::error::Result;

/// Result of a create-if-absent call
#[derive(Debug, Clone, PartialEq)]
pub enum Created<T> {
    /// The object did not exist and was created
    Created(T),
    /// The object already existed and was left untouched
    Existing(T),
}

impl<T> Created<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Created::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Created::Created(value) | Created::Existing(value) => value,
        }
    }
}

/// Result of a delete-if-present call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Absent,
}

/// Create an object unless a `get` proves it already exists
///
/// A `NotFound` from `get` proves absence. An `AlreadyExists` from `create`
/// (someone else won the race) is treated as success and the stored object
/// is fetched again.
pub async fn create_if_absent<T, G, GF, C, CF>(kind: &str, name: &str, get: G, create: C) -> Result<Created<T>>
where
    G: Fn() -> GF,
    GF: Future<Output = Result<T>>,
    C: FnOnce() -> CF,
    CF: Future<Output = Result<T>>,
{
    match get().await {
        Ok(existing) => {
            tracing::info!("{} '{}' already exists, leaving it unchanged", kind, name);
            return Ok(Created::Existing(existing));
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    match create().await {
        Ok(created) => {
            tracing::info!("Created {} '{}'", kind, name);
            Ok(Created::Created(created))
        }
        Err(e) if e.is_already_exists() => {
            tracing::info!("{} '{}' was created concurrently", kind, name);
            get().await.map(Created::Existing)
        }
        Err(e) => Err(e),
    }
}

/// Delete an object, treating `NotFound` as success
pub async fn delete_if_present<D, DF>(kind: &str, name: &str, delete: D) -> Result<DeleteOutcome>
where
    D: FnOnce() -> DF,
    DF: Future<Output = Result<()>>,
{
    match delete().await {
        Ok(()) => {
            tracing::info!("Deleted {} '{}'", kind, name);
            Ok(DeleteOutcome::Deleted)
        }
        Err(e) if e.is_not_found() => {
            tracing::info!("{} '{}' not found, nothing to delete", kind, name);
            Ok(DeleteOutcome::Absent)
        }
        Err(e) => Err(e),
    }
}
