use std::fmt;

/// A component type identifier, displayed for diagnostics. Carries the Rust type name when
/// available so warnings and errors read naturally even though components are keyed by
/// [`std::any::TypeId`] internally.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentLabel(pub &'static str);

impl fmt::Display for ComponentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Errors surfaced synchronously at the call site that produced them.
///
/// These are the "fatal at call site" kind from the error taxonomy: the caller is expected to
/// `unwrap`, `?`, or otherwise handle them immediately, since the runtime does not retry or
/// recover on their behalf. Compare with [`crate::world::World::last_warning`], which records
/// the non-fatal `warning` kind instead.
#[derive(thiserror::Error, Debug)]
pub enum EcsError {
    /// A component registration was missing a default, clone, or copy implementation.
    ///
    /// In this port every component satisfies `Default + Clone` by construction, so this
    /// variant is reserved for the dynamic, schema-driven components built from
    /// [`crate::types`] descriptors, where a missing field default is only caught at
    /// registration time.
    #[error("component schema for `{0}` is invalid: every field needs a default, clone and copy")]
    SchemaInvalid(ComponentLabel),

    /// A query was constructed with an empty include set.
    #[error("query has no include components; `Not(T)` alone does not select anything")]
    EmptyQuery,

    /// A write was attempted through a read-only component view.
    #[error("attempted to mutate `{0}` through a read-only view")]
    MutabilityViolation(ComponentLabel),
}

pub type EcsResult<T> = Result<T, EcsError>;
