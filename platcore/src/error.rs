use thiserror::Error;

/// Failure to build an enemy from a spawn descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("unknown enemy type '{0}'")]
    UnknownType(String),
}

/// Rejected archetype registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("enemy type id must not be empty")]
    EmptyTypeId,
    #[error("enemy type '{0}' is already registered")]
    DuplicateType(String),
}
