//! Error types for the backend registry.

/// Error resolving a backend from the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No backend is registered under this provider identifier and no fallback is set.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}
