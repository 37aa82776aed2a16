//! Failover routing across interchangeable, unreliable completion providers.
//!
//! Chat requests go to one provider after another until one answers; the
//! answer is normalized to clean markdown. Image prompts are routed across
//! image-capable providers with quota detection.
//!
//! ```
//! use vega::prelude::*;
//!
//! let catalog = ProviderCatalog::default();
//! assert_eq!(catalog.working().first().map(String::as_str), Some("Chatai"));
//! ```

pub use vega_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use vega_internal::prelude::*;
}
