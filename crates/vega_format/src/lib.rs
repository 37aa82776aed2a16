//! Post-processing for raw provider output.
//!
//! Providers return loosely formatted text. [`format`] rewrites it into
//! consistent markdown, and [`extract_image_url`] pulls the image location out
//! of an image-generation response.

mod extract;
mod formatter;

pub use extract::extract_image_url;
pub use formatter::format;
