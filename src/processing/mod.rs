//! Stock array transforms
//!
//! Provides ready-made [`ArrayTransform`]s for the CLI, tests and benches:
//! - Color inversion and grayscale
//! - Box blur
//! - Sobel edge magnitude

mod convert;
mod filter;

pub use convert::{Grayscale, Invert};
pub use filter::{BoxBlur, SobelEdges};

use crate::error::{Error, Result};
use crate::worker::{ArrayTransform, Identity};

/// Names accepted by [`by_name`]
pub const TRANSFORM_NAMES: [&str; 5] = ["identity", "invert", "grayscale", "blur", "sobel"];

/// Create a stock transform from its name
pub fn by_name(name: &str) -> Result<Box<dyn ArrayTransform>> {
    let transform: Box<dyn ArrayTransform> = match name {
        "identity" => Box::new(Identity),
        "invert" => Box::new(Invert),
        "grayscale" | "gray" => Box::new(Grayscale),
        "blur" => Box::new(BoxBlur::default()),
        "sobel" | "edges" => Box::new(SobelEdges),
        other => {
            return Err(Error::Config(format!(
                "unknown transform {:?} (expected one of {})",
                other,
                TRANSFORM_NAMES.join(", ")
            )))
        }
    };
    Ok(transform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name() {
        for name in TRANSFORM_NAMES {
            assert!(by_name(name).is_ok(), "{name}");
        }
        assert!(matches!(by_name("sharpen"), Err(Error::Config(_))));
    }
}
