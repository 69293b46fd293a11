//! Configuration types for vidarray
//!
//! Every section has defaults, so a config file only needs the keys it
//! changes:
//!
//! ```toml
//! [converter]
//! ignore_null_frame = true
//! normalize = "auto"
//!
//! [processor]
//! skip_if_running = false
//! transform = "sobel"
//!
//! [source]
//! resolution = { width = 320, height = 240 }
//! fps = 15
//! ```

use crate::codec::Normalize;
use crate::error::{Error, Result};
use crate::metadata::MetadataPolicy;
use crate::types::{ArrayLayout, ByteOrder, Resolution};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Frame <-> array conversion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Emit nothing for null frames instead of an empty array
    pub ignore_null_frame: bool,
    pub byte_order: ByteOrder,
    pub layout: ArrayLayout,
    pub normalize: Normalize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ignore_null_frame: false,
            byte_order: ByteOrder::Big,
            layout: ArrayLayout::Rgb,
            normalize: Normalize::Off,
        }
    }
}

impl ConverterConfig {
    pub fn with_ignore_null_frame(mut self, ignore: bool) -> Self {
        self.ignore_null_frame = ignore;
        self
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = normalize;
        self
    }
}

/// Processor thread settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Drop inputs that arrive while the worker is busy
    pub skip_if_running: bool,
    pub thread_name: String,
    /// Stock transform installed by the CLI (see [`crate::processing::by_name`])
    pub transform: String,
    pub metadata_policy: MetadataPolicy,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            skip_if_running: true,
            thread_name: "vidarray-processor".to_string(),
            transform: "identity".to_string(),
            metadata_policy: MetadataPolicy::Timing,
        }
    }
}

impl ProcessorConfig {
    pub fn with_skip_if_running(mut self, skip: bool) -> Self {
        self.skip_if_running = skip;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_transform(mut self, name: impl Into<String>) -> Self {
        self.transform = name.into();
        self
    }
}

/// Synthetic source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub resolution: Resolution,
    pub fps: u32,
    /// Number of frames before end of stream (0 = endless)
    pub frame_count: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::QVGA,
            fps: 30,
            frame_count: 90,
        }
    }
}

impl SourceConfig {
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_frame_count(mut self, count: u64) -> Self {
        self.frame_count = count;
        self
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub converter: ConverterConfig,
    pub processor: ProcessorConfig,
    pub source: SourceConfig,
}

impl PipelineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.fps == 0 {
            return Err(Error::Config("source.fps must be positive".into()));
        }
        if self.source.resolution.is_empty() {
            return Err(Error::Config(format!(
                "source.resolution {} is empty",
                self.source.resolution
            )));
        }
        if self.processor.thread_name.is_empty() {
            return Err(Error::Config("processor.thread_name is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(!config.converter.ignore_null_frame);
        assert_eq!(config.converter.byte_order, ByteOrder::Big);
        assert!(config.processor.skip_if_running);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [converter]
            ignore_null_frame = true
            normalize = { range = [10.0, 20.0] }

            [processor]
            skip_if_running = false
            "#,
        )
        .unwrap();
        assert!(config.converter.ignore_null_frame);
        assert_eq!(config.converter.normalize, Normalize::Range(10.0, 20.0));
        assert!(!config.processor.skip_if_running);
        assert_eq!(config.source, SourceConfig::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            PipelineConfig::from_toml_str("[source]\nfps = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("[converter]\nbyte_order = \"middle\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_file_round_trip() {
        let config = PipelineConfig {
            processor: ProcessorConfig::default()
                .with_transform("invert")
                .with_skip_if_running(false),
            ..Default::default()
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();
        let loaded = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            PipelineConfig::load("/nonexistent/vidarray.toml"),
            Err(Error::Io(_))
        ));
    }
}
