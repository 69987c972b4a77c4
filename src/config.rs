//! Configuration types for PDF flattening.
//!
//! All flattening behaviour is controlled through [`FlattenConfig`], built
//! via its [`FlattenConfigBuilder`]. Every knob travels with the config value
//! into the pipeline; there are no module-level defaults outside
//! [`FlattenConfig::default`].
//!
//! Override dates are accepted as `YYYY-MM-DD` strings by the builder and
//! parsed in [`FlattenConfigBuilder::build`], so a malformed date is rejected
//! before any file is touched.

use crate::error::FlattenError;
use crate::pipeline::metadata::parse_override_date;
use crate::progress::ProgressCallback;
use chrono::NaiveDate;
use std::fmt;

/// Default rasterisation resolution.
pub const DEFAULT_DPI: u32 = 200;

/// Default JPEG quality for the re-embedded page images.
pub const DEFAULT_JPEG_QUALITY: u8 = 50;

/// Configuration for a flattening run.
///
/// # Example
/// ```rust
/// use pdf_flatten::FlattenConfig;
///
/// let config = FlattenConfig::builder()
///     .dpi(300)
///     .creation_date("2024-01-01")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct FlattenConfig {
    /// Rendering DPI used when rasterising each page. Default: 200.
    ///
    /// Page pixel size is `points × dpi / 72`. Any positive value is
    /// accepted; pdfium decides what it can allocate.
    pub dpi: u32,

    /// JPEG quality (1–100) of the embedded page images. Default: 50.
    ///
    /// The content is a raster anyway, so moderate quality keeps the output
    /// small without visible loss at typical DPI.
    pub jpeg_quality: u8,

    /// Creation date override. Time-of-day is taken from the original.
    pub creation_date: Option<NaiveDate>,

    /// Modification date override. Time-of-day is taken from the original.
    pub modification_date: Option<NaiveDate>,

    /// PDF user password for encrypted inputs.
    pub password: Option<String>,

    /// Try to set the file-system creation time where the platform allows.
    /// Default: true. Failures are never fatal.
    pub set_creation_time: bool,

    /// Optional per-stage / per-page progress receiver.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            creation_date: None,
            modification_date: None,
            password: None,
            set_creation_time: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FlattenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlattenConfig")
            .field("dpi", &self.dpi)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("creation_date", &self.creation_date)
            .field("modification_date", &self.modification_date)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("set_creation_time", &self.set_creation_time)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn FlattenProgressCallback>"),
            )
            .finish()
    }
}

impl FlattenConfig {
    /// Create a new builder for `FlattenConfig`.
    pub fn builder() -> FlattenConfigBuilder {
        FlattenConfigBuilder {
            config: Self::default(),
            creation_date: None,
            modification_date: None,
        }
    }
}

/// Builder for [`FlattenConfig`].
pub struct FlattenConfigBuilder {
    config: FlattenConfig,
    creation_date: Option<String>,
    modification_date: Option<String>,
}

impl fmt::Debug for FlattenConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlattenConfigBuilder")
            .field("config", &self.config)
            .field("creation_date", &self.creation_date)
            .field("modification_date", &self.modification_date)
            .finish()
    }
}

impl FlattenConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Creation date override as `YYYY-MM-DD`; validated in [`Self::build`].
    pub fn creation_date(mut self, date: impl Into<String>) -> Self {
        self.creation_date = Some(date.into());
        self
    }

    /// Modification date override as `YYYY-MM-DD`; validated in [`Self::build`].
    pub fn modification_date(mut self, date: impl Into<String>) -> Self {
        self.modification_date = Some(date.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn set_creation_time(mut self, v: bool) -> Self {
        self.config.set_creation_time = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<FlattenConfig, FlattenError> {
        if self.config.dpi == 0 {
            return Err(FlattenError::InvalidConfig("DPI must be ≥ 1, got 0".into()));
        }
        if let Some(ref raw) = self.creation_date {
            self.config.creation_date = Some(parse_override_date("creation", raw)?);
        }
        if let Some(ref raw) = self.modification_date {
            self.config.modification_date = Some(parse_override_date("modification", raw)?);
        }
        Ok(self.config)
    }
}
