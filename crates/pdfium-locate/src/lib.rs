//! # pdfium-locate
//!
//! Locate the platform [PDFium](https://pdfium.googlesource.com/pdfium/)
//! shared library and bind it through `pdfium-render`, failing fast with a
//! typed error when it is not where the platform policy expects it.
//!
//! ## Lookup policy
//!
//! | Platform | Policy                                                      |
//! |----------|-------------------------------------------------------------|
//! | Windows  | fixed install path `C:\Program Files\pdfium\bin\pdfium.dll` |
//! | macOS    | `libpdfium.dylib` on the dyld search path                   |
//! | Linux    | `libpdfium.so` on the ld.so search path                     |
//!
//! `PDFIUM_LIB_PATH` overrides the policy on every platform. When it is set
//! but points nowhere the lookup fails instead of falling back.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pdfium_locate::{bind_pdfium, locate_renderer, bind_renderer};
//!
//! // Option A: one-shot locate + bind
//! let pdfium = bind_pdfium().expect("PDFium unavailable");
//!
//! // Option B: inspect the location first
//! let location = locate_renderer().expect("PDFium not installed");
//! println!("using PDFium from {location}");
//! let pdfium = bind_renderer(&location).expect("bind failed");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info};

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable holding an explicit path to the PDFium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Where the Windows build expects PDFium to be installed.
pub const WINDOWS_INSTALL_PATH: &str = r"C:\Program Files\pdfium\bin\pdfium.dll";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned while locating or binding PDFium.
#[derive(Error, Debug)]
pub enum LocateError {
    /// The host OS is not one of the supported platforms.
    #[error("Unsupported operating system '{os}'. Supported: Windows, macOS and Linux.")]
    UnsupportedPlatform { os: String },

    /// Windows policy: the library is not at the fixed install path.
    #[error(
        "PDFium not found at '{path}'\n\
Install PDFium there or set PDFIUM_LIB_PATH=/path/to/pdfium.dll."
    )]
    MissingAtFixedPath { path: PathBuf },

    /// `PDFIUM_LIB_PATH` is set but the file does not exist.
    #[error("PDFIUM_LIB_PATH points to '{path}', which does not exist")]
    OverrideMissing { path: PathBuf },

    /// macOS/Linux policy: the library is on none of the searched directories.
    #[error(
        "{lib_name} not found on the library search path ({searched} directories searched)\n\
Install PDFium (pre-built binaries: https://github.com/bblanchon/pdfium-binaries/releases)\n\
or set PDFIUM_LIB_PATH=/path/to/{lib_name}."
    )]
    NotOnSearchPath { lib_name: &'static str, searched: usize },

    /// `libloading` / `pdfium-render` could not load the library.
    #[error("Failed to bind PDFium from {location}: {reason}")]
    Bind { location: String, reason: String },
}

// ── Platforms ────────────────────────────────────────────────────────────────

/// The closed set of platforms the locator knows how to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Result<Self, LocateError> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value onto a platform.
    pub fn from_os(os: &str) -> Result<Self, LocateError> {
        match os {
            "windows" => Ok(Platform::Windows),
            "macos" => Ok(Platform::MacOs),
            "linux" => Ok(Platform::Linux),
            other => Err(LocateError::UnsupportedPlatform {
                os: other.to_string(),
            }),
        }
    }

    /// File name of the PDFium shared library on this platform.
    pub fn library_name(self) -> &'static str {
        match self {
            Platform::Windows => "pdfium.dll",
            Platform::MacOs => "libpdfium.dylib",
            Platform::Linux => "libpdfium.so",
        }
    }

    /// Loader environment variables consulted before the default directories.
    fn loader_path_vars(self) -> &'static [&'static str] {
        match self {
            Platform::Windows => &[],
            Platform::MacOs => &["DYLD_LIBRARY_PATH", "DYLD_FALLBACK_LIBRARY_PATH"],
            Platform::Linux => &["LD_LIBRARY_PATH"],
        }
    }

    /// Directories the dynamic loader searches without any configuration.
    fn default_library_dirs(self) -> Vec<PathBuf> {
        match self {
            Platform::Windows => Vec::new(),
            Platform::MacOs => vec![
                PathBuf::from("/usr/local/lib"),
                PathBuf::from("/opt/homebrew/lib"),
                PathBuf::from("/usr/lib"),
            ],
            Platform::Linux => {
                let triplet = format!("{}-linux-gnu", std::env::consts::ARCH);
                vec![
                    PathBuf::from("/lib"),
                    PathBuf::from("/usr/lib"),
                    PathBuf::from("/usr/lib64"),
                    PathBuf::from("/usr/local/lib"),
                    Path::new("/lib").join(&triplet),
                    Path::new("/usr/lib").join(&triplet),
                ]
            }
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
        };
        f.write_str(name)
    }
}

// ── Locations ────────────────────────────────────────────────────────────────

/// Where PDFium was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererLocation {
    /// The OS loader finds the library by name; no explicit path needed.
    SearchPath,
    /// The library must be loaded from this exact file.
    Library(PathBuf),
}

impl fmt::Display for RendererLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendererLocation::SearchPath => f.write_str("the system library search path"),
            RendererLocation::Library(path) => write!(f, "'{}'", path.display()),
        }
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Locate PDFium for the current platform, honouring `PDFIUM_LIB_PATH`.
pub fn locate_renderer() -> Result<RendererLocation, LocateError> {
    let platform = Platform::current()?;
    let override_path = std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from);
    locate_for(platform, override_path.as_deref(), &search_dirs(platform))
}

/// Locate PDFium for `platform` with an explicit override and search list.
///
/// `search_dirs` is only consulted on macOS and Linux.
pub fn locate_for(
    platform: Platform,
    override_path: Option<&Path>,
    search_dirs: &[PathBuf],
) -> Result<RendererLocation, LocateError> {
    if let Some(path) = override_path {
        return if path.is_file() {
            debug!("Using {} from {}", PDFIUM_LIB_PATH_ENV, path.display());
            Ok(RendererLocation::Library(path.to_path_buf()))
        } else {
            Err(LocateError::OverrideMissing {
                path: path.to_path_buf(),
            })
        };
    }

    match platform {
        Platform::Windows => locate_windows(Path::new(WINDOWS_INSTALL_PATH)),
        Platform::MacOs => locate_macos(search_dirs),
        Platform::Linux => locate_linux(search_dirs),
    }
}

/// The directories searched on `platform`: loader variables first, then the
/// loader defaults, without duplicates.
pub fn search_dirs(platform: Platform) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    for var in platform.loader_path_vars() {
        if let Some(value) = std::env::var_os(var) {
            dirs.extend(std::env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()));
        }
    }
    dirs.extend(platform.default_library_dirs());

    let mut seen = std::collections::HashSet::new();
    dirs.retain(|d| seen.insert(d.clone()));
    dirs
}

/// Binds to PDFium at a previously located position.
pub fn bind_renderer(location: &RendererLocation) -> Result<Pdfium, LocateError> {
    let bindings = match location {
        RendererLocation::SearchPath => Pdfium::bind_to_system_library().or_else(|e| {
            // The loader's own cache can miss directories we searched; load
            // the file we saw instead.
            match Platform::current().ok().and_then(first_on_search_path) {
                Some(found) => {
                    debug!("System bind failed ({e}); loading {}", found.display());
                    Pdfium::bind_to_library(found.as_path())
                }
                None => Err(e),
            }
        }),
        RendererLocation::Library(path) => Pdfium::bind_to_library(path.as_path()),
    };

    bindings.map(Pdfium::new).map_err(|e| LocateError::Bind {
        location: location.to_string(),
        reason: e.to_string(),
    })
}

/// Locate and bind PDFium for the current platform in one step.
pub fn bind_pdfium() -> Result<Pdfium, LocateError> {
    let location = locate_renderer()?;
    let pdfium = bind_renderer(&location)?;
    info!("PDFium bound from {}", location);
    Ok(pdfium)
}

// ── Per-platform resolution ──────────────────────────────────────────────────

fn locate_windows(fixed: &Path) -> Result<RendererLocation, LocateError> {
    if fixed.is_file() {
        Ok(RendererLocation::Library(fixed.to_path_buf()))
    } else {
        Err(LocateError::MissingAtFixedPath {
            path: fixed.to_path_buf(),
        })
    }
}

fn locate_macos(search_dirs: &[PathBuf]) -> Result<RendererLocation, LocateError> {
    find_on_search_path(Platform::MacOs.library_name(), search_dirs)
}

fn locate_linux(search_dirs: &[PathBuf]) -> Result<RendererLocation, LocateError> {
    find_on_search_path(Platform::Linux.library_name(), search_dirs)
}

fn first_on_search_path(platform: Platform) -> Option<PathBuf> {
    let lib_name = platform.library_name();
    search_dirs(platform)
        .into_iter()
        .map(|d| d.join(lib_name))
        .find(|p| p.is_file())
}

fn find_on_search_path(
    lib_name: &'static str,
    search_dirs: &[PathBuf],
) -> Result<RendererLocation, LocateError> {
    match search_dirs.iter().map(|d| d.join(lib_name)).find(|p| p.is_file()) {
        Some(found) => {
            debug!("Found {} at {}", lib_name, found.display());
            Ok(RendererLocation::SearchPath)
        }
        None => Err(LocateError::NotOnSearchPath {
            lib_name,
            searched: search_dirs.len(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
