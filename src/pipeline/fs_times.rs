//! File-system timestamps for the finished file.
//!
//! Access and modification times are always set to the resolved modification
//! instant; failing to do so is fatal. Creation time is best-effort and
//! depends on the platform:
//!
//! | Platform | Creation time                                           |
//! |----------|---------------------------------------------------------|
//! | macOS    | `touch -t` (moves birth time back), then mtime re-applied |
//! | Windows  | native file attribute                                   |
//! | Linux    | not settable, skipped                                   |

use crate::error::{FlattenError, FsTimeError};
use crate::pipeline::metadata::TimestampPair;
use chrono::{Duration, Local, NaiveDateTime, Offset, TimeZone, Utc};
use pdfium_locate::Platform;
use std::fs::{File, FileTimes};
use std::path::Path;
use std::process::Command;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Interpret a wall-clock instant in the local time zone.
///
/// Ambiguous times take the earlier instant. Times skipped by a forward
/// transition are read with the offset in force before it, which lands just
/// past the gap on the same day.
pub fn to_system_time(dt: NaiveDateTime) -> SystemTime {
    if let Some(local) = Local.from_local_datetime(&dt).earliest() {
        return local.into();
    }
    let before_gap = dt - Duration::hours(12);
    let offset = match Local.from_local_datetime(&before_gap).earliest() {
        Some(local) => local.offset().fix(),
        None => Local.offset_from_utc_datetime(&dt).fix(),
    };
    let utc = dt - Duration::seconds(i64::from(offset.local_minus_utc()));
    debug!("{} falls in a DST gap; using offset {}", dt, offset);
    Utc.from_utc_datetime(&utc).into()
}

/// Stamp `path` with `times`.
///
/// # Returns
/// `Some(FsTimeError)` when the creation-time step was attempted and did not
/// succeed. The access and modification times are set either way.
pub fn apply_times(
    path: &Path,
    times: &TimestampPair,
    platform: Option<Platform>,
    set_creation: bool,
) -> Result<Option<FsTimeError>, FlattenError> {
    let modified = to_system_time(times.modification());
    set_access_and_modified(path, modified)?;
    debug!("Set mtime/atime of {} to {}", path.display(), times.modification());

    if !set_creation {
        return Ok(None);
    }

    let outcome = match platform {
        Some(Platform::MacOs) => set_created_with_touch(path, times.creation()).and_then(|()| {
            // touch rewrote mtime as well
            set_access_and_modified(path, modified).map_err(|e| FsTimeError::CommandFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        }),
        Some(Platform::Windows) => set_created_native(path, to_system_time(times.creation()))
            .map_err(|e| FsTimeError::CommandFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }),
        Some(Platform::Linux) => {
            debug!("Linux has no settable creation time; skipping");
            Ok(())
        }
        None => Err(FsTimeError::Unsupported {
            platform: std::env::consts::OS.to_string(),
        }),
    };

    match outcome {
        Ok(()) => Ok(None),
        Err(e) => {
            warn!("{}", e);
            Ok(Some(e))
        }
    }
}

fn set_access_and_modified(path: &Path, t: SystemTime) -> Result<(), FlattenError> {
    let io_err = |source: std::io::Error| FlattenError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let file = File::options().write(true).open(path).map_err(io_err)?;
    file.set_times(FileTimes::new().set_accessed(t).set_modified(t))
        .map_err(io_err)
}

fn set_created_with_touch(path: &Path, creation: NaiveDateTime) -> Result<(), FsTimeError> {
    let stamp = creation.format("%Y%m%d%H%M.%S").to_string();
    let output = Command::new("touch")
        .arg("-t")
        .arg(&stamp)
        .arg(path)
        .output()
        .map_err(|e| FsTimeError::CommandFailed {
            path: path.to_path_buf(),
            detail: format!("could not run touch: {e}"),
        })?;

    if output.status.success() {
        debug!("touch -t {} {}", stamp, path.display());
        Ok(())
    } else {
        Err(FsTimeError::CommandFailed {
            path: path.to_path_buf(),
            detail: format!(
                "touch exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })
    }
}

#[cfg(windows)]
fn set_created_native(path: &Path, t: SystemTime) -> std::io::Result<()> {
    use std::os::windows::fs::FileTimesExt;
    let file = File::options().write(true).open(path)?;
    file.set_times(FileTimes::new().set_created(t))
}

#[cfg(not(windows))]
fn set_created_native(_path: &Path, _t: SystemTime) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "creation time is only settable natively on Windows",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::metadata::fs_times_of;
    use chrono::NaiveDate;

    fn pair() -> TimestampPair {
        let day = |d| {
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap()
        };
        TimestampPair::new(day(1), day(2))
    }

    fn scratch_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"%PDF-1.5\n").unwrap();
        (dir, path)
    }

    #[test]
    fn sets_modification_and_access() {
        let (_dir, path) = scratch_file();
        let times = pair();

        let warning = apply_times(&path, &times, Some(Platform::Linux), true).unwrap();
        assert!(warning.is_none());

        let meta = std::fs::metadata(&path).unwrap();
        let expected = to_system_time(times.modification());
        assert_eq!(meta.modified().unwrap(), expected);
        assert_eq!(meta.accessed().unwrap(), expected);
        assert_eq!(fs_times_of(&path).unwrap().modified, times.modification());
    }

    #[test]
    fn creation_step_can_be_skipped() {
        let (_dir, path) = scratch_file();
        let warning = apply_times(&path, &pair(), None, false).unwrap();
        assert!(warning.is_none());
    }

    #[test]
    fn unknown_platform_is_a_warning_not_an_error() {
        let (_dir, path) = scratch_file();
        let times = pair();
        let warning = apply_times(&path, &times, None, true).unwrap();
        assert!(matches!(warning, Some(FsTimeError::Unsupported { .. })));
        assert_eq!(fs_times_of(&path).unwrap().modified, times.modification());
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = apply_times(&dir.path().join("gone.pdf"), &pair(), None, false).unwrap_err();
        assert!(matches!(err, FlattenError::OutputWriteFailed { .. }));
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn macos_moves_birth_time_back() {
        let (_dir, path) = scratch_file();
        let times = pair();
        let warning = apply_times(&path, &times, Some(Platform::MacOs), true).unwrap();
        assert!(warning.is_none(), "{warning:?}");

        let stamped = fs_times_of(&path).unwrap();
        assert_eq!(stamped.created, Some(times.creation()));
        assert_eq!(stamped.modified, times.modification());
    }
}
