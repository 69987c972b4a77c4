//! Document dates: parse, resolve and write `CreationDate` / `ModDate`.
//!
//! Resolution works field by field:
//!
//! 1. The original instant is the document's own Info date when it parses,
//!    else the input file's file-system time (birth time where the platform
//!    reports one, modification time otherwise).
//! 2. An override date replaces the calendar date and keeps the original's
//!    hour, minute and second.
//! 3. [`TimestampPair::new`] clamps modification up to creation.
//!
//! All instants are wall-clock [`NaiveDateTime`]s. They are written with a
//! literal `+00'00'` suffix, matching what readers of these files expect.

use crate::error::FlattenError;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use lopdf::{Dictionary, Document, IncrementalDocument, Object};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// `strftime` pattern for dates written into the Info dictionary.
pub const PDF_DATE_FORMAT: &str = "D:%Y%m%d%H%M%S+00'00'";

/// Accepted format for override dates.
pub const OVERRIDE_DATE_FORMAT: &str = "%Y-%m-%d";

/// `D:YYYY[MM[DD[HH[mm[SS]]]]]`, anything after the seconds is ignored.
static RE_PDF_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:D:)?(\d{4})(\d{2})?(\d{2})?(\d{2})?(\d{2})?(\d{2})?").unwrap()
});

/// Trailer entries the incremental update must carry over unchanged.
const PRESERVED_TRAILER_KEYS: [&[u8]; 3] = [b"Root", b"Encrypt", b"ID"];

/// Parse a `YYYY-MM-DD` override for `field` ("creation" or "modification").
pub fn parse_override_date(field: &'static str, raw: &str) -> Result<NaiveDate, FlattenError> {
    NaiveDate::parse_from_str(raw, OVERRIDE_DATE_FORMAT).map_err(|_| {
        FlattenError::InvalidDateFormat {
            field,
            value: raw.to_string(),
        }
    })
}

/// Parse a PDF date string. Missing trailing components default to the
/// start of their range; the timezone offset is ignored.
pub fn parse_pdf_date(raw: &str) -> Option<NaiveDateTime> {
    let caps = RE_PDF_DATE.captures(raw)?;
    let num = |i: usize, default: u32| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };

    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2, 1)?, num(3, 1)?)?;
    let time = NaiveTime::from_hms_opt(num(4, 0)?, num(5, 0)?, num(6, 0)?)?;
    Some(date.and_time(time))
}

/// Format an instant the way it is stored in the Info dictionary.
pub fn format_pdf_date(dt: &NaiveDateTime) -> String {
    dt.format(PDF_DATE_FORMAT).to_string()
}

/// Resolved creation and modification instants.
///
/// Construction enforces `modification >= creation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampPair {
    creation: NaiveDateTime,
    modification: NaiveDateTime,
}

impl TimestampPair {
    /// Pair two instants, raising `modification` to `creation` when it is
    /// earlier.
    pub fn new(creation: NaiveDateTime, modification: NaiveDateTime) -> Self {
        let modification = if modification < creation {
            debug!(
                "Modification {} precedes creation {}; clamping",
                modification, creation
            );
            creation
        } else {
            modification
        };
        Self {
            creation,
            modification,
        }
    }

    pub fn creation(&self) -> NaiveDateTime {
        self.creation
    }

    pub fn modification(&self) -> NaiveDateTime {
        self.modification
    }
}

/// Where an original instant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    Document,
    FileSystem,
}

/// File-system timestamps of the input, as local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsTimes {
    /// Birth time; `None` where the platform or file system lacks one.
    pub created: Option<NaiveDateTime>,
    pub modified: NaiveDateTime,
}

/// Read the input file's creation and modification times.
pub fn fs_times_of(path: &Path) -> Result<FsTimes, FlattenError> {
    let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FlattenError::InputNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => FlattenError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => FlattenError::Internal(format!("stat {}: {}", path.display(), e)),
    })?;

    let modified = meta.modified().map_err(|e| {
        FlattenError::Internal(format!("modification time of {}: {}", path.display(), e))
    })?;

    Ok(FsTimes {
        created: meta.created().ok().map(local_naive),
        modified: local_naive(modified),
    })
}

fn local_naive(t: std::time::SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(t).naive_local()
}

/// The input's own creation and modification instants, before overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalTimes {
    pub creation: NaiveDateTime,
    pub creation_source: TimeSource,
    pub modification: NaiveDateTime,
    pub modification_source: TimeSource,
}

/// Pick each original instant from the document's Info strings, falling back
/// to the file system when a string is absent or unparseable.
pub fn original_times(
    doc_creation: Option<&str>,
    doc_modification: Option<&str>,
    fs: &FsTimes,
) -> OriginalTimes {
    let (creation, creation_source) = match doc_creation.and_then(parse_pdf_date) {
        Some(dt) => (dt, TimeSource::Document),
        None => (fs.created.unwrap_or(fs.modified), TimeSource::FileSystem),
    };
    let (modification, modification_source) = match doc_modification.and_then(parse_pdf_date) {
        Some(dt) => (dt, TimeSource::Document),
        None => (fs.modified, TimeSource::FileSystem),
    };

    OriginalTimes {
        creation,
        creation_source,
        modification,
        modification_source,
    }
}

/// Apply optional date overrides to the original instants.
pub fn resolve(
    original: &OriginalTimes,
    creation_override: Option<NaiveDate>,
    modification_override: Option<NaiveDate>,
) -> TimestampPair {
    let creation = match creation_override {
        Some(date) => on_date(date, original.creation),
        None => original.creation,
    };
    let modification = match modification_override {
        Some(date) => on_date(date, original.modification),
        None => original.modification,
    };
    TimestampPair::new(creation, modification)
}

/// `date` at `original`'s time of day, whole seconds.
fn on_date(date: NaiveDate, original: NaiveDateTime) -> NaiveDateTime {
    let time = original.time();
    date.and_time(time.with_nanosecond(0).unwrap_or(time))
}

/// Write both instants into the Info dictionary of `path` as an incremental
/// update. Catalog, encryption and file identifiers are left as they are.
pub fn write_document_dates(path: &Path, times: &TimestampPair) -> Result<(), FlattenError> {
    let pdf_err = |e: lopdf::Error| FlattenError::PdfWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let mut doc = IncrementalDocument::load(path).map_err(pdf_err)?;
    let prev = doc.get_prev_documents();
    let prev_trailer = prev.trailer.clone();
    let prev_max_id = prev.max_id;

    for key in PRESERVED_TRAILER_KEYS {
        if !doc.new_document.trailer.has(key) {
            if let Ok(value) = prev_trailer.get(key) {
                doc.new_document.trailer.set(key.to_vec(), value.clone());
            }
        }
    }
    doc.new_document.max_id = doc.new_document.max_id.max(prev_max_id);

    let creation = Object::string_literal(format_pdf_date(&times.creation()));
    let modification = Object::string_literal(format_pdf_date(&times.modification()));

    match prev_trailer.get(b"Info") {
        Ok(Object::Reference(info_id)) => {
            let info_id = *info_id;
            doc.opt_clone_object_to_new_document(info_id)
                .map_err(pdf_err)?;
            let info = doc
                .new_document
                .get_object_mut(info_id)
                .and_then(Object::as_dict_mut)
                .map_err(pdf_err)?;
            info.set("CreationDate", creation);
            info.set("ModDate", modification);
        }
        other => {
            let mut info = match other {
                Ok(Object::Dictionary(inline)) => inline.clone(),
                _ => Dictionary::new(),
            };
            info.set("CreationDate", creation);
            info.set("ModDate", modification);
            let info_id = doc.new_document.add_object(info);
            doc.new_document.trailer.set("Info", info_id);
        }
    }

    doc.save(path).map_err(|e| FlattenError::PdfWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    info!(
        "Wrote CreationDate={} ModDate={} to {}",
        format_pdf_date(&times.creation()),
        format_pdf_date(&times.modification()),
        path.display()
    );
    Ok(())
}

/// Raw `CreationDate` / `ModDate` strings of a document's Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentDates {
    pub creation: Option<String>,
    pub modification: Option<String>,
}

/// Read the Info dates back with lopdf.
pub fn read_document_dates(path: &Path) -> Result<DocumentDates, FlattenError> {
    let doc = Document::load(path).map_err(|e| FlattenError::CorruptDocument {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let info = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(d)) => Some(d),
        _ => None,
    };
    let Some(info) = info else {
        return Ok(DocumentDates::default());
    };

    let text = |key: &[u8]| -> Option<String> {
        info.get(key)
            .and_then(Object::as_str)
            .ok()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    };

    Ok(DocumentDates {
        creation: text(b"CreationDate"),
        modification: text(b"ModDate"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn dated_info(creation: &str, modification: &str) -> Dictionary {
        dictionary! {
            "CreationDate" => Object::string_literal(creation),
            "ModDate" => Object::string_literal(modification),
        }
    }

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn date(y: i32, mo: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap()
    }

    /// Minimal one-page PDF, optionally with an Info dictionary.
    fn write_pdf(path: &Path, info: Option<Dictionary>) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"q Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0i64.into(), 0i64.into(), 100i64.into(), 100i64.into()],
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if let Some(info) = info {
            let info_id = doc.add_object(info);
            doc.trailer.set("Info", info_id);
        }
        doc.save(path).unwrap();
    }

    #[test]
    fn parses_full_pdf_date() {
        assert_eq!(
            parse_pdf_date("D:20230515103000+02'00'"),
            Some(dt(2023, 5, 15, 10, 30, 0))
        );
        assert_eq!(
            parse_pdf_date("D:20230515103000Z"),
            Some(dt(2023, 5, 15, 10, 30, 0))
        );
    }

    #[test]
    fn parses_partial_pdf_date() {
        assert_eq!(parse_pdf_date("D:2023"), Some(dt(2023, 1, 1, 0, 0, 0)));
        assert_eq!(parse_pdf_date("20230515"), Some(dt(2023, 5, 15, 0, 0, 0)));
    }

    #[test]
    fn rejects_garbage_pdf_date() {
        assert_eq!(parse_pdf_date(""), None);
        assert_eq!(parse_pdf_date("yesterday"), None);
        assert_eq!(parse_pdf_date("D:20231345"), None);
    }

    #[test]
    fn formats_with_utc_suffix() {
        assert_eq!(
            format_pdf_date(&dt(2024, 1, 2, 14, 5, 9)),
            "D:20240102140509+00'00'"
        );
    }

    #[test]
    fn override_date_format() {
        assert_eq!(parse_override_date("creation", "2024-01-01").unwrap(), date(2024, 1, 1));
        for bad in ["2024/01/01", "01-01-2024", "2024-13-01", "tomorrow", ""] {
            let err = parse_override_date("creation", bad).unwrap_err();
            assert!(
                matches!(err, FlattenError::InvalidDateFormat { field: "creation", .. }),
                "{bad}"
            );
        }
    }

    #[test]
    fn pair_clamps_modification_to_creation() {
        let pair = TimestampPair::new(dt(2024, 3, 1, 9, 0, 0), dt(2024, 2, 1, 9, 0, 0));
        assert_eq!(pair.modification(), pair.creation());

        let pair = TimestampPair::new(dt(2024, 1, 1, 9, 0, 0), dt(2024, 2, 1, 9, 0, 0));
        assert_eq!(pair.modification(), dt(2024, 2, 1, 9, 0, 0));
    }

    #[test]
    fn document_dates_win_over_fs() {
        let fs = FsTimes {
            created: Some(dt(2020, 1, 1, 0, 0, 0)),
            modified: dt(2020, 6, 1, 0, 0, 0),
        };
        let orig = original_times(
            Some("D:20230515103000+00'00'"),
            Some("D:20230601143015+00'00'"),
            &fs,
        );
        assert_eq!(orig.creation, dt(2023, 5, 15, 10, 30, 0));
        assert_eq!(orig.creation_source, TimeSource::Document);
        assert_eq!(orig.modification, dt(2023, 6, 1, 14, 30, 15));
        assert_eq!(orig.modification_source, TimeSource::Document);
    }

    #[test]
    fn fields_fall_back_independently() {
        let fs = FsTimes {
            created: None,
            modified: dt(2020, 6, 1, 8, 0, 0),
        };
        let orig = original_times(Some("not a date"), Some("D:20230601143015"), &fs);
        assert_eq!(orig.creation, fs.modified, "no birth time falls back to mtime");
        assert_eq!(orig.creation_source, TimeSource::FileSystem);
        assert_eq!(orig.modification_source, TimeSource::Document);
    }

    #[test]
    fn overrides_keep_original_time_of_day() {
        let orig = OriginalTimes {
            creation: dt(2023, 5, 15, 10, 30, 0),
            creation_source: TimeSource::Document,
            modification: dt(2023, 6, 1, 14, 30, 15),
            modification_source: TimeSource::Document,
        };
        let pair = resolve(&orig, Some(date(2024, 1, 1)), Some(date(2024, 1, 2)));
        assert_eq!(pair.creation(), dt(2024, 1, 1, 10, 30, 0));
        assert_eq!(pair.modification(), dt(2024, 1, 2, 14, 30, 15));
    }

    #[test]
    fn no_overrides_use_originals() {
        let orig = OriginalTimes {
            creation: dt(2023, 5, 15, 10, 30, 0),
            creation_source: TimeSource::Document,
            modification: dt(2023, 6, 1, 14, 30, 15),
            modification_source: TimeSource::FileSystem,
        };
        let pair = resolve(&orig, None, None);
        assert_eq!(pair.creation(), orig.creation);
        assert_eq!(pair.modification(), orig.modification);
    }

    #[test]
    fn later_creation_override_forces_modification() {
        let orig = OriginalTimes {
            creation: dt(2023, 5, 15, 10, 30, 0),
            creation_source: TimeSource::Document,
            modification: dt(2023, 6, 1, 9, 0, 0),
            modification_source: TimeSource::Document,
        };
        let pair = resolve(&orig, Some(date(2024, 3, 1)), Some(date(2024, 2, 1)));
        assert_eq!(pair.creation(), dt(2024, 3, 1, 10, 30, 0));
        assert_eq!(pair.modification(), pair.creation());
    }

    #[test]
    fn override_drops_subsecond_precision() {
        let original = dt(2023, 5, 15, 10, 30, 0) + chrono::Duration::milliseconds(750);
        assert_eq!(on_date(date(2024, 1, 1), original), dt(2024, 1, 1, 10, 30, 0));
    }

    #[test]
    fn fs_times_of_missing_file() {
        let err = fs_times_of(Path::new("/no/such/file.pdf")).unwrap_err();
        assert!(matches!(err, FlattenError::InputNotFound { .. }));
    }

    #[test]
    fn fs_times_of_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"%PDF-1.5").unwrap();
        let times = fs_times_of(&path).unwrap();
        let now = Local::now().naive_local();
        assert!((now - times.modified).num_seconds().abs() < 300);
    }

    #[test]
    fn write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(&path, Some(dictionary! { "Producer" => Object::string_literal("test") }));

        let pair = TimestampPair::new(dt(2024, 1, 1, 10, 30, 0), dt(2024, 1, 2, 14, 30, 15));
        write_document_dates(&path, &pair).unwrap();

        let dates = read_document_dates(&path).unwrap();
        let creation = dates.creation.as_deref().and_then(parse_pdf_date).unwrap();
        let modification = dates.modification.as_deref().and_then(parse_pdf_date).unwrap();
        assert_eq!(creation, pair.creation());
        assert_eq!(modification, pair.modification());
        assert_eq!(dates.creation.as_deref(), Some("D:20240101103000+00'00'"));
    }

    #[test]
    fn update_is_appended_and_keeps_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(&path, Some(dated_info("D:20200101000000", "D:20200101000000")));
        let before = std::fs::read(&path).unwrap();

        let pair = TimestampPair::new(dt(2024, 5, 5, 5, 5, 5), dt(2024, 5, 6, 5, 5, 5));
        write_document_dates(&path, &pair).unwrap();

        let after = std::fs::read(&path).unwrap();
        assert!(after.len() > before.len());
        assert_eq!(&after[..before.len()], &before[..], "original bytes are kept");

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let dates = read_document_dates(&path).unwrap();
        assert_eq!(dates.modification.as_deref(), Some("D:20240506050505+00'00'"));
    }

    #[test]
    fn missing_info_dictionary_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(&path, None);
        assert_eq!(read_document_dates(&path).unwrap(), DocumentDates::default());

        let pair = TimestampPair::new(dt(2024, 1, 1, 0, 0, 0), dt(2024, 1, 1, 0, 0, 0));
        write_document_dates(&path, &pair).unwrap();
        let dates = read_document_dates(&path).unwrap();
        assert_eq!(dates.creation.as_deref(), Some("D:20240101000000+00'00'"));
    }
}
