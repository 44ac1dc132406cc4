//! KMZ archive extraction.
//!
//! A KMZ file is a ZIP container holding a KML document. Extraction opens the
//! container, selects the first member whose name ends in `.kml` and reads
//! the placemark's coordinates, description and name from it.
//!
//! Every failure is returned as an [`ExtractError`] value so that the worker
//! pool can report it without disturbing other jobs.
//!
//! # Example
//!
//! ```no_run
//! use placemarks_core::extract::extract_archive;
//! use std::path::Path;
//!
//! match extract_archive(Path::new("site.kmz")) {
//!     Ok(record) => println!("{} at {}", record.name, record.coordinates),
//!     Err(e) => eprintln!("skipped: {e}"),
//! }
//! ```

pub mod kml;

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::record::Record;
use kml::{COORDINATES_PATH, DESCRIPTION_PATH, LookupFailure, NAME_PATH};

pub use kml::lookup_paths;

/// Member name suffix of the inner KML document.
pub const INNER_DOCUMENT_SUFFIX: &str = ".kml";

/// The three values read from a placemark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Coordinates,
    Description,
    Name,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Coordinates => "coordinates",
            Self::Description => "description",
            Self::Name => "name",
        };
        write!(f, "{label}")
    }
}

/// Coarse classification of extraction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ArchiveOpen,
    NoMatchingMember,
    MemberRead,
    Markup,
    FieldNotFound,
    WorkerPanicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ArchiveOpen => "archive_open",
            Self::NoMatchingMember => "no_matching_member",
            Self::MemberRead => "member_read",
            Self::Markup => "markup",
            Self::FieldNotFound => "field_not_found",
            Self::WorkerPanicked => "worker_panicked",
        };
        write!(f, "{label}")
    }
}

/// Per-archive extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file is missing, unreadable, or not a ZIP container.
    #[error("cannot open archive {path}: {source}")]
    ArchiveOpen {
        /// Archive path.
        path: PathBuf,
        /// Underlying ZIP (or IO) error.
        #[source]
        source: ZipError,
    },

    /// The container has no member ending in `.kml`.
    #[error("archive {path} contains no {INNER_DOCUMENT_SUFFIX} document")]
    NoMatchingMember {
        /// Archive path.
        path: PathBuf,
    },

    /// The selected member could not be opened for reading.
    #[error("cannot read {member} in {path}: {source}")]
    MemberRead {
        /// Archive path.
        path: PathBuf,
        /// Member name inside the archive.
        member: String,
        /// Underlying ZIP error.
        #[source]
        source: ZipError,
    },

    /// The selected member is not well-formed XML.
    #[error("malformed KML in {member} of {path}: {source}")]
    Markup {
        /// Archive path.
        path: PathBuf,
        /// Member name inside the archive.
        member: String,
        /// Underlying parser error.
        #[source]
        source: quick_xml::Error,
    },

    /// A placemark value did not resolve to exactly one scalar.
    #[error("placemark {field} in {path}: {reason}")]
    FieldNotFound {
        /// Archive path.
        path: PathBuf,
        /// Which value failed.
        field: Field,
        /// Why the lookup failed.
        reason: LookupFailure,
    },

    /// The extractor panicked while processing this archive.
    #[error("worker panicked while processing {path}")]
    WorkerPanicked {
        /// Archive path.
        path: PathBuf,
    },
}

impl ExtractError {
    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ArchiveOpen { .. } => FailureKind::ArchiveOpen,
            Self::NoMatchingMember { .. } => FailureKind::NoMatchingMember,
            Self::MemberRead { .. } => FailureKind::MemberRead,
            Self::Markup { .. } => FailureKind::Markup,
            Self::FieldNotFound { .. } => FailureKind::FieldNotFound,
            Self::WorkerPanicked { .. } => FailureKind::WorkerPanicked,
        }
    }

    /// Returns the archive the failure belongs to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::ArchiveOpen { path, .. }
            | Self::NoMatchingMember { path }
            | Self::MemberRead { path, .. }
            | Self::Markup { path, .. }
            | Self::FieldNotFound { path, .. }
            | Self::WorkerPanicked { path } => path,
        }
    }
}

/// Turns one archive path into a [`Record`].
///
/// Implementations must be callable from several worker threads at once.
pub trait Extractor: Sync {
    /// Extracts the placemark held by the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractError`] describing why no record was produced.
    fn extract(&self, path: &Path) -> Result<Record, ExtractError>;
}

/// Extractor for KMZ archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct KmzExtractor;

impl Extractor for KmzExtractor {
    fn extract(&self, path: &Path) -> Result<Record, ExtractError> {
        extract_archive(path)
    }
}

/// Opens the KMZ archive at `path` and reads its placemark.
///
/// # Errors
///
/// - [`ExtractError::ArchiveOpen`] if the file cannot be opened as a ZIP.
/// - [`ExtractError::NoMatchingMember`] if no member name ends in `.kml`.
/// - [`ExtractError::MemberRead`] / [`ExtractError::Markup`] if the member
///   cannot be read or parsed.
/// - [`ExtractError::FieldNotFound`] if any of the three values is missing,
///   repeated, or not plain text.
pub fn extract_archive(path: &Path) -> Result<Record, ExtractError> {
    let open_error = |source: ZipError| ExtractError::ArchiveOpen {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|e| open_error(ZipError::Io(e)))?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(open_error)?;

    let Some((index, member)) = find_inner_document(&archive) else {
        return Err(ExtractError::NoMatchingMember {
            path: path.to_path_buf(),
        });
    };

    debug!(path = %path.display(), member = %member, "reading inner document");

    let entry = archive
        .by_index(index)
        .map_err(|source| ExtractError::MemberRead {
            path: path.to_path_buf(),
            member: member.clone(),
            source,
        })?;

    let values = lookup_paths(
        BufReader::new(entry),
        &[COORDINATES_PATH, DESCRIPTION_PATH, NAME_PATH],
    )
    .map_err(|source| ExtractError::Markup {
        path: path.to_path_buf(),
        member,
        source,
    })?;

    let mut values = values.into_iter();
    let mut next_field = |field: Field| {
        values
            .next()
            .unwrap_or(Err(LookupFailure::Missing))
            .map_err(|reason| ExtractError::FieldNotFound {
                path: path.to_path_buf(),
                field,
                reason,
            })
    };

    let coordinates = next_field(Field::Coordinates)?;
    let description = next_field(Field::Description)?;
    let name = next_field(Field::Name)?;

    Ok(Record {
        coordinates,
        description,
        name,
    })
}

/// Returns the index and name of the first `.kml` member in listing order.
fn find_inner_document<R>(archive: &ZipArchive<R>) -> Option<(usize, String)>
where
    R: std::io::Read + std::io::Seek,
{
    (0..archive.len()).find_map(|index| {
        archive
            .name_for_index(index)
            .filter(|name| name.ends_with(INNER_DOCUMENT_SUFFIX))
            .map(|name| (index, name.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn placemark(name: &str, description: &str, coordinates: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <kml xmlns=\"http://www.opengis.net/kml/2.2\"><Document><Placemark>\
             <name>{name}</name><description>{description}</description>\
             <Point><coordinates>{coordinates}</coordinates></Point>\
             </Placemark></Document></kml>"
        )
    }

    fn write_archive(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extract_archive_reads_placemark() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("a.kmz");
        write_archive(&path, &[("doc.kml", &placemark("Point A", "First", "1.0,2.0"))]);

        let record = extract_archive(&path).unwrap();

        assert_eq!(record, Record::new("1.0,2.0", "First", "Point A"));
    }

    #[test]
    fn test_extract_archive_uses_first_kml_member() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("multi.kmz");
        write_archive(
            &path,
            &[
                ("files/icon.png", "not xml"),
                ("first.kml", &placemark("First", "", "1,1")),
                ("second.kml", &placemark("Second", "", "2,2")),
            ],
        );

        let record = extract_archive(&path).unwrap();

        assert_eq!(record.name, "First");
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_extract_archive_without_kml_is_no_matching_member() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("empty.kmz");
        write_archive(&path, &[("readme.txt", "nothing here")]);

        let err = extract_archive(&path).unwrap_err();

        assert_eq!(err.kind(), FailureKind::NoMatchingMember);
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn test_extract_archive_kml_suffix_is_case_sensitive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("upper.kmz");
        write_archive(&path, &[("DOC.KML", &placemark("x", "y", "1,2"))]);

        let err = extract_archive(&path).unwrap_err();

        assert_eq!(err.kind(), FailureKind::NoMatchingMember);
    }

    #[test]
    fn test_extract_archive_missing_file_is_archive_open() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = extract_archive(&temp_dir.path().join("missing.kmz")).unwrap_err();
        assert_eq!(err.kind(), FailureKind::ArchiveOpen);
    }

    #[test]
    fn test_extract_archive_not_a_zip_is_archive_open() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("fake.kmz");
        std::fs::write(&path, b"this is not a zip file").unwrap();

        let err = extract_archive(&path).unwrap_err();

        assert_eq!(err.kind(), FailureKind::ArchiveOpen);
        assert!(err.to_string().contains("fake.kmz"));
    }

    #[test]
    fn test_extract_archive_missing_field_reports_field() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("noname.kmz");
        let doc = "<kml><Document><Placemark><description>d</description>\
                   <Point><coordinates>1,2</coordinates></Point></Placemark></Document></kml>";
        write_archive(&path, &[("doc.kml", doc)]);

        let err = extract_archive(&path).unwrap_err();

        assert!(matches!(
            err,
            ExtractError::FieldNotFound {
                field: Field::Name,
                reason: LookupFailure::Missing,
                ..
            }
        ));
    }

    #[test]
    fn test_extract_archive_malformed_xml_is_markup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.kmz");
        write_archive(&path, &[("doc.kml", "<kml><Document></kml>")]);

        let err = extract_archive(&path).unwrap_err();

        assert_eq!(err.kind(), FailureKind::Markup);
    }

    #[test]
    fn test_extract_archive_truncated_kml_is_markup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("truncated.kmz");
        let doc = "<kml><Document><Placemark><name>N</name><description>D</description>\
                   <Point><coordinates>1,2</coordinates></Point></Placemark>";
        write_archive(&path, &[("doc.kml", doc)]);

        let err = extract_archive(&path).unwrap_err();

        assert_eq!(err.kind(), FailureKind::Markup);
        assert!(err.to_string().contains("doc.kml"));
    }

    #[test]
    fn test_extract_archive_is_deterministic() {
        let temp_dir = tempfile::tempdir().unwrap();
        let good = temp_dir.path().join("good.kmz");
        let bad = temp_dir.path().join("bad.kmz");
        write_archive(&good, &[("doc.kml", &placemark("P", "D", "5,6"))]);
        write_archive(&bad, &[("doc.txt", "x")]);

        let first = extract_archive(&good).unwrap();
        for _ in 0..3 {
            assert_eq!(extract_archive(&good).unwrap(), first);
            assert_eq!(
                extract_archive(&bad).unwrap_err().kind(),
                FailureKind::NoMatchingMember
            );
        }
    }

    #[test]
    fn test_kmz_extractor_delegates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("a.kmz");
        write_archive(&path, &[("doc.kml", &placemark("A", "B", "1,2"))]);

        let record = KmzExtractor.extract(&path).unwrap();

        assert_eq!(record.name, "A");
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::NoMatchingMember.to_string(), "no_matching_member");
        assert_eq!(FailureKind::FieldNotFound.to_string(), "field_not_found");
    }
}
