//! Placemark records produced by archive extraction.
//!
//! A [`Record`] carries the three KML values exactly as they appeared in the
//! source document. Numeric interpretation of the coordinate text happens only
//! when a record is persisted, through [`parse_coordinates`].

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Separator between the fields of a KML coordinate tuple.
const COORDINATE_SEPARATOR: char = ',';

/// One placemark extracted from a KMZ archive.
///
/// All three fields are required: a record is only ever built once every
/// lookup in the inner document succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Raw `longitude,latitude[,altitude]` text, in KML order.
    pub coordinates: String,
    /// Free-text description, possibly empty.
    pub description: String,
    /// Placemark label.
    pub name: String,
}

impl Record {
    /// Creates a record from its three raw values.
    #[must_use]
    pub fn new(
        coordinates: impl Into<String>,
        description: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            coordinates: coordinates.into(),
            description: description.into(),
            name: name.into(),
        }
    }

    /// Parses the raw coordinate text of this record.
    ///
    /// # Errors
    ///
    /// See [`parse_coordinates`].
    pub fn position(&self) -> Result<Position, CoordinateError> {
        parse_coordinates(&self.coordinates)
    }
}

/// A record together with the archive it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Source archive.
    pub path: PathBuf,
    /// The placemark found in it.
    pub record: Record,
}

/// Longitude/latitude pair parsed from a record's coordinate text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub longitude: f64,
    pub latitude: f64,
}

/// Reasons a coordinate string cannot be turned into a [`Position`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    /// The text did not contain a longitude and a latitude.
    #[error("expected at least 2 comma-separated fields, found {found}")]
    MissingFields {
        /// Number of fields present after splitting.
        found: usize,
    },

    /// One of the fields is not a number.
    #[error("{axis} '{value}' is not a number")]
    NotANumber {
        /// `"longitude"` or `"latitude"`.
        axis: &'static str,
        /// The offending field text.
        value: String,
    },
}

/// Parses `longitude,latitude[,...]` coordinate text.
///
/// The first field is the longitude and the second the latitude; extra fields
/// (altitude) are ignored. Surrounding whitespace of each field is ignored,
/// since KML writers routinely wrap the tuple in newlines and indentation.
///
/// # Errors
///
/// Returns [`CoordinateError::MissingFields`] when fewer than two fields are
/// present, and [`CoordinateError::NotANumber`] when either field does not
/// parse as `f64`.
pub fn parse_coordinates(raw: &str) -> Result<Position, CoordinateError> {
    let fields: Vec<&str> = raw.split(COORDINATE_SEPARATOR).collect();
    if fields.len() < 2 {
        return Err(CoordinateError::MissingFields {
            found: fields.len(),
        });
    }

    let longitude = parse_axis("longitude", fields[0])?;
    let latitude = parse_axis("latitude", fields[1])?;

    Ok(Position {
        longitude,
        latitude,
    })
}

fn parse_axis(axis: &'static str, field: &str) -> Result<f64, CoordinateError> {
    let trimmed = field.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CoordinateError::NotANumber {
            axis,
            value: trimmed.to_string(),
        })
}
