// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Loading of [Paths](Path) and [Places](Place) from [GeoJSON](https://geojson.org/) files.
//!
//! Every `LineString` becomes a single [Path], and every `MultiLineString`
//! a [Path] per member line. `Point` features with a `name` property become [Places](Place).
//! The `name` property of a line feature is used as the name of its paths.

use std::fs::File;
use std::io::{self, BufRead};

use geojson::{GeoJson, Geometry, JsonObject, Value};
use log::{debug, warn};

use crate::{Coordinate, Path, Place};

/// Format of the input GeoJSON file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    Unknown,

    /// Force uncompressed GeoJSON
    GeoJson,

    /// Force GeoJSON with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    GeoJsonGz,

    /// Force GeoJSON with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    GeoJsonBz2,
}

impl FileFormat {
    /// Guesses the format from the leading bytes of a file.
    pub fn detect(head: &[u8]) -> Self {
        if head.starts_with(&[0x1F, 0x8B]) {
            FileFormat::GeoJsonGz
        } else if head.starts_with(b"BZh") {
            FileFormat::GeoJsonBz2
        } else {
            FileFormat::GeoJson
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("geojson: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("feature {feature}: position has {len} value(s), expected at least 2")]
    MalformedPosition { feature: usize, len: usize },

    #[error("feature {feature}: invalid coordinate {coord}")]
    InvalidCoordinate { feature: usize, coord: Coordinate },
}

/// Parse paths from a GeoJSON stream.
///
/// The provided stream will be automatically wrapped in a buffered reader when needed.
pub fn paths_from_io<R: io::Read>(reader: R, format: FileFormat) -> Result<Vec<Path>, Error> {
    paths_from_geojson(read_geojson(reader, format)?)
}

/// Parse paths from a GeoJSON file at the provided path.
pub fn paths_from_file<P: AsRef<std::path::Path>>(
    path: P,
    format: FileFormat,
) -> Result<Vec<Path>, Error> {
    let f = File::open(path)?;
    paths_from_io(f, format)
}

/// Parse paths from an in-memory GeoJSON buffer.
pub fn paths_from_buffer(data: &[u8], format: FileFormat) -> Result<Vec<Path>, Error> {
    paths_from_io(io::Cursor::new(data), format)
}

/// Parse named points of interest from a GeoJSON stream.
pub fn places_from_io<R: io::Read>(reader: R, format: FileFormat) -> Result<Vec<Place>, Error> {
    places_from_geojson(read_geojson(reader, format)?)
}

pub fn places_from_file<P: AsRef<std::path::Path>>(
    path: P,
    format: FileFormat,
) -> Result<Vec<Place>, Error> {
    let f = File::open(path)?;
    places_from_io(f, format)
}

pub fn places_from_buffer(data: &[u8], format: FileFormat) -> Result<Vec<Place>, Error> {
    places_from_io(io::Cursor::new(data), format)
}

fn read_geojson<R: io::Read>(reader: R, format: FileFormat) -> Result<GeoJson, Error> {
    let mut b = io::BufReader::new(reader);
    let format = match format {
        FileFormat::Unknown => {
            let detected = FileFormat::detect(b.fill_buf()?);
            debug!("detected input format: {detected:?}");
            detected
        }
        known => known,
    };

    let value: serde_json::Value = match format {
        FileFormat::GeoJsonGz => {
            let d = flate2::read::MultiGzDecoder::new(b);
            serde_json::from_reader(io::BufReader::new(d))?
        }

        FileFormat::GeoJsonBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(b);
            serde_json::from_reader(io::BufReader::new(d))?
        }

        FileFormat::GeoJson | FileFormat::Unknown => serde_json::from_reader(b)?,
    };

    Ok(GeoJson::from_json_value(value)?)
}

/// Geometries of top-level features, with the feature's properties.
fn geometries(geojson: GeoJson) -> Vec<(Geometry, Option<JsonObject>)> {
    match geojson {
        GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .filter_map(|f| f.geometry.map(|g| (g, f.properties)))
            .collect(),
        GeoJson::Feature(f) => f.geometry.map(|g| (g, f.properties)).into_iter().collect(),
        GeoJson::Geometry(g) => vec![(g, None)],
    }
}

fn name_of(properties: &Option<JsonObject>) -> Option<String> {
    properties
        .as_ref()
        .and_then(|p| p.get("name"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
}

fn paths_from_geojson(geojson: GeoJson) -> Result<Vec<Path>, Error> {
    let mut paths = Vec::new();
    for (feature, (geometry, properties)) in geometries(geojson).into_iter().enumerate() {
        let name = name_of(&properties);
        add_lines(feature, &geometry.value, &name, &mut paths)?;
    }

    debug!("loaded {} paths", paths.len());
    Ok(paths)
}

fn add_lines(
    feature: usize,
    value: &Value,
    name: &Option<String>,
    paths: &mut Vec<Path>,
) -> Result<(), Error> {
    match value {
        Value::LineString(line) => paths.push(Path {
            name: name.clone(),
            coords: to_coordinates(feature, line)?,
        }),

        Value::MultiLineString(lines) => {
            for line in lines {
                paths.push(Path {
                    name: name.clone(),
                    coords: to_coordinates(feature, line)?,
                });
            }
        }

        Value::GeometryCollection(members) => {
            for member in members {
                add_lines(feature, &member.value, name, paths)?;
            }
        }

        Value::Point(_) | Value::MultiPoint(_) => {}

        _ => warn!(
            "feature {feature} ({}): skipping non-linear geometry",
            name.as_deref().unwrap_or("unnamed")
        ),
    }
    Ok(())
}

fn places_from_geojson(geojson: GeoJson) -> Result<Vec<Place>, Error> {
    let mut places = Vec::new();
    for (feature, (geometry, properties)) in geometries(geojson).into_iter().enumerate() {
        let Value::Point(position) = &geometry.value else {
            continue;
        };

        match name_of(&properties) {
            Some(name) => places.push(Place {
                name,
                coord: to_coordinate(feature, position)?,
            }),
            None => debug!("feature {feature}: skipping unnamed point"),
        }
    }

    debug!("loaded {} places", places.len());
    Ok(places)
}

fn to_coordinates(feature: usize, line: &[Vec<f64>]) -> Result<Vec<Coordinate>, Error> {
    line.iter().map(|p| to_coordinate(feature, p)).collect()
}

fn to_coordinate(feature: usize, position: &[f64]) -> Result<Coordinate, Error> {
    let &[lon, lat, ..] = position else {
        return Err(Error::MalformedPosition {
            feature,
            len: position.len(),
        });
    };

    let coord = Coordinate::new(lon, lat);
    if coord.is_valid() {
        Ok(coord)
    } else {
        Err(Error::InvalidCoordinate { feature, coord })
    }
}
