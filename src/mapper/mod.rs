//! Pure translation of raw upstream JSON records into store row types.
//!
//! A mapping failure rejects the single record it occurred in; the sync job
//! logs and skips it. Partial records are never produced: either every
//! required field parses, or the whole record is dropped.

use serde_json::Value;
use thiserror::Error;

use crate::database::repo::{BreedRecord, ImageRecord};

/// Upstream schema evolution. V1 encodes the nine characteristic flags as
/// 0/1 integers and carries only `reference_image_id`; V2 encodes the flags
/// as native booleans and may embed the referenced image object inline on
/// the breed. Either version coerces the other flag representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVersion {
    #[default]
    V1,
    V2,
}

impl SchemaVersion {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "v1" => Some(SchemaVersion::V1),
            "v2" => Some(SchemaVersion::V2),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("missing or invalid required field `{0}`")]
    MissingField(&'static str),
    #[error("malformed range in `{field}`: `{value}`")]
    MalformedRange { field: &'static str, value: String },
    #[error("non-positive dimension `{field}`: {value}")]
    NonPositiveDimension { field: &'static str, value: i64 },
}

/// A mapped breed plus the inline image object V2 responses may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedBreed {
    pub record: BreedRecord,
    pub embedded_image: Option<ImageRecord>,
}

pub fn map_breed(version: SchemaVersion, raw: &Value) -> Result<MappedBreed, MapError> {
    let weight = raw.get("weight").ok_or(MapError::MissingField("weight"))?;
    let (weight_imperial_min, weight_imperial_max) =
        parse_range("weight.imperial", required_str(weight, "imperial")
            .map_err(|_| MapError::MissingField("weight.imperial"))?)?;
    let (weight_metric_min, weight_metric_max) =
        parse_range("weight.metric", required_str(weight, "metric")
            .map_err(|_| MapError::MissingField("weight.metric"))?)?;
    let (life_span_min, life_span_max) =
        parse_range("life_span", required_str(raw, "life_span")?)?;

    let record = BreedRecord {
        external_id: required_str(raw, "id")?.to_string(),
        name: required_str(raw, "name")?.to_string(),
        description: required_str(raw, "description")?.to_string(),
        alt_names: optional_str(raw, "alt_names"),
        origin: optional_str(raw, "origin"),
        country_code: optional_str(raw, "country_code"),
        vetstreet_url: optional_str(raw, "vetstreet_url"),
        wikipedia_url: optional_str(raw, "wikipedia_url"),
        weight_imperial_min,
        weight_imperial_max,
        weight_metric_min,
        weight_metric_max,
        life_span_min,
        life_span_max,
        temperament: required_str(raw, "temperament")?.to_string(),
        adaptability: trait_score(raw, "adaptability")?,
        affection_level: trait_score(raw, "affection_level")?,
        child_friendly: trait_score(raw, "child_friendly")?,
        dog_friendly: trait_score(raw, "dog_friendly")?,
        energy_level: trait_score(raw, "energy_level")?,
        grooming: trait_score(raw, "grooming")?,
        health_issues: trait_score(raw, "health_issues")?,
        intelligence: trait_score(raw, "intelligence")?,
        shedding_level: trait_score(raw, "shedding_level")?,
        social_needs: trait_score(raw, "social_needs")?,
        stranger_friendly: trait_score(raw, "stranger_friendly")?,
        vocalisation: trait_score(raw, "vocalisation")?,
        indoor: flag(raw, "indoor")?,
        experimental: flag(raw, "experimental")?,
        hairless: flag(raw, "hairless")?,
        natural: flag(raw, "natural")?,
        rare: flag(raw, "rare")?,
        rex: flag(raw, "rex")?,
        suppressed_tail: flag(raw, "suppressed_tail")?,
        short_legs: flag(raw, "short_legs")?,
        hypoallergenic: flag(raw, "hypoallergenic")?,
        reference_image_id: optional_str(raw, "reference_image_id"),
    };

    // V2 may ship the referenced image inline. A malformed embedded object
    // is ignored rather than rejecting the breed; the reference-fetch path
    // picks the image up on a later run.
    let embedded_image = match version {
        SchemaVersion::V1 => None,
        SchemaVersion::V2 => raw.get("image").and_then(|img| map_image(img).ok()),
    };

    Ok(MappedBreed {
        record,
        embedded_image,
    })
}

pub fn map_image(raw: &Value) -> Result<ImageRecord, MapError> {
    let width = raw
        .get("width")
        .and_then(Value::as_i64)
        .ok_or(MapError::MissingField("width"))?;
    let height = raw
        .get("height")
        .and_then(Value::as_i64)
        .ok_or(MapError::MissingField("height"))?;
    if width <= 0 {
        return Err(MapError::NonPositiveDimension {
            field: "width",
            value: width,
        });
    }
    if height <= 0 {
        return Err(MapError::NonPositiveDimension {
            field: "height",
            value: height,
        });
    }
    Ok(ImageRecord {
        external_id: required_str(raw, "id")?.to_string(),
        url: required_str(raw, "url")?.to_string(),
        width,
        height,
    })
}

/// Parse a `"<min> - <max>"` range string. Anything other than exactly two
/// integer halves joined by `" - "` rejects the whole record.
fn parse_range(field: &'static str, raw: &str) -> Result<(i64, i64), MapError> {
    let malformed = || MapError::MalformedRange {
        field,
        value: raw.to_string(),
    };

    let mut halves = raw.split(" - ");
    let (min, max) = match (halves.next(), halves.next(), halves.next()) {
        (Some(min), Some(max), None) => (min, max),
        _ => return Err(malformed()),
    };
    let min = min.parse::<i64>().map_err(|_| malformed())?;
    let max = max.parse::<i64>().map_err(|_| malformed())?;
    Ok((min, max))
}

fn required_str<'a>(raw: &'a Value, field: &'static str) -> Result<&'a str, MapError> {
    raw.get(field)
        .and_then(Value::as_str)
        .ok_or(MapError::MissingField(field))
}

fn optional_str(raw: &Value, field: &str) -> String {
    raw.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn trait_score(raw: &Value, field: &'static str) -> Result<i64, MapError> {
    raw.get(field)
        .and_then(Value::as_i64)
        .ok_or(MapError::MissingField(field))
}

/// Truthy/falsy coercion across schema versions: integers map 0 -> false,
/// nonzero -> true; native booleans pass through.
fn flag(raw: &Value, field: &'static str) -> Result<bool, MapError> {
    match raw.get(field) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => Ok(n.as_i64().unwrap_or(0) != 0),
        _ => Err(MapError::MissingField(field)),
    }
}
