use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};
use thiserror::Error;

// ─── Wire constants ──────────────────────────────────────────────────────────

pub const DEFAULT_BASE_URL: &str = "https://ssd-api.jpl.nasa.gov/cad.api";

/// Close-approach timestamps, e.g. `2025-Jan-03 14:27`.
pub const CLOSE_APPROACH_DATE_FORMAT: &str = "%Y-%b-%d %H:%M";
/// Query dates, e.g. `2025-01-03`.
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

pub mod status {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
    pub const SERVICE_UNAVAILABLE: u16 = 503;
}

pub mod keys {
    pub const COUNT: &str = "count";
    pub const DATA: &str = "data";
    pub const FIELDS: &str = "fields";
    pub const MESSAGE: &str = "message";
    pub const SIGNATURE: &str = "signature";
}

// ─── Object kinds ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Asteroid,
    NumberedAsteroid,
    UnnumberedAsteroid,
    Comet,
    NumberedComet,
    UnnumberedComet,
    Numbered,
    Unnumbered,
    /// Not accepted by the API; kept so negative checks can send it.
    Planet,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 9] = [
        ObjectKind::Asteroid,
        ObjectKind::NumberedAsteroid,
        ObjectKind::UnnumberedAsteroid,
        ObjectKind::Comet,
        ObjectKind::NumberedComet,
        ObjectKind::UnnumberedComet,
        ObjectKind::Numbered,
        ObjectKind::Unnumbered,
        ObjectKind::Planet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Asteroid => "a",
            ObjectKind::NumberedAsteroid => "an",
            ObjectKind::UnnumberedAsteroid => "au",
            ObjectKind::Comet => "c",
            ObjectKind::NumberedComet => "cn",
            ObjectKind::UnnumberedComet => "cu",
            ObjectKind::Numbered => "n",
            ObjectKind::Unnumbered => "u",
            ObjectKind::Planet => "p",
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, ObjectKind::Planet)
    }
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── Response bodies ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signature {
    pub version: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadResponse {
    pub signature: Signature,
    #[serde(deserialize_with = "deserialize_count")]
    pub count: u64,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub data: Option<Vec<Vec<Value>>>,
}

impl CadResponse {
    pub fn rows(&self) -> &[Vec<Value>] {
        self.data.as_deref().unwrap_or_default()
    }

    pub fn layout(&self) -> FieldLayout<'_> {
        FieldLayout::new(&self.fields)
    }

    pub fn records(&self) -> Result<Vec<CadRecord>, RecordError> {
        let layout = self.layout();
        self.rows()
            .iter()
            .enumerate()
            .map(|(row, cells)| CadRecord::from_row(&layout, row, cells))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub moreinfo: Option<String>,
}

/// The API has shipped `count` both as a number and as a numeric string.
fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCount {
        Number(u64),
        Text(String),
    }

    match RawCount::deserialize(deserializer)? {
        RawCount::Number(value) => Ok(value),
        RawCount::Text(value) => value
            .trim()
            .parse()
            .map_err(|err| serde::de::Error::custom(format!("invalid count `{value}`: {err}"))),
    }
}

// ─── Record layout ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadField {
    Des,
    OrbitId,
    Jd,
    Cd,
    Dist,
    DistMin,
    DistMax,
    VRel,
    VInf,
    TSigmaF,
    H,
    Diameter,
    DiameterSigma,
    Fullname,
}

impl CadField {
    pub fn name(self) -> &'static str {
        match self {
            CadField::Des => "des",
            CadField::OrbitId => "orbit_id",
            CadField::Jd => "jd",
            CadField::Cd => "cd",
            CadField::Dist => "dist",
            CadField::DistMin => "dist_min",
            CadField::DistMax => "dist_max",
            CadField::VRel => "v_rel",
            CadField::VInf => "v_inf",
            CadField::TSigmaF => "t_sigma_f",
            CadField::H => "h",
            CadField::Diameter => "diameter",
            CadField::DiameterSigma => "diameter_sigma",
            CadField::Fullname => "fullname",
        }
    }

    /// Column position in the default output (no optional columns requested).
    fn default_index(self) -> Option<usize> {
        match self {
            CadField::Des => Some(0),
            CadField::OrbitId => Some(1),
            CadField::Jd => Some(2),
            CadField::Cd => Some(3),
            CadField::Dist => Some(4),
            CadField::DistMin => Some(5),
            CadField::DistMax => Some(6),
            CadField::VRel => Some(7),
            CadField::VInf => Some(8),
            CadField::TSigmaF => Some(9),
            CadField::H => Some(10),
            CadField::Diameter | CadField::DiameterSigma | CadField::Fullname => None,
        }
    }
}

/// Maps field names from the `fields` header onto row positions.
#[derive(Debug, Clone, Copy)]
pub struct FieldLayout<'a> {
    fields: &'a [String],
}

impl<'a> FieldLayout<'a> {
    pub fn new(fields: &'a [String]) -> Self {
        Self { fields }
    }

    pub fn index_of(&self, field: CadField) -> Option<usize> {
        if self.fields.is_empty() {
            return field.default_index();
        }
        self.fields.iter().position(|name| name == field.name())
    }

    pub fn cell<'r>(&self, row: &'r [Value], field: CadField) -> Option<&'r Value> {
        self.index_of(field).and_then(|idx| row.get(idx))
    }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq)]
#[error("row {row}: field `{field}` {message}")]
pub struct RecordError {
    pub row: usize,
    pub field: &'static str,
    pub message: String,
}

/// One close-approach row with typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CadRecord {
    pub des: String,
    pub orbit_id: String,
    pub jd: f64,
    pub cd: NaiveDateTime,
    pub dist: f64,
    pub dist_min: f64,
    pub dist_max: f64,
    pub v_rel: f64,
    pub v_inf: Option<f64>,
    pub t_sigma_f: String,
    pub h: Option<f64>,
    pub diameter: Option<f64>,
    pub diameter_sigma: Option<f64>,
    pub fullname: Option<String>,
}

impl CadRecord {
    pub fn from_row(layout: &FieldLayout<'_>, row: usize, cells: &[Value]) -> Result<Self, RecordError> {
        let reader = RowReader { layout, row, cells };

        Ok(Self {
            des: reader.required_text(CadField::Des)?,
            orbit_id: reader.required_text(CadField::OrbitId)?,
            jd: reader.required_number(CadField::Jd)?,
            cd: reader.close_approach_date()?,
            dist: reader.required_number(CadField::Dist)?,
            dist_min: reader.required_number(CadField::DistMin)?,
            dist_max: reader.required_number(CadField::DistMax)?,
            v_rel: reader.required_number(CadField::VRel)?,
            v_inf: reader.optional_number(CadField::VInf)?,
            t_sigma_f: reader.required_text(CadField::TSigmaF)?,
            h: reader.optional_number(CadField::H)?,
            diameter: reader.optional_number(CadField::Diameter)?,
            diameter_sigma: reader.optional_number(CadField::DiameterSigma)?,
            fullname: reader
                .optional_text(CadField::Fullname)?
                .map(|name| name.trim().to_string()),
        })
    }
}

struct RowReader<'a, 'l> {
    layout: &'a FieldLayout<'l>,
    row: usize,
    cells: &'a [Value],
}

impl RowReader<'_, '_> {
    fn error(&self, field: CadField, message: impl Into<String>) -> RecordError {
        RecordError {
            row: self.row,
            field: field.name(),
            message: message.into(),
        }
    }

    fn optional_text(&self, field: CadField) -> Result<Option<String>, RecordError> {
        match self.layout.cell(self.cells, field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(other) => Err(self.error(field, format!("should be a string, got {other}"))),
        }
    }

    fn required_text(&self, field: CadField) -> Result<String, RecordError> {
        match self.optional_text(field)? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            Some(_) => Err(self.error(field, "is empty")),
            None => Err(self.error(field, "is missing")),
        }
    }

    fn optional_number(&self, field: CadField) -> Result<Option<f64>, RecordError> {
        match self.layout.cell(self.cells, field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => parse_number(value)
                .map(Some)
                .ok_or_else(|| self.error(field, format!("is not a number: {value}"))),
        }
    }

    fn required_number(&self, field: CadField) -> Result<f64, RecordError> {
        self.optional_number(field)?
            .ok_or_else(|| self.error(field, "is missing"))
    }

    fn close_approach_date(&self) -> Result<NaiveDateTime, RecordError> {
        let raw = self.required_text(CadField::Cd)?;
        parse_close_approach_date(&raw)
            .ok_or_else(|| self.error(CadField::Cd, format!("has invalid format: {raw}")))
    }
}

pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub fn parse_close_approach_date(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), CLOSE_APPROACH_DATE_FORMAT).ok()
}

pub fn parse_query_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), QUERY_DATE_FORMAT).ok()
}
