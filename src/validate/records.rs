use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::domain::{
    CadField, CadRecord, CadResponse, parse_close_approach_date, parse_number,
};

use super::ValidationError;

/// Designation in parentheses, optionally preceded by number and name
/// (`(2024 AV2)`, `433 Eros (A898 PA)`), or a comet designation (`1P/Halley`).
pub const FULLNAME_PATTERN: &str = r"^(?:.+\s)?\([^()]+\)$|^\d*[PCDXI](?:-[A-Z]+)?/.+$";

static FULLNAME_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(FULLNAME_PATTERN));

fn text_cell<'a>(response: &CadResponse, row: &'a [Value], field: CadField) -> Option<&'a str> {
    response.layout().cell(row, field).and_then(Value::as_str)
}

fn close_approach_dates(response: &CadResponse) -> Result<Vec<NaiveDateTime>, ValidationError> {
    response
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let raw = text_cell(response, row, CadField::Cd).ok_or_else(|| {
                ValidationError::new("date_format", format!("row {idx}: 'cd' is missing or not a string"))
            })?;
            parse_close_approach_date(raw).ok_or_else(|| {
                ValidationError::new("date_format", format!("row {idx}: invalid 'cd' format: {raw}"))
            })
        })
        .collect()
}

/// `des` and `cd` are strings and `dist` parses as a non-negative number.
pub fn check_field_types(response: &CadResponse) -> Result<(), ValidationError> {
    let layout = response.layout();
    for (idx, row) in response.rows().iter().enumerate() {
        for field in [CadField::Des, CadField::Cd] {
            if !matches!(layout.cell(row, field), Some(Value::String(_))) {
                return Err(ValidationError::new(
                    "field_types",
                    format!("row {idx}: '{}' should be a string", field.name()),
                ));
            }
        }

        let dist = layout.cell(row, CadField::Dist).and_then(parse_number);
        match dist {
            Some(value) if value >= 0.0 => {}
            _ => {
                return Err(ValidationError::new(
                    "field_types",
                    format!("row {idx}: 'dist' should be a positive float, got {dist:?}"),
                ));
            }
        }
    }
    Ok(())
}

pub fn check_records_parse(response: &CadResponse) -> Result<Vec<CadRecord>, ValidationError> {
    response
        .records()
        .map_err(|err| ValidationError::new("records", err.to_string()))
}

pub fn check_dates_present(response: &CadResponse) -> Result<(), ValidationError> {
    for (idx, row) in response.rows().iter().enumerate() {
        let present = text_cell(response, row, CadField::Cd).is_some_and(|cd| !cd.trim().is_empty());
        if !present {
            return Err(ValidationError::new(
                "dates_present",
                format!("row {idx}: 'cd' field is empty or null"),
            ));
        }
    }
    Ok(())
}

pub fn check_date_format(response: &CadResponse) -> Result<(), ValidationError> {
    close_approach_dates(response).map(|_| ())
}

/// Rows come back in ascending close-approach order.
pub fn check_sorted_by_date(response: &CadResponse) -> Result<(), ValidationError> {
    let dates = close_approach_dates(response)?;
    match dates.windows(2).position(|pair| pair[0] > pair[1]) {
        None => Ok(()),
        Some(idx) => Err(ValidationError::new(
            "sorted_by_date",
            format!("row {} ({}) comes after row {} ({})", idx, dates[idx], idx + 1, dates[idx + 1]),
        )),
    }
}

/// Every `cd` falls on or between `start` and `end` (whole days, inclusive).
pub fn check_dates_within(response: &CadResponse, start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    let lower = start.and_time(NaiveTime::MIN);
    let upper = end.and_hms_opt(23, 59, 59).unwrap_or(end.and_time(NaiveTime::MIN));

    for (idx, cd) in close_approach_dates(response)?.into_iter().enumerate() {
        if cd < lower || cd > upper {
            return Err(ValidationError::new(
                "dates_within",
                format!("row {idx}: 'cd' out of range: {cd} not in {start}..={end}"),
            ));
        }
    }
    Ok(())
}

pub fn check_unique_dates(response: &CadResponse) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for (idx, row) in response.rows().iter().enumerate() {
        if let Some(cd) = text_cell(response, row, CadField::Cd) {
            if !seen.insert(cd) {
                return Err(ValidationError::new(
                    "unique_dates",
                    format!("row {idx}: duplicate 'cd' value {cd}"),
                ));
            }
        }
    }
    Ok(())
}

fn check_numeric_bounds(
    response: &CadResponse,
    check: &'static str,
    field: CadField,
    min: Option<f64>,
    max: Option<f64>,
    required: bool,
) -> Result<(), ValidationError> {
    let layout = response.layout();
    for (idx, row) in response.rows().iter().enumerate() {
        let value = match layout.cell(row, field) {
            None | Some(Value::Null) if !required => continue,
            cell => cell.and_then(parse_number).ok_or_else(|| {
                ValidationError::new(
                    check,
                    format!("row {idx}: invalid '{}' value: {cell:?}", field.name()),
                )
            })?,
        };

        if min.is_some_and(|min| value < min) || max.is_some_and(|max| value > max) {
            return Err(ValidationError::new(
                check,
                format!(
                    "row {idx}: '{}' = {value} outside [{}, {}]",
                    field.name(),
                    min.map_or("-inf".to_string(), |v| v.to_string()),
                    max.map_or("+inf".to_string(), |v| v.to_string()),
                ),
            ));
        }
    }
    Ok(())
}

/// Nominal approach distance (au) within the requested bounds.
pub fn check_distance_bounds(response: &CadResponse, min: Option<f64>, max: Option<f64>) -> Result<(), ValidationError> {
    check_numeric_bounds(response, "distance_bounds", CadField::Dist, min, max, true)
}

/// `v-inf-max` filters on `v_inf`; rows without `v_inf` are skipped.
pub fn check_velocity_max(response: &CadResponse, max: f64) -> Result<(), ValidationError> {
    check_numeric_bounds(response, "velocity_max", CadField::VInf, None, Some(max), false)
}

/// `h-max` filters on `h`; rows without `h` are skipped.
pub fn check_magnitude_max(response: &CadResponse, max: f64) -> Result<(), ValidationError> {
    check_numeric_bounds(response, "magnitude_max", CadField::H, None, Some(max), false)
}

pub fn check_fullname_format(response: &CadResponse) -> Result<(), ValidationError> {
    let regex = FULLNAME_RE
        .as_ref()
        .map_err(|err| ValidationError::new("fullname_format", err.to_string()))?;
    let layout = response.layout();
    if layout.index_of(CadField::Fullname).is_none() {
        return Err(ValidationError::new("fullname_format", "'fullname' column not present"));
    }
    if response.rows().is_empty() {
        return Err(ValidationError::new("fullname_format", "no rows to inspect"));
    }

    for (idx, row) in response.rows().iter().enumerate() {
        let name = text_cell(response, row, CadField::Fullname).map(str::trim).unwrap_or_default();
        if !regex.is_match(name) {
            return Err(ValidationError::new(
                "fullname_format",
                format!("row {idx}: unexpected fullname format: '{name}'"),
            ));
        }
    }
    Ok(())
}

/// The diameter column is present in every row; its value may be null.
pub fn check_diameter_column(response: &CadResponse) -> Result<(), ValidationError> {
    let index = response
        .layout()
        .index_of(CadField::Diameter)
        .ok_or_else(|| ValidationError::new("diameter_column", "'diameter' not listed in fields"))?;
    if response.rows().is_empty() {
        return Err(ValidationError::new("diameter_column", "no rows to inspect"));
    }

    for (idx, row) in response.rows().iter().enumerate() {
        if row.len() <= index {
            return Err(ValidationError::new(
                "diameter_column",
                format!("row {idx}: {} cells, diameter expected at {index}", row.len()),
            ));
        }
    }
    Ok(())
}
