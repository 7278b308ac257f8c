use chrono::{Days, NaiveDate};
use rand::Rng;

use crate::domain::{ObjectKind, QUERY_DATE_FORMAT};
use crate::error::{CadError, Result};

pub const DATE_MIN: &str = "date-min";
pub const DATE_MAX: &str = "date-max";
pub const DIST_MIN: &str = "dist-min";
pub const DIST_MAX: &str = "dist-max";
pub const H_MAX: &str = "h-max";
pub const V_INF_MAX: &str = "v-inf-max";
pub const KIND: &str = "kind";
pub const FULLNAME: &str = "fullname";
pub const DIAMETER: &str = "diameter";

/// Query-string accumulator for one close-approach request.
///
/// Setting a known parameter twice replaces the earlier value; raw parameters
/// added with [`CadQuery::param`] are kept verbatim so negative checks can send
/// whatever they like.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CadQuery {
    params: Vec<(String, String)>,
}

impl CadQuery {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.params.iter_mut().find(|(name, _)| name == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key.to_string(), value)),
        }
        self
    }

    pub fn date_range(self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.set(DATE_MIN, start).set(DATE_MAX, end)
    }

    pub fn date_min(self, start: impl Into<String>) -> Self {
        self.set(DATE_MIN, start)
    }

    pub fn date_max(self, end: impl Into<String>) -> Self {
        self.set(DATE_MAX, end)
    }

    pub fn dist_max(self, au: impl Into<String>) -> Self {
        self.set(DIST_MAX, au)
    }

    pub fn dist_min(self, au: impl Into<String>) -> Self {
        self.set(DIST_MIN, au)
    }

    pub fn dist_range(self, min: impl Into<String>, max: impl Into<String>) -> Self {
        self.set(DIST_MIN, min).set(DIST_MAX, max)
    }

    pub fn h_max(self, magnitude: impl Into<String>) -> Self {
        self.set(H_MAX, magnitude)
    }

    pub fn v_inf_max(self, km_per_s: impl Into<String>) -> Self {
        self.set(V_INF_MAX, km_per_s)
    }

    pub fn kind(self, kind: ObjectKind) -> Self {
        self.set(KIND, kind.as_str())
    }

    pub fn fullname(self) -> Self {
        self.set(FULLNAME, "true")
    }

    pub fn diameter(self) -> Self {
        self.set(DIAMETER, "true")
    }

    /// Appends a parameter as-is, including names the API does not know.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// A `span_days` window starting somewhere in the last `years_back` years.
    pub fn random_window<R: Rng + ?Sized>(
        rng: &mut R,
        today: NaiveDate,
        years_back: u32,
        span_days: u64,
    ) -> Self {
        let back = rng.random_range(0..=u64::from(years_back) * 365);
        let start = today.checked_sub_days(Days::new(back)).unwrap_or(today);
        let end = start.checked_add_days(Days::new(span_days)).unwrap_or(start);
        Self::new().date_range(
            start.format(QUERY_DATE_FORMAT).to_string(),
            end.format(QUERY_DATE_FORMAT).to_string(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.params {
            if key.trim().is_empty() {
                return Err(CadError::InvalidQuery(format!(
                    "Key cannot be empty: `={value}`"
                )));
            }
        }
        Ok(())
    }
}
