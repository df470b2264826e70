use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest accepted rating on the 1-10 scale.
pub const MIN_RATING: i64 = 1;
/// Highest accepted rating on the 1-10 scale.
pub const MAX_RATING: i64 = 10;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Stable identity of a household member who rates states.
    RaterId
);
string_id!(
    /// Identifier wrapper for weighted criteria.
    CriterionId
);
string_id!(
    /// Identifier wrapper for stored ratings.
    RatingId
);

/// Two-letter postal code, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateCode(String);

impl StateCode {
    /// Trims and upper-cases the raw code, rejecting anything that is not two ASCII letters.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidStateCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub(crate) fn from_static(code: &'static str) -> Self {
        Self(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A household member allowed to rate states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rater {
    pub id: RaterId,
    pub username: String,
    pub label: String,
}

/// Static reference entry for one of the 50 states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsState {
    pub code: StateCode,
    pub name: &'static str,
    pub abbreviation: &'static str,
}

/// Weighted dimension that states are rated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    pub name: String,
    pub weight: f64,
    pub color: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<RaterId>,
}

/// Input for a new criterion. A missing weight defaults to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionDraft {
    pub name: String,
    #[serde(default)]
    pub weight: Option<f64>,
    pub color: String,
    #[serde(default)]
    pub created_by: Option<RaterId>,
}

impl CriterionDraft {
    pub fn new(name: impl Into<String>, weight: f64, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: Some(weight),
            color: color.into(),
            created_by: None,
        }
    }

    /// Checks the draft and returns the name, weight and color to store.
    pub fn validate(&self) -> Result<(String, f64, String), ValidationError> {
        let name = required("name", &self.name)?;
        let weight = validate_weight(self.weight.unwrap_or(1.0))?;
        let color = required("color", &self.color)?;
        Ok((name, weight, color))
    }
}

/// Partial update for a criterion; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl CriterionUpdate {
    pub fn deactivate() -> Self {
        Self {
            active: Some(false),
            ..Self::default()
        }
    }

    /// Validates every present field so the update either applies fully or not at all.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            required("name", name)?;
        }
        if let Some(weight) = self.weight {
            validate_weight(weight)?;
        }
        if let Some(color) = &self.color {
            required("color", color)?;
        }
        Ok(())
    }

    pub fn apply(&self, criterion: &mut Criterion) {
        if let Some(name) = &self.name {
            criterion.name = name.trim().to_string();
        }
        if let Some(weight) = self.weight {
            criterion.weight = weight;
        }
        if let Some(color) = &self.color {
            criterion.color = color.trim().to_string();
        }
        if let Some(active) = self.active {
            criterion.active = active;
        }
    }
}

/// Integer rating constrained to 1..=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct RatingValue(u8);

impl RatingValue {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::RatingOutOfRange { value })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl TryFrom<i64> for RatingValue {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RatingValue> for i64 {
    fn from(value: RatingValue) -> Self {
        i64::from(value.0)
    }
}

/// Composite key enforcing one rating per rater, state and criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RatingKey {
    pub rater_id: RaterId,
    pub state_code: StateCode,
    pub criterion_id: CriterionId,
}

/// A stored rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub rater_id: RaterId,
    pub state_code: StateCode,
    pub criterion_id: CriterionId,
    pub value: RatingValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Rating {
    pub fn key(&self) -> RatingKey {
        RatingKey {
            rater_id: self.rater_id.clone(),
            state_code: self.state_code.clone(),
            criterion_id: self.criterion_id.clone(),
        }
    }
}

/// Raw rating write as received from callers, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSubmission {
    pub rater_id: RaterId,
    pub state_code: String,
    pub criterion_id: CriterionId,
    pub value: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of an upsert, telling callers whether a new row was created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertOutcome {
    pub rating: Rating,
    pub created: bool,
}

/// Qualitative label for a score on the 1-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingBand {
    NotRated,
    Poor,
    Fair,
    Good,
    Great,
    Excellent,
}

impl RatingBand {
    /// Bands follow the rounded star value: 1-2, 3-4, 5-6, 7-8, 9-10.
    pub fn from_stars(stars: u8) -> Self {
        match stars {
            0 => Self::NotRated,
            1..=2 => Self::Poor,
            3..=4 => Self::Fair,
            5..=6 => Self::Good,
            7..=8 => Self::Great,
            _ => Self::Excellent,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotRated => "Not Rated",
            Self::Poor => "Poor",
            Self::Fair => "Fair",
            Self::Good => "Good",
            Self::Great => "Great",
            Self::Excellent => "Excellent",
        }
    }
}

/// Input that failed validation before any mutation happened.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("rating {value} is outside the 1-10 scale")]
    RatingOutOfRange { value: i64 },
    #[error("criterion weight must be a positive number, got {weight}")]
    NonPositiveWeight { weight: f64 },
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("'{0}' is not a two-letter state code")]
    InvalidStateCode(String),
    #[error("criterion {0} is inactive")]
    InactiveCriterion(CriterionId),
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyField { field })
    } else {
        Ok(trimmed.to_string())
    }
}

fn validate_weight(weight: f64) -> Result<f64, ValidationError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(weight)
    } else {
        Err(ValidationError::NonPositiveWeight { weight })
    }
}

/// Blank notes are stored as absent.
pub(crate) fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_value_enforces_scale_bounds() {
        assert!(RatingValue::new(1).is_ok());
        assert!(RatingValue::new(10).is_ok());
        assert_eq!(
            RatingValue::new(0),
            Err(ValidationError::RatingOutOfRange { value: 0 })
        );
        assert_eq!(
            RatingValue::new(11),
            Err(ValidationError::RatingOutOfRange { value: 11 })
        );
    }

    #[test]
    fn rating_value_rejects_out_of_range_json() {
        let parsed: Result<RatingValue, _> = serde_json::from_str("12");
        assert!(parsed.is_err());
        let parsed: RatingValue = serde_json::from_str("7").expect("valid rating");
        assert_eq!(parsed.get(), 7);
    }

    #[test]
    fn state_code_is_normalized() {
        assert_eq!(StateCode::parse(" ca ").expect("valid").as_str(), "CA");
        assert!(StateCode::parse("CAL").is_err());
        assert!(StateCode::parse("C1").is_err());
    }

    #[test]
    fn draft_validation_rejects_bad_weights_and_names() {
        assert!(matches!(
            CriterionDraft::new("Cost", 0.0, "#fff").validate(),
            Err(ValidationError::NonPositiveWeight { .. })
        ));
        assert!(matches!(
            CriterionDraft::new("Cost", f64::NAN, "#fff").validate(),
            Err(ValidationError::NonPositiveWeight { .. })
        ));
        assert_eq!(
            CriterionDraft::new("  ", 1.0, "#fff").validate(),
            Err(ValidationError::EmptyField { field: "name" })
        );

        let draft = CriterionDraft {
            name: " Climate ".to_string(),
            weight: None,
            color: "#DC004E".to_string(),
            created_by: None,
        };
        let (name, weight, _) = draft.validate().expect("defaults apply");
        assert_eq!(name, "Climate");
        assert_eq!(weight, 1.0);
    }

    #[test]
    fn bands_follow_star_ranges() {
        assert_eq!(RatingBand::from_stars(0), RatingBand::NotRated);
        assert_eq!(RatingBand::from_stars(2), RatingBand::Poor);
        assert_eq!(RatingBand::from_stars(6), RatingBand::Good);
        assert_eq!(RatingBand::from_stars(10).label(), "Excellent");
    }

    #[test]
    fn blank_notes_are_dropped() {
        assert_eq!(normalize_notes(Some("   ".to_string())), None);
        assert_eq!(
            normalize_notes(Some(" mild winters ".to_string())),
            Some("mild winters".to_string())
        );
    }
}
