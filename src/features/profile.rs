// src/features/profile.rs
//! Typed view over the raw financial-profile JSON object.
//!
//! Field names are the exact keys the front end submits and the exact names
//! the trained models know the raw features by.

use serde_json::{Map, Value as JsonValue};

use crate::error::{AdvisorError, AdvisorResult};

pub const EXPENSE_FIELDS: [&str; 11] = [
    "Rent",
    "Loan_Repayment",
    "Insurance",
    "Groceries",
    "Transport",
    "Eating_Out",
    "Entertainment",
    "Utilities",
    "Healthcare",
    "Education",
    "Miscellaneous",
];

pub const POTENTIAL_SAVINGS_FIELDS: [&str; 8] = [
    "Potential_Savings_Groceries",
    "Potential_Savings_Transport",
    "Potential_Savings_Eating_Out",
    "Potential_Savings_Entertainment",
    "Potential_Savings_Utilities",
    "Potential_Savings_Healthcare",
    "Potential_Savings_Education",
    "Potential_Savings_Miscellaneous",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occupation {
    Professional,
    Retired,
    SelfEmployed,
    Student,
    /// Anything else is kept verbatim and encodes as the reference category.
    Other(String),
}

impl Occupation {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Professional" => Occupation::Professional,
            "Retired" => Occupation::Retired,
            "Self_Employed" => Occupation::SelfEmployed,
            "Student" => Occupation::Student,
            other => Occupation::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Occupation::Professional => "Professional",
            Occupation::Retired => "Retired",
            Occupation::SelfEmployed => "Self_Employed",
            Occupation::Student => "Student",
            Occupation::Other(label) => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CityTier {
    Tier1,
    Tier2,
    Tier3,
    Other(String),
}

impl CityTier {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Tier_1" => CityTier::Tier1,
            "Tier_2" => CityTier::Tier2,
            "Tier_3" => CityTier::Tier3,
            other => CityTier::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CityTier::Tier1 => "Tier_1",
            CityTier::Tier2 => "Tier_2",
            CityTier::Tier3 => "Tier_3",
            CityTier::Other(label) => label,
        }
    }
}

/// Monthly expenses, in the order of [`EXPENSE_FIELDS`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expenses {
    pub rent: f64,
    pub loan_repayment: f64,
    pub insurance: f64,
    pub groceries: f64,
    pub transport: f64,
    pub eating_out: f64,
    pub entertainment: f64,
    pub utilities: f64,
    pub healthcare: f64,
    pub education: f64,
    pub miscellaneous: f64,
}

impl Expenses {
    pub fn entries(&self) -> [(&'static str, f64); 11] {
        [
            ("Rent", self.rent),
            ("Loan_Repayment", self.loan_repayment),
            ("Insurance", self.insurance),
            ("Groceries", self.groceries),
            ("Transport", self.transport),
            ("Eating_Out", self.eating_out),
            ("Entertainment", self.entertainment),
            ("Utilities", self.utilities),
            ("Healthcare", self.healthcare),
            ("Education", self.education),
            ("Miscellaneous", self.miscellaneous),
        ]
    }

    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, amount)| amount).sum()
    }

    /// Rent, loan repayment, groceries, transport, utilities and healthcare.
    pub fn essential(&self) -> f64 {
        self.rent
            + self.loan_repayment
            + self.groceries
            + self.transport
            + self.utilities
            + self.healthcare
    }
}

/// Potential monthly savings per category, in the order of [`POTENTIAL_SAVINGS_FIELDS`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialSavings {
    pub groceries: f64,
    pub transport: f64,
    pub eating_out: f64,
    pub entertainment: f64,
    pub utilities: f64,
    pub healthcare: f64,
    pub education: f64,
    pub miscellaneous: f64,
}

impl PotentialSavings {
    pub fn entries(&self) -> [(&'static str, f64); 8] {
        [
            ("Potential_Savings_Groceries", self.groceries),
            ("Potential_Savings_Transport", self.transport),
            ("Potential_Savings_Eating_Out", self.eating_out),
            ("Potential_Savings_Entertainment", self.entertainment),
            ("Potential_Savings_Utilities", self.utilities),
            ("Potential_Savings_Healthcare", self.healthcare),
            ("Potential_Savings_Education", self.education),
            ("Potential_Savings_Miscellaneous", self.miscellaneous),
        ]
    }

    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, amount)| amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawProfile {
    pub income: f64,
    pub age: i64,
    pub dependents: i64,
    pub occupation: Occupation,
    pub city_tier: CityTier,
    pub expenses: Expenses,
    pub desired_savings_percentage: f64,
    pub disposable_income: f64,
    pub potential_savings: PotentialSavings,
}

impl RawProfile {
    /// Parse a request body that has already been decoded to JSON.
    ///
    /// Fields are read in a fixed order, so the first missing or malformed
    /// field is the one reported.
    pub fn from_json(value: &JsonValue) -> AdvisorResult<Self> {
        let obj = value.as_object().ok_or(AdvisorError::NotAnObject)?;
        Self::from_map(obj)
    }

    /// Value ranges are checked right after each field is coerced: income
    /// must be positive, counts and amounts non-negative, and the desired
    /// savings percentage within 0..=100. `Disposable_Income` may be negative.
    pub fn from_map(obj: &Map<String, JsonValue>) -> AdvisorResult<Self> {
        let income = positive_number(obj, "Income")?;
        let age = non_negative_integer(obj, "Age")?;
        let dependents = non_negative_integer(obj, "Dependents")?;
        let occupation = Occupation::from_label(text(obj, "Occupation")?);
        let city_tier = CityTier::from_label(text(obj, "City_Tier")?);

        let expenses = Expenses {
            rent: non_negative_number(obj, "Rent")?,
            loan_repayment: non_negative_number(obj, "Loan_Repayment")?,
            insurance: non_negative_number(obj, "Insurance")?,
            groceries: non_negative_number(obj, "Groceries")?,
            transport: non_negative_number(obj, "Transport")?,
            eating_out: non_negative_number(obj, "Eating_Out")?,
            entertainment: non_negative_number(obj, "Entertainment")?,
            utilities: non_negative_number(obj, "Utilities")?,
            healthcare: non_negative_number(obj, "Healthcare")?,
            education: non_negative_number(obj, "Education")?,
            miscellaneous: non_negative_number(obj, "Miscellaneous")?,
        };

        let desired_savings_percentage = percentage(obj, "Desired_Savings_Percentage")?;
        let disposable_income = number(obj, "Disposable_Income")?;

        let potential_savings = PotentialSavings {
            groceries: non_negative_number(obj, "Potential_Savings_Groceries")?,
            transport: non_negative_number(obj, "Potential_Savings_Transport")?,
            eating_out: non_negative_number(obj, "Potential_Savings_Eating_Out")?,
            entertainment: non_negative_number(obj, "Potential_Savings_Entertainment")?,
            utilities: non_negative_number(obj, "Potential_Savings_Utilities")?,
            healthcare: non_negative_number(obj, "Potential_Savings_Healthcare")?,
            education: non_negative_number(obj, "Potential_Savings_Education")?,
            miscellaneous: non_negative_number(obj, "Potential_Savings_Miscellaneous")?,
        };

        Ok(Self {
            income,
            age,
            dependents,
            occupation,
            city_tier,
            expenses,
            desired_savings_percentage,
            disposable_income,
            potential_savings,
        })
    }
}

fn field<'a>(obj: &'a Map<String, JsonValue>, name: &str) -> AdvisorResult<&'a JsonValue> {
    obj.get(name)
        .ok_or_else(|| AdvisorError::MissingField(name.to_string()))
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Numbers and numeric strings are accepted; the result is always finite.
fn number(obj: &Map<String, JsonValue>, name: &str) -> AdvisorResult<f64> {
    let value = field(obj, name)?;
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        other => {
            return Err(AdvisorError::type_mismatch(
                name,
                format!("must be a number, got {}", kind(other)),
            ))
        }
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(AdvisorError::type_mismatch(
            name,
            format!("could not convert {} to a finite number", value),
        )),
    }
}

/// Integers, floats (truncated toward zero) and integer strings are accepted.
fn integer(obj: &Map<String, JsonValue>, name: &str) -> AdvisorResult<i64> {
    let value = field(obj, name)?;
    let parsed = match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        other => {
            return Err(AdvisorError::type_mismatch(
                name,
                format!("must be an integer, got {}", kind(other)),
            ))
        }
    };
    parsed.ok_or_else(|| {
        AdvisorError::type_mismatch(name, format!("could not convert {} to an integer", value))
    })
}

fn positive_number(obj: &Map<String, JsonValue>, name: &str) -> AdvisorResult<f64> {
    let value = number(obj, name)?;
    if value <= 0.0 {
        return Err(AdvisorError::out_of_range(
            name,
            format!("must be positive, got {}", value),
        ));
    }
    Ok(value)
}

fn non_negative_number(obj: &Map<String, JsonValue>, name: &str) -> AdvisorResult<f64> {
    let value = number(obj, name)?;
    if value < 0.0 {
        return Err(AdvisorError::out_of_range(
            name,
            format!("must not be negative, got {}", value),
        ));
    }
    Ok(value)
}

fn non_negative_integer(obj: &Map<String, JsonValue>, name: &str) -> AdvisorResult<i64> {
    let value = integer(obj, name)?;
    if value < 0 {
        return Err(AdvisorError::out_of_range(
            name,
            format!("must not be negative, got {}", value),
        ));
    }
    Ok(value)
}

fn percentage(obj: &Map<String, JsonValue>, name: &str) -> AdvisorResult<f64> {
    let value = number(obj, name)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(AdvisorError::out_of_range(
            name,
            format!("must be between 0 and 100, got {}", value),
        ));
    }
    Ok(value)
}

fn text<'a>(obj: &'a Map<String, JsonValue>, name: &str) -> AdvisorResult<&'a str> {
    match field(obj, name)? {
        JsonValue::String(s) => Ok(s.as_str()),
        other => Err(AdvisorError::type_mismatch(
            name,
            format!("must be a string, got {}", kind(other)),
        )),
    }
}
