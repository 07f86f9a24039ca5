// src/features/derivation.rs
use log::debug;

use crate::error::{AdvisorError, AdvisorResult};
use crate::features::profile::{CityTier, Occupation, RawProfile};

/// Every feature name the deriver knows how to produce, numerical block
/// first. A feature schema may only reference names from this list.
pub const FEATURE_CATALOG: [&str; 49] = [
    // --- Raw numerical inputs ---
    "Income",
    "Age",
    "Dependents",
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
    "Desired_Savings_Percentage",
    "Disposable_Income",
    "Potential_Savings_Groceries",
    "Potential_Savings_Transport",
    "Potential_Savings_Eating_Out",
    "Potential_Savings_Entertainment",
    "Potential_Savings_Utilities",
    "Potential_Savings_Healthcare",
    "Potential_Savings_Education",
    "Potential_Savings_Miscellaneous",
    // --- Engineered numerical features ---
    "Savings_Rate",
    "Actual_Savings_Potential",
    "Essential_Expenses",
    "Essential_Expense_Ratio",
    "Non_Essential_Income",
    "Expense_Efficiency",
    "Total_Expenses",
    "Debt_to_Income_Ratio",
    "Financial_Stress_Score",
    // --- One-hot categorical features ---
    "Occupation_Retired",
    "Occupation_Self_Employed",
    "Occupation_Student",
    "City_Tier_Tier_2",
    "City_Tier_Tier_3",
    "Age_Group_Young_Adult",
    "Age_Group_Mid_Career",
    "Age_Group_Pre_Retirement",
    "Age_Group_Senior",
    "Income_Bracket_Low_Income",
    "Income_Bracket_Lower_Mid",
    "Income_Bracket_Middle",
    "Income_Bracket_Upper_Mid",
    "Savings_Difficulty_Moderate",
    "Savings_Difficulty_Very_Hard",
    "Savings_Difficulty_nan",
];

pub fn is_known_feature(name: &str) -> bool {
    FEATURE_CATALOG.contains(&name)
}

/// Named feature values for one profile, in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatures {
    values: Vec<(&'static str, f64)>,
}

impl DerivedFeatures {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(feature, _)| *feature == name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

fn ratio_over_income(numerator: f64, income: f64, feature: &'static str) -> AdvisorResult<f64> {
    if income == 0.0 {
        return Err(AdvisorError::DivisionByZero { feature });
    }
    Ok(numerator / income)
}

/// Computes every catalog feature for `profile`.
///
/// Fails only when a ratio would divide by a zero income.
pub fn derive_features(profile: &RawProfile) -> AdvisorResult<DerivedFeatures> {
    let income = profile.income;
    let age = profile.age;
    let disposable_income = profile.disposable_income;

    let total_expenses = profile.expenses.total();
    let essential_expenses = profile.expenses.essential();
    let actual_savings_potential = profile.potential_savings.total();

    let essential_expense_ratio =
        ratio_over_income(essential_expenses, income, "Essential_Expense_Ratio")?;
    let expense_efficiency = if disposable_income > 0.0 {
        actual_savings_potential / disposable_income
    } else {
        0.0
    };
    let debt_to_income_ratio = ratio_over_income(
        profile.expenses.loan_repayment,
        income,
        "Debt_to_Income_Ratio",
    )?;
    let financial_stress_score =
        1.0 - ratio_over_income(disposable_income, income, "Financial_Stress_Score")?;

    let mut values: Vec<(&'static str, f64)> = Vec::with_capacity(FEATURE_CATALOG.len());
    values.push(("Income", income));
    values.push(("Age", age as f64));
    values.push(("Dependents", profile.dependents as f64));
    values.extend(profile.expenses.entries());
    values.push((
        "Desired_Savings_Percentage",
        profile.desired_savings_percentage,
    ));
    values.push(("Disposable_Income", disposable_income));
    values.extend(profile.potential_savings.entries());

    values.extend([
        ("Savings_Rate", profile.desired_savings_percentage / 100.0),
        ("Actual_Savings_Potential", actual_savings_potential),
        ("Essential_Expenses", essential_expenses),
        ("Essential_Expense_Ratio", essential_expense_ratio),
        ("Non_Essential_Income", income - essential_expenses),
        ("Expense_Efficiency", expense_efficiency),
        ("Total_Expenses", total_expenses),
        ("Debt_to_Income_Ratio", debt_to_income_ratio),
        ("Financial_Stress_Score", financial_stress_score),
    ]);

    values.extend([
        (
            "Occupation_Retired",
            indicator(profile.occupation == Occupation::Retired),
        ),
        (
            "Occupation_Self_Employed",
            indicator(profile.occupation == Occupation::SelfEmployed),
        ),
        (
            "Occupation_Student",
            indicator(profile.occupation == Occupation::Student),
        ),
        ("City_Tier_Tier_2", indicator(profile.city_tier == CityTier::Tier2)),
        ("City_Tier_Tier_3", indicator(profile.city_tier == CityTier::Tier3)),
        ("Age_Group_Young_Adult", indicator(age < 25)),
        ("Age_Group_Mid_Career", indicator((25..40).contains(&age))),
        ("Age_Group_Pre_Retirement", indicator((40..60).contains(&age))),
        ("Age_Group_Senior", indicator(age >= 60)),
        ("Income_Bracket_Low_Income", indicator(income < 20000.0)),
        (
            "Income_Bracket_Lower_Mid",
            indicator((20000.0..40000.0).contains(&income)),
        ),
        (
            "Income_Bracket_Middle",
            indicator((40000.0..70000.0).contains(&income)),
        ),
        ("Income_Bracket_Upper_Mid", indicator(income >= 70000.0)),
        // Savings difficulty is not derived from the profile yet; the models
        // were trained with these fixed values.
        ("Savings_Difficulty_Moderate", 0.0),
        ("Savings_Difficulty_Very_Hard", 0.0),
        ("Savings_Difficulty_nan", 1.0),
    ]);

    debug!(
        "Derived {} features (income={}, age={}, essential_expenses={:.2})",
        values.len(),
        income,
        age,
        essential_expenses
    );

    Ok(DerivedFeatures { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::profile::tests::sample_profile_json;
    use serde_json::json;

    fn derive_json(body: &serde_json::Value) -> DerivedFeatures {
        derive_features(&RawProfile::from_json(body).unwrap()).unwrap()
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("feature present");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_derived_names_match_catalog() {
        let derived = derive_json(&sample_profile_json());
        let names: Vec<&str> = derived.iter().map(|(name, _)| name).collect();
        assert_eq!(names, FEATURE_CATALOG.to_vec());
    }

    #[test]
    fn test_worked_example() {
        let derived = derive_json(&sample_profile_json());
        assert_close(derived.get("Essential_Expenses"), 6000.0);
        assert_close(derived.get("Total_Expenses"), 11000.0);
        assert_close(derived.get("Actual_Savings_Potential"), 800.0);
        assert_close(derived.get("Savings_Rate"), 0.2);
        assert_close(derived.get("Essential_Expense_Ratio"), 0.12);
        assert_close(derived.get("Non_Essential_Income"), 44000.0);
        assert_close(derived.get("Expense_Efficiency"), 0.16);
        assert_close(derived.get("Debt_to_Income_Ratio"), 0.02);
        assert_close(derived.get("Financial_Stress_Score"), 0.9);

        assert_close(derived.get("Age_Group_Mid_Career"), 1.0);
        assert_close(derived.get("Age_Group_Young_Adult"), 0.0);
        assert_close(derived.get("Age_Group_Pre_Retirement"), 0.0);
        assert_close(derived.get("Age_Group_Senior"), 0.0);
        assert_close(derived.get("Income_Bracket_Middle"), 1.0);
        assert_close(derived.get("Income_Bracket_Low_Income"), 0.0);
        assert_close(derived.get("Income_Bracket_Lower_Mid"), 0.0);
        assert_close(derived.get("Income_Bracket_Upper_Mid"), 0.0);

        // "Salaried" and "Tier_1" are reference categories.
        assert_close(derived.get("Occupation_Retired"), 0.0);
        assert_close(derived.get("Occupation_Self_Employed"), 0.0);
        assert_close(derived.get("Occupation_Student"), 0.0);
        assert_close(derived.get("City_Tier_Tier_2"), 0.0);
        assert_close(derived.get("City_Tier_Tier_3"), 0.0);
    }

    #[test]
    fn test_band_indicators_are_exclusive_and_exhaustive() {
        let ages = [0, 18, 24, 25, 39, 40, 59, 60, 95];
        let incomes = [1.0, 19999.99, 20000.0, 39999.0, 40000.0, 69999.5, 70000.0, 1e7];
        for age in ages {
            for income in incomes {
                let mut body = sample_profile_json();
                body["Age"] = json!(age);
                body["Income"] = json!(income);
                let derived = derive_json(&body);

                let age_hot: f64 = [
                    "Age_Group_Young_Adult",
                    "Age_Group_Mid_Career",
                    "Age_Group_Pre_Retirement",
                    "Age_Group_Senior",
                ]
                .iter()
                .map(|name| derived.get(name).unwrap())
                .sum();
                let income_hot: f64 = [
                    "Income_Bracket_Low_Income",
                    "Income_Bracket_Lower_Mid",
                    "Income_Bracket_Middle",
                    "Income_Bracket_Upper_Mid",
                ]
                .iter()
                .map(|name| derived.get(name).unwrap())
                .sum();
                assert_eq!(age_hot, 1.0, "age {}", age);
                assert_eq!(income_hot, 1.0, "income {}", income);
            }
        }
    }

    #[test]
    fn test_band_boundaries() {
        let mut body = sample_profile_json();
        body["Age"] = json!(25);
        body["Income"] = json!(70000);
        let derived = derive_json(&body);
        assert_eq!(derived.get("Age_Group_Mid_Career"), Some(1.0));
        assert_eq!(derived.get("Income_Bracket_Upper_Mid"), Some(1.0));

        body["Age"] = json!(60);
        body["Income"] = json!(19999);
        let derived = derive_json(&body);
        assert_eq!(derived.get("Age_Group_Senior"), Some(1.0));
        assert_eq!(derived.get("Income_Bracket_Low_Income"), Some(1.0));
    }

    #[test]
    fn test_savings_difficulty_is_constant() {
        for (occupation, income, disposable) in [
            ("Student", 5000, -200),
            ("Retired", 90000, 40000),
            ("Self_Employed", 30000, 0),
        ] {
            let mut body = sample_profile_json();
            body["Occupation"] = json!(occupation);
            body["Income"] = json!(income);
            body["Disposable_Income"] = json!(disposable);
            let derived = derive_json(&body);
            assert_eq!(derived.get("Savings_Difficulty_Moderate"), Some(0.0));
            assert_eq!(derived.get("Savings_Difficulty_Very_Hard"), Some(0.0));
            assert_eq!(derived.get("Savings_Difficulty_nan"), Some(1.0));
        }
    }

    #[test]
    fn test_one_hot_occupation_and_city() {
        let mut body = sample_profile_json();
        body["Occupation"] = json!("Self_Employed");
        body["City_Tier"] = json!("Tier_3");
        let derived = derive_json(&body);
        assert_eq!(derived.get("Occupation_Self_Employed"), Some(1.0));
        assert_eq!(derived.get("Occupation_Retired"), Some(0.0));
        assert_eq!(derived.get("City_Tier_Tier_3"), Some(1.0));
        assert_eq!(derived.get("City_Tier_Tier_2"), Some(0.0));
    }

    #[test]
    fn test_expense_efficiency_guard() {
        let mut body = sample_profile_json();
        body["Disposable_Income"] = json!(0);
        let derived = derive_json(&body);
        assert_eq!(derived.get("Expense_Efficiency"), Some(0.0));
        assert_eq!(derived.get("Financial_Stress_Score"), Some(1.0));

        body["Disposable_Income"] = json!(-1000);
        let derived = derive_json(&body);
        assert_eq!(derived.get("Expense_Efficiency"), Some(0.0));
    }

    #[test]
    fn test_zero_income_is_an_error() {
        // The parser rejects a zero income, so build the profile directly.
        let mut profile = RawProfile::from_json(&sample_profile_json()).unwrap();
        profile.income = 0.0;
        match derive_features(&profile).unwrap_err() {
            AdvisorError::DivisionByZero { feature } => {
                assert_eq!(feature, "Essential_Expense_Ratio")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
