// src/chat/prompt.rs
use serde_json::Value as JsonValue;

use crate::features::profile::{EXPENSE_FIELDS, POTENTIAL_SAVINGS_FIELDS};
use crate::history::PredictionRecord;

const NOT_AVAILABLE: &str = "N/A";

/// Renders the advisor prompt for the latest stored prediction and the
/// user's question. Every profile field and every model output appears by
/// name; anything missing from the record reads "N/A".
pub fn render_prompt(record: &PredictionRecord, user_message: &str) -> String {
    let input = &record.input;
    let output = &record.output;
    let mut prompt = String::new();

    prompt.push_str("\nYou are a Personal Finance Advisor chatbot.\n");
    prompt.push_str("The user recently submitted this financial profile:\n\n");

    prompt.push_str(&format!("Income: ₹{}\n", input_field(input, "Income")));
    prompt.push_str(&format!("Age: {}\n", input_field(input, "Age")));
    prompt.push_str(&format!("Occupation: {}\n", input_field(input, "Occupation")));
    prompt.push_str(&format!("City Tier: {}\n", input_field(input, "City_Tier")));
    prompt.push_str(&format!("Dependents: {}\n", input_field(input, "Dependents")));

    prompt.push_str("\nMonthly Expenses:\n");
    for name in EXPENSE_FIELDS {
        prompt.push_str(&format!("{}: ₹{}\n", label(name), input_field(input, name)));
    }

    prompt.push_str("\nSavings Goals:\n");
    prompt.push_str(&format!(
        "Desired Savings %: {}%\n",
        input_field(input, "Desired_Savings_Percentage")
    ));
    prompt.push_str(&format!(
        "Disposable Income: ₹{}\n",
        input_field(input, "Disposable_Income")
    ));
    prompt.push_str("Potential Savings Breakdown:\n");
    for name in POTENTIAL_SAVINGS_FIELDS {
        let category = name.trim_start_matches("Potential_Savings_");
        prompt.push_str(&format!(
            " - {}: ₹{}\n",
            label(category),
            input_field(input, name)
        ));
    }

    let savings = &output["savings_model"];
    let amount = &output["amount_model"];
    let multi = &output["multi_task_model"];

    prompt.push_str("\nPrediction Results:\n");
    prompt.push_str(&format!(
        "Can Achieve Savings: {}\n",
        yes_no(&savings["can_achieve_savings"], "✅ Yes", "❌ No")
    ));
    prompt.push_str(&format!("Confidence: {}\n", percent(&savings["confidence"])));
    prompt.push_str(&format!(
        "Recommended Monthly Savings: {}\n",
        rupees(&amount["recommended_savings"])
    ));
    prompt.push_str(&format!(
        "Multi-Task Can Achieve Savings: {}\n",
        yes_no(&multi["can_achieve_savings"], "✅ Yes", "❌ No")
    ));
    prompt.push_str(&format!(
        "Multi-Task Savings Confidence: {}\n",
        percent(&multi["savings_confidence"])
    ));
    prompt.push_str(&format!(
        "Multi-Task Recommended Savings Amount: {}\n",
        rupees(&multi["recommended_savings_amount"])
    ));
    prompt.push_str(&format!(
        "Financial Risk: {}\n",
        yes_no(&multi["financial_risk"], "⚠️ Yes", "✅ No")
    ));
    prompt.push_str(&format!("Risk Score: {}\n", percent(&multi["risk_score"])));

    prompt.push_str("\nNow the user is asking:\n");
    prompt.push_str(&format!("\"{}\"\n\n", user_message));
    prompt.push_str(
        "Always keep your replies within 100 words and Give a helpful, friendly, and personalized answer based on their data and predictions.\n",
    );
    prompt
}

/// `Eating_Out` -> `Eating Out`
fn label(field: &str) -> String {
    field.replace('_', " ")
}

fn input_field(input: &JsonValue, name: &str) -> String {
    match input.get(name) {
        None | Some(JsonValue::Null) => NOT_AVAILABLE.to_string(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn yes_no(value: &JsonValue, yes: &str, no: &str) -> String {
    match value.as_bool() {
        Some(true) => yes.to_string(),
        Some(false) => no.to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn percent(value: &JsonValue) -> String {
    match value.as_f64() {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn rupees(value: &JsonValue) -> String {
    match value.as_f64() {
        Some(v) => format!("₹{}", group_thousands(v)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Two decimals with comma-separated thousands: `1234567.891` -> `1,234,567.89`.
pub(crate) fn group_thousands(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::profile::tests::sample_profile_json;
    use serde_json::json;

    fn sample_record() -> PredictionRecord {
        PredictionRecord::new(
            sample_profile_json(),
            json!({
                "savings_model": {"can_achieve_savings": true, "confidence": 0.8734},
                "amount_model": {"recommended_savings": 12345.678},
                "multi_task_model": {
                    "can_achieve_savings": false,
                    "savings_confidence": 0.42,
                    "recommended_savings_amount": 9000.0,
                    "financial_risk": true,
                    "risk_score": 0.66
                }
            }),
        )
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0.0), "0.00");
        assert_eq!(group_thousands(999.999), "1,000.00");
        assert_eq!(group_thousands(12345.678), "12,345.68");
        assert_eq!(group_thousands(1234567.0), "1,234,567.00");
        assert_eq!(group_thousands(-4200.5), "-4,200.50");
        assert_eq!(group_thousands(-0.001), "0.00");
    }

    #[test]
    fn test_prompt_embeds_profile_and_predictions() {
        let prompt = render_prompt(&sample_record(), "Can I afford a car?");
        assert!(prompt.contains("You are a Personal Finance Advisor chatbot."));
        assert!(prompt.contains("Income: ₹50000\n"));
        assert!(prompt.contains("Occupation: Salaried\n"));
        assert!(prompt.contains("City Tier: Tier_1\n"));
        assert!(prompt.contains("Loan Repayment: ₹1000\n"));
        assert!(prompt.contains("Entertainment: ₹1000\n"));
        assert!(prompt.contains(" - Eating Out: ₹100\n"));
        assert!(prompt.contains("Desired Savings %: 20%\n"));
        assert!(prompt.contains("Can Achieve Savings: ✅ Yes\n"));
        assert!(prompt.contains("Confidence: 87.34%\n"));
        assert!(prompt.contains("Recommended Monthly Savings: ₹12,345.68\n"));
        assert!(prompt.contains("Multi-Task Can Achieve Savings: ❌ No\n"));
        assert!(prompt.contains("Financial Risk: ⚠️ Yes\n"));
        assert!(prompt.contains("Risk Score: 66.00%\n"));
        assert!(prompt.contains("\"Can I afford a car?\""));
    }

    #[test]
    fn test_every_input_field_is_present() {
        let prompt = render_prompt(&sample_record(), "hi");
        for name in EXPENSE_FIELDS {
            assert!(prompt.contains(&format!("{}: ₹", label(name))), "{}", name);
        }
        assert_eq!(prompt.matches(" - ").count(), POTENTIAL_SAVINGS_FIELDS.len());
    }

    #[test]
    fn test_missing_fields_fall_back_to_na() {
        let record = PredictionRecord::new(json!({"Income": 1000}), json!({}));
        let prompt = render_prompt(&record, "hello");
        assert!(prompt.contains("Income: ₹1000\n"));
        assert!(prompt.contains("Age: N/A\n"));
        assert!(prompt.contains("Rent: ₹N/A\n"));
        assert!(prompt.contains("Can Achieve Savings: N/A\n"));
        assert!(prompt.contains("Confidence: N/A\n"));
        assert!(prompt.contains("Recommended Monthly Savings: N/A\n"));
        assert!(prompt.contains("Financial Risk: N/A\n"));
    }
}
