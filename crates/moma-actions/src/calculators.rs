// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Healthcare cost calculators.
//!
//! Each calculator takes the event's name→value map and returns a JSON body.
//! Failures become `{"success": false, "error": ...}` rather than errors.

use std::collections::HashMap;

use serde_json::{Value, json};

/// Coinsurance applied when the caller gives none.
pub const DEFAULT_COINSURANCE_PERCENT: f64 = 20.0;

type Params = HashMap<String, Value>;

fn failure(error: impl Into<String>) -> Value {
    json!({ "success": false, "error": error.into() })
}

/// Reads a numeric parameter. Strings are parsed, absent keys use `default`.
fn number(params: &Params, name: &str, default: f64) -> Result<f64, String> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("{name} is not a finite number")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("could not convert {name} to a number: '{s}'")),
        Some(other) => Err(format!("{name} must be a number, got {other}")),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Renders a percentage as a float: `20.0`, `12.5`.
fn percent(p: f64) -> String {
    if p.fract() == 0.0 && p.abs() < 1e16 {
        format!("{p:.1}")
    } else {
        format!("{p}")
    }
}

/// `/calculateOutOfPocketCost`
pub fn out_of_pocket_cost(params: &Params) -> Value {
    let inputs = (|| {
        Ok::<_, String>((
            number(params, "procedure_cost", 0.0)?,
            number(params, "deductible", 0.0)?,
            number(params, "deductible_paid", 0.0)?,
            number(params, "coinsurance_percent", DEFAULT_COINSURANCE_PERCENT)?,
        ))
    })();
    let (procedure_cost, deductible, deductible_paid, coinsurance_percent) = match inputs {
        Ok(v) => v,
        Err(e) => return failure(e),
    };

    let remaining = (deductible - deductible_paid).max(0.0);

    let (out_of_pocket, deductible_portion, coinsurance_portion, explanation) =
        if procedure_cost <= remaining {
            (
                procedure_cost,
                procedure_cost,
                0.0,
                format!(
                    "You will pay the full ${procedure_cost:.2} which goes toward your remaining ${remaining:.2} deductible."
                ),
            )
        } else {
            let after_deductible = procedure_cost - remaining;
            let coinsurance = after_deductible * (coinsurance_percent / 100.0);
            let total = remaining + coinsurance;
            let explanation = if remaining > 0.0 {
                format!(
                    "You will pay ${remaining:.2} toward your deductible, plus {}% coinsurance (${coinsurance:.2}) on the remaining ${after_deductible:.2}, for a total of ${total:.2}.",
                    percent(coinsurance_percent)
                )
            } else {
                format!(
                    "Your deductible is met. You will pay {}% coinsurance (${coinsurance:.2}) on the ${procedure_cost:.2} procedure cost.",
                    percent(coinsurance_percent)
                )
            };
            (total, remaining, coinsurance, explanation)
        };

    json!({
        "success": true,
        "out_of_pocket_cost": round2(out_of_pocket),
        "deductible_portion": round2(deductible_portion),
        "coinsurance_portion": round2(coinsurance_portion),
        "explanation": explanation,
    })
}

/// `/comparePrices`
pub fn compare_prices(params: &Params) -> Value {
    let parsed: Result<serde_json::Map<String, Value>, String> = match params.get("hospital_prices") {
        None | Some(Value::Null) => Ok(serde_json::Map::new()),
        Some(Value::String(s)) => serde_json::from_str(s)
            .map_err(|e| format!("hospital_prices is not a JSON object: {e}")),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(format!("hospital_prices must be a JSON object, got {other}")),
    };
    let map = match parsed {
        Ok(map) => map,
        Err(e) => return failure(e),
    };
    if map.is_empty() {
        return failure("No hospital prices provided");
    }

    let mut prices = Vec::with_capacity(map.len());
    for (hospital, price) in &map {
        match price.as_f64() {
            Some(p) => prices.push((hospital.as_str(), p)),
            None => return failure(format!("price for {hospital} is not a number: {price}")),
        }
    }
    // Ties resolve to the hospital listed first.
    let (low_name, low) = prices
        .iter()
        .copied()
        .reduce(|best, p| if p.1 < best.1 { p } else { best })
        .unwrap_or(("", 0.0));
    let (high_name, high) = prices
        .iter()
        .copied()
        .reduce(|best, p| if p.1 > best.1 { p } else { best })
        .unwrap_or(("", 0.0));
    prices.sort_by(|a, b| a.1.total_cmp(&b.1));
    if high == 0.0 {
        return failure("highest price is zero; savings percentage is undefined");
    }
    let savings = high - low;
    let savings_percent = savings / high * 100.0;

    let comparison = prices
        .iter()
        .map(|(hospital, price)| format!("{hospital}: ${price:.2}"))
        .collect::<Vec<_>>()
        .join("\n");

    json!({
        "success": true,
        "lowest_price_hospital": low_name,
        "lowest_price": round2(low),
        "highest_price_hospital": high_name,
        "highest_price": round2(high),
        "potential_savings": round2(savings),
        "savings_percent": round1(savings_percent),
        "comparison": comparison,
        "explanation": format!(
            "The lowest price is ${low:.2} at {low_name}. You could save ${savings:.2} ({savings_percent:.1}%) compared to the highest price of ${high:.2} at {high_name}."
        ),
    })
}

/// `/calculateCoinsurance`
pub fn coinsurance(params: &Params) -> Value {
    let inputs = number(params, "amount", 0.0).and_then(|amount| {
        number(params, "coinsurance_percent", DEFAULT_COINSURANCE_PERCENT).map(|p| (amount, p))
    });
    let (amount, coinsurance_percent) = match inputs {
        Ok(v) => v,
        Err(e) => return failure(e),
    };
    let coinsurance = amount * (coinsurance_percent / 100.0);
    json!({
        "success": true,
        "coinsurance_amount": round2(coinsurance),
        "explanation": format!(
            "{}% of ${amount:.2} is ${coinsurance:.2}",
            percent(coinsurance_percent)
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn procedure_within_remaining_deductible_is_paid_in_full() {
        let body = out_of_pocket_cost(&params(&[
            ("procedure_cost", json!("800")),
            ("deductible", json!("2000")),
            ("deductible_paid", json!("500")),
        ]));
        assert_eq!(body["success"], true);
        assert_eq!(body["out_of_pocket_cost"], 800.0);
        assert_eq!(body["deductible_portion"], 800.0);
        assert_eq!(body["coinsurance_portion"], 0.0);
        assert_eq!(
            body["explanation"],
            "You will pay the full $800.00 which goes toward your remaining $1500.00 deductible."
        );
    }

    #[test]
    fn remaining_deductible_plus_coinsurance() {
        let body = out_of_pocket_cost(&params(&[
            ("procedure_cost", json!("5000")),
            ("deductible", json!("1500")),
            ("deductible_paid", json!("1000")),
            ("coinsurance_percent", json!("20")),
        ]));
        // 500 deductible + 20% of 4500.
        assert_eq!(body["out_of_pocket_cost"], 1400.0);
        assert_eq!(body["deductible_portion"], 500.0);
        assert_eq!(body["coinsurance_portion"], 900.0);
        assert_eq!(
            body["explanation"],
            "You will pay $500.00 toward your deductible, plus 20.0% coinsurance ($900.00) on the remaining $4500.00, for a total of $1400.00."
        );
    }

    #[test]
    fn deductible_met_uses_coinsurance_only() {
        let body = out_of_pocket_cost(&params(&[
            ("procedure_cost", json!(1000)),
            ("deductible", json!(500)),
            ("deductible_paid", json!(700)),
            ("coinsurance_percent", json!(15)),
        ]));
        assert_eq!(body["out_of_pocket_cost"], 150.0);
        assert_eq!(body["deductible_portion"], 0.0);
        assert!(body["explanation"]
            .as_str()
            .unwrap()
            .starts_with("Your deductible is met. You will pay 15.0% coinsurance ($150.00)"));
    }

    #[test]
    fn unparsable_number_is_failure() {
        let body = out_of_pocket_cost(&params(&[("procedure_cost", json!("a lot"))]));
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("procedure_cost"));
    }

    #[test]
    fn compare_finds_extremes_and_savings() {
        let body = compare_prices(&params(&[(
            "hospital_prices",
            json!(r#"{"Rhode Island Hospital": 1200, "Miriam Hospital": 950, "Butler Hospital": 1100}"#),
        )]));
        assert_eq!(body["success"], true);
        assert_eq!(body["lowest_price_hospital"], "Miriam Hospital");
        assert_eq!(body["highest_price_hospital"], "Rhode Island Hospital");
        assert_eq!(body["potential_savings"], 250.0);
        assert_eq!(body["savings_percent"], 20.8);
        assert_eq!(
            body["comparison"],
            "Miriam Hospital: $950.00\nButler Hospital: $1100.00\nRhode Island Hospital: $1200.00"
        );
        assert_eq!(
            body["explanation"],
            "The lowest price is $950.00 at Miriam Hospital. You could save $250.00 (20.8%) compared to the highest price of $1200.00 at Rhode Island Hospital."
        );
    }

    #[test]
    fn compare_keeps_listed_order_for_ties() {
        let body = compare_prices(&params(&[(
            "hospital_prices",
            json!(r#"{"Rhode Island Hospital": 1200, "Miriam Hospital": 950, "Butler Hospital": 1200}"#),
        )]));
        assert_eq!(body["highest_price_hospital"], "Rhode Island Hospital");
        assert_eq!(
            body["comparison"],
            "Miriam Hospital: $950.00\nRhode Island Hospital: $1200.00\nButler Hospital: $1200.00"
        );

        let body = compare_prices(&params(&[(
            "hospital_prices",
            json!(r#"{"Zion Clinic": 500, "Alpha Hospital": 500}"#),
        )]));
        assert_eq!(body["lowest_price_hospital"], "Zion Clinic");
        assert_eq!(body["highest_price_hospital"], "Zion Clinic");
    }

    #[test]
    fn compare_rejects_empty_and_invalid_input() {
        let empty = compare_prices(&params(&[("hospital_prices", json!("{}"))]));
        assert_eq!(empty["error"], "No hospital prices provided");
        let missing = compare_prices(&params(&[]));
        assert_eq!(missing["success"], false);
        let broken = compare_prices(&params(&[("hospital_prices", json!("{not json"))]));
        assert_eq!(broken["success"], false);
        let non_numeric = compare_prices(&params(&[("hospital_prices", json!(r#"{"A": "cheap"}"#))]));
        assert_eq!(non_numeric["success"], false);
    }

    #[test]
    fn coinsurance_defaults_to_twenty_percent() {
        let body = coinsurance(&params(&[("amount", json!("250"))]));
        assert_eq!(body["coinsurance_amount"], 50.0);
        assert_eq!(body["explanation"], "20.0% of $250.00 is $50.00");
    }

    #[test]
    fn coinsurance_with_fractional_percent() {
        let body = coinsurance(&params(&[
            ("amount", json!("100")),
            ("coinsurance_percent", json!("12.5")),
        ]));
        assert_eq!(body["coinsurance_amount"], 12.5);
        assert_eq!(body["explanation"], "12.5% of $100.00 is $12.50");
    }
}
