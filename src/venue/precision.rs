//! Decimal precision adjustment for request parameters.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::Value;

/// Parameter keys sensitive to price/quantity precision, and which of the
/// two rules applies: keys containing "price" use price precision, all
/// others in this set use quantity precision.
const PRECISION_SENSITIVE_KEYS: &[&str] = &[
    "quantity",
    "quoteOrderQty",
    "icebergQty",
    "limitIcebergQty",
    "stopIcebergQty",
    "price",
    "stopPrice",
    "stopLimitPrice",
];

/// Format `value` to `digits` decimal places, then strip trailing zeros
/// (and a trailing decimal point) past the decimal separator.
#[must_use]
pub fn adjust_precision(value: Decimal, digits: u32) -> String {
    let rounded = value.round_dp(digits);
    let mut text = format!("{rounded:.*}", digits as usize);
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    text
}

/// Apply [`adjust_precision`] to every precision-sensitive key in `params`,
/// using `price_precision` for keys containing "price" and
/// `quantity_precision` otherwise; all other keys pass through stringified
/// as-is. Idempotent: re-applying to already-adjusted params is a no-op.
#[must_use]
pub fn prepare_params(
    params: &HashMap<String, Value>,
    price_precision: u32,
    quantity_precision: u32,
) -> HashMap<String, String> {
    let mut out = HashMap::with_capacity(params.len());
    for (key, value) in params {
        if PRECISION_SENSITIVE_KEYS.contains(&key.as_str()) {
            if let Some(decimal) = value_to_decimal(value) {
                let digits = if key.to_lowercase().contains("price") {
                    price_precision
                } else {
                    quantity_precision
                };
                out.insert(key.clone(), adjust_precision(decimal, digits));
                continue;
            }
        }
        out.insert(key.clone(), stringify(value));
    }
    out
}

fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.as_f64().and_then(|f| Decimal::try_from(f).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn strips_trailing_zeros() {
        assert_eq!(adjust_precision(dec!(1.50000), 5), "1.5");
        assert_eq!(adjust_precision(dec!(2.00000), 5), "2");
    }

    #[test]
    fn prepare_params_routes_price_vs_quantity_precision() {
        let mut params = HashMap::new();
        params.insert("price".to_string(), json!("100.123456"));
        params.insert("quantity".to_string(), json!("0.0010000"));
        params.insert("symbol".to_string(), json!("BTCUSDT"));
        let prepared = prepare_params(&params, 2, 4);
        assert_eq!(prepared["price"], "100.12");
        assert_eq!(prepared["quantity"], "0.001");
        assert_eq!(prepared["symbol"], "BTCUSDT");
    }

    #[test]
    fn prepare_params_is_idempotent() {
        let mut params = HashMap::new();
        params.insert("price".to_string(), json!("100.126"));
        let once: HashMap<String, Value> = prepare_params(&params, 2, 4)
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        let twice = prepare_params(&once, 2, 4);
        let once_again = prepare_params(&params, 2, 4);
        assert_eq!(twice, once_again);
    }
}
