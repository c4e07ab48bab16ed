//! Channel/arg wire dialect: one fixed URL, subscriptions sent as explicit
//! control messages, login required for private channels.

use crate::venue::signing::sign;

/// `{"op":"subscribe","args":[{"channel":...,"instId":...}]}`
#[must_use]
pub fn subscribe_message(channel: &str, inst_id: &str) -> serde_json::Value {
    serde_json::json!({
        "op": "subscribe",
        "args": [{"channel": channel, "instId": inst_id}],
    })
}

/// `{"op":"unsubscribe","args":[{"channel":...,"instId":...}]}`
#[must_use]
pub fn unsubscribe_message(channel: &str, inst_id: &str) -> serde_json::Value {
    serde_json::json!({
        "op": "unsubscribe",
        "args": [{"channel": channel, "instId": inst_id}],
    })
}

/// Login control message. `sign = HMAC-SHA256(secret, timestamp +
/// "GET" + "/users/self/verify")`.
#[must_use]
pub fn login_message(api_key: &str, passphrase: &str, secret: &str, timestamp: &str) -> serde_json::Value {
    let payload = format!("{timestamp}GET/users/self/verify");
    let signature = sign(&payload, secret);
    serde_json::json!({
        "op": "login",
        "args": [{
            "apiKey": api_key,
            "passphrase": passphrase,
            "timestamp": timestamp,
            "sign": signature,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_message_signs_the_fixed_verify_path() {
        let msg = login_message("key", "phrase", "secret", "1700000000");
        let sign_field = msg["args"][0]["sign"].as_str().unwrap();
        let expected = sign("1700000000GET/users/self/verify", "secret");
        assert_eq!(sign_field, expected);
    }

    #[test]
    fn subscribe_message_shape() {
        let msg = subscribe_message("books", "BTC-USDT");
        assert_eq!(msg["op"], "subscribe");
        assert_eq!(msg["args"][0]["channel"], "books");
        assert_eq!(msg["args"][0]["instId"], "BTC-USDT");
    }
}
