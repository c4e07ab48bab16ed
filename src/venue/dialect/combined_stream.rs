//! Combined-stream wire dialect: subscription is encoded in the URL,
//! control messages refine it after connect.

/// Build a combined-stream URL: `wss://host/stream?streams=a/b/c`.
#[must_use]
pub fn combined_stream_url(base_ws_url: &str, streams: &[String]) -> String {
    format!("{base_ws_url}/stream?streams={}", streams.join("/"))
}

/// `{"method":"SUBSCRIBE","params":[...],"id":...}`
#[must_use]
pub fn subscribe_message(streams: &[String], id: u64) -> serde_json::Value {
    serde_json::json!({
        "method": "SUBSCRIBE",
        "params": streams,
        "id": id,
    })
}

/// `{"method":"UNSUBSCRIBE","params":[...],"id":...}`
#[must_use]
pub fn unsubscribe_message(streams: &[String], id: u64) -> serde_json::Value {
    serde_json::json!({
        "method": "UNSUBSCRIBE",
        "params": streams,
        "id": id,
    })
}

/// Stream name for a (symbol, suffix) pair, e.g. `("btcusdt", "depth")` ->
/// `"btcusdt@depth"`.
#[must_use]
pub fn stream_name(symbol: &str, suffix: &str) -> String {
    format!("{}@{suffix}", symbol.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_combined_stream_url() {
        let url = combined_stream_url(
            "wss://stream.example.com",
            &["btcusdt@depth".to_string(), "ethusdt@trade".to_string()],
        );
        assert_eq!(url, "wss://stream.example.com/stream?streams=btcusdt@depth/ethusdt@trade");
    }

    #[test]
    fn stream_name_lowercases_symbol() {
        assert_eq!(stream_name("BTCUSDT", "depth"), "btcusdt@depth");
    }
}
