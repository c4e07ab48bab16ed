//! Venue-dialect message parsing for routing.
//!
//! Two exemplar dialects are recognized directly by the manager, each owning
//! its own wire format: a combined-stream style (subscription encoded in the
//! URL, a `stream` tag names the channel) and a channel/arg style (explicit
//! `{"op":"subscribe",...}` control messages, `arg.channel`/`arg.instId`
//! tag incoming data).

use serde_json::Value;

/// Which wire dialect a connection speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Subscriptions are encoded in the URL; messages carry `stream`/`data`.
    CombinedStream,
    /// Subscriptions are explicit control messages; messages carry
    /// `arg.channel`/`arg.instId`/`data`.
    ChannelArg,
}

/// Normalized data-type tag extracted from a venue message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Orderbook,
    Trade,
    Kline,
    Liquidation,
    FundingRate,
    OpenInterest,
}

impl DataType {
    fn from_combined_stream_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "depth" => Some(Self::Orderbook),
            "trade" => Some(Self::Trade),
            "kline" => Some(Self::Kline),
            "forceOrder" => Some(Self::Liquidation),
            _ => None,
        }
    }

    fn from_channel_arg_channel(channel: &str) -> Option<Self> {
        match channel {
            "books" => Some(Self::Orderbook),
            "trades" => Some(Self::Trade),
            "candle1m" => Some(Self::Kline),
            "funding-rate" => Some(Self::FundingRate),
            "open-interest" => Some(Self::OpenInterest),
            "liquidation-orders" => Some(Self::Liquidation),
            _ => None,
        }
    }
}

/// A successfully parsed, dialect-normalized message.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub data_type: DataType,
    pub symbol: String,
    pub payload: Value,
}

/// Parse `raw` per `dialect`. Returns `None` for unrecognized shapes
/// (counted as `unrouted_messages` by the caller).
#[must_use]
pub fn parse(dialect: Dialect, raw: &Value) -> Option<ParsedMessage> {
    match dialect {
        Dialect::CombinedStream => parse_combined_stream(raw),
        Dialect::ChannelArg => parse_channel_arg(raw),
    }
}

fn parse_combined_stream(raw: &Value) -> Option<ParsedMessage> {
    let stream = raw.get("stream")?.as_str()?;
    let data = raw.get("data")?.clone();

    let (symbol_part, suffix) = stream.split_once('@')?;
    let data_type = DataType::from_combined_stream_suffix(suffix)?;

    Some(ParsedMessage {
        data_type,
        symbol: symbol_part.to_uppercase(),
        payload: data,
    })
}

fn parse_channel_arg(raw: &Value) -> Option<ParsedMessage> {
    let arg = raw.get("arg")?;
    let channel = arg.get("channel")?.as_str()?;
    let inst_id = arg.get("instId")?.as_str()?;
    let data = raw.get("data")?.clone();

    let data_type = DataType::from_channel_arg_channel(channel)?;

    Some(ParsedMessage {
        data_type,
        symbol: inst_id.to_uppercase(),
        payload: data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn combined_stream_depth_extracts_symbol_and_type() {
        let raw = json!({"stream": "btcusdt@depth", "data": {"x": 1}});
        let parsed = parse(Dialect::CombinedStream, &raw).unwrap();
        assert_eq!(parsed.symbol, "BTCUSDT");
        assert_eq!(parsed.data_type, DataType::Orderbook);
    }

    #[test]
    fn combined_stream_unknown_suffix_is_none() {
        let raw = json!({"stream": "btcusdt@bookTicker", "data": {}});
        assert!(parse(Dialect::CombinedStream, &raw).is_none());
    }

    #[test]
    fn channel_arg_books_extracts_symbol_and_type() {
        let raw = json!({"arg": {"channel": "books", "instId": "btc-usdt"}, "data": [{}]});
        let parsed = parse(Dialect::ChannelArg, &raw).unwrap();
        assert_eq!(parsed.symbol, "BTC-USDT");
        assert_eq!(parsed.data_type, DataType::Orderbook);
    }

    #[test]
    fn malformed_shape_is_none() {
        let raw = json!({"unexpected": true});
        assert!(parse(Dialect::CombinedStream, &raw).is_none());
        assert!(parse(Dialect::ChannelArg, &raw).is_none());
    }
}
