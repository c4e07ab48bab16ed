//! Venue error classification ("Venue A exemplar" — other
//! venues follow analogous rules against their own code tables).

use crate::error::{Action, Severity, VenueError};

/// Classify a venue's `{code, msg}` error body into a severity/action pair.
/// Unknown codes still classify (as `Severity::Error`, `Action::None`) —
/// this never fails.
#[must_use]
pub fn classify(code: i64, message: &str) -> VenueError {
    let tag = tag_for_code(code);

    if is_rate_limit_code(code) {
        return VenueError {
            code: code.to_string(),
            message: message.to_string(),
            tag: tag.to_string(),
            severity: Severity::Warning,
            action: Action::RateLimitWait,
        };
    }

    if is_time_or_signature_code(code) {
        return VenueError {
            code: code.to_string(),
            message: message.to_string(),
            tag: tag.to_string(),
            severity: Severity::Critical,
            action: Action::SyncTimeSignature,
        };
    }

    if is_precision_error_message(message) {
        return VenueError {
            code: code.to_string(),
            message: message.to_string(),
            tag: tag.to_string(),
            severity: Severity::Warning,
            action: Action::AdjustPrecision,
        };
    }

    VenueError {
        code: code.to_string(),
        message: message.to_string(),
        tag: tag.to_string(),
        severity: Severity::Error,
        action: Action::None,
    }
}

fn tag_for_code(code: i64) -> &'static str {
    match code {
        -2013 => "ORDER_ARCHIVED",
        -1003 => "RATE_LIMITED",
        -1021 => "INVALID_TIMESTAMP",
        -1022 => "INVALID_SIGNATURE",
        -1013 => "INVALID_QUANTITY",
        _ => "UNKNOWN",
    }
}

fn is_rate_limit_code(code: i64) -> bool {
    matches!(code, -1003 | -1015)
}

fn is_time_or_signature_code(code: i64) -> bool {
    matches!(code, -1021 | -1022)
}

fn is_precision_error_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("precision") || lower.contains("lot size") || lower.contains("tick size")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_code_maps_to_warning_with_wait_action() {
        let e = classify(-1003, "too many requests");
        assert_eq!(e.severity, Severity::Warning);
        assert_eq!(e.action, Action::RateLimitWait);
        assert_eq!(e.tag, "RATE_LIMITED");
    }

    #[test]
    fn signature_code_maps_to_critical_resync() {
        let e = classify(-1022, "signature invalid");
        assert_eq!(e.severity, Severity::Critical);
        assert_eq!(e.action, Action::SyncTimeSignature);
    }

    #[test]
    fn precision_message_maps_to_warning_adjust() {
        let e = classify(-1111, "Filter failure: PRICE_FILTER precision");
        assert_eq!(e.severity, Severity::Warning);
        assert_eq!(e.action, Action::AdjustPrecision);
    }

    #[test]
    fn unknown_code_defaults_to_error_with_no_action() {
        let e = classify(-9999, "mystery failure");
        assert_eq!(e.severity, Severity::Error);
        assert_eq!(e.action, Action::None);
        assert_eq!(e.tag, "UNKNOWN");
    }
}
