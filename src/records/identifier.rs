//! Client identifiers used as log filename prefixes.

use url::Url;

pub const OUTBOUND_FALLBACK: &str = "outbound";
pub const INBOUND_FALLBACK: &str = "inbound";

/// Strip every character outside `[A-Za-z0-9_-]`.
///
/// Characters are removed, not replaced, so the result may be empty.
pub fn sanitize_identifier(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn sanitized_non_empty(candidate: Option<&str>) -> Option<String> {
    candidate
        .map(sanitize_identifier)
        .filter(|s| !s.is_empty())
}

/// Identifier for an outbound record.
///
/// Precedence: explicit custom identifier, then the `id` query parameter
/// of the request that triggered the proxy call, then the first label of
/// the endpoint host, then `"outbound"`. Candidates that sanitize to an
/// empty string are skipped.
pub fn outbound_identifier(custom: Option<&str>, query_id: Option<&str>, endpoint: &str) -> String {
    // An `id` that sanitizes to nothing falls through instead of producing
    // a filename that starts with `_`.
    sanitized_non_empty(custom)
        .or_else(|| sanitized_non_empty(query_id))
        .or_else(|| {
            let url = Url::parse(endpoint).ok()?;
            let host = url.host_str()?;
            sanitized_non_empty(host.split('.').next())
        })
        .unwrap_or_else(|| OUTBOUND_FALLBACK.to_string())
}

/// Identifier for an inbound record: the `id` query parameter or `"inbound"`.
pub fn inbound_identifier(query_id: Option<&str>) -> String {
    // Same fall-through as outbound: an all-symbol `id` logs as "inbound".
    sanitized_non_empty(query_id).unwrap_or_else(|| INBOUND_FALLBACK.to_string())
}
