//! Header name translation between HTTP and CGI-style variables.
//!
//! # Responsibilities
//! - Expose inbound headers as `HTTP_*` variables
//! - Turn `HTTP_*` variables back into title-cased header names
//! - Identify connection-management headers the shim re-frames itself
//! - Carry header values as latin-1 so every byte survives the trip

use axum::http::HeaderName;

/// Prefix marking a variable as a forwarded HTTP header.
pub const HTTP_PREFIX: &str = "HTTP_";

/// Headers describing the hop rather than the message.
const CONNECTION_MANAGED: &[&str] = &["connection", "transfer-encoding"];

/// `x-custom-id` → `HTTP_X_CUSTOM_ID`.
pub fn variable_for_header(name: &HeaderName) -> String {
    let mut variable = String::with_capacity(HTTP_PREFIX.len() + name.as_str().len());
    variable.push_str(HTTP_PREFIX);
    variable.extend(name.as_str().chars().map(|c| match c {
        '-' => '_',
        c => c.to_ascii_uppercase(),
    }));
    variable
}

/// `HTTP_X_CUSTOM_ID` → `Some("X-Custom-Id")`; variables without the
/// prefix yield `None`.
pub fn header_for_variable(variable: &str) -> Option<String> {
    variable
        .strip_prefix(HTTP_PREFIX)
        .map(|rest| title_case(&rest.replace('_', "-")))
}

/// Upper-case every letter that does not follow another letter and
/// lower-case the rest.
pub fn title_case(name: &str) -> String {
    let mut previous_is_letter = false;
    name.chars()
        .map(|c| {
            let mapped = if previous_is_letter {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            };
            previous_is_letter = c.is_ascii_alphabetic();
            mapped
        })
        .collect()
}

/// `Connection` and `Transfer-Encoding`, in any letter case.
pub fn is_connection_managed(name: &str) -> bool {
    CONNECTION_MANAGED
        .iter()
        .any(|managed| managed.eq_ignore_ascii_case(name))
}

/// Header bytes as text, one char per byte (latin-1).
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`decode_latin1`]; `None` if a char is above U+00FF.
pub fn encode_latin1(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(c).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_variable_to_header() {
        assert_eq!(header_for_variable("HTTP_X_CUSTOM_ID").as_deref(), Some("X-Custom-Id"));
        assert_eq!(header_for_variable("HTTP_USER_AGENT").as_deref(), Some("User-Agent"));
        assert_eq!(header_for_variable("HTTP_ACCEPT").as_deref(), Some("Accept"));
        assert_eq!(header_for_variable("HTTP_X_B3_TRACEID").as_deref(), Some("X-B3-Traceid"));
    }

    #[test]
    fn ignores_unprefixed_variables() {
        assert_eq!(header_for_variable("CONTENT_TYPE"), None);
        assert_eq!(header_for_variable("CONTENT_LENGTH"), None);
        assert_eq!(header_for_variable("http_accept"), None);
    }

    #[test]
    fn header_round_trips_through_variable() {
        let name = HeaderName::from_static("x-request-id");
        let variable = variable_for_header(&name);
        assert_eq!(variable, "HTTP_X_REQUEST_ID");
        assert_eq!(header_for_variable(&variable).as_deref(), Some("X-Request-Id"));
    }

    #[test]
    fn title_case_capitalises_after_non_letters() {
        assert_eq!(title_case("WWW-AUTHENTICATE"), "Www-Authenticate");
        assert_eq!(title_case("x1a"), "X1A");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn connection_managed_any_case() {
        assert!(is_connection_managed("Connection"));
        assert!(is_connection_managed("TRANSFER-ENCODING"));
        assert!(is_connection_managed("transfer-encoding"));
        assert!(!is_connection_managed("Content-Length"));
        assert!(!is_connection_managed("Keep-Alive"));
    }

    #[test]
    fn latin1_keeps_every_byte() {
        let raw = b"caf\xE9 \x80\xFF";
        let text = decode_latin1(raw);
        assert_eq!(text, "caf\u{e9} \u{80}\u{ff}");
        assert_eq!(encode_latin1(&text).as_deref(), Some(&raw[..]));
    }

    #[test]
    fn latin1_rejects_wide_chars() {
        assert_eq!(encode_latin1("snow \u{2603}"), None);
        assert_eq!(encode_latin1("plain").as_deref(), Some(&b"plain"[..]));
    }
}
