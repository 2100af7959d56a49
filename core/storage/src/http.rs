//! Status mapping and URL helpers shared by the cloud backends.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::StatusCode;

use unistore_common::Error;

/// Characters left unescaped in a key path segment: `A-Z a-z 0-9 - _ . ~`.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode an object key for use in a URL path, keeping `/`.
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| percent_encoding::utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map an error status returned by a provider to the crate error.
pub(crate) fn status_error(status: u16, body: &str) -> Error {
    let code = StatusCode::from_u16(status).ok();
    let label = code.map_or_else(|| status.to_string(), |c| c.to_string());
    let detail = if body.trim().is_empty() {
        label
    } else {
        format!("{} - {}", label, body.trim())
    };

    match code {
        Some(StatusCode::NOT_FOUND) => Error::NotFound(detail),
        Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN) => {
            Error::PermissionDenied(detail)
        }
        Some(StatusCode::TOO_MANY_REQUESTS) | Some(StatusCode::SERVICE_UNAVAILABLE) => {
            Error::Throttled(detail)
        }
        _ => Error::Provider {
            status,
            message: detail,
        },
    }
}
