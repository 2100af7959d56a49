//! Stored-name generation.
//!
//! Stored names have the shape `{unix_millis}_{suffix}_{base}.{ext}`. The
//! millisecond timestamp keeps names roughly time ordered and the random
//! suffix keeps concurrent issuance from colliding.

use chrono::Utc;

/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 8;

/// Longest sanitized base name kept in a stored name.
const MAX_BASE_LEN: usize = 64;
/// Longest extension kept in a stored name.
const MAX_EXT_LEN: usize = 10;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A caller-supplied name split into safe parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName {
    pub base: String,
    pub extension: Option<String>,
}

/// Turns an untrusted original file name into safe components.
///
/// Implementations must only emit `[A-Za-z0-9_-]` in `base` and
/// `[a-z0-9]` in `extension`, and must never return an empty base.
pub trait FileNameSanitizer: Send + Sync {
    fn sanitize(&self, original: &str) -> SanitizedName;
}

/// Default sanitizer: strips directories, maps unsafe characters to `_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSanitizer;

impl FileNameSanitizer for DefaultSanitizer {
    fn sanitize(&self, original: &str) -> SanitizedName {
        let file = original
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(original);

        let (stem, ext) = match file.rfind('.') {
            Some(idx) if idx > 0 => (&file[..idx], Some(&file[idx + 1..])),
            _ => (file, None),
        };

        let mut base = String::with_capacity(stem.len());
        for ch in stem.chars() {
            let mapped = if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            };
            if mapped == '_' && base.ends_with('_') {
                continue;
            }
            base.push(mapped);
        }
        let mut base = base.trim_matches('_').to_string();
        base.truncate(MAX_BASE_LEN);
        if base.is_empty() {
            base.push_str("file");
        }

        let extension = ext
            .map(|e| {
                e.chars()
                    .filter(char::is_ascii_alphanumeric)
                    .map(|c| c.to_ascii_lowercase())
                    .take(MAX_EXT_LEN)
                    .collect::<String>()
            })
            .filter(|e| !e.is_empty());

        SanitizedName { base, extension }
    }
}

/// Random `[a-z0-9]` suffix.
pub fn random_suffix() -> String {
    let mut bits: u64 = rand::random();
    let mut out = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        let idx = (bits % SUFFIX_ALPHABET.len() as u64) as usize;
        out.push(SUFFIX_ALPHABET[idx] as char);
        bits /= SUFFIX_ALPHABET.len() as u64;
    }
    out
}

/// Generate a stored name for `original` using `sanitizer`.
pub fn generate_stored_name_with(sanitizer: &dyn FileNameSanitizer, original: &str) -> String {
    let SanitizedName { base, extension } = sanitizer.sanitize(original);
    let millis = Utc::now().timestamp_millis();
    match extension {
        Some(ext) => format!("{}_{}_{}.{}", millis, random_suffix(), base, ext),
        None => format!("{}_{}_{}", millis, random_suffix(), base),
    }
}

/// Generate a stored name with the default sanitizer.
pub fn generate_stored_name(original: &str) -> String {
    generate_stored_name_with(&DefaultSanitizer, original)
}
