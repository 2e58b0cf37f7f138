//! Stack normalization and fingerprinting
//!
//! Two stacks that differ only in the hexadecimal argument values of their
//! frames are structurally the same stack. Normalization replaces a trailing
//! all-hex argument group with `(...)` so such stacks hash identically.
//!
//! Header scrubbing is a separate display-side transform: every run of
//! decimal digits in a metadata line becomes `~`.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Placeholder written in place of a scrubbed argument group
pub const ARGS_PLACEHOLDER: &str = "(...)";

/// Placeholder written in place of each digit run in a scrubbed header
pub const DIGITS_PLACEHOLDER: &str = "~";

fn args_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\((0x[0-9a-f ,]+)+\)$").expect("valid args pattern"))
}

fn digits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digits pattern"))
}

/// Normalize one body line
///
/// Lines ending in a parenthesized group made only of hex tokens have that
/// group replaced by [`ARGS_PLACEHOLDER`]; every other line is returned as is.
///
/// # Example
/// ```
/// use taskdump::fingerprint::normalize_line;
///
/// assert_eq!(normalize_line("main.worker(0xc000010000, 0x1)"), "main.worker(...)");
/// assert_eq!(normalize_line("main.worker(...)"), "main.worker(...)");
/// ```
pub fn normalize_line(line: &str) -> String {
    match args_pattern().find(line) {
        Some(m) => format!("{}{}", &line[..m.start()], ARGS_PLACEHOLDER),
        None => line.to_string(),
    }
}

/// Replace every maximal run of decimal digits with [`DIGITS_PLACEHOLDER`]
pub fn scrub_header(header: &str) -> String {
    digits_pattern()
        .replace_all(header, DIGITS_PLACEHOLDER)
        .into_owned()
}

/// Hex-encoded SHA-256 digest of a normalized body
pub fn digest(normalized_body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_body.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hex_args() {
        assert_eq!(
            normalize_line("sync.(*Mutex).Lock(0xc0000b4008)"),
            "sync.(*Mutex).Lock(...)"
        );
        assert_eq!(
            normalize_line("main.handle(0x1, 0x2, 0xabcdef)"),
            "main.handle(...)"
        );
    }

    #[test]
    fn test_normalize_keeps_non_hex_args() {
        let line = "main.handle({0x1, 0x2}, 0x3)";
        assert_eq!(normalize_line(line), line);

        let line = "main.handle(0x1, ...)";
        assert_eq!(normalize_line(line), line);
    }

    #[test]
    fn test_normalize_keeps_file_lines() {
        let line = "\t/src/app/main.go:42 +0x1d";
        assert_eq!(normalize_line(line), line);
    }

    #[test]
    fn test_normalize_requires_trailing_group() {
        let line = "main.handle(0x1) extra";
        assert_eq!(normalize_line(line), line);
    }

    #[test]
    fn test_scrub_header_replaces_digit_runs() {
        assert_eq!(
            scrub_header("goroutine 1234 [chan receive, 15 minutes]:"),
            "goroutine ~ [chan receive, ~ minutes]:"
        );
        assert_eq!(scrub_header("no digits"), "no digits");
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let a = digest("main.main()\n\t/app/main.go:10 +0x20");
        let b = digest("main.main()\n\t/app/main.go:10 +0x20");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_digest_sensitive_to_content() {
        assert_ne!(digest("a\nb"), digest("a\nb\nc"));
        assert_ne!(digest("a\nb"), digest("a\nc"));
        assert_ne!(digest("a\nb"), digest("b\na"));
    }
}
