//! Output normalization and comparison
//!
//! Raw process output is canonicalized with [`normalize`] before it is shown
//! or compared, and [`matches`] decides whether two normalized outputs are
//! equivalent for grading purposes.

/// Canonicalize raw process output into a comparable string
///
/// Bytes are decoded as UTF-8, falling back to lossy decoding for malformed
/// sequences. Carriage returns become newlines, then leading and trailing
/// spaces and newlines are stripped. Tabs and other whitespace are kept.
///
/// Carriage returns are rewritten before trimming so that normalizing twice
/// gives the same string; a trailing `\r` is therefore stripped, not shown.
pub fn normalize(raw: impl AsRef<[u8]>) -> String {
    let text = String::from_utf8_lossy(raw.as_ref());
    let unified = text.replace('\r', "\n");
    unified.trim_matches(is_stripped).to_owned()
}

/// Whitespace-insensitive equality used to grade a test case
///
/// Every space and newline is removed from both sides before comparing, so
/// `"1 2"` and `"12"` are considered equal.
pub fn matches(actual: &str, expected: &str) -> bool {
    let significant = |s: &str| s.chars().filter(|&c| !is_stripped(c)).collect::<String>();
    significant(actual) == significant(expected)
}

fn is_stripped(c: char) -> bool {
    c == ' ' || c == '\n'
}
