// src/execenv/timefmt.rs

//! Date patterns for the `time.*` namespace, e.g. `{time.YYYY-MM-DD}`.

use chrono::{DateTime, TimeZone};

/// Token → chrono specifier, longest tokens first so `YYYY` wins over `YY`.
const TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("MMMM", "%B"),
    ("DDDD", "%A"),
    ("MMM", "%b"),
    ("DDD", "%a"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("hh", "%H"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("ZZZ", "%Z"),
    ("ZZ", "%z"),
    ("M", "%-m"),
    ("D", "%-d"),
    ("h", "%-H"),
    ("m", "%-M"),
    ("s", "%-S"),
];

/// Translate a date pattern into a chrono format string. Characters that are
/// not part of a token are copied literally.
pub fn to_strftime(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;
    'outer: while !rest.is_empty() {
        for (token, spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}

pub fn format<Tz: TimeZone>(time: &DateTime<Tz>, pattern: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(&to_strftime(pattern)).to_string()
}
