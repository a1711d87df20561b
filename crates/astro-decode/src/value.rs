//! Typed metadata values and the two coercion strategies that produce them:
//! lexical typing of FITS card values and hint-driven typing of XISF
//! properties.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// A typed header value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// Logical value (FITS `T`/`F`, XISF `Boolean`).
    Bool(bool),
    /// Signed integer of any width.
    Int64(i64),
    /// Unsigned integer of any width.
    UInt64(u64),
    /// Floating-point value of any width.
    Float64(f64),
    /// Point in time, normalized to UTC.
    Timestamp(DateTime<Utc>),
    /// Text, or the original text of a value that failed to parse.
    String(String),
}

impl MetadataValue {
    /// Returns the value as `f64` for any numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Int64(n) => Some(*n as f64),
            MetadataValue::UInt64(n) => Some(*n as f64),
            MetadataValue::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as `i64` for integer variants that fit.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Int64(n) => Some(*n),
            MetadataValue::UInt64(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Returns the value of a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrows the text of a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the instant of a `Timestamp`, in UTC.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            MetadataValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Short name of the variant, for tabular display.
    pub const fn kind(&self) -> &'static str {
        match self {
            MetadataValue::Bool(_) => "bool",
            MetadataValue::Int64(_) => "int64",
            MetadataValue::UInt64(_) => "uint64",
            MetadataValue::Float64(_) => "float64",
            MetadataValue::Timestamp(_) => "timestamp",
            MetadataValue::String(_) => "string",
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Int64(n) => write!(f, "{n}"),
            MetadataValue::UInt64(n) => write!(f, "{n}"),
            MetadataValue::Float64(v) => write!(f, "{v}"),
            MetadataValue::Timestamp(t) => {
                f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            MetadataValue::String(s) => f.write_str(s),
        }
    }
}

// ── FITS lexical typing ──

/// Split a value field at the comment separator.
///
/// Real-world files omit the space after the slash (`= -32 /bits`), so only
/// ` /` is required.
fn split_comment(field: &[u8]) -> (&[u8], Option<String>) {
    match field.windows(2).position(|w| w == b" /") {
        Some(i) => (&field[..i], comment_after_slash(&field[i + 2..])),
        None => (field, None),
    }
}

fn comment_after_slash(rest: &[u8]) -> Option<String> {
    let rest = rest.strip_prefix(b" ").unwrap_or(rest);
    let text = String::from_utf8_lossy(rest);
    let text = text.trim_end();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse a quoted string starting at `field[0] == '\''`.
///
/// Doubled quotes are a literal quote; an unterminated string is accepted
/// as-is. Trailing blanks inside the quotes are not significant.
fn parse_quoted(field: &[u8]) -> (MetadataValue, Option<String>) {
    let mut content = Vec::new();
    let mut i = 1;
    while i < field.len() {
        if field[i] == b'\'' {
            if field.get(i + 1) == Some(&b'\'') {
                content.push(b'\'');
                i += 2;
                continue;
            }
            i += 1;
            break;
        }
        content.push(field[i]);
        i += 1;
    }
    let text = String::from_utf8_lossy(&content).trim_end().to_string();
    let (_, comment) = split_comment(&field[i.min(field.len())..]);
    (MetadataValue::String(text), comment)
}

/// Parse a float string, handling FITS `D` exponent notation.
fn parse_float_str(s: &str) -> Option<f64> {
    if s.contains(['D', 'd']) {
        s.replace(['D', 'd'], "E").parse::<f64>().ok()
    } else {
        s.parse::<f64>().ok()
    }
}

fn looks_integral(s: &str) -> bool {
    !s.contains(['.', 'E', 'e', 'D', 'd'])
}

/// Type a bare (unquoted) FITS literal by its lexical shape.
///
/// `T`/`F` become booleans, integer literals `Int64` (or `UInt64` when they
/// only fit unsigned), real literals `Float64`. Anything else, complex
/// literals included, is kept as the original text.
pub fn type_fits_literal(text: &str) -> MetadataValue {
    let text = text.trim();
    match text {
        "T" => return MetadataValue::Bool(true),
        "F" => return MetadataValue::Bool(false),
        _ => {}
    }
    if looks_integral(text) {
        if let Ok(n) = text.parse::<i64>() {
            return MetadataValue::Int64(n);
        }
        if let Ok(n) = text.parse::<u64>() {
            return MetadataValue::UInt64(n);
        }
    }
    match parse_float_str(text) {
        Some(f) => MetadataValue::Float64(f),
        None => MetadataValue::String(text.to_string()),
    }
}

/// Parse the value portion of a FITS card (bytes 10..80).
///
/// Returns the typed value and the inline comment, if any. An empty value
/// field types as the empty string.
pub fn parse_fits_value(field: &[u8]) -> (MetadataValue, Option<String>) {
    let start = field
        .iter()
        .position(|&b| b != b' ')
        .unwrap_or(field.len());
    let field = &field[start..];

    if field.first() == Some(&b'\'') {
        return parse_quoted(field);
    }

    // A comment may begin in the first column of a value-less field.
    if field.first() == Some(&b'/') {
        return (MetadataValue::String(String::new()), comment_after_slash(&field[1..]));
    }

    let (value_part, comment) = split_comment(field);
    let text = String::from_utf8_lossy(value_part);
    if text.trim().is_empty() {
        return (MetadataValue::String(String::new()), comment);
    }
    (type_fits_literal(&text), comment)
}

/// Type a FITS value given as free text (e.g. an XISF `FITSKeyword` value
/// attribute), including its optional quotes.
pub fn type_fits_text(text: &str) -> MetadataValue {
    let trimmed = text.trim();
    if trimmed.starts_with('\'') {
        parse_quoted(trimmed.as_bytes()).0
    } else if trimmed.is_empty() {
        MetadataValue::String(String::new())
    } else {
        type_fits_literal(trimmed)
    }
}

// ── XISF hint-driven typing ──

/// Declared type of an XISF property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeHint {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    TimePoint,
    String,
    /// Vectors, matrices, complex scalars and unknown names.
    Unsupported,
}

impl TypeHint {
    /// Parse a type attribute, ignoring case. Accepts the short aliases
    /// (`Byte`, `Short`, `Int`, `Float`, `Double`, ...) as well.
    pub fn parse(name: &str) -> TypeHint {
        match name.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => TypeHint::Boolean,
            "int8" | "char" => TypeHint::Int8,
            "int16" | "short" => TypeHint::Int16,
            "int32" | "int" => TypeHint::Int32,
            "int64" => TypeHint::Int64,
            "uint8" | "byte" => TypeHint::UInt8,
            "uint16" | "ushort" => TypeHint::UInt16,
            "uint32" | "uint" => TypeHint::UInt32,
            "uint64" => TypeHint::UInt64,
            "float32" | "float" => TypeHint::Float32,
            "float64" | "double" => TypeHint::Float64,
            "timepoint" => TypeHint::TimePoint,
            "string" => TypeHint::String,
            _ => TypeHint::Unsupported,
        }
    }

    /// Coerce `text` according to this hint.
    ///
    /// Any parse failure keeps the original text unchanged.
    pub fn coerce(self, text: &str) -> MetadataValue {
        let t = text.trim();
        let parsed = match self {
            TypeHint::Boolean => {
                Some(MetadataValue::Bool(t == "1" || t.eq_ignore_ascii_case("true")))
            }
            TypeHint::Int8 => t.parse::<i8>().ok().map(|n| MetadataValue::Int64(n.into())),
            TypeHint::Int16 => t.parse::<i16>().ok().map(|n| MetadataValue::Int64(n.into())),
            TypeHint::Int32 => t.parse::<i32>().ok().map(|n| MetadataValue::Int64(n.into())),
            TypeHint::Int64 => t.parse::<i64>().ok().map(MetadataValue::Int64),
            TypeHint::UInt8 => t.parse::<u8>().ok().map(|n| MetadataValue::UInt64(n.into())),
            TypeHint::UInt16 => t.parse::<u16>().ok().map(|n| MetadataValue::UInt64(n.into())),
            TypeHint::UInt32 => t.parse::<u32>().ok().map(|n| MetadataValue::UInt64(n.into())),
            TypeHint::UInt64 => t.parse::<u64>().ok().map(MetadataValue::UInt64),
            TypeHint::Float32 => t
                .parse::<f32>()
                .ok()
                .filter(|f| !f.is_infinite() || t.to_ascii_lowercase().contains("inf"))
                .and_then(|_| t.parse::<f64>().ok())
                .map(MetadataValue::Float64),
            TypeHint::Float64 => t.parse::<f64>().ok().map(MetadataValue::Float64),
            TypeHint::TimePoint => parse_timepoint(t).map(MetadataValue::Timestamp),
            TypeHint::String | TypeHint::Unsupported => None,
        };
        parsed.unwrap_or_else(|| MetadataValue::String(text.to_string()))
    }
}

/// Parse an ISO 8601 time point.
///
/// Accepts RFC 3339 with an offset, a naive date-time (taken as UTC) and a
/// bare calendar date (midnight UTC).
pub fn parse_timepoint(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    let text = text.strip_suffix('Z').unwrap_or(text);
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    /// Helper: create a 70-byte field from a string, right-padded with spaces.
    fn make_field(s: &str) -> [u8; 70] {
        let mut buf = [b' '; 70];
        let bytes = s.as_bytes();
        let len = bytes.len().min(70);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    // ---- FITS lexical ----

    #[test]
    fn parse_logical_with_comment() {
        let field = make_field("                   T / this is a flag");
        let (val, comment) = parse_fits_value(&field);
        assert_eq!(val, MetadataValue::Bool(true));
        assert_eq!(comment.as_deref(), Some("this is a flag"));
    }

    #[test]
    fn parse_logical_false() {
        let (val, comment) = parse_fits_value(&make_field("                   F"));
        assert_eq!(val, MetadataValue::Bool(false));
        assert!(comment.is_none());
    }

    #[test]
    fn parse_integer_negative() {
        let (val, _) = parse_fits_value(&make_field("                 -32 /No. of bits"));
        assert_eq!(val, MetadataValue::Int64(-32));
    }

    #[test]
    fn parse_integer_beyond_i64() {
        let (val, _) = parse_fits_value(&make_field("18446744073709551615"));
        assert_eq!(val, MetadataValue::UInt64(u64::MAX));
    }

    #[test]
    fn parse_float_d_exponent() {
        let (val, _) = parse_fits_value(&make_field("           1.234D+05"));
        match val {
            MetadataValue::Float64(f) => assert!((f - 1.234e5).abs() < 1e-5),
            other => panic!("Expected Float64, got {:?}", other),
        }
    }

    #[test]
    fn parse_string_with_comment() {
        let (val, comment) = parse_fits_value(&make_field("'IMAGE   '           / image type"));
        assert_eq!(val, MetadataValue::String(String::from("IMAGE")));
        assert_eq!(comment.as_deref(), Some("image type"));
    }

    #[test]
    fn parse_string_embedded_quotes_and_slash() {
        let (val, comment) = parse_fits_value(&make_field("'it''s a / b'"));
        assert_eq!(val, MetadataValue::String(String::from("it's a / b")));
        assert!(comment.is_none());
    }

    #[test]
    fn parse_string_after_leading_spaces() {
        let (val, _) = parse_fits_value(&make_field("   'M31'"));
        assert_eq!(val, MetadataValue::String(String::from("M31")));
    }

    #[test]
    fn parse_unterminated_string() {
        let (val, _) = parse_fits_value(&make_field("'no closing quote"));
        assert_eq!(val, MetadataValue::String(String::from("no closing quote")));
    }

    #[test]
    fn parse_quoted_date_stays_string() {
        let (val, _) = parse_fits_value(&make_field("'2024-03-01T21:14:05'"));
        assert_eq!(val.kind(), "string");
    }

    #[test]
    fn parse_complex_falls_back_to_text() {
        let (val, _) = parse_fits_value(&make_field("(1.5, -2.0)"));
        assert_eq!(val, MetadataValue::String(String::from("(1.5, -2.0)")));
    }

    #[test]
    fn parse_empty_value_with_comment() {
        let (val, comment) = parse_fits_value(&make_field("                     / undefined"));
        assert_eq!(val, MetadataValue::String(String::new()));
        assert_eq!(comment.as_deref(), Some("undefined"));
    }

    #[test]
    fn parse_garbage_keeps_text() {
        let (val, _) = parse_fits_value(&make_field("  12abc"));
        assert_eq!(val, MetadataValue::String(String::from("12abc")));
    }

    #[test]
    fn fits_text_from_xml_attribute() {
        assert_eq!(type_fits_text("'NGC 7000'"), MetadataValue::String("NGC 7000".into()));
        assert_eq!(type_fits_text("300."), MetadataValue::Float64(300.0));
        assert_eq!(type_fits_text(" 16 "), MetadataValue::Int64(16));
        assert_eq!(type_fits_text("T"), MetadataValue::Bool(true));
        assert_eq!(type_fits_text(""), MetadataValue::String(String::new()));
    }

    // ---- XISF hints ----

    #[test]
    fn hint_names_case_insensitive() {
        assert_eq!(TypeHint::parse("Float32"), TypeHint::Float32);
        assert_eq!(TypeHint::parse("UINT16"), TypeHint::UInt16);
        assert_eq!(TypeHint::parse("TimePoint"), TypeHint::TimePoint);
        assert_eq!(TypeHint::parse("Double"), TypeHint::Float64);
        assert_eq!(TypeHint::parse("F32Vector"), TypeHint::Unsupported);
    }

    #[test]
    fn boolean_hint() {
        assert_eq!(TypeHint::Boolean.coerce("1"), MetadataValue::Bool(true));
        assert_eq!(TypeHint::Boolean.coerce("TRUE"), MetadataValue::Bool(true));
        assert_eq!(TypeHint::Boolean.coerce("true"), MetadataValue::Bool(true));
        assert_eq!(TypeHint::Boolean.coerce("0"), MetadataValue::Bool(false));
        assert_eq!(TypeHint::Boolean.coerce("yes"), MetadataValue::Bool(false));
    }

    #[test]
    fn integer_hints_respect_width() {
        assert_eq!(TypeHint::Int8.coerce("-128"), MetadataValue::Int64(-128));
        assert_eq!(TypeHint::Int8.coerce("128"), MetadataValue::String("128".into()));
        assert_eq!(TypeHint::UInt16.coerce("65535"), MetadataValue::UInt64(65535));
        assert_eq!(TypeHint::UInt16.coerce("-1"), MetadataValue::String("-1".into()));
        assert_eq!(TypeHint::Int64.coerce(" 42 "), MetadataValue::Int64(42));
    }

    #[test]
    fn float_hints() {
        assert_eq!(TypeHint::Float64.coerce("2.5e-3"), MetadataValue::Float64(2.5e-3));
        assert_eq!(TypeHint::Float32.coerce("0.1"), MetadataValue::Float64(0.1));
        assert_eq!(TypeHint::Float32.coerce("1e300"), MetadataValue::String("1e300".into()));
        assert_eq!(TypeHint::Float64.coerce("abc"), MetadataValue::String("abc".into()));
    }

    #[test]
    fn timepoint_hint_variants() {
        let t = TypeHint::TimePoint.coerce("2023-10-05T21:30:15Z");
        let ts = t.as_timestamp().unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2023, 10, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (21, 30, 15));

        let shifted = TypeHint::TimePoint.coerce("2023-10-05T23:30:15+02:00");
        assert_eq!(shifted.as_timestamp(), Some(ts));

        let naive = TypeHint::TimePoint.coerce("2023-10-05T21:30:15.250");
        assert_eq!(naive.as_timestamp().unwrap().timestamp_subsec_millis(), 250);

        let date = TypeHint::TimePoint.coerce("2023-10-05");
        assert_eq!(date.as_timestamp().unwrap().hour(), 0);

        let bad = TypeHint::TimePoint.coerce("yesterday");
        assert_eq!(bad, MetadataValue::String("yesterday".into()));
    }

    #[test]
    fn string_and_unsupported_hints_keep_text() {
        assert_eq!(TypeHint::String.coerce(" padded "), MetadataValue::String(" padded ".into()));
        assert_eq!(TypeHint::Unsupported.coerce("1 2 3"), MetadataValue::String("1 2 3".into()));
    }

    #[test]
    fn display_and_accessors() {
        assert_eq!(MetadataValue::Float64(1.5).to_string(), "1.5");
        assert_eq!(MetadataValue::Bool(true).to_string(), "true");
        assert_eq!(MetadataValue::UInt64(7).as_i64(), Some(7));
        assert_eq!(MetadataValue::Int64(-3).as_f64(), Some(-3.0));
        assert_eq!(MetadataValue::String("x".into()).as_f64(), None);
        let ts = parse_timepoint("2024-01-02T03:04:05Z").unwrap();
        assert_eq!(MetadataValue::Timestamp(ts).to_string(), "2024-01-02T03:04:05Z");
    }
}
