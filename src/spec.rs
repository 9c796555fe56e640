//! The generic formatting routine.
//!
//! Parses format specs of the shape
//! `[[fill]align][sign][#][0][width][,|_][.precision][type]` and applies
//! them to values. The renderers call [`format_value`] for every
//! interpolation, and callers can use it directly; both paths produce the
//! same errors, so a failure never reveals whether a template was involved.

use crate::{
    log::{Error, ErrorKind, INVALID_FORMAT_SPEC},
    pipe::Pipe,
    value::Value,
};
use serde_json::Value as Json;

/// Horizontal alignment within a padded field.
#[derive(Debug, PartialEq, Copy, Clone)]
enum Align {
    /// `<`
    Left,
    /// `>`
    Right,
    /// `^`
    Center,
    /// `=`, padding inserted after the sign and radix prefix.
    AfterSign,
}

/// A parsed format spec.
#[derive(Debug, PartialEq, Clone)]
struct Spec {
    fill: char,
    align: Option<Align>,
    sign: Option<char>,
    alternate: bool,
    width: Option<usize>,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

impl Spec {
    fn parse(source: &str) -> Result<Self, Error> {
        let mut spec = Spec {
            fill: ' ',
            align: None,
            sign: None,
            alternate: false,
            width: None,
            grouping: None,
            precision: None,
            kind: None,
        };

        let chars: Vec<char> = source.chars().collect();
        let mut cursor = 0;

        // A fill character is only recognized when followed by an
        // alignment character.
        if chars.len() >= 2 {
            if let Some(align) = as_align(chars[1]) {
                spec.fill = chars[0];
                spec.align = Some(align);
                cursor = 2;
            }
        }
        if spec.align.is_none() {
            if let Some(align) = chars.first().copied().and_then(as_align) {
                spec.align = Some(align);
                cursor = 1;
            }
        }

        if let Some(c @ ('+' | '-' | ' ')) = chars.get(cursor).copied() {
            spec.sign = Some(c);
            cursor += 1;
        }
        if chars.get(cursor) == Some(&'#') {
            spec.alternate = true;
            cursor += 1;
        }
        if chars.get(cursor) == Some(&'0') {
            if spec.align.is_none() {
                spec.fill = '0';
                spec.align = Some(Align::AfterSign);
            }
            cursor += 1;
        }

        let width_begin = cursor;
        while chars.get(cursor).is_some_and(|c| c.is_ascii_digit()) {
            cursor += 1;
        }
        if cursor > width_begin {
            let digits: String = chars[width_begin..cursor].iter().collect();
            spec.width = Some(digits.parse().map_err(|_| {
                Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
                    .with_help("field width is too large")
            })?);
        }

        if let Some(c @ (',' | '_')) = chars.get(cursor).copied() {
            spec.grouping = Some(c);
            cursor += 1;
        }

        if chars.get(cursor) == Some(&'.') {
            cursor += 1;
            let precision_begin = cursor;
            while chars.get(cursor).is_some_and(|c| c.is_ascii_digit()) {
                cursor += 1;
            }
            if cursor == precision_begin {
                return Err(Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
                    .with_help("expected a digit after `.`"));
            }
            let digits: String = chars[precision_begin..cursor].iter().collect();
            spec.precision = Some(digits.parse().map_err(|_| {
                Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
                    .with_help("precision is too large")
            })?);
        }

        if let Some(c) = chars.get(cursor).copied() {
            match c {
                'b' | 'c' | 'd' | 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | 'o' | 's' | 'x' | 'X'
                | '%' => {
                    spec.kind = Some(c);
                    cursor += 1;
                }
                other => {
                    return Err(Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
                        .with_help(format!("unknown format code `{other}`")));
                }
            }
        }

        if cursor != chars.len() {
            return Err(Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
                .with_help("trailing characters after the format code"));
        }

        Ok(spec)
    }
}

fn as_align(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

/// Format the given value with the given format spec.
///
/// This is the routine behind every interpolation; calling it directly on
/// a plain value produces exactly the output, and exactly the errors, that
/// rendering a template containing that value would.
///
/// # Errors
///
/// Returns an [`Error`] of the format kind when the spec does not parse or
/// does not apply to the value, and of the type kind when the value cannot
/// be formatted at all, such as an unresolved callable.
///
/// # Examples
///
/// ```
/// use twine::{format_value, Value};
///
/// assert_eq!(format_value(&Value::from(42), "04d").unwrap(), "0042");
/// assert_eq!(format_value(&Value::from("hi"), ">4").unwrap(), "  hi");
/// ```
pub fn format_value(value: &Value, source: &str) -> Result<String, Error> {
    let spec = Spec::parse(source)?;

    match value {
        Value::Data(Json::String(text)) => format_str(text, &spec),
        Value::Data(Json::Number(number)) => {
            if let Some(i) = number.as_i64() {
                format_int(i as i128, &spec)
            } else if let Some(u) = number.as_u64() {
                format_int(u as i128, &spec)
            } else {
                format_float(number.as_f64().expect("number must be f64"), &spec)
            }
        }
        Value::Data(Json::Bool(b)) => match spec.kind {
            None => Ok(pad(b.to_string(), &spec, Align::Left)),
            Some('d') => format_int(*b as i128, &spec),
            Some(kind) => Err(error_bad_code(kind, "boolean")),
        },
        Value::Data(data) => match spec.kind {
            None => {
                let mut buffer = String::new();
                Pipe::new(&mut buffer)
                    .write_data(data)
                    .expect("writing to a string should not fail");
                Ok(pad(buffer, &spec, Align::Left))
            }
            Some(kind) => Err(error_bad_code(kind, value.kind_name())),
        },
        Value::Element(element) => match spec.kind {
            None | Some('s') => Ok(pad(element.to_string(), &spec, Align::Left)),
            Some(kind) => Err(error_bad_code(kind, "element")),
        },
        Value::Map(map) => match spec.kind {
            None => Ok(pad(map.to_string(), &spec, Align::Left)),
            Some(kind) => Err(error_bad_code(kind, "mapping")),
        },
        Value::Template(_) => Err(Error::build(
            ErrorKind::Type,
            "a template value cannot be formatted",
        )
        .with_help("render the inner template first")),
        Value::Lazy(_) | Value::Future(_) | Value::Component(_) => Err(Error::build(
            ErrorKind::Type,
            "an unresolved callable cannot be formatted",
        )
        .with_help("resolve it with `aformat` or `format_some`")),
    }
}

fn error_bad_code(kind: char, value_kind: &str) -> Error {
    Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
        .with_help(format!("format code `{kind}` is not valid for a {value_kind} value"))
}

fn format_str(text: &str, spec: &Spec) -> Result<String, Error> {
    match spec.kind {
        None | Some('s') => {}
        Some(kind) => return Err(error_bad_code(kind, "string")),
    }
    if spec.sign.is_some() || spec.alternate || spec.grouping.is_some() {
        return Err(Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
            .with_help("sign, `#` and grouping do not apply to string values"));
    }

    let truncated: String = match spec.precision {
        Some(precision) => text.chars().take(precision).collect(),
        None => text.to_owned(),
    };

    Ok(pad(truncated, spec, Align::Left))
}

fn format_int(value: i128, spec: &Spec) -> Result<String, Error> {
    let kind = spec.kind.unwrap_or('d');

    match kind {
        'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%' => return format_float(value as f64, spec),
        'c' => {
            if spec.precision.is_some() {
                return Err(Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
                    .with_help("precision does not apply to integer format codes"));
            }
            let c = u32::try_from(value)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
                        .with_help(format!("`{value}` is not a valid character code"))
                })?;
            return Ok(pad(c.to_string(), spec, Align::Left));
        }
        'b' | 'd' | 'o' | 'x' | 'X' => {}
        other => return Err(error_bad_code(other, "integer")),
    }

    if spec.precision.is_some() {
        return Err(Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
            .with_help("precision does not apply to integer format codes"));
    }
    if spec.grouping == Some(',') && kind != 'd' {
        return Err(Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
            .with_help(format!("grouping `,` is not valid with format code `{kind}`")));
    }

    let magnitude = value.unsigned_abs();
    let digits = match kind {
        'b' => format!("{magnitude:b}"),
        'o' => format!("{magnitude:o}"),
        'x' => format!("{magnitude:x}"),
        'X' => format!("{magnitude:X}"),
        _ => magnitude.to_string(),
    };
    let digits = match spec.grouping {
        Some(separator) => {
            let group = if kind == 'd' { 3 } else { 4 };
            group_digits(&digits, separator, group)
        }
        None => digits,
    };

    let sign = sign_text(value < 0, spec);
    let prefix = if spec.alternate {
        match kind {
            'b' => "0b",
            'o' => "0o",
            'x' => "0x",
            'X' => "0X",
            _ => "",
        }
    } else {
        ""
    };

    Ok(pad_number(sign, prefix, digits, spec))
}

fn format_float(value: f64, spec: &Spec) -> Result<String, Error> {
    let kind = spec.kind.unwrap_or(' ');
    if let 'b' | 'c' | 'd' | 'o' | 's' | 'x' | 'X' = kind {
        return Err(error_bad_code(kind, "float"));
    }
    if spec.grouping == Some(',') && !matches!(kind, ' ' | 'f' | 'F' | '%') {
        return Err(Error::build(ErrorKind::Format, INVALID_FORMAT_SPEC)
            .with_help(format!("grouping `,` is not valid with format code `{kind}`")));
    }

    let negative = value.is_sign_negative() && !value.is_nan();
    let magnitude = value.abs();
    let upper = matches!(kind, 'E' | 'F' | 'G');

    let digits = if !magnitude.is_finite() {
        let text = if magnitude.is_nan() { "nan" } else { "inf" };
        if upper {
            text.to_uppercase()
        } else {
            text.to_string()
        }
    } else {
        match kind {
            'f' | 'F' => fixed(magnitude, spec.precision.unwrap_or(6), spec.grouping),
            '%' => {
                let mut text = fixed(magnitude * 100.0, spec.precision.unwrap_or(6), spec.grouping);
                text.push('%');
                text
            }
            'e' | 'E' => scientific(magnitude, spec.precision.unwrap_or(6), upper),
            'g' | 'G' => general(magnitude, spec.precision.unwrap_or(6).max(1), upper),
            _ => {
                // No format code: the shortest display form, which keeps a
                // trailing `.0` on whole numbers.
                let text = Json::from(magnitude).to_string();
                match spec.grouping {
                    Some(separator) => group_fixed(&text, separator),
                    None => text,
                }
            }
        }
    };

    let sign = sign_text(negative, spec);

    Ok(pad_number(sign, "", digits, spec))
}

/// Render a fixed-point decimal with the given precision, grouping the
/// integer digits when a separator is present.
fn fixed(value: f64, precision: usize, grouping: Option<char>) -> String {
    let text = format!("{value:.precision$}");
    match grouping {
        Some(separator) => group_fixed(&text, separator),
        None => text,
    }
}

/// Render scientific notation with a sign-carrying two digit exponent.
fn scientific(value: f64, precision: usize, upper: bool) -> String {
    let text = format!("{value:.precision$e}");
    let (mantissa, exponent) = text
        .split_once('e')
        .expect("scientific form must contain an exponent");
    let exponent: i32 = exponent.parse().expect("exponent must be an integer");
    let e = if upper { 'E' } else { 'e' };
    let sign = if exponent < 0 { '-' } else { '+' };

    format!("{mantissa}{e}{sign}{:02}", exponent.abs())
}

/// Render general form: fixed for moderate exponents, scientific
/// otherwise, trailing zeros removed.
fn general(value: f64, precision: usize, upper: bool) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let exponent = value.abs().log10().floor() as i32;
    if exponent >= -4 && (exponent as i64) < precision as i64 {
        let decimals = (precision as i64 - 1 - exponent as i64).max(0) as usize;
        let text = format!("{value:.decimals$}");
        trim_zeros(text)
    } else {
        let text = scientific(value, precision.saturating_sub(1), upper);
        let (mantissa, exponent) = text
            .split_once(if upper { 'E' } else { 'e' })
            .expect("scientific form must contain an exponent");
        let mantissa = trim_zeros(mantissa.to_string());
        let e = if upper { 'E' } else { 'e' };
        format!("{mantissa}{e}{exponent}")
    }
}

fn trim_zeros(text: String) -> String {
    if !text.contains('.') {
        return text;
    }
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

/// Insert a separator into the integer digits of a fixed-point string.
fn group_fixed(text: &str, separator: char) -> String {
    match text.split_once('.') {
        Some((integer, fraction)) => {
            format!("{}.{fraction}", group_digits(integer, separator, 3))
        }
        None => group_digits(text, separator, 3),
    }
}

/// Insert a separator every `group` digits, counting from the right.
fn group_digits(digits: &str, separator: char, group: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / group);

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % group == 0 {
            grouped.push(separator);
        }
        grouped.push(*c);
    }

    grouped
}

fn sign_text(negative: bool, spec: &Spec) -> &'static str {
    if negative {
        "-"
    } else {
        match spec.sign {
            Some('+') => "+",
            Some(' ') => " ",
            _ => "",
        }
    }
}

/// Assemble a number from sign, radix prefix and digits, then pad to
/// width. `=` alignment pads between the prefix and the digits.
fn pad_number(sign: &str, prefix: &str, digits: String, spec: &Spec) -> String {
    let assembled = format!("{sign}{prefix}{digits}");
    let width = match spec.width {
        Some(width) => width,
        None => return assembled,
    };
    let length = assembled.chars().count();
    if length >= width {
        return assembled;
    }

    let missing = width - length;
    match spec.align.unwrap_or(Align::Right) {
        Align::AfterSign => {
            let padding: String = std::iter::repeat(spec.fill).take(missing).collect();
            format!("{sign}{prefix}{padding}{digits}")
        }
        _ => pad(assembled, spec, Align::Right),
    }
}

/// Pad text to the spec width with the spec fill and alignment.
fn pad(text: String, spec: &Spec, default_align: Align) -> String {
    let width = match spec.width {
        Some(width) => width,
        None => return text,
    };
    let length = text.chars().count();
    if length >= width {
        return text;
    }

    let missing = width - length;
    let align = match spec.align.unwrap_or(default_align) {
        Align::AfterSign => Align::Right,
        align => align,
    };
    let fill = |n: usize| -> String { std::iter::repeat(spec.fill).take(n).collect() };

    match align {
        Align::Left => format!("{text}{}", fill(missing)),
        Align::Right | Align::AfterSign => format!("{}{text}", fill(missing)),
        Align::Center => {
            let before = missing / 2;
            format!("{}{text}{}", fill(before), fill(missing - before))
        }
    }
}
