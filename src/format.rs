//! Parser for old-style `{field}` format strings.
//!
//! Takes a format string written for classic positional/keyword
//! substitution and converts it, together with its arguments, into an
//! equivalent [`Template`], so the one set of renderers serves both
//! surfaces.

use crate::{
    log::{
        error_index_out_of_range, error_missing_keyword, Error, ErrorKind, MIXED_NUMBERING,
        UNEXPECTED_EOF,
    },
    region::Region,
    spec::format_value,
    store::Store,
    template::{Conversion, Interpolation, Part, Template},
    value::Value,
};
use serde_json::Value as Json;
use unicode_ident::{is_xid_continue, is_xid_start};

/// Parse a format string using `{field}` placeholder syntax into an
/// equivalent [`Template`].
///
/// The field grammar is
/// `key [ '.' name | '[' index ']' ]* ['!' conv] [':' spec]`: an empty
/// key auto-numbers into `args`, a number indexes `args` explicitly, and
/// anything else looks up the `store`. Access suffixes are applied left
/// to right against the resolved base value. `{{` and `}}` escape
/// literal braces. A spec may itself contain `{...}` placeholders, which
/// are resolved against the same arguments before the spec is attached.
///
/// A format string may use automatic or explicit numbering, never both.
///
/// # Errors
///
/// Returns an [`Error`] of the value kind for an unknown conversion tag
/// or a numbering-mode switch, the index kind for an out-of-range
/// positional, and the key kind for a missing keyword.
///
/// # Examples
///
/// ```
/// use twine::{from_format, f, Store, Value};
///
/// let template = from_format(
///     "Hello, {}! You have {count:03d} messages.",
///     &[Value::from("world")],
///     &Store::new().with_must("count", 7),
/// )
/// .unwrap();
///
/// assert_eq!(f(&template).unwrap(), "Hello, world! You have 007 messages.");
/// ```
pub fn from_format(fmt: &str, args: &[Value], store: &Store) -> Result<Template, Error> {
    Scanner::new(fmt, args, store).scan()
}

/// The numbering mode a format string has committed to.
#[derive(Debug, PartialEq, Copy, Clone)]
enum Numbering {
    Auto,
    Manual,
}

/// One access suffix applied to a resolved base value.
enum Access {
    Attr(String),
    Index(usize),
    Key(String),
}

struct Scanner<'source, 'values> {
    /// The format string being scanned.
    source: &'source str,
    /// Positional arguments.
    args: &'values [Value],
    /// Keyword arguments.
    store: &'values Store,
    /// Position within source.
    cursor: usize,
    /// Set once the first field resolves, and never switched after.
    numbering: Option<Numbering>,
    /// The next automatic index.
    next_index: usize,
}

impl<'source, 'values> Scanner<'source, 'values> {
    fn new(source: &'source str, args: &'values [Value], store: &'values Store) -> Self {
        Self {
            source,
            args,
            store,
            cursor: 0,
            numbering: None,
            next_index: 0,
        }
    }

    fn scan(mut self) -> Result<Template, Error> {
        let mut parts = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.peek() {
            match c {
                '{' if self.peek_second() == Some('{') => {
                    literal.push('{');
                    self.cursor += 2;
                }
                '}' if self.peek_second() == Some('}') => {
                    literal.push('}');
                    self.cursor += 2;
                }
                '{' => {
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    let interpolation = self.scan_field()?;
                    parts.push(Part::Interpolation(interpolation));
                }
                '}' => {
                    return Err(Error::build(
                        ErrorKind::Value,
                        "single `}` encountered in format string",
                    )
                    .with_pointer(self.source, self.cursor..self.cursor + 1)
                    .with_help("escape a literal brace by doubling it: `}}`"));
                }
                _ => {
                    literal.push(c);
                    self.cursor += c.len_utf8();
                }
            }
        }

        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Template::new(parts))
    }

    /// Scan one `{field}`, with the cursor on the opening brace.
    fn scan_field(&mut self) -> Result<Interpolation, Error> {
        let begin = self.cursor;
        self.cursor += 1;

        let key = self.take_until(&['.', '[', '!', ':', '}']);
        let key_region = Region::new(begin + 1..self.cursor);
        let (mut value, mut expression) = self.resolve_base(&key, key_region)?;

        while let Some(c @ ('.' | '[')) = self.peek() {
            let suffix_begin = self.cursor;
            let access = if c == '.' {
                self.cursor += 1;
                let name = self.take_until(&['.', '[', '!', ':', '}']);
                let region = Region::new(suffix_begin..self.cursor);
                if name.is_empty() || !is_identifier(&name) {
                    return Err(Error::build(ErrorKind::Value, "invalid attribute name")
                        .with_pointer(self.source, region)
                        .with_help("an attribute access needs an identifier after `.`"));
                }
                expression.push('.');
                expression.push_str(&name);
                Access::Attr(name)
            } else {
                self.cursor += 1;
                let inner = self.take_until(&['}', ']']);
                if self.peek() != Some(']') {
                    return Err(Error::build(ErrorKind::Value, "unterminated index in field")
                        .with_pointer(self.source, suffix_begin..self.cursor)
                        .with_help("close the item access with `]`"));
                }
                self.cursor += 1;
                let region = Region::new(suffix_begin..self.cursor);
                if inner.is_empty() {
                    return Err(Error::build(ErrorKind::Value, "empty index in field")
                        .with_pointer(self.source, region)
                        .with_help("an item access needs an index or key between `[` and `]`"));
                }
                expression.push('[');
                expression.push_str(&inner);
                expression.push(']');
                match inner.parse::<usize>() {
                    Ok(index) => Access::Index(index),
                    Err(_) => Access::Key(inner),
                }
            };

            let region = Region::new(suffix_begin..self.cursor);
            value = apply_access(&value, &access, self.source, region)?;
        }

        let conversion = if self.peek() == Some('!') {
            let conv_begin = self.cursor + 1;
            self.cursor += 1;
            let tag = self.take_until(&[':', '}']);
            let region = Region::new(conv_begin..self.cursor);
            Some(
                tag.parse::<Conversion>()
                    .map_err(|e| e.with_pointer(self.source, region))?,
            )
        } else {
            None
        };

        let format_spec = if self.peek() == Some(':') {
            self.cursor += 1;
            self.scan_spec()?
        } else {
            String::new()
        };

        if self.peek() != Some('}') {
            return Err(self.error_eof());
        }
        self.cursor += 1;

        let mut interpolation = Interpolation::new(value, expression).with_format_spec(format_spec);
        interpolation.conversion = conversion;

        Ok(interpolation)
    }

    /// Scan a format spec, resolving any nested `{...}` placeholder
    /// against the same arguments.
    fn scan_spec(&mut self) -> Result<String, Error> {
        let mut spec = String::new();

        loop {
            match self.peek() {
                Some('}') => return Ok(spec),
                Some('{') => {
                    let begin = self.cursor;
                    self.cursor += 1;
                    let key = self.take_until(&['.', '[', '}']);
                    let key_region = Region::new(begin + 1..self.cursor);
                    let (mut value, _) = self.resolve_base(&key, key_region)?;

                    while let Some(c @ ('.' | '[')) = self.peek() {
                        let suffix_begin = self.cursor;
                        let access = if c == '.' {
                            self.cursor += 1;
                            let name = self.take_until(&['.', '[', '}']);
                            Access::Attr(name)
                        } else {
                            self.cursor += 1;
                            let inner = self.take_until(&['}', ']']);
                            if self.peek() != Some(']') {
                                return Err(self.error_eof());
                            }
                            self.cursor += 1;
                            match inner.parse::<usize>() {
                                Ok(index) => Access::Index(index),
                                Err(_) => Access::Key(inner),
                            }
                        };
                        let region = Region::new(suffix_begin..self.cursor);
                        value = apply_access(&value, &access, self.source, region)?;
                    }

                    if self.peek() != Some('}') {
                        return Err(self.error_eof());
                    }
                    self.cursor += 1;

                    spec.push_str(&format_value(&value, "")?);
                }
                Some(c) => {
                    spec.push(c);
                    self.cursor += c.len_utf8();
                }
                None => return Err(self.error_eof()),
            }
        }
    }

    /// Resolve a field key into its base value and expression text,
    /// enforcing the numbering-mode invariant.
    fn resolve_base(&mut self, key: &str, region: Region) -> Result<(Value, String), Error> {
        if key.is_empty() {
            if self.numbering == Some(Numbering::Manual) {
                return Err(self.error_mixed_numbering(region));
            }
            self.numbering = Some(Numbering::Auto);
            let index = self.next_index;
            self.next_index += 1;

            let value = self.positional(index, region)?;
            Ok((value, format!("args[{index}]")))
        } else if key.chars().all(|c| c.is_ascii_digit()) {
            if self.numbering == Some(Numbering::Auto) {
                return Err(self.error_mixed_numbering(region));
            }
            self.numbering = Some(Numbering::Manual);
            let index: usize = key.parse().map_err(|_| {
                Error::build(ErrorKind::Index, "replacement index is too large")
                    .with_pointer(self.source, region)
            })?;

            let value = self.positional(index, region)?;
            Ok((value, format!("args[{index}]")))
        } else {
            let value = self.store.get(key).cloned().ok_or_else(|| {
                error_missing_keyword(key).with_pointer(self.source, region)
            })?;
            Ok((value, format!("kwargs['{key}']")))
        }
    }

    fn positional(&self, index: usize, region: Region) -> Result<Value, Error> {
        self.args.get(index).cloned().ok_or_else(|| {
            error_index_out_of_range(index, self.args.len()).with_pointer(self.source, region)
        })
    }

    fn error_mixed_numbering(&self, region: Region) -> Error {
        Error::build(ErrorKind::Value, MIXED_NUMBERING)
            .with_pointer(self.source, region)
            .with_help(
                "a format string commits to one numbering mode with its first indexed field",
            )
    }

    fn error_eof(&self) -> Error {
        let end = self.source.len();
        Error::build(ErrorKind::Value, UNEXPECTED_EOF)
            .with_pointer(self.source, end..end)
            .with_help("did you close every field with `}`?")
    }

    /// Collect characters until one of the given terminators or the end
    /// of source, leaving the cursor on the terminator.
    fn take_until(&mut self, terminators: &[char]) -> String {
        let mut collected = String::new();
        while let Some(c) = self.peek() {
            if terminators.contains(&c) {
                break;
            }
            collected.push(c);
            self.cursor += c.len_utf8();
        }
        collected
    }

    fn peek(&self) -> Option<char> {
        self.source[self.cursor..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.source[self.cursor..].chars().nth(1)
    }
}

/// Apply one access suffix to a value.
fn apply_access(
    value: &Value,
    access: &Access,
    source: &str,
    region: Region,
) -> Result<Value, Error> {
    match access {
        Access::Attr(name) | Access::Key(name) => match value {
            Value::Data(Json::Object(map)) => {
                map.get(name).cloned().map(Value::Data).ok_or_else(|| {
                    Error::build(ErrorKind::Key, "missing key in mapping")
                        .with_pointer(source, region)
                        .with_help(format!("the mapping has no `{name}` entry"))
                })
            }
            other => Err(Error::build(
                ErrorKind::Type,
                format!("cannot access `{name}` on a {} value", other.kind_name()),
            )
            .with_pointer(source, region)),
        },
        Access::Index(index) => match value {
            Value::Data(Json::Array(items)) => {
                items.get(*index).cloned().map(Value::Data).ok_or_else(|| {
                    Error::build(ErrorKind::Index, "sequence index out of range")
                        .with_pointer(source, region)
                        .with_help(format!(
                            "index {index} is out of range for {} items",
                            items.len()
                        ))
                })
            }
            Value::Data(Json::Object(map)) => map
                .get(&index.to_string())
                .cloned()
                .map(Value::Data)
                .ok_or_else(|| {
                    Error::build(ErrorKind::Key, "missing key in mapping")
                        .with_pointer(source, region)
                }),
            other => Err(Error::build(
                ErrorKind::Type,
                format!("cannot index a {} value", other.kind_name()),
            )
            .with_pointer(source, region)),
        },
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if is_xid_start(c) || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| is_xid_continue(c))
}

#[cfg(test)]
mod tests {
    use super::from_format;
    use crate::{
        f,
        log::ErrorKind,
        store::Store,
        template::{Conversion, Part},
        value::Value,
    };

    fn positional(values: &[&str]) -> Vec<Value> {
        values.iter().map(|v| Value::from(*v)).collect()
    }

    #[test]
    fn test_empty() {
        let template = from_format("", &[], &Store::new()).unwrap();

        assert_eq!(template.parts(), &[Part::Literal(String::new())]);
    }

    #[test]
    fn test_literal_only() {
        let template = from_format("Hello!", &[], &Store::new()).unwrap();

        assert_eq!(f(&template).unwrap(), "Hello!");
    }

    #[test]
    fn test_keyword_field() {
        let store = Store::new().with_must("name", "world");
        let template = from_format("Hello, {name}!", &[], &store).unwrap();

        assert_eq!(f(&template).unwrap(), "Hello, world!");
        assert_eq!(
            template.interpolations().next().unwrap().expression,
            "kwargs['name']"
        );
    }

    #[test]
    fn test_auto_numbering() {
        let template =
            from_format("Hello, {}! What {}?", &positional(&["world", "news"]), &Store::new())
                .unwrap();

        assert_eq!(f(&template).unwrap(), "Hello, world! What news?");

        let expressions: Vec<_> = template
            .interpolations()
            .map(|i| i.expression.as_str())
            .collect();
        assert_eq!(expressions, ["args[0]", "args[1]"]);
    }

    #[test]
    fn test_manual_numbering() {
        let template =
            from_format("{1}{0}", &positional(&["world", "hello"]), &Store::new()).unwrap();

        assert_eq!(f(&template).unwrap(), "helloworld");
    }

    #[test]
    fn test_auto_to_manual_is_an_error() {
        let error = from_format("{}{1}", &positional(&["a", "b"]), &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_manual_to_auto_is_an_error() {
        let error = from_format("{1}{}", &positional(&["a", "b"]), &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_conversion_and_spec() {
        let store = Store::new().with_must("name", "world");
        let template = from_format("Hello, {name!r:>10}!", &[], &store).unwrap();
        let interpolation = template.interpolations().next().unwrap();

        assert_eq!(interpolation.conversion, Some(Conversion::Repr));
        assert_eq!(interpolation.format_spec, ">10");
        assert_eq!(f(&template).unwrap(), "Hello,    \"world\"!");
    }

    #[test]
    fn test_unknown_conversion() {
        let store = Store::new().with_must("name", "world");
        let error = from_format("{name!z}", &[], &store).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_conversion_too_many_chars() {
        let store = Store::new().with_must("name", "world");
        let error = from_format("{name!ss}", &[], &store).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_index_out_of_range() {
        let error = from_format("{2}", &positional(&["a"]), &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Index);
    }

    #[test]
    fn test_missing_keyword() {
        let error = from_format("{name}", &[], &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Key);
    }

    #[test]
    fn test_brace_escapes() {
        let template = from_format("{{}} and {{{0}}}", &positional(&["x"]), &Store::new()).unwrap();

        assert_eq!(f(&template).unwrap(), "{} and {x}");
    }

    #[test]
    fn test_single_closing_brace() {
        let error = from_format("oops }", &[], &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_unterminated_field() {
        let error = from_format("{name", &[], &Store::new()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_attribute_access() {
        let store = Store::new().with_must("user", serde_json::json!({"name": "ada"}));
        let template = from_format("{user.name}", &[], &store).unwrap();

        assert_eq!(f(&template).unwrap(), "ada");
        assert_eq!(
            template.interpolations().next().unwrap().expression,
            "kwargs['user'].name"
        );
    }

    #[test]
    fn test_index_access() {
        let args = vec![Value::serialize(vec![10, 20]).unwrap()];
        let template = from_format("{0[1]}", &args, &Store::new()).unwrap();

        assert_eq!(f(&template).unwrap(), "20");
        assert_eq!(
            template.interpolations().next().unwrap().expression,
            "args[0][1]"
        );
    }

    #[test]
    fn test_chained_access() {
        let store = Store::new().with_must(
            "user",
            serde_json::json!({"roles": ["admin", "editor"]}),
        );
        let template = from_format("{user.roles[0]}", &[], &store).unwrap();

        assert_eq!(f(&template).unwrap(), "admin");
    }

    #[test]
    fn test_missing_mapping_key() {
        let store = Store::new().with_must("user", serde_json::json!({}));
        let error = from_format("{user.name}", &[], &store).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Key);
    }

    #[test]
    fn test_nested_spec_auto() {
        let args = vec![Value::from(42), Value::from(".2f")];
        let template = from_format("{:{}}", &args, &Store::new()).unwrap();

        assert_eq!(
            template.interpolations().next().unwrap().format_spec,
            ".2f"
        );
        assert_eq!(f(&template).unwrap(), "42.00");
    }

    #[test]
    fn test_nested_spec_keyword() {
        let store = Store::new().with_must("val", 3.14159).with_must("p", 2);
        let template = from_format("{val:.{p}f}", &[], &store).unwrap();

        assert_eq!(f(&template).unwrap(), "3.14");
    }

    #[test]
    fn test_complex_round_trip() {
        let store = Store::new()
            .with_must("name", "world")
            .with_must("wow", "burrito");
        let args = vec![Value::from(99), Value::from(42), Value::from(76)];
        let template =
            from_format("{}{wow}Hello, {}{name!s:.2}!{:03d}", &args, &store).unwrap();

        assert_eq!(f(&template).unwrap(), "99burritoHello, 42wo!076");
    }
}
