use crate::{
    log::{error_unknown_conversion, Error, ErrorKind},
    pipe::Pipe,
    value::Value,
};
use std::{fmt::Display, hash::Hasher, ops::Add, str::FromStr};

/// A pre-formatting transform applied to an interpolation value.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Conversion {
    /// Literal rendering with every non-ASCII character escaped.
    Ascii,
    /// Literal rendering, strings quoted and escaped.
    Repr,
    /// Plain string coercion.
    Str,
}

impl Conversion {
    /// Apply this conversion to the given value, producing a string value.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the type kind when the value has no
    /// converted form, such as an unresolved callable.
    pub fn convert(&self, value: &Value) -> Result<Value, Error> {
        let text = match self {
            Conversion::Ascii => value.ascii()?,
            Conversion::Repr => value.repr()?,
            Conversion::Str => match value {
                Value::Data(data) => {
                    let mut buffer = String::new();
                    Pipe::new(&mut buffer)
                        .write_data(data)
                        .expect("writing to a string should not fail");
                    buffer
                }
                Value::Element(element) => element.to_string(),
                other => {
                    return Err(Error::build(
                        ErrorKind::Type,
                        format!("a {} value has no string form", other.kind_name()),
                    ))
                }
            },
        };

        Ok(Value::from(text))
    }
}

impl FromStr for Conversion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Conversion::Ascii),
            "r" => Ok(Conversion::Repr),
            "s" => Ok(Conversion::Str),
            other => Err(error_unknown_conversion(other)),
        }
    }
}

impl Display for Conversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conversion::Ascii => write!(f, "a"),
            Conversion::Repr => write!(f, "r"),
            Conversion::Str => write!(f, "s"),
        }
    }
}

/// One embedded-expression site within a [`Template`].
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    /// The computed value of the expression.
    pub value: Value,
    /// The source text of the expression as written.
    ///
    /// Kept for diagnostics and structured logging keys, never re-evaluated.
    pub expression: String,
    /// The conversion applied before formatting, if any.
    pub conversion: Option<Conversion>,
    /// The format spec passed to the formatting routine.
    pub format_spec: String,
}

impl Interpolation {
    /// Create a new [`Interpolation`] with no conversion and an empty
    /// format spec.
    pub fn new<V, T>(value: V, expression: T) -> Self
    where
        V: Into<Value>,
        T: Into<String>,
    {
        Self {
            value: value.into(),
            expression: expression.into(),
            conversion: None,
            format_spec: String::new(),
        }
    }

    /// Set the conversion.
    ///
    /// Returns the [`Interpolation`], so additional methods may be chained.
    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = Some(conversion);

        self
    }

    /// Set the format spec.
    ///
    /// Returns the [`Interpolation`], so additional methods may be chained.
    pub fn with_format_spec<T>(mut self, format_spec: T) -> Self
    where
        T: Into<String>,
    {
        self.format_spec = format_spec.into();

        self
    }
}

/// One part of a [`Template`]: a literal run of text, or an interpolation.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// A literal run of text, possibly empty.
    Literal(String),
    /// An embedded-expression site.
    Interpolation(Interpolation),
}

/// An ordered sequence of literal text and [`Interpolation`] instances.
///
/// The part sequence is canonical: it has odd length, begins and ends with
/// a literal (possibly empty), and literals and interpolations strictly
/// alternate. The constructor repairs any sequence that violates this,
/// merging adjacent literals and synthesizing empty literals around
/// interpolations.
///
/// # Examples
///
/// ```
/// use twine::{t, f};
///
/// let name = "world";
/// let template = t!("Hello, ", {name}, "!");
///
/// assert_eq!(f(&template).unwrap(), "Hello, world!");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// The canonical alternating part sequence.
    parts: Vec<Part>,
}

impl Template {
    /// Create a new [`Template`] from the given parts.
    ///
    /// The parts are repaired into canonical form.
    ///
    /// # Examples
    ///
    /// ```
    /// use twine::{Interpolation, Part, Template};
    ///
    /// let template = Template::new(vec![
    ///     Part::Interpolation(Interpolation::new(42, "42")),
    /// ]);
    ///
    /// // Empty literals are synthesized around the interpolation.
    /// assert_eq!(template.parts().len(), 3);
    /// ```
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            parts: interleave(parts),
        }
    }

    /// Create a new [`Template`] containing a single literal.
    pub fn literal<T>(text: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            parts: vec![Part::Literal(text.into())],
        }
    }

    /// Return the canonical part sequence.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Return an iterator over the interpolations, in template order.
    pub fn interpolations(&self) -> impl Iterator<Item = &Interpolation> {
        self.parts.iter().filter_map(|part| match part {
            Part::Interpolation(interpolation) => Some(interpolation),
            Part::Literal(_) => None,
        })
    }

    /// Feed this template to the given [`Hasher`].
    ///
    /// Defined only when every interpolation value is hashable; a template
    /// holding an unhashable value fails the same way the value would.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the type kind when an interpolation value
    /// is unhashable.
    pub fn try_hash<H>(&self, state: &mut H) -> Result<(), Error>
    where
        H: Hasher,
    {
        state.write_usize(self.parts.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => {
                    state.write_u8(0);
                    state.write(text.as_bytes());
                }
                Part::Interpolation(interpolation) => {
                    state.write_u8(1);
                    interpolation.value.try_hash(state)?;
                    state.write(interpolation.expression.as_bytes());
                    match interpolation.conversion {
                        None => state.write_u8(0),
                        Some(Conversion::Ascii) => state.write_u8(1),
                        Some(Conversion::Repr) => state.write_u8(2),
                        Some(Conversion::Str) => state.write_u8(3),
                    }
                    state.write(interpolation.format_spec.as_bytes());
                }
            }
        }

        Ok(())
    }
}

/// Repair a part sequence into canonical alternating form.
///
/// Adjacent literals merge, a missing literal between or around
/// interpolations becomes `""`, and the result always has odd length.
fn interleave(parts: Vec<Part>) -> Vec<Part> {
    let mut repaired: Vec<Part> = Vec::with_capacity(parts.len() + 2);
    let mut last_was_literal = false;

    for part in parts {
        match part {
            Part::Literal(text) => {
                if last_was_literal {
                    match repaired.last_mut() {
                        Some(Part::Literal(previous)) => previous.push_str(&text),
                        _ => unreachable!("last part must be a literal"),
                    }
                } else {
                    repaired.push(Part::Literal(text));
                    last_was_literal = true;
                }
            }
            Part::Interpolation(interpolation) => {
                if !last_was_literal {
                    repaired.push(Part::Literal(String::new()));
                }
                repaired.push(Part::Interpolation(interpolation));
                last_was_literal = false;
            }
        }
    }

    if !last_was_literal {
        repaired.push(Part::Literal(String::new()));
    }

    debug_assert!(repaired.len() % 2 == 1);

    repaired
}

impl Add<&str> for Template {
    type Output = Template;

    fn add(mut self, other: &str) -> Template {
        match self.parts.last_mut() {
            Some(Part::Literal(text)) => text.push_str(other),
            _ => unreachable!("canonical templates end with a literal"),
        }

        self
    }
}

impl Add<String> for Template {
    type Output = Template;

    fn add(self, other: String) -> Template {
        self + other.as_str()
    }
}

impl Add<Template> for Template {
    type Output = Template;

    fn add(mut self, other: Template) -> Template {
        self.parts.extend(other.parts);

        Template::new(self.parts)
    }
}

impl Add<Template> for &str {
    type Output = Template;

    fn add(self, mut other: Template) -> Template {
        match other.parts.first_mut() {
            Some(Part::Literal(text)) => text.insert_str(0, self),
            _ => unreachable!("canonical templates begin with a literal"),
        }

        other
    }
}

impl Add<Template> for String {
    type Output = Template;

    fn add(self, other: Template) -> Template {
        self.as_str() + other
    }
}

/// Construct a [`Template`] from literal segments and interpolations.
///
/// Literal string segments are written as-is; an interpolation is written
/// in braces, capturing the expression's source text. A conversion is
/// attached with `=>` and a format spec with `;`:
///
/// ```
/// use twine::{t, f};
///
/// let name = "world";
/// let template = t!("Hello, ", {name}, "!");
/// assert_eq!(f(&template).unwrap(), "Hello, world!");
///
/// let fancy = t!("pi is ", {3.14159 ; ".2f"});
/// assert_eq!(f(&fancy).unwrap(), "pi is 3.14");
///
/// let quoted = t!({name => r});
/// assert_eq!(f(&quoted).unwrap(), "\"world\"");
/// ```
///
/// Raw literal segments (`r"..."`) pass backslash sequences through
/// uninterpreted, as any Rust raw string does.
#[macro_export]
macro_rules! t {
    () => { $crate::Template::literal("") };
    ($($part:tt)*) => {{
        let mut parts: ::std::vec::Vec<$crate::Part> = ::std::vec::Vec::new();
        $crate::t_parts!(parts; $($part)*);
        $crate::Template::new(parts)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! t_parts {
    ($parts:ident;) => {};
    ($parts:ident; $text:literal $(, $($rest:tt)*)?) => {
        $parts.push($crate::Part::Literal(::std::string::String::from($text)));
        $($crate::t_parts!($parts; $($rest)*);)?
    };
    ($parts:ident; { $e:expr } $(, $($rest:tt)*)?) => {
        $parts.push($crate::Part::Interpolation(
            $crate::Interpolation::new($e, stringify!($e)),
        ));
        $($crate::t_parts!($parts; $($rest)*);)?
    };
    ($parts:ident; { $e:expr => $conv:ident } $(, $($rest:tt)*)?) => {
        $parts.push($crate::Part::Interpolation(
            $crate::Interpolation::new($e, stringify!($e))
                .with_conversion($crate::t_conv!($conv)),
        ));
        $($crate::t_parts!($parts; $($rest)*);)?
    };
    ($parts:ident; { $e:expr ; $spec:literal } $(, $($rest:tt)*)?) => {
        $parts.push($crate::Part::Interpolation(
            $crate::Interpolation::new($e, stringify!($e)).with_format_spec($spec),
        ));
        $($crate::t_parts!($parts; $($rest)*);)?
    };
    ($parts:ident; { $e:expr => $conv:ident ; $spec:literal } $(, $($rest:tt)*)?) => {
        $parts.push($crate::Part::Interpolation(
            $crate::Interpolation::new($e, stringify!($e))
                .with_conversion($crate::t_conv!($conv))
                .with_format_spec($spec),
        ));
        $($crate::t_parts!($parts; $($rest)*);)?
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! t_conv {
    (a) => {
        $crate::Conversion::Ascii
    };
    (r) => {
        $crate::Conversion::Repr
    };
    (s) => {
        $crate::Conversion::Str
    };
}
