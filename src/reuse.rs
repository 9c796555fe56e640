use crate::{
    log::{error_missing_keyword, Error, ErrorKind},
    spec::format_value,
    store::Store,
    template::{Interpolation, Part, Template},
    value::Value,
};
use std::borrow::Cow;

/// Check that every interpolation value in the template is a string.
///
/// The strings serve as names to be resolved later, not as content.
fn ensure_names(template: &Template) -> Result<(), Error> {
    for interpolation in template.interpolations() {
        if interpolation.value.as_str().is_none() {
            return Err(Error::build(ErrorKind::Value, "non-string interpolation")
                .with_help(format!(
                    "a reusable template's interpolation values are names, \
                    found a {} in `{}`",
                    interpolation.value.kind_name(),
                    interpolation.expression,
                )));
        }
    }

    Ok(())
}

/// Resolve the name held by a validated interpolation against the store.
fn resolve<'store>(
    interpolation: &Interpolation,
    store: &'store Store,
) -> Result<&'store Value, Error> {
    let name = interpolation
        .value
        .as_str()
        .expect("interpolation values are validated at construction");

    store.get(name).ok_or_else(|| error_missing_keyword(name))
}

/// A reusable template whose interpolation values are names, rendered
/// many times against different stores.
///
/// # Examples
///
/// ```
/// use twine::{t, Formatter, Store};
///
/// let greeting = Formatter::new(t!("Hello, ", {"name"}, "!")).unwrap();
///
/// let store = Store::new().with_must("name", "world");
/// assert_eq!(greeting.format(&store).unwrap(), "Hello, world!");
///
/// let store = Store::new().with_must("name", "again");
/// assert_eq!(greeting.format(&store).unwrap(), "Hello, again!");
/// ```
pub struct Formatter {
    template: Template,
}

impl Formatter {
    /// Create a new [`Formatter`] over the given template.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the value kind when an interpolation value
    /// is not a string.
    pub fn new(template: Template) -> Result<Self, Error> {
        ensure_names(&template)?;

        Ok(Self { template })
    }

    /// Render the template, resolving each interpolation's name against
    /// the given store.
    ///
    /// The original conversion and format spec of each interpolation are
    /// applied to the resolved value.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the key kind when a name is missing from
    /// the store, and propagates conversion and formatting errors.
    pub fn format(&self, store: &Store) -> Result<String, Error> {
        let mut buffer = String::new();

        for part in self.template.parts() {
            match part {
                Part::Literal(text) => buffer.push_str(text),
                Part::Interpolation(interpolation) => {
                    let resolved = resolve(interpolation, store)?;
                    let converted: Cow<Value> = match interpolation.conversion {
                        Some(conversion) => Cow::Owned(conversion.convert(resolved)?),
                        None => Cow::Borrowed(resolved),
                    };
                    buffer.push_str(&format_value(&converted, &interpolation.format_spec)?);
                }
            }
        }

        Ok(buffer)
    }
}

/// Like [`Formatter`], but materializes a bound [`Template`] instead of
/// rendering, so the result can be re-rendered or compared later.
///
/// # Examples
///
/// ```
/// use twine::{t, f, Binder, Store};
///
/// let binder = Binder::new(t!("Hello, ", {"name"}, "!")).unwrap();
/// let bound = binder.bind(&Store::new().with_must("name", "world")).unwrap();
///
/// assert_eq!(f(&bound).unwrap(), "Hello, world!");
/// ```
pub struct Binder {
    template: Template,
}

impl Binder {
    /// Create a new [`Binder`] over the given template.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the value kind when an interpolation value
    /// is not a string.
    pub fn new(template: Template) -> Result<Self, Error> {
        ensure_names(&template)?;

        Ok(Self { template })
    }

    /// Produce a new [`Template`] with each name replaced by its resolved
    /// value from the store.
    ///
    /// Conversions and format specs carry over; each expression is
    /// regenerated from the resolved value's literal representation.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the key kind when a name is missing from
    /// the store.
    pub fn bind(&self, store: &Store) -> Result<Template, Error> {
        let mut parts = Vec::with_capacity(self.template.parts().len());

        for part in self.template.parts() {
            match part {
                Part::Literal(text) => parts.push(Part::Literal(text.clone())),
                Part::Interpolation(interpolation) => {
                    let resolved = resolve(interpolation, store)?.clone();
                    let expression = resolved
                        .repr()
                        .unwrap_or_else(|_| format!("<{}>", resolved.kind_name()));

                    let mut bound = Interpolation::new(resolved, expression)
                        .with_format_spec(interpolation.format_spec.clone());
                    bound.conversion = interpolation.conversion;
                    parts.push(Part::Interpolation(bound));
                }
            }
        }

        Ok(Template::new(parts))
    }
}
