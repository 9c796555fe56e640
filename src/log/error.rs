use super::{Pointer, RED, RESET};
use crate::{log::Visual, region::Region};
use std::fmt::{Debug, Display, Formatter, Result};

/// Families of failure that an [`Error`] may describe.
///
/// The kind tells a caller *what sort* of thing went wrong, independent
/// of the reason text, so it can be matched on without string comparison.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ErrorKind {
    /// An invalid value: a bad conversion tag, a numbering-mode switch,
    /// a non-callable interpolation where a callable is required.
    Value,
    /// A missing keyword argument or name lookup.
    Key,
    /// A positional argument index out of range.
    Index,
    /// A value of the wrong type: an unhashable interpolation value, an
    /// unresolved callable where data is required.
    Type,
    /// A format spec that does not apply to the value it was given.
    Format,
    /// A failure while parsing an HTML template.
    HtmlParse,
    /// A recognized construct that the parser in use does not support.
    NotImplemented,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ErrorKind::Value => write!(f, "value"),
            ErrorKind::Key => write!(f, "key"),
            ErrorKind::Index => write!(f, "index"),
            ErrorKind::Type => write!(f, "type"),
            ErrorKind::Format => write!(f, "format"),
            ErrorKind::HtmlParse => write!(f, "html parse"),
            ErrorKind::NotImplemented => write!(f, "not implemented"),
        }
    }
}

/// Describes an error, and allows adding a contextual help text and visualization.
///
/// # Examples
///
/// Creating an [`Error`] that includes a [`Visual`] of type [`Pointer`]:
///
/// ```
/// use twine::{Error, ErrorKind, Region};
///
/// Error::build(ErrorKind::Value, "unknown conversion specifier")
///     .with_pointer("Hello, {name!z}!", Region::new(13..14))
///     .with_name("greeting")
///     .with_help(r#"expected one of "a", "r", "s""#);
/// ```
///
/// When printed with `println!("{:#}", error)` the [`Error`] produces this output:
///
/// ```text
/// error: unknown conversion specifier
///   --> greeting:1:14
///    |
///  1 | Hello, {name!z}!
///    |              ^
///    |
///   = help: expected one of "a", "r", "s"
/// ```
pub struct Error {
    /// The family of failure this [`Error`] belongs to.
    kind: ErrorKind,
    /// Describes the cause of the [`Error`].
    reason: String,
    /// A visualization to help illustrate the [`Error`].
    visual: Option<Box<dyn Visual>>,
    /// Additional information to display with the [`Error`].
    help: Option<String>,
    /// The name of the template or source that the [`Error`] comes from.
    name: Option<String>,
}

impl Error {
    /// Create a new [`Error`] with the given kind and reason text.
    ///
    /// The additional fields may be populated using the various methods
    /// defined on `Error`.
    ///
    /// # Examples
    ///
    /// ```
    /// use twine::{Error, ErrorKind};
    ///
    /// Error::build(ErrorKind::Key, "missing keyword argument")
    ///     .with_help("pass `name` in the store");
    /// ```
    pub fn build<T>(kind: ErrorKind, reason: T) -> Self
    where
        T: Into<String>,
    {
        Error {
            kind,
            reason: reason.into(),
            name: None,
            visual: None,
            help: None,
        }
    }

    /// Set the name text, which identifies the template or source text
    /// that the [`Error`] is related to.
    pub fn with_name<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.name = Some(text.into());

        self
    }

    /// Set the [`Visual`], which is a visualization that helps illustrate the
    /// cause of the error.
    pub fn with_visual(mut self, visual: impl Visual + 'static) -> Self {
        self.visual = Some(Box::new(visual));

        self
    }

    /// Set the visualization to a new [`Pointer`] with the given source text and
    /// [`Region`].
    pub fn with_pointer<T>(mut self, source: &str, region: T) -> Self
    where
        T: Into<Region>,
    {
        self.visual = Some(Box::new(Pointer::new(source, region.into())));

        self
    }

    /// Set the help text, which is contextual information to accompany the
    /// reason text.
    pub fn with_help<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.help = Some(text.into());

        self
    }

    /// Return the kind of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return the reason text.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Return the name of the template or source that the error is related to.
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if !f.alternate() {
            writeln!(f, "{self:#}")?;
        }
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .field("name", &self.name)
            .field("visual", &self.visual)
            .field("help", &self.help)
            .finish()?;

        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let header = format!("{RED}error{RESET}");
        write!(f, "{header}: {}", self.reason)?;

        if self.visual.is_some() && f.alternate() {
            return self.visual.as_ref().unwrap().display(
                f,
                self.name.as_deref(),
                self.help.as_deref(),
            );
        }

        Ok(())
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.reason == other.reason
            && self.help == other.help
            && self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn test_kind_survives_building() {
        let error = Error::build(ErrorKind::Index, "replacement index out of range")
            .with_help("only 2 positional arguments were given");

        assert_eq!(error.kind(), ErrorKind::Index);
        assert_eq!(error.reason(), "replacement index out of range");
    }

    #[test]
    fn test_equality_ignores_visual() {
        let one = Error::build(ErrorKind::Value, "unknown conversion specifier")
            .with_pointer("{x!z}", 3..4);
        let two = Error::build(ErrorKind::Value, "unknown conversion specifier");

        assert_eq!(one, two);
    }

    #[test]
    fn test_equality_respects_kind() {
        let one = Error::build(ErrorKind::Value, "boom");
        let two = Error::build(ErrorKind::Type, "boom");

        assert_ne!(one, two);
    }
}
