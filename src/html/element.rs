use crate::log::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Escape text for content position: `&`, `<` and `>`.
pub(crate) fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape text for attribute-value position: content escapes plus quotes.
pub(crate) fn escape_attribute(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// The value of one attribute: text, or a boolean presence flag.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A string value, serialized as `key="value"`.
    Text(String),
    /// A presence flag: `Flag(true)` serializes as a bare key,
    /// `Flag(false)` is omitted entirely.
    Flag(bool),
}

/// An insertion-ordered attribute mapping.
///
/// Inserting an existing key replaces its value in place, keeping the
/// original position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes {
    entries: Vec<(String, AttrValue)>,
}

impl Attributes {
    /// Create a new, empty [`Attributes`].
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert an attribute, replacing the value in place if the key is
    /// already present.
    pub fn insert<S>(&mut self, key: S, value: AttrValue)
    where
        S: Into<String>,
    {
        let key = key.into();
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Insert a text attribute.
    ///
    /// Returns the [`Attributes`], so additional methods may be chained.
    pub fn with_text<S, T>(mut self, key: S, value: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        self.insert(key, AttrValue::Text(value.into()));
        self
    }

    /// Insert a flag attribute.
    ///
    /// Returns the [`Attributes`], so additional methods may be chained.
    pub fn with_flag<S>(mut self, key: S, on: bool) -> Self
    where
        S: Into<String>,
    {
        self.insert(key, AttrValue::Flag(on));
        self
    }

    /// Get the value of the given key, if any.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Return an iterator over the entries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Return true when no attributes are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Display for Attributes {
    /// The attribute-run form: space separated `key="value"` pairs and
    /// bare flag keys. `Flag(false)` entries are omitted.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut first = true;
        for (key, value) in self.iter() {
            let rendered = match value {
                AttrValue::Text(text) => format!("{key}=\"{}\"", escape_attribute(text)),
                AttrValue::Flag(true) => key.to_owned(),
                AttrValue::Flag(false) => continue,
            };
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{rendered}")?;
            first = false;
        }

        Ok(())
    }
}

impl FromIterator<(String, AttrValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, AttrValue)>>(iter: T) -> Self {
        let mut attributes = Attributes::new();
        for (key, value) in iter {
            attributes.insert(key, value);
        }
        attributes
    }
}

/// One child of an [`Element`]: literal text, or a nested element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, escaped at serialization time.
    Text(String),
    /// A nested element, serialized recursively without re-escaping.
    Element(Element),
}

/// An immutable HTML tree node.
///
/// An empty tag denotes a fragment: a transparent grouping node with no
/// wrapper markup, which cannot carry attributes.
///
/// # Examples
///
/// ```
/// use twine::html::{Attributes, Element, Node};
///
/// let element = Element::new(
///     "p",
///     Attributes::new().with_text("class", "x"),
///     vec![Node::Text("hi".into())],
/// )
/// .unwrap();
///
/// assert_eq!(element.to_string(), r#"<p class="x">hi</p>"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: String,
    attributes: Attributes,
    children: Vec<Node>,
}

impl Element {
    /// Create a new [`Element`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the value kind when the tag is empty and
    /// attributes are present: fragments only group children.
    pub fn new<S>(tag: S, attributes: Attributes, children: Vec<Node>) -> Result<Self, Error>
    where
        S: Into<String>,
    {
        let tag = tag.into();
        if tag.is_empty() && !attributes.is_empty() {
            return Err(Error::build(
                ErrorKind::Value,
                "fragments cannot have attributes, only children",
            ));
        }

        Ok(Self {
            tag,
            attributes,
            children,
        })
    }

    /// Create an empty element.
    pub fn empty() -> Self {
        Self {
            tag: String::new(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    /// Create a fragment element: no tag, no attributes.
    pub fn fragment(children: Vec<Node>) -> Self {
        Self {
            tag: String::new(),
            attributes: Attributes::new(),
            children,
        }
    }

    /// The tag name; empty for a fragment.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The attributes, in insertion order.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The children, in document order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Return true when this element is a fragment.
    pub fn is_fragment(&self) -> bool {
        self.tag.is_empty()
    }

    /// Break the element into its parts.
    pub fn into_parts(self) -> (String, Attributes, Vec<Node>) {
        (self.tag, self.attributes, self.children)
    }
}

/// Serialize a child run: text escaped, elements recursive.
fn write_children(f: &mut Formatter<'_>, children: &[Node]) -> FmtResult {
    for child in children {
        match child {
            Node::Text(text) => write!(f, "{}", escape_text(text))?,
            Node::Element(element) => write!(f, "{element}")?,
        }
    }
    Ok(())
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.is_fragment() {
            return write_children(f, &self.children);
        }

        let attributes = self.attributes.to_string();

        if self.children.is_empty() {
            return if attributes.is_empty() {
                write!(f, "<{} />", self.tag)
            } else {
                write!(f, "<{} {attributes} />", self.tag)
            };
        }

        if attributes.is_empty() {
            write!(f, "<{}>", self.tag)?;
        } else {
            write!(f, "<{} {attributes}>", self.tag)?;
        }
        write_children(f, &self.children)?;
        write!(f, "</{}>", self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::{AttrValue, Attributes, Element, Node};

    fn text(s: &str) -> Node {
        Node::Text(s.into())
    }

    #[test]
    fn test_empty_element() {
        assert_eq!(Element::empty().to_string(), "");
    }

    #[test]
    fn test_fragment_with_text_children() {
        let element = Element::fragment(vec![text("Hello"), text("world")]);

        assert_eq!(element.to_string(), "Helloworld");
    }

    #[test]
    fn test_fragment_children_escape() {
        let element = Element::fragment(vec![text("<script>alert('evil')</script>")]);

        assert_eq!(
            element.to_string(),
            "&lt;script&gt;alert('evil')&lt;/script&gt;"
        );
    }

    #[test]
    fn test_fragment_nesting() {
        let p = |body: &str| {
            Node::Element(Element::new("p", Attributes::new(), vec![text(body)]).unwrap())
        };
        let fragment = Element::fragment(vec![p("hello"), p("world")]);
        let element = Element::new(
            "div",
            Attributes::new(),
            vec![p("wow"), Node::Element(fragment)],
        )
        .unwrap();

        assert_eq!(
            element.to_string(),
            "<div><p>wow</p><p>hello</p><p>world</p></div>"
        );
    }

    #[test]
    fn test_invalid_fragment() {
        let result = Element::new("", Attributes::new().with_text("class", "greeting"), vec![]);

        assert!(result.is_err());
    }

    #[test]
    fn test_element_with_no_children() {
        let element = Element::new("div", Attributes::new(), vec![]).unwrap();

        assert_eq!(element.to_string(), "<div />");
    }

    #[test]
    fn test_element_with_attributes() {
        let element =
            Element::new("div", Attributes::new().with_text("class", "greeting"), vec![]).unwrap();

        assert_eq!(element.to_string(), r#"<div class="greeting" />"#);
    }

    #[test]
    fn test_element_with_text_children_and_attributes() {
        let element = Element::new(
            "div",
            Attributes::new().with_text("class", "greeting"),
            vec![text("Hello"), text("world")],
        )
        .unwrap();

        assert_eq!(
            element.to_string(),
            r#"<div class="greeting">Helloworld</div>"#
        );
    }

    #[test]
    fn test_attribute_escape() {
        let element = Element::new(
            "div",
            Attributes::new().with_text("class", r#"greeting" onclick="alert("hi")"#),
            vec![],
        )
        .unwrap();

        assert_eq!(
            element.to_string(),
            r#"<div class="greeting&quot; onclick=&quot;alert(&quot;hi&quot;)" />"#
        );
    }

    #[test]
    fn test_flag_attributes() {
        let element = Element::new(
            "input",
            Attributes::new()
                .with_text("type", "checkbox")
                .with_flag("checked", true)
                .with_flag("disabled", false),
            vec![],
        )
        .unwrap();

        assert_eq!(element.to_string(), r#"<input type="checkbox" checked />"#);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut attributes = Attributes::new()
            .with_text("a", "1")
            .with_text("b", "2");
        attributes.insert("a", AttrValue::Text("3".into()));

        let entries: Vec<_> = attributes.iter().collect();
        assert_eq!(entries[0], ("a", &AttrValue::Text("3".into())));
        assert_eq!(entries[1], ("b", &AttrValue::Text("2".into())));
    }
}
