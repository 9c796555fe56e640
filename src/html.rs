//! HTML templating over the template model.
//!
//! The engine walks a template in order, feeding literal parts to a push
//! tokenizer as raw markup and serializing each interpolation value by
//! its kind and by the tokenizer's position: inside an unterminated
//! start tag, values become attribute syntax; in content position they
//! become escaped text, nested markup, or component placeholders. The
//! tokenizer drives a tree builder, and registered components are
//! resolved bottom-up over the finished tree.

mod element;
mod tokenizer;
mod tree;

pub use element::{AttrValue, Attributes, Element, Node};
pub use tokenizer::{Position, Sink, Tokenizer};
pub use tree::TreeBuilder;

use crate::{
    log::{Error, ErrorKind, UNSUPPORTED_INTERPOLATION},
    template::{Part, Template},
    value::{ComponentFn, Value},
};
use element::{escape_attribute, escape_text};
use serde_json::Value as Json;
use std::{collections::HashMap, rc::Rc};

/// Convert a [`Template`] to an [`Element`] tree.
///
/// Literal parts are raw HTML. Interpolation values serialize by kind
/// and position:
///
/// - inside a start tag, a [`Value::Map`] becomes an attribute run and a
///   string becomes a quoted, escaped attribute value;
/// - in content position, a string is escaped, an [`Value::Element`] or
///   [`Value::Template`] nests its (already safe) serialization, and a
///   [`Value::Component`] is registered and replaced by a placeholder
///   tag, resolved after parsing by invoking the callable with the
///   placeholder's attributes and children.
///
/// # Errors
///
/// Returns an [`Error`] of the html-parse kind for malformed markup, a
/// value kind the position does not support, multiple root elements,
/// data outside the root, a mismatched end tag, or input that yields no
/// root element at all.
///
/// # Examples
///
/// ```
/// use twine::{t, html::html};
///
/// let class = "x";
/// let body = "hi";
/// let element = html(&t!("<p class=", {class}, ">", {body}, "</p>")).unwrap();
///
/// assert_eq!(element.to_string(), r#"<p class="x">hi</p>"#);
/// ```
pub fn html(template: &Template) -> Result<Element, Error> {
    let mut tokenizer = Tokenizer::new(TreeBuilder::new());
    let mut components: Components = HashMap::new();

    for part in template.parts() {
        match part {
            Part::Literal(text) => tokenizer.feed(text)?,
            Part::Interpolation(interpolation) => {
                let fed = match tokenizer.position() {
                    Position::InTag => serialize_tag_value(&interpolation.value)?,
                    Position::InContent => serialize_content_value(
                        &interpolation.value,
                        &interpolation.expression,
                        &mut components,
                    )?,
                };
                tokenizer.feed(&fed)?;
            }
        }
    }

    let root = tokenizer.finish()?.finish()?;
    resolve_components(root, &components)
}

type Components = HashMap<String, ComponentFn>;

/// Serialize an interpolation value appearing inside a start tag.
fn serialize_tag_value(value: &Value) -> Result<String, Error> {
    match value {
        Value::Map(attributes) => Ok(attributes.to_string()),
        Value::Data(Json::String(text)) => Ok(format!("\"{}\"", escape_attribute(text))),
        other => Err(Error::build(ErrorKind::HtmlParse, UNSUPPORTED_INTERPOLATION)
            .with_help(format!(
                "a {} value cannot appear inside a start tag",
                other.kind_name()
            ))),
    }
}

/// Serialize an interpolation value appearing in content position.
fn serialize_content_value(
    value: &Value,
    expression: &str,
    components: &mut Components,
) -> Result<String, Error> {
    match value {
        Value::Element(element) => Ok(element.to_string()),
        Value::Template(template) => Ok(html(template)?.to_string()),
        Value::Data(Json::String(text)) => Ok(escape_text(text)),
        Value::Component(component) => Ok(register_component(expression, component, components)),
        other => Err(Error::build(ErrorKind::HtmlParse, UNSUPPORTED_INTERPOLATION)
            .with_help(format!(
                "a {} value cannot appear in content position",
                other.kind_name()
            ))),
    }
}

/// Register a component callable and return its placeholder tag name.
///
/// The name is a slug of the source expression; re-registering the same
/// callable under the same expression, as a matching end tag does,
/// returns the same name. A different callable whose expression slugs
/// identically gets a numbered name instead.
fn register_component(
    expression: &str,
    component: &ComponentFn,
    components: &mut Components,
) -> String {
    let slug = slugify(expression);
    let mut name = format!("component-{slug}-component");
    let mut disambiguator = 1;

    loop {
        match components.get(&name) {
            Some(existing) if Rc::ptr_eq(existing, component) => return name,
            Some(_) => {
                disambiguator += 1;
                name = format!("component-{slug}-{disambiguator}-component");
            }
            None => {
                components.insert(name.clone(), Rc::clone(component));
                return name;
            }
        }
    }
}

/// Reduce an expression to tag-name-safe form: alphanumerics lowercased,
/// runs of whitespace and dashes collapsed to one dash, the rest dropped.
fn slugify(expression: &str) -> String {
    let mut slug = String::with_capacity(expression.len());
    let mut pending_dash = false;

    for c in expression.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    slug
}

/// Walk the tree bottom-up, replacing placeholder elements by invoking
/// their registered component with the resolved attributes and children.
fn resolve_components(element: Element, components: &Components) -> Result<Element, Error> {
    let (tag, attributes, children) = element.into_parts();

    let resolved: Vec<Node> = children
        .into_iter()
        .map(|child| match child {
            Node::Element(child) => resolve_components(child, components).map(Node::Element),
            text => Ok(text),
        })
        .collect::<Result<_, Error>>()?;

    match components.get(&tag) {
        Some(component) => component(&attributes, &resolved),
        None => Element::new(tag, attributes, resolved),
    }
}

#[cfg(test)]
mod tests {
    use super::{html, AttrValue, Attributes, Element, Node};
    use crate::{log::ErrorKind, t, value::Value};

    fn text(s: &str) -> Node {
        Node::Text(s.into())
    }

    fn element(tag: &str, attributes: Attributes, children: Vec<Node>) -> Element {
        Element::new(tag, attributes, children).unwrap()
    }

    #[test]
    fn test_empty_template_fails() {
        let error = html(&t!("")).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::HtmlParse);
    }

    #[test]
    fn test_only_text_fails() {
        let error = html(&t!("Hello, world!")).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::HtmlParse);
    }

    #[test]
    fn test_self_closing_tag() {
        let root = html(&t!("<br />")).unwrap();

        assert_eq!(root, element("br", Attributes::new(), vec![]));
    }

    #[test]
    fn test_simple_p() {
        let root = html(&t!("<p>Hello, world!</p>")).unwrap();

        assert_eq!(
            root,
            element("p", Attributes::new(), vec![text("Hello, world!")])
        );
    }

    #[test]
    fn test_text_interpolation() {
        let body = "Hello, world!";
        let root = html(&t!("<p>", {body}, "</p>")).unwrap();

        assert_eq!(
            root,
            element("p", Attributes::new(), vec![text("Hello, world!")])
        );
    }

    #[test]
    fn test_text_interpolation_round_trips_unsafe_input() {
        let evil = "<script>alert('evil')</script>";
        let root = html(&t!("<p>", {evil}, "</p>")).unwrap();

        assert_eq!(root, element("p", Attributes::new(), vec![text(evil)]));
        assert_eq!(
            root.to_string(),
            "<p>&lt;script&gt;alert('evil')&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn test_nested_element_is_not_reescaped() {
        let good = html(&t!("<script>alert('good')</script>")).unwrap();
        let root = html(&t!("<p>", {good}, "</p>")).unwrap();

        assert_eq!(
            root,
            element(
                "p",
                Attributes::new(),
                vec![Node::Element(element(
                    "script",
                    Attributes::new(),
                    vec![text("alert('good')")],
                ))],
            )
        );
    }

    #[test]
    fn test_nested_template() {
        let good = t!("<script>alert('good')</script>");
        let root = html(&t!("<p>", {good}, "</p>")).unwrap();

        assert_eq!(root.children().len(), 1);
        assert!(matches!(&root.children()[0], Node::Element(e) if e.tag() == "script"));
    }

    #[test]
    fn test_attribute_string_interpolation() {
        let cls = "gree\"tin\"g";
        let body = "Hello, world!";
        let root = html(&t!("<p class=", {cls}, ">", {body}, "</p>")).unwrap();

        assert_eq!(
            root.attributes().get("class"),
            Some(&AttrValue::Text("gree\"tin\"g".into()))
        );
    }

    #[test]
    fn test_attribute_map_interpolation() {
        let attributes = Attributes::new()
            .with_text("class", "greeting")
            .with_flag("data-foo", true);
        let body = "Hello, world!";
        let root = html(&t!("<p ", {attributes}, ">", {body}, "</p>")).unwrap();

        assert_eq!(
            root.attributes().get("class"),
            Some(&AttrValue::Text("greeting".into()))
        );
        assert_eq!(
            root.attributes().get("data-foo"),
            Some(&AttrValue::Flag(true))
        );
    }

    #[test]
    fn test_map_not_allowed_in_content() {
        let attributes = Attributes::new().with_text("class", "greeting");
        let error = html(&t!("<p>", {attributes}, "</p>")).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::HtmlParse);
    }

    #[test]
    fn test_tag_name_interpolation() {
        let tag = "p";
        let body = "Hello, world!";
        let root = html(&t!("<", {tag}, ">", {body}, "</", {tag}, ">")).unwrap();

        assert_eq!(
            root,
            element("p", Attributes::new(), vec![text("Hello, world!")])
        );
    }

    #[test]
    fn test_many_nested_elements() {
        let root = html(&t!(r#"
        <div>
            Raw text
            <p>Hello, world!</p>
            <ul>
                <li>One</li>
                <li>Two</li>
            </ul>
        </div>
        "#))
        .unwrap();

        let expected = element(
            "div",
            Attributes::new(),
            vec![
                text("Raw text"),
                Node::Element(element("p", Attributes::new(), vec![text("Hello, world!")])),
                Node::Element(element(
                    "ul",
                    Attributes::new(),
                    vec![
                        Node::Element(element("li", Attributes::new(), vec![text("One")])),
                        Node::Element(element("li", Attributes::new(), vec![text("Two")])),
                    ],
                )),
            ],
        );
        assert_eq!(root, expected);
    }

    #[test]
    fn test_multiple_roots_fail() {
        let error = html(&t!("<p>one</p><p>two</p>")).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::HtmlParse);
    }

    #[test]
    fn test_component_interpolation() {
        let magic = Value::component(|attributes, children| {
            let mut merged = attributes.clone();
            merged.insert("data-magic", AttrValue::Text("yes".into()));
            let mut body = children.to_vec();
            body.push(Node::Text("Magic!".into()));
            Element::new("div", merged, body)
        });

        let root = html(&t!(
            "<", {&magic}, " id=\"wow\"><b>FUN!</b></", {&magic}, ">"
        ))
        .unwrap();

        let expected = element(
            "div",
            Attributes::new()
                .with_text("id", "wow")
                .with_text("data-magic", "yes"),
            vec![
                Node::Element(element("b", Attributes::new(), vec![text("FUN!")])),
                text("Magic!"),
            ],
        );
        assert_eq!(root, expected);
    }
}
