use super::{
    element::{Attributes, Element, Node},
    tokenizer::Sink,
};
use crate::log::{Error, ErrorKind, MULTIPLE_ROOTS, NO_ROOT, STRAY_DATA, UNEXPECTED_END_TAG};

/// One element under construction.
struct Frame {
    tag: String,
    attributes: Attributes,
    children: Vec<Node>,
}

impl Frame {
    fn into_element(self) -> Element {
        Element::new(self.tag, self.attributes, self.children)
            .expect("parsed elements always carry a tag")
    }
}

/// Builds an [`Element`] tree from tokenizer events with a stack
/// discipline: a start tag pushes a frame, the matching end tag pops it
/// and appends the finished element to the frame below, or sets it as
/// the root when the stack empties.
pub struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<Element>,
}

impl TreeBuilder {
    /// Create a new, empty [`TreeBuilder`].
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            root: None,
        }
    }

    /// Return the finished root.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the html-parse kind when an element is
    /// still open, or when no root was produced: a template containing
    /// only text, or nothing, never yields a tree.
    pub fn finish(self) -> Result<Element, Error> {
        if let Some(frame) = self.stack.last() {
            return Err(Error::build(ErrorKind::HtmlParse, "unclosed element")
                .with_help(format!("`<{}>` was never closed", frame.tag)));
        }

        self.root.ok_or_else(|| {
            Error::build(ErrorKind::HtmlParse, NO_ROOT)
                .with_help("the input contains no complete element")
        })
    }

    /// Place a finished element: as a child of the open frame, or as the
    /// root when none is open.
    fn place(&mut self, element: Element) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(Node::Element(element));
                Ok(())
            }
            None => {
                // `start_tag` rejects a second root before it opens, so
                // the slot is free here.
                self.root = Some(element);
                Ok(())
            }
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for TreeBuilder {
    fn start_tag(
        &mut self,
        tag: String,
        attributes: Attributes,
        self_closing: bool,
    ) -> Result<(), Error> {
        if self.root.is_some() && self.stack.is_empty() {
            let root = self.root.as_ref().expect("root was just checked").tag();
            return Err(Error::build(ErrorKind::HtmlParse, MULTIPLE_ROOTS)
                .with_help(format!("found `{root}` and then `{tag}` at the top level")));
        }

        let frame = Frame {
            tag,
            attributes,
            children: Vec::new(),
        };
        if self_closing {
            self.place(frame.into_element())
        } else {
            self.stack.push(frame);
            Ok(())
        }
    }

    fn end_tag(&mut self, tag: String) -> Result<(), Error> {
        let frame = self.stack.pop().ok_or_else(|| {
            Error::build(ErrorKind::HtmlParse, UNEXPECTED_END_TAG)
                .with_help(format!("`</{tag}>` has no matching start tag"))
        })?;
        if frame.tag != tag {
            return Err(Error::build(ErrorKind::HtmlParse, UNEXPECTED_END_TAG)
                .with_help(format!("expected `</{}>`, found `</{tag}>`", frame.tag)));
        }

        self.place(frame.into_element())
    }

    fn text(&mut self, data: &str) -> Result<(), Error> {
        // Whitespace-only runs separate markup, not content.
        let trimmed = data.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        match self.stack.last_mut() {
            Some(frame) => {
                frame.children.push(Node::Text(trimmed.to_owned()));
                Ok(())
            }
            None => Err(Error::build(ErrorKind::HtmlParse, STRAY_DATA)
                .with_help(format!("`{trimmed}` appears outside any element"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Sink, TreeBuilder};
    use crate::{
        html::element::{AttrValue, Attributes},
        log::ErrorKind,
    };

    #[test]
    fn test_single_element() {
        let mut builder = TreeBuilder::new();
        builder
            .start_tag("p".into(), Attributes::new(), false)
            .unwrap();
        builder.text("Hello").unwrap();
        builder.end_tag("p".into()).unwrap();

        let root = builder.finish().unwrap();
        assert_eq!(root.tag(), "p");
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_self_closing_root() {
        let mut builder = TreeBuilder::new();
        builder
            .start_tag("br".into(), Attributes::new(), true)
            .unwrap();

        let root = builder.finish().unwrap();
        assert_eq!(root.tag(), "br");
        assert!(root.children().is_empty());
        assert!(root.attributes().is_empty());
    }

    #[test]
    fn test_whitespace_text_skipped() {
        let mut builder = TreeBuilder::new();
        builder
            .start_tag("div".into(), Attributes::new(), false)
            .unwrap();
        builder.text("\n    ").unwrap();
        builder.text("  Raw text  ").unwrap();
        builder.end_tag("div".into()).unwrap();

        let root = builder.finish().unwrap();
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_no_root() {
        let error = TreeBuilder::new().finish().unwrap_err();

        assert_eq!(error.kind(), ErrorKind::HtmlParse);
    }

    #[test]
    fn test_multiple_roots() {
        let mut builder = TreeBuilder::new();
        builder
            .start_tag("p".into(), Attributes::new(), true)
            .unwrap();
        let error = builder
            .start_tag("p".into(), Attributes::new(), false)
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::HtmlParse);
    }

    #[test]
    fn test_stray_data() {
        let mut builder = TreeBuilder::new();
        let error = builder.text("loose").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::HtmlParse);
    }

    #[test]
    fn test_mismatched_end_tag() {
        let mut builder = TreeBuilder::new();
        builder
            .start_tag("div".into(), Attributes::new(), false)
            .unwrap();
        let error = builder.end_tag("span".into()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::HtmlParse);
    }

    #[test]
    fn test_unclosed_element() {
        let mut builder = TreeBuilder::new();
        builder
            .start_tag("div".into(), Attributes::new(), false)
            .unwrap();
        let error = builder.finish().unwrap_err();

        assert_eq!(error.kind(), ErrorKind::HtmlParse);
    }

    #[test]
    fn test_attributes_survive() {
        let mut builder = TreeBuilder::new();
        builder
            .start_tag(
                "p".into(),
                Attributes::new().with_text("class", "x"),
                true,
            )
            .unwrap();

        let root = builder.finish().unwrap();
        assert_eq!(
            root.attributes().get("class"),
            Some(&AttrValue::Text("x".into()))
        );
    }
}
