use super::element::{AttrValue, Attributes};
use crate::log::{Error, ErrorKind};

/// Where the tokenizer currently sits relative to the start-tag grammar.
///
/// The engine asks for this before every interpolation: a value inside an
/// unterminated start tag serializes as attribute syntax, a value in
/// content position as content. A lone `<` is still content, so a tag
/// name can itself be interpolated.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Position {
    /// Inside an unterminated start tag.
    InTag,
    /// Anywhere else.
    InContent,
}

/// Receives tokenizer events.
pub trait Sink {
    /// A complete start tag. `self_closing` is true for `<tag />` forms.
    fn start_tag(
        &mut self,
        tag: String,
        attributes: Attributes,
        self_closing: bool,
    ) -> Result<(), Error>;

    /// A complete end tag.
    fn end_tag(&mut self, tag: String) -> Result<(), Error>;

    /// A run of text data, character references already decoded. Text is
    /// accumulated until the next tag, so one run never splits across
    /// feed boundaries.
    fn text(&mut self, data: &str) -> Result<(), Error>;
}

/// An incremental HTML tokenizer.
///
/// Feed it chunks of markup in any split; it only acts on complete
/// constructs, holding the rest until the next feed. Tag and attribute
/// names are lowercased, character references in text and attribute
/// values are decoded, and comments and `<!...>` declarations are
/// skipped.
pub struct Tokenizer<S: Sink> {
    /// The event receiver.
    sink: S,
    /// Fed input not yet consumed: at rest, either empty or an
    /// incomplete construct.
    buffer: String,
    /// Decoded text accumulated since the last tag.
    text: String,
}

impl<S: Sink> Tokenizer<S> {
    /// Create a new [`Tokenizer`] over the given sink.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            buffer: String::new(),
            text: String::new(),
        }
    }

    /// Feed a chunk of markup, emitting events for every construct the
    /// chunk completes.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] for malformed markup, and propagates sink
    /// errors.
    pub fn feed(&mut self, chunk: &str) -> Result<(), Error> {
        self.buffer.push_str(chunk);
        self.run()
    }

    /// Report where the tokenizer sits after the input so far.
    pub fn position(&self) -> Position {
        let bytes = self.buffer.as_bytes();
        if bytes.first() == Some(&b'<') && bytes.get(1).is_some_and(|b| b.is_ascii_alphabetic()) {
            Position::InTag
        } else {
            Position::InContent
        }
    }

    /// Signal the end of input, flush pending text, and return the sink.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the html-parse kind when the input ends
    /// inside an unterminated construct, and propagates sink errors.
    pub fn finish(mut self) -> Result<S, Error> {
        if self.buffer.starts_with('<') {
            return Err(Error::build(
                ErrorKind::HtmlParse,
                "unexpected end of input inside markup",
            )
            .with_help(format!("the unterminated markup begins `{}`", self.buffer)));
        }
        if !self.buffer.is_empty() {
            // A held-back incomplete character reference is just text.
            let chunk = std::mem::take(&mut self.buffer);
            self.text.push_str(&decode(&chunk));
        }
        self.flush_text()?;

        Ok(self.sink)
    }

    /// Consume every complete construct at the front of the buffer.
    fn run(&mut self) -> Result<(), Error> {
        loop {
            if self.buffer.is_empty() {
                return Ok(());
            }

            if !self.buffer.starts_with('<') {
                match self.buffer.find('<') {
                    Some(until) => {
                        let chunk: String = self.buffer.drain(..until).collect();
                        self.text.push_str(&decode(&chunk));
                    }
                    None => {
                        // Hold back a trailing incomplete character
                        // reference; the rest of it may arrive later.
                        let keep = incomplete_reference(&self.buffer);
                        let chunk: String = self.buffer.drain(..keep).collect();
                        self.text.push_str(&decode(&chunk));
                        return Ok(());
                    }
                }
                continue;
            }

            let Some(second) = self.buffer.chars().nth(1) else {
                return Ok(());
            };

            match second {
                '/' => {
                    let Some(end) = self.buffer.find('>') else {
                        return Ok(());
                    };
                    let name = self.buffer[2..end].trim().to_ascii_lowercase();
                    self.buffer.drain(..=end);
                    if name.is_empty() || !name.chars().all(is_name_char) {
                        return Err(Error::build(ErrorKind::HtmlParse, "malformed end tag")
                            .with_help(format!("`</{name}>` is not a valid end tag")));
                    }
                    self.flush_text()?;
                    self.sink.end_tag(name)?;
                }
                c if c.is_ascii_alphabetic() => {
                    let Some(end) = find_tag_end(&self.buffer) else {
                        return Ok(());
                    };
                    let inner = self.buffer[1..end].to_string();
                    self.buffer.drain(..=end);
                    let (tag, attributes, self_closing) = parse_start_tag(&inner)?;
                    self.flush_text()?;
                    self.sink.start_tag(tag, attributes, self_closing)?;
                }
                '!' => {
                    if self.buffer.starts_with("<!--") {
                        let Some(end) = self.buffer.find("-->") else {
                            return Ok(());
                        };
                        self.buffer.drain(..end + 3);
                    } else {
                        let Some(end) = self.buffer.find('>') else {
                            return Ok(());
                        };
                        self.buffer.drain(..=end);
                    }
                }
                _ => {
                    // A `<` that opens no markup is text.
                    self.buffer.drain(..1);
                    self.text.push('<');
                }
            }
        }
    }

    fn flush_text(&mut self) -> Result<(), Error> {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.sink.text(&text)?;
        }
        Ok(())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'
}

/// Find the byte index of the `>` closing the start tag at the front of
/// the buffer, skipping over quoted attribute values.
fn find_tag_end(buffer: &str) -> Option<usize> {
    let mut quote: Option<char> = None;

    for (i, c) in buffer.char_indices().skip(1) {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '>' => return Some(i),
                _ => {}
            },
        }
    }

    None
}

/// Parse the inside of a start tag: the text between `<` and `>`.
fn parse_start_tag(inner: &str) -> Result<(String, Attributes, bool), Error> {
    let (inner, self_closing) = match inner.trim_end().strip_suffix('/') {
        Some(stripped) => (stripped, true),
        None => (inner, false),
    };

    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let tag = inner[..name_end].to_ascii_lowercase();
    if !tag.chars().all(is_name_char) {
        return Err(Error::build(ErrorKind::HtmlParse, "malformed start tag")
            .with_help(format!("`{tag}` is not a valid tag name")));
    }

    let mut attributes = Attributes::new();
    let mut rest = &inner[name_end..];

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        if name.is_empty() {
            return Err(Error::build(ErrorKind::HtmlParse, "malformed start tag")
                .with_help(format!("stray `{rest}` inside a start tag")));
        }
        rest = rest[name_end..].trim_start();

        match rest.strip_prefix('=') {
            Some(after_equals) => {
                let after_equals = after_equals.trim_start();
                let (value, after) = match after_equals.chars().next() {
                    Some(quote @ ('"' | '\'')) => {
                        let closing = after_equals[1..].find(quote).ok_or_else(|| {
                            Error::build(ErrorKind::HtmlParse, "malformed start tag")
                                .with_help("unterminated attribute value")
                        })?;
                        (
                            &after_equals[1..1 + closing],
                            &after_equals[1 + closing + 1..],
                        )
                    }
                    _ => {
                        let until = after_equals
                            .find(|c: char| c.is_whitespace())
                            .unwrap_or(after_equals.len());
                        (&after_equals[..until], &after_equals[until..])
                    }
                };
                attributes.insert(name, AttrValue::Text(decode(value)));
                rest = after;
            }
            None => {
                attributes.insert(name, AttrValue::Flag(true));
            }
        }
    }

    Ok((tag, attributes, self_closing))
}

/// Decode character references: the named forms the escapers produce,
/// plus numeric forms. Anything unrecognized passes through verbatim.
fn decode(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }

    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(i) = rest.find('&') {
        decoded.push_str(&rest[..i]);
        rest = &rest[i..];

        let reference = rest[1..]
            .find(';')
            .filter(|&end| end <= 32)
            .map(|end| &rest[1..1 + end]);
        match reference.and_then(decode_reference) {
            Some(c) => {
                decoded.push(c);
                let semicolon = rest.find(';').expect("reference must contain `;`");
                rest = &rest[semicolon + 1..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }
    decoded.push_str(rest);

    decoded
}

fn decode_reference(reference: &str) -> Option<char> {
    match reference {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = reference
                .strip_prefix("#x")
                .or_else(|| reference.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = reference.strip_prefix('#') {
                dec.parse().ok()?
            } else {
                return None;
            };
            char::from_u32(code)
        }
    }
}

/// Return the index to keep from: the start of a trailing `&` run that
/// might be the front half of a character reference, or the buffer
/// length when there is none.
fn incomplete_reference(buffer: &str) -> usize {
    match buffer.rfind('&') {
        Some(i) if !buffer[i..].contains(';') && buffer.len() - i <= 32 => i,
        _ => buffer.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, Attributes, Position, Sink, Tokenizer};
    use crate::log::Error;

    /// Records events as readable strings.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Sink for Recorder {
        fn start_tag(
            &mut self,
            tag: String,
            attributes: Attributes,
            self_closing: bool,
        ) -> Result<(), Error> {
            let slash = if self_closing { "/" } else { "" };
            self.events.push(format!("start:{tag}[{attributes}]{slash}"));
            Ok(())
        }

        fn end_tag(&mut self, tag: String) -> Result<(), Error> {
            self.events.push(format!("end:{tag}"));
            Ok(())
        }

        fn text(&mut self, data: &str) -> Result<(), Error> {
            self.events.push(format!("text:{data}"));
            Ok(())
        }
    }

    fn events(chunks: &[&str]) -> Vec<String> {
        let mut tokenizer = Tokenizer::new(Recorder::default());
        for chunk in chunks {
            tokenizer.feed(chunk).unwrap();
        }
        tokenizer.finish().unwrap().events
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            events(&["<p>Hello</p>"]),
            ["start:p[]", "text:Hello", "end:p"]
        );
    }

    #[test]
    fn test_attributes() {
        assert_eq!(
            events(&[r#"<p class="greeting" hidden>x</p>"#]),
            [r#"start:p[class="greeting" hidden]"#, "text:x", "end:p"]
        );
    }

    #[test]
    fn test_self_closing() {
        assert_eq!(events(&["<br/>"]), ["start:br[]/"]);
        assert_eq!(events(&["<br />"]), ["start:br[]/"]);
    }

    #[test]
    fn test_text_accumulates_across_feeds() {
        assert_eq!(
            events(&["<p>Hel", "lo</p>"]),
            ["start:p[]", "text:Hello", "end:p"]
        );
    }

    #[test]
    fn test_tag_split_across_feeds() {
        assert_eq!(
            events(&["<", "p", ">x</", "p", ">"]),
            ["start:p[]", "text:x", "end:p"]
        );
    }

    #[test]
    fn test_position_tracking() {
        let mut tokenizer = Tokenizer::new(Recorder::default());

        tokenizer.feed("<").unwrap();
        assert_eq!(tokenizer.position(), Position::InContent);

        tokenizer.feed("p class=").unwrap();
        assert_eq!(tokenizer.position(), Position::InTag);

        tokenizer.feed("\"x\">").unwrap();
        assert_eq!(tokenizer.position(), Position::InContent);
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        assert_eq!(
            events(&[r#"<p title="a>b">x</p>"#]),
            [r#"start:p[title="a>b"]"#, "text:x", "end:p"]
        );
    }

    #[test]
    fn test_references_decoded() {
        assert_eq!(
            events(&["<p>&lt;b&gt; &amp; &#65;</p>"]),
            ["start:p[]", "text:<b> & A", "end:p"]
        );
        assert_eq!(
            events(&[r#"<p class="a&quot;b">x</p>"#]),
            [r#"start:p[class="a"b"]"#, "text:x", "end:p"]
        );
    }

    #[test]
    fn test_reference_split_across_feeds() {
        assert_eq!(
            events(&["<p>a &am", "p; b</p>"]),
            ["start:p[]", "text:a & b", "end:p"]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            events(&["<p><!-- not <b> data -->x</p>"]),
            ["start:p[]", "text:x", "end:p"]
        );
    }

    #[test]
    fn test_names_lowercased() {
        assert_eq!(
            events(&[r#"<DIV CLASS="x"></DIV>"#]),
            [r#"start:div[class="x"]"#, "end:div"]
        );
    }

    #[test]
    fn test_stray_lt_is_text() {
        assert_eq!(events(&["<p>1 < 2</p>"]), ["start:p[]", "text:1 < 2", "end:p"]);
    }

    #[test]
    fn test_unterminated_markup_fails_at_finish() {
        let mut tokenizer = Tokenizer::new(Recorder::default());
        tokenizer.feed("<p class=").unwrap();

        assert!(tokenizer.finish().is_err());
    }

    #[test]
    fn test_decode_passes_unknown_through() {
        assert_eq!(decode("a &unknown; b"), "a &unknown; b");
        assert_eq!(decode("tom & jerry"), "tom & jerry");
    }
}
