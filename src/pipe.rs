use serde_json::{Map, Value as Json};
use std::fmt::{Arguments, Result, Write};

/// Wraps some underlying buffer by providing methods that write plain
/// data values to it in display form.
pub struct Pipe<'buffer> {
    buffer: &'buffer mut (dyn Write + 'buffer),
}

impl<'buffer> Pipe<'buffer> {
    /// Create a new Pipe that writes to the given buffer.
    pub fn new(buffer: &'buffer mut String) -> Self {
        Self { buffer }
    }

    /// Write the given data value to the Pipe buffer.
    ///
    /// Strings are written bare, null as the text `null`, sequences as a
    /// comma separated list in brackets, and mappings as key/value pairs
    /// in braces.
    ///
    /// # Errors
    ///
    /// All data values are supported, so the only error that will be
    /// returned is propagated from the [write!] macro itself.
    pub fn write_data(&mut self, data: &Json) -> Result {
        match data {
            Json::Null => write!(self.buffer, "null"),
            Json::Bool(value) => write!(self.buffer, "{value}"),
            Json::Number(value) => write!(self.buffer, "{value}"),
            Json::String(value) => self.write_str(value),
            Json::Array(array) => self.write_array(array),
            Json::Object(object) => self.write_object(object),
        }
    }

    /// Write the value to the buffer as a comma separated list surrounded
    /// by brackets.
    fn write_array(&mut self, value: &[Json]) -> Result {
        write!(self.buffer, "[")?;
        let mut iter = value.iter();
        if let Some(item) = iter.next() {
            self.write_data(item)?;
            for item in iter {
                write!(self.buffer, ", ")?;
                self.write_data(item)?;
            }
        }
        write!(self.buffer, "]")
    }

    /// Write the value to the buffer as key/value pairs surrounded by
    /// curly braces.
    fn write_object(&mut self, value: &Map<String, Json>) -> Result {
        write!(self.buffer, "{{")?;
        let mut iter = value.iter();
        if let Some((key, item)) = iter.next() {
            write!(self.buffer, "{key}: ")?;
            self.write_data(item)?;
            for (key, item) in iter {
                write!(self.buffer, ", {key}: ")?;
                self.write_data(item)?;
            }
        }
        write!(self.buffer, "}}")
    }
}

impl Write for Pipe<'_> {
    #[inline]
    fn write_str(&mut self, s: &str) -> Result {
        Write::write_str(self.buffer, s)
    }

    #[inline]
    fn write_char(&mut self, c: char) -> Result {
        Write::write_char(self.buffer, c)
    }

    #[inline]
    fn write_fmt(&mut self, args: Arguments<'_>) -> Result {
        Write::write_fmt(self.buffer, args)
    }
}

#[cfg(test)]
mod tests {
    use super::Pipe;
    use serde_json::json;

    fn written(data: serde_json::Value) -> String {
        let mut buffer = String::new();
        Pipe::new(&mut buffer).write_data(&data).unwrap();
        buffer
    }

    #[test]
    fn test_write_scalars() {
        assert_eq!(written(json!(null)), "null");
        assert_eq!(written(json!("bare")), "bare");
        assert_eq!(written(json!(1.5)), "1.5");
    }

    #[test]
    fn test_write_array() {
        assert_eq!(written(json!([1, "two", null])), "[1, two, null]");
    }

    #[test]
    fn test_write_object() {
        assert_eq!(written(json!({"a": 1, "b": [2]})), "{a: 1, b: [2]}");
    }
}
