//! Structured logging over templates.
//!
//! A template carries both a human-readable message and, through each
//! interpolation's expression text, the names of the values that built
//! it. [`TemplateMessage`] exposes the two sides of that record and
//! serializes them through an injectable [`Encode`] capability.

use crate::{
    log::{Error, ErrorKind},
    render::f,
    template::Template,
    value::Value,
};
use serde_json::{Map, Value as Json};

/// A serialization capability for log records.
///
/// Implementations are injected per call site, so a consumer with special
/// requirements (say, decimals carried as strings) swaps the encoder
/// without touching the record shape.
pub trait Encode {
    /// Encode the given record to a string.
    fn encode(&self, record: &Json) -> Result<String, Error>;
}

/// The default encoder, plain JSON.
pub struct JsonEncoder;

impl Encode for JsonEncoder {
    fn encode(&self, record: &Json) -> Result<String, Error> {
        serde_json::to_string(record)
            .map_err(|e| Error::build(ErrorKind::Type, format!("unencodable record: {e}")))
    }
}

/// A structured log record extracted from a [`Template`].
///
/// # Examples
///
/// ```
/// use twine::{t, TemplateMessage};
///
/// let user = "ada";
/// let template = t!("user ", {user}, " logged in");
/// let message = TemplateMessage::new(&template);
///
/// assert_eq!(
///     message.encode().unwrap(),
///     r#"{"message":"user ada logged in","values":{"user":"ada"}}"#,
/// );
/// ```
pub struct TemplateMessage<'template> {
    template: &'template Template,
    encoder: Box<dyn Encode>,
}

impl<'template> TemplateMessage<'template> {
    /// Create a new [`TemplateMessage`] with the default [`JsonEncoder`].
    pub fn new(template: &'template Template) -> Self {
        Self {
            template,
            encoder: Box::new(JsonEncoder),
        }
    }

    /// Create a new [`TemplateMessage`] with the given encoder.
    pub fn with_encoder<E>(template: &'template Template, encoder: E) -> Self
    where
        E: Encode + 'static,
    {
        Self {
            template,
            encoder: Box::new(encoder),
        }
    }

    /// The fully rendered, human-readable message.
    ///
    /// # Errors
    ///
    /// Propagates rendering errors from the template.
    pub fn message(&self) -> Result<String, Error> {
        f(self.template)
    }

    /// The expression → value pairs behind the message, in template
    /// order.
    ///
    /// Two interpolations with the same expression text collapse into
    /// one entry, the last value winning.
    pub fn values(&self) -> Vec<(&str, &Value)> {
        let mut pairs: Vec<(&str, &Value)> = Vec::new();

        for interpolation in self.template.interpolations() {
            let expression = interpolation.expression.as_str();
            match pairs.iter_mut().find(|(name, _)| *name == expression) {
                Some(pair) => pair.1 = &interpolation.value,
                None => pairs.push((expression, &interpolation.value)),
            }
        }

        pairs
    }

    /// The combined record: `{"message": .., "values": ..}`.
    ///
    /// # Errors
    ///
    /// Propagates rendering errors, and returns an [`Error`] of the type
    /// kind when a value has no encoded form, such as an unresolved
    /// callable.
    pub fn record(&self) -> Result<Json, Error> {
        let mut values = Map::new();
        for (expression, value) in self.values() {
            values.insert(expression.to_owned(), encode_value(value)?);
        }

        let mut record = Map::new();
        record.insert("message".to_owned(), Json::String(self.message()?));
        record.insert("values".to_owned(), Json::Object(values));

        Ok(Json::Object(record))
    }

    /// The record serialized through the encoder.
    ///
    /// # Errors
    ///
    /// Propagates [`record`][`TemplateMessage::record`] and encoder errors.
    pub fn encode(&self) -> Result<String, Error> {
        self.encoder.encode(&self.record()?)
    }
}

/// Reduce a value to encodable data.
fn encode_value(value: &Value) -> Result<Json, Error> {
    match value {
        Value::Data(data) => Ok(data.clone()),
        Value::Element(element) => Ok(Json::String(element.to_string())),
        Value::Template(template) => Ok(Json::String(f(template)?)),
        Value::Map(map) => {
            let mut object = Map::new();
            for (key, attr) in map.iter() {
                let encoded = match attr {
                    crate::html::AttrValue::Text(text) => Json::String(text.clone()),
                    crate::html::AttrValue::Flag(flag) => Json::Bool(*flag),
                };
                object.insert(key.to_string(), encoded);
            }
            Ok(Json::Object(object))
        }
        other => Err(Error::build(
            ErrorKind::Type,
            format!("a {} value cannot be encoded", other.kind_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{Encode, TemplateMessage};
    use crate::{log::Error, t, value::Value};
    use serde_json::{json, Value as Json};

    #[test]
    fn test_message_and_values() {
        let user = "ada";
        let attempts = 3;
        let template = t!("user ", {user}, " failed ", {attempts}, " logins");
        let message = TemplateMessage::new(&template);

        assert_eq!(message.message().unwrap(), "user ada failed 3 logins");

        let values = message.values();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].0, "user");
        assert_eq!(values[1].0, "attempts");
    }

    #[test]
    fn test_record_shape() {
        let user = "ada";
        let template = t!("hi ", {user});
        let record = TemplateMessage::new(&template).record().unwrap();

        assert_eq!(
            record,
            json!({"message": "hi ada", "values": {"user": "ada"}}),
        );
    }

    #[test]
    fn test_duplicate_expressions_last_write_wins() {
        let template = t!({1}, "/", {1}, "/", {2});
        // Both `1` interpolations share the expression text "1".
        let message = TemplateMessage::new(&template);
        let values = message.values();

        assert_eq!(values.len(), 2);
        assert_eq!(values[0], ("1", &Value::from(1)));
        assert_eq!(values[1], ("2", &Value::from(2)));
    }

    #[test]
    fn test_custom_encoder() {
        /// Encodes every number as a string, for consumers that must not
        /// lose precision in transit.
        struct StringNumbers;

        fn stringify(value: &Json) -> Json {
            match value {
                Json::Number(n) => Json::String(n.to_string()),
                Json::Array(items) => Json::Array(items.iter().map(stringify).collect()),
                Json::Object(map) => Json::Object(
                    map.iter().map(|(k, v)| (k.clone(), stringify(v))).collect(),
                ),
                other => other.clone(),
            }
        }

        impl Encode for StringNumbers {
            fn encode(&self, record: &Json) -> Result<String, Error> {
                serde_json::to_string(&stringify(record)).map_err(|e| {
                    Error::build(crate::log::ErrorKind::Type, e.to_string())
                })
            }
        }

        let total = 1.25;
        let template = t!("total ", {total});
        let encoded = TemplateMessage::with_encoder(&template, StringNumbers)
            .encode()
            .unwrap();

        assert_eq!(
            encoded,
            r#"{"message":"total 1.25","values":{"total":"1.25"}}"#,
        );
    }
}
