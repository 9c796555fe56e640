use crate::{
    html::{Attributes, Element, Node},
    log::{error_unhashable, Error, ErrorKind},
    template::Template,
};
use serde::Serialize;
use serde_json::{to_value, Value as Json};
use std::{fmt::Debug, future::Future, hash::Hasher, pin::Pin, rc::Rc};

/// A deferred value: a zero-argument callable invoked on demand.
pub type Thunk = Rc<dyn Fn() -> Result<Value, Error>>;

/// A deferred asynchronous value: a zero-argument callable producing
/// a future which is awaited on demand.
pub type AsyncThunk = Rc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<Value, Error>>>>>;

/// An HTML component: a callable receiving the resolved attributes and
/// children of a placeholder element, returning a replacement [`Element`].
pub type ComponentFn = Rc<dyn Fn(&Attributes, &[Node]) -> Result<Element, Error>>;

/// The value of one interpolation.
///
/// Producers declare which capability they intend by choosing a variant,
/// so consumers dispatch with a closed match instead of open-ended type
/// inspection.
#[derive(Clone)]
pub enum Value {
    /// Plain data: null, boolean, number, string, sequence or mapping.
    Data(Json),
    /// An ordered attribute mapping, for HTML attribute-run interpolation.
    Map(Attributes),
    /// A pre-built HTML element.
    Element(Element),
    /// A sub-template, composed into a parent by the HTML engine.
    Template(Box<Template>),
    /// A deferred value, invoked by the renderers that resolve callables.
    Lazy(Thunk),
    /// A deferred asynchronous value, awaited by the async renderer.
    Future(AsyncThunk),
    /// An HTML component callable.
    Component(ComponentFn),
}

impl Value {
    /// Create a [`Value`] from anything serializable.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the serialization fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use twine::Value;
    ///
    /// let value = Value::serialize(vec![1, 2, 3]);
    /// assert!(value.is_ok());
    /// ```
    pub fn serialize<T>(value: T) -> Result<Self, Error>
    where
        T: Serialize,
    {
        let data = to_value(value)
            .map_err(|e| Error::build(ErrorKind::Type, format!("unserializable value: {e}")))?;

        Ok(Value::Data(data))
    }

    /// Create a deferred [`Value`] from the given callable.
    ///
    /// # Examples
    ///
    /// ```
    /// use twine::Value;
    ///
    /// let value = Value::lazy(|| Ok(Value::from("expensive")));
    /// ```
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> Result<Value, Error> + 'static,
    {
        Value::Lazy(Rc::new(f))
    }

    /// Create a deferred asynchronous [`Value`] from the given callable.
    ///
    /// # Examples
    ///
    /// ```
    /// use twine::Value;
    ///
    /// let value = Value::future(|| async { Ok(Value::from(42)) });
    /// ```
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<Value, Error>> + 'static,
    {
        Value::Future(Rc::new(move || {
            let future: Pin<Box<dyn Future<Output = Result<Value, Error>>>> = Box::pin(f());
            future
        }))
    }

    /// Create a component [`Value`] from the given callable.
    pub fn component<F>(f: F) -> Self
    where
        F: Fn(&Attributes, &[Node]) -> Result<Element, Error> + 'static,
    {
        Value::Component(Rc::new(f))
    }

    /// Return the name of the kind of this value, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Data(Json::Null) => "null",
            Value::Data(Json::Bool(_)) => "boolean",
            Value::Data(Json::Number(_)) => "number",
            Value::Data(Json::String(_)) => "string",
            Value::Data(Json::Array(_)) => "sequence",
            Value::Data(Json::Object(_)) => "mapping",
            Value::Map(_) => "mapping",
            Value::Element(_) => "element",
            Value::Template(_) => "template",
            Value::Lazy(_) => "callable",
            Value::Future(_) => "async callable",
            Value::Component(_) => "component",
        }
    }

    /// Return the string inside this value, if it holds one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Data(Json::String(string)) => Some(string),
            _ => None,
        }
    }

    /// Feed this value to the given [`Hasher`].
    ///
    /// Hashing follows plain-value semantics: sequences and mappings have
    /// no hash, and a value containing one fails rather than falling back.
    /// Callables hash by identity.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the type kind when the value is unhashable.
    pub fn try_hash<H>(&self, state: &mut H) -> Result<(), Error>
    where
        H: Hasher,
    {
        match self {
            Value::Data(data) => hash_data(data, state),
            Value::Map(_) => Err(error_unhashable(self.kind_name())),
            Value::Element(element) => {
                state.write_u8(4);
                hash_element(element, state);
                Ok(())
            }
            Value::Template(template) => {
                state.write_u8(5);
                template.try_hash(state)
            }
            Value::Lazy(f) => {
                state.write_u8(6);
                state.write_usize(Rc::as_ptr(f) as *const () as usize);
                Ok(())
            }
            Value::Future(f) => {
                state.write_u8(7);
                state.write_usize(Rc::as_ptr(f) as *const () as usize);
                Ok(())
            }
            Value::Component(f) => {
                state.write_u8(8);
                state.write_usize(Rc::as_ptr(f) as *const () as usize);
                Ok(())
            }
        }
    }

    /// Render this value as a literal, strings quoted and escaped.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the type kind for values with no literal
    /// form, such as unresolved callables.
    pub fn repr(&self) -> Result<String, Error> {
        match self {
            Value::Data(data) => Ok(serde_json::to_string(data)
                .expect("writing a plain data value should not fail")),
            Value::Element(element) => Ok(element.to_string()),
            _ => Err(Error::build(
                ErrorKind::Type,
                format!("a {} value has no literal form", self.kind_name()),
            )),
        }
    }

    /// Render this value as [`repr`][`Value::repr`] does, escaping every
    /// non-ASCII character as a `\uXXXX` sequence.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of the type kind for values with no literal form.
    pub fn ascii(&self) -> Result<String, Error> {
        let text = self.repr()?;
        if text.is_ascii() {
            return Ok(text);
        }

        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if c.is_ascii() {
                escaped.push(c);
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    escaped.push_str(&format!("\\u{unit:04x}"));
                }
            }
        }

        Ok(escaped)
    }
}

/// Feed a plain data value to the given hasher.
fn hash_data<H>(data: &Json, state: &mut H) -> Result<(), Error>
where
    H: Hasher,
{
    match data {
        Json::Null => state.write_u8(0),
        Json::Bool(b) => {
            state.write_u8(1);
            state.write_u8(*b as u8);
        }
        Json::Number(n) => {
            state.write_u8(2);
            if let Some(i) = n.as_i64() {
                state.write_i64(i);
            } else if let Some(u) = n.as_u64() {
                state.write_u64(u);
            } else {
                state.write_u64(n.as_f64().unwrap_or(0.0).to_bits());
            }
        }
        Json::String(s) => {
            state.write_u8(3);
            state.write(s.as_bytes());
        }
        Json::Array(_) => return Err(error_unhashable("sequence")),
        Json::Object(_) => return Err(error_unhashable("mapping")),
    }

    Ok(())
}

/// Feed an element tree to the given hasher.
fn hash_element<H>(element: &Element, state: &mut H)
where
    H: Hasher,
{
    state.write(element.tag().as_bytes());
    for (key, value) in element.attributes().iter() {
        state.write(key.as_bytes());
        match value {
            crate::html::AttrValue::Text(text) => {
                state.write_u8(0);
                state.write(text.as_bytes());
            }
            crate::html::AttrValue::Flag(flag) => {
                state.write_u8(1);
                state.write_u8(*flag as u8);
            }
        }
    }
    for child in element.children() {
        match child {
            Node::Text(text) => {
                state.write_u8(0);
                state.write(text.as_bytes());
            }
            Node::Element(child) => {
                state.write_u8(1);
                hash_element(child, state);
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => a == b,
            (Value::Template(a), Value::Template(b)) => a == b,
            (Value::Lazy(a), Value::Lazy(b)) => Rc::ptr_eq(a, b),
            (Value::Future(a), Value::Future(b)) => Rc::ptr_eq(a, b),
            (Value::Component(a), Value::Component(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Data(data) => f.debug_tuple("Data").field(data).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Element(element) => f.debug_tuple("Element").field(element).finish(),
            Value::Template(template) => f.debug_tuple("Template").field(template).finish(),
            Value::Lazy(_) => f.write_str("Lazy(..)"),
            Value::Future(_) => f.write_str("Future(..)"),
            Value::Component(_) => f.write_str("Component(..)"),
        }
    }
}

impl From<Json> for Value {
    fn from(value: Json) -> Self {
        Value::Data(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Data(Json::String(value.to_owned()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Data(Json::String(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Data(Json::Bool(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Data(Json::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Data(Json::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Data(Json::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Data(Json::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Data(Json::from(value))
    }
}

impl From<Element> for Value {
    fn from(value: Element) -> Self {
        Value::Element(value)
    }
}

impl From<Template> for Value {
    fn from(value: Template) -> Self {
        Value::Template(Box::new(value))
    }
}

impl From<Attributes> for Value {
    fn from(value: Attributes) -> Self {
        Value::Map(value)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::log::ErrorKind;
    use serde_json::json;
    use std::collections::hash_map::DefaultHasher;

    #[test]
    fn test_serialize() {
        let value = Value::serialize(vec!["a", "b"]).unwrap();

        assert_eq!(value, Value::Data(json!(["a", "b"])));
        assert_eq!(value.kind_name(), "sequence");
    }

    #[test]
    fn test_repr_quotes_strings() {
        assert_eq!(Value::from("wow").repr().unwrap(), r#""wow""#);
        assert_eq!(Value::from(42).repr().unwrap(), "42");
    }

    #[test]
    fn test_ascii_escapes() {
        assert_eq!(Value::from("héllo").ascii().unwrap(), "\"h\\u00e9llo\"");
        assert_eq!(Value::from("plain").ascii().unwrap(), r#""plain""#);
    }

    #[test]
    fn test_callable_identity_equality() {
        let a = Value::lazy(|| Ok(Value::from(1)));
        let b = a.clone();
        let c = Value::lazy(|| Ok(Value::from(1)));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unhashable_sequence() {
        let mut hasher = DefaultHasher::new();
        let result = Value::Data(json!([1, 2])).try_hash(&mut hasher);

        assert!(result.is_err_and(|e| e.kind() == ErrorKind::Type));
    }

    #[test]
    fn test_hashable_scalars() {
        let mut hasher = DefaultHasher::new();
        assert!(Value::from("hello").try_hash(&mut hasher).is_ok());
        assert!(Value::from(3.5).try_hash(&mut hasher).is_ok());
    }
}
