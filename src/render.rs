use crate::{
    log::Error,
    spec::format_value,
    template::{Part, Template},
    value::Value,
};
use std::borrow::Cow;

/// Render a [`Template`] to the string a direct formatting of its parts
/// would produce.
///
/// Literals are appended verbatim; each interpolation has its conversion
/// applied, then its format spec, in template order.
///
/// # Errors
///
/// Returns an [`Error`] when a conversion or format spec does not apply
/// to an interpolation value. The error is the one
/// [`format_value`] produces for that value and spec, so a caller cannot
/// tell a template was involved.
///
/// # Examples
///
/// ```
/// use twine::{t, f};
///
/// let name = "world";
/// assert_eq!(f(&t!("Hello, ", {name}, "!")).unwrap(), "Hello, world!");
/// ```
pub fn f(template: &Template) -> Result<String, Error> {
    let mut buffer = String::with_capacity(literal_len(template));

    for part in template.parts() {
        match part {
            Part::Literal(text) => buffer.push_str(text),
            Part::Interpolation(interpolation) => {
                let converted: Cow<Value> = match interpolation.conversion {
                    Some(conversion) => Cow::Owned(conversion.convert(&interpolation.value)?),
                    None => Cow::Borrowed(&interpolation.value),
                };
                buffer.push_str(&format_value(&converted, &interpolation.format_spec)?);
            }
        }
    }

    Ok(buffer)
}

/// Render a [`Template`] like [`f`], resolving deferred values on the way.
///
/// A [`Value::Future`] interpolation is invoked and awaited; a
/// [`Value::Lazy`] interpolation is invoked; any other value is used
/// as-is. Resolutions run strictly in template order, one completing
/// before the next begins.
///
/// # Errors
///
/// Returns an [`Error`] when a resolution fails, or when a conversion or
/// format spec does not apply to a resolved value. A failing resolution
/// aborts the render immediately; no partial result is returned.
///
/// # Examples
///
/// ```
/// use twine::{t, aformat, Value};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let stat = Value::future(|| async { Ok(Value::from(99)) });
/// assert_eq!(aformat(&t!("total: ", {stat})).await.unwrap(), "total: 99");
/// # });
/// ```
pub async fn aformat(template: &Template) -> Result<String, Error> {
    let mut buffer = String::with_capacity(literal_len(template));

    for part in template.parts() {
        match part {
            Part::Literal(text) => buffer.push_str(text),
            Part::Interpolation(interpolation) => {
                let resolved: Cow<Value> = match &interpolation.value {
                    Value::Future(thunk) => Cow::Owned(thunk().await?),
                    Value::Lazy(thunk) => Cow::Owned(thunk()?),
                    value => Cow::Borrowed(value),
                };
                let converted: Cow<Value> = match interpolation.conversion {
                    Some(conversion) => Cow::Owned(conversion.convert(&resolved)?),
                    None => resolved,
                };
                buffer.push_str(&format_value(&converted, &interpolation.format_spec)?);
            }
        }
    }

    Ok(buffer)
}

/// Total length of the literal parts, a lower bound for the output.
fn literal_len(template: &Template) -> usize {
    template
        .parts()
        .iter()
        .map(|part| match part {
            Part::Literal(text) => text.len(),
            Part::Interpolation(_) => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{aformat, f};
    use crate::{
        log::ErrorKind,
        spec::format_value,
        t,
        template::{Interpolation, Part, Template},
        value::Value,
    };
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn test_render_literal() {
        assert_eq!(f(&Template::literal("hello there")).unwrap(), "hello there");
    }

    #[test]
    fn test_render_scenario() {
        let template = Template::new(vec![
            Part::Literal("Hello, ".into()),
            Part::Interpolation(Interpolation::new("world", "name")),
        ]);

        assert_eq!(f(&template).unwrap(), "Hello, world");
    }

    #[test]
    fn test_render_conversion_and_spec() {
        let value = 255;
        assert_eq!(f(&t!({value ; "#x"})).unwrap(), "0xff");
        assert_eq!(f(&t!({"wow" => r})).unwrap(), "\"wow\"");
    }

    #[test]
    fn test_render_error_matches_direct_format() {
        let value = "not a number";
        let from_template = f(&t!({value ; "04d"})).unwrap_err();
        let direct = format_value(&Value::from(value), "04d").unwrap_err();

        assert_eq!(from_template, direct);
    }

    #[tokio::test]
    async fn test_aformat_plain_values() {
        let name = "world";
        assert_eq!(aformat(&t!("Hello, ", {name}, "!")).await.unwrap(), "Hello, world!");
    }

    #[tokio::test]
    async fn test_aformat_resolves_thunks() {
        let lazy = Value::lazy(|| Ok(Value::from("sync")));
        let deferred = Value::future(|| async { Ok(Value::from("async")) });
        let template = t!({lazy}, " and ", {deferred});

        assert_eq!(aformat(&template).await.unwrap(), "sync and async");
    }

    #[tokio::test]
    async fn test_aformat_sequential_order() {
        let order = Rc::new(RefCell::new(Vec::new()));

        let first = {
            let order = Rc::clone(&order);
            Value::future(move || {
                let order = Rc::clone(&order);
                async move {
                    order.borrow_mut().push(1);
                    Ok(Value::from("a"))
                }
            })
        };
        let second = {
            let order = Rc::clone(&order);
            Value::future(move || {
                let order = Rc::clone(&order);
                async move {
                    order.borrow_mut().push(2);
                    Ok(Value::from("b"))
                }
            })
        };

        assert_eq!(aformat(&t!({first}, {second})).await.unwrap(), "ab");
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_aformat_failing_resolution_aborts() {
        let broken = Value::future(|| async {
            Err(crate::log::Error::build(ErrorKind::Value, "boom"))
        });
        let result = aformat(&t!("before ", {broken}, " after")).await;

        assert!(result.is_err_and(|e| e.reason() == "boom"));
    }
}
