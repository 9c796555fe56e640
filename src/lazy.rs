use crate::{
    log::{Error, ErrorKind},
    spec::format_value,
    template::{Part, Template},
    value::Value,
};
use std::borrow::Cow;

/// The text substituted for interpolations the selector does not match.
pub const PLACEHOLDER: &str = "***";

/// Render a [`Template`] whose interpolations carry selector labels in
/// their format specs, resolving only the ones matching `selector`.
///
/// Every interpolation value must be a [`Value::Lazy`] callable. A
/// matching interpolation is invoked, converted and appended; any other
/// interpolation appends [`PLACEHOLDER`] without being invoked, so the
/// work behind an unselected interpolation never runs.
///
/// # Errors
///
/// Returns an [`Error`] of the value kind when an interpolation value is
/// not a callable, and propagates any error from an invoked callable.
///
/// # Examples
///
/// ```
/// use twine::{t, format_some, Value};
///
/// let cheap = Value::lazy(|| Ok(Value::from("cheap")));
/// let costly = Value::lazy(|| unreachable!("never invoked"));
/// let template = t!({cheap ; "debug"}, " / ", {costly ; "trace"});
///
/// assert_eq!(format_some("debug", &template).unwrap(), "cheap / ***");
/// ```
pub fn format_some(selector: &str, template: &Template) -> Result<String, Error> {
    format_some_with(selector, template, PLACEHOLDER)
}

/// Render like [`format_some`], substituting the given placeholder text
/// for unselected interpolations.
pub fn format_some_with(
    selector: &str,
    template: &Template,
    placeholder: &str,
) -> Result<String, Error> {
    let mut buffer = String::new();

    for part in template.parts() {
        match part {
            Part::Literal(text) => buffer.push_str(text),
            Part::Interpolation(interpolation) => {
                let thunk = match &interpolation.value {
                    Value::Lazy(thunk) => thunk,
                    other => {
                        return Err(Error::build(
                            ErrorKind::Value,
                            "non-callable interpolation",
                        )
                        .with_help(format!(
                            "selective rendering requires callable values, found a {}",
                            other.kind_name()
                        )))
                    }
                };

                if interpolation.format_spec == selector {
                    let resolved = thunk()?;
                    let converted: Cow<Value> = match interpolation.conversion {
                        Some(conversion) => Cow::Owned(conversion.convert(&resolved)?),
                        None => Cow::Owned(resolved),
                    };
                    buffer.push_str(&format_value(&converted, "")?);
                } else {
                    buffer.push_str(placeholder);
                }
            }
        }
    }

    Ok(buffer)
}
