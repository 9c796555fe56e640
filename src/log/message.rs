use super::{Error, ErrorKind};
use std::fmt::Display;

pub const UNKNOWN_CONVERSION: &str = "unknown conversion specifier";
pub const MIXED_NUMBERING: &str =
    "cannot switch between automatic and manual field numbering";
pub const MISSING_KEYWORD: &str = "missing keyword argument";
pub const INDEX_OUT_OF_RANGE: &str = "replacement index out of range";
pub const INVALID_FORMAT_SPEC: &str = "invalid format spec";
pub const UNHASHABLE_VALUE: &str = "unhashable value";
pub const UNEXPECTED_EOF: &str = "unexpected end of format string";
pub const MULTIPLE_ROOTS: &str = "multiple root elements";
pub const NO_ROOT: &str = "no root element";
pub const STRAY_DATA: &str = "data outside of root element";
pub const UNEXPECTED_END_TAG: &str = "unexpected end tag";
pub const UNSUPPORTED_INTERPOLATION: &str = "unsupported interpolation";

/// Return an [`Error`] describing an unrecognized conversion tag.
pub fn error_unknown_conversion<T>(tag: T) -> Error
where
    T: Display,
{
    Error::build(ErrorKind::Value, UNKNOWN_CONVERSION).with_help(format!(
        "found `{tag}`, expected one of `a`, `r`, `s`"
    ))
}

/// Return an [`Error`] describing a missing keyword argument.
pub fn error_missing_keyword(name: &str) -> Error {
    Error::build(ErrorKind::Key, MISSING_KEYWORD).with_help(format!(
        "`{name}` was not found in the store, add it with `.insert`"
    ))
}

/// Return an [`Error`] describing an out of range positional index.
pub fn error_index_out_of_range(index: usize, len: usize) -> Error {
    Error::build(ErrorKind::Index, INDEX_OUT_OF_RANGE).with_help(format!(
        "index {index} is out of range for {len} positional arguments"
    ))
}

/// Return an [`Error`] describing a value that cannot be hashed.
pub fn error_unhashable(kind_name: &str) -> Error {
    Error::build(ErrorKind::Type, UNHASHABLE_VALUE)
        .with_help(format!("a {kind_name} value has no hash"))
}
