//! Twine - Tagged Template Strings
//!
//! A template literal decomposes into an ordered, alternating sequence of
//! literal text and interpolations, each interpolation keeping its
//! computed value, the source text of its expression, and any conversion
//! and format spec. The [`t!`] macro builds a [`Template`]; a family of
//! consumers walks it:
//!
//! - [`f`] renders it to a string, [`aformat`] additionally resolves
//!   deferred values;
//! - [`from_format`] parses old-style `{field}` format strings into
//!   templates;
//! - [`format_some`] renders selectively, invoking only the callables a
//!   selector picks;
//! - [`Formatter`] and [`Binder`] treat interpolation values as names,
//!   reusable against many argument stores;
//! - [`TemplateMessage`] extracts a structured logging record;
//! - [`html::html`] parses a template into an [`html::Element`] tree.
//!
//! # Examples
//!
//! ```
//! use twine::{t, f};
//!
//! let name = "world";
//! let template = t!("Hello, ", {name}, "!");
//!
//! assert_eq!(f(&template).unwrap(), "Hello, world!");
//! ```

mod format;
pub mod html;
mod lazy;
mod log;
mod logging;
mod pipe;
mod region;
mod render;
mod reuse;
mod spec;
mod store;
mod template;
mod value;

pub use format::from_format;
pub use lazy::{format_some, format_some_with, PLACEHOLDER};
pub use log::{Error, ErrorKind, Pointer, Visual};
pub use logging::{Encode, JsonEncoder, TemplateMessage};
pub use region::Region;
pub use render::{aformat, f};
pub use reuse::{Binder, Formatter};
pub use spec::format_value;
pub use store::Store;
pub use template::{Conversion, Interpolation, Part, Template};
pub use value::{AsyncThunk, ComponentFn, Thunk, Value};
