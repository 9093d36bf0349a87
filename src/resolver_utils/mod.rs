//! Field execution: collection, argument coercion, resolver dispatch and
//! value completion.

mod abstract_type;
mod container;
mod field;
mod input;
mod list;

pub(crate) use container::{collect_fields, resolve_container, resolve_container_serial, CollectedField};
pub(crate) use field::{coerce_arguments, complete_field_value, dispatch_resolver, extract_result, resolve_field};
pub use input::resolve_input;
