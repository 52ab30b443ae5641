#![forbid(unsafe_code)]

mod dot_name;
mod intern;
mod names;

pub use crate::dot_name::DotName;
pub use crate::intern::{ContentEq, InternPool, InternStrategy};
pub use crate::names::NameTable;
