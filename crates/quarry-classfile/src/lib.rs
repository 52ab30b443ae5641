#![forbid(unsafe_code)]

mod annotations;
mod class_info;
mod constant_pool;
mod error;
mod indexer;
mod member_info;
mod module_info;
mod reader;

pub use crate::class_info::{
    flags, ClassInfo, ClassVersion, EnclosingMethod, Nesting,
};
pub use crate::error::{Error, Result};
pub use crate::indexer::{Indexed, Indexer, IndexerOptions};
pub use crate::member_info::{FieldInfo, MethodInfo, MethodParameter, RecordComponentInfo};
pub use crate::module_info::{Exports, ModuleInfo, Opens, Provides, Requires, Uses};
