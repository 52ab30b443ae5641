use std::sync::Arc;

use quarry_core::{DotName, NameTable};

use crate::constant_pool::ConstantPool;
use crate::error::Result;
use crate::reader::Reader;

/// A decoded `module-info.class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: DotName,
    pub is_open: bool,
    pub version: Option<Arc<str>>,
    pub requires: Vec<Requires>,
    pub exports: Vec<Exports>,
    pub opens: Vec<Opens>,
    pub uses: Vec<Uses>,
    pub provides: Vec<Provides>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requires {
    pub module: DotName,
    pub is_transitive: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exports {
    pub package: DotName,
    pub to: Vec<DotName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opens {
    pub package: DotName,
    pub to: Vec<DotName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uses {
    pub service: DotName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provides {
    pub service: DotName,
    pub implementations: Vec<DotName>,
}

pub(crate) fn parse_module_attribute(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    names: &mut NameTable,
) -> Result<ModuleInfo> {
    const ACC_OPEN: u16 = 0x0020;
    const ACC_TRANSITIVE: u16 = 0x0020;
    const ACC_STATIC_PHASE: u16 = 0x0040;

    let module_name_index = reader.read_u2()?;
    let module_flags = reader.read_u2()?;
    let module_version_index = reader.read_u2()?;

    let name = names.convert_to_name(cp.get_module_name(module_name_index)?);
    let is_open = (module_flags & ACC_OPEN) != 0;
    let version = if module_version_index == 0 {
        None
    } else {
        Some(names.intern_str(cp.get_utf8(module_version_index)?))
    };

    let requires_count = reader.read_u2()? as usize;
    let mut requires = Vec::with_capacity(requires_count);
    for _ in 0..requires_count {
        let requires_index = reader.read_u2()?;
        let requires_flags = reader.read_u2()?;
        let _requires_version_index = reader.read_u2()?;
        requires.push(Requires {
            module: names.convert_to_name(cp.get_module_name(requires_index)?),
            is_transitive: (requires_flags & ACC_TRANSITIVE) != 0,
            is_static: (requires_flags & ACC_STATIC_PHASE) != 0,
        });
    }

    let exports_count = reader.read_u2()? as usize;
    let mut exports = Vec::with_capacity(exports_count);
    for _ in 0..exports_count {
        let exports_index = reader.read_u2()?;
        let _exports_flags = reader.read_u2()?;
        let exports_to_count = reader.read_u2()? as usize;
        let package = names.convert_internal(cp.get_package_name(exports_index)?);
        let mut to = Vec::with_capacity(exports_to_count);
        for _ in 0..exports_to_count {
            let to_index = reader.read_u2()?;
            to.push(names.convert_to_name(cp.get_module_name(to_index)?));
        }
        exports.push(Exports { package, to });
    }

    let opens_count = reader.read_u2()? as usize;
    let mut opens = Vec::with_capacity(opens_count);
    for _ in 0..opens_count {
        let opens_index = reader.read_u2()?;
        let _opens_flags = reader.read_u2()?;
        let opens_to_count = reader.read_u2()? as usize;
        let package = names.convert_internal(cp.get_package_name(opens_index)?);
        let mut to = Vec::with_capacity(opens_to_count);
        for _ in 0..opens_to_count {
            let to_index = reader.read_u2()?;
            to.push(names.convert_to_name(cp.get_module_name(to_index)?));
        }
        opens.push(Opens { package, to });
    }

    let uses_count = reader.read_u2()? as usize;
    let mut uses = Vec::with_capacity(uses_count);
    for _ in 0..uses_count {
        let uses_index = reader.read_u2()?;
        uses.push(Uses {
            service: names.convert_internal(cp.get_class_name(uses_index)?),
        });
    }

    let provides_count = reader.read_u2()? as usize;
    let mut provides = Vec::with_capacity(provides_count);
    for _ in 0..provides_count {
        let service_index = reader.read_u2()?;
        let with_count = reader.read_u2()? as usize;
        let service = names.convert_internal(cp.get_class_name(service_index)?);
        let mut implementations = Vec::with_capacity(with_count);
        for _ in 0..with_count {
            let with_index = reader.read_u2()?;
            implementations.push(names.convert_internal(cp.get_class_name(with_index)?));
        }
        provides.push(Provides {
            service,
            implementations,
        });
    }

    Ok(ModuleInfo {
        name,
        is_open,
        version,
        requires,
        exports,
        opens,
        uses,
        provides,
    })
}
