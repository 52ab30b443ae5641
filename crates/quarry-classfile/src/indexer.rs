use std::sync::Arc;

use serde::{Deserialize, Serialize};

use quarry_core::DotName;
use quarry_types::{
    parse_class_signature, parse_field_descriptor, parse_field_signature, parse_method_descriptor,
    parse_method_signature, AnnotationInstance, AnnotationTarget, AnnotationValue,
    AnnotationValueKind, ClassType, PrimitiveKind, Type, TypeParameterScope, TypePosition,
    TypeStore,
};

use crate::annotations::{
    attach_type_annotation, parse_annotation, parse_element_value, parse_type_annotation,
    RawAnnotation, TypeAnnotationRecord,
};
use crate::class_info::{flags, ClassInfo, ClassInfoInner, ClassVersion, EnclosingMethod, Nesting};
use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::member_info::{
    FieldInfo, FieldInfoInner, MethodInfo, MethodInfoInner, MethodParameter, RecordComponentInfo,
    RecordComponentInfoInner,
};
use crate::module_info::{parse_module_attribute, ModuleInfo};
use crate::reader::Reader;

fn default_true() -> bool {
    true
}

fn default_min_version() -> u16 {
    45
}

fn default_max_version() -> u16 {
    69
}

/// Decoding-session configuration, loadable from build-tool config files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexerOptions {
    /// Reconstruct parameter names from the local variable table when no
    /// `MethodParameters` attribute is present.
    #[serde(default = "default_true")]
    pub parameter_names_from_debug_info: bool,
    /// Decode `RuntimeInvisible*` annotation attributes too.
    #[serde(default = "default_true")]
    pub record_invisible_annotations: bool,
    /// Lowest accepted major class-file version (45 = Java 1.1).
    #[serde(default = "default_min_version")]
    pub min_class_file_version: u16,
    /// Highest accepted major class-file version.
    #[serde(default = "default_max_version")]
    pub max_class_file_version: u16,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        IndexerOptions {
            parameter_names_from_debug_info: true,
            record_invisible_annotations: true,
            min_class_file_version: default_min_version(),
            max_class_file_version: default_max_version(),
        }
    }
}

/// The result of indexing one class file.
#[derive(Debug, Clone)]
pub enum Indexed {
    Class(ClassInfo),
    Module(ModuleInfo),
}

/// A decoding session: owns the name table and intern pools, decodes class
/// files one at a time, and accumulates the batch handed to the index.
///
/// One indexer per pipeline; it is single-threaded for its lifetime. Callers
/// wanting parallel throughput run independent indexers and merge the
/// resulting indexes afterwards.
pub struct Indexer {
    store: TypeStore,
    options: IndexerOptions,
    classes: Vec<ClassInfo>,
    modules: Vec<ModuleInfo>,
}

impl Indexer {
    pub fn new() -> Indexer {
        Indexer::with_options(IndexerOptions::default())
    }

    pub fn with_options(options: IndexerOptions) -> Indexer {
        Indexer {
            store: TypeStore::new(),
            options,
            classes: Vec::new(),
            modules: Vec::new(),
        }
    }

    pub fn options(&self) -> &IndexerOptions {
        &self.options
    }

    /// The session's interning state (names, types, positional ordinals).
    pub fn store(&self) -> &TypeStore {
        &self.store
    }

    /// Classes indexed so far, in decode order (1-based ordinal = position + 1).
    pub fn classes(&self) -> &[ClassInfo] {
        &self.classes
    }

    pub fn modules(&self) -> &[ModuleInfo] {
        &self.modules
    }

    /// Decode one class file and add it to the batch. On error nothing is
    /// recorded: a class is either fully indexed or not indexed at all.
    pub fn index(&mut self, bytes: &[u8]) -> Result<Indexed> {
        let decoded = decode(bytes, &mut self.store, &self.options)?;
        match &decoded {
            Indexed::Class(class) => self.classes.push(class.clone()),
            Indexed::Module(module) => self.modules.push(module.clone()),
        }
        Ok(decoded)
    }

    /// Finish the session, handing the decoded batch (and the interning
    /// state, reusable for incremental indexing) to the caller.
    pub fn into_parts(self) -> (Vec<ClassInfo>, Vec<ModuleInfo>, TypeStore) {
        (self.classes, self.modules, self.store)
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// Raw (stream-order) member records
// -----------------------------------------------------------------------------

struct RawField<'a> {
    flags: u16,
    name: Arc<str>,
    descriptor: Arc<str>,
    signature: Option<&'a str>,
    annotations: Vec<(RawAnnotation, bool)>,
    type_annotations: Vec<TypeAnnotationRecord>,
}

struct RawMethod<'a> {
    flags: u16,
    name: Arc<str>,
    descriptor: Arc<str>,
    signature: Option<&'a str>,
    exceptions: Vec<DotName>,
    annotations: Vec<(RawAnnotation, bool)>,
    parameter_annotations: Vec<Vec<(RawAnnotation, bool)>>,
    type_annotations: Vec<TypeAnnotationRecord>,
    /// `MethodParameters` entries: (name, access flags).
    method_parameters: Option<Vec<(Option<Arc<str>>, u16)>>,
    /// Local variable table names covering the method entry: (slot, name).
    local_variables: Vec<(u16, Arc<str>)>,
    default_value: Option<AnnotationValueKind>,
}

struct RawComponent<'a> {
    name: Arc<str>,
    descriptor: Arc<str>,
    signature: Option<&'a str>,
    annotations: Vec<(RawAnnotation, bool)>,
    type_annotations: Vec<TypeAnnotationRecord>,
}

#[derive(Default)]
struct RawClassAttributes<'a> {
    signature: Option<&'a str>,
    annotations: Vec<(RawAnnotation, bool)>,
    type_annotations: Vec<TypeAnnotationRecord>,
    components: Vec<RawComponent<'a>>,
    has_record_attribute: bool,
    /// This class's own `InnerClasses` entry: (outer, simple name, flags).
    own_inner_entry: Option<(Option<DotName>, Option<Arc<str>>, u16)>,
    enclosing_method: Option<EnclosingMethod>,
    module: Option<ModuleInfo>,
}

fn sort_annotations(mut annotations: Vec<AnnotationInstance>) -> Box<[AnnotationInstance]> {
    annotations.sort_by(|a, b| a.name().cmp(b.name()));
    annotations.into_boxed_slice()
}

// -----------------------------------------------------------------------------
// Decode
// -----------------------------------------------------------------------------

fn decode(bytes: &[u8], store: &mut TypeStore, options: &IndexerOptions) -> Result<Indexed> {
    let mut reader = Reader::new(bytes);
    let magic = reader.read_u4()?;
    if magic != 0xCAFE_BABE {
        return Err(Error::InvalidMagic(magic));
    }
    let minor = reader.read_u2()?;
    let major = reader.read_u2()?;
    if major < options.min_class_file_version || major > options.max_class_file_version {
        return Err(Error::UnsupportedVersion { major, minor });
    }

    let cp = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.read_u2()?;
    let this_internal = cp.get_class_name(reader.read_u2()?)?;
    let name = store.names_mut().convert_internal(this_internal);

    let super_index = reader.read_u2()?;
    let super_name = if super_index == 0 {
        None
    } else {
        Some(store.names_mut().convert_internal(cp.get_class_name(super_index)?))
    };

    let interfaces_count = reader.read_u2()? as usize;
    let mut interface_names = Vec::with_capacity(interfaces_count);
    for _ in 0..interfaces_count {
        interface_names.push(store.names_mut().convert_internal(cp.get_class_name(reader.read_u2()?)?));
    }

    let fields_count = reader.read_u2()? as usize;
    let mut raw_fields = Vec::with_capacity(fields_count);
    for _ in 0..fields_count {
        raw_fields.push(read_field(&mut reader, &cp, store, options)?);
    }

    let methods_count = reader.read_u2()? as usize;
    let mut raw_methods = Vec::with_capacity(methods_count);
    for _ in 0..methods_count {
        raw_methods.push(read_method(&mut reader, &cp, store, options)?);
    }

    let class_attrs = read_class_attributes(
        &mut reader,
        &cp,
        store,
        options,
        this_internal,
        access_flags,
    )?;
    reader.ensure_empty()?;

    if access_flags & flags::MODULE != 0 {
        let module = class_attrs
            .module
            .ok_or(Error::Other("missing Module attribute"))?;
        return Ok(Indexed::Module(module));
    }

    // Everything is read; resolve signatures and attach type annotations
    // against the in-memory structures (the stream is never revisited).
    let class = resolve_class(
        ClassVersion { major, minor },
        name,
        access_flags,
        super_name,
        interface_names,
        raw_fields,
        raw_methods,
        class_attrs,
        store,
    )?;
    Ok(Indexed::Class(class))
}

fn read_field<'a>(
    reader: &mut Reader<'_>,
    cp: &'a ConstantPool,
    store: &mut TypeStore,
    options: &IndexerOptions,
) -> Result<RawField<'a>> {
    let flags = reader.read_u2()?;
    let name = store.names_mut().intern_str(cp.get_utf8(reader.read_u2()?)?);
    let descriptor = store.names_mut().intern_str(cp.get_utf8(reader.read_u2()?)?);

    let mut field = RawField {
        flags,
        name,
        descriptor,
        signature: None,
        annotations: Vec::new(),
        type_annotations: Vec::new(),
    };

    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        let attr_name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let attr_name = cp.get_utf8(attr_name_index)?;

        let mut sub = Reader::new(info);
        match attr_name {
            "Signature" => {
                field.signature = Some(cp.get_utf8(sub.read_u2()?)?);
                sub.ensure_empty()?;
            }
            "RuntimeVisibleAnnotations" => {
                read_annotation_list(&mut sub, cp, store, true, &mut field.annotations)?;
            }
            "RuntimeInvisibleAnnotations" if options.record_invisible_annotations => {
                read_annotation_list(&mut sub, cp, store, false, &mut field.annotations)?;
            }
            "RuntimeVisibleTypeAnnotations" => {
                read_type_annotation_list(&mut sub, cp, store, true, &mut field.type_annotations)?;
            }
            "RuntimeInvisibleTypeAnnotations" if options.record_invisible_annotations => {
                read_type_annotation_list(&mut sub, cp, store, false, &mut field.type_annotations)?;
            }
            _ => {
                // Unknown attribute: intentionally skipped.
            }
        }
    }
    Ok(field)
}

fn read_method<'a>(
    reader: &mut Reader<'_>,
    cp: &'a ConstantPool,
    store: &mut TypeStore,
    options: &IndexerOptions,
) -> Result<RawMethod<'a>> {
    let flags = reader.read_u2()?;
    let name = store.names_mut().intern_str(cp.get_utf8(reader.read_u2()?)?);
    let descriptor = store.names_mut().intern_str(cp.get_utf8(reader.read_u2()?)?);

    let mut method = RawMethod {
        flags,
        name,
        descriptor,
        signature: None,
        exceptions: Vec::new(),
        annotations: Vec::new(),
        parameter_annotations: Vec::new(),
        type_annotations: Vec::new(),
        method_parameters: None,
        local_variables: Vec::new(),
        default_value: None,
    };

    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        let attr_name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let attr_name = cp.get_utf8(attr_name_index)?;

        let mut sub = Reader::new(info);
        match attr_name {
            "Signature" => {
                method.signature = Some(cp.get_utf8(sub.read_u2()?)?);
                sub.ensure_empty()?;
            }
            "Exceptions" => {
                let count = sub.read_u2()? as usize;
                for _ in 0..count {
                    let class_index = sub.read_u2()?;
                    method
                        .exceptions
                        .push(store.names_mut().convert_internal(cp.get_class_name(class_index)?));
                }
                sub.ensure_empty()?;
            }
            "RuntimeVisibleAnnotations" => {
                read_annotation_list(&mut sub, cp, store, true, &mut method.annotations)?;
            }
            "RuntimeInvisibleAnnotations" if options.record_invisible_annotations => {
                read_annotation_list(&mut sub, cp, store, false, &mut method.annotations)?;
            }
            "RuntimeVisibleParameterAnnotations" => {
                read_parameter_annotations(&mut sub, cp, store, true, &mut method.parameter_annotations)?;
            }
            "RuntimeInvisibleParameterAnnotations" if options.record_invisible_annotations => {
                read_parameter_annotations(&mut sub, cp, store, false, &mut method.parameter_annotations)?;
            }
            "RuntimeVisibleTypeAnnotations" => {
                read_type_annotation_list(&mut sub, cp, store, true, &mut method.type_annotations)?;
            }
            "RuntimeInvisibleTypeAnnotations" if options.record_invisible_annotations => {
                read_type_annotation_list(&mut sub, cp, store, false, &mut method.type_annotations)?;
            }
            "MethodParameters" => {
                let count = sub.read_u1()? as usize;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let name_index = sub.read_u2()?;
                    let parameter_flags = sub.read_u2()?;
                    let name = if name_index == 0 {
                        None
                    } else {
                        Some(store.names_mut().intern_str(cp.get_utf8(name_index)?))
                    };
                    entries.push((name, parameter_flags));
                }
                sub.ensure_empty()?;
                method.method_parameters = Some(entries);
            }
            "AnnotationDefault" => {
                method.default_value = Some(parse_element_value(&mut sub, cp, store, true)?);
                sub.ensure_empty()?;
            }
            "Code" if options.parameter_names_from_debug_info => {
                read_code_local_variables(&mut sub, cp, store, &mut method.local_variables)?;
            }
            _ => {
                // Unknown attribute: intentionally skipped.
            }
        }
    }
    Ok(method)
}

fn read_annotation_list(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    store: &mut TypeStore,
    visible: bool,
    out: &mut Vec<(RawAnnotation, bool)>,
) -> Result<()> {
    let count = reader.read_u2()? as usize;
    for _ in 0..count {
        out.push((parse_annotation(reader, cp, store, visible)?, visible));
    }
    reader.ensure_empty()
}

fn read_parameter_annotations(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    store: &mut TypeStore,
    visible: bool,
    out: &mut Vec<Vec<(RawAnnotation, bool)>>,
) -> Result<()> {
    let parameter_count = reader.read_u1()? as usize;
    if out.len() < parameter_count {
        out.resize_with(parameter_count, Vec::new);
    }
    for slot in out.iter_mut().take(parameter_count) {
        let count = reader.read_u2()? as usize;
        for _ in 0..count {
            slot.push((parse_annotation(reader, cp, store, visible)?, visible));
        }
    }
    reader.ensure_empty()
}

fn read_type_annotation_list(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    store: &mut TypeStore,
    visible: bool,
    out: &mut Vec<TypeAnnotationRecord>,
) -> Result<()> {
    let count = reader.read_u2()? as usize;
    for _ in 0..count {
        out.push(parse_type_annotation(reader, cp, store, visible)?);
    }
    reader.ensure_empty()
}

/// Scan a `Code` attribute for the `LocalVariableTable`, keeping entries
/// that cover the method entry point (parameter slots).
fn read_code_local_variables(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    store: &mut TypeStore,
    out: &mut Vec<(u16, Arc<str>)>,
) -> Result<()> {
    let _max_stack = reader.read_u2()?;
    let _max_locals = reader.read_u2()?;
    let code_length = reader.read_u4()? as usize;
    reader.read_bytes(code_length)?;
    let exception_table_length = reader.read_u2()? as usize;
    reader.read_bytes(exception_table_length * 8)?;

    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        let attr_name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let attr_name = cp.get_utf8(attr_name_index)?;

        if attr_name == "LocalVariableTable" {
            let mut sub = Reader::new(info);
            let count = sub.read_u2()? as usize;
            for _ in 0..count {
                let start_pc = sub.read_u2()?;
                let _length = sub.read_u2()?;
                let name_index = sub.read_u2()?;
                let _descriptor_index = sub.read_u2()?;
                let slot = sub.read_u2()?;
                if start_pc == 0 {
                    out.push((slot, store.names_mut().intern_str(cp.get_utf8(name_index)?)));
                }
            }
            sub.ensure_empty()?;
        }
    }
    Ok(())
}

fn read_class_attributes<'a>(
    reader: &mut Reader<'_>,
    cp: &'a ConstantPool,
    store: &mut TypeStore,
    options: &IndexerOptions,
    this_internal: &str,
    access_flags: u16,
) -> Result<RawClassAttributes<'a>> {
    let mut attrs = RawClassAttributes::default();

    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        let attr_name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let attr_name = cp.get_utf8(attr_name_index)?;

        let mut sub = Reader::new(info);
        match attr_name {
            "Signature" => {
                attrs.signature = Some(cp.get_utf8(sub.read_u2()?)?);
                sub.ensure_empty()?;
            }
            "RuntimeVisibleAnnotations" => {
                read_annotation_list(&mut sub, cp, store, true, &mut attrs.annotations)?;
            }
            "RuntimeInvisibleAnnotations" if options.record_invisible_annotations => {
                read_annotation_list(&mut sub, cp, store, false, &mut attrs.annotations)?;
            }
            "RuntimeVisibleTypeAnnotations" => {
                read_type_annotation_list(&mut sub, cp, store, true, &mut attrs.type_annotations)?;
            }
            "RuntimeInvisibleTypeAnnotations" if options.record_invisible_annotations => {
                read_type_annotation_list(&mut sub, cp, store, false, &mut attrs.type_annotations)?;
            }
            "InnerClasses" => {
                let count = sub.read_u2()? as usize;
                for _ in 0..count {
                    let inner_index = sub.read_u2()?;
                    let outer_index = sub.read_u2()?;
                    let inner_name_index = sub.read_u2()?;
                    let inner_flags = sub.read_u2()?;
                    if cp.get_class_name(inner_index)? == this_internal {
                        let outer = if outer_index == 0 {
                            None
                        } else {
                            Some(store.names_mut().convert_internal(cp.get_class_name(outer_index)?))
                        };
                        let simple = if inner_name_index == 0 {
                            None
                        } else {
                            Some(store.names_mut().intern_str(cp.get_utf8(inner_name_index)?))
                        };
                        attrs.own_inner_entry = Some((outer, simple, inner_flags));
                    }
                }
                sub.ensure_empty()?;
            }
            "EnclosingMethod" => {
                let class_index = sub.read_u2()?;
                let method_index = sub.read_u2()?;
                let class = store.names_mut().convert_internal(cp.get_class_name(class_index)?);
                let (method_name, method_descriptor) = if method_index == 0 {
                    (None, None)
                } else {
                    match cp.get(method_index)? {
                        crate::constant_pool::CpInfo::NameAndType {
                            name_index,
                            descriptor_index,
                        } => (
                            Some(store.names_mut().intern_str(cp.get_utf8(*name_index)?)),
                            Some(store.names_mut().intern_str(cp.get_utf8(*descriptor_index)?)),
                        ),
                        other => {
                            return Err(Error::ConstantPoolTypeMismatch {
                                index: method_index,
                                expected: "NameAndType",
                                found: other.kind(),
                            })
                        }
                    }
                };
                attrs.enclosing_method = Some(EnclosingMethod {
                    class,
                    name: method_name,
                    descriptor: method_descriptor,
                });
                sub.ensure_empty()?;
            }
            "Record" => {
                attrs.has_record_attribute = true;
                let count = sub.read_u2()? as usize;
                for _ in 0..count {
                    attrs.components.push(read_record_component(&mut sub, cp, store, options)?);
                }
                sub.ensure_empty()?;
            }
            "Module" if access_flags & flags::MODULE != 0 => {
                let module = parse_module_attribute(&mut sub, cp, store.names_mut())?;
                sub.ensure_empty()?;
                attrs.module = Some(module);
            }
            _ => {
                // Unknown attribute: intentionally skipped.
            }
        }
    }
    Ok(attrs)
}

// -----------------------------------------------------------------------------
// Resolution: signatures, type annotations, parameter names
// -----------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn resolve_class(
    version: ClassVersion,
    name: DotName,
    access_flags: u16,
    super_name: Option<DotName>,
    interface_names: Vec<DotName>,
    raw_fields: Vec<RawField<'_>>,
    raw_methods: Vec<RawMethod<'_>>,
    class_attrs: RawClassAttributes<'_>,
    store: &mut TypeStore,
) -> Result<ClassInfo> {
    let RawClassAttributes {
        signature: class_signature,
        annotations: class_annotations,
        type_annotations: class_type_annotations,
        components,
        has_record_attribute,
        own_inner_entry,
        enclosing_method,
        module: _,
    } = class_attrs;

    let mut all_annotations: Vec<AnnotationInstance> = Vec::new();

    // Class signature (or raw types when absent).
    let (mut type_parameters, mut super_class_type, mut interface_types) =
        match class_signature {
            Some(signature) => {
                let parsed = parse_class_signature(signature, &TypeParameterScope::new(), store)?;
                (
                    parsed.type_parameters,
                    Some(parsed.super_class),
                    parsed.interfaces,
                )
            }
            None => {
                let super_class_type = super_name
                    .clone()
                    .map(|n| store.intern_type(ClassType::new(n, vec![]).into()));
                let interface_types = interface_names
                    .iter()
                    .map(|n| store.intern_type(ClassType::new(n.clone(), vec![]).into()))
                    .collect();
                (Vec::new(), super_class_type, interface_types)
            }
        };

    let class_scope = TypeParameterScope::of_type_parameters(&type_parameters);
    let class_target = AnnotationTarget::Class(name.clone());

    // Class-level type annotations.
    for record in class_type_annotations {
        let instance = record.annotation.clone().into_instance(
            Some(AnnotationTarget::Type {
                enclosing: Box::new(class_target.clone()),
                position: record.position,
            }),
            record.visible,
        );
        all_annotations.push(instance.clone());
        match record.position {
            TypePosition::ClassExtends { index } => {
                if index == 65535 {
                    if let Some(super_type) = &super_class_type {
                        super_class_type =
                            Some(attach_type_annotation(super_type, &record.path, instance)?);
                    }
                } else {
                    let slot = interface_types
                        .get_mut(index as usize)
                        .ok_or(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"))?;
                    *slot = attach_type_annotation(slot, &record.path, instance)?;
                }
            }
            TypePosition::TypeParameter { index } => {
                annotate_type_parameter(&mut type_parameters, index, &record.path, instance)?;
            }
            TypePosition::TypeParameterBound { parameter, bound } => {
                annotate_type_parameter_bound(
                    &mut type_parameters,
                    parameter,
                    bound,
                    &record.path,
                    instance,
                )?;
            }
            _ => return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations")),
        }
    }

    // Fields.
    let mut fields = Vec::with_capacity(raw_fields.len());
    for raw in raw_fields {
        fields.push(resolve_field(&name, raw, &class_scope, store, &mut all_annotations)?);
    }
    fields.sort_by(|a, b| a.name().cmp(b.name()));

    // Nesting, needed before methods for the constructor-parameter
    // conventions of inner and enum classes.
    let nesting = resolve_nesting(&own_inner_entry, &enclosing_method);
    let inner_non_static = matches!(nesting, Nesting::Inner { .. })
        && own_inner_entry
            .as_ref()
            .map_or(false, |(_, _, inner_flags)| inner_flags & flags::STATIC == 0);
    let conventions = ConstructorConventions {
        is_enum: access_flags & flags::ENUM != 0,
        inner_non_static,
    };

    // Methods.
    let mut methods = Vec::with_capacity(raw_methods.len());
    for raw in raw_methods {
        methods.push(resolve_method(
            &name,
            raw,
            &class_scope,
            &conventions,
            store,
            &mut all_annotations,
        )?);
    }
    methods.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then_with(|| a.descriptor().cmp(b.descriptor()))
    });

    // Record components.
    let mut record_components = Vec::with_capacity(components.len());
    for raw in components {
        record_components.push(resolve_record_component(
            &name,
            raw,
            &class_scope,
            store,
            &mut all_annotations,
        )?);
    }

    // Declaration annotations.
    let mut declaration = Vec::with_capacity(class_annotations.len());
    for (raw, visible) in class_annotations {
        let instance = raw.into_instance(Some(class_target.clone()), visible);
        all_annotations.push(instance.clone());
        declaration.push(instance);
    }

    let interface_types = store.intern_type_list(interface_types);
    let type_parameters = store.intern_type_list(type_parameters);

    Ok(ClassInfo::from_inner(ClassInfoInner {
        name,
        flags: access_flags,
        version,
        super_name,
        interface_names: interface_names.into_boxed_slice(),
        super_class_type,
        interface_types,
        type_parameters,
        fields: fields.into_boxed_slice(),
        methods: methods.into_boxed_slice(),
        record_components: record_components.into_boxed_slice(),
        has_record_attribute,
        annotations: sort_annotations(declaration),
        all_annotations: all_annotations.into_boxed_slice(),
        nesting,
    }))
}

fn resolve_nesting(
    own_inner_entry: &Option<(Option<DotName>, Option<Arc<str>>, u16)>,
    enclosing_method: &Option<EnclosingMethod>,
) -> Nesting {
    match own_inner_entry {
        None => Nesting::TopLevel,
        Some((Some(outer), Some(simple), _)) => Nesting::Inner {
            enclosing_class: outer.clone(),
            simple_name: Arc::clone(simple),
        },
        Some((None, Some(simple), _)) => Nesting::Local {
            simple_name: Arc::clone(simple),
            enclosing: enclosing_method.clone(),
        },
        Some((_, None, _)) => Nesting::Anonymous {
            enclosing: enclosing_method.clone(),
        },
    }
}

fn annotate_type_parameter(
    type_parameters: &mut [Type],
    index: u8,
    path: &[crate::annotations::PathStep],
    instance: AnnotationInstance,
) -> Result<()> {
    let slot = type_parameters
        .get_mut(index as usize)
        .ok_or(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"))?;
    *slot = attach_type_annotation(slot, path, instance)?;
    Ok(())
}

fn annotate_type_parameter_bound(
    type_parameters: &mut [Type],
    parameter: u8,
    bound: u8,
    path: &[crate::annotations::PathStep],
    instance: AnnotationInstance,
) -> Result<()> {
    let slot = type_parameters
        .get_mut(parameter as usize)
        .ok_or(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"))?;
    let Type::TypeVariable(variable) = &*slot else {
        return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"));
    };
    let variable = variable.clone();
    let mut bounds = variable.bounds().to_vec();
    let bound_slot = bounds
        .get_mut(bound as usize)
        .ok_or(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"))?;
    *bound_slot = attach_type_annotation(bound_slot, path, instance)?;
    // References elsewhere keep pointing at the pre-annotation variable;
    // structural equality makes the two indistinguishable to queries.
    *slot = variable.with_bounds(bounds).into();
    Ok(())
}

fn resolve_field(
    class_name: &DotName,
    raw: RawField<'_>,
    class_scope: &TypeParameterScope,
    store: &mut TypeStore,
    all_annotations: &mut Vec<AnnotationInstance>,
) -> Result<FieldInfo> {
    let mut field_type = match raw.signature {
        Some(signature) => parse_field_signature(signature, class_scope, store)?,
        None => parse_field_descriptor(&raw.descriptor, store)?,
    };

    let target = AnnotationTarget::Field {
        class: class_name.clone(),
        field: Arc::clone(&raw.name),
    };

    let mut annotations = Vec::with_capacity(raw.annotations.len());
    for (ann, visible) in raw.annotations {
        let instance = ann.into_instance(Some(target.clone()), visible);
        all_annotations.push(instance.clone());
        annotations.push(instance);
    }

    for record in raw.type_annotations {
        if record.position != TypePosition::Empty {
            return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"));
        }
        let instance = record.annotation.into_instance(
            Some(AnnotationTarget::Type {
                enclosing: Box::new(target.clone()),
                position: record.position,
            }),
            record.visible,
        );
        all_annotations.push(instance.clone());
        field_type = attach_type_annotation(&field_type, &record.path, instance)?;
    }

    Ok(FieldInfo::from_inner(FieldInfoInner {
        declaring_class: class_name.clone(),
        name: raw.name,
        flags: raw.flags,
        descriptor: raw.descriptor,
        field_type,
        annotations: sort_annotations(annotations),
    }))
}

struct ConstructorConventions {
    is_enum: bool,
    inner_non_static: bool,
}

fn resolve_method(
    class_name: &DotName,
    raw: RawMethod<'_>,
    class_scope: &TypeParameterScope,
    conventions: &ConstructorConventions,
    store: &mut TypeStore,
    all_annotations: &mut Vec<AnnotationInstance>,
) -> Result<MethodInfo> {
    let descriptor = parse_method_descriptor(&raw.descriptor, store)?;
    let descriptor_params = descriptor.parameters;

    let (mut type_parameters, mut parameter_types, mut return_type, mut throws) =
        match raw.signature {
            Some(signature) => {
                let parsed = parse_method_signature(signature, class_scope, store)?;
                let throws = if parsed.throws.is_empty() {
                    exception_types(&raw.exceptions, store)
                } else {
                    parsed.throws
                };
                (
                    parsed.type_parameters,
                    parsed.parameters,
                    parsed.return_type,
                    throws,
                )
            }
            None => {
                let mut parameter_types = descriptor_params.clone();
                // Compiler conventions for parameters the source never
                // declared: the enclosing-instance reference of a non-static
                // inner class constructor, the implicit name/ordinal of an
                // enum constructor. A generic signature already excludes
                // them.
                if &*raw.name == "<init>" {
                    if conventions.is_enum && parameter_types.len() >= 2 {
                        parameter_types.drain(0..2);
                    } else if conventions.inner_non_static && !parameter_types.is_empty() {
                        parameter_types.remove(0);
                    }
                }
                (
                    Vec::new(),
                    parameter_types,
                    descriptor.return_type,
                    exception_types(&raw.exceptions, store),
                )
            }
        };

    let declared = parameter_types.len();
    let dropped = descriptor_params.len().saturating_sub(declared);

    let parameter_names = reconcile_parameter_names(&raw, &descriptor_params, declared, dropped);

    // Parameter annotations, aligned like the names: some compilers emit one
    // entry per descriptor parameter, some one per declared parameter.
    let mut parameter_annotations: Vec<Vec<(RawAnnotation, bool)>> = raw.parameter_annotations;
    if parameter_annotations.len() == declared + dropped && dropped > 0 {
        parameter_annotations.drain(0..dropped);
    }
    parameter_annotations.resize_with(declared, Vec::new);

    let method_target = AnnotationTarget::Method {
        class: class_name.clone(),
        method: Arc::clone(&raw.name),
        descriptor: Arc::clone(&raw.descriptor),
    };

    let mut parameters: Vec<MethodParameter> = Vec::with_capacity(declared);
    for (index, parameter_type) in parameter_types.drain(..).enumerate() {
        let mut annotations = Vec::new();
        for (ann, visible) in parameter_annotations[index].drain(..) {
            let instance = ann.into_instance(
                Some(AnnotationTarget::MethodParameter {
                    class: class_name.clone(),
                    method: Arc::clone(&raw.name),
                    descriptor: Arc::clone(&raw.descriptor),
                    position: index as u8,
                }),
                visible,
            );
            all_annotations.push(instance.clone());
            annotations.push(instance);
        }
        annotations.sort_by(|a, b| a.name().cmp(b.name()));
        parameters.push(MethodParameter {
            name: parameter_names.as_ref().and_then(|names| names[index].clone()),
            parameter_type,
            annotations: annotations.into_boxed_slice(),
        });
    }

    let mut receiver_type: Option<Type> = None;

    // Method-level type annotations.
    for record in raw.type_annotations {
        let instance = record.annotation.clone().into_instance(
            Some(AnnotationTarget::Type {
                enclosing: Box::new(method_target.clone()),
                position: record.position,
            }),
            record.visible,
        );
        all_annotations.push(instance.clone());
        match record.position {
            TypePosition::Empty => {
                return_type = attach_type_annotation(&return_type, &record.path, instance)?;
            }
            TypePosition::Receiver => {
                let base = receiver_type.take().unwrap_or_else(|| {
                    ClassType::new(class_name.clone(), vec![]).into()
                });
                receiver_type = Some(attach_type_annotation(&base, &record.path, instance)?);
            }
            TypePosition::MethodParameter { index } => {
                let slot = parameters
                    .get_mut(index as usize)
                    .ok_or(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"))?;
                slot.parameter_type =
                    attach_type_annotation(&slot.parameter_type, &record.path, instance)?;
            }
            TypePosition::TypeParameter { index } => {
                annotate_type_parameter(&mut type_parameters, index, &record.path, instance)?;
            }
            TypePosition::TypeParameterBound { parameter, bound } => {
                annotate_type_parameter_bound(
                    &mut type_parameters,
                    parameter,
                    bound,
                    &record.path,
                    instance,
                )?;
            }
            TypePosition::Throws { index } => {
                let slot = throws
                    .get_mut(index as usize)
                    .ok_or(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"))?;
                *slot = attach_type_annotation(slot, &record.path, instance)?;
            }
            TypePosition::ClassExtends { .. } => {
                return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"))
            }
        }
    }

    let mut annotations = Vec::with_capacity(raw.annotations.len());
    for (ann, visible) in raw.annotations {
        let instance = ann.into_instance(Some(method_target.clone()), visible);
        all_annotations.push(instance.clone());
        annotations.push(instance);
    }

    let default_value = raw
        .default_value
        .map(|kind| AnnotationValue::new(Arc::clone(&raw.name), kind));

    let type_parameters = store.intern_type_list(type_parameters);
    let throws = store.intern_type_list(throws);

    Ok(MethodInfo::from_inner(MethodInfoInner {
        declaring_class: class_name.clone(),
        name: raw.name,
        flags: raw.flags,
        descriptor: raw.descriptor,
        type_parameters,
        parameters: parameters.into_boxed_slice(),
        return_type,
        receiver_type,
        exceptions: throws,
        annotations: sort_annotations(annotations),
        default_value,
    }))
}

fn exception_types(names: &[DotName], store: &mut TypeStore) -> Vec<Type> {
    names
        .iter()
        .map(|n| store.intern_type(ClassType::new(n.clone(), vec![]).into()))
        .collect()
}

/// Reconcile parameter names from the two independent sources.
///
/// `MethodParameters` is authoritative when present (it carries the
/// synthetic/mandated flags); the local variable table is debug-only and is
/// aligned by dropping the leading synthetic slots. When both sources exist
/// and still disagree in length, no names are recorded at all — a wrong name
/// on the wrong parameter is worse than none.
fn reconcile_parameter_names(
    raw: &RawMethod<'_>,
    descriptor_params: &[Type],
    declared: usize,
    dropped: usize,
) -> Option<Vec<Option<Arc<str>>>> {
    let from_attribute: Option<Vec<Option<Arc<str>>>> = raw.method_parameters.as_ref().map(|entries| {
        entries
            .iter()
            .filter(|(_, param_flags)| {
                param_flags & (flags::SYNTHETIC | flags::MANDATED) == 0
            })
            .map(|(name, _)| name.clone())
            .collect()
    });

    let from_debug_info: Option<Vec<Option<Arc<str>>>> = if raw.local_variables.is_empty() {
        None
    } else {
        let mut names = Vec::with_capacity(descriptor_params.len());
        let mut slot: u16 = if raw.flags & flags::STATIC != 0 { 0 } else { 1 };
        for parameter in descriptor_params {
            let name = raw
                .local_variables
                .iter()
                .find(|(s, _)| *s == slot)
                .map(|(_, n)| Arc::clone(n));
            names.push(name);
            let wide = matches!(
                parameter.as_primitive().map(|p| p.kind()),
                Some(PrimitiveKind::Long) | Some(PrimitiveKind::Double)
            );
            slot += if wide { 2 } else { 1 };
        }
        if names.len() >= dropped {
            names.drain(0..dropped);
        }
        Some(names)
    };

    match (from_attribute, from_debug_info) {
        (Some(attribute), Some(debug_info)) => {
            if attribute.len() == declared && debug_info.len() == declared {
                Some(attribute)
            } else {
                tracing::debug!(
                    method = &*raw.name,
                    attribute_len = attribute.len(),
                    debug_len = debug_info.len(),
                    declared,
                    "parameter name sources disagree; recording no names"
                );
                None
            }
        }
        (Some(attribute), None) => (attribute.len() == declared).then_some(attribute),
        (None, Some(debug_info)) => (debug_info.len() == declared).then_some(debug_info),
        (None, None) => None,
    }
}

fn resolve_record_component(
    class_name: &DotName,
    raw: RawComponent<'_>,
    class_scope: &TypeParameterScope,
    store: &mut TypeStore,
    all_annotations: &mut Vec<AnnotationInstance>,
) -> Result<RecordComponentInfo> {
    let mut component_type = match raw.signature {
        Some(signature) => parse_field_signature(signature, class_scope, store)?,
        None => parse_field_descriptor(&raw.descriptor, store)?,
    };

    let target = AnnotationTarget::RecordComponent {
        class: class_name.clone(),
        component: Arc::clone(&raw.name),
    };

    let mut annotations = Vec::with_capacity(raw.annotations.len());
    for (ann, visible) in raw.annotations {
        let instance = ann.into_instance(Some(target.clone()), visible);
        all_annotations.push(instance.clone());
        annotations.push(instance);
    }

    for record in raw.type_annotations {
        if record.position != TypePosition::Empty {
            return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"));
        }
        let instance = record.annotation.into_instance(
            Some(AnnotationTarget::Type {
                enclosing: Box::new(target.clone()),
                position: record.position,
            }),
            record.visible,
        );
        all_annotations.push(instance.clone());
        component_type = attach_type_annotation(&component_type, &record.path, instance)?;
    }

    Ok(RecordComponentInfo::from_inner(RecordComponentInfoInner {
        declaring_class: class_name.clone(),
        name: raw.name,
        component_type,
        annotations: sort_annotations(annotations),
    }))
}

fn read_record_component<'a>(
    reader: &mut Reader<'_>,
    cp: &'a ConstantPool,
    store: &mut TypeStore,
    options: &IndexerOptions,
) -> Result<RawComponent<'a>> {
    let name = store.names_mut().intern_str(cp.get_utf8(reader.read_u2()?)?);
    let descriptor = store.names_mut().intern_str(cp.get_utf8(reader.read_u2()?)?);

    let mut component = RawComponent {
        name,
        descriptor,
        signature: None,
        annotations: Vec::new(),
        type_annotations: Vec::new(),
    };

    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        let attr_name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let attr_name = cp.get_utf8(attr_name_index)?;

        let mut sub = Reader::new(info);
        match attr_name {
            "Signature" => {
                component.signature = Some(cp.get_utf8(sub.read_u2()?)?);
                sub.ensure_empty()?;
            }
            "RuntimeVisibleAnnotations" => {
                read_annotation_list(&mut sub, cp, store, true, &mut component.annotations)?;
            }
            "RuntimeInvisibleAnnotations" if options.record_invisible_annotations => {
                read_annotation_list(&mut sub, cp, store, false, &mut component.annotations)?;
            }
            "RuntimeVisibleTypeAnnotations" => {
                read_type_annotation_list(&mut sub, cp, store, true, &mut component.type_annotations)?;
            }
            "RuntimeInvisibleTypeAnnotations" if options.record_invisible_annotations => {
                read_type_annotation_list(&mut sub, cp, store, false, &mut component.type_annotations)?;
            }
            _ => {
                // Unknown attribute: intentionally skipped.
            }
        }
    }
    Ok(component)
}
