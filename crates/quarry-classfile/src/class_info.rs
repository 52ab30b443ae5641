use std::fmt;
use std::sync::Arc;

use quarry_core::DotName;
use quarry_types::{AnnotationInstance, Type};

use crate::member_info::{FieldInfo, MethodInfo, RecordComponentInfo};

pub mod flags {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SUPER: u16 = 0x0020;
    pub const SYNCHRONIZED: u16 = 0x0020;
    pub const VOLATILE: u16 = 0x0040;
    pub const BRIDGE: u16 = 0x0040;
    pub const TRANSIENT: u16 = 0x0080;
    pub const VARARGS: u16 = 0x0080;
    pub const NATIVE: u16 = 0x0100;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const STRICT: u16 = 0x0800;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
    pub const MODULE: u16 = 0x8000;
    pub const MANDATED: u16 = 0x8000;
}

/// How a class sits relative to other declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Nesting {
    TopLevel,
    Inner {
        enclosing_class: DotName,
        simple_name: Arc<str>,
    },
    Local {
        simple_name: Arc<str>,
        enclosing: Option<EnclosingMethod>,
    },
    Anonymous {
        enclosing: Option<EnclosingMethod>,
    },
}

/// The `EnclosingMethod` attribute: where a local/anonymous class was
/// declared. The method coordinate is absent for classes declared in
/// initializers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub class: DotName,
    pub name: Option<Arc<str>>,
    pub descriptor: Option<Arc<str>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassVersion {
    pub major: u16,
    pub minor: u16,
}

/// An indexed class: the immutable, queryable view of one decoded class
/// file. Frozen once decoding completes; safe to share across threads.
#[derive(Clone)]
pub struct ClassInfo {
    inner: Arc<ClassInfoInner>,
}

pub(crate) struct ClassInfoInner {
    pub(crate) name: DotName,
    pub(crate) flags: u16,
    pub(crate) version: ClassVersion,
    pub(crate) super_name: Option<DotName>,
    pub(crate) interface_names: Box<[DotName]>,
    /// Superclass as a (possibly parameterized) type.
    pub(crate) super_class_type: Option<Type>,
    pub(crate) interface_types: Arc<[Type]>,
    /// Class type parameters, each a `Type::TypeVariable`.
    pub(crate) type_parameters: Arc<[Type]>,
    /// Sorted by field name.
    pub(crate) fields: Box<[FieldInfo]>,
    /// Sorted by method name, then descriptor.
    pub(crate) methods: Box<[MethodInfo]>,
    pub(crate) record_components: Box<[RecordComponentInfo]>,
    pub(crate) has_record_attribute: bool,
    /// Declaration annotations, sorted by annotation name.
    pub(crate) annotations: Box<[AnnotationInstance]>,
    /// Every annotation instance recorded anywhere in the class, including
    /// members, parameters and type usages. Feeds the index's usage map.
    pub(crate) all_annotations: Box<[AnnotationInstance]>,
    pub(crate) nesting: Nesting,
}

impl ClassInfo {
    pub(crate) fn from_inner(inner: ClassInfoInner) -> ClassInfo {
        ClassInfo {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> &DotName {
        &self.inner.name
    }

    pub fn flags(&self) -> u16 {
        self.inner.flags
    }

    pub fn version(&self) -> ClassVersion {
        self.inner.version
    }

    pub fn is_interface(&self) -> bool {
        self.inner.flags & flags::INTERFACE != 0
    }

    pub fn is_annotation(&self) -> bool {
        self.inner.flags & flags::ANNOTATION != 0
    }

    pub fn is_enum(&self) -> bool {
        self.inner.flags & flags::ENUM != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.inner.flags & flags::ABSTRACT != 0
    }

    pub fn is_final(&self) -> bool {
        self.inner.flags & flags::FINAL != 0
    }

    pub fn is_record(&self) -> bool {
        self.inner.has_record_attribute
    }

    pub fn super_name(&self) -> Option<&DotName> {
        self.inner.super_name.as_ref()
    }

    pub fn interface_names(&self) -> &[DotName] {
        &self.inner.interface_names
    }

    /// The superclass with generic information when the class carried a
    /// signature; otherwise the raw class type.
    pub fn super_class_type(&self) -> Option<&Type> {
        self.inner.super_class_type.as_ref()
    }

    pub fn interface_types(&self) -> &[Type] {
        &self.inner.interface_types
    }

    pub fn type_parameters(&self) -> &[Type] {
        &self.inner.type_parameters
    }

    /// Fields, sorted by name.
    pub fn fields(&self) -> &[FieldInfo] {
        &self.inner.fields
    }

    /// Look up a field by name (binary search).
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.inner
            .fields
            .binary_search_by(|f| f.name().cmp(name))
            .ok()
            .map(|idx| &self.inner.fields[idx])
    }

    /// Methods, sorted by name then descriptor.
    pub fn methods(&self) -> &[MethodInfo] {
        &self.inner.methods
    }

    /// The first method with the given name, if any.
    pub fn first_method(&self, name: &str) -> Option<&MethodInfo> {
        let idx = self
            .inner
            .methods
            .partition_point(|m| m.name() < name);
        self.inner
            .methods
            .get(idx)
            .filter(|m| m.name() == name)
    }

    /// Look up a method by name and exact parameter types.
    pub fn method(&self, name: &str, parameters: &[Type]) -> Option<&MethodInfo> {
        let start = self.inner.methods.partition_point(|m| m.name() < name);
        self.inner.methods[start..]
            .iter()
            .take_while(|m| m.name() == name)
            .find(|m| {
                m.parameters().len() == parameters.len()
                    && m.parameters()
                        .iter()
                        .zip(parameters)
                        .all(|(p, expected)| p.parameter_type() == expected)
            })
    }

    pub fn record_components(&self) -> &[RecordComponentInfo] {
        &self.inner.record_components
    }

    pub fn record_component(&self, name: &str) -> Option<&RecordComponentInfo> {
        self.inner
            .record_components
            .iter()
            .find(|c| c.name() == name)
    }

    /// Declaration annotations, sorted by name.
    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.inner.annotations
    }

    /// Look up a declaration annotation by type name (binary search).
    pub fn annotation(&self, name: &DotName) -> Option<&AnnotationInstance> {
        self.inner
            .annotations
            .binary_search_by(|a| a.name().cmp(name))
            .ok()
            .map(|idx| &self.inner.annotations[idx])
    }

    pub fn has_annotation(&self, name: &DotName) -> bool {
        self.annotation(name).is_some()
    }

    /// Every annotation instance recorded anywhere in this class: the
    /// declaration itself, fields, methods, parameters, record components
    /// and type usages.
    pub fn all_annotations(&self) -> &[AnnotationInstance] {
        &self.inner.all_annotations
    }

    pub fn nesting(&self) -> &Nesting {
        &self.inner.nesting
    }

    /// The source-level simple name, when known. Anonymous classes have
    /// none; top-level classes derive it from the qualified name.
    pub fn simple_name(&self) -> Option<&str> {
        match &self.inner.nesting {
            Nesting::TopLevel => {
                let local = self.inner.name.local_name();
                Some(local.rsplit('.').next().unwrap_or(local))
            }
            Nesting::Inner { simple_name, .. } => Some(simple_name),
            Nesting::Local { simple_name, .. } => Some(simple_name),
            Nesting::Anonymous { .. } => None,
        }
    }

    /// The immediately enclosing class for inner/local/anonymous classes.
    pub fn enclosing_class(&self) -> Option<&DotName> {
        match &self.inner.nesting {
            Nesting::TopLevel => None,
            Nesting::Inner {
                enclosing_class, ..
            } => Some(enclosing_class),
            Nesting::Local { enclosing, .. } | Nesting::Anonymous { enclosing } => {
                enclosing.as_ref().map(|e| &e.class)
            }
        }
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassInfo({})", self.inner.name)
    }
}

impl PartialEq for ClassInfo {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.name == other.inner.name
    }
}

impl Eq for ClassInfo {}
