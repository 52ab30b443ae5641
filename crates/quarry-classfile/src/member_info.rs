use std::fmt;
use std::sync::Arc;

use quarry_core::DotName;
use quarry_types::{AnnotationInstance, AnnotationValue, Type};

fn find_annotation<'a>(
    annotations: &'a [AnnotationInstance],
    name: &DotName,
) -> Option<&'a AnnotationInstance> {
    annotations
        .binary_search_by(|a| a.name().cmp(name))
        .ok()
        .map(|idx| &annotations[idx])
}

/// An indexed field.
#[derive(Clone)]
pub struct FieldInfo {
    inner: Arc<FieldInfoInner>,
}

pub(crate) struct FieldInfoInner {
    pub(crate) declaring_class: DotName,
    pub(crate) name: Arc<str>,
    pub(crate) flags: u16,
    pub(crate) descriptor: Arc<str>,
    pub(crate) field_type: Type,
    /// Sorted by annotation name.
    pub(crate) annotations: Box<[AnnotationInstance]>,
}

impl FieldInfo {
    pub(crate) fn from_inner(inner: FieldInfoInner) -> FieldInfo {
        FieldInfo {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn flags(&self) -> u16 {
        self.inner.flags
    }

    pub fn declaring_class(&self) -> &DotName {
        &self.inner.declaring_class
    }

    /// The raw bytecode descriptor.
    pub fn descriptor(&self) -> &str {
        &self.inner.descriptor
    }

    /// The field's type: generic when the field carried a signature.
    pub fn field_type(&self) -> &Type {
        &self.inner.field_type
    }

    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.inner.annotations
    }

    pub fn annotation(&self, name: &DotName) -> Option<&AnnotationInstance> {
        find_annotation(&self.inner.annotations, name)
    }

    pub fn has_annotation(&self, name: &DotName) -> bool {
        self.annotation(name).is_some()
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldInfo({}.{})", self.inner.declaring_class, self.inner.name)
    }
}

/// One declared method parameter: type plus optional source name.
#[derive(Clone, Debug)]
pub struct MethodParameter {
    pub(crate) name: Option<Arc<str>>,
    pub(crate) parameter_type: Type,
    /// Sorted by annotation name.
    pub(crate) annotations: Box<[AnnotationInstance]>,
}

impl MethodParameter {
    /// The source name, when either `MethodParameters` or the local variable
    /// table supplied one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parameter_type(&self) -> &Type {
        &self.parameter_type
    }

    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }

    pub fn annotation(&self, name: &DotName) -> Option<&AnnotationInstance> {
        find_annotation(&self.annotations, name)
    }
}

/// An indexed method or constructor.
#[derive(Clone)]
pub struct MethodInfo {
    inner: Arc<MethodInfoInner>,
}

pub(crate) struct MethodInfoInner {
    pub(crate) declaring_class: DotName,
    pub(crate) name: Arc<str>,
    pub(crate) flags: u16,
    pub(crate) descriptor: Arc<str>,
    /// Method-level type parameters, each a `Type::TypeVariable`.
    pub(crate) type_parameters: Arc<[Type]>,
    pub(crate) parameters: Box<[MethodParameter]>,
    pub(crate) return_type: Type,
    /// Present only when receiver type annotations exist.
    pub(crate) receiver_type: Option<Type>,
    pub(crate) exceptions: Arc<[Type]>,
    /// Sorted by annotation name.
    pub(crate) annotations: Box<[AnnotationInstance]>,
    /// `AnnotationDefault` for annotation-interface members.
    pub(crate) default_value: Option<AnnotationValue>,
}

impl MethodInfo {
    pub(crate) fn from_inner(inner: MethodInfoInner) -> MethodInfo {
        MethodInfo {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_constructor(&self) -> bool {
        &*self.inner.name == "<init>"
    }

    pub fn flags(&self) -> u16 {
        self.inner.flags
    }

    pub fn declaring_class(&self) -> &DotName {
        &self.inner.declaring_class
    }

    pub fn descriptor(&self) -> &str {
        &self.inner.descriptor
    }

    pub fn type_parameters(&self) -> &[Type] {
        &self.inner.type_parameters
    }

    pub fn parameters(&self) -> &[MethodParameter] {
        &self.inner.parameters
    }

    pub fn return_type(&self) -> &Type {
        &self.inner.return_type
    }

    /// The annotated receiver type, present only when the method carried
    /// receiver type annotations.
    pub fn receiver_type(&self) -> Option<&Type> {
        self.inner.receiver_type.as_ref()
    }

    pub fn exceptions(&self) -> &[Type] {
        &self.inner.exceptions
    }

    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.inner.annotations
    }

    pub fn annotation(&self, name: &DotName) -> Option<&AnnotationInstance> {
        find_annotation(&self.inner.annotations, name)
    }

    pub fn has_annotation(&self, name: &DotName) -> bool {
        self.annotation(name).is_some()
    }

    /// The `AnnotationDefault` value for an annotation-interface member.
    pub fn default_value(&self) -> Option<&AnnotationValue> {
        self.inner.default_value.as_ref()
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MethodInfo({}.{}{})",
            self.inner.declaring_class, self.inner.name, self.inner.descriptor
        )
    }
}

/// An indexed record component.
#[derive(Clone)]
pub struct RecordComponentInfo {
    inner: Arc<RecordComponentInfoInner>,
}

pub(crate) struct RecordComponentInfoInner {
    pub(crate) declaring_class: DotName,
    pub(crate) name: Arc<str>,
    pub(crate) component_type: Type,
    /// Sorted by annotation name.
    pub(crate) annotations: Box<[AnnotationInstance]>,
}

impl RecordComponentInfo {
    pub(crate) fn from_inner(inner: RecordComponentInfoInner) -> RecordComponentInfo {
        RecordComponentInfo {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn declaring_class(&self) -> &DotName {
        &self.inner.declaring_class
    }

    pub fn component_type(&self) -> &Type {
        &self.inner.component_type
    }

    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.inner.annotations
    }

    pub fn annotation(&self, name: &DotName) -> Option<&AnnotationInstance> {
        find_annotation(&self.inner.annotations, name)
    }
}

impl fmt::Debug for RecordComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RecordComponentInfo({}.{})",
            self.inner.declaring_class, self.inner.name
        )
    }
}
