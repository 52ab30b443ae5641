use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use quarry_core::DotName;

use crate::types::Type;

/// An immutable annotation usage: the annotation type name, the declaration
/// it annotates, its member values (sorted by name for binary search) and
/// whether it is runtime-visible.
///
/// Nested annotations (annotation-typed member values) have no target.
#[derive(Clone)]
pub struct AnnotationInstance {
    inner: Arc<AnnotationInstanceInner>,
}

struct AnnotationInstanceInner {
    name: DotName,
    values: Box<[AnnotationValue]>,
    target: Option<AnnotationTarget>,
    runtime_visible: bool,
}

impl AnnotationInstance {
    pub fn new(
        name: DotName,
        mut values: Vec<AnnotationValue>,
        target: Option<AnnotationTarget>,
        runtime_visible: bool,
    ) -> AnnotationInstance {
        values.sort_by(|a, b| a.name().cmp(b.name()));
        AnnotationInstance {
            inner: Arc::new(AnnotationInstanceInner {
                name,
                values: values.into_boxed_slice(),
                target,
                runtime_visible,
            }),
        }
    }

    /// The annotation type, e.g. `jakarta.inject.Inject`.
    pub fn name(&self) -> &DotName {
        &self.inner.name
    }

    /// The annotated declaration, or `None` for nested annotation values.
    pub fn target(&self) -> Option<&AnnotationTarget> {
        self.inner.target.as_ref()
    }

    pub fn runtime_visible(&self) -> bool {
        self.inner.runtime_visible
    }

    /// Member values, sorted by member name.
    pub fn values(&self) -> &[AnnotationValue] {
        &self.inner.values
    }

    /// Look up a member value by name (binary search).
    pub fn value(&self, name: &str) -> Option<&AnnotationValue> {
        self.inner
            .values
            .binary_search_by(|v| v.name().cmp(name))
            .ok()
            .map(|idx| &self.inner.values[idx])
    }

    /// Equality ignoring the target: same annotation type and same member
    /// values, wherever the two usages sit.
    pub fn equivalent_to(&self, other: &AnnotationInstance) -> bool {
        self.inner.name == other.inner.name && self.inner.values == other.inner.values
    }

    /// A copy of this instance attached to a different target. Used when
    /// flattening container annotations onto the container's declaration.
    pub fn with_target(&self, target: Option<AnnotationTarget>) -> AnnotationInstance {
        AnnotationInstance {
            inner: Arc::new(AnnotationInstanceInner {
                name: self.inner.name.clone(),
                values: self.inner.values.clone(),
                target,
                runtime_visible: self.inner.runtime_visible,
            }),
        }
    }
}

impl PartialEq for AnnotationInstance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.name == other.inner.name
                && self.inner.values == other.inner.values
                && self.inner.target == other.inner.target)
    }
}

impl Eq for AnnotationInstance {}

impl Hash for AnnotationInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state);
        self.inner.values.hash(state);
    }
}

impl fmt::Debug for AnnotationInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationInstance")
            .field("name", &self.inner.name)
            .field("values", &self.inner.values)
            .field("target", &self.inner.target)
            .field("runtime_visible", &self.inner.runtime_visible)
            .finish()
    }
}

/// A named annotation member value. Array element values carry an empty name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotationValue {
    name: Arc<str>,
    kind: AnnotationValueKind,
}

impl AnnotationValue {
    pub fn new(name: impl Into<Arc<str>>, kind: AnnotationValueKind) -> AnnotationValue {
        AnnotationValue {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &AnnotationValueKind {
        &self.kind
    }
}

#[derive(Clone, Debug)]
pub enum AnnotationValueKind {
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(Arc<str>),
    Enum { type_name: DotName, constant: Arc<str> },
    Class(Type),
    Nested(AnnotationInstance),
    Array(Box<[AnnotationValue]>),
}

// Floats compare and hash by bit pattern so values containing them still
// satisfy `Eq`; `0.0` and `-0.0` are therefore distinct, and NaN equals
// itself, which is the right call for structural deduplication.
impl PartialEq for AnnotationValueKind {
    fn eq(&self, other: &Self) -> bool {
        use AnnotationValueKind::*;
        match (self, other) {
            (Byte(a), Byte(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Boolean(a), Boolean(b)) => a == b,
            (String(a), String(b)) => a == b,
            (
                Enum {
                    type_name: at,
                    constant: ac,
                },
                Enum {
                    type_name: bt,
                    constant: bc,
                },
            ) => at == bt && ac == bc,
            (Class(a), Class(b)) => a == b,
            (Nested(a), Nested(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AnnotationValueKind {}

impl Hash for AnnotationValueKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use AnnotationValueKind::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Byte(v) => v.hash(state),
            Char(v) => v.hash(state),
            Short(v) => v.hash(state),
            Int(v) => v.hash(state),
            Long(v) => v.hash(state),
            Float(v) => v.to_bits().hash(state),
            Double(v) => v.to_bits().hash(state),
            Boolean(v) => v.hash(state),
            String(v) => v.hash(state),
            Enum {
                type_name,
                constant,
            } => {
                type_name.hash(state);
                constant.hash(state);
            }
            Class(v) => v.hash(state),
            Nested(v) => v.hash(state),
            Array(v) => v.hash(state),
        }
    }
}

/// The declaration an annotation is attached to.
///
/// Targets are coordinates (names), not references into the object model, so
/// the annotation graph stays acyclic; the `Index` resolves a coordinate back
/// to the declaration on demand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationTarget {
    Class(DotName),
    Field {
        class: DotName,
        field: Arc<str>,
    },
    Method {
        class: DotName,
        method: Arc<str>,
        descriptor: Arc<str>,
    },
    MethodParameter {
        class: DotName,
        method: Arc<str>,
        descriptor: Arc<str>,
        position: u8,
    },
    RecordComponent {
        class: DotName,
        component: Arc<str>,
    },
    /// A use of a type inside the enclosing declaration, located by
    /// [`TypePosition`].
    Type {
        enclosing: Box<AnnotationTarget>,
        position: TypePosition,
    },
}

impl AnnotationTarget {
    /// The class this target ultimately belongs to.
    pub fn enclosing_class(&self) -> &DotName {
        match self {
            AnnotationTarget::Class(name) => name,
            AnnotationTarget::Field { class, .. } => class,
            AnnotationTarget::Method { class, .. } => class,
            AnnotationTarget::MethodParameter { class, .. } => class,
            AnnotationTarget::RecordComponent { class, .. } => class,
            AnnotationTarget::Type { enclosing, .. } => enclosing.enclosing_class(),
        }
    }

    pub fn as_type_target(&self) -> Option<(&AnnotationTarget, &TypePosition)> {
        match self {
            AnnotationTarget::Type {
                enclosing,
                position,
            } => Some((&**enclosing, position)),
            _ => None,
        }
    }
}

/// Which type position within a declaration a type annotation applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypePosition {
    /// The declaration's own type: a field type or a method return type.
    Empty,
    Receiver,
    /// `extends`/`implements` clause entry; `65535` denotes the superclass.
    ClassExtends { index: u16 },
    TypeParameter { index: u8 },
    TypeParameterBound { parameter: u8, bound: u8 },
    MethodParameter { index: u8 },
    Throws { index: u16 },
}
