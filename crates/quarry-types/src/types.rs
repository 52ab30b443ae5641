use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use quarry_core::DotName;

use crate::annotation::AnnotationInstance;

fn object_name() -> DotName {
    static OBJECT: OnceLock<DotName> = OnceLock::new();
    OBJECT
        .get_or_init(|| DotName::simple("java.lang.Object"))
        .clone()
}

fn sorted(mut annotations: Vec<AnnotationInstance>) -> Box<[AnnotationInstance]> {
    annotations.sort_by(|a, b| a.name().cmp(b.name()));
    annotations.into_boxed_slice()
}

fn find_annotation<'a>(
    annotations: &'a [AnnotationInstance],
    name: &DotName,
) -> Option<&'a AnnotationInstance> {
    annotations
        .binary_search_by(|a| a.name().cmp(name))
        .ok()
        .map(|idx| &annotations[idx])
}

/// A type usage at some program point: a field's type, a method parameter, a
/// bound of a type parameter, an `extends` clause entry.
///
/// Every variant carries its erasure name and the type annotations attached
/// at that usage (sorted by annotation name). Values are cheap-clone handles
/// over shared immutable data; "same instance" means the handles share their
/// allocation.
///
/// Two equality regimes apply. The public `PartialEq`/`Hash` are
/// *structural*: a [`TypeVariableReference`] compares by identifier and
/// annotations, never by where it points. The interning layer uses
/// [`Type::intern_eq`]/[`Type::intern_hash`], which treat references as
/// unique by identity — two references with the same identifier may resolve
/// to different variables while a signature is still being patched, and the
/// pool must not merge them.
#[derive(Clone)]
pub enum Type {
    Class(ClassType),
    Array(ArrayType),
    Primitive(PrimitiveType),
    Void(VoidType),
    Parameterized(ParameterizedType),
    Wildcard(WildcardType),
    TypeVariable(TypeVariable),
    UnresolvedTypeVariable(UnresolvedTypeVariable),
    TypeVariableReference(TypeVariableReference),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Array,
    Primitive,
    Void,
    Parameterized,
    Wildcard,
    TypeVariable,
    UnresolvedTypeVariable,
    TypeVariableReference,
}

impl Type {
    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Class(_) => TypeKind::Class,
            Type::Array(_) => TypeKind::Array,
            Type::Primitive(_) => TypeKind::Primitive,
            Type::Void(_) => TypeKind::Void,
            Type::Parameterized(_) => TypeKind::Parameterized,
            Type::Wildcard(_) => TypeKind::Wildcard,
            Type::TypeVariable(_) => TypeKind::TypeVariable,
            Type::UnresolvedTypeVariable(_) => TypeKind::UnresolvedTypeVariable,
            Type::TypeVariableReference(_) => TypeKind::TypeVariableReference,
        }
    }

    /// The erasure of this type usage as a dotted name.
    pub fn name(&self) -> DotName {
        match self {
            Type::Class(t) => t.name().clone(),
            Type::Array(t) => t.name(),
            Type::Primitive(t) => t.kind().name(),
            Type::Void(_) => DotName::simple("void"),
            Type::Parameterized(t) => t.name().clone(),
            Type::Wildcard(t) => t.extends_bound().name(),
            Type::TypeVariable(t) => t.name(),
            Type::UnresolvedTypeVariable(t) => DotName::simple(t.identifier().to_string()),
            Type::TypeVariableReference(t) => t.follow().name(),
        }
    }

    /// Type annotations attached at this usage, sorted by annotation name.
    pub fn annotations(&self) -> &[AnnotationInstance] {
        match self {
            Type::Class(t) => &t.inner.annotations,
            Type::Array(t) => &t.inner.annotations,
            Type::Primitive(t) => &t.inner.annotations,
            Type::Void(t) => &t.inner.annotations,
            Type::Parameterized(t) => &t.inner.annotations,
            Type::Wildcard(t) => &t.inner.annotations,
            Type::TypeVariable(t) => &t.inner.annotations,
            Type::UnresolvedTypeVariable(t) => &t.inner.annotations,
            Type::TypeVariableReference(t) => &t.inner.annotations,
        }
    }

    pub fn annotation(&self, name: &DotName) -> Option<&AnnotationInstance> {
        find_annotation(self.annotations(), name)
    }

    pub fn has_annotation(&self, name: &DotName) -> bool {
        self.annotation(name).is_some()
    }

    /// A copy of this type with `annotation` added at this usage. The
    /// original is unchanged.
    pub fn with_added_annotation(&self, annotation: AnnotationInstance) -> Type {
        let add = |existing: &[AnnotationInstance]| {
            let mut all: Vec<AnnotationInstance> = existing.to_vec();
            all.push(annotation.clone());
            all
        };
        match self {
            Type::Class(t) => ClassType::new(t.name().clone(), add(self.annotations())).into(),
            Type::Array(t) => ArrayType::new(
                t.constituent().clone(),
                t.dimensions(),
                add(self.annotations()),
            )
            .into(),
            Type::Primitive(t) => PrimitiveType::new(t.kind(), add(self.annotations())).into(),
            Type::Void(_) => VoidType::new(add(self.annotations())).into(),
            Type::Parameterized(t) => ParameterizedType::new(
                t.name().clone(),
                t.arguments().to_vec(),
                t.owner().cloned(),
                add(self.annotations()),
            )
            .into(),
            Type::Wildcard(t) => WildcardType::new(
                t.is_extends(),
                t.bound().cloned(),
                add(self.annotations()),
            )
            .into(),
            Type::TypeVariable(t) => TypeVariable::with_flags(
                Arc::clone(&t.inner.identifier),
                t.bounds().to_vec(),
                add(self.annotations()),
                t.inner.interface_bound_only,
            )
            .into(),
            Type::UnresolvedTypeVariable(t) => UnresolvedTypeVariable::new(
                Arc::clone(&t.inner.identifier),
                add(self.annotations()),
            )
            .into(),
            Type::TypeVariableReference(t) => {
                let reference = TypeVariableReference::new(
                    Arc::clone(&t.inner.identifier),
                    add(self.annotations()),
                );
                if let Some(target) = t.inner.target.get() {
                    reference.patch(target.clone());
                }
                Type::TypeVariableReference(reference)
            }
        }
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Type::Class(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            Type::Array(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveType> {
        match self {
            Type::Primitive(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_parameterized(&self) -> Option<&ParameterizedType> {
        match self {
            Type::Parameterized(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_wildcard(&self) -> Option<&WildcardType> {
        match self {
            Type::Wildcard(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_type_variable(&self) -> Option<&TypeVariable> {
        match self {
            Type::TypeVariable(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_unresolved_type_variable(&self) -> Option<&UnresolvedTypeVariable> {
        match self {
            Type::UnresolvedTypeVariable(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_type_variable_reference(&self) -> Option<&TypeVariableReference> {
        match self {
            Type::TypeVariableReference(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void(_))
    }

    /// Interning equality: structural, except type-variable references are
    /// compared by identity. Used only by the deduplication pool.
    pub fn intern_eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Class(a), Type::Class(b)) => {
                a.inner.name == b.inner.name && a.inner.annotations == b.inner.annotations
            }
            (Type::Array(a), Type::Array(b)) => {
                a.inner.dimensions == b.inner.dimensions
                    && a.inner.annotations == b.inner.annotations
                    && a.inner.constituent.intern_eq(&b.inner.constituent)
            }
            (Type::Primitive(a), Type::Primitive(b)) => {
                a.inner.kind == b.inner.kind && a.inner.annotations == b.inner.annotations
            }
            (Type::Void(a), Type::Void(b)) => a.inner.annotations == b.inner.annotations,
            (Type::Parameterized(a), Type::Parameterized(b)) => {
                a.inner.name == b.inner.name
                    && a.inner.annotations == b.inner.annotations
                    && slice_intern_eq(&a.inner.arguments, &b.inner.arguments)
                    && match (&a.inner.owner, &b.inner.owner) {
                        (None, None) => true,
                        (Some(x), Some(y)) => x.intern_eq(y),
                        _ => false,
                    }
            }
            (Type::Wildcard(a), Type::Wildcard(b)) => {
                a.inner.is_extends == b.inner.is_extends
                    && a.inner.annotations == b.inner.annotations
                    && match (&a.inner.bound, &b.inner.bound) {
                        (None, None) => true,
                        (Some(x), Some(y)) => x.intern_eq(y),
                        _ => false,
                    }
            }
            (Type::TypeVariable(a), Type::TypeVariable(b)) => {
                a.inner.identifier == b.inner.identifier
                    && a.inner.annotations == b.inner.annotations
                    && slice_intern_eq(&a.inner.bounds, &b.inner.bounds)
            }
            (Type::UnresolvedTypeVariable(a), Type::UnresolvedTypeVariable(b)) => {
                a.inner.identifier == b.inner.identifier
                    && a.inner.annotations == b.inner.annotations
            }
            (Type::TypeVariableReference(a), Type::TypeVariableReference(b)) => {
                Arc::ptr_eq(&a.inner, &b.inner)
            }
            _ => false,
        }
    }

    /// Interning hash, consistent with [`Type::intern_eq`].
    pub fn intern_hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Type::Class(t) => {
                t.inner.name.hash(state);
                t.inner.annotations.hash(state);
            }
            Type::Array(t) => {
                t.inner.dimensions.hash(state);
                t.inner.annotations.hash(state);
                t.inner.constituent.intern_hash(state);
            }
            Type::Primitive(t) => {
                t.inner.kind.hash(state);
                t.inner.annotations.hash(state);
            }
            Type::Void(t) => t.inner.annotations.hash(state),
            Type::Parameterized(t) => {
                t.inner.name.hash(state);
                t.inner.annotations.hash(state);
                for arg in t.inner.arguments.iter() {
                    arg.intern_hash(state);
                }
                if let Some(owner) = &t.inner.owner {
                    owner.intern_hash(state);
                }
            }
            Type::Wildcard(t) => {
                t.inner.is_extends.hash(state);
                t.inner.annotations.hash(state);
                if let Some(bound) = &t.inner.bound {
                    bound.intern_hash(state);
                }
            }
            Type::TypeVariable(t) => {
                t.inner.identifier.hash(state);
                t.inner.annotations.hash(state);
                for bound in t.inner.bounds.iter() {
                    bound.intern_hash(state);
                }
            }
            Type::UnresolvedTypeVariable(t) => {
                t.inner.identifier.hash(state);
                t.inner.annotations.hash(state);
            }
            // Identity equality only needs a hash stable for one instance;
            // the identifier is stable and consistent.
            Type::TypeVariableReference(t) => t.inner.identifier.hash(state),
        }
    }
}

fn slice_intern_eq(a: &[Type], b: &[Type]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.intern_eq(y))
}

// Structural equality: recursion stays structural at every depth, so a
// type-variable reference nested anywhere compares by identifier and
// annotations, never by what it currently points at.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Class(a), Type::Class(b)) => {
                a.inner.name == b.inner.name && a.inner.annotations == b.inner.annotations
            }
            (Type::Array(a), Type::Array(b)) => {
                a.inner.dimensions == b.inner.dimensions
                    && a.inner.annotations == b.inner.annotations
                    && a.inner.constituent == b.inner.constituent
            }
            (Type::Primitive(a), Type::Primitive(b)) => {
                a.inner.kind == b.inner.kind && a.inner.annotations == b.inner.annotations
            }
            (Type::Void(a), Type::Void(b)) => a.inner.annotations == b.inner.annotations,
            (Type::Parameterized(a), Type::Parameterized(b)) => {
                a.inner.name == b.inner.name
                    && a.inner.annotations == b.inner.annotations
                    && a.inner.arguments == b.inner.arguments
                    && a.inner.owner == b.inner.owner
            }
            (Type::Wildcard(a), Type::Wildcard(b)) => {
                a.inner.is_extends == b.inner.is_extends
                    && a.inner.annotations == b.inner.annotations
                    && a.inner.bound == b.inner.bound
            }
            (Type::TypeVariable(a), Type::TypeVariable(b)) => {
                a.inner.identifier == b.inner.identifier
                    && a.inner.annotations == b.inner.annotations
                    && a.inner.bounds == b.inner.bounds
            }
            (Type::UnresolvedTypeVariable(a), Type::UnresolvedTypeVariable(b)) => {
                a.inner.identifier == b.inner.identifier
                    && a.inner.annotations == b.inner.annotations
            }
            (Type::TypeVariableReference(a), Type::TypeVariableReference(b)) => {
                a.inner.identifier == b.inner.identifier
                    && a.inner.annotations == b.inner.annotations
            }
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Type::TypeVariableReference(t) => {
                std::mem::discriminant(self).hash(state);
                t.inner.identifier.hash(state);
                t.inner.annotations.hash(state);
            }
            _ => self.intern_hash(state),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Class(t) => write!(f, "Class({})", t.name()),
            Type::Array(t) => write!(
                f,
                "Array({:?} x{})",
                t.constituent(),
                t.dimensions()
            ),
            Type::Primitive(t) => write!(f, "Primitive({})", t.kind().name()),
            Type::Void(_) => write!(f, "Void"),
            Type::Parameterized(t) => f
                .debug_struct("Parameterized")
                .field("name", &t.name())
                .field("arguments", &t.arguments())
                .field("owner", &t.owner())
                .finish(),
            Type::Wildcard(t) => f
                .debug_struct("Wildcard")
                .field("extends", &t.is_extends())
                .field("bound", &t.bound())
                .finish(),
            Type::TypeVariable(t) => f
                .debug_struct("TypeVariable")
                .field("identifier", &t.identifier())
                .field("bounds", &t.bounds())
                .finish(),
            Type::UnresolvedTypeVariable(t) => {
                write!(f, "UnresolvedTypeVariable({})", t.identifier())
            }
            Type::TypeVariableReference(t) => {
                write!(
                    f,
                    "TypeVariableReference({}, patched: {})",
                    t.identifier(),
                    t.is_patched()
                )
            }
        }
    }
}

/// A raw (non-generic) class or interface usage.
#[derive(Clone)]
pub struct ClassType {
    inner: Arc<ClassTypeInner>,
}

struct ClassTypeInner {
    name: DotName,
    annotations: Box<[AnnotationInstance]>,
}

impl ClassType {
    pub fn new(name: DotName, annotations: Vec<AnnotationInstance>) -> ClassType {
        ClassType {
            inner: Arc::new(ClassTypeInner {
                name,
                annotations: sorted(annotations),
            }),
        }
    }

    pub fn name(&self) -> &DotName {
        &self.inner.name
    }
}

impl From<ClassType> for Type {
    fn from(t: ClassType) -> Type {
        Type::Class(t)
    }
}

/// The eight primitive kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl PrimitiveKind {
    pub fn from_descriptor(c: u8) -> Option<PrimitiveKind> {
        Some(match c {
            b'B' => PrimitiveKind::Byte,
            b'C' => PrimitiveKind::Char,
            b'D' => PrimitiveKind::Double,
            b'F' => PrimitiveKind::Float,
            b'I' => PrimitiveKind::Int,
            b'J' => PrimitiveKind::Long,
            b'S' => PrimitiveKind::Short,
            b'Z' => PrimitiveKind::Boolean,
            _ => return None,
        })
    }

    pub fn descriptor(&self) -> char {
        match self {
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Double => 'D',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Boolean => 'Z',
        }
    }

    pub fn name(&self) -> DotName {
        DotName::simple(match self {
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Boolean => "boolean",
        })
    }
}

/// A primitive type usage.
#[derive(Clone)]
pub struct PrimitiveType {
    inner: Arc<PrimitiveTypeInner>,
}

struct PrimitiveTypeInner {
    kind: PrimitiveKind,
    annotations: Box<[AnnotationInstance]>,
}

impl PrimitiveType {
    pub fn new(kind: PrimitiveKind, annotations: Vec<AnnotationInstance>) -> PrimitiveType {
        PrimitiveType {
            inner: Arc::new(PrimitiveTypeInner {
                kind,
                annotations: sorted(annotations),
            }),
        }
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.inner.kind
    }
}

impl From<PrimitiveType> for Type {
    fn from(t: PrimitiveType) -> Type {
        Type::Primitive(t)
    }
}

/// The `void` pseudo-type (method returns only).
#[derive(Clone)]
pub struct VoidType {
    inner: Arc<VoidTypeInner>,
}

struct VoidTypeInner {
    annotations: Box<[AnnotationInstance]>,
}

impl VoidType {
    pub fn new(annotations: Vec<AnnotationInstance>) -> VoidType {
        VoidType {
            inner: Arc::new(VoidTypeInner {
                annotations: sorted(annotations),
            }),
        }
    }
}

impl From<VoidType> for Type {
    fn from(t: VoidType) -> Type {
        Type::Void(t)
    }
}

/// An array type usage.
///
/// Dimensions are compressed into a single count; nesting another
/// [`ArrayType`] as the constituent happens only when per-dimension type
/// annotations force a split. [`component_type`](Self::component_type),
/// [`element_type`](Self::element_type) and
/// [`deep_dimensions`](Self::deep_dimensions) provide the Java-language view
/// across that nesting; [`constituent`](Self::constituent) and
/// [`dimensions`](Self::dimensions) expose the compressed form directly.
#[derive(Clone)]
pub struct ArrayType {
    inner: Arc<ArrayTypeInner>,
}

struct ArrayTypeInner {
    constituent: Type,
    dimensions: u32,
    annotations: Box<[AnnotationInstance]>,
    name: OnceLock<DotName>,
}

impl ArrayType {
    pub fn new(constituent: Type, dimensions: u32, annotations: Vec<AnnotationInstance>) -> ArrayType {
        assert!(dimensions > 0, "array type requires at least one dimension");
        ArrayType {
            inner: Arc::new(ArrayTypeInner {
                constituent,
                dimensions,
                annotations: sorted(annotations),
                name: OnceLock::new(),
            }),
        }
    }

    /// The compressed constituent: whatever sits under this node's
    /// dimensions, which may itself be an array when annotations split it.
    pub fn constituent(&self) -> &Type {
        &self.inner.constituent
    }

    /// The number of dimensions at this node (compressed view).
    pub fn dimensions(&self) -> u32 {
        self.inner.dimensions
    }

    /// The Java-language component type: this array with one dimension
    /// stripped, e.g. `String[]` for `String[][]`.
    pub fn component_type(&self) -> Type {
        if self.inner.dimensions > 1 {
            ArrayType::new(self.inner.constituent.clone(), self.inner.dimensions - 1, vec![]).into()
        } else {
            self.inner.constituent.clone()
        }
    }

    /// The ultimate non-array element type.
    pub fn element_type(&self) -> Type {
        match &self.inner.constituent {
            Type::Array(nested) => nested.element_type(),
            other => other.clone(),
        }
    }

    /// Total dimension count across nested array constituents.
    pub fn deep_dimensions(&self) -> u32 {
        match &self.inner.constituent {
            Type::Array(nested) => self.inner.dimensions + nested.deep_dimensions(),
            _ => self.inner.dimensions,
        }
    }

    /// The array's erasure name in descriptor-like form with dotted class
    /// names, e.g. `[[Ljava.lang.String;`. Computed on first call and cached.
    pub fn name(&self) -> DotName {
        self.inner
            .name
            .get_or_init(|| {
                let mut s = String::new();
                for _ in 0..self.deep_dimensions() {
                    s.push('[');
                }
                match &self.element_type() {
                    Type::Primitive(p) => s.push(p.kind().descriptor()),
                    Type::Void(_) => s.push('V'),
                    other => {
                        s.push('L');
                        s.push_str(&other.name().to_string());
                        s.push(';');
                    }
                }
                DotName::simple(s)
            })
            .clone()
    }
}

impl From<ArrayType> for Type {
    fn from(t: ArrayType) -> Type {
        Type::Array(t)
    }
}

/// A generic class usage with type arguments, e.g. `List<String>`, possibly
/// owned by an enclosing type when the enclosing class is itself
/// parameterized (`Outer<T>.Inner<U>`).
#[derive(Clone)]
pub struct ParameterizedType {
    inner: Arc<ParameterizedTypeInner>,
}

struct ParameterizedTypeInner {
    name: DotName,
    arguments: Box<[Type]>,
    owner: Option<Type>,
    annotations: Box<[AnnotationInstance]>,
}

impl ParameterizedType {
    pub fn new(
        name: DotName,
        arguments: Vec<Type>,
        owner: Option<Type>,
        annotations: Vec<AnnotationInstance>,
    ) -> ParameterizedType {
        ParameterizedType {
            inner: Arc::new(ParameterizedTypeInner {
                name,
                arguments: arguments.into_boxed_slice(),
                owner,
                annotations: sorted(annotations),
            }),
        }
    }

    /// The raw (erased) class name.
    pub fn name(&self) -> &DotName {
        &self.inner.name
    }

    pub fn arguments(&self) -> &[Type] {
        &self.inner.arguments
    }

    pub fn owner(&self) -> Option<&Type> {
        self.inner.owner.as_ref()
    }

    pub fn with_argument(&self, index: usize, argument: Type) -> ParameterizedType {
        let mut arguments = self.inner.arguments.to_vec();
        arguments[index] = argument;
        ParameterizedType::new(
            self.inner.name.clone(),
            arguments,
            self.inner.owner.clone(),
            self.inner.annotations.to_vec(),
        )
    }

    pub fn with_owner(&self, owner: Option<Type>) -> ParameterizedType {
        ParameterizedType::new(
            self.inner.name.clone(),
            self.inner.arguments.to_vec(),
            owner,
            self.inner.annotations.to_vec(),
        )
    }
}

impl From<ParameterizedType> for Type {
    fn from(t: ParameterizedType) -> Type {
        Type::Parameterized(t)
    }
}

/// A wildcard type argument: `?`, `? extends X` or `? super X`.
#[derive(Clone)]
pub struct WildcardType {
    inner: Arc<WildcardTypeInner>,
}

struct WildcardTypeInner {
    /// Upper bound when `is_extends`, lower bound otherwise. `None` means
    /// unbounded (implicitly `extends java.lang.Object`).
    bound: Option<Type>,
    is_extends: bool,
    annotations: Box<[AnnotationInstance]>,
}

impl WildcardType {
    pub fn new(
        is_extends: bool,
        bound: Option<Type>,
        annotations: Vec<AnnotationInstance>,
    ) -> WildcardType {
        WildcardType {
            inner: Arc::new(WildcardTypeInner {
                bound,
                is_extends,
                annotations: sorted(annotations),
            }),
        }
    }

    pub fn unbounded() -> WildcardType {
        WildcardType::new(true, None, vec![])
    }

    pub fn is_extends(&self) -> bool {
        self.inner.is_extends
    }

    pub fn bound(&self) -> Option<&Type> {
        self.inner.bound.as_ref()
    }

    /// The upper bound; `java.lang.Object` for unbounded and `? super`
    /// wildcards.
    pub fn extends_bound(&self) -> Type {
        if self.inner.is_extends {
            if let Some(bound) = &self.inner.bound {
                return bound.clone();
            }
        }
        ClassType::new(object_name(), vec![]).into()
    }

    /// The lower bound, present only for `? super` wildcards.
    pub fn super_bound(&self) -> Option<&Type> {
        if self.inner.is_extends {
            None
        } else {
            self.inner.bound.as_ref()
        }
    }

    pub fn with_bound(&self, bound: Option<Type>) -> WildcardType {
        WildcardType::new(
            self.inner.is_extends,
            bound,
            self.inner.annotations.to_vec(),
        )
    }
}

impl From<WildcardType> for Type {
    fn from(t: WildcardType) -> Type {
        Type::Wildcard(t)
    }
}

/// A resolved type variable: identifier plus its ordered bound list.
#[derive(Clone)]
pub struct TypeVariable {
    inner: Arc<TypeVariableInner>,
}

struct TypeVariableInner {
    identifier: Arc<str>,
    bounds: Box<[Type]>,
    annotations: Box<[AnnotationInstance]>,
    /// `true` when the declaration omitted the class bound
    /// (`<T::Linterface;>`); needed to reconstruct the signature exactly.
    interface_bound_only: bool,
}

impl TypeVariable {
    pub fn new(
        identifier: impl Into<Arc<str>>,
        bounds: Vec<Type>,
        annotations: Vec<AnnotationInstance>,
    ) -> TypeVariable {
        TypeVariable::with_flags(identifier.into(), bounds, annotations, false)
    }

    pub(crate) fn with_flags(
        identifier: Arc<str>,
        bounds: Vec<Type>,
        annotations: Vec<AnnotationInstance>,
        interface_bound_only: bool,
    ) -> TypeVariable {
        TypeVariable {
            inner: Arc::new(TypeVariableInner {
                identifier,
                bounds: bounds.into_boxed_slice(),
                annotations: sorted(annotations),
                interface_bound_only,
            }),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.inner.identifier
    }

    pub fn bounds(&self) -> &[Type] {
        &self.inner.bounds
    }

    /// The erasure: the name of the first bound, or `java.lang.Object` when
    /// the variable is unbounded.
    pub fn name(&self) -> DotName {
        match self.inner.bounds.first() {
            Some(bound) => bound.name(),
            None => object_name(),
        }
    }

    pub(crate) fn interface_bound_only(&self) -> bool {
        self.inner.interface_bound_only
    }

    pub(crate) fn identifier_arc(&self) -> Arc<str> {
        Arc::clone(&self.inner.identifier)
    }

    /// Replace the bound list, keeping identifier, annotations and flags.
    pub fn with_bounds(&self, bounds: Vec<Type>) -> TypeVariable {
        TypeVariable::with_flags(
            Arc::clone(&self.inner.identifier),
            bounds,
            self.inner.annotations.to_vec(),
            self.inner.interface_bound_only,
        )
    }

    /// Whether `other` is the same variable instance (not merely structurally
    /// equal).
    pub fn same_instance(&self, other: &TypeVariable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<TypeVariable> for Type {
    fn from(t: TypeVariable) -> Type {
        Type::TypeVariable(t)
    }
}

/// A type variable whose declaration is not on the decoding classpath; only
/// the identifier is known.
#[derive(Clone)]
pub struct UnresolvedTypeVariable {
    inner: Arc<UnresolvedTypeVariableInner>,
}

struct UnresolvedTypeVariableInner {
    identifier: Arc<str>,
    annotations: Box<[AnnotationInstance]>,
}

impl UnresolvedTypeVariable {
    pub fn new(
        identifier: impl Into<Arc<str>>,
        annotations: Vec<AnnotationInstance>,
    ) -> UnresolvedTypeVariable {
        UnresolvedTypeVariable {
            inner: Arc::new(UnresolvedTypeVariableInner {
                identifier: identifier.into(),
                annotations: sorted(annotations),
            }),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.inner.identifier
    }

    pub(crate) fn identifier_arc(&self) -> Arc<str> {
        Arc::clone(&self.inner.identifier)
    }
}

impl From<UnresolvedTypeVariable> for Type {
    fn from(t: UnresolvedTypeVariable) -> Type {
        Type::UnresolvedTypeVariable(t)
    }
}

/// A forward or self reference to a type variable in the same
/// type-parameter list, created while the list is still being parsed.
///
/// This is the single deliberately mutable point of the type model: the
/// target is unknown until every variable in the list exists, and is
/// assigned exactly once by the signature parser's patch pass. Querying an
/// unpatched reference is a programmer error and panics; after patching the
/// value is frozen.
#[derive(Clone)]
pub struct TypeVariableReference {
    inner: Arc<TypeVariableReferenceInner>,
}

struct TypeVariableReferenceInner {
    identifier: Arc<str>,
    annotations: Box<[AnnotationInstance]>,
    target: OnceLock<TypeVariable>,
}

impl TypeVariableReference {
    pub fn new(
        identifier: impl Into<Arc<str>>,
        annotations: Vec<AnnotationInstance>,
    ) -> TypeVariableReference {
        TypeVariableReference {
            inner: Arc::new(TypeVariableReferenceInner {
                identifier: identifier.into(),
                annotations: sorted(annotations),
                target: OnceLock::new(),
            }),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.inner.identifier
    }

    pub fn is_patched(&self) -> bool {
        self.inner.target.get().is_some()
    }

    /// The referenced variable.
    ///
    /// # Panics
    ///
    /// Panics if the reference has not been patched; a reference must never
    /// escape the signature parser unpatched.
    pub fn follow(&self) -> &TypeVariable {
        self.inner
            .target
            .get()
            .expect("type variable reference queried before it was patched")
    }

    /// Assign the target. Called exactly once by the patch pass.
    ///
    /// # Panics
    ///
    /// Panics on a second call; a reference is patched once and then frozen.
    pub fn patch(&self, target: TypeVariable) {
        if self.inner.target.set(target).is_err() {
            panic!("type variable reference patched twice");
        }
    }
}

impl From<TypeVariableReference> for Type {
    fn from(t: TypeVariableReference) -> Type {
        Type::TypeVariableReference(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationInstance, AnnotationValue, AnnotationValueKind};
    use pretty_assertions::assert_eq;

    fn class(name: &str) -> Type {
        ClassType::new(DotName::simple(name), vec![]).into()
    }

    fn marker(name: &str) -> AnnotationInstance {
        AnnotationInstance::new(DotName::simple(name), vec![], None, true)
    }

    #[test]
    fn array_dimension_semantics() {
        // String[][] in compressed form.
        let strings = ArrayType::new(class("java.lang.String"), 2, vec![]);
        assert_eq!(strings.dimensions(), 2);
        assert_eq!(strings.deep_dimensions(), 2);
        assert_eq!(strings.constituent(), &class("java.lang.String"));
        assert_eq!(strings.element_type(), class("java.lang.String"));
        let component = strings.component_type();
        let component = component.as_array().unwrap();
        assert_eq!(component.dimensions(), 1);

        // String[] @Ann [] forces a split: outer 1 dim, constituent an
        // annotated 1-dim array.
        let annotated_inner: Type =
            ArrayType::new(class("java.lang.String"), 1, vec![marker("com.acme.Ann")]).into();
        let split = ArrayType::new(annotated_inner, 1, vec![]);
        assert_eq!(split.dimensions(), 1);
        assert_eq!(split.deep_dimensions(), 2);
        let inner = split.constituent().as_array().unwrap();
        assert_eq!(inner.dimensions(), 1);
        assert_eq!(split.element_type(), class("java.lang.String"));
    }

    #[test]
    fn array_name_is_descriptor_like() {
        let ints = ArrayType::new(PrimitiveType::new(PrimitiveKind::Int, vec![]).into(), 1, vec![]);
        assert_eq!(ints.name(), DotName::simple("[I"));
        let strings = ArrayType::new(class("java.lang.String"), 2, vec![]);
        assert_eq!(strings.name(), DotName::simple("[[Ljava.lang.String;"));
    }

    #[test]
    fn wildcard_bounds() {
        let unbounded = WildcardType::unbounded();
        assert_eq!(unbounded.extends_bound(), class("java.lang.Object"));
        assert_eq!(unbounded.super_bound(), None);

        let upper = WildcardType::new(true, Some(class("java.lang.Number")), vec![]);
        assert_eq!(upper.extends_bound(), class("java.lang.Number"));

        let lower = WildcardType::new(false, Some(class("java.lang.Number")), vec![]);
        assert_eq!(lower.extends_bound(), class("java.lang.Object"));
        assert_eq!(lower.super_bound(), Some(&class("java.lang.Number")));
    }

    #[test]
    fn type_variable_erasure_falls_back_to_object() {
        let bounded = TypeVariable::new("T", vec![class("java.lang.Number")], vec![]);
        assert_eq!(bounded.name(), DotName::simple("java.lang.Number"));
        let unbounded = TypeVariable::new("T", vec![], vec![]);
        assert_eq!(unbounded.name(), DotName::simple("java.lang.Object"));
    }

    #[test]
    fn unpatched_reference_queries_panic() {
        let reference = TypeVariableReference::new("T", vec![]);
        assert!(!reference.is_patched());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            reference.follow().name()
        }));
        assert!(result.is_err());
    }

    #[test]
    fn structural_equality_ignores_reference_target() {
        let a = TypeVariableReference::new("T", vec![]);
        let b = TypeVariableReference::new("T", vec![]);
        a.patch(TypeVariable::new("T", vec![class("java.lang.Number")], vec![]));
        b.patch(TypeVariable::new("T", vec![class("java.lang.CharSequence")], vec![]));

        let ta: Type = a.clone().into();
        let tb: Type = b.clone().into();
        // Structural: identifier + annotations only.
        assert_eq!(ta, tb);
        // Interning: identity.
        assert!(!ta.intern_eq(&tb));
        assert!(ta.intern_eq(&ta.clone()));
    }

    #[test]
    fn annotation_lookup_is_sorted_binary_search() {
        let ty = class("com.acme.Holder")
            .with_added_annotation(marker("com.acme.Foo"))
            .with_added_annotation(marker("com.acme.Bar"))
            .with_added_annotation(marker("com.acme.Baz"));
        let names: Vec<String> = ty.annotations().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["com.acme.Bar", "com.acme.Baz", "com.acme.Foo"]);
        assert!(ty.annotation(&DotName::simple("com.acme.Bar")).is_some());
        assert!(ty.annotation(&DotName::simple("com.acme.Qux")).is_none());
    }

    #[test]
    fn with_added_annotation_does_not_mutate_original() {
        let original = class("com.acme.Holder");
        let annotated = original.with_added_annotation(marker("com.acme.Foo"));
        assert!(original.annotations().is_empty());
        assert_eq!(annotated.annotations().len(), 1);
        assert_ne!(original, annotated);
    }

    #[test]
    fn annotation_values_reachable_through_class_kind() {
        let ann = AnnotationInstance::new(
            DotName::simple("com.acme.Uses"),
            vec![AnnotationValue::new(
                "value",
                AnnotationValueKind::Class(class("java.lang.String")),
            )],
            None,
            true,
        );
        match ann.value("value").unwrap().kind() {
            AnnotationValueKind::Class(ty) => assert_eq!(ty.name(), DotName::simple("java.lang.String")),
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
