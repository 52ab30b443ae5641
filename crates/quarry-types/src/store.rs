use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use quarry_core::{DotName, InternPool, InternStrategy, NameTable};

use crate::types::Type;

/// Interning semantics for [`Type`]: structural, except type-variable
/// references are unique by identity. See [`Type::intern_eq`].
pub struct TypeIntern;

impl InternStrategy<Type> for TypeIntern {
    fn hash(value: &Type) -> u64 {
        let mut h = DefaultHasher::new();
        value.intern_hash(&mut h);
        h.finish()
    }

    fn equals(a: &Type, b: &Type) -> bool {
        a.intern_eq(b)
    }
}

/// Interning semantics for type lists (bound lists, argument lists).
pub struct TypeListIntern;

impl InternStrategy<[Type]> for TypeListIntern {
    fn hash(value: &[Type]) -> u64 {
        let mut h = DefaultHasher::new();
        value.len().hash(&mut h);
        for ty in value {
            ty.intern_hash(&mut h);
        }
        h.finish()
    }

    fn equals(a: &[Type], b: &[Type]) -> bool {
        a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.intern_eq(y))
    }
}

/// Per-session interning state: the name table plus the type pool.
///
/// One store per decoding pipeline; it is handed through the descriptor and
/// signature parsers so every name and type constructed during a session is
/// deduplicated against everything decoded before it. The store is mutable
/// and single-threaded for the life of the session, then discarded (or kept
/// for incremental indexing of further batches).
pub struct TypeStore {
    names: NameTable,
    types: InternPool<Type, TypeIntern>,
    type_lists: InternPool<[Type], TypeListIntern>,
}

impl TypeStore {
    pub fn new() -> TypeStore {
        TypeStore {
            names: NameTable::new(),
            types: InternPool::new(),
            type_lists: InternPool::new(),
        }
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn names_mut(&mut self) -> &mut NameTable {
        &mut self.names
    }

    /// Intern a type, returning the canonical value (whose shared inner data
    /// is the first-ever-stored structurally-identical instance).
    pub fn intern_type(&mut self, ty: Type) -> Type {
        if let Some(existing) = self.types.find(&ty) {
            return (*existing).clone();
        }
        (*self.types.intern(Arc::new(ty))).clone()
    }

    /// Intern a list of types (bounds, arguments, parameters).
    pub fn intern_type_list(&mut self, types: Vec<Type>) -> Arc<[Type]> {
        if let Some(existing) = self.types_list_find(&types) {
            return existing;
        }
        self.type_lists.intern(Arc::from(types))
    }

    fn types_list_find(&self, types: &[Type]) -> Option<Arc<[Type]>> {
        self.type_lists.find(types)
    }

    /// The type pool; exposes 1-based ordinals for serializers.
    pub fn type_pool(&self) -> &InternPool<Type, TypeIntern> {
        &self.types
    }

    /// The type-list pool; exposes 1-based ordinals for serializers.
    pub fn type_list_pool(&self) -> &InternPool<[Type], TypeListIntern> {
        &self.type_lists
    }

    pub fn object_name(&mut self) -> DotName {
        self.names.convert_to_name("java.lang.Object")
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}
