use std::collections::HashMap;
use std::sync::Arc;

use crate::dot_name::DotName;
use crate::intern::InternPool;

/// Builds componentized [`DotName`]s, sharing prefix chains and segment
/// strings across every name converted through the same table.
///
/// The table grows monotonically for the lifetime of a decoding session;
/// there is no eviction. One table per independent decoding pipeline (see the
/// `Indexer` in `quarry-classfile`).
pub struct NameTable {
    strings: InternPool<str>,
    /// Full dotted string → componentized name, so repeat conversions skip
    /// the backward scan entirely.
    names: HashMap<Arc<str>, DotName>,
}

impl NameTable {
    pub fn new() -> Self {
        NameTable {
            strings: InternPool::new(),
            names: HashMap::new(),
        }
    }

    /// Intern a string segment, returning the canonical `Arc<str>`.
    pub fn intern_str(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.find(s) {
            return existing;
        }
        self.strings.intern(Arc::from(s))
    }

    /// Convert a dotted binary name (inner classes separated by `$`) into a
    /// componentized [`DotName`].
    ///
    /// The string is scanned backward for the last `.` or `$` that does not
    /// leave an empty segment on either side; the prefix is materialized
    /// recursively (hitting the cache for shared packages) and the local
    /// segment is interned.
    pub fn convert_to_name(&mut self, name: &str) -> DotName {
        if let Some(existing) = self.names.get(name) {
            return existing.clone();
        }

        let bytes = name.as_bytes();
        let mut split = None;
        let mut i = bytes.len();
        while i > 0 {
            i -= 1;
            let b = bytes[i];
            if b == b'.' || b == b'$' {
                // A split that would leave an empty prefix or local segment
                // (leading/trailing separators, `$$` runs) is not a split.
                if i == 0 || i + 1 == bytes.len() {
                    continue;
                }
                split = Some((i, b));
                break;
            }
        }

        let converted = match split {
            Some((at, separator)) => {
                let prefix = self.convert_to_name(&name[..at]);
                let local = self.intern_str(&name[at + 1..]);
                DotName::componentized(Some(&prefix), local, separator == b'$')
            }
            None => {
                let local = self.intern_str(name);
                DotName::componentized(None, local, false)
            }
        };

        let key = self.intern_str(name);
        self.names.insert(key, converted.clone());
        converted
    }

    /// Extend a componentized name with one more segment, reusing `prefix`'s
    /// chain. Used for inner-class suffixes in generic signatures, where the
    /// outer class's name is already at hand; these names bypass the
    /// full-string cache.
    pub fn extend_name(&mut self, prefix: &DotName, local: &str, inner_class: bool) -> DotName {
        let local = self.intern_str(local);
        DotName::componentized(Some(prefix), local, inner_class)
    }

    /// The string pool backing this table; exposes 1-based ordinals for
    /// serializers.
    pub fn strings(&self) -> &InternPool<str> {
        &self.strings
    }

    /// Convert a JVM internal name (`java/lang/Object`) to its dotted form
    /// and componentize it.
    pub fn convert_internal(&mut self, internal: &str) -> DotName {
        if internal.contains('/') {
            let dotted = internal.replace('/', ".");
            self.convert_to_name(&dotted)
        } else {
            self.convert_to_name(internal)
        }
    }

    /// Number of distinct full names converted so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn converted_names_match_simple_names() {
        let mut table = NameTable::new();
        for s in [
            "java.lang.Object",
            "java.util.Map$Entry",
            "Top",
            "scala.Tuple2$mcII$sp",
        ] {
            let converted = table.convert_to_name(s);
            assert_eq!(converted, DotName::simple(s), "{s}");
            assert_eq!(converted.to_string(), s);
        }
    }

    #[test]
    fn names_in_one_package_share_the_prefix_chain() {
        let mut table = NameTable::new();
        let a = table.convert_to_name("com.acme.service.Alpha");
        let b = table.convert_to_name("com.acme.service.Beta");
        let pa = a.prefix().unwrap();
        let pb = b.prefix().unwrap();
        assert!(pa.shares_component_with(&pb));
    }

    #[test]
    fn inner_class_names_reuse_the_outer_chain() {
        let mut table = NameTable::new();
        let outer = table.convert_to_name("com.acme.Outer");
        let inner = table.convert_to_name("com.acme.Outer$Inner");
        assert!(inner.is_inner_class());
        assert!(inner.prefix().unwrap().shares_component_with(&outer));
    }

    #[test]
    fn conversion_is_cached() {
        let mut table = NameTable::new();
        let first = table.convert_to_name("a.b.C");
        let again = table.convert_to_name("a.b.C");
        assert!(first.shares_component_with(&again));
        assert_eq!(table.len(), 3); // a, a.b, a.b.C
    }

    #[test]
    fn internal_names_convert_slashes() {
        let mut table = NameTable::new();
        let name = table.convert_internal("java/util/Map$Entry");
        assert_eq!(name, DotName::simple("java.util.Map$Entry"));
    }

    #[test]
    fn degenerate_separators_do_not_split_into_empty_segments() {
        let mut table = NameTable::new();
        for s in ["$", "a$", "$a", "a..b"] {
            let converted = table.convert_to_name(s);
            assert_eq!(converted, DotName::simple(s), "{s}");
            assert_eq!(converted.to_string(), s, "{s}");
        }
    }
}
