use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A dot-separated binary name, e.g. `java.lang.Object` or `com.acme.Outer$Inner`.
///
/// Two representations with identical external semantics:
///
/// * **simple** — one string holding the whole name. Cheap to construct, used
///   for transient lookups.
/// * **componentized** — a chain of `(prefix, local segment, separator kind)`
///   nodes. Names produced during decoding share prefix nodes, so ten
///   thousand classes in `com.acme.service` store that package once.
///
/// Equality, ordering and hashing are defined character-by-character over the
/// fully expanded dotted string (with `$` for inner-class separators) and are
/// identical for both representations. Componentization is purely a memory
/// optimization.
#[derive(Clone)]
pub struct DotName {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Simple(Arc<str>),
    Component(Arc<Component>),
}

struct Component {
    prefix: Option<Arc<Component>>,
    local: Arc<str>,
    /// `local` is separated from `prefix` by `$` rather than `.`.
    inner_class: bool,
}

impl DotName {
    /// Create a simple (non-componentized) name from its full dotted form.
    pub fn simple(name: impl Into<Arc<str>>) -> DotName {
        DotName {
            repr: Repr::Simple(name.into()),
        }
    }

    /// Create a componentized name from an optional prefix and a local segment.
    ///
    /// # Panics
    ///
    /// Panics if `prefix` is a simple name; chains are built out of
    /// componentized names only.
    pub fn componentized(
        prefix: Option<&DotName>,
        local: impl Into<Arc<str>>,
        inner_class: bool,
    ) -> DotName {
        let prefix = match prefix {
            None => None,
            Some(DotName {
                repr: Repr::Component(c),
            }) => Some(Arc::clone(c)),
            Some(_) => panic!("componentized name requires a componentized prefix"),
        };
        DotName {
            repr: Repr::Component(Arc::new(Component {
                prefix,
                local: local.into(),
                inner_class,
            })),
        }
    }

    pub fn is_componentized(&self) -> bool {
        matches!(self.repr, Repr::Component(_))
    }

    /// Whether the last segment is an inner-class segment (separated by `$`).
    ///
    /// Always `false` for simple names, which do not track separator kinds.
    pub fn is_inner_class(&self) -> bool {
        match &self.repr {
            Repr::Simple(_) => false,
            Repr::Component(c) => c.inner_class,
        }
    }

    /// The last segment of a componentized name; the whole string for a
    /// simple name.
    pub fn local_name(&self) -> &str {
        match &self.repr {
            Repr::Simple(s) => s,
            Repr::Component(c) => &c.local,
        }
    }

    /// Everything before the last segment, or `None` for simple and
    /// single-segment names.
    pub fn prefix(&self) -> Option<DotName> {
        match &self.repr {
            Repr::Simple(_) => None,
            Repr::Component(c) => c.prefix.as_ref().map(|p| DotName {
                repr: Repr::Component(Arc::clone(p)),
            }),
        }
    }

    /// The package portion of this name, or `None` for unqualified names.
    ///
    /// Inner-class segments belong to the class, not the package:
    /// `a.b.Outer$Inner` has package prefix `a.b`.
    pub fn package_prefix(&self) -> Option<DotName> {
        match &self.repr {
            Repr::Simple(s) => {
                let dot = s.rfind('.')?;
                Some(DotName::simple(&s[..dot]))
            }
            Repr::Component(c) => {
                let mut outer: &Component = c;
                while outer.inner_class {
                    outer = outer.prefix.as_deref()?;
                }
                outer.prefix.as_ref().map(|p| DotName {
                    repr: Repr::Component(Arc::clone(p)),
                })
            }
        }
    }

    /// Iterate the bytes of the fully expanded dotted form.
    fn bytes(&self) -> NameBytes<'_> {
        match &self.repr {
            Repr::Simple(s) => NameBytes {
                chain: Vec::new(),
                next_component: 0,
                segment: s.as_bytes(),
                within: 0,
                pending_sep: None,
            },
            Repr::Component(c) => {
                let mut chain = Vec::new();
                let mut cur = Some(c);
                while let Some(node) = cur {
                    chain.push(&**node);
                    cur = node.prefix.as_ref();
                }
                // Outermost first; the innermost local comes last.
                let first = chain.pop().expect("non-empty component chain");
                chain.reverse();
                NameBytes {
                    chain,
                    next_component: 0,
                    segment: first.local.as_bytes(),
                    within: 0,
                    pending_sep: None,
                }
            }
        }
    }

    pub(crate) fn shares_component_with(&self, other: &DotName) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Component(a), Repr::Component(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

struct NameBytes<'a> {
    /// Remaining components after the one currently being emitted.
    chain: Vec<&'a Component>,
    next_component: usize,
    segment: &'a [u8],
    within: usize,
    pending_sep: Option<u8>,
}

impl<'a> Iterator for NameBytes<'a> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        loop {
            if let Some(sep) = self.pending_sep.take() {
                return Some(sep);
            }
            if self.within < self.segment.len() {
                let b = self.segment[self.within];
                self.within += 1;
                return Some(b);
            }
            let component = self.chain.get(self.next_component)?;
            self.next_component += 1;
            self.pending_sep = Some(if component.inner_class { b'$' } else { b'.' });
            self.segment = component.local.as_bytes();
            self.within = 0;
        }
    }
}

impl PartialEq for DotName {
    fn eq(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Simple(a), Repr::Simple(b)) => a == b,
            (Repr::Component(a), Repr::Component(b)) if Arc::ptr_eq(a, b) => true,
            _ => self.bytes().eq(other.bytes()),
        }
    }
}

impl Eq for DotName {}

impl PartialOrd for DotName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DotName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes().cmp(other.bytes())
    }
}

impl Hash for DotName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.bytes() {
            state.write_u8(b);
        }
    }
}

impl fmt::Display for DotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Simple(s) => f.write_str(s),
            Repr::Component(c) => {
                let mut chain = Vec::new();
                let mut cur = Some(c);
                while let Some(node) = cur {
                    chain.push(&**node);
                    cur = node.prefix.as_ref();
                }
                for (i, node) in chain.iter().rev().enumerate() {
                    if i > 0 {
                        f.write_str(if node.inner_class { "$" } else { "." })?;
                    }
                    f.write_str(&node.local)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for DotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DotName({self})")
    }
}

impl From<&str> for DotName {
    fn from(name: &str) -> Self {
        DotName::simple(name)
    }
}
