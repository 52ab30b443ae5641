#![forbid(unsafe_code)]

//! The aggregate, read-only index over a batch of decoded classes.
//!
//! [`Index::new`] computes the derived relation maps (direct subclasses,
//! subinterfaces, implementors and annotation usages) in a single pass over
//! the batch. Transitive queries walk the direct maps breadth-first at query
//! time. Once constructed an index never changes and is safe for
//! unsynchronized concurrent reads; the two package views are computed
//! lazily, once.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use quarry_classfile::{ClassInfo, ModuleInfo};
use quarry_core::DotName;
use quarry_types::{AnnotationInstance, AnnotationValueKind};

/// A usage error on a query that needs a class the index does not hold.
/// Distinct from "no results": an empty answer would be misleading when the
/// defining class simply was not indexed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    #[error("annotation class not indexed: {0}")]
    AnnotationNotIndexed(DotName),
    #[error("not an annotation class: {0}")]
    NotAnAnnotation(DotName),
}

fn repeatable_name() -> DotName {
    DotName::simple("java.lang.annotation.Repeatable")
}

fn root_package() -> DotName {
    DotName::simple("")
}

/// The immutable aggregate over one decoded batch.
pub struct Index {
    classes: HashMap<DotName, ClassInfo>,
    class_list: Box<[ClassInfo]>,
    annotations: HashMap<DotName, Box<[AnnotationInstance]>>,
    modules: HashMap<DotName, ModuleInfo>,
    subclasses: HashMap<DotName, Vec<ClassInfo>>,
    subinterfaces: HashMap<DotName, Vec<ClassInfo>>,
    implementors: HashMap<DotName, Vec<ClassInfo>>,
    by_package: OnceLock<HashMap<DotName, Vec<ClassInfo>>>,
    subpackages: OnceLock<HashMap<DotName, Vec<DotName>>>,
}

impl Index {
    /// Build an index from a decoded batch. Reverse edges are recorded in
    /// one pass: a class's superclass gains a subclass edge, its interfaces
    /// gain implementor edges; an interface's extended interfaces gain
    /// subinterface edges.
    pub fn new(classes: Vec<ClassInfo>, modules: Vec<ModuleInfo>) -> Index {
        let mut by_name = HashMap::with_capacity(classes.len());
        let mut annotations: HashMap<DotName, Vec<AnnotationInstance>> = HashMap::new();
        let mut subclasses: HashMap<DotName, Vec<ClassInfo>> = HashMap::new();
        let mut subinterfaces: HashMap<DotName, Vec<ClassInfo>> = HashMap::new();
        let mut implementors: HashMap<DotName, Vec<ClassInfo>> = HashMap::new();

        for class in &classes {
            by_name.insert(class.name().clone(), class.clone());

            if class.is_interface() {
                for interface in class.interface_names() {
                    subinterfaces
                        .entry(interface.clone())
                        .or_default()
                        .push(class.clone());
                }
                // An interface's superclass slot is java.lang.Object; that
                // edge carries no information.
            } else {
                if let Some(super_name) = class.super_name() {
                    subclasses
                        .entry(super_name.clone())
                        .or_default()
                        .push(class.clone());
                }
                for interface in class.interface_names() {
                    implementors
                        .entry(interface.clone())
                        .or_default()
                        .push(class.clone());
                }
            }

            for instance in class.all_annotations() {
                annotations
                    .entry(instance.name().clone())
                    .or_default()
                    .push(instance.clone());
            }
        }

        let modules = modules
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();

        Index {
            classes: by_name,
            class_list: classes.into_boxed_slice(),
            annotations: annotations
                .into_iter()
                .map(|(name, list)| (name, list.into_boxed_slice()))
                .collect(),
            modules,
            subclasses,
            subinterfaces,
            implementors,
            by_package: OnceLock::new(),
            subpackages: OnceLock::new(),
        }
    }

    pub fn class_by_name(&self, name: &DotName) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    /// All indexed classes in decode order.
    pub fn known_classes(&self) -> &[ClassInfo] {
        &self.class_list
    }

    pub fn module(&self, name: &DotName) -> Option<&ModuleInfo> {
        self.modules.get(name)
    }

    pub fn known_modules(&self) -> impl Iterator<Item = &ModuleInfo> {
        self.modules.values()
    }

    /// Every recorded usage of the named annotation, across declarations,
    /// members, parameters and type usages. Empty when none are known.
    pub fn annotations_of(&self, name: &DotName) -> &[AnnotationInstance] {
        self.annotations.get(name).map(|a| &**a).unwrap_or(&[])
    }

    pub fn known_direct_subclasses(&self, name: &DotName) -> &[ClassInfo] {
        self.subclasses.get(name).map(|c| &**c).unwrap_or(&[])
    }

    /// Transitive subclasses, breadth-first over the direct map.
    pub fn all_known_subclasses(&self, name: &DotName) -> Vec<ClassInfo> {
        self.walk(&self.subclasses, name)
    }

    pub fn known_direct_subinterfaces(&self, name: &DotName) -> &[ClassInfo] {
        self.subinterfaces.get(name).map(|c| &**c).unwrap_or(&[])
    }

    /// Transitive subinterfaces, breadth-first over the direct map.
    pub fn all_known_subinterfaces(&self, name: &DotName) -> Vec<ClassInfo> {
        self.walk(&self.subinterfaces, name)
    }

    pub fn known_direct_implementors(&self, name: &DotName) -> &[ClassInfo] {
        self.implementors.get(name).map(|c| &**c).unwrap_or(&[])
    }

    /// Every concrete class that transitively implements the interface: a
    /// subinterface met on the way is pushed back onto the work queue as a
    /// supertype to keep walking, and each implementing class contributes
    /// its whole subclass tree.
    pub fn all_known_implementors(&self, interface: &DotName) -> Vec<ClassInfo> {
        let mut result = Vec::new();
        let mut seen_interfaces: HashSet<DotName> = HashSet::new();
        let mut seen_classes: HashSet<DotName> = HashSet::new();
        let mut queue: VecDeque<DotName> = VecDeque::new();
        queue.push_back(interface.clone());

        while let Some(current) = queue.pop_front() {
            if !seen_interfaces.insert(current.clone()) {
                continue;
            }
            for subinterface in self.known_direct_subinterfaces(&current) {
                queue.push_back(subinterface.name().clone());
            }
            for implementor in self.known_direct_implementors(&current) {
                if seen_classes.insert(implementor.name().clone()) {
                    result.push(implementor.clone());
                }
                for subclass in self.all_known_subclasses(implementor.name()) {
                    if seen_classes.insert(subclass.name().clone()) {
                        result.push(subclass);
                    }
                }
            }
        }
        result
    }

    /// Usages of a repeatable annotation, with instances nested inside its
    /// container annotation flattened in (re-targeted to the container's
    /// declaration).
    ///
    /// Needs the annotation class itself in the index to discover the
    /// container type; its absence is a usage error, not an empty answer.
    pub fn annotations_with_repeatable(
        &self,
        name: &DotName,
    ) -> Result<Vec<AnnotationInstance>, QueryError> {
        let annotation_class = self
            .class_by_name(name)
            .ok_or_else(|| QueryError::AnnotationNotIndexed(name.clone()))?;
        if !annotation_class.is_annotation() {
            return Err(QueryError::NotAnAnnotation(name.clone()));
        }

        let mut result: Vec<AnnotationInstance> = self.annotations_of(name).to_vec();

        if let Some(repeatable) = annotation_class.annotation(&repeatable_name()) {
            if let Some(container_name) = repeatable
                .value("value")
                .and_then(|v| match v.kind() {
                    AnnotationValueKind::Class(ty) => Some(ty.name()),
                    _ => None,
                })
            {
                for container in self.annotations_of(&container_name) {
                    let Some(value) = container.value("value") else {
                        continue;
                    };
                    let AnnotationValueKind::Array(values) = value.kind() else {
                        continue;
                    };
                    for nested in values.iter() {
                        if let AnnotationValueKind::Nested(instance) = nested.kind() {
                            result.push(instance.with_target(container.target().cloned()));
                        }
                    }
                }
            }
        }
        Ok(result)
    }

    /// Classes whose package is exactly `package` (not subpackages).
    /// Classes in the default package live under the empty name.
    pub fn classes_in_package(&self, package: &DotName) -> &[ClassInfo] {
        self.packages().get(package).map(|c| &**c).unwrap_or(&[])
    }

    /// Direct subpackages of `package` among indexed classes. Top-level
    /// packages are subpackages of the empty name.
    pub fn subpackages(&self, package: &DotName) -> &[DotName] {
        self.subpackage_map().get(package).map(|p| &**p).unwrap_or(&[])
    }

    fn walk(&self, edges: &HashMap<DotName, Vec<ClassInfo>>, start: &DotName) -> Vec<ClassInfo> {
        let mut result = Vec::new();
        let mut seen: HashSet<DotName> = HashSet::new();
        let mut queue: VecDeque<DotName> = VecDeque::new();
        queue.push_back(start.clone());

        while let Some(current) = queue.pop_front() {
            let Some(direct) = edges.get(&current) else {
                continue;
            };
            for next in direct {
                if seen.insert(next.name().clone()) {
                    result.push(next.clone());
                    queue.push_back(next.name().clone());
                }
            }
        }
        result
    }

    fn packages(&self) -> &HashMap<DotName, Vec<ClassInfo>> {
        self.by_package.get_or_init(|| {
            let mut map: HashMap<DotName, Vec<ClassInfo>> = HashMap::new();
            for class in self.class_list.iter() {
                let package = class.name().package_prefix().unwrap_or_else(root_package);
                map.entry(package).or_default().push(class.clone());
            }
            map
        })
    }

    fn subpackage_map(&self) -> &HashMap<DotName, Vec<DotName>> {
        self.subpackages.get_or_init(|| {
            let mut map: HashMap<DotName, HashSet<DotName>> = HashMap::new();
            for package in self.packages().keys() {
                let mut child = package.clone();
                while let Some(parent) = child.package_prefix() {
                    map.entry(parent.clone()).or_default().insert(child.clone());
                    child = parent;
                }
                if child != root_package() {
                    map.entry(root_package()).or_default().insert(child);
                }
            }
            map.into_iter()
                .map(|(parent, children)| {
                    let mut children: Vec<DotName> = children.into_iter().collect();
                    children.sort();
                    (parent, children)
                })
                .collect()
        })
    }
}
