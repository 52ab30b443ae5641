use pretty_assertions::assert_eq;

use quarry_classfile::flags;
use quarry_core::DotName;
use quarry_test_utils::ClassFileWriter;

use super::index_of;

fn names(classes: &[quarry_classfile::ClassInfo]) -> Vec<String> {
    let mut names: Vec<String> = classes.iter().map(|c| c.name().to_string()).collect();
    names.sort();
    names
}

#[test]
fn diamond_hierarchy_closures() {
    // interface I; class A implements I; class B extends A.
    let mut i = ClassFileWriter::new("com/acme/I");
    i.access_flags(flags::PUBLIC | flags::INTERFACE | flags::ABSTRACT);

    let mut a = ClassFileWriter::new("com/acme/A");
    a.interface("com/acme/I");

    let mut b = ClassFileWriter::new("com/acme/B");
    b.super_class(Some("com/acme/A"));

    let index = index_of(&[&i, &a, &b]);
    let i_name = DotName::simple("com.acme.I");
    let a_name = DotName::simple("com.acme.A");

    assert_eq!(
        names(index.known_direct_implementors(&i_name)),
        vec!["com.acme.A"]
    );
    assert_eq!(
        names(&index.all_known_implementors(&i_name)),
        vec!["com.acme.A", "com.acme.B"]
    );
    assert_eq!(
        names(index.known_direct_subclasses(&a_name)),
        vec!["com.acme.B"]
    );
    assert_eq!(
        names(&index.all_known_subclasses(&a_name)),
        vec!["com.acme.B"]
    );
}

#[test]
fn implementors_walk_through_subinterfaces() {
    // interface I; interface J extends I; class C implements J;
    // class D extends C.
    let mut i = ClassFileWriter::new("com/acme/I");
    i.access_flags(flags::PUBLIC | flags::INTERFACE | flags::ABSTRACT);

    let mut j = ClassFileWriter::new("com/acme/J");
    j.access_flags(flags::PUBLIC | flags::INTERFACE | flags::ABSTRACT);
    j.interface("com/acme/I");

    let mut c = ClassFileWriter::new("com/acme/C");
    c.interface("com/acme/J");

    let mut d = ClassFileWriter::new("com/acme/D");
    d.super_class(Some("com/acme/C"));

    let index = index_of(&[&i, &j, &c, &d]);
    let i_name = DotName::simple("com.acme.I");

    // J extends I: a subinterface edge, not an implementor edge.
    assert!(index.known_direct_implementors(&i_name).is_empty());
    assert_eq!(
        names(index.known_direct_subinterfaces(&i_name)),
        vec!["com.acme.J"]
    );
    // The transitive walk pushes J back as a supertype and then merges C's
    // subclass tree.
    assert_eq!(
        names(&index.all_known_implementors(&i_name)),
        vec!["com.acme.C", "com.acme.D"]
    );
    assert_eq!(
        names(&index.all_known_subinterfaces(&i_name)),
        vec!["com.acme.J"]
    );
}

#[test]
fn deep_subclass_chains_are_transitive() {
    let mut a = ClassFileWriter::new("com/acme/A");
    a.super_class(Some("java/lang/Object"));
    let mut b = ClassFileWriter::new("com/acme/B");
    b.super_class(Some("com/acme/A"));
    let mut c = ClassFileWriter::new("com/acme/C");
    c.super_class(Some("com/acme/B"));

    let index = index_of(&[&a, &b, &c]);
    let a_name = DotName::simple("com.acme.A");

    assert_eq!(names(index.known_direct_subclasses(&a_name)), vec!["com.acme.B"]);
    assert_eq!(
        names(&index.all_known_subclasses(&a_name)),
        vec!["com.acme.B", "com.acme.C"]
    );
    // Unknown supertypes simply have no recorded subtypes.
    assert!(index
        .all_known_subclasses(&DotName::simple("com.acme.Missing"))
        .is_empty());
}

#[test]
fn class_lookup_accepts_simple_names() {
    let a = ClassFileWriter::new("com/acme/A");
    let index = index_of(&[&a]);

    // A transient, non-componentized name is equal to the interned one.
    let found = index.class_by_name(&DotName::simple("com.acme.A"));
    assert!(found.is_some());
    assert_eq!(index.known_classes().len(), 1);
}
