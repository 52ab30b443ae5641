use pretty_assertions::assert_eq;

use quarry_core::DotName;
use quarry_test_utils::ClassFileWriter;

use super::index_of;

#[test]
fn classes_group_by_exact_package() {
    let a = ClassFileWriter::new("com/acme/api/Client");
    let b = ClassFileWriter::new("com/acme/api/Server");
    let c = ClassFileWriter::new("com/acme/impl/ServerImpl");
    let top = ClassFileWriter::new("Standalone");

    let index = index_of(&[&a, &b, &c, &top]);

    let api = index.classes_in_package(&DotName::simple("com.acme.api"));
    let mut names: Vec<String> = api.iter().map(|c| c.name().to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["com.acme.api.Client", "com.acme.api.Server"]);

    // Exact package only, no subpackages.
    assert!(index
        .classes_in_package(&DotName::simple("com.acme"))
        .is_empty());

    // Default-package classes live under the empty name.
    assert_eq!(index.classes_in_package(&DotName::simple("")).len(), 1);
}

#[test]
fn subpackages_are_direct_children() {
    let a = ClassFileWriter::new("com/acme/api/Client");
    let b = ClassFileWriter::new("com/acme/impl/ServerImpl");
    let c = ClassFileWriter::new("org/other/Thing");

    let index = index_of(&[&a, &b, &c]);

    assert_eq!(
        index.subpackages(&DotName::simple("com.acme")).to_vec(),
        vec![
            DotName::simple("com.acme.api"),
            DotName::simple("com.acme.impl"),
        ]
    );
    assert_eq!(
        index.subpackages(&DotName::simple("com")).to_vec(),
        vec![DotName::simple("com.acme")]
    );
    // Top-level packages hang off the empty root.
    assert_eq!(
        index.subpackages(&DotName::simple("")).to_vec(),
        vec![DotName::simple("com"), DotName::simple("org")]
    );
    assert!(index
        .subpackages(&DotName::simple("com.acme.api"))
        .is_empty());
}

#[test]
fn inner_classes_stay_in_their_outer_package() {
    let outer = ClassFileWriter::new("com/acme/Outer");
    let inner = ClassFileWriter::new("com/acme/Outer$Inner");

    let index = index_of(&[&outer, &inner]);
    assert_eq!(index.classes_in_package(&DotName::simple("com.acme")).len(), 2);
}
