use pretty_assertions::assert_eq;

use quarry_classfile::{flags, ClassInfo, Indexed, Indexer};
use quarry_test_utils::ClassFileWriter;

fn index_class(writer: &ClassFileWriter) -> ClassInfo {
    let mut indexer = Indexer::new();
    match indexer.index(&writer.build()).expect("decode") {
        Indexed::Class(class) => class,
        Indexed::Module(_) => panic!("expected a class"),
    }
}

fn parameter_names(class: &ClassInfo, method: &str) -> Vec<Option<String>> {
    class
        .first_method(method)
        .unwrap()
        .parameters()
        .iter()
        .map(|p| p.name().map(str::to_string))
        .collect()
}

#[test]
fn names_from_method_parameters_attribute() {
    let mut writer = ClassFileWriter::new("com/acme/Service");
    writer
        .method(flags::PUBLIC, "send", "(Ljava/lang/String;I)V")
        .method_parameter(Some("message"), 0)
        .method_parameter(Some("priority"), 0);

    let class = index_class(&writer);
    assert_eq!(
        parameter_names(&class, "send"),
        vec![Some("message".to_string()), Some("priority".to_string())]
    );
}

#[test]
fn synthetic_and_mandated_entries_are_stripped() {
    // An inner-class constructor: the enclosing-instance reference is
    // mandated and never a source-level parameter.
    let mut writer = ClassFileWriter::new("com/acme/Outer$Inner");
    writer.inner_class("com/acme/Outer$Inner", Some("com/acme/Outer"), Some("Inner"), 0);
    writer
        .method(flags::PUBLIC, "<init>", "(Lcom/acme/Outer;Ljava/lang/String;)V")
        .method_parameter(Some("this$0"), flags::MANDATED)
        .method_parameter(Some("label"), 0);

    let class = index_class(&writer);
    let init = class.first_method("<init>").unwrap();
    assert_eq!(init.parameters().len(), 1);
    assert_eq!(init.parameters()[0].name(), Some("label"));
}

#[test]
fn names_from_local_variable_table() {
    // Instance method: slot 0 is `this`; the long parameter widens to two
    // slots, shifting everything after it.
    let mut writer = ClassFileWriter::new("com/acme/Calc");
    writer
        .method(flags::PUBLIC, "scale", "(JLjava/lang/String;)V")
        .local_variable(0, "this", "Lcom/acme/Calc;")
        .local_variable(1, "factor", "J")
        .local_variable(3, "unit", "Ljava/lang/String;");

    let class = index_class(&writer);
    assert_eq!(
        parameter_names(&class, "scale"),
        vec![Some("factor".to_string()), Some("unit".to_string())]
    );
}

#[test]
fn static_methods_start_at_slot_zero() {
    let mut writer = ClassFileWriter::new("com/acme/Calc");
    writer
        .method(flags::PUBLIC | flags::STATIC, "of", "(I)V")
        .local_variable(0, "value", "I");

    let class = index_class(&writer);
    assert_eq!(parameter_names(&class, "of"), vec![Some("value".to_string())]);
}

#[test]
fn disagreeing_sources_fall_back_to_no_names() {
    // MethodParameters says one declared parameter, the local variable
    // table covers two; after adjustment the sources still disagree, so no
    // names are recorded at all.
    let mut writer = ClassFileWriter::new("com/acme/Confused");
    writer
        .method(flags::PUBLIC | flags::STATIC, "run", "(II)V")
        .method_parameter(Some("only"), 0)
        .local_variable(0, "a", "I")
        .local_variable(1, "b", "I");

    let class = index_class(&writer);
    assert_eq!(parameter_names(&class, "run"), vec![None, None]);
}

#[test]
fn enum_constructor_drops_implicit_name_and_ordinal() {
    let mut writer = ClassFileWriter::new("com/acme/Color");
    writer.access_flags(flags::PUBLIC | flags::FINAL | flags::ENUM);
    writer.super_class(Some("java/lang/Enum"));
    writer
        .method(flags::PRIVATE, "<init>", "(Ljava/lang/String;ILjava/lang/String;)V")
        .local_variable(0, "this", "Lcom/acme/Color;")
        .local_variable(1, "$enum$name", "Ljava/lang/String;")
        .local_variable(2, "$enum$ordinal", "I")
        .local_variable(3, "hex", "Ljava/lang/String;");

    let class = index_class(&writer);
    let init = class.first_method("<init>").unwrap();
    assert_eq!(init.parameters().len(), 1);
    assert_eq!(init.parameters()[0].name(), Some("hex"));
    assert_eq!(
        init.parameters()[0].parameter_type().name(),
        quarry_core::DotName::simple("java.lang.String")
    );
}

#[test]
fn debug_names_can_be_disabled() {
    let mut options = quarry_classfile::IndexerOptions::default();
    options.parameter_names_from_debug_info = false;

    let mut writer = ClassFileWriter::new("com/acme/Quiet");
    writer
        .method(flags::PUBLIC | flags::STATIC, "go", "(I)V")
        .local_variable(0, "value", "I");

    let mut indexer = Indexer::with_options(options);
    let class = match indexer.index(&writer.build()).expect("decode") {
        Indexed::Class(class) => class,
        Indexed::Module(_) => unreachable!(),
    };
    assert_eq!(
        class.first_method("go").unwrap().parameters()[0].name(),
        None
    );
}
