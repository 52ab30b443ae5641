use pretty_assertions::assert_eq;

use quarry_classfile::{flags, ClassInfo, Error, Indexed, Indexer, Nesting};
use quarry_core::DotName;
use quarry_test_utils::{
    AnnotationSpec, ClassFileWriter, ModuleSpec, RecordComponentSpec, ValueSpec,
};
use quarry_types::AnnotationValueKind;

fn index_class(indexer: &mut Indexer, writer: &ClassFileWriter) -> ClassInfo {
    match indexer.index(&writer.build()).expect("decode") {
        Indexed::Class(class) => class,
        Indexed::Module(_) => panic!("expected a class"),
    }
}

#[test]
fn decodes_basic_class_structure() {
    let mut writer = ClassFileWriter::new("com/acme/Greeter");
    writer.interface("java/io/Serializable");
    writer.field(flags::PRIVATE | flags::FINAL, "greeting", "Ljava/lang/String;");
    writer.field(flags::PRIVATE, "count", "I");
    writer.method(flags::PUBLIC, "greet", "(Ljava/lang/String;)Ljava/lang/String;");
    writer.method(flags::PUBLIC | flags::STATIC, "max", "(JJ)J");

    let mut indexer = Indexer::new();
    let class = index_class(&mut indexer, &writer);

    assert_eq!(class.name(), &DotName::simple("com.acme.Greeter"));
    assert_eq!(class.super_name(), Some(&DotName::simple("java.lang.Object")));
    assert_eq!(
        class.interface_names().to_vec(),
        vec![DotName::simple("java.io.Serializable")]
    );
    assert!(!class.is_interface());
    assert!(!class.is_record());
    assert_eq!(class.nesting(), &Nesting::TopLevel);
    assert_eq!(class.simple_name(), Some("Greeter"));
    assert_eq!(class.version().major, 61);

    // Fields are sorted and binary-searchable.
    let names: Vec<&str> = class.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["count", "greeting"]);
    let greeting = class.field("greeting").unwrap();
    assert_eq!(
        greeting.field_type().name(),
        DotName::simple("java.lang.String")
    );
    assert_eq!(greeting.descriptor(), "Ljava/lang/String;");
    assert_eq!(greeting.declaring_class(), class.name());
    assert!(class.field("missing").is_none());

    let greet = class.first_method("greet").unwrap();
    assert_eq!(greet.parameters().len(), 1);
    assert_eq!(
        greet.return_type().name(),
        DotName::simple("java.lang.String")
    );
    let max = class.first_method("max").unwrap();
    assert_eq!(max.parameters().len(), 2);
}

#[test]
fn annotation_lookup_uses_sorted_binary_search() {
    let mut writer = ClassFileWriter::new("com/acme/Annotated");
    writer.annotation(AnnotationSpec::new("Lcom/acme/Foo;"));
    writer.annotation(AnnotationSpec::new("Lcom/acme/Bar;"));
    writer.annotation(AnnotationSpec::new("Lcom/acme/Baz;"));

    let mut indexer = Indexer::new();
    let class = index_class(&mut indexer, &writer);

    let names: Vec<String> = class
        .annotations()
        .iter()
        .map(|a| a.name().to_string())
        .collect();
    assert_eq!(names, vec!["com.acme.Bar", "com.acme.Baz", "com.acme.Foo"]);
    let bar = class.annotation(&DotName::simple("com.acme.Bar")).unwrap();
    assert_eq!(bar.name(), &DotName::simple("com.acme.Bar"));
    assert!(class.annotation(&DotName::simple("com.acme.Qux")).is_none());
}

#[test]
fn decodes_annotation_member_values() {
    let mut writer = ClassFileWriter::new("com/acme/Configured");
    writer.annotation(
        AnnotationSpec::new("Lcom/acme/Config;")
            .value("retries", ValueSpec::Int(3))
            .value("name", ValueSpec::Str("primary".to_string()))
            .value("enabled", ValueSpec::Boolean(true))
            .value(
                "mode",
                ValueSpec::Enum {
                    descriptor: "Lcom/acme/Mode;".to_string(),
                    constant: "FAST".to_string(),
                },
            )
            .value("type", ValueSpec::Class("Ljava/lang/String;".to_string()))
            .value(
                "tags",
                ValueSpec::Array(vec![
                    ValueSpec::Str("a".to_string()),
                    ValueSpec::Str("b".to_string()),
                ]),
            ),
    );

    let mut indexer = Indexer::new();
    let class = index_class(&mut indexer, &writer);
    let config = class.annotation(&DotName::simple("com.acme.Config")).unwrap();

    assert!(config.runtime_visible());
    assert_eq!(config.value("retries").unwrap().kind(), &AnnotationValueKind::Int(3));
    assert!(matches!(
        config.value("enabled").unwrap().kind(),
        AnnotationValueKind::Boolean(true)
    ));
    match config.value("mode").unwrap().kind() {
        AnnotationValueKind::Enum {
            type_name,
            constant,
        } => {
            assert_eq!(type_name, &DotName::simple("com.acme.Mode"));
            assert_eq!(&**constant, "FAST");
        }
        other => panic!("unexpected kind: {other:?}"),
    }
    match config.value("type").unwrap().kind() {
        AnnotationValueKind::Class(ty) => {
            assert_eq!(ty.name(), DotName::simple("java.lang.String"))
        }
        other => panic!("unexpected kind: {other:?}"),
    }
    match config.value("tags").unwrap().kind() {
        AnnotationValueKind::Array(values) => assert_eq!(values.len(), 2),
        other => panic!("unexpected kind: {other:?}"),
    }
    assert!(config.value("missing").is_none());
}

#[test]
fn resolves_recursive_class_type_parameter() {
    let mut writer = ClassFileWriter::new("com/acme/Node");
    writer.signature("<T:Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;");

    let mut indexer = Indexer::new();
    let class = index_class(&mut indexer, &writer);

    assert_eq!(class.type_parameters().len(), 1);
    let t = class.type_parameters()[0].as_type_variable().unwrap();
    let bound = t.bounds()[0].as_parameterized().unwrap();
    let argument = bound.arguments()[0].as_type_variable_reference().unwrap();
    assert_eq!(argument.identifier(), "T");
    assert!(argument.is_patched());
    assert!(argument.follow().same_instance(t));
}

#[test]
fn generic_field_and_method_signatures_resolve_against_class_scope() {
    let mut writer = ClassFileWriter::new("com/acme/Holder");
    writer.signature("<T:Ljava/lang/Object;>Ljava/lang/Object;");
    writer
        .field(flags::PRIVATE, "values", "Ljava/util/List;")
        .signature("Ljava/util/List<TT;>;");
    writer
        .method(flags::PUBLIC, "first", "()Ljava/lang/Object;")
        .signature("()TT;");

    let mut indexer = Indexer::new();
    let class = index_class(&mut indexer, &writer);

    let class_t = class.type_parameters()[0].as_type_variable().unwrap();

    let values = class.field("values").unwrap();
    let list = values.field_type().as_parameterized().unwrap();
    assert_eq!(list.name(), &DotName::simple("java.util.List"));
    let arg = list.arguments()[0].as_type_variable().unwrap();
    assert!(arg.same_instance(class_t));

    let first = class.first_method("first").unwrap();
    let ret = first.return_type().as_type_variable().unwrap();
    assert!(ret.same_instance(class_t));
}

#[test]
fn method_exceptions_and_generic_throws() {
    let mut writer = ClassFileWriter::new("com/acme/Thrower");
    writer
        .method(flags::PUBLIC, "run", "()V")
        .exception("java/io/IOException")
        .exception("java/lang/InterruptedException");
    writer
        .method(flags::PUBLIC, "generic", "()V")
        .signature("<X:Ljava/lang/Exception;>()V^TX;")
        .exception("java/lang/Exception");

    let mut indexer = Indexer::new();
    let class = index_class(&mut indexer, &writer);

    let run = class.first_method("run").unwrap();
    let thrown: Vec<String> = run.exceptions().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(
        thrown,
        vec!["java.io.IOException", "java.lang.InterruptedException"]
    );

    // The signature's throws clause wins over the Exceptions attribute.
    let generic = class.first_method("generic").unwrap();
    assert_eq!(generic.exceptions().len(), 1);
    assert!(generic.exceptions()[0].as_type_variable().is_some());
}

#[test]
fn annotation_interface_defaults_are_recorded() {
    let mut writer = ClassFileWriter::new("com/acme/Retry");
    writer.access_flags(
        flags::PUBLIC | flags::INTERFACE | flags::ABSTRACT | flags::ANNOTATION,
    );
    writer.super_class(Some("java/lang/Object"));
    writer
        .method(flags::PUBLIC | flags::ABSTRACT, "attempts", "()I")
        .default_value(ValueSpec::Int(3));

    let mut indexer = Indexer::new();
    let class = index_class(&mut indexer, &writer);

    assert!(class.is_annotation());
    let attempts = class.first_method("attempts").unwrap();
    let default = attempts.default_value().unwrap();
    assert_eq!(default.name(), "attempts");
    assert_eq!(default.kind(), &AnnotationValueKind::Int(3));
}

#[test]
fn decodes_record_components() {
    let mut writer = ClassFileWriter::new("com/acme/Point");
    writer.super_class(Some("java/lang/Record"));
    writer.record_component(RecordComponentSpec::new("x", "I"));
    writer.record_component(
        RecordComponentSpec::new("labels", "Ljava/util/List;")
            .signature("Ljava/util/List<Ljava/lang/String;>;")
            .annotation(AnnotationSpec::new("Lcom/acme/Label;")),
    );

    let mut indexer = Indexer::new();
    let class = index_class(&mut indexer, &writer);

    assert!(class.is_record());
    assert_eq!(class.record_components().len(), 2);
    let labels = class.record_component("labels").unwrap();
    let list = labels.component_type().as_parameterized().unwrap();
    assert_eq!(
        list.arguments()[0].name(),
        DotName::simple("java.lang.String")
    );
    assert!(labels
        .annotation(&DotName::simple("com.acme.Label"))
        .is_some());
}

#[test]
fn nesting_from_inner_classes_and_enclosing_method() {
    let mut inner = ClassFileWriter::new("com/acme/Outer$Inner");
    inner.inner_class("com/acme/Outer$Inner", Some("com/acme/Outer"), Some("Inner"), 0);

    let mut indexer = Indexer::new();
    let class = index_class(&mut indexer, &inner);
    assert_eq!(
        class.nesting(),
        &Nesting::Inner {
            enclosing_class: DotName::simple("com.acme.Outer"),
            simple_name: "Inner".into(),
        }
    );
    assert_eq!(class.simple_name(), Some("Inner"));
    assert_eq!(
        class.enclosing_class(),
        Some(&DotName::simple("com.acme.Outer"))
    );

    let mut anonymous = ClassFileWriter::new("com/acme/Outer$1");
    anonymous.inner_class("com/acme/Outer$1", None, None, 0);
    anonymous.enclosing_method("com/acme/Outer", Some(("run", "()V")));
    let class = index_class(&mut indexer, &anonymous);
    assert!(matches!(class.nesting(), Nesting::Anonymous { .. }));
    assert_eq!(class.simple_name(), None);
    assert_eq!(
        class.enclosing_class(),
        Some(&DotName::simple("com.acme.Outer"))
    );
}

#[test]
fn decodes_module_info() {
    let mut writer = ClassFileWriter::new("module-info");
    writer.access_flags(flags::MODULE);
    writer.super_class(None);
    writer.module(ModuleSpec {
        name: "com.acme.core".to_string(),
        flags: 0,
        requires: vec![("java.base".to_string(), 0x8000)],
        exports: vec![("com/acme/api".to_string(), vec![])],
        uses: vec!["com/acme/spi/Plugin".to_string()],
        provides: vec![(
            "com/acme/spi/Plugin".to_string(),
            vec!["com/acme/impl/DefaultPlugin".to_string()],
        )],
    });

    let mut indexer = Indexer::new();
    let module = match indexer.index(&writer.build()).expect("decode") {
        Indexed::Module(module) => module,
        Indexed::Class(_) => panic!("expected a module"),
    };

    assert_eq!(module.name, DotName::simple("com.acme.core"));
    assert!(!module.is_open);
    assert_eq!(module.requires.len(), 1);
    assert_eq!(module.requires[0].module, DotName::simple("java.base"));
    assert_eq!(module.exports[0].package, DotName::simple("com.acme.api"));
    assert_eq!(
        module.uses[0].service,
        DotName::simple("com.acme.spi.Plugin")
    );
    assert_eq!(
        module.provides[0].implementations,
        vec![DotName::simple("com.acme.impl.DefaultPlugin")]
    );
    assert_eq!(indexer.modules().len(), 1);
}

#[test]
fn rejects_corrupt_input() {
    let mut indexer = Indexer::new();

    assert!(matches!(
        indexer.index(&[0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 0]),
        Err(Error::InvalidMagic(0xDEAD_BEEF))
    ));

    let valid = ClassFileWriter::new("com/acme/Ok").build();
    assert!(matches!(
        indexer.index(&valid[..valid.len() - 3]),
        Err(Error::UnexpectedEof)
    ));

    let mut old = ClassFileWriter::new("com/acme/Old");
    old.version(44, 0);
    assert!(matches!(
        indexer.index(&old.build()),
        Err(Error::UnsupportedVersion { major: 44, .. })
    ));

    // Nothing was recorded for the failed classes.
    assert!(indexer.classes().is_empty());
}

#[test]
fn interning_shares_names_and_positions_are_stable() {
    let mut first = ClassFileWriter::new("com/acme/First");
    let mut second = ClassFileWriter::new("com/acme/Second");
    first.field(flags::PRIVATE, "s", "Ljava/lang/String;");
    second.field(flags::PRIVATE, "s", "Ljava/lang/String;");

    let mut indexer = Indexer::new();
    let a = index_class(&mut indexer, &first);
    let b = index_class(&mut indexer, &second);

    let ta = a.field("s").unwrap().field_type().clone();
    let tb = b.field("s").unwrap().field_type().clone();
    assert!(ta.intern_eq(&tb));

    let pool = indexer.store().type_pool();
    assert_eq!(pool.position_of(&ta), pool.position_of(&tb));
    assert!(pool.position_of(&ta).is_some());
}
