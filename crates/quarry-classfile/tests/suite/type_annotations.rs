use pretty_assertions::assert_eq;

use quarry_classfile::{flags, ClassInfo, Indexed, Indexer};
use quarry_core::DotName;
use quarry_test_utils::{
    AnnotationSpec, ClassFileWriter, PathStepSpec, TargetSpec, TypeAnnotationSpec,
};
use quarry_types::{AnnotationTarget, TypePosition};

fn index_class(writer: &ClassFileWriter) -> ClassInfo {
    let mut indexer = Indexer::new();
    match indexer.index(&writer.build()).expect("decode") {
        Indexed::Class(class) => class,
        Indexed::Module(_) => panic!("expected a class"),
    }
}

fn marker(descriptor: &str) -> AnnotationSpec {
    AnnotationSpec::new(descriptor)
}

#[test]
fn field_type_annotation_lands_on_the_field_type() {
    let mut writer = ClassFileWriter::new("com/acme/Holder");
    writer
        .field(flags::PRIVATE, "value", "Ljava/lang/String;")
        .type_annotation(TypeAnnotationSpec {
            target: TargetSpec::Field,
            path: vec![],
            annotation: marker("Lcom/acme/NotNull;"),
        });

    let class = index_class(&writer);
    let field = class.field("value").unwrap();
    let annotation = field
        .field_type()
        .annotation(&DotName::simple("com.acme.NotNull"))
        .expect("type annotation attached");

    // The instance's target locates the usage: the field's own type.
    let (enclosing, position) = annotation.target().unwrap().as_type_target().unwrap();
    assert_eq!(position, &TypePosition::Empty);
    assert_eq!(
        enclosing,
        &AnnotationTarget::Field {
            class: DotName::simple("com.acme.Holder"),
            field: "value".into(),
        }
    );
}

#[test]
fn array_path_splits_compressed_dimensions() {
    // String[][] with the annotation one dimension in: the compressed
    // 2-dimension node splits so the inner remainder can carry it.
    let mut writer = ClassFileWriter::new("com/acme/Grid");
    writer
        .field(flags::PRIVATE, "cells", "[[Ljava/lang/String;")
        .type_annotation(TypeAnnotationSpec {
            target: TargetSpec::Field,
            path: vec![PathStepSpec::Array],
            annotation: marker("Lcom/acme/Ann;"),
        });

    let class = index_class(&writer);
    let outer = class.field("cells").unwrap().field_type().as_array().unwrap();
    assert_eq!(outer.dimensions(), 1);
    assert_eq!(outer.deep_dimensions(), 2);
    let inner = outer.constituent().as_array().unwrap();
    assert_eq!(inner.dimensions(), 1);
    assert_eq!(outer.constituent().annotations().len(), 1);
    assert_eq!(
        outer.element_type().name(),
        DotName::simple("java.lang.String")
    );
}

#[test]
fn plain_arrays_stay_compressed() {
    let mut writer = ClassFileWriter::new("com/acme/Grid");
    writer.field(flags::PRIVATE, "cells", "[[Ljava/lang/String;");

    let class = index_class(&writer);
    let array = class.field("cells").unwrap().field_type().as_array().unwrap();
    assert_eq!(array.dimensions(), 2);
    assert_eq!(array.deep_dimensions(), 2);
    assert!(array.constituent().as_array().is_none());
}

#[test]
fn return_parameter_and_throws_annotations() {
    let mut writer = ClassFileWriter::new("com/acme/Api");
    let method = writer.method(
        flags::PUBLIC,
        "fetch",
        "(Ljava/lang/String;)Ljava/lang/String;",
    );
    method.exception("java/io/IOException");
    method.type_annotation(TypeAnnotationSpec {
        target: TargetSpec::Return,
        path: vec![],
        annotation: marker("Lcom/acme/NotNull;"),
    });
    method.type_annotation(TypeAnnotationSpec {
        target: TargetSpec::FormalParameter(0),
        path: vec![],
        annotation: marker("Lcom/acme/Trusted;"),
    });
    method.type_annotation(TypeAnnotationSpec {
        target: TargetSpec::Throws(0),
        path: vec![],
        annotation: marker("Lcom/acme/Logged;"),
    });

    let class = index_class(&writer);
    let fetch = class.first_method("fetch").unwrap();

    assert!(fetch
        .return_type()
        .annotation(&DotName::simple("com.acme.NotNull"))
        .is_some());
    assert!(fetch.parameters()[0]
        .parameter_type()
        .annotation(&DotName::simple("com.acme.Trusted"))
        .is_some());
    assert!(fetch.exceptions()[0]
        .annotation(&DotName::simple("com.acme.Logged"))
        .is_some());
}

#[test]
fn type_argument_path_reaches_into_generics() {
    let mut writer = ClassFileWriter::new("com/acme/Holder");
    let field = writer.field(flags::PRIVATE, "names", "Ljava/util/List;");
    field.signature("Ljava/util/List<Ljava/lang/String;>;");
    field.type_annotation(TypeAnnotationSpec {
        target: TargetSpec::Field,
        path: vec![PathStepSpec::TypeArgument(0)],
        annotation: marker("Lcom/acme/NotNull;"),
    });

    let class = index_class(&writer);
    let list = class
        .field("names")
        .unwrap()
        .field_type()
        .as_parameterized()
        .unwrap();
    assert_eq!(list.arguments()[0].annotations().len(), 1);
}

#[test]
fn wildcard_bound_path() {
    let mut writer = ClassFileWriter::new("com/acme/Holder");
    let field = writer.field(flags::PRIVATE, "numbers", "Ljava/util/List;");
    field.signature("Ljava/util/List<+Ljava/lang/Number;>;");
    field.type_annotation(TypeAnnotationSpec {
        target: TargetSpec::Field,
        path: vec![PathStepSpec::TypeArgument(0), PathStepSpec::Wildcard],
        annotation: marker("Lcom/acme/Positive;"),
    });

    let class = index_class(&writer);
    let list = class
        .field("numbers")
        .unwrap()
        .field_type()
        .as_parameterized()
        .unwrap();
    let wildcard = list.arguments()[0].as_wildcard().unwrap();
    assert_eq!(wildcard.bound().unwrap().annotations().len(), 1);
}

#[test]
fn superclass_and_interface_annotations() {
    let mut writer = ClassFileWriter::new("com/acme/Impl");
    writer.super_class(Some("com/acme/Base"));
    writer.interface("java/io/Serializable");
    writer.type_annotation(TypeAnnotationSpec {
        target: TargetSpec::ClassExtends(65535),
        path: vec![],
        annotation: marker("Lcom/acme/OnSuper;"),
    });
    writer.type_annotation(TypeAnnotationSpec {
        target: TargetSpec::ClassExtends(0),
        path: vec![],
        annotation: marker("Lcom/acme/OnIface;"),
    });

    let class = index_class(&writer);
    assert!(class
        .super_class_type()
        .unwrap()
        .annotation(&DotName::simple("com.acme.OnSuper"))
        .is_some());
    assert!(class.interface_types()[0]
        .annotation(&DotName::simple("com.acme.OnIface"))
        .is_some());
}

#[test]
fn type_parameter_bound_annotations() {
    let mut writer = ClassFileWriter::new("com/acme/Bounded");
    writer.signature("<T:Ljava/lang/Object;:Ljava/io/Serializable;>Ljava/lang/Object;");
    writer.type_annotation(TypeAnnotationSpec {
        target: TargetSpec::ClassTypeParameter(0),
        path: vec![],
        annotation: marker("Lcom/acme/OnVar;"),
    });
    writer.type_annotation(TypeAnnotationSpec {
        target: TargetSpec::ClassTypeParameterBound(0, 1),
        path: vec![],
        annotation: marker("Lcom/acme/OnBound;"),
    });

    let class = index_class(&writer);
    let t = class.type_parameters()[0].as_type_variable().unwrap();
    assert!(class.type_parameters()[0]
        .annotation(&DotName::simple("com.acme.OnVar"))
        .is_some());
    assert!(t.bounds()[1]
        .annotation(&DotName::simple("com.acme.OnBound"))
        .is_some());
}

#[test]
fn receiver_annotations_materialize_the_receiver_type() {
    let mut writer = ClassFileWriter::new("com/acme/Api");
    writer
        .method(flags::PUBLIC, "close", "()V")
        .type_annotation(TypeAnnotationSpec {
            target: TargetSpec::Receiver,
            path: vec![],
            annotation: marker("Lcom/acme/Closing;"),
        });

    let class = index_class(&writer);
    let close = class.first_method("close").unwrap();
    let receiver = close.receiver_type().expect("receiver materialized");
    assert_eq!(receiver.name(), DotName::simple("com.acme.Api"));
    assert_eq!(receiver.annotations().len(), 1);

    // Methods without receiver annotations expose no receiver type.
    let mut plain = ClassFileWriter::new("com/acme/Plain");
    plain.method(flags::PUBLIC, "run", "()V");
    let class = index_class(&plain);
    assert!(class.first_method("run").unwrap().receiver_type().is_none());
}
