use pretty_assertions::assert_eq;

use quarry_classfile::flags;
use quarry_core::DotName;
use quarry_index::QueryError;
use quarry_test_utils::{AnnotationSpec, ClassFileWriter, ValueSpec};
use quarry_types::AnnotationTarget;

use super::index_of;

#[test]
fn annotation_usages_span_declarations_members_and_parameters() {
    let mut service = ClassFileWriter::new("com/acme/Service");
    service.annotation(AnnotationSpec::new("Lcom/acme/Component;"));
    service
        .field(flags::PRIVATE, "repository", "Lcom/acme/Repository;")
        .annotation(AnnotationSpec::new("Lcom/acme/Inject;"));
    service
        .method(flags::PUBLIC, "create", "(Ljava/lang/String;)V")
        .parameter_annotation(0, AnnotationSpec::new("Lcom/acme/Valid;"));

    let mut repository = ClassFileWriter::new("com/acme/Repository");
    repository.annotation(AnnotationSpec::new("Lcom/acme/Component;"));

    let index = index_of(&[&service, &repository]);

    let components = index.annotations_of(&DotName::simple("com.acme.Component"));
    assert_eq!(components.len(), 2);

    let injected = index.annotations_of(&DotName::simple("com.acme.Inject"));
    assert_eq!(injected.len(), 1);
    assert_eq!(
        injected[0].target(),
        Some(&AnnotationTarget::Field {
            class: DotName::simple("com.acme.Service"),
            field: "repository".into(),
        })
    );

    let valid = index.annotations_of(&DotName::simple("com.acme.Valid"));
    assert_eq!(valid.len(), 1);
    assert!(matches!(
        valid[0].target(),
        Some(AnnotationTarget::MethodParameter { position: 0, .. })
    ));

    assert!(index
        .annotations_of(&DotName::simple("com.acme.Unused"))
        .is_empty());
}

fn annotation_interface(internal_name: &str) -> ClassFileWriter {
    let mut writer = ClassFileWriter::new(internal_name);
    writer.access_flags(
        flags::PUBLIC | flags::INTERFACE | flags::ABSTRACT | flags::ANNOTATION,
    );
    writer
}

#[test]
fn repeatable_annotations_flatten_container_instances() {
    // @Schedule is @Repeatable(Schedules.class).
    let mut schedule = annotation_interface("com/acme/Schedule");
    schedule.annotation(
        AnnotationSpec::new("Ljava/lang/annotation/Repeatable;")
            .value("value", ValueSpec::Class("Lcom/acme/Schedules;".to_string())),
    );
    let schedules = annotation_interface("com/acme/Schedules");

    // One direct usage, one containerized double usage.
    let mut direct = ClassFileWriter::new("com/acme/Nightly");
    direct.annotation(
        AnnotationSpec::new("Lcom/acme/Schedule;")
            .value("cron", ValueSpec::Str("0 0 * * *".to_string())),
    );

    let mut doubled = ClassFileWriter::new("com/acme/Frequent");
    doubled.annotation(
        AnnotationSpec::new("Lcom/acme/Schedules;").value(
            "value",
            ValueSpec::Array(vec![
                ValueSpec::Nested(
                    AnnotationSpec::new("Lcom/acme/Schedule;")
                        .value("cron", ValueSpec::Str("@hourly".to_string())),
                ),
                ValueSpec::Nested(
                    AnnotationSpec::new("Lcom/acme/Schedule;")
                        .value("cron", ValueSpec::Str("@daily".to_string())),
                ),
            ]),
        ),
    );

    let index = index_of(&[&schedule, &schedules, &direct, &doubled]);
    let schedule_name = DotName::simple("com.acme.Schedule");

    // The plain query sees only the direct usage.
    assert_eq!(index.annotations_of(&schedule_name).len(), 1);

    let mut all = index.annotations_with_repeatable(&schedule_name).unwrap();
    all.sort_by_key(|a| {
        a.value("cron")
            .map(|v| format!("{:?}", v.kind()))
            .unwrap_or_default()
    });
    assert_eq!(all.len(), 3);

    // Flattened instances are re-targeted to the container's declaration.
    let hourly = all
        .iter()
        .find(|a| {
            a.value("cron").is_some_and(|v| {
                matches!(v.kind(), quarry_types::AnnotationValueKind::String(s) if &**s == "@hourly")
            })
        })
        .unwrap();
    assert_eq!(
        hourly.target(),
        Some(&AnnotationTarget::Class(DotName::simple("com.acme.Frequent")))
    );
}

#[test]
fn repeatable_query_requires_the_annotation_class() {
    let mut user = ClassFileWriter::new("com/acme/User");
    user.annotation(AnnotationSpec::new("Lcom/acme/Absent;"));

    let index = index_of(&[&user]);

    // Usages exist, but the defining class is not indexed: a usage error,
    // not an empty result.
    let missing = DotName::simple("com.acme.Absent");
    assert_eq!(index.annotations_of(&missing).len(), 1);
    assert!(matches!(
        index.annotations_with_repeatable(&missing),
        Err(QueryError::AnnotationNotIndexed(_))
    ));

    // A plain class is not an annotation class.
    assert!(matches!(
        index.annotations_with_repeatable(&DotName::simple("com.acme.User")),
        Err(QueryError::NotAnAnnotation(_))
    ));
}

#[test]
fn invisible_annotations_are_marked() {
    let mut writer = ClassFileWriter::new("com/acme/Internal");
    writer.invisible_annotation(AnnotationSpec::new("Lcom/acme/Generated;"));

    let index = index_of(&[&writer]);
    let generated = index.annotations_of(&DotName::simple("com.acme.Generated"));
    assert_eq!(generated.len(), 1);
    assert!(!generated[0].runtime_visible());
}
