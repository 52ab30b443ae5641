#![forbid(unsafe_code)]

//! Synthetic class-file construction for tests.
//!
//! Emits structurally valid class files (constant pool, members, the
//! attribute set the decoder understands) without a Java compiler in the
//! loop, so decoder and index tests can exercise exact byte-level inputs.

use std::collections::HashMap;

// Constant pool builder -------------------------------------------------------

#[derive(Default)]
struct CpBuilder {
    bytes: Vec<u8>,
    next_index: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
    integers: HashMap<i32, u16>,
    doubles: HashMap<u64, u16>,
    modules: HashMap<String, u16>,
    packages: HashMap<String, u16>,
    name_and_types: HashMap<(String, String), u16>,
}

impl CpBuilder {
    fn new() -> CpBuilder {
        CpBuilder {
            next_index: 1,
            ..CpBuilder::default()
        }
    }

    fn utf8(&mut self, s: &str) -> u16 {
        if let Some(&idx) = self.utf8.get(s) {
            return idx;
        }
        let idx = self.next_index;
        self.next_index += 1;
        self.bytes.push(1);
        self.bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(s.as_bytes());
        self.utf8.insert(s.to_string(), idx);
        idx
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        if let Some(&idx) = self.classes.get(internal_name) {
            return idx;
        }
        let name_index = self.utf8(internal_name);
        let idx = self.next_index;
        self.next_index += 1;
        self.bytes.push(7);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        self.classes.insert(internal_name.to_string(), idx);
        idx
    }

    fn integer(&mut self, value: i32) -> u16 {
        if let Some(&idx) = self.integers.get(&value) {
            return idx;
        }
        let idx = self.next_index;
        self.next_index += 1;
        self.bytes.push(3);
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self.integers.insert(value, idx);
        idx
    }

    fn double(&mut self, value: f64) -> u16 {
        let bits = value.to_bits();
        if let Some(&idx) = self.doubles.get(&bits) {
            return idx;
        }
        let idx = self.next_index;
        // Doubles occupy two constant pool slots.
        self.next_index += 2;
        self.bytes.push(6);
        self.bytes.extend_from_slice(&bits.to_be_bytes());
        self.doubles.insert(bits, idx);
        idx
    }

    fn module(&mut self, name: &str) -> u16 {
        if let Some(&idx) = self.modules.get(name) {
            return idx;
        }
        let name_index = self.utf8(name);
        let idx = self.next_index;
        self.next_index += 1;
        self.bytes.push(19);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        self.modules.insert(name.to_string(), idx);
        idx
    }

    fn package(&mut self, name: &str) -> u16 {
        if let Some(&idx) = self.packages.get(name) {
            return idx;
        }
        let name_index = self.utf8(name);
        let idx = self.next_index;
        self.next_index += 1;
        self.bytes.push(20);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        self.packages.insert(name.to_string(), idx);
        idx
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let key = (name.to_string(), descriptor.to_string());
        if let Some(&idx) = self.name_and_types.get(&key) {
            return idx;
        }
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let idx = self.next_index;
        self.next_index += 1;
        self.bytes.push(12);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        self.bytes.extend_from_slice(&descriptor_index.to_be_bytes());
        self.name_and_types.insert(key, idx);
        idx
    }

    fn finish(self) -> (u16, Vec<u8>) {
        (self.next_index, self.bytes)
    }
}

// Annotation specs ------------------------------------------------------------

/// One annotation to emit, by field descriptor (`Lcom/acme/Ann;`).
#[derive(Clone, Debug)]
pub struct AnnotationSpec {
    descriptor: String,
    values: Vec<(String, ValueSpec)>,
}

impl AnnotationSpec {
    pub fn new(descriptor: &str) -> AnnotationSpec {
        AnnotationSpec {
            descriptor: descriptor.to_string(),
            values: Vec::new(),
        }
    }

    pub fn value(mut self, name: &str, value: ValueSpec) -> AnnotationSpec {
        self.values.push((name.to_string(), value));
        self
    }
}

#[derive(Clone, Debug)]
pub enum ValueSpec {
    Int(i32),
    Boolean(bool),
    Double(f64),
    Str(String),
    Enum { descriptor: String, constant: String },
    Class(String),
    Nested(AnnotationSpec),
    Array(Vec<ValueSpec>),
}

/// Where a type annotation points.
#[derive(Clone, Copy, Debug)]
pub enum TargetSpec {
    Field,
    Return,
    Receiver,
    ClassExtends(u16),
    ClassTypeParameter(u8),
    MethodTypeParameter(u8),
    ClassTypeParameterBound(u8, u8),
    MethodTypeParameterBound(u8, u8),
    FormalParameter(u8),
    Throws(u16),
}

#[derive(Clone, Copy, Debug)]
pub enum PathStepSpec {
    Array,
    Nested,
    Wildcard,
    TypeArgument(u8),
}

#[derive(Clone, Debug)]
pub struct TypeAnnotationSpec {
    pub target: TargetSpec,
    pub path: Vec<PathStepSpec>,
    pub annotation: AnnotationSpec,
}

// Member specs ----------------------------------------------------------------

/// A field or method under construction.
pub struct MemberSpec {
    flags: u16,
    name: String,
    descriptor: String,
    signature: Option<String>,
    visible_annotations: Vec<AnnotationSpec>,
    invisible_annotations: Vec<AnnotationSpec>,
    type_annotations: Vec<TypeAnnotationSpec>,
    exceptions: Vec<String>,
    method_parameters: Option<Vec<(Option<String>, u16)>>,
    parameter_annotations: Vec<Vec<AnnotationSpec>>,
    /// (slot, name, descriptor); emitting any produces a `Code` attribute
    /// with a `LocalVariableTable`.
    local_variables: Vec<(u16, String, String)>,
    annotation_default: Option<ValueSpec>,
}

impl MemberSpec {
    fn new(flags: u16, name: &str, descriptor: &str) -> MemberSpec {
        MemberSpec {
            flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            type_annotations: Vec::new(),
            exceptions: Vec::new(),
            method_parameters: None,
            parameter_annotations: Vec::new(),
            local_variables: Vec::new(),
            annotation_default: None,
        }
    }

    pub fn signature(&mut self, signature: &str) -> &mut MemberSpec {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn annotation(&mut self, annotation: AnnotationSpec) -> &mut MemberSpec {
        self.visible_annotations.push(annotation);
        self
    }

    pub fn invisible_annotation(&mut self, annotation: AnnotationSpec) -> &mut MemberSpec {
        self.invisible_annotations.push(annotation);
        self
    }

    pub fn type_annotation(&mut self, annotation: TypeAnnotationSpec) -> &mut MemberSpec {
        self.type_annotations.push(annotation);
        self
    }

    pub fn exception(&mut self, internal_name: &str) -> &mut MemberSpec {
        self.exceptions.push(internal_name.to_string());
        self
    }

    /// Add a `MethodParameters` entry; `name` of `None` emits index 0.
    pub fn method_parameter(&mut self, name: Option<&str>, flags: u16) -> &mut MemberSpec {
        self.method_parameters
            .get_or_insert_with(Vec::new)
            .push((name.map(str::to_string), flags));
        self
    }

    pub fn parameter_annotation(&mut self, index: usize, annotation: AnnotationSpec) -> &mut MemberSpec {
        if self.parameter_annotations.len() <= index {
            self.parameter_annotations.resize_with(index + 1, Vec::new);
        }
        self.parameter_annotations[index].push(annotation);
        self
    }

    pub fn local_variable(&mut self, slot: u16, name: &str, descriptor: &str) -> &mut MemberSpec {
        self.local_variables
            .push((slot, name.to_string(), descriptor.to_string()));
        self
    }

    pub fn default_value(&mut self, value: ValueSpec) -> &mut MemberSpec {
        self.annotation_default = Some(value);
        self
    }
}

#[derive(Clone, Debug)]
pub struct RecordComponentSpec {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub annotations: Vec<AnnotationSpec>,
}

impl RecordComponentSpec {
    pub fn new(name: &str, descriptor: &str) -> RecordComponentSpec {
        RecordComponentSpec {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            annotations: Vec::new(),
        }
    }

    pub fn signature(mut self, signature: &str) -> RecordComponentSpec {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn annotation(mut self, annotation: AnnotationSpec) -> RecordComponentSpec {
        self.annotations.push(annotation);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModuleSpec {
    pub name: String,
    pub flags: u16,
    pub requires: Vec<(String, u16)>,
    pub exports: Vec<(String, Vec<String>)>,
    pub uses: Vec<String>,
    pub provides: Vec<(String, Vec<String>)>,
}

// Class writer ----------------------------------------------------------------

/// Builds one synthetic class file.
pub struct ClassFileWriter {
    major: u16,
    minor: u16,
    access_flags: u16,
    this_class: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    signature: Option<String>,
    visible_annotations: Vec<AnnotationSpec>,
    invisible_annotations: Vec<AnnotationSpec>,
    type_annotations: Vec<TypeAnnotationSpec>,
    inner_classes: Vec<(String, Option<String>, Option<String>, u16)>,
    enclosing_method: Option<(String, Option<(String, String)>)>,
    record_components: Option<Vec<RecordComponentSpec>>,
    fields: Vec<MemberSpec>,
    methods: Vec<MemberSpec>,
    module: Option<ModuleSpec>,
}

impl ClassFileWriter {
    pub fn new(internal_name: &str) -> ClassFileWriter {
        ClassFileWriter {
            major: 61,
            minor: 0,
            access_flags: 0x0021, // public super
            this_class: internal_name.to_string(),
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            signature: None,
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            type_annotations: Vec::new(),
            inner_classes: Vec::new(),
            enclosing_method: None,
            record_components: None,
            fields: Vec::new(),
            methods: Vec::new(),
            module: None,
        }
    }

    pub fn version(&mut self, major: u16, minor: u16) -> &mut ClassFileWriter {
        self.major = major;
        self.minor = minor;
        self
    }

    pub fn access_flags(&mut self, flags: u16) -> &mut ClassFileWriter {
        self.access_flags = flags;
        self
    }

    pub fn super_class(&mut self, internal_name: Option<&str>) -> &mut ClassFileWriter {
        self.super_class = internal_name.map(str::to_string);
        self
    }

    pub fn interface(&mut self, internal_name: &str) -> &mut ClassFileWriter {
        self.interfaces.push(internal_name.to_string());
        self
    }

    pub fn signature(&mut self, signature: &str) -> &mut ClassFileWriter {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn annotation(&mut self, annotation: AnnotationSpec) -> &mut ClassFileWriter {
        self.visible_annotations.push(annotation);
        self
    }

    pub fn invisible_annotation(&mut self, annotation: AnnotationSpec) -> &mut ClassFileWriter {
        self.invisible_annotations.push(annotation);
        self
    }

    pub fn type_annotation(&mut self, annotation: TypeAnnotationSpec) -> &mut ClassFileWriter {
        self.type_annotations.push(annotation);
        self
    }

    pub fn inner_class(
        &mut self,
        inner: &str,
        outer: Option<&str>,
        simple_name: Option<&str>,
        flags: u16,
    ) -> &mut ClassFileWriter {
        self.inner_classes.push((
            inner.to_string(),
            outer.map(str::to_string),
            simple_name.map(str::to_string),
            flags,
        ));
        self
    }

    pub fn enclosing_method(
        &mut self,
        class: &str,
        method: Option<(&str, &str)>,
    ) -> &mut ClassFileWriter {
        self.enclosing_method = Some((
            class.to_string(),
            method.map(|(n, d)| (n.to_string(), d.to_string())),
        ));
        self
    }

    pub fn record_component(&mut self, component: RecordComponentSpec) -> &mut ClassFileWriter {
        self.record_components
            .get_or_insert_with(Vec::new)
            .push(component);
        self
    }

    pub fn field(&mut self, flags: u16, name: &str, descriptor: &str) -> &mut MemberSpec {
        self.fields.push(MemberSpec::new(flags, name, descriptor));
        self.fields.last_mut().expect("just pushed")
    }

    pub fn method(&mut self, flags: u16, name: &str, descriptor: &str) -> &mut MemberSpec {
        self.methods.push(MemberSpec::new(flags, name, descriptor));
        self.methods.last_mut().expect("just pushed")
    }

    pub fn module(&mut self, module: ModuleSpec) -> &mut ClassFileWriter {
        self.module = Some(module);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut cp = CpBuilder::new();
        let this_index = cp.class(&self.this_class);
        let super_index = self.super_class.as_deref().map(|s| cp.class(s));
        let interface_indexes: Vec<u16> =
            self.interfaces.iter().map(|i| cp.class(i)).collect();

        let field_bodies: Vec<Vec<u8>> = self
            .fields
            .iter()
            .map(|f| encode_member(&mut cp, f))
            .collect();
        let method_bodies: Vec<Vec<u8>> = self
            .methods
            .iter()
            .map(|m| encode_member(&mut cp, m))
            .collect();
        let class_attributes = self.encode_class_attributes(&mut cp);

        let (count, cp_bytes) = cp.finish();

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&self.minor.to_be_bytes());
        out.extend_from_slice(&self.major.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        out.extend_from_slice(&cp_bytes);
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&this_index.to_be_bytes());
        out.extend_from_slice(&super_index.unwrap_or(0).to_be_bytes());
        out.extend_from_slice(&(interface_indexes.len() as u16).to_be_bytes());
        for idx in interface_indexes {
            out.extend_from_slice(&idx.to_be_bytes());
        }
        out.extend_from_slice(&(field_bodies.len() as u16).to_be_bytes());
        for body in field_bodies {
            out.extend_from_slice(&body);
        }
        out.extend_from_slice(&(method_bodies.len() as u16).to_be_bytes());
        for body in method_bodies {
            out.extend_from_slice(&body);
        }
        out.extend_from_slice(&(class_attributes.len() as u16).to_be_bytes());
        for (name_index, payload) in class_attributes {
            out.extend_from_slice(&name_index.to_be_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            out.extend_from_slice(&payload);
        }
        out
    }

    fn encode_class_attributes(&self, cp: &mut CpBuilder) -> Vec<(u16, Vec<u8>)> {
        let mut attributes = Vec::new();

        if let Some(signature) = &self.signature {
            let payload = cp.utf8(signature).to_be_bytes().to_vec();
            attributes.push((cp.utf8("Signature"), payload));
        }
        if !self.visible_annotations.is_empty() {
            let payload = encode_annotation_list(cp, &self.visible_annotations);
            attributes.push((cp.utf8("RuntimeVisibleAnnotations"), payload));
        }
        if !self.invisible_annotations.is_empty() {
            let payload = encode_annotation_list(cp, &self.invisible_annotations);
            attributes.push((cp.utf8("RuntimeInvisibleAnnotations"), payload));
        }
        if !self.type_annotations.is_empty() {
            let payload = encode_type_annotation_list(cp, &self.type_annotations);
            attributes.push((cp.utf8("RuntimeVisibleTypeAnnotations"), payload));
        }
        if !self.inner_classes.is_empty() {
            let mut payload = (self.inner_classes.len() as u16).to_be_bytes().to_vec();
            for (inner, outer, simple, flags) in &self.inner_classes {
                let inner_index = cp.class(inner);
                let outer_index = outer.as_deref().map(|o| cp.class(o)).unwrap_or(0);
                let simple_index = simple.as_deref().map(|s| cp.utf8(s)).unwrap_or(0);
                payload.extend_from_slice(&inner_index.to_be_bytes());
                payload.extend_from_slice(&outer_index.to_be_bytes());
                payload.extend_from_slice(&simple_index.to_be_bytes());
                payload.extend_from_slice(&flags.to_be_bytes());
            }
            attributes.push((cp.utf8("InnerClasses"), payload));
        }
        if let Some((class, method)) = &self.enclosing_method {
            let class_index = cp.class(class);
            let method_index = method
                .as_ref()
                .map(|(n, d)| cp.name_and_type(n, d))
                .unwrap_or(0);
            let mut payload = class_index.to_be_bytes().to_vec();
            payload.extend_from_slice(&method_index.to_be_bytes());
            attributes.push((cp.utf8("EnclosingMethod"), payload));
        }
        if let Some(components) = &self.record_components {
            let mut payload = (components.len() as u16).to_be_bytes().to_vec();
            for component in components {
                payload.extend_from_slice(&cp.utf8(&component.name).to_be_bytes());
                payload.extend_from_slice(&cp.utf8(&component.descriptor).to_be_bytes());
                let mut attrs: Vec<(u16, Vec<u8>)> = Vec::new();
                if let Some(signature) = &component.signature {
                    let sig_payload = cp.utf8(signature).to_be_bytes().to_vec();
                    attrs.push((cp.utf8("Signature"), sig_payload));
                }
                if !component.annotations.is_empty() {
                    let ann_payload = encode_annotation_list(cp, &component.annotations);
                    attrs.push((cp.utf8("RuntimeVisibleAnnotations"), ann_payload));
                }
                payload.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
                for (name_index, attr_payload) in attrs {
                    payload.extend_from_slice(&name_index.to_be_bytes());
                    payload.extend_from_slice(&(attr_payload.len() as u32).to_be_bytes());
                    payload.extend_from_slice(&attr_payload);
                }
            }
            attributes.push((cp.utf8("Record"), payload));
        }
        if let Some(module) = &self.module {
            let payload = encode_module(cp, module);
            attributes.push((cp.utf8("Module"), payload));
        }
        attributes
    }
}

// Encoding helpers ------------------------------------------------------------

fn encode_member(cp: &mut CpBuilder, member: &MemberSpec) -> Vec<u8> {
    let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();

    if let Some(signature) = &member.signature {
        let payload = cp.utf8(signature).to_be_bytes().to_vec();
        attributes.push((cp.utf8("Signature"), payload));
    }
    if !member.exceptions.is_empty() {
        let mut payload = (member.exceptions.len() as u16).to_be_bytes().to_vec();
        for exception in &member.exceptions {
            payload.extend_from_slice(&cp.class(exception).to_be_bytes());
        }
        attributes.push((cp.utf8("Exceptions"), payload));
    }
    if !member.visible_annotations.is_empty() {
        let payload = encode_annotation_list(cp, &member.visible_annotations);
        attributes.push((cp.utf8("RuntimeVisibleAnnotations"), payload));
    }
    if !member.invisible_annotations.is_empty() {
        let payload = encode_annotation_list(cp, &member.invisible_annotations);
        attributes.push((cp.utf8("RuntimeInvisibleAnnotations"), payload));
    }
    if !member.parameter_annotations.is_empty() {
        let mut payload = vec![member.parameter_annotations.len() as u8];
        for parameter in &member.parameter_annotations {
            payload.extend_from_slice(&(parameter.len() as u16).to_be_bytes());
            for annotation in parameter {
                payload.extend_from_slice(&encode_annotation(cp, annotation));
            }
        }
        attributes.push((cp.utf8("RuntimeVisibleParameterAnnotations"), payload));
    }
    if !member.type_annotations.is_empty() {
        let payload = encode_type_annotation_list(cp, &member.type_annotations);
        attributes.push((cp.utf8("RuntimeVisibleTypeAnnotations"), payload));
    }
    if let Some(parameters) = &member.method_parameters {
        let mut payload = vec![parameters.len() as u8];
        for (name, flags) in parameters {
            let name_index = name.as_deref().map(|n| cp.utf8(n)).unwrap_or(0);
            payload.extend_from_slice(&name_index.to_be_bytes());
            payload.extend_from_slice(&flags.to_be_bytes());
        }
        attributes.push((cp.utf8("MethodParameters"), payload));
    }
    if let Some(default) = &member.annotation_default {
        let payload = encode_element_value(cp, default);
        attributes.push((cp.utf8("AnnotationDefault"), payload));
    }
    if !member.local_variables.is_empty() {
        let payload = encode_code_with_locals(cp, &member.local_variables);
        attributes.push((cp.utf8("Code"), payload));
    }

    let mut out = Vec::new();
    out.extend_from_slice(&member.flags.to_be_bytes());
    out.extend_from_slice(&cp.utf8(&member.name).to_be_bytes());
    out.extend_from_slice(&cp.utf8(&member.descriptor).to_be_bytes());
    out.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
    for (name_index, payload) in attributes {
        out.extend_from_slice(&name_index.to_be_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&payload);
    }
    out
}

fn encode_annotation_list(cp: &mut CpBuilder, annotations: &[AnnotationSpec]) -> Vec<u8> {
    let mut payload = (annotations.len() as u16).to_be_bytes().to_vec();
    for annotation in annotations {
        payload.extend_from_slice(&encode_annotation(cp, annotation));
    }
    payload
}

fn encode_annotation(cp: &mut CpBuilder, annotation: &AnnotationSpec) -> Vec<u8> {
    let mut out = cp.utf8(&annotation.descriptor).to_be_bytes().to_vec();
    out.extend_from_slice(&(annotation.values.len() as u16).to_be_bytes());
    for (name, value) in &annotation.values {
        out.extend_from_slice(&cp.utf8(name).to_be_bytes());
        out.extend_from_slice(&encode_element_value(cp, value));
    }
    out
}

fn encode_element_value(cp: &mut CpBuilder, value: &ValueSpec) -> Vec<u8> {
    let mut out = Vec::new();
    match value {
        ValueSpec::Int(v) => {
            out.push(b'I');
            out.extend_from_slice(&cp.integer(*v).to_be_bytes());
        }
        ValueSpec::Boolean(v) => {
            out.push(b'Z');
            out.extend_from_slice(&cp.integer(i32::from(*v)).to_be_bytes());
        }
        ValueSpec::Double(v) => {
            out.push(b'D');
            out.extend_from_slice(&cp.double(*v).to_be_bytes());
        }
        ValueSpec::Str(v) => {
            out.push(b's');
            out.extend_from_slice(&cp.utf8(v).to_be_bytes());
        }
        ValueSpec::Enum {
            descriptor,
            constant,
        } => {
            out.push(b'e');
            out.extend_from_slice(&cp.utf8(descriptor).to_be_bytes());
            out.extend_from_slice(&cp.utf8(constant).to_be_bytes());
        }
        ValueSpec::Class(descriptor) => {
            out.push(b'c');
            out.extend_from_slice(&cp.utf8(descriptor).to_be_bytes());
        }
        ValueSpec::Nested(annotation) => {
            out.push(b'@');
            out.extend_from_slice(&encode_annotation(cp, annotation));
        }
        ValueSpec::Array(values) => {
            out.push(b'[');
            out.extend_from_slice(&(values.len() as u16).to_be_bytes());
            for v in values {
                out.extend_from_slice(&encode_element_value(cp, v));
            }
        }
    }
    out
}

fn encode_type_annotation_list(cp: &mut CpBuilder, annotations: &[TypeAnnotationSpec]) -> Vec<u8> {
    let mut payload = (annotations.len() as u16).to_be_bytes().to_vec();
    for annotation in annotations {
        payload.extend_from_slice(&encode_type_annotation(cp, annotation));
    }
    payload
}

fn encode_type_annotation(cp: &mut CpBuilder, spec: &TypeAnnotationSpec) -> Vec<u8> {
    let mut out = Vec::new();
    match spec.target {
        TargetSpec::ClassTypeParameter(index) => {
            out.push(0x00);
            out.push(index);
        }
        TargetSpec::MethodTypeParameter(index) => {
            out.push(0x01);
            out.push(index);
        }
        TargetSpec::ClassExtends(index) => {
            out.push(0x10);
            out.extend_from_slice(&index.to_be_bytes());
        }
        TargetSpec::ClassTypeParameterBound(parameter, bound) => {
            out.push(0x11);
            out.push(parameter);
            out.push(bound);
        }
        TargetSpec::MethodTypeParameterBound(parameter, bound) => {
            out.push(0x12);
            out.push(parameter);
            out.push(bound);
        }
        TargetSpec::Field => out.push(0x13),
        TargetSpec::Return => out.push(0x14),
        TargetSpec::Receiver => out.push(0x15),
        TargetSpec::FormalParameter(index) => {
            out.push(0x16);
            out.push(index);
        }
        TargetSpec::Throws(index) => {
            out.push(0x17);
            out.extend_from_slice(&index.to_be_bytes());
        }
    }
    out.push(spec.path.len() as u8);
    for step in &spec.path {
        match step {
            PathStepSpec::Array => {
                out.push(0);
                out.push(0);
            }
            PathStepSpec::Nested => {
                out.push(1);
                out.push(0);
            }
            PathStepSpec::Wildcard => {
                out.push(2);
                out.push(0);
            }
            PathStepSpec::TypeArgument(index) => {
                out.push(3);
                out.push(*index);
            }
        }
    }
    out.extend_from_slice(&encode_annotation(cp, &spec.annotation));
    out
}

fn encode_code_with_locals(cp: &mut CpBuilder, locals: &[(u16, String, String)]) -> Vec<u8> {
    let mut lvt = (locals.len() as u16).to_be_bytes().to_vec();
    for (slot, name, descriptor) in locals {
        lvt.extend_from_slice(&0u16.to_be_bytes()); // start_pc
        lvt.extend_from_slice(&1u16.to_be_bytes()); // length
        lvt.extend_from_slice(&cp.utf8(name).to_be_bytes());
        lvt.extend_from_slice(&cp.utf8(descriptor).to_be_bytes());
        lvt.extend_from_slice(&slot.to_be_bytes());
    }
    let lvt_name = cp.utf8("LocalVariableTable");

    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_be_bytes()); // max_stack
    out.extend_from_slice(&16u16.to_be_bytes()); // max_locals
    out.extend_from_slice(&1u32.to_be_bytes()); // code_length
    out.push(0xB1); // return
    out.extend_from_slice(&0u16.to_be_bytes()); // exception_table_length
    out.extend_from_slice(&1u16.to_be_bytes()); // attributes_count
    out.extend_from_slice(&lvt_name.to_be_bytes());
    out.extend_from_slice(&(lvt.len() as u32).to_be_bytes());
    out.extend_from_slice(&lvt);
    out
}

fn encode_module(cp: &mut CpBuilder, module: &ModuleSpec) -> Vec<u8> {
    let mut out = Vec::new();
    let name_index = cp.module(&module.name);
    out.extend_from_slice(&name_index.to_be_bytes());
    out.extend_from_slice(&module.flags.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // version

    out.extend_from_slice(&(module.requires.len() as u16).to_be_bytes());
    for (name, flags) in &module.requires {
        let index = cp.module(name);
        out.extend_from_slice(&index.to_be_bytes());
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // version
    }

    out.extend_from_slice(&(module.exports.len() as u16).to_be_bytes());
    for (package, to) in &module.exports {
        let index = cp.package(package);
        out.extend_from_slice(&index.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // flags
        out.extend_from_slice(&(to.len() as u16).to_be_bytes());
        for target in to {
            let index = cp.module(target);
            out.extend_from_slice(&index.to_be_bytes());
        }
    }

    out.extend_from_slice(&0u16.to_be_bytes()); // opens

    out.extend_from_slice(&(module.uses.len() as u16).to_be_bytes());
    for service in &module.uses {
        let index = cp.class(service);
        out.extend_from_slice(&index.to_be_bytes());
    }

    out.extend_from_slice(&(module.provides.len() as u16).to_be_bytes());
    for (service, implementations) in &module.provides {
        let index = cp.class(service);
        out.extend_from_slice(&index.to_be_bytes());
        out.extend_from_slice(&(implementations.len() as u16).to_be_bytes());
        for implementation in implementations {
            let index = cp.class(implementation);
            out.extend_from_slice(&index.to_be_bytes());
        }
    }
    out
}
