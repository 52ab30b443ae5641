#![forbid(unsafe_code)]

mod annotation;
mod descriptor;
mod signature;
mod store;
mod types;

pub use crate::annotation::{
    AnnotationInstance, AnnotationTarget, AnnotationValue, AnnotationValueKind, TypePosition,
};
pub use crate::descriptor::{
    parse_field_descriptor, parse_method_descriptor, to_descriptor, DescriptorError,
    MethodDescriptor,
};
pub use crate::signature::{
    class_signature_string, field_signature_string, method_signature_string,
    parse_class_signature, parse_field_signature, parse_method_signature, to_signature,
    ClassSignature, MethodSignature, SignatureError, TypeParameterScope,
};
pub use crate::store::{TypeIntern, TypeListIntern, TypeStore};
pub use crate::types::{
    ArrayType, ClassType, ParameterizedType, PrimitiveKind, PrimitiveType, Type, TypeKind,
    TypeVariable, TypeVariableReference, UnresolvedTypeVariable, VoidType, WildcardType,
};
