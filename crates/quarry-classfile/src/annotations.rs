use quarry_core::DotName;
use quarry_types::{
    parse_field_descriptor, AnnotationInstance, AnnotationTarget, AnnotationValue,
    AnnotationValueKind, ArrayType, ClassType, Type, TypePosition, TypeStore, VoidType,
};

use crate::constant_pool::{ConstantPool, CpInfo};
use crate::error::{Error, Result};
use crate::reader::Reader;

/// An annotation parsed from the stream, before a target is assigned.
#[derive(Debug, Clone)]
pub(crate) struct RawAnnotation {
    pub(crate) name: DotName,
    pub(crate) values: Vec<AnnotationValue>,
}

impl RawAnnotation {
    pub(crate) fn into_instance(
        self,
        target: Option<AnnotationTarget>,
        visible: bool,
    ) -> AnnotationInstance {
        AnnotationInstance::new(self.name, self.values, target, visible)
    }
}

pub(crate) fn parse_annotation(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    store: &mut TypeStore,
    visible: bool,
) -> Result<RawAnnotation> {
    let type_index = reader.read_u2()?;
    let descriptor = cp.get_utf8(type_index)?;
    let name = annotation_type_name(descriptor, store)?;

    let num_pairs = reader.read_u2()? as usize;
    let mut values = Vec::with_capacity(num_pairs);
    for _ in 0..num_pairs {
        let name_index = reader.read_u2()?;
        let member = store.names_mut().intern_str(cp.get_utf8(name_index)?);
        let kind = parse_element_value(reader, cp, store, visible)?;
        values.push(AnnotationValue::new(member, kind));
    }

    Ok(RawAnnotation { name, values })
}

fn annotation_type_name(descriptor: &str, store: &mut TypeStore) -> Result<DotName> {
    let internal = descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .ok_or_else(|| Error::MalformedAttribute("RuntimeVisibleAnnotations"))?;
    Ok(store.names_mut().convert_internal(internal))
}

pub(crate) fn parse_element_value(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    store: &mut TypeStore,
    visible: bool,
) -> Result<AnnotationValueKind> {
    let tag = reader.read_u1()?;
    match tag {
        b'B' | b'C' | b'I' | b'S' | b'Z' => {
            let idx = reader.read_u2()?;
            let value = match cp.get(idx)? {
                CpInfo::Integer(v) => *v,
                other => {
                    return Err(Error::ConstantPoolTypeMismatch {
                        index: idx,
                        expected: "Integer",
                        found: other.kind(),
                    })
                }
            };
            Ok(match tag {
                b'B' => AnnotationValueKind::Byte(value as i8),
                b'C' => AnnotationValueKind::Char(
                    char::from_u32(value as u32)
                        .ok_or(Error::MalformedAttribute("RuntimeVisibleAnnotations"))?,
                ),
                b'S' => AnnotationValueKind::Short(value as i16),
                b'Z' => AnnotationValueKind::Boolean(value != 0),
                _ => AnnotationValueKind::Int(value),
            })
        }
        b'D' => {
            let idx = reader.read_u2()?;
            match cp.get(idx)? {
                CpInfo::Double(v) => Ok(AnnotationValueKind::Double(*v)),
                other => Err(Error::ConstantPoolTypeMismatch {
                    index: idx,
                    expected: "Double",
                    found: other.kind(),
                }),
            }
        }
        b'F' => {
            let idx = reader.read_u2()?;
            match cp.get(idx)? {
                CpInfo::Float(v) => Ok(AnnotationValueKind::Float(*v)),
                other => Err(Error::ConstantPoolTypeMismatch {
                    index: idx,
                    expected: "Float",
                    found: other.kind(),
                }),
            }
        }
        b'J' => {
            let idx = reader.read_u2()?;
            match cp.get(idx)? {
                CpInfo::Long(v) => Ok(AnnotationValueKind::Long(*v)),
                other => Err(Error::ConstantPoolTypeMismatch {
                    index: idx,
                    expected: "Long",
                    found: other.kind(),
                }),
            }
        }
        b's' => {
            let idx = reader.read_u2()?;
            let value = store.names_mut().intern_str(cp.get_utf8(idx)?);
            Ok(AnnotationValueKind::String(value))
        }
        b'e' => {
            let type_index = reader.read_u2()?;
            let const_index = reader.read_u2()?;
            let type_name = annotation_type_name(cp.get_utf8(type_index)?, store)?;
            let constant = store.names_mut().intern_str(cp.get_utf8(const_index)?);
            Ok(AnnotationValueKind::Enum {
                type_name,
                constant,
            })
        }
        b'c' => {
            let idx = reader.read_u2()?;
            let descriptor = cp.get_utf8(idx)?;
            let ty = if descriptor == "V" {
                store.intern_type(VoidType::new(vec![]).into())
            } else {
                parse_field_descriptor(descriptor, store)?
            };
            Ok(AnnotationValueKind::Class(ty))
        }
        b'@' => {
            let nested = parse_annotation(reader, cp, store, visible)?;
            Ok(AnnotationValueKind::Nested(nested.into_instance(None, visible)))
        }
        b'[' => {
            let num = reader.read_u2()? as usize;
            let mut values = Vec::with_capacity(num);
            for _ in 0..num {
                let kind = parse_element_value(reader, cp, store, visible)?;
                values.push(AnnotationValue::new("", kind));
            }
            Ok(AnnotationValueKind::Array(values.into_boxed_slice()))
        }
        _ => Err(Error::MalformedAttribute("RuntimeVisibleAnnotations")),
    }
}

// -----------------------------------------------------------------------------
// Type annotations
// -----------------------------------------------------------------------------

/// One step of a `type_path`, navigating into nested type structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathStep {
    /// Deeper into an array dimension.
    Array,
    /// Deeper into a nested (inner) type.
    Nested,
    /// Into the bound of a wildcard.
    WildcardBound,
    /// Into type argument `n` of a parameterized type.
    TypeArgument(u8),
}

/// A decoded `RuntimeVisible/InvisibleTypeAnnotations` entry, held until the
/// member's types are resolved and the annotation can be attached.
#[derive(Debug, Clone)]
pub(crate) struct TypeAnnotationRecord {
    pub(crate) position: TypePosition,
    pub(crate) path: Vec<PathStep>,
    pub(crate) annotation: RawAnnotation,
    pub(crate) visible: bool,
}

pub(crate) fn parse_type_annotation(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    store: &mut TypeStore,
    visible: bool,
) -> Result<TypeAnnotationRecord> {
    let target_type = reader.read_u1()?;
    let position = match target_type {
        0x00 | 0x01 => TypePosition::TypeParameter {
            index: reader.read_u1()?,
        },
        0x10 => TypePosition::ClassExtends {
            index: reader.read_u2()?,
        },
        0x11 | 0x12 => TypePosition::TypeParameterBound {
            parameter: reader.read_u1()?,
            bound: reader.read_u1()?,
        },
        0x13 | 0x14 => TypePosition::Empty,
        0x15 => TypePosition::Receiver,
        0x16 => TypePosition::MethodParameter {
            index: reader.read_u1()?,
        },
        0x17 => TypePosition::Throws {
            index: reader.read_u2()?,
        },
        _ => return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations")),
    };

    let path_length = reader.read_u1()? as usize;
    let mut path = Vec::with_capacity(path_length);
    for _ in 0..path_length {
        let kind = reader.read_u1()?;
        let argument_index = reader.read_u1()?;
        path.push(match kind {
            0 => PathStep::Array,
            1 => PathStep::Nested,
            2 => PathStep::WildcardBound,
            3 => PathStep::TypeArgument(argument_index),
            _ => return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations")),
        });
    }

    let annotation = parse_annotation(reader, cp, store, visible)?;
    Ok(TypeAnnotationRecord {
        position,
        path,
        annotation,
        visible,
    })
}

/// Attach `annotation` at the position `path` describes inside `ty`,
/// returning the rebuilt type. Types are immutable, so attachment rebuilds
/// every node from the annotated one back up to the root.
pub(crate) fn attach_type_annotation(
    ty: &Type,
    path: &[PathStep],
    annotation: AnnotationInstance,
) -> Result<Type> {
    // Nested (inner-class) navigation counts levels from the outermost type;
    // with no leading Nested steps the annotation belongs to the outermost
    // level of an owner chain.
    let nested = path.iter().take_while(|s| **s == PathStep::Nested).count();
    let rest = &path[nested..];

    let mut chain = owner_chain(ty);
    // Raw enclosing prefixes collapse into one name in this model, so a path
    // may count more levels than are materialized; clamp to what exists.
    let level = nested.min(chain.len() - 1);

    let mut rebuilt = attach_here(&chain[level], rest, annotation)?;
    for upper in chain.drain(..).skip(level + 1) {
        let Type::Parameterized(parameterized) = upper else {
            return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"));
        };
        rebuilt = parameterized.with_owner(Some(rebuilt)).into();
    }
    Ok(rebuilt)
}

/// The owner chain of a type, outermost first. A type without owners is a
/// one-element chain.
fn owner_chain(ty: &Type) -> Vec<Type> {
    let mut chain = Vec::new();
    collect_chain(ty, &mut chain);
    chain
}

fn collect_chain(ty: &Type, chain: &mut Vec<Type>) {
    if let Type::Parameterized(parameterized) = ty {
        if let Some(owner) = parameterized.owner() {
            collect_chain(owner, chain);
        }
    }
    chain.push(ty.clone());
}

fn attach_here(ty: &Type, path: &[PathStep], annotation: AnnotationInstance) -> Result<Type> {
    let Some(step) = path.first() else {
        return Ok(ty.with_added_annotation(annotation));
    };

    match step {
        PathStep::Array => {
            let steps = path.iter().take_while(|s| **s == PathStep::Array).count();
            let rest = &path[steps..];
            let Type::Array(array) = ty else {
                return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"));
            };
            let dims = array.dimensions() as usize;
            if steps < dims {
                // The annotation sits between this node's dimensions: split
                // the compressed count so the inner remainder can carry it.
                let inner: Type =
                    ArrayType::new(array.constituent().clone(), (dims - steps) as u32, vec![])
                        .into();
                let inner = attach_here(&inner, rest, annotation)?;
                Ok(ArrayType::new(inner, steps as u32, ty.annotations().to_vec()).into())
            } else if steps == dims {
                let constituent = attach_here(array.constituent(), rest, annotation)?;
                Ok(ArrayType::new(constituent, array.dimensions(), ty.annotations().to_vec())
                    .into())
            } else {
                // More array steps than this node holds: the constituent is
                // itself an array (already split); pass the surplus down.
                let constituent =
                    attach_here(array.constituent(), &path[dims..], annotation)?;
                Ok(ArrayType::new(constituent, array.dimensions(), ty.annotations().to_vec())
                    .into())
            }
        }
        PathStep::TypeArgument(index) => {
            let Type::Parameterized(parameterized) = ty else {
                return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"));
            };
            let index = *index as usize;
            let Some(argument) = parameterized.arguments().get(index) else {
                return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"));
            };
            let rebuilt = attach_here(argument, &path[1..], annotation)?;
            Ok(parameterized.with_argument(index, rebuilt).into())
        }
        PathStep::WildcardBound => {
            let Type::Wildcard(wildcard) = ty else {
                return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"));
            };
            // An unbounded wildcard materializes its implicit Object bound to
            // carry the annotation.
            let bound = wildcard
                .bound()
                .cloned()
                .unwrap_or_else(|| ClassType::new(DotName::simple("java.lang.Object"), vec![]).into());
            let rebuilt = attach_here(&bound, &path[1..], annotation)?;
            Ok(wildcard.with_bound(Some(rebuilt)).into())
        }
        PathStep::Nested => {
            // Leading Nested steps were consumed by `attach_type_annotation`;
            // any further Nested step inside the path would have to follow an
            // argument/bound, where a fresh owner chain applies.
            let nested = path.iter().take_while(|s| **s == PathStep::Nested).count();
            let chain = owner_chain(ty);
            let level = nested.min(chain.len() - 1);
            let mut rebuilt = attach_here(&chain[level], &path[nested..], annotation)?;
            for upper in chain.into_iter().skip(level + 1) {
                let Type::Parameterized(parameterized) = upper else {
                    return Err(Error::MalformedAttribute("RuntimeVisibleTypeAnnotations"));
                };
                rebuilt = parameterized.with_owner(Some(rebuilt)).into();
            }
            Ok(rebuilt)
        }
    }
}
