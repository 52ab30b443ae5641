use quarry_core::DotName;

use crate::store::TypeStore;
use crate::types::{ArrayType, ClassType, PrimitiveKind, PrimitiveType, Type, VoidType};

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid descriptor: {descriptor}")]
pub struct DescriptorError {
    pub descriptor: String,
}

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<Type>,
    pub return_type: Type,
}

/// Parse a field descriptor (`I`, `[[Ljava/lang/String;`, …) into a type.
pub fn parse_field_descriptor(desc: &str, store: &mut TypeStore) -> Result<Type, DescriptorError> {
    let (ty, rest) = parse_type(desc, desc, store)?;
    if !rest.is_empty() {
        return Err(invalid(desc));
    }
    Ok(ty)
}

/// Parse a method descriptor (`(ILjava/lang/String;)[I`) into parameter and
/// return types.
pub fn parse_method_descriptor(
    desc: &str,
    store: &mut TypeStore,
) -> Result<MethodDescriptor, DescriptorError> {
    let rest = desc.strip_prefix('(').ok_or_else(|| invalid(desc))?;

    let mut parameters = Vec::new();
    let mut remaining = rest;
    loop {
        let Some(next) = remaining.as_bytes().first() else {
            return Err(invalid(desc));
        };
        if *next == b')' {
            remaining = &remaining[1..];
            break;
        }
        let (param, rest) = parse_type(remaining, desc, store)?;
        parameters.push(param);
        remaining = rest;
    }

    let (return_type, rest) = if let Some(rest) = remaining.strip_prefix('V') {
        (VoidType::new(vec![]).into(), rest)
    } else {
        parse_type(remaining, desc, store)?
    };
    if !rest.is_empty() {
        return Err(invalid(desc));
    }

    Ok(MethodDescriptor {
        parameters,
        return_type,
    })
}

fn parse_type<'a>(
    input: &'a str,
    whole: &str,
    store: &mut TypeStore,
) -> Result<(Type, &'a str), DescriptorError> {
    let bytes = input.as_bytes();
    let Some(&first) = bytes.first() else {
        return Err(invalid(whole));
    };

    if let Some(kind) = PrimitiveKind::from_descriptor(first) {
        let ty = store.intern_type(PrimitiveType::new(kind, vec![]).into());
        return Ok((ty, &input[1..]));
    }

    match first {
        b'L' => {
            let end = input.find(';').ok_or_else(|| invalid(whole))?;
            if end == 1 {
                return Err(invalid(whole));
            }
            let name = store.names_mut().convert_internal(&input[1..end]);
            let ty = store.intern_type(ClassType::new(name, vec![]).into());
            Ok((ty, &input[end + 1..]))
        }
        b'[' => {
            let mut dimensions = 0u32;
            while bytes.get(dimensions as usize) == Some(&b'[') {
                dimensions += 1;
            }
            let (constituent, rest) = parse_type(&input[dimensions as usize..], whole, store)?;
            let ty = store.intern_type(ArrayType::new(constituent, dimensions, vec![]).into());
            Ok((ty, rest))
        }
        _ => Err(invalid(whole)),
    }
}

fn invalid(desc: &str) -> DescriptorError {
    DescriptorError {
        descriptor: desc.to_string(),
    }
}

/// Reconstruct the bytecode descriptor of a type, erasing generics.
///
/// `substitution` maps a type-variable identifier to a replacement type; use
/// `|_| None` for the no-op. Variables without a substitution collapse to
/// their erasure; an unresolved variable without one erases to
/// `java.lang.Object`.
pub fn to_descriptor<F>(ty: &Type, substitution: &F) -> String
where
    F: Fn(&str) -> Option<Type>,
{
    let mut out = String::new();
    write_descriptor(ty, substitution, &mut out);
    out
}

fn write_descriptor<F>(ty: &Type, substitution: &F, out: &mut String)
where
    F: Fn(&str) -> Option<Type>,
{
    match ty {
        Type::Primitive(t) => out.push(t.kind().descriptor()),
        Type::Void(_) => out.push('V'),
        Type::Class(t) => write_object_descriptor(t.name(), out),
        Type::Parameterized(t) => write_object_descriptor(t.name(), out),
        Type::Array(t) => {
            for _ in 0..t.dimensions() {
                out.push('[');
            }
            write_descriptor(t.constituent(), substitution, out);
        }
        Type::Wildcard(t) => write_descriptor(&t.extends_bound(), substitution, out),
        Type::TypeVariable(t) => match substitution(t.identifier()) {
            Some(sub) => write_descriptor(&sub, substitution, out),
            None => write_object_descriptor(&t.name(), out),
        },
        Type::UnresolvedTypeVariable(t) => match substitution(t.identifier()) {
            Some(sub) => write_descriptor(&sub, substitution, out),
            None => write_object_descriptor(&DotName::simple("java.lang.Object"), out),
        },
        Type::TypeVariableReference(t) => match substitution(t.identifier()) {
            Some(sub) => write_descriptor(&sub, substitution, out),
            None => write_object_descriptor(&t.follow().name(), out),
        },
    }
}

pub(crate) fn write_object_descriptor(name: &DotName, out: &mut String) {
    out.push('L');
    let dotted = name.to_string();
    for c in dotted.chars() {
        out.push(if c == '.' { '/' } else { c });
    }
    out.push(';');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeVariable;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_field_descriptor_primitives_and_arrays() {
        let mut store = TypeStore::new();
        let int = parse_field_descriptor("I", &mut store).unwrap();
        assert_eq!(int.as_primitive().unwrap().kind(), PrimitiveKind::Int);

        let strings = parse_field_descriptor("[[Ljava/lang/String;", &mut store).unwrap();
        let array = strings.as_array().unwrap();
        assert_eq!(array.dimensions(), 2);
        assert_eq!(
            array.constituent().name(),
            DotName::simple("java.lang.String")
        );
    }

    #[test]
    fn parse_method_descriptor_basic() {
        let mut store = TypeStore::new();
        let desc = parse_method_descriptor("(ILjava/lang/String;)[I", &mut store).unwrap();
        assert_eq!(desc.parameters.len(), 2);
        assert_eq!(
            desc.parameters[0].as_primitive().unwrap().kind(),
            PrimitiveKind::Int
        );
        assert_eq!(
            desc.parameters[1].name(),
            DotName::simple("java.lang.String")
        );
        let ret = desc.return_type.as_array().unwrap();
        assert_eq!(ret.dimensions(), 1);
        assert_eq!(
            ret.constituent().as_primitive().unwrap().kind(),
            PrimitiveKind::Int
        );
    }

    #[test]
    fn malformed_descriptors_are_rejected() {
        let mut store = TypeStore::new();
        for desc in ["", "X", "L;", "Ljava/lang/String", "II", "["] {
            assert!(parse_field_descriptor(desc, &mut store).is_err(), "{desc}");
        }
        assert!(parse_method_descriptor("(I", &mut store).is_err());
        assert!(parse_method_descriptor("(I)", &mut store).is_err());
        assert!(parse_method_descriptor("I)V", &mut store).is_err());
    }

    #[test]
    fn descriptor_round_trip() {
        let mut store = TypeStore::new();
        for desc in [
            "I",
            "Z",
            "[J",
            "Ljava/lang/String;",
            "[[Ljava/util/Map$Entry;",
        ] {
            let ty = parse_field_descriptor(desc, &mut store).unwrap();
            let reconstructed = to_descriptor(&ty, &|_| None);
            assert_eq!(reconstructed, desc);
            let reparsed = parse_field_descriptor(&reconstructed, &mut store).unwrap();
            assert_eq!(reparsed, ty);
        }
    }

    #[test]
    fn type_variables_erase_with_optional_substitution() {
        let mut store = TypeStore::new();
        let number = parse_field_descriptor("Ljava/lang/Number;", &mut store).unwrap();
        let t: Type = TypeVariable::new("T", vec![number], vec![]).into();
        assert_eq!(to_descriptor(&t, &|_| None), "Ljava/lang/Number;");

        let string = parse_field_descriptor("Ljava/lang/String;", &mut store).unwrap();
        let substituted = to_descriptor(&t, &|id| (id == "T").then(|| string.clone()));
        assert_eq!(substituted, "Ljava/lang/String;");
    }
}
