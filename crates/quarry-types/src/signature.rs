use std::collections::HashMap;
use std::sync::Arc;

use crate::store::TypeStore;
use crate::types::{
    ArrayType, ClassType, PrimitiveKind, PrimitiveType, Type, TypeVariable,
    TypeVariableReference, UnresolvedTypeVariable, VoidType, WildcardType,
};

/// A grammar violation in a `Signature` attribute. Fatal for the one
/// signature being parsed; the caller decides whether to skip the class or
/// abort the run.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed signature at offset {offset}: {signature}")]
pub struct SignatureError {
    pub signature: String,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct ClassSignature {
    /// The class's type parameters, each a [`Type::TypeVariable`].
    pub type_parameters: Vec<Type>,
    pub super_class: Type,
    pub interfaces: Vec<Type>,
}

#[derive(Debug, Clone)]
pub struct MethodSignature {
    pub type_parameters: Vec<Type>,
    pub parameters: Vec<Type>,
    pub return_type: Type,
    pub throws: Vec<Type>,
}

/// Type variables visible from an enclosing declaration — the class-level
/// scope when parsing a member signature.
#[derive(Clone, Default)]
pub struct TypeParameterScope {
    variables: HashMap<Arc<str>, TypeVariable>,
}

impl TypeParameterScope {
    pub fn new() -> TypeParameterScope {
        TypeParameterScope::default()
    }

    pub fn insert(&mut self, variable: TypeVariable) {
        self.variables.insert(variable.identifier_arc(), variable);
    }

    pub fn get(&self, identifier: &str) -> Option<&TypeVariable> {
        self.variables.get(identifier)
    }

    /// Build a scope from a parsed type-parameter list
    /// (e.g. [`ClassSignature::type_parameters`]).
    pub fn of_type_parameters(parameters: &[Type]) -> TypeParameterScope {
        let mut scope = TypeParameterScope::new();
        for parameter in parameters {
            if let Type::TypeVariable(variable) = parameter {
                scope.insert(variable.clone());
            }
        }
        scope
    }
}

/// Parse a `ClassSignature`:
/// `[TypeParameters] SuperclassSignature {SuperinterfaceSignature}`.
pub fn parse_class_signature(
    signature: &str,
    scope: &TypeParameterScope,
    store: &mut TypeStore,
) -> Result<ClassSignature, SignatureError> {
    let mut parser = SignatureParser::new(signature, scope, store);
    let type_parameters = parser.parse_optional_type_parameters()?;
    let super_class = parser.parse_class_type_signature()?;
    let mut interfaces = Vec::new();
    while !parser.at_end() {
        interfaces.push(parser.parse_class_type_signature()?);
    }
    Ok(ClassSignature {
        type_parameters,
        super_class,
        interfaces,
    })
}

/// Parse a `MethodSignature`:
/// `[TypeParameters] '(' {JavaTypeSignature} ')' Result {ThrowsSignature}`.
pub fn parse_method_signature(
    signature: &str,
    scope: &TypeParameterScope,
    store: &mut TypeStore,
) -> Result<MethodSignature, SignatureError> {
    let mut parser = SignatureParser::new(signature, scope, store);
    let type_parameters = parser.parse_optional_type_parameters()?;

    parser.expect(b'(')?;
    let mut parameters = Vec::new();
    while parser.peek() != Some(b')') {
        parameters.push(parser.parse_java_type()?);
    }
    parser.expect(b')')?;

    let return_type = if parser.peek() == Some(b'V') {
        parser.advance();
        parser.store.intern_type(VoidType::new(vec![]).into())
    } else {
        parser.parse_java_type()?
    };

    let mut throws = Vec::new();
    while parser.peek() == Some(b'^') {
        parser.advance();
        // ThrowsSignature is a class type or a type variable; the grammar
        // admits nothing else, so no extra validation here.
        let thrown = match parser.peek() {
            Some(b'T') => parser.parse_type_variable_use()?,
            _ => parser.parse_class_type_signature()?,
        };
        throws.push(thrown);
    }
    parser.expect_end()?;

    Ok(MethodSignature {
        type_parameters,
        parameters,
        return_type,
        throws,
    })
}

/// Parse a field signature. A lone `JavaTypeSignature`; primitive
/// descriptors are accepted here even though the formal grammar restricts
/// field signatures to reference types — relaxed encoders emit them.
pub fn parse_field_signature(
    signature: &str,
    scope: &TypeParameterScope,
    store: &mut TypeStore,
) -> Result<Type, SignatureError> {
    let mut parser = SignatureParser::new(signature, scope, store);
    let ty = parser.parse_java_type()?;
    parser.expect_end()?;
    Ok(ty)
}

/// One type-parameter slot of the list currently being parsed. The
/// identifier is registered before the bounds are parsed, so a bound can
/// refer to its own variable (F-bounded polymorphism); `variable` stays
/// empty while the bounds are in progress.
struct Slot {
    identifier: Arc<str>,
    variable: Option<TypeVariable>,
    /// The variable's bounds mention no unresolved identifiers and no
    /// unpatched references; such a variable is final and may be linked
    /// directly instead of through a reference.
    complete: bool,
}

struct SignatureParser<'a, 's> {
    input: &'a str,
    pos: usize,
    outer: &'a TypeParameterScope,
    store: &'s mut TypeStore,
    slots: Vec<Slot>,
    unpatched: Vec<TypeVariableReference>,
}

impl<'a, 's> SignatureParser<'a, 's> {
    fn new(
        input: &'a str,
        outer: &'a TypeParameterScope,
        store: &'s mut TypeStore,
    ) -> SignatureParser<'a, 's> {
        SignatureParser {
            input,
            pos: 0,
            outer,
            store,
            slots: Vec::new(),
            unpatched: Vec::new(),
        }
    }

    fn error(&self) -> SignatureError {
        SignatureError {
            signature: self.input.to_string(),
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, byte: u8) -> Result<(), SignatureError> {
        if self.peek() == Some(byte) {
            self.advance();
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect_end(&self) -> Result<(), SignatureError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    /// Read an identifier: anything up to a delimiter byte. Must be
    /// non-empty.
    fn parse_identifier(&mut self) -> Result<&'a str, SignatureError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            match b {
                b'.' | b';' | b'[' | b'/' | b'<' | b'>' | b':' => break,
                _ => self.advance(),
            }
        }
        if self.pos == start {
            return Err(self.error());
        }
        Ok(&self.input[start..self.pos])
    }

    // -------------------------------------------------------------------------
    // Type parameters: collect, resolve, patch
    // -------------------------------------------------------------------------

    fn parse_optional_type_parameters(&mut self) -> Result<Vec<Type>, SignatureError> {
        if self.peek() != Some(b'<') {
            return Ok(Vec::new());
        }
        self.advance();
        while self.peek() != Some(b'>') {
            if self.at_end() {
                return Err(self.error());
            }
            self.parse_type_parameter()?;
        }
        self.advance();
        if self.slots.is_empty() {
            return Err(self.error());
        }

        self.resolve_forward_references();
        self.patch_references();

        // The list is final: later uses of these identifiers (parameters,
        // return type, throws clause) link to the variables directly.
        for slot in &mut self.slots {
            slot.complete = true;
        }

        Ok(self
            .slots
            .iter()
            .map(|slot| {
                Type::TypeVariable(slot.variable.clone().expect("slot resolved after list parse"))
            })
            .collect())
    }

    fn parse_type_parameter(&mut self) -> Result<(), SignatureError> {
        let identifier = self.parse_identifier()?;
        let identifier = self.store.names_mut().intern_str(identifier);

        // Register the identifier before its bounds are parsed: a bound may
        // refer to the variable being declared (`T extends Comparable<T>`).
        let slot_index = self.slots.len();
        self.slots.push(Slot {
            identifier: Arc::clone(&identifier),
            variable: None,
            complete: false,
        });

        self.expect(b':')?;
        let mut bounds = Vec::new();
        let mut interface_bound_only = false;
        match self.peek() {
            Some(b'L') | Some(b'T') | Some(b'[') => bounds.push(self.parse_reference_type()?),
            Some(b':') => interface_bound_only = true,
            _ => {}
        }
        while self.peek() == Some(b':') {
            self.advance();
            bounds.push(self.parse_reference_type()?);
        }

        let complete = bounds.iter().all(is_fully_resolved);
        let variable = TypeVariable::with_flags(identifier, bounds, vec![], interface_bound_only);
        let slot = &mut self.slots[slot_index];
        slot.variable = Some(variable);
        slot.complete = complete;
        Ok(())
    }

    /// Resolution pass: every unresolved placeholder whose identifier turns
    /// out to belong to this list (a forward reference) becomes a reference
    /// to be patched; one naming an enclosing declaration's variable links
    /// to it directly. Anything else stays unresolved — the declaring class
    /// is simply not on the decoding classpath.
    fn resolve_forward_references(&mut self) {
        for index in 0..self.slots.len() {
            let variable = self.slots[index]
                .variable
                .clone()
                .expect("slot parsed before resolution");
            let mut changed = false;
            let bounds: Vec<Type> = variable
                .bounds()
                .iter()
                .map(|bound| self.resolve(bound, &mut changed))
                .collect();
            if changed {
                self.slots[index].variable = Some(variable.with_bounds(bounds));
            }
        }
    }

    fn resolve(&mut self, ty: &Type, changed: &mut bool) -> Type {
        match ty {
            Type::UnresolvedTypeVariable(unresolved) => {
                let identifier = unresolved.identifier();
                if self
                    .slots
                    .iter()
                    .any(|slot| &*slot.identifier == identifier)
                {
                    *changed = true;
                    let reference = TypeVariableReference::new(
                        unresolved.identifier_arc(),
                        ty.annotations().to_vec(),
                    );
                    self.unpatched.push(reference.clone());
                    Type::TypeVariableReference(reference)
                } else if let Some(variable) = self.outer.get(identifier) {
                    *changed = true;
                    Type::TypeVariable(variable.clone())
                } else {
                    ty.clone()
                }
            }
            Type::Parameterized(parameterized) => {
                let mut local = false;
                let arguments: Vec<Type> = parameterized
                    .arguments()
                    .iter()
                    .map(|arg| self.resolve(arg, &mut local))
                    .collect();
                let owner = parameterized.owner().map(|o| self.resolve(o, &mut local));
                if local {
                    *changed = true;
                    crate::types::ParameterizedType::new(
                        parameterized.name().clone(),
                        arguments,
                        owner,
                        ty.annotations().to_vec(),
                    )
                    .into()
                } else {
                    ty.clone()
                }
            }
            Type::Array(array) => {
                let mut local = false;
                let constituent = self.resolve(array.constituent(), &mut local);
                if local {
                    *changed = true;
                    ArrayType::new(constituent, array.dimensions(), ty.annotations().to_vec())
                        .into()
                } else {
                    ty.clone()
                }
            }
            Type::Wildcard(wildcard) => {
                let mut local = false;
                let bound = wildcard.bound().map(|b| self.resolve(b, &mut local));
                if local {
                    *changed = true;
                    WildcardType::new(wildcard.is_extends(), bound, ty.annotations().to_vec())
                        .into()
                } else {
                    ty.clone()
                }
            }
            _ => ty.clone(),
        }
    }

    /// Patch pass: runs only after every variable of the list is resolved,
    /// because a reference created early may point at a variable declared
    /// later in the same list (mutual recursion).
    fn patch_references(&mut self) {
        for reference in self.unpatched.drain(..) {
            let target = self
                .slots
                .iter()
                .find(|slot| &*slot.identifier == reference.identifier())
                .and_then(|slot| slot.variable.clone())
                .expect("reference created only for identifiers in this list");
            reference.patch(target);
        }
    }

    // -------------------------------------------------------------------------
    // Type grammar
    // -------------------------------------------------------------------------

    /// `JavaTypeSignature`: a reference type or a primitive descriptor.
    fn parse_java_type(&mut self) -> Result<Type, SignatureError> {
        match self.peek() {
            Some(b'L') | Some(b'T') | Some(b'[') => self.parse_reference_type(),
            Some(b) => {
                if let Some(kind) = PrimitiveKind::from_descriptor(b) {
                    self.advance();
                    Ok(self.store.intern_type(PrimitiveType::new(kind, vec![]).into()))
                } else {
                    Err(self.error())
                }
            }
            None => Err(self.error()),
        }
    }

    fn parse_reference_type(&mut self) -> Result<Type, SignatureError> {
        match self.peek() {
            Some(b'L') => self.parse_class_type_signature(),
            Some(b'T') => self.parse_type_variable_use(),
            Some(b'[') => self.parse_array_type(),
            _ => Err(self.error()),
        }
    }

    fn parse_array_type(&mut self) -> Result<Type, SignatureError> {
        let mut dimensions = 0u32;
        while self.peek() == Some(b'[') {
            self.advance();
            dimensions += 1;
        }
        // Dimensions compress into a single count; per-dimension annotations
        // split the array later if the class file carries any.
        let constituent = self.parse_java_type()?;
        Ok(self
            .store
            .intern_type(ArrayType::new(constituent, dimensions, vec![]).into()))
    }

    /// `T<identifier>;` — a use of a type variable.
    ///
    /// An identifier belonging to the list currently being parsed resolves
    /// to the finished variable when it is already complete, and to an
    /// unpatched [`TypeVariableReference`] when the variable is still in
    /// progress (self reference) or not yet final. An identifier from an
    /// enclosing scope links directly; anything else is unresolved.
    fn parse_type_variable_use(&mut self) -> Result<Type, SignatureError> {
        self.expect(b'T')?;
        let identifier = self.parse_identifier()?;
        self.expect(b';')?;

        let ty = if let Some(index) = self
            .slots
            .iter()
            .position(|slot| &*slot.identifier == identifier)
        {
            let slot = &self.slots[index];
            if slot.complete {
                Type::TypeVariable(slot.variable.clone().expect("complete slot has a variable"))
            } else {
                let identifier = Arc::clone(&self.slots[index].identifier);
                let reference = TypeVariableReference::new(identifier, vec![]);
                self.unpatched.push(reference.clone());
                Type::TypeVariableReference(reference)
            }
        } else if let Some(variable) = self.outer.get(identifier) {
            Type::TypeVariable(variable.clone())
        } else {
            let identifier = self.store.names_mut().intern_str(identifier);
            Type::UnresolvedTypeVariable(UnresolvedTypeVariable::new(identifier, vec![]))
        };
        Ok(self.store.intern_type(ty))
    }

    /// `L package/Name <args> ( . Suffix <args> )* ;`
    fn parse_class_type_signature(&mut self) -> Result<Type, SignatureError> {
        self.expect(b'L')?;

        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'<' || b == b';' || b == b'.' {
                break;
            }
            self.advance();
        }
        if self.pos == start {
            return Err(self.error());
        }
        let mut name = self
            .store
            .names_mut()
            .convert_internal(&self.input[start..self.pos]);

        let mut current: Type = if self.peek() == Some(b'<') {
            let arguments = self.parse_type_arguments()?;
            crate::types::ParameterizedType::new(name.clone(), arguments, None, vec![]).into()
        } else {
            ClassType::new(name.clone(), vec![]).into()
        };

        // Nested suffixes: each names an inner class of the previous type and
        // reuses its qualified-name prefix chain. An enclosing type is kept
        // as the owner only when it carries type arguments of its own.
        while self.peek() == Some(b'.') {
            self.advance();
            let suffix = self.parse_identifier()?;
            name = self.store.names_mut().extend_name(&name, suffix, true);

            if self.peek() == Some(b'<') {
                let arguments = self.parse_type_arguments()?;
                let owner = match &current {
                    Type::Class(_) => None,
                    other => Some(other.clone()),
                };
                current =
                    crate::types::ParameterizedType::new(name.clone(), arguments, owner, vec![])
                        .into();
            } else {
                current = match &current {
                    Type::Class(_) => ClassType::new(name.clone(), vec![]).into(),
                    other => crate::types::ParameterizedType::new(
                        name.clone(),
                        vec![],
                        Some(other.clone()),
                        vec![],
                    )
                    .into(),
                };
            }
        }

        self.expect(b';')?;
        Ok(self.store.intern_type(current))
    }

    fn parse_type_arguments(&mut self) -> Result<Vec<Type>, SignatureError> {
        self.expect(b'<')?;
        let mut arguments = Vec::new();
        loop {
            match self.peek() {
                Some(b'>') => {
                    self.advance();
                    break;
                }
                Some(b'*') => {
                    self.advance();
                    arguments.push(self.store.intern_type(WildcardType::unbounded().into()));
                }
                Some(b'+') => {
                    self.advance();
                    let bound = self.parse_reference_type()?;
                    arguments.push(
                        self.store
                            .intern_type(WildcardType::new(true, Some(bound), vec![]).into()),
                    );
                }
                Some(b'-') => {
                    self.advance();
                    let bound = self.parse_reference_type()?;
                    arguments.push(
                        self.store
                            .intern_type(WildcardType::new(false, Some(bound), vec![]).into()),
                    );
                }
                Some(_) => arguments.push(self.parse_reference_type()?),
                None => return Err(self.error()),
            }
        }
        if arguments.is_empty() {
            return Err(self.error());
        }
        Ok(arguments)
    }
}

fn is_fully_resolved(ty: &Type) -> bool {
    match ty {
        Type::UnresolvedTypeVariable(_) => false,
        Type::TypeVariableReference(reference) => reference.is_patched(),
        Type::Parameterized(parameterized) => {
            parameterized.arguments().iter().all(is_fully_resolved)
                && parameterized.owner().map_or(true, is_fully_resolved)
        }
        Type::Array(array) => is_fully_resolved(array.constituent()),
        Type::Wildcard(wildcard) => wildcard.bound().map_or(true, is_fully_resolved),
        Type::TypeVariable(variable) => variable.bounds().iter().all(is_fully_resolved),
        _ => true,
    }
}

// -----------------------------------------------------------------------------
// Reconstruction
// -----------------------------------------------------------------------------

/// Reconstruct the generic-signature form of a single type, applying
/// `substitution` to type variables (use `|_| None` for the no-op).
pub fn to_signature<F>(ty: &Type, substitution: &F) -> String
where
    F: Fn(&str) -> Option<Type>,
{
    let mut out = String::new();
    write_type(ty, substitution, &mut out);
    out
}

/// Reconstruct a field signature string.
pub fn field_signature_string<F>(ty: &Type, substitution: &F) -> String
where
    F: Fn(&str) -> Option<Type>,
{
    to_signature(ty, substitution)
}

/// Reconstruct a `ClassSignature` string from its parts.
pub fn class_signature_string<F>(
    type_parameters: &[Type],
    super_class: &Type,
    interfaces: &[Type],
    substitution: &F,
) -> String
where
    F: Fn(&str) -> Option<Type>,
{
    let mut out = String::new();
    write_type_parameters(type_parameters, substitution, &mut out);
    write_type(super_class, substitution, &mut out);
    for interface in interfaces {
        write_type(interface, substitution, &mut out);
    }
    out
}

/// Reconstruct a `MethodSignature` string from its parts.
pub fn method_signature_string<F>(
    type_parameters: &[Type],
    parameters: &[Type],
    return_type: &Type,
    throws: &[Type],
    substitution: &F,
) -> String
where
    F: Fn(&str) -> Option<Type>,
{
    let mut out = String::new();
    write_type_parameters(type_parameters, substitution, &mut out);
    out.push('(');
    for parameter in parameters {
        write_type(parameter, substitution, &mut out);
    }
    out.push(')');
    write_type(return_type, substitution, &mut out);
    for thrown in throws {
        out.push('^');
        write_type(thrown, substitution, &mut out);
    }
    out
}

fn write_type_parameters<F>(type_parameters: &[Type], substitution: &F, out: &mut String)
where
    F: Fn(&str) -> Option<Type>,
{
    if type_parameters.is_empty() {
        return;
    }
    out.push('<');
    for parameter in type_parameters {
        match parameter {
            Type::TypeVariable(variable) => {
                out.push_str(variable.identifier());
                out.push(':');
                let bounds = variable.bounds();
                if variable.interface_bound_only() {
                    for bound in bounds {
                        out.push(':');
                        write_type(bound, substitution, out);
                    }
                } else {
                    if let Some(first) = bounds.first() {
                        write_type(first, substitution, out);
                    }
                    for bound in bounds.iter().skip(1) {
                        out.push(':');
                        write_type(bound, substitution, out);
                    }
                }
            }
            other => panic!("type parameter list contains a non-variable: {other:?}"),
        }
    }
    out.push('>');
}

fn write_type<F>(ty: &Type, substitution: &F, out: &mut String)
where
    F: Fn(&str) -> Option<Type>,
{
    match ty {
        Type::Primitive(t) => out.push(t.kind().descriptor()),
        Type::Void(_) => out.push('V'),
        Type::Class(t) => {
            crate::descriptor::write_object_descriptor(t.name(), out);
        }
        Type::Array(t) => {
            for _ in 0..t.dimensions() {
                out.push('[');
            }
            write_type(t.constituent(), substitution, out);
        }
        Type::Parameterized(t) => {
            write_parameterized(t, substitution, out);
            out.push(';');
        }
        Type::Wildcard(t) => match (t.is_extends(), t.bound()) {
            (_, None) => out.push('*'),
            (true, Some(bound)) => {
                out.push('+');
                write_type(bound, substitution, out);
            }
            (false, Some(bound)) => {
                out.push('-');
                write_type(bound, substitution, out);
            }
        },
        Type::TypeVariable(t) => match substitution(t.identifier()) {
            Some(sub) => write_type(&sub, substitution, out),
            None => {
                out.push('T');
                out.push_str(t.identifier());
                out.push(';');
            }
        },
        Type::UnresolvedTypeVariable(t) => match substitution(t.identifier()) {
            Some(sub) => write_type(&sub, substitution, out),
            None => {
                out.push('T');
                out.push_str(t.identifier());
                out.push(';');
            }
        },
        Type::TypeVariableReference(t) => match substitution(t.identifier()) {
            Some(sub) => write_type(&sub, substitution, out),
            None => {
                out.push('T');
                out.push_str(t.identifier());
                out.push(';');
            }
        },
    }
}

/// Emit a parameterized type without the trailing `;`, recursing through the
/// owner chain so `Outer<T>.Inner<U>` renders as one suffixed signature.
fn write_parameterized<F>(
    t: &crate::types::ParameterizedType,
    substitution: &F,
    out: &mut String,
) where
    F: Fn(&str) -> Option<Type>,
{
    match t.owner() {
        Some(Type::Parameterized(owner)) => {
            write_parameterized(owner, substitution, out);
            out.push('.');
            out.push_str(t.name().local_name());
        }
        Some(owner) => {
            // Non-parameterized owner: emit it as a full object descriptor
            // minus the terminator, then the suffix.
            let mut owner_out = String::new();
            write_type(owner, substitution, &mut owner_out);
            debug_assert!(owner_out.ends_with(';'));
            owner_out.pop();
            out.push_str(&owner_out);
            out.push('.');
            out.push_str(t.name().local_name());
        }
        None => {
            out.push('L');
            let dotted = t.name().to_string();
            for c in dotted.chars() {
                out.push(if c == '.' { '/' } else { c });
            }
        }
    }
    if !t.arguments().is_empty() {
        out.push('<');
        for argument in t.arguments() {
            write_type(argument, substitution, out);
        }
        out.push('>');
    }
}
