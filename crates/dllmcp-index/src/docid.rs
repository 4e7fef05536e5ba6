//! Documentation identifiers (`T:`, `M:`, `P:`, `F:`, `E:`).
//!
//! Pure string construction from structural descriptions. These are the keys
//! compilers write into sidecar documentation files, so every rule here
//! follows that convention:
//!
//! - a type being named keeps its arity marker (`T:Ns.Box`1`);
//! - a constructed generic argument drops it and lists its arguments
//!   (`Ns.Box{System.Int32}`), recursively;
//! - nested types are joined with `.`;
//! - generic parameters are positional (`` `0 `` for the type, ``` ``0 ```
//!   for the method);
//! - methods without parameters have no parentheses.

use dllmcp_core::DllMcpError;
use dllmcp_metadata::{TypeName, TypeSig};

/// Member kinds the walker can describe. Constructors are modelled so they
/// can be rejected explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Constructor,
    Property,
    Field,
    Event,
}

/// Everything the identifier of a member depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberShape<'a> {
    pub kind: MemberKind,
    pub name: &'a str,
    /// Number of method-level generic parameters.
    pub generic_arity: usize,
    /// Parameter types in declaration order (methods only).
    pub params: Vec<&'a TypeSig>,
    /// Return type; only consulted for conversion operators.
    pub return_type: Option<&'a TypeSig>,
}

impl<'a> MemberShape<'a> {
    pub fn new(kind: MemberKind, name: &'a str) -> Self {
        Self {
            kind,
            name,
            generic_arity: 0,
            params: Vec::new(),
            return_type: None,
        }
    }
}

/// `T:` identifier of a type definition.
pub fn type_id(definition: &TypeName) -> String {
    format!("T:{}", definition.qualified('.'))
}

/// `T:` identifier of an arbitrary type reference, e.g. a constructed
/// generic (`T:System.Collections.Generic.List{System.Int32}`).
pub fn type_reference_id(sig: &TypeSig) -> String {
    format!("T:{}", type_name(sig))
}

/// Identifier of a member declared on `declaring`.
pub fn member_id(declaring: &TypeName, member: &MemberShape<'_>) -> Result<String, DllMcpError> {
    let prefix = match member.kind {
        MemberKind::Method => 'M',
        MemberKind::Property => 'P',
        MemberKind::Field => 'F',
        MemberKind::Event => 'E',
        MemberKind::Constructor => {
            return Err(DllMcpError::UnsupportedEntityKind(format!(
                "constructor {} on {}",
                member.name,
                declaring.qualified('.')
            )))
        }
    };

    // Explicit interface implementations carry dots in their names.
    let mut id = format!(
        "{prefix}:{}.{}",
        declaring.qualified('.'),
        member.name.replace('.', "#")
    );

    if member.kind == MemberKind::Method {
        if member.generic_arity > 0 {
            id.push_str("``");
            id.push_str(&member.generic_arity.to_string());
        }
        if !member.params.is_empty() {
            id.push('(');
            push_joined(&mut id, member.params.iter().copied());
            id.push(')');
        }
        if is_conversion_operator(member.name) {
            if let Some(ret) = member.return_type {
                id.push('~');
                id.push_str(&type_name(ret));
            }
        }
    }

    Ok(id)
}

fn is_conversion_operator(name: &str) -> bool {
    name == "op_Implicit" || name == "op_Explicit"
}

/// Render a type as it appears in parameter lists and generic arguments.
pub fn type_name(sig: &TypeSig) -> String {
    let mut out = String::new();
    write_type(&mut out, sig);
    out
}

fn write_type(out: &mut String, sig: &TypeSig) {
    match sig {
        TypeSig::Named(name) => out.push_str(&name.qualified('.')),
        TypeSig::GenericInst { definition, args } => {
            let used = write_constructed(out, definition, args);
            // Arity markers that undercount the arguments: list the rest on
            // the innermost type rather than dropping them.
            if used < args.len() {
                out.push('{');
                push_joined(out, args[used..].iter());
                out.push('}');
            }
        }
        TypeSig::GenericParam(n) => {
            out.push('`');
            out.push_str(&n.to_string());
        }
        TypeSig::MethodGenericParam(n) => {
            out.push_str("``");
            out.push_str(&n.to_string());
        }
        TypeSig::SzArray(element) => {
            write_type(out, element);
            out.push_str("[]");
        }
        TypeSig::Array {
            element,
            rank,
            sizes,
            lower_bounds,
        } => {
            write_type(out, element);
            out.push('[');
            for dim in 0..*rank as usize {
                if dim > 0 {
                    out.push(',');
                }
                let lower = lower_bounds.get(dim).copied().unwrap_or(0);
                out.push_str(&lower.to_string());
                out.push(':');
                if let Some(size) = sizes.get(dim) {
                    out.push_str(&size.to_string());
                }
            }
            out.push(']');
        }
        TypeSig::ByRef(inner) => {
            write_type(out, inner);
            out.push('@');
        }
        TypeSig::Pointer(inner) => {
            write_type(out, inner);
            out.push('*');
        }
        TypeSig::FnPtr {
            return_type,
            params,
        } => {
            out.push_str("=FUNC:");
            write_type(out, return_type);
            out.push('(');
            push_joined(out, params.iter());
            out.push(')');
        }
    }
}

/// Write a constructed generic name, giving each nesting level the number
/// of arguments its own arity marker declares. Returns arguments consumed.
fn write_constructed(out: &mut String, name: &TypeName, args: &[TypeSig]) -> usize {
    let used = match &name.enclosing {
        Some(outer) => {
            let used = write_constructed(out, outer, args);
            out.push('.');
            used
        }
        None => {
            if !name.namespace.is_empty() {
                out.push_str(&name.namespace);
                out.push('.');
            }
            0
        }
    };

    let (base, arity) = split_arity(&name.name);
    out.push_str(base);
    let end = (used + arity).min(args.len());
    if end > used {
        out.push('{');
        push_joined(out, args[used..end].iter());
        out.push('}');
    }
    end
}

/// `List`1` -> (`List`, 1); names without a marker have arity 0.
pub fn split_arity(name: &str) -> (&str, usize) {
    match name.rsplit_once('`') {
        Some((base, digits)) if !base.is_empty() => match digits.parse() {
            Ok(arity) => (base, arity),
            Err(_) => (name, 0),
        },
        _ => (name, 0),
    }
}

fn push_joined<'s>(out: &mut String, sigs: impl Iterator<Item = &'s TypeSig>) {
    for (i, sig) in sigs.enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_type(out, sig);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> TypeSig {
        TypeSig::system("Int32")
    }

    fn string() -> TypeSig {
        TypeSig::system("String")
    }

    fn generic(namespace: &str, name: &str, args: Vec<TypeSig>) -> TypeSig {
        TypeSig::GenericInst {
            definition: TypeName::new(namespace, name),
            args,
        }
    }

    fn method<'a>(name: &'a str, params: &'a [TypeSig]) -> MemberShape<'a> {
        MemberShape {
            params: params.iter().collect(),
            ..MemberShape::new(MemberKind::Method, name)
        }
    }

    fn calculator() -> TypeName {
        TypeName::new("Test", "Calculator")
    }

    #[test]
    fn plain_type_and_method() {
        assert_eq!(type_id(&calculator()), "T:Test.Calculator");
        let params = [int(), int()];
        assert_eq!(
            member_id(&calculator(), &method("Add", &params)).unwrap(),
            "M:Test.Calculator.Add(System.Int32,System.Int32)"
        );
    }

    #[test]
    fn overloads_get_distinct_ids() {
        let none: [TypeSig; 0] = [];
        let one = [int()];
        let foo = member_id(&calculator(), &method("Foo", &none)).unwrap();
        let foo_int = member_id(&calculator(), &method("Foo", &one)).unwrap();
        assert_eq!(foo, "M:Test.Calculator.Foo");
        assert_eq!(foo_int, "M:Test.Calculator.Foo(System.Int32)");
        assert_ne!(foo, foo_int);
    }

    #[test]
    fn constructed_generics_render_with_braces() {
        let list = generic("System.Collections.Generic", "List`1", vec![int()]);
        assert_eq!(
            type_reference_id(&list),
            "T:System.Collections.Generic.List{System.Int32}"
        );

        let dict = generic(
            "System.Collections.Generic",
            "Dictionary`2",
            vec![string(), list.clone()],
        );
        let expected = "T:System.Collections.Generic.Dictionary{System.String,\
                        System.Collections.Generic.List{System.Int32}}";
        assert_eq!(type_reference_id(&dict), expected);
        // Stable across repeated computation.
        assert_eq!(type_reference_id(&dict), type_reference_id(&dict));
    }

    #[test]
    fn generic_rule_holds_for_any_arity() {
        for arity in 1..=4usize {
            let args: Vec<TypeSig> = (0..arity)
                .map(|i| if i % 2 == 0 { int() } else { string() })
                .collect();
            let sig = generic("Ns", &format!("Tuple`{arity}"), args.clone());
            let suffixes: Vec<String> = args.iter().map(type_name).collect();
            assert_eq!(
                type_reference_id(&sig),
                format!("T:Ns.Tuple{{{}}}", suffixes.join(","))
            );
        }
    }

    #[test]
    fn nested_constructed_generics_split_arguments_per_level() {
        let outer = TypeName::new("Ns", "Outer`1");
        let inner = TypeName::nested(outer, "Inner`1");
        let sig = TypeSig::GenericInst {
            definition: inner,
            args: vec![int(), string()],
        };
        assert_eq!(type_name(&sig), "Ns.Outer{System.Int32}.Inner{System.String}");
    }

    #[test]
    fn generic_definitions_keep_arity_and_use_positional_params() {
        let boxed = TypeName::new("Ns", "Box`1");
        assert_eq!(type_id(&boxed), "T:Ns.Box`1");

        let params = [TypeSig::GenericParam(0)];
        assert_eq!(
            member_id(&boxed, &method("Put", &params)).unwrap(),
            "M:Ns.Box`1.Put(`0)"
        );

        let params = [TypeSig::MethodGenericParam(0)];
        let map = MemberShape {
            generic_arity: 1,
            ..method("Map", &params)
        };
        assert_eq!(
            member_id(&TypeName::new("Ns", "C"), &map).unwrap(),
            "M:Ns.C.Map``1(``0)"
        );
    }

    #[test]
    fn nested_type_ids_use_dots() {
        let inner = TypeName::nested(TypeName::new("Ns", "Outer"), "Inner");
        assert_eq!(type_id(&inner), "T:Ns.Outer.Inner");
        assert_eq!(
            member_id(&inner, &MemberShape::new(MemberKind::Field, "Count")).unwrap(),
            "F:Ns.Outer.Inner.Count"
        );
    }

    #[test]
    fn arrays_byref_and_pointers() {
        let params = [
            TypeSig::SzArray(Box::new(int())),
            TypeSig::Array {
                element: Box::new(int()),
                rank: 2,
                sizes: vec![],
                lower_bounds: vec![],
            },
            TypeSig::ByRef(Box::new(int())),
            TypeSig::Pointer(Box::new(TypeSig::system("Byte"))),
        ];
        assert_eq!(
            member_id(&calculator(), &method("Fill", &params)).unwrap(),
            "M:Test.Calculator.Fill(System.Int32[],System.Int32[0:,0:],System.Int32@,System.Byte*)"
        );
    }

    #[test]
    fn conversion_operators_carry_return_type() {
        let money = TypeName::new("Ns", "Money");
        let params = [TypeSig::Named(money.clone())];
        let decimal = TypeSig::system("Decimal");
        let double = TypeSig::system("Double");

        let to_decimal = MemberShape {
            return_type: Some(&decimal),
            ..method("op_Implicit", &params)
        };
        let to_double = MemberShape {
            return_type: Some(&double),
            ..method("op_Implicit", &params)
        };
        let a = member_id(&money, &to_decimal).unwrap();
        let b = member_id(&money, &to_double).unwrap();
        assert_eq!(a, "M:Ns.Money.op_Implicit(Ns.Money)~System.Decimal");
        assert_ne!(a, b);

        // Other operators ignore the return type.
        let add = MemberShape {
            return_type: Some(&decimal),
            ..method("op_Addition", &params)
        };
        assert_eq!(
            member_id(&money, &add).unwrap(),
            "M:Ns.Money.op_Addition(Ns.Money)"
        );
    }

    #[test]
    fn property_field_event_prefixes() {
        let ty = calculator();
        let indexer_params = [int()];
        let indexer = MemberShape {
            params: indexer_params.iter().collect(),
            ..MemberShape::new(MemberKind::Property, "Item")
        };
        assert_eq!(member_id(&ty, &indexer).unwrap(), "P:Test.Calculator.Item");
        assert_eq!(
            member_id(&ty, &MemberShape::new(MemberKind::Field, "Max")).unwrap(),
            "F:Test.Calculator.Max"
        );
        assert_eq!(
            member_id(&ty, &MemberShape::new(MemberKind::Event, "Changed")).unwrap(),
            "E:Test.Calculator.Changed"
        );
    }

    #[test]
    fn constructors_are_unsupported() {
        let err = member_id(&calculator(), &MemberShape::new(MemberKind::Constructor, ".ctor"))
            .unwrap_err();
        assert!(matches!(err, DllMcpError::UnsupportedEntityKind(_)));
    }

    #[test]
    fn explicit_interface_names_use_hash() {
        let none: [TypeSig; 0] = [];
        assert_eq!(
            member_id(&calculator(), &method("System.IDisposable.Dispose", &none)).unwrap(),
            "M:Test.Calculator.System#IDisposable#Dispose"
        );
    }

    #[test]
    fn arity_marker_parsing() {
        assert_eq!(split_arity("List`1"), ("List", 1));
        assert_eq!(split_arity("Calculator"), ("Calculator", 0));
        assert_eq!(split_arity("Odd`x"), ("Odd`x", 0));
    }
}
