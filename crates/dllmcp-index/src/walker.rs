//! Entity walker: the exported types of a module and their declared
//! public members, in metadata order.

use crate::docid::{MemberKind, MemberShape};
use dllmcp_core::EntityKind;
use dllmcp_metadata::{
    EventDefinition, FieldDefinition, MemberAccess, MethodDefinition, ModuleModel,
    PropertyDefinition, TypeDefinition, TypeName, TypeSig, TypeVisibility,
};

/// An exported type, ready to be named and persisted.
#[derive(Debug, Clone)]
pub struct TypeDescriptor<'m> {
    pub definition: &'m TypeDefinition,
    /// Name chain used for identifiers (nested types link to their
    /// enclosing type).
    pub name: TypeName,
    pub kind: EntityKind,
    /// Reflection-style full name (`Ns.Outer+Inner`, `Ns.Box`1`).
    pub full_name: String,
    pub namespace: String,
    pub base_type: Option<String>,
    /// Display text, e.g. `class Test.Calculator : System.Object`.
    pub signature: String,
}

/// A declared public member of an exported type.
#[derive(Debug, Clone)]
pub struct MemberDescriptor<'m> {
    pub kind: EntityKind,
    pub name: &'m str,
    /// Display text, e.g. `Int32 Add(Int32 a, Int32 b)`.
    pub signature: String,
    /// Structural description for identifier generation.
    pub shape: MemberShape<'m>,
}

/// Walks one loaded module. The model is immutable, so every call to
/// [`EntityWalker::types`] restarts from the first type.
#[derive(Debug, Clone, Copy)]
pub struct EntityWalker<'m> {
    module: &'m ModuleModel,
}

impl<'m> EntityWalker<'m> {
    pub fn new(module: &'m ModuleModel) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &'m ModuleModel {
        self.module
    }

    /// Exported types in definition order.
    pub fn types(&self) -> impl Iterator<Item = TypeDescriptor<'m>> + '_ {
        self.module
            .types
            .iter()
            .enumerate()
            .filter(move |(index, _)| self.is_exported(*index))
            .map(move |(index, definition)| self.describe(index, definition))
    }

    /// Declared public members of `ty`: methods, then properties, fields
    /// and events, each in definition order.
    pub fn members(&self, ty: &TypeDescriptor<'m>) -> impl Iterator<Item = MemberDescriptor<'m>> {
        let def = ty.definition;

        let methods = def
            .methods
            .iter()
            .filter(move |m| include_method(def, m))
            .map(move |m| describe_method(def, m));
        let properties = def
            .properties
            .iter()
            .filter(|p| p.is_public)
            .map(move |p| describe_property(def, p));
        let fields = def
            .fields
            .iter()
            .filter(|f| f.access == MemberAccess::Public && !f.is_rt_special_name)
            .map(move |f| describe_field(def, f));
        let events = def
            .events
            .iter()
            .filter(|e| e.is_public)
            .map(move |e| describe_event(def, e));

        methods.chain(properties).chain(fields).chain(events)
    }

    /// Indexes from `index` outwards through its enclosing types. Stops at
    /// the first repeated index so a cyclic nesting table cannot loop.
    fn enclosing_chain(&self, index: usize) -> Vec<usize> {
        let mut chain = vec![index];
        let mut current = index;
        while let Some(outer) = self.module.types.get(current).and_then(|t| t.enclosing) {
            if chain.contains(&outer) {
                break;
            }
            chain.push(outer);
            current = outer;
        }
        chain
    }

    fn is_exported(&self, index: usize) -> bool {
        let chain = self.enclosing_chain(index);
        let Some(&outermost) = chain.last() else {
            return false;
        };
        let root = &self.module.types[outermost];
        if root.enclosing.is_some() || (root.namespace.is_empty() && root.name == "<Module>") {
            return false;
        }

        chain.iter().all(|&i| {
            let t = &self.module.types[i];
            match t.enclosing {
                None => t.visibility == TypeVisibility::Public,
                Some(_) => t.visibility == TypeVisibility::NestedPublic,
            }
        })
    }

    fn type_name(&self, index: usize) -> TypeName {
        let chain = self.enclosing_chain(index);
        let mut links = chain.iter().rev().map(|&i| &self.module.types[i]);
        let outer = links.next().unwrap_or(&self.module.types[index]);
        let mut name = TypeName::new(outer.namespace.clone(), outer.name.clone());
        for link in links {
            name = TypeName::nested(name, link.name.clone());
        }
        name
    }

    fn describe(&self, index: usize, definition: &'m TypeDefinition) -> TypeDescriptor<'m> {
        let name = self.type_name(index);
        let kind = classify(definition);
        let full_name = name.qualified('+');
        let base_type = definition
            .base
            .as_ref()
            .map(|base| full_type_name(base, &definition.generic_params));

        let mut signature = format!("{} {full_name}", kind.keyword());
        if let Some(base) = &base_type {
            signature.push_str(" : ");
            signature.push_str(base);
        }

        TypeDescriptor {
            definition,
            namespace: name.root_namespace().to_string(),
            name,
            kind,
            full_name,
            base_type,
            signature,
        }
    }
}

/// Kind of a type definition. Total over well-formed input: every
/// definition is an interface, an enum, a value type or a class.
pub fn classify(def: &TypeDefinition) -> EntityKind {
    if def.is_interface {
        return EntityKind::Interface;
    }
    let base = def.base.as_ref().and_then(TypeSig::type_name);
    let is_system_enum = def.namespace == "System" && def.name == "Enum";
    match base {
        Some(b) if b.is("System", "Enum") => EntityKind::Enum,
        Some(b) if b.is("System", "ValueType") && !is_system_enum => EntityKind::Struct,
        _ if def.is_abstract && def.is_sealed => EntityKind::StaticClass,
        _ => EntityKind::Class,
    }
}

fn include_method(def: &TypeDefinition, method: &MethodDefinition) -> bool {
    if method.access != MemberAccess::Public {
        return false;
    }
    if method.is_constructor() || method.is_accessor {
        tracing::debug!("skipping {}::{}", def.name, method.name);
        return false;
    }
    true
}

fn describe_method<'m>(def: &'m TypeDefinition, method: &'m MethodDefinition) -> MemberDescriptor<'m> {
    let names = ParamNames {
        type_params: &def.generic_params,
        method_params: &method.generic_params,
    };
    let params = method
        .params
        .iter()
        .map(|p| format!("{} {}", names.simple(&p.ty), p.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut shape = MemberShape::new(MemberKind::Method, &method.name);
    shape.generic_arity = method.generic_params.len();
    shape.params = method.params.iter().map(|p| &p.ty).collect();
    shape.return_type = Some(&method.return_type);

    MemberDescriptor {
        kind: EntityKind::Method,
        name: &method.name,
        signature: format!(
            "{} {}({params})",
            names.simple(&method.return_type),
            method.name
        ),
        shape,
    }
}

fn describe_property<'m>(
    def: &'m TypeDefinition,
    property: &'m PropertyDefinition,
) -> MemberDescriptor<'m> {
    let names = ParamNames::for_type(def);
    MemberDescriptor {
        kind: EntityKind::Property,
        name: &property.name,
        signature: format!("{} {}", names.simple(&property.ty), property.name),
        shape: MemberShape::new(MemberKind::Property, &property.name),
    }
}

fn describe_field<'m>(def: &'m TypeDefinition, field: &'m FieldDefinition) -> MemberDescriptor<'m> {
    let names = ParamNames::for_type(def);
    MemberDescriptor {
        kind: EntityKind::Field,
        name: &field.name,
        signature: format!("{} {}", names.simple(&field.ty), field.name),
        shape: MemberShape::new(MemberKind::Field, &field.name),
    }
}

fn describe_event<'m>(def: &'m TypeDefinition, event: &'m EventDefinition) -> MemberDescriptor<'m> {
    let names = ParamNames::for_type(def);
    let signature = match &event.handler {
        Some(handler) => format!("event {} {}", names.simple(handler), event.name),
        None => format!("event {}", event.name),
    };
    MemberDescriptor {
        kind: EntityKind::Event,
        name: &event.name,
        signature,
        shape: MemberShape::new(MemberKind::Event, &event.name),
    }
}

// ── Display Names ───────────────────────────────────────────────────────────

/// Generic parameter names in scope for a signature.
struct ParamNames<'a> {
    type_params: &'a [String],
    method_params: &'a [String],
}

impl<'a> ParamNames<'a> {
    fn for_type(def: &'a TypeDefinition) -> Self {
        Self {
            type_params: &def.generic_params,
            method_params: &[],
        }
    }

    /// Simple display name: `Int32`, `List`1`, `T`, `Byte[]`, `Int32&`.
    fn simple(&self, sig: &TypeSig) -> String {
        match sig {
            TypeSig::Named(name) | TypeSig::GenericInst {
                definition: name, ..
            } => name.name.clone(),
            TypeSig::GenericParam(i) => param_name(self.type_params, *i, "`"),
            TypeSig::MethodGenericParam(i) => param_name(self.method_params, *i, "``"),
            TypeSig::SzArray(element) => format!("{}[]", self.simple(element)),
            TypeSig::Array { element, rank, .. } => {
                format!("{}{}", self.simple(element), array_suffix(*rank))
            }
            TypeSig::ByRef(inner) => format!("{}&", self.simple(inner)),
            TypeSig::Pointer(inner) => format!("{}*", self.simple(inner)),
            TypeSig::FnPtr { .. } => "IntPtr".to_string(),
        }
    }
}

fn param_name(names: &[String], index: u32, fallback_prefix: &str) -> String {
    names
        .get(index as usize)
        .cloned()
        .unwrap_or_else(|| format!("{fallback_prefix}{index}"))
}

fn array_suffix(rank: u32) -> String {
    if rank <= 1 {
        "[*]".to_string()
    } else {
        format!("[{}]", ",".repeat(rank as usize - 1))
    }
}

/// Reflection-style full name used for base types:
/// `System.Collections.Generic.List`1[System.Int32]`.
fn full_type_name(sig: &TypeSig, type_params: &[String]) -> String {
    match sig {
        TypeSig::Named(name) => name.qualified('+'),
        TypeSig::GenericInst { definition, args } => {
            let args = args
                .iter()
                .map(|a| full_type_name(a, type_params))
                .collect::<Vec<_>>()
                .join(",");
            format!("{}[{args}]", definition.qualified('+'))
        }
        TypeSig::GenericParam(i) => param_name(type_params, *i, "`"),
        TypeSig::MethodGenericParam(i) => format!("``{i}"),
        TypeSig::SzArray(element) => format!("{}[]", full_type_name(element, type_params)),
        TypeSig::Array { element, rank, .. } => {
            format!("{}{}", full_type_name(element, type_params), array_suffix(*rank))
        }
        TypeSig::ByRef(inner) => format!("{}&", full_type_name(inner, type_params)),
        TypeSig::Pointer(inner) => format!("{}*", full_type_name(inner, type_params)),
        TypeSig::FnPtr { .. } => "System.IntPtr".to_string(),
    }
}
