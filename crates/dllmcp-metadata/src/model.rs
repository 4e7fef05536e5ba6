//! Immutable structural model of one module.
//!
//! Everything here is plain data with public fields, so callers (and tests)
//! can build a model by hand without a compiled binary.

/// A loaded module: its assembly name and every type definition in
/// metadata order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleModel {
    pub name: String,
    pub types: Vec<TypeDefinition>,
}

/// Type visibility (`TypeAttributes.VisibilityMask`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeVisibility {
    #[default]
    NotPublic,
    Public,
    NestedPublic,
    NestedPrivate,
    NestedFamily,
    NestedAssembly,
    NestedFamilyAndAssembly,
    NestedFamilyOrAssembly,
}

impl TypeVisibility {
    pub fn from_flags(flags: u32) -> Self {
        match flags & 0x7 {
            1 => Self::Public,
            2 => Self::NestedPublic,
            3 => Self::NestedPrivate,
            4 => Self::NestedFamily,
            5 => Self::NestedAssembly,
            6 => Self::NestedFamilyAndAssembly,
            7 => Self::NestedFamilyOrAssembly,
            _ => Self::NotPublic,
        }
    }
}

/// Member accessibility (`MemberAccessMask`, shared by methods and fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberAccess {
    #[default]
    CompilerControlled,
    Private,
    FamilyAndAssembly,
    Assembly,
    Family,
    FamilyOrAssembly,
    Public,
}

impl MemberAccess {
    pub fn from_flags(flags: u16) -> Self {
        match flags & 0x7 {
            1 => Self::Private,
            2 => Self::FamilyAndAssembly,
            3 => Self::Assembly,
            4 => Self::Family,
            5 => Self::FamilyOrAssembly,
            6 => Self::Public,
            _ => Self::CompilerControlled,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDefinition {
    pub namespace: String,
    /// Metadata name, including any arity marker (`Box`1`).
    pub name: String,
    /// Index of the enclosing type in [`ModuleModel::types`].
    pub enclosing: Option<usize>,
    pub visibility: TypeVisibility,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_sealed: bool,
    pub base: Option<TypeSig>,
    /// Generic parameter names in declaration order, including those
    /// inherited from enclosing types.
    pub generic_params: Vec<String>,
    pub methods: Vec<MethodDefinition>,
    pub properties: Vec<PropertyDefinition>,
    pub fields: Vec<FieldDefinition>,
    pub events: Vec<EventDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    pub name: String,
    pub access: MemberAccess,
    pub is_static: bool,
    pub is_special_name: bool,
    pub is_rt_special_name: bool,
    /// Referenced by MethodSemantics as a property or event accessor.
    pub is_accessor: bool,
    pub generic_params: Vec<String>,
    pub return_type: TypeSig,
    pub params: Vec<Parameter>,
}

impl MethodDefinition {
    pub fn is_constructor(&self) -> bool {
        self.is_rt_special_name && (self.name == ".ctor" || self.name == ".cctor")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Declared name; empty when the metadata carries none.
    pub name: String,
    pub ty: TypeSig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub name: String,
    pub ty: TypeSig,
    /// Indexer parameters.
    pub index_params: Vec<TypeSig>,
    /// True when at least one accessor is public.
    pub is_public: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub access: MemberAccess,
    pub is_static: bool,
    pub is_rt_special_name: bool,
    pub ty: TypeSig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    pub name: String,
    pub handler: Option<TypeSig>,
    /// True when at least one accessor is public.
    pub is_public: bool,
    pub is_static: bool,
}

// ── Type Signatures ─────────────────────────────────────────────────────────

/// A type reference by name. Nested types chain to their enclosing type;
/// the namespace lives on the outermost link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub namespace: String,
    pub name: String,
    pub enclosing: Option<Box<TypeName>>,
}

impl TypeName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            enclosing: None,
        }
    }

    pub fn nested(enclosing: TypeName, name: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            name: name.into(),
            enclosing: Some(Box::new(enclosing)),
        }
    }

    /// Namespace of the outermost enclosing type.
    pub fn root_namespace(&self) -> &str {
        match &self.enclosing {
            Some(outer) => outer.root_namespace(),
            None => &self.namespace,
        }
    }

    /// Qualified name with nested types joined by `separator`.
    pub fn qualified(&self, separator: char) -> String {
        match &self.enclosing {
            Some(outer) => format!("{}{separator}{}", outer.qualified(separator), self.name),
            None if self.namespace.is_empty() => self.name.clone(),
            None => format!("{}.{}", self.namespace, self.name),
        }
    }

    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.enclosing.is_none() && self.namespace == namespace && self.name == name
    }
}

/// A decoded type signature. Custom modifiers and `pinned` are dropped
/// during decoding; primitives are represented by their `System` names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    Named(TypeName),
    GenericInst {
        definition: TypeName,
        args: Vec<TypeSig>,
    },
    /// `!n`: a generic parameter of the enclosing type.
    GenericParam(u32),
    /// `!!n`: a generic parameter of the method.
    MethodGenericParam(u32),
    SzArray(Box<TypeSig>),
    Array {
        element: Box<TypeSig>,
        rank: u32,
        sizes: Vec<u32>,
        lower_bounds: Vec<i32>,
    },
    ByRef(Box<TypeSig>),
    Pointer(Box<TypeSig>),
    FnPtr {
        return_type: Box<TypeSig>,
        params: Vec<TypeSig>,
    },
}

impl TypeSig {
    /// A type in the `System` namespace, e.g. `TypeSig::system("Int32")`.
    pub fn system(name: &str) -> Self {
        Self::Named(TypeName::new("System", name))
    }

    pub fn named(namespace: &str, name: &str) -> Self {
        Self::Named(TypeName::new(namespace, name))
    }

    /// The named type, ignoring any instantiation.
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            Self::Named(name) | Self::GenericInst {
                definition: name, ..
            } => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_names_use_the_requested_separator() {
        let outer = TypeName::new("Ns", "Outer`1");
        let inner = TypeName::nested(outer, "Inner");
        assert_eq!(inner.qualified('+'), "Ns.Outer`1+Inner");
        assert_eq!(inner.qualified('.'), "Ns.Outer`1.Inner");
        assert_eq!(inner.root_namespace(), "Ns");
        assert_eq!(TypeName::new("", "Global").qualified('.'), "Global");
    }

    #[test]
    fn flag_decoding() {
        assert_eq!(TypeVisibility::from_flags(0x0010_0001), TypeVisibility::Public);
        assert_eq!(TypeVisibility::from_flags(0x2), TypeVisibility::NestedPublic);
        assert_eq!(MemberAccess::from_flags(0x0096), MemberAccess::Public);
        assert_eq!(MemberAccess::from_flags(0x0001), MemberAccess::Private);
    }

    #[test]
    fn system_types_are_recognised() {
        let sig = TypeSig::system("Enum");
        assert!(sig.type_name().is_some_and(|n| n.is("System", "Enum")));
        assert!(TypeSig::GenericParam(0).type_name().is_none());
    }
}
