//! Maps a loaded [`CilObject`] onto the [`ModuleModel`].

use std::collections::{HashMap, HashSet};

use dllmcp_core::DllMcpError;
use dotscope::metadata::method::MethodRc;
use dotscope::metadata::signatures::{SignatureParameter, TypeSignature};
use dotscope::metadata::token::Token;
use dotscope::metadata::typesystem::{CilTypeRc, TypeRegistry};
use dotscope::CilObject;
use tracing::debug;

use crate::model::{
    EventDefinition, FieldDefinition, MemberAccess, MethodDefinition, ModuleModel, Parameter,
    PropertyDefinition, TypeDefinition, TypeName, TypeSig, TypeVisibility,
};

// Token table ids
const TABLE_TYPEDEF: u32 = 0x02;

// TypeAttributes
const TYPE_INTERFACE: u32 = 0x20;
const TYPE_ABSTRACT: u32 = 0x80;
const TYPE_SEALED: u32 = 0x100;

// MethodAttributes
const METHOD_STATIC: u32 = 0x10;
const METHOD_SPECIAL_NAME: u32 = 0x800;
const METHOD_RT_SPECIAL_NAME: u32 = 0x1000;

// FieldAttributes
const FIELD_STATIC: u32 = 0x10;
const FIELD_RT_SPECIAL_NAME: u32 = 0x400;

const MAX_DEPTH: u32 = 64;

fn table_of(token: &Token) -> u32 {
    token.value() >> 24
}

fn row_of(token: &Token) -> u32 {
    token.value() & 0x00ff_ffff
}

/// Turns the type registry of one assembly into plain model data.
pub(crate) struct ModelBuilder<'a> {
    assembly: &'a CilObject,
    registry: &'a TypeRegistry,
    /// Type definitions in metadata (row) order.
    definitions: Vec<CilTypeRc>,
    /// TypeDef token -> position in `definitions`.
    positions: HashMap<Token, usize>,
    /// Nested TypeDef token -> enclosing TypeDef token.
    enclosing: HashMap<Token, Token>,
}

impl<'a> ModelBuilder<'a> {
    pub(crate) fn new(assembly: &'a CilObject, registry: &'a TypeRegistry) -> Self {
        let mut definitions: Vec<CilTypeRc> = registry
            .all_types()
            .into_iter()
            .filter(|t| table_of(&t.token) == TABLE_TYPEDEF)
            .collect();
        definitions.sort_by_key(|t| row_of(&t.token));

        let positions = definitions
            .iter()
            .enumerate()
            .map(|(i, t)| (t.token, i))
            .collect();

        let mut enclosing = HashMap::new();
        for outer in &definitions {
            for (_, nested) in outer.nested_types.iter() {
                if let Some(nested) = nested.upgrade() {
                    enclosing.insert(nested.token, outer.token);
                }
            }
        }

        Self {
            assembly,
            registry,
            definitions,
            positions,
            enclosing,
        }
    }

    pub(crate) fn build(&self) -> Result<ModuleModel, DllMcpError> {
        let accessors = self.accessor_tokens();
        let types = self
            .definitions
            .iter()
            .map(|t| self.type_definition(t, &accessors))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ModuleModel {
            name: self.module_name()?,
            types,
        })
    }

    fn module_name(&self) -> Result<String, DllMcpError> {
        if let Some(assembly) = self.assembly.assembly() {
            if !assembly.name.is_empty() {
                return Ok(assembly.name.clone());
            }
        }
        let module = self
            .assembly
            .module()
            .ok_or_else(|| DllMcpError::ModuleLoad("metadata has no Module row".into()))?;
        Ok(match module.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => module.name.clone(),
        })
    }

    /// Every method that a property or event names as one of its accessors.
    fn accessor_tokens(&self) -> HashSet<Token> {
        let mut tokens = HashSet::new();
        for t in &self.definitions {
            for (_, property) in t.properties.iter() {
                for slot in [&property.fn_getter, &property.fn_setter] {
                    if let Some(method) = slot.get().and_then(|m| m.upgrade()) {
                        tokens.insert(method.token);
                    }
                }
            }
            for (_, event) in t.events.iter() {
                for slot in [&event.fn_on_add, &event.fn_on_remove, &event.fn_on_raise] {
                    if let Some(method) = slot.get().and_then(|m| m.upgrade()) {
                        tokens.insert(method.token);
                    }
                }
            }
        }
        tokens
    }

    fn type_definition(
        &self,
        t: &CilTypeRc,
        accessors: &HashSet<Token>,
    ) -> Result<TypeDefinition, DllMcpError> {
        let flags = t.flags;
        let base = match t.base() {
            Some(base) => Some(self.named_type(&base, 0)?),
            None => None,
        };

        let mut methods = Vec::new();
        for (_, method) in t.methods.iter() {
            if let Some(method) = method.upgrade() {
                methods.push(self.method(&method, accessors)?);
            }
        }

        let mut fields = Vec::new();
        for (_, field) in t.fields.iter() {
            fields.push(FieldDefinition {
                name: field.name.clone(),
                access: MemberAccess::from_flags(field.flags as u16),
                is_static: field.flags & FIELD_STATIC != 0,
                is_rt_special_name: field.flags & FIELD_RT_SPECIAL_NAME != 0,
                ty: self
                    .sig(&field.signature.base, 0)
                    .map_err(|e| in_member("field", &field.name, e))?,
            });
        }

        let mut properties = Vec::new();
        for (_, property) in t.properties.iter() {
            let (is_public, is_static) = accessor_flags(
                [&property.fn_getter, &property.fn_setter]
                    .into_iter()
                    .filter_map(|slot| slot.get().and_then(|m| m.upgrade())),
            );
            let ty = self
                .sig(&property.signature.base, 0)
                .map_err(|e| in_member("property", &property.name, e))?;
            let index_params = property
                .signature
                .params
                .iter()
                .map(|p| self.param_sig(p))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| in_member("property", &property.name, e))?;
            properties.push(PropertyDefinition {
                name: property.name.clone(),
                ty,
                index_params,
                is_public,
                is_static,
            });
        }

        let mut events = Vec::new();
        for (_, event) in t.events.iter() {
            let (is_public, is_static) = accessor_flags(
                [&event.fn_on_add, &event.fn_on_remove, &event.fn_on_raise]
                    .into_iter()
                    .filter_map(|slot| slot.get().and_then(|m| m.upgrade())),
            );
            let handler = match event.event_type.upgrade() {
                Some(handler) => Some(self.named_type(&handler, 0)?),
                None => None,
            };
            events.push(EventDefinition {
                name: event.name.clone(),
                handler,
                is_public,
                is_static,
            });
        }

        Ok(TypeDefinition {
            namespace: t.namespace.clone(),
            name: t.name.clone(),
            enclosing: self
                .enclosing
                .get(&t.token)
                .and_then(|outer| self.positions.get(outer).copied()),
            visibility: TypeVisibility::from_flags(flags),
            is_interface: flags & TYPE_INTERFACE != 0,
            is_abstract: flags & TYPE_ABSTRACT != 0,
            is_sealed: flags & TYPE_SEALED != 0,
            base,
            generic_params: generic_names(
                t.generic_params
                    .iter()
                    .map(|(_, g)| (g.number, g.name.clone())),
            ),
            methods,
            properties,
            fields,
            events,
        })
    }

    fn method(
        &self,
        method: &MethodRc,
        accessors: &HashSet<Token>,
    ) -> Result<MethodDefinition, DllMcpError> {
        let access = method.flags_access.bits();
        let modifiers = u32::from(method.flags_modifiers.bits());
        let signature = &method.signature;

        let mut names: HashMap<u32, String> = HashMap::new();
        for (_, param) in method.params.iter() {
            if let Some(name) = &param.name {
                names.insert(param.sequence, name.clone());
            }
        }
        let params = signature
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Ok(Parameter {
                    name: names.remove(&(i as u32 + 1)).unwrap_or_default(),
                    ty: self.param_sig(p)?,
                })
            })
            .collect::<Result<Vec<_>, DllMcpError>>()
            .map_err(|e| in_member("method", &method.name, e))?;
        let return_type = self
            .param_sig(&signature.return_type)
            .map_err(|e| in_member("method", &method.name, e))?;

        let mut generic_params = generic_names(
            method
                .generic_params
                .iter()
                .map(|(_, g)| (g.number, g.name.clone())),
        );
        if generic_params.is_empty() && signature.param_count_generic > 0 {
            generic_params = (0..signature.param_count_generic)
                .map(|i| format!("M{i}"))
                .collect();
        }

        Ok(MethodDefinition {
            name: method.name.clone(),
            access: MemberAccess::from_flags(access as u16),
            is_static: modifiers & METHOD_STATIC != 0,
            is_special_name: modifiers & METHOD_SPECIAL_NAME != 0,
            is_rt_special_name: modifiers & METHOD_RT_SPECIAL_NAME != 0,
            is_accessor: accessors.contains(&method.token),
            generic_params,
            return_type,
            params,
        })
    }

    // ── Names ───────────────────────────────────────────────────────

    /// The name of a registry type. Definitions in this module chain to
    /// their enclosing type; references keep the name they were given.
    fn type_name(&self, t: &CilTypeRc, depth: u32) -> Result<TypeName, DllMcpError> {
        guard_depth(depth)?;
        let outer = self
            .enclosing
            .get(&t.token)
            .and_then(|outer| self.positions.get(outer))
            .map(|&i| &self.definitions[i]);
        match outer {
            Some(outer) => Ok(TypeName::nested(
                self.type_name(outer, depth + 1)?,
                t.name.clone(),
            )),
            None => Ok(TypeName::new(t.namespace.clone(), t.name.clone())),
        }
    }

    fn named_type(&self, t: &CilTypeRc, depth: u32) -> Result<TypeSig, DllMcpError> {
        Ok(TypeSig::Named(self.type_name(t, depth)?))
    }

    fn token_type(&self, token: &Token, depth: u32) -> Result<TypeSig, DllMcpError> {
        let t = self.registry.get(token).ok_or_else(|| {
            DllMcpError::ModuleLoad(format!("unresolved type token {:#010x}", token.value()))
        })?;
        self.named_type(&t, depth)
    }

    // ── Signatures ──────────────────────────────────────────────────

    fn param_sig(&self, param: &SignatureParameter) -> Result<TypeSig, DllMcpError> {
        let ty = self.sig(&param.base, 0)?;
        Ok(if param.by_ref {
            TypeSig::ByRef(Box::new(ty))
        } else {
            ty
        })
    }

    fn sig(&self, sig: &TypeSignature, depth: u32) -> Result<TypeSig, DllMcpError> {
        guard_depth(depth)?;
        let next = depth + 1;
        Ok(match sig {
            TypeSignature::Void => TypeSig::system("Void"),
            TypeSignature::Boolean => TypeSig::system("Boolean"),
            TypeSignature::Char => TypeSig::system("Char"),
            TypeSignature::I1 => TypeSig::system("SByte"),
            TypeSignature::U1 => TypeSig::system("Byte"),
            TypeSignature::I2 => TypeSig::system("Int16"),
            TypeSignature::U2 => TypeSig::system("UInt16"),
            TypeSignature::I4 => TypeSig::system("Int32"),
            TypeSignature::U4 => TypeSig::system("UInt32"),
            TypeSignature::I8 => TypeSig::system("Int64"),
            TypeSignature::U8 => TypeSig::system("UInt64"),
            TypeSignature::R4 => TypeSig::system("Single"),
            TypeSignature::R8 => TypeSig::system("Double"),
            TypeSignature::String => TypeSig::system("String"),
            TypeSignature::Object => TypeSig::system("Object"),
            TypeSignature::I => TypeSig::system("IntPtr"),
            TypeSignature::U => TypeSig::system("UIntPtr"),
            TypeSignature::TypedByRef => TypeSig::system("TypedReference"),
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => {
                self.token_type(token, next)?
            }
            TypeSignature::GenericParamType(n) => TypeSig::GenericParam(*n),
            TypeSignature::GenericParamMethod(n) => TypeSig::MethodGenericParam(*n),
            TypeSignature::ByRef(inner) => TypeSig::ByRef(Box::new(self.sig(inner, next)?)),
            TypeSignature::Pinned(inner) => self.sig(inner, next)?,
            TypeSignature::Ptr(pointer) => {
                TypeSig::Pointer(Box::new(self.sig(&pointer.base, next)?))
            }
            TypeSignature::SzArray(array) => {
                TypeSig::SzArray(Box::new(self.sig(&array.base, next)?))
            }
            TypeSignature::Array(array) => TypeSig::Array {
                element: Box::new(self.sig(&array.base, next)?),
                rank: array.rank,
                sizes: array.dimensions.iter().map_while(|d| d.size).collect(),
                lower_bounds: array
                    .dimensions
                    .iter()
                    .map_while(|d| d.lower_bound)
                    .map(|b| b as i32)
                    .collect(),
            },
            TypeSignature::GenericInst(definition, args) => {
                let definition = match self.sig(definition, next)? {
                    TypeSig::Named(name) => name,
                    other => {
                        return Err(DllMcpError::ModuleLoad(format!(
                            "generic instantiation of non-type {other:?}"
                        )))
                    }
                };
                TypeSig::GenericInst {
                    definition,
                    args: args
                        .iter()
                        .map(|a| self.sig(a, next))
                        .collect::<Result<Vec<_>, _>>()?,
                }
            }
            TypeSignature::FnPtr(method) => TypeSig::FnPtr {
                return_type: Box::new(self.param_sig(&method.return_type)?),
                params: method
                    .params
                    .iter()
                    .map(|p| self.param_sig(p))
                    .collect::<Result<Vec<_>, _>>()?,
            },
            other => {
                debug!("unsupported signature element {other:?}, using System.Object");
                TypeSig::system("Object")
            }
        })
    }
}

/// Public when any accessor is public; static when any accessor is static.
fn accessor_flags(methods: impl Iterator<Item = MethodRc>) -> (bool, bool) {
    let mut public = false;
    let mut is_static = false;
    for method in methods {
        let access = MemberAccess::from_flags(method.flags_access.bits() as u16);
        public |= access == MemberAccess::Public;
        is_static |= u32::from(method.flags_modifiers.bits()) & METHOD_STATIC != 0;
    }
    (public, is_static)
}

/// Generic parameter names ordered by parameter number.
fn generic_names(params: impl Iterator<Item = (u32, String)>) -> Vec<String> {
    let mut numbered: Vec<(u32, String)> = params.collect();
    numbered.sort_by_key(|(number, _)| *number);
    numbered.into_iter().map(|(_, name)| name).collect()
}

fn in_member(kind: &str, name: &str, err: DllMcpError) -> DllMcpError {
    match err {
        DllMcpError::ModuleLoad(msg) => DllMcpError::ModuleLoad(format!("{kind} {name}: {msg}")),
        other => other,
    }
}

fn guard_depth(depth: u32) -> Result<(), DllMcpError> {
    if depth > MAX_DEPTH {
        Err(DllMcpError::ModuleLoad("type reference chain too deep".into()))
    } else {
        Ok(())
    }
}
