//! Structured record registration.
//!
//! A [`Record`] type describes its members once through a [`TypeDescriptor`].
//! The descriptor is resolved into wire names on first use and cached per
//! type, so extraction never re-inspects a type's metadata.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock};

use crate::property::NameSource;
use crate::value::Value;

/// A caller type whose members can be read as message properties.
///
/// # Example
///
/// ```
/// use panelwire_core::record::{MemberDescriptor, Record, TypeDescriptor};
/// use panelwire_core::Value;
///
/// #[derive(Debug)]
/// struct Purchase {
///     item: String,
///     internal_note: String,
/// }
///
/// impl Record for Purchase {
///     fn descriptor() -> TypeDescriptor {
///         TypeDescriptor::new("Purchase")
///             .member(MemberDescriptor::new("item").rename("Item Name"))
///             .member(MemberDescriptor::new("internal_note").ignore())
///     }
///
///     fn member(&self, name: &str) -> Option<Value> {
///         match name {
///             "item" => Some(self.item.clone().into()),
///             "internal_note" => Some(self.internal_note.clone().into()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Record: fmt::Debug + Send + Sync + 'static {
    /// Member metadata. Called at most a handful of times per process.
    fn descriptor() -> TypeDescriptor
    where
        Self: Sized;

    /// Read a member by its declared (Rust) name.
    fn member(&self, name: &str) -> Option<Value>;
}

/// Object-safe view of a [`Record`], stored inside [`Value::Record`].
pub trait ErasedRecord: fmt::Debug + Send + Sync {
    /// The cached, resolved member table for this record's type.
    fn members(&self) -> Arc<[ResolvedMember]>;

    fn read_member(&self, name: &str) -> Option<Value>;
}

impl<T: Record> ErasedRecord for T {
    fn members(&self) -> Arc<[ResolvedMember]> {
        resolved_members::<T>()
    }

    fn read_member(&self, name: &str) -> Option<Value> {
        <T as Record>::member(self, name)
    }
}

/// Declared metadata for one record type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    type_name: &'static str,
    /// Structural-contract mode: only members marked as included are read.
    contract: bool,
    members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            contract: false,
            members: Vec::new(),
        }
    }

    /// Opt the type into structural-contract mode.
    pub fn contract(mut self) -> Self {
        self.contract = true;
        self
    }

    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Resolve every readable member to its wire name.
    ///
    /// Ignored members are always skipped. In contract mode, members not
    /// marked as included are skipped too. An explicit rename wins over a
    /// contract name, which wins over the declared name.
    pub fn resolve(&self) -> Vec<ResolvedMember> {
        self.members
            .iter()
            .filter(|m| !m.ignored)
            .filter(|m| !self.contract || m.in_contract)
            .map(|m| {
                let (wire_name, name_source) = match (m.rename, m.contract_name) {
                    (Some(rename), _) => (rename, NameSource::DeclaredOverride),
                    (None, Some(contract_name)) if self.contract => {
                        (contract_name, NameSource::SchemaMember)
                    }
                    _ => (m.name, NameSource::Default),
                };
                ResolvedMember {
                    member: m.name,
                    wire_name,
                    name_source,
                }
            })
            .collect()
    }
}

/// Declared metadata for one member of a record type.
#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    name: &'static str,
    rename: Option<&'static str>,
    contract_name: Option<&'static str>,
    in_contract: bool,
    ignored: bool,
}

impl MemberDescriptor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rename: None,
            contract_name: None,
            in_contract: false,
            ignored: false,
        }
    }

    /// Explicit wire name override. Takes precedence over a contract name.
    pub fn rename(mut self, wire_name: &'static str) -> Self {
        self.rename = Some(wire_name);
        self
    }

    /// Mark the member as part of the type's structural contract.
    pub fn in_contract(mut self) -> Self {
        self.in_contract = true;
        self
    }

    /// Include the member in the contract under a different name.
    pub fn contract_name(mut self, wire_name: &'static str) -> Self {
        self.in_contract = true;
        self.contract_name = Some(wire_name);
        self
    }

    /// Never read this member.
    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }
}

/// A member after name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMember {
    /// Declared name, passed back to [`Record::member`].
    pub member: &'static str,
    pub wire_name: &'static str,
    pub name_source: NameSource,
}

static RESOLVED: LazyLock<RwLock<HashMap<TypeId, Arc<[ResolvedMember]>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Resolved members for `T`, computed on first request.
///
/// Two threads racing on the same type both resolve it; the tables are
/// equal, so whichever insert lands last is harmless.
pub fn resolved_members<T: Record>() -> Arc<[ResolvedMember]> {
    let id = TypeId::of::<T>();

    if let Some(found) = RESOLVED.read().ok().and_then(|cache| cache.get(&id).cloned()) {
        return found;
    }

    let descriptor = T::descriptor();
    tracing::trace!(type_name = descriptor.type_name(), "Resolving record members");
    let resolved: Arc<[ResolvedMember]> = descriptor.resolve().into();

    match RESOLVED.write() {
        Ok(mut cache) => cache.entry(id).or_insert(resolved).clone(),
        // A poisoned cache only costs us re-resolution.
        Err(_) => resolved,
    }
}
