//! Entity mapper registry.
//!
//! Mappings are collected in a [`RegistryBuilder`] during startup and frozen
//! into an immutable [`MapperRegistry`] before any read or write happens.
//! The split makes "register, then use" a property of the types: nothing can
//! add a mapping to a registry that is already shared.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use super::error::{KeyKind, MappingError};
use super::template::KeyTemplate;
use super::traits::{Entity, Storable};

/// How one entity type is stored: target table plus key templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMapping {
    entity_type: &'static str,
    table_name: String,
    partition_key: KeyTemplate,
    row_key: KeyTemplate,
}

impl EntityMapping {
    /// Creates a mapping from a table name and two key templates.
    ///
    /// The entity type is attached when the mapping is registered.
    pub fn new(
        table_name: impl Into<String>,
        partition_key_template: &str,
        row_key_template: &str,
    ) -> Result<Self, MappingError> {
        Ok(Self {
            entity_type: "",
            table_name: table_name.into(),
            partition_key: KeyTemplate::parse(partition_key_template)?,
            row_key: KeyTemplate::parse(row_key_template)?,
        })
    }

    pub fn entity_type(&self) -> &'static str {
        self.entity_type
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn partition_key(&self) -> &KeyTemplate {
        &self.partition_key
    }

    pub fn row_key(&self) -> &KeyTemplate {
        &self.row_key
    }
}

/// Derives a mapping from a type's storage descriptor.
///
/// A non-empty virtual key template wins over a key property marker. The
/// table name falls back to the type name.
pub fn mapping_from_descriptor<T: Storable>() -> Result<EntityMapping, MappingError> {
    let descriptor = T::storable();

    let key_source = |virtual_template: Option<&'static str>,
                      property: Option<&'static str>,
                      key: KeyKind| {
        virtual_template
            .filter(|template| !template.trim().is_empty())
            .or(property)
            .ok_or(MappingError::MissingKeyAttribute {
                entity_type: T::TYPE_NAME,
                key,
            })
    };

    let partition_key = key_source(
        descriptor.virtual_partition_key,
        descriptor.partition_key,
        KeyKind::Partition,
    )?;
    let row_key = key_source(descriptor.virtual_row_key, descriptor.row_key, KeyKind::Row)?;
    let table_name = descriptor.table_name.unwrap_or(T::TYPE_NAME);

    EntityMapping::new(table_name, partition_key, row_key)
}

/// A storable type that discovery-based registration can pick up.
#[derive(Clone, Copy)]
pub struct Discoverable {
    type_name: &'static str,
    register: fn(&mut RegistryBuilder) -> Result<(), MappingError>,
}

impl Discoverable {
    pub fn of<T: Storable>() -> Self {
        Self {
            type_name: T::TYPE_NAME,
            register: register_discovered::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Discoverable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discoverable")
            .field("type_name", &self.type_name)
            .finish()
    }
}

fn register_discovered<T: Storable>(builder: &mut RegistryBuilder) -> Result<(), MappingError> {
    builder.discover::<T>().map(|_| ())
}

/// The set of storable types belonging to one module.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryScope {
    types: Vec<Discoverable>,
}

impl DiscoveryScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a storable type to the scope.
    pub fn with<T: Storable>(mut self) -> Self {
        self.types.push(Discoverable::of::<T>());
        self
    }

    pub fn types(&self) -> &[Discoverable] {
        &self.types
    }
}

/// Collects mappings during startup.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    mappings: HashMap<TypeId, EntityMapping>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mapping for `T`.
    ///
    /// Fails if `T` is already registered (the existing mapping is kept) or
    /// if a template references a property `T` does not have.
    pub fn register<T: Entity>(
        &mut self,
        mut mapping: EntityMapping,
    ) -> Result<&mut Self, MappingError> {
        let type_id = TypeId::of::<T>();
        if self.mappings.contains_key(&type_id) {
            return Err(MappingError::DuplicateMapping {
                entity_type: T::TYPE_NAME,
            });
        }

        mapping.partition_key.validate::<T>()?;
        mapping.row_key.validate::<T>()?;
        mapping.entity_type = T::TYPE_NAME;

        self.mappings.insert(type_id, mapping);
        Ok(self)
    }

    /// Registers `T` from its storage descriptor.
    pub fn discover<T: Storable>(&mut self) -> Result<&mut Self, MappingError> {
        let mapping = mapping_from_descriptor::<T>()?;
        self.register::<T>(mapping)
    }

    /// Registers every type in `scope`. The first failure is returned and
    /// types after it are not registered.
    pub fn discover_all(&mut self, scope: &DiscoveryScope) -> Result<&mut Self, MappingError> {
        for discoverable in scope.types() {
            (discoverable.register)(self)?;
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Freezes the collected mappings.
    pub fn build(self) -> MapperRegistry {
        MapperRegistry {
            mappings: self.mappings,
        }
    }
}

/// Immutable registry of entity mappings, safe to share across tasks.
#[derive(Debug, Default)]
pub struct MapperRegistry {
    mappings: HashMap<TypeId, EntityMapping>,
}

impl MapperRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns the mapping for `T`.
    pub fn lookup<T: Entity>(&self) -> Result<&EntityMapping, MappingError> {
        self.mappings
            .get(&TypeId::of::<T>())
            .ok_or(MappingError::NotRegistered {
                entity_type: T::TYPE_NAME,
            })
    }

    pub fn contains<T: Entity>(&self) -> bool {
        self.mappings.contains_key(&TypeId::of::<T>())
    }

    pub fn mappings(&self) -> impl Iterator<Item = &EntityMapping> {
        self.mappings.values()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
