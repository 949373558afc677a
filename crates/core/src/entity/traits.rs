use super::error::MappingError;
use super::value::PropertyValue;

/// A domain type that can be moved in and out of a store record.
///
/// Implementations expose an explicit field list instead of relying on
/// runtime introspection. Use [`impl_entity!`](crate::impl_entity) to
/// generate one from the struct's fields.
pub trait Entity: Default + Send + Sync + 'static {
    /// Type name used for error messages and as the default table name.
    const TYPE_NAME: &'static str;

    /// Every storable property name, in declaration order.
    fn field_names() -> &'static [&'static str];

    /// Reads a property. `None` means the property is null/unset or unknown;
    /// callers distinguish the two through [`Entity::has_field`].
    fn get(&self, name: &str) -> Option<PropertyValue>;

    /// Assigns a property, coercing the stored value into the field type.
    /// Unknown names are ignored.
    fn set(&mut self, name: &str, value: PropertyValue) -> Result<(), MappingError>;

    /// Returns true if `name` is one of this type's properties.
    fn has_field(name: &str) -> bool {
        Self::field_names().contains(&name)
    }
}

/// Declarative storage markers for a type that supports discovery-based
/// registration.
///
/// This is the statically-checked replacement for attribute markers: a type
/// opts in by implementing [`Storable`] and returning a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorableDescriptor {
    /// Table name override. Defaults to [`Entity::TYPE_NAME`].
    pub table_name: Option<&'static str>,
    /// Property whose value is the partition key.
    pub partition_key: Option<&'static str>,
    /// Property whose value is the row key.
    pub row_key: Option<&'static str>,
    /// Type-level partition key template; wins over `partition_key`.
    pub virtual_partition_key: Option<&'static str>,
    /// Type-level row key template; wins over `row_key`.
    pub virtual_row_key: Option<&'static str>,
}

impl StorableDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, name: &'static str) -> Self {
        self.table_name = Some(name);
        self
    }

    pub fn partition_key(mut self, property: &'static str) -> Self {
        self.partition_key = Some(property);
        self
    }

    pub fn row_key(mut self, property: &'static str) -> Self {
        self.row_key = Some(property);
        self
    }

    pub fn virtual_partition_key(mut self, template: &'static str) -> Self {
        self.virtual_partition_key = Some(template);
        self
    }

    pub fn virtual_row_key(mut self, template: &'static str) -> Self {
        self.virtual_row_key = Some(template);
        self
    }
}

/// Marker for entities that carry their own storage descriptor.
pub trait Storable: Entity {
    fn storable() -> StorableDescriptor;
}

/// Implements [`Entity`] for a struct from an explicit field list.
///
/// Each field may be renamed in the store with `field => "Name"`; otherwise
/// the Rust identifier is used. Every listed field type must implement
/// [`PropertyField`](crate::entity::PropertyField).
///
/// ```
/// use tablekeep_core::impl_entity;
///
/// #[derive(Debug, Default)]
/// struct Contact {
///     email: String,
///     age: Option<i32>,
/// }
///
/// impl_entity!(Contact {
///     email => "Email",
///     age,
/// });
///
/// use tablekeep_core::entity::Entity;
/// assert_eq!(Contact::field_names(), &["Email", "age"]);
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($ty:ident { $($field:ident $(=> $name:literal)?),+ $(,)? }) => {
        impl $crate::entity::Entity for $ty {
            const TYPE_NAME: &'static str = stringify!($ty);

            fn field_names() -> &'static [&'static str] {
                &[$($crate::impl_entity!(@name $field $($name)?)),+]
            }

            fn get(&self, name: &str) -> Option<$crate::entity::PropertyValue> {
                $(
                    if name == $crate::impl_entity!(@name $field $($name)?) {
                        return $crate::entity::PropertyField::to_property(&self.$field);
                    }
                )+
                None
            }

            fn set(
                &mut self,
                name: &str,
                value: $crate::entity::PropertyValue,
            ) -> ::core::result::Result<(), $crate::entity::MappingError> {
                $(
                    if name == $crate::impl_entity!(@name $field $($name)?) {
                        self.$field = $crate::entity::PropertyField::from_property(value)
                            .ok_or_else(|| $crate::entity::MappingError::InvalidValue {
                                entity_type: stringify!($ty),
                                property: name.to_string(),
                            })?;
                        return Ok(());
                    }
                )+
                Ok(())
            }
        }
    };
    (@name $field:ident $name:literal) => {
        $name
    };
    (@name $field:ident) => {
        stringify!($field)
    };
}
