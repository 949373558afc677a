//! Entity mapping and key derivation.

mod adapter;
mod error;
mod registry;
mod template;
mod traits;
mod value;

pub use adapter::{to_model, to_record};
pub use error::{EntityError, KeyKind, MappingError, TemplateError};
pub use registry::{
    mapping_from_descriptor, Discoverable, DiscoveryScope, EntityMapping, MapperRegistry,
    RegistryBuilder,
};
pub use template::{resolve, KeyTemplate, Segment};
pub use traits::{Entity, Storable, StorableDescriptor};
pub use value::{PropertyField, PropertyValue};
