//! Object-store backends for backup documents.

mod object_store;

pub use self::object_store::{map_object_store_error, ObjectStoreBlobStore, CONTAINER_MARKER};
