pub mod export;
pub mod marker;
pub mod polyline;
pub mod ray;
pub mod registry;

pub use registry::{LineOutcome, ObjectId, PlacedKind, RegistryChange, SpatialObjectRegistry};
