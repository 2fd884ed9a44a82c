pub mod model;
pub mod serializer;

pub use model::{Description, Document, Product};
pub use serializer::{JsonSerializer, Payload, Serializer};
