//! Core ETL (Extract, Transform, Load) abstractions
//!
//! Every command is built from these traits: an extractor produces items,
//! a transformer reshapes them, and a loader writes them to a destination.

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::Pipeline;
pub use transform::{IdentityTransformer, Transformer};
