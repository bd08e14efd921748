//! # ChemID Domain Models
//!
//! Wire and domain types shared by the compound lookup service.
//!
//! ## Key Models
//!
//! - **SearchEnvelope / CompoundRecord / PropertyEntry**: PubChem PUG REST results
//! - **Annotation**: ZOOMA annotate entries carrying semantic tags
//! - **LookupKey**: cache key built from identifier kind and trimmed name
//! - **LookupResult**: the `{data, message}` body returned to callers

pub mod annotation;
pub mod compound;
pub mod lookup;


pub use annotation::*;
pub use compound::*;
pub use lookup::*;
