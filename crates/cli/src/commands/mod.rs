//! CLI command implementations.

mod batch;
mod fields;
mod lookup;

pub use batch::batch;
pub use fields::fields;
pub use lookup::{lookup, LookupCommand};
