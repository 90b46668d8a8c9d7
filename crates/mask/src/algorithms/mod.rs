pub mod extraction;
pub mod detection;
pub mod simplification;

pub use extraction::*;
pub use detection::*;
pub use simplification::*;
