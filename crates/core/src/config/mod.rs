pub mod project;
pub mod validation;

pub use project::*;
pub use validation::*;
