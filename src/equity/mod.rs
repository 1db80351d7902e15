pub mod engine;
pub use engine::*;

pub mod evaluator;
pub use evaluator::*;
