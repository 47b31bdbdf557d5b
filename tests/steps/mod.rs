mod generator_steps;
mod merge_steps;

pub use generator_steps::GeneratorWorld;
pub use merge_steps::MergeWorld;
