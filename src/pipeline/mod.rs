pub mod normalize;
pub mod orchestrator;
pub mod prompt;

pub use normalize::normalize;
pub use orchestrator::CodeGenerator;
