pub mod explain;
pub mod generate;

pub use explain::ExplainArgs;
pub use generate::GenerateArgs;
