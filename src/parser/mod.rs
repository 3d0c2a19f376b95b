// Pipeline DSL parser module

pub mod ast;
pub mod lexer;
pub mod pipeline;
pub mod verb;

// Public API re-exports
pub use ast::{Arg, ArgValue, Call};
pub use pipeline::parse_pipeline;
pub use verb::bind_call;
