// Parser module for recovering infrastructure components from stack sources

pub mod entry;
pub mod model;
pub mod python;
pub mod relationships;
pub mod services;
mod stack;

pub use model::*;
pub use python::PythonParser;
pub use stack::StackParser;
