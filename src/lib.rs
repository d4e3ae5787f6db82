//! Flamework - a TypeScript-to-Luau compiler with reflection metadata
//!
//! This is the root workspace crate that provides integration tests.
//! The actual implementation is in the workspace member crates.

// Re-export main crates for convenience
pub use flamework_ast as ast;
pub use flamework_build as build;
pub use flamework_compiler as compiler;
pub use flamework_symbols as symbols;
pub use flamework_transform as transform;
