//! sjit: build GPU compute kernels as typed expression graphs and emit
//! them as HLSL.
//!
//! A [`KernelBuilder`] hands out [`Var`] handles; every operation on a
//! handle type-checks, infers divergence and writes the statement into the
//! current scope. [`KernelBuilder::finish`] wraps the body in an entry
//! point, declares the referenced resources and returns a [`Kernel`]
//! with its binding manifest.

pub mod builder;
pub mod cache;
pub mod config;
pub mod diagnostic;
pub mod expr;
pub mod graph;
pub mod intrinsic;
pub mod kernels;
pub mod module;
pub mod resource;
pub mod span;
pub mod types;

pub use builder::{Kernel, KernelBuilder, Operand, Var};
pub use config::KernelConfig;
pub use diagnostic::Diagnostic;
pub use resource::Resource;
pub use types::Ty;
