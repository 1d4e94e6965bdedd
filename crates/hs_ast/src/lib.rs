pub mod ast;
pub mod diagnostic;
pub mod span;

pub use span::{Span, Spanned};
