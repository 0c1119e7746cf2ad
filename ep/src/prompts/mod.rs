//! Prompt Template System
//!
//! The experiment prompt is a `.pmt` (prompt template) file compiled into the
//! binary and rendered with Handlebars.

mod assembler;
pub mod embedded;

pub use assembler::{PromptAssembler, PromptError};
