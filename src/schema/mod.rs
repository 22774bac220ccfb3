pub mod field;
pub mod language;
pub mod rules;

pub use field::*;
pub use language::*;
pub use rules::*;
