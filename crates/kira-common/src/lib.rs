// Kira common -- shared data carried between every pipeline stage.

pub mod diagnostic;
pub mod span;
pub mod token;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use span::{Location, Span};
pub use token::{keyword_from_str, LitValue, NumSuffix, Token, TokenKind};
