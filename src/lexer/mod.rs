/// Tokenization — raw logos patterns wrapped by a peekable stream with
/// automatic statement-terminator insertion.
pub mod lexer;
pub mod token;

pub use lexer::TokenStream;
pub use token::{Position, Span, Token, TokenKind};
