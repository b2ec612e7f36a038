//! The token stream: one-token lookahead over the raw logos patterns,
//! plus the automatic statement-terminator rule.
//!
//! Newlines are ordinarily whitespace. After a token that can end a
//! statement (`IDENT`, `RBRACE`, `RPAREN`, `INT`, `STRING`), a directly
//! following newline (or end of input) schedules an `EOS` token, so
//! newline-terminated statements work without `;`. The stream is a
//! two-state machine: *normal* and *pending-eos*; the pending `EOS` is
//! emitted by the next [`TokenStream::next`] call before scanning
//! resumes.

use logos::Logos;

use super::token::{Position, RawToken, Span, Token, TokenKind};
use crate::errors::CompileError;

pub struct TokenStream<'src> {
    lexer: logos::Lexer<'src, RawToken>,
    src: &'src str,
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
    peeked: Option<(Token, String)>,
    pending_eos: Option<Position>,
    /// Position just past the most recently produced token.
    last_to: Position,
}

impl<'src> TokenStream<'src> {
    pub fn new(src: &'src str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }

        TokenStream {
            lexer: RawToken::lexer(src),
            src,
            line_starts,
            peeked: None,
            pending_eos: None,
            last_to: Position { line: 1, column: 0 },
        }
    }

    /// The position one past the last token handed out. Used by the
    /// parser to close spans that cover several tokens.
    pub fn pos(&self) -> Position {
        self.last_to
    }

    fn position_at(&self, offset: usize) -> Position {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset);
        Position {
            line,
            column: offset - self.line_starts[line - 1],
        }
    }

    fn span_of(&self, range: std::ops::Range<usize>) -> Span {
        Span {
            from: self.position_at(range.start),
            to: self.position_at(range.end),
        }
    }

    /// Produce the next token, consuming it.
    pub fn next(&mut self) -> Result<(Token, String), CompileError> {
        let produced = match self.peeked.take() {
            Some(peeked) => peeked,
            None => self.advance()?,
        };
        self.last_to = produced.0.span.to;
        Ok(produced)
    }

    /// Look at the next token without consuming it. Idempotent until
    /// [`TokenStream::next`] is called.
    pub fn peek(&mut self) -> Result<(Token, String), CompileError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.advance()?);
        }
        Ok(self.peeked.clone().expect("just peeked"))
    }

    /// Whether the next token is one of the given kinds.
    pub fn peek_is(&mut self, kinds: &[TokenKind]) -> Result<bool, CompileError> {
        let (token, _) = self.peek()?;
        Ok(kinds.contains(&token.kind))
    }

    /// Consume the next token, requiring it to be one of the given kinds.
    pub fn expect(&mut self, kinds: &[TokenKind]) -> Result<(Token, String), CompileError> {
        let (token, lexeme) = self.next()?;
        if kinds.contains(&token.kind) {
            return Ok((token, lexeme));
        }

        Err(match kinds {
            [expected] => CompileError::ExpectedKind {
                expected: *expected,
                got: token.kind,
                span: token.span,
            },
            _ => CompileError::ExpectedOneOf {
                expected: kinds.to_vec(),
                got: token.kind,
                span: token.span,
            },
        })
    }

    fn advance(&mut self) -> Result<(Token, String), CompileError> {
        if let Some(pos) = self.pending_eos.take() {
            let token = Token {
                kind: TokenKind::Eos,
                span: Span::single(pos),
            };
            return Ok((token, "\n".to_string()));
        }

        let raw = match self.lexer.next() {
            None => {
                let token = Token {
                    kind: TokenKind::Eof,
                    span: Span::single(self.position_at(self.src.len())),
                };
                return Ok((token, String::new()));
            }
            Some(raw) => raw,
        };
        let range = self.lexer.span();
        let span = self.span_of(range.clone());

        let kind = match raw {
            Ok(raw) => TokenKind::from(raw),
            Err(()) => {
                return Err(CompileError::Lex {
                    lexeme: self.lexer.slice().to_string(),
                    span,
                });
            }
        };

        // The automatic-EOS rule. End of input counts as a newline so a
        // trailing statement still gets terminated.
        if matches!(
            kind,
            TokenKind::Ident
                | TokenKind::RBrace
                | TokenKind::RParen
                | TokenKind::Int
                | TokenKind::Str
        ) {
            let next_byte = self.src.as_bytes().get(range.end);
            if next_byte == Some(&b'\n') || next_byte.is_none() {
                self.pending_eos = Some(self.position_at((range.end + 1).min(self.src.len())));
            }
        }

        let lexeme = match kind {
            // Strip the delimiting backticks; the literal is verbatim.
            TokenKind::Str => {
                let s = self.lexer.slice();
                s[1..s.len() - 1].to_string()
            }
            _ => self.lexer.slice().to_string(),
        };

        Ok((Token { kind, span }, lexeme))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut stream = TokenStream::new(src);
        let mut out = Vec::new();
        loop {
            let (token, _) = stream.next().expect("lex");
            out.push(token.kind);
            if token.kind == TokenKind::Eof {
                return out;
            }
        }
    }

    fn lexemes(src: &str) -> Vec<(TokenKind, String)> {
        let mut stream = TokenStream::new(src);
        let mut out = Vec::new();
        loop {
            let (token, lexeme) = stream.next().expect("lex");
            if token.kind == TokenKind::Eof {
                return out;
            }
            out.push((token.kind, lexeme));
        }
    }

    #[test]
    fn punctuation_and_keywords() {
        use TokenKind::*;
        assert_eq!(
            kinds("type if then else func import struct var let new delete"),
            vec![Type, If, Then, Else, Func, Import, Struct, Var, Let, New, Delete, Eof],
        );
        assert_eq!(
            kinds(": ( ) { , ."),
            vec![Colon, LParen, RParen, LBrace, Comma, Period, Eof],
        );
    }

    #[test]
    fn equals_vs_fatarrow() {
        use TokenKind::*;
        assert_eq!(kinds("= =>"), vec![Equals, FatArrow, Eof]);
    }

    #[test]
    fn identifiers_may_contain_slashes_and_primes() {
        let toks = lexemes("foo/bar x' _a9");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Ident, "foo/bar".to_string()),
                (TokenKind::Ident, "x'".to_string()),
                (TokenKind::Ident, "_a9".to_string()),
            ],
        );
    }

    #[test]
    fn string_literal_is_verbatim_without_backticks() {
        let toks = lexemes("`hello world`;");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Str, "hello world".to_string()),
                (TokenKind::Eos, ";".to_string()),
            ],
        );
    }

    #[test]
    fn newline_after_statement_ender_inserts_eos() {
        use TokenKind::*;
        assert_eq!(kinds("x\n"), vec![Ident, Eos, Eof]);
        assert_eq!(kinds("42\n"), vec![Int, Eos, Eof]);
        assert_eq!(kinds(")\n"), vec![RParen, Eos, Eof]);
        assert_eq!(kinds("}\n"), vec![RBrace, Eos, Eof]);
        assert_eq!(kinds("`s`\n"), vec![Str, Eos, Eof]);
    }

    #[test]
    fn newline_after_other_tokens_is_whitespace() {
        use TokenKind::*;
        assert_eq!(kinds("=\n"), vec![Equals, Eof]);
        assert_eq!(kinds(",\nx"), vec![Comma, Ident, Eos, Eof]);
        assert_eq!(kinds("let\nx"), vec![Let, Ident, Eos, Eof]);
    }

    #[test]
    fn end_of_input_counts_as_newline() {
        use TokenKind::*;
        assert_eq!(kinds("42"), vec![Int, Eos, Eof]);
        assert_eq!(kinds("="), vec![Equals, Eof]);
    }

    #[test]
    fn literal_semicolon_before_newline_yields_one_eos() {
        use TokenKind::*;
        // `;` is not a statement-ending kind, so the following newline
        // stays whitespace and no second EOS appears.
        assert_eq!(kinds("x;\n"), vec![Ident, Eos, Eof]);
        assert_eq!(kinds(";\n"), vec![Eos, Eof]);
    }

    #[test]
    fn peek_is_idempotent_and_agrees_with_next() {
        let mut stream = TokenStream::new("let x = 5\n");
        let first = stream.peek().expect("peek");
        let second = stream.peek().expect("peek");
        assert_eq!(first, second);
        let consumed = stream.next().expect("next");
        assert_eq!(first, consumed);
        assert_eq!(consumed.0.kind, TokenKind::Let);
    }

    #[test]
    fn peek_sees_pending_eos() {
        let mut stream = TokenStream::new("x\ny");
        assert_eq!(stream.next().expect("next").0.kind, TokenKind::Ident);
        assert!(stream.peek_is(&[TokenKind::Eos]).expect("peek"));
        assert_eq!(stream.next().expect("next").0.kind, TokenKind::Eos);
        assert_eq!(stream.next().expect("next").0.kind, TokenKind::Ident);
    }

    #[test]
    fn expect_mismatch_is_structured() {
        let mut stream = TokenStream::new("x");
        let err = stream.expect(&[TokenKind::Int]).unwrap_err();
        assert!(matches!(
            err,
            CompileError::ExpectedKind {
                expected: TokenKind::Int,
                got: TokenKind::Ident,
                ..
            }
        ));

        let mut stream = TokenStream::new("x");
        let err = stream
            .expect(&[TokenKind::Int, TokenKind::Str])
            .unwrap_err();
        assert!(matches!(err, CompileError::ExpectedOneOf { .. }));
    }

    #[test]
    fn unexpected_byte_is_a_lex_error() {
        let mut stream = TokenStream::new("let # = 5");
        assert_eq!(stream.next().expect("next").0.kind, TokenKind::Let);
        assert!(matches!(stream.next(), Err(CompileError::Lex { .. })));
    }

    #[test]
    fn unterminated_string_is_a_lex_error() {
        let mut stream = TokenStream::new("`oops");
        assert!(matches!(stream.next(), Err(CompileError::Lex { .. })));
    }

    #[test]
    fn spans_are_monotonic_and_line_aware() {
        let src = "let x = 5\nfunc f() => 1\n";
        let mut stream = TokenStream::new(src);
        let mut previous = Position { line: 1, column: 0 };
        loop {
            let (token, _) = stream.next().expect("lex");
            assert!(token.span.from <= token.span.to, "span inverted: {token:?}");
            assert!(previous <= token.span.from, "tokens out of order: {token:?}");
            previous = token.span.from;
            if token.kind == TokenKind::Eof {
                break;
            }
        }

        // Second line starts at line 2, column 0.
        let mut stream = TokenStream::new(src);
        let func = loop {
            let (token, _) = stream.next().expect("lex");
            if token.kind == TokenKind::Func {
                break token;
            }
        };
        assert_eq!(func.span.from, Position { line: 2, column: 0 });
    }

    #[test]
    fn inserted_eos_sits_at_start_of_next_line() {
        let mut stream = TokenStream::new("x\ny");
        stream.next().expect("ident");
        let (eos, _) = stream.next().expect("eos");
        assert_eq!(eos.kind, TokenKind::Eos);
        assert_eq!(eos.span.from, Position { line: 2, column: 0 });
    }
}
