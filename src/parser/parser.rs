//! Recursive-descent parser for the Tawa language.
//!
//! Grammar:
//! ```text
//! unit      = (import | typedecl | funcdef)* EOF
//! import    = "import" STRING EOS
//! typedecl  = "type" IDENT "=" type EOS
//! funcdef   = "func" IDENT "(" (IDENT ":" type ("," IDENT ":" type)*)? ")"
//!             type? ("=>" expr | block) EOS
//! type      = IDENT
//!           | "func" "(" (type ("," type)*)? ")" type?
//!           | "struct" "{" (IDENT ":" type (EOS | ","))* "}"
//! block     = "{" (EOS* expr (EOS | &"}"))* "}"
//! expr      = leaf ("." IDENT ("=" expr)?)?
//! leaf      = INT | STRING | "if" expr "then" expr "else" expr
//!           | block | "let" IDENT "=" expr | "var" IDENT "=" expr
//!           | "new" expr | "delete" expr | ident-leaf
//! ident-leaf= IDENT "(" args ")"          -- call
//!           | IDENT "=" expr              -- assignment
//!           | IDENT "{" fields "}"        -- struct literal
//!           | IDENT                       -- variable read
//! ```
//!
//! Failures are structured [`CompileError`]s carrying the expected and
//! actual token kinds plus a span; they unwind to [`Parser::parse`] and
//! are returned to the caller.

use crate::ast::{Ast, Expression, Identifier, Literal, StructField, TopLevel, Type};
use crate::errors::CompileError;
use crate::lexer::{Span, TokenStream, TokenKind};

/// Kinds that can begin a type.
const TYPE_START: &[TokenKind] = &[TokenKind::Ident, TokenKind::Func, TokenKind::Struct];

pub struct Parser<'src> {
    lexer: TokenStream<'src>,
    ast: Ast,
}

impl<'src> Parser<'src> {
    pub fn new(lexer: TokenStream<'src>) -> Self {
        Parser {
            lexer,
            ast: Ast::default(),
        }
    }

    /// Parse one file's worth of top-level declarations.
    pub fn parse(mut self) -> Result<Ast, CompileError> {
        loop {
            let (token, _) = self.lexer.next()?;
            match token.kind {
                TokenKind::Eof => return Ok(self.ast),
                TokenKind::Import => self.parse_import()?,
                TokenKind::Type => self.parse_type_declaration()?,
                TokenKind::Func => self.parse_function()?,
                // Anything else at the top level is skipped.
                _ => {}
            }
        }
    }

    // ── top-level forms ─────────────────────────────────────────────

    fn parse_import(&mut self) -> Result<(), CompileError> {
        let (_, path) = self.lexer.expect(&[TokenKind::Str])?;
        self.lexer.expect(&[TokenKind::Eos])?;
        self.ast.toplevels.push(TopLevel::Import(path));
        Ok(())
    }

    fn parse_type_declaration(&mut self) -> Result<(), CompileError> {
        let (token, name) = self.lexer.expect(&[TokenKind::Ident])?;
        let ident = Identifier::new(name, token.span);
        self.lexer.expect(&[TokenKind::Equals])?;
        let kind = self.parse_type()?;
        self.lexer.expect(&[TokenKind::Eos])?;
        self.ast
            .toplevels
            .push(TopLevel::TypeDeclaration { ident, kind });
        Ok(())
    }

    fn parse_function(&mut self) -> Result<(), CompileError> {
        let (token, name) = self.lexer.expect(&[TokenKind::Ident])?;
        let ident = Identifier::new(name, token.span);

        self.lexer.expect(&[TokenKind::LParen])?;
        let mut arguments = Vec::new();
        while !self.lexer.peek_is(&[TokenKind::RParen])? {
            let (token, name) = self.lexer.expect(&[TokenKind::Ident])?;
            self.lexer.expect(&[TokenKind::Colon])?;
            let kind = self.parse_type()?;
            arguments.push((Identifier::new(name, token.span), kind));

            if self.lexer.peek_is(&[TokenKind::Comma])? {
                self.lexer.next()?;
            }
        }
        self.lexer.expect(&[TokenKind::RParen])?;

        let returns = if self.lexer.peek_is(TYPE_START)? {
            Some(self.parse_type()?)
        } else {
            None
        };

        let (opener, _) = self.lexer.expect(&[TokenKind::FatArrow, TokenKind::LBrace])?;
        let body = match opener.kind {
            TokenKind::FatArrow => self.parse_expression()?,
            _ => self.parse_block()?,
        };
        self.lexer.expect(&[TokenKind::Eos])?;

        self.ast.toplevels.push(TopLevel::Func {
            ident,
            arguments,
            returns,
            body,
        });
        Ok(())
    }

    // ── types ───────────────────────────────────────────────────────

    fn parse_type(&mut self) -> Result<Type, CompileError> {
        let (token, lexeme) = self.lexer.expect(TYPE_START)?;
        match token.kind {
            TokenKind::Ident => Ok(Type::Ident(Identifier::new(lexeme, token.span))),
            TokenKind::Func => self.parse_function_pointer_type(),
            _ => self.parse_struct_type(),
        }
    }

    fn parse_function_pointer_type(&mut self) -> Result<Type, CompileError> {
        self.lexer.expect(&[TokenKind::LParen])?;
        let mut arguments = Vec::new();
        while !self.lexer.peek_is(&[TokenKind::RParen])? {
            arguments.push(self.parse_type()?);
            if self.lexer.peek_is(&[TokenKind::Comma])? {
                self.lexer.next()?;
            }
        }
        self.lexer.expect(&[TokenKind::RParen])?;

        // A return type is present iff the next token can begin a type.
        let returns = if self.lexer.peek_is(TYPE_START)? {
            Some(Box::new(self.parse_type()?))
        } else {
            None
        };

        Ok(Type::FunctionPointer { arguments, returns })
    }

    fn parse_struct_type(&mut self) -> Result<Type, CompileError> {
        self.lexer.expect(&[TokenKind::LBrace])?;
        let mut fields = Vec::new();
        loop {
            if self.lexer.peek_is(&[TokenKind::Eos])? {
                self.lexer.next()?;
                continue;
            }
            if self.lexer.peek_is(&[TokenKind::RBrace])? {
                self.lexer.next()?;
                break;
            }

            let (_, name) = self.lexer.expect(&[TokenKind::Ident])?;
            self.lexer.expect(&[TokenKind::Colon])?;
            let kind = self.parse_type()?;
            fields.push(StructField { name, kind });

            // Members are separated by `,` or a statement terminator;
            // trailing separators are fine.
            if self.lexer.peek_is(&[TokenKind::Comma, TokenKind::Eos])? {
                self.lexer.next()?;
            }
        }
        Ok(Type::Struct(fields))
    }

    // ── expressions ─────────────────────────────────────────────────

    /// Parse a leaf expression and apply the single postfix field step.
    fn parse_expression(&mut self) -> Result<Expression, CompileError> {
        let leaf = self.parse_leaf()?;

        if !self.lexer.peek_is(&[TokenKind::Period])? {
            return Ok(leaf);
        }
        self.lexer.next()?;
        let (token, name) = self.lexer.expect(&[TokenKind::Ident])?;
        let field = Identifier::new(name, token.span);

        if self.lexer.peek_is(&[TokenKind::Equals])? {
            self.lexer.next()?;
            let from = leaf.span().from;
            let value = self.parse_expression()?;
            let span = Span {
                from,
                to: self.lexer.pos(),
            };
            return Ok(Expression::FieldAssignment {
                of: Box::new(leaf),
                field,
                value: Box::new(value),
                span,
            });
        }

        Ok(Expression::Field {
            of: Box::new(leaf),
            ident: field,
        })
    }

    fn parse_leaf(&mut self) -> Result<Expression, CompileError> {
        let (token, lexeme) = self.lexer.expect(&[
            TokenKind::Int,
            TokenKind::Str,
            TokenKind::Ident,
            TokenKind::If,
            TokenKind::LBrace,
            TokenKind::Let,
            TokenKind::Var,
            TokenKind::New,
            TokenKind::Delete,
        ])?;

        match token.kind {
            TokenKind::Int => {
                let value = lexeme.parse::<i64>().map_err(|_| CompileError::Lex {
                    lexeme,
                    span: token.span,
                })?;
                Ok(Expression::Lit(Literal::Integer(value)))
            }
            TokenKind::Str => Ok(Expression::Lit(Literal::Str(lexeme))),
            TokenKind::If => {
                let condition = self.parse_expression()?;
                self.lexer.expect(&[TokenKind::Then])?;
                let then = self.parse_expression()?;
                self.lexer.expect(&[TokenKind::Else])?;
                let otherwise = self.parse_expression()?;
                Ok(Expression::If {
                    condition: Box::new(condition),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                })
            }
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Let | TokenKind::Var => {
                let (name_token, name) = self.lexer.expect(&[TokenKind::Ident])?;
                let to = Identifier::new(name, name_token.span);
                self.lexer.expect(&[TokenKind::Equals])?;
                let value = Box::new(self.parse_expression()?);
                Ok(match token.kind {
                    TokenKind::Let => Expression::Declaration { to, value },
                    _ => Expression::MutDeclaration { to, value },
                })
            }
            TokenKind::New => Ok(Expression::Allocation(Box::new(self.parse_expression()?))),
            TokenKind::Delete => Ok(Expression::Freeing(Box::new(self.parse_expression()?))),
            _ => self.parse_ident_leaf(Identifier::new(lexeme, token.span)),
        }
    }

    /// Disambiguate what follows an identifier: a call, an assignment,
    /// a struct literal, or a plain variable read.
    fn parse_ident_leaf(&mut self, ident: Identifier) -> Result<Expression, CompileError> {
        let (next, _) = self.lexer.peek()?;
        match next.kind {
            TokenKind::LParen => {
                self.lexer.next()?;
                let arguments = self.parse_argument_list()?;
                Ok(Expression::Call {
                    function: ident,
                    arguments,
                })
            }
            TokenKind::Equals => {
                self.lexer.next()?;
                let from = ident.span.from;
                let value = Box::new(self.parse_expression()?);
                let span = Span {
                    from,
                    to: self.lexer.pos(),
                };
                Ok(Expression::Assignment {
                    to: ident,
                    value,
                    span,
                })
            }
            TokenKind::LBrace => {
                self.lexer.next()?;
                let fields = self.parse_struct_literal_fields()?;
                Ok(Expression::Lit(Literal::StructLiteral {
                    name: ident,
                    fields,
                }))
            }
            _ => Ok(Expression::Var(ident)),
        }
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expression>, CompileError> {
        let mut arguments = Vec::new();
        while !self.lexer.peek_is(&[TokenKind::RParen])? {
            arguments.push(self.parse_expression()?);
            if self.lexer.peek_is(&[TokenKind::Comma])? {
                self.lexer.next()?;
            }
        }
        self.lexer.expect(&[TokenKind::RParen])?;
        Ok(arguments)
    }

    /// The opening `{` has been consumed.
    fn parse_struct_literal_fields(
        &mut self,
    ) -> Result<Vec<(String, Expression)>, CompileError> {
        let mut fields: Vec<(String, Expression)> = Vec::new();
        loop {
            if self.lexer.peek_is(&[TokenKind::Eos])? {
                self.lexer.next()?;
                continue;
            }
            if self.lexer.peek_is(&[TokenKind::RBrace])? {
                self.lexer.next()?;
                break;
            }

            let (token, name) = self.lexer.expect(&[TokenKind::Ident])?;
            if fields.iter().any(|(existing, _)| *existing == name) {
                return Err(CompileError::DuplicateField {
                    name,
                    span: token.span,
                });
            }
            self.lexer.expect(&[TokenKind::Colon])?;
            let value = self.parse_expression()?;
            fields.push((name, value));

            if self.lexer.peek_is(&[TokenKind::Comma, TokenKind::Eos])? {
                self.lexer.next()?;
            }
        }
        Ok(fields)
    }

    /// The opening `{` has been consumed. Empty statements are skipped;
    /// the block's value is its last expression's.
    fn parse_block(&mut self) -> Result<Expression, CompileError> {
        let mut statements = Vec::new();
        loop {
            while self.lexer.peek_is(&[TokenKind::Eos])? {
                self.lexer.next()?;
            }
            if self.lexer.peek_is(&[TokenKind::RBrace])? {
                self.lexer.next()?;
                break;
            }

            statements.push(self.parse_expression()?);

            // Each statement ends with a terminator or the closing brace.
            let (token, _) = self.lexer.peek()?;
            match token.kind {
                TokenKind::Eos => {
                    self.lexer.next()?;
                }
                TokenKind::RBrace => {}
                got => {
                    return Err(CompileError::ExpectedOneOf {
                        expected: vec![TokenKind::Eos, TokenKind::RBrace],
                        got,
                        span: token.span,
                    });
                }
            }
        }
        Ok(Expression::Block(statements))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::printer;

    fn parse(src: &str) -> Ast {
        Parser::new(TokenStream::new(src))
            .parse()
            .expect("parse failure")
    }

    fn parse_err(src: &str) -> CompileError {
        Parser::new(TokenStream::new(src))
            .parse()
            .expect_err("expected a parse failure")
    }

    fn ident(name: &str) -> Identifier {
        Identifier::new(name, Span::default())
    }

    #[test]
    fn imports() {
        let ast = parse("import `ok`;");
        assert_eq!(ast.toplevels, vec![TopLevel::Import("ok".to_string())]);
    }

    #[test]
    fn single_expression_function() {
        let ast = parse("func main() => 42\n");
        assert_eq!(
            ast.toplevels,
            vec![TopLevel::Func {
                ident: ident("main"),
                arguments: vec![],
                returns: None,
                body: Expression::Lit(Literal::Integer(42)),
            }],
        );
    }

    #[test]
    fn function_with_arguments_and_return_type() {
        let ast = parse("func add(a: int64, b: int64) int64 => a\n");
        assert_eq!(
            ast.toplevels,
            vec![TopLevel::Func {
                ident: ident("add"),
                arguments: vec![
                    (ident("a"), Type::Ident(ident("int64"))),
                    (ident("b"), Type::Ident(ident("int64"))),
                ],
                returns: Some(Type::Ident(ident("int64"))),
                body: Expression::Var(ident("a")),
            }],
        );
    }

    #[test]
    fn struct_type_declaration() {
        let ast = parse("type P = struct { x: int64, y: int64 }\n");
        assert_eq!(
            ast.toplevels,
            vec![TopLevel::TypeDeclaration {
                ident: ident("P"),
                kind: Type::Struct(vec![
                    StructField {
                        name: "x".to_string(),
                        kind: Type::Ident(ident("int64")),
                    },
                    StructField {
                        name: "y".to_string(),
                        kind: Type::Ident(ident("int64")),
                    },
                ]),
            }],
        );
    }

    #[test]
    fn struct_members_split_over_lines() {
        let one_line = parse("type P = struct { x: int64, y: bool }\n");
        let multi_line = parse("type P = struct {\n x: int64\n y: bool\n}\n");
        assert_eq!(one_line, multi_line);
    }

    #[test]
    fn function_pointer_type() {
        let ast = parse("type F = func(int64, bool) int64\ntype G = func()\n");
        assert_eq!(
            ast.toplevels,
            vec![
                TopLevel::TypeDeclaration {
                    ident: ident("F"),
                    kind: Type::FunctionPointer {
                        arguments: vec![
                            Type::Ident(ident("int64")),
                            Type::Ident(ident("bool")),
                        ],
                        returns: Some(Box::new(Type::Ident(ident("int64")))),
                    },
                },
                TopLevel::TypeDeclaration {
                    ident: ident("G"),
                    kind: Type::FunctionPointer {
                        arguments: vec![],
                        returns: None,
                    },
                },
            ],
        );
    }

    #[test]
    fn block_body_with_declarations() {
        let ast = parse("func main() { var p = 1; p = 2 }\n");
        assert_eq!(
            ast.toplevels,
            vec![TopLevel::Func {
                ident: ident("main"),
                arguments: vec![],
                returns: None,
                body: Expression::Block(vec![
                    Expression::MutDeclaration {
                        to: ident("p"),
                        value: Box::new(Expression::Lit(Literal::Integer(1))),
                    },
                    Expression::Assignment {
                        to: ident("p"),
                        value: Box::new(Expression::Lit(Literal::Integer(2))),
                        span: Span::default(),
                    },
                ]),
            }],
        );
    }

    #[test]
    fn empty_statements_are_skipped() {
        let ast = parse("func main() { ;; 1 ;; }\n");
        assert_eq!(
            ast.toplevels,
            vec![TopLevel::Func {
                ident: ident("main"),
                arguments: vec![],
                returns: None,
                body: Expression::Block(vec![Expression::Lit(Literal::Integer(1))]),
            }],
        );
    }

    #[test]
    fn struct_literal_and_field_assignment() {
        let ast = parse("func main() { var p = P{x: 1, y: 2}; p.x = 5 }\n");
        assert_eq!(
            ast.toplevels,
            vec![TopLevel::Func {
                ident: ident("main"),
                arguments: vec![],
                returns: None,
                body: Expression::Block(vec![
                    Expression::MutDeclaration {
                        to: ident("p"),
                        value: Box::new(Expression::Lit(Literal::StructLiteral {
                            name: ident("P"),
                            fields: vec![
                                ("x".to_string(), Expression::Lit(Literal::Integer(1))),
                                ("y".to_string(), Expression::Lit(Literal::Integer(2))),
                            ],
                        })),
                    },
                    Expression::FieldAssignment {
                        of: Box::new(Expression::Var(ident("p"))),
                        field: ident("x"),
                        value: Box::new(Expression::Lit(Literal::Integer(5))),
                        span: Span::default(),
                    },
                ]),
            }],
        );
    }

    #[test]
    fn field_access_without_assignment() {
        let ast = parse("func f() => p.x\n");
        assert_eq!(
            ast.toplevels,
            vec![TopLevel::Func {
                ident: ident("f"),
                arguments: vec![],
                returns: None,
                body: Expression::Field {
                    of: Box::new(Expression::Var(ident("p"))),
                    ident: ident("x"),
                },
            }],
        );
    }

    #[test]
    fn duplicate_struct_literal_field_is_rejected() {
        let err = parse_err("func main() => P{x: 1, x: 2}\n");
        assert!(matches!(
            err,
            CompileError::DuplicateField { ref name, .. } if name == "x"
        ));
    }

    #[test]
    fn if_then_else() {
        let ast = parse("func f() => if c then 1 else 2\n");
        assert_eq!(
            ast.toplevels,
            vec![TopLevel::Func {
                ident: ident("f"),
                arguments: vec![],
                returns: None,
                body: Expression::If {
                    condition: Box::new(Expression::Var(ident("c"))),
                    then: Box::new(Expression::Lit(Literal::Integer(1))),
                    otherwise: Box::new(Expression::Lit(Literal::Integer(2))),
                },
            }],
        );
    }

    #[test]
    fn calls_with_arguments() {
        let ast = parse("func f() => g(1, `two`, h())\n");
        assert_eq!(
            ast.toplevels,
            vec![TopLevel::Func {
                ident: ident("f"),
                arguments: vec![],
                returns: None,
                body: Expression::Call {
                    function: ident("g"),
                    arguments: vec![
                        Expression::Lit(Literal::Integer(1)),
                        Expression::Lit(Literal::Str("two".to_string())),
                        Expression::Call {
                            function: ident("h"),
                            arguments: vec![],
                        },
                    ],
                },
            }],
        );
    }

    #[test]
    fn new_and_delete_parse() {
        let ast = parse("func f() { new x; delete x }\n");
        assert_eq!(
            ast.toplevels,
            vec![TopLevel::Func {
                ident: ident("f"),
                arguments: vec![],
                returns: None,
                body: Expression::Block(vec![
                    Expression::Allocation(Box::new(Expression::Var(ident("x")))),
                    Expression::Freeing(Box::new(Expression::Var(ident("x")))),
                ]),
            }],
        );
    }

    #[test]
    fn assignment_span_covers_target_through_value() {
        let ast = parse("func f() { a = 12345 }\n");
        let TopLevel::Func { body, .. } = &ast.toplevels[0] else {
            panic!("expected a function");
        };
        let Expression::Block(statements) = body else {
            panic!("expected a block body");
        };
        let Expression::Assignment { span, .. } = &statements[0] else {
            panic!("expected an assignment");
        };
        assert!(span.from < span.to);
    }

    #[test]
    fn malformed_input_reports_expected_kinds() {
        let err = parse_err("import 5;");
        assert!(matches!(
            err,
            CompileError::ExpectedKind {
                expected: TokenKind::Str,
                got: TokenKind::Int,
                ..
            }
        ));

        let err = parse_err("func f() => )\n");
        assert!(matches!(err, CompileError::ExpectedOneOf { .. }));
    }

    #[test]
    fn printer_round_trips() {
        let sources = [
            "import `dep`;",
            "type P = struct { x: int64, y: string }\n",
            "type F = func(int64) int64\n",
            "func main() => 42\n",
            "func f(a: int64) int64 => if a then 1 else 2\n",
            "func g() { var p = P{x: 1, y: `s`}; p.x = 5; print(`done`) }\n",
            "func h() { let q = {\n 1\n 2\n }; q }\n",
        ];
        for src in sources {
            let once = printer::print(&parse(src));
            let twice = printer::print(&parse(&once));
            assert_eq!(once, twice, "printer not a fixpoint for {src:?}");
        }
    }
}
