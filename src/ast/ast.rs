//! The abstract syntax tree — tagged variants for types, literals,
//! expressions, and top-level declarations.

use crate::lexer::Span;

/// A name together with where it was written. Equality is by name only;
/// spans ride along for diagnostics.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Identifier {
        Identifier {
            name: name.into(),
            span,
        }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Identifier) -> bool {
        self.name == other.name
    }
}

impl Eq for Identifier {}

/// A type as written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// A named type reference, resolved by scope lookup.
    Ident(Identifier),
    /// `func(A, B) R` — a function-pointer type; `returns` of `None`
    /// means the function yields nothing.
    FunctionPointer {
        arguments: Vec<Type>,
        returns: Option<Box<Type>>,
    },
    /// `struct { a: A, b: B }` — field order defines the lowered
    /// struct's field indices.
    Struct(Vec<StructField>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub kind: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Str(String),
    /// `P{a: x, b: y}`. Fields keep source order; duplicates are
    /// rejected by the parser.
    StructLiteral {
        name: Identifier,
        fields: Vec<(String, Expression)>,
    },
}

#[derive(Debug, Clone)]
pub enum Expression {
    Lit(Literal),
    /// Read a binding; mutable bindings are loaded.
    Var(Identifier),
    /// `let to = value` — an immutable alias for the value.
    Declaration {
        to: Identifier,
        value: Box<Expression>,
    },
    /// `var to = value` — allocates storage and binds the address.
    MutDeclaration {
        to: Identifier,
        value: Box<Expression>,
    },
    /// `to = value` — write to an existing mutable binding.
    Assignment {
        to: Identifier,
        value: Box<Expression>,
        span: Span,
    },
    /// `of.ident` — the address of a struct field.
    Field {
        of: Box<Expression>,
        ident: Identifier,
    },
    /// `of.field = value` — write through a field.
    FieldAssignment {
        of: Box<Expression>,
        field: Identifier,
        value: Box<Expression>,
        span: Span,
    },
    Call {
        function: Identifier,
        arguments: Vec<Expression>,
    },
    /// Statements in order in a new scope; the value is the last one's.
    Block(Vec<Expression>),
    /// Expression-level branch; both arms must yield the same type.
    If {
        condition: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },
    /// `new expr` — reserved for the heap model.
    Allocation(Box<Expression>),
    /// `delete expr` — reserved for the heap model.
    Freeing(Box<Expression>),
}

/// Equality up to positions: the spans carried for diagnostics do not
/// take part.
impl PartialEq for Expression {
    fn eq(&self, other: &Expression) -> bool {
        use Expression::*;
        match (self, other) {
            (Lit(a), Lit(b)) => a == b,
            (Var(a), Var(b)) => a == b,
            (
                Declaration { to: a, value: av },
                Declaration { to: b, value: bv },
            )
            | (
                MutDeclaration { to: a, value: av },
                MutDeclaration { to: b, value: bv },
            )
            | (
                Assignment { to: a, value: av, .. },
                Assignment { to: b, value: bv, .. },
            ) => a == b && av == bv,
            (Field { of: a, ident: ai }, Field { of: b, ident: bi }) => a == b && ai == bi,
            (
                FieldAssignment {
                    of: a,
                    field: af,
                    value: av,
                    ..
                },
                FieldAssignment {
                    of: b,
                    field: bf,
                    value: bv,
                    ..
                },
            ) => a == b && af == bf && av == bv,
            (
                Call {
                    function: a,
                    arguments: aa,
                },
                Call {
                    function: b,
                    arguments: ba,
                },
            ) => a == b && aa == ba,
            (Block(a), Block(b)) => a == b,
            (
                If {
                    condition: ac,
                    then: at,
                    otherwise: ao,
                },
                If {
                    condition: bc,
                    then: bt,
                    otherwise: bo,
                },
            ) => ac == bc && at == bt && ao == bo,
            (Allocation(a), Allocation(b)) | (Freeing(a), Freeing(b)) => a == b,
            _ => false,
        }
    }
}

impl Expression {
    /// Best-effort source location for diagnostics on nodes that do not
    /// carry their own span.
    pub fn span(&self) -> Span {
        match self {
            Expression::Lit(Literal::StructLiteral { name, .. }) => name.span,
            Expression::Var(ident) => ident.span,
            Expression::Declaration { to, .. } | Expression::MutDeclaration { to, .. } => to.span,
            Expression::Assignment { span, .. } | Expression::FieldAssignment { span, .. } => *span,
            Expression::Field { ident, .. } => ident.span,
            Expression::Call { function, .. } => function.span,
            Expression::If { condition, .. } => condition.span(),
            Expression::Allocation(inner) | Expression::Freeing(inner) => inner.span(),
            _ => Span::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TopLevel {
    Func {
        ident: Identifier,
        arguments: Vec<(Identifier, Type)>,
        returns: Option<Type>,
        body: Expression,
    },
    Import(String),
    TypeDeclaration { ident: Identifier, kind: Type },
}

/// One compilation unit's worth of top-level declarations. `build`
/// appends every source file in the module into a single AST.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ast {
    pub toplevels: Vec<TopLevel>,
}
