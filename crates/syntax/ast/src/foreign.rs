use std::borrow::Cow;

use crate::span::Span;
use crate::tree::UpdateOp;
use crate::types::Constant;

/// A method body written in the foreign target language and embedded verbatim, with the
/// symbolic references into the host program parsed out.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignFn<'src> {
    pub params: Vec<Cow<'src, str>>,
    pub body: Vec<ForeignStmt<'src>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForeignStmt<'src> {
    Expr(ForeignExpr<'src>),
    Var {
        name: Cow<'src, str>,
        init: Option<ForeignExpr<'src>>,
    },
    Return(Option<ForeignExpr<'src>>),
    Verbatim(Cow<'src, str>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForeignExpr<'src> {
    NameRef(NameRef<'src>),
    Assign {
        target: Box<ForeignExpr<'src>>,
        value: Box<ForeignExpr<'src>>,
    },
    Update {
        op: UpdateOp,
        is_prefix: bool,
        target: Box<ForeignExpr<'src>>,
    },
    Call {
        callee: Box<ForeignExpr<'src>>,
        args: Vec<ForeignExpr<'src>>,
    },
    Literal(Constant<'src>),
    Verbatim(Cow<'src, str>),
}

/// A name in the foreign body, optionally qualified by a receiver expression.
///
/// Names starting with `@` are symbolic references of the form `@Class::member` or
/// `@Class::method(Signature)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NameRef<'src> {
    pub ident: Cow<'src, str>,
    pub qualifier: Option<Box<ForeignExpr<'src>>>,
    pub span: Span,
}

impl NameRef<'_> {
    #[inline]
    pub fn is_host_ref(&self) -> bool {
        self.ident.starts_with('@')
    }
}
