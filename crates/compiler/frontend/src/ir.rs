use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;

use jolt_ast::{self as ast, FieldId, LocalId, MethodId, Span, Type, TypeId};
use strum::Display;

use crate::program::{Body, Literal, Program};
use crate::utils::{indent, sep_by};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LiteralId(u32);

impl LiteralId {
    #[inline]
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A label of the enclosing method body, shared by the labeled statement and every jump to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(u16);

impl LabelId {
    #[inline]
    pub(crate) fn new(index: u16) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Box<Expr>),
    Block(Block, Span),
    Decl {
        place: Box<Expr>,
        init: Option<Box<Expr>>,
        span: Span,
    },
    If {
        cond: Box<Expr>,
        then: Option<Box<Self>>,
        else_: Option<Box<Self>>,
        span: Span,
    },
    While {
        cond: Box<Expr>,
        body: Option<Box<Self>>,
        span: Span,
    },
    DoWhile {
        body: Option<Box<Self>>,
        cond: Box<Expr>,
        span: Span,
    },
    For {
        init: Vec<Self>,
        cond: Option<Box<Expr>>,
        update: Vec<Expr>,
        body: Option<Box<Self>>,
        span: Span,
    },
    Switch {
        selector: Box<Expr>,
        body: Block,
        span: Span,
    },
    Case(Option<Box<Expr>>, Span),
    Labeled {
        label: LabelId,
        body: Box<Self>,
        span: Span,
    },
    Break(Option<LabelId>, Span),
    Continue(Option<LabelId>, Span),
    Return(Option<Box<Expr>>, Span),
    Throw(Box<Expr>, Span),
    Try {
        body: Block,
        catches: Vec<Catch>,
        finally: Option<Block>,
        span: Span,
    },
    Assert {
        cond: Box<Expr>,
        message: Option<Box<Expr>>,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(expr) => expr.span(),
            Self::Block(_, span)
            | Self::Decl { span, .. }
            | Self::If { span, .. }
            | Self::While { span, .. }
            | Self::DoWhile { span, .. }
            | Self::For { span, .. }
            | Self::Switch { span, .. }
            | Self::Case(_, span)
            | Self::Labeled { span, .. }
            | Self::Break(_, span)
            | Self::Continue(_, span)
            | Self::Return(_, span)
            | Self::Throw(_, span)
            | Self::Try { span, .. }
            | Self::Assert { span, .. } => *span,
        }
    }

    /// Whether control never flows past this statement.
    pub fn unconditional_control_break(&self) -> bool {
        match self {
            Self::Return(_, _) | Self::Throw(_, _) | Self::Break(_, _) | Self::Continue(_, _) => {
                true
            }
            Self::Block(block, _) => block.unconditional_control_break(),
            _ => false,
        }
    }
}

impl From<Expr> for Stmt {
    #[inline]
    fn from(expr: Expr) -> Self {
        Self::Expr(Box::new(expr))
    }
}

#[derive(Debug, Clone)]
pub struct Catch {
    pub local: LocalId,
    pub body: Block,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: VecDeque<Stmt>,
}

impl Block {
    #[inline]
    pub fn new(stmts: impl Into<VecDeque<Stmt>>) -> Self {
        Self {
            stmts: stmts.into(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        let fst = self.stmts.front()?;
        let lst = self.stmts.back()?;
        Some(fst.span().merge(&lst.span()))
    }

    pub fn unconditional_control_break(&self) -> bool {
        self.stmts.iter().any(Stmt::unconditional_control_break)
    }

    pub(crate) fn push_prologue(
        &mut self,
        iter: impl IntoIterator<IntoIter = impl DoubleEndedIterator<Item = Stmt>>,
    ) {
        for stmt in iter.into_iter().rev() {
            self.stmts.push_front(stmt);
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(LiteralId, Span),
    This(TypeId, Span),
    Local(LocalId, Span),
    Param(u16, Span),
    Field {
        receiver: Option<Box<Self>>,
        field: FieldId,
        span: Span,
    },
    ArrayRef {
        array: Box<Self>,
        index: Box<Self>,
        span: Span,
    },
    Call {
        call: Box<Call>,
        span: Span,
    },
    /// An uninitialized instance, always the receiver of a constructor call.
    NewInstance(TypeId, Span),
    NewArray {
        ty: Type,
        dims: Vec<Option<Self>>,
        span: Span,
    },
    ArrayInit {
        ty: Type,
        elems: Vec<Self>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Self>,
        rhs: Box<Self>,
        span: Span,
    },
    Unary {
        op: ast::UnOp,
        operand: Box<Self>,
        span: Span,
    },
    Prefix {
        op: ast::UpdateOp,
        target: Box<Self>,
        span: Span,
    },
    Postfix {
        op: ast::UpdateOp,
        target: Box<Self>,
        span: Span,
    },
    Cast {
        expr: Box<Self>,
        ty: Type,
        span: Span,
    },
    InstanceOf {
        expr: Box<Self>,
        ty: Type,
        span: Span,
    },
    Conditional {
        cond: Box<Self>,
        then: Box<Self>,
        else_: Box<Self>,
        span: Span,
    },
    /// A foreign-language object literal keyed by string literals.
    ObjectLiteral {
        entries: Vec<(LiteralId, Self)>,
        span: Span,
    },
}

impl Expr {
    pub fn call(call: impl Into<Call>, span: Span) -> Self {
        Self::Call {
            call: Box::new(call.into()),
            span,
        }
    }

    pub fn field(receiver: Option<Self>, field: FieldId, span: Span) -> Self {
        Self::Field {
            receiver: receiver.map(Box::new),
            field,
            span,
        }
    }

    pub fn binary(op: BinaryOp, lhs: Self, rhs: Self, span: Span) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span,
        }
    }

    pub fn assign(place: Self, value: Self, span: Span) -> Self {
        Self::binary(BinaryOp::Assign, place, value, span)
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Literal(_, span)
            | Self::This(_, span)
            | Self::Local(_, span)
            | Self::Param(_, span)
            | Self::NewInstance(_, span)
            | Self::Field { span, .. }
            | Self::ArrayRef { span, .. }
            | Self::Call { span, .. }
            | Self::NewArray { span, .. }
            | Self::ArrayInit { span, .. }
            | Self::Binary { span, .. }
            | Self::Unary { span, .. }
            | Self::Prefix { span, .. }
            | Self::Postfix { span, .. }
            | Self::Cast { span, .. }
            | Self::InstanceOf { span, .. }
            | Self::Conditional { span, .. }
            | Self::ObjectLiteral { span, .. } => *span,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Self::Call { call, .. } => Some(call),
            _ => None,
        }
    }

    fn needs_parens(&self) -> bool {
        matches!(
            self,
            Self::Binary { .. }
                | Self::Conditional { .. }
                | Self::Cast { .. }
                | Self::InstanceOf { .. }
                | Self::Unary { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub receiver: Option<Box<Expr>>,
    pub method: MethodId,
    pub args: Vec<Expr>,
    /// Set for `super` calls, which must not dispatch polymorphically.
    pub static_dispatch: bool,
}

impl Call {
    #[inline]
    pub fn new(receiver: Option<Expr>, method: MethodId, args: Vec<Expr>) -> Self {
        Self {
            receiver: receiver.map(Box::new),
            method,
            args,
            static_dispatch: false,
        }
    }

    #[inline]
    pub fn static_(method: MethodId, args: Vec<Expr>) -> Self {
        Self::new(None, method, args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "+")]
    Concat,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "<<")]
    Shl,
    #[strum(serialize = ">>")]
    Shr,
    #[strum(serialize = ">>>")]
    ShrU,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "^")]
    BitXor,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "+=")]
    AssignAdd,
    #[strum(serialize = "+=")]
    AssignConcat,
    #[strum(serialize = "-=")]
    AssignSub,
    #[strum(serialize = "*=")]
    AssignMul,
    #[strum(serialize = "/=")]
    AssignDiv,
    #[strum(serialize = "%=")]
    AssignMod,
    #[strum(serialize = "<<=")]
    AssignShl,
    #[strum(serialize = ">>=")]
    AssignShr,
    #[strum(serialize = ">>>=")]
    AssignShrU,
    #[strum(serialize = "&=")]
    AssignBitAnd,
    #[strum(serialize = "|=")]
    AssignBitOr,
    #[strum(serialize = "^=")]
    AssignBitXor,
}

impl BinaryOp {
    /// Maps a source operator, `+` becoming concatenation when the result is a string.
    pub fn from_source(op: ast::BinOp, is_string: bool) -> Self {
        match op {
            ast::BinOp::Add if is_string => Self::Concat,
            ast::BinOp::Add => Self::Add,
            ast::BinOp::Sub => Self::Sub,
            ast::BinOp::Mul => Self::Mul,
            ast::BinOp::Div => Self::Div,
            ast::BinOp::Mod => Self::Mod,
            ast::BinOp::Shl => Self::Shl,
            ast::BinOp::Shr => Self::Shr,
            ast::BinOp::ShrU => Self::ShrU,
            ast::BinOp::BitAnd => Self::BitAnd,
            ast::BinOp::BitOr => Self::BitOr,
            ast::BinOp::BitXor => Self::BitXor,
            ast::BinOp::And => Self::And,
            ast::BinOp::Or => Self::Or,
            ast::BinOp::Eq => Self::Eq,
            ast::BinOp::Ne => Self::Ne,
            ast::BinOp::Lt => Self::Lt,
            ast::BinOp::Le => Self::Le,
            ast::BinOp::Gt => Self::Gt,
            ast::BinOp::Ge => Self::Ge,
        }
    }

    /// Maps a compound assignment operator, returning `None` for operators that have none.
    pub fn compound(op: ast::BinOp, is_string: bool) -> Option<Self> {
        let res = match op {
            ast::BinOp::Add if is_string => Self::AssignConcat,
            ast::BinOp::Add => Self::AssignAdd,
            ast::BinOp::Sub => Self::AssignSub,
            ast::BinOp::Mul => Self::AssignMul,
            ast::BinOp::Div => Self::AssignDiv,
            ast::BinOp::Mod => Self::AssignMod,
            ast::BinOp::Shl => Self::AssignShl,
            ast::BinOp::Shr => Self::AssignShr,
            ast::BinOp::ShrU => Self::AssignShrU,
            ast::BinOp::BitAnd => Self::AssignBitAnd,
            ast::BinOp::BitOr => Self::AssignBitOr,
            ast::BinOp::BitXor => Self::AssignBitXor,
            _ => return None,
        };
        Some(res)
    }
}

/// A host member referenced from a foreign-language body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignTarget {
    Field(FieldId),
    Method(MethodId),
    NullField,
    NullMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignRef<'ctx> {
    pub ident: Cow<'ctx, str>,
    pub target: ForeignTarget,
    pub is_lvalue: bool,
    pub span: Span,
}

pub(crate) struct MethodPrinter<'a, 'ctx> {
    program: &'a Program<'ctx>,
    method: MethodId,
}

impl<'a, 'ctx> MethodPrinter<'a, 'ctx> {
    pub(crate) fn new(program: &'a Program<'ctx>, method: MethodId) -> Self {
        Self { program, method }
    }

    fn body(&self) -> &'a Body<'ctx> {
        self.program[self.method].body()
    }

    fn block(&self, f: &mut fmt::Formatter<'_>, block: &Block, level: usize) -> fmt::Result {
        if block.stmts.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{\n")?;
        for stmt in &block.stmts {
            write!(f, "{}", indent(level + 1))?;
            self.stmt(f, stmt, level + 1)?;
            f.write_str("\n")?;
        }
        write!(f, "{}}}", indent(level))
    }

    /// Prints a switch body with the statements of each case indented under its label.
    fn switch_body(&self, f: &mut fmt::Formatter<'_>, body: &Block, level: usize) -> fmt::Result {
        if body.stmts.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{\n")?;
        let mut in_case = false;
        for stmt in &body.stmts {
            in_case |= matches!(stmt, Stmt::Case(_, _));
            let depth = if in_case && !matches!(stmt, Stmt::Case(_, _)) {
                level + 2
            } else {
                level + 1
            };
            write!(f, "{}", indent(depth))?;
            self.stmt(f, stmt, depth)?;
            f.write_str("\n")?;
        }
        write!(f, "{}}}", indent(level))
    }

    fn opt_stmt(
        &self,
        f: &mut fmt::Formatter<'_>,
        stmt: Option<&Stmt>,
        level: usize,
    ) -> fmt::Result {
        match stmt {
            Some(stmt) => self.stmt(f, stmt, level),
            None => f.write_str(";"),
        }
    }

    fn label(&self, label: LabelId) -> &'a str {
        self.body().label_name(label).unwrap_or("<label>")
    }

    fn stmt(&self, f: &mut fmt::Formatter<'_>, stmt: &Stmt, level: usize) -> fmt::Result {
        match stmt {
            Stmt::Expr(expr) => {
                self.expr(f, expr)?;
                f.write_str(";")
            }
            Stmt::Block(block, _) => self.block(f, block, level),
            Stmt::Decl { place, init, .. } => {
                self.decl(f, place, init.as_deref())?;
                f.write_str(";")
            }
            Stmt::If {
                cond, then, else_, ..
            } => {
                f.write_str("if (")?;
                self.expr(f, cond)?;
                f.write_str(") ")?;
                self.opt_stmt(f, then.as_deref(), level)?;
                if let Some(else_) = else_ {
                    f.write_str(" else ")?;
                    self.stmt(f, else_, level)?;
                }
                Ok(())
            }
            Stmt::While { cond, body, .. } => {
                f.write_str("while (")?;
                self.expr(f, cond)?;
                f.write_str(") ")?;
                self.opt_stmt(f, body.as_deref(), level)
            }
            Stmt::DoWhile { body, cond, .. } => {
                f.write_str("do ")?;
                self.opt_stmt(f, body.as_deref(), level)?;
                f.write_str(" while (")?;
                self.expr(f, cond)?;
                f.write_str(");")
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
                ..
            } => {
                f.write_str("for (")?;
                for (i, stmt) in init.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match stmt {
                        Stmt::Decl { place, init, .. } => self.decl(f, place, init.as_deref())?,
                        Stmt::Expr(expr) => self.expr(f, expr)?,
                        other => self.stmt(f, other, level)?,
                    }
                }
                f.write_str("; ")?;
                if let Some(cond) = cond {
                    self.expr(f, cond)?;
                }
                f.write_str("; ")?;
                for (i, expr) in update.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.expr(f, expr)?;
                }
                f.write_str(") ")?;
                self.opt_stmt(f, body.as_deref(), level)
            }
            Stmt::Switch { selector, body, .. } => {
                f.write_str("switch (")?;
                self.expr(f, selector)?;
                f.write_str(") ")?;
                self.switch_body(f, body, level)
            }
            Stmt::Case(Some(label), _) => {
                f.write_str("case ")?;
                self.expr(f, label)?;
                f.write_str(":")
            }
            Stmt::Case(None, _) => f.write_str("default:"),
            Stmt::Labeled { label, body, .. } => {
                write!(f, "{}: ", self.label(*label))?;
                self.stmt(f, body, level)
            }
            Stmt::Break(None, _) => f.write_str("break;"),
            Stmt::Break(Some(label), _) => write!(f, "break {};", self.label(*label)),
            Stmt::Continue(None, _) => f.write_str("continue;"),
            Stmt::Continue(Some(label), _) => write!(f, "continue {};", self.label(*label)),
            Stmt::Return(None, _) => f.write_str("return;"),
            Stmt::Return(Some(expr), _) => {
                f.write_str("return ")?;
                self.expr(f, expr)?;
                f.write_str(";")
            }
            Stmt::Throw(expr, _) => {
                f.write_str("throw ")?;
                self.expr(f, expr)?;
                f.write_str(";")
            }
            Stmt::Try {
                body,
                catches,
                finally,
                ..
            } => {
                f.write_str("try ")?;
                self.block(f, body, level)?;
                for catch in catches {
                    let local = &self.program[self.method].locals()[catch.local.index()];
                    write!(
                        f,
                        " catch ({} {}) ",
                        self.program.display_type(&local.ty),
                        local.name
                    )?;
                    self.block(f, &catch.body, level)?;
                }
                if let Some(finally) = finally {
                    f.write_str(" finally ")?;
                    self.block(f, finally, level)?;
                }
                Ok(())
            }
            Stmt::Assert { cond, message, .. } => {
                f.write_str("assert ")?;
                self.expr(f, cond)?;
                if let Some(message) = message {
                    f.write_str(" : ")?;
                    self.expr(f, message)?;
                }
                f.write_str(";")
            }
        }
    }

    fn decl(
        &self,
        f: &mut fmt::Formatter<'_>,
        place: &Expr,
        init: Option<&Expr>,
    ) -> fmt::Result {
        if let Expr::Local(local, _) = place {
            let local = &self.program[self.method].locals()[local.index()];
            write!(f, "{} ", self.program.display_type(&local.ty))?;
        }
        self.expr(f, place)?;
        if let Some(init) = init {
            f.write_str(" = ")?;
            self.expr(f, init)?;
        }
        Ok(())
    }

    fn operand(&self, f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
        if expr.needs_parens() {
            f.write_str("(")?;
            self.expr(f, expr)?;
            f.write_str(")")
        } else {
            self.expr(f, expr)
        }
    }

    fn args(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.expr(f, arg)?;
        }
        Ok(())
    }

    fn expr(&self, f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
        let program = self.program;
        match expr {
            Expr::Literal(id, _) => fmt_literal(f, program, &program[*id]),
            Expr::This(_, _) => f.write_str("this"),
            Expr::Local(local, _) => {
                f.write_str(&program[self.method].locals()[local.index()].name)
            }
            Expr::Param(index, _) => {
                f.write_str(&program[self.method].params()[usize::from(*index)].name)
            }
            Expr::Field {
                receiver, field, ..
            } => {
                let field = &program[*field];
                match receiver {
                    Some(receiver) => self.operand(f, receiver)?,
                    None => f.write_str(program[field.parent()].name())?,
                }
                write!(f, ".{}", field.name())
            }
            Expr::ArrayRef { array, index, .. } => {
                self.operand(f, array)?;
                f.write_str("[")?;
                self.expr(f, index)?;
                f.write_str("]")
            }
            Expr::Call { call, .. } => {
                let method = &program[call.method];
                match &call.receiver {
                    Some(receiver) => self.operand(f, receiver)?,
                    None => f.write_str(program[method.parent()].name())?,
                }
                if call.static_dispatch {
                    write!(f, ".{}::{}(", program[method.parent()].name(), method.name())?;
                } else {
                    write!(f, ".{}(", method.name())?;
                }
                self.args(f, &call.args)?;
                f.write_str(")")
            }
            Expr::NewInstance(id, _) => write!(f, "new {}", program[*id].name()),
            Expr::NewArray { ty, dims, .. } => {
                let mut elem = ty;
                while let Type::Array(inner) = elem {
                    elem = inner;
                }
                write!(f, "new {}", program.display_type(elem))?;
                for dim in dims {
                    f.write_str("[")?;
                    if let Some(dim) = dim {
                        self.expr(f, dim)?;
                    }
                    f.write_str("]")?;
                }
                for _ in dims.len()..ty.dims() {
                    f.write_str("[]")?;
                }
                Ok(())
            }
            Expr::ArrayInit { ty, elems, .. } => {
                write!(f, "new {} {{", program.display_type(ty))?;
                self.args(f, elems)?;
                f.write_str("}")
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                self.operand(f, lhs)?;
                write!(f, " {op} ")?;
                self.operand(f, rhs)
            }
            Expr::Unary { op, operand, .. } => {
                write!(f, "{op}")?;
                self.operand(f, operand)
            }
            Expr::Prefix { op, target, .. } => {
                write!(f, "{op}")?;
                self.operand(f, target)
            }
            Expr::Postfix { op, target, .. } => {
                self.operand(f, target)?;
                write!(f, "{op}")
            }
            Expr::Cast { expr, ty, .. } => {
                write!(f, "({}) ", program.display_type(ty))?;
                self.operand(f, expr)
            }
            Expr::InstanceOf { expr, ty, .. } => {
                self.operand(f, expr)?;
                write!(f, " instanceof {}", program.display_type(ty))
            }
            Expr::Conditional {
                cond, then, else_, ..
            } => {
                self.operand(f, cond)?;
                f.write_str(" ? ")?;
                self.operand(f, then)?;
                f.write_str(" : ")?;
                self.operand(f, else_)
            }
            Expr::ObjectLiteral { entries, .. } => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt_literal(f, program, &program[*key])?;
                    f.write_str(": ")?;
                    self.expr(f, value)?;
                }
                f.write_str("}")
            }
        }
    }

    fn foreign_stmt(&self, f: &mut fmt::Formatter<'_>, stmt: &ast::ForeignStmt<'ctx>) -> fmt::Result {
        match stmt {
            ast::ForeignStmt::Expr(expr) => {
                self.foreign_expr(f, expr)?;
                f.write_str(";")
            }
            ast::ForeignStmt::Var { name, init } => {
                write!(f, "var {name}")?;
                if let Some(init) = init {
                    f.write_str(" = ")?;
                    self.foreign_expr(f, init)?;
                }
                f.write_str(";")
            }
            ast::ForeignStmt::Return(None) => f.write_str("return;"),
            ast::ForeignStmt::Return(Some(expr)) => {
                f.write_str("return ")?;
                self.foreign_expr(f, expr)?;
                f.write_str(";")
            }
            ast::ForeignStmt::Verbatim(text) => f.write_str(text),
        }
    }

    fn foreign_expr(&self, f: &mut fmt::Formatter<'_>, expr: &ast::ForeignExpr<'ctx>) -> fmt::Result {
        match expr {
            ast::ForeignExpr::NameRef(name) => {
                if let Some(qualifier) = &name.qualifier {
                    self.foreign_expr(f, qualifier)?;
                    f.write_str(".")?;
                }
                f.write_str(&name.ident)
            }
            ast::ForeignExpr::Assign { target, value } => {
                self.foreign_expr(f, target)?;
                f.write_str(" = ")?;
                self.foreign_expr(f, value)
            }
            ast::ForeignExpr::Update {
                op,
                is_prefix: true,
                target,
            } => {
                write!(f, "{op}")?;
                self.foreign_expr(f, target)
            }
            ast::ForeignExpr::Update { op, target, .. } => {
                self.foreign_expr(f, target)?;
                write!(f, "{op}")
            }
            ast::ForeignExpr::Call { callee, args } => {
                self.foreign_expr(f, callee)?;
                f.write_str("(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.foreign_expr(f, arg)?;
                }
                f.write_str(")")
            }
            ast::ForeignExpr::Literal(constant) => write!(f, "{constant}"),
            ast::ForeignExpr::Verbatim(text) => f.write_str(text),
        }
    }
}

impl fmt::Display for MethodPrinter<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.program;
        let method = &program[self.method];
        if method.is_static() {
            f.write_str("static ")?;
        }
        write!(
            f,
            "{} {}.{}({})",
            program.display_type(method.return_type()),
            program[method.parent()].name(),
            method.name(),
            sep_by(
                method
                    .params()
                    .iter()
                    .map(|p| format!("{} {}", program.display_type(&p.ty), p.name)),
                ", "
            )
        )?;
        match method.body() {
            Body::None => f.write_str(";"),
            Body::Code { block, .. } => {
                f.write_str(" ")?;
                self.block(f, block, 0)
            }
            Body::Foreign { func, .. } => {
                f.write_str(" native {\n")?;
                for stmt in &func.body {
                    write!(f, "{}", indent(1))?;
                    self.foreign_stmt(f, stmt)?;
                    f.write_str("\n")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn fmt_literal(f: &mut fmt::Formatter<'_>, program: &Program<'_>, literal: &Literal<'_>) -> fmt::Result {
    match literal {
        Literal::Null => f.write_str("null"),
        Literal::Bool(b) => write!(f, "{b}"),
        Literal::Char(c) => match char::from_u32(u32::from(*c)) {
            Some(c) if c.is_ascii_graphic() || c == ' ' => write!(f, "'{c}'"),
            _ => write!(f, "'\\u{c:04x}'"),
        },
        Literal::Int(i) => write!(f, "{i}"),
        Literal::Long(i) => write!(f, "{i}L"),
        Literal::Float(x) => write!(f, "{x:?}f"),
        Literal::Double(x) => write!(f, "{x:?}"),
        Literal::String(s) => write!(f, "{s:?}"),
        Literal::Class(ty) => write!(f, "{}.class", program.display_type(ty)),
    }
}

#[cfg(test)]
mod tests {
    use jolt_ast::SourceMap;
    use similar_asserts::assert_eq;

    use super::*;

    fn span() -> Span {
        let mut sources = SourceMap::new();
        let file = sources.push("Test.java", "");
        Span::new(0, 0, file)
    }

    #[test]
    fn control_breaks_propagate_through_blocks() {
        let span = span();
        let ret = Stmt::Return(None, span);
        let nested = Stmt::Block(Block::new([Stmt::Break(None, span)]), span);
        let empty = Stmt::Block(Block::default(), span);

        assert!(ret.unconditional_control_break());
        assert!(nested.unconditional_control_break());
        assert!(!empty.unconditional_control_break());
    }

    #[test]
    fn prologue_is_prepended_in_order() {
        let span = span();
        let mut block = Block::new([Stmt::Return(None, span)]);
        block.push_prologue([Stmt::Break(None, span), Stmt::Continue(None, span)]);

        let kinds = block
            .stmts
            .iter()
            .map(|stmt| match stmt {
                Stmt::Break(_, _) => "break",
                Stmt::Continue(_, _) => "continue",
                Stmt::Return(_, _) => "return",
                _ => "other",
            })
            .collect::<Vec<_>>();
        assert_eq!(kinds, ["break", "continue", "return"]);
    }

    #[test]
    fn string_addition_becomes_concat() {
        assert_eq!(BinaryOp::from_source(ast::BinOp::Add, true), BinaryOp::Concat);
        assert_eq!(BinaryOp::from_source(ast::BinOp::Add, false), BinaryOp::Add);
        assert_eq!(
            BinaryOp::compound(ast::BinOp::Add, true),
            Some(BinaryOp::AssignConcat)
        );
        assert_eq!(BinaryOp::compound(ast::BinOp::Lt, false), None);
    }
}
