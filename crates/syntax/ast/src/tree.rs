use std::borrow::Cow;

use strum::{Display, IntoStaticStr};

use crate::foreign::ForeignFn;
use crate::span::{FileId, Span};
use crate::types::{Constant, Conversion, FieldId, LocalId, MethodId, Type, TypeId};

/// Every type declared in one source file, in declaration order.
#[derive(Debug)]
pub struct CompilationUnit<'src> {
    pub file: FileId,
    pub types: Vec<TypeDecl<'src>>,
}

#[derive(Debug)]
pub struct TypeDecl<'src> {
    pub id: TypeId,
    /// Enclosing instances captured by a non-static nested type, innermost first.
    pub outer_instances: Vec<SyntheticArg<'src>>,
    /// Locals of the enclosing method captured by a local or anonymous type.
    pub outer_locals: Vec<SyntheticArg<'src>>,
    pub members: Vec<Member<'src>>,
    pub methods: Vec<MethodDecl<'src>>,
    pub bridges: Vec<BridgeDecl<'src>>,
    pub span: Span,
}

/// A value the front end threads into a nested type's constructors, positionally aligned with
/// the constructors' synthetic parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticArg<'src> {
    pub name: Cow<'src, str>,
    pub ty: Type,
    /// The synthetic field the value is stored in, if the type ever reads it outside of its
    /// constructors.
    pub field: Option<FieldId>,
}

#[derive(Debug)]
pub enum Member<'src> {
    Field {
        field: FieldId,
        init: Option<Expr<'src>>,
        span: Span,
    },
    Initializer {
        is_static: bool,
        body: Vec<Stmt<'src>>,
        span: Span,
    },
}

#[derive(Debug)]
pub struct MethodDecl<'src> {
    pub id: MethodId,
    pub body: MethodBody<'src>,
    /// The explicit or implied `super(...)`/`this(...)` call of a constructor.
    pub ctor_call: Option<CtorCall<'src>>,
    pub span: Span,
}

#[derive(Debug)]
pub enum MethodBody<'src> {
    Statements(Vec<Stmt<'src>>),
    Foreign(ForeignFn<'src>),
    None,
}

#[derive(Debug)]
pub struct CtorCall<'src> {
    pub kind: CtorCallKind,
    pub ctor: MethodId,
    pub args: Vec<Expr<'src>>,
    /// The explicit `outer.super(...)` qualifier.
    pub qualifier: Option<Box<Expr<'src>>>,
    /// Enclosing instance types required by the target's declaring type.
    pub outer_instances: Vec<TypeId>,
    /// Captured locals required by the target's declaring type.
    pub outer_locals: Vec<SyntheticArg<'src>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CtorCallKind {
    Super,
    This,
}

/// A bridge method required by the front end's override resolution.
#[derive(Debug)]
pub struct BridgeDecl<'src> {
    pub name: Cow<'src, str>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub target: MethodId,
    pub span: Span,
}

#[derive(Debug)]
pub struct Expr<'src> {
    pub kind: ExprKind<'src>,
    pub ty: Type,
    pub conversion: Conversion,
    pub constant: Option<Constant<'src>>,
    pub span: Span,
}

impl<'src> Expr<'src> {
    #[inline]
    pub fn new(kind: ExprKind<'src>, ty: impl Into<Type>, span: Span) -> Self {
        Self {
            kind,
            ty: ty.into(),
            conversion: Conversion::None,
            constant: None,
            span,
        }
    }

    #[inline]
    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = conversion;
        self
    }

    #[inline]
    pub fn with_constant(mut self, constant: Constant<'src>) -> Self {
        self.constant = Some(constant);
        self
    }

    /// Whether the front end proved this expression to be a constant `false`.
    pub fn is_constant_false(&self) -> bool {
        self.constant.as_ref().and_then(Constant::as_bool) == Some(false)
    }

    /// Whether the front end proved this expression to be a constant `true`.
    pub fn is_constant_true(&self) -> bool {
        self.constant.as_ref().and_then(Constant::as_bool) == Some(true)
    }
}

#[derive(Debug, IntoStaticStr)]
pub enum ExprKind<'src> {
    Null,
    This,
    QualifiedThis(TypeId),
    Literal,
    Local(LocalId),
    /// An index into the enclosing method's full parameter list.
    Param(u16),
    CapturedLocal(Cow<'src, str>),
    Field {
        receiver: Option<Box<Expr<'src>>>,
        field: FieldId,
        generic_cast: Option<Type>,
    },
    ArrayAccess {
        array: Box<Expr<'src>>,
        index: Box<Expr<'src>>,
    },
    Call {
        receiver: Receiver<'src>,
        method: MethodId,
        args: Vec<Expr<'src>>,
        generic_cast: Option<Type>,
    },
    New {
        ctor: MethodId,
        args: Vec<Expr<'src>>,
        qualifier: Option<Box<Expr<'src>>>,
        enum_constant: Option<(Cow<'src, str>, i32)>,
        outer_instances: Vec<TypeId>,
        outer_locals: Vec<Expr<'src>>,
    },
    NewArray {
        dims: Vec<Option<Expr<'src>>>,
    },
    ArrayInit(Vec<Expr<'src>>),
    Assign {
        target: Box<Expr<'src>>,
        value: Box<Expr<'src>>,
    },
    CompoundAssign {
        op: BinOp,
        target: Box<Expr<'src>>,
        value: Box<Expr<'src>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr<'src>>,
        rhs: Box<Expr<'src>>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr<'src>>,
    },
    Update {
        op: UpdateOp,
        is_prefix: bool,
        target: Box<Expr<'src>>,
    },
    Conditional {
        cond: Box<Expr<'src>>,
        then: Box<Expr<'src>>,
        else_: Box<Expr<'src>>,
    },
    Cast(Box<Expr<'src>>),
    InstanceOf {
        expr: Box<Expr<'src>>,
        target: Type,
    },
    ClassLiteral(Type),
}

#[derive(Debug)]
pub enum Receiver<'src> {
    /// No receiver was written, the target is either static or a member of an enclosing type.
    Implicit,
    Super,
    QualifiedSuper(TypeId),
    Expr(Box<Expr<'src>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BinOp {
    #[strum(serialize = "+")]
    Add,
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnOp {
    #[strum(serialize = "-")]
    Neg,
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "~")]
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UpdateOp {
    #[strum(serialize = "++")]
    Inc,
    #[strum(serialize = "--")]
    Dec,
}

#[derive(Debug)]
pub struct Stmt<'src> {
    pub kind: StmtKind<'src>,
    pub span: Span,
}

impl<'src> Stmt<'src> {
    #[inline]
    pub fn new(kind: StmtKind<'src>, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, IntoStaticStr)]
pub enum StmtKind<'src> {
    Empty,
    Expr(Expr<'src>),
    LocalDecl {
        local: LocalId,
        init: Option<Expr<'src>>,
    },
    Block(Vec<Stmt<'src>>),
    If {
        cond: Expr<'src>,
        then: Box<Stmt<'src>>,
        else_: Option<Box<Stmt<'src>>>,
    },
    While {
        cond: Expr<'src>,
        body: Box<Stmt<'src>>,
    },
    DoWhile {
        body: Box<Stmt<'src>>,
        cond: Expr<'src>,
    },
    For {
        init: Vec<Stmt<'src>>,
        cond: Option<Expr<'src>>,
        update: Vec<Expr<'src>>,
        body: Box<Stmt<'src>>,
    },
    ForEach {
        element: LocalId,
        element_type: Type,
        iterable: Expr<'src>,
        /// The conversion applied to each fetched element before it is stored.
        element_conversion: Conversion,
        body: Box<Stmt<'src>>,
    },
    Labeled {
        label: Cow<'src, str>,
        body: Box<Stmt<'src>>,
    },
    Break(Option<Cow<'src, str>>),
    Continue(Option<Cow<'src, str>>),
    Return(Option<Expr<'src>>),
    Switch {
        selector: Expr<'src>,
        body: Vec<Stmt<'src>>,
    },
    /// A `case` label, or `default` when empty.
    Case(Option<Expr<'src>>),
    Throw(Expr<'src>),
    Try {
        body: Vec<Stmt<'src>>,
        catches: Vec<CatchClause<'src>>,
        finally: Option<Vec<Stmt<'src>>>,
    },
    Synchronized {
        lock: Expr<'src>,
        body: Vec<Stmt<'src>>,
    },
    Assert {
        cond: Expr<'src>,
        message: Option<Expr<'src>>,
    },
    /// A local class declaration; its type is lowered at the program level.
    LocalType(TypeId),
}

#[derive(Debug)]
pub struct CatchClause<'src> {
    pub local: LocalId,
    pub body: Vec<Stmt<'src>>,
    pub span: Span,
}
