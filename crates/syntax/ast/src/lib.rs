mod files;
mod foreign;
mod span;
mod tree;
mod types;

pub use files::{File, SourceLoc, SourceMap};
pub use foreign::{ForeignExpr, ForeignFn, ForeignStmt, NameRef};
pub use span::{FileId, Span};
pub use tree::{
    BinOp, BridgeDecl, CatchClause, CompilationUnit, CtorCall, CtorCallKind, Expr, ExprKind,
    Member, MethodBody, MethodDecl, Receiver, Stmt, StmtKind, SyntheticArg, TypeDecl, UnOp,
    UpdateOp,
};
pub use types::{Constant, Conversion, FieldId, LocalId, MethodId, Primitive, Type, TypeId};
