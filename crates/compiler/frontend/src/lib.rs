mod diagnostic;
pub mod ir;
mod lower;
mod native;
mod options;
pub mod program;
mod utils;

pub use diagnostic::{Diagnostic, Reporter, UnknownSource};
pub use jolt_ast as ast;
pub use lower::{
    Error as LowerError, InternalError, LowerResult, NodeFrame, WithNode, lower_program,
};
pub use native::resolve_foreign_refs;
pub use options::LowerOptions;
pub use program::{
    Body, Field, FieldFlags, Literal, Local, Method, MethodFlags, Param, ParamKind, Program,
    TypeDef, TypeFlags, TypeKind, WellKnown, Wrapper,
};

type IndexSet<K, S = hashbrown::DefaultHashBuilder> = indexmap::IndexSet<K, S>;

pub type DiagnosticReporter<'ctx> = Reporter<Diagnostic<'ctx>>;
