use std::fmt;

use jolt_ast::{self as ast, MethodId, Span, TypeId};
use thiserror::Error;

use crate::program::Program;

pub type LowerResult<A, E = Error> = Result<A, E>;
pub(crate) type Lowered<A> = LowerResult<A, InternalError>;

/// A violated invariant that the front end was expected to uphold.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("the body of `{0}` has already been populated")]
    BodyAlreadyPopulated(String),
    #[error("cannot create a reference to an instance of `{0}` from this context")]
    NoOuterReference(String),
    #[error("missing capture-emulation path for the captured local `{0}`")]
    MissingCapturePath(String),
    #[error("no parameter of the calling constructor matches the captured local `{0}`")]
    MissingOuterLocalParam(String),
    #[error("`{0}` expects {1} arguments, but {2} were resolved")]
    ArgCountMismatch(String, usize, usize),
    #[error("values of type `{0}` cannot be unboxed")]
    InvalidUnbox(String),
    #[error("`this` is not available in the static method `{0}`")]
    NoReceiver(String),
    #[error("the enum constructor `{0}` has no synthetic name and ordinal parameters")]
    MissingEnumParams(String),
    #[error("values of type `{0}` cannot be iterated over")]
    NotIterable(String),
    #[error("{0} is not supported here")]
    UnexpectedNode(&'static str),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BodyAlreadyPopulated(_) => "BODY_POPULATED",
            Self::NoOuterReference(_) => "NO_OUTER_REF",
            Self::MissingCapturePath(_) | Self::MissingOuterLocalParam(_) => "MISSING_CAPTURE",
            Self::ArgCountMismatch(_, _, _) => "ARG_COUNT",
            Self::InvalidUnbox(_) => "INVALID_UNBOX",
            Self::NoReceiver(_) => "NO_RECEIVER",
            Self::MissingEnumParams(_) => "MISSING_ENUM_PARAMS",
            Self::NotIterable(_) => "NOT_ITERABLE",
            Self::UnexpectedNode(_) => "UNEXPECTED_NODE",
        }
    }
}

/// An internal error along with the chain of nodes that were being lowered when it occurred,
/// innermost first.
#[derive(Debug, Error)]
#[error("internal error: {cause}{trace}")]
pub struct InternalError {
    #[source]
    cause: Error,
    trace: NodeTrace,
}

impl InternalError {
    #[inline]
    pub fn cause(&self) -> &Error {
        &self.cause
    }

    #[inline]
    pub fn trace(&self) -> &[NodeFrame] {
        &self.trace.0
    }

    /// The span of the innermost node that has one.
    pub fn span(&self) -> Option<Span> {
        self.trace.0.iter().find_map(|frame| frame.span)
    }

    pub(crate) fn with_frame(mut self, frame: NodeFrame) -> Self {
        self.trace.0.push(frame);
        self
    }
}

impl From<Error> for InternalError {
    #[inline]
    fn from(cause: Error) -> Self {
        Self {
            cause,
            trace: NodeTrace::default(),
        }
    }
}

#[derive(Debug, Default)]
struct NodeTrace(Vec<NodeFrame>);

impl fmt::Display for NodeTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0
            .iter()
            .try_for_each(|frame| write!(f, "\n  while lowering {frame}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFrame {
    kind: &'static str,
    description: String,
    span: Option<Span>,
}

impl NodeFrame {
    pub fn new(kind: &'static str, description: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            kind,
            description: description.into(),
            span,
        }
    }

    pub(crate) fn method(program: &Program<'_>, id: MethodId, span: Span) -> Self {
        Self::new(
            "method",
            program.display_signature(id).to_string(),
            Some(span),
        )
    }

    pub(crate) fn type_(program: &Program<'_>, id: TypeId, span: Span) -> Self {
        Self::new("type", program[id].name(), Some(span))
    }

    #[inline]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn span(&self) -> Option<Span> {
        self.span
    }
}

impl fmt::Display for NodeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind, self.description)?;
        if let Some(span) = self.span {
            write!(f, " at {span}")?;
        }
        Ok(())
    }
}

impl From<&ast::Expr<'_>> for NodeFrame {
    fn from(expr: &ast::Expr<'_>) -> Self {
        Self::new("expression", <&str>::from(&expr.kind), Some(expr.span))
    }
}

impl From<&ast::Stmt<'_>> for NodeFrame {
    fn from(stmt: &ast::Stmt<'_>) -> Self {
        Self::new("statement", <&str>::from(&stmt.kind), Some(stmt.span))
    }
}

pub trait WithNode {
    type Result;

    /// Appends a node to the trace of a failed lowering.
    fn with_node(self, node: impl Into<NodeFrame>) -> Self::Result;
}

impl<A, E> WithNode for Result<A, E>
where
    E: Into<InternalError>,
{
    type Result = Lowered<A>;

    #[inline]
    fn with_node(self, node: impl Into<NodeFrame>) -> Self::Result {
        self.map_err(|err| err.into().with_frame(node.into()))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use jolt_ast::SourceMap;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn trace_grows_outwards() {
        let mut sources = SourceMap::new();
        let file = sources.push("Test.java", "");
        let inner = Span::new(4, 8, file);

        let res: Result<(), _> = Err(Error::UnexpectedNode("a local type"));
        let err = res
            .with_node(NodeFrame::new("expression", "Call", Some(inner)))
            .with_node(NodeFrame::new("method", "A.run()", None))
            .unwrap_err();

        assert_eq!(err.cause().code(), "UNEXPECTED_NODE");
        assert_eq!(err.span(), Some(inner));
        assert_eq!(
            err.trace().iter().map(NodeFrame::kind).collect::<Vec<_>>(),
            ["expression", "method"]
        );
        let source = err.source().and_then(|source| source.downcast_ref::<Error>());
        assert_eq!(source.map(Error::code), Some("UNEXPECTED_NODE"));
        assert_eq!(
            err.to_string(),
            "internal error: a local type is not supported here\n  \
             while lowering expression `Call` at 4..8@0\n  \
             while lowering method `A.run()`"
        );
    }
}
