use std::borrow::Cow;
use std::fmt;

use jolt_ast::{self as ast, Span};
use thiserror::Error;

use crate::utils::{DisplayFn, sep_by};

/// A problem in a foreign method body that the user can fix.
#[derive(Debug, Clone, Error)]
pub enum Diagnostic<'ctx> {
    #[error("malformed host reference `{0}`, expected `@Class::member` or `@Class::method(Types)`")]
    MalformedRef(Cow<'ctx, str>, Span),
    #[error("`{0}` is not a known class")]
    UnresolvedClass(Cow<'ctx, str>, Span),
    #[error("unable to resolve field `{1}` in `{0}`{hint}", hint = DidYouMean(.2))]
    UnresolvedField(Cow<'ctx, str>, Cow<'ctx, str>, Box<[String]>, Span),
    #[error("unable to resolve method `{1}` in `{0}`{hint}", hint = DidYouMean(.2))]
    UnresolvedMethod(Cow<'ctx, str>, Cow<'ctx, str>, Box<[String]>, Span),
    #[error("ambiguous wildcard match for `{0}`, candidates are: {candidates}", candidates = sep_by(.1.iter(), ", "))]
    AmbiguousWildcard(Cow<'ctx, str>, Box<[String]>, Span),
    #[error("'nullField' is the only legal field reference for 'null'")]
    InvalidNullField(Span),
    #[error("'nullMethod()' is the only legal method reference for 'null'")]
    InvalidNullMethod(Span),
    #[error("cannot make a qualified reference to the static field `{0}`")]
    QualifiedStaticField(String, Span),
    #[error("cannot make an unqualified reference to the instance field `{0}`")]
    UnqualifiedInstanceField(String, Span),
    #[error("cannot make a qualified reference to the static method `{0}`")]
    QualifiedStaticMethod(String, Span),
    #[error("cannot make an unqualified reference to the instance method `{0}`")]
    UnqualifiedInstanceMethod(String, Span),
    #[error("cannot change the value of the compile-time constant `{0}`")]
    ConstantAssignment(String, Span),
    #[error("cannot reassign the method `{0}`")]
    MethodAssignment(String, Span),
    #[error("`{0}` uses the type `long`, which is not safe to access in foreign code")]
    UnsafeLongAccess(String, Span),
}

impl<'ctx> Diagnostic<'ctx> {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::UnsafeLongAccess(_, _))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRef(_, _) => "MALFORMED_REF",
            Self::UnresolvedClass(_, _) => "UNRESOLVED_TYPE",
            Self::UnresolvedField(_, _, _, _) | Self::UnresolvedMethod(_, _, _, _) => {
                "UNRESOLVED_MEMBER"
            }
            Self::AmbiguousWildcard(_, _, _) => "AMBIGUOUS_WILDCARD",
            Self::InvalidNullField(_) | Self::InvalidNullMethod(_) => "INVALID_NULL_REF",
            Self::QualifiedStaticField(_, _)
            | Self::UnqualifiedInstanceField(_, _)
            | Self::QualifiedStaticMethod(_, _)
            | Self::UnqualifiedInstanceMethod(_, _) => "QUALIFIER_MISMATCH",
            Self::ConstantAssignment(_, _) | Self::MethodAssignment(_, _) => "INVALID_ASSIGNMENT",
            Self::UnsafeLongAccess(_, _) => "UNSAFE_LONG",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::MalformedRef(_, span)
            | Self::UnresolvedClass(_, span)
            | Self::UnresolvedField(_, _, _, span)
            | Self::UnresolvedMethod(_, _, _, span)
            | Self::AmbiguousWildcard(_, _, span)
            | Self::InvalidNullField(span)
            | Self::InvalidNullMethod(span)
            | Self::QualifiedStaticField(_, span)
            | Self::UnqualifiedInstanceField(_, span)
            | Self::QualifiedStaticMethod(_, span)
            | Self::UnqualifiedInstanceMethod(_, span)
            | Self::ConstantAssignment(_, span)
            | Self::MethodAssignment(_, span)
            | Self::UnsafeLongAccess(_, span) => *span,
        }
    }

    pub fn display<'a>(
        &'a self,
        sources: &'a ast::SourceMap,
    ) -> Result<impl fmt::Display + use<'a, 'ctx>, UnknownSource> {
        let span = self.span();
        let file = sources.get(span.file).ok_or(UnknownSource(span))?;
        let start = file.lookup(span.start);
        let end = file.lookup(span.end);
        let line = file.line_contents(start.line).ok_or(UnknownSource(span))?;

        Ok(DisplayFn::new(move |f: &mut fmt::Formatter<'_>| {
            writeln!(
                f,
                "At {}:{}:{}",
                file.path().display(),
                start.line + 1,
                start.col + 1
            )?;

            writeln!(f, "{}", line.trim_end())?;

            let pad = start.col;
            let underline_len = if start.line == end.line {
                (end.col - start.col).max(1)
            } else {
                3
            };
            writeln!(f, "{:>pad$}{:^>underline_len$}", "", "")?;
            writeln!(f, "[{}] {self}", self.code())
        }))
    }
}

struct DidYouMean<'a>(&'a [String]);

impl fmt::Display for DidYouMean<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, ", did you mean: {}", sep_by(self.0.iter(), ", "))
    }
}

/// Collects problems that don't stop the pass that found them.
#[derive(Debug)]
pub struct Reporter<A> {
    reported: Vec<A>,
}

impl<A> Reporter<A> {
    /// Passes an `Ok` value through, a failure is recorded and turned into `None`.
    pub fn unwrap_err<B, E>(&mut self, res: Result<B, E>) -> Option<B>
    where
        E: Into<A>,
    {
        res.map_err(|err| self.report(err)).ok()
    }

    #[inline]
    pub fn report(&mut self, problem: impl Into<A>) {
        self.reported.push(problem.into());
    }

    pub fn report_many(&mut self, problems: impl IntoIterator<Item = impl Into<A>>) {
        self.reported.extend(problems.into_iter().map(Into::into));
    }

    #[inline]
    pub fn reported(&self) -> &[A] {
        &self.reported
    }

    #[inline]
    pub fn into_reported(self) -> Vec<A> {
        self.reported
    }
}

impl Reporter<Diagnostic<'_>> {
    pub fn has_fatal(&self) -> bool {
        self.reported.iter().any(Diagnostic::is_fatal)
    }
}

impl<A> Default for Reporter<A> {
    fn default() -> Self {
        Self { reported: vec![] }
    }
}

#[derive(Debug, Error)]
#[error("the source of a diagnostic could not be determined (span: {0})")]
pub struct UnknownSource(Span);

#[cfg(test)]
mod tests {
    use jolt_ast::SourceMap;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn renders_caret_under_span() {
        let mut sources = SourceMap::new();
        let file = sources.push("Main.java", "class A {\n  native void f() /*-{ @A::x = 1; }-*/;\n}\n");
        let diagnostic = Diagnostic::ConstantAssignment("A.x".to_owned(), Span::new(33, 38, file));

        let rendered = diagnostic.display(&sources).unwrap().to_string();
        let expected = [
            "At Main.java:2:24",
            "  native void f() /*-{ @A::x = 1; }-*/;",
            format!("{}^^^^^", " ".repeat(23)).as_str(),
            "[INVALID_ASSIGNMENT] cannot change the value of the compile-time constant `A.x`",
            "",
        ]
        .join("\n");
        assert_eq!(rendered, expected);
    }

    #[test]
    fn unknown_file_is_an_error() {
        let mut other = SourceMap::new();
        let file = other.push("Other.java", "");
        let sources = SourceMap::new();

        let diagnostic = Diagnostic::InvalidNullField(Span::new(0, 0, file));
        assert!(diagnostic.display(&sources).is_err());
    }

    #[test]
    fn suggestions_are_listed() {
        let mut sources = SourceMap::new();
        let file = sources.push("Main.java", "");
        let diagnostic = Diagnostic::UnresolvedMethod(
            "A".into(),
            "run(int)".into(),
            ["A.run(String)".to_owned(), "A.run()".to_owned()].into(),
            Span::new(0, 0, file),
        );

        assert_eq!(
            diagnostic.to_string(),
            "unable to resolve method `run(int)` in `A`, did you mean: A.run(String), A.run()"
        );
        assert!(diagnostic.is_fatal());
    }

    #[test]
    fn reporter_keeps_going() {
        let mut sources = SourceMap::new();
        let span = Span::new(0, 0, sources.push("Main.java", ""));
        let mut reporter = Reporter::<Diagnostic<'_>>::default();

        let res: Result<u8, _> = Err(Diagnostic::UnsafeLongAccess("A.x".to_owned(), span));
        assert_eq!(reporter.unwrap_err(res), None);
        assert_eq!(reporter.unwrap_err(Ok::<_, Diagnostic<'_>>(1)), Some(1));
        assert!(!reporter.has_fatal());

        reporter.report_many([
            Diagnostic::InvalidNullField(span),
            Diagnostic::InvalidNullMethod(span),
        ]);
        assert!(reporter.has_fatal());
        assert_eq!(
            reporter.reported().iter().map(Diagnostic::code).collect::<Vec<_>>(),
            ["UNSAFE_LONG", "INVALID_NULL_REF", "INVALID_NULL_REF"]
        );
    }
}
