use std::{fmt, ops};

use bon::bon;
use jolt_ast::{CompilationUnit, SourceMap};
pub use jolt_compiler_frontend::{
    Body, Diagnostic, InternalError, LowerError, LowerOptions, NodeFrame, Program, UnknownSource,
    ast, ir,
};
use jolt_compiler_frontend::{DiagnosticReporter, lower_program, resolve_foreign_refs};
pub use jolt_dotfile::{Dotfile, LoweringConfig};

/// A program whose method bodies have been lowered and whose foreign references have been
/// resolved.
#[derive(Debug)]
pub struct Compilation<'ctx> {
    sources: &'ctx SourceMap,
    program: Program<'ctx>,
    diagnostics: Diagnostics<'ctx>,
}

#[bon]
impl<'ctx> Compilation<'ctx> {
    #[builder(finish_fn = lower)]
    pub fn new(
        units: &[CompilationUnit<'ctx>],
        mut program: Program<'ctx>,
        sources: &'ctx SourceMap,
        #[builder(default)] options: LowerOptions,
    ) -> Result<Self, InternalError> {
        lower_program(units, &mut program, &options)?;

        let mut reporter = DiagnosticReporter::default();
        resolve_foreign_refs(&mut program, &options, &mut reporter);

        Ok(Self {
            sources,
            program,
            diagnostics: reporter.into_reported().into(),
        })
    }

    pub fn program(&self) -> &Program<'ctx> {
        &self.program
    }

    pub fn sources(&self) -> &'ctx SourceMap {
        self.sources
    }

    pub fn diagnostics(&self) -> &Diagnostics<'ctx> {
        &self.diagnostics
    }

    pub fn into_inner(self) -> (Program<'ctx>, Diagnostics<'ctx>) {
        (self.program, self.diagnostics)
    }
}

/// The diagnostics of a compilation, warnings before errors.
#[derive(Debug, Default)]
pub struct Diagnostics<'ctx>(Vec<Diagnostic<'ctx>>);

impl<'ctx> Diagnostics<'ctx> {
    pub fn has_fatal_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic<'ctx>> {
        self.0.iter().filter(|diagnostic| diagnostic.is_fatal())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic<'ctx>> {
        self.0.iter().filter(|diagnostic| !diagnostic.is_fatal())
    }

    /// Logs every diagnostic with its source excerpt, followed by a summary.
    pub fn dump(&self, sources: &SourceMap) -> Result<(), UnknownSource> {
        for warning in self.warnings() {
            log::warn!("{}", warning.display(sources)?);
        }
        for error in self.errors() {
            log::error!("{}", error.display(sources)?);
        }
        log::info!(
            "Completed with {} warnings and {} errors",
            self.warnings().count(),
            self.errors().count()
        );
        Ok(())
    }
}

impl<'ctx> ops::Deref for Diagnostics<'ctx> {
    type Target = [Diagnostic<'ctx>];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'ctx> IntoIterator for Diagnostics<'ctx> {
    type IntoIter = std::vec::IntoIter<Diagnostic<'ctx>>;
    type Item = Diagnostic<'ctx>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'ctx> From<Vec<Diagnostic<'ctx>>> for Diagnostics<'ctx> {
    fn from(mut diagnostics: Vec<Diagnostic<'ctx>>) -> Self {
        diagnostics.sort_by_key(Diagnostic::is_fatal);
        Self(diagnostics)
    }
}

impl fmt::Display for Diagnostics<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter().try_for_each(|diagnostic| writeln!(f, "{diagnostic}"))
    }
}
