use std::borrow::Cow;
use std::collections::VecDeque;

use hashbrown::HashSet;
use identity_hash::BuildIdentityHasher;
use jolt_ast::{FieldId, Span, Type, TypeId};

use super::{Error, LowerResult, Lowerer};
use crate::ir;
use crate::program::ParamKind;

/// A candidate receiver along with the static class of its value.
type Candidate = (ir::Expr, TypeId);

impl<'ctx> Lowerer<'_, 'ctx> {
    /// Builds a reference to an instance of `target` starting from `this`.
    ///
    /// Constructors also consider their own outer-instance parameters, since the synthetic
    /// fields are not guaranteed to exist.
    pub(super) fn this_ref(&self, target: TypeId, span: Span) -> LowerResult<ir::Expr> {
        let mut worklist = vec![(self.this(span)?, self.ty())];
        if self.program[self.method].is_constructor() {
            worklist.extend(self.outer_instance_params(span));
        }
        self.create_this_ref(target, worklist, span)
    }

    /// Resolves `Outer.this`, which never refers to `this` itself unless `Outer` is the current
    /// class.
    pub(super) fn qualified_this(
        &self,
        target: TypeId,
        span: Span,
    ) -> LowerResult<ir::Expr> {
        if target == self.ty() {
            return self.this(span);
        }
        let this = self.this(span)?;
        let worklist = self
            .program
            .super_class_chain(self.ty())
            .flat_map(|class| self.program.outer_this_fields(class))
            .filter_map(|field| self.outer_field_ref(this.clone(), field, span))
            .collect::<Vec<_>>();
        self.create_this_ref(target, worklist, span)
    }

    /// Breadth-first search over outer-instance field chains for the first candidate that is
    /// already an instance of `target`.
    pub(super) fn create_this_ref(
        &self,
        target: TypeId,
        worklist: impl IntoIterator<Item = Candidate>,
        span: Span,
    ) -> LowerResult<ir::Expr> {
        let mut queue = worklist.into_iter().collect::<VecDeque<_>>();
        let mut expanded = HashSet::<TypeId, BuildIdentityHasher<u32>>::default();

        while let Some((expr, class)) = queue.pop_front() {
            if self.program.can_trivially_cast_class(class, target) {
                return Ok(expr);
            }
            for class in self.program.super_class_chain(class) {
                if !expanded.insert(class) {
                    continue;
                }
                queue.extend(
                    self.program
                        .outer_this_fields(class)
                        .filter_map(|field| self.outer_field_ref(expr.clone(), field, span)),
                );
            }
        }
        Err(Error::NoOuterReference(
            self.program[target].name().to_owned(),
        ))
    }

    /// The outer-instance parameters of the current method.
    pub(super) fn outer_instance_params(&self, span: Span) -> Vec<Candidate> {
        self.program[self.method]
            .synthetic_params()
            .filter(|(_, param)| param.kind == ParamKind::OuterInstance)
            .filter_map(|(index, param)| Some((ir::Expr::Param(index, span), *param.ty.as_class()?)))
            .collect()
    }

    /// Resolves a captured local of an enclosing method.
    pub(super) fn captured_local(
        &self,
        name: &Cow<'ctx, str>,
        ty: &Type,
        span: Span,
    ) -> LowerResult<ir::Expr> {
        let param = self.program[self.method]
            .synthetic_params()
            .filter(|(_, param)| {
                param.kind == ParamKind::OuterLocal && param.name == *name && param.ty == *ty
            })
            .last();
        if let Some((index, _)) = param {
            return Ok(ir::Expr::Param(index, span));
        }

        let field = self
            .decl
            .outer_locals
            .iter()
            .find(|arg| arg.name == *name && arg.ty == *ty)
            .and_then(|arg| arg.field)
            .ok_or_else(|| Error::MissingCapturePath(name.to_string()))?;
        Ok(ir::Expr::field(Some(self.this(span)?), field, span))
    }

    fn outer_field_ref(
        &self,
        receiver: ir::Expr,
        field: FieldId,
        span: Span,
    ) -> Option<Candidate> {
        let class = *self.program[field].ty().as_class()?;
        Some((ir::Expr::field(Some(receiver), field, span), class))
    }
}
