use std::borrow::Cow;

use bon::bon;
pub use error::{Error, InternalError, LowerResult, NodeFrame, WithNode};
pub(crate) use error::Lowered;
use jolt_ast::{self as ast, Conversion, MethodId, Span, Type, TypeId};
use labels::LabelTable;

use crate::ir::{self, BinaryOp};
use crate::options::LowerOptions;
use crate::program::{Literal, Program};

mod error;
mod labels;
mod members;
mod outer;
mod stmt;

/// Lowers every type of the given compilation units into `program`.
///
/// Ordinary members of all types are lowered first, then the well-known methods driven by the
/// options are implemented, and only then are bridge methods synthesized, since they depend on
/// the complete set of overrides.
pub fn lower_program<'ctx>(
    units: &[ast::CompilationUnit<'ctx>],
    program: &mut Program<'ctx>,
    options: &LowerOptions,
) -> Result<(), InternalError> {
    let decls = || units.iter().flat_map(|unit| &unit.types);

    for decl in decls() {
        members::lower_type(program, decl)
            .map_err(|err| err.with_frame(NodeFrame::type_(program, decl.id, decl.span)))?;
    }
    members::implement_well_known(program, options);

    let mut bridges = 0;
    for decl in decls() {
        bridges += members::create_bridges(program, decl)
            .map_err(|err| err.with_frame(NodeFrame::type_(program, decl.id, decl.span)))?;
    }

    log::info!(
        "Lowered {} types with {} bridge methods",
        decls().count(),
        bridges
    );
    Ok(())
}

/// Lowering state of a single method body.
#[derive(Debug)]
pub(crate) struct Lowerer<'a, 'ctx> {
    program: &'a mut Program<'ctx>,
    decl: &'a ast::TypeDecl<'ctx>,
    method: MethodId,
    labels: LabelTable<'ctx>,
}

#[bon]
impl<'a, 'ctx> Lowerer<'a, 'ctx> {
    #[builder(finish_fn = build)]
    fn new(
        program: &'a mut Program<'ctx>,
        decl: &'a ast::TypeDecl<'ctx>,
        method: MethodId,
    ) -> Self {
        Self {
            program,
            decl,
            method,
            labels: LabelTable::default(),
        }
    }

    #[inline]
    fn ty(&self) -> TypeId {
        self.decl.id
    }

    #[inline]
    fn into_labels(self) -> Vec<Cow<'ctx, str>> {
        self.labels.into_names()
    }

    pub fn lower_expr(&mut self, expr: &ast::Expr<'ctx>) -> Lowered<ir::Expr> {
        self.lower_expr_inner(expr).with_node(expr)
    }

    fn lower_expr_inner(&mut self, expr: &ast::Expr<'ctx>) -> Lowered<ir::Expr> {
        let lowered = match &expr.constant {
            Some(constant) => self.literal(constant.into(), expr.span),
            None => self.lower_expr_kind(expr)?,
        };
        Ok(self.convert(lowered, expr.conversion, &expr.ty)?)
    }

    fn lower_expr_kind(&mut self, expr: &ast::Expr<'ctx>) -> Lowered<ir::Expr> {
        let span = expr.span;
        let res = match &expr.kind {
            ast::ExprKind::Null => self.literal(Literal::Null, span),
            ast::ExprKind::This => self.this(span)?,
            ast::ExprKind::QualifiedThis(target) => self.qualified_this(*target, span)?,
            ast::ExprKind::Literal => {
                return Err(Error::UnexpectedNode("a literal without a value").into());
            }
            ast::ExprKind::Local(local) => ir::Expr::Local(*local, span),
            ast::ExprKind::Param(index) => ir::Expr::Param(*index, span),
            ast::ExprKind::CapturedLocal(name) => self.captured_local(name, &expr.ty, span)?,
            ast::ExprKind::Field {
                receiver,
                field,
                generic_cast,
            } => {
                let def = &self.program[*field];
                let receiver = match receiver {
                    _ if def.is_static() => None,
                    Some(receiver) => Some(self.lower_expr(receiver)?),
                    None => Some(self.this_ref(def.parent(), span)?),
                };
                generic_cast_of(ir::Expr::field(receiver, *field, span), generic_cast)
            }
            ast::ExprKind::ArrayAccess { array, index } => ir::Expr::ArrayRef {
                array: Box::new(self.lower_expr(array)?),
                index: Box::new(self.lower_expr(index)?),
                span,
            },
            ast::ExprKind::Call {
                receiver,
                method,
                args,
                generic_cast,
            } => {
                let def = &self.program[*method];
                let (receiver, static_dispatch) = match receiver {
                    _ if def.is_static() => (None, false),
                    ast::Receiver::Implicit => (Some(self.this_ref(def.parent(), span)?), false),
                    ast::Receiver::Super => (Some(self.this(span)?), true),
                    ast::Receiver::QualifiedSuper(outer) => {
                        (Some(self.qualified_this(*outer, span)?), true)
                    }
                    ast::Receiver::Expr(receiver) => (Some(self.lower_expr(receiver)?), false),
                };
                let call = ir::Call {
                    receiver: receiver.map(Box::new),
                    method: *method,
                    args: self.call_args(*method, args)?,
                    static_dispatch,
                };
                generic_cast_of(ir::Expr::call(call, span), generic_cast)
            }
            ast::ExprKind::New {
                ctor,
                args,
                qualifier,
                enum_constant,
                outer_instances,
                outer_locals,
            } => {
                let mut call_args = vec![];
                if let Some((name, ordinal)) = enum_constant {
                    call_args.push(self.literal(Literal::String(name.clone()), span));
                    call_args.push(self.literal(Literal::Int(*ordinal), span));
                }
                call_args.extend(self.call_args(*ctor, args)?);

                let qualifiers = match qualifier {
                    Some(qualifier) => {
                        let class = self.class_of(&qualifier.ty)?;
                        let mut list = vec![(self.lower_expr(qualifier)?, class)];
                        // the qualifier takes precedence over the implicit enclosing instance
                        if !self.program[self.method].is_static() {
                            list.push((ir::Expr::This(self.ty(), span), self.ty()));
                        }
                        Some(list)
                    }
                    None => None,
                };
                for &outer in outer_instances {
                    let arg = match &qualifiers {
                        Some(list) => self.create_this_ref(outer, list.iter().cloned(), span)?,
                        None => self.this_ref(outer, span)?,
                    };
                    call_args.push(arg);
                }
                for local in outer_locals {
                    call_args.push(self.lower_expr(local)?);
                }

                let class = self.program[*ctor].parent();
                let instance = ir::Expr::NewInstance(class, span);
                ir::Expr::call(ir::Call::new(Some(instance), *ctor, call_args), span)
            }
            ast::ExprKind::NewArray { dims } => ir::Expr::NewArray {
                ty: expr.ty.clone(),
                dims: dims
                    .iter()
                    .map(|dim| dim.as_ref().map(|dim| self.lower_expr(dim)).transpose())
                    .collect::<Result<_, _>>()?,
                span,
            },
            ast::ExprKind::ArrayInit(elems) => ir::Expr::ArrayInit {
                ty: expr.ty.clone(),
                elems: self.lower_exprs(elems)?,
                span,
            },
            ast::ExprKind::Assign { target, value } => ir::Expr::assign(
                self.lower_expr(target)?,
                self.lower_expr(value)?,
                span,
            ),
            ast::ExprKind::CompoundAssign { op, target, value } => {
                let is_string = self.is_string(&target.ty);
                let op = BinaryOp::compound(*op, is_string)
                    .ok_or(Error::UnexpectedNode("a compound assignment with this operator"))?;
                ir::Expr::binary(op, self.lower_expr(target)?, self.lower_expr(value)?, span)
            }
            ast::ExprKind::Binary { op, lhs, rhs } => {
                let op = BinaryOp::from_source(*op, self.is_string(&expr.ty));
                ir::Expr::binary(op, self.lower_expr(lhs)?, self.lower_expr(rhs)?, span)
            }
            ast::ExprKind::Unary { op, operand } => ir::Expr::Unary {
                op: *op,
                operand: Box::new(self.lower_expr(operand)?),
                span,
            },
            ast::ExprKind::Update {
                op,
                is_prefix: true,
                target,
            } => ir::Expr::Prefix {
                op: *op,
                target: Box::new(self.lower_expr(target)?),
                span,
            },
            ast::ExprKind::Update { op, target, .. } => ir::Expr::Postfix {
                op: *op,
                target: Box::new(self.lower_expr(target)?),
                span,
            },
            ast::ExprKind::Conditional { cond, then, else_ } => ir::Expr::Conditional {
                cond: Box::new(self.lower_expr(cond)?),
                then: Box::new(self.lower_expr(then)?),
                else_: Box::new(self.lower_expr(else_)?),
                span,
            },
            ast::ExprKind::Cast(inner) => ir::Expr::Cast {
                expr: Box::new(self.lower_expr(inner)?),
                ty: expr.ty.clone(),
                span,
            },
            ast::ExprKind::InstanceOf { expr, target } => ir::Expr::InstanceOf {
                expr: Box::new(self.lower_expr(expr)?),
                ty: target.clone(),
                span,
            },
            ast::ExprKind::ClassLiteral(ty) => self.literal(Literal::Class(ty.clone()), span),
        };
        Ok(res)
    }

    fn lower_exprs(&mut self, exprs: &[ast::Expr<'ctx>]) -> Lowered<Vec<ir::Expr>> {
        exprs.iter().map(|expr| self.lower_expr(expr)).collect()
    }

    /// Lowers the source arguments of a call, packing trailing variadic arguments into an array.
    fn call_args(
        &mut self,
        method: MethodId,
        args: &[ast::Expr<'ctx>],
    ) -> Lowered<Vec<ir::Expr>> {
        let def = &self.program[method];
        let is_varargs = def.flags().is_varargs();
        let params = def
            .source_params()
            .map(|param| param.ty.clone())
            .collect::<Vec<_>>();
        let fixed = if is_varargs {
            params.len().saturating_sub(1)
        } else {
            params.len()
        };

        if args.len() < fixed {
            if method == self.program.well_known().enum_ctor {
                log::warn!(
                    "Call to the enum root constructor with {} of {} arguments, \
                     the synthetic name and ordinal are passed by the caller",
                    args.len(),
                    fixed
                );
                return Ok(vec![]);
            }
            return Err(self.arg_count_mismatch(method, fixed, args.len()).into());
        }
        if !is_varargs && args.len() > fixed {
            return Err(self.arg_count_mismatch(method, fixed, args.len()).into());
        }

        let mut lowered = self.lower_exprs(&args[..fixed])?;
        if let Some(vararg_ty) = is_varargs.then(|| params.last().cloned()).flatten() {
            let rest = &args[fixed..];
            match rest {
                [arg] if arg.ty.dims() > 0 && arg.ty.dims() == vararg_ty.dims() => {
                    lowered.push(self.lower_expr(arg)?);
                }
                _ => {
                    let span = rest
                        .iter()
                        .map(|arg| arg.span)
                        .reduce(|acc, span| acc.merge(&span))
                        .or_else(|| args.last().map(|arg| arg.span))
                        .unwrap_or(self.decl.span);
                    lowered.push(ir::Expr::ArrayInit {
                        ty: vararg_ty,
                        elems: self.lower_exprs(rest)?,
                        span,
                    });
                }
            }
        }
        Ok(lowered)
    }

    fn arg_count_mismatch(&self, method: MethodId, expected: usize, found: usize) -> Error {
        let signature = self.program.display_signature(method).to_string();
        Error::ArgCountMismatch(signature, expected, found)
    }

    /// Applies the implicit conversion recorded by the front end for a value of type `ty`.
    pub(crate) fn convert(
        &mut self,
        expr: ir::Expr,
        conversion: Conversion,
        ty: &Type,
    ) -> LowerResult<ir::Expr> {
        let span = expr.span();
        match conversion {
            Conversion::None => Ok(expr),
            Conversion::Box(prim) => {
                let value_of = self.program.well_known().wrapper(prim).value_of;
                Ok(ir::Expr::call(ir::Call::static_(value_of, vec![expr]), span))
            }
            Conversion::Unbox => {
                let unbox = ty
                    .as_class()
                    .and_then(|&class| self.program.well_known().wrapper_for_class(class))
                    .map(|wrapper| wrapper.unbox)
                    .ok_or_else(|| Error::InvalidUnbox(self.type_name(ty).into_owned()))?;
                Ok(ir::Expr::call(ir::Call::new(Some(expr), unbox, vec![]), span))
            }
        }
    }

    fn literal(&mut self, literal: Literal<'ctx>, span: Span) -> ir::Expr {
        ir::Expr::Literal(self.program.literal(literal), span)
    }

    fn this(&self, span: Span) -> LowerResult<ir::Expr> {
        let method = &self.program[self.method];
        if method.is_static() {
            return Err(Error::NoReceiver(method.name().to_owned()));
        }
        Ok(ir::Expr::This(self.ty(), span))
    }

    fn is_string(&self, ty: &Type) -> bool {
        *ty == Type::Class(self.program.well_known().string)
    }

    fn class_of(&self, ty: &Type) -> LowerResult<TypeId> {
        ty.as_class()
            .copied()
            .ok_or_else(|| Error::NoOuterReference(self.type_name(ty).into_owned()))
    }

    fn type_name(&self, ty: &Type) -> Cow<'ctx, str> {
        self.program.display_type(ty).to_string().into()
    }
}

fn generic_cast_of(expr: ir::Expr, cast: &Option<Type>) -> ir::Expr {
    match cast {
        Some(ty) => {
            let span = expr.span();
            ir::Expr::Cast {
                expr: Box::new(expr),
                ty: ty.clone(),
                span,
            }
        }
        None => expr,
    }
}
