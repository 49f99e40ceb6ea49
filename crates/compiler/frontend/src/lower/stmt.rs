use jolt_ast::{self as ast, Conversion, LocalId, Primitive, Span, Type};

use super::{Error, Lowered, Lowerer, WithNode};
use crate::ir::{self, BinaryOp};
use crate::program::{Literal, Local};

impl<'ctx> Lowerer<'_, 'ctx> {
    /// Lowers a statement sequence, dropping everything after the first statement that never
    /// completes normally.
    pub(super) fn lower_stmts(&mut self, stmts: &[ast::Stmt<'ctx>]) -> Lowered<ir::Block> {
        let mut block = ir::Block::default();
        for stmt in stmts {
            let Some(stmt) = self.lower_stmt(stmt)? else {
                continue;
            };
            let breaks = stmt.unconditional_control_break();
            block.stmts.push_back(stmt);
            if breaks {
                break;
            }
        }
        Ok(block)
    }

    /// Switch bodies are flat and `case` labels make code after a jump reachable again.
    fn lower_switch_body(&mut self, stmts: &[ast::Stmt<'ctx>]) -> Lowered<ir::Block> {
        let mut block = ir::Block::default();
        for stmt in stmts {
            block.stmts.extend(self.lower_stmt(stmt)?);
        }
        Ok(block)
    }

    pub(super) fn lower_stmt(&mut self, stmt: &ast::Stmt<'ctx>) -> Lowered<Option<ir::Stmt>> {
        self.lower_stmt_inner(stmt).with_node(stmt)
    }

    fn lower_stmt_inner(&mut self, stmt: &ast::Stmt<'ctx>) -> Lowered<Option<ir::Stmt>> {
        let span = stmt.span;
        let res = match &stmt.kind {
            ast::StmtKind::Empty | ast::StmtKind::LocalType(_) => return Ok(None),
            ast::StmtKind::Expr(expr) => self.lower_expr(expr)?.into(),
            ast::StmtKind::LocalDecl { local, init } => ir::Stmt::Decl {
                place: Box::new(ir::Expr::Local(*local, span)),
                init: self.lower_boxed(init.as_ref())?,
                span,
            },
            ast::StmtKind::Block(stmts) => ir::Stmt::Block(self.lower_stmts(stmts)?, span),
            ast::StmtKind::If { cond, then, else_ } => {
                let lowered_cond = self.lower_expr(cond)?;
                let then = if cond.is_constant_false() {
                    None
                } else {
                    self.lower_stmt(then)?.map(Box::new)
                };
                let else_ = match else_ {
                    Some(else_) if !cond.is_constant_true() => self.lower_stmt(else_)?.map(Box::new),
                    _ => None,
                };
                ir::Stmt::If {
                    cond: Box::new(lowered_cond),
                    then,
                    else_,
                    span,
                }
            }
            ast::StmtKind::While { cond, body } => {
                let lowered_cond = self.lower_expr(cond)?;
                let body = if cond.is_constant_false() {
                    None
                } else {
                    self.lower_stmt(body)?.map(Box::new)
                };
                ir::Stmt::While {
                    cond: Box::new(lowered_cond),
                    body,
                    span,
                }
            }
            ast::StmtKind::DoWhile { body, cond } => ir::Stmt::DoWhile {
                body: self.lower_stmt(body)?.map(Box::new),
                cond: Box::new(self.lower_expr(cond)?),
                span,
            },
            ast::StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let init = init
                    .iter()
                    .filter_map(|stmt| self.lower_stmt(stmt).transpose())
                    .collect::<Result<_, _>>()?;
                let lowered_cond = self.lower_boxed(cond.as_ref())?;
                let update = self.lower_exprs(update)?;
                let body = if cond.as_ref().is_some_and(ast::Expr::is_constant_false) {
                    None
                } else {
                    self.lower_stmt(body)?.map(Box::new)
                };
                ir::Stmt::For {
                    init,
                    cond: lowered_cond,
                    update,
                    body,
                    span,
                }
            }
            ast::StmtKind::ForEach {
                element,
                element_type,
                iterable,
                element_conversion,
                body,
            } => self.lower_foreach(
                *element,
                element_type,
                iterable,
                *element_conversion,
                body,
                span,
            )?,
            ast::StmtKind::Labeled { label, body } => {
                let label = self.labels.get_or_create(label);
                let Some(body) = self.lower_stmt(body)? else {
                    return Ok(None);
                };
                ir::Stmt::Labeled {
                    label,
                    body: Box::new(body),
                    span,
                }
            }
            ast::StmtKind::Break(label) => {
                ir::Stmt::Break(label.as_ref().map(|l| self.labels.get_or_create(l)), span)
            }
            ast::StmtKind::Continue(label) => {
                ir::Stmt::Continue(label.as_ref().map(|l| self.labels.get_or_create(l)), span)
            }
            ast::StmtKind::Return(_) if self.program[self.method].is_constructor() => {
                ir::Stmt::Return(Some(Box::new(ir::Expr::This(self.ty(), span))), span)
            }
            ast::StmtKind::Return(expr) => ir::Stmt::Return(self.lower_boxed(expr.as_ref())?, span),
            ast::StmtKind::Switch { selector, body } => {
                let mut lowered = self.lower_expr(selector)?;
                if self.is_enum_value(&selector.ty) {
                    let ordinal = self.program.well_known().enum_ordinal;
                    let call = ir::Call::new(Some(lowered), ordinal, vec![]);
                    lowered = ir::Expr::call(call, selector.span);
                }
                ir::Stmt::Switch {
                    selector: Box::new(lowered),
                    body: self.lower_switch_body(body)?,
                    span,
                }
            }
            ast::StmtKind::Case(expr) => {
                let lowered = match expr {
                    Some(expr) => Some(Box::new(self.lower_case_label(expr)?)),
                    None => None,
                };
                ir::Stmt::Case(lowered, span)
            }
            ast::StmtKind::Throw(expr) => ir::Stmt::Throw(Box::new(self.lower_expr(expr)?), span),
            ast::StmtKind::Try {
                body,
                catches,
                finally,
            } => ir::Stmt::Try {
                body: self.lower_stmts(body)?,
                catches: catches
                    .iter()
                    .map(|catch| -> Lowered<_> {
                        Ok(ir::Catch {
                            local: catch.local,
                            body: self.lower_stmts(&catch.body)?,
                        })
                    })
                    .collect::<Result<_, _>>()?,
                finally: finally
                    .as_ref()
                    .map(|finally| self.lower_stmts(finally))
                    .transpose()?,
                span,
            },
            ast::StmtKind::Synchronized { lock, body } => {
                let lock = self.lower_expr(lock)?;
                let mut block = self.lower_stmts(body)?;
                block.push_prologue([lock.into()]);
                ir::Stmt::Block(block, span)
            }
            ast::StmtKind::Assert { cond, message } => ir::Stmt::Assert {
                cond: Box::new(self.lower_expr(cond)?),
                message: self.lower_boxed(message.as_ref())?,
                span,
            },
        };
        Ok(Some(res))
    }

    fn lower_boxed(
        &mut self,
        expr: Option<&ast::Expr<'ctx>>,
    ) -> Lowered<Option<Box<ir::Expr>>> {
        expr.map(|expr| self.lower_expr(expr).map(Box::new))
            .transpose()
    }

    /// Enum case labels are switched on by ordinal.
    fn lower_case_label(&mut self, expr: &ast::Expr<'ctx>) -> Lowered<ir::Expr> {
        if let ast::ExprKind::Field { field, .. } = &expr.kind
            && let Some(ordinal) = self.program[*field].ordinal()
        {
            return Ok(self.literal(Literal::Int(ordinal), expr.span));
        }
        self.lower_expr(expr)
    }

    fn is_enum_value(&self, ty: &Type) -> bool {
        let enum_ = self.program.well_known().enum_;
        ty.as_class()
            .is_some_and(|&class| self.program.is_subclass(class, enum_))
    }

    fn lower_foreach(
        &mut self,
        element: LocalId,
        element_type: &Type,
        iterable: &ast::Expr<'ctx>,
        conversion: Conversion,
        body: &ast::Stmt<'ctx>,
        span: Span,
    ) -> Lowered<ir::Stmt> {
        let name = self.program[self.method].locals()[element.index()].name.clone();
        let lowered_iterable = self.lower_expr(iterable)?;

        let (init, cond, update, fetch) = match &iterable.ty {
            Type::Array(elem_type) => {
                let int = Type::from(Primitive::Int);
                let array = self.add_temp(format!("{name}$array"), iterable.ty.clone());
                let index = self.add_temp(format!("{name}$index"), int.clone());
                let max = self.add_temp(format!("{name}$max"), int);

                let length = self.program.well_known().array_length;
                let zero = self.literal(Literal::Int(0), span);
                let init = vec![
                    decl(array, lowered_iterable, span),
                    decl(index, zero, span),
                    decl(
                        max,
                        ir::Expr::field(Some(ir::Expr::Local(array, span)), length, span),
                        span,
                    ),
                ];
                let cond = ir::Expr::binary(
                    BinaryOp::Lt,
                    ir::Expr::Local(index, span),
                    ir::Expr::Local(max, span),
                    span,
                );
                let update = ir::Expr::Prefix {
                    op: ast::UpdateOp::Inc,
                    target: Box::new(ir::Expr::Local(index, span)),
                    span,
                };
                let fetch = ir::Expr::ArrayRef {
                    array: Box::new(ir::Expr::Local(array, span)),
                    index: Box::new(ir::Expr::Local(index, span)),
                    span,
                };
                let fetch = self.convert(fetch, conversion, elem_type)?;
                (init, cond, vec![update], fetch)
            }
            Type::Class(_) => {
                let well_known = self.program.well_known();
                let (iterator_type, iterator, has_next, next, object) = (
                    Type::Class(well_known.iterator),
                    well_known.iterable_iterator,
                    well_known.iterator_has_next,
                    well_known.iterator_next,
                    Type::Class(well_known.object),
                );
                let iter = self.add_temp(format!("{name}$iterator"), iterator_type);

                let get_iter = ir::Call::new(Some(lowered_iterable), iterator, vec![]);
                let init = vec![decl(iter, ir::Expr::call(get_iter, span), span)];
                let has_next = ir::Call::new(Some(ir::Expr::Local(iter, span)), has_next, vec![]);
                let cond = ir::Expr::call(has_next, span);

                let next = ir::Call::new(Some(ir::Expr::Local(iter, span)), next, vec![]);
                let mut fetch = ir::Expr::call(next, span);
                if *element_type != object {
                    fetch = ir::Expr::Cast {
                        expr: Box::new(fetch),
                        ty: element_type.clone(),
                        span,
                    };
                }
                let fetch = self.convert(fetch, conversion, element_type)?;
                (init, cond, vec![], fetch)
            }
            other => return Err(Error::NotIterable(self.type_name(other).into_owned()).into()),
        };

        let mut block = match self.lower_stmt(body)? {
            Some(ir::Stmt::Block(block, _)) => block,
            Some(stmt) => ir::Block::new([stmt]),
            None => ir::Block::default(),
        };
        block.push_prologue([decl(element, fetch, span)]);

        Ok(ir::Stmt::For {
            init,
            cond: Some(Box::new(cond)),
            update,
            body: Some(Box::new(ir::Stmt::Block(block, body.span))),
            span,
        })
    }

    fn add_temp(&mut self, name: String, ty: Type) -> LocalId {
        self.program
            .add_local(self.method, Local::synthetic(name, ty))
    }
}

fn decl(local: LocalId, init: ir::Expr, span: Span) -> ir::Stmt {
    ir::Stmt::Decl {
        place: Box::new(ir::Expr::Local(local, span)),
        init: Some(Box::new(init)),
        span,
    }
}
