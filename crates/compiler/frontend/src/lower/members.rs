use std::iter;

use jolt_ast::{self as ast, CtorCallKind, FieldId, MethodId, Span, Type, TypeId};

use super::{Error, LowerResult, Lowered, Lowerer, NodeFrame};
use crate::ir;
use crate::options::LowerOptions;
use crate::program::{
    Body, Field, FieldFlags, Literal, Method, MethodFlags, Param, ParamKind, Program,
};

const ENUM_MAP_FIELD: &str = "enum$map";

/// Lowers the initializers and method bodies of a single type.
pub(super) fn lower_type<'ctx>(
    program: &mut Program<'ctx>,
    decl: &ast::TypeDecl<'ctx>,
) -> Lowered<()> {
    log::debug!("Lowering type {}", program[decl.id].name());

    let enum_map = program[decl.id]
        .is_enum()
        .then(|| add_enum_map_field(program, decl));

    lower_clinit(program, decl, enum_map)?;
    lower_init(program, decl)?;

    for method in &decl.methods {
        lower_method(program, decl, method)
            .map_err(|err| err.with_frame(NodeFrame::method(program, method.id, method.span)))?;
    }

    if let Some(enum_map) = enum_map {
        implement_enum_accessors(program, decl, enum_map);
    }
    Ok(())
}

fn lower_clinit<'ctx>(
    program: &mut Program<'ctx>,
    decl: &ast::TypeDecl<'ctx>,
    enum_map: Option<FieldId>,
) -> Lowered<()> {
    let Some(clinit) = program[decl.id].clinit() else {
        return Ok(());
    };
    let super_clinit = program[decl.id]
        .super_class()
        .and_then(|sup| program[sup].clinit());

    let mut lowerer = Lowerer::builder()
        .program(program)
        .decl(decl)
        .method(clinit)
        .build();
    let mut block = ir::Block::default();

    if let Some(super_clinit) = super_clinit {
        let call = ir::Call::static_(super_clinit, vec![]);
        block.stmts.push_back(ir::Expr::call(call, decl.span).into());
    }
    for member in &decl.members {
        match member {
            ast::Member::Field {
                field,
                init: Some(init),
                span,
            } if lowerer.program[*field].is_static() => {
                block.stmts.push_back(lowerer.field_init(*field, init, *span)?);
            }
            ast::Member::Initializer {
                is_static: true,
                body,
                span,
            } => {
                block
                    .stmts
                    .push_back(ir::Stmt::Block(lowerer.lower_stmts(body)?, *span));
            }
            _ => {}
        }
    }
    if let Some(enum_map) = enum_map {
        block.stmts.push_back(lowerer.enum_map_init(enum_map));
    }

    let labels = lowerer.into_labels();
    program.set_body(clinit, Body::Code { labels, block })?;
    Ok(())
}

fn lower_init<'ctx>(program: &mut Program<'ctx>, decl: &ast::TypeDecl<'ctx>) -> Lowered<()> {
    let Some(init) = program[decl.id].init() else {
        return Ok(());
    };

    let mut lowerer = Lowerer::builder()
        .program(program)
        .decl(decl)
        .method(init)
        .build();
    let mut block = ir::Block::default();

    for member in &decl.members {
        match member {
            ast::Member::Field {
                field,
                init: Some(init),
                span,
            } if !lowerer.program[*field].is_static() => {
                block.stmts.push_back(lowerer.field_init(*field, init, *span)?);
            }
            ast::Member::Initializer {
                is_static: false,
                body,
                span,
            } => {
                block
                    .stmts
                    .push_back(ir::Stmt::Block(lowerer.lower_stmts(body)?, *span));
            }
            _ => {}
        }
    }

    let labels = lowerer.into_labels();
    program.set_body(init, Body::Code { labels, block })?;
    Ok(())
}

fn lower_method<'ctx>(
    program: &mut Program<'ctx>,
    decl: &ast::TypeDecl<'ctx>,
    method: &ast::MethodDecl<'ctx>,
) -> Lowered<()> {
    let body = match &method.body {
        ast::MethodBody::None => return Ok(()),
        ast::MethodBody::Foreign(func) => Body::Foreign {
            func: func.clone(),
            refs: vec![],
        },
        ast::MethodBody::Statements(stmts) => {
            let is_constructor = program[method.id].is_constructor();
            let mut lowerer = Lowerer::builder()
                .program(program)
                .decl(decl)
                .method(method.id)
                .build();
            let block = if is_constructor {
                lowerer.lower_ctor(method, stmts)?
            } else {
                lowerer.lower_stmts(stmts)?
            };
            Body::Code {
                labels: lowerer.into_labels(),
                block,
            }
        }
    };
    program.set_body(method.id, body)?;

    log::debug!("Lowered method {}", program.display_signature(method.id));
    Ok(())
}

impl<'ctx> Lowerer<'_, 'ctx> {
    /// Lowers a constructor into an instance method that returns `this`.
    fn lower_ctor(
        &mut self,
        method: &ast::MethodDecl<'ctx>,
        stmts: &[ast::Stmt<'ctx>],
    ) -> Lowered<ir::Block> {
        let span = method.span;
        let this = ir::Expr::This(self.ty(), span);
        let delegates = method
            .ctor_call
            .as_ref()
            .is_some_and(|call| call.kind == CtorCallKind::This);
        let mut block = ir::Block::default();

        if let Some(clinit) = self.program[self.ty()].clinit() {
            let call = ir::Call::static_(clinit, vec![]);
            block.stmts.push_back(ir::Expr::call(call, span).into());
        }

        // a delegating constructor leaves the synthetic fields and initializers to its target
        if !delegates {
            let params = self.program[self.method]
                .synthetic_params()
                .map(|(index, _)| index)
                .collect::<Vec<_>>();
            let args = self.decl.outer_instances.iter().chain(&self.decl.outer_locals);
            for (index, arg) in iter::zip(params, args) {
                if let Some(field) = arg.field {
                    let place = ir::Expr::field(Some(this.clone()), field, span);
                    let assign = ir::Expr::assign(place, ir::Expr::Param(index, span), span);
                    block.stmts.push_back(assign.into());
                }
            }
        }

        if let Some(call) = &method.ctor_call {
            let call = self.lower_ctor_call(call)?;
            block.stmts.push_back(call.into());
        }

        if !delegates && let Some(init) = self.program[self.ty()].init() {
            let call = ir::Call::new(Some(this.clone()), init, vec![]);
            block.stmts.push_back(ir::Expr::call(call, span).into());
        }

        block.stmts.extend(self.lower_stmts(stmts)?.stmts);
        block
            .stmts
            .push_back(ir::Stmt::Return(Some(Box::new(this)), span));
        Ok(block)
    }

    fn lower_ctor_call(&mut self, call: &ast::CtorCall<'ctx>) -> Lowered<ir::Expr> {
        let span = call.span;
        let mut args = vec![];

        let enum_ = self.program.well_known().enum_;
        if self.program.is_subclass(self.ty(), enum_) {
            let method = &self.program[self.method];
            let name = method.param_index(ParamKind::EnumName);
            let ordinal = method.param_index(ParamKind::EnumOrdinal);
            let (Some(name), Some(ordinal)) = (name, ordinal) else {
                let signature = self.program.display_signature(self.method).to_string();
                return Err(Error::MissingEnumParams(signature).into());
            };
            args.push(ir::Expr::Param(name, span));
            args.push(ir::Expr::Param(ordinal, span));
        }

        args.extend(self.call_args(call.ctor, &call.args)?);

        match call.kind {
            CtorCallKind::Super => {
                let worklist = match &call.qualifier {
                    Some(qualifier) => {
                        let class = self.class_of(&qualifier.ty)?;
                        vec![(self.lower_expr(qualifier)?, class)]
                    }
                    None => self.outer_instance_params(span),
                };
                for &outer in &call.outer_instances {
                    args.push(self.create_this_ref(outer, worklist.iter().cloned(), span)?);
                }
                for local in &call.outer_locals {
                    args.push(self.outer_local_param(local, span)?);
                }
            }
            CtorCallKind::This => {
                let params = self.program[self.method]
                    .synthetic_params()
                    .map(|(index, _)| ir::Expr::Param(index, span));
                args.extend(params);
            }
        }

        let call = ir::Call {
            receiver: Some(Box::new(ir::Expr::This(self.ty(), span))),
            method: call.ctor,
            args,
            static_dispatch: true,
        };
        Ok(ir::Expr::call(call, span))
    }

    /// Finds the parameter of the calling constructor that carries a local captured by the
    /// super class, the last match wins.
    fn outer_local_param(
        &self,
        local: &ast::SyntheticArg<'ctx>,
        span: Span,
    ) -> LowerResult<ir::Expr> {
        self.program[self.method]
            .params()
            .iter()
            .rposition(|param| param.name == local.name && param.ty == local.ty)
            .map(|index| ir::Expr::Param(index as u16, span))
            .ok_or_else(|| Error::MissingOuterLocalParam(local.name.to_string()))
    }

    fn field_init(
        &mut self,
        field: FieldId,
        init: &ast::Expr<'ctx>,
        span: Span,
    ) -> Lowered<ir::Stmt> {
        let def = &self.program[field];
        let (is_static, is_final) = (def.is_static(), def.flags().is_final());

        if is_final && let Some(constant) = &init.constant {
            let literal = self.program.literal(constant.into());
            self.program.set_field_constant(field, literal);
        }

        let receiver = if is_static {
            None
        } else {
            Some(self.this(span)?)
        };
        Ok(ir::Stmt::Decl {
            place: Box::new(ir::Expr::field(receiver, field, span)),
            init: Some(Box::new(self.lower_expr(init)?)),
            span,
        })
    }

    /// Initializes the enum name table, keys are prefixed to stay clear of built-in properties.
    fn enum_map_init(&mut self, enum_map: FieldId) -> ir::Stmt {
        let span = self.decl.span;
        let entries = self
            .program
            .enum_constants(self.ty())
            .into_iter()
            .map(|constant| {
                let key = format!("_{}", self.program[constant].name());
                let key = self.program.literal(Literal::String(key.into()));
                (key, ir::Expr::field(None, constant, span))
            })
            .collect();
        ir::Stmt::Decl {
            place: Box::new(ir::Expr::field(None, enum_map, span)),
            init: Some(Box::new(ir::Expr::ObjectLiteral { entries, span })),
            span,
        }
    }
}

fn add_enum_map_field<'ctx>(program: &mut Program<'ctx>, decl: &ast::TypeDecl<'ctx>) -> FieldId {
    let object = program.well_known().object;
    program.add_field(
        Field::builder()
            .name(ENUM_MAP_FIELD)
            .parent(decl.id)
            .ty(object.into())
            .flags(
                FieldFlags::new()
                    .with_is_static(true)
                    .with_is_final(true)
                    .with_is_synthetic(true),
            )
            .span(decl.span)
            .build(),
    )
}

/// Implements `values()` and `valueOf(String)` on top of the constants and the name table.
fn implement_enum_accessors<'ctx>(
    program: &mut Program<'ctx>,
    decl: &ast::TypeDecl<'ctx>,
    enum_map: FieldId,
) {
    let (ty, span) = (decl.id, decl.span);
    let array_type = Type::array_of(ty.into());
    let string = program.well_known().string;
    let value_of_helper = program.well_known().enum_value_of;

    let values = find_or_add_static(program, ty, "values", &[], array_type.clone(), span);
    let elems = program
        .enum_constants(ty)
        .into_iter()
        .map(|constant| ir::Expr::field(None, constant, span))
        .collect();
    let array = ir::Expr::ArrayInit {
        ty: array_type,
        elems,
        span,
    };
    program.replace_body(values, returning(array, span));

    let value_of = find_or_add_static(program, ty, "valueOf", &[string.into()], ty.into(), span);
    let args = vec![
        ir::Expr::field(None, enum_map, span),
        ir::Expr::Param(0, span),
    ];
    let lookup = ir::Expr::call(ir::Call::static_(value_of_helper, args), span);
    let cast = ir::Expr::Cast {
        expr: Box::new(lookup),
        ty: ty.into(),
        span,
    };
    program.replace_body(value_of, returning(cast, span));

    log::debug!("Implemented enum accessors of {}", program[ty].name());
}

fn find_or_add_static<'ctx>(
    program: &mut Program<'ctx>,
    ty: TypeId,
    name: &'static str,
    params: &[Type],
    return_type: Type,
    span: Span,
) -> MethodId {
    let existing = program[ty].methods().iter().copied().find(|&id| {
        let method = &program[id];
        method.is_static()
            && method.name() == name
            && method.params().iter().map(|p| &p.ty).eq(params)
    });
    existing.unwrap_or_else(|| {
        let params = params
            .iter()
            .enumerate()
            .map(|(i, ty)| Param::new(format!("arg{i}"), ty.clone()))
            .collect();
        program.add_method(
            Method::builder()
                .name(name)
                .parent(ty)
                .params(params)
                .return_type(return_type)
                .flags(MethodFlags::new().with_is_static(true).with_is_synthetic(true))
                .span(span)
                .build(),
        )
    })
}

fn returning<'ctx>(expr: ir::Expr, span: Span) -> Body<'ctx> {
    Body::code(ir::Block::new([ir::Stmt::Return(Some(Box::new(expr)), span)]))
}

/// Implements the well-known methods whose results depend on the options.
pub(super) fn implement_well_known(program: &mut Program<'_>, options: &LowerOptions) {
    let span = Span::synthetic();
    let well_known = program.well_known();
    let (assertion_status, metadata_enabled) = (
        well_known.class_desired_assertion_status,
        well_known.class_is_metadata_enabled,
    );

    let enabled = program.literal(Literal::Bool(options.enable_assertions()));
    program.replace_body(assertion_status, returning(ir::Expr::Literal(enabled, span), span));

    if !options.class_metadata() {
        let disabled = program.literal(Literal::Bool(false));
        program.replace_body(metadata_enabled, returning(ir::Expr::Literal(disabled, span), span));
    }
}

/// Synthesizes the bridge methods requested for a type, returning how many were created.
pub(super) fn create_bridges<'ctx>(
    program: &mut Program<'ctx>,
    decl: &ast::TypeDecl<'ctx>,
) -> Lowered<usize> {
    if program[decl.id].is_interface() {
        return Ok(0);
    }

    for bridge in &decl.bridges {
        let target = &program[bridge.target];
        let impl_types = target
            .params()
            .iter()
            .map(|param| param.ty.clone())
            .collect::<Vec<_>>();
        let params = iter::zip(target.params(), &bridge.params)
            .map(|(param, ty)| Param::new(param.name.clone(), ty.clone()))
            .collect();

        let id = program.add_method(
            Method::builder()
                .name(bridge.name.clone())
                .parent(decl.id)
                .params(params)
                .return_type(bridge.return_type.clone())
                .flags(MethodFlags::new().with_is_synthetic(true))
                .span(bridge.span)
                .build(),
        );

        let span = bridge.span;
        let args = iter::zip(&bridge.params, impl_types)
            .enumerate()
            .map(|(index, (bridge_type, impl_type))| {
                let param = ir::Expr::Param(index as u16, span);
                if program.can_trivially_cast(bridge_type, &impl_type) {
                    param
                } else {
                    ir::Expr::Cast {
                        expr: Box::new(param),
                        ty: impl_type,
                        span,
                    }
                }
            })
            .collect();
        let call = ir::Call::new(Some(ir::Expr::This(decl.id, span)), bridge.target, args);
        let call = ir::Expr::call(call, span);
        let stmt = if bridge.return_type == Type::Void {
            call.into()
        } else {
            ir::Stmt::Return(Some(Box::new(call)), span)
        };
        program.set_body(id, Body::code(ir::Block::new([stmt])))?;

        let mut overrides = program.find_overridden(id);
        let transitive = overrides
            .iter()
            .flat_map(|&over| program[over].overrides().iter().copied())
            .collect::<Vec<_>>();
        overrides.extend(transitive);
        program.add_overrides(id, overrides);

        log::debug!("Created bridge {}", program.display_signature(id));
    }
    Ok(decl.bridges.len())
}
