use std::mem;

use jolt_ast::{self as ast, Constant, FieldId, MethodId, Primitive, Span, Type, TypeId};

use crate::diagnostic::{Diagnostic, Reporter};
use crate::ir::{ForeignRef, ForeignTarget};
use crate::options::LowerOptions;
use crate::program::{Body, Program};

const NULL_CLASS: &str = "null";
const NULL_FIELD: &str = "nullField";
const NULL_METHOD: &str = "nullMethod()";
const CONSTRUCTOR: &str = "new";
const WILDCARD: &str = "*";

/// Resolves the host references embedded in every foreign method body of the program.
///
/// References to compile-time constants are inlined as literals, every other reference is
/// recorded on the body. Problems are reported and do not stop the resolution of the remaining
/// references.
pub fn resolve_foreign_refs<'ctx>(
    program: &mut Program<'ctx>,
    options: &LowerOptions,
    reporter: &mut Reporter<Diagnostic<'ctx>>,
) {
    let methods = program
        .methods()
        .filter(|(_, method)| matches!(method.body(), Body::Foreign { .. }))
        .map(|(id, _)| id)
        .collect::<Vec<_>>();
    let mut resolved = 0;

    for &id in &methods {
        let Body::Foreign { mut func, .. } = mem::take(program.body_mut(id)) else {
            continue;
        };
        let mut resolver = Resolver {
            program,
            options,
            reporter,
            refs: vec![],
        };
        for stmt in &mut func.body {
            resolver.visit_stmt(stmt);
        }
        let refs = resolver.refs;
        resolved += refs.len();
        *program.body_mut(id) = Body::Foreign { func, refs };
    }

    log::info!(
        "Resolved {} foreign references in {} methods",
        resolved,
        methods.len()
    );
}

struct Resolver<'a, 'ctx> {
    program: &'a mut Program<'ctx>,
    options: &'a LowerOptions,
    reporter: &'a mut Reporter<Diagnostic<'ctx>>,
    refs: Vec<ForeignRef<'ctx>>,
}

impl<'ctx> Resolver<'_, 'ctx> {
    fn visit_stmt(&mut self, stmt: &mut ast::ForeignStmt<'ctx>) {
        match stmt {
            ast::ForeignStmt::Expr(expr)
            | ast::ForeignStmt::Var {
                init: Some(expr), ..
            }
            | ast::ForeignStmt::Return(Some(expr)) => self.visit_expr(expr, false),
            ast::ForeignStmt::Var { init: None, .. }
            | ast::ForeignStmt::Return(None)
            | ast::ForeignStmt::Verbatim(_) => {}
        }
    }

    fn visit_expr(&mut self, expr: &mut ast::ForeignExpr<'ctx>, is_lvalue: bool) {
        match expr {
            ast::ForeignExpr::NameRef(name) => {
                if let Some(qualifier) = &mut name.qualifier {
                    self.visit_expr(qualifier, false);
                }
                if name.is_host_ref()
                    && let Some(constant) = self.resolve(name, is_lvalue)
                {
                    *expr = ast::ForeignExpr::Literal(constant);
                }
            }
            ast::ForeignExpr::Assign { target, value } => {
                self.visit_expr(target, true);
                self.visit_expr(value, false);
            }
            ast::ForeignExpr::Update { target, .. } => self.visit_expr(target, true),
            ast::ForeignExpr::Call { callee, args } => {
                self.visit_expr(callee, false);
                for arg in args {
                    self.visit_expr(arg, false);
                }
            }
            ast::ForeignExpr::Literal(_) | ast::ForeignExpr::Verbatim(_) => {}
        }
    }

    /// Resolves and validates a single reference, returning the constant that replaces it if
    /// there is one.
    fn resolve(&mut self, name: &ast::NameRef<'ctx>, is_lvalue: bool) -> Option<Constant<'ctx>> {
        let span = name.span;
        let target = match self.program.cached_foreign_ref(&name.ident) {
            Some(target) => {
                log::debug!("Reusing the resolution of {}", name.ident);
                target
            }
            None => {
                let res = self.lookup(&name.ident, span);
                let target = self.reporter.unwrap_err(res)?;
                log::debug!("Resolved {} to {target:?}", name.ident);
                self.program.cache_foreign_ref(name.ident.clone(), target);
                target
            }
        };

        let is_qualified = name.qualifier.is_some();
        match target {
            ForeignTarget::Field(field) => {
                let constant = self.check_field(field, is_qualified, is_lvalue, span);
                if constant.is_some() {
                    return constant;
                }
            }
            ForeignTarget::Method(method) => self.check_method(method, is_qualified, is_lvalue, span),
            ForeignTarget::NullField | ForeignTarget::NullMethod => {}
        }

        self.refs.push(ForeignRef {
            ident: name.ident.clone(),
            target,
            is_lvalue,
            span,
        });
        None
    }

    fn check_field(
        &mut self,
        field: FieldId,
        is_qualified: bool,
        is_lvalue: bool,
        span: Span,
    ) -> Option<Constant<'ctx>> {
        let def = &self.program[field];
        let display = format!("{}.{}", self.program[def.parent()].name(), def.name());

        if def.is_static() && is_qualified {
            self.reporter
                .report(Diagnostic::QualifiedStaticField(display.clone(), span));
        } else if !def.is_static() && !is_qualified {
            self.reporter
                .report(Diagnostic::UnqualifiedInstanceField(display.clone(), span));
        }
        if *def.ty() == Type::Primitive(Primitive::Long) {
            self.reporter
                .report(Diagnostic::UnsafeLongAccess(display.clone(), span));
        }

        let literal = def.constant()?;
        if is_lvalue {
            self.reporter
                .report(Diagnostic::ConstantAssignment(display, span));
            return None;
        }
        self.program[literal].to_constant()
    }

    fn check_method(&mut self, method: MethodId, is_qualified: bool, is_lvalue: bool, span: Span) {
        let def = &self.program[method];
        let display = self.program.display_signature(method).to_string();
        let is_static = def.is_static() || def.is_constructor();
        let long = Type::Primitive(Primitive::Long);

        if is_static && is_qualified {
            self.reporter
                .report(Diagnostic::QualifiedStaticMethod(display.clone(), span));
        } else if !is_static && !is_qualified {
            self.reporter
                .report(Diagnostic::UnqualifiedInstanceMethod(display.clone(), span));
        }
        if *def.return_type() == long || def.params().iter().any(|param| param.ty == long) {
            self.reporter
                .report(Diagnostic::UnsafeLongAccess(display.clone(), span));
        }
        if is_lvalue {
            self.reporter
                .report(Diagnostic::MethodAssignment(display, span));
        }
    }

    fn lookup(&self, ident: &str, span: Span) -> Result<ForeignTarget, Diagnostic<'ctx>> {
        let malformed = || Diagnostic::MalformedRef(ident.to_owned().into(), span);
        let (class, member) = ident
            .strip_prefix('@')
            .and_then(|ident| ident.split_once("::"))
            .ok_or_else(malformed)?;

        if class == NULL_CLASS {
            return match member {
                NULL_FIELD => Ok(ForeignTarget::NullField),
                NULL_METHOD => Ok(ForeignTarget::NullMethod),
                _ if member.contains('(') => Err(Diagnostic::InvalidNullMethod(span)),
                _ => Err(Diagnostic::InvalidNullField(span)),
            };
        }

        let class_id = self
            .program
            .type_by_name(class)
            .ok_or_else(|| Diagnostic::UnresolvedClass(class.to_owned().into(), span))?;

        match member.split_once('(') {
            None => self.lookup_field(class_id, class, member, span),
            Some((name, signature)) => {
                let signature = signature.strip_suffix(')').ok_or_else(malformed)?;
                self.lookup_method(class_id, class, member, name, signature, span)
            }
        }
    }

    fn lookup_field(
        &self,
        class_id: TypeId,
        class: &str,
        name: &str,
        span: Span,
    ) -> Result<ForeignTarget, Diagnostic<'ctx>> {
        self.program
            .super_class_chain(class_id)
            .flat_map(|id| self.program[id].fields().iter().copied())
            .find(|&field| self.program[field].name() == name)
            .map(ForeignTarget::Field)
            .ok_or_else(|| {
                Diagnostic::UnresolvedField(
                    class.to_owned().into(),
                    name.to_owned().into(),
                    self.suggestions(class_id, name),
                    span,
                )
            })
    }

    fn lookup_method(
        &self,
        class_id: TypeId,
        class: &str,
        member: &str,
        name: &str,
        signature: &str,
        span: Span,
    ) -> Result<ForeignTarget, Diagnostic<'ctx>> {
        let candidates = self.candidates(class_id, name);

        if signature == WILDCARD {
            return match candidates.as_slice() {
                [method] => Ok(ForeignTarget::Method(*method)),
                [] => Err(Diagnostic::UnresolvedMethod(
                    class.to_owned().into(),
                    member.to_owned().into(),
                    [].into(),
                    span,
                )),
                _ => Err(Diagnostic::AmbiguousWildcard(
                    member.to_owned().into(),
                    self.signatures(&candidates),
                    span,
                )),
            };
        }

        let wanted = signature
            .split(',')
            .map(str::trim)
            .filter(|ty| !ty.is_empty())
            .collect::<Vec<_>>();
        candidates
            .iter()
            .copied()
            .find(|&method| {
                let params = self.program[method].params().iter();
                itertools::equal(
                    params.map(|param| self.program.display_type(&param.ty).to_string()),
                    wanted.iter().copied(),
                )
            })
            .map(ForeignTarget::Method)
            .ok_or_else(|| {
                Diagnostic::UnresolvedMethod(
                    class.to_owned().into(),
                    member.to_owned().into(),
                    self.signatures(&candidates),
                    span,
                )
            })
    }

    /// Methods a reference by name can resolve to, most derived first and without the ones
    /// hidden by an override.
    fn candidates(&self, class_id: TypeId, name: &str) -> Vec<MethodId> {
        if name == CONSTRUCTOR {
            return self.program[class_id]
                .methods()
                .iter()
                .copied()
                .filter(|&method| self.program[method].is_constructor())
                .collect();
        }

        let mut candidates: Vec<MethodId> = vec![];
        let methods = self
            .program
            .super_class_chain(class_id)
            .flat_map(|id| self.program[id].methods().iter().copied())
            .filter(|&method| {
                let def = &self.program[method];
                def.name() == name && !def.is_constructor()
            });
        for method in methods {
            let params = self.program[method].params();
            let hidden = candidates.iter().any(|&other| {
                let other = self.program[other].params();
                other.len() == params.len() && other.iter().zip(params).all(|(a, b)| a.ty == b.ty)
            });
            if !hidden {
                candidates.push(method);
            }
        }
        candidates
    }

    fn suggestions(&self, class_id: TypeId, name: &str) -> Box<[String]> {
        self.signatures(&self.candidates(class_id, name))
    }

    fn signatures(&self, methods: &[MethodId]) -> Box<[String]> {
        methods
            .iter()
            .take(self.options.max_suggestions())
            .map(|&method| self.program.display_signature(method).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use jolt_ast::{ForeignExpr, ForeignFn, ForeignStmt, NameRef, SourceMap};
    use similar_asserts::assert_eq;

    use super::*;
    use crate::program::{Field, FieldFlags, Method, MethodFlags, Param, TypeDef};

    struct Fixture<'ctx> {
        program: Program<'ctx>,
        span: Span,
        method: MethodId,
    }

    fn fixture() -> Fixture<'static> {
        let mut sources = SourceMap::new();
        let file = sources.push("A.java", "");
        let span = Span::new(0, 0, file);

        let mut program = Program::with_default_types();
        let object = program.well_known().object;
        let class = program.add_type(TypeDef::builder().name("A").super_class(object).build());
        program.add_field(
            Field::builder()
                .name("count")
                .parent(class)
                .ty(Primitive::Int.into())
                .build(),
        );
        let limit = program.add_field(
            Field::builder()
                .name("LIMIT")
                .parent(class)
                .ty(Primitive::Int.into())
                .flags(FieldFlags::new().with_is_static(true).with_is_final(true))
                .build(),
        );
        let literal = program.literal(crate::program::Literal::Int(10));
        program.set_field_constant(limit, literal);
        for ty in [Type::from(Primitive::Int), Type::from(program.well_known().string)] {
            program.add_method(
                Method::builder()
                    .name("run")
                    .parent(class)
                    .params(vec![Param::new("value", ty)])
                    .build(),
            );
        }
        let method = program.add_method(
            Method::builder()
                .name("native")
                .parent(class)
                .flags(MethodFlags::new().with_is_static(true).with_is_foreign(true))
                .build(),
        );
        Fixture {
            program,
            span,
            method,
        }
    }

    fn name_ref(ident: &'static str, qualified: bool, span: Span) -> ForeignExpr<'static> {
        ForeignExpr::NameRef(NameRef {
            ident: ident.into(),
            qualifier: qualified.then(|| Box::new(ForeignExpr::Verbatim("this".into()))),
            span,
        })
    }

    fn resolve(fixture: &mut Fixture<'static>, body: Vec<ForeignStmt<'static>>) -> Vec<String> {
        let func = ForeignFn {
            params: vec![],
            body,
            span: fixture.span,
        };
        fixture
            .program
            .set_body(fixture.method, Body::Foreign { func, refs: vec![] })
            .unwrap();
        let mut reporter = Reporter::default();
        resolve_foreign_refs(&mut fixture.program, &LowerOptions::default(), &mut reporter);
        reporter
            .into_reported()
            .iter()
            .map(|diagnostic| format!("[{}] {diagnostic}", diagnostic.code()))
            .collect()
    }

    #[test]
    fn constants_are_inlined() {
        let mut fixture = fixture();
        let span = fixture.span;
        let reported = resolve(
            &mut fixture,
            vec![ForeignStmt::Return(Some(name_ref("@A::LIMIT", false, span)))],
        );
        assert_eq!(reported, Vec::<String>::new());

        let Body::Foreign { func, refs } = fixture.program[fixture.method].body() else {
            panic!("expected a foreign body");
        };
        assert!(refs.is_empty());
        assert_eq!(
            func.body,
            [ForeignStmt::Return(Some(ForeignExpr::Literal(Constant::Int(10))))]
        );
    }

    #[test]
    fn references_are_memoized() {
        let mut fixture = fixture();
        let span = fixture.span;
        let call = |span| ForeignExpr::Call {
            callee: Box::new(name_ref("@A::run(int)", true, span)),
            args: vec![],
        };
        let reported = resolve(
            &mut fixture,
            vec![ForeignStmt::Expr(call(span)), ForeignStmt::Expr(call(span))],
        );
        assert_eq!(reported, Vec::<String>::new());

        let Body::Foreign { refs, .. } = fixture.program[fixture.method].body() else {
            panic!("expected a foreign body");
        };
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].target, refs[1].target);
        assert_eq!(
            fixture.program.cached_foreign_ref("@A::run(int)"),
            Some(refs[0].target)
        );
    }

    #[test]
    fn problems_are_reported_together() {
        let mut fixture = fixture();
        let span = fixture.span;
        let reported = resolve(
            &mut fixture,
            vec![
                ForeignStmt::Expr(ForeignExpr::Assign {
                    target: Box::new(name_ref("@A::LIMIT", false, span)),
                    value: Box::new(ForeignExpr::Literal(Constant::Int(1))),
                }),
                ForeignStmt::Expr(name_ref("@A::count", false, span)),
                ForeignStmt::Expr(name_ref("@A::run(*)", true, span)),
                ForeignStmt::Expr(name_ref("@A::run(long)", true, span)),
                ForeignStmt::Expr(name_ref("@null::nullMethod()", false, span)),
                ForeignStmt::Expr(name_ref("@null::other", false, span)),
                ForeignStmt::Expr(name_ref("@B::x", false, span)),
                ForeignStmt::Expr(name_ref("A.count", false, span)),
            ],
        );
        assert_eq!(
            reported,
            [
                "[INVALID_ASSIGNMENT] cannot change the value of the compile-time constant `A.LIMIT`",
                "[QUALIFIER_MISMATCH] cannot make an unqualified reference to the instance field `A.count`",
                "[AMBIGUOUS_WILDCARD] ambiguous wildcard match for `run(*)`, candidates are: A.run(int), A.run(String)",
                "[UNRESOLVED_MEMBER] unable to resolve method `run(long)` in `A`, did you mean: A.run(int), A.run(String)",
                "[INVALID_NULL_REF] 'nullField' is the only legal field reference for 'null'",
                "[UNRESOLVED_TYPE] `B` is not a known class",
            ]
        );
    }
}
