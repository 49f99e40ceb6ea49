use std::borrow::Cow;
use std::hash::{Hash, Hasher};
use std::{fmt, iter, ops};

use bitfield_struct::bitfield;
use bon::bon;
use hashbrown::HashMap;
use jolt_ast::{self as ast, FieldId, LocalId, MethodId, Primitive, Span, Type, TypeId};
use strum::{Display, IntoEnumIterator};

use crate::IndexSet;
use crate::ir::{self, ForeignTarget, LabelId, LiteralId};
use crate::lower::{Error, LowerResult};
use crate::utils::{DisplayFn, sep_by};

/// Every type, method, field and literal of one compilation.
///
/// Declarations are created ahead of lowering by the front end and indexed by the ids that the
/// source tree refers to. Lowering only ever appends to the tables.
#[derive(Debug)]
pub struct Program<'ctx> {
    types: Vec<TypeDef<'ctx>>,
    methods: Vec<Method<'ctx>>,
    fields: Vec<Field<'ctx>>,
    type_names: HashMap<Cow<'ctx, str>, TypeId>,
    literals: IndexSet<Literal<'ctx>>,
    foreign_refs: HashMap<Cow<'ctx, str>, ForeignTarget>,
    well_known: WellKnown,
}

impl<'ctx> Program<'ctx> {
    pub fn with_default_types() -> Self {
        let mut program = Self {
            types: vec![],
            methods: vec![],
            fields: vec![],
            type_names: HashMap::default(),
            literals: IndexSet::default(),
            foreign_refs: HashMap::default(),
            well_known: WellKnown::placeholder(),
        };

        let object = program.add_type(TypeDef::builder().name("Object").build());
        let class = |name: &'static str| {
            TypeDef::builder()
                .name(name)
                .super_class(object)
                .build()
        };
        let interface = |name: &'static str| {
            TypeDef::builder()
                .name(name)
                .kind(TypeKind::Interface)
                .build()
        };

        let string = program.add_type(class("String"));
        let class_type = program.add_type(class("Class"));
        let enum_ = program.add_type(
            TypeDef::builder()
                .name("Enum")
                .super_class(object)
                .flags(TypeFlags::new().with_is_abstract(true))
                .build(),
        );
        let iterable = program.add_type(interface("Iterable"));
        let iterator = program.add_type(interface("Iterator"));
        let array = program.add_type(class("Array"));

        let array_length = program.add_field(
            Field::builder()
                .name("length")
                .parent(array)
                .ty(Primitive::Int.into())
                .flags(FieldFlags::new().with_is_final(true))
                .build(),
        );

        let enum_ctor = program.add_method(
            Method::builder()
                .name("Enum")
                .parent(enum_)
                .params(vec![
                    Param::new("name", string.into()),
                    Param::new("ordinal", Primitive::Int.into()),
                ])
                .return_type(enum_.into())
                .flags(MethodFlags::new().with_is_constructor(true))
                .build(),
        );
        let enum_ordinal = program.add_method(
            Method::builder()
                .name("ordinal")
                .parent(enum_)
                .return_type(Primitive::Int.into())
                .flags(MethodFlags::new().with_is_final(true))
                .build(),
        );
        let enum_value_of = program.add_method(
            Method::builder()
                .name("valueOf")
                .parent(enum_)
                .params(vec![
                    Param::new("map", object.into()),
                    Param::new("name", string.into()),
                ])
                .return_type(enum_.into())
                .flags(MethodFlags::new().with_is_static(true))
                .build(),
        );

        let iterable_iterator = program.add_method(
            Method::builder()
                .name("iterator")
                .parent(iterable)
                .return_type(iterator.into())
                .flags(MethodFlags::new().with_is_abstract(true))
                .build(),
        );
        let iterator_has_next = program.add_method(
            Method::builder()
                .name("hasNext")
                .parent(iterator)
                .return_type(Primitive::Boolean.into())
                .flags(MethodFlags::new().with_is_abstract(true))
                .build(),
        );
        let iterator_next = program.add_method(
            Method::builder()
                .name("next")
                .parent(iterator)
                .return_type(object.into())
                .flags(MethodFlags::new().with_is_abstract(true))
                .build(),
        );

        let class_desired_assertion_status = program.add_method(
            Method::builder()
                .name("desiredAssertionStatus")
                .parent(class_type)
                .return_type(Primitive::Boolean.into())
                .build(),
        );
        let class_is_metadata_enabled = program.add_method(
            Method::builder()
                .name("isClassMetadataEnabled")
                .parent(class_type)
                .return_type(Primitive::Boolean.into())
                .flags(MethodFlags::new().with_is_static(true))
                .build(),
        );

        let wrappers = Primitive::iter()
            .map(|prim| {
                let class = program.add_type(class(wrapper_name(prim)));
                let value_of = program.add_method(
                    Method::builder()
                        .name("valueOf")
                        .parent(class)
                        .params(vec![Param::new("value", prim.into())])
                        .return_type(class.into())
                        .flags(MethodFlags::new().with_is_static(true))
                        .build(),
                );
                let unbox = program.add_method(
                    Method::builder()
                        .name(format!("{prim}Value"))
                        .parent(class)
                        .return_type(prim.into())
                        .build(),
                );
                Wrapper {
                    prim,
                    class,
                    value_of,
                    unbox,
                }
            })
            .collect();

        program.well_known = WellKnown {
            object,
            string,
            class: class_type,
            enum_,
            iterable,
            iterator,
            array,
            array_length,
            enum_ctor,
            enum_ordinal,
            enum_value_of,
            iterable_iterator,
            iterator_has_next,
            iterator_next,
            class_desired_assertion_status,
            class_is_metadata_enabled,
            wrappers,
        };
        program
    }

    #[inline]
    pub fn well_known(&self) -> &WellKnown {
        &self.well_known
    }

    /// Declares a type along with its static initializer and, unless it's an interface, its
    /// instance initializer.
    pub fn add_type(&mut self, def: TypeDef<'ctx>) -> TypeId {
        let id = TypeId::new(self.types.len() as u32);
        let kind = def.kind;
        self.type_names.insert(def.name.clone(), id);
        self.types.push(def);

        let clinit = self.add_method(
            Method::builder()
                .name("$clinit")
                .parent(id)
                .flags(MethodFlags::new().with_is_static(true).with_is_synthetic(true))
                .build(),
        );
        self.types[id.index()].clinit = Some(clinit);

        if kind != TypeKind::Interface {
            let init = self.add_method(
                Method::builder()
                    .name("$init")
                    .parent(id)
                    .flags(MethodFlags::new().with_is_synthetic(true))
                    .build(),
            );
            self.types[id.index()].init = Some(init);
        }
        id
    }

    pub fn add_method(&mut self, method: Method<'ctx>) -> MethodId {
        let id = MethodId::new(self.methods.len() as u32);
        self.types[method.parent.index()].methods.push(id);
        self.methods.push(method);
        id
    }

    pub fn add_field(&mut self, field: Field<'ctx>) -> FieldId {
        let id = FieldId::new(self.fields.len() as u32);
        self.types[field.parent.index()].fields.push(id);
        self.fields.push(field);
        id
    }

    pub fn add_local(&mut self, method: MethodId, local: Local<'ctx>) -> LocalId {
        let locals = &mut self.methods[method.index()].locals;
        let id = LocalId::new(u16::try_from(locals.len()).expect("local count should fit in u16"));
        locals.push(local);
        id
    }

    #[inline]
    pub fn get_type(&self, id: TypeId) -> Option<&TypeDef<'ctx>> {
        self.types.get(id.index())
    }

    #[inline]
    pub fn get_method(&self, id: MethodId) -> Option<&Method<'ctx>> {
        self.methods.get(id.index())
    }

    #[inline]
    pub fn get_field(&self, id: FieldId) -> Option<&Field<'ctx>> {
        self.fields.get(id.index())
    }

    #[inline]
    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    pub fn types(&self) -> impl ExactSizeIterator<Item = (TypeId, &TypeDef<'ctx>)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, def)| (TypeId::new(i as u32), def))
    }

    pub fn methods(&self) -> impl ExactSizeIterator<Item = (MethodId, &Method<'ctx>)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(i, method)| (MethodId::new(i as u32), method))
    }

    /// Populates the body of a method that has none yet.
    pub fn set_body(&mut self, id: MethodId, body: Body<'ctx>) -> LowerResult<()> {
        let method = &mut self.methods[id.index()];
        if !matches!(method.body, Body::None) {
            return Err(Error::BodyAlreadyPopulated(method.name.to_string()));
        }
        method.body = body;
        Ok(())
    }

    /// Unconditionally replaces the implementation of a method.
    pub fn replace_body(&mut self, id: MethodId, body: Body<'ctx>) {
        let method = &mut self.methods[id.index()];
        method.flags.set_is_abstract(false);
        method.body = body;
    }

    pub(crate) fn body_mut(&mut self, id: MethodId) -> &mut Body<'ctx> {
        &mut self.methods[id.index()].body
    }

    pub fn add_overrides(&mut self, id: MethodId, overrides: impl IntoIterator<Item = MethodId>) {
        let method = &mut self.methods[id.index()];
        for over in overrides {
            if !method.overrides.contains(&over) {
                method.overrides.push(over);
            }
        }
    }

    pub fn set_field_constant(&mut self, id: FieldId, literal: LiteralId) {
        self.fields[id.index()].constant = Some(literal);
    }

    /// Returns the canonical id of a literal, interning it on first use.
    pub fn literal(&mut self, literal: Literal<'ctx>) -> LiteralId {
        let (index, _) = self.literals.insert_full(literal);
        LiteralId::new(index as u32)
    }

    #[inline]
    pub fn get_literal(&self, id: LiteralId) -> Option<&Literal<'ctx>> {
        self.literals.get_index(id.index())
    }

    pub fn literal_count(&self) -> usize {
        self.literals.len()
    }

    #[inline]
    pub fn cached_foreign_ref(&self, ident: &str) -> Option<ForeignTarget> {
        self.foreign_refs.get(ident).copied()
    }

    pub fn cache_foreign_ref(&mut self, ident: Cow<'ctx, str>, target: ForeignTarget) {
        self.foreign_refs.insert(ident, target);
    }

    /// The given type followed by each of its super classes.
    pub fn super_class_chain(&self, id: TypeId) -> impl Iterator<Item = TypeId> + use<'_, 'ctx> {
        iter::successors(Some(id), |&id| self[id].super_class)
    }

    pub fn is_subclass(&self, sub: TypeId, sup: TypeId) -> bool {
        self.super_class_chain(sub).any(|id| id == sup)
    }

    pub fn implements(&self, id: TypeId, interface: TypeId) -> bool {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let def = &self[id];
            if def.interfaces.contains(&interface) {
                return true;
            }
            stack.extend(def.super_class);
            stack.extend(def.interfaces.iter().copied());
        }
        false
    }

    /// Whether a value of class `from` can be used as `to` without a runtime check.
    pub fn can_trivially_cast_class(&self, from: TypeId, to: TypeId) -> bool {
        to == self.well_known.object || self.is_subclass(from, to) || self.implements(from, to)
    }

    pub fn can_trivially_cast(&self, from: &Type, to: &Type) -> bool {
        match (from, to) {
            (Type::Null, to) => to.is_reference(),
            (Type::Class(from), Type::Class(to)) => self.can_trivially_cast_class(*from, *to),
            (Type::Array(_), Type::Class(to)) => *to == self.well_known.object,
            (Type::Array(from), Type::Array(to)) if from.is_reference() && to.is_reference() => {
                self.can_trivially_cast(from, to)
            }
            (from, to) => from == to,
        }
    }

    /// Finds every method the given one overrides or implements, searching super classes and
    /// interfaces for the same name and erased parameter types.
    pub fn find_overridden(&self, method: MethodId) -> Vec<MethodId> {
        let mut overrides = vec![];
        self.find_overridden_in(method, self[method].parent, &mut overrides);
        overrides
    }

    fn find_overridden_in(&self, method: MethodId, search: TypeId, out: &mut Vec<MethodId>) {
        let def = &self[search];
        if self[method].parent != search {
            let found = def
                .methods
                .iter()
                .copied()
                .find(|&up| self.methods_match(method, up) && !out.contains(&up));
            out.extend(found);
        }
        if let Some(sup) = def.super_class {
            self.find_overridden_in(method, sup, out);
        }
        for &interface in &def.interfaces {
            self.find_overridden_in(method, interface, out);
        }
    }

    fn methods_match(&self, a: MethodId, b: MethodId) -> bool {
        let (a, b) = (&self[a], &self[b]);
        a.is_overridable()
            && b.is_overridable()
            && a.name == b.name
            && a.params.len() == b.params.len()
            && iter::zip(&a.params, &b.params).all(|(a, b)| a.ty == b.ty)
    }

    /// Enum constants of a type in ordinal order.
    pub fn enum_constants(&self, id: TypeId) -> Vec<FieldId> {
        let mut constants = self[id]
            .fields
            .iter()
            .copied()
            .filter(|&field| self[field].ordinal.is_some())
            .collect::<Vec<_>>();
        constants.sort_by_key(|&field| self[field].ordinal);
        constants
    }

    /// The synthetic fields of a type that hold a reference to an enclosing instance.
    pub fn outer_this_fields(&self, id: TypeId) -> impl Iterator<Item = FieldId> + use<'_, 'ctx> {
        self[id]
            .fields
            .iter()
            .copied()
            .filter(|&field| self[field].flags.is_outer_this())
    }

    pub fn display_type<'a>(&'a self, ty: &'a Type) -> impl fmt::Display + use<'a, 'ctx> {
        DisplayFn::new(move |f: &mut fmt::Formatter<'_>| match ty {
            Type::Void => f.write_str("void"),
            Type::Null => f.write_str("null"),
            Type::Primitive(prim) => write!(f, "{prim}"),
            Type::Class(id) => f.write_str(&self[*id].name),
            Type::Array(elem) => write!(f, "{}[]", self.display_type(elem)),
        })
    }

    pub fn display_signature(&self, id: MethodId) -> impl fmt::Display + use<'_, 'ctx> {
        DisplayFn::new(move |f: &mut fmt::Formatter<'_>| {
            let method = &self[id];
            write!(
                f,
                "{}.{}({})",
                self[method.parent].name,
                method.name,
                sep_by(method.params.iter().map(|p| self.display_type(&p.ty)), ", ")
            )
        })
    }

    /// Renders a method and its lowered body.
    pub fn display_method(&self, id: MethodId) -> impl fmt::Display + use<'_, 'ctx> {
        ir::MethodPrinter::new(self, id)
    }
}

impl<'ctx> ops::Index<TypeId> for Program<'ctx> {
    type Output = TypeDef<'ctx>;

    #[inline]
    fn index(&self, index: TypeId) -> &Self::Output {
        self.get_type(index).expect("type id not found")
    }
}

impl<'ctx> ops::Index<MethodId> for Program<'ctx> {
    type Output = Method<'ctx>;

    #[inline]
    fn index(&self, index: MethodId) -> &Self::Output {
        self.get_method(index).expect("method id not found")
    }
}

impl<'ctx> ops::Index<FieldId> for Program<'ctx> {
    type Output = Field<'ctx>;

    #[inline]
    fn index(&self, index: FieldId) -> &Self::Output {
        self.get_field(index).expect("field id not found")
    }
}

impl<'ctx> ops::Index<LiteralId> for Program<'ctx> {
    type Output = Literal<'ctx>;

    #[inline]
    fn index(&self, index: LiteralId) -> &Self::Output {
        self.get_literal(index).expect("literal id not found")
    }
}

/// Members every program is guaranteed to have.
#[derive(Debug, Clone)]
pub struct WellKnown {
    pub object: TypeId,
    pub string: TypeId,
    pub class: TypeId,
    pub enum_: TypeId,
    pub iterable: TypeId,
    pub iterator: TypeId,
    pub array: TypeId,
    pub array_length: FieldId,
    pub enum_ctor: MethodId,
    pub enum_ordinal: MethodId,
    pub enum_value_of: MethodId,
    pub iterable_iterator: MethodId,
    pub iterator_has_next: MethodId,
    pub iterator_next: MethodId,
    pub class_desired_assertion_status: MethodId,
    pub class_is_metadata_enabled: MethodId,
    wrappers: Vec<Wrapper>,
}

impl WellKnown {
    fn placeholder() -> Self {
        let ty = TypeId::new(0);
        let method = MethodId::new(0);
        Self {
            object: ty,
            string: ty,
            class: ty,
            enum_: ty,
            iterable: ty,
            iterator: ty,
            array: ty,
            array_length: FieldId::new(0),
            enum_ctor: method,
            enum_ordinal: method,
            enum_value_of: method,
            iterable_iterator: method,
            iterator_has_next: method,
            iterator_next: method,
            class_desired_assertion_status: method,
            class_is_metadata_enabled: method,
            wrappers: vec![],
        }
    }

    pub fn wrapper(&self, prim: Primitive) -> &Wrapper {
        self.wrappers
            .iter()
            .find(|w| w.prim == prim)
            .expect("every primitive has a wrapper")
    }

    pub fn wrapper_for_class(&self, class: TypeId) -> Option<&Wrapper> {
        self.wrappers.iter().find(|w| w.class == class)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Wrapper {
    pub prim: Primitive,
    pub class: TypeId,
    /// The static boxing method.
    pub value_of: MethodId,
    /// The instance unboxing method.
    pub unbox: MethodId,
}

fn wrapper_name(prim: Primitive) -> &'static str {
    match prim {
        Primitive::Boolean => "Boolean",
        Primitive::Byte => "Byte",
        Primitive::Char => "Character",
        Primitive::Short => "Short",
        Primitive::Int => "Integer",
        Primitive::Long => "Long",
        Primitive::Float => "Float",
        Primitive::Double => "Double",
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Enum,
}

#[derive(Debug)]
pub struct TypeDef<'ctx> {
    name: Cow<'ctx, str>,
    kind: TypeKind,
    flags: TypeFlags,
    super_class: Option<TypeId>,
    interfaces: Vec<TypeId>,
    enclosing: Option<TypeId>,
    methods: Vec<MethodId>,
    fields: Vec<FieldId>,
    clinit: Option<MethodId>,
    init: Option<MethodId>,
    span: Option<Span>,
}

#[bon]
impl<'ctx> TypeDef<'ctx> {
    #[builder(finish_fn = build)]
    pub fn new(
        #[builder(into)] name: Cow<'ctx, str>,
        #[builder(default)] kind: TypeKind,
        #[builder(default)] flags: TypeFlags,
        super_class: Option<TypeId>,
        #[builder(default)] interfaces: Vec<TypeId>,
        enclosing: Option<TypeId>,
        span: Option<Span>,
    ) -> Self {
        Self {
            name,
            kind,
            flags,
            super_class,
            interfaces,
            enclosing,
            methods: vec![],
            fields: vec![],
            clinit: None,
            init: None,
            span,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[inline]
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    #[inline]
    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    #[inline]
    pub fn super_class(&self) -> Option<TypeId> {
        self.super_class
    }

    #[inline]
    pub fn interfaces(&self) -> &[TypeId] {
        &self.interfaces
    }

    #[inline]
    pub fn enclosing(&self) -> Option<TypeId> {
        self.enclosing
    }

    #[inline]
    pub fn methods(&self) -> &[MethodId] {
        &self.methods
    }

    #[inline]
    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    #[inline]
    pub fn clinit(&self) -> Option<MethodId> {
        self.clinit
    }

    #[inline]
    pub fn init(&self) -> Option<MethodId> {
        self.init
    }

    #[inline]
    pub fn span(&self) -> Option<Span> {
        self.span
    }
}

#[derive(Debug)]
pub struct Method<'ctx> {
    name: Cow<'ctx, str>,
    parent: TypeId,
    params: Vec<Param<'ctx>>,
    return_type: Type,
    flags: MethodFlags,
    locals: Vec<Local<'ctx>>,
    overrides: Vec<MethodId>,
    body: Body<'ctx>,
    span: Option<Span>,
}

#[bon]
impl<'ctx> Method<'ctx> {
    #[builder(finish_fn = build)]
    pub fn new(
        #[builder(into)] name: Cow<'ctx, str>,
        parent: TypeId,
        #[builder(default)] params: Vec<Param<'ctx>>,
        #[builder(default = Type::Void)] return_type: Type,
        #[builder(default)] flags: MethodFlags,
        #[builder(default)] locals: Vec<Local<'ctx>>,
        #[builder(default)] overrides: Vec<MethodId>,
        span: Option<Span>,
    ) -> Self {
        Self {
            name,
            parent,
            params,
            return_type,
            flags,
            locals,
            overrides,
            body: Body::None,
            span,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> TypeId {
        self.parent
    }

    #[inline]
    pub fn params(&self) -> &[Param<'ctx>] {
        &self.params
    }

    #[inline]
    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    #[inline]
    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.flags.is_constructor()
    }

    #[inline]
    pub fn locals(&self) -> &[Local<'ctx>] {
        &self.locals
    }

    #[inline]
    pub fn overrides(&self) -> &[MethodId] {
        &self.overrides
    }

    #[inline]
    pub fn body(&self) -> &Body<'ctx> {
        &self.body
    }

    #[inline]
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// Parameters written in source, excluding the ones introduced by the compiler.
    pub fn source_params(&self) -> impl Iterator<Item = &Param<'ctx>> {
        self.params.iter().filter(|p| p.kind == ParamKind::Normal)
    }

    /// Parameters that carry enclosing instances and captured locals, in declaration order.
    pub fn synthetic_params(&self) -> impl Iterator<Item = (u16, &Param<'ctx>)> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p.kind, ParamKind::OuterInstance | ParamKind::OuterLocal))
            .map(|(i, p)| (i as u16, p))
    }

    pub fn param_index(&self, kind: ParamKind) -> Option<u16> {
        self.params
            .iter()
            .position(|p| p.kind == kind)
            .map(|i| i as u16)
    }

    fn is_overridable(&self) -> bool {
        !self.flags.is_static() && !self.flags.is_constructor()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param<'ctx> {
    pub name: Cow<'ctx, str>,
    pub ty: Type,
    pub kind: ParamKind,
}

impl<'ctx> Param<'ctx> {
    #[inline]
    pub fn new(name: impl Into<Cow<'ctx, str>>, ty: Type) -> Self {
        Self::synthetic(name, ty, ParamKind::Normal)
    }

    #[inline]
    pub fn synthetic(name: impl Into<Cow<'ctx, str>>, ty: Type, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    #[default]
    Normal,
    EnumName,
    EnumOrdinal,
    OuterInstance,
    OuterLocal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Local<'ctx> {
    pub name: Cow<'ctx, str>,
    pub ty: Type,
    pub is_synthetic: bool,
}

impl<'ctx> Local<'ctx> {
    #[inline]
    pub fn new(name: impl Into<Cow<'ctx, str>>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            is_synthetic: false,
        }
    }

    #[inline]
    pub fn synthetic(name: impl Into<Cow<'ctx, str>>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            is_synthetic: true,
        }
    }
}

#[derive(Debug)]
pub struct Field<'ctx> {
    name: Cow<'ctx, str>,
    parent: TypeId,
    ty: Type,
    flags: FieldFlags,
    ordinal: Option<i32>,
    constant: Option<LiteralId>,
    span: Option<Span>,
}

#[bon]
impl<'ctx> Field<'ctx> {
    #[builder(finish_fn = build)]
    pub fn new(
        #[builder(into)] name: Cow<'ctx, str>,
        parent: TypeId,
        ty: Type,
        #[builder(default)] flags: FieldFlags,
        ordinal: Option<i32>,
        span: Option<Span>,
    ) -> Self {
        Self {
            name,
            parent,
            ty,
            flags,
            ordinal,
            constant: None,
            span,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> TypeId {
        self.parent
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    /// The position of an enum constant within its type.
    #[inline]
    pub fn ordinal(&self) -> Option<i32> {
        self.ordinal
    }

    /// The literal value of a final field initialized with a compile-time constant.
    #[inline]
    pub fn constant(&self) -> Option<LiteralId> {
        self.constant
    }

    #[inline]
    pub fn span(&self) -> Option<Span> {
        self.span
    }
}

#[bitfield(u8)]
pub struct TypeFlags {
    pub is_abstract: bool,
    pub is_final: bool,
    #[bits(6)]
    __: u8,
}

#[bitfield(u8)]
pub struct MethodFlags {
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_constructor: bool,
    pub is_synthetic: bool,
    pub is_varargs: bool,
    pub is_foreign: bool,
    #[bits(1)]
    __: u8,
}

#[bitfield(u8)]
pub struct FieldFlags {
    pub is_static: bool,
    pub is_final: bool,
    pub is_synthetic: bool,
    pub is_outer_this: bool,
    #[bits(4)]
    __: u8,
}

#[derive(Debug, Default)]
pub enum Body<'ctx> {
    #[default]
    None,
    Code {
        labels: Vec<Cow<'ctx, str>>,
        block: ir::Block,
    },
    Foreign {
        func: ast::ForeignFn<'ctx>,
        refs: Vec<ir::ForeignRef<'ctx>>,
    },
}

impl<'ctx> Body<'ctx> {
    #[inline]
    pub fn code(block: ir::Block) -> Self {
        Self::Code {
            labels: vec![],
            block,
        }
    }

    pub fn block(&self) -> Option<&ir::Block> {
        match self {
            Self::Code { block, .. } => Some(block),
            _ => None,
        }
    }

    pub fn label_name(&self, label: LabelId) -> Option<&str> {
        match self {
            Self::Code { labels, .. } => labels.get(label.index()).map(|s| &**s),
            _ => None,
        }
    }
}

/// A literal value, interned by [`Program::literal`].
#[derive(Debug, Clone)]
pub enum Literal<'ctx> {
    Null,
    Bool(bool),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Cow<'ctx, str>),
    Class(Type),
}

impl Literal<'_> {
    pub fn ty(&self, well_known: &WellKnown) -> Type {
        match self {
            Self::Null => Type::Null,
            Self::Bool(_) => Primitive::Boolean.into(),
            Self::Char(_) => Primitive::Char.into(),
            Self::Int(_) => Primitive::Int.into(),
            Self::Long(_) => Primitive::Long.into(),
            Self::Float(_) => Primitive::Float.into(),
            Self::Double(_) => Primitive::Double.into(),
            Self::String(_) => well_known.string.into(),
            Self::Class(_) => well_known.class.into(),
        }
    }
}

impl<'ctx> Literal<'ctx> {
    /// The value as a constant that can be inlined into foreign code, `null` and class literals
    /// have no such representation.
    pub fn to_constant(&self) -> Option<ast::Constant<'ctx>> {
        let constant = match self {
            Self::Null | Self::Class(_) => return None,
            &Self::Bool(b) => ast::Constant::Bool(b),
            &Self::Char(c) => ast::Constant::Char(c),
            &Self::Int(i) => ast::Constant::Int(i),
            &Self::Long(i) => ast::Constant::Long(i),
            &Self::Float(x) => ast::Constant::Float(x),
            &Self::Double(x) => ast::Constant::Double(x),
            Self::String(s) => ast::Constant::String(s.clone()),
        };
        Some(constant)
    }
}

impl<'ctx> From<&ast::Constant<'ctx>> for Literal<'ctx> {
    fn from(constant: &ast::Constant<'ctx>) -> Self {
        match constant {
            &ast::Constant::Bool(b) => Self::Bool(b),
            &ast::Constant::Char(c) => Self::Char(c),
            &ast::Constant::Byte(i) => Self::Int(i.into()),
            &ast::Constant::Short(i) => Self::Int(i.into()),
            &ast::Constant::Int(i) => Self::Int(i),
            &ast::Constant::Long(i) => Self::Long(i),
            &ast::Constant::Float(x) => Self::Float(x),
            &ast::Constant::Double(x) => Self::Double(x),
            ast::Constant::String(s) => Self::String(s.clone()),
        }
    }
}

impl PartialEq for Literal<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Class(a), Self::Class(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal<'_> {}

impl Hash for Literal<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Char(c) => c.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Long(i) => i.hash(state),
            Self::Float(x) => x.to_bits().hash(state),
            Self::Double(x) => x.to_bits().hash(state),
            Self::String(s) => s.hash(state),
            Self::Class(ty) => ty.hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn literals_are_interned() {
        let mut program = Program::with_default_types();
        let before = program.literal_count();

        let a = program.literal(Literal::Int(1));
        let b = program.literal(Literal::Int(1));
        let c = program.literal(Literal::Long(1));
        let d = program.literal(Literal::String("one".into()));
        let e = program.literal(Literal::String(Cow::Owned("one".to_owned())));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(d, e);
        assert_eq!(program.literal_count(), before + 3);
    }

    #[test]
    fn float_literals_compare_bitwise() {
        let mut program = Program::with_default_types();

        let nan1 = program.literal(Literal::Double(f64::NAN));
        let nan2 = program.literal(Literal::Double(f64::NAN));
        let zero = program.literal(Literal::Float(0.0));
        let neg_zero = program.literal(Literal::Float(-0.0));

        assert_eq!(nan1, nan2);
        assert_ne!(zero, neg_zero);
    }

    #[test]
    fn default_types_are_present() {
        let program = Program::with_default_types();
        let wk = program.well_known();

        assert_eq!(program[wk.array_length].name(), "length");
        assert_eq!(program[wk.enum_ctor].params().len(), 2);
        assert_eq!(program[wk.wrapper(Primitive::Int).class].name(), "Integer");
        assert_eq!(program[wk.wrapper(Primitive::Char).unbox].name(), "charValue");
        assert_eq!(program.type_by_name("Iterator"), Some(wk.iterator));
        assert!(program[wk.iterator].clinit().is_some());
        assert!(program[wk.iterator].init().is_none());
        assert!(program[wk.object].init().is_some());
    }

    #[test]
    fn trivial_casts_follow_hierarchy() {
        let mut program = Program::with_default_types();
        let object = program.well_known().object;
        let iterable = program.well_known().iterable;
        let base = program.add_type(
            TypeDef::builder()
                .name("Base")
                .super_class(object)
                .interfaces(vec![iterable])
                .build(),
        );
        let derived = program.add_type(TypeDef::builder().name("Derived").super_class(base).build());

        assert!(program.can_trivially_cast_class(derived, base));
        assert!(program.can_trivially_cast_class(derived, iterable));
        assert!(program.can_trivially_cast_class(derived, object));
        assert!(!program.can_trivially_cast_class(base, derived));
        assert!(program.can_trivially_cast(&Type::Null, &Type::Class(derived)));
        assert!(program.can_trivially_cast(
            &Type::array_of(derived.into()),
            &Type::array_of(base.into())
        ));
        assert!(!program.can_trivially_cast(
            &Type::array_of(Primitive::Int.into()),
            &Type::array_of(Primitive::Long.into())
        ));
        assert_eq!(
            program.super_class_chain(derived).collect::<Vec<_>>(),
            vec![derived, base, object]
        );
    }

    #[test]
    fn overridden_methods_are_found_through_interfaces() {
        let mut program = Program::with_default_types();
        let object = program.well_known().object;
        let string = program.well_known().string;
        let iface = program.add_type(
            TypeDef::builder()
                .name("Handler")
                .kind(TypeKind::Interface)
                .build(),
        );
        let class = program.add_type(
            TypeDef::builder()
                .name("Impl")
                .super_class(object)
                .interfaces(vec![iface])
                .build(),
        );
        let abstract_handle = program.add_method(
            Method::builder()
                .name("handle")
                .parent(iface)
                .params(vec![Param::new("value", object.into())])
                .flags(MethodFlags::new().with_is_abstract(true))
                .build(),
        );
        let erased = program.add_method(
            Method::builder()
                .name("handle")
                .parent(class)
                .params(vec![Param::new("value", object.into())])
                .build(),
        );
        let specific = program.add_method(
            Method::builder()
                .name("handle")
                .parent(class)
                .params(vec![Param::new("value", string.into())])
                .build(),
        );

        assert_eq!(program.find_overridden(erased), vec![abstract_handle]);
        assert_eq!(program.find_overridden(specific), vec![]);
    }

    #[test]
    fn body_is_populated_once() {
        let mut program = Program::with_default_types();
        let clinit = program[program.well_known().string].clinit().unwrap();

        program.set_body(clinit, Body::code(ir::Block::default())).unwrap();
        let err = program
            .set_body(clinit, Body::code(ir::Block::default()))
            .unwrap_err();

        assert!(matches!(err, Error::BodyAlreadyPopulated(name) if name == "$clinit"));
    }
}
