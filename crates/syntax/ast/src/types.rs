use std::borrow::Cow;
use std::fmt;

use enum_as_inner::EnumAsInner;
use identity_hash::IdentityHashable;
use strum::{Display, EnumIter, IntoStaticStr};

macro_rules! declaration_ids {
    ($($(#[$meta:meta])* $name:ident($repr:ty);)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name($repr);

            impl $name {
                #[inline]
                pub const fn new(index: $repr) -> Self {
                    Self(index)
                }

                #[inline]
                pub fn index(&self) -> usize {
                    self.0 as usize
                }
            }

            impl IdentityHashable for $name {}
        )*
    };
}

declaration_ids! {
    /// A class, interface or enum pre-declared in the program.
    TypeId(u32);
    MethodId(u32);
    FieldId(u32);
    /// A local variable slot of the enclosing method body.
    LocalId(u16);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

/// A resolved and already erased type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumAsInner)]
pub enum Type {
    Void,
    Null,
    Primitive(Primitive),
    Class(TypeId),
    Array(Box<Type>),
}

impl Type {
    #[inline]
    pub fn array_of(elem: Type) -> Self {
        Self::Array(Box::new(elem))
    }

    pub fn dims(&self) -> usize {
        match self {
            Self::Array(elem) => 1 + elem.dims(),
            _ => 0,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Null | Self::Class(_) | Self::Array(_))
    }
}

impl From<Primitive> for Type {
    #[inline]
    fn from(prim: Primitive) -> Self {
        Self::Primitive(prim)
    }
}

impl From<TypeId> for Type {
    #[inline]
    fn from(id: TypeId) -> Self {
        Self::Class(id)
    }
}

/// A value computed ahead of time by the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant<'src> {
    Bool(bool),
    Char(u16),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Cow<'src, str>),
}

impl Constant<'_> {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Constant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Char(c) => write!(f, "'\\u{c:04x}'"),
            Self::Byte(i) => write!(f, "{i}"),
            Self::Short(i) => write!(f, "{i}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Long(i) => write!(f, "{i}L"),
            Self::Float(x) => write!(f, "{x}f"),
            Self::Double(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// The implicit conversion the front end requires on an expression's value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    #[default]
    None,
    /// Wrap a primitive of the given kind into its wrapper class.
    Box(Primitive),
    /// Extract the primitive from a wrapper-class value.
    Unbox,
}
