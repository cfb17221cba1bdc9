// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// The shape of a type, with qualifiers kept separately in QualType.
/// Only the distinctions that the region and symbol machinery actually consults are modeled.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum TypeKind {
    Void,
    Bool,
    /// A plain char. Treated as an 8 bit signed integer.
    Char,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    /// The type of the nullptr literal.
    NullPtr,
    /// An enumeration with a 32 bit signed underlying type.
    Enum { name: Rc<str> },
    /// A struct, class or union. A size of None means that the type is incomplete.
    Record {
        name: Rc<str>,
        is_union: bool,
        size: Option<u64>,
    },
    Pointer(QualType),
    Reference(QualType),
    /// An array with an element type and an optional (constant) length.
    Array {
        element: QualType,
        length: Option<u64>,
    },
    /// A function type. The name is only used for display.
    Function { name: Rc<str> },
    BlockPointer,
}

/// A type together with its top level cv-qualifiers.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct QualType {
    pub kind: Rc<TypeKind>,
    pub is_const: bool,
    pub is_volatile: bool,
}

impl Debug for QualType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        if self.is_volatile {
            f.write_str("volatile ")?;
        }
        self.kind.fmt(f)
    }
}

impl Debug for TypeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        use self::TypeKind::*;
        match self {
            Void => f.write_str("void"),
            Bool => f.write_str("bool"),
            Char => f.write_str("char"),
            I8 => f.write_str("i8"),
            I16 => f.write_str("i16"),
            I32 => f.write_str("i32"),
            I64 => f.write_str("i64"),
            I128 => f.write_str("i128"),
            Isize => f.write_str("isize"),
            U8 => f.write_str("u8"),
            U16 => f.write_str("u16"),
            U32 => f.write_str("u32"),
            U64 => f.write_str("u64"),
            U128 => f.write_str("u128"),
            Usize => f.write_str("usize"),
            F32 => f.write_str("f32"),
            F64 => f.write_str("f64"),
            NullPtr => f.write_str("nullptr_t"),
            Enum { name } => f.write_fmt(format_args!("enum {}", name)),
            Record { name, is_union, .. } => {
                if *is_union {
                    f.write_fmt(format_args!("union {}", name))
                } else {
                    f.write_fmt(format_args!("struct {}", name))
                }
            }
            Pointer(pointee) => f.write_fmt(format_args!("{:?}*", pointee)),
            Reference(pointee) => f.write_fmt(format_args!("{:?}&", pointee)),
            Array { element, length } => match length {
                Some(length) => f.write_fmt(format_args!("{:?}[{}]", element, length)),
                None => f.write_fmt(format_args!("{:?}[]", element)),
            },
            Function { name } => f.write_fmt(format_args!("fn {}", name)),
            BlockPointer => f.write_str("block"),
        }
    }
}

impl From<TypeKind> for QualType {
    fn from(kind: TypeKind) -> QualType {
        QualType {
            kind: Rc::new(kind),
            is_const: false,
            is_volatile: false,
        }
    }
}

/// Constructors
impl QualType {
    pub fn void() -> QualType {
        TypeKind::Void.into()
    }

    pub fn bool() -> QualType {
        TypeKind::Bool.into()
    }

    pub fn char() -> QualType {
        TypeKind::Char.into()
    }

    /// The type used for truth values produced by comparisons.
    pub fn int() -> QualType {
        TypeKind::I32.into()
    }

    /// The type used for array indices. Signed, so that negative offsets can be represented.
    pub fn array_index() -> QualType {
        TypeKind::I64.into()
    }

    /// The type of object sizes, used for the extent of a region.
    pub fn size_type() -> QualType {
        TypeKind::U64.into()
    }

    pub fn pointer_to(pointee: QualType) -> QualType {
        TypeKind::Pointer(pointee).into()
    }

    pub fn array_of(element: QualType, length: Option<u64>) -> QualType {
        TypeKind::Array { element, length }.into()
    }

    pub fn record(name: &str, is_union: bool, size: Option<u64>) -> QualType {
        TypeKind::Record {
            name: Rc::from(name),
            is_union,
            size,
        }
        .into()
    }

    /// Returns a copy of this type with the const qualifier set.
    pub fn with_const(&self) -> QualType {
        QualType {
            kind: self.kind.clone(),
            is_const: true,
            is_volatile: self.is_volatile,
        }
    }

    /// Returns this type without its top level qualifiers.
    pub fn unqualified(&self) -> QualType {
        QualType {
            kind: self.kind.clone(),
            is_const: false,
            is_volatile: false,
        }
    }
}

/// Queries
impl QualType {
    /// True for types whose values are locations: pointers, references, block pointers and nullptr_t.
    pub fn is_loc_type(&self) -> bool {
        matches!(
            self.kind.as_ref(),
            TypeKind::Pointer(..)
                | TypeKind::Reference(..)
                | TypeKind::BlockPointer
                | TypeKind::NullPtr
        )
    }

    pub fn is_any_pointer(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::Pointer(..))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::Reference(..))
    }

    pub fn is_block_pointer(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::BlockPointer)
    }

    pub fn is_null_ptr_type(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::NullPtr)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::Void)
    }

    pub fn is_void_pointer(&self) -> bool {
        matches!(self.pointee(), Some(pointee) if pointee.is_void())
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::Function { .. })
    }

    pub fn is_function_pointer(&self) -> bool {
        matches!(self.pointee(), Some(pointee) if pointee.is_function())
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::Bool)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::F32 | TypeKind::F64)
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::Enum { .. })
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::Record { .. })
    }

    pub fn is_union(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::Record { is_union: true, .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind.as_ref(), TypeKind::Array { .. })
    }

    /// Returns true if this type is one of the signed integer types, char or an enum.
    pub fn is_signed_integer_or_enumeration(&self) -> bool {
        use self::TypeKind::*;
        matches!(
            self.kind.as_ref(),
            Char | I8 | I16 | I32 | I64 | I128 | Isize | Enum { .. }
        )
    }

    /// Returns true if this type is one of the unsigned integer types (including bool).
    pub fn is_unsigned_integer(&self) -> bool {
        use self::TypeKind::*;
        matches!(
            self.kind.as_ref(),
            Bool | U8 | U16 | U32 | U64 | U128 | Usize
        )
    }

    pub fn is_integral_or_enumeration(&self) -> bool {
        self.is_signed_integer_or_enumeration() || self.is_unsigned_integer()
    }

    /// True for the types that are represented by a single value rather than a collection of fields.
    pub fn is_scalar(&self) -> bool {
        self.is_integral_or_enumeration() || self.is_floating() || self.is_loc_type()
    }

    /// The type pointed to, if this is a pointer or reference.
    pub fn pointee(&self) -> Option<&QualType> {
        match self.kind.as_ref() {
            TypeKind::Pointer(pointee) | TypeKind::Reference(pointee) => Some(pointee),
            _ => None,
        }
    }

    /// The element type, if this is an array.
    pub fn array_element(&self) -> Option<&QualType> {
        match self.kind.as_ref() {
            TypeKind::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Returns the number of bits used to represent the given type, if scalar.
    /// For other types the result is just 0.
    pub fn bit_width(&self) -> u8 {
        use self::TypeKind::*;
        match self.kind.as_ref() {
            Bool => 1,
            Char | I8 | U8 => 8,
            I16 | U16 => 16,
            I32 | U32 | F32 | Enum { .. } => 32,
            I64 | U64 | Isize | Usize | F64 => 64,
            I128 | U128 => 128,
            Pointer(..) | Reference(..) | BlockPointer | NullPtr => 64,
            Void | Record { .. } | Array { .. } | Function { .. } => 0,
        }
    }

    /// The number of bytes occupied by a value of this type, or None if the type is incomplete.
    pub fn size_in_bytes(&self) -> Option<u64> {
        use self::TypeKind::*;
        match self.kind.as_ref() {
            Void | Function { .. } => None,
            Bool => Some(1),
            Record { size, .. } => *size,
            Array { element, length } => {
                let length = (*length)?;
                element.size_in_bytes()?.checked_mul(length)
            }
            _ => Some(u64::from(self.bit_width()) / 8),
        }
    }

    pub fn is_incomplete(&self) -> bool {
        self.size_in_bytes().is_none()
    }
}

/// True if the two types are the same once top level qualifiers are ignored.
pub fn same_unqualified(t1: &QualType, t2: &QualType) -> bool {
    t1.kind == t2.kind
}

/// Determines if a cast from from_type to to_type can be modeled by simply passing the value through.
/// Matching pointer levels are peeled off (ignoring the qualifiers at each level) and the cast
/// is a no-op if what remains is identical, or if the target is void.
pub fn is_noop_cast(to_type: &QualType, from_type: &QualType) -> bool {
    let mut to = to_type.unqualified();
    let mut from = from_type.unqualified();
    loop {
        let next = match (to.kind.as_ref(), from.kind.as_ref()) {
            (TypeKind::Pointer(t), TypeKind::Pointer(f))
            | (TypeKind::Reference(t), TypeKind::Reference(f)) => (t.unqualified(), f.unqualified()),
            _ => break,
        };
        to = next.0;
        from = next.1;
    }
    to.is_void() || to == from
}
