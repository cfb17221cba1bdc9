// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::ast::BinaryOp;
use crate::types::QualType;

use mirai_annotations::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter, Result};

/// A fixed width integer with an explicit signedness, as found in the concrete values tracked by
/// the analyzer. The bits are always masked to the width, so structural equality is value equality.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ConcreteInt {
    bits: u128,
    width: u8,
    is_unsigned: bool,
}

impl Debug for ConcreteInt {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.is_unsigned {
            f.write_fmt(format_args!("{} U{}b", self.bits, self.width))
        } else {
            f.write_fmt(format_args!("{} S{}b", self.signed_value(), self.width))
        }
    }
}

fn mask(width: u8) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

/// Returns the width and signedness used to represent values of the given type.
/// Types that are not scalars are treated like pointers.
fn width_and_sign_of(ty: &QualType) -> (u8, bool) {
    let width = match ty.bit_width() {
        0 => 64,
        w => w,
    };
    (width, !ty.is_signed_integer_or_enumeration())
}

/// Constructors
impl ConcreteInt {
    /// Returns the value truncated (or sign extended) to the given width.
    pub fn new(value: i128, width: u8, is_unsigned: bool) -> ConcreteInt {
        precondition!(width > 0 && width <= 128);
        ConcreteInt {
            bits: (value as u128) & mask(width),
            width,
            is_unsigned,
        }
    }

    pub fn from_u128(value: u128, ty: &QualType) -> ConcreteInt {
        let (width, is_unsigned) = width_and_sign_of(ty);
        ConcreteInt {
            bits: value & mask(width),
            width,
            is_unsigned,
        }
    }

    pub fn from_i128(value: i128, ty: &QualType) -> ConcreteInt {
        let (width, is_unsigned) = width_and_sign_of(ty);
        ConcreteInt::new(value, width, is_unsigned)
    }

    /// A truth value of type int.
    pub fn truth(b: bool) -> ConcreteInt {
        ConcreteInt::new(i128::from(b), 32, false)
    }
}

/// Queries
impl ConcreteInt {
    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn is_unsigned(&self) -> bool {
        self.is_unsigned
    }

    pub fn is_zero(&self) -> bool {
        self.bits == 0
    }

    pub fn unsigned_value(&self) -> u128 {
        self.bits
    }

    /// The bits interpreted as a two's complement number of the given width.
    pub fn signed_value(&self) -> i128 {
        if self.width >= 128 {
            self.bits as i128
        } else {
            let shift = 128 - u32::from(self.width);
            ((self.bits << shift) as i128) >> shift
        }
    }

    /// The mathematical value, as far as it fits into an i128.
    pub fn value(&self) -> i128 {
        if self.is_unsigned {
            self.bits as i128
        } else {
            self.signed_value()
        }
    }

    /// Extends (according to the signedness of self) or truncates to the given width
    /// and then adopts the given signedness.
    pub fn convert_to(&self, width: u8, is_unsigned: bool) -> ConcreteInt {
        if self.width == width && self.is_unsigned == is_unsigned {
            return *self;
        }
        ConcreteInt::new(self.value(), width, is_unsigned)
    }

    pub fn convert_to_type(&self, ty: &QualType) -> ConcreteInt {
        let (width, is_unsigned) = width_and_sign_of(ty);
        self.convert_to(width, is_unsigned)
    }

    fn compare(&self, other: &Self) -> Ordering {
        if self.is_unsigned {
            self.bits.cmp(&other.bits)
        } else {
            self.signed_value().cmp(&other.signed_value())
        }
    }

    fn with_bits(&self, bits: u128) -> ConcreteInt {
        ConcreteInt {
            bits: bits & mask(self.width),
            width: self.width,
            is_unsigned: self.is_unsigned,
        }
    }
}

/// Transfer functions. The operands are expected to have the same width and signedness.
impl ConcreteInt {
    /// Returns a value that is "self + other".
    pub fn add(&self, other: &Self) -> Self {
        self.with_bits(self.bits.wrapping_add(other.bits))
    }

    /// Returns a value that is "self - other".
    pub fn sub(&self, other: &Self) -> Self {
        self.with_bits(self.bits.wrapping_sub(other.bits))
    }

    /// Returns a value that is "self * other".
    pub fn mul(&self, other: &Self) -> Self {
        self.with_bits(self.bits.wrapping_mul(other.bits))
    }

    /// Returns a value that is "self / other", or None if other is zero.
    pub fn div(&self, other: &Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        if self.is_unsigned {
            Some(self.with_bits(self.bits / other.bits))
        } else {
            let result = self.signed_value().wrapping_div(other.signed_value());
            Some(self.with_bits(result as u128))
        }
    }

    /// Returns a value that is "self % other", or None if other is zero.
    pub fn rem(&self, other: &Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        if self.is_unsigned {
            Some(self.with_bits(self.bits % other.bits))
        } else {
            let result = self.signed_value().wrapping_rem(other.signed_value());
            Some(self.with_bits(result as u128))
        }
    }

    /// Returns a value that is "self << other", or None if the shift amount is out of range.
    pub fn shl(&self, other: &Self) -> Option<Self> {
        let amount = other.value();
        if amount < 0 || amount >= i128::from(self.width) {
            return None;
        }
        Some(self.with_bits(self.bits << (amount as u32)))
    }

    /// Returns a value that is "self >> other", or None if the shift amount is out of range.
    /// Signed values are shifted arithmetically.
    pub fn shr(&self, other: &Self) -> Option<Self> {
        let amount = other.value();
        if amount < 0 || amount >= i128::from(self.width) {
            return None;
        }
        if self.is_unsigned {
            Some(self.with_bits(self.bits >> (amount as u32)))
        } else {
            Some(self.with_bits((self.signed_value() >> (amount as u32)) as u128))
        }
    }

    /// Returns a value that is "self & other".
    pub fn bit_and(&self, other: &Self) -> Self {
        self.with_bits(self.bits & other.bits)
    }

    /// Returns a value that is "self | other".
    pub fn bit_or(&self, other: &Self) -> Self {
        self.with_bits(self.bits | other.bits)
    }

    /// Returns a value that is "self ^ other".
    pub fn bit_xor(&self, other: &Self) -> Self {
        self.with_bits(self.bits ^ other.bits)
    }

    /// Returns a value that is "-self".
    pub fn negate(&self) -> Self {
        self.with_bits(self.bits.wrapping_neg())
    }

    /// Returns a value that is "!self", i.e. the bitwise complement.
    pub fn complement(&self) -> Self {
        self.with_bits(!self.bits)
    }

    /// Applies the binary operator. Comparisons produce an int truth value.
    /// Returns None if the operation is undefined for these operands, or is a logical operator.
    pub fn evaluate(&self, op: BinaryOp, other: &Self) -> Option<ConcreteInt> {
        let result = match op {
            BinaryOp::Mul => self.mul(other),
            BinaryOp::Div => return self.div(other),
            BinaryOp::Rem => return self.rem(other),
            BinaryOp::Add => self.add(other),
            BinaryOp::Sub => self.sub(other),
            BinaryOp::Shl => return self.shl(other),
            BinaryOp::Shr => return self.shr(other),
            BinaryOp::Lt => ConcreteInt::truth(self.compare(other) == Ordering::Less),
            BinaryOp::Gt => ConcreteInt::truth(self.compare(other) == Ordering::Greater),
            BinaryOp::Le => ConcreteInt::truth(self.compare(other) != Ordering::Greater),
            BinaryOp::Ge => ConcreteInt::truth(self.compare(other) != Ordering::Less),
            BinaryOp::Eq => ConcreteInt::truth(self.bits == other.bits),
            BinaryOp::Ne => ConcreteInt::truth(self.bits != other.bits),
            BinaryOp::And => self.bit_and(other),
            BinaryOp::Xor => self.bit_xor(other),
            BinaryOp::Or => self.bit_or(other),
            BinaryOp::LAnd | BinaryOp::LOr => return None,
        };
        Some(result)
    }
}
