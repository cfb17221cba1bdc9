// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// The slice of a front end's syntax tree that the region and value machinery consults.
// Declarations and expressions are identified by small integer ids, so that regions and
// symbols keyed by them stay cheap to hash.

use crate::concrete_int::ConcreteInt;
use crate::types::QualType;

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// Identifies an expression node. Two distinct expression nodes never share an id.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ExprId(pub u32);

impl Debug for ExprId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("E{}", self.0))
    }
}

/// Identifies the statement (program point) at which a liveness question is asked.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct StmtId(pub u32);

/// Where a variable lives.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum StorageClass {
    /// An automatic variable of a function body.
    Local,
    /// A formal parameter. The index is zero based.
    Parameter { index: u32 },
    /// A variable with static storage defined at file scope.
    Global { in_system_header: bool },
    /// A function local variable with static storage.
    StaticLocal,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct VarDecl {
    pub id: u32,
    pub name: Rc<str>,
    pub ty: QualType,
    pub storage: StorageClass,
}

impl Debug for VarDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(&self.name)
    }
}

impl VarDecl {
    pub fn has_global_storage(&self) -> bool {
        matches!(
            self.storage,
            StorageClass::Global { .. } | StorageClass::StaticLocal
        )
    }

    pub fn has_local_storage(&self) -> bool {
        !self.has_global_storage()
    }

    pub fn is_static_local(&self) -> bool {
        matches!(self.storage, StorageClass::StaticLocal)
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.storage, StorageClass::Parameter { .. })
    }
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RecordDecl {
    pub id: u32,
    pub name: Rc<str>,
    pub ty: QualType,
}

impl Debug for RecordDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(&self.name)
    }
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FieldDecl {
    pub id: u32,
    pub name: Rc<str>,
    /// The position of the field in its record.
    pub index: u32,
    pub ty: QualType,
    pub parent: Rc<RecordDecl>,
}

impl Debug for FieldDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(&self.name)
    }
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FunctionDecl {
    pub id: u32,
    pub name: Rc<str>,
    /// A weak function may resolve to a null address at link time.
    pub is_weak: bool,
}

impl Debug for FunctionDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(&self.name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BlockDecl {
    pub id: u32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum CastKind {
    ArrayToPointerDecay,
    BitCast,
    FunctionToPointerDecay,
    IntegralCast,
    IntegralToBoolean,
    LValueToRValue,
    NoOp,
    NullToPointer,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    /// Bitwise and
    And,
    Xor,
    /// Bitwise or
    Or,
    LAnd,
    LOr,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        use self::BinaryOp::*;
        matches!(self, Lt | Gt | Le | Ge | Eq | Ne)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_additive(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub)
    }

    pub fn is_commutative(self) -> bool {
        use self::BinaryOp::*;
        matches!(self, Add | Mul | And | Xor | Or | Eq | Ne)
    }

    /// Returns the operator that yields the same result when the operands are swapped,
    /// if there is one.
    pub fn commuted(self) -> Option<BinaryOp> {
        use self::BinaryOp::*;
        match self {
            Lt => Some(Gt),
            Gt => Some(Lt),
            Le => Some(Ge),
            Ge => Some(Le),
            op if op.is_commutative() => Some(op),
            _ => None,
        }
    }

    /// Returns the comparison that is true exactly when this one is false.
    pub fn negated_comparison(self) -> Option<BinaryOp> {
        use self::BinaryOp::*;
        match self {
            Lt => Some(Ge),
            Gt => Some(Le),
            Le => Some(Gt),
            Ge => Some(Lt),
            Eq => Some(Ne),
            Ne => Some(Eq),
            _ => None,
        }
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }

    pub fn spelling(self) -> &'static str {
        use self::BinaryOp::*;
        match self {
            Mul => "*",
            Div => "/",
            Rem => "%",
            Add => "+",
            Sub => "-",
            Shl => "<<",
            Shr => ">>",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
            And => "&",
            Xor => "^",
            Or => "|",
            LAnd => "&&",
            LOr => "||",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum UnaryOp {
    /// Arithmetic negation
    Minus,
    /// Bitwise complement
    Not,
    /// Logical not
    LNot,
    Plus,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ExprKind {
    AddrLabel { label: Rc<str> },
    BoolLiteral(bool),
    CharacterLiteral(u32),
    /// Unsigned or signed depending on the type of the expression.
    IntegerLiteral(u128),
    NullPtrLiteral,
    /// GNU __null.
    GnuNull,
    StringLiteral(Rc<str>),
    /// The value of a type trait, for example __is_pod(T).
    TypeTrait(bool),
    ScalarValueInit,
    ImplicitValueInit,
    Paren(Rc<Expr>),
    ImplicitCast { kind: CastKind, operand: Rc<Expr> },
    CStyleCast { kind: CastKind, operand: Rc<Expr> },
    Unary { op: UnaryOp, operand: Rc<Expr> },
    Binary {
        op: BinaryOp,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },
    Conditional {
        condition: Rc<Expr>,
        consequent: Rc<Expr>,
        alternate: Rc<Expr>,
    },
    DeclRef(Rc<VarDecl>),
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Expr {
    pub id: ExprId,
    pub ty: QualType,
    pub kind: ExprKind,
    /// True if the expression designates an object rather than producing a value.
    pub is_glvalue: bool,
}

impl Expr {
    pub fn new(id: u32, ty: QualType, kind: ExprKind) -> Rc<Expr> {
        let is_glvalue = matches!(kind, ExprKind::DeclRef(..) | ExprKind::StringLiteral(..));
        Rc::new(Expr {
            id: ExprId(id),
            ty,
            kind,
            is_glvalue,
        })
    }

    /// Skips over any parentheses.
    pub fn ignore_parens(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Paren(operand) = &expr.kind {
            expr = operand;
        }
        expr
    }

    /// Tries to evaluate this expression as an integer constant of the expression's type.
    /// This is a deliberately small evaluator: literals, parentheses, integral casts,
    /// unary and binary operators over constants and conditionals with constant conditions.
    pub fn evaluate_as_int(&self) -> Option<ConcreteInt> {
        if !self.ty.is_integral_or_enumeration() {
            return None;
        }
        let result = match &self.kind {
            ExprKind::BoolLiteral(b) | ExprKind::TypeTrait(b) => {
                ConcreteInt::from_u128(u128::from(*b), &self.ty)
            }
            ExprKind::CharacterLiteral(ch) => ConcreteInt::from_u128(u128::from(*ch), &self.ty),
            ExprKind::IntegerLiteral(val) => ConcreteInt::from_u128(*val, &self.ty),
            ExprKind::GnuNull => ConcreteInt::from_u128(0, &self.ty),
            ExprKind::Paren(operand)
            | ExprKind::ImplicitCast { operand, .. }
            | ExprKind::CStyleCast { operand, .. } => {
                let val = operand.evaluate_as_int()?;
                if self.ty.is_boolean() {
                    ConcreteInt::from_u128(u128::from(!val.is_zero()), &self.ty)
                } else {
                    val.convert_to_type(&self.ty)
                }
            }
            ExprKind::Unary { op, operand } => {
                let val = operand.evaluate_as_int()?.convert_to_type(&self.ty);
                match op {
                    UnaryOp::Minus => val.negate(),
                    UnaryOp::Not => val.complement(),
                    UnaryOp::LNot => ConcreteInt::from_u128(u128::from(val.is_zero()), &self.ty),
                    UnaryOp::Plus => val,
                }
            }
            ExprKind::Binary { op, left, right } => {
                let left_val = left.evaluate_as_int()?;
                let right_val = right.evaluate_as_int()?;
                match op {
                    BinaryOp::LAnd => ConcreteInt::from_u128(
                        u128::from(!left_val.is_zero() && !right_val.is_zero()),
                        &self.ty,
                    ),
                    BinaryOp::LOr => ConcreteInt::from_u128(
                        u128::from(!left_val.is_zero() || !right_val.is_zero()),
                        &self.ty,
                    ),
                    BinaryOp::Shl | BinaryOp::Shr => left_val
                        .convert_to_type(&self.ty)
                        .evaluate(*op, &right_val)?,
                    _ if op.is_comparison() => {
                        let operand_type = &left.ty;
                        left_val
                            .convert_to_type(operand_type)
                            .evaluate(*op, &right_val.convert_to_type(operand_type))?
                            .convert_to_type(&self.ty)
                    }
                    _ => left_val
                        .convert_to_type(&self.ty)
                        .evaluate(*op, &right_val.convert_to_type(&self.ty))?,
                }
            }
            ExprKind::Conditional {
                condition,
                consequent,
                alternate,
            } => {
                if condition.evaluate_as_int()?.is_zero() {
                    alternate.evaluate_as_int()?
                } else {
                    consequent.evaluate_as_int()?
                }
            }
            _ => return None,
        };
        Some(result)
    }

    /// True if this expression is a null pointer constant: nullptr, __null, or an integer
    /// constant expression with value zero.
    pub fn is_null_pointer_constant(&self) -> bool {
        let expr = self.ignore_parens();
        match &expr.kind {
            ExprKind::NullPtrLiteral | ExprKind::GnuNull => true,
            ExprKind::ImplicitCast { operand, .. } | ExprKind::CStyleCast { operand, .. } => {
                operand.is_null_pointer_constant()
            }
            _ => matches!(expr.evaluate_as_int(), Some(val) if val.is_zero()),
        }
    }
}
