//! Operator overloading for [`Var`].

use std::ops::{
    Add, AddAssign, BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Div,
    DivAssign, Mul, MulAssign, Neg, Not, Rem, Shl, Shr, Sub, SubAssign,
};

use super::{KernelBuilder, Var};
use crate::expr::{Expr, ExprRef, Literal, Op};
use crate::types::BasicKind;

/// Anything usable as an operand: a [`Var`] or a Rust constant.
pub trait Operand<'k> {
    fn into_expr(self, kb: &'k KernelBuilder) -> ExprRef;
}

impl<'k> Operand<'k> for Var<'k> {
    fn into_expr(self, _kb: &'k KernelBuilder) -> ExprRef {
        self.expr
    }
}

impl<'k> Operand<'k> for &Var<'k> {
    fn into_expr(self, _kb: &'k KernelBuilder) -> ExprRef {
        self.expr.clone()
    }
}

impl<'k> Operand<'k> for Literal {
    fn into_expr(self, kb: &'k KernelBuilder) -> ExprRef {
        kb.ok(Expr::literal(self))
    }
}

macro_rules! constant_operand {
    ($($t:ty),*) => {
        $(
            impl<'k> Operand<'k> for $t {
                fn into_expr(self, kb: &'k KernelBuilder) -> ExprRef {
                    Literal::from(self).into_expr(kb)
                }
            }

            impl<'k, const N: usize> Operand<'k> for [$t; N] {
                fn into_expr(self, kb: &'k KernelBuilder) -> ExprRef {
                    Literal::from(self).into_expr(kb)
                }
            }
        )*
    };
}

constant_operand!(f32, u32, i32, bool);

impl<'k> Var<'k> {
    pub(crate) fn binary(&self, op: Op, rhs: impl Operand<'k>) -> Var<'k> {
        let rhs = rhs.into_expr(self.kb);
        self.kb.emit(Expr::op(op, Some(self.expr.clone()), rhs))
    }

    pub(crate) fn unary(&self, op: Op) -> Var<'k> {
        self.kb.emit(Expr::op(op, None, self.expr.clone()))
    }
}

macro_rules! binary_ops {
    ($($trait:ident :: $method:ident => $op:ident),* $(,)?) => {
        $(
            impl<'k, R: Operand<'k>> $trait<R> for Var<'k> {
                type Output = Var<'k>;
                fn $method(self, rhs: R) -> Var<'k> {
                    self.binary(Op::$op, rhs)
                }
            }

            impl<'k, R: Operand<'k>> $trait<R> for &Var<'k> {
                type Output = Var<'k>;
                fn $method(self, rhs: R) -> Var<'k> {
                    self.binary(Op::$op, rhs)
                }
            }
        )*
    };
}

binary_ops! {
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
    Rem::rem => Rem,
    BitAnd::bitand => BitAnd,
    BitOr::bitor => BitOr,
    BitXor::bitxor => BitXor,
    Shl::shl => Shl,
    Shr::shr => Shr,
}

// Constant on the left: `2.0 * v`.
macro_rules! constant_lhs_ops {
    ($($t:ty),*) => {
        $(
            constant_lhs_ops!(@one $t, Add::add => Add, Sub::sub => Sub, Mul::mul => Mul, Div::div => Div);
        )*
    };
    (@one $t:ty, $($trait:ident :: $method:ident => $op:ident),*) => {
        $(
            impl<'k> $trait<Var<'k>> for $t {
                type Output = Var<'k>;
                fn $method(self, rhs: Var<'k>) -> Var<'k> {
                    let lhs = self.into_expr(rhs.kb);
                    rhs.kb.emit(Expr::op(Op::$op, Some(lhs), rhs.expr))
                }
            }

            impl<'k> $trait<&Var<'k>> for $t {
                type Output = Var<'k>;
                fn $method(self, rhs: &Var<'k>) -> Var<'k> {
                    let lhs = self.into_expr(rhs.kb);
                    rhs.kb.emit(Expr::op(Op::$op, Some(lhs), rhs.expr.clone()))
                }
            }
        )*
    };
}

constant_lhs_ops!(f32, u32, i32);

macro_rules! assign_ops {
    ($($trait:ident :: $method:ident => $op:ident),* $(,)?) => {
        $(
            impl<'k, R: Operand<'k>> $trait<R> for Var<'k> {
                fn $method(&mut self, rhs: R) {
                    self.binary(Op::$op, rhs);
                }
            }
        )*
    };
}

assign_ops! {
    AddAssign::add_assign => AddAssign,
    SubAssign::sub_assign => SubAssign,
    MulAssign::mul_assign => MulAssign,
    DivAssign::div_assign => DivAssign,
    BitAndAssign::bitand_assign => BitAndAssign,
    BitOrAssign::bitor_assign => BitOrAssign,
    BitXorAssign::bitxor_assign => BitXorAssign,
}

impl<'k> Neg for Var<'k> {
    type Output = Var<'k>;
    fn neg(self) -> Var<'k> {
        self.unary(Op::Sub)
    }
}

impl<'k> Neg for &Var<'k> {
    type Output = Var<'k>;
    fn neg(self) -> Var<'k> {
        self.unary(Op::Sub)
    }
}

/// Logical not on bool values, bitwise not on integers.
impl<'k> Not for &Var<'k> {
    type Output = Var<'k>;
    fn not(self) -> Var<'k> {
        if self.ty().is_kind(BasicKind::Bool) {
            self.unary(Op::Not)
        } else {
            self.unary(Op::BitNot)
        }
    }
}

impl<'k> Not for Var<'k> {
    type Output = Var<'k>;
    fn not(self) -> Var<'k> {
        !&self
    }
}
