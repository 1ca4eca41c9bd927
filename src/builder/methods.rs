//! Value methods: comparisons, assignment, access paths and intrinsics.

use super::{Operand, Var};
use crate::diagnostic::Diagnostic;
use crate::expr::{Expr, Index, Op};
use crate::intrinsic::{Builtin, MathFn};
use crate::types::BasicKind;

macro_rules! comparisons {
    ($($(#[$doc:meta])* $name:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(&self, rhs: impl Operand<'k>) -> Var<'k> {
                self.binary(Op::$op, rhs)
            }
        )*
    };
}

macro_rules! swizzles {
    ($($name:ident),*) => {
        $(
            pub fn $name(&self) -> Var<'k> {
                self.swizzle(stringify!($name))
            }
        )*
    };
}

macro_rules! math_fns {
    ($($name:ident => $f:ident),* $(,)?) => {
        $(
            pub fn $name(&self) -> Var<'k> {
                self.intrinsic(Builtin::Math(MathFn::$f), &[])
            }
        )*
    };
}

impl<'k> Var<'k> {
    fn intrinsic(&self, b: Builtin, rest: &[&Var<'k>]) -> Var<'k> {
        let mut args = vec![self.expr.clone()];
        args.extend(rest.iter().map(|v| v.expr.clone()));
        self.kb.call_builtin(b, args)
    }

    fn operand(&self, value: impl Operand<'k>) -> Var<'k> {
        let expr = value.into_expr(self.kb);
        self.kb.emit(expr)
    }

    // ── Comparisons and logic ──

    comparisons! {
        lt => Lt,
        le => Le,
        gt => Gt,
        ge => Ge,
        /// Component-wise `==`.
        equals => Eq,
        /// Component-wise `!=`.
        not_equals => Ne,
        and => And,
        or => Or,
    }

    // ── Assignment ──

    /// `self = value;` in place.
    pub fn assign(&self, value: impl Operand<'k>) -> Var<'k> {
        self.binary(Op::Assign, value)
    }

    /// A fresh variable holding the current value.
    pub fn copy(&self) -> Var<'k> {
        self.kb.var(self)
    }

    /// A fresh variable holding the current value, under a chosen name.
    pub fn named(&self, name: &str) -> Var<'k> {
        let expr = Expr::op(Op::Assign, None, self.expr.clone());
        expr.set_name(name);
        self.kb.emit(expr)
    }

    // ── Access paths ──

    pub fn try_swizzle(&self, lanes: &str) -> Result<Var<'k>, Diagnostic> {
        let expr = Expr::swizzle(self.expr.clone(), lanes)?;
        self.kb.try_emit(expr)
    }

    pub fn swizzle(&self, lanes: &str) -> Var<'k> {
        let result = self.try_swizzle(lanes);
        self.kb.ok(result)
    }

    swizzles!(x, y, z, w, xy, xyz, zw, yx);

    /// Element at a constant position.
    pub fn at(&self, i: u32) -> Var<'k> {
        self.kb.emit(Expr::index(self.expr.clone(), Index::Const(i)))
    }

    /// Element at a computed position.
    pub fn index(&self, i: impl Operand<'k>) -> Var<'k> {
        let i = i.into_expr(self.kb);
        self.kb.emit(Expr::index(self.expr.clone(), Index::Expr(i)))
    }

    pub fn try_field(&self, name: &str) -> Result<Var<'k>, Diagnostic> {
        self.kb.try_emit(Expr::field(self.expr.clone(), name))
    }

    pub fn field(&self, name: &str) -> Var<'k> {
        let result = self.try_field(name);
        self.kb.ok(result)
    }

    /// Struct field, or swizzle on vectors.
    pub fn get(&self, name: &str) -> Var<'k> {
        if self.ty().is_struct() {
            self.field(name)
        } else {
            self.swizzle(name)
        }
    }

    /// Assign to a struct field or vector lanes.
    pub fn set(&self, name: &str, value: impl Operand<'k>) -> Var<'k> {
        self.get(name).assign(value)
    }

    /// Resource read or array element.
    pub fn load(&self, i: impl Operand<'k>) -> Var<'k> {
        if self.ty().is_resource() {
            let i = self.operand(i);
            self.read(&i)
        } else {
            self.index(i)
        }
    }

    /// Resource write or array element assignment.
    pub fn store(&self, i: impl Operand<'k>, value: impl Operand<'k>) {
        if self.ty().is_resource() {
            let i = self.operand(i);
            let value = self.operand(value);
            self.write(&i, &value);
        } else {
            self.index(i).assign(value);
        }
    }

    // ── Resources ──

    pub fn read(&self, index: &Var<'k>) -> Var<'k> {
        self.intrinsic(Builtin::Read, &[index])
    }

    pub fn write(&self, index: &Var<'k>, value: &Var<'k>) {
        self.intrinsic(Builtin::Write, &[index, value]);
    }

    /// Level-zero sample of a texture.
    pub fn sample(&self, sampler: &Var<'k>, uv: &Var<'k>) -> Var<'k> {
        self.intrinsic(Builtin::Sample, &[sampler, uv])
    }

    /// Texture extent, one component per dimension.
    pub fn dimensions(&self) -> Var<'k> {
        self.intrinsic(Builtin::GetDimensions, &[])
    }

    pub fn non_uniform(&self) -> Var<'k> {
        self.intrinsic(Builtin::NonUniform, &[])
    }

    // ── Math ──

    math_fns! {
        exp => Exp,
        log => Log,
        tan => Tan,
        frac => Frac,
        saturate => Saturate,
        floor => Floor,
        sin => Sin,
        cos => Cos,
        sqrt => Sqrt,
        rsqrt => Rsqrt,
        abs => Abs,
        sign => Sign,
        normalize => Normalize,
    }

    pub fn pow(&self, e: impl Operand<'k>) -> Var<'k> {
        let e = self.operand(e);
        self.intrinsic(Builtin::Pow, &[&e])
    }

    pub fn dot(&self, other: &Var<'k>) -> Var<'k> {
        self.intrinsic(Builtin::Dot, &[other])
    }

    pub fn cross(&self, other: &Var<'k>) -> Var<'k> {
        self.intrinsic(Builtin::Cross, &[other])
    }

    pub fn reflect(&self, normal: &Var<'k>) -> Var<'k> {
        self.intrinsic(Builtin::Reflect, &[normal])
    }

    pub fn length(&self) -> Var<'k> {
        self.intrinsic(Builtin::Length, &[])
    }

    pub fn min(&self, other: impl Operand<'k>) -> Var<'k> {
        let other = self.operand(other);
        self.intrinsic(Builtin::Min, &[&other])
    }

    pub fn max(&self, other: impl Operand<'k>) -> Var<'k> {
        let other = self.operand(other);
        self.intrinsic(Builtin::Max, &[&other])
    }

    pub fn lerp(&self, to: &Var<'k>, t: impl Operand<'k>) -> Var<'k> {
        let t = self.operand(t);
        self.intrinsic(Builtin::Lerp, &[to, &t])
    }

    pub fn clamp(&self, lo: impl Operand<'k>, hi: impl Operand<'k>) -> Var<'k> {
        let lo = self.operand(lo);
        let hi = self.operand(hi);
        self.intrinsic(Builtin::Clamp, &[&lo, &hi])
    }

    pub fn transpose(&self) -> Var<'k> {
        self.intrinsic(Builtin::Transpose, &[])
    }

    /// Matrix product (`mul(self, other)`).
    pub fn matmul(&self, other: &Var<'k>) -> Var<'k> {
        self.intrinsic(Builtin::Mul, &[other])
    }

    pub fn count_bits(&self) -> Var<'k> {
        self.intrinsic(Builtin::CountBits, &[])
    }

    pub fn is_nan(&self) -> Var<'k> {
        self.intrinsic(Builtin::IsNan, &[])
    }

    pub fn is_inf(&self) -> Var<'k> {
        self.intrinsic(Builtin::IsInf, &[])
    }

    pub fn all(&self) -> Var<'k> {
        self.intrinsic(Builtin::All, &[])
    }

    pub fn any(&self) -> Var<'k> {
        self.intrinsic(Builtin::Any, &[])
    }

    /// Tangent frame around a unit normal.
    pub fn tbn(&self) -> Var<'k> {
        self.intrinsic(Builtin::GetTbn, &[])
    }

    // ── Conversions ──

    pub fn to_f32(&self) -> Var<'k> {
        self.intrinsic(Builtin::ConvertTo(BasicKind::F32), &[])
    }

    pub fn to_f16(&self) -> Var<'k> {
        self.intrinsic(Builtin::ConvertTo(BasicKind::F16), &[])
    }

    pub fn to_u32(&self) -> Var<'k> {
        self.intrinsic(Builtin::ConvertTo(BasicKind::U32), &[])
    }

    pub fn to_i32(&self) -> Var<'k> {
        self.intrinsic(Builtin::ConvertTo(BasicKind::I32), &[])
    }

    /// Reinterpret the bits as `f32`.
    pub fn as_f32(&self) -> Var<'k> {
        self.intrinsic(Builtin::BitcastTo(BasicKind::F32), &[])
    }

    pub fn as_u32(&self) -> Var<'k> {
        self.intrinsic(Builtin::BitcastTo(BasicKind::U32), &[])
    }

    pub fn as_i32(&self) -> Var<'k> {
        self.intrinsic(Builtin::BitcastTo(BasicKind::I32), &[])
    }

    /// Half-precision value stored in the low 16 bits.
    pub fn u32_to_f16(&self) -> Var<'k> {
        self.intrinsic(Builtin::U32ToF16, &[])
    }

    pub fn f16_to_u32(&self) -> Var<'k> {
        self.intrinsic(Builtin::F16ToU32, &[])
    }

    /// Broadcast a scalar to an `n`-wide vector.
    pub fn splat(&self, n: u32) -> Var<'k> {
        self.intrinsic(Builtin::Splat(n), &[])
    }

    /// Bit mask of lanes whose (bool) value is true.
    pub fn ballot(&self) -> Var<'k> {
        self.intrinsic(Builtin::Ballot, &[])
    }
}
