use super::{describe, is_kind_family, type_error, CallArg, CallRule};
use crate::diagnostic::Diagnostic;
use crate::types::{Access, BasicKind, ResourceKind, Ty};

/// Single-argument math functions whose result has the argument's type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MathFn {
    Exp,
    Log,
    Tan,
    Frac,
    Saturate,
    Floor,
    Sin,
    Cos,
    Sqrt,
    Rsqrt,
    Abs,
    Sign,
    Normalize,
}

impl MathFn {
    pub const ALL: [MathFn; 13] = [
        MathFn::Exp,
        MathFn::Log,
        MathFn::Tan,
        MathFn::Frac,
        MathFn::Saturate,
        MathFn::Floor,
        MathFn::Sin,
        MathFn::Cos,
        MathFn::Sqrt,
        MathFn::Rsqrt,
        MathFn::Abs,
        MathFn::Sign,
        MathFn::Normalize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MathFn::Exp => "exp",
            MathFn::Log => "log",
            MathFn::Tan => "tan",
            MathFn::Frac => "frac",
            MathFn::Saturate => "saturate",
            MathFn::Floor => "floor",
            MathFn::Sin => "sin",
            MathFn::Cos => "cos",
            MathFn::Sqrt => "sqrt",
            MathFn::Rsqrt => "rsqrt",
            MathFn::Abs => "abs",
            MathFn::Sign => "sign",
            MathFn::Normalize => "normalize",
        }
    }
}

/// Built-in intrinsics of the target language and of the kernel prologue.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    // ── Resources ──
    Sample,
    GetDimensions,
    Read,
    Write,
    NonUniform,

    // ── Math ──
    Math(MathFn),
    Pow,
    Dot,
    Cross,
    Reflect,
    Length,
    Min,
    Max,
    Lerp,
    Clamp,
    Transpose,
    Mul,
    CountBits,
    IsNan,
    IsInf,
    All,
    Any,

    // ── Conversions ──
    ConvertTo(BasicKind),
    BitcastTo(BasicKind),
    U32ToF16,
    F16ToU32,
    Splat(u32),
    Construct(Ty),

    // ── Wave / lane queries ──
    LaneIndex,
    LaneBit,
    Ballot,

    // ── Ray queries and prologue helpers ──
    RayTest,
    RayQuery,
    GetTbn,
    Interpolate,
}

impl Builtin {
    /// Every built-in registered in the standard intrinsic table.
    pub fn catalog() -> Vec<Builtin> {
        let mut out = vec![
            Builtin::Sample,
            Builtin::GetDimensions,
            Builtin::Read,
            Builtin::Write,
            Builtin::NonUniform,
            Builtin::Pow,
            Builtin::Dot,
            Builtin::Cross,
            Builtin::Reflect,
            Builtin::Length,
            Builtin::Min,
            Builtin::Max,
            Builtin::Lerp,
            Builtin::Clamp,
            Builtin::Transpose,
            Builtin::Mul,
            Builtin::CountBits,
            Builtin::IsNan,
            Builtin::IsInf,
            Builtin::All,
            Builtin::Any,
            Builtin::U32ToF16,
            Builtin::F16ToU32,
            Builtin::LaneIndex,
            Builtin::LaneBit,
            Builtin::Ballot,
            Builtin::RayTest,
            Builtin::RayQuery,
            Builtin::GetTbn,
            Builtin::Interpolate,
        ];
        out.extend(MathFn::ALL.into_iter().map(Builtin::Math));
        for kind in [BasicKind::F32, BasicKind::F16, BasicKind::U32, BasicKind::I32] {
            out.push(Builtin::ConvertTo(kind));
        }
        for kind in [BasicKind::F32, BasicKind::U32, BasicKind::I32] {
            out.push(Builtin::BitcastTo(kind));
        }
        for n in 2..=4 {
            out.push(Builtin::Splat(n));
        }
        for ty in [
            Ty::f32x2(),
            Ty::f32x3(),
            Ty::f32x4(),
            Ty::f16x2(),
            Ty::f16x3(),
            Ty::f16x4(),
            Ty::u32x2(),
            Ty::u32x3(),
            Ty::u32x4(),
            Ty::i32x2(),
            Ty::i32x3(),
            Ty::i32x4(),
        ] {
            out.push(Builtin::Construct(ty));
        }
        out
    }

    pub fn name(&self) -> String {
        match self {
            Builtin::Sample => "Sample".to_string(),
            Builtin::GetDimensions => "__get_dimensions".to_string(),
            Builtin::Read => "read".to_string(),
            Builtin::Write => "write".to_string(),
            Builtin::NonUniform => "NonUniformResourceIndex".to_string(),
            Builtin::Math(f) => f.name().to_string(),
            Builtin::Pow => "pow".to_string(),
            Builtin::Dot => "dot".to_string(),
            Builtin::Cross => "cross".to_string(),
            Builtin::Reflect => "reflect".to_string(),
            Builtin::Length => "length".to_string(),
            Builtin::Min => "min".to_string(),
            Builtin::Max => "max".to_string(),
            Builtin::Lerp => "lerp".to_string(),
            Builtin::Clamp => "clamp".to_string(),
            Builtin::Transpose => "transpose".to_string(),
            Builtin::Mul => "mul".to_string(),
            Builtin::CountBits => "countbits".to_string(),
            Builtin::IsNan => "isnan".to_string(),
            Builtin::IsInf => "isinf".to_string(),
            Builtin::All => "all".to_string(),
            Builtin::Any => "any".to_string(),
            Builtin::ConvertTo(kind) => format!("to_{}", kind.prefix()),
            Builtin::BitcastTo(kind) => format!("as{}", kind.prefix()),
            Builtin::U32ToF16 => "u32_to_f16".to_string(),
            Builtin::F16ToU32 => "f16_to_u32".to_string(),
            Builtin::Splat(n) => format!("splat{}", n),
            Builtin::Construct(ty) => ty.name(),
            Builtin::LaneIndex => "WaveGetLaneIndex".to_string(),
            Builtin::LaneBit => "__get_lane_bit".to_string(),
            Builtin::Ballot => "WaveActiveBallot".to_string(),
            Builtin::RayTest => "__anyhit".to_string(),
            Builtin::RayQuery => "__ray_query".to_string(),
            Builtin::GetTbn => "__get_tbn".to_string(),
            Builtin::Interpolate => "__interpolate".to_string(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Builtin::LaneIndex | Builtin::LaneBit => 0,
            Builtin::Pow
            | Builtin::Dot
            | Builtin::Cross
            | Builtin::Reflect
            | Builtin::Min
            | Builtin::Max
            | Builtin::Mul
            | Builtin::Read
            | Builtin::RayTest
            | Builtin::RayQuery => 2,
            Builtin::Sample | Builtin::Lerp | Builtin::Clamp | Builtin::Write => 3,
            Builtin::Interpolate => 4,
            Builtin::Construct(ty) => ty.rows() as usize,
            _ => 1,
        }
    }

    /// Lane-query intrinsics differ per lane whatever their arguments.
    pub fn is_divergent(&self) -> bool {
        matches!(self, Builtin::LaneIndex | Builtin::LaneBit)
    }

    fn expect_arity(&self, args: &[Ty]) -> Result<(), Diagnostic> {
        if let Builtin::Construct(_) = self {
            return Ok(());
        }
        if args.len() != self.arity() {
            return Err(type_error(
                &self.name(),
                format!("expects {} arguments, got {}", self.arity(), args.len()),
            ));
        }
        Ok(())
    }

    fn mismatch(&self, args: &[Ty], expected: &str) -> Diagnostic {
        type_error(
            &self.name(),
            format!("expected {}, got {}", expected, describe(args)),
        )
    }
}

fn float_vector(ty: &Ty) -> bool {
    ty.is_vector() && is_kind_family(ty, BasicKind::is_float)
}

fn integer_vector(ty: &Ty) -> bool {
    ty.is_vector() && is_kind_family(ty, BasicKind::is_integer)
}

fn nth_arg<'a>(name: &str, args: &'a [CallArg], i: usize) -> Result<&'a CallArg, Diagnostic> {
    args.get(i)
        .ok_or_else(|| type_error(name, format!("missing argument {}", i)))
}

fn same_kind_scalar(scalar: &Ty, of: &Ty) -> bool {
    scalar.is_scalar() && scalar.kind() == of.kind()
}

impl CallRule for Builtin {
    fn resolve_return_type(&self, args: &[Ty]) -> Result<Ty, Diagnostic> {
        self.expect_arity(args)?;
        match self {
            Builtin::Sample => {
                let (tex, sampler, uv) = (&args[0], &args[1], &args[2]);
                let uv_ok = uv.is_vector() && uv.is_kind(BasicKind::F32) && (2..=3).contains(&uv.rows());
                if !tex.is_resource_of(ResourceKind::Texture)
                    || !sampler.is_resource_of(ResourceKind::Sampler)
                    || !uv_ok
                {
                    return Err(self.mismatch(args, "(texture, sampler, f32x2|f32x3)"));
                }
                tex.elem()
                    .ok_or_else(|| self.mismatch(args, "a texture with an element type"))
            }
            Builtin::GetDimensions => match args[0].dim() {
                Some(dim) if args[0].is_resource_of(ResourceKind::Texture) => Ty::family(
                    BasicKind::U32,
                    &Ty::numeric(dim.num_dims()),
                    &Ty::numeric(1),
                ),
                _ => Err(self.mismatch(args, "(texture)")),
            },
            Builtin::Read => {
                let (res, idx) = (&args[0], &args[1]);
                let readable = res.is_resource_of(ResourceKind::Buffer)
                    || res.is_resource_of(ResourceKind::Texture);
                if !readable || !integer_vector(idx) {
                    return Err(self.mismatch(args, "(buffer|texture, integer index)"));
                }
                res.elem()
                    .ok_or_else(|| self.mismatch(args, "a resource with an element type"))
            }
            Builtin::Write => {
                let (res, idx, value) = (&args[0], &args[1], &args[2]);
                let writable = res.access() == Some(Access::ReadWrite)
                    && (res.is_resource_of(ResourceKind::Buffer)
                        || res.is_resource_of(ResourceKind::Texture));
                if !writable || !integer_vector(idx) || res.elem().as_ref() != Some(value) {
                    return Err(self.mismatch(args, "(rw buffer|rw texture, integer index, element)"));
                }
                Ok(Ty::void())
            }
            Builtin::NonUniform => {
                if args[0] != Ty::u32() {
                    return Err(self.mismatch(args, "(u32)"));
                }
                Ok(Ty::u32())
            }
            Builtin::Math(f) => {
                let a = &args[0];
                let ok = match f {
                    MathFn::Abs | MathFn::Sign => a.is_value() && !a.is_kind(BasicKind::Bool),
                    MathFn::Normalize => float_vector(a) && a.rows() >= 2,
                    _ => a.is_value() && is_kind_family(a, BasicKind::is_float),
                };
                if !ok {
                    return Err(self.mismatch(args, "a float value"));
                }
                Ok(a.clone())
            }
            Builtin::Pow => {
                let (a, b) = (&args[0], &args[1]);
                if !float_vector(a) || !(b == a || same_kind_scalar(b, a)) {
                    return Err(self.mismatch(args, "(float, same type or scalar)"));
                }
                Ok(a.clone())
            }
            Builtin::Dot => {
                let (a, b) = (&args[0], &args[1]);
                if a != b || !a.is_vector() || a.is_kind(BasicKind::Bool) {
                    return Err(self.mismatch(args, "two vectors of equal type"));
                }
                Ty::with_rows(a, 1)
            }
            Builtin::Cross => {
                if args[0] != Ty::f32x3() || args[1] != Ty::f32x3() {
                    return Err(self.mismatch(args, "(f32x3, f32x3)"));
                }
                Ok(Ty::f32x3())
            }
            Builtin::Reflect => {
                if args[0] != args[1] || !float_vector(&args[0]) {
                    return Err(self.mismatch(args, "two float vectors of equal type"));
                }
                Ok(args[0].clone())
            }
            Builtin::Length => {
                if !float_vector(&args[0]) {
                    return Err(self.mismatch(args, "a float vector"));
                }
                args[0].with_rows(1)
            }
            Builtin::Min | Builtin::Max => {
                if args[0] != args[1] || !args[0].is_value() {
                    return Err(self.mismatch(args, "two values of equal type"));
                }
                Ok(args[0].clone())
            }
            Builtin::Lerp => {
                let (a, b, t) = (&args[0], &args[1], &args[2]);
                if a != b || !float_vector(a) || !(t == a || same_kind_scalar(t, a)) {
                    return Err(self.mismatch(args, "(float, same type, same type or scalar)"));
                }
                Ok(a.clone())
            }
            Builtin::Clamp => {
                let (a, lo, hi) = (&args[0], &args[1], &args[2]);
                let bounds_ok = (lo == a && hi == a) || (same_kind_scalar(lo, a) && same_kind_scalar(hi, a));
                if !a.is_value() || !bounds_ok {
                    return Err(self.mismatch(args, "(value, bound, bound)"));
                }
                Ok(a.clone())
            }
            Builtin::Transpose => match args[0].kind() {
                Some(kind) if args[0].is_matrix() => Ty::matrix(kind, args[0].cols(), args[0].rows()),
                _ => Err(self.mismatch(args, "(matrix)")),
            },
            Builtin::Mul => {
                let (a, b) = (&args[0], &args[1]);
                let kind = match (a.kind(), b.kind()) {
                    (Some(ka), Some(kb)) if ka == kb && ka.is_float() => ka,
                    _ => return Err(self.mismatch(args, "float matrix/vector operands")),
                };
                if a.is_matrix() && b.is_vector() && a.cols() == b.rows() {
                    Ty::vector(kind, a.rows())
                } else if a.is_vector() && b.is_matrix() && a.rows() == b.rows() {
                    Ty::vector(kind, b.cols())
                } else if a.is_matrix() && b.is_matrix() && a.cols() == b.rows() {
                    Ty::matrix(kind, a.rows(), b.cols())
                } else {
                    Err(self.mismatch(args, "matrix×vector, vector×matrix or matrix×matrix"))
                }
            }
            Builtin::CountBits => {
                if !(args[0].is_vector() && args[0].is_kind(BasicKind::U32)) {
                    return Err(self.mismatch(args, "(u32)"));
                }
                Ok(args[0].clone())
            }
            Builtin::IsNan | Builtin::IsInf => {
                if !float_vector(&args[0]) {
                    return Err(self.mismatch(args, "a float vector"));
                }
                Ty::vector(BasicKind::Bool, args[0].rows())
            }
            Builtin::All | Builtin::Any => {
                if !(args[0].is_vector() && args[0].is_kind(BasicKind::Bool)) {
                    return Err(self.mismatch(args, "a bool vector"));
                }
                Ok(Ty::bool())
            }
            Builtin::ConvertTo(kind) => {
                if !args[0].is_vector() {
                    return Err(self.mismatch(args, "a scalar or vector"));
                }
                Ty::vector(*kind, args[0].rows())
            }
            Builtin::BitcastTo(kind) => {
                let bits32 = matches!(
                    args[0].kind(),
                    Some(BasicKind::F32 | BasicKind::U32 | BasicKind::I32)
                );
                if !args[0].is_vector() || !bits32 {
                    return Err(self.mismatch(args, "a 32-bit scalar or vector"));
                }
                Ty::vector(*kind, args[0].rows())
            }
            Builtin::U32ToF16 => {
                if !(args[0].is_vector() && args[0].is_kind(BasicKind::U32)) {
                    return Err(self.mismatch(args, "(u32)"));
                }
                Ty::vector(BasicKind::F16, args[0].rows())
            }
            Builtin::F16ToU32 => {
                if !(args[0].is_vector() && args[0].is_kind(BasicKind::F16)) {
                    return Err(self.mismatch(args, "(f16)"));
                }
                Ty::vector(BasicKind::U32, args[0].rows())
            }
            Builtin::Splat(n) => match args[0].kind() {
                Some(kind) if args[0].is_scalar() => {
                    Ty::family(kind, &Ty::numeric(*n), &Ty::numeric(1))
                }
                _ => Err(self.mismatch(args, "a scalar")),
            },
            Builtin::Construct(ty) => {
                let components: u32 = args.iter().map(Ty::rows).sum();
                let kinds_ok = args
                    .iter()
                    .all(|a| a.is_vector() && a.kind() == ty.kind());
                if args.is_empty() || !kinds_ok || components != ty.rows() {
                    return Err(self.mismatch(
                        args,
                        &format!("{} {} components", ty.rows(), ty.kind().map_or("?", BasicKind::prefix)),
                    ));
                }
                Ok(ty.clone())
            }
            Builtin::LaneIndex | Builtin::LaneBit => Ok(Ty::u32()),
            Builtin::Ballot => {
                if args[0] != Ty::bool() {
                    return Err(self.mismatch(args, "(bool)"));
                }
                Ok(Ty::u32())
            }
            Builtin::RayTest | Builtin::RayQuery => {
                if !args[0].is_resource_of(ResourceKind::Tlas) || args[1] != Ty::ray_desc() {
                    return Err(self.mismatch(args, "(acceleration structure, RayDesc)"));
                }
                if *self == Builtin::RayTest {
                    Ok(Ty::bool())
                } else {
                    Ok(Ty::ray_query_result())
                }
            }
            Builtin::GetTbn => {
                if args[0] != Ty::f32x3() {
                    return Err(self.mismatch(args, "(f32x3)"));
                }
                Ok(Ty::f32x3x3())
            }
            Builtin::Interpolate => {
                let (a, b, c, bary) = (&args[0], &args[1], &args[2], &args[3]);
                let value_ok = a == b && b == c && a.is_kind(BasicKind::F32) && a.is_vector() && a.rows() >= 2;
                if !value_ok || *bary != Ty::f32x2() {
                    return Err(self.mismatch(args, "three equal f32 vectors and f32x2 barycentrics"));
                }
                Ok(a.clone())
            }
        }
    }

    fn emit_call(&self, name: &str, args: &[CallArg]) -> Result<String, Diagnostic> {
        let arg = |i: usize| nth_arg(name, args, i);
        let text = match self {
            Builtin::Sample => format!(
                "{}.SampleLevel({}, {}, f32(0.0))",
                arg(0)?.name,
                arg(1)?.name,
                arg(2)?.name
            ),
            Builtin::Read => format!("{}[{}]", arg(0)?.name, arg(1)?.name),
            Builtin::Write => format!("{}[{}] = {}", arg(0)?.name, arg(1)?.name, arg(2)?.name),
            Builtin::ConvertTo(kind) => {
                let a = arg(0)?;
                format!("{}({})", Ty::vector(*kind, a.ty.rows())?, a.name)
            }
            Builtin::U32ToF16 => {
                let a = arg(0)?;
                format!("{}(f16tof32({}))", Ty::vector(BasicKind::F16, a.ty.rows())?, a.name)
            }
            Builtin::F16ToU32 => {
                let a = arg(0)?;
                format!("{}(f32tof16({}))", Ty::vector(BasicKind::U32, a.ty.rows())?, a.name)
            }
            Builtin::Splat(n) => {
                let a = arg(0)?;
                let kind = a
                    .ty
                    .kind()
                    .ok_or_else(|| type_error(name, format!("cannot splat {}", a.ty)))?;
                format!("(({}){})", Ty::vector(kind, *n)?, a.name)
            }
            Builtin::Ballot => format!("WaveActiveBallot({}).x", arg(0)?.name),
            _ => super::default_call(name, args),
        };
        Ok(text)
    }
}
