//! Lazy type and divergence inference over the expression DAG.

use super::{Divergence, Expr, ExprKind, ExprRef, Index, Op};
use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::types::{ArrayLen, BasicKind, ResourceKind, Ty};

fn op_error(op: Op, message: String) -> Diagnostic {
    Diagnostic::error(format!("operator `{}`: {}", op, message), Span::dummy())
}

fn in_family(ty: &Ty, pred: fn(BasicKind) -> bool) -> bool {
    ty.is_value() && ty.kind().is_some_and(pred)
}

impl Expr {
    /// Type of this node, computed once and cached.
    pub fn infer_type(&self) -> Result<Ty, Diagnostic> {
        if let Some(ty) = self.ty.get() {
            return Ok(ty.clone());
        }
        let ty = self.compute_type()?;
        let _ = self.ty.set(ty.clone());
        Ok(ty)
    }

    fn compute_type(&self) -> Result<Ty, Diagnostic> {
        match &self.kind {
            ExprKind::Literal(lit) => lit.ty(),
            ExprKind::Op { op, lhs, rhs } => op_type(*op, lhs.as_ref(), rhs),
            ExprKind::Call { proto, args } => {
                let tys = args
                    .iter()
                    .map(|a| a.infer_type())
                    .collect::<Result<Vec<_>, _>>()?;
                proto.resolve_return_type(&tys)
            }
            // Constants are read directly as their value.
            ExprKind::Resource(res) => match (res.kind(), res.shape().elem()) {
                (Some(ResourceKind::Constant), Some(elem)) if !res.is_array() => Ok(elem),
                _ => Ok(res.ty.clone()),
            },
            ExprKind::Input(input) => Ok(input.ty()),
            ExprKind::Array { elem, len, .. } => Ok(Ty::array(elem.clone(), ArrayLen::Fixed(*len))),
            ExprKind::Swizzle { base, lanes } => {
                let base = base.infer_type()?;
                let kind = base.kind().ok_or_else(|| {
                    Diagnostic::error(format!("cannot swizzle {}", base), Span::dummy())
                })?;
                Ty::vector(kind, lanes.len() as u32)
            }
            ExprKind::Field { base, field } => {
                let base = base.infer_type()?;
                if !base.is_struct() {
                    return Err(Diagnostic::error(
                        format!("field `{}` accessed on non-struct {}", field, base),
                        Span::dummy(),
                    ));
                }
                base.field(field).ok_or_else(|| {
                    Diagnostic::error(format!("{} has no field `{}`", base, field), Span::dummy())
                })
            }
            ExprKind::Index { base, index } => {
                if let Index::Expr(i) = index {
                    let ity = i.infer_type()?;
                    if !(ity.is_vector() && in_family(&ity, BasicKind::is_integer)) {
                        return Err(Diagnostic::error(
                            format!("index must be an integer, got {}", ity),
                            Span::dummy(),
                        ));
                    }
                }
                index_type(&base.infer_type()?)
            }
            ExprKind::Ref(ty) => Ok(ty.clone()),
            ExprKind::Zeroed(ty) => {
                if !(ty.is_struct() || ty.is_value()) {
                    return Err(Diagnostic::error(
                        format!("cannot zero-initialise {}", ty),
                        Span::dummy(),
                    ));
                }
                Ok(ty.clone())
            }
            ExprKind::Select {
                cond,
                then,
                otherwise,
            } => {
                let cty = cond.infer_type()?;
                if cty != Ty::bool() {
                    return Err(Diagnostic::error(
                        format!("select condition must be bool, got {}", cty),
                        Span::dummy(),
                    ));
                }
                let a = then.infer_type()?;
                let b = otherwise.infer_type()?;
                if a != b {
                    return Err(Diagnostic::error(
                        format!("select branches disagree: {} vs {}", a, b),
                        Span::dummy(),
                    ));
                }
                Ok(a)
            }
        }
    }

    /// Divergence of this node, computed once unless forced.
    pub fn divergence(&self) -> Divergence {
        if let Some(mode) = self.mode.get() {
            return mode;
        }
        let mode = self.compute_divergence();
        self.mode.set(Some(mode));
        mode
    }

    pub fn is_uniform(&self) -> bool {
        self.divergence() == Divergence::Uniform
    }

    /// Mark the node as differing per lane, whatever its operands say.
    pub fn force_divergent(&self) {
        self.mode.set(Some(Divergence::Divergent));
    }

    fn compute_divergence(&self) -> Divergence {
        let any = |nodes: &[&ExprRef]| {
            if nodes.iter().any(|n| n.divergence() == Divergence::Divergent) {
                Divergence::Divergent
            } else {
                Divergence::Uniform
            }
        };
        match &self.kind {
            ExprKind::Literal(_)
            | ExprKind::Resource(_)
            | ExprKind::Zeroed(_)
            | ExprKind::Ref(_)
            | ExprKind::Array { .. } => Divergence::Uniform,
            ExprKind::Input(_) => Divergence::Divergent,
            ExprKind::Call { proto, .. } if proto.divergent => Divergence::Divergent,
            _ => {
                let children: Vec<&ExprRef> = self.children().into_iter().map(|(_, c)| c).collect();
                any(&children)
            }
        }
    }
}

fn index_type(base: &Ty) -> Result<Ty, Diagnostic> {
    if base.is_array() || base.is_resource() {
        if let Some(elem) = base.elem() {
            return Ok(elem);
        }
    }
    if base.is_matrix() {
        if let Some(kind) = base.kind() {
            return Ty::vector(kind, base.cols());
        }
    }
    if base.is_vector() && !base.is_scalar() {
        if let Some(kind) = base.kind() {
            return Ok(Ty::scalar(kind));
        }
    }
    Err(Diagnostic::error(
        format!("cannot index into {}", base),
        Span::dummy(),
    ))
}

fn op_type(op: Op, lhs: Option<&ExprRef>, rhs: &ExprRef) -> Result<Ty, Diagnostic> {
    let r = rhs.infer_type()?;
    let l = match lhs {
        Some(lhs) => lhs.infer_type()?,
        None => return unary_type(op, r),
    };
    if matches!(op, Op::Not | Op::BitNot) {
        return Err(op_error(op, "takes a single operand".to_string()));
    }
    if op == Op::Assign {
        if l != r {
            return Err(op_error(op, format!("cannot assign {} to {}", r, l)));
        }
        return Ok(l);
    }
    if op.is_bitwise() {
        if l != r || !in_family(&l, BasicKind::is_integer) {
            return Err(op_error(op, format!("needs equal integer operands, got {} and {}", l, r)));
        }
        return Ok(l);
    }
    if op.is_logical() {
        if l != r || !l.is_kind(BasicKind::Bool) {
            return Err(op_error(op, format!("needs equal bool operands, got {} and {}", l, r)));
        }
        return Ok(l);
    }
    if op.is_relational() {
        if l != r || !l.is_vector() {
            return Err(op_error(op, format!("cannot compare {} with {}", l, r)));
        }
        return Ty::vector(BasicKind::Bool, l.rows());
    }
    // Arithmetic and its assign forms.
    if !l.is_value() || !r.is_value() || l.is_kind(BasicKind::Bool) || l.kind() != r.kind() {
        return Err(op_error(op, format!("no arithmetic between {} and {}", l, r)));
    }
    if l == r {
        return Ok(l);
    }
    if l.is_scalar() && op == Op::Mul {
        return Ok(r);
    }
    if r.is_scalar() && matches!(op, Op::Mul | Op::Div | Op::MulAssign | Op::DivAssign) {
        return Ok(l);
    }
    Err(op_error(op, format!("mismatched operands {} and {}", l, r)))
}

fn unary_type(op: Op, r: Ty) -> Result<Ty, Diagnostic> {
    let ok = match op {
        Op::Assign => true,
        Op::BitNot => in_family(&r, BasicKind::is_integer),
        Op::Not => r.is_value() && r.is_kind(BasicKind::Bool),
        Op::Add | Op::Sub => r.is_value() && !r.is_kind(BasicKind::Bool),
        _ => return Err(op_error(op, "needs two operands".to_string())),
    };
    if !ok {
        return Err(op_error(op, format!("not defined for {}", r)));
    }
    Ok(r)
}
