//! Expression graph.
//!
//! Nodes are shared through `Rc` and form a DAG: an operand can feed any
//! number of later nodes. Each node carries a process-unique id (the key
//! for scope-memoized emission), a display name, and lazily computed type
//! and divergence.
//!
//! ```text
//! Literal ─┐
//! Input  ──┼─→ Op / Call / Select ─→ Swizzle / Field / Index ─→ ...
//! Resource ┘
//! ```

mod emit;
mod infer;

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::diagnostic::Diagnostic;
use crate::intrinsic::FnPrototype;
use crate::resource::Resource;
use crate::span::Span;
use crate::types::{BasicKind, Ty};

pub type ExprRef = Rc<Expr>;

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

fn next_id() -> u32 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

// ─── Literals ──────────────────────────────────────────────────────

/// Constant scalar or vector value; one entry per component.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    F16(Vec<f32>),
    F32(Vec<f32>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    Bool(Vec<bool>),
}

impl Literal {
    pub fn f16(values: &[f32]) -> Self {
        Literal::F16(values.to_vec())
    }

    pub fn kind(&self) -> BasicKind {
        match self {
            Literal::F16(_) => BasicKind::F16,
            Literal::F32(_) => BasicKind::F32,
            Literal::I32(_) => BasicKind::I32,
            Literal::U32(_) => BasicKind::U32,
            Literal::Bool(_) => BasicKind::Bool,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Literal::F16(v) | Literal::F32(v) => v.len(),
            Literal::I32(v) => v.len(),
            Literal::U32(v) => v.len(),
            Literal::Bool(v) => v.len(),
        }
    }

    /// All-zero literal of a scalar or vector type.
    pub fn zero(ty: &Ty) -> Result<Self, Diagnostic> {
        let n = ty.rows() as usize;
        match ty.kind() {
            Some(BasicKind::F16) if ty.is_vector() => Ok(Literal::F16(vec![0.0; n])),
            Some(BasicKind::F32) if ty.is_vector() => Ok(Literal::F32(vec![0.0; n])),
            Some(BasicKind::I32) if ty.is_vector() => Ok(Literal::I32(vec![0; n])),
            Some(BasicKind::U32) if ty.is_vector() => Ok(Literal::U32(vec![0; n])),
            Some(BasicKind::Bool) if ty.is_vector() => Ok(Literal::Bool(vec![false; n])),
            _ => Err(Diagnostic::error(
                format!("no zero literal for {}", ty),
                Span::dummy(),
            )),
        }
    }

    pub fn ty(&self) -> Result<Ty, Diagnostic> {
        Ty::vector(self.kind(), self.width() as u32)
    }

    /// Constructor text, e.g. `f32x2(1.000000, 0.500000)`.
    pub fn text(&self) -> Result<String, Diagnostic> {
        let parts: Vec<String> = match self {
            Literal::F16(v) | Literal::F32(v) => v.iter().map(|&x| float_text(x)).collect::<Result<_, _>>()?,
            Literal::I32(v) => v.iter().map(i32::to_string).collect(),
            Literal::U32(v) => v.iter().map(u32::to_string).collect(),
            Literal::Bool(v) => v.iter().map(bool::to_string).collect(),
        };
        Ok(format!("{}({})", self.ty()?, parts.join(", ")))
    }
}

/// Fixed six-digit form; magnitudes it would round to zero use an
/// exponent instead.
fn float_text(x: f32) -> Result<String, Diagnostic> {
    if !x.is_finite() {
        return Err(Diagnostic::error(
            format!("float literal {} has no HLSL spelling", x),
            Span::dummy(),
        ));
    }
    if x != 0.0 && x.abs() < 5.0e-7 {
        Ok(format!("{:e}", x))
    } else {
        Ok(format!("{:.6}", x))
    }
}

macro_rules! literal_from {
    ($($scalar:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$scalar> for Literal {
                fn from(v: $scalar) -> Self {
                    Literal::$variant(vec![v])
                }
            }

            impl<const N: usize> From<[$scalar; N]> for Literal {
                fn from(v: [$scalar; N]) -> Self {
                    Literal::$variant(v.to_vec())
                }
            }
        )*
    };
}

literal_from! {
    f32 => F32,
    i32 => I32,
    u32 => U32,
    bool => Bool,
}

// ─── Operators ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    Shl,
    Shr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Rem => "%",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::And => "&&",
            Op::Or => "||",
            Op::Not => "!",
            Op::BitAnd => "&",
            Op::BitOr => "|",
            Op::BitXor => "^",
            Op::BitNot => "~",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::Assign => "=",
            Op::AddAssign => "+=",
            Op::SubAssign => "-=",
            Op::MulAssign => "*=",
            Op::DivAssign => "/=",
            Op::BitAndAssign => "&=",
            Op::BitOrAssign => "|=",
            Op::BitXorAssign => "^=",
        }
    }

    pub fn is_compound_assign(self) -> bool {
        matches!(
            self,
            Op::AddAssign
                | Op::SubAssign
                | Op::MulAssign
                | Op::DivAssign
                | Op::BitAndAssign
                | Op::BitOrAssign
                | Op::BitXorAssign
        )
    }

    /// Plain assignment or any compound form.
    pub fn is_assign(self) -> bool {
        self == Op::Assign || self.is_compound_assign()
    }

    pub fn is_relational(self) -> bool {
        matches!(self, Op::Lt | Op::Le | Op::Gt | Op::Ge | Op::Eq | Op::Ne)
    }

    /// Operators restricted to the integer family.
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            Op::Rem
                | Op::BitAnd
                | Op::BitOr
                | Op::BitXor
                | Op::Shl
                | Op::Shr
                | Op::BitAndAssign
                | Op::BitOrAssign
                | Op::BitXorAssign
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Op::And | Op::Or)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// ─── Node kinds ────────────────────────────────────────────────────

/// Kernel entry inputs and named function parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    DispatchThreadId,
    GroupId,
    GroupThreadId,
    Custom { name: String, ty: Ty },
}

impl Input {
    pub fn name(&self) -> &str {
        match self {
            Input::DispatchThreadId => "__tid",
            Input::GroupId => "__group_id",
            Input::GroupThreadId => "__gid",
            Input::Custom { name, .. } => name,
        }
    }

    pub fn ty(&self) -> Ty {
        match self {
            Input::Custom { ty, .. } => ty.clone(),
            _ => Ty::u32x3(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Index {
    Const(u32),
    Expr(ExprRef),
}

/// Whether a value may differ between lanes of a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Divergence {
    Uniform,
    Divergent,
}

#[derive(Debug)]
pub enum ExprKind {
    Literal(Literal),
    /// Binary when `lhs` is present, prefix otherwise.
    Op {
        op: Op,
        lhs: Option<ExprRef>,
        rhs: ExprRef,
    },
    Call {
        proto: Arc<FnPrototype>,
        args: Vec<ExprRef>,
    },
    Resource(Arc<Resource>),
    Input(Input),
    /// Local array; initialised from `init` when it is non-empty.
    Array {
        elem: Ty,
        len: u32,
        init: Vec<Literal>,
    },
    Swizzle {
        base: ExprRef,
        lanes: String,
    },
    Field {
        base: ExprRef,
        field: String,
    },
    Index {
        base: ExprRef,
        index: Index,
    },
    /// Pre-named storage (shared memory) of a declared type.
    Ref(Ty),
    /// Zero-initialised struct or value variable.
    Zeroed(Ty),
    Select {
        cond: ExprRef,
        then: ExprRef,
        otherwise: ExprRef,
    },
}

/// One node of the expression DAG.
pub struct Expr {
    id: u32,
    pub kind: ExprKind,
    name: RefCell<String>,
    ty: OnceCell<Ty>,
    mode: Cell<Option<Divergence>>,
}

impl Expr {
    fn alloc(kind: ExprKind) -> ExprRef {
        let id = next_id();
        let name = match &kind {
            ExprKind::Resource(res) => res.name.clone(),
            ExprKind::Input(input) => input.name().to_string(),
            _ => format!("tmp_{}", id),
        };
        Rc::new(Self {
            id,
            kind,
            name: RefCell::new(name),
            ty: OnceCell::new(),
            mode: Cell::new(None),
        })
    }

    pub fn literal(value: Literal) -> Result<ExprRef, Diagnostic> {
        value.text()?;
        Ok(Self::alloc(ExprKind::Literal(value)))
    }

    pub fn op(op: Op, lhs: Option<ExprRef>, rhs: ExprRef) -> ExprRef {
        Self::alloc(ExprKind::Op { op, lhs, rhs })
    }

    pub fn call(proto: Arc<FnPrototype>, args: Vec<ExprRef>) -> ExprRef {
        Self::alloc(ExprKind::Call { proto, args })
    }

    pub fn resource(res: Arc<Resource>) -> ExprRef {
        Self::alloc(ExprKind::Resource(res))
    }

    pub fn input(input: Input) -> ExprRef {
        Self::alloc(ExprKind::Input(input))
    }

    pub fn array(elem: Ty, len: u32, init: Vec<Literal>) -> Result<ExprRef, Diagnostic> {
        if len == 0 {
            return Err(Diagnostic::error(
                "local arrays need at least one element".to_string(),
                Span::dummy(),
            ));
        }
        if !init.is_empty() && init.len() != len as usize {
            return Err(Diagnostic::error(
                format!("array of {} initialised with {} values", len, init.len()),
                Span::dummy(),
            ));
        }
        for value in &init {
            if value.ty()? != elem {
                return Err(Diagnostic::error(
                    format!("array of {} initialised with {}", elem, value.ty()?),
                    Span::dummy(),
                ));
            }
        }
        Ok(Self::alloc(ExprKind::Array { elem, len, init }))
    }

    /// Component selection; letters must be `x y z w`, at most four of them,
    /// each within the width of `base`.
    pub fn swizzle(base: ExprRef, lanes: &str) -> Result<ExprRef, Diagnostic> {
        let base_ty = base.infer_type()?;
        let width = base_ty.rows();
        if !base_ty.is_vector() || lanes.is_empty() || lanes.len() > 4 {
            return Err(Diagnostic::error(
                format!("invalid swizzle `.{}` on {}", lanes, base_ty),
                Span::dummy(),
            ));
        }
        for c in lanes.chars() {
            let lane = match c {
                'x' => 0,
                'y' => 1,
                'z' => 2,
                'w' => 3,
                _ => {
                    return Err(Diagnostic::error(
                        format!("invalid swizzle letter `{}` in `.{}`", c, lanes),
                        Span::dummy(),
                    ))
                }
            };
            if lane >= width {
                return Err(Diagnostic::error(
                    format!("swizzle `.{}` reads past the width of {}", lanes, base_ty),
                    Span::dummy(),
                ));
            }
        }
        Ok(Self::alloc(ExprKind::Swizzle {
            base,
            lanes: lanes.to_string(),
        }))
    }

    pub fn field(base: ExprRef, field: &str) -> ExprRef {
        Self::alloc(ExprKind::Field {
            base,
            field: field.to_string(),
        })
    }

    pub fn index(base: ExprRef, index: Index) -> ExprRef {
        Self::alloc(ExprKind::Index { base, index })
    }

    pub fn reference(name: &str, ty: Ty) -> ExprRef {
        let node = Self::alloc(ExprKind::Ref(ty));
        node.set_name(name);
        node
    }

    pub fn zeroed(ty: Ty) -> ExprRef {
        Self::alloc(ExprKind::Zeroed(ty))
    }

    pub fn select(cond: ExprRef, then: ExprRef, otherwise: ExprRef) -> ExprRef {
        Self::alloc(ExprKind::Select {
            cond,
            then,
            otherwise,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Current display name; changes when the node adopts an assignment
    /// target's name or a literal's constructor text.
    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = name.to_string();
    }

    /// Direct operands, in evaluation order, each with its role.
    pub fn children(&self) -> Vec<(&'static str, &ExprRef)> {
        match &self.kind {
            ExprKind::Op { lhs, rhs, .. } => {
                let mut out = Vec::new();
                if let Some(lhs) = lhs {
                    out.push(("lhs", lhs));
                }
                out.push(("rhs", rhs));
                out
            }
            ExprKind::Call { args, .. } => args.iter().map(|a| ("arg", a)).collect(),
            ExprKind::Swizzle { base, .. } | ExprKind::Field { base, .. } => vec![("base", base)],
            ExprKind::Index { base, index } => match index {
                Index::Expr(i) => vec![("base", base), ("index", i)],
                Index::Const(_) => vec![("base", base)],
            },
            ExprKind::Select {
                cond,
                then,
                otherwise,
            } => vec![("cond", cond), ("then", then), ("else", otherwise)],
            ExprKind::Literal(_)
            | ExprKind::Resource(_)
            | ExprKind::Input(_)
            | ExprKind::Array { .. }
            | ExprKind::Ref(_)
            | ExprKind::Zeroed(_) => Vec::new(),
        }
    }

    /// Short description of the node for graphs and debugging.
    pub fn label(&self) -> String {
        match &self.kind {
            ExprKind::Literal(lit) => lit.text().unwrap_or_else(|_| "literal".to_string()),
            ExprKind::Op { op, .. } => format!("{} {}", self.name(), op),
            ExprKind::Call { proto, .. } => format!("{} {}()", self.name(), proto.name),
            ExprKind::Resource(res) => res.name.clone(),
            ExprKind::Input(input) => input.name().to_string(),
            ExprKind::Array { elem, len, .. } => format!("{} {}[{}]", self.name(), elem, len),
            ExprKind::Swizzle { lanes, .. } => format!(".{}", lanes),
            ExprKind::Field { field, .. } => format!(".{}", field),
            ExprKind::Index { index, .. } => match index {
                Index::Const(i) => format!("[{}]", i),
                Index::Expr(_) => "[]".to_string(),
            },
            ExprKind::Ref(ty) => format!("{}: {}", self.name(), ty),
            ExprKind::Zeroed(ty) => format!("{} {}", self.name(), ty),
            ExprKind::Select { .. } => format!("{} ?:", self.name()),
        }
    }

    /// Outermost storage written through a swizzle/field/index chain.
    pub fn lvalue_root(self: &Rc<Self>) -> ExprRef {
        let mut node = self.clone();
        loop {
            let next = match &node.kind {
                ExprKind::Swizzle { base, .. }
                | ExprKind::Field { base, .. }
                | ExprKind::Index { base, .. } => base.clone(),
                _ => return node,
            };
            node = next;
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr#{}({})", self.id, self.label())
    }
}
