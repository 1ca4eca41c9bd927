//! Builder facade: construct kernels with ordinary Rust calls and operators.
//!
//! A [`KernelBuilder`] owns the module being emitted. Every value is a
//! [`Var`] that borrows the builder, so values cannot outlive the kernel
//! they belong to. Each call emits immediately:
//!
//! ```text
//! let kb = KernelBuilder::new("scale");
//! let out = kb.resource(&Resource::rw_buffer("g_out", Ty::f32()));
//! let i = kb.thread_id().x();
//! let v = out.read(&i) * 2.0f32;      // f32 tmp_7 = tmp_6*f32(2.000000);
//! out.write(&i, &v);                  // g_out[__tid.x] = tmp_7;
//! let kernel = kb.finish()?;
//! ```
//!
//! Contract violations (type errors, bad swizzles, misplaced breaks) are
//! fatal: the diagnostic is rendered against the text emitted so far and
//! the builder panics. The `try_*` variants return the diagnostic instead.

mod control;
mod library;
mod methods;
mod ops;
mod wave;
#[cfg(test)]
mod tests;

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use crate::config::KernelConfig;
use crate::diagnostic::Diagnostic;
use crate::expr::{Divergence, Expr, ExprRef, Input, Literal};
use crate::graph::ExprGraph;
use crate::intrinsic::{Builtin, FnPrototype, IntrinsicTable, Rule};
use crate::module::{Manifest, Module};
use crate::resource::Resource;
use crate::span::Span;
use crate::types::{ArrayLen, Ty};

pub use ops::Operand;

/// A finished kernel: text, binding manifest and emission graph.
#[derive(Clone, Debug)]
pub struct Kernel {
    pub name: String,
    pub text: String,
    pub manifest: Manifest,
    pub warnings: Vec<Diagnostic>,
    pub graph: ExprGraph,
}

impl Kernel {
    /// Content hash of the kernel text (hex).
    pub fn cache_key(&self) -> String {
        blake3::hash(self.text.as_bytes()).to_hex().to_string()
    }
}

/// Emission context of one kernel.
pub struct KernelBuilder {
    name: String,
    module: RefCell<Module>,
    intrinsics: RefCell<IntrinsicTable>,
    roots: RefCell<Vec<ExprRef>>,
    labels: Cell<u32>,
}

/// A value in a kernel under construction.
#[derive(Clone)]
pub struct Var<'k> {
    kb: &'k KernelBuilder,
    expr: ExprRef,
}

impl std::fmt::Debug for Var<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Var({:?})", self.expr)
    }
}

impl KernelBuilder {
    /// Builder with the default compute configuration.
    pub fn new(name: &str) -> Self {
        Self::from_parts(KernelConfig::named(name))
    }

    /// Builder for `config`; fails when its group size is invalid.
    pub fn with_config(config: &KernelConfig) -> Result<Self, Diagnostic> {
        let kb = Self::from_parts(config.clone());
        let [x, y, z] = config.group_size;
        kb.set_group_size(x, y, z)?;
        if config.wave32 {
            kb.enable_wave32();
        }
        Ok(kb)
    }

    fn from_parts(config: KernelConfig) -> Self {
        Self {
            name: config.name.clone(),
            module: RefCell::new(Module::new(&config)),
            intrinsics: RefCell::new(IntrinsicTable::standard()),
            roots: RefCell::new(Vec::new()),
            labels: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finalize the module into kernel text and its manifest.
    pub fn finish(self) -> Result<Kernel, Diagnostic> {
        let KernelBuilder {
            name,
            module,
            roots,
            ..
        } = self;
        let module = module.into_inner();
        let text = module.finalize()?;
        let manifest = module.manifest()?;
        let warnings = module.warnings();
        let graph = ExprGraph::from_roots(&roots.into_inner());
        Ok(Kernel {
            name,
            text,
            manifest,
            warnings,
            graph,
        })
    }

    /// Body text emitted so far.
    pub fn text(&self) -> String {
        self.module.borrow().current_text().to_string()
    }

    pub fn set_group_size(&self, x: u32, y: u32, z: u32) -> Result<(), Diagnostic> {
        self.module.borrow_mut().set_group_size(x, y, z)
    }

    /// Append declarations placed before free functions and the entry point.
    pub fn write_header(&self, text: &str) {
        self.module.borrow_mut().write_header(text);
    }

    pub fn is_wave32(&self) -> bool {
        self.module.borrow().is_wave32()
    }

    // ── Emission plumbing ──

    /// Render `diag` against the text emitted so far and abort.
    pub fn fatal(&self, diag: Diagnostic) -> ! {
        let text = self
            .module
            .try_borrow()
            .map(|m| m.current_text().to_string())
            .unwrap_or_default();
        let diag = if diag.span.is_dummy() {
            diag.with_span(Span::last_line(&text))
        } else {
            diag
        };
        diag.fatal(&self.name, &text)
    }

    pub(crate) fn ok<T>(&self, result: Result<T, Diagnostic>) -> T {
        match result {
            Ok(value) => value,
            Err(diag) => self.fatal(diag),
        }
    }

    /// Emit `expr` in the current scope and wrap it.
    pub(crate) fn try_emit(&self, expr: ExprRef) -> Result<Var<'_>, Diagnostic> {
        {
            let mut module = self.module.borrow_mut();
            expr.emit(&mut module)?;
            if module.in_divergent_region() {
                expr.force_divergent();
            }
        }
        self.roots.borrow_mut().push(expr.clone());
        Ok(Var { kb: self, expr })
    }

    pub(crate) fn emit(&self, expr: ExprRef) -> Var<'_> {
        let result = self.try_emit(expr);
        self.ok(result)
    }

    /// A kernel-unique name such as `m_if_3`.
    pub(crate) fn fresh_name(&self, prefix: &str) -> String {
        let n = self.labels.get();
        self.labels.set(n + 1);
        format!("{}_{}", prefix, n)
    }

    pub(crate) fn write(&self, text: &str) {
        self.module.borrow_mut().write(text);
    }

    pub(crate) fn with_module<T>(&self, f: impl FnOnce(&mut Module) -> Result<T, Diagnostic>) -> T {
        let result = f(&mut self.module.borrow_mut());
        self.ok(result)
    }

    pub(crate) fn enter_scope(&self, cond: Option<&Var<'_>>) {
        self.module
            .borrow_mut()
            .enter_scope(cond.map(|c| c.expr.clone()));
    }

    pub(crate) fn exit_scope(&self) {
        self.with_module(|m| m.exit_scope());
    }

    // ── Intrinsics ──

    /// Prototype of a built-in intrinsic from this kernel's table.
    pub fn builtin(&self, b: Builtin) -> Arc<FnPrototype> {
        let name = b.name();
        if let Some(proto) = self.intrinsics.borrow().get(&name) {
            if matches!(&proto.rule, Rule::Builtin(existing) if *existing == b) {
                return proto;
            }
        }
        self.intrinsics
            .borrow_mut()
            .register(FnPrototype::builtin(b))
    }

    /// Look up any callable registered with this kernel.
    pub fn intrinsic(&self, name: &str) -> Option<Arc<FnPrototype>> {
        self.intrinsics.borrow().get(name)
    }

    pub fn register(&self, proto: FnPrototype) -> Arc<FnPrototype> {
        self.intrinsics.borrow_mut().register(proto)
    }

    pub fn try_call<'k>(
        &'k self,
        proto: &Arc<FnPrototype>,
        args: &[&Var<'k>],
    ) -> Result<Var<'k>, Diagnostic> {
        let args = args.iter().map(|a| a.expr.clone()).collect();
        self.try_emit(Expr::call(proto.clone(), args))
    }

    pub fn call<'k>(&'k self, proto: &Arc<FnPrototype>, args: &[&Var<'k>]) -> Var<'k> {
        let result = self.try_call(proto, args);
        self.ok(result)
    }

    /// Call a registered callable by name.
    pub fn call_named<'k>(&'k self, name: &str, args: &[&Var<'k>]) -> Var<'k> {
        match self.intrinsic(name) {
            Some(proto) => self.call(&proto, args),
            None => self.fatal(Diagnostic::error(
                format!("unknown function `{}`", name),
                Span::dummy(),
            )),
        }
    }

    pub(crate) fn call_builtin<'k>(&'k self, b: Builtin, args: Vec<ExprRef>) -> Var<'k> {
        let proto = self.builtin(b);
        self.emit(Expr::call(proto, args))
    }

    // ── Values ──

    /// A literal constant. Its text is used inline wherever it appears.
    pub fn lit(&self, value: impl Into<Literal>) -> Var<'_> {
        let expr = self.ok(Expr::literal(value.into()));
        self.emit(expr)
    }

    /// A fresh variable initialised from `value`.
    pub fn var<'k>(&'k self, value: impl Operand<'k>) -> Var<'k> {
        let expr = value.into_expr(self);
        self.emit(Expr::op(crate::expr::Op::Assign, None, expr))
    }

    /// The all-zero literal of a scalar or vector type.
    pub fn zero(&self, ty: &Ty) -> Var<'_> {
        let value = self.ok(Literal::zero(ty));
        self.lit(value)
    }

    /// A zero-initialised variable of any value or struct type.
    pub fn make(&self, ty: &Ty) -> Var<'_> {
        self.emit(Expr::zeroed(ty.clone()))
    }

    pub fn input(&self, input: Input) -> Var<'_> {
        self.emit(Expr::input(input))
    }

    pub fn thread_id(&self) -> Var<'_> {
        self.input(Input::DispatchThreadId)
    }

    pub fn group_id(&self) -> Var<'_> {
        self.input(Input::GroupId)
    }

    pub fn group_thread_id(&self) -> Var<'_> {
        self.input(Input::GroupThreadId)
    }

    /// A named per-lane value supplied by surrounding code.
    pub fn custom_input(&self, name: &str, ty: &Ty) -> Var<'_> {
        self.input(Input::Custom {
            name: name.to_string(),
            ty: ty.clone(),
        })
    }

    pub fn resource(&self, res: &Arc<Resource>) -> Var<'_> {
        self.emit(Expr::resource(res.clone()))
    }

    pub fn lane_index(&self) -> Var<'_> {
        self.call_builtin(Builtin::LaneIndex, Vec::new())
    }

    pub fn lane_bit(&self) -> Var<'_> {
        self.call_builtin(Builtin::LaneBit, Vec::new())
    }

    /// Whether any opaque geometry intersects `ray`.
    pub fn ray_test<'k>(&'k self, tlas: &Var<'k>, ray: &Var<'k>) -> Var<'k> {
        self.call_builtin(Builtin::RayTest, vec![tlas.expr.clone(), ray.expr.clone()])
    }

    /// Closest opaque hit along `ray`.
    pub fn ray_query<'k>(&'k self, tlas: &Var<'k>, ray: &Var<'k>) -> Var<'k> {
        self.call_builtin(Builtin::RayQuery, vec![tlas.expr.clone(), ray.expr.clone()])
    }

    /// Vector constructor, e.g. `f32x3(xy, z)`.
    pub fn construct<'k>(&'k self, ty: &Ty, args: &[&Var<'k>]) -> Var<'k> {
        let args = args.iter().map(|a| a.expr.clone()).collect();
        self.call_builtin(Builtin::Construct(ty.clone()), args)
    }

    /// Barycentric interpolation of three vertex attributes.
    pub fn interpolate<'k>(&'k self, a: &Var<'k>, b: &Var<'k>, c: &Var<'k>, bary: &Var<'k>) -> Var<'k> {
        let args = [a, b, c, bary].iter().map(|v| v.expr.clone()).collect();
        self.call_builtin(Builtin::Interpolate, args)
    }

    /// `cond ? then : otherwise`, emitted as an if/else that assigns one
    /// variable.
    pub fn select<'k>(
        &'k self,
        cond: &Var<'k>,
        then: impl Operand<'k>,
        otherwise: impl Operand<'k>,
    ) -> Var<'k> {
        let then = then.into_expr(self);
        let otherwise = otherwise.into_expr(self);
        self.emit(Expr::select(cond.expr.clone(), then, otherwise))
    }

    /// Group-shared storage: `count` elements of `ty` (a plain `ty` when
    /// `count` is 1).
    pub fn allocate_lds(&self, name: &str, ty: &Ty, count: u32) -> Var<'_> {
        let ty = if count > 1 {
            Ty::array(ty.clone(), ArrayLen::Fixed(count))
        } else {
            ty.clone()
        };
        self.with_module(|m| m.add_lds(name, &ty));
        self.emit(Expr::reference(name, ty))
    }

    /// Local array initialised from literals.
    pub fn static_array(&self, values: Vec<Literal>) -> Var<'_> {
        let elem = match values.first() {
            Some(first) => self.ok(first.ty()),
            None => self.fatal(Diagnostic::error(
                "static array needs at least one value".to_string(),
                Span::dummy(),
            )),
        };
        let len = values.len() as u32;
        let expr = self.ok(Expr::array(elem, len, values));
        self.emit(expr)
    }

    /// Uninitialised local array.
    pub fn declare_array(&self, elem: &Ty, len: u32) -> Var<'_> {
        let expr = self.ok(Expr::array(elem.clone(), len, Vec::new()));
        self.emit(expr)
    }

    /// Whether code emitted now runs under a per-lane condition.
    pub fn in_divergent_region(&self) -> bool {
        self.module.borrow().in_divergent_region()
    }

    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.module.borrow().warnings()
    }
}

impl<'k> Var<'k> {
    pub fn expr(&self) -> &ExprRef {
        &self.expr
    }

    pub fn builder(&self) -> &'k KernelBuilder {
        self.kb
    }

    /// Current display name in emitted text.
    pub fn name(&self) -> String {
        self.expr.name()
    }

    pub fn ty(&self) -> Ty {
        self.kb.ok(self.expr.infer_type())
    }

    pub fn divergence(&self) -> Divergence {
        self.expr.divergence()
    }

    pub fn is_uniform(&self) -> bool {
        self.expr.is_uniform()
    }
}
