//! Structured control flow and free functions.

use std::sync::Arc;

use super::{KernelBuilder, Operand, Var};
use crate::diagnostic::Diagnostic;
use crate::expr::{Expr, Op};
use crate::intrinsic::FnPrototype;
use crate::module::BreakTarget;
use crate::span::Span;
use crate::types::{BasicKind, Ty};

impl KernelBuilder {
    fn check_condition(&self, cond: &Var<'_>) {
        let ty = cond.ty();
        if ty != Ty::bool() {
            self.fatal(Diagnostic::error(
                format!("branch condition must be bool, got {}", ty),
                Span::dummy(),
            ));
        }
    }

    /// Emit `body` inside a nested scope guarded by `cond`.
    pub(crate) fn scoped(&self, cond: Option<&Var<'_>>, body: impl FnOnce()) {
        self.enter_scope(cond);
        body();
        self.exit_scope();
    }

    /// Branch on `cond`; lowered to lane masks when wave32 is on.
    pub fn if_then(&self, cond: &Var<'_>, then: impl FnOnce()) {
        self.check_condition(cond);
        if self.is_wave32() {
            self.wave_if(cond, then, None::<fn()>);
            return;
        }
        self.lane_if_then(cond, then);
    }

    pub fn if_else(&self, cond: &Var<'_>, then: impl FnOnce(), otherwise: impl FnOnce()) {
        self.check_condition(cond);
        if self.is_wave32() {
            self.wave_if(cond, then, Some(otherwise));
            return;
        }
        self.lane_if_else(cond, then, otherwise);
    }

    /// Plain per-lane `if`, whatever the wave32 setting.
    pub fn lane_if_then(&self, cond: &Var<'_>, then: impl FnOnce()) {
        self.check_condition(cond);
        self.write(&format!("if ({}) {{\n", cond.name()));
        self.scoped(Some(cond), then);
        self.write("}\n");
    }

    /// Plain per-lane `if`/`else`, whatever the wave32 setting.
    pub fn lane_if_else(&self, cond: &Var<'_>, then: impl FnOnce(), otherwise: impl FnOnce()) {
        self.check_condition(cond);
        self.write(&format!("if ({}) {{\n", cond.name()));
        self.scoped(Some(cond), then);
        self.write("} else {\n");
        self.scoped(Some(cond), otherwise);
        self.write("}\n");
    }

    /// `for (i = begin; i <= end; i++)`; the bound is inclusive.
    pub fn for_range<'k>(
        &'k self,
        begin: impl Operand<'k>,
        end: impl Operand<'k>,
        body: impl FnOnce(&Var<'k>),
    ) {
        let begin = self.emit(begin.into_expr(self));
        let end = self.emit(end.into_expr(self));
        let ty = begin.ty();
        if ty != end.ty() || !(ty.is_scalar() && ty.kind().is_some_and(BasicKind::is_integer)) {
            self.fatal(Diagnostic::error(
                format!("loop bounds must be matching integers, got {} and {}", ty, end.ty()),
                Span::dummy(),
            ));
        }
        let i = self.zero(&ty).copy();
        if !(begin.is_uniform() && end.is_uniform()) {
            i.expr.force_divergent();
        }
        self.write(&format!(
            "for ({i} = {}; {i} <= {}; {i}++) {{\n",
            begin.name(),
            end.name(),
            i = i.name()
        ));
        // The body runs while `i <= end`; a per-lane bound makes it divergent.
        let running = Var {
            kb: self,
            expr: Expr::op(Op::Le, Some(i.expr.clone()), end.expr.clone()),
        };
        self.loop_body(Some(&running), || body(&i));
        self.write("}\n");
    }

    /// `while (true)`; the body leaves with [`KernelBuilder::break_loop`].
    pub fn while_loop(&self, body: impl FnOnce()) {
        if self.is_wave32() {
            self.wave_while(body);
            return;
        }
        self.lane_while_loop(body);
    }

    /// Plain `while (true)` whose breaks are taken per lane, whatever the
    /// wave32 setting.
    pub fn lane_while_loop(&self, body: impl FnOnce()) {
        self.write("while (true) {\n");
        self.loop_body(None, body);
        self.write("}\n");
    }

    pub(crate) fn loop_body(&self, cond: Option<&Var<'_>>, body: impl FnOnce()) {
        self.with_module(|m| {
            m.push_break_target(BreakTarget::Loop);
            Ok(())
        });
        self.scoped(cond, body);
        self.with_module(|m| m.pop_break_target().map(drop));
    }

    /// `switch (value)` with one block per label, built by `body(label)`;
    /// each case ends in `break`.
    pub fn switch_case(&self, value: &Var<'_>, labels: &[u32], mut body: impl FnMut(u32)) {
        let ty = value.ty();
        if !(ty.is_scalar() && ty.kind().is_some_and(BasicKind::is_integer)) {
            self.fatal(Diagnostic::error(
                format!("switch value must be an integer scalar, got {}", ty),
                Span::dummy(),
            ));
        }
        self.write(&format!("switch ({}) {{\n", value.name()));
        self.with_module(|m| {
            m.push_break_target(BreakTarget::Switch);
            Ok(())
        });
        for &label in labels {
            self.write(&format!("case {}: {{\n", label));
            self.scoped(Some(value), || body(label));
            self.write("break; }\n");
        }
        self.with_module(|m| m.pop_break_target().map(drop));
        self.write("}\n");
    }

    pub fn break_loop(&self) {
        self.with_module(|m| m.check_break("break"));
        self.write("break;\n");
    }

    pub fn continue_loop(&self) {
        self.with_module(|m| m.check_continue());
        self.write("continue;\n");
    }

    pub fn return_void(&self) {
        self.write("return;\n");
    }

    pub fn return_value(&self, value: &Var<'_>) {
        self.write(&format!("return {};\n", value.name()));
    }

    /// Group-wide memory barrier.
    pub fn group_sync(&self) {
        self.write("GroupMemoryBarrierWithGroupSync();\n");
        self.with_module(|m| {
            m.note_group_sync();
            Ok(())
        });
    }

    /// Emit a free function whose body is built by `body` from its
    /// parameters, and make it callable by name.
    ///
    /// The body returns the value to `return`, or `None` for a `void`
    /// function.
    pub fn define_function<'k>(
        &'k self,
        proto: FnPrototype,
        body: impl FnOnce(&[Var<'k>]) -> Option<Var<'k>>,
    ) -> Arc<FnPrototype> {
        let header = self.ok(proto.definition());
        let ret = proto.fixed_return().cloned().unwrap_or_else(Ty::void);
        self.with_module(|m| {
            m.enter_function();
            m.write(&format!("{}\n{{\n", header));
            Ok(())
        });
        let params: Vec<Var<'k>> = proto
            .params
            .iter()
            .map(|p| self.emit(Expr::reference(&p.name, p.ty.clone())))
            .collect();
        match body(&params) {
            Some(value) if value.ty() == ret => self.return_value(&value),
            Some(value) => self.fatal(Diagnostic::error(
                format!("`{}` returns {}, body produced {}", proto.name, ret, value.ty()),
                Span::dummy(),
            )),
            None if ret.is_void() => {}
            None => self.fatal(Diagnostic::error(
                format!("`{}` must return {}", proto.name, ret),
                Span::dummy(),
            )),
        }
        self.with_module(|m| {
            m.write("}\n");
            m.exit_function()
        });
        self.register(proto)
    }
}
