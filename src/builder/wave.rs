//! Wave32 lowering: branches over explicit 32-bit lane masks.
//!
//! Each branch computes the subset of the enclosing mask whose lanes take
//! it and is entered only when that subset is non-empty, so control flow
//! stays uniform across the wave:
//!
//! ```text
//! m_if   =  ballot(c) & cur
//! m_else = ~ballot(c) & cur      m_if & m_else == 0, m_if | m_else == cur
//! ```

use super::{KernelBuilder, Var};
use crate::types::Ty;

impl KernelBuilder {
    /// Lower branches to lane masks from here on. The outermost mask has
    /// every lane set.
    pub fn enable_wave32(&self) {
        let seed = self.lit(u32::MAX);
        self.with_module(|m| {
            m.enable_wave32(seed.expr.clone());
            Ok(())
        });
    }

    /// Mask of lanes active at this point.
    pub fn wave32_mask(&self) -> Var<'_> {
        let expr = self.with_module(|m| m.current_mask());
        Var { kb: self, expr }
    }

    fn mask_var(&self, prefix: &str) -> Var<'_> {
        self.zero(&Ty::u32()).named(&self.fresh_name(prefix))
    }

    fn masked_branch(&self, mask: &Var<'_>, body: impl FnOnce()) {
        self.with_module(|m| {
            m.push_mask(mask.expr.clone());
            Ok(())
        });
        self.scoped(Some(mask), body);
        self.with_module(|m| m.pop_mask().map(drop));
    }

    pub(crate) fn wave_if(&self, cond: &Var<'_>, then: impl FnOnce(), otherwise: Option<impl FnOnce()>) {
        let cur = self.wave32_mask();
        let m_if = self.mask_var("m_if");
        let m_else = self.mask_var("m_else");
        self.write(&format!(
            "{} = (WaveActiveBallot({}).x) & {};\n",
            m_if.name(),
            cond.name(),
            cur.name()
        ));
        self.write(&format!(
            "{} = (~WaveActiveBallot({}).x) & {};\n",
            m_else.name(),
            cond.name(),
            cur.name()
        ));
        self.write(&format!("if ({} != u32(0)) {{\n", m_if.name()));
        self.masked_branch(&m_if, then);
        if let Some(otherwise) = otherwise {
            self.write(&format!("}} else if ({} != u32(0)) {{\n", m_else.name()));
            self.masked_branch(&m_else, otherwise);
        }
        self.write("}\n");
    }

    /// Run `then` only on lanes whose bit is set in the current mask.
    pub fn if_lane_active(&self, then: impl FnOnce()) {
        let cur = self.wave32_mask();
        let bit = self.lane_bit();
        let active = (&cur & &bit).not_equals(0u32);
        self.write(&format!("if ({}) {{\n", active.name()));
        self.scoped(Some(&active), then);
        self.write("}\n");
    }

    /// Loop whose lane mask is copied once on entry.
    pub(crate) fn wave_while(&self, body: impl FnOnce()) {
        let cur = self.wave32_mask();
        let m_loop = cur.named(&self.fresh_name("m_loop"));
        self.write("while (true) {\n");
        self.with_module(|m| {
            m.push_mask(m_loop.expr.clone());
            Ok(())
        });
        self.loop_body(None, body);
        self.with_module(|m| m.pop_mask().map(drop));
        self.write("}\n");
    }
}
