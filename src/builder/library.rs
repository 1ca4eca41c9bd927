//! Reusable shader snippets built from the facade.

use super::{KernelBuilder, Var};
use crate::types::Ty;

impl KernelBuilder {
    /// Index of the last element of a sorted `buffer[0..count]` that is not
    /// greater than `key` (0 when none is). Each lane searches on its own,
    /// also under wave32.
    pub fn binary_search<'k>(&'k self, buffer: &Var<'k>, count: &Var<'k>, key: &Var<'k>) -> Var<'k> {
        let lo = self.zero(&Ty::u32()).copy();
        let hi = count.copy();
        self.lane_while_loop(|| {
            let span = hi.to_i32() - lo.to_i32();
            self.lane_if_then(&span.le(1i32), || self.break_loop());
            let mid = (&lo + &hi) / 2u32;
            self.lane_if_else(
                &buffer.read(&mid).gt(key),
                || {
                    hi.assign(&mid);
                },
                || {
                    lo.assign(&mid);
                },
            );
        });
        lo
    }

    /// Two halves packed into one `u32`, `x` in the low bits.
    pub fn pack_f16x2<'k>(&'k self, v: &Var<'k>) -> Var<'k> {
        let x = v.x().f16_to_u32();
        let y = v.y().f16_to_u32();
        x | (y << 16u32)
    }

    pub fn unpack_f16x2<'k>(&'k self, v: &Var<'k>) -> Var<'k> {
        let x = (v & 0xffffu32).u32_to_f16();
        let y = ((v >> 16u32) & 0xffffu32).u32_to_f16();
        let out = self.make(&Ty::f16x2());
        out.x().assign(&x);
        out.y().assign(&y);
        out
    }

    /// Perceptual brightness of a linear color, clamped away from zero.
    pub fn luminance<'k>(&'k self, rgb: &Var<'k>) -> Var<'k> {
        let weights = self.lit([0.299f32, 0.587, 0.114]);
        rgb.dot(&weights).max(1.0e-3f32)
    }

    /// `1` where non-negative, `-1` elsewhere, per component of an
    /// `f32x2`.
    fn sign_not_zero<'k>(&'k self, v: &Var<'k>) -> Var<'k> {
        let one = |c: Var<'k>| self.select(&c.ge(0.0f32), 1.0f32, -1.0f32);
        self.construct(&Ty::f32x2(), &[&one(v.x()), &one(v.y())])
    }

    /// Unit normal to `[0, 1]^2` on the octahedron.
    pub fn encode_octahedral<'k>(&'k self, n: &Var<'k>) -> Var<'k> {
        let l1 = n.x().abs() + n.y().abs() + n.z().abs();
        let p = n.xy() / &l1;
        let folded = (self.lit([1.0f32, 1.0]) - p.yx().abs()) * self.sign_not_zero(&p);
        let xy = self.select(&n.z().ge(0.0f32), &p, &folded);
        xy * 0.5f32 + [0.5f32, 0.5]
    }

    pub fn decode_octahedral<'k>(&'k self, e: &Var<'k>) -> Var<'k> {
        let f = e * 2.0f32 - [1.0f32, 1.0];
        let z = 1.0f32 - f.x().abs() - f.y().abs();
        let t = (-&z).saturate();
        let xy = &f + self.sign_not_zero(&f) * -&t;
        self.construct(&Ty::f32x3(), &[&xy, &z]).normalize()
    }

    /// Octahedral normal quantized to 8 bits per axis.
    pub fn encode_octahedral_16<'k>(&'k self, n: &Var<'k>) -> Var<'k> {
        let e = self.encode_octahedral(n);
        let ux = (e.x().saturate() * 255.0f32).to_u32();
        let uy = (e.y().saturate() * 255.0f32).to_u32();
        ux | (uy << 8u32)
    }

    pub fn decode_octahedral_16<'k>(&'k self, packed: &Var<'k>) -> Var<'k> {
        let ux = packed & 0xffu32;
        let uy = (packed >> 8u32) & 0xffu32;
        let x = ux.to_f32() / 255.0f32;
        let y = uy.to_f32() / 255.0f32;
        let e = self.construct(&Ty::f32x2(), &[&x, &y]);
        self.decode_octahedral(&e)
    }

    /// Closest hit along `ray`, letting `accept` decide for every
    /// non-opaque candidate whether it blocks the ray.
    ///
    /// `accept` receives the candidate hit and returns a bool.
    pub fn ray_query_transparent<'k>(
        &'k self,
        tlas: &Var<'k>,
        ray: &Var<'k>,
        accept: impl FnOnce(&Var<'k>) -> Var<'k>,
    ) -> Var<'k> {
        let result = self.make(&Ty::ray_query_result());
        let q = self.fresh_name("rq");
        self.write(&format!("RayQuery<RAY_FLAG_NONE> {};\n", q));
        self.write(&format!(
            "{}.TraceRayInline({}, RAY_FLAG_NONE, 0xffu, {});\n",
            q,
            tlas.name(),
            ray.name()
        ));
        self.write(&format!("while ({}.Proceed()) {{\n", q));
        self.scoped(None, || {
            self.write(&format!(
                "if ({}.CandidateType() == CANDIDATE_NON_OPAQUE_TRIANGLE) {{\n",
                q
            ));
            self.scoped(None, || {
                let candidate = self.make(&Ty::ray_query_result());
                self.write_hit(&candidate, &q, "Candidate", "CandidateTriangleRayT");
                let blocks = accept(&candidate);
                self.write(&format!(
                    "if ({}) {{ {}.CommitNonOpaqueTriangleHit(); }}\n",
                    blocks.name(),
                    q
                ));
            });
            self.write("}\n");
        });
        self.write("}\n");
        self.write(&format!(
            "if ({}.CommittedStatus() != COMMITTED_NOTHING) {{\n",
            q
        ));
        self.write_hit(&result, &q, "Committed", "CommittedRayT");
        self.write("}\n");
        result
    }

    fn write_hit(&self, hit: &Var<'_>, query: &str, prefix: &str, ray_t: &str) {
        let h = hit.name();
        self.write(&format!("{}.hit = true;\n", h));
        self.write(&format!("{}.bary = {}.{}TriangleBarycentrics();\n", h, query, prefix));
        self.write(&format!("{}.ray_t = {}.{}();\n", h, query, ray_t));
        self.write(&format!("{}.instance_id = {}.{}InstanceID();\n", h, query, prefix));
        self.write(&format!("{}.primitive_idx = {}.{}PrimitiveIndex();\n", h, query, prefix));
    }
}
