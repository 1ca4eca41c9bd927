use std::f32::consts::TAU;

use crate::builder::{Kernel, KernelBuilder};
use crate::config::KernelConfig;
use crate::diagnostic::Diagnostic;
use crate::resource::Resource;
use crate::types::Ty;

const RAYS: u32 = 8;
const RADIUS: f32 = 1.0;

pub(super) fn build(config: &KernelConfig) -> Result<Kernel, Diagnostic> {
    let mut config = config.clone();
    config.wave32 = true;
    let kb = KernelBuilder::with_config(&config)?;
    let positions = kb.resource(&Resource::texture_2d("g_position", Ty::f32x4()));
    let normals = kb.resource(&Resource::texture_2d("g_normal", Ty::f32x4()));
    let tlas = kb.resource(&Resource::tlas("g_tlas"));
    let output = kb.resource(&Resource::rw_texture_2d("g_ao", Ty::f32()));

    let pixel = kb.thread_id().xy();
    let raw = normals.read(&pixel).xyz();
    // Masked branch: every store below is guarded by the lane's own bit.
    kb.if_else(
        &raw.length().gt(0.0f32),
        || {
            let origin = positions.read(&pixel).xyz();
            let n = raw.normalize();
            let frame = n.tbn();
            let mut hits = kb.zero(&Ty::u32()).copy();

            kb.for_range(0u32, RAYS - 1, |i| {
                let angle = i.to_f32() * (TAU / RAYS as f32);
                let local = kb.construct(
                    &Ty::f32x3(),
                    &[&(angle.cos() * 0.5f32), &(angle.sin() * 0.5f32), &kb.lit(0.707f32)],
                );
                let ray = kb.make(&Ty::ray_desc());
                ray.set("Origin", &origin + &n * 1.0e-3f32);
                ray.set("TMin", 0.0f32);
                ray.set("Direction", frame.matmul(&local));
                ray.set("TMax", RADIUS);
                let occluded = kb.ray_test(&tlas, &ray);
                kb.lane_if_then(&occluded, || {
                    hits += 1u32;
                });
            });

            let ao = 1.0f32 - hits.to_f32() / RAYS as f32;
            kb.if_lane_active(|| output.write(&pixel, &ao));
        },
        || {
            let open = kb.lit(1.0f32);
            kb.if_lane_active(|| output.write(&pixel, &open));
        },
    );
    kb.finish()
}
