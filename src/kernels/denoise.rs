use crate::builder::{Kernel, KernelBuilder};
use crate::config::KernelConfig;
use crate::diagnostic::Diagnostic;
use crate::resource::Resource;
use crate::types::Ty;

/// Depth falloff of the blur weights.
const DEPTH_SHARPNESS: f32 = 8.0;

pub(super) fn build(config: &KernelConfig) -> Result<Kernel, Diagnostic> {
    let kb = KernelBuilder::with_config(config)?;
    let color = kb.resource(&Resource::texture_2d("g_color", Ty::f32x4()));
    let depth = kb.resource(&Resource::texture_2d("g_depth", Ty::f32()));
    let output = kb.resource(&Resource::rw_texture_2d("g_output", Ty::f32x4()));

    let pixel = kb.thread_id().xy();
    let dims = output.dimensions();
    kb.if_then(&pixel.ge(&dims).any(), || kb.return_void());

    let center = depth.read(&pixel);
    let last = dims.to_i32() - [1i32, 1];
    let mut sum = kb.zero(&Ty::f32x4()).copy();
    let mut weight = kb.zero(&Ty::f32()).copy();
    kb.for_range(-1i32, 1i32, |dy| {
        kb.for_range(-1i32, 1i32, |dx| {
            let offset = kb.construct(&Ty::i32x2(), &[dx, dy]);
            let tap = (pixel.to_i32() + offset).clamp([0i32, 0], &last).to_u32();
            let w = (-(depth.read(&tap) - &center).abs() * DEPTH_SHARPNESS).exp();
            sum += color.read(&tap) * &w;
            weight += &w;
        });
    });
    output.write(&pixel, &(&sum / &weight));
    kb.finish()
}
