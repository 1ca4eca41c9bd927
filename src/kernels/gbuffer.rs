use crate::builder::{Kernel, KernelBuilder};
use crate::config::KernelConfig;
use crate::diagnostic::Diagnostic;
use crate::resource::Resource;
use crate::types::Ty;

/// Material ids with their own packing.
const OPAQUE: u32 = 0;
const EMISSIVE: u32 = 1;

pub(super) fn build(config: &KernelConfig) -> Result<Kernel, Diagnostic> {
    let kb = KernelBuilder::with_config(config)?;
    let normals = kb.resource(&Resource::texture_2d("g_normal", Ty::f32x4()));
    let materials = kb.resource(&Resource::texture_2d("g_material", Ty::u32()));
    let emission = kb.resource(&Resource::texture_2d("g_emission", Ty::f32x4()));
    let packed = kb.resource(&Resource::rw_texture_2d("g_packed", Ty::u32x2()));

    let pixel = kb.thread_id().xy();
    let n = normals.read(&pixel).xyz().normalize();
    let material = materials.read(&pixel);
    let out = kb.zero(&Ty::u32x2()).copy();
    out.set("x", kb.encode_octahedral_16(&n));

    kb.switch_case(&material, &[OPAQUE, EMISSIVE], |id| {
        if id == EMISSIVE {
            let rgb = emission.read(&pixel).xyz();
            let scale = kb.luminance(&rgb);
            let half = kb.construct(&Ty::f32x2(), &[&rgb.x(), &scale]).to_f16();
            out.set("y", kb.pack_f16x2(&half));
        } else {
            out.set("y", 0u32);
        }
    });
    packed.write(&pixel, &out);
    kb.finish()
}
