use crate::builder::{Kernel, KernelBuilder};
use crate::config::KernelConfig;
use crate::diagnostic::Diagnostic;
use crate::resource::Resource;
use crate::types::Ty;

const GROUP: u32 = 64;

pub(super) fn build(config: &KernelConfig) -> Result<Kernel, Diagnostic> {
    let mut config = config.clone();
    config.group_size = [GROUP, 1, 1];
    let kb = KernelBuilder::with_config(&config)?;
    let offsets = kb.resource(&Resource::buffer("g_probe_offsets", Ty::u32()));
    let radiance = kb.resource(&Resource::buffer("g_radiance", Ty::f32x4()));
    let probes = kb.resource(&Resource::rw_buffer("g_probes", Ty::f32x4()));
    let num_rays = kb.resource(&Resource::constant("g_num_rays", Ty::u32()));

    let ray = kb.thread_id().x();
    let lane = kb.group_thread_id().x();
    let probe = kb.binary_search(&offsets, &num_rays, &ray);

    let shared = kb.allocate_lds("lds_radiance", &Ty::f32x4(), GROUP);
    shared.store(&lane, radiance.read(&ray));
    kb.group_sync();

    kb.if_then(&lane.equals(0u32), || {
        let mut total = kb.zero(&Ty::f32x4()).copy();
        kb.for_range(0u32, GROUP - 1, |i| {
            total += shared.load(i);
        });
        probes.write(&probe, &(&total / GROUP as f32));
    });
    kb.finish()
}
