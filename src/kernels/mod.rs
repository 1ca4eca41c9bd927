//! Built-in kernels, usable from the CLI and as facade usage samples.

mod ao;
mod denoise;
mod gbuffer;
mod probes;

use crate::builder::Kernel;
use crate::config::KernelConfig;
use crate::diagnostic::Diagnostic;

/// A named kernel generator.
#[derive(Clone, Copy)]
pub struct KernelDef {
    pub name: &'static str,
    pub description: &'static str,
    build: fn(&KernelConfig) -> Result<Kernel, Diagnostic>,
}

impl KernelDef {
    /// Generate with `config`; the kernel takes the definition's name
    /// unless the config names it.
    pub fn build(&self, config: &KernelConfig) -> Result<Kernel, Diagnostic> {
        let mut config = config.clone();
        if config.name == KernelConfig::default_compute().name {
            config.name = self.name.to_string();
        }
        (self.build)(&config)
    }

    pub fn build_default(&self) -> Result<Kernel, Diagnostic> {
        self.build(&KernelConfig::named(self.name))
    }
}

impl std::fmt::Debug for KernelDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KernelDef({})", self.name)
    }
}

pub fn catalog() -> Vec<KernelDef> {
    vec![
        KernelDef {
            name: "denoise",
            description: "3x3 depth-aware blur of a color target",
            build: denoise::build,
        },
        KernelDef {
            name: "ao",
            description: "ray-traced ambient occlusion, wave32 lowering",
            build: ao::build,
        },
        KernelDef {
            name: "probe_update",
            description: "per-probe radiance average through group-shared memory",
            build: probes::build,
        },
        KernelDef {
            name: "gbuffer_pack",
            description: "octahedral normal and half-precision packing by material",
            build: gbuffer::build,
        },
    ]
}

pub fn find(name: &str) -> Option<KernelDef> {
    catalog().into_iter().find(|def| def.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_unique() {
        let defs = catalog();
        for (i, a) in defs.iter().enumerate() {
            for b in &defs[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
        assert!(find("denoise").is_some());
        assert!(find("nope").is_none());
    }

    #[test]
    fn test_every_kernel_builds() {
        for def in catalog() {
            let kernel = def.build_default().unwrap();
            assert_eq!(kernel.name, def.name);
            assert!(kernel.text.contains("void main("), "{}", def.name);
            assert!(!kernel.manifest.entries.is_empty(), "{}", def.name);
            assert!(kernel.warnings.is_empty(), "{}: {:?}", def.name, kernel.warnings);
            assert!(kernel.graph.is_acyclic());
        }
    }

    #[test]
    fn test_kernels_are_deterministic() {
        for def in catalog() {
            let a = def.build_default().unwrap();
            let b = def.build_default().unwrap();
            assert_eq!(a.manifest.to_json(), b.manifest.to_json());
            assert_eq!(a.text.lines().count(), b.text.lines().count());
        }
    }

    #[test]
    fn test_ao_uses_wave_masks() {
        let kernel = find("ao").unwrap().build_default().unwrap();
        // Only the outer normal test is masked; the hit count is per lane.
        assert_eq!(kernel.text.matches("WaveActiveBallot(").count(), 2);
        assert!(kernel.text.contains("} else if (m_else_"));
        assert!(kernel.text.contains("__anyhit(g_tlas, "));
        assert!(kernel.text.contains("RaytracingAccelerationStructure g_tlas;\n"));
    }

    #[test]
    fn test_probe_update_uses_lds() {
        let kernel = find("probe_update").unwrap().build_default().unwrap();
        assert_eq!(kernel.manifest.group_size, [64, 1, 1]);
        assert!(kernel.text.contains("[numthreads(64, 1, 1)]"));
        assert!(kernel.text.contains("groupshared f32x4 lds_radiance[64];\n"));
        assert!(kernel.text.contains("GroupMemoryBarrierWithGroupSync();\n"));
        assert!(kernel.text.contains("u32 g_num_rays;\n"));
    }

    #[test]
    fn test_config_overrides_name_and_group() {
        let mut config = KernelConfig::named("custom_blur");
        config.group_size = [16, 16, 1];
        let kernel = find("denoise").unwrap().build(&config).unwrap();
        assert_eq!(kernel.name, "custom_blur");
        assert!(kernel.text.contains("[numthreads(16, 16, 1)]"));
    }
}
