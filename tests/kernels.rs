use sjit::cache::KernelCache;
use sjit::kernels;
use sjit::types::ArrayLen;
use sjit::{KernelBuilder, KernelConfig, Resource, Ty};

/// Helper: write a kernel config next to a temp dir and load it.
fn load_config(source: &str) -> KernelConfig {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("kernel.toml");
    std::fs::write(&path, source).expect("write config");
    KernelConfig::load(&path).unwrap_or_else(|diag| panic!("config should load: {}", diag))
}

// ── configuration ──

#[test]
fn test_config_file_drives_builder() {
    let config = load_config(
        "[kernel]\nname = \"tiled\"\ngroup_size = [32, 2, 1]\nwave32 = true\nbindless_space_base = 40\n",
    );
    let kb = KernelBuilder::with_config(&config).unwrap();
    assert!(kb.is_wave32());
    let tex = Resource::texture_2d("t", Ty::f32x4());
    let textures = kb.resource(&Resource::array("g_textures", tex, ArrayLen::Unbounded));
    let out = kb.resource(&Resource::rw_texture_2d("g_out", Ty::f32x4()));
    let pixel = kb.thread_id().xy();
    let slot = kb.group_id().x().non_uniform();
    out.write(&pixel, &textures.index(&slot).read(&pixel));
    let kernel = kb.finish().unwrap();

    assert_eq!(kernel.name, "tiled");
    assert!(kernel.text.contains("[numthreads(32, 2, 1)]"));
    assert!(kernel.text.contains("g_textures[] : register(space40);\n"));
    assert!(kernel.text.contains("NonUniformResourceIndex("));
    let entry = kernel.manifest.get("g_textures").unwrap();
    assert_eq!(entry.space, Some(40));
    assert_eq!(entry.array, Some(ArrayLen::Unbounded));
}

#[test]
fn test_invalid_group_size_rejected() {
    let mut config = KernelConfig::named("bad");
    config.group_size = [3, 3, 1];
    let err = KernelBuilder::with_config(&config).err().unwrap();
    assert!(err.message.contains("group size"), "{}", err.message);
}

#[test]
fn test_resources_left_to_host() {
    let mut config = KernelConfig::named("stab");
    config.emit_resources = false;
    let kb = KernelBuilder::with_config(&config).unwrap();
    let out = kb.resource(&Resource::rw_buffer("g_out", Ty::u32()));
    let i = kb.thread_id().x();
    out.write(&i, &i);
    let kernel = kb.finish().unwrap();
    assert!(kernel.text.contains("RESOURCE_STAB"));
    assert!(!kernel.text.contains("RWStructuredBuffer<u32> g_out"));
}

// ── built-in kernels ──

#[test]
fn test_catalog_into_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = KernelCache::new(dir.path());
    for def in kernels::catalog() {
        let kernel = def.build_default().unwrap();
        let path = cache.store(&kernel).unwrap();
        assert!(path.exists());
        let cached = cache.lookup(&kernel.cache_key()).unwrap();
        assert_eq!(cached.text, kernel.text);
        assert_eq!(cached.manifest_json.unwrap(), kernel.manifest.to_json());
    }
}

#[test]
fn test_kernel_graphs_order_operands_first() {
    for def in kernels::catalog() {
        let kernel = def.build_default().unwrap();
        let order = kernel.graph.evaluation_order();
        assert_eq!(order.len(), kernel.graph.node_count(), "{}", def.name);
    }
}
