use super::*;
use crate::types::BasicKind;

/// Rename `tmp_<id>` to `tmp_0`, `tmp_1`, ... in order of appearance;
/// node ids are shared by every kernel built in the process.
fn normalize(text: &str) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut out = String::new();
    let mut rest = text;
    while let Some(pos) = rest.find("tmp_") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 4..];
        let digits = after.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            out.push_str("tmp_");
            rest = after;
            continue;
        }
        let id = after[..digits].to_string();
        let n = match seen.iter().position(|s| *s == id) {
            Some(n) => n,
            None => {
                seen.push(id);
                seen.len() - 1
            }
        };
        out.push_str(&format!("tmp_{}", n));
        rest = &after[digits..];
    }
    out.push_str(rest);
    out
}

fn count(text: &str, needle: &str) -> usize {
    text.matches(needle).count()
}

#[test]
fn test_emit_read_scale_write() {
    let kb = KernelBuilder::new("scale");
    let out = kb.resource(&Resource::rw_buffer("g_out", Ty::f32()));
    let i = kb.thread_id().x();
    let v = out.read(&i) * 2.0f32;
    out.write(&i, &v);
    insta::assert_snapshot!(normalize(&kb.text()), @r"
    f32 tmp_0 = g_out[__tid.x];
    f32 tmp_1 = tmp_0*f32(2.000000);
    g_out[__tid.x] = tmp_1;
    ");
}

#[test]
fn test_operators_and_scalar_lhs() {
    let kb = KernelBuilder::new("ops");
    let a = kb.lit([1.0f32, 2.0, 3.0]).copy();
    let b = 2.0f32 * &a;
    assert_eq!(b.ty(), Ty::f32x3());
    let c = -&b;
    assert!(kb.text().contains(&format!("f32x3 {} = -{};\n", c.name(), b.name())));

    let u = kb.lit(6u32).copy();
    let masked = (&u & 3u32) | (&u << 1u32);
    assert_eq!(masked.ty(), Ty::u32());
    let flipped = !&u;
    assert!(kb.text().contains(&format!("u32 {} = ~{};\n", flipped.name(), u.name())));

    let t = kb.lit(true).copy();
    let n = !t.clone();
    assert!(kb.text().contains(&format!("bool {} = !{};\n", n.name(), t.name())));
}

#[test]
fn test_compound_assign_writes_in_place() {
    let kb = KernelBuilder::new("acc");
    let mut acc = kb.zero(&Ty::f32()).copy();
    acc += 1.5f32;
    acc *= 2.0f32;
    let text = kb.text();
    assert!(text.contains(&format!("{} += f32(1.500000);\n", acc.name())));
    assert!(text.contains(&format!("{} *= f32(2.000000);\n", acc.name())));
}

#[test]
fn test_divergence_through_if_else() {
    let kb = KernelBuilder::new("div");
    let uniform = kb.lit(1.0f32).copy();
    assert!(uniform.is_uniform());

    let lane = kb.thread_id().x();
    assert!(!lane.is_uniform());
    let cond = lane.lt(16u32);
    assert!(!cond.is_uniform());

    let result = kb.zero(&Ty::f32()).copy();
    assert!(result.is_uniform());
    kb.if_else(
        &cond,
        || {
            assert!(kb.in_divergent_region());
            result.assign(1.0f32);
        },
        || {
            result.assign(2.0f32);
        },
    );
    assert!(!kb.in_divergent_region());
    assert_eq!(result.divergence(), Divergence::Divergent);
    assert!(uniform.is_uniform());
}

#[test]
fn test_divergence_through_per_lane_loop_bound() {
    let kb = KernelBuilder::new("div_loop");
    let n = kb.thread_id().x();
    let mut acc = kb.zero(&Ty::f32()).copy();
    let mut inside = false;
    kb.for_range(0u32, &n, |_| {
        inside = kb.in_divergent_region();
        acc += 1.0f32;
    });
    assert!(inside);
    assert!(!kb.in_divergent_region());
    assert_eq!(acc.divergence(), Divergence::Divergent);

    let mut total = kb.zero(&Ty::f32()).copy();
    kb.for_range(0u32, 3u32, |_| {
        assert!(!kb.in_divergent_region());
        total += 1.0f32;
    });
    assert!(total.is_uniform());
}

#[test]
fn test_uniform_branch_is_not_divergent_region() {
    let kb = KernelBuilder::new("uni");
    let flag = kb.lit(true).copy();
    kb.if_then(&flag, || {
        assert!(!kb.in_divergent_region());
    });
}

#[test]
fn test_memoized_in_same_and_outer_scope() {
    let kb = KernelBuilder::new("memo");
    let a = kb.lit(2.0f32).copy();
    let b = &a * &a;
    let decl = format!("f32 {} = ", b.name());
    let cond = kb.lit(true).copy();
    kb.if_then(&cond, || {
        let again = kb.emit(b.expr().clone());
        assert_eq!(again.name(), b.name());
    });
    kb.emit(b.expr().clone());
    assert_eq!(count(&kb.text(), &decl), 1);
}

#[test]
fn test_inner_scope_value_reemitted_after_branch() {
    let kb = KernelBuilder::new("memo");
    let a = kb.lit(2.0f32).copy();
    let cond = kb.lit(true).copy();
    let mut inner = None;
    kb.if_then(&cond, || {
        inner = Some(&a + 1.0f32);
    });
    let inner = inner.unwrap();
    kb.emit(inner.expr().clone());
    assert_eq!(count(&kb.text(), &format!("f32 {} = ", inner.name())), 2);
}

#[test]
fn test_swizzles() {
    let kb = KernelBuilder::new("swz");
    let v = kb.lit([1.0f32, 2.0]).copy();
    assert_eq!(v.xy().ty(), Ty::f32x2());
    assert_eq!(v.yx().name(), format!("{}.yx", v.name()));
    assert!(v.try_swizzle("xw").is_err());
    assert!(v.try_swizzle("xyzwx").is_err());
    assert!(v.try_swizzle("xq").is_err());
}

#[test]
#[should_panic(expected = "sjit:")]
fn test_bad_swizzle_is_fatal() {
    let kb = KernelBuilder::new("swz");
    let v = kb.lit([1.0f32, 2.0]).copy();
    v.swizzle("xw");
}

#[test]
#[should_panic(expected = "sjit: operator `+`")]
fn test_type_error_is_fatal() {
    let kb = KernelBuilder::new("bad");
    let f = kb.lit(1.0f32);
    let u = kb.lit(1u32);
    let _ = f + u;
}

#[test]
fn test_group_size_validation() {
    let mut config = KernelConfig::named("gs");
    assert!(KernelBuilder::with_config(&config).is_ok());
    config.group_size = [5, 5, 1];
    assert!(KernelBuilder::with_config(&config).is_err());
    let kb = KernelBuilder::new("gs");
    assert!(kb.set_group_size(64, 1, 1).is_ok());
    assert!(kb.set_group_size(0, 32, 1).is_err());
}

#[test]
fn test_lane_mask_partition() {
    // m_if = ballot & cur, m_else = ~ballot & cur
    let patterns = [0u32, u32::MAX, 0x5555_5555, 0x0000_ffff, 0x8000_0001, 0x1234_5678];
    for cur in patterns {
        for ballot in patterns {
            let m_if = ballot & cur;
            let m_else = !ballot & cur;
            assert_eq!(m_if & m_else, 0);
            assert_eq!(m_if | m_else, cur);
        }
    }

    let mut config = KernelConfig::named("wave");
    config.wave32 = true;
    let kb = KernelBuilder::with_config(&config).unwrap();
    let cond = kb.thread_id().x().lt(3u32);
    kb.if_else(&cond, || {}, || {});
    let text = kb.text();
    let c = cond.name();
    assert!(text.contains(&format!("m_if_0 = (WaveActiveBallot({}).x) & u32(4294967295);\n", c)));
    assert!(text.contains(&format!("m_else_1 = (~WaveActiveBallot({}).x) & u32(4294967295);\n", c)));
    assert!(text.contains("if (m_if_0 != u32(0)) {\n"));
    assert!(text.contains("} else if (m_else_1 != u32(0)) {\n"));
}

#[test]
fn test_wave_branches_nest_masks() {
    let kb = KernelBuilder::new("wave");
    kb.enable_wave32();
    let cond = kb.thread_id().x().lt(3u32);
    kb.if_then(&cond, || {
        assert_eq!(kb.wave32_mask().name(), "m_if_0");
        assert!(!kb.in_divergent_region());
        let inner = kb.thread_id().y().lt(1u32);
        kb.if_then(&inner, || {
            assert_eq!(kb.wave32_mask().name(), "m_if_2");
        });
        kb.if_lane_active(|| assert!(kb.in_divergent_region()));
    });
    assert_eq!(kb.wave32_mask().name(), "u32(4294967295)");
    let text = kb.text();
    assert!(text.contains("m_if_2 = (WaveActiveBallot("));
    assert!(text.contains(") & m_if_0;\n"));
}

#[test]
fn test_wave_while_copies_mask_once() {
    let kb = KernelBuilder::new("wave");
    kb.enable_wave32();
    kb.while_loop(|| {
        assert_eq!(kb.wave32_mask().name(), "m_loop_0");
        kb.break_loop();
    });
    let text = kb.text();
    let copy = text.find("u32 m_loop_0 = u32(4294967295);\n").unwrap();
    let head = text.find("while (true) {\n").unwrap();
    assert!(copy < head);
}

#[test]
fn test_for_range_inclusive() {
    let kb = KernelBuilder::new("loop");
    let sum = kb.zero(&Ty::u32()).copy();
    kb.for_range(0u32, 7u32, |i| {
        let _ = sum.assign(&sum + i);
    });
    let text = kb.text();
    assert!(text.contains("for (tmp_"));
    assert!(text.contains(" = u32(0); "));
    assert!(text.contains(" <= u32(7); "));
    assert!(text.contains("++) {\n"));
}

#[test]
fn test_break_and_continue_placement() {
    let kb = KernelBuilder::new("loop");
    kb.while_loop(|| {
        kb.continue_loop();
        kb.break_loop();
    });
    let text = kb.text();
    assert!(text.contains("while (true) {\ncontinue;\nbreak;\n}\n"));
}

#[test]
#[should_panic(expected = "sjit: `break` inside a switch case")]
fn test_break_inside_switch_is_fatal() {
    let kb = KernelBuilder::new("switch");
    let v = kb.thread_id().x();
    kb.while_loop(|| {
        kb.switch_case(&v, &[0], |_| kb.break_loop());
    });
}

#[test]
#[should_panic(expected = "sjit: `break` outside of a loop")]
fn test_break_outside_loop_is_fatal() {
    let kb = KernelBuilder::new("loop");
    kb.break_loop();
}

#[test]
fn test_switch_cases() {
    let kb = KernelBuilder::new("switch");
    let out = kb.resource(&Resource::rw_buffer("g_out", Ty::u32()));
    let v = kb.thread_id().x();
    kb.while_loop(|| {
        kb.switch_case(&v, &[0, 1], |label| match label {
            0 => kb.continue_loop(),
            _ => out.write(&v, &v),
        });
        kb.break_loop();
    });
    let text = kb.text();
    assert!(text.contains("switch (__tid.x) {\ncase 0: {\ncontinue;\nbreak; }\ncase 1: {\n"));
    assert!(text.contains("g_out[__tid.x] = __tid.x;\nbreak; }\n}\n"));
}

#[test]
fn test_select_merges_values() {
    let kb = KernelBuilder::new("sel");
    let cond = kb.thread_id().x().gt(4u32);
    let v = kb.select(&cond, 1.0f32, 0.0f32);
    assert_eq!(v.ty(), Ty::f32());
    assert!(!v.is_uniform());
    let text = kb.text();
    let n = v.name();
    assert!(text.contains(&format!(
        "f32 {n};\nif ({c}) {{\n{n} = f32(1.000000);\n}} else {{\n{n} = f32(0.000000);\n}}\n",
        n = n,
        c = cond.name()
    )));
}

#[test]
fn test_lds_and_group_sync() {
    let kb = KernelBuilder::new("lds");
    kb.resource(&Resource::rw_buffer("g_out", Ty::f32()));
    let tile = kb.allocate_lds("lds_tile", &Ty::f32(), 64);
    assert_eq!(tile.name(), "lds_tile");
    let slot = kb.group_thread_id().x();
    tile.store(&slot, 1.0f32);
    assert!(kb.warnings().iter().any(|w| w.message.contains("barrier")));
    kb.group_sync();
    assert!(kb.warnings().is_empty());
    let kernel = kb.finish().unwrap();
    assert!(kernel.text.contains("groupshared f32 lds_tile[64];\n"));
    assert!(kernel.text.contains("lds_tile[__gid.x] = f32(1.000000);\n"));
    assert!(kernel.text.contains("GroupMemoryBarrierWithGroupSync();\n"));
}

#[test]
fn test_arrays() {
    let kb = KernelBuilder::new("arr");
    let table = kb.static_array(vec![Literal::from(1u32), Literal::from(2u32)]);
    let first = table.at(0);
    assert_eq!(first.ty(), Ty::u32());
    assert_eq!(first.name(), format!("{}[0]", table.name()));
    let scratch = kb.declare_array(&Ty::f32x4(), 8);
    assert_eq!(scratch.index(&first).ty(), Ty::f32x4());
    let text = kb.text();
    assert!(text.contains(&format!("u32 {}[2] = {{\nu32(1),\nu32(2),\n}};\n", table.name())));
    assert!(text.contains(&format!("f32x4 {}[8];\n", scratch.name())));
}

#[test]
fn test_struct_fields() {
    let kb = KernelBuilder::new("structs");
    let hit_ty = Ty::structure(
        "Hit",
        vec![("t".to_string(), Ty::f32()), ("normal".to_string(), Ty::f32x3())],
        false,
    );
    let hit = kb.make(&hit_ty);
    hit.set("t", 4.0f32);
    assert_eq!(hit.get("normal").ty(), Ty::f32x3());
    assert!(hit.try_field("missing").is_err());
    let text = kb.text();
    assert!(text.contains(&format!("Hit {n} = (Hit)0;\n{n}.t = f32(4.000000);\n", n = hit.name())));
}

#[test]
fn test_named_copy() {
    let kb = KernelBuilder::new("named");
    let v = kb.thread_id().named("pixel");
    assert_eq!(v.name(), "pixel");
    assert!(kb.text().contains("u32x3 pixel = __tid;\n"));
}

#[test]
fn test_intrinsic_methods() {
    let kb = KernelBuilder::new("math");
    let n = kb.lit([0.0f32, 1.0, 0.0]).copy();
    assert_eq!(n.normalize().ty(), Ty::f32x3());
    assert_eq!(n.dot(&n).ty(), Ty::f32());
    assert_eq!(n.cross(&n).ty(), Ty::f32x3());
    assert_eq!(n.length().ty(), Ty::f32());
    assert_eq!(n.tbn().ty(), Ty::f32x3x3());
    assert_eq!(n.tbn().matmul(&n).ty(), Ty::f32x3());
    assert_eq!(n.clamp(0.0f32, 1.0f32).ty(), Ty::f32x3());
    assert_eq!(n.pow(2.0f32).ty(), Ty::f32x3());
    assert_eq!(n.is_nan().any().ty(), Ty::bool());
    assert_eq!(n.x().splat(4).ty(), Ty::f32x4());
    assert_eq!(n.to_u32().ty(), Ty::u32x3());
    assert_eq!(n.x().as_u32().ty(), Ty::u32());
    let bits = kb.lane_bit();
    assert_eq!(bits.count_bits().ty(), Ty::u32());
    assert!(!kb.lane_index().is_uniform());
    let splat = n.x().splat(3);
    assert!(kb.text().contains(&format!("f32x3 {} = ((f32x3){});\n", splat.name(), n.x().name())));
}

#[test]
fn test_custom_inputs_and_bit_casts() {
    let kb = KernelBuilder::new("raster");
    let a = kb.custom_input("v_a", &Ty::f32x3());
    let b = kb.custom_input("v_b", &Ty::f32x3());
    let c = kb.custom_input("v_c", &Ty::f32x3());
    let bary = kb.custom_input("v_bary", &Ty::f32x2());
    assert_eq!(a.name(), "v_a");
    assert!(!a.is_uniform());
    let p = kb.interpolate(&a, &b, &c, &bary);
    assert_eq!(p.ty(), Ty::f32x3());
    assert!(!p.is_uniform());
    let bits = p.as_u32();
    assert_eq!(bits.as_f32().ty(), Ty::f32x3());
    assert_eq!(bits.as_i32().ty(), Ty::vector(BasicKind::I32, 3).unwrap());
    assert_eq!(p.is_inf().ty(), Ty::vector(BasicKind::Bool, 3).unwrap());

    let volume = kb.resource(&Resource::rw_texture_3d("g_volume", Ty::f32()));
    volume.write(&kb.thread_id(), &p.x());
    let kernel = kb.finish().unwrap();
    assert!(kernel.text.contains("RWTexture3D<f32> g_volume;\n"));
}

#[test]
fn test_construct_outside_catalog() {
    let kb = KernelBuilder::new("ctor");
    let x = kb.lit(1u32);
    let b = kb.construct(&Ty::vector(BasicKind::Bool, 2).unwrap(), &[&x.equals(1u32), &x.equals(2u32)]);
    assert_eq!(b.ty(), Ty::vector(BasicKind::Bool, 2).unwrap());
    assert!(kb.intrinsic("bool2").is_some());
}

#[test]
fn test_texture_sampling() {
    let kb = KernelBuilder::new("tex");
    let tex = kb.resource(&Resource::texture_2d("g_color", Ty::f32x4()));
    let smp = kb.resource(&Resource::sampler("g_linear"));
    let uv = kb.lit([0.5f32, 0.5]);
    let c = tex.sample(&smp, &uv);
    assert_eq!(c.ty(), Ty::f32x4());
    assert_eq!(tex.dimensions().ty(), Ty::u32x2());
    assert!(kb
        .text()
        .contains("= g_color.SampleLevel(g_linear, f32x2(0.500000, 0.500000), f32(0.0));\n"));
}

#[test]
fn test_define_function_and_call() {
    let kb = KernelBuilder::new("fn");
    let proto = FnPrototype::new(
        "square",
        Ty::f32(),
        vec![crate::intrinsic::Param::input("x", Ty::f32())],
    );
    let square = kb.define_function(proto, |params| Some(&params[0] * &params[0]));
    let v = kb.lit(3.0f32);
    let r = kb.call(&square, &[&v]);
    assert_eq!(r.ty(), Ty::f32());
    let by_name = kb.call_named("square", &[&r]);
    assert!(kb.text().contains(&format!("f32 {} = square({});\n", by_name.name(), r.name())));
    assert!(!kb.text().contains("in f32 x"));

    let kernel = kb.finish().unwrap();
    assert!(kernel.text.contains("f32 square(in f32 x)\n{\nf32 tmp_"));
    assert!(kernel.text.contains(" = x*x;\nreturn tmp_"));
}

#[test]
#[should_panic(expected = "sjit: `broken` must return f32")]
fn test_define_function_missing_return() {
    let kb = KernelBuilder::new("fn");
    kb.define_function(FnPrototype::new("broken", Ty::f32(), Vec::new()), |_| None);
}

#[test]
fn test_ray_queries() {
    let kb = KernelBuilder::new("rt");
    let tlas = kb.resource(&Resource::tlas("g_tlas"));
    let ray = kb.make(&Ty::ray_desc());
    ray.set("TMax", 100.0f32);
    assert_eq!(kb.ray_test(&tlas, &ray).ty(), Ty::bool());
    let hit = kb.ray_query(&tlas, &ray);
    assert_eq!(hit.field("hit").ty(), Ty::bool());
    let closest = kb.ray_query_transparent(&tlas, &ray, |candidate| candidate.field("ray_t").lt(50.0f32));
    assert_eq!(closest.ty(), Ty::ray_query_result());
    let text = kb.text();
    assert!(text.contains("RayQuery<RAY_FLAG_NONE> rq_0;\n"));
    assert!(text.contains("rq_0.TraceRayInline(g_tlas, RAY_FLAG_NONE, 0xffu, "));
    assert!(text.contains(".CommitNonOpaqueTriangleHit(); }\n"));
    assert!(text.contains(&format!("{}.ray_t = rq_0.CommittedRayT();\n", closest.name())));
}

#[test]
fn test_library_helpers_type_check() {
    let kb = KernelBuilder::new("lib");
    let n = kb.lit([0.0f32, 0.0, 1.0]).copy();
    let e = kb.encode_octahedral(&n);
    assert_eq!(e.ty(), Ty::f32x2());
    assert_eq!(kb.decode_octahedral(&e).ty(), Ty::f32x3());
    let packed = kb.encode_octahedral_16(&n);
    assert_eq!(packed.ty(), Ty::u32());
    assert_eq!(kb.decode_octahedral_16(&packed).ty(), Ty::f32x3());

    let h = kb.lit([0.0f32, 0.0]).to_f16();
    let p = kb.pack_f16x2(&h);
    assert_eq!(p.ty(), Ty::u32());
    assert_eq!(kb.unpack_f16x2(&p).ty(), Ty::f16x2());

    let rgb = kb.lit([1.0f32, 1.0, 1.0]);
    assert_eq!(kb.luminance(&rgb).ty(), Ty::f32());
}

#[test]
fn test_binary_search_loop() {
    let kb = KernelBuilder::new("search");
    let offsets = kb.resource(&Resource::buffer("g_offsets", Ty::u32()));
    let count = kb.lit(128u32);
    let key = kb.thread_id().x();
    let idx = kb.binary_search(&offsets, &count, &key);
    assert_eq!(idx.ty(), Ty::u32());
    let text = kb.text();
    assert!(text.contains("while (true) {\n"));
    assert!(text.contains(&format!("{} = ", idx.name())));
    assert!(text.contains("break;\n"));
}

#[test]
fn test_binary_search_stays_per_lane_under_wave32() {
    let kb = KernelBuilder::new("search_wave");
    kb.enable_wave32();
    let offsets = kb.resource(&Resource::buffer("g_offsets", Ty::u32()));
    let count = kb.lit(128u32);
    let key = kb.thread_id().x();
    kb.binary_search(&offsets, &count, &key);
    let text = kb.text();
    assert!(!text.contains("WaveActiveBallot"), "{}", text);
    assert!(!text.contains("m_loop_"));
    assert!(text.contains("} else {\n"));
}

#[test]
fn test_lane_branches_ignore_wave32() {
    let kb = KernelBuilder::new("lane_if");
    kb.enable_wave32();
    let hit = kb.thread_id().x().lt(4u32);
    let mut taken = kb.zero(&Ty::u32()).copy();
    kb.lane_if_then(&hit, || {
        taken += 1u32;
    });
    let text = kb.text();
    assert!(text.contains(&format!("if ({}) {{\n", hit.name())));
    assert!(!text.contains("WaveActiveBallot"));
    assert_eq!(taken.divergence(), Divergence::Divergent);

    kb.if_then(&hit, || {
        taken += 1u32;
    });
    assert_eq!(count(&kb.text(), "WaveActiveBallot("), 2);
}

#[test]
fn test_finish_builds_kernel() {
    let kb = KernelBuilder::new("finish");
    let out = kb.resource(&Resource::rw_buffer("g_out", Ty::u32()));
    let i = kb.thread_id().x();
    out.write(&i, &i);
    let kernel = kb.finish().unwrap();
    assert_eq!(kernel.name, "finish");
    assert!(kernel.text.contains("[numthreads(8, 8, 1)] void main("));
    assert!(kernel.text.contains("RWStructuredBuffer<u32> g_out;\n"));
    assert_eq!(kernel.cache_key().len(), 64);
    assert!(kernel.manifest.get("g_out").is_some());
    assert!(kernel.warnings.is_empty());
    assert!(kernel.graph.node_count() > 0);
}

#[test]
fn test_cache_key_tracks_text() {
    let build = |scale: f32| {
        let kb = KernelBuilder::new("k");
        let out = kb.resource(&Resource::rw_buffer("g_out", Ty::f32()));
        let i = kb.thread_id().x();
        let v = kb.lit(scale);
        out.write(&i, &v);
        kb.finish().unwrap()
    };
    assert_eq!(build(1.0).cache_key(), build(1.0).cache_key());
    assert_ne!(build(1.0).cache_key(), build(2.0).cache_key());
}
