use super::*;
use crate::types::Dim;

fn arg(name: &str, ty: Ty) -> CallArg {
    CallArg {
        name: name.to_string(),
        ty,
    }
}

#[test]
fn test_fixed_prototype_default_call() {
    let proto = FnPrototype::new(
        "shade",
        Ty::f32x3(),
        vec![Param::input("n", Ty::f32x3()), Param::inout("acc", Ty::f32())],
    );
    assert_eq!(
        proto.resolve_return_type(&[Ty::f32x3(), Ty::f32()]).unwrap(),
        Ty::f32x3()
    );
    let text = proto
        .emit_call(&[arg("tmp_1", Ty::f32x3()), arg("tmp_2", Ty::f32())])
        .unwrap();
    assert_eq!(text, "shade(tmp_1, tmp_2)");
    assert_eq!(
        proto.definition().unwrap(),
        "f32x3 shade(in f32x3 n, inout f32 acc)"
    );
    assert_eq!(proto.to_string(), "shade(n: f32x3, acc: f32) -> f32x3");
}

#[test]
fn test_fixed_prototype_rejects_bad_arguments() {
    let proto = FnPrototype::new("f", Ty::void(), vec![Param::input("x", Ty::u32())]);
    assert!(proto.resolve_return_type(&[]).is_err());
    assert!(proto.resolve_return_type(&[Ty::f32()]).is_err());
}

#[test]
fn test_sample_rule() {
    let sample = FnPrototype::builtin(Builtin::Sample);
    let tex = Ty::texture(Ty::f32x4(), Dim::D2);
    let ret = sample
        .resolve_return_type(&[tex.clone(), Ty::sampler(), Ty::f32x2()])
        .unwrap();
    assert_eq!(ret, Ty::f32x4());
    assert!(sample
        .resolve_return_type(&[tex.clone(), Ty::sampler(), Ty::f32x4()])
        .is_err());
    assert!(sample
        .resolve_return_type(&[Ty::sampler(), tex.clone(), Ty::f32x2()])
        .is_err());
    let text = sample
        .emit_call(&[
            arg("g_tex", tex),
            arg("g_sampler", Ty::sampler()),
            arg("tmp_3", Ty::f32x2()),
        ])
        .unwrap();
    assert_eq!(text, "g_tex.SampleLevel(g_sampler, tmp_3, f32(0.0))");
}

#[test]
fn test_dot_returns_scalar() {
    let dot = FnPrototype::builtin(Builtin::Dot);
    assert_eq!(
        dot.resolve_return_type(&[Ty::f32x3(), Ty::f32x3()]).unwrap(),
        Ty::f32()
    );
    assert!(dot.resolve_return_type(&[Ty::f32x3(), Ty::f32x2()]).is_err());
}

#[test]
fn test_get_dimensions_width_follows_dim() {
    let dims = FnPrototype::builtin(Builtin::GetDimensions);
    let t2 = Ty::texture(Ty::f32(), Dim::D2);
    let t3 = Ty::rw_texture(Ty::f32(), Dim::D3);
    assert_eq!(dims.resolve_return_type(&[t2]).unwrap(), Ty::u32x2());
    assert_eq!(dims.resolve_return_type(&[t3]).unwrap(), Ty::u32x3());
}

#[test]
fn test_conversions() {
    let to_f32 = FnPrototype::builtin(Builtin::ConvertTo(BasicKind::F32));
    assert_eq!(to_f32.resolve_return_type(&[Ty::u32x3()]).unwrap(), Ty::f32x3());
    assert_eq!(
        to_f32.emit_call(&[arg("tmp_1", Ty::u32x3())]).unwrap(),
        "f32x3(tmp_1)"
    );

    let as_u32 = FnPrototype::builtin(Builtin::BitcastTo(BasicKind::U32));
    assert_eq!(as_u32.resolve_return_type(&[Ty::f32()]).unwrap(), Ty::u32());
    assert_eq!(as_u32.emit_call(&[arg("x", Ty::f32())]).unwrap(), "asu32(x)");
    assert!(as_u32.resolve_return_type(&[Ty::f16()]).is_err());

    let f16_to_u32 = FnPrototype::builtin(Builtin::F16ToU32);
    assert_eq!(
        f16_to_u32.emit_call(&[arg("h", Ty::f16())]).unwrap(),
        "u32(f32tof16(h))"
    );
    let u32_to_f16 = FnPrototype::builtin(Builtin::U32ToF16);
    assert_eq!(
        u32_to_f16.emit_call(&[arg("u", Ty::u32())]).unwrap(),
        "f16(f16tof32(u))"
    );
}

#[test]
fn test_splat_returns_requested_width() {
    for n in 2..=4 {
        let splat = FnPrototype::builtin(Builtin::Splat(n));
        let ret = splat.resolve_return_type(&[Ty::f32()]).unwrap();
        assert_eq!(ret.rows(), n);
    }
    let splat3 = FnPrototype::builtin(Builtin::Splat(3));
    assert_eq!(
        splat3.emit_call(&[arg("tmp_2", Ty::f32())]).unwrap(),
        "((f32x3)tmp_2)"
    );
}

#[test]
fn test_read_write_rules() {
    let buf = Ty::rw_buffer(Ty::u32());
    let read = FnPrototype::builtin(Builtin::Read);
    let write = FnPrototype::builtin(Builtin::Write);
    assert_eq!(read.resolve_return_type(&[buf.clone(), Ty::u32()]).unwrap(), Ty::u32());
    assert!(write
        .resolve_return_type(&[buf.clone(), Ty::u32(), Ty::u32()])
        .unwrap()
        .is_void());
    assert!(write
        .resolve_return_type(&[Ty::buffer(Ty::u32()), Ty::u32(), Ty::u32()])
        .is_err());
    assert_eq!(
        write
            .emit_call(&[arg("g_out", buf), arg("i", Ty::u32()), arg("v", Ty::u32())])
            .unwrap(),
        "g_out[i] = v"
    );
}

#[test]
fn test_mul_shapes() {
    let mul = FnPrototype::builtin(Builtin::Mul);
    assert_eq!(
        mul.resolve_return_type(&[Ty::f32x4x4(), Ty::f32x4()]).unwrap(),
        Ty::f32x4()
    );
    assert_eq!(
        mul.resolve_return_type(&[Ty::f32x3(), Ty::f32x3x3()]).unwrap(),
        Ty::f32x3()
    );
    assert_eq!(
        mul.resolve_return_type(&[Ty::f32x3x3(), Ty::f32x3x3()]).unwrap(),
        Ty::f32x3x3()
    );
    assert!(mul.resolve_return_type(&[Ty::f32x4x4(), Ty::f32x3()]).is_err());
    assert!(mul.resolve_return_type(&[Ty::f32x3(), Ty::f32x3()]).is_err());
}

#[test]
fn test_construct_component_count() {
    let make3 = FnPrototype::builtin(Builtin::Construct(Ty::f32x3()));
    assert_eq!(
        make3.resolve_return_type(&[Ty::f32x2(), Ty::f32()]).unwrap(),
        Ty::f32x3()
    );
    assert_eq!(
        make3.resolve_return_type(&[Ty::f32(), Ty::f32(), Ty::f32()]).unwrap(),
        Ty::f32x3()
    );
    assert!(make3.resolve_return_type(&[Ty::f32x2()]).is_err());
    assert!(make3.resolve_return_type(&[Ty::u32x3()]).is_err());
}

#[test]
fn test_lane_queries_are_divergent() {
    assert!(FnPrototype::builtin(Builtin::LaneIndex).divergent);
    assert!(FnPrototype::builtin(Builtin::LaneBit).divergent);
    assert!(!FnPrototype::builtin(Builtin::Dot).divergent);
    let ballot = FnPrototype::builtin(Builtin::Ballot);
    assert_eq!(
        ballot.emit_call(&[arg("c", Ty::bool())]).unwrap(),
        "WaveActiveBallot(c).x"
    );
}

#[test]
fn test_ray_queries() {
    let rq = FnPrototype::builtin(Builtin::RayQuery);
    assert_eq!(
        rq.resolve_return_type(&[Ty::tlas(), Ty::ray_desc()]).unwrap(),
        Ty::ray_query_result()
    );
    let any = FnPrototype::builtin(Builtin::RayTest);
    assert_eq!(
        any.resolve_return_type(&[Ty::tlas(), Ty::ray_desc()]).unwrap(),
        Ty::bool()
    );
    assert!(any.resolve_return_type(&[Ty::sampler(), Ty::ray_desc()]).is_err());
}

#[test]
fn test_isnan_all_any() {
    let isnan = FnPrototype::builtin(Builtin::IsNan);
    let bool3 = Ty::vector(BasicKind::Bool, 3).unwrap();
    assert_eq!(isnan.resolve_return_type(&[Ty::f32x3()]).unwrap(), bool3);
    let all = FnPrototype::builtin(Builtin::All);
    assert_eq!(all.resolve_return_type(&[bool3]).unwrap(), Ty::bool());
    assert!(all.resolve_return_type(&[Ty::f32x3()]).is_err());
}

struct Half;

impl CallRule for Half {
    fn resolve_return_type(&self, args: &[Ty]) -> Result<Ty, Diagnostic> {
        Ok(args[0].clone())
    }

    fn emit_call(&self, _name: &str, args: &[CallArg]) -> Result<String, Diagnostic> {
        Ok(format!("({} * 0.5)", args[0].name))
    }
}

#[test]
fn test_custom_rule() {
    let proto = FnPrototype::with_rule("half", vec![Param::input("x", Ty::wildcard(0))], Arc::new(Half));
    assert_eq!(proto.resolve_return_type(&[Ty::f32x2()]).unwrap(), Ty::f32x2());
    assert_eq!(proto.emit_call(&[arg("v", Ty::f32x2())]).unwrap(), "(v * 0.5)");
    assert!(proto.definition().is_err());
}

#[test]
fn test_standard_table() {
    let table = IntrinsicTable::standard();
    assert!(!table.is_empty());
    assert!(table.get("dot").is_some());
    assert!(table.get("f32x3").is_some());
    assert!(table.get("asf32").is_some());
    assert!(table.get("WaveGetLaneIndex").map(|p| p.divergent).unwrap_or(false));
    assert!(table.get("no_such_fn").is_none());
    assert_eq!(table.len(), Builtin::catalog().len());
}

#[test]
fn test_table_register_user_fn() {
    let mut table = IntrinsicTable::new();
    let proto = table.register(FnPrototype::new(
        "luma",
        Ty::f32(),
        vec![Param::input("c", Ty::f32x3())],
    ));
    assert_eq!(proto.name, "luma");
    assert_eq!(table.len(), 1);
    assert!(table.get("luma").is_some());
}

#[test]
fn test_builtin_prototype_divergence() {
    assert!(FnPrototype::builtin(Builtin::LaneIndex).divergent);
    assert!(FnPrototype::builtin(Builtin::LaneBit).divergent);
    let ctor = FnPrototype::builtin(Builtin::Construct(Ty::f32x3()));
    assert!(!ctor.divergent);
    assert!(matches!(&ctor.rule, Rule::Builtin(Builtin::Construct(ty)) if *ty == Ty::f32x3()));
}
