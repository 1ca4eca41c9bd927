use super::*;

#[test]
fn test_scalar_singleton_identity() {
    let a = Ty::value(BasicKind::F32, 1, 1).unwrap();
    let b = Ty::value(BasicKind::F32, 1, 1).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, Ty::f32());
    assert_eq!(a, Ty::scalar(BasicKind::F32));
}

#[test]
fn test_vector_table_matches_structure() {
    let v = Ty::vector(BasicKind::F32, 3).unwrap();
    assert_eq!(v, Ty::f32x3());
    assert!(v.is_vector());
    assert!(!v.is_scalar());
    assert!(!v.is_matrix());
    assert_eq!(v.kind(), Some(BasicKind::F32));
    assert_eq!(v.rows(), 3);
    assert_eq!(v.cols(), 1);
    assert_eq!(v.name(), "f32x3");
}

#[test]
fn test_type_names() {
    assert_eq!(Ty::bool().name(), "bool");
    assert_eq!(Ty::vector(BasicKind::Bool, 3).unwrap().name(), "bool3");
    assert_eq!(Ty::u8().name(), "u8");
    assert_eq!(Ty::i32x2().name(), "i32x2");
    assert_eq!(Ty::f32x4x4().name(), "f32x4x4");
    assert_eq!(Ty::void().name(), "void");
    assert_eq!(Ty::texture(Ty::f32x4(), Dim::D2).name(), "Texture2D");
    assert_eq!(Ty::rw_texture(Ty::f32(), Dim::D3).name(), "RWTexture3D");
    assert_eq!(Ty::buffer(Ty::u32()).name(), "StructuredBuffer");
    assert_eq!(Ty::rw_buffer(Ty::u32()).name(), "RWStructuredBuffer");
    assert_eq!(Ty::sampler().name(), "SamplerState");
    assert_eq!(Ty::tlas().name(), "RaytracingAccelerationStructure");
    assert_eq!(Ty::constant(Ty::u32()).name(), "u32");
    assert_eq!(Ty::array(Ty::f32(), ArrayLen::Fixed(64)).name(), "f32[64]");
    assert_eq!(Ty::array(Ty::f32(), ArrayLen::Unbounded).name(), "f32[]");
}

#[test]
fn test_unregistered_combinations_fail() {
    assert!(Ty::vector(BasicKind::F32, 5).is_err());
    assert!(Ty::vector(BasicKind::F32, 0).is_err());
    assert!(Ty::vector(BasicKind::U8, 2).is_err());
    assert!(Ty::matrix(BasicKind::U32, 3, 3).is_err());
    assert!(Ty::matrix(BasicKind::F32, 3, 1).is_err());
    let err = Ty::vector(BasicKind::I32, 7).unwrap_err();
    assert!(err.message.contains("unregistered type"));
}

#[test]
fn test_matrix_predicates() {
    let m = Ty::matrix(BasicKind::F32, 3, 3).unwrap();
    assert_eq!(m, Ty::f32x3x3());
    assert!(m.is_matrix());
    assert!(!m.is_vector());
    assert_eq!(m.with_rows(3).unwrap(), Ty::f32x3());
}

#[test]
fn test_structs_are_interned() {
    let fields = || {
        vec![
            ("radiance".to_string(), Ty::f32x3()),
            ("count".to_string(), Ty::u32()),
        ]
    };
    let a = Ty::structure("Probe", fields(), false);
    let b = Ty::structure("Probe", fields(), false);
    assert_eq!(a, b);
    assert!(a.is_struct());
    assert_eq!(a.field("count"), Some(Ty::u32()));
    assert_eq!(a.field("missing"), None);

    let c = Ty::structure("Probe", vec![("radiance".to_string(), Ty::f32x3())], false);
    assert_ne!(a, c);
}

#[test]
fn test_array_elem_and_len() {
    let arr = Ty::array(Ty::u32(), ArrayLen::Fixed(8));
    assert!(arr.is_array());
    assert_eq!(arr.elem(), Some(Ty::u32()));
    assert_eq!(arr.array_len(), Some(ArrayLen::Fixed(8)));
    assert_eq!(arr, Ty::array(Ty::u32(), ArrayLen::Fixed(8)));
}

#[test]
fn test_resource_accessors() {
    let t = Ty::texture(Ty::f32x4(), Dim::D2Array);
    assert!(t.is_resource_of(ResourceKind::Texture));
    assert_eq!(t.elem(), Some(Ty::f32x4()));
    assert_eq!(t.dim().map(Dim::num_dims), Some(3));
    assert_eq!(t.access(), Some(Access::Read));
    assert_ne!(t, Ty::rw_texture(Ty::f32x4(), Dim::D2Array));
}

#[test]
fn test_numeric_family() {
    let ty = Ty::family(BasicKind::U32, &Ty::numeric(2), &Ty::numeric(1)).unwrap();
    assert_eq!(ty, Ty::u32x2());
    assert_eq!(Ty::numeric(3).numeric_value(), Some(3));
    assert!(Ty::family(BasicKind::U32, &Ty::f32(), &Ty::numeric(1)).is_err());
}

#[test]
fn test_value_table_contains_expected() {
    let table = Ty::value_table();
    assert!(table.contains(&Ty::f32x4x4()));
    assert!(table.contains(&Ty::u8()));
    assert!(!table.iter().any(|t| t.kind() == Some(BasicKind::U8) && t.rows() > 1));
    // f16 and f32: 4 vectors + 9 matrices each; bool, i32, u32: 4 each; u8: 1.
    assert_eq!(table.len(), 2 * 13 + 3 * 4 + 1);
}

#[test]
fn test_ray_query_result_is_builtin() {
    let rq = Ty::ray_query_result();
    assert!(rq.is_builtin_struct());
    assert_eq!(rq.field("bary"), Some(Ty::f32x2()));
    assert_eq!(rq.name(), "RayQueryWrapper");
}
