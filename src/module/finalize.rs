//! Assembly of the final kernel text.

use std::sync::Arc;

use super::{module_error, Module};
use crate::diagnostic::Diagnostic;
use crate::resource::Resource;
use crate::types::{ArrayLen, BasicKind, ResourceKind, Ty, TypeData};

/// Helpers every kernel may call. Value type names are defined separately
/// from the type table.
const PROLOGUE_HELPERS: &str = r#"
template <typename T> u32 __get_dimensions(Texture1D<T> t) { u32 d; t.GetDimensions(d); return d; }
template <typename T> u32 __get_dimensions(RWTexture1D<T> t) { u32 d; t.GetDimensions(d); return d; }
template <typename T> u32x2 __get_dimensions(Texture2D<T> t) { u32x2 d; t.GetDimensions(d.x, d.y); return d; }
template <typename T> u32x2 __get_dimensions(RWTexture2D<T> t) { u32x2 d; t.GetDimensions(d.x, d.y); return d; }
template <typename T> u32x3 __get_dimensions(Texture3D<T> t) { u32x3 d; t.GetDimensions(d.x, d.y, d.z); return d; }
template <typename T> u32x3 __get_dimensions(RWTexture3D<T> t) { u32x3 d; t.GetDimensions(d.x, d.y, d.z); return d; }
template <typename T> u32x3 __get_dimensions(Texture2DArray<T> t) { u32x3 d; t.GetDimensions(d.x, d.y, d.z); return d; }

u32 __get_lane_bit() { return 1u << WaveGetLaneIndex(); }

struct RayQueryWrapper {
    bool hit;
    f32 ray_t;
    f32x2 bary;
    u32 primitive_idx;
    u32 instance_id;
};

bool __anyhit(RaytracingAccelerationStructure tlas, RayDesc ray) {
    RayQuery<RAY_FLAG_CULL_NON_OPAQUE | RAY_FLAG_ACCEPT_FIRST_HIT_AND_END_SEARCH> q;
    q.TraceRayInline(tlas, RAY_FLAG_NONE, 0xff, ray);
    q.Proceed();
    return q.CommittedStatus() == COMMITTED_TRIANGLE_HIT;
}

RayQueryWrapper __ray_query(RaytracingAccelerationStructure tlas, RayDesc ray) {
    RayQuery<RAY_FLAG_CULL_NON_OPAQUE> q;
    q.TraceRayInline(tlas, RAY_FLAG_NONE, 0xff, ray);
    q.Proceed();
    RayQueryWrapper r = (RayQueryWrapper)0;
    if (q.CommittedStatus() == COMMITTED_TRIANGLE_HIT) {
        r.hit = true;
        r.ray_t = q.CommittedRayT();
        r.bary = q.CommittedTriangleBarycentrics();
        r.primitive_idx = q.CommittedPrimitiveIndex();
        r.instance_id = q.CommittedInstanceID();
    }
    return r;
}

template <typename T> T __interpolate(T a, T b, T c, f32x2 bary) {
    return a * (1.0 - bary.x - bary.y) + b * bary.x + c * bary.y;
}

f32x3x3 __get_tbn(f32x3 n) {
    f32x3 up = abs(n.z) < 0.999 ? f32x3(0.0, 0.0, 1.0) : f32x3(1.0, 0.0, 0.0);
    f32x3 t = normalize(cross(up, n));
    f32x3 b = cross(n, t);
    return f32x3x3(t, b, n);
}

"#;

/// Native spelling of a registered value type, `None` where the emitted
/// name already is the native one.
fn native_name(ty: &Ty) -> Option<String> {
    let base = match ty.kind()? {
        BasicKind::F16 => "half",
        BasicKind::F32 => "float",
        BasicKind::I32 => "int",
        BasicKind::U32 | BasicKind::U8 => "uint",
        BasicKind::Bool => return None,
    };
    Some(match (ty.rows(), ty.cols()) {
        (1, 1) => base.to_string(),
        (r, 1) => format!("{}{}", base, r),
        (r, c) => format!("{}{}x{}", base, r, c),
    })
}

/// `#define` lines mapping every value type name to its native spelling.
pub fn type_defines() -> String {
    let mut out = String::new();
    for ty in Ty::value_table() {
        if let Some(native) = native_name(&ty) {
            out.push_str(&format!("#define {} {}\n", ty, native));
        }
    }
    out
}

/// Full prologue: type defines followed by the helper functions.
pub fn prologue() -> String {
    let mut out = type_defines();
    out.push_str(PROLOGUE_HELPERS);
    out
}

/// A resource with its final binding and declaration text.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub resource: Arc<Resource>,
    /// Declared type, e.g. `Texture2D<f32x4>`.
    pub type_text: String,
    pub register: Option<u32>,
    pub space: Option<u32>,
    pub letter: char,
    pub text: String,
}

fn binding_suffix(letter: char, register: Option<u32>, space: Option<u32>) -> String {
    match (register, space) {
        (Some(r), Some(s)) => format!(" : register({}{}, space{})", letter, r, s),
        (Some(r), None) => format!(" : register({}{})", letter, r),
        (None, Some(s)) => format!(" : register(space{})", s),
        (None, None) => String::new(),
    }
}

fn field_decl(name: &str, ty: &Ty) -> String {
    match ty.data() {
        TypeData::Array {
            elem,
            len: ArrayLen::Fixed(n),
        } => format!("{} {}[{}]", elem, name, n),
        TypeData::Array {
            elem,
            len: ArrayLen::Unbounded,
        } => format!("{} {}[]", elem, name),
        _ => format!("{} {}", ty, name),
    }
}

impl Module {
    /// Resources in name order with their bindings resolved. Unbounded
    /// arrays without an explicit space take consecutive spaces starting
    /// at the configured bindless base.
    pub fn declarations(&self) -> Result<Vec<Declaration>, Diagnostic> {
        let mut next_space = self.config.bindless_space_base;
        let mut out = Vec::new();
        for res in self.resources.values() {
            let shape = res.shape();
            let kind = res.kind().ok_or_else(|| {
                module_error(format!("`{}` is not a resource ({})", res.name, shape))
            })?;
            let elem = shape.elem();
            let type_text = match (kind, &elem) {
                (ResourceKind::Texture | ResourceKind::Buffer, Some(elem)) => {
                    format!("{}<{}>", shape, elem)
                }
                (ResourceKind::Sampler | ResourceKind::Tlas, _) => shape.to_string(),
                (ResourceKind::Constant, Some(elem)) if elem.is_vector() => elem.to_string(),
                _ => {
                    return Err(module_error(format!(
                        "unsupported resource shape {} for `{}`",
                        shape, res.name
                    )))
                }
            };
            let letter = res.register_letter();
            let mut register = res.binding.and_then(|b| b.register);
            let mut space = res.binding.and_then(|b| b.space);

            let text = match (&res.array, kind) {
                (Some(_), ResourceKind::Constant) => {
                    return Err(module_error(format!(
                        "arrays of constants are not supported (`{}`)",
                        res.name
                    )))
                }
                (Some(array), _) => {
                    let extent = match array.size {
                        ArrayLen::Unbounded => {
                            if space.is_none() {
                                space = Some(next_space);
                                next_space += 1;
                            }
                            String::new()
                        }
                        ArrayLen::Fixed(n) => n.to_string(),
                    };
                    format!(
                        "{} {}[{}]{};\n",
                        type_text,
                        res.name,
                        extent,
                        binding_suffix(letter, register, space)
                    )
                }
                (None, ResourceKind::Constant) => {
                    register = None;
                    space = None;
                    format!("{} {};\n", type_text, res.name)
                }
                (None, _) => format!(
                    "{} {}{};\n",
                    type_text,
                    res.name,
                    binding_suffix(letter, register, space)
                ),
            };
            out.push(Declaration {
                resource: res.clone(),
                type_text,
                register,
                space,
                letter,
                text,
            });
        }
        Ok(out)
    }

    /// Assemble the complete kernel: prologue, structs, shared memory,
    /// resources, header, free functions and the entry point.
    pub fn finalize(&self) -> Result<String, Diagnostic> {
        if !self.frames.is_empty() {
            return Err(module_error("a function definition is still open".to_string()));
        }
        if self.emitted.len() != 1 {
            return Err(module_error(format!(
                "{} scope(s) still open at finalize",
                self.emitted.len() - 1
            )));
        }

        let mut out = prologue();

        for ty in self.structs().filter(|ty| !ty.is_builtin_struct()) {
            out.push_str(&format!("struct {} {{\n", ty));
            for (name, field) in ty.fields() {
                out.push_str(&format!("    {};\n", field_decl(name, field)));
            }
            out.push_str("};\n");
        }

        for (name, ty) in &self.lds {
            out.push_str(&format!("groupshared {};\n", field_decl(name, ty)));
        }

        if self.config.emit_resources {
            for decl in self.declarations()? {
                out.push_str(&decl.text);
            }
        } else {
            out.push_str("RESOURCE_STAB\n");
        }

        out.push_str(&self.header);
        out.push_str(&self.functions);

        let [x, y, z] = self.group_size;
        out.push_str(&format!(
            "[numthreads({}, {}, {})] void main(u32x3 __tid : SV_DispatchThreadID, \
             u32x3 __gid : SV_GroupThreadID, u32x3 __group_id : SV_GroupID)\n{{\n",
            x, y, z
        ));
        out.push_str(&self.body);
        out.push_str("}\n");
        Ok(out)
    }
}
