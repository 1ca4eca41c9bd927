//! Type registry for kernel values.
//!
//! Every type is canonicalised through a process-wide interner, so two
//! handles compare equal exactly when they describe the same type:
//!
//! ```text
//! Ty::vector(F32, 3) ─┐
//!                      ├─→ intern(Value { F32, 3, 1 }) ─→ same Arc
//! Ty::f32x3()        ─┘
//! ```
//!
//! Structs and arrays go through the same table, so structurally identical
//! structs are one type.

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::span::Span;

// ─── Basic kinds ───────────────────────────────────────────────────

/// Scalar element kind of a value type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicKind {
    F16,
    F32,
    Bool,
    U8,
    I32,
    U32,
}

impl BasicKind {
    pub const ALL: [BasicKind; 6] = [
        BasicKind::F16,
        BasicKind::F32,
        BasicKind::Bool,
        BasicKind::U8,
        BasicKind::I32,
        BasicKind::U32,
    ];

    /// Name used in emitted text (`f32`, `bool`, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            BasicKind::F16 => "f16",
            BasicKind::F32 => "f32",
            BasicKind::Bool => "bool",
            BasicKind::U8 => "u8",
            BasicKind::I32 => "i32",
            BasicKind::U32 => "u32",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, BasicKind::F16 | BasicKind::F32)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, BasicKind::U8 | BasicKind::I32 | BasicKind::U32)
    }

    /// Largest vector width registered for this kind.
    fn max_rows(self) -> u32 {
        match self {
            BasicKind::U8 => 1,
            _ => 4,
        }
    }

    /// Whether matrices (cols > 1) exist for this kind.
    fn has_matrices(self) -> bool {
        self.is_float()
    }
}

// ─── Resource shapes ───────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Texture,
    Buffer,
    /// Plain uniform value (`u32 g_frame;`).
    Constant,
    Sampler,
    /// Ray-tracing acceleration structure.
    Tlas,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    D1,
    D2,
    D3,
    D1Array,
    D2Array,
}

impl Dim {
    /// Number of coordinates needed to address the resource.
    pub fn num_dims(self) -> u32 {
        match self {
            Dim::D1 => 1,
            Dim::D2 => 2,
            Dim::D3 => 3,
            Dim::D1Array => 2,
            Dim::D2Array => 3,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Dim::D1 => "1D",
            Dim::D2 => "2D",
            Dim::D3 => "3D",
            Dim::D1Array => "1DArray",
            Dim::D2Array => "2DArray",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    Read,
    ReadWrite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrayLen {
    Fixed(u32),
    /// Bindless / runtime-sized.
    Unbounded,
}

// ─── Type data ─────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Void,
    /// Literal dimension marker used to build vector/matrix families.
    Numeric(u32),
    /// Placeholder parameter type in intrinsic signatures.
    Wildcard(u32),
    Value {
        kind: BasicKind,
        rows: u32,
        cols: u32,
    },
    Struct {
        name: String,
        fields: Vec<(String, Ty)>,
        builtin: bool,
    },
    Array {
        elem: Ty,
        len: ArrayLen,
    },
    Resource {
        kind: ResourceKind,
        elem: Option<Ty>,
        dim: Dim,
        access: Access,
    },
}

/// Canonical type handle. Cheap to clone; equality is identity.
#[derive(Clone)]
pub struct Ty(Arc<TypeData>);

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Ty {}

impl Hash for Ty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

fn interner() -> &'static Mutex<HashSet<Arc<TypeData>>> {
    static TYPES: OnceLock<Mutex<HashSet<Arc<TypeData>>>> = OnceLock::new();
    TYPES.get_or_init(|| Mutex::new(HashSet::new()))
}

fn unregistered(what: String) -> Diagnostic {
    Diagnostic::error(format!("unregistered type: {}", what), Span::dummy())
}

macro_rules! value_shorthands {
    ($($fn_name:ident => ($kind:ident, $rows:expr, $cols:expr)),* $(,)?) => {
        $(
            pub fn $fn_name() -> Ty {
                Ty::intern(TypeData::Value {
                    kind: BasicKind::$kind,
                    rows: $rows,
                    cols: $cols,
                })
            }
        )*
    };
}

impl Ty {
    fn intern(data: TypeData) -> Ty {
        let mut table = interner().lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = table.get(&data) {
            return Ty(existing.clone());
        }
        let handle = Arc::new(data);
        table.insert(handle.clone());
        Ty(handle)
    }

    pub fn data(&self) -> &TypeData {
        &self.0
    }

    // ── Value types ──

    /// Canonical scalar/vector/matrix type. Fails for combinations that are
    /// not part of the registered table.
    pub fn value(kind: BasicKind, rows: u32, cols: u32) -> Result<Ty, Diagnostic> {
        let rows_ok = (1..=kind.max_rows()).contains(&rows);
        let cols_ok = cols == 1 || (kind.has_matrices() && rows >= 2 && (2..=4).contains(&cols));
        if !rows_ok || !cols_ok {
            return Err(unregistered(format!(
                "{} with {} rows and {} columns",
                kind.prefix(),
                rows,
                cols
            )));
        }
        Ok(Ty::intern(TypeData::Value { kind, rows, cols }))
    }

    pub fn scalar(kind: BasicKind) -> Ty {
        Ty::intern(TypeData::Value {
            kind,
            rows: 1,
            cols: 1,
        })
    }

    pub fn vector(kind: BasicKind, width: u32) -> Result<Ty, Diagnostic> {
        Ty::value(kind, width, 1)
    }

    pub fn matrix(kind: BasicKind, rows: u32, cols: u32) -> Result<Ty, Diagnostic> {
        if cols < 2 {
            return Err(unregistered(format!(
                "{}x{}x{} is not a matrix",
                kind.prefix(),
                rows,
                cols
            )));
        }
        Ty::value(kind, rows, cols)
    }

    /// Build a value type from numeric dimension markers.
    pub fn family(kind: BasicKind, rows: &Ty, cols: &Ty) -> Result<Ty, Diagnostic> {
        match (rows.data(), cols.data()) {
            (TypeData::Numeric(r), TypeData::Numeric(c)) => Ty::value(kind, *r, *c),
            _ => Err(unregistered(format!(
                "{} family over non-numeric dimensions {} and {}",
                kind.prefix(),
                rows,
                cols
            ))),
        }
    }

    /// Every registered scalar/vector/matrix type.
    pub fn value_table() -> Vec<Ty> {
        let mut out = Vec::new();
        for kind in BasicKind::ALL {
            for cols in 1..=4 {
                for rows in 1..=4 {
                    if let Ok(ty) = Ty::value(kind, rows, cols) {
                        out.push(ty);
                    }
                }
            }
        }
        out
    }

    value_shorthands! {
        f16 => (F16, 1, 1),
        f16x2 => (F16, 2, 1),
        f16x3 => (F16, 3, 1),
        f16x4 => (F16, 4, 1),
        f32 => (F32, 1, 1),
        f32x2 => (F32, 2, 1),
        f32x3 => (F32, 3, 1),
        f32x4 => (F32, 4, 1),
        f32x3x3 => (F32, 3, 3),
        f32x4x4 => (F32, 4, 4),
        bool => (Bool, 1, 1),
        u8 => (U8, 1, 1),
        i32 => (I32, 1, 1),
        i32x2 => (I32, 2, 1),
        i32x3 => (I32, 3, 1),
        i32x4 => (I32, 4, 1),
        u32 => (U32, 1, 1),
        u32x2 => (U32, 2, 1),
        u32x3 => (U32, 3, 1),
        u32x4 => (U32, 4, 1),
    }

    pub fn void() -> Ty {
        Ty::intern(TypeData::Void)
    }

    pub fn numeric(n: u32) -> Ty {
        Ty::intern(TypeData::Numeric(n))
    }

    pub fn wildcard(index: u32) -> Ty {
        Ty::intern(TypeData::Wildcard(index))
    }

    // ── Aggregates ──

    pub fn array(elem: Ty, len: ArrayLen) -> Ty {
        Ty::intern(TypeData::Array { elem, len })
    }

    pub fn structure(name: &str, fields: Vec<(String, Ty)>, builtin: bool) -> Ty {
        Ty::intern(TypeData::Struct {
            name: name.to_string(),
            fields,
            builtin,
        })
    }

    /// Result of an inline ray query; declared by the kernel prologue.
    pub fn ray_query_result() -> Ty {
        Ty::structure(
            "RayQueryWrapper",
            vec![
                ("hit".to_string(), Ty::bool()),
                ("ray_t".to_string(), Ty::f32()),
                ("bary".to_string(), Ty::f32x2()),
                ("primitive_idx".to_string(), Ty::u32()),
                ("instance_id".to_string(), Ty::u32()),
            ],
            true,
        )
    }

    /// Ray description consumed by inline ray queries.
    pub fn ray_desc() -> Ty {
        Ty::structure(
            "RayDesc",
            vec![
                ("Origin".to_string(), Ty::f32x3()),
                ("TMin".to_string(), Ty::f32()),
                ("Direction".to_string(), Ty::f32x3()),
                ("TMax".to_string(), Ty::f32()),
            ],
            true,
        )
    }

    // ── Resources ──

    pub fn resource(kind: ResourceKind, elem: Option<Ty>, dim: Dim, access: Access) -> Ty {
        Ty::intern(TypeData::Resource {
            kind,
            elem,
            dim,
            access,
        })
    }

    pub fn texture(elem: Ty, dim: Dim) -> Ty {
        Ty::resource(ResourceKind::Texture, Some(elem), dim, Access::Read)
    }

    pub fn rw_texture(elem: Ty, dim: Dim) -> Ty {
        Ty::resource(ResourceKind::Texture, Some(elem), dim, Access::ReadWrite)
    }

    pub fn buffer(elem: Ty) -> Ty {
        Ty::resource(ResourceKind::Buffer, Some(elem), Dim::D1, Access::Read)
    }

    pub fn rw_buffer(elem: Ty) -> Ty {
        Ty::resource(ResourceKind::Buffer, Some(elem), Dim::D1, Access::ReadWrite)
    }

    pub fn sampler() -> Ty {
        Ty::resource(ResourceKind::Sampler, None, Dim::D1, Access::Read)
    }

    pub fn tlas() -> Ty {
        Ty::resource(ResourceKind::Tlas, None, Dim::D1, Access::Read)
    }

    pub fn constant(elem: Ty) -> Ty {
        Ty::resource(ResourceKind::Constant, Some(elem), Dim::D1, Access::Read)
    }

    // ── Predicates ──

    pub fn is_void(&self) -> bool {
        matches!(self.data(), TypeData::Void)
    }

    pub fn is_value(&self) -> bool {
        matches!(self.data(), TypeData::Value { .. })
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.data(), TypeData::Value { rows: 1, cols: 1, .. })
    }

    /// True for scalars and vectors; scalars count as one-wide vectors.
    pub fn is_vector(&self) -> bool {
        matches!(self.data(), TypeData::Value { cols: 1, .. })
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self.data(), TypeData::Value { cols, .. } if *cols > 1)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.data(), TypeData::Struct { .. })
    }

    pub fn is_builtin_struct(&self) -> bool {
        matches!(self.data(), TypeData::Struct { builtin: true, .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.data(), TypeData::Array { .. })
    }

    pub fn is_resource(&self) -> bool {
        matches!(self.data(), TypeData::Resource { .. })
    }

    pub fn is_resource_of(&self, wanted: ResourceKind) -> bool {
        self.resource_kind() == Some(wanted)
    }

    // ── Accessors ──

    pub fn kind(&self) -> Option<BasicKind> {
        match self.data() {
            TypeData::Value { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_kind(&self, wanted: BasicKind) -> bool {
        self.kind() == Some(wanted)
    }

    /// Vector width (1 for scalars, 0 for non-values).
    pub fn rows(&self) -> u32 {
        match self.data() {
            TypeData::Value { rows, .. } => *rows,
            _ => 0,
        }
    }

    pub fn cols(&self) -> u32 {
        match self.data() {
            TypeData::Value { cols, .. } => *cols,
            _ => 0,
        }
    }

    pub fn numeric_value(&self) -> Option<u32> {
        match self.data() {
            TypeData::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    /// Same basic kind at a different vector width.
    pub fn with_rows(&self, rows: u32) -> Result<Ty, Diagnostic> {
        match self.kind() {
            Some(kind) => Ty::vector(kind, rows),
            None => Err(unregistered(format!("{} has no vector family", self))),
        }
    }

    /// Element type of arrays, texture/buffer template, or constant value.
    pub fn elem(&self) -> Option<Ty> {
        match self.data() {
            TypeData::Array { elem, .. } => Some(elem.clone()),
            TypeData::Resource { elem, .. } => elem.clone(),
            _ => None,
        }
    }

    pub fn array_len(&self) -> Option<ArrayLen> {
        match self.data() {
            TypeData::Array { len, .. } => Some(*len),
            _ => None,
        }
    }

    pub fn fields(&self) -> &[(String, Ty)] {
        match self.data() {
            TypeData::Struct { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<Ty> {
        self.fields()
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty.clone())
    }

    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self.data() {
            TypeData::Resource { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn dim(&self) -> Option<Dim> {
        match self.data() {
            TypeData::Resource { dim, .. } => Some(*dim),
            _ => None,
        }
    }

    pub fn access(&self) -> Option<Access> {
        match self.data() {
            TypeData::Resource { access, .. } => Some(*access),
            _ => None,
        }
    }

    /// Name as it appears in emitted text.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            TypeData::Void => write!(f, "void"),
            TypeData::Numeric(n) => write!(f, "{}", n),
            TypeData::Wildcard(i) => write!(f, "Wildcard_{}", i),
            TypeData::Value {
                kind: BasicKind::Bool,
                rows,
                cols,
            } => match (rows, cols) {
                (1, 1) => write!(f, "bool"),
                (r, 1) => write!(f, "bool{}", r),
                (r, c) => write!(f, "bool{}x{}", r, c),
            },
            TypeData::Value { kind, rows, cols } => match (rows, cols) {
                (1, 1) => write!(f, "{}", kind.prefix()),
                (r, 1) => write!(f, "{}x{}", kind.prefix(), r),
                (r, c) => write!(f, "{}x{}x{}", kind.prefix(), r, c),
            },
            TypeData::Struct { name, .. } => write!(f, "{}", name),
            TypeData::Array { elem, len } => match len {
                ArrayLen::Fixed(n) => write!(f, "{}[{}]", elem, n),
                ArrayLen::Unbounded => write!(f, "{}[]", elem),
            },
            TypeData::Resource {
                kind,
                elem,
                dim,
                access,
            } => {
                let rw = if *access == Access::ReadWrite { "RW" } else { "" };
                match kind {
                    ResourceKind::Texture => write!(f, "{}Texture{}", rw, dim.suffix()),
                    ResourceKind::Buffer => write!(f, "{}StructuredBuffer", rw),
                    ResourceKind::Sampler => write!(f, "SamplerState"),
                    ResourceKind::Tlas => write!(f, "RaytracingAccelerationStructure"),
                    ResourceKind::Constant => match elem {
                        Some(elem) => write!(f, "{}", elem),
                        None => write!(f, "void"),
                    },
                }
            }
        }
    }
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ty({})", self)
    }
}
