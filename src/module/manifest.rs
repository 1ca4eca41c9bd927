//! Resource-binding manifest handed to the host renderer.

use serde::{Deserialize, Serialize};

use super::Module;
use crate::diagnostic::Diagnostic;
use crate::types::{Access, ArrayLen, Dim, ResourceKind};

/// One declared resource and where it is bound.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    /// Declared type text, e.g. `RWTexture2D<f32x4>`.
    pub type_name: String,
    pub kind: ResourceKind,
    pub dim: Dim,
    pub access: Access,
    /// Element type name for textures, buffers and constants.
    pub elem: Option<String>,
    /// Present for resource arrays.
    pub array: Option<ArrayLen>,
    pub register: Option<u32>,
    pub space: Option<u32>,
    /// Register class letter: `t`, `u`, `s` or `b`.
    pub letter: char,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub group_size: [u32; 3],
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Serialize to JSON (hand-rolled).
    pub fn to_json(&self) -> String {
        let [x, y, z] = self.group_size;
        let mut out = String::from("{\n");
        out.push_str(&format!("  \"group_size\": [{}, {}, {}],\n", x, y, z));
        out.push_str("  \"resources\": [\n");
        for (i, e) in self.entries.iter().enumerate() {
            let comma = if i + 1 < self.entries.len() { "," } else { "" };
            let array = match e.array {
                None => "null".to_string(),
                Some(ArrayLen::Unbounded) => "\"unbounded\"".to_string(),
                Some(ArrayLen::Fixed(n)) => n.to_string(),
            };
            out.push_str("    {\n");
            out.push_str(&format!("      \"name\": {},\n", json_string(&e.name)));
            out.push_str(&format!("      \"type\": {},\n", json_string(&e.type_name)));
            out.push_str(&format!("      \"kind\": {},\n", json_string(kind_name(e.kind))));
            out.push_str(&format!("      \"dim\": {},\n", json_string(dim_name(e.dim))));
            out.push_str(&format!(
                "      \"access\": {},\n",
                json_string(access_name(e.access))
            ));
            out.push_str(&format!("      \"elem\": {},\n", json_opt_string(e.elem.as_deref())));
            out.push_str(&format!("      \"array\": {},\n", array));
            out.push_str(&format!("      \"register\": {},\n", json_opt_u32(e.register)));
            out.push_str(&format!("      \"space\": {},\n", json_opt_u32(e.space)));
            out.push_str(&format!("      \"letter\": \"{}\"\n", e.letter));
            out.push_str(&format!("    }}{}\n", comma));
        }
        out.push_str("  ]\n}\n");
        out
    }
}

fn kind_name(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Texture => "texture",
        ResourceKind::Buffer => "buffer",
        ResourceKind::Constant => "constant",
        ResourceKind::Sampler => "sampler",
        ResourceKind::Tlas => "tlas",
    }
}

fn dim_name(dim: Dim) -> &'static str {
    match dim {
        Dim::D1 => "1d",
        Dim::D2 => "2d",
        Dim::D3 => "3d",
        Dim::D1Array => "1d_array",
        Dim::D2Array => "2d_array",
    }
}

fn access_name(access: Access) -> &'static str {
    match access {
        Access::Read => "read",
        Access::ReadWrite => "read_write",
    }
}

fn json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn json_opt_string(s: Option<&str>) -> String {
    s.map(json_string).unwrap_or_else(|| "null".to_string())
}

fn json_opt_u32(v: Option<u32>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string())
}

impl Module {
    /// Binding table of every resource the kernel references.
    pub fn manifest(&self) -> Result<Manifest, Diagnostic> {
        let mut entries = Vec::new();
        for decl in self.declarations()? {
            let shape = decl.resource.shape().clone();
            let (Some(kind), Some(dim), Some(access)) = (shape.resource_kind(), shape.dim(), shape.access())
            else {
                continue;
            };
            entries.push(ManifestEntry {
                name: decl.resource.name.clone(),
                type_name: decl.type_text,
                kind,
                dim,
                access,
                elem: shape.elem().map(|e| e.name()),
                array: decl.resource.array.as_ref().map(|a| a.size),
                register: decl.register,
                space: decl.space,
                letter: decl.letter,
            });
        }
        Ok(Manifest {
            group_size: self.group_size,
            entries,
        })
    }
}
