use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// First register space handed to unbounded resource arrays.
pub const DEFAULT_BINDLESS_SPACE: u32 = 99;

/// Per-kernel build settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Kernel name; used for cache entries and diagnostics.
    pub name: String,
    /// Thread-group dimensions written into `[numthreads(..)]`.
    pub group_size: [u32; 3],
    /// Lower branches with explicit wave32 lane masks.
    pub wave32: bool,
    /// Register space of the first unbounded resource array.
    pub bindless_space_base: u32,
    /// Declare resources in the output; when off a `RESOURCE_STAB`
    /// marker is left for the host to splice its own bindings in.
    pub emit_resources: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::default_compute()
    }
}

impl KernelConfig {
    /// Built-in compute configuration: 8×8×1 groups, bindless base 99.
    pub fn default_compute() -> Self {
        Self {
            name: "kernel".to_string(),
            group_size: [8, 8, 1],
            wave32: false,
            bindless_space_base: DEFAULT_BINDLESS_SPACE,
            emit_resources: true,
        }
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default_compute()
        }
    }

    /// Load a kernel configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read kernel config '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;
        Self::parse_toml(&content, path)
    }

    /// Resolve a configuration by name: `default` is built in, anything
    /// else is looked up as `kernels/{name}.toml` next to the binary or in
    /// the working directory.
    pub fn resolve(name: &str) -> Result<Self, Diagnostic> {
        if name.contains('/') || name.contains('\\') || name.contains("..") || name.starts_with('.')
        {
            return Err(Diagnostic::error(
                format!("invalid config name '{}'", name),
                Span::dummy(),
            ));
        }
        if name == "default" {
            return Ok(Self::default_compute());
        }

        let relative = format!("kernels/{}.toml", name);
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Ok(exe) = std::env::current_exe() {
            let mut dir = exe.parent().map(Path::to_path_buf);
            for _ in 0..3 {
                if let Some(base) = dir {
                    candidates.push(base.join(&relative));
                    dir = base.parent().map(Path::to_path_buf);
                }
            }
        }
        candidates.push(PathBuf::from(&relative));

        for path in candidates {
            if path.exists() {
                return Self::load(&path);
            }
        }
        Err(Diagnostic::error(
            format!("unknown kernel config '{}' (looked for '{}')", name, relative),
            Span::dummy(),
        )
        .with_help("use 'default' or pass --config <path>".to_string()))
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self, Diagnostic> {
        let err =
            |msg: String| Diagnostic::error(format!("{}: {}", path.display(), msg), Span::dummy());

        let mut config = Self::default_compute();
        let mut section = String::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(err(format!("expected `key = value`, got '{}'", trimmed)));
            };
            let key = key.trim();
            let value = value.trim();
            let unquoted = value.trim_matches('"');

            match (section.as_str(), key) {
                ("kernel", "name") => config.name = unquoted.to_string(),
                ("kernel", "group_size") => {
                    config.group_size = parse_group_size(value)
                        .ok_or_else(|| err(format!("invalid kernel.group_size: {}", value)))?;
                }
                ("kernel", "wave32") => {
                    config.wave32 = parse_bool(value)
                        .ok_or_else(|| err(format!("invalid kernel.wave32: {}", value)))?;
                }
                ("kernel", "bindless_space_base") => {
                    config.bindless_space_base = value
                        .parse()
                        .map_err(|_| err(format!("invalid kernel.bindless_space_base: {}", value)))?;
                }
                ("kernel", "emit_resources") => {
                    config.emit_resources = parse_bool(value)
                        .ok_or_else(|| err(format!("invalid kernel.emit_resources: {}", value)))?;
                }
                _ => {}
            }
        }

        if config.name.is_empty() {
            return Err(err("kernel.name must not be empty".to_string()));
        }
        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// `[x, y, z]` of positive integers.
fn parse_group_size(value: &str) -> Option<[u32; 3]> {
    let inner = value.strip_prefix('[')?.strip_suffix(']')?;
    let parts: Vec<u32> = inner
        .split(',')
        .map(|s| s.trim().parse().ok())
        .collect::<Option<Vec<u32>>>()?;
    match parts.as_slice() {
        [x, y, z] => Some([*x, *y, *z]),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
