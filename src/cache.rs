//! On-disk cache of generated kernels.
//!
//! Entries are keyed by the blake3 hash of the kernel text, so a key
//! always maps to the same content and entries are never rewritten.
//!
//! ```text
//! <cache dir>/
//! ├── <key>.hlsl      kernel text
//! └── <key>.json      binding manifest
//! ```
//!
//! Location: `$SJIT_CACHE_DIR`, else `~/.sjit/cache/`.

use std::path::{Path, PathBuf};

use crate::builder::Kernel;

/// Resolve the default cache directory.
pub fn cache_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SJIT_CACHE_DIR") {
        return Some(PathBuf::from(dir));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".sjit").join("cache"))
}

/// A kernel read back from the cache.
#[derive(Clone, Debug)]
pub struct CachedKernel {
    pub text: String,
    pub manifest_json: Option<String>,
}

#[derive(Clone, Debug)]
pub struct KernelCache {
    root: PathBuf,
}

impl KernelCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache at [`cache_dir`].
    pub fn open_default() -> Option<Self> {
        cache_dir().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn text_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.hlsl", key))
    }

    fn manifest_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.text_path(key).exists()
    }

    pub fn lookup(&self, key: &str) -> Option<CachedKernel> {
        let text = std::fs::read_to_string(self.text_path(key)).ok()?;
        let manifest_json = std::fs::read_to_string(self.manifest_path(key)).ok();
        Some(CachedKernel {
            text,
            manifest_json,
        })
    }

    /// Write `kernel` under its cache key unless already present. Returns
    /// the path of the kernel text.
    pub fn store(&self, kernel: &Kernel) -> Result<PathBuf, String> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| format!("cannot create cache directory: {}", e))?;
        let key = kernel.cache_key();
        let path = self.text_path(&key);
        if path.exists() {
            return Ok(path);
        }
        std::fs::write(&path, &kernel.text)
            .map_err(|e| format!("cannot write cache file: {}", e))?;
        let _ = std::fs::write(self.manifest_path(&key), kernel.manifest.to_json());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::KernelBuilder;
    use crate::resource::Resource;
    use crate::types::Ty;

    fn kernel(name: &str) -> Kernel {
        let kb = KernelBuilder::new(name);
        let out = kb.resource(&Resource::rw_buffer("g_out", Ty::u32()));
        let i = kb.thread_id().x();
        out.write(&i, &i);
        kb.finish().unwrap()
    }

    #[test]
    fn test_store_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = KernelCache::new(dir.path().join("cache"));
        let k = kernel("copy");
        let key = k.cache_key();
        assert!(!cache.contains(&key));
        let path = cache.store(&k).unwrap();
        assert!(path.ends_with(format!("{}.hlsl", key)));
        assert!(cache.contains(&key));
        let cached = cache.lookup(&key).unwrap();
        assert_eq!(cached.text, k.text);
        assert!(cached.manifest_json.unwrap().contains("\"g_out\""));
    }

    #[test]
    fn test_store_is_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = KernelCache::new(dir.path());
        let k = kernel("copy");
        let path = cache.store(&k).unwrap();
        std::fs::write(&path, "edited").unwrap();
        cache.store(&k).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "edited");
    }

    #[test]
    fn test_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = KernelCache::new(dir.path());
        assert!(cache.lookup("0000").is_none());
    }
}
