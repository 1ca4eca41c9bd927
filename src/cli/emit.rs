use std::path::PathBuf;
use std::process;

use super::{build_kernel, find_kernel, resolve_config};

pub fn cmd_emit(name: &str, output: Option<PathBuf>, config: Option<&str>, wave32: bool) {
    let def = find_kernel(name);
    let mut config = resolve_config(&def, config);
    config.wave32 |= wave32;
    let kernel = build_kernel(&def, &config);

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &kernel.text) {
                eprintln!("error: cannot write '{}': {}", path.display(), e);
                process::exit(1);
            }
            eprintln!(
                "Emitted {} -> {} ({})",
                kernel.name,
                path.display(),
                &kernel.cache_key()[..16]
            );
        }
        None => print!("{}", kernel.text),
    }
}

pub fn cmd_manifest(name: &str, config: Option<&str>) {
    let def = find_kernel(name);
    let config = resolve_config(&def, config);
    let kernel = build_kernel(&def, &config);
    print!("{}", kernel.manifest.to_json());
}

pub fn cmd_dot(name: &str) {
    let def = find_kernel(name);
    let config = resolve_config(&def, None);
    let kernel = build_kernel(&def, &config);
    print!("{}", kernel.graph.to_dot());
}
