use std::path::PathBuf;
use std::process;

use rayon::prelude::*;
use sjit::cache::KernelCache;
use sjit::kernels;

pub fn cmd_build_all(out: Option<PathBuf>) {
    let cache = match out.map(KernelCache::new).or_else(KernelCache::open_default) {
        Some(cache) => cache,
        None => {
            eprintln!("error: no cache directory; pass --out or set SJIT_CACHE_DIR");
            process::exit(1);
        }
    };

    let results: Vec<(&'static str, Result<PathBuf, String>)> = kernels::catalog()
        .par_iter()
        .map(|def| {
            let stored = def
                .build_default()
                .map_err(|diag| diag.to_string())
                .and_then(|kernel| {
                    for warning in &kernel.warnings {
                        eprintln!("{}: {}", def.name, warning);
                    }
                    cache.store(&kernel)
                });
            (def.name, stored)
        })
        .collect();

    let mut failed = 0;
    for (name, result) in &results {
        match result {
            Ok(path) => eprintln!("  {:<16} {}", name, path.display()),
            Err(e) => {
                eprintln!("  {:<16} FAILED: {}", name, e);
                failed += 1;
            }
        }
    }
    eprintln!(
        "Built {} of {} kernels into {}",
        results.len() - failed,
        results.len(),
        cache.root().display()
    );
    if failed > 0 {
        process::exit(1);
    }
}
