pub mod build;
pub mod emit;
pub mod list;

use std::path::Path;
use std::process;

use sjit::config::KernelConfig;
use sjit::diagnostic::Diagnostic;
use sjit::kernels::{self, KernelDef};
use sjit::Kernel;

/// Look up a built-in kernel or exit.
pub fn find_kernel(name: &str) -> KernelDef {
    match kernels::find(name) {
        Some(def) => def,
        None => {
            eprintln!("error: unknown kernel '{}'", name);
            eprintln!("  help: run `sjit list` to see the built-in kernels");
            process::exit(1);
        }
    }
}

/// Resolve `--config`: an existing path is loaded, anything else is a
/// config name. Without one the kernel's own defaults apply.
pub fn resolve_config(def: &KernelDef, config: Option<&str>) -> KernelConfig {
    let result = match config {
        None => Ok(KernelConfig::named(def.name)),
        Some(arg) if Path::new(arg).is_file() => KernelConfig::load(Path::new(arg)),
        Some(arg) => KernelConfig::resolve(arg),
    };
    result.unwrap_or_else(|diag| fail(&diag))
}

/// Build `def`, print its warnings, exit on error.
pub fn build_kernel(def: &KernelDef, config: &KernelConfig) -> Kernel {
    let kernel = def.build(config).unwrap_or_else(|diag| fail(&diag));
    for warning in &kernel.warnings {
        eprintln!("{}", warning);
    }
    kernel
}

fn fail(diag: &Diagnostic) -> ! {
    eprintln!("{}", diag);
    process::exit(1);
}
