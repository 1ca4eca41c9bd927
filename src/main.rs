use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

use cli::build::cmd_build_all;
use cli::emit::{cmd_dot, cmd_emit, cmd_manifest};
use cli::list::{cmd_intrinsics, cmd_list};

#[derive(Parser)]
#[command(
    name = "sjit",
    version,
    about = "sjit: typed expression graphs to HLSL compute kernels"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in kernels
    List,
    /// Generate a kernel and print or write its HLSL
    Emit {
        /// Kernel name (see `sjit list`)
        name: String,
        /// Output .hlsl file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Kernel config: a TOML path or a name under kernels/
        #[arg(long, value_name = "CONFIG")]
        config: Option<String>,
        /// Lower branches with wave32 lane masks
        #[arg(long)]
        wave32: bool,
    },
    /// Print the resource-binding manifest of a kernel as JSON
    Manifest {
        /// Kernel name
        name: String,
        /// Kernel config: a TOML path or a name under kernels/
        #[arg(long, value_name = "CONFIG")]
        config: Option<String>,
    },
    /// Print the expression graph of a kernel in Graphviz format
    Dot {
        /// Kernel name
        name: String,
    },
    /// Generate every built-in kernel into the kernel cache
    BuildAll {
        /// Cache directory (default: $SJIT_CACHE_DIR or ~/.sjit/cache)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
    /// List the standard intrinsic table
    Intrinsics,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::List => cmd_list(),
        Command::Emit {
            name,
            output,
            config,
            wave32,
        } => cmd_emit(&name, output, config.as_deref(), wave32),
        Command::Manifest { name, config } => cmd_manifest(&name, config.as_deref()),
        Command::Dot { name } => cmd_dot(&name),
        Command::BuildAll { out } => cmd_build_all(out),
        Command::Intrinsics => cmd_intrinsics(),
    }
}
