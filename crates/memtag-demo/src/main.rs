//! Demonstration program for `memtag-core`.
//!
//! Walks every primitive against a real MTE-capable kernel: process
//! enablement, random tagging, the three bulk operations, the exclusion
//! guarantee, and finally a deliberate mismatched access that the hardware
//! must fault. The library itself never performs any of the setup done
//! here; this program is the collaborator the core's contract describes.

use std::process::ExitCode;

use clap::Parser;

#[cfg(all(target_arch = "aarch64", target_os = "linux"))]
mod scenario;
#[cfg(all(target_arch = "aarch64", target_os = "linux"))]
mod setup;
#[cfg(all(target_arch = "aarch64", target_os = "linux"))]
mod signal;

/// Exercise the MTE primitives end to end.
#[derive(Debug, Parser)]
#[command(name = "memtag-demo")]
#[command(about = "Demonstration of the memtag-core MTE primitives")]
struct Cli {
    /// Size of the tagged mapping, in bytes (must be a granule multiple).
    #[arg(long, default_value_t = 4096)]
    region_size: usize,

    /// Rounds of random generation for the exclusion check.
    #[arg(long, default_value_t = 1000)]
    exclusion_rounds: u32,

    /// Deliver tag faults asynchronously instead of synchronously.
    #[arg(long)]
    async_faults: bool,

    /// Stop before the deliberate tag-mismatch access.
    #[arg(long)]
    skip_fault: bool,
}

fn main() -> ExitCode {
    run(Cli::parse())
}

#[cfg(all(target_arch = "aarch64", target_os = "linux"))]
fn run(cli: Cli) -> ExitCode {
    scenario::run(&cli)
}

#[cfg(not(all(target_arch = "aarch64", target_os = "linux")))]
fn run(_cli: Cli) -> ExitCode {
    eprintln!("memtag-demo requires aarch64 Linux with MTE");
    ExitCode::FAILURE
}
