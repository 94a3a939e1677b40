//! The scripted walk through the primitives.

use std::process::ExitCode;

use memtag_core::granule::is_granule_multiple;
use memtag_core::{ExcludeMask, GRANULE_SIZE, MAX_TAG, region, tag};

use crate::Cli;
use crate::setup::{self, SetupError, TaggedMapping, TaggingMode};
use crate::signal;

pub fn run(cli: &Cli) -> ExitCode {
    if !is_granule_multiple(cli.region_size) || cli.region_size < 3 * GRANULE_SIZE {
        eprintln!("--region-size must be a granule multiple of at least 48");
        return ExitCode::FAILURE;
    }
    if !setup::mte_supported() {
        eprintln!("kernel reports no MTE support (HWCAP2_MTE clear)");
        return ExitCode::FAILURE;
    }
    match walk(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("setup failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn walk(cli: &Cli) -> Result<(), SetupError> {
    println!("== memtag demonstration ==");

    let mode = if cli.async_faults { TaggingMode::Async } else { TaggingMode::Sync };
    setup::enable(mode)?;
    signal::install()?;
    println!("tag checking enabled ({mode:?} fault delivery)");

    let mapping = TaggedMapping::new(cli.region_size)?;
    let base = mapping.ptr();
    println!("mapped {} tagged bytes at {base:p}", mapping.len());
    println!("tag from mmap: {}", tag::decode(base));

    // SAFETY: MTE support was verified above; `base` is a fresh PROT_MTE
    // mapping owned by `mapping` for the rest of this function; nothing
    // else touches it.
    unsafe {
        println!("\n-- bulk tagging --");
        let p = tag::random(base, ExcludeMask::empty());
        println!("random tag: {}", tag::decode(p));
        region::tag(p, mapping.len());
        p.cast::<u64>().write(2);
        println!("wrote and read back {:#x} through the tagged pointer", p.cast::<u64>().read());

        println!("\n-- zero and tag --");
        let p = tag::random(p, ExcludeMask::empty().with_pointer_tag(p));
        println!("fresh tag: {}", tag::decode(p));
        region::zero_and_tag(p, mapping.len());
        let last = mapping.len() / 8 - 1;
        println!(
            "first qword = {:#x}, last qword = {:#x}",
            p.cast::<u64>().read(),
            p.cast::<u64>().add(last).read(),
        );

        println!("\n-- copy and tag --");
        let greeting = b"BigFuSomaysHello";
        p.copy_from_nonoverlapping(greeting.as_ptr(), greeting.len());
        let dst = tag::random(p.add(2 * GRANULE_SIZE), ExcludeMask::empty().with_pointer_tag(p));
        region::copy_and_tag(dst, p, GRANULE_SIZE);
        println!(
            "copied {:?} to {dst:p} (tag {}), stored tag now {}",
            core::str::from_utf8(core::slice::from_raw_parts(dst, greeting.len())).unwrap_or("?"),
            tag::decode(dst),
            tag::decode(tag::stored(dst)),
        );

        println!("\n-- exclusion guarantee --");
        let forbidden = tag::decode(dst);
        let mask = ExcludeMask::empty().with_tag(forbidden);
        println!("{} rounds with tag {forbidden} excluded...", cli.exclusion_rounds);
        for round in 0..cli.exclusion_rounds {
            let produced = tag::decode(tag::random(dst, mask));
            if produced == forbidden {
                println!("!!! round {round} produced excluded tag {produced} !!!");
                return Ok(());
            }
        }
        println!("excluded tag was never produced");

        if cli.skip_fault {
            println!("\nskipping the deliberate mismatched access");
            return Ok(());
        }

        println!("\n-- deliberate mismatch --");
        let violator = tag::encode(p, MAX_TAG);
        println!("reading through {violator:p} (tag {}, never stored)...", MAX_TAG);
        let value = violator.cast::<u64>().read_volatile();
        // Only reachable when tag checking is not actually enforcing.
        println!("survived the mismatched access, read {value:#x}");
    }

    Ok(())
}
