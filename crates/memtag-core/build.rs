fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/insn/acle_shim.c");

    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let acle_backend = std::env::var_os("CARGO_FEATURE_DISABLE_INLINE_MACHINE_CODE").is_some();

    // The shim only exists for the intrinsic backend, and the intrinsic
    // backend only exists on aarch64.
    if target_arch == "aarch64" && acle_backend {
        cc::Build::new()
            .file("src/insn/acle_shim.c")
            .flag("-march=armv8.5-a+memtag")
            .compile("memtag_acle_shim");
    }
}
