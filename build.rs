//! Build script for button-envoy.
//!
//! Host builds need nothing. For the Pico 1 (thumbv6m) demos it writes `memory.x`
//! and passes the cortex-m-rt, embassy-rp and defmt linker scripts.

use std::{env, fs, path::PathBuf};

const MEMORY_PICO1: &str = r"MEMORY {
    BOOT2 : ORIGIN = 0x10000000, LENGTH = 0x100
    FLASH : ORIGIN = 0x10000100, LENGTH = 2048K - 0x100
    RAM   : ORIGIN = 0x20000000, LENGTH = 256K
}

EXTERN(BOOT2_FIRMWARE)

SECTIONS {
    .boot2 ORIGIN(BOOT2) :
    {
        KEEP(*(.boot2));
    } > BOOT2
} INSERT BEFORE .text;
";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let target = env::var("TARGET").unwrap();
    if !target.starts_with("thumbv6m") {
        return;
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("memory.x"), MEMORY_PICO1).expect("Failed to write memory.x");
    println!("cargo:rustc-link-search={}", out_dir.display());

    for arg in ["--nmagic", "-Tlink.x", "-Tlink-rp.x", "-Tdefmt.x"] {
        println!("cargo:rustc-link-arg-bins={arg}");
    }
}
