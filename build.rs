use std::{env, path::PathBuf};

/// Environment variables that change how `ffmpeg-sys-next` finds FFmpeg.
const DISCOVERY_VARIABLES: [&str; 5] = [
    "FFMPEG_DIR",
    "PKG_CONFIG_PATH",
    "VCPKG_ROOT",
    "VCPKGRS_DYNAMIC",
    "VCPKGRS_TRIPLET",
];

fn main() {
    for variable in DISCOVERY_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // pkg-config handles discovery everywhere but Windows.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=framesource needs the FFmpeg development libraries. On Windows, install them with vcpkg and set FFMPEG_DIR."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install_dir = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if !install_dir.exists() {
        println!(
            "cargo:warning=VCPKG_ROOT is set but {} does not exist; FFmpeg discovery will likely fail.",
            install_dir.display()
        );
        return;
    }

    println!(
        "cargo:warning=Using vcpkg FFmpeg at {}. Set FFMPEG_DIR to this path to silence this warning.",
        install_dir.display()
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=Set VCPKGRS_DYNAMIC=1 when vcpkg provides dynamic FFmpeg libraries.");
    }
}
