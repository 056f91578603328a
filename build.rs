use std::env;
use std::path::{Path, PathBuf};

const WATCHED_VARIABLES: [&str; 5] = [
    "FFMPEG_DIR",
    "PKG_CONFIG_PATH",
    "VCPKG_ROOT",
    "VCPKGRS_DYNAMIC",
    "VCPKGRS_TRIPLET",
];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    match env::var("CARGO_CFG_TARGET_OS").unwrap_or_default().as_str() {
        "windows" => windows_hint(),
        "macos" => macos_hint(),
        _ => {}
    }
}

fn windows_hint() {
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=gifcast needs FFmpeg. Install it with `vcpkg install ffmpeg` and set FFMPEG_DIR to the installed triplet directory."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install = PathBuf::from(vcpkg_root).join("installed").join(&triplet);
    if !install.join("include").join("libavcodec").exists() {
        println!(
            "cargo:warning=No FFmpeg headers under {}; run `vcpkg install ffmpeg:{triplet}`.",
            install.display()
        );
        return;
    }

    println!(
        "cargo:warning=Using vcpkg FFmpeg at {0}. Set FFMPEG_DIR={0} to silence this message.",
        install.display()
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() && triplet.ends_with("windows") {
        println!("cargo:warning=Dynamic vcpkg triplets need VCPKGRS_DYNAMIC=1.");
    }
}

fn macos_hint() {
    if env::var_os("PKG_CONFIG_PATH").is_some() {
        return;
    }
    for prefix in ["/opt/homebrew/opt/ffmpeg", "/usr/local/opt/ffmpeg"] {
        let pkgconfig = Path::new(prefix).join("lib").join("pkgconfig");
        if pkgconfig.exists() {
            println!(
                "cargo:warning=Homebrew FFmpeg found at {prefix}. If linking fails, export PKG_CONFIG_PATH={}.",
                pkgconfig.display()
            );
            return;
        }
    }
}
