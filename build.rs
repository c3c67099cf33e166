//! Build script for detecting system dependencies and providing installation guidance.
//!
//! The viewer links against OpenCV's `videoio`, `highgui` and `imgproc` modules.
//! Missing pieces are reported as cargo warnings instead of failing the build so
//! that the `opencv` crate's own probe produces the authoritative error.

use std::process::Command;

/// OpenCV modules the player needs at runtime
const REQUIRED_MODULES: [&str; 3] = ["opencv_videoio", "opencv_highgui", "opencv_imgproc"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if check_pkg_config() {
        check_opencv();
    }
}

fn pkg_config(args: &[&str]) -> Option<String> {
    let output = Command::new("pkg-config").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn check_opencv() {
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    // Distributions ship either opencv4.pc or the older opencv.pc
    let Some(package) = ["opencv4", "opencv"]
        .into_iter()
        .find(|name| pkg_config(&["--exists", name]).is_some())
    else {
        println!("cargo:warning=OpenCV not found via pkg-config. Make sure OpenCV is installed.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev");
        println!("cargo:warning=On macOS: brew install opencv");
        return;
    };

    if let Some(version) = pkg_config(&["--modversion", package]) {
        println!("cargo:warning=Found OpenCV version: {version}");
    }

    let libs = pkg_config(&["--libs", package]).unwrap_or_default();
    for module in REQUIRED_MODULES {
        if !libs.contains(module) {
            println!("cargo:warning=OpenCV module {module} not listed by pkg-config; video playback may fail");
        }
    }
}

fn check_pkg_config() -> bool {
    if pkg_config(&["--version"]).is_some() {
        true
    } else {
        println!("cargo:warning=pkg-config not found. This is required to find system libraries.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
        println!("cargo:warning=On macOS: brew install pkg-config");
        false
    }
}
