use std::env;
use std::path::PathBuf;

fn main() {
    let nextver_version = calculate_nextver_version();
    println!(
        "cargo:rustc-env=NEXTVER_CALCULATED_VERSION={}",
        nextver_version
    );

    // shadow-rs generates extended build metadata (git hash, timestamps, rustc version)
    shadow_rs::ShadowBuilder::builder()
        .build()
        .expect("shadow-rs build failed");
}

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    manifest_dir
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn calculate_nextver_version() -> String {
    let work_dir = workspace_root();
    let config = nextver::Config {
        increment: nextver::version::IncrementField::Patch,
        ..nextver::Config::default()
    };

    match nextver::calculate_version_with_fallback(&work_dir, &config) {
        Ok(result) => result.version.to_string(),
        Err(_) => env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0-dev".to_string()),
    }
}
