use std::env;

fn main() {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    // Published by crates/pyembed-runtime/build.rs through its `links` key.
    println!("cargo:rerun-if-env-changed=DEP_PYEMBED_RUNTIME_PYTHON_LIB_DIR");
    println!("cargo:rerun-if-env-changed=DEP_PYEMBED_RUNTIME_PYTHON_VERSION");

    let version = env::var("DEP_PYEMBED_RUNTIME_PYTHON_VERSION").unwrap_or_default();
    println!("cargo:rustc-env=PYEMBED_LINKED_PYTHON={version}");

    // The `pyembed` binary and the integration tests need libpython on the
    // loader path; reuse the directory the runtime crate discovered.
    if target_os == "windows" {
        return;
    }
    if let Ok(lib_dir) = env::var("DEP_PYEMBED_RUNTIME_PYTHON_LIB_DIR") {
        println!("cargo:rustc-link-arg=-Wl,-rpath,{lib_dir}");
    }
}
