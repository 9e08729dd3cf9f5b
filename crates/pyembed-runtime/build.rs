use std::env;

fn main() {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let config = pyo3_build_config::get();

    println!("cargo:rerun-if-env-changed=PYO3_PYTHON");
    println!("cargo:rerun-if-env-changed=PYO3_CONFIG_FILE");

    // Emit metadata for consuming crates via the `links` mechanism.
    // Crates that depend on pyembed-runtime can read:
    //   DEP_PYEMBED_RUNTIME_PYTHON_LIB_DIR: directory containing libpython
    //   DEP_PYEMBED_RUNTIME_PYTHON_VERSION: major.minor of the linked interpreter
    println!("cargo:python_version={}", config.version);

    let Some(lib_dir) = config.lib_dir.as_deref() else {
        return;
    };
    println!("cargo:python_lib_dir={lib_dir}");

    // Tests, benches and examples of this package load a shared libpython at
    // run time; point the loader at the directory the interpreter reported.
    if config.shared && target_os != "windows" {
        println!("cargo:rustc-link-arg=-Wl,-rpath,{lib_dir}");
    }
}
