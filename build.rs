pub fn main() {
    println!("cargo:rerun-if-env-changed=CUDA_PATH");
    println!("cargo:rerun-if-env-changed=OPENCL_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_OPENCL").is_some() {
        include_opencl();
    }
}

fn include_opencl() {
    use camino::Utf8PathBuf;

    if let Ok(dir) = std::env::var("OPENCL_LIB_DIR") {
        let path = Utf8PathBuf::from(dir);
        println!("cargo:rustc-link-search={path}");
        return;
    }

    if std::env::var_os("CARGO_CFG_WINDOWS").is_some() {
        if let Ok(path) = std::env::var("CUDA_PATH") {
            let lib = Utf8PathBuf::from(path).join("lib");
            let path = match std::env::var("CARGO_CFG_TARGET_POINTER_WIDTH").as_deref() {
                Ok("32") => lib.join("Win32"),
                _ => lib.join("x64"),
            };
            println!("cargo:rustc-link-search={path}");
        } else {
            println!("cargo:warning=OpenCL library path not found. This may result in a link error on Windows systems.");
        }
    }
}
