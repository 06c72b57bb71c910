fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=device.x");

    #[cfg(feature = "kl27")]
    {
        use std::{env, fs, path::PathBuf};

        // MKL27Z64 内存布局，交给 cortex-m-rt 的 link.x
        let out = PathBuf::from(env::var_os("OUT_DIR").unwrap_or_default());
        fs::write(out.join("memory.x"), include_bytes!("memory.x"))?;
        // link.x 在 `device` 特性下 INCLUDE device.x
        fs::write(out.join("device.x"), include_bytes!("device.x"))?;
        println!("cargo:rustc-link-search={}", out.display());
        println!("cargo:rustc-link-arg=-Tlink.x");
        println!("cargo:rustc-link-arg=-Tdefmt.x");
    }

    Ok(())
}
