use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Version comes from the environment, a VERSION file, or the fallback
    let version = if let Ok(v) = env::var("LADLE_VERSION") {
        v
    } else {
        let version_file = Path::new("VERSION");
        if version_file.exists() {
            fs::read_to_string(version_file)
                .unwrap_or_else(|_| "0.1.0".to_string())
                .trim()
                .to_string()
        } else {
            "0.1.0".to_string()
        }
    };

    println!("cargo:rustc-env=LADLE_VERSION={}", version);
    println!("cargo:rerun-if-changed=VERSION");
    println!("cargo:rerun-if-env-changed=LADLE_VERSION");
}
