use std::env;
use std::fs;
use std::path::PathBuf;

// Records the cargo features this build was compiled with so the crate can
// report them at startup.
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    let mut enabled: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_")
                .map(|name| name.to_ascii_lowercase().replace('_', "-"))
        })
        .collect();
    enabled.sort();
    let quoted: Vec<String> = enabled.iter().map(|f| format!("\"{f}\"")).collect();
    let body = format!(
        "pub static COMPILED_FEATURES: &[&str] = &[{}];\n",
        quoted.join(", ")
    );
    fs::write(out_dir.join("compiled_features.rs"), body).expect("write compiled_features.rs");
}
