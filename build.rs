use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Create config template if it doesn't exist
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| "./".to_string());
    let template_path = Path::new(&out_dir).join("../../../config.template.toml");

    let template = r#"# ESSET Configuration Template
# Copy this file to 'config.toml' and adjust the values

# Preferred audio/subtitle languages (ISO 639-2), most preferred first
languages = "eng"

# Minimum milliseconds between continuity-error warnings of one stream
cc_log_interval_ms = 10000
"#;

    let _ = fs::write(template_path, template);
    println!("cargo:rerun-if-changed=build.rs");
}
