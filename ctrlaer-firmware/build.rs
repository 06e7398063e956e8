//! Build script for ctrlaer-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates ctrlaer.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use ctrlaer_core::config::{ConfigError, EngineConfig, RunConfig};
use serde::Deserialize;

/// Layout of ctrlaer.toml, mirrored by the firmware's runtime parser
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    engine: EngineConfig,
    run: RunConfig,
    link: LinkConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LinkConfig {
    baud_rate: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { baud_rate: 115_200 }
    }
}

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate ctrlaer.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=ctrlaer.toml");

    let config_path = Path::new("ctrlaer.toml");
    if !config_path.exists() {
        fail("ctrlaer.toml not found", &["Create one in the ctrlaer-firmware directory.".into()]);
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read ctrlaer.toml", &[e.to_string()]),
    };

    let config: FileConfig = match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => fail(
            "Invalid ctrlaer.toml",
            &e.to_string().lines().map(String::from).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();

    if let Err(e) = config.engine.validate(config.run.encoding) {
        errors.push(describe(e, &config));
    }
    if config.engine.base_pin < 2 {
        errors.push("[engine] GPIO0 and GPIO1 are reserved for the UART0 command link".into());
    }
    if config.link.baud_rate == 0 {
        errors.push("[link] baud_rate must be non-zero".into());
    }

    if !errors.is_empty() {
        fail("Invalid engine configuration in ctrlaer.toml", &errors);
    }

    println!("cargo:warning=ctrlaer.toml validated successfully");
}

/// Human-readable form of a configuration error
fn describe(error: ConfigError, config: &FileConfig) -> String {
    match error {
        ConfigError::TooManyChannels { channels, max } => format!(
            "[engine] pin_count {} exceeds {} channels for {:?}",
            channels, max, config.run.encoding
        ),
        ConfigError::InvalidStateMachine(sm) => {
            format!("[engine] state_machine {} out of range (0-7)", sm)
        }
        ConfigError::InvalidPinRange => format!(
            "[engine] pins {}..{} must be non-empty and end at GPIO29",
            config.engine.base_pin,
            config.engine.base_pin as u16 + config.engine.pin_count as u16
        ),
        ConfigError::ZeroFrequency => "[engine] frequency_hz must be non-zero".into(),
        other => format!("[engine] {:?}", other),
    }
}

/// Abort the build with a boxed error listing
fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        lines
            .iter()
            .map(|line| {
                let truncated = if line.len() > 62 {
                    format!("{}...", &line[..59])
                } else {
                    line.clone()
                };
                format!("║  • {:<62} ║", truncated)
            })
            .collect::<Vec<_>>()
            .join("\n")
    );
}
