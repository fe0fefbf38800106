//! Sample consumer: loads every config type listed in a manifest and logs what it found.
//!
//! Run from repo root: `cargo run -p sample-consumer`
//! Resources default to `res/`; override with `TABULAR_RES_DIR` and `TABULAR_MANIFEST`.

use serde::Deserialize;
use tabular_sdk::{load_manifest, FsReader, Registry, Settings};

#[derive(Debug, Deserialize)]
struct Global {
    #[serde(rename = "Factor")]
    factor: f64,
    #[serde(rename = "Price")]
    price: i64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tabular_sdk=info,sample_consumer=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let manifest = std::fs::read_to_string(settings.manifest_path())?;
    let types = load_manifest(&manifest)?;

    let mut registry = Registry::with_settings(FsReader::new(&settings.resource_dir), &settings);
    registry.register_all(types)?;
    if let Err(e) = registry.load_all() {
        for failure in e.load_errors() {
            tracing::error!(error = %failure, "config type failed");
        }
        return Err(e.into());
    }

    for name in registry.type_names() {
        let count = registry.store(name)?.len();
        tracing::info!(type_name = name, entities = count, "loaded");
    }
    if registry.config_type("Drop").is_some() {
        let waves = registry.range("Drop", &["1"])?.len();
        tracing::info!(stage = 1, waves, "drop table");
    }
    if registry.config_type("Global").is_some() {
        let global: Global = registry.get_instance_typed("Global")?;
        tracing::info!(factor = global.factor, price = global.price, "global settings");
    }
    Ok(())
}
