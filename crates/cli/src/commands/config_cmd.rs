//! `panelwire config`: show configuration.

use anyhow::Context;
use panelwire_config::ClientConfig;

pub fn run(path: bool, effective: bool) -> anyhow::Result<()> {
    if path {
        println!("{}", ClientConfig::config_dir().join("config.toml").display());
        return Ok(());
    }

    if effective {
        let config = ClientConfig::load().context("Failed to load config")?;
        println!("{}", toml::to_string_pretty(&config)?);
        println!("# endpoint host: {}", config.host());
        return Ok(());
    }

    print!("{}", ClientConfig::default_toml());
    Ok(())
}
