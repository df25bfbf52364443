//! Command-Line Interface (CLI) argument parsing.
//!
//! The flags are optional overrides. They are merged on top of the defaults,
//! the TOML file and the environment, so the relay can still be configured
//! entirely through `NTFY_*` and `LISTEN_*` variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Relays webhook alerts to an ntfy server.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to bind the relay listener to.
    #[arg(long, value_name = "HOST")]
    pub listen_host: Option<String>,

    /// Port to bind the relay listener to.
    #[arg(long, value_name = "PORT")]
    pub listen_port: Option<u16>,

    /// Logging filter directive, e.g. `debug` or `ntfy_relay=trace`.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(host) = &self.listen_host {
            dict.insert("server.listen_host".into(), Value::from(host.clone()));
        }

        if let Some(port) = self.listen_port {
            dict.insert("server.listen_port".into(), Value::from(u64::from(port)));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, nest(dict));
        Ok(map)
    }
}

/// Expands dotted keys into nested dictionaries.
fn nest(flat: Dict) -> Dict {
    let mut root = Dict::new();
    for (key, value) in flat {
        match key.split_once('.') {
            Some((section, field)) => {
                let entry = root
                    .entry(section.to_string())
                    .or_insert_with(|| Value::from(Dict::new()));
                if let Value::Dict(_, dict) = entry {
                    dict.insert(field.to_string(), value);
                }
            }
            None => {
                root.insert(key, value);
            }
        }
    }
    root
}
