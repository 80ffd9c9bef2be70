use serde::Deserialize;

/// Values accepted in `syncprobe.toml` / `syncprobe.json`.
///
/// Every field is optional; a value only applies when the matching flag was
/// not given on the command line.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(alias = "clients")]
    pub nclients: Option<usize>,
    pub duration: Option<u64>,
    pub interval: Option<u64>,
    pub jitter_ms: Option<u64>,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub out_dir: Option<String>,
    pub max_connects: Option<usize>,
    pub verbose: Option<bool>,
    pub no_color: Option<bool>,
}
