pub mod ask;
pub mod doctor;
pub mod prompt;
pub mod serve;
pub mod status;

use std::path::Path;

use gitscribe_config::AppConfig;

pub(crate) fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load_with(path).map_err(|e| format!("Failed to load config: {e}").into())
}
