use serde::{Deserialize, Serialize};

use p12_data_formats::{
    constants::{DEFAULT_ITER, DEFAULT_MAC_ITER},
    ExportOptions,
};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BundleToolSettings {
    #[serde(default)]
    pub export: ExportSettings,
}

/// Defaults for archives written by the bundle tool.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub iterations: Option<i32>,
    // -1 disables the MAC
    pub mac_iterations: Option<i32>,
    pub friendly_name: Option<String>,
}

impl ExportSettings {
    pub fn to_options(&self) -> ExportOptions {
        let mut options = ExportOptions::new()
            .iterations(self.iterations.unwrap_or(DEFAULT_ITER))
            .mac_iterations(self.mac_iterations.unwrap_or(DEFAULT_MAC_ITER));
        if let Some(friendly_name) = &self.friendly_name {
            options = options.friendly_name(friendly_name);
        }
        options
    }
}
