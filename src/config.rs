//! Import configuration.

use serde::{Deserialize, Serialize};

use crate::index::ArrayLayout;
use crate::{Error, Result};

/// Knobs for one import run.
///
/// Every field has a default matching the usual acquisition setup (16-channel
/// arrays, `LFP*` field signals, `Stm+`/`Stm-` stimulus markers), so a JSON
/// config only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Fixed array count. `None` infers it from the field channels of the
    /// first segment that creates a site.
    pub num_arrays: Option<usize>,
    pub channels_per_array: u32,
    /// Case-insensitive name prefix of field-potential signals.
    pub field_signal_prefix: String,
    pub onset_event: String,
    pub offset_event: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            num_arrays: None,
            channels_per_array: 16,
            field_signal_prefix: "LFP".into(),
            onset_event: "Stm+".into(),
            offset_event: "Stm-".into(),
        }
    }
}

impl ImportConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_num_arrays(mut self, num_arrays: usize) -> Self {
        self.num_arrays = Some(num_arrays);
        self
    }

    pub fn with_channels_per_array(mut self, channels_per_array: u32) -> Self {
        self.channels_per_array = channels_per_array;
        self
    }

    pub fn with_field_signal_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.field_signal_prefix = prefix.into();
        self
    }

    pub fn with_event_names(mut self, onset: impl Into<String>, offset: impl Into<String>) -> Self {
        self.onset_event = onset.into();
        self.offset_event = offset.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.channels_per_array == 0 {
            return Err(Error::InvalidConfig("channels_per_array must be positive".into()));
        }
        if self.num_arrays == Some(0) {
            return Err(Error::InvalidConfig("num_arrays must be positive when given".into()));
        }
        if let Some(layout) = self.fixed_layout()
            && layout.capacity().is_none()
        {
            return Err(Error::InvalidConfig(format!(
                "{} arrays of {} channels exceed the channel index range",
                layout.num_arrays, layout.channels_per_array
            )));
        }
        if self.onset_event.is_empty() || self.offset_event.is_empty() {
            return Err(Error::InvalidConfig("stimulus event names must not be empty".into()));
        }
        Ok(())
    }

    /// The fixed layout, if the array count is configured.
    pub fn fixed_layout(&self) -> Option<ArrayLayout> {
        self.num_arrays.map(|n| ArrayLayout::new(n, self.channels_per_array))
    }
}
