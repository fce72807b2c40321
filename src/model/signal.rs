//! Raw per-segment records as delivered by a recording source.

use serde::{Deserialize, Serialize};

/// A continuous sampled signal on one hardware channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogSignal {
    /// Signal kind as named by the acquisition system (e.g. `"LFP1"`).
    pub name: String,
    pub channel_index: u32,
    /// Hz
    pub sampling_rate: f64,
    /// Seconds
    pub t_start: f64,
    #[serde(with = "super::samples")]
    pub samples: Vec<f32>,
}

impl AnalogSignal {
    pub fn new(name: impl Into<String>, channel_index: u32) -> Self {
        Self {
            name: name.into(),
            channel_index,
            sampling_rate: 0.0,
            t_start: 0.0,
            samples: Vec::new(),
        }
    }

    pub fn with_samples(mut self, sampling_rate: f64, samples: Vec<f32>) -> Self {
        self.sampling_rate = sampling_rate;
        self.samples = samples;
        self
    }

    /// Whether this is a field-potential signal under the given prefix (case-insensitive).
    pub fn is_field_signal(&self, prefix: &str) -> bool {
        self.name
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }
}

/// Spike timestamps from one sorted source. The sort code is embedded in `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeTrain {
    /// e.g. `"Chan3Code1"`
    pub name: String,
    pub channel_index: u32,
    /// Seconds
    #[serde(with = "super::samples")]
    pub times: Vec<f64>,
    pub t_stop: f64,
}

impl SpikeTrain {
    pub fn new(name: impl Into<String>, channel_index: u32, times: Vec<f64>) -> Self {
        let t_stop = times.iter().copied().fold(0.0, f64::max);
        Self { name: name.into(), channel_index, times, t_stop }
    }
}

/// A named stream of labelled event markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventArray {
    /// e.g. `"Stm+"`
    pub name: String,
    pub labels: Vec<String>,
    /// Seconds
    #[serde(with = "super::samples")]
    pub times: Vec<f64>,
}

impl EventArray {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), labels: Vec::new(), times: Vec::new() }
    }

    pub fn with_event(mut self, label: impl Into<String>, time: f64) -> Self {
        self.labels.push(label.into());
        self.times.push(time);
        self
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// One flat, time-ordered recording segment before reorganization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    /// Free text with embedded site/depth/protocol metadata,
    /// e.g. `"Site3_L1200R900_e21_BOS"`.
    pub name: String,
    pub analog_signals: Vec<AnalogSignal>,
    pub spike_trains: Vec<SpikeTrain>,
    pub event_arrays: Vec<EventArray>,
}

impl RawSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn with_analog_signal(mut self, signal: AnalogSignal) -> Self {
        self.analog_signals.push(signal);
        self
    }

    pub fn with_spike_train(mut self, train: SpikeTrain) -> Self {
        self.spike_trains.push(train);
        self
    }

    pub fn with_event_array(mut self, events: EventArray) -> Self {
        self.event_arrays.push(events);
        self
    }

    /// First event array with the given name.
    pub fn event_array(&self, name: &str) -> Option<&EventArray> {
        self.event_arrays.iter().find(|e| e.name == name)
    }
}
