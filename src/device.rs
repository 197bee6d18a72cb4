//! Execution placement tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::data::loader::Batch;
use crate::error::{Error, Result};

/// Where a batch should be computed. Only the CPU backend exists; asking for
/// an accelerator fails instead of silently falling back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
}

impl Device {
    /// Moves a batch onto this device.
    pub fn place(&self, batch: Batch) -> Result<Batch> {
        match self {
            Device::Cpu => Ok(batch),
            other => Err(Error::DeviceUnavailable(*other)),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(index) => write!(f, "cuda:{}", index),
        }
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Device> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda(0)),
            _ => s.strip_prefix("cuda:")
                .and_then(|idx| idx.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| Error::InvalidConfig(format!("unknown device '{}'", s))),
        }
    }
}

impl Serialize for Device {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Device {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Device, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::Matrix;

    #[test]
    fn parses_and_displays() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:2".parse::<Device>().unwrap(), Device::Cuda(2));
        assert!("tpu".parse::<Device>().is_err());
        assert_eq!(Device::Cuda(1).to_string(), "cuda:1");
    }

    #[test]
    fn accelerator_placement_fails_without_fallback() {
        let batch = Batch { inputs: Matrix::zeros(1, 2), labels: vec![0] };
        assert!(Device::Cpu.place(batch.clone()).is_ok());
        assert!(matches!(Device::Cuda(0).place(batch), Err(Error::DeviceUnavailable(Device::Cuda(0)))));
    }

    #[test]
    fn serde_uses_string_form() {
        assert_eq!(serde_json::to_string(&Device::Cuda(3)).unwrap(), "\"cuda:3\"");
        let d: Device = serde_json::from_str("\"cpu\"").unwrap();
        assert_eq!(d, Device::Cpu);
    }
}
