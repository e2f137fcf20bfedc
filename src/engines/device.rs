//! Compute device selection.
//!
//! Probed once at engine load: prefer an accelerated device when the
//! platform advertises one, fall back to plain CPU. `AUDIOGEN_DEVICE`
//! forces the choice for testing and for machines where the probe guesses
//! wrong.

use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Metal,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => write!(f, "cuda"),
            Device::Metal => write!(f, "metal"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

/// Pick the compute device for this process.
pub fn probe() -> Device {
    if let Ok(forced) = std::env::var("AUDIOGEN_DEVICE") {
        if let Some(device) = parse(&forced) {
            return device;
        }
    }

    if cfg!(target_os = "macos") {
        return Device::Metal;
    }
    if Path::new("/proc/driver/nvidia/version").exists() {
        return Device::Cuda;
    }
    Device::Cpu
}

fn parse(name: &str) -> Option<Device> {
    match name.trim().to_ascii_lowercase().as_str() {
        "cuda" => Some(Device::Cuda),
        "metal" | "mps" => Some(Device::Metal),
        "cpu" => Some(Device::Cpu),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        assert_eq!(parse("cuda"), Some(Device::Cuda));
        assert_eq!(parse("MPS"), Some(Device::Metal));
        assert_eq!(parse(" cpu "), Some(Device::Cpu));
        assert_eq!(parse("tpu"), None);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Device::Cuda.to_string(), "cuda");
        assert_eq!(Device::Cpu.to_string(), "cpu");
    }
}
