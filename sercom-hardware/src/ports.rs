//! Serial port discovery
//!
//! Candidate names come from a fixed, platform-specific name space. Each
//! candidate is then opened and closed once; only ports that survive the
//! probe are reported.

use sercom_core::{Result, SercomError};
use std::path::Path;
use tracing::debug;

/// Number of `COMn` names tried on Windows
pub const WINDOWS_COM_PORT_COUNT: u16 = 256;

/// Baud rate used for liveness probes; the value is irrelevant to open+close
const PROBE_BAUD_RATE: u32 = 9600;

/// Device-naming family of the host operating system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    /// `COM1` .. `COM256`
    Windows,
    /// `/dev/tty[A-Za-z]*`
    Linux,
    /// `/dev/tty.*`
    Darwin,
    /// Anything else; enumeration is refused
    Unsupported(String),
}

impl Platform {
    /// Classify an OS name as reported by `std::env::consts::OS`
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "linux" | "android" | "cygwin" => Platform::Linux,
            "macos" | "ios" => Platform::Darwin,
            other => Platform::Unsupported(other.to_string()),
        }
    }

    /// Platform of the running process
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }
}

/// List the candidate port names for `platform`.
///
/// On POSIX platforms `dev_dir` is scanned (normally `/dev`) and the matches
/// are returned sorted by name. Linux candidates must have a letter right
/// after `tty`, which leaves out the controlling terminal `/dev/tty` and the
/// numbered virtual consoles.
pub fn candidate_ports(platform: &Platform, dev_dir: &Path) -> Result<Vec<String>> {
    match platform {
        Platform::Windows => Ok((1..=WINDOWS_COM_PORT_COUNT)
            .map(|i| format!("COM{}", i))
            .collect()),
        Platform::Linux => scan_dev_dir(dev_dir, |name| {
            name.strip_prefix("tty")
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_alphabetic())
        }),
        Platform::Darwin => scan_dev_dir(dev_dir, |name| name.starts_with("tty.")),
        Platform::Unsupported(os) => Err(SercomError::UnsupportedPlatform(os.clone())),
    }
}

fn scan_dev_dir(dev_dir: &Path, matches: impl Fn(&str) -> bool) -> Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dev_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| matches(name.as_str()))
        .map(|name| dev_dir.join(name).to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

/// Keep the candidates for which `probe` succeeds, in their original order.
///
/// Probe failures are expected for absent or busy devices and are dropped.
pub fn probe_ports<P>(candidates: Vec<String>, probe: P) -> Vec<String>
where
    P: Fn(&str) -> Result<()>,
{
    candidates
        .into_iter()
        .filter(|name| match probe(name) {
            Ok(()) => true,
            Err(e) => {
                debug!("Skipping port {}: {}", name, e);
                false
            }
        })
        .collect()
}

/// Open and immediately close `port_name`
pub fn probe_port(port_name: &str) -> Result<()> {
    let port = serialport::new(port_name, PROBE_BAUD_RATE)
        .open()
        .map_err(|e| SercomError::Connection {
            port: port_name.to_string(),
            reason: e.to_string(),
        })?;
    drop(port);
    Ok(())
}

/// List serial ports on this machine that can actually be opened.
///
/// # Errors
///
/// Returns `UnsupportedPlatform` on operating systems without a known device
/// naming scheme, or an I/O error if the device directory cannot be read.
pub fn list_candidate_ports() -> Result<Vec<String>> {
    let candidates = candidate_ports(&Platform::current(), Path::new("/dev"))?;
    debug!("Probing {} candidate serial ports", candidates.len());
    Ok(probe_ports(candidates, probe_port))
}
