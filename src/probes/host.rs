//! Native probe for the local host.
//!
//! Files are inspected with `tokio::fs::metadata`. Registry reads use the
//! `winreg` crate on Windows, run on the blocking pool so a slow registry
//! never stalls the runtime; on other platforms they report
//! `ProbeError::Unsupported`.

use crate::core::{FileStat, Hive, ProbeError, RegistryLookup, SystemProbe};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use tracing::trace;

/// Probes the machine the scan runs on.
#[derive(Debug, Clone, Default)]
pub struct HostProbe {
    _private: (),
}

impl HostProbe {
    /// Creates a host probe.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SystemProbe for HostProbe {
    fn name(&self) -> &str {
        "host"
    }

    async fn read_registry_string(
        &self,
        hive: &Hive,
        key: &str,
        value_name: Option<&str>,
    ) -> Result<RegistryLookup, ProbeError> {
        trace!(hive = %hive, key = %key, value_name = ?value_name, "Reading registry");

        #[cfg(windows)]
        {
            registry::read(hive.clone(), key.to_string(), value_name.map(str::to_string)).await
        }

        #[cfg(not(windows))]
        {
            let _ = (hive, key, value_name);
            Err(ProbeError::unsupported(
                "registry",
                "the Windows registry is not available on this platform",
            ))
        }
    }

    async fn stat_file(&self, path: &str) -> Result<Option<FileStat>, ProbeError> {
        trace!(path = %path, "Stat file");

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ProbeError::io(path, err)),
        };

        let mut stat = FileStat::new(metadata.len(), permission_bits(&metadata));
        if let Ok(modified) = metadata.modified() {
            stat = stat.with_modified(DateTime::<Utc>::from(modified));
        }
        Ok(Some(stat))
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}

#[cfg(windows)]
mod registry {
    use crate::core::{Hive, ProbeError, RegistryLookup};

    use std::io::ErrorKind;
    use winreg::enums::{
        RegType, HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
        HKEY_USERS, KEY_READ,
    };
    use winreg::types::FromRegValue;
    use winreg::{RegKey, RegValue};

    pub(super) async fn read(
        hive: Hive,
        key: String,
        value_name: Option<String>,
    ) -> Result<RegistryLookup, ProbeError> {
        let predef = match &hive {
            Hive::HkeyLocalMachine => HKEY_LOCAL_MACHINE,
            Hive::HkeyCurrentUser => HKEY_CURRENT_USER,
            Hive::HkeyClassesRoot => HKEY_CLASSES_ROOT,
            Hive::HkeyUsers => HKEY_USERS,
            Hive::HkeyCurrentConfig => HKEY_CURRENT_CONFIG,
            Hive::Unrecognized(name) => {
                return Err(ProbeError::unsupported(
                    "registry",
                    format!("unrecognized hive '{name}'"),
                ))
            }
        };
        let resource = format!("{hive}\\{key}");

        tokio::task::spawn_blocking(move || {
            let subkey = match RegKey::predef(predef).open_subkey_with_flags(&key, KEY_READ) {
                Ok(subkey) => subkey,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    return Ok(RegistryLookup::KeyMissing)
                }
                Err(err) => return Err(ProbeError::io(resource, err)),
            };

            let Some(name) = value_name else {
                return Ok(RegistryLookup::KeyPresent);
            };

            match subkey.get_raw_value(&name) {
                Ok(raw) => render(&raw)
                    .map(RegistryLookup::value)
                    .map_err(|err| ProbeError::io(format!("{resource}\\{name}"), err)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(RegistryLookup::ValueMissing),
                Err(err) => Err(ProbeError::io(format!("{resource}\\{name}"), err)),
            }
        })
        .await
        .map_err(|err| ProbeError::backend("host", format!("registry task failed: {err}")))?
    }

    fn render(raw: &RegValue) -> std::io::Result<String> {
        match raw.vtype {
            RegType::REG_DWORD => u32::from_reg_value(raw).map(|v| v.to_string()),
            RegType::REG_QWORD => u64::from_reg_value(raw).map(|v| v.to_string()),
            _ => String::from_reg_value(raw),
        }
    }
}
