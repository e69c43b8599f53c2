//! Operating system family detection

use std::path::Path;

use serde::Serialize;

/// OS family that selects the install strategy column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    MacOs,
    Debian,
    RedHat,
    Unknown,
}

impl OsFamily {
    /// Classify from the kernel name and marker files below `root`
    ///
    /// Checked in order: Darwin kernel, `/etc/debian_version`,
    /// `/etc/redhat-release`.
    pub fn classify(kernel: &str, root: &Path) -> Self {
        if kernel.trim().eq_ignore_ascii_case("darwin") {
            OsFamily::MacOs
        } else if root.join("etc/debian_version").exists() {
            OsFamily::Debian
        } else if root.join("etc/redhat-release").exists() {
            OsFamily::RedHat
        } else {
            OsFamily::Unknown
        }
    }

    pub fn is_known(self) -> bool {
        self != OsFamily::Unknown
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OsFamily::MacOs => "macOS",
            OsFamily::Debian => "Debian/Ubuntu",
            OsFamily::RedHat => "RHEL/CentOS/Fedora",
            OsFamily::Unknown => "unknown OS",
        };
        f.write_str(name)
    }
}
