use std::path::{Path, PathBuf};

use log::trace;
use regex::Regex;

use crate::error_handling::types::CaptureError;

/// Names of the ring-buffer files tshark/dumpcap create in the temp directory.
pub const TEMP_ARTIFACT_PATTERN: &str = r"^wireshark_.+\.pcap(ng)?$";

/// Opportunistic cleanup of capture files left behind by earlier runs.
///
/// Other tshark instances on the host may own some of these files, so every
/// failure is ignored.
#[derive(Debug, Clone)]
pub struct TempArtifactCleaner {
    dir: PathBuf,
    pattern: Regex,
}

impl TempArtifactCleaner {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let pattern = Regex::new(TEMP_ARTIFACT_PATTERN)
            .map_err(|e| CaptureError::EnvironmentError(format!("bad temp file pattern: {}", e)))?;
        Ok(Self {
            dir: dir.into(),
            pattern,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }

    /// Deletes every matching file and returns how many were removed.
    pub fn remove_stale(&self) -> usize {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                trace!("Unable to list {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !self.matches(name) {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => {
                    trace!("Removed stale capture file {}", name);
                    removed += 1;
                }
                Err(e) => trace!("Left capture file {} in place: {}", name, e),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn matches_tshark_temp_names() {
        let cleaner = TempArtifactCleaner::new("/tmp").unwrap();
        assert!(cleaner.matches("wireshark_eth0_20240101120000_AbCdEf.pcapng"));
        assert!(cleaner.matches("wireshark_Ethernet 2_20240101_x.pcap"));
        assert!(!cleaner.matches("wireshark_.pcapng"));
        assert!(!cleaner.matches("wiresharkfoo.pcapng"));
        assert!(!cleaner.matches("wireshark_eth0.pcapng.bak"));
        assert!(!cleaner.matches("capture.pcapng"));
    }

    #[test]
    fn removes_only_matching_files() {
        let dir = TempDir::new().unwrap();
        for name in [
            "wireshark_eth0_1.pcapng",
            "wireshark_eth0_2.pcap",
            "keep.txt",
            "wiresharkfoo.pcapng",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("wireshark_dir.pcapng")).unwrap();

        let cleaner = TempArtifactCleaner::new(dir.path()).unwrap();
        assert_eq!(cleaner.remove_stale(), 2);

        let mut left: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["keep.txt", "wireshark_dir.pcapng", "wiresharkfoo.pcapng"]);
    }

    #[test]
    fn missing_directory_is_ignored() {
        let cleaner = TempArtifactCleaner::new("/nonexistent/tzsp-temp").unwrap();
        assert_eq!(cleaner.remove_stale(), 0);
    }
}
