use std::{
    env,
    fs::File,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::constants::DEFAULT_CAPTURE_DEV;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePermission {
    Granted,
    Denied,
}

pub fn capture_device_path() -> PathBuf {
    env::var_os("MSG_MONITOR_CAPTURE_DEV")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CAPTURE_DEV))
}

/// Probes the capture device once at startup. The device is only opened,
/// never read; a missing or unreadable node counts as denied.
pub fn request_capture_permission() -> CapturePermission {
    probe_device(&capture_device_path())
}

fn probe_device(path: &Path) -> CapturePermission {
    match File::open(path) {
        Ok(_) => {
            info!(device = %path.display(), "capture permission granted");
            CapturePermission::Granted
        }
        Err(err) => {
            warn!(device = %path.display(), error = %err, "capture permission denied");
            CapturePermission::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_device_is_granted() {
        let dev = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(probe_device(dev.path()), CapturePermission::Granted);
    }

    #[test]
    fn missing_device_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            probe_device(&dir.path().join("no-such-device")),
            CapturePermission::Denied
        );
    }
}
