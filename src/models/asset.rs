use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Category of a binary asset in the bundle.
///
/// The declaration order is also the manifest order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    Core,
    Driver,
    Kext,
    Tool,
    AcpiPatch,
}

impl AssetKind {
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Core,
        AssetKind::Driver,
        AssetKind::Kext,
        AssetKind::Tool,
        AssetKind::AcpiPatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Driver => "driver",
            Self::Kext => "kext",
            Self::Tool => "tool",
            Self::AcpiPatch => "acpi-patch",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown asset kind: {}", s))
    }
}

/// Build the stable asset id for a kind and file name.
pub fn asset_id(kind: AssetKind, name: &str) -> String {
    format!("{}:{}", kind, name)
}

/// Split an asset id back into kind and file name.
pub fn parse_asset_id(id: &str) -> Option<(AssetKind, &str)> {
    let (kind, name) = id.split_once(':')?;
    if name.is_empty() {
        return None;
    }
    Some((kind.parse().ok()?, name))
}

/// One binary the bundle needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub id: String,
    pub name: String,
    pub kind: AssetKind,
    pub resolved_url: String,
    /// Only used for progress math before the server reports a length.
    pub estimated_size_bytes: u64,
    pub required: bool,
    pub category: String,
}

/// Lifecycle of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Completed,
    Error,
    Cancelled,
}

impl DownloadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }
}

/// Progress snapshot of one asset transfer.
///
/// Owned by the task performing the transfer; everyone else only sees clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadState {
    pub asset_id: String,
    pub status: DownloadStatus,
    pub progress_percent: f64,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub speed_bytes_per_sec: Option<f64>,
    pub eta_seconds: Option<f64>,
    pub error: Option<String>,
}

impl DownloadState {
    pub fn pending(asset_id: impl Into<String>, estimated_total: u64) -> Self {
        Self {
            asset_id: asset_id.into(),
            status: DownloadStatus::Pending,
            progress_percent: 0.0,
            downloaded_bytes: 0,
            total_bytes: estimated_total,
            speed_bytes_per_sec: None,
            eta_seconds: None,
            error: None,
        }
    }

    /// Switch to downloading, preferring a server-declared length over the estimate.
    pub fn start(&mut self, declared_length: Option<u64>) {
        if let Some(len) = declared_length.filter(|len| *len > 0) {
            self.total_bytes = len;
        }
        self.status = DownloadStatus::Downloading;
    }

    /// Account for a received chunk.
    ///
    /// `elapsed` is wall-clock time since the transfer started. Progress never
    /// decreases and stays below 100 until [`complete`](Self::complete).
    pub fn record_chunk(&mut self, len: usize, elapsed: Duration) {
        self.downloaded_bytes += len as u64;

        let secs = elapsed.as_secs_f64();
        let speed = if secs > 0.0 {
            self.downloaded_bytes as f64 / secs
        } else {
            0.0
        };
        self.speed_bytes_per_sec = Some(speed);

        self.eta_seconds = if speed > 0.0 && self.downloaded_bytes < self.total_bytes {
            Some((self.total_bytes - self.downloaded_bytes) as f64 / speed)
        } else {
            None
        };

        if self.total_bytes > 0 {
            let percent = (self.downloaded_bytes as f64 / self.total_bytes as f64 * 100.0).min(99.0);
            self.progress_percent = self.progress_percent.max(percent);
        }
    }

    pub fn complete(&mut self) {
        self.status = DownloadStatus::Completed;
        self.progress_percent = 100.0;
        self.total_bytes = self.total_bytes.max(self.downloaded_bytes);
        self.eta_seconds = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = DownloadStatus::Error;
        self.error = Some(message.into());
        self.eta_seconds = None;
    }

    pub fn cancel(&mut self) {
        self.status = DownloadStatus::Cancelled;
        self.eta_seconds = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_roundtrip() {
        let id = asset_id(AssetKind::AcpiPatch, "SSDT-PLUG.aml");
        assert_eq!(id, "acpi-patch:SSDT-PLUG.aml");
        assert_eq!(
            parse_asset_id(&id),
            Some((AssetKind::AcpiPatch, "SSDT-PLUG.aml"))
        );
        assert_eq!(parse_asset_id("bogus:Thing"), None);
        assert_eq!(parse_asset_id("kext:"), None);
    }

    #[test]
    fn test_declared_length_wins() {
        let mut state = DownloadState::pending("kext:Lilu.kext", 1024);
        state.start(Some(4096));
        assert_eq!(state.total_bytes, 4096);

        let mut state = DownloadState::pending("kext:Lilu.kext", 1024);
        state.start(None);
        assert_eq!(state.total_bytes, 1024);
        assert_eq!(state.status, DownloadStatus::Downloading);
    }

    #[test]
    fn test_eta_and_speed() {
        let mut state = DownloadState::pending("kext:Lilu.kext", 1000);
        state.start(None);
        state.record_chunk(250, Duration::from_secs(1));

        assert_eq!(state.speed_bytes_per_sec, Some(250.0));
        assert_eq!(state.eta_seconds, Some(3.0));
        assert_eq!(state.progress_percent, 25.0);
    }

    #[test]
    fn test_eta_undefined_without_speed() {
        let mut state = DownloadState::pending("kext:Lilu.kext", 1000);
        state.start(None);
        state.record_chunk(100, Duration::ZERO);

        assert_eq!(state.speed_bytes_per_sec, Some(0.0));
        assert_eq!(state.eta_seconds, None);
    }

    #[test]
    fn test_no_eta_past_total() {
        let mut state = DownloadState::pending("kext:Lilu.kext", 100);
        state.start(None);
        state.record_chunk(150, Duration::from_millis(500));

        assert_eq!(state.eta_seconds, None);
        assert!(state.progress_percent < 100.0);

        state.complete();
        assert_eq!(state.progress_percent, 100.0);
        assert_eq!(state.total_bytes, 150);
    }

    #[test]
    fn test_kind_order_matches_manifest_order() {
        let mut kinds = vec![AssetKind::AcpiPatch, AssetKind::Kext, AssetKind::Core];
        kinds.sort();
        assert_eq!(kinds, vec![AssetKind::Core, AssetKind::Kext, AssetKind::AcpiPatch]);
    }
}
