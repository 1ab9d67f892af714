// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The JSON statistics report.

use crate::driver::RunReport;
use framepipe_core::vfs::MountTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Statistics of a run, serialized with camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatReport {
    /// Average wall-clock time per timed frame, in microseconds.
    pub average_frame_time_us: f64,
    /// Adapter name.
    pub gpu: String,
    /// Packed adapter driver version.
    pub driver_version: u32,
    /// Average GPU cycles per frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_cycles: Option<u64>,
    /// Average bytes read per frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_read: Option<u64>,
    /// Average bytes written per frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_write: Option<u64>,
}

impl StatReport {
    /// Builds the report of a finished run.
    pub fn from_run(run: &RunReport) -> Self {
        Self {
            average_frame_time_us: run.average_frame_time_us,
            gpu: run.adapter.name.clone(),
            driver_version: run.adapter.driver_version,
            gpu_cycles: run.counters.map(|c| c.gpu_cycles),
            bandwidth_read: run.counters.map(|c| c.bandwidth_read),
            bandwidth_write: run.counters.map(|c| c.bandwidth_write),
        }
    }

    /// Serializes the report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the report of `run` to `path`, resolved through `mounts`.
    ///
    /// Nothing is written if no frame was timed. Failures are logged, never
    /// returned: a missing report must not fail an otherwise good run.
    pub fn write_for_run(run: &RunReport, mounts: &MountTable, path: &str) -> Option<PathBuf> {
        if run.rendered_frames == 0 {
            log::warn!("No frame was timed; skipping stat report '{path}'.");
            return None;
        }
        let json = match Self::from_run(run).to_json() {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to serialize stat report: {e}");
                return None;
            }
        };
        match mounts.write_string(path, &json) {
            Ok(written) => {
                log::info!("Wrote stat report '{}'.", written.display());
                Some(written)
            }
            Err(e) => {
                log::error!("Failed to write stat report: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framepipe_core::renderer::{AdapterInfo, GraphicsBackendType};
    use framepipe_core::telemetry::HwCounterDelta;

    fn run_report(rendered_frames: u64, counters: Option<HwCounterDelta>) -> RunReport {
        RunReport {
            warmup_frames: 1,
            rendered_frames,
            average_frame_time_us: 1250.5,
            counters,
            total_frames: rendered_frames + 1,
            adapter: AdapterInfo {
                name: "Test GPU".to_string(),
                driver_version: 42,
                backend: GraphicsBackendType::Software,
            },
        }
    }

    #[test]
    fn counters_are_omitted_when_unavailable() {
        let json = StatReport::from_run(&run_report(10, None)).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["averageFrameTimeUs"], 1250.5);
        assert_eq!(value["gpu"], "Test GPU");
        assert_eq!(value["driverVersion"], 42);
        assert!(value.get("gpuCycles").is_none());
        assert!(value.get("bandwidthRead").is_none());
        assert!(value.get("bandwidthWrite").is_none());
    }

    #[test]
    fn counters_are_reported_per_frame() {
        let counters = HwCounterDelta {
            gpu_cycles: 1000,
            bandwidth_read: 2000,
            bandwidth_write: 3000,
        };
        let json = StatReport::from_run(&run_report(10, Some(counters)))
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["gpuCycles"], 1000);
        assert_eq!(value["bandwidthRead"], 2000);
        assert_eq!(value["bandwidthWrite"], 3000);
    }

    #[test]
    fn report_is_written_through_mount_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut mounts = MountTable::new();
        mounts.register_protocol("cache", dir.path());

        let written =
            StatReport::write_for_run(&run_report(3, None), &mounts, "cache://stat.json").unwrap();

        assert_eq!(written, dir.path().join("stat.json"));
        let parsed: StatReport =
            serde_json::from_str(&std::fs::read_to_string(written).unwrap()).unwrap();
        assert_eq!(parsed.gpu, "Test GPU");
    }

    #[test]
    fn nothing_is_written_without_timed_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat.json");

        let written =
            StatReport::write_for_run(&run_report(0, None), &MountTable::new(), path.to_str().unwrap());

        assert!(written.is_none());
        assert!(!path.exists());
    }
}
