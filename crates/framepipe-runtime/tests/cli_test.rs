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

use std::path::Path;
use std::process::Command;

fn framepipe() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_framepipe"));
    command.env("RUST_LOG", "warn");
    command
}

fn png_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".png"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_software_run_dumps_frames_and_writes_stats() {
    // --- ARRANGE ---
    let dir = tempfile::tempdir().unwrap();

    // --- ACT ---
    let status = framepipe()
        .args(["--backend", "software", "--frames", "3"])
        .args(["--width", "32", "--height", "16"])
        .arg("--png-path")
        .arg(dir.path().join("frame"))
        .arg("--fs-cache")
        .arg(dir.path())
        .args(["--stat", "cache://stat.json"])
        .args(["--pulse-hz", "1.5", "--unknown-flag"])
        .status()
        .unwrap();

    // --- ASSERT ---
    assert!(status.success());
    // Warm-up frame plus three timed frames.
    assert_eq!(
        png_files(dir.path()),
        vec![
            "frame_00000.png",
            "frame_00001.png",
            "frame_00002.png",
            "frame_00003.png",
        ]
    );

    let stat: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("stat.json")).unwrap())
            .unwrap();
    assert!(stat["averageFrameTimeUs"].as_f64().unwrap() >= 0.0);
    assert_eq!(stat["gpu"], "Software Rasterizer");
    assert!(stat.get("gpuCycles").is_none());
}

#[test]
fn test_reference_image_is_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("golden.png");

    let status = framepipe()
        .args(["--backend", "software", "--frames", "2"])
        .args(["--width", "8", "--height", "8"])
        .arg("--png-reference-path")
        .arg(&reference)
        .status()
        .unwrap();

    assert!(status.success());
    assert_eq!(png_files(dir.path()), vec!["golden.png"]);
}

#[test]
fn test_missing_counter_library_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let status = framepipe()
        .args(["--backend", "software", "--frames", "1"])
        .args(["--width", "4", "--height", "4"])
        .arg("--hw-counter-lib")
        .arg(dir.path().join("libmissing.so"))
        .status()
        .unwrap();

    assert!(status.success());
}

#[test]
fn test_missing_surface_library_is_a_setup_failure() {
    let dir = tempfile::tempdir().unwrap();

    let status = framepipe()
        .args(["--backend", "software", "--frames", "1"])
        .arg("--surface-lib")
        .arg(dir.path().join("libmissing_surface.so"))
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_invalid_flag_value_exits_with_one() {
    let status = framepipe().args(["--frames", "lots"]).status().unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_help_exits_cleanly() {
    let output = framepipe().arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("--png-reference-path"));
}
