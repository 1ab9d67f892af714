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

mod common;

use common::{base_in, cycle, small_pipeline, software_device, sorted_files, SolidApp};
use framepipe_core::platform::{ApplicationLifecycle, LifecycleObserver};
use framepipe_core::renderer::SemaphoreId;
use framepipe_headless::{HeadlessPipeline, PipelineConfig, PipelineError};
use framepipe_infra::DeviceEvent;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn test_continuous_dump_writes_every_frame_without_gaps() {
    // --- ARRANGE ---
    let dir = tempfile::tempdir().unwrap();
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let mut pipeline = small_pipeline(device, 3);
    pipeline.enable_frame_dump(base_in(dir.path()));
    let mut app = SolidApp::default();

    // --- ACT ---
    for _ in 0..7 {
        cycle(&mut pipeline, &mut app);
    }
    pipeline.wait_workers();

    // --- ASSERT ---
    let expected: Vec<String> = (0..7).map(|i| format!("frame_{i:05}.png")).collect();
    assert_eq!(sorted_files(dir.path()), expected);
    assert!(pipeline.is_idle());
    assert_eq!(pipeline.frame_count(), 7);
    assert_eq!(pipeline.current_index(), 7 % 3);
}

#[test]
fn test_explicit_request_replaces_dump_for_one_frame() {
    // --- ARRANGE ---
    let dir = tempfile::tempdir().unwrap();
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let mut pipeline = small_pipeline(device, 4);
    pipeline.enable_frame_dump(base_in(dir.path()));
    let mut app = SolidApp::default();

    // --- ACT ---
    for frame in 0..5 {
        if frame == 2 {
            pipeline.request_readback(dir.path().join("explicit.png"));
        }
        cycle(&mut pipeline, &mut app);
    }
    pipeline.wait_workers();

    // --- ASSERT ---
    assert_eq!(
        sorted_files(dir.path()),
        vec![
            "explicit.png",
            "frame_00000.png",
            "frame_00001.png",
            "frame_00003.png",
            "frame_00004.png",
        ]
    );
    assert_eq!(pipeline.pending_requests(), 0);
}

#[test]
fn test_queued_requests_are_served_one_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let mut pipeline = small_pipeline(device, 2);
    let mut app = SolidApp::default();

    pipeline.request_readback(dir.path().join("first.png"));
    pipeline.request_readback(dir.path().join("second.png"));
    cycle(&mut pipeline, &mut app);
    assert_eq!(pipeline.pending_requests(), 1);
    cycle(&mut pipeline, &mut app);
    pipeline.wait_workers();

    assert_eq!(sorted_files(dir.path()), vec!["first.png", "second.png"]);
}

fn assert_fence_wait_precedes_host_map(ring_size: usize) {
    // --- ARRANGE ---
    // Slow queue and slow maps stretch every window in which a race could occur.
    let dir = tempfile::tempdir().unwrap();
    let device = software_device(Duration::from_millis(4), Duration::from_millis(3));
    let mut pipeline = small_pipeline(device.clone(), ring_size);
    pipeline.enable_frame_dump(base_in(dir.path()));
    let mut app = SolidApp::default();

    // --- ACT ---
    for _ in 0..12 {
        cycle(&mut pipeline, &mut app);
    }
    pipeline.wait_workers();

    // --- ASSERT ---
    assert!(device.violations().is_empty(), "{:?}", device.violations());

    let journal = device.journal();
    let mut fence_buffer = HashMap::new();
    let mut per_buffer: HashMap<_, Vec<&'static str>> = HashMap::new();
    for event in &journal {
        match event {
            DeviceEvent::CopySubmitted { buffer, fence } => {
                fence_buffer.insert(*fence, *buffer);
                per_buffer.entry(*buffer).or_default().push("copy");
            }
            DeviceEvent::FenceWaited { fence } => {
                per_buffer.entry(fence_buffer[fence]).or_default().push("fence");
            }
            DeviceEvent::HostRead { buffer } => {
                per_buffer.entry(*buffer).or_default().push("read");
            }
            _ => {}
        }
    }

    assert_eq!(per_buffer.len(), ring_size);
    for sequence in per_buffer.values() {
        assert_eq!(sequence.len(), 12 / ring_size * 3);
        for step in sequence.chunks(3) {
            assert_eq!(step, ["copy", "fence", "read"]);
        }
    }
    assert_eq!(sorted_files(dir.path()).len(), 12);
}

#[test]
fn test_fence_wait_precedes_host_map_with_a_single_slot() {
    assert_fence_wait_precedes_host_map(1);
}

#[test]
fn test_fence_wait_precedes_host_map_with_two_slots() {
    assert_fence_wait_precedes_host_map(2);
}

#[test]
fn test_fence_wait_precedes_host_map_with_three_slots() {
    assert_fence_wait_precedes_host_map(3);
}

#[test]
fn test_failed_submission_keeps_the_request_queued() {
    // --- ARRANGE ---
    let dir = tempfile::tempdir().unwrap();
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let mut pipeline = small_pipeline(device, 2);
    let mut app = SolidApp::default();
    pipeline.request_readback(dir.path().join("golden.png"));

    // --- ACT ---
    // A release signal the device never issued makes the copy submission fail.
    pipeline.begin_frame().unwrap();
    let failed = pipeline.end_frame(Some(SemaphoreId(9999)));

    // --- ASSERT ---
    assert!(matches!(failed, Err(PipelineError::Device(_))));
    assert_eq!(pipeline.pending_requests(), 1);
    assert_eq!(pipeline.frame_count(), 1);

    cycle(&mut pipeline, &mut app);
    pipeline.wait_workers();
    assert_eq!(pipeline.pending_requests(), 0);
    assert_eq!(sorted_files(dir.path()), vec!["golden.png"]);
}

#[test]
fn test_written_frames_are_opaque_with_original_rgb() {
    let dir = tempfile::tempdir().unwrap();
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let mut pipeline = small_pipeline(device, 2);
    let mut app = SolidApp {
        color: [12, 34, 56, 0x42],
        ..Default::default()
    };
    let path = dir.path().join("opaque.png");

    pipeline.request_readback(&path);
    cycle(&mut pipeline, &mut app);
    pipeline.wait_workers();

    let image = image::open(&path).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (16, 8));
    assert!(image.pixels().all(|p| p.0 == [12, 34, 56, 0xFF]));
}

#[test]
fn test_unwritable_destination_does_not_stop_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let mut pipeline = small_pipeline(device, 2);
    let mut app = SolidApp::default();

    pipeline.request_readback(dir.path().join("missing-dir").join("lost.png"));
    cycle(&mut pipeline, &mut app);
    pipeline.request_readback(dir.path().join("kept.png"));
    cycle(&mut pipeline, &mut app);
    pipeline.wait_workers();

    assert_eq!(sorted_files(dir.path()), vec!["kept.png"]);
    assert_eq!(pipeline.frame_count(), 2);
}

#[test]
fn test_request_waits_for_a_rendered_frame() {
    let dir = tempfile::tempdir().unwrap();
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let mut pipeline = small_pipeline(device, 2);
    let mut idle_app = SolidApp {
        skip_render: true,
        ..Default::default()
    };

    pipeline.request_readback(dir.path().join("late.png"));
    cycle(&mut pipeline, &mut idle_app);
    assert_eq!(pipeline.pending_requests(), 1);
    assert_eq!(pipeline.frame_count(), 1);

    let mut app = SolidApp::default();
    cycle(&mut pipeline, &mut app);
    pipeline.wait_workers();
    assert_eq!(sorted_files(dir.path()), vec!["late.png"]);
}

#[test]
fn test_lifecycle_is_announced_around_the_pipeline() {
    let states = Arc::new(Mutex::new(Vec::new()));
    let recorder = states.clone();
    let observer: Box<dyn LifecycleObserver> =
        Box::new(move |state: ApplicationLifecycle| recorder.lock().unwrap().push(state));
    let device = software_device(Duration::ZERO, Duration::ZERO);

    let pipeline = HeadlessPipeline::new(
        device,
        PipelineConfig {
            width: 4,
            height: 4,
            ..Default::default()
        },
        vec![observer],
    )
    .unwrap();
    assert_eq!(
        *states.lock().unwrap(),
        vec![
            ApplicationLifecycle::Stopped,
            ApplicationLifecycle::Paused,
            ApplicationLifecycle::Running,
        ]
    );

    drop(pipeline);
    assert_eq!(
        states.lock().unwrap()[3..],
        [ApplicationLifecycle::Paused, ApplicationLifecycle::Stopped]
    );
}

#[test]
fn test_release_is_idempotent_and_final() {
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let mut pipeline = small_pipeline(device.clone(), 2);
    let mut app = SolidApp::default();
    cycle(&mut pipeline, &mut app);

    pipeline.release_resources();
    pipeline.release_resources();

    assert!(matches!(
        pipeline.begin_frame(),
        Err(PipelineError::Released)
    ));
    assert!(matches!(
        pipeline.end_frame(None),
        Err(PipelineError::Released)
    ));
    assert_eq!(device.live_semaphores(), 0);
}

#[test]
fn test_resize_is_recorded_without_reallocation() {
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let mut pipeline = small_pipeline(device, 1);

    pipeline.notify_resize(16, 8);
    assert!(!pipeline.is_resized());

    pipeline.notify_resize(32, 32);
    assert!(pipeline.is_resized());
    assert_eq!(pipeline.extent().width, 16);
    assert_eq!(pipeline.extent().height, 8);
}

#[test]
fn test_invalid_configs_are_rejected() {
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let empty_ring = HeadlessPipeline::new(
        device.clone(),
        PipelineConfig {
            ring_size: 0,
            ..Default::default()
        },
        Vec::new(),
    );
    assert!(matches!(empty_ring, Err(PipelineError::EmptyRing)));

    let empty_extent = HeadlessPipeline::new(
        device,
        PipelineConfig {
            width: 0,
            ..Default::default()
        },
        Vec::new(),
    );
    assert!(matches!(empty_extent, Err(PipelineError::EmptyExtent(_))));
}

#[test]
fn test_frame_targets_carry_deterministic_time() {
    let device = software_device(Duration::ZERO, Duration::ZERO);
    let mut pipeline = HeadlessPipeline::new(
        device,
        PipelineConfig {
            width: 4,
            height: 4,
            ring_size: 2,
            time_step: 0.5,
            dump_base: None,
        },
        Vec::new(),
    )
    .unwrap();
    let mut app = SolidApp::default();

    cycle(&mut pipeline, &mut app);
    cycle(&mut pipeline, &mut app);
    let target = pipeline.begin_frame().unwrap();

    assert_eq!(target.frame, 2);
    assert_eq!(target.slot, 0);
    assert_eq!(target.time_step, 0.5);
    assert_eq!(target.elapsed, 1.0);
    assert!(target.acquire.is_some());
}
