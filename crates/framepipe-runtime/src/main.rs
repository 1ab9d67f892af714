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

//! `framepipe`: runs the gradient demo on a headless swapchain.

mod app;
mod args;

use anyhow::{Context, Result};
use app::GradientApp;
use args::{BackendChoice, ParsedArgs};
use clap::error::ErrorKind;
use env_logger::{Builder, Env};
use framepipe_core::platform::{ApplicationLifecycle, CustomSurfaceProvider, LifecycleObserver};
use framepipe_core::renderer::HeadlessDevice;
use framepipe_headless::{HeadlessPipeline, HeadlessRunner, StatReport};
use framepipe_infra::{
    load_counter_sampler, CustomSurfaceLibrary, SoftwareDevice, SoftwareDeviceConfig,
    WgpuHeadlessDevice,
};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .init();

    let parsed = match args::parse(std::env::args()) {
        Ok(parsed) => parsed,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    match run(parsed) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn create_device(backend: BackendChoice) -> Result<Arc<dyn HeadlessDevice>> {
    Ok(match backend {
        BackendChoice::Wgpu => {
            Arc::new(WgpuHeadlessDevice::new().context("initializing the wgpu device")?)
        }
        BackendChoice::Software => Arc::new(
            SoftwareDevice::new(SoftwareDeviceConfig::default())
                .context("initializing the software device")?,
        ),
    })
}

fn run(parsed: ParsedArgs) -> Result<()> {
    let ParsedArgs { args, passthrough } = parsed;
    let mounts = args.mount_table();

    if let Some(path) = &args.surface_lib {
        let surface = CustomSurfaceLibrary::load(path)?;
        log::info!(
            "Custom surface requires instance extensions: {:?}",
            surface.instance_extensions()
        );
    }

    let device = create_device(args.backend)?;
    let sampler = load_counter_sampler(args.hw_counter_lib.as_deref());
    let lifecycle: Box<dyn LifecycleObserver> = Box::new(|state: ApplicationLifecycle| {
        log::debug!("Application is now {state:?}.");
    });
    let pipeline = HeadlessPipeline::new(device, args.pipeline_config(), vec![lifecycle])
        .context("creating the headless pipeline")?;

    let mut app = GradientApp::new(&passthrough);
    let mut runner = HeadlessRunner::new(pipeline, args.run_options());
    let report = runner.run(&mut app, sampler.as_ref())?;

    if let Some(stat) = &args.stat {
        StatReport::write_for_run(&report, &mounts, stat);
    }
    Ok(())
}
