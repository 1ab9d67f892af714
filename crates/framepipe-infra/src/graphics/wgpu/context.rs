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

use anyhow::{anyhow, Result};
use framepipe_core::renderer::{pack_driver_version, AdapterInfo, GraphicsBackendType};
use wgpu::{Adapter, Instance};

/// Holds the core wgpu objects of a device without any presentation surface.
#[derive(Debug)]
pub struct WgpuHeadlessContext {
    /// The wgpu instance the adapter was selected from.
    pub instance: Instance,
    /// The selected physical adapter.
    pub adapter: Adapter,
    /// The logical device.
    pub device: wgpu::Device,
    /// The single submission queue.
    pub queue: wgpu::Queue,
    /// Adapter details reported to the pipeline.
    pub adapter_info: AdapterInfo,
}

impl WgpuHeadlessContext {
    /// Selects a high-performance adapter and creates a logical device on it.
    ///
    /// ## Errors
    /// Fails if no adapter is available or the device cannot be created.
    pub async fn new() -> Result<Self> {
        let instance = Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .map_err(|e| anyhow!("No suitable graphics adapter: {}", e))?;

        let raw_info = adapter.get_info();
        log::info!(
            "Using adapter '{}' ({:?}, driver '{} {}').",
            raw_info.name,
            raw_info.backend,
            raw_info.driver,
            raw_info.driver_info
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Framepipe Headless Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("Logical device and command queue created.");

        let adapter_info = AdapterInfo {
            name: raw_info.name.clone(),
            driver_version: parse_driver_version(&raw_info.driver_info),
            backend: map_backend(raw_info.backend),
        };

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            adapter_info,
        })
    }
}

fn map_backend(backend: wgpu::Backend) -> GraphicsBackendType {
    match backend {
        wgpu::Backend::Vulkan => GraphicsBackendType::Vulkan,
        wgpu::Backend::Metal => GraphicsBackendType::Metal,
        wgpu::Backend::Dx12 => GraphicsBackendType::Dx12,
        wgpu::Backend::Gl => GraphicsBackendType::OpenGl,
        _ => GraphicsBackendType::Unknown,
    }
}

/// Packs the first dotted version found in a driver description, e.g.
/// `"Mesa 24.0.5-1ubuntu1"` becomes 24.0.5. Unparseable strings yield 0.
pub(crate) fn parse_driver_version(driver_info: &str) -> u32 {
    let Some(token) = driver_info
        .split(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
        .find(|t| t.starts_with(|c: char| c.is_ascii_digit()))
    else {
        return 0;
    };

    let mut parts = token.split('.').map(|part| {
        part.chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
            .parse::<u32>()
            .unwrap_or(0)
    });
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    let patch = parts.next().unwrap_or(0);
    pack_driver_version(major, minor, patch)
}
