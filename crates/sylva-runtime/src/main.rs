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

//! Builds the sparse voxel octrees of a scene and reports what was built.
//!
//! ```text
//! sylva-runtime [config.ron] [--backend wgpu|software] [--watch]
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use sylva_agents::{ChunkBuildOutcome, SvoBuilderAgent};
use sylva_core::agent::Agent;
use sylva_core::renderer::{GraphicsDevice, ShaderSource};
use sylva_data::config::{AppConfig, BackendKind};
use sylva_data::svo::ChunkOctreeView;
use sylva_infra::{
    DirectoryShaderSource, ShaderWatcher, SoftwareDevice, WgpuComputeContext, WgpuDevice,
};
use sylva_lanes::kernels::reference_kernels;
use sylva_lanes::{EmbeddedShaderSource, SvoError};

const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Wgpu,
    Software,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Wgpu => BackendKind::Wgpu,
            BackendArg::Software => BackendKind::Software,
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about = "Builds the sparse voxel octree of every chunk of a scene")]
struct Args {
    /// RON configuration file. Built-in defaults are used without one.
    config: Option<PathBuf>,

    /// Device backend, overriding the configuration.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Rebuild pipelines and the scene whenever a shader in `shader_dir` changes.
    #[arg(long)]
    watch: bool,
}

fn create_device(backend: BackendKind) -> Result<Arc<dyn GraphicsDevice>> {
    let device: Arc<dyn GraphicsDevice> = match backend {
        BackendKind::Wgpu => {
            let context = pollster::block_on(WgpuComputeContext::new())
                .context("Failed to create the wgpu compute context")?;
            Arc::new(WgpuDevice::new(context))
        }
        BackendKind::Software => {
            let device = SoftwareDevice::new();
            device.register_kernels(reference_kernels());
            Arc::new(device)
        }
    };
    let info = device.get_adapter_info();
    log::info!("Using {} ({})", info.name, info.backend_type);
    Ok(device)
}

/// Decodes every chunk built by the last scene build and logs its voxel count.
fn log_chunk_contents(agent: &SvoBuilderAgent) -> Result<()> {
    let Some(report) = agent.last_report() else {
        return Ok(());
    };
    let mut total_voxels = 0;
    for (coord, outcome) in &report.chunks {
        let ChunkBuildOutcome::Built { octree_len, .. } = outcome else {
            continue;
        };
        let Some(words) = agent.read_chunk_octree(*coord)? else {
            continue;
        };
        let leaves = ChunkOctreeView::new(&words, agent.chunk_voxel_dim())
            .leaves()
            .map_err(|source| SvoError::Decode {
                coord: *coord,
                source,
            })?;
        log::info!("Chunk {coord}: {} voxels, {octree_len} octree slots", leaves.len());
        total_voxels += leaves.len();
    }
    log::info!(
        "Scene holds {total_voxels} voxels in {} chunks",
        report.built_count()
    );
    Ok(())
}

fn watch_shaders(agent: &mut SvoBuilderAgent, shader_dir: Option<&Path>) -> Result<()> {
    let Some(dir) = shader_dir else {
        bail!("Watching shaders needs `shader_dir` in the configuration");
    };
    let watcher = ShaderWatcher::new(dir)
        .with_context(|| format!("Failed to watch '{}'", dir.display()))?;
    log::info!("Watching {} for shader changes", dir.display());

    loop {
        let changed = watcher.poll_changed();
        if !changed.is_empty() {
            log::info!("Shaders changed: {}", changed.join(", "));
            agent.request_pipeline_rebuild();
            match agent.update() {
                Ok(()) => log_chunk_contents(agent)?,
                // Keep watching: the next save may fix the shader.
                Err(e) => log::error!("Hot reload failed: {e}"),
            }
        }
        std::thread::sleep(WATCH_POLL_INTERVAL);
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AppConfig::read_file(path)
            .with_context(|| format!("Failed to load '{}'", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(backend) = args.backend {
        config.backend = backend.into();
    }

    let device = create_device(config.backend)?;
    let builder_config = config.svo_builder.clone();
    let shaders: Box<dyn ShaderSource> = match &builder_config.shader_dir {
        Some(dir) => Box::new(DirectoryShaderSource::new(dir)),
        None => Box::new(EmbeddedShaderSource),
    };
    let mut agent = SvoBuilderAgent::new(device, builder_config, shaders)?;

    agent.update()?;
    log_chunk_contents(&agent)?;
    agent.report_status().log();

    if args.watch || config.watch_shaders {
        watch_shaders(&mut agent, config.svo_builder.shader_dir.as_deref())?;
    }
    agent.destroy();
    Ok(())
}
