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

//! Command line parsing.
//!
//! Flags the runner understands are parsed with clap. Everything else is
//! forwarded untouched to the application.

use clap::{CommandFactory, Parser, ValueEnum};
use framepipe_core::vfs::MountTable;
use framepipe_headless::{PipelineConfig, RunOptions};
use std::collections::HashMap;
use std::path::PathBuf;

/// Graphics backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendChoice {
    /// wgpu on the best available adapter.
    #[default]
    Wgpu,
    /// CPU software device.
    Software,
}

/// Options of the headless runner.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "framepipe",
    about = "Runs an application on a headless swapchain",
    long_about = "Runs an application on a headless swapchain.\n\n\
        Frames are rendered into a ring of off-screen targets and can be read \
        back to PNG files. Unknown arguments are forwarded to the application.\n\
        \n\
        EXAMPLES:\n\
          # Dump 100 frames on the CPU backend\n\
          framepipe --backend software --frames 100 --png-path out/frame\n\
        \n\
          # Benchmark and write a golden image\n\
          framepipe --frames 500 --stat stat.json --png-reference-path golden.png",
    version
)]
pub struct HeadlessArgs {
    /// Dump every frame to `<path>_<frame>.png`.
    #[arg(long, value_name = "PATH")]
    pub png_path: Option<PathBuf>,

    /// Write one reference frame to this file after the run.
    #[arg(long, value_name = "PATH")]
    pub png_reference_path: Option<PathBuf>,

    /// Write a JSON statistics report (may use a mounted protocol).
    #[arg(long, value_name = "PATH")]
    pub stat: Option<String>,

    /// Root of the `assets://` protocol.
    #[arg(long, value_name = "DIR")]
    pub fs_assets: Option<PathBuf>,

    /// Root of the `cache://` protocol.
    #[arg(long, value_name = "DIR")]
    pub fs_cache: Option<PathBuf>,

    /// Root of the `builtin://` protocol.
    #[arg(long, value_name = "DIR")]
    pub fs_builtin: Option<PathBuf>,

    /// Number of timed frames. Runs until the application stops if omitted.
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,

    /// Frame width in pixels.
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Simulated seconds per frame.
    #[arg(long, default_value_t = 0.01)]
    pub time_step: f64,

    /// Hardware counter plugin library.
    #[arg(long, value_name = "LIB")]
    pub hw_counter_lib: Option<PathBuf>,

    /// Graphics backend.
    #[arg(long, value_enum, default_value_t = BackendChoice::Wgpu)]
    pub backend: BackendChoice,

    /// Custom surface plugin library.
    #[arg(long, value_name = "LIB")]
    pub surface_lib: Option<PathBuf>,
}

impl HeadlessArgs {
    /// Pipeline configuration derived from the flags.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            width: self.width,
            height: self.height,
            time_step: self.time_step,
            dump_base: self.png_path.clone(),
            ..Default::default()
        }
    }

    /// Run options derived from the flags.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            frame_budget: self.frames,
            reference_path: self.png_reference_path.clone(),
        }
    }

    /// Mount table with every `--fs-*` protocol that was given.
    pub fn mount_table(&self) -> MountTable {
        let mut mounts = MountTable::new();
        for (protocol, root) in [
            ("assets", &self.fs_assets),
            ("cache", &self.fs_cache),
            ("builtin", &self.fs_builtin),
        ] {
            if let Some(root) = root {
                mounts.register_protocol(protocol, root.clone());
            }
        }
        mounts
    }
}

/// Parsed runner flags plus the arguments left for the application.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArgs {
    /// Runner flags.
    pub args: HeadlessArgs,
    /// Program name followed by every unrecognized argument, in order.
    pub passthrough: Vec<String>,
}

/// Long flags of [`HeadlessArgs`], mapped to whether they take a value.
fn known_flags() -> HashMap<String, bool> {
    let mut flags: HashMap<String, bool> = HeadlessArgs::command()
        .get_arguments()
        .filter_map(|arg| {
            arg.get_long()
                .map(|long| (format!("--{long}"), arg.get_action().takes_values()))
        })
        .collect();
    for builtin in ["--help", "-h", "--version", "-V"] {
        flags.insert(builtin.to_string(), false);
    }
    flags
}

/// Splits `argv` into runner flags (with their values) and pass-through arguments.
///
/// Both lists start with the program name.
pub fn split_args<I>(argv: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let flags = known_flags();
    let mut argv = argv.into_iter();
    let program = argv.next().unwrap_or_else(|| "framepipe".to_string());
    let mut known = vec![program.clone()];
    let mut passthrough = vec![program];

    while let Some(arg) = argv.next() {
        let (name, inline_value) = match arg.split_once('=') {
            Some((name, _)) => (name, true),
            None => (arg.as_str(), false),
        };
        match flags.get(name).copied() {
            Some(takes_value) => {
                known.push(arg);
                if takes_value && !inline_value {
                    known.extend(argv.next());
                }
            }
            None => passthrough.push(arg),
        }
    }
    (known, passthrough)
}

/// Parses the process arguments.
///
/// ## Errors
/// Returns the clap error for invalid runner flags, `--help` and `--version`.
pub fn parse<I>(argv: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = String>,
{
    let (known, passthrough) = split_args(argv);
    let args = HeadlessArgs::try_parse_from(known)?;
    Ok(ParsedArgs { args, passthrough })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("framepipe")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let parsed = parse(argv(&[])).unwrap();
        assert_eq!(parsed.args.width, 1280);
        assert_eq!(parsed.args.height, 720);
        assert_eq!(parsed.args.time_step, 0.01);
        assert_eq!(parsed.args.frames, None);
        assert_eq!(parsed.args.backend, BackendChoice::Wgpu);
        assert_eq!(parsed.passthrough, vec!["framepipe"]);
    }

    #[test]
    fn runner_flags_are_parsed() {
        let parsed = parse(argv(&[
            "--frames",
            "10",
            "--width",
            "64",
            "--height=32",
            "--png-path",
            "out/frame",
            "--backend",
            "software",
            "--stat",
            "cache://stat.json",
        ]))
        .unwrap();

        let args = parsed.args;
        assert_eq!(args.frames, Some(10));
        assert_eq!((args.width, args.height), (64, 32));
        assert_eq!(args.png_path, Some(PathBuf::from("out/frame")));
        assert_eq!(args.backend, BackendChoice::Software);
        assert_eq!(args.stat.as_deref(), Some("cache://stat.json"));
    }

    #[test]
    fn unknown_arguments_are_forwarded_in_order() {
        let parsed = parse(argv(&[
            "--scene",
            "level1.gltf",
            "--frames",
            "3",
            "--verbose",
        ]))
        .unwrap();

        assert_eq!(parsed.args.frames, Some(3));
        assert_eq!(
            parsed.passthrough,
            vec!["framepipe", "--scene", "level1.gltf", "--verbose"]
        );
    }

    #[test]
    fn invalid_value_is_an_error() {
        let err = parse(argv(&["--frames", "many"])).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn help_is_reported_as_help() {
        let err = parse(argv(&["--help"])).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn args_map_onto_pipeline_and_run_options() {
        let args = parse(argv(&[
            "--png-reference-path",
            "golden.png",
            "--frames",
            "4",
            "--time-step",
            "0.5",
        ]))
        .unwrap()
        .args;

        let config = args.pipeline_config();
        assert_eq!(config.time_step, 0.5);
        assert_eq!(config.ring_size, 4);
        assert!(config.dump_base.is_none());

        let options = args.run_options();
        assert_eq!(options.frame_budget, Some(4));
        assert_eq!(options.reference_path, Some(PathBuf::from("golden.png")));
    }

    #[test]
    fn mount_table_registers_given_protocols() {
        let args = parse(argv(&["--fs-cache", "/tmp/cache"])).unwrap().args;
        let mounts = args.mount_table();

        assert_eq!(
            mounts.resolve("cache://stat.json").unwrap(),
            PathBuf::from("/tmp/cache/stat.json")
        );
        assert!(mounts.resolve("assets://x").is_err());
    }
}
