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

mod cli;
mod runner;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use runner::Runner;
use trellis_core::{App, Capacities, ModuleRegistry};

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("winit", log::LevelFilter::Warn)
        .init();

    let cli = Cli::parse();
    let app = App::with_registry(ModuleRegistry::from_inventory(Capacities::default()));

    if cli.list_modules {
        for id in app.registry().ids() {
            println!("{id}");
        }
        return Ok(());
    }

    let mut runner = Runner::start(app, cli.selection()?, &cli.window())?;
    let result = runner.run(cli.frames, cli.frame_time());
    log::info!("Main loop exited after {} frame(s).", runner.frames());
    runner.shutdown();
    result
}
