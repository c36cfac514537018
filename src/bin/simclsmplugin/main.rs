// Copyright (C) 2017-2018 Red Hat, Inc.
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.
//
// Author: Gris Ge <fge@redhat.com>

//! Simulator plugin of LibStorageMgmt, selected by `simc://` URI.
//!
//! The whole simulated storage system is stored in the file named by the
//! `statefile` URI query, defaulting to `lsm_simc_state.json` in the system
//! temporary folder. Set `LSM_SIM_TIME` to change how many seconds an
//! asynchronous job takes.

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate tracing;

mod nas;
mod raid;
mod san;
mod sim;
mod state;

use clap::Parser;
use std::io;
use std::process::exit;
use tracing_subscriber::EnvFilter;

use crate::sim::SimPlugin;

const PLUGIN_DESC: &str = "Compiled plug-in example";
const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    // Stdout might be the IPC channel, log to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = lsm::PluginArgs::parse();
    let ret = args.channel().and_then(|channel| {
        lsm::run(&mut SimPlugin::new(), PLUGIN_DESC, PLUGIN_VERSION, channel)
    });
    if let Err(e) = ret {
        error!("{}", e);
        exit(1);
    }
}
