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

//! # `LibStorageMgmt`
//!
//! `LibStorageMgmt` provides a set of API for programmatically manage their
//! storage hardware in a vendor neutral way supporting these actions:
//!
//!  * List storage systems, pools, volumes, disks, access groups, target
//!    ports, batteries, file systems or NFS exports.
//!
//!  * Create and delete volumes, access groups, file systems, or NFS exports.
//!
//!  * Grant and remove access to volumes, access groups, or initiators.
//!
//!  * Replicate volumes with snapshots, clones, and copies.
//!
//!  * Create hardware RAID volume and tune its cache policy.
//!
//! This crate holds both sides of the plugin IPC:
//!
//!  * [`lsm::Client`][1] talks to a plugin, waiting for asynchronous jobs
//!    when needed.
//!
//!  * [`lsm::run()`][2] serves the plugin side, routing every request to an
//!    implementation of [`lsm::Plugin`][3].
//!
//! To use `LibStorageMgmt` as client, you need:
//!
//!  * Start the libstoragemgmt daemon(`lsmd`) or install plugin executable
//!    into plugin folder.
//!
//!  * Chose a URI after reading [`LibStorageMgmt` user guide][4]
//!
//!  * Make a connection to plugin via [`lsm::Client`][1].
//!
//!  * Check required [`capability`][5] is supported.
//!
//!  * Invoke required method of [`lsm::Client`][1].
//!
//! # Example code using simulator plugin
//!
//! ```no_run
//! use lsm::{Client, LsmError};
//!
//! fn main() -> Result<(), LsmError> {
//!     let mut c = match Client::new("simc://", None, None) {
//!         Ok(i) => i,
//!         Err(LsmError::DaemonNotRunning(_)) => {
//!             eprintln!("Please start the libstoragemgmt daemon");
//!             return Ok(());
//!         }
//!         Err(e) => return Err(e),
//!     };
//!     for s in c.systems()? {
//!         let cap = c.capabilities(&s)?;
//!         if cap.is_supported(lsm::Capability::Volumes) {
//!             for vol in c.volumes()? {
//!                 println!("Got volume: {} {}", vol.name, vol.id);
//!             }
//!         }
//!     }
//!     c.close()
//! }
//! ```
//!
//! [1]: struct.Client.html
//! [2]: fn.run.html
//! [3]: trait.Plugin.html
//! [4]: https://libstorage.github.io/libstoragemgmt-doc/doc/user_guide.html
//! [5]: struct.Capabilities.html

extern crate clap;
extern crate nix;
extern crate regex;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate thiserror;
#[macro_use]
extern crate tracing;
extern crate url;

pub use self::capability::{Capabilities, Capability};
pub use self::client::{available_plugins, Client, PluginInfo};
pub use self::data::*;
pub use self::error::{ErrorInfo, LsmError, Result};
pub use self::ipc::{PluginChannel, Request};
pub use self::job::{now, progress, JobEntry, JobState, JobStatus, JobTable};
pub use self::misc::{
    size_bytes_2_size_human, size_human_2_size_bytes, uri_plugin_name,
    uri_query_get, verify_init_id_str,
};
pub use self::plugin::{
    dispatch, run, search_filter, AsyncReply, ExportArgs, Params, Plugin,
    PluginArgs, PluginV1_2, PluginV1_3, Search,
};

mod capability;
mod client;
mod data;
mod error;
mod ipc;
mod job;
mod misc;
mod plugin;
