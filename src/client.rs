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

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs::read_dir;
use std::thread::sleep;
use std::time::Duration;

use super::capability::Capabilities;
use super::data::*;
use super::error::*;
use super::ipc::{plugin_dir, uds_path, TransPort, PLUGIN_EXEC_SUFFIX};
use super::job::{JobState, JobStatus};
use super::misc::{uri_plugin_name, verify_init_id_str};

const DEFAULT_TIMEOUT: u32 = 30_000;
const JOB_RETRY_INTERVAL: u64 = 200; // milliseconds

// Build the `params` object of a request.
macro_rules! args {
    ($($key:literal => $val:expr),* $(,)?) => {{
        let mut args = Map::new();
        $(args.insert($key.to_string(), serde_json::to_value($val)?);)*
        Some(args)
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Open,
    Closed,
    // Channel failed, only `close()` is allowed.
    Broken,
}

/// Represent the connection to plugin.
///
/// One connection talks to one plugin process, one request at a time.
/// Dropping the connection closes it.
pub struct Client {
    tp: TransPort,
    plugin_name: String,
    state: ConnState,
}

trait OkOrPlugBug<T> {
    fn ok_or_plugin_bug(self, val: &Value) -> Result<T>;
}

impl<T> OkOrPlugBug<T> for Option<T> {
    fn ok_or_plugin_bug(self, val: &Value) -> Result<T> {
        match self {
            Some(i) => Ok(i),
            None => Err(LsmError::PluginBug(format!(
                "Plugin return unexpected data: {:?}",
                val
            ))),
        }
    }
}

/// Represent a plugin information
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    /// Plugin version string.
    pub version: String,
    /// Plugin description.
    pub description: String,
    /// Plugin name.
    pub name: String,
}

fn plugin_info_from_value(val: &Value, name: &str) -> Result<PluginInfo> {
    let data: Vec<String> = serde_json::from_value(val.clone())?;
    let desc = data.get(0).ok_or_plugin_bug(val)?;
    let version = data.get(1).ok_or_plugin_bug(val)?;
    Ok(PluginInfo {
        version: version.to_string(),
        description: desc.to_string(),
        name: name.to_string(),
    })
}

fn collect_names(
    dir: &str,
    suffix: &str,
    names: &mut BTreeSet<String>,
) -> bool {
    let entries = match read_dir(dir) {
        Ok(e) => e,
        Err(_) => return false,
    };
    // Entries failing to iterate might be removed in the middle, skip them.
    for entry in entries.flatten() {
        if let Ok(name) = entry.file_name().into_string() {
            if suffix.is_empty() {
                names.insert(name);
            } else if let Some(n) = name.strip_suffix(suffix) {
                if !n.is_empty() {
                    names.insert(n.to_string());
                }
            }
        }
    }
    true
}

/// Query all available plugins, both executables in plugin folder and
/// sockets of libstoragemgmt daemon.
///
/// # Errors
///
///  * [`LsmError::DaemonNotRunning`][1]: Neither plugin folder nor daemon
///    socket folder is accessible.
///
/// [1]: enum.LsmError.html#variant.DaemonNotRunning
pub fn available_plugins() -> Result<Vec<PluginInfo>> {
    let mut names = BTreeSet::new();
    let found_exec =
        collect_names(&plugin_dir(), PLUGIN_EXEC_SUFFIX, &mut names);
    let found_uds = collect_names(&uds_path(), "", &mut names);
    if !found_exec && !found_uds {
        return Err(LsmError::DaemonNotRunning(format!(
            "LibStorageMgmt daemon is not running for socket folder: '{}'",
            uds_path()
        )));
    }
    let mut ret = Vec::new();
    for name in names {
        // plugin_register() and plugin_unregister() are not needed for
        // plugin_info()
        let mut tp = TransPort::new(&name)?;
        let val = tp.invoke("plugin_info", None)?;
        ret.push(plugin_info_from_value(&val, &name)?);
    }
    Ok(ret)
}

impl Client {
    /// Create a connection to plugin.
    /// Please refer to [libstoragemgmt user guide][1] for how to choose the
    /// URI and password.
    ///
    /// The `timeout` argument is in milliseconds, default is 30 seconds.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::InvalidArgument`][2]: Invalid URI.
    ///  * [`LsmError::PluginNotExist`][3]: No plugin for URI scheme.
    ///
    /// [1]: https://libstorage.github.io/libstoragemgmt-doc/doc/user_guide.html
    /// [2]: enum.LsmError.html#variant.InvalidArgument
    /// [3]: enum.LsmError.html#variant.PluginNotExist
    pub fn new(
        uri: &str,
        password: Option<&str>,
        timeout: Option<u32>,
    ) -> Result<Client> {
        let plugin_name = uri_plugin_name(uri)?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let mut tp = TransPort::new(&plugin_name)?;
        tp.set_timeout(timeout)?;
        tp.invoke(
            "plugin_register",
            args! {
                "password" => password,
                "uri" => uri,
                "timeout" => timeout,
            },
        )?;
        debug!("Connected to plugin {}", plugin_name);

        Ok(Client {
            tp,
            plugin_name,
            state: ConnState::Open,
        })
    }

    fn invoke(
        &mut self,
        cmd: &str,
        args: Option<Map<String, Value>>,
    ) -> Result<Value> {
        match self.state {
            ConnState::Open => (),
            ConnState::Closed => {
                return Err(LsmError::InvalidArgument(
                    "Connection is already closed".to_string(),
                ))
            }
            ConnState::Broken => {
                return Err(LsmError::PluginIpcFail(
                    "Connection is broken by previous failure".to_string(),
                ))
            }
        }
        let ret = self.tp.invoke(cmd, args);
        if let Err(ref e) = ret {
            match e {
                LsmError::TimeOut(_)
                | LsmError::PluginIpcFail(_)
                | LsmError::TransportCommunication(_) => {
                    warn!(
                        "Connection to plugin {} broken: {}",
                        self.plugin_name, e
                    );
                    self.state = ConnState::Broken;
                    self.tp.shutdown();
                }
                _ => (),
            }
        }
        ret
    }

    fn invoke_into<T: DeserializeOwned>(
        &mut self,
        cmd: &str,
        args: Option<Map<String, Value>>,
    ) -> Result<T> {
        Ok(serde_json::from_value(self.invoke(cmd, args)?)?)
    }

    /// Close the connection, plugin is notified and terminated.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::InvalidArgument`][1]: Connection is already closed.
    ///
    /// [1]: enum.LsmError.html#variant.InvalidArgument
    pub fn close(&mut self) -> Result<()> {
        let ret = match self.state {
            ConnState::Closed => {
                return Err(LsmError::InvalidArgument(
                    "Connection is already closed".to_string(),
                ))
            }
            ConnState::Broken => Ok(()),
            ConnState::Open => {
                self.invoke("plugin_unregister", None).map(|_| ())
            }
        };
        self.state = ConnState::Closed;
        self.tp.shutdown();
        ret
    }

    /// Error detail of last failed call, including vendor exception and
    /// debug message if plugin provided.
    pub fn last_error(&self) -> Option<ErrorInfo> {
        self.tp.last_error().cloned()
    }

    fn list<T: Searchable + DeserializeOwned>(
        &mut self,
        cmd: &str,
        search: Option<(&str, &str)>,
    ) -> Result<Vec<T>> {
        let args = match search {
            Some((key, value)) => {
                if !T::SEARCH_KEYS.contains(&key) {
                    return Err(LsmError::UnSupportedSearchKey(format!(
                        "Unsupported search key '{}', supported keys are {:?}",
                        key,
                        T::SEARCH_KEYS
                    )));
                }
                args! {"search_key" => key, "search_value" => value}
            }
            None => None,
        };
        self.invoke_into(cmd, args)
    }

    /// Gets a list of systems on this connection.
    pub fn systems(&mut self) -> Result<Vec<System>> {
        self.invoke_into("systems", None)
    }

    /// Gets a list of volumes on this connection.
    pub fn volumes(&mut self) -> Result<Vec<Volume>> {
        self.list("volumes", None)
    }

    /// Gets volumes whose `key` property equals to `value`. Supported keys
    /// are listed in [`Volume::SEARCH_KEYS`][1].
    ///
    /// # Errors
    ///
    ///  * [`LsmError::UnSupportedSearchKey`][2]
    ///
    /// [1]: trait.Searchable.html#associatedconstant.SEARCH_KEYS
    /// [2]: enum.LsmError.html#variant.UnSupportedSearchKey
    pub fn volumes_search(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<Vec<Volume>> {
        self.list("volumes", Some((key, value)))
    }

    /// Gets a list of pools on this connection.
    pub fn pools(&mut self) -> Result<Vec<Pool>> {
        self.list("pools", None)
    }

    /// Gets pools whose `key` property equals to `value`.
    pub fn pools_search(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<Vec<Pool>> {
        self.list("pools", Some((key, value)))
    }

    /// Gets a list of disks on this connection.
    pub fn disks(&mut self) -> Result<Vec<Disk>> {
        self.list("disks", None)
    }

    /// Gets disks whose `key` property equals to `value`.
    pub fn disks_search(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<Vec<Disk>> {
        self.list("disks", Some((key, value)))
    }

    /// Gets a list of file systems on this connection.
    pub fn fs(&mut self) -> Result<Vec<FileSystem>> {
        self.list("fs", None)
    }

    /// Gets file systems whose `key` property equals to `value`.
    pub fn fs_search(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<Vec<FileSystem>> {
        self.list("fs", Some((key, value)))
    }

    /// Gets a list of NFS exports on this connection.
    pub fn nfs_exports(&mut self) -> Result<Vec<NfsExport>> {
        self.list("exports", None)
    }

    /// Gets NFS exports whose `key` property equals to `value`.
    pub fn nfs_exports_search(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<Vec<NfsExport>> {
        self.list("exports", Some((key, value)))
    }

    /// Gets a list of access group on this connection.
    pub fn access_groups(&mut self) -> Result<Vec<AccessGroup>> {
        self.list("access_groups", None)
    }

    /// Gets access groups whose `key` property equals to `value`.
    pub fn access_groups_search(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<Vec<AccessGroup>> {
        self.list("access_groups", Some((key, value)))
    }

    /// Gets a list of target ports on this connection.
    pub fn target_ports(&mut self) -> Result<Vec<TargetPort>> {
        self.list("target_ports", None)
    }

    /// Gets target ports whose `key` property equals to `value`.
    pub fn target_ports_search(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<Vec<TargetPort>> {
        self.list("target_ports", Some((key, value)))
    }

    /// Gets a list of batteries on this connection.
    pub fn batteries(&mut self) -> Result<Vec<Battery>> {
        self.list("batteries", None)
    }

    /// Gets batteries whose `key` property equals to `value`.
    pub fn batteries_search(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<Vec<Battery>> {
        self.list("batteries", Some((key, value)))
    }

    /// Query status of a job.
    ///
    /// Methods of this crate wait for their own jobs, this is only needed
    /// for jobs created by other means.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::NotFoundJob`][1]: Job ID is unknown to plugin or
    ///    already freed.
    ///
    /// [1]: enum.LsmError.html#variant.NotFoundJob
    pub fn job_status(&mut self, job_id: &str) -> Result<JobStatus> {
        let val = self.invoke("job_status", args! {"job_id" => job_id})?;
        JobStatus::from_value(val, None)
    }

    /// Release the job. Querying a freed job gets
    /// [`LsmError::NotFoundJob`][1].
    ///
    /// [1]: enum.LsmError.html#variant.NotFoundJob
    pub fn job_free(&mut self, job_id: &str) -> Result<()> {
        self.invoke("job_free", args! {"job_id" => job_id})?;
        Ok(())
    }

    fn wait_job(
        &mut self,
        job_id: &str,
        expected: DataType,
    ) -> Result<Option<Record>> {
        loop {
            let val = self.invoke("job_status", args! {"job_id" => job_id})?;
            let status = JobStatus::from_value(val, Some(expected))?;
            match status.state {
                JobState::InProgress => {
                    debug!("Job {} is {}% done", job_id, status.percent);
                    sleep(Duration::from_millis(JOB_RETRY_INTERVAL));
                }
                JobState::Complete => {
                    self.job_free(job_id)?;
                    return Ok(status.data);
                }
                JobState::Error => {
                    if let Err(e) = self.job_free(job_id) {
                        debug!("Failed to free job {}: {}", job_id, e);
                    }
                    let e = status.error.unwrap_or_else(|| {
                        LsmError::PluginBug(
                            "Got no error detail for failed job".to_string(),
                        )
                    });
                    self.tp.set_last_error(
                        status
                            .error_detail
                            .unwrap_or_else(|| ErrorInfo::from_error(&e)),
                    );
                    return Err(e);
                }
            }
        }
    }

    fn wait_if_async(&mut self, ret: &Value) -> Result<()> {
        if ret.is_null() {
            return Ok(());
        }
        self.wait_job(ret.as_str().ok_or_plugin_bug(ret)?, DataType::None)?;
        Ok(())
    }

    fn get_record_from_async(
        &mut self,
        ret: Value,
        expected: DataType,
    ) -> Result<Record> {
        let (job_id, data): (Option<String>, Value) =
            serde_json::from_value(ret.clone()).map_err(|_| {
                LsmError::PluginBug(format!(
                    "Plugin return unexpected data: {:?}",
                    ret
                ))
            })?;
        let rec = match job_id {
            None => Record::from_value(data, expected)?,
            Some(j) => self.wait_job(&j, expected)?,
        };
        rec.ok_or_else(|| {
            LsmError::PluginBug(format!(
                "Expecting {:?}, but got None",
                expected
            ))
        })
    }

    fn get_vol_from_async(&mut self, ret: Value) -> Result<Volume> {
        match self.get_record_from_async(ret, DataType::Volume)? {
            Record::Volume(v) => Ok(v),
            r => Err(unexpected_record(&r)),
        }
    }

    fn get_fs_from_async(&mut self, ret: Value) -> Result<FileSystem> {
        match self.get_record_from_async(ret, DataType::FileSystem)? {
            Record::FileSystem(f) => Ok(f),
            r => Err(unexpected_record(&r)),
        }
    }

    fn get_fs_snap_from_async(
        &mut self,
        ret: Value,
    ) -> Result<FileSystemSnapShot> {
        match self.get_record_from_async(ret, DataType::FsSnapshot)? {
            Record::FsSnapshot(s) => Ok(s),
            r => Err(unexpected_record(&r)),
        }
    }

    /// Create new volume.
    ///
    ///  * `pool` -- The pool where new volume should allocated from.
    ///  * `name` -- The name of new volume. It might be altered or
    ///    ignored.
    ///  * `size_bytes` -- Size in bytes of new volume. You may use function
    ///    [`size_human_2_size_bytes()`][1] to convert string like '1.1 GiB'
    ///    to integer size bytes.
    ///  * `thinp` -- Whether to create thin provisioning volume.
    ///    Check [VolumeCreateArgThinP][2]
    ///
    /// # Errors
    ///
    ///  * [`LsmError::NoEnoughSpace`][3]: Pool has not enough free space.
    ///  * [`LsmError::NameConflict`][4]: Volume name is used.
    ///
    /// [1]: fn.size_human_2_size_bytes.html
    /// [2]: enum.VolumeCreateArgThinP.html
    /// [3]: enum.LsmError.html#variant.NoEnoughSpace
    /// [4]: enum.LsmError.html#variant.NameConflict
    pub fn volume_create(
        &mut self,
        pool: &Pool,
        name: &str,
        size_bytes: u64,
        thinp: &VolumeCreateArgThinP,
    ) -> Result<Volume> {
        let ret = self.invoke(
            "volume_create",
            args! {
                "pool" => pool,
                "volume_name" => name,
                "size_bytes" => size_bytes,
                "provisioning" => thinp.to_int(),
            },
        )?;
        self.get_vol_from_async(ret)
    }

    /// Delete a volume
    ///
    /// # Errors
    ///
    ///  * [`LsmError::HasChildDependency`][1] volume has child dependency.
    ///    e.g. specified volume is a replication source. Please use
    ///    [`Client::vol_child_dep_rm()`][2] to eliminate child dependency.
    ///  * [`LsmError::IsMasked`][3] volume is masked to access group.
    ///
    /// [1]: enum.LsmError.html#variant.HasChildDependency
    /// [2]: #method.vol_child_dep_rm
    /// [3]: enum.LsmError.html#variant.IsMasked
    pub fn volume_delete(&mut self, vol: &Volume) -> Result<()> {
        let ret = self.invoke("volume_delete", args! {"volume" => vol})?;
        self.wait_if_async(&ret)
    }

    /// Set connection timeout value in milliseconds.
    pub fn time_out_set(&mut self, ms: u32) -> Result<()> {
        self.invoke("time_out_set", args! {"ms" => ms})?;
        self.tp.set_timeout(ms)
    }

    /// Get connection timeout value.
    pub fn time_out_get(&mut self) -> Result<u32> {
        self.invoke_into("time_out_get", None)
    }

    /// Get system's capabilities.
    ///
    /// Capability is used to indicate whether certain functionality is
    /// supported by specified storage system. Please check desired function
    /// for required capability. To verify capability is supported, use
    /// [`Capabilities::is_supported()`][1]. If the functionality is not
    /// listed in the enumerated [`Capability`][2] type then that functionality
    /// is mandatory and required to exist.
    ///
    /// [1]: struct.Capabilities.html#method.is_supported
    /// [2]: enum.Capability.html
    pub fn capabilities(&mut self, sys: &System) -> Result<Capabilities> {
        self.invoke_into("capabilities", args! {"system" => sys})
    }

    /// Get plugin information.
    pub fn plugin_info(&mut self) -> Result<PluginInfo> {
        let val = self.invoke("plugin_info", None)?;
        plugin_info_from_value(&val, &self.plugin_name)
    }

    /// Changes the read cache percentage for the specified system.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::InvalidArgument`][1]: `read_pct` is larger than 100.
    ///
    /// [1]: enum.LsmError.html#variant.InvalidArgument
    pub fn sys_read_cache_pct_set(
        &mut self,
        sys: &System,
        read_pct: u32,
    ) -> Result<()> {
        if read_pct > 100 {
            return Err(LsmError::InvalidArgument(
                "Invalid read_pct, should be in range 0 - 100".to_string(),
            ));
        }
        self.invoke(
            "system_read_cache_pct_update",
            args! {"system" => sys, "read_pct" => read_pct},
        )?;
        Ok(())
    }

    /// Set(override) iSCSI CHAP authentication.
    ///
    ///  * `init_id` -- Initiator ID.
    ///  * `in_user` -- The inbound authentication username. The inbound
    ///    authentication means the iSCSI initiator authenticates the iSCSI
    ///    target using CHAP.
    ///  * `in_pass` -- The inbond authentication password.
    ///  * `out_user` -- The outbound authentication username. The outbound
    ///    authentication means the iSCSI target authenticates the iSCSI
    ///    initiator using CHAP.
    ///  * `out_pass` -- The outbound authentication password.
    pub fn iscsi_chap_auth_set(
        &mut self,
        init_id: &str,
        in_user: Option<&str>,
        in_pass: Option<&str>,
        out_user: Option<&str>,
        out_pass: Option<&str>,
    ) -> Result<()> {
        let init_id = verify_init_id_str(init_id, InitiatorType::IscsiIqn)?;
        self.invoke(
            "iscsi_chap_auth",
            args! {
                "init_id" => init_id,
                "in_user" => in_user,
                "in_password" => in_pass,
                "out_user" => out_user,
                "out_password" => out_pass,
            },
        )?;
        Ok(())
    }

    /// Resize a volume.
    ///
    /// Please check whether pool allows volume resize via
    /// [`Pool.unsupported_actions`][1].
    ///
    /// [1]: struct.Pool.html#structfield.unsupported_actions
    pub fn volume_resize(
        &mut self,
        vol: &Volume,
        new_size_bytes: u64,
    ) -> Result<Volume> {
        let ret = self.invoke(
            "volume_resize",
            args! {"volume" => vol, "new_size_bytes" => new_size_bytes},
        )?;
        self.get_vol_from_async(ret)
    }

    /// Replicate a volume.
    ///
    ///  * `pool` -- The pool where new replication target volume should be
    ///    allocated from. For `None`, will use the same pool of source volume.
    ///  * `rep_type` -- Replication type.
    ///  * `src_vol` -- Replication source volume.
    ///  * `name` -- Name for replication target volume. Might be altered or
    ///    ignored.
    pub fn volume_replicate(
        &mut self,
        pool: Option<&Pool>,
        rep_type: VolumeReplicateType,
        src_vol: &Volume,
        name: &str,
    ) -> Result<Volume> {
        let ret = self.invoke(
            "volume_replicate",
            args! {
                "pool" => pool,
                "volume_src" => src_vol,
                "rep_type" => rep_type,
                "name" => name,
            },
        )?;
        self.get_vol_from_async(ret)
    }

    /// Block size for the [`Client::volume_replicate_range()`][1].
    ///
    /// [1]: #method.volume_replicate_range
    pub fn volume_rep_range_blk_size(&mut self, sys: &System) -> Result<u32> {
        self.invoke_into(
            "volume_replicate_range_block_size",
            args! {"system" => sys},
        )
    }

    /// Replicates a portion of a volume to a volume.
    ///
    /// * `rep_type` -- Replication type.
    /// * `src_vol` -- Replication source volume.
    /// * `dst_vol` -- Replication target volume.
    /// * `ranges` -- Replication block ranges.
    pub fn volume_replicate_range(
        &mut self,
        rep_type: VolumeReplicateType,
        src_vol: &Volume,
        dst_vol: &Volume,
        ranges: &[BlockRange],
    ) -> Result<()> {
        if ranges.is_empty() {
            return Err(LsmError::InvalidArgument(
                "No block range defined".to_string(),
            ));
        }
        let ret = self.invoke(
            "volume_replicate_range",
            args! {
                "rep_type" => rep_type,
                "ranges" => ranges,
                "volume_src" => src_vol,
                "volume_dest" => dst_vol,
            },
        )?;
        self.wait_if_async(&ret)
    }

    /// Set a Volume to online.
    ///
    /// Enable the specified volume when that volume is disabled by
    /// administrator or via [`Client::volume_disable()`][1]
    ///
    /// [1]: #method.volume_disable
    pub fn volume_enable(&mut self, vol: &Volume) -> Result<()> {
        self.invoke("volume_enable", args! {"volume" => vol})?;
        Ok(())
    }

    /// Disable the read and write access to the specified volume.
    pub fn volume_disable(&mut self, vol: &Volume) -> Result<()> {
        self.invoke("volume_disable", args! {"volume" => vol})?;
        Ok(())
    }

    /// Grant access to a volume for the specified group, also known as LUN
    /// masking or mapping.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::EmptyAccessGroup`][1]: Cannot mask volume to empty
    ///    access group.
    ///
    /// [1]: enum.LsmError.html#variant.EmptyAccessGroup
    pub fn volume_mask(
        &mut self,
        vol: &Volume,
        ag: &AccessGroup,
    ) -> Result<()> {
        self.invoke(
            "volume_mask",
            args! {"volume" => vol, "access_group" => ag},
        )?;
        Ok(())
    }

    /// Revokes access to a volume for the specified group
    pub fn volume_unmask(
        &mut self,
        vol: &Volume,
        ag: &AccessGroup,
    ) -> Result<()> {
        self.invoke(
            "volume_unmask",
            args! {"volume" => vol, "access_group" => ag},
        )?;
        Ok(())
    }

    /// Create a access group.
    ///
    /// Creates a new access group with one initiator in it. You may expand
    /// the access group by adding more initiators via
    /// [`Client::access_group_init_add()`][1]
    ///
    /// # Errors
    ///
    ///  * [`LsmError::ExistsInitiator`][2]: Specified initiator is used by
    ///    other access group.
    ///
    /// [1]: #method.access_group_init_add
    /// [2]: enum.LsmError.html#variant.ExistsInitiator
    pub fn access_group_create(
        &mut self,
        name: &str,
        init_id: &str,
        init_type: InitiatorType,
        sys: &System,
    ) -> Result<AccessGroup> {
        let init_id = verify_init_id_str(init_id, init_type)?;
        self.invoke_into(
            "access_group_create",
            args! {
                "name" => name,
                "init_id" => init_id,
                "init_type" => init_type,
                "system" => sys,
            },
        )
    }

    /// Delete an access group. Only access group with no volume masked can
    /// be deleted.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::IsMasked`][1]: Access group has volume masked to.
    ///
    /// [1]: enum.LsmError.html#variant.IsMasked
    pub fn access_group_delete(&mut self, ag: &AccessGroup) -> Result<()> {
        self.invoke("access_group_delete", args! {"access_group" => ag})?;
        Ok(())
    }

    /// Add an initiator to the access group.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::ExistsInitiator`][1]: Specified initiator is used by
    ///    other access group.
    ///
    /// [1]: enum.LsmError.html#variant.ExistsInitiator
    pub fn access_group_init_add(
        &mut self,
        ag: &AccessGroup,
        init_id: &str,
        init_type: InitiatorType,
    ) -> Result<AccessGroup> {
        let init_id = verify_init_id_str(init_id, init_type)?;
        self.invoke_into(
            "access_group_initiator_add",
            args! {
                "access_group" => ag,
                "init_id" => init_id,
                "init_type" => init_type,
            },
        )
    }

    /// Delete an initiator from an access group.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::LastInitInAccessGroup`][1]: Specified initiator is the
    ///    last initiator of access group. Use
    ///    [`Client::access_group_delete()`][2] instead.
    ///
    /// [1]: enum.LsmError.html#variant.LastInitInAccessGroup
    /// [2]: #method.access_group_delete
    pub fn access_group_init_del(
        &mut self,
        ag: &AccessGroup,
        init_id: &str,
        init_type: InitiatorType,
    ) -> Result<AccessGroup> {
        let init_id = verify_init_id_str(init_id, init_type)?;
        self.invoke_into(
            "access_group_initiator_delete",
            args! {
                "access_group" => ag,
                "init_id" => init_id,
                "init_type" => init_type,
            },
        )
    }

    /// Query volumes that the specified access group has access to.
    pub fn vols_masked_to_ag(
        &mut self,
        ag: &AccessGroup,
    ) -> Result<Vec<Volume>> {
        self.invoke_into(
            "volumes_accessible_by_access_group",
            args! {"access_group" => ag},
        )
    }

    /// Retrieves the access groups that have access to the specified volume.
    pub fn ags_granted_to_vol(
        &mut self,
        vol: &Volume,
    ) -> Result<Vec<AccessGroup>> {
        self.invoke_into(
            "access_groups_granted_to_volume",
            args! {"volume" => vol},
        )
    }

    /// Check whether volume has child dependencies.
    pub fn vol_has_child_dep(&mut self, vol: &Volume) -> Result<bool> {
        self.invoke_into("volume_child_dependency", args! {"volume" => vol})
    }

    /// Delete all child dependencies of the specified volume.
    ///
    /// Instruct storage system to remove all child dependencies of the
    /// specified volume by duplicating the required storage before breaking
    /// replication relationship. This function might take a long time(days or
    /// even weeks), you might want to invoke it in a thread.
    pub fn vol_child_dep_rm(&mut self, vol: &Volume) -> Result<()> {
        let ret =
            self.invoke("volume_child_dependency_rm", args! {"volume" => vol})?;
        self.wait_if_async(&ret)
    }

    /// Create a new file system.
    ///
    ///  * `pool` -- The pool where new file system should allocated from.
    ///  * `name` -- The name of new file system. It might be altered or
    ///    ignored.
    ///  * `size_bytes` -- Size in bytes of new file system. You may use
    ///    function [`size_human_2_size_bytes()`][1] to convert string like
    ///    '1.1 GiB' to integer size bytes.
    ///
    /// [1]: fn.size_human_2_size_bytes.html
    pub fn fs_create(
        &mut self,
        pool: &Pool,
        name: &str,
        size_bytes: u64,
    ) -> Result<FileSystem> {
        let ret = self.invoke(
            "fs_create",
            args! {"pool" => pool, "name" => name, "size_bytes" => size_bytes},
        )?;
        self.get_fs_from_async(ret)
    }

    /// Resize of file system.
    pub fn fs_resize(
        &mut self,
        fs: &FileSystem,
        new_size_bytes: u64,
    ) -> Result<FileSystem> {
        let ret = self.invoke(
            "fs_resize",
            args! {"fs" => fs, "new_size_bytes" => new_size_bytes},
        )?;
        self.get_fs_from_async(ret)
    }

    /// Delete a file system.
    ///
    /// When file system has snapshot attached, all its snapshot will be
    /// deleted also. When file system is exported, all its exports will be
    /// deleted also. If specified file system is has child dependency, it
    /// cannot be deleted, please use [`Client::fs_has_child_dep()`][1] and
    /// [`Client::fs_child_dep_rm()`][2].
    ///
    /// [1]: #method.fs_has_child_dep
    /// [2]: #method.fs_child_dep_rm
    pub fn fs_delete(&mut self, fs: &FileSystem) -> Result<()> {
        let ret = self.invoke("fs_delete", args! {"fs" => fs})?;
        self.wait_if_async(&ret)
    }

    /// Clones an existing file system
    ///
    /// Create a point in time read writeable space efficient copy of specified
    /// file system, also know as read writeable snapshot. The new file system
    /// will reside in the same pool of specified file system.
    ///
    /// Optionally, new file system could be based on a snapshot specified by
    /// `snapshot` argument.
    pub fn fs_clone(
        &mut self,
        src_fs: &FileSystem,
        dst_fs_name: &str,
        snapshot: Option<&FileSystemSnapShot>,
    ) -> Result<FileSystem> {
        let ret = self.invoke(
            "fs_clone",
            args! {
                "src_fs" => src_fs,
                "dest_fs_name" => dst_fs_name,
                "snapshot" => snapshot,
            },
        )?;
        self.get_fs_from_async(ret)
    }

    /// Clones a file on a file system.
    ///
    /// Optionally, file contents could be based on a snapshot specified by
    /// `snapshot` argument.
    pub fn fs_file_clone(
        &mut self,
        fs: &FileSystem,
        src_file_name: &str,
        dst_file_name: &str,
        snapshot: Option<&FileSystemSnapShot>,
    ) -> Result<()> {
        let ret = self.invoke(
            "fs_file_clone",
            args! {
                "fs" => fs,
                "src_file_name" => src_file_name,
                "dest_file_name" => dst_file_name,
                "snapshot" => snapshot,
            },
        )?;
        self.wait_if_async(&ret)
    }

    /// Get a list of snapshots of specified file system.
    pub fn fs_snapshots(
        &mut self,
        fs: &FileSystem,
    ) -> Result<Vec<FileSystemSnapShot>> {
        self.invoke_into("fs_snapshots", args! {"fs" => fs})
    }

    /// Create a file system snapshot.
    pub fn fs_snapshot_create(
        &mut self,
        fs: &FileSystem,
        name: &str,
    ) -> Result<FileSystemSnapShot> {
        let ret = self.invoke(
            "fs_snapshot_create",
            args! {"fs" => fs, "snapshot_name" => name},
        )?;
        self.get_fs_snap_from_async(ret)
    }

    /// Delete a file system snapshot.
    pub fn fs_snapshot_delete(
        &mut self,
        fs: &FileSystem,
        snapshot: &FileSystemSnapShot,
    ) -> Result<()> {
        let ret = self.invoke(
            "fs_snapshot_delete",
            args! {"fs" => fs, "snapshot" => snapshot},
        )?;
        self.wait_if_async(&ret)
    }

    /// Restore a file system based on specified snapshot.
    ///
    ///  * `fs` -- File system to restore.
    ///  * `snapshot` -- Snapshot to use.
    ///  * `all_file` -- `true` for restore all files. `false` for restore
    ///    specified files only.
    ///  * `files` -- Only restored specified files. Ignored if `all_file` is
    ///    `true`.
    ///  * `restore_files` -- If not `None`, rename restored files to defined
    ///    file paths and names
    pub fn fs_snapshot_restore(
        &mut self,
        fs: &FileSystem,
        snapshot: &FileSystemSnapShot,
        all_file: bool,
        files: Option<&[&str]>,
        restore_files: Option<&[&str]>,
    ) -> Result<()> {
        let (files, restore_files) = if all_file {
            (&[][..], &[][..])
        } else {
            let files = files.unwrap_or(&[]);
            if files.is_empty() {
                return Err(LsmError::InvalidArgument(
                    "Invalid argument: `all_file` is false while \
                     `files` is empty"
                        .to_string(),
                ));
            }
            let restore_files = restore_files.unwrap_or(&[]);
            if !restore_files.is_empty() && files.len() != restore_files.len()
            {
                return Err(LsmError::InvalidArgument(
                    "Invalid argument: `files` and `restore_files` have \
                     different length"
                        .to_string(),
                ));
            }
            (files, restore_files)
        };
        let ret = self.invoke(
            "fs_snapshot_restore",
            args! {
                "fs" => fs,
                "snapshot" => snapshot,
                "files" => files,
                "restore_files" => restore_files,
                "all_files" => all_file,
            },
        )?;
        self.wait_if_async(&ret)
    }

    /// Checks whether file system has a child dependency.
    pub fn fs_has_child_dep(
        &mut self,
        fs: &FileSystem,
        files: Option<Vec<&str>>,
    ) -> Result<bool> {
        let files: Vec<&str> = files.unwrap_or_default();
        self.invoke_into(
            "fs_child_dependency",
            args! {"fs" => fs, "files" => files},
        )
    }

    /// Delete all child dependencies of the specified file system.
    ///
    /// Instruct storage system to remove all child dependencies of the
    /// specified file system by duplicating the required storage before
    /// breaking replication relationship. This function might take a long
    /// time(days or even weeks), you might want to invoke it in a thread.
    pub fn fs_child_dep_rm(
        &mut self,
        fs: &FileSystem,
        files: Option<Vec<&str>>,
    ) -> Result<()> {
        let files: Vec<&str> = files.unwrap_or_default();
        let ret = self.invoke(
            "fs_child_dependency_rm",
            args! {"fs" => fs, "files" => files},
        )?;
        self.wait_if_async(&ret)
    }

    /// Get supported NFS client authentication types.
    pub fn nfs_exp_auth_type_list(&mut self) -> Result<Vec<String>> {
        self.invoke_into("export_auth", None)
    }

    /// Create or modify an NFS export.
    ///
    /// * `fs` -- File system to export.
    /// * `export_path` -- Export path. If already exists, will modify exist NFS
    ///   export. If `None`, will let storage system to generate one.
    /// * `access` -- NFS access details.
    /// * `auth_type` -- NFS client authentication type. Get from
    ///   [`Client::nfs_exp_auth_type_list()`][1].
    /// * `options` -- Extra NFS options.
    ///
    /// [1]: #method.nfs_exp_auth_type_list
    pub fn fs_export(
        &mut self,
        fs: &FileSystem,
        export_path: Option<&str>,
        access: &NfsAccess,
        auth_type: Option<&str>,
        options: Option<&str>,
    ) -> Result<NfsExport> {
        verify_nfs_access(access)?;
        self.invoke_into(
            "export_fs",
            args! {
                "fs_id" => &fs.id,
                "export_path" => export_path,
                "root_list" => access.root_list,
                "rw_list" => access.rw_list,
                "ro_list" => access.ro_list,
                "anon_uid" =>
                    access.anon_uid.unwrap_or(NfsExport::ANON_UID_GID_NA),
                "anon_gid" =>
                    access.anon_gid.unwrap_or(NfsExport::ANON_UID_GID_NA),
                "auth_type" => auth_type,
                "options" => options,
            },
        )
    }

    /// Unexport specified NFS exports.
    pub fn fs_unexport(&mut self, exp: &NfsExport) -> Result<()> {
        self.invoke("export_remove", args! {"export" => exp})?;
        Ok(())
    }

    /// Get volume RAID information.
    pub fn vol_raid_info(&mut self, vol: &Volume) -> Result<VolumeRaidInfo> {
        let val = self.invoke("volume_raid_info", args! {"volume" => vol})?;
        VolumeRaidInfo::from_value(&val)
    }

    /// Get pool member information.
    pub fn pool_member_info(&mut self, pool: &Pool) -> Result<PoolMemberInfo> {
        let val = self.invoke("pool_member_info", args! {"pool" => pool})?;
        PoolMemberInfo::from_value(&val, |kind| {
            Ok(match kind {
                PoolMemberKind::Disk => {
                    self.disks()?.into_iter().map(PoolMember::Disk).collect()
                }
                PoolMemberKind::Pool => {
                    self.pools()?.into_iter().map(PoolMember::Pool).collect()
                }
            })
        })
    }

    /// Get system capability on creating RAIDed volume. For hardware RAID
    /// only.
    ///
    /// Returns supported RAID types and strip sizes.
    pub fn vol_raid_create_cap_get(
        &mut self,
        sys: &System,
    ) -> Result<(Vec<RaidType>, Vec<u32>)> {
        let ret = self
            .invoke("volume_raid_create_cap_get", args! {"system" => sys})?;
        let (raid_types, strip_sizes): (Vec<i32>, Vec<u32>) =
            serde_json::from_value(ret.clone()).map_err(|_| {
                LsmError::PluginBug(format!(
                    "vol_raid_create_cap_get() is expecting array with \
                     2 members from plugin, but got '{:?}'",
                    ret
                ))
            })?;
        Ok((
            raid_types.into_iter().map(RaidType::from).collect(),
            strip_sizes,
        ))
    }

    /// Create RAIDed volume directly from disks. Only for hardware RAID.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::InvalidArgument`][1]: Disk count does not fit the RAID
    ///    type.
    ///  * [`LsmError::DiskNotFree`][2]: Some disk is in use.
    ///
    /// [1]: enum.LsmError.html#variant.InvalidArgument
    /// [2]: enum.LsmError.html#variant.DiskNotFree
    pub fn vol_raid_create(
        &mut self,
        name: &str,
        raid_type: RaidType,
        disks: &[Disk],
        strip_size: Option<u32>,
    ) -> Result<Volume> {
        verify_raid_disk_count(raid_type, disks.len())?;
        self.invoke_into(
            "volume_raid_create",
            args! {
                "name" => name,
                "raid_type" => raid_type,
                "disks" => disks,
                "strip_size" => strip_size.unwrap_or(0u32),
            },
        )
    }

    /// Turn on the identification LED for the specified volume.
    ///
    /// All its member disks' identification LED will be turned on.
    pub fn vol_ident_led_on(&mut self, vol: &Volume) -> Result<()> {
        self.invoke("volume_ident_led_on", args! {"volume" => vol})?;
        Ok(())
    }

    /// Turn off the identification LED for the specified volume.
    ///
    /// All its member disks' identification LED will be turned off.
    pub fn vol_ident_led_off(&mut self, vol: &Volume) -> Result<()> {
        self.invoke("volume_ident_led_off", args! {"volume" => vol})?;
        Ok(())
    }

    /// Get cache information on specified volume.
    pub fn vol_cache_info(&mut self, vol: &Volume) -> Result<VolumeCacheInfo> {
        let val = self.invoke("volume_cache_info", args! {"volume" => vol})?;
        VolumeCacheInfo::from_value(&val)
    }

    /// Set volume physical disk cache policy.
    pub fn vol_phy_disk_cache_set(
        &mut self,
        vol: &Volume,
        pdc: CachePolicy,
    ) -> Result<()> {
        let pdc = pdc
            .phy_disk_policy_to_int()
            .ok_or_else(|| invalid_policy("pdc", pdc))?;
        self.invoke(
            "volume_physical_disk_cache_update",
            args! {"volume" => vol, "pdc" => pdc},
        )?;
        Ok(())
    }

    /// Set volume write cache policy.
    pub fn vol_write_cache_set(
        &mut self,
        vol: &Volume,
        wcp: CachePolicy,
    ) -> Result<()> {
        let wcp = wcp
            .write_policy_to_int()
            .ok_or_else(|| invalid_policy("wcp", wcp))?;
        self.invoke(
            "volume_write_cache_policy_update",
            args! {"volume" => vol, "wcp" => wcp},
        )?;
        Ok(())
    }

    /// Set volume read cache policy.
    pub fn vol_read_cache_set(
        &mut self,
        vol: &Volume,
        rcp: CachePolicy,
    ) -> Result<()> {
        let rcp = rcp
            .read_policy_to_int()
            .ok_or_else(|| invalid_policy("rcp", rcp))?;
        self.invoke(
            "volume_read_cache_policy_update",
            args! {"volume" => vol, "rcp" => rcp},
        )?;
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.state != ConnState::Closed {
            if let Err(e) = self.close() {
                debug!("Failed to close connection: {}", e);
            }
        }
    }
}

fn unexpected_record(r: &Record) -> LsmError {
    LsmError::PluginBug(format!("Got unexpected record {:?}", r.data_type()))
}

fn invalid_policy(name: &str, policy: CachePolicy) -> LsmError {
    LsmError::InvalidArgument(format!("Invalid {} argument {:?}", name, policy))
}

fn verify_nfs_access(access: &NfsAccess) -> Result<()> {
    let root_list = access.root_list;
    let rw_list = access.rw_list;
    let ro_list = access.ro_list;

    if rw_list.is_empty() && ro_list.is_empty() {
        return Err(LsmError::InvalidArgument(
            "At least one host should exists in `rw_list` or `ro_list`"
                .to_string(),
        ));
    }
    for host in root_list {
        if !rw_list.contains(host) && !ro_list.contains(host) {
            return Err(LsmError::InvalidArgument(format!(
                "Host defined in `root_list` should be also \
                 defined in `rw_list` or `ro_list`: '{}'",
                host
            )));
        }
    }
    for host in rw_list {
        if ro_list.contains(host) {
            return Err(LsmError::InvalidArgument(format!(
                "Host should not both in `rw_list` and `ro_list`: '{}'",
                host
            )));
        }
    }
    Ok(())
}

fn verify_raid_disk_count(raid_type: RaidType, count: usize) -> Result<()> {
    let err = |msg: &str| Err(LsmError::InvalidArgument(msg.to_string()));
    match raid_type {
        _ if count == 0 => err("no disk included"),
        RaidType::Raid1 if count != 2 => err("RAID 1 only allow 2 disks"),
        RaidType::Raid5 if count < 3 => err("RAID 5 require 3 or more disks"),
        RaidType::Raid6 if count < 4 => err("RAID 6 require 4 or more disks"),
        RaidType::Raid10 if count % 2 != 0 || count < 4 => {
            err("RAID 10 require even disks count and 4 or more disks")
        }
        RaidType::Raid50 if count % 2 != 0 || count < 6 => {
            err("RAID 50 require even disks count and 6 or more disks")
        }
        RaidType::Raid60 if count % 2 != 0 || count < 8 => {
            err("RAID 60 require even disks count and 8 or more disks")
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raid_disk_count() {
        assert!(verify_raid_disk_count(RaidType::Raid0, 0).is_err());
        assert!(verify_raid_disk_count(RaidType::Raid1, 3).is_err());
        assert!(verify_raid_disk_count(RaidType::Raid1, 2).is_ok());
        assert!(verify_raid_disk_count(RaidType::Raid5, 2).is_err());
        assert!(verify_raid_disk_count(RaidType::Raid10, 5).is_err());
        assert!(verify_raid_disk_count(RaidType::Raid10, 4).is_ok());
        assert!(verify_raid_disk_count(RaidType::Raid60, 8).is_ok());
    }

    #[test]
    fn nfs_host_lists() {
        let access = NfsAccess {
            root_list: &["host1"],
            rw_list: &["host1"],
            ro_list: &[],
            anon_uid: None,
            anon_gid: None,
        };
        assert!(verify_nfs_access(&access).is_ok());

        let access = NfsAccess {
            root_list: &["host2"],
            rw_list: &["host1"],
            ro_list: &[],
            anon_uid: None,
            anon_gid: None,
        };
        assert!(verify_nfs_access(&access).is_err());

        let access = NfsAccess {
            root_list: &[],
            rw_list: &["host1"],
            ro_list: &["host1"],
            anon_uid: None,
            anon_gid: None,
        };
        assert!(verify_nfs_access(&access).is_err());

        let access = NfsAccess {
            root_list: &[],
            rw_list: &[],
            ro_list: &[],
            anon_uid: None,
            anon_gid: None,
        };
        assert!(verify_nfs_access(&access).is_err());
    }

    #[test]
    fn plugin_info_decoding() {
        let info =
            plugin_info_from_value(&json!(["Simulator", "1.0"]), "simc")
                .unwrap();
        assert_eq!("Simulator", info.description);
        assert_eq!("1.0", info.version);
        assert_eq!("simc", info.name);
        match plugin_info_from_value(&json!(["Simulator"]), "simc") {
            Err(LsmError::PluginBug(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn missing_plugin() {
        std::env::set_var("LSM_PLUGIN_DIR", "/nonexistent/lsm/plugins");
        std::env::set_var("LSM_UDS_PATH", "/nonexistent/lsm/ipc");
        match Client::new("nosuchplugin://", None, None) {
            Err(LsmError::PluginNotExist(_)) => (),
            Err(e) => panic!("unexpected error {:?}", e),
            Ok(_) => panic!("connected to nonexistent plugin"),
        }
        match available_plugins() {
            Err(LsmError::DaemonNotRunning(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn silent_plugin_times_out_and_breaks_connection() {
        use std::os::unix::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silent");
        let listener = UnixListener::bind(&path).unwrap();
        let mut tp = TransPort::connect(&path).unwrap();
        tp.set_timeout(100).unwrap();
        let (_peer, _) = listener.accept().unwrap();

        let mut c = Client {
            tp,
            plugin_name: "silent".to_string(),
            state: ConnState::Open,
        };
        match c.systems() {
            Err(LsmError::TimeOut(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        assert_eq!(Some(11), c.last_error().map(|i| i.code));
        match c.systems() {
            Err(LsmError::PluginIpcFail(msg)) => {
                assert!(msg.contains("broken by previous failure"))
            }
            r => panic!("unexpected result {:?}", r),
        }
        assert!(c.close().is_ok());
    }
}
