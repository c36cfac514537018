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

//! Plugin side of the framework.
//!
//! A plugin implements [`Plugin`][1] and optionally [`PluginV1_2`][2] and
//! [`PluginV1_3`][3], then hands itself to [`run()`][4]. Every operation
//! not implemented by plugin replies [`LsmError::NoSupport`][5].
//!
//! [1]: trait.Plugin.html
//! [2]: trait.PluginV1_2.html
//! [3]: trait.PluginV1_3.html
//! [4]: fn.run.html
//! [5]: enum.LsmError.html#variant.NoSupport

use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::capability::Capabilities;
use super::data::*;
use super::error::*;
use super::ipc::PluginChannel;
use super::job::JobStatus;

/// Reply of operations which might finish asynchronously.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncReply<T> {
    /// Operation finished, here is the result.
    Complete(T),
    /// Operation is still running, here is the job ID to poll.
    JobStarted(String),
}

impl<T: Serialize> AsyncReply<T> {
    // Wire layout: [job_id | null, record | null]
    pub(crate) fn to_record_value(&self) -> Result<Value> {
        Ok(match self {
            AsyncReply::Complete(r) => json!([Value::Null, r]),
            AsyncReply::JobStarted(j) => json!([j, Value::Null]),
        })
    }
}

impl AsyncReply<()> {
    // Wire layout: job_id | null
    pub(crate) fn to_unit_value(&self) -> Value {
        match self {
            AsyncReply::Complete(()) => Value::Null,
            AsyncReply::JobStarted(j) => Value::String(j.clone()),
        }
    }
}

/// Search condition of list operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    pub key: String,
    pub value: String,
}

/// Arguments of `export_fs`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ExportArgs {
    pub fs_id: String,
    #[serde(default)]
    pub export_path: Option<String>,
    #[serde(default)]
    pub root_list: Vec<String>,
    #[serde(default)]
    pub rw_list: Vec<String>,
    #[serde(default)]
    pub ro_list: Vec<String>,
    pub anon_uid: i64,
    pub anon_gid: i64,
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub options: Option<String>,
}

/// Filter `items` by `search` for plugins which cannot search natively.
///
/// # Errors
///
///  * [`LsmError::UnSupportedSearchKey`][1]: `search.key` is not one of
///    `T::SEARCH_KEYS`.
///
/// [1]: enum.LsmError.html#variant.UnSupportedSearchKey
pub fn search_filter<T: Searchable>(
    items: Vec<T>,
    search: Option<&Search>,
) -> Result<Vec<T>> {
    let search = match search {
        Some(s) => s,
        None => return Ok(items),
    };
    if !T::SEARCH_KEYS.contains(&search.key.as_str()) {
        return Err(LsmError::UnSupportedSearchKey(format!(
            "Unsupported search key '{}', supported keys are {:?}",
            search.key,
            T::SEARCH_KEYS
        )));
    }
    Ok(items
        .into_iter()
        .filter(|i| i.search_field(&search.key) == Some(search.value.as_str()))
        .collect())
}

fn no_support<T>(method: &str) -> Result<T> {
    Err(LsmError::NoSupport(format!(
        "Operation '{}' is not supported by this plugin",
        method
    )))
}

/// Base operations, the v1 table.
///
/// Only `plugin_register()` is mandatory. The plugin object is the private
/// state of the plugin, alive until `plugin_unregister()`.
#[allow(unused_variables)]
pub trait Plugin {
    fn plugin_register(
        &mut self,
        uri: &str,
        password: Option<&str>,
        timeout: u32,
    ) -> Result<()>;

    /// Invoked once when client disconnects.
    fn plugin_unregister(&mut self) -> Result<()> {
        Ok(())
    }

    /// Vendor exception and debug information of the last failed call.
    ///
    /// Taken by [`run()`][1] after every request. It is sent along with the
    /// error reply when its code matches the returned error.
    ///
    /// [1]: fn.run.html
    fn error_detail(&mut self) -> Option<ErrorInfo> {
        None
    }

    fn v1_2(&mut self) -> Option<&mut dyn PluginV1_2> {
        None
    }

    fn v1_3(&mut self) -> Option<&mut dyn PluginV1_3> {
        None
    }

    fn time_out_set(&mut self, ms: u32) -> Result<()> {
        no_support("time_out_set")
    }

    fn time_out_get(&mut self) -> Result<u32> {
        no_support("time_out_get")
    }

    fn capabilities(&mut self, sys: &System) -> Result<Capabilities> {
        no_support("capabilities")
    }

    fn job_status(&mut self, job_id: &str) -> Result<JobStatus> {
        no_support("job_status")
    }

    fn job_free(&mut self, job_id: &str) -> Result<()> {
        no_support("job_free")
    }

    fn systems(&mut self) -> Result<Vec<System>> {
        no_support("systems")
    }

    fn pools(&mut self, search: Option<&Search>) -> Result<Vec<Pool>> {
        no_support("pools")
    }

    fn volumes(&mut self, search: Option<&Search>) -> Result<Vec<Volume>> {
        no_support("volumes")
    }

    fn disks(&mut self, search: Option<&Search>) -> Result<Vec<Disk>> {
        no_support("disks")
    }

    fn target_ports(
        &mut self,
        search: Option<&Search>,
    ) -> Result<Vec<TargetPort>> {
        no_support("target_ports")
    }

    fn volume_create(
        &mut self,
        pool: &Pool,
        name: &str,
        size_bytes: u64,
        thinp: VolumeCreateArgThinP,
    ) -> Result<AsyncReply<Volume>> {
        no_support("volume_create")
    }

    fn volume_replicate(
        &mut self,
        pool: Option<&Pool>,
        rep_type: VolumeReplicateType,
        src_vol: &Volume,
        name: &str,
    ) -> Result<AsyncReply<Volume>> {
        no_support("volume_replicate")
    }

    fn volume_replicate_range_block_size(
        &mut self,
        sys: &System,
    ) -> Result<u32> {
        no_support("volume_replicate_range_block_size")
    }

    fn volume_replicate_range(
        &mut self,
        rep_type: VolumeReplicateType,
        src_vol: &Volume,
        dst_vol: &Volume,
        ranges: &[BlockRange],
    ) -> Result<AsyncReply<()>> {
        no_support("volume_replicate_range")
    }

    fn volume_resize(
        &mut self,
        vol: &Volume,
        new_size_bytes: u64,
    ) -> Result<AsyncReply<Volume>> {
        no_support("volume_resize")
    }

    fn volume_delete(&mut self, vol: &Volume) -> Result<AsyncReply<()>> {
        no_support("volume_delete")
    }

    fn volume_enable(&mut self, vol: &Volume) -> Result<()> {
        no_support("volume_enable")
    }

    fn volume_disable(&mut self, vol: &Volume) -> Result<()> {
        no_support("volume_disable")
    }

    fn iscsi_chap_auth(
        &mut self,
        init_id: &str,
        in_user: Option<&str>,
        in_pass: Option<&str>,
        out_user: Option<&str>,
        out_pass: Option<&str>,
    ) -> Result<()> {
        no_support("iscsi_chap_auth")
    }

    fn access_groups(
        &mut self,
        search: Option<&Search>,
    ) -> Result<Vec<AccessGroup>> {
        no_support("access_groups")
    }

    fn access_group_create(
        &mut self,
        name: &str,
        init_id: &str,
        init_type: InitiatorType,
        sys: &System,
    ) -> Result<AccessGroup> {
        no_support("access_group_create")
    }

    fn access_group_delete(&mut self, ag: &AccessGroup) -> Result<()> {
        no_support("access_group_delete")
    }

    fn access_group_initiator_add(
        &mut self,
        ag: &AccessGroup,
        init_id: &str,
        init_type: InitiatorType,
    ) -> Result<AccessGroup> {
        no_support("access_group_initiator_add")
    }

    fn access_group_initiator_delete(
        &mut self,
        ag: &AccessGroup,
        init_id: &str,
        init_type: InitiatorType,
    ) -> Result<AccessGroup> {
        no_support("access_group_initiator_delete")
    }

    fn volume_mask(&mut self, vol: &Volume, ag: &AccessGroup) -> Result<()> {
        no_support("volume_mask")
    }

    fn volume_unmask(&mut self, vol: &Volume, ag: &AccessGroup) -> Result<()> {
        no_support("volume_unmask")
    }

    fn volumes_accessible_by_access_group(
        &mut self,
        ag: &AccessGroup,
    ) -> Result<Vec<Volume>> {
        no_support("volumes_accessible_by_access_group")
    }

    fn access_groups_granted_to_volume(
        &mut self,
        vol: &Volume,
    ) -> Result<Vec<AccessGroup>> {
        no_support("access_groups_granted_to_volume")
    }

    fn volume_child_dependency(&mut self, vol: &Volume) -> Result<bool> {
        no_support("volume_child_dependency")
    }

    fn volume_child_dependency_rm(
        &mut self,
        vol: &Volume,
    ) -> Result<AsyncReply<()>> {
        no_support("volume_child_dependency_rm")
    }

    fn fs(&mut self, search: Option<&Search>) -> Result<Vec<FileSystem>> {
        no_support("fs")
    }

    fn fs_create(
        &mut self,
        pool: &Pool,
        name: &str,
        size_bytes: u64,
    ) -> Result<AsyncReply<FileSystem>> {
        no_support("fs_create")
    }

    fn fs_delete(&mut self, fs: &FileSystem) -> Result<AsyncReply<()>> {
        no_support("fs_delete")
    }

    fn fs_resize(
        &mut self,
        fs: &FileSystem,
        new_size_bytes: u64,
    ) -> Result<AsyncReply<FileSystem>> {
        no_support("fs_resize")
    }

    fn fs_clone(
        &mut self,
        src_fs: &FileSystem,
        dst_fs_name: &str,
        snapshot: Option<&FileSystemSnapShot>,
    ) -> Result<AsyncReply<FileSystem>> {
        no_support("fs_clone")
    }

    fn fs_file_clone(
        &mut self,
        fs: &FileSystem,
        src_file_name: &str,
        dst_file_name: &str,
        snapshot: Option<&FileSystemSnapShot>,
    ) -> Result<AsyncReply<()>> {
        no_support("fs_file_clone")
    }

    fn fs_child_dependency(
        &mut self,
        fs: &FileSystem,
        files: &[String],
    ) -> Result<bool> {
        no_support("fs_child_dependency")
    }

    fn fs_child_dependency_rm(
        &mut self,
        fs: &FileSystem,
        files: &[String],
    ) -> Result<AsyncReply<()>> {
        no_support("fs_child_dependency_rm")
    }

    fn fs_snapshots(
        &mut self,
        fs: &FileSystem,
    ) -> Result<Vec<FileSystemSnapShot>> {
        no_support("fs_snapshots")
    }

    fn fs_snapshot_create(
        &mut self,
        fs: &FileSystem,
        name: &str,
    ) -> Result<AsyncReply<FileSystemSnapShot>> {
        no_support("fs_snapshot_create")
    }

    fn fs_snapshot_delete(
        &mut self,
        fs: &FileSystem,
        snapshot: &FileSystemSnapShot,
    ) -> Result<AsyncReply<()>> {
        no_support("fs_snapshot_delete")
    }

    fn fs_snapshot_restore(
        &mut self,
        fs: &FileSystem,
        snapshot: &FileSystemSnapShot,
        all_files: bool,
        files: &[String],
        restore_files: &[String],
    ) -> Result<AsyncReply<()>> {
        no_support("fs_snapshot_restore")
    }

    fn export_auth(&mut self) -> Result<Vec<String>> {
        no_support("export_auth")
    }

    fn exports(&mut self, search: Option<&Search>) -> Result<Vec<NfsExport>> {
        no_support("exports")
    }

    fn export_fs(&mut self, args: &ExportArgs) -> Result<NfsExport> {
        no_support("export_fs")
    }

    fn export_remove(&mut self, export: &NfsExport) -> Result<()> {
        no_support("export_remove")
    }
}

/// Operations added by version 1.2.
#[allow(unused_variables)]
pub trait PluginV1_2 {
    fn volume_raid_info(&mut self, vol: &Volume) -> Result<VolumeRaidInfo> {
        no_support("volume_raid_info")
    }

    fn pool_member_info(&mut self, pool: &Pool) -> Result<PoolMemberInfo> {
        no_support("pool_member_info")
    }

    /// Supported RAID types and strip sizes.
    fn volume_raid_create_cap_get(
        &mut self,
        sys: &System,
    ) -> Result<(Vec<RaidType>, Vec<u32>)> {
        no_support("volume_raid_create_cap_get")
    }

    /// `strip_size` 0 means plugin default.
    fn volume_raid_create(
        &mut self,
        name: &str,
        raid_type: RaidType,
        disks: &[Disk],
        strip_size: u32,
    ) -> Result<Volume> {
        no_support("volume_raid_create")
    }
}

/// Operations added by version 1.3.
#[allow(unused_variables)]
pub trait PluginV1_3 {
    fn volume_ident_led_on(&mut self, vol: &Volume) -> Result<()> {
        no_support("volume_ident_led_on")
    }

    fn volume_ident_led_off(&mut self, vol: &Volume) -> Result<()> {
        no_support("volume_ident_led_off")
    }

    fn system_read_cache_pct_update(
        &mut self,
        sys: &System,
        read_pct: u32,
    ) -> Result<()> {
        no_support("system_read_cache_pct_update")
    }

    fn batteries(&mut self, search: Option<&Search>) -> Result<Vec<Battery>> {
        no_support("batteries")
    }

    fn volume_cache_info(&mut self, vol: &Volume) -> Result<VolumeCacheInfo> {
        no_support("volume_cache_info")
    }

    fn volume_physical_disk_cache_update(
        &mut self,
        vol: &Volume,
        pdc: CachePolicy,
    ) -> Result<()> {
        no_support("volume_physical_disk_cache_update")
    }

    fn volume_write_cache_policy_update(
        &mut self,
        vol: &Volume,
        wcp: CachePolicy,
    ) -> Result<()> {
        no_support("volume_write_cache_policy_update")
    }

    fn volume_read_cache_policy_update(
        &mut self,
        vol: &Volume,
        rcp: CachePolicy,
    ) -> Result<()> {
        no_support("volume_read_cache_policy_update")
    }
}

/// Typed access to request parameters. Missing or malformed parameters are
/// [`LsmError::TransportInvalidArg`][1].
///
/// [1]: enum.LsmError.html#variant.TransportInvalidArg
pub struct Params<'a> {
    method: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    pub fn new(method: &'a str, map: &'a Map<String, Value>) -> Params<'a> {
        Params { method, map }
    }

    fn invalid(&self, key: &str, detail: &str) -> LsmError {
        LsmError::TransportInvalidArg(format!(
            "Invalid argument '{}' of '{}': {}",
            key, self.method, detail
        ))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let val = self
            .map
            .get(key)
            .ok_or_else(|| self.invalid(key, "missing"))?;
        serde_json::from_value(val.clone())
            .map_err(|e| self.invalid(key, &e.to_string()))
    }

    /// Like `get()`, but absent or `null` is `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(key).map(Some),
        }
    }

    /// Decode the whole parameter object, `flags` included.
    pub fn all<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.map.clone()))
            .map_err(|e| self.invalid("params", &e.to_string()))
    }

    /// `search_key` and `search_value` should be both string or both
    /// absent.
    pub fn search(&self) -> Result<Option<Search>> {
        let key: Option<String> = self.get_opt("search_key")?;
        let value: Option<String> = self.get_opt("search_value")?;
        match (key, value) {
            (Some(key), Some(value)) => Ok(Some(Search { key, value })),
            (None, None) => Ok(None),
            _ => Err(self.invalid(
                "search_key",
                "search_key and search_value should be used together",
            )),
        }
    }

    /// No operation defines any flag yet, so only 0 is accepted.
    pub fn check_flags(&self) -> Result<()> {
        let flags = match self.map.get("flags") {
            None => return Ok(()),
            Some(f) => f
                .as_u64()
                .ok_or_else(|| self.invalid("flags", "not an integer"))?,
        };
        if flags != 0 {
            return Err(LsmError::InvalidArgument(format!(
                "Unsupported flags {} for '{}'",
                flags, self.method
            )));
        }
        Ok(())
    }

    fn thinp(&self) -> Result<VolumeCreateArgThinP> {
        let i: u32 = self.get("provisioning")?;
        VolumeCreateArgThinP::from_int(i).ok_or_else(|| {
            LsmError::InvalidArgument(format!("Invalid provisioning {}", i))
        })
    }

    fn cache_policy(
        &self,
        key: &str,
        parse: fn(u8) -> CachePolicy,
    ) -> Result<CachePolicy> {
        let i: u8 = self.get(key)?;
        match parse(i) {
            CachePolicy::Unknown => Err(LsmError::InvalidArgument(format!(
                "Invalid {} {}",
                key, i
            ))),
            p => Ok(p),
        }
    }
}

fn to_val<T: Serialize>(t: T) -> Result<Value> {
    Ok(serde_json::to_value(t)?)
}

fn unit(r: Result<()>) -> Result<Value> {
    r.map(|_| Value::Null)
}

type V1Handler = fn(&mut dyn Plugin, &Params) -> Result<Value>;
type V1_2Handler = fn(&mut dyn PluginV1_2, &Params) -> Result<Value>;
type V1_3Handler = fn(&mut dyn PluginV1_3, &Params) -> Result<Value>;

// Every handler gets the plugin object as `p` and parameters as `a`.
macro_rules! op_table {
    (
        $table:ident, $handler:ty, $plugin:ty,
        { $($name:literal => |$p:ident, $a:ident| $body:expr,)+ }
    ) => {
        static $table: &[(&str, $handler)] = &[
            $(($name, {
                #[allow(unused_variables)]
                fn op($p: &mut $plugin, $a: &Params) -> Result<Value> {
                    $body
                }
                op
            }),)+
        ];
    };
}

op_table!(V1_OPS, V1Handler, dyn Plugin, {
    "time_out_set" => |p, a| unit(p.time_out_set(a.get("ms")?)),
    "time_out_get" => |p, a| to_val(p.time_out_get()?),
    "capabilities" => |p, a| to_val(p.capabilities(&a.get("system")?)?),
    "job_status" => |p, a| {
        p.job_status(&a.get::<String>("job_id")?)?.to_value()
    },
    "job_free" => |p, a| unit(p.job_free(&a.get::<String>("job_id")?)),
    "systems" => |p, a| to_val(p.systems()?),
    "pools" => |p, a| to_val(p.pools(a.search()?.as_ref())?),
    "volumes" => |p, a| to_val(p.volumes(a.search()?.as_ref())?),
    "disks" => |p, a| to_val(p.disks(a.search()?.as_ref())?),
    "target_ports" => |p, a| to_val(p.target_ports(a.search()?.as_ref())?),
    "volume_create" => |p, a| {
        p.volume_create(
            &a.get("pool")?,
            &a.get::<String>("volume_name")?,
            a.get("size_bytes")?,
            a.thinp()?,
        )?
        .to_record_value()
    },
    "volume_replicate" => |p, a| {
        p.volume_replicate(
            a.get_opt::<Pool>("pool")?.as_ref(),
            a.get("rep_type")?,
            &a.get("volume_src")?,
            &a.get::<String>("name")?,
        )?
        .to_record_value()
    },
    "volume_replicate_range_block_size" => |p, a| {
        to_val(p.volume_replicate_range_block_size(&a.get("system")?)?)
    },
    "volume_replicate_range" => |p, a| {
        let ranges: Vec<BlockRange> = a.get("ranges")?;
        Ok(p.volume_replicate_range(
            a.get("rep_type")?,
            &a.get("volume_src")?,
            &a.get("volume_dest")?,
            &ranges,
        )?
        .to_unit_value())
    },
    "volume_resize" => |p, a| {
        p.volume_resize(&a.get("volume")?, a.get("new_size_bytes")?)?
            .to_record_value()
    },
    "volume_delete" => |p, a| {
        Ok(p.volume_delete(&a.get("volume")?)?.to_unit_value())
    },
    "volume_enable" => |p, a| unit(p.volume_enable(&a.get("volume")?)),
    "volume_disable" => |p, a| unit(p.volume_disable(&a.get("volume")?)),
    "iscsi_chap_auth" => |p, a| {
        let in_user: Option<String> = a.get_opt("in_user")?;
        let in_pass: Option<String> = a.get_opt("in_password")?;
        let out_user: Option<String> = a.get_opt("out_user")?;
        let out_pass: Option<String> = a.get_opt("out_password")?;
        unit(p.iscsi_chap_auth(
            &a.get::<String>("init_id")?,
            in_user.as_deref(),
            in_pass.as_deref(),
            out_user.as_deref(),
            out_pass.as_deref(),
        ))
    },
    "access_groups" => |p, a| to_val(p.access_groups(a.search()?.as_ref())?),
    "access_group_create" => |p, a| {
        to_val(p.access_group_create(
            &a.get::<String>("name")?,
            &a.get::<String>("init_id")?,
            a.get("init_type")?,
            &a.get("system")?,
        )?)
    },
    "access_group_delete" => |p, a| {
        unit(p.access_group_delete(&a.get("access_group")?))
    },
    "access_group_initiator_add" => |p, a| {
        to_val(p.access_group_initiator_add(
            &a.get("access_group")?,
            &a.get::<String>("init_id")?,
            a.get("init_type")?,
        )?)
    },
    "access_group_initiator_delete" => |p, a| {
        to_val(p.access_group_initiator_delete(
            &a.get("access_group")?,
            &a.get::<String>("init_id")?,
            a.get("init_type")?,
        )?)
    },
    "volume_mask" => |p, a| {
        unit(p.volume_mask(&a.get("volume")?, &a.get("access_group")?))
    },
    "volume_unmask" => |p, a| {
        unit(p.volume_unmask(&a.get("volume")?, &a.get("access_group")?))
    },
    "volumes_accessible_by_access_group" => |p, a| {
        to_val(p.volumes_accessible_by_access_group(&a.get("access_group")?)?)
    },
    "access_groups_granted_to_volume" => |p, a| {
        to_val(p.access_groups_granted_to_volume(&a.get("volume")?)?)
    },
    "volume_child_dependency" => |p, a| {
        to_val(p.volume_child_dependency(&a.get("volume")?)?)
    },
    "volume_child_dependency_rm" => |p, a| {
        Ok(p.volume_child_dependency_rm(&a.get("volume")?)?.to_unit_value())
    },
    "fs" => |p, a| to_val(p.fs(a.search()?.as_ref())?),
    "fs_create" => |p, a| {
        p.fs_create(
            &a.get("pool")?,
            &a.get::<String>("name")?,
            a.get("size_bytes")?,
        )?
        .to_record_value()
    },
    "fs_delete" => |p, a| Ok(p.fs_delete(&a.get("fs")?)?.to_unit_value()),
    "fs_resize" => |p, a| {
        p.fs_resize(&a.get("fs")?, a.get("new_size_bytes")?)?
            .to_record_value()
    },
    "fs_clone" => |p, a| {
        p.fs_clone(
            &a.get("src_fs")?,
            &a.get::<String>("dest_fs_name")?,
            a.get_opt::<FileSystemSnapShot>("snapshot")?.as_ref(),
        )?
        .to_record_value()
    },
    "fs_file_clone" => |p, a| {
        Ok(p.fs_file_clone(
            &a.get("fs")?,
            &a.get::<String>("src_file_name")?,
            &a.get::<String>("dest_file_name")?,
            a.get_opt::<FileSystemSnapShot>("snapshot")?.as_ref(),
        )?
        .to_unit_value())
    },
    "fs_child_dependency" => |p, a| {
        let files: Vec<String> = a.get_opt("files")?.unwrap_or_default();
        to_val(p.fs_child_dependency(&a.get("fs")?, &files)?)
    },
    "fs_child_dependency_rm" => |p, a| {
        let files: Vec<String> = a.get_opt("files")?.unwrap_or_default();
        Ok(p.fs_child_dependency_rm(&a.get("fs")?, &files)?.to_unit_value())
    },
    "fs_snapshots" => |p, a| to_val(p.fs_snapshots(&a.get("fs")?)?),
    "fs_snapshot_create" => |p, a| {
        p.fs_snapshot_create(&a.get("fs")?, &a.get::<String>("snapshot_name")?)?
            .to_record_value()
    },
    "fs_snapshot_delete" => |p, a| {
        Ok(p.fs_snapshot_delete(&a.get("fs")?, &a.get("snapshot")?)?
            .to_unit_value())
    },
    "fs_snapshot_restore" => |p, a| {
        let files: Vec<String> = a.get_opt("files")?.unwrap_or_default();
        let restore_files: Vec<String> =
            a.get_opt("restore_files")?.unwrap_or_default();
        Ok(p.fs_snapshot_restore(
            &a.get("fs")?,
            &a.get("snapshot")?,
            a.get("all_files")?,
            &files,
            &restore_files,
        )?
        .to_unit_value())
    },
    "export_auth" => |p, a| to_val(p.export_auth()?),
    "exports" => |p, a| to_val(p.exports(a.search()?.as_ref())?),
    "export_fs" => |p, a| to_val(p.export_fs(&a.all()?)?),
    "export_remove" => |p, a| unit(p.export_remove(&a.get("export")?)),
});

op_table!(V1_2_OPS, V1_2Handler, dyn PluginV1_2, {
    "volume_raid_info" => |p, a| {
        Ok(p.volume_raid_info(&a.get("volume")?)?.to_value())
    },
    "pool_member_info" => |p, a| {
        Ok(p.pool_member_info(&a.get("pool")?)?.to_value())
    },
    "volume_raid_create_cap_get" => |p, a| {
        let (raid_types, strip_sizes) =
            p.volume_raid_create_cap_get(&a.get("system")?)?;
        let raid_types: Vec<i32> =
            raid_types.into_iter().map(|t| t as i32).collect();
        Ok(json!([raid_types, strip_sizes]))
    },
    "volume_raid_create" => |p, a| {
        let disks: Vec<Disk> = a.get("disks")?;
        to_val(p.volume_raid_create(
            &a.get::<String>("name")?,
            a.get("raid_type")?,
            &disks,
            a.get_opt("strip_size")?.unwrap_or(0),
        )?)
    },
});

op_table!(V1_3_OPS, V1_3Handler, dyn PluginV1_3, {
    "volume_ident_led_on" => |p, a| {
        unit(p.volume_ident_led_on(&a.get("volume")?))
    },
    "volume_ident_led_off" => |p, a| {
        unit(p.volume_ident_led_off(&a.get("volume")?))
    },
    "system_read_cache_pct_update" => |p, a| {
        unit(p.system_read_cache_pct_update(
            &a.get("system")?,
            a.get("read_pct")?,
        ))
    },
    "batteries" => |p, a| to_val(p.batteries(a.search()?.as_ref())?),
    "volume_cache_info" => |p, a| {
        Ok(p.volume_cache_info(&a.get("volume")?)?.to_value())
    },
    "volume_physical_disk_cache_update" => |p, a| {
        let pdc = a.cache_policy("pdc", CachePolicy::phy_disk_policy_from_int)?;
        unit(p.volume_physical_disk_cache_update(&a.get("volume")?, pdc))
    },
    "volume_write_cache_policy_update" => |p, a| {
        let wcp = a.cache_policy("wcp", CachePolicy::write_policy_from_int)?;
        unit(p.volume_write_cache_policy_update(&a.get("volume")?, wcp))
    },
    "volume_read_cache_policy_update" => |p, a| {
        let rcp = a.cache_policy("rcp", CachePolicy::read_policy_from_int)?;
        unit(p.volume_read_cache_policy_update(&a.get("volume")?, rcp))
    },
});

fn lookup<H: Copy>(table: &[(&str, H)], method: &str) -> Option<H> {
    table.iter().find(|(n, _)| *n == method).map(|(_, h)| *h)
}

/// Invoke `method` of `plugin`. Tables are checked in order of v1.3, v1.2
/// and v1; a method found in a table the plugin does not provide is
/// [`LsmError::NoSupport`][1].
///
/// [1]: enum.LsmError.html#variant.NoSupport
pub fn dispatch(
    plugin: &mut dyn Plugin,
    method: &str,
    params: &Map<String, Value>,
) -> Result<Value> {
    let args = Params::new(method, params);
    args.check_flags()?;
    if let Some(h) = lookup(V1_3_OPS, method) {
        return match plugin.v1_3() {
            Some(p) => h(p, &args),
            None => no_support(method),
        };
    }
    if let Some(h) = lookup(V1_2_OPS, method) {
        return match plugin.v1_2() {
            Some(p) => h(p, &args),
            None => no_support(method),
        };
    }
    match lookup(V1_OPS, method) {
        Some(h) => h(plugin, &args),
        None => no_support(method),
    }
}

/// Command line of plugin executable.
#[derive(Parser, Debug)]
#[command(about = "LibStorageMgmt plugin", long_about = None)]
pub struct PluginArgs {
    /// File descriptor of a socket already connected to client. Without it
    /// the plugin talks through stdin and stdout.
    pub fd: Option<i32>,
}

impl PluginArgs {
    /// Open the IPC channel described by the arguments.
    pub fn channel(&self) -> Result<PluginChannel> {
        match self.fd {
            // The socket is handed over to us by the parent process and
            // nothing else in this process refers to it.
            Some(fd) => unsafe { PluginChannel::from_raw_fd(fd) },
            None => Ok(PluginChannel::stdio()),
        }
    }
}

fn register(
    plugin: &mut dyn Plugin,
    params: &Map<String, Value>,
) -> Result<()> {
    let args = Params::new("plugin_register", params);
    args.check_flags()?;
    let uri: String = args.get("uri")?;
    let password: Option<String> = args.get_opt("password")?;
    let timeout: u32 = args.get("timeout")?;
    plugin.plugin_register(&uri, password.as_deref(), timeout)
}

/// Serve requests from `channel` until client unregisters or closes the
/// channel. `plugin_info` is answered with `desc` and `version`.
///
/// Until `plugin_register` succeeds, only `plugin_info`, `plugin_register`
/// and `plugin_unregister` are served. An undecodable request is answered
/// with an error and ends the session.
pub fn run(
    plugin: &mut dyn Plugin,
    desc: &str,
    version: &str,
    mut channel: PluginChannel,
) -> Result<()> {
    let mut registered = false;
    loop {
        let req = match channel.recv() {
            Ok(Some(r)) => r,
            Ok(None) => {
                debug!("Client closed the channel");
                break;
            }
            Err(e) => {
                warn!("Invalid request: {}", e);
                let info = ErrorInfo::from_error(&e);
                if let Err(e) = channel.send_error(&Value::Null, &info) {
                    debug!("Failed to reply: {}", e);
                }
                break;
            }
        };
        debug!("Handling request '{}'", req.method);
        let ret = match req.method.as_str() {
            "plugin_info" => Ok(json!([desc, version])),
            "plugin_register" => {
                let ret = register(plugin, &req.params);
                registered = ret.is_ok();
                ret.map(|_| Value::Null)
            }
            "plugin_unregister" => Ok(Value::Null),
            method if !registered => Err(LsmError::InvalidArgument(format!(
                "Plugin is not registered, refusing '{}'",
                method
            ))),
            _ => dispatch(plugin, &req.method, &req.params),
        };
        let detail = plugin.error_detail();
        match ret {
            Ok(val) => channel.send_result(&req.id, val)?,
            Err(e) => {
                debug!("Request '{}' failed: {:?}", req.method, e);
                let info = match detail {
                    Some(i) if i.code == e.code() => i,
                    _ => ErrorInfo::from_error(&e),
                };
                channel.send_error(&req.id, &info)?;
            }
        }
        if req.method == "plugin_unregister" {
            break;
        }
    }
    if registered {
        plugin.plugin_unregister()?;
    }
    Ok(())
}
