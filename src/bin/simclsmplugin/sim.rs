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

use lsm::{
    search_filter, AccessGroup, AsyncReply, Battery, BlockRange,
    Capabilities, Capability, CachePolicy, DataType, Disk, ErrorInfo,
    ExportArgs, FileSystem, FileSystemSnapShot, InitiatorType, JobStatus,
    LsmError, NfsExport, Plugin, PluginV1_2, PluginV1_3, Pool,
    PoolMemberInfo, RaidType, Result, Search, System, TargetPort, Volume,
    VolumeCacheInfo, VolumeCreateArgThinP, VolumeRaidInfo,
    VolumeReplicateType,
};
use std::env;
use std::path::PathBuf;

use super::nas::NFS_AUTH_TYPES;
use super::state::{SimState, StateFile, SYS_ID};

/// Seconds a simulated job takes to finish.
const ENV_JOB_DURATION: &str = "LSM_SIM_TIME";
const DEFAULT_JOB_DURATION: f64 = 1.0;
const DEFAULT_STATE_FILE: &str = "lsm_simc_state.json";

const CAPABILITIES: &[Capability] = &[
    Capability::Volumes,
    Capability::VolumeCreate,
    Capability::VolumeResize,
    Capability::VolumeReplicate,
    Capability::VolumeReplicateClone,
    Capability::VolumeReplicateCopy,
    Capability::VolumeReplicateMirrorAsync,
    Capability::VolumeReplicateMirrorSync,
    Capability::VolumeRepRangeBlockSize,
    Capability::VolumeRepRange,
    Capability::VolumeRepRangeClone,
    Capability::VolumeRepRangeCopy,
    Capability::VolumeDelete,
    Capability::VolumeEnable,
    Capability::VolumeDisable,
    Capability::VolumeMask,
    Capability::VolumeUnmask,
    Capability::AccessGroups,
    Capability::AccessGroupCreateWwpn,
    Capability::AccessGroupDelete,
    Capability::AccessGroupInitAddWwpn,
    Capability::AccessGroupInitDel,
    Capability::VolsMaskedToAg,
    Capability::AgsGrantedToVol,
    Capability::VolHasChildDep,
    Capability::VolChildDepRm,
    Capability::AccessGroupCreateIscsiIqn,
    Capability::AccessGroupInitAddIscsiIqn,
    Capability::IscsiChapAuthSet,
    Capability::VolRaidInfo,
    Capability::VolumeThin,
    Capability::Batteries,
    Capability::VolCacheInfo,
    Capability::VolPhyDiskCacheSet,
    Capability::VolWriteCacheSetEnable,
    Capability::VolWriteCacheSetAuto,
    Capability::VolWriteCacheSetDisabled,
    Capability::VolReadCacheSet,
    Capability::Fs,
    Capability::FsDelete,
    Capability::FsResize,
    Capability::FsCreate,
    Capability::FsClone,
    Capability::FsFileClone,
    Capability::FsSnapshots,
    Capability::FsSnapshotCreate,
    Capability::FsSnapshotDelete,
    Capability::FsSnapshotRestore,
    Capability::FsSnapshotRestoreSpecificFiles,
    Capability::FsHasChildDep,
    Capability::FsChildDepRm,
    Capability::FsChildDepRmSpecificFiles,
    Capability::NfsExportAuthTypeList,
    Capability::NfsExports,
    Capability::FsExport,
    Capability::FsUnexport,
    Capability::FsExportCustomPath,
    Capability::SysReadCachePctSet,
    Capability::SysReadCachePctGet,
    Capability::SysFwVersionGet,
    Capability::SysModeGet,
    Capability::DiskLocation,
    Capability::DiskRpm,
    Capability::DiskLinkType,
    Capability::VolumeLed,
    Capability::PoolsQuickSearch,
    Capability::VolumesQuickSearch,
    Capability::DisksQuickSearch,
    Capability::AccessGroupsQuickSearch,
    Capability::FsQuickSearch,
    Capability::NfsExportsQuickSearch,
    Capability::TargetPorts,
    Capability::TargetPortsQuickSearch,
    Capability::Disks,
    Capability::PoolMemberInfo,
    Capability::VolumeRaidCreate,
    Capability::DiskVpd83Get,
];

/// Simulated storage system. All state lives in a state file so that
/// concurrent plugin processes share it.
pub(crate) struct SimPlugin {
    db: Option<StateFile>,
    timeout: u32,
    job_duration: f64,
    error_detail: Option<ErrorInfo>,
}

impl SimPlugin {
    pub(crate) fn new() -> SimPlugin {
        SimPlugin {
            db: None,
            timeout: 0,
            job_duration: DEFAULT_JOB_DURATION,
            error_detail: None,
        }
    }

    fn db(&self) -> Result<&StateFile> {
        self.db.as_ref().ok_or_else(|| {
            LsmError::InvalidArgument("Plugin is not registered".to_string())
        })
    }

    // Failed transaction names the state file in the debug text.
    fn note_error<T>(&mut self, ret: Result<T>) -> Result<T> {
        if let (Err(e), Some(db)) = (&ret, &self.db) {
            self.error_detail = Some(ErrorInfo {
                debug: Some(format!("State file: {}", db.path().display())),
                ..ErrorInfo::from_error(e)
            });
        }
        ret
    }

    fn read<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&SimState) -> Result<T>,
    {
        let ret = self.db()?.read(f);
        self.note_error(ret)
    }

    fn write<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SimState) -> Result<T>,
    {
        let ret = self.db()?.write(f);
        self.note_error(ret)
    }

    // Apply the change now and report its result through a job.
    fn job<T, F>(
        &mut self,
        data_type: DataType,
        f: F,
    ) -> Result<AsyncReply<T>>
    where
        F: FnOnce(&mut SimState) -> Result<Option<String>>,
    {
        let duration = self.job_duration;
        let job_id = self.write(|s| {
            let data = match f(s)? {
                Some(id) => s.job_record(data_type, &id)?,
                None => None,
            };
            s.jobs.create(data.as_ref(), duration)
        })?;
        Ok(AsyncReply::JobStarted(job_id))
    }

    fn unit_job<F>(&mut self, f: F) -> Result<AsyncReply<()>>
    where
        F: FnOnce(&mut SimState) -> Result<()>,
    {
        self.job(DataType::None, |s| f(s).map(|_| None))
    }
}

impl Plugin for SimPlugin {
    fn plugin_register(
        &mut self,
        uri: &str,
        _password: Option<&str>,
        timeout: u32,
    ) -> Result<()> {
        let path = match lsm::uri_query_get(uri, "statefile")? {
            Some(p) => PathBuf::from(p),
            None => env::temp_dir().join(DEFAULT_STATE_FILE),
        };
        self.job_duration = match env::var(ENV_JOB_DURATION) {
            Ok(s) => s.parse::<f64>().map_err(|e| {
                LsmError::InvalidArgument(format!(
                    "Invalid {} '{}': {}",
                    ENV_JOB_DURATION, s, e
                ))
            })?,
            Err(_) => DEFAULT_JOB_DURATION,
        };
        info!(
            "Using state file {}, job duration {}s",
            path.display(),
            self.job_duration
        );
        let db = StateFile::new(&path, timeout);
        // Create and validate the state file early.
        db.read(|_| Ok(()))?;
        self.db = Some(db);
        self.timeout = timeout;
        Ok(())
    }

    fn plugin_unregister(&mut self) -> Result<()> {
        debug!("Unregistering");
        self.db = None;
        Ok(())
    }

    fn error_detail(&mut self) -> Option<ErrorInfo> {
        self.error_detail.take()
    }

    fn v1_2(&mut self) -> Option<&mut dyn PluginV1_2> {
        Some(self)
    }

    fn v1_3(&mut self) -> Option<&mut dyn PluginV1_3> {
        Some(self)
    }

    fn time_out_set(&mut self, ms: u32) -> Result<()> {
        match self.db.as_mut() {
            Some(db) => db.set_timeout(ms),
            None => {
                return Err(LsmError::InvalidArgument(
                    "Plugin is not registered".to_string(),
                ))
            }
        }
        self.timeout = ms;
        Ok(())
    }

    fn time_out_get(&mut self) -> Result<u32> {
        self.db()?;
        Ok(self.timeout)
    }

    fn capabilities(&mut self, sys: &System) -> Result<Capabilities> {
        self.read(|s| s.check_system(&sys.id))?;
        let mut cap = Capabilities::new();
        cap.set_all(CAPABILITIES);
        Ok(cap)
    }

    fn job_status(&mut self, job_id: &str) -> Result<JobStatus> {
        let now = lsm::now();
        self.read(|s| s.jobs.get(job_id)?.status(now))
    }

    fn job_free(&mut self, job_id: &str) -> Result<()> {
        self.write(|s| s.jobs.free(job_id))
    }

    fn systems(&mut self) -> Result<Vec<System>> {
        self.read(|s| Ok(vec![s.system()]))
    }

    fn pools(&mut self, search: Option<&Search>) -> Result<Vec<Pool>> {
        let pools: Vec<Pool> = self.read(|s| {
            Ok(s.pools.iter().map(|p| s.pool_record(p)).collect())
        })?;
        search_filter(pools, search)
    }

    fn volumes(&mut self, search: Option<&Search>) -> Result<Vec<Volume>> {
        let vols: Vec<Volume> = self.read(|s| {
            s.volumes.iter().map(|v| s.volume_record(&v.id)).collect()
        })?;
        search_filter(vols, search)
    }

    fn disks(&mut self, search: Option<&Search>) -> Result<Vec<Disk>> {
        let disks: Vec<Disk> = self.read(|s| {
            Ok(s.disks.iter().map(|d| s.disk_record(d)).collect())
        })?;
        search_filter(disks, search)
    }

    fn target_ports(
        &mut self,
        search: Option<&Search>,
    ) -> Result<Vec<TargetPort>> {
        let tgts = self.read(|s| Ok(s.target_ports.clone()))?;
        search_filter(tgts, search)
    }

    fn volume_create(
        &mut self,
        pool: &Pool,
        name: &str,
        size_bytes: u64,
        _thinp: VolumeCreateArgThinP,
    ) -> Result<AsyncReply<Volume>> {
        self.job(DataType::Volume, |s| {
            s.volume_create(&pool.id, name, size_bytes, false).map(Some)
        })
    }

    fn volume_replicate(
        &mut self,
        pool: Option<&Pool>,
        rep_type: VolumeReplicateType,
        src_vol: &Volume,
        name: &str,
    ) -> Result<AsyncReply<Volume>> {
        let pool_id = pool.map(|p| p.id.as_str());
        self.job(DataType::Volume, |s| {
            s.volume_replicate(pool_id, rep_type, &src_vol.id, name)
                .map(Some)
        })
    }

    fn volume_replicate_range_block_size(
        &mut self,
        sys: &System,
    ) -> Result<u32> {
        self.read(|s| s.block_size(&sys.id))
    }

    fn volume_replicate_range(
        &mut self,
        rep_type: VolumeReplicateType,
        src_vol: &Volume,
        dst_vol: &Volume,
        _ranges: &[BlockRange],
    ) -> Result<AsyncReply<()>> {
        self.unit_job(|s| {
            s.volume_replicate_range(rep_type, &src_vol.id, &dst_vol.id)
        })
    }

    fn volume_resize(
        &mut self,
        vol: &Volume,
        new_size_bytes: u64,
    ) -> Result<AsyncReply<Volume>> {
        self.job(DataType::Volume, |s| {
            s.volume_resize(&vol.id, new_size_bytes)?;
            Ok(Some(vol.id.clone()))
        })
    }

    fn volume_delete(&mut self, vol: &Volume) -> Result<AsyncReply<()>> {
        self.unit_job(|s| s.volume_delete(&vol.id))
    }

    fn volume_enable(&mut self, vol: &Volume) -> Result<()> {
        self.write(|s| s.volume_set_enabled(&vol.id, true))
    }

    fn volume_disable(&mut self, vol: &Volume) -> Result<()> {
        self.write(|s| s.volume_set_enabled(&vol.id, false))
    }

    fn iscsi_chap_auth(
        &mut self,
        init_id: &str,
        _in_user: Option<&str>,
        _in_pass: Option<&str>,
        _out_user: Option<&str>,
        _out_pass: Option<&str>,
    ) -> Result<()> {
        self.db()?;
        if init_id.is_empty() {
            return Err(LsmError::InvalidArgument(
                "Initiator ID should not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn access_groups(
        &mut self,
        search: Option<&Search>,
    ) -> Result<Vec<AccessGroup>> {
        let ags: Vec<AccessGroup> = self.read(|s| {
            s.access_groups
                .iter()
                .map(|a| s.access_group_record(&a.id))
                .collect()
        })?;
        search_filter(ags, search)
    }

    fn access_group_create(
        &mut self,
        name: &str,
        init_id: &str,
        init_type: InitiatorType,
        sys: &System,
    ) -> Result<AccessGroup> {
        self.write(|s| {
            let id = s.access_group_create(name, init_id, init_type, &sys.id)?;
            s.access_group_record(&id)
        })
    }

    fn access_group_delete(&mut self, ag: &AccessGroup) -> Result<()> {
        self.write(|s| s.access_group_delete(&ag.id))
    }

    fn access_group_initiator_add(
        &mut self,
        ag: &AccessGroup,
        init_id: &str,
        init_type: InitiatorType,
    ) -> Result<AccessGroup> {
        self.write(|s| {
            s.access_group_initiator_add(&ag.id, init_id, init_type)?;
            s.access_group_record(&ag.id)
        })
    }

    fn access_group_initiator_delete(
        &mut self,
        ag: &AccessGroup,
        init_id: &str,
        _init_type: InitiatorType,
    ) -> Result<AccessGroup> {
        self.write(|s| {
            s.access_group_initiator_delete(&ag.id, init_id)?;
            s.access_group_record(&ag.id)
        })
    }

    fn volume_mask(&mut self, vol: &Volume, ag: &AccessGroup) -> Result<()> {
        self.write(|s| s.volume_mask(&vol.id, &ag.id))
    }

    fn volume_unmask(&mut self, vol: &Volume, ag: &AccessGroup) -> Result<()> {
        self.write(|s| s.volume_unmask(&vol.id, &ag.id))
    }

    fn volumes_accessible_by_access_group(
        &mut self,
        ag: &AccessGroup,
    ) -> Result<Vec<Volume>> {
        self.read(|s| {
            s.vol_ids_of_ag(&ag.id)?
                .iter()
                .map(|id| s.volume_record(id))
                .collect()
        })
    }

    fn access_groups_granted_to_volume(
        &mut self,
        vol: &Volume,
    ) -> Result<Vec<AccessGroup>> {
        self.read(|s| {
            s.ag_ids_of_vol(&vol.id)?
                .iter()
                .map(|id| s.access_group_record(id))
                .collect()
        })
    }

    fn volume_child_dependency(&mut self, vol: &Volume) -> Result<bool> {
        self.read(|s| s.volume_child_dependency(&vol.id))
    }

    fn volume_child_dependency_rm(
        &mut self,
        vol: &Volume,
    ) -> Result<AsyncReply<()>> {
        self.unit_job(|s| s.volume_child_dependency_rm(&vol.id))
    }

    fn fs(&mut self, search: Option<&Search>) -> Result<Vec<FileSystem>> {
        let fss: Vec<FileSystem> =
            self.read(|s| s.fss.iter().map(|f| s.fs_record(&f.id)).collect())?;
        search_filter(fss, search)
    }

    fn fs_create(
        &mut self,
        pool: &Pool,
        name: &str,
        size_bytes: u64,
    ) -> Result<AsyncReply<FileSystem>> {
        self.job(DataType::FileSystem, |s| {
            s.fs_create(&pool.id, name, size_bytes).map(Some)
        })
    }

    fn fs_delete(&mut self, fs: &FileSystem) -> Result<AsyncReply<()>> {
        self.unit_job(|s| s.fs_delete(&fs.id))
    }

    fn fs_resize(
        &mut self,
        fs: &FileSystem,
        new_size_bytes: u64,
    ) -> Result<AsyncReply<FileSystem>> {
        self.job(DataType::FileSystem, |s| {
            s.fs_resize(&fs.id, new_size_bytes)?;
            Ok(Some(fs.id.clone()))
        })
    }

    fn fs_clone(
        &mut self,
        src_fs: &FileSystem,
        dst_fs_name: &str,
        snapshot: Option<&FileSystemSnapShot>,
    ) -> Result<AsyncReply<FileSystem>> {
        let snap_id = snapshot.map(|s| s.id.as_str());
        self.job(DataType::FileSystem, |s| {
            s.fs_clone(&src_fs.id, dst_fs_name, snap_id).map(Some)
        })
    }

    fn fs_file_clone(
        &mut self,
        fs: &FileSystem,
        _src_file_name: &str,
        _dst_file_name: &str,
        snapshot: Option<&FileSystemSnapShot>,
    ) -> Result<AsyncReply<()>> {
        let snap_id = snapshot.map(|s| s.id.as_str());
        self.unit_job(|s| s.fs_file_clone(&fs.id, snap_id))
    }

    fn fs_child_dependency(
        &mut self,
        fs: &FileSystem,
        _files: &[String],
    ) -> Result<bool> {
        self.read(|s| s.fs_child_dependency(&fs.id))
    }

    fn fs_child_dependency_rm(
        &mut self,
        fs: &FileSystem,
        _files: &[String],
    ) -> Result<AsyncReply<()>> {
        self.unit_job(|s| s.fs_child_dependency_rm(&fs.id))
    }

    fn fs_snapshots(
        &mut self,
        fs: &FileSystem,
    ) -> Result<Vec<FileSystemSnapShot>> {
        self.read(|s| {
            s.fs_snapshot_ids(&fs.id)?
                .iter()
                .map(|id| s.fs_snapshot_record(id))
                .collect()
        })
    }

    fn fs_snapshot_create(
        &mut self,
        fs: &FileSystem,
        name: &str,
    ) -> Result<AsyncReply<FileSystemSnapShot>> {
        let ts = lsm::now() as u64;
        self.job(DataType::FsSnapshot, |s| {
            s.fs_snapshot_create(&fs.id, name, ts).map(Some)
        })
    }

    fn fs_snapshot_delete(
        &mut self,
        fs: &FileSystem,
        snapshot: &FileSystemSnapShot,
    ) -> Result<AsyncReply<()>> {
        self.unit_job(|s| s.fs_snapshot_delete(&fs.id, &snapshot.id))
    }

    fn fs_snapshot_restore(
        &mut self,
        fs: &FileSystem,
        snapshot: &FileSystemSnapShot,
        _all_files: bool,
        _files: &[String],
        _restore_files: &[String],
    ) -> Result<AsyncReply<()>> {
        self.unit_job(|s| s.fs_snapshot_restore(&fs.id, &snapshot.id))
    }

    fn export_auth(&mut self) -> Result<Vec<String>> {
        self.db()?;
        Ok(NFS_AUTH_TYPES.iter().map(|s| s.to_string()).collect())
    }

    fn exports(&mut self, search: Option<&Search>) -> Result<Vec<NfsExport>> {
        let exports = self.read(|s| Ok(s.exports.clone()))?;
        search_filter(exports, search)
    }

    fn export_fs(&mut self, args: &ExportArgs) -> Result<NfsExport> {
        self.write(|s| s.export_fs(args))
    }

    fn export_remove(&mut self, export: &NfsExport) -> Result<()> {
        self.write(|s| s.export_remove(&export.id))
    }
}

impl PluginV1_2 for SimPlugin {
    fn volume_raid_info(&mut self, vol: &Volume) -> Result<VolumeRaidInfo> {
        self.read(|s| s.volume_raid_info(&vol.id))
    }

    fn pool_member_info(&mut self, pool: &Pool) -> Result<PoolMemberInfo> {
        self.read(|s| s.pool_member_info(&pool.id))
    }

    fn volume_raid_create_cap_get(
        &mut self,
        sys: &System,
    ) -> Result<(Vec<RaidType>, Vec<u32>)> {
        self.read(|s| s.volume_raid_create_cap(&sys.id))
    }

    fn volume_raid_create(
        &mut self,
        name: &str,
        raid_type: RaidType,
        disks: &[Disk],
        strip_size: u32,
    ) -> Result<Volume> {
        let disk_ids: Vec<String> =
            disks.iter().map(|d| d.id.clone()).collect();
        self.write(|s| {
            let id =
                s.volume_raid_create(name, raid_type, &disk_ids, strip_size)?;
            s.volume_record(&id)
        })
    }
}

impl PluginV1_3 for SimPlugin {
    // No LED to blink, only check the volume.
    fn volume_ident_led_on(&mut self, vol: &Volume) -> Result<()> {
        self.read(|s| s.volume(&vol.id).map(|_| ()))
    }

    fn volume_ident_led_off(&mut self, vol: &Volume) -> Result<()> {
        self.read(|s| s.volume(&vol.id).map(|_| ()))
    }

    fn system_read_cache_pct_update(
        &mut self,
        sys: &System,
        read_pct: u32,
    ) -> Result<()> {
        self.write(|s| s.read_cache_pct_update(&sys.id, read_pct))
    }

    fn batteries(&mut self, search: Option<&Search>) -> Result<Vec<Battery>> {
        let bats = self.read(|s| Ok(s.batteries.clone()))?;
        search_filter(bats, search)
    }

    fn volume_cache_info(&mut self, vol: &Volume) -> Result<VolumeCacheInfo> {
        self.read(|s| s.volume_cache_info(&vol.id))
    }

    fn volume_physical_disk_cache_update(
        &mut self,
        vol: &Volume,
        pdc: CachePolicy,
    ) -> Result<()> {
        self.write(|s| {
            s.volume_cache_update(&vol.id, |v| v.phy_disk_cache = pdc)
        })
    }

    fn volume_write_cache_policy_update(
        &mut self,
        vol: &Volume,
        wcp: CachePolicy,
    ) -> Result<()> {
        self.write(|s| s.volume_cache_update(&vol.id, |v| v.write_cache = wcp))
    }

    fn volume_read_cache_policy_update(
        &mut self,
        vol: &Volume,
        rcp: CachePolicy,
    ) -> Result<()> {
        self.write(|s| s.volume_cache_update(&vol.id, |v| v.read_cache = rcp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsm::JobState;

    fn registered(dir: &tempfile::TempDir) -> SimPlugin {
        let mut plugin = SimPlugin::new();
        let uri = format!(
            "simc://?statefile={}",
            dir.path().join("state.json").display()
        );
        plugin.plugin_register(&uri, None, 5000).unwrap();
        plugin.job_duration = 0.0;
        plugin
    }

    fn sys() -> System {
        System::new(SYS_ID, "", System::STATUS_OK)
    }

    #[test]
    fn not_registered() {
        let mut plugin = SimPlugin::new();
        match plugin.systems() {
            Err(LsmError::InvalidArgument(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn capabilities_of_unknown_system() {
        let dir = tempfile::tempdir().unwrap();
        let mut plugin = registered(&dir);
        let cap = plugin.capabilities(&sys()).unwrap();
        assert!(cap.is_supported(Capability::VolumeCreate));
        assert!(!cap.is_supported(Capability::VolWriteCacheSetImpactRead));
        let other = System::new("sim-02", "", System::STATUS_OK);
        match plugin.capabilities(&other) {
            Err(LsmError::NotFoundSystem(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn volume_job_resolves_to_volume() {
        let dir = tempfile::tempdir().unwrap();
        let mut plugin = registered(&dir);
        let pool = plugin.pools(None).unwrap().remove(3);
        let job_id = match plugin
            .volume_create(&pool, "v", 1 << 20, VolumeCreateArgThinP::Default)
            .unwrap()
        {
            AsyncReply::JobStarted(j) => j,
            r => panic!("unexpected reply {:?}", r),
        };
        let status = plugin.job_status(&job_id).unwrap();
        assert_eq!(JobState::Complete, status.state);
        let vol = match status.data {
            Some(lsm::Record::Volume(v)) => v,
            d => panic!("unexpected data {:?}", d),
        };
        assert_eq!("v", vol.name);
        plugin.job_free(&job_id).unwrap();

        // A finished job keeps its result after the volume is gone.
        let job_id = match plugin.volume_resize(&vol, 2 << 20).unwrap() {
            AsyncReply::JobStarted(j) => j,
            r => panic!("unexpected reply {:?}", r),
        };
        let status = plugin.job_status(&job_id).unwrap();
        assert_eq!(JobState::Complete, status.state);
        match plugin.volume_delete(&vol).unwrap() {
            AsyncReply::JobStarted(_) => (),
            r => panic!("unexpected reply {:?}", r),
        }
        assert_eq!(status, plugin.job_status(&job_id).unwrap());
        match &status.data {
            Some(lsm::Record::Volume(v)) => {
                assert_eq!(2 << 20, v.size_bytes())
            }
            d => panic!("unexpected data {:?}", d),
        }
    }

    #[test]
    fn huge_volume_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut plugin = registered(&dir);
        let pool = plugin.pools(None).unwrap().remove(3);
        match plugin.volume_create(
            &pool,
            "huge",
            u64::MAX,
            VolumeCreateArgThinP::Default,
        ) {
            Err(LsmError::NoEnoughSpace(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        assert_eq!(0, plugin.read(|s| Ok(s.jobs.len())).unwrap());
        assert!(plugin.volumes(None).unwrap().is_empty());
    }

    #[test]
    fn failed_operation_creates_no_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut plugin = registered(&dir);
        let pool = plugin.pools(None).unwrap().remove(0);
        assert!(plugin
            .volume_create(&pool, "v", u64::MAX / 2, VolumeCreateArgThinP::Full)
            .is_err());
        let jobs = plugin.read(|s| Ok(s.jobs.len())).unwrap();
        assert_eq!(0, jobs);
    }

    #[test]
    fn state_is_shared_by_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = registered(&dir);
        let mut b = registered(&dir);
        a.system_read_cache_pct_update(&sys(), 42).unwrap();
        assert_eq!(42, b.systems().unwrap()[0].read_cache_pct);
        b.time_out_set(100).unwrap();
        assert_eq!(100, b.time_out_get().unwrap());
        assert_eq!(5000, a.time_out_get().unwrap());
    }
}
