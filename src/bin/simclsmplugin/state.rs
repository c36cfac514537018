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

//! Simulator state: the records kept in the state file, the file lock
//! based transaction and the conversion into `lsm` records.

use lsm::{
    AccessGroup, Battery, BatteryType, CachePolicy, DataType, Disk,
    DiskLinkType, DiskType, FileSystem, FileSystemSnapShot, InitiatorType,
    JobTable, LsmError, NfsExport, Pool, PortType, RaidType, Record, Result,
    System, SystemMode, TargetPort, Volume, VolumeReplicateType,
};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use rand::Rng;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};

pub(crate) const SYS_ID: &str = "sim-01";
pub(crate) const BLOCK_SIZE: u64 = 512;
pub(crate) const DEFAULT_STRIP_SIZE: u32 = 128 * 1024;

const STATE_VERSION: &str = "4.1";
const SYS_NAME: &str = "LSM simulated storage plug-in";
const DEFAULT_READ_CACHE_PCT: i8 = 10;
const SIZE_2TIB: u64 = 2 * 1024 * 1024 * 1024 * 1024;
const SIZE_512GIB: u64 = 512 * 1024 * 1024 * 1024;
const RPM_NON_ROTATING: i32 = 1;
const LOCK_RETRY_INTERVAL: u64 = 10; // milliseconds

pub(crate) const SUPPORTED_RAID_TYPES: [RaidType; 7] = [
    RaidType::Raid0,
    RaidType::Raid1,
    RaidType::Raid5,
    RaidType::Raid6,
    RaidType::Raid10,
    RaidType::Raid50,
    RaidType::Raid60,
];

pub(crate) const SUPPORTED_STRIP_SIZES: [u32; 8] = [
    8 * 1024,
    16 * 1024,
    32 * 1024,
    64 * 1024,
    128 * 1024,
    256 * 1024,
    512 * 1024,
    1024 * 1024,
];

// No pool could hold a size which does not fit `u64` once rounded.
pub(crate) fn round_to_block(size: u64) -> Result<u64> {
    size.div_ceil(BLOCK_SIZE)
        .checked_mul(BLOCK_SIZE)
        .ok_or_else(|| {
            LsmError::NoEnoughSpace(format!(
                "Requested size {} is beyond any pool",
                size
            ))
        })
}

pub(crate) fn random_vpd83() -> String {
    let raw: u64 = rand::thread_rng().gen();
    format!("50{:014x}", raw & 0x00ff_ffff_ffff_ffff)
}

// Records which are found by their ID.
pub(crate) trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! impl_keyed {
    ($($name:ty),+) => {
        $(impl Keyed for $name {
            fn key(&self) -> &str {
                &self.id
            }
        })+
    };
}

pub(crate) fn find<'a, T: Keyed>(
    items: &'a [T],
    id: &str,
    not_found: fn(String) -> LsmError,
    what: &str,
) -> Result<&'a T> {
    items
        .iter()
        .find(|i| i.key() == id)
        .ok_or_else(|| not_found(format!("{} {} not found", what, id)))
}

pub(crate) fn find_mut<'a, T: Keyed>(
    items: &'a mut [T],
    id: &str,
    not_found: fn(String) -> LsmError,
    what: &str,
) -> Result<&'a mut T> {
    items
        .iter_mut()
        .find(|i| i.key() == id)
        .ok_or_else(|| not_found(format!("{} {} not found", what, id)))
}

pub(crate) fn remove<T: Keyed>(items: &mut Vec<T>, id: &str) {
    items.retain(|i| i.key() != id);
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct SimDisk {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) disk_type: DiskType,
    pub(crate) size: u64,
    pub(crate) vpd83: String,
    pub(crate) rpm: i32,
    pub(crate) link_type: DiskLinkType,
    pub(crate) location: String,
    /// Pool using this disk, `None` for free disk.
    pub(crate) owner: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) enum PoolSource {
    Disks { disk_ids: Vec<String>, data_disk_count: u32 },
    Parent { pool_id: String, size: u64 },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct SimPool {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) element_type: u64,
    pub(crate) unsupported_actions: u64,
    pub(crate) raid_type: RaidType,
    pub(crate) strip_size: u32,
    pub(crate) source: PoolSource,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct SimVolume {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) vpd83: String,
    pub(crate) pool_id: String,
    pub(crate) size: u64,
    pub(crate) enabled: bool,
    /// Created by `volume_raid_create`, owns its pool.
    pub(crate) is_hw_raid: bool,
    pub(crate) write_cache: CachePolicy,
    pub(crate) read_cache: CachePolicy,
    pub(crate) phy_disk_cache: CachePolicy,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct SimAccessGroup {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) init_type: InitiatorType,
    pub(crate) init_ids: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct SimMask {
    pub(crate) vol_id: String,
    pub(crate) ag_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct SimReplica {
    pub(crate) src_vol_id: String,
    pub(crate) dst_vol_id: String,
    pub(crate) rep_type: VolumeReplicateType,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct SimFs {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) pool_id: String,
    pub(crate) size: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct SimFsSnapshot {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) fs_id: String,
    pub(crate) ts: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct SimFsClone {
    pub(crate) src_fs_id: String,
    pub(crate) dst_fs_id: String,
}

impl_keyed!(
    SimDisk,
    SimPool,
    SimVolume,
    SimAccessGroup,
    SimFs,
    SimFsSnapshot,
    NfsExport
);

/// Everything the simulator knows, stored as one JSON document.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct SimState {
    pub(crate) version: String,
    last_ids: BTreeMap<String, u64>,
    pub(crate) read_cache_pct: i8,
    pub(crate) disks: Vec<SimDisk>,
    pub(crate) pools: Vec<SimPool>,
    pub(crate) volumes: Vec<SimVolume>,
    pub(crate) access_groups: Vec<SimAccessGroup>,
    pub(crate) masks: Vec<SimMask>,
    pub(crate) replicas: Vec<SimReplica>,
    pub(crate) target_ports: Vec<TargetPort>,
    pub(crate) batteries: Vec<Battery>,
    pub(crate) fss: Vec<SimFs>,
    pub(crate) fs_snapshots: Vec<SimFsSnapshot>,
    pub(crate) fs_clones: Vec<SimFsClone>,
    pub(crate) exports: Vec<NfsExport>,
    pub(crate) jobs: JobTable,
}

impl SimState {
    /// Generate next ID for `prefix`, IDs are never reused.
    pub(crate) fn next_id(&mut self, prefix: &str) -> String {
        let n = self.last_ids.entry(prefix.to_string()).or_insert(0);
        *n += 1;
        format!("{}_{:05}", prefix, n)
    }

    /// Initial data of a new simulator.
    pub(crate) fn seed() -> Result<SimState> {
        let mut state = SimState {
            version: STATE_VERSION.to_string(),
            last_ids: BTreeMap::new(),
            read_cache_pct: DEFAULT_READ_CACHE_PCT,
            disks: Vec::new(),
            pools: Vec::new(),
            volumes: Vec::new(),
            access_groups: Vec::new(),
            masks: Vec::new(),
            replicas: Vec::new(),
            target_ports: Vec::new(),
            batteries: Vec::new(),
            fss: Vec::new(),
            fs_snapshots: Vec::new(),
            fs_clones: Vec::new(),
            exports: Vec::new(),
            jobs: JobTable::new(),
        };

        let sata = state.add_disks(
            2, "2TiB SATA Disk", DiskType::Sata, SIZE_2TIB, 7200,
            DiskLinkType::Ata, 1,
        );
        let sas = state.add_disks(
            6, "2TiB SAS Disk", DiskType::Sas, SIZE_2TIB, 15000,
            DiskLinkType::Sas, 2,
        );
        let ssd = state.add_disks(
            5, "512GiB SSD Disk", DiskType::Ssd, SIZE_512GIB,
            RPM_NON_ROTATING, DiskLinkType::Ata, 3,
        );
        state.add_disks(
            7, "2TiB SSD Disk", DiskType::Ssd, SIZE_2TIB, RPM_NON_ROTATING,
            DiskLinkType::Sas, 3,
        );

        for (port_type, addr, net_addr, phy_addr, phy_name) in &[
            (
                PortType::Fc,
                "50:0a:09:86:99:4b:8d:c5",
                "50:0a:09:86:99:4b:8d:c5",
                "50:0a:09:86:99:4b:8d:c5",
                "FC_a_0b",
            ),
            (
                PortType::FCoE,
                "50:0a:09:86:99:4b:8d:c6",
                "50:0a:09:86:99:4b:8d:c6",
                "50:0a:09:86:99:4b:8d:c6",
                "FCoE_b_0c",
            ),
            (
                PortType::Iscsi,
                "iqn.1986-05.com.example:sim-tgt-03",
                "sim-iscsi-tgt-3.example.com:3260",
                "a4:4e:31:47:f4:e0",
                "iSCSI_c_0d",
            ),
            (
                PortType::Iscsi,
                "iqn.1986-05.com.example:sim-tgt-03",
                "10.0.0.1:3260",
                "a4:4e:31:47:f4:e1",
                "iSCSI_c_0e",
            ),
            (
                PortType::Iscsi,
                "iqn.1986-05.com.example:sim-tgt-03",
                "[2001:470:1f09:efe:a64e:31ff::1]:3260",
                "a4:4e:31:47:f4:e1",
                "iSCSI_c_0e",
            ),
        ] {
            let id = state.next_id("TGT_PORT_ID");
            state.target_ports.push(TargetPort::new(
                &id, *port_type, addr, net_addr, phy_addr, phy_name, SYS_ID,
            ));
        }

        for (name, bat_type) in &[
            ("Battery SIMB01, 8000 mAh, 05 March 2016", BatteryType::Chemical),
            ("Capacitor SIMC01, 500 J, 05 March 2016", BatteryType::Capacitor),
        ] {
            let id = state.next_id("BAT_ID");
            state.batteries.push(Battery::new(
                &id,
                name,
                *bat_type,
                Battery::STATUS_OK,
                SYS_ID,
            ));
        }

        let pool_1 = state.pool_create_from_disks(
            "Pool 1",
            &sata,
            RaidType::Raid1,
            Pool::ELEMENT_TYPE_POOL
                | Pool::ELEMENT_TYPE_FS
                | Pool::ELEMENT_TYPE_VOLUME
                | Pool::ELEMENT_TYPE_DELTA
                | Pool::ELEMENT_TYPE_SYS_RESERVED,
            Pool::UNSUPPORTED_VOLUME_GROW | Pool::UNSUPPORTED_VOLUME_SHRINK,
            0,
        )?;
        state.pool_create_sub_pool(
            "Pool 2(sub pool of Pool 1)",
            &pool_1,
            SIZE_512GIB,
            Pool::ELEMENT_TYPE_FS
                | Pool::ELEMENT_TYPE_VOLUME
                | Pool::ELEMENT_TYPE_DELTA,
        )?;
        state.pool_create_from_disks(
            "Pool 3",
            &ssd[..2],
            RaidType::Raid1,
            Pool::ELEMENT_TYPE_FS
                | Pool::ELEMENT_TYPE_VOLUME
                | Pool::ELEMENT_TYPE_DELTA,
            0,
            0,
        )?;
        state.pool_create_from_disks(
            "lsm_test_aggr",
            &sas[..2],
            RaidType::Raid0,
            Pool::ELEMENT_TYPE_FS
                | Pool::ELEMENT_TYPE_VOLUME
                | Pool::ELEMENT_TYPE_DELTA,
            0,
            DEFAULT_STRIP_SIZE,
        )?;
        Ok(state)
    }

    #[allow(clippy::too_many_arguments)]
    fn add_disks(
        &mut self,
        count: u32,
        prefix: &str,
        disk_type: DiskType,
        size: u64,
        rpm: i32,
        link_type: DiskLinkType,
        bay: u32,
    ) -> Vec<String> {
        let mut ids = Vec::new();
        for port in 0..count {
            let id = self.next_id("DISK_ID");
            self.disks.push(SimDisk {
                name: format!("{}_{}", prefix, &id[id.len() - 5..]),
                id: id.clone(),
                disk_type,
                size,
                vpd83: random_vpd83(),
                rpm,
                link_type,
                location: format!("Port: {} Box: 1 Bay: {}", port, bay),
                owner: None,
            });
            ids.push(id);
        }
        ids
    }

    fn check_pool_name(&self, name: &str) -> Result<()> {
        if self.pools.iter().any(|p| p.name == name) {
            return Err(LsmError::NameConflict(format!(
                "Pool name '{}' in use",
                name
            )));
        }
        Ok(())
    }

    /// Create pool from free disks, returns the new pool ID. Zero
    /// `strip_size` means default.
    pub(crate) fn pool_create_from_disks(
        &mut self,
        name: &str,
        disk_ids: &[String],
        raid_type: RaidType,
        element_type: u64,
        unsupported_actions: u64,
        strip_size: u32,
    ) -> Result<String> {
        if !SUPPORTED_RAID_TYPES.contains(&raid_type) {
            return Err(LsmError::NoSupport(
                "Specified RAID type is not supported".to_string(),
            ));
        }
        if strip_size != 0 && !SUPPORTED_STRIP_SIZES.contains(&strip_size) {
            return Err(LsmError::NoSupport(
                "Specified strip size is not supported".to_string(),
            ));
        }
        let strip_size = match raid_type {
            RaidType::Raid1 | RaidType::Jbod => {
                if strip_size != 0 {
                    return Err(LsmError::InvalidArgument(
                        "For RAID 1 and JBOD, strip size should be 0"
                            .to_string(),
                    ));
                }
                BLOCK_SIZE as u32
            }
            _ if strip_size == 0 => DEFAULT_STRIP_SIZE,
            _ => strip_size,
        };
        let count = disk_ids.len() as u32;
        let parity_count = match raid_type {
            RaidType::Raid1 | RaidType::Raid5 => 1,
            RaidType::Raid6 | RaidType::Raid50 => 2,
            RaidType::Raid60 => 4,
            RaidType::Raid10 => count / 2,
            _ => 0,
        };
        if count <= parity_count {
            return Err(LsmError::InvalidArgument(format!(
                "Not enough disks for {:?}",
                raid_type
            )));
        }
        self.check_pool_name(name)?;
        for disk_id in disk_ids {
            let disk =
                find(&self.disks, disk_id, LsmError::NotFoundDisk, "Disk")?;
            if disk.owner.is_some() {
                return Err(LsmError::DiskNotFree(format!(
                    "Disk {} is used by other pool",
                    disk_id
                )));
            }
        }

        let id = self.next_id("POOL_ID");
        for disk in self.disks.iter_mut() {
            if disk_ids.contains(&disk.id) {
                disk.owner = Some(id.clone());
            }
        }
        debug!("Created pool {} '{}' from {:?}", id, name, disk_ids);
        self.pools.push(SimPool {
            id: id.clone(),
            name: name.to_string(),
            element_type,
            unsupported_actions,
            raid_type,
            strip_size,
            source: PoolSource::Disks {
                disk_ids: disk_ids.to_vec(),
                data_disk_count: count - parity_count,
            },
        });
        Ok(id)
    }

    fn pool_create_sub_pool(
        &mut self,
        name: &str,
        parent_id: &str,
        size: u64,
        element_type: u64,
    ) -> Result<String> {
        self.check_pool_name(name)?;
        self.check_pool_space(parent_id, size)?;
        let id = self.next_id("POOL_ID");
        let parent =
            find(&self.pools, parent_id, LsmError::NotFoundPool, "Pool")?;
        let (raid_type, strip_size) = (parent.raid_type, parent.strip_size);
        self.pools.push(SimPool {
            id: id.clone(),
            name: name.to_string(),
            element_type,
            unsupported_actions: 0,
            raid_type,
            strip_size,
            source: PoolSource::Parent {
                pool_id: parent_id.to_string(),
                size,
            },
        });
        Ok(id)
    }

    pub(crate) fn pool_total_space(&self, pool: &SimPool) -> u64 {
        match &pool.source {
            PoolSource::Parent { size, .. } => *size,
            PoolSource::Disks {
                disk_ids,
                data_disk_count,
            } => {
                let min_size = self
                    .disks
                    .iter()
                    .filter(|d| disk_ids.contains(&d.id))
                    .map(|d| d.size)
                    .min()
                    .unwrap_or(0);
                min_size * u64::from(*data_disk_count)
            }
        }
    }

    pub(crate) fn pool_free_space(&self, pool: &SimPool) -> u64 {
        let vols: u64 = self
            .volumes
            .iter()
            .filter(|v| v.pool_id == pool.id)
            .map(|v| v.size)
            .sum();
        let fss: u64 = self
            .fss
            .iter()
            .filter(|f| f.pool_id == pool.id)
            .map(|f| f.size)
            .sum();
        let sub_pools: u64 = self
            .pools
            .iter()
            .filter_map(|p| match &p.source {
                PoolSource::Parent { pool_id, size } if *pool_id == pool.id => {
                    Some(*size)
                }
                _ => None,
            })
            .sum();
        self.pool_total_space(pool)
            .saturating_sub(vols + fss + sub_pools)
    }

    pub(crate) fn check_pool_space(
        &self,
        pool_id: &str,
        size: u64,
    ) -> Result<()> {
        let pool = find(&self.pools, pool_id, LsmError::NotFoundPool, "Pool")?;
        if self.pool_free_space(pool) < size {
            return Err(LsmError::NoEnoughSpace(
                "Insufficient space in pool".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn system(&self) -> System {
        let mut sys = System::new(SYS_ID, SYS_NAME, System::STATUS_OK);
        sys.fw_version = format!("LSM_SIMULATOR_DATA_{}", STATE_VERSION);
        sys.read_cache_pct = self.read_cache_pct;
        sys.mode = SystemMode::HardwareRaid;
        sys
    }

    pub(crate) fn check_system(&self, sys_id: &str) -> Result<()> {
        if sys_id != SYS_ID {
            return Err(LsmError::NotFoundSystem(format!(
                "System {} not found",
                sys_id
            )));
        }
        Ok(())
    }

    pub(crate) fn pool_record(&self, pool: &SimPool) -> Pool {
        let mut p = Pool::new(
            &pool.id,
            &pool.name,
            pool.element_type,
            self.pool_total_space(pool),
            self.pool_free_space(pool),
            SYS_ID,
        );
        p.unsupported_actions = pool.unsupported_actions;
        p
    }

    pub(crate) fn disk_record(&self, disk: &SimDisk) -> Disk {
        let status = match disk.owner {
            Some(_) => Disk::STATUS_OK,
            None => Disk::STATUS_OK | Disk::STATUS_FREE,
        };
        let mut d = Disk::new(
            &disk.id,
            &disk.name,
            disk.disk_type,
            BLOCK_SIZE,
            disk.size / BLOCK_SIZE,
            status,
            SYS_ID,
        );
        d.location = Some(disk.location.clone());
        d.rpm = Some(disk.rpm);
        d.link_type = Some(disk.link_type);
        d.vpd83 = Some(disk.vpd83.clone());
        d
    }

    pub(crate) fn volume(&self, vol_id: &str) -> Result<&SimVolume> {
        find(&self.volumes, vol_id, LsmError::NotFoundVolume, "Volume")
    }

    pub(crate) fn volume_record(&self, vol_id: &str) -> Result<Volume> {
        let vol = self.volume(vol_id)?;
        let mut v = Volume::new(
            &vol.id,
            &vol.name,
            BLOCK_SIZE,
            vol.size / BLOCK_SIZE,
            SYS_ID,
            &vol.pool_id,
        );
        v.vpd83 = vol.vpd83.clone();
        v.enabled = vol.enabled;
        Ok(v)
    }

    pub(crate) fn access_group(&self, ag_id: &str) -> Result<&SimAccessGroup> {
        find(
            &self.access_groups,
            ag_id,
            LsmError::NotFoundAccessGroup,
            "Access group",
        )
    }

    pub(crate) fn access_group_record(
        &self,
        ag_id: &str,
    ) -> Result<AccessGroup> {
        let ag = self.access_group(ag_id)?;
        Ok(AccessGroup::new(
            &ag.id,
            &ag.name,
            ag.init_ids.clone(),
            ag.init_type,
            SYS_ID,
        ))
    }

    pub(crate) fn fs(&self, fs_id: &str) -> Result<&SimFs> {
        find(&self.fss, fs_id, LsmError::NotFoundFs, "File system")
    }

    pub(crate) fn fs_record(&self, fs_id: &str) -> Result<FileSystem> {
        let fs = self.fs(fs_id)?;
        Ok(FileSystem::new(
            &fs.id, &fs.name, fs.size, fs.size, SYS_ID, &fs.pool_id,
        ))
    }

    pub(crate) fn fs_snapshot(&self, snap_id: &str) -> Result<&SimFsSnapshot> {
        find(
            &self.fs_snapshots,
            snap_id,
            LsmError::NotFoundFsSnapshot,
            "File system snapshot",
        )
    }

    pub(crate) fn fs_snapshot_record(
        &self,
        snap_id: &str,
    ) -> Result<FileSystemSnapShot> {
        let snap = self.fs_snapshot(snap_id)?;
        Ok(FileSystemSnapShot::new(&snap.id, &snap.name, snap.ts))
    }

    /// Record of `data_type` with ID `id`, the result of a job.
    pub(crate) fn job_record(
        &self,
        data_type: DataType,
        id: &str,
    ) -> Result<Option<Record>> {
        Ok(Some(match data_type {
            DataType::None => return Ok(None),
            DataType::Volume => Record::Volume(self.volume_record(id)?),
            DataType::FileSystem => Record::FileSystem(self.fs_record(id)?),
            DataType::FsSnapshot => {
                Record::FsSnapshot(self.fs_snapshot_record(id)?)
            }
            t => {
                return Err(LsmError::PluginBug(format!(
                    "Got unexpected job data type {:?}",
                    t
                )))
            }
        }))
    }
}

/// The state file. Every access holds an exclusive `flock(2)` lock on the
/// `<statefile>.lock` file next to it, as the state file itself is replaced
/// on every save.
pub(crate) struct StateFile {
    path: PathBuf,
    timeout: Duration,
}

impl StateFile {
    pub(crate) fn new(path: &Path, timeout_ms: u32) -> StateFile {
        StateFile {
            path: path.to_path_buf(),
            timeout: Duration::from_millis(u64::from(timeout_ms)),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn set_timeout(&mut self, ms: u32) {
        self.timeout = Duration::from_millis(u64::from(ms));
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(suffix);
        PathBuf::from(p)
    }

    fn lock(&self) -> Result<Flock<File>> {
        let deadline = Instant::now() + self.timeout;
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.sibling(".lock"))?;
        loop {
            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(l) => return Ok(l),
                Err((f, e)) if e == Errno::EWOULDBLOCK => {
                    if Instant::now() >= deadline {
                        return Err(LsmError::TimeOut(format!(
                            "Timeout on locking state file '{}'",
                            self.path.display()
                        )));
                    }
                    file = f;
                    sleep(Duration::from_millis(LOCK_RETRY_INTERVAL));
                }
                Err((_, e)) => return Err(e.into()),
            }
        }
    }

    fn load(&self) -> Result<SimState> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            info!("Initializing state file {}", self.path.display());
            return SimState::seed();
        }
        let state: SimState = serde_json::from_str(&content).map_err(|e| {
            LsmError::PluginBug(format!(
                "Corrupted state file '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        if state.version != STATE_VERSION {
            return Err(LsmError::InvalidArgument(format!(
                "Stored simulator state version {} is incompatible with \
                 current version {}, please delete '{}'",
                state.version,
                STATE_VERSION,
                self.path.display()
            )));
        }
        Ok(state)
    }

    // Readers never see a half written state file: the new content is
    // synced to a temporary file which is then renamed over the old one.
    fn store(&self, state: &SimState) -> Result<()> {
        let content = serde_json::to_string(state)?;
        let tmp_path = self.sibling(".tmp");
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(content.as_bytes())?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Run `f` against current state without saving any change.
    pub(crate) fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SimState) -> Result<T>,
    {
        let _lock = self.lock()?;
        let state = self.load()?;
        f(&state)
    }

    /// Run `f` against current state, changes are saved only when `f`
    /// succeeded.
    pub(crate) fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SimState) -> Result<T>,
    {
        let _lock = self.lock()?;
        let mut state = self.load()?;
        let ret = f(&mut state)?;
        self.store(&state)?;
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_inventory() {
        let state = SimState::seed().unwrap();
        assert_eq!(20, state.disks.len());
        assert_eq!(4, state.pools.len());
        assert_eq!(5, state.target_ports.len());
        assert_eq!(2, state.batteries.len());
        assert_eq!(6, state.disks.iter().filter(|d| d.owner.is_some()).count());

        let pool_1 = &state.pools[0];
        assert_eq!("Pool 1", pool_1.name);
        assert_eq!(SIZE_2TIB, state.pool_total_space(pool_1));
        // Pool 2 is carved from Pool 1
        assert_eq!(SIZE_2TIB - SIZE_512GIB, state.pool_free_space(pool_1));
        assert_eq!(SIZE_512GIB, state.pool_free_space(&state.pools[1]));
        assert_eq!(2 * SIZE_2TIB, state.pool_total_space(&state.pools[3]));
    }

    #[test]
    fn ids_are_not_reused() {
        let mut state = SimState::seed().unwrap();
        assert_eq!("POOL_ID_00005", state.next_id("POOL_ID"));
        assert_eq!("VOL_ID_00001", state.next_id("VOL_ID"));
        assert_eq!("VOL_ID_00002", state.next_id("VOL_ID"));
    }

    #[test]
    fn disk_must_be_free() {
        let mut state = SimState::seed().unwrap();
        let used = state.disks[0].id.clone();
        match state.pool_create_from_disks(
            "p",
            &[used],
            RaidType::Raid0,
            Pool::ELEMENT_TYPE_VOLUME,
            0,
            0,
        ) {
            Err(LsmError::DiskNotFree(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn raid1_strip_size() {
        let mut state = SimState::seed().unwrap();
        let free: Vec<String> = state
            .disks
            .iter()
            .filter(|d| d.owner.is_none())
            .take(2)
            .map(|d| d.id.clone())
            .collect();
        assert!(state
            .pool_create_from_disks(
                "p",
                &free,
                RaidType::Raid1,
                Pool::ELEMENT_TYPE_VOLUME,
                0,
                DEFAULT_STRIP_SIZE,
            )
            .is_err());
        let id = state
            .pool_create_from_disks(
                "p",
                &free,
                RaidType::Raid1,
                Pool::ELEMENT_TYPE_VOLUME,
                0,
                0,
            )
            .unwrap();
        let pool = find(&state.pools, &id, LsmError::NotFoundPool, "Pool");
        assert_eq!(BLOCK_SIZE as u32, pool.unwrap().strip_size);
    }

    #[test]
    fn failed_write_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let db = StateFile::new(&dir.path().join("state.json"), 1000);
        db.write(|s| {
            s.read_cache_pct = 50;
            Ok(())
        })
        .unwrap();
        let ret: Result<()> = db.write(|s| {
            s.read_cache_pct = 70;
            Err(LsmError::InvalidArgument("abort".to_string()))
        });
        assert!(ret.is_err());
        assert_eq!(50, db.read(|s| Ok(s.read_cache_pct)).unwrap());
    }

    #[test]
    fn save_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let db = StateFile::new(&path, 1000);
        assert_eq!(4, db.read(|s| Ok(s.pools.len())).unwrap());
        assert!(!path.exists());

        db.write(|s| {
            s.read_cache_pct = 30;
            Ok(())
        })
        .unwrap();
        let first_len = fs::metadata(&path).unwrap().len();
        db.write(|s| {
            s.pools.truncate(1);
            Ok(())
        })
        .unwrap();
        assert!(fs::metadata(&path).unwrap().len() < first_len);
        assert!(!dir.path().join("state.json.tmp").exists());

        let db = StateFile::new(&path, 1000);
        assert_eq!(1, db.read(|s| Ok(s.pools.len())).unwrap());
        assert_eq!(30, db.read(|s| Ok(s.read_cache_pct)).unwrap());
    }

    #[test]
    fn lock_wait_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let db = StateFile::new(&dir.path().join("state.json"), 50);
        let _held = db.lock().unwrap();
        match db.read(|_| Ok(())) {
            Err(LsmError::TimeOut(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn rounding() {
        assert_eq!(0, round_to_block(0).unwrap());
        assert_eq!(512, round_to_block(1).unwrap());
        assert_eq!(1_000_000_000, round_to_block(1_000_000_000).unwrap());
        assert_eq!(1024, round_to_block(513).unwrap());
        assert_eq!(u64::MAX - 511, round_to_block(u64::MAX - 511).unwrap());
        match round_to_block(u64::MAX) {
            Err(LsmError::NoEnoughSpace(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }
}
