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

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::capability::Capabilities;
use super::error::*;

// Integer backed enum with a fallback variant for values unknown to this
// library version.
macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $repr:ident, fallback $fallback:ident {
            $($(#[$vmeta:meta])* $variant:ident = $val:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[repr($repr)]
        #[derive(Debug, Clone, PartialEq, Eq, Copy)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $val,)+
        }

        impl From<$repr> for $name {
            fn from(i: $repr) -> $name {
                match i {
                    $($val => $name::$variant,)+
                    _ => $name::$fallback,
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> ::std::result::Result<S::Ok, S::Error> {
                (*self as $repr).serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> ::std::result::Result<$name, D::Error> {
                let i: $repr = Deserialize::deserialize(deserializer)?;
                Ok(From::from(i))
            }
        }
    };
}

fn gen_system_class_string() -> String {
    System::CLASS.to_string()
}

fn gen_pool_class_string() -> String {
    Pool::CLASS.to_string()
}

fn gen_vol_class_string() -> String {
    Volume::CLASS.to_string()
}

fn gen_ag_class_string() -> String {
    AccessGroup::CLASS.to_string()
}

fn gen_fs_class_string() -> String {
    FileSystem::CLASS.to_string()
}

fn gen_fs_snap_class_string() -> String {
    FileSystemSnapShot::CLASS.to_string()
}

fn gen_exp_class_string() -> String {
    NfsExport::CLASS.to_string()
}

fn gen_disk_class_string() -> String {
    Disk::CLASS.to_string()
}

fn gen_tgt_class_string() -> String {
    TargetPort::CLASS.to_string()
}

fn gen_bat_class_string() -> String {
    Battery::CLASS.to_string()
}

fn gen_blk_range_class_string() -> String {
    BlockRange::CLASS.to_string()
}

fn int_to_bool<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<bool, D::Error> {
    let i: i32 = Deserialize::deserialize(deserializer)?;
    Ok(i == 1)
}

fn bool_to_int<S: Serializer>(
    b: &bool,
    serializer: S,
) -> ::std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i8(if *b { 1 } else { 0 })
}

/// Represent a storage system. Examples:
///
///  * A hardware RAID card, LSI `MegaRAID`
///
///  * A storage area network (SAN), e.g. `EMC` VNX, `NetApp` Filer
///
///  * A software solution running on commodity hardware, targetd, Nexenta
///
///  * A Linux system running NFS service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct System {
    #[serde(default = "gen_system_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Human friendly name.
    pub name: String,
    /// System status stored in bitmap. Valid status value are:
    ///
    ///  * [`System::STATUS_UNKNOWN`][1]
    ///  * [`System::STATUS_OK`][2]
    ///  * [`System::STATUS_ERROR`][3]
    ///  * [`System::STATUS_DEGRADED`][4]
    ///  * [`System::STATUS_PREDICTIVE_FAILURE`][5]
    ///  * [`System::STATUS_OTHER`][6]
    ///
    /// ```rust,no_run
    /// use lsm::{Client, System};
    ///
    /// let mut c = Client::new("simc://", None, None).unwrap();
    /// let syss = c.systems().unwrap();
    ///
    /// for s in syss {
    ///     if (s.status & System::STATUS_OK) == 0 {
    ///         println!("System is not healthy");
    ///     }
    /// }
    /// ```
    /// [1]: #associatedconstant.STATUS_UNKNOWN
    /// [2]: #associatedconstant.STATUS_OK
    /// [3]: #associatedconstant.STATUS_ERROR
    /// [4]: #associatedconstant.STATUS_DEGRADED
    /// [5]: #associatedconstant.STATUS_PREDICTIVE_FAILURE
    /// [6]: #associatedconstant.STATUS_OTHER
    pub status: u32,
    /// Additional message for status.
    #[serde(default)]
    pub status_info: String,
    /// Plugin private data, ignored by the client.
    #[serde(default)]
    pub plugin_data: Option<String>,
    /// Firmware version.
    #[serde(default)]
    pub fw_version: String,
    /// Read cache percentage of the system. Valid values are:
    ///
    /// * `>0 and < 100` means only a part of whole cache are used for read.
    /// * `0` means no read cache.
    /// * `100` means all cache are used for read.
    /// * [`System::READ_CACHE_PCT_NO_SUPPORT`][1] means no support.
    /// * [`System::READ_CACHE_PCT_UNKNOWN`][2] means plugin failed to
    ///   detect this value.
    ///
    /// [1]: #associatedconstant.READ_CACHE_PCT_NO_SUPPORT
    /// [2]: #associatedconstant.READ_CACHE_PCT_UNKNOWN
    #[serde(default = "System::read_cache_pct_no_support")]
    pub read_cache_pct: i8,
    /// System mode, currently only supports hardware RAID cards.
    #[serde(default = "System::mode_no_support")]
    pub mode: SystemMode,
}

impl System {
    pub(crate) const CLASS: &'static str = "System";

    /// Plugin does not support querying read cache percentage.
    pub const READ_CACHE_PCT_NO_SUPPORT: i8 = -2;
    /// Plugin failed to query read cache percentage.
    pub const READ_CACHE_PCT_UNKNOWN: i8 = -1;

    /// Plugin failed to query system status.
    pub const STATUS_UNKNOWN: u32 = 1;
    /// System is up and healthy.
    pub const STATUS_OK: u32 = 1 << 1;
    /// System is in error state.
    pub const STATUS_ERROR: u32 = 1 << 2;
    /// System is degraded.
    pub const STATUS_DEGRADED: u32 = 1 << 3;
    /// System has protential failure.
    pub const STATUS_PREDICTIVE_FAILURE: u32 = 1 << 4;
    /// Vendor specific status.
    pub const STATUS_OTHER: u32 = 1 << 5;

    /// Create a system record. Read cache percentage and system mode are
    /// marked as not supported until plugin set them.
    pub fn new(id: &str, name: &str, status: u32) -> System {
        System {
            class: gen_system_class_string(),
            id: id.to_string(),
            name: name.to_string(),
            status,
            status_info: String::new(),
            plugin_data: None,
            fw_version: String::new(),
            read_cache_pct: System::READ_CACHE_PCT_NO_SUPPORT,
            mode: SystemMode::NoSupport,
        }
    }

    fn read_cache_pct_no_support() -> i8 {
        System::READ_CACHE_PCT_NO_SUPPORT
    }

    fn mode_no_support() -> SystemMode {
        SystemMode::NoSupport
    }
}

int_enum! {
    pub enum SystemMode: i8, fallback Unknown {
        /// Plugin failed to query system mode.
        Unknown = -2,
        /// Plugin does not support querying system mode.
        NoSupport = -1,
        /// The storage system is a hardware RAID card(like HP SmartArray and
        /// LSI MegaRAID) and could expose the logical volume(aka, RAIDed
        /// virtual disk) to OS while hardware RAID card is handling the RAID
        /// algorithm. In this mode, storage system cannot expose physical disk
        /// directly to OS.
        HardwareRaid = 0,
        /// The physical disks can be exposed to OS directly without any
        /// configurations. SCSI enclosure service might be exposed to OS also.
        Hba = 1,
    }
}

/// Represent a storage volume. Also known as LUN(Logical Unit Number) or
/// Storage Volume or Virtual Disk. The host OS treats it as block devices (one
/// volume can be exposed as many disks when [multipath I/O][1] is enabled).
///
/// [1]: https://en.wikipedia.org/wiki/Multipath_I/O
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Volume {
    #[serde(default = "gen_vol_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Human friendly name.
    pub name: String,
    #[serde(deserialize_with = "int_to_bool")]
    #[serde(serialize_with = "bool_to_int")]
    #[serde(rename = "admin_state")]
    /// Whether volume is online or offline(I/O access disabled by
    /// administrator.
    pub enabled: bool,
    /// Block size.
    pub block_size: u64,
    /// Number of blocks.
    pub num_of_blocks: u64,
    /// Plugin private data, ignored by the client.
    #[serde(default)]
    pub plugin_data: Option<String>,
    /// SCSI VPD 0x83 NAA type identifier.
    /// Udev treat it as `ID_WWN_WITH_EXTENSION`
    #[serde(default)]
    pub vpd83: String,
    /// Identifier of owner system.
    pub system_id: String,
    /// Identifier of owner pool.
    pub pool_id: String,
}

impl Volume {
    pub(crate) const CLASS: &'static str = "Volume";

    /// Create an enabled volume record without VPD 0x83 identifier.
    pub fn new(
        id: &str,
        name: &str,
        block_size: u64,
        num_of_blocks: u64,
        system_id: &str,
        pool_id: &str,
    ) -> Volume {
        Volume {
            class: gen_vol_class_string(),
            id: id.to_string(),
            name: name.to_string(),
            enabled: true,
            block_size,
            num_of_blocks,
            plugin_data: None,
            vpd83: String::new(),
            system_id: system_id.to_string(),
            pool_id: pool_id.to_string(),
        }
    }

    /// Retried the usable size of volume in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.block_size * self.num_of_blocks
    }
}

int_enum! {
    /// Represent a volume replication type.
    pub enum VolumeReplicateType: i32, fallback Unknown {
        /// Plugin failed to detect volume replication type.
        Unknown = -1,
        /// Point in time read writeable space efficient copy of data. Also
        /// know as read writeable snapshot.
        Clone = 2,
        /// Full bitwise copy of the data (occupies full space).
        Copy = 3,
        /// I/O will be blocked until I/O reached both source and target
        /// storage systems. There will be no data difference between source
        /// and target storage systems.
        MirrorSync = 4,
        /// I/O will be blocked until I/O reached source storage systems.  The
        /// source storage system will use copy the changes data to target
        /// system in a predefined interval. There will be a small data
        /// differences between source and target.
        MirrorAsync = 5,
    }
}

int_enum! {
    /// Represent a RAID type.
    pub enum RaidType: i32, fallback Unknown {
        /// Plugin failed to detect RAID type.
        Unknown = -1,
        /// [RAID 0](https://en.wikipedia.org/wiki/Standard_RAID_levels#RAID_0)
        Raid0 = 0,
        /// Two disk mirror.
        Raid1 = 1,
        /// Byte-level striping with dedicated parity.
        Raid3 = 3,
        /// Block-level striping with dedicated parity.
        Raid4 = 4,
        /// Block-level striping with distributed parity.
        Raid5 = 5,
        /// Block-level striping with two distributed parities. Also known as
        /// RAID-DP.
        Raid6 = 6,
        /// Stripe of mirrors.
        Raid10 = 10,
        /// Parity of mirrors.
        Raid15 = 15,
        /// Dual parity of mirrors.
        Raid16 = 16,
        /// Stripe of parities.
        Raid50 = 50,
        /// Stripe of dual parities.
        Raid60 = 60,
        /// Mirror of parities.
        Raid51 = 51,
        /// Mirror of dual parities.
        Raid61 = 61,
        /// Just bunch of disks, no parity, no striping.
        Jbod = 20,
        /// This volume contains multiple RAID settings.
        Mixed = 21,
        /// Vendor specific RAID type
        Other = 22,
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Represent a Pool member.
pub enum PoolMember {
    /// Pool is created from disks.
    Disk(Disk),
    /// Pool is allocationed from other pool.
    Pool(Pool),
}

impl PoolMember {
    pub(crate) fn id(&self) -> &String {
        match self {
            PoolMember::Disk(d) => &d.id,
            PoolMember::Pool(p) => &p.id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PoolMemberKind {
    Disk,
    Pool,
}

#[derive(Debug, Clone, PartialEq)]
/// Represent pool membership informtion.
pub struct PoolMemberInfo {
    /// RAID type
    pub raid_type: RaidType,
    /// Pool members.
    pub members: Vec<PoolMember>,
}

const POOL_MEMBER_TYPE_UNKNOWN: u32 = 0;
const POOL_MEMBER_TYPE_DISK: u32 = 2;
const POOL_MEMBER_TYPE_POOL: u32 = 3;

impl PoolMemberInfo {
    // Wire layout: [raid_type, member_type, [member_id, ...]]
    pub(crate) fn to_value(&self) -> Value {
        let member_type = match self.members.first() {
            Some(PoolMember::Disk(_)) => POOL_MEMBER_TYPE_DISK,
            Some(PoolMember::Pool(_)) => POOL_MEMBER_TYPE_POOL,
            None => POOL_MEMBER_TYPE_UNKNOWN,
        };
        let ids: Vec<Value> = self
            .members
            .iter()
            .map(|m| Value::String(m.id().clone()))
            .collect();
        json!([self.raid_type as i32, member_type, ids])
    }

    // Resolve member ids against the full disk or pool list provided by
    // `fetch`.
    pub(crate) fn from_value<F>(val: &Value, fetch: F) -> Result<PoolMemberInfo>
    where
        F: FnOnce(PoolMemberKind) -> Result<Vec<PoolMember>>,
    {
        let (raid_type, member_type, member_ids): (i32, u32, Vec<String>) =
            serde_json::from_value(val.clone()).map_err(|_| {
                LsmError::PluginBug(format!(
                    "pool_member_info() got unexpected data: {:?}",
                    val
                ))
            })?;
        let kind = match member_type {
            POOL_MEMBER_TYPE_DISK => Some(PoolMemberKind::Disk),
            POOL_MEMBER_TYPE_POOL => Some(PoolMemberKind::Pool),
            _ => None,
        };
        let members = match kind {
            Some(k) => fetch(k)?
                .into_iter()
                .filter(|m| member_ids.contains(m.id()))
                .collect(),
            None => Vec::new(),
        };
        Ok(PoolMemberInfo {
            raid_type: From::from(raid_type),
            members,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Represent volume RAID informtion.
pub struct VolumeRaidInfo {
    /// RAID type
    pub raid_type: RaidType,
    /// The size of strip on each disk or other storage extent.
    /// For RAID1/JBOD, it should be set as block size.  If plugin failed to
    /// detect strip size, it should be set as 0.
    pub strip_size: u32,
    /// The count of disks used for assembling the RAID group(s) where this
    /// volume allocated from. For any RAID system using the slice of disk,
    /// this value indicate how many disk slices are used for the RAID.  For
    /// example, on LVM RAID, the 'disk_count' here indicate the count of PVs
    /// used for certain volume. Another example, on EMC VMAX, the 'disk_count'
    /// here indicate how many hyper volumes are used for this volume.  For any
    /// RAID system using remote LUN for data storing, each remote LUN should
    /// be count as a disk.  If the plugin failed to detect disk_count, it
    /// should be set as 0.
    pub disk_count: u32,
    /// The minimum I/O size, device preferred I/O size for random I/O. Any I/O
    /// size not equal to a multiple of this value may get significant speed
    /// penalty.  Normally it refers to strip size of each disk(extent).  If
    /// plugin failed to detect min_io_size, it should try these values in the
    /// sequence of: logical sector size -> physical sector size -> 0
    pub min_io_size: u32,
    /// The optimal I/O size, device preferred I/O size for sequential I/O.
    /// Normally it refers to RAID group stripe size.  If plugin failed to
    /// detect opt_io_size, it should be set to 0.
    pub opt_io_size: u32,
}

impl VolumeRaidInfo {
    pub(crate) fn to_value(&self) -> Value {
        json!([
            self.raid_type as i32,
            self.strip_size,
            self.disk_count,
            self.min_io_size,
            self.opt_io_size
        ])
    }

    pub(crate) fn from_value(val: &Value) -> Result<VolumeRaidInfo> {
        let ret: Vec<i64> = serde_json::from_value(val.clone())?;
        if ret.len() != 5 {
            return Err(LsmError::PluginBug(format!(
                "vol_raid_info() is expecting 5 i64 from plugin, \
                 but got '{:?}'",
                ret
            )));
        }
        Ok(VolumeRaidInfo {
            raid_type: From::from(ret[0] as i32),
            strip_size: ret[1] as u32,
            disk_count: ret[2] as u32,
            min_io_size: ret[3] as u32,
            opt_io_size: ret[4] as u32,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Pool {
    #[serde(default = "gen_pool_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Human friendly name.
    pub name: String,
    /// The type of elements this pool could create.
    /// Valid element types are:
    ///
    ///  * [`Pool::ELEMENT_TYPE_POOL`][1]
    ///  * [`Pool::ELEMENT_TYPE_VOLUME`][2]
    ///  * [`Pool::ELEMENT_TYPE_FS`][3]
    ///  * [`Pool::ELEMENT_TYPE_DELTA`][4]
    ///  * [`Pool::ELEMENT_TYPE_VOLUME_FULL`][5]
    ///  * [`Pool::ELEMENT_TYPE_VOLUME_THIN`][6]
    ///  * [`Pool::ELEMENT_TYPE_SYS_RESERVED`][7]
    ///
    /// The values are stored in bitmap:
    ///
    /// ```rust,no_run
    /// use lsm::{Client, Pool};
    ///
    /// let mut c = Client::new("simc://", None, None).unwrap();
    /// let ps = c.pools().unwrap();
    ///
    /// for p in ps {
    ///     if (p.element_type & Pool::ELEMENT_TYPE_VOLUME) != 0 {
    ///         println!("Pool {} could create volume", p.name);
    ///     }
    /// }
    /// ```
    /// [1]: #associatedconstant.ELEMENT_TYPE_POOL
    /// [2]: #associatedconstant.ELEMENT_TYPE_VOLUME
    /// [3]: #associatedconstant.ELEMENT_TYPE_FS
    /// [4]: #associatedconstant.ELEMENT_TYPE_DELTA
    /// [5]: #associatedconstant.ELEMENT_TYPE_VOLUME_FULL
    /// [6]: #associatedconstant.ELEMENT_TYPE_VOLUME_THIN
    /// [7]: #associatedconstant.ELEMENT_TYPE_SYS_RESERVED
    pub element_type: u64,
    /// The actions does not supported by this pool.
    /// Valid values are:
    ///
    ///  * [`Pool::UNSUPPORTED_VOLUME_GROW`][1]
    ///  * [`Pool::UNSUPPORTED_VOLUME_SHRINK`][2]
    ///
    /// [1]: #associatedconstant.UNSUPPORTED_VOLUME_GROW
    /// [2]: #associatedconstant.UNSUPPORTED_VOLUME_SHRINK
    pub unsupported_actions: u64,
    /// Total space in bytes.
    pub total_space: u64,
    /// Free space in bytes.
    pub free_space: u64,
    /// Pool status stored in bitmap. Valid status value are:
    ///
    ///  * [`Pool::STATUS_UNKNOWN`][1]
    ///  * [`Pool::STATUS_OK`][2]
    ///  * [`Pool::STATUS_OTHER`][3]
    ///  * [`Pool::STATUS_DEGRADED`][4]
    ///  * [`Pool::STATUS_ERROR`][5]
    ///  * [`Pool::STATUS_STOPPED`][6]
    ///  * [`Pool::STATUS_STARTING`][7]
    ///  * [`Pool::STATUS_RECONSTRUCTING`][8]
    ///  * [`Pool::STATUS_VERIFYING`][9]
    ///  * [`Pool::STATUS_INITIALIZING`][10]
    ///  * [`Pool::STATUS_GROWING`][11]
    ///
    /// [1]: #associatedconstant.STATUS_UNKNOWN
    /// [2]: #associatedconstant.STATUS_OK
    /// [3]: #associatedconstant.STATUS_OTHER
    /// [4]: #associatedconstant.STATUS_DEGRADED
    /// [5]: #associatedconstant.STATUS_ERROR
    /// [6]: #associatedconstant.STATUS_STOPPED
    /// [7]: #associatedconstant.STATUS_STARTING
    /// [8]: #associatedconstant.STATUS_RECONSTRUCTING
    /// [9]: #associatedconstant.STATUS_VERIFYING
    /// [10]: #associatedconstant.STATUS_INITIALIZING
    /// [11]: #associatedconstant.STATUS_GROWING
    pub status: u64,
    /// Additional message for status.
    #[serde(default)]
    pub status_info: Option<String>,
    /// Plugin private data, ignored by the client.
    #[serde(default)]
    pub plugin_data: Option<String>,
    /// Identifier of owner system.
    pub system_id: String,
}

impl Pool {
    pub(crate) const CLASS: &'static str = "Pool";

    /// This pool could allocate space for sub-pool.
    pub const ELEMENT_TYPE_POOL: u64 = 1 << 1;
    /// This pool could create volume.
    pub const ELEMENT_TYPE_VOLUME: u64 = 1 << 2;
    /// This pool could create file system.
    pub const ELEMENT_TYPE_FS: u64 = 1 << 3;
    /// This pool could hold delta data for snapshots.
    pub const ELEMENT_TYPE_DELTA: u64 = 1 << 4;
    /// This pool could create fully allocated volume.
    pub const ELEMENT_TYPE_VOLUME_FULL: u64 = 1 << 5;
    /// This pool could create thin provisioned volume.
    pub const ELEMENT_TYPE_VOLUME_THIN: u64 = 1 << 6;
    /// This pool is reserved for system internal use.
    pub const ELEMENT_TYPE_SYS_RESERVED: u64 = 1 << 10;

    /// This pool cannot grow size of its volume.
    pub const UNSUPPORTED_VOLUME_GROW: u64 = 1;
    /// This pool cannot shrink size of its volume.
    pub const UNSUPPORTED_VOLUME_SHRINK: u64 = 1 << 1;

    /// Plugin failed to query pool status.
    pub const STATUS_UNKNOWN: u64 = 1;
    /// The data of this pool is accessible with not data lose. But it might
    /// along with `Pool::STATUS_DEGRADED` to indicate redundancy lose.
    pub const STATUS_OK: u64 = 1 << 1;
    /// Vendor specific status. The `Pool.status_info` property will explain
    /// the detail.
    pub const STATUS_OTHER: u64 = 1 << 2;
    /// Pool is lost data redundancy due to I/O error or offline of one or more
    /// RAID member.
    pub const STATUS_DEGRADED: u64 = 1 << 4;
    /// Pool data is not accessible due to some members offline.
    pub const STATUS_ERROR: u64 = 1 << 5;
    ///  Pool is stopping by administrator. Pool data is not accessible.
    pub const STATUS_STOPPED: u64 = 1 << 9;
    ///  Pool is reviving from STOPPED status. Pool data is not accessible yet.
    pub const STATUS_STARTING: u64 = 1 << 10;
    /// Pool is reconstructing the hash data or mirror data.
    pub const STATUS_RECONSTRUCTING: u64 = 1 << 12;
    /// Array is running integrity check on data of current pool.
    pub const STATUS_VERIFYING: u64 = 1 << 13;
    /// Pool is not accessable and performing initializing task.
    pub const STATUS_INITIALIZING: u64 = 1 << 14;
    /// Pool is growing its size and doing internal jobs.
    pub const STATUS_GROWING: u64 = 1 << 15;

    /// Create a healthy pool record.
    pub fn new(
        id: &str,
        name: &str,
        element_type: u64,
        total_space: u64,
        free_space: u64,
        system_id: &str,
    ) -> Pool {
        Pool {
            class: gen_pool_class_string(),
            id: id.to_string(),
            name: name.to_string(),
            element_type,
            unsupported_actions: 0,
            total_space,
            free_space,
            status: Pool::STATUS_OK,
            status_info: None,
            plugin_data: None,
            system_id: system_id.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Disk {
    #[serde(default = "gen_disk_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Human friendly name.
    pub name: String,
    /// Disk type.
    pub disk_type: DiskType,
    /// Block size in bytes.
    pub block_size: u64,
    /// Count of block.
    pub num_of_blocks: u64,
    /// Disk status stored in bitmap. Valid status value are:
    ///
    ///  * [`Disk::STATUS_UNKNOWN`][1]
    ///  * [`Disk::STATUS_OK`][2]
    ///  * [`Disk::STATUS_OTHER`][3]
    ///  * [`Disk::STATUS_PREDICTIVE_FAILURE`][4]
    ///  * [`Disk::STATUS_ERROR`][5]
    ///  * [`Disk::STATUS_REMOVED`][6]
    ///  * [`Disk::STATUS_STARTING`][7]
    ///  * [`Disk::STATUS_STOPPING`][8]
    ///  * [`Disk::STATUS_STOPPED`][9]
    ///  * [`Disk::STATUS_INITIALIZING`][10]
    ///  * [`Disk::STATUS_MAINTENANCE_MODE`][11]
    ///  * [`Disk::STATUS_SPARE_DISK`][12]
    ///  * [`Disk::STATUS_RECONSTRUCT`][13]
    ///  * [`Disk::STATUS_FREE`][14]
    ///
    /// ```rust,no_run
    /// use lsm::{Client, Disk};
    ///
    /// let mut c = Client::new("simc://", None, None).unwrap();
    /// let ds = c.disks().unwrap();
    ///
    /// for d in ds {
    ///     if (d.status & Disk::STATUS_OK) == 0 {
    ///         println!("Disk is not healthy");
    ///     }
    /// }
    /// ```
    /// [1]: #associatedconstant.STATUS_UNKNOWN
    /// [2]: #associatedconstant.STATUS_OK
    /// [3]: #associatedconstant.STATUS_OTHER
    /// [4]: #associatedconstant.STATUS_PREDICTIVE_FAILURE
    /// [5]: #associatedconstant.STATUS_ERROR
    /// [6]: #associatedconstant.STATUS_REMOVED
    /// [7]: #associatedconstant.STATUS_STARTING
    /// [8]: #associatedconstant.STATUS_STOPPING
    /// [9]: #associatedconstant.STATUS_STOPPED
    /// [10]: #associatedconstant.STATUS_INITIALIZING
    /// [11]: #associatedconstant.STATUS_MAINTENANCE_MODE
    /// [12]: #associatedconstant.STATUS_SPARE_DISK
    /// [13]: #associatedconstant.STATUS_RECONSTRUCT
    /// [14]: #associatedconstant.STATUS_FREE
    pub status: u64,
    /// Plugin private data, ignored by the client.
    #[serde(default)]
    pub plugin_data: Option<String>,
    /// Identifier of owner system.
    pub system_id: String,
    /// Disk location in storage topology.
    #[serde(default)]
    pub location: Option<String>,
    /// Disk rotation speed - revolutions per minute(RPM):
    ///
    ///  * `-1` -- Unknown RPM speed.
    ///
    ///  * `0` -- Non-rotating medium (e.g., SSD).
    ///
    ///  * `1` -- Rotational disk with unknown speed.
    ///
    ///  * `> 1` -- Normal rotational disk (e.g., HDD).
    #[serde(default)]
    pub rpm: Option<i32>,
    /// Disk data link type.
    #[serde(default)]
    pub link_type: Option<DiskLinkType>,
    /// SCSI VPD 0x83 NAA type identifier.
    /// Udev treat it as `ID_WWN_WITH_EXTENSION`
    #[serde(default)]
    pub vpd83: Option<String>,
}

int_enum! {
    /// Represent disk type.
    pub enum DiskType: i32, fallback Unknown {
        /// Plugin failed to query disk type.
        Unknown = 0,
        /// Vendor specific disk type.
        Other = 1,
        /// IDE disk.
        Ata = 3,
        /// SATA disk.
        Sata = 4,
        /// SAS disk.
        Sas = 5,
        /// FC disk.
        Fc = 6,
        /// SCSI over PCI-Express.
        Sop = 7,
        /// SCSI disk.
        Scsi = 8,
        /// Remote LUN from SAN array.
        Lun = 9,
        /// Near-Line SAS, just SATA disk + SAS port.
        NlSas = 51,
        /// Normal HDD, fall back value if failed to detect HDD
        /// type(SAS/SATA/etc).
        Hdd = 52,
        /// Solid State Drive.
        Ssd = 53,
        /// Hybrid disk uses a combination of HDD and SSD.
        Hybrid = 54,
    }
}

int_enum! {
    /// Represent disk data link type.
    pub enum DiskLinkType: i32, fallback Unknown {
        /// Plugin does not support querying disk link type.
        NoSupport = -2,
        /// Plugin failed to query disk link type.
        Unknown = -1,
        /// Fibre Channel.
        Fc = 0,
        /// Serial Storage Architecture, Old IBM tech.
        Ssa = 2,
        /// Serial Bus Protocol, used by IEEE 1394.
        Sbp = 3,
        /// SCSI RDMA Protocol.
        Srp = 4,
        /// Internet Small Computer System Interface
        Iscsi = 5,
        /// Serial Attached SCSI.
        Sas = 6,
        /// Automation/Drive Interface Transport. Often used by tape.
        Adt = 7,
        /// PATA/IDE or SATA.
        Ata = 8,
        /// USB
        Usb = 9,
        /// SCSI over PCI-E.
        Sop = 10,
        /// PCI-E, e.g. NVMe.
        PciE = 11,
    }
}

impl Disk {
    pub(crate) const CLASS: &'static str = "Disk";

    /// Plugin failed to query out the status of disk.
    pub const STATUS_UNKNOWN: u64 = 1;
    /// Disk is up and healthy.
    pub const STATUS_OK: u64 = 1 << 1;
    /// Vendor specific status.
    pub const STATUS_OTHER: u64 = 1 << 2;
    /// Disk is still functional but will fail soon.
    pub const STATUS_PREDICTIVE_FAILURE: u64 = 1 << 3;
    /// Error make disk not functional.
    pub const STATUS_ERROR: u64 = 1 << 4;
    /// Disk was removed by administrator.
    pub const STATUS_REMOVED: u64 = 1 << 5;
    /// Disk is starting up.
    pub const STATUS_STARTING: u64 = 1 << 6;
    /// Disk is shutting down.
    pub const STATUS_STOPPING: u64 = 1 << 7;
    /// Disk is stopped by administrator.
    pub const STATUS_STOPPED: u64 = 1 << 8;
    ///  Disk is not functional yet, internal storage system is initializing
    ///  this disk, it could be:
    ///
    ///   * Initialising new disk.
    ///
    ///   * Zeroing disk.
    ///
    ///   * Scrubbing disk data.
    pub const STATUS_INITIALIZING: u64 = 1 << 9;
    /// In maintenance for bad sector scan, integrity check and etc.
    pub const STATUS_MAINTENANCE_MODE: u64 = 1 << 10;
    /// Disk is configured as spare disk.
    pub const STATUS_SPARE_DISK: u64 = 1 << 11;
    /// Disk is reconstructing its data.
    pub const STATUS_RECONSTRUCT: u64 = 1 << 12;
    /// Indicate the whole disk is not holding any data or acting as a dedicate
    /// spare disk. This disk could be assigned as a dedicated spare disk or
    /// used for creating pool.
    pub const STATUS_FREE: u64 = 1 << 13;

    /// Create a disk record. Optional properties(location, rpm, link type and
    /// VPD 0x83) are left empty.
    pub fn new(
        id: &str,
        name: &str,
        disk_type: DiskType,
        block_size: u64,
        num_of_blocks: u64,
        status: u64,
        system_id: &str,
    ) -> Disk {
        Disk {
            class: gen_disk_class_string(),
            id: id.to_string(),
            name: name.to_string(),
            disk_type,
            block_size,
            num_of_blocks,
            status,
            plugin_data: None,
            system_id: system_id.to_string(),
            location: None,
            rpm: None,
            link_type: None,
            vpd83: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileSystem {
    #[serde(default = "gen_fs_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Human friendly name.
    pub name: String,
    /// Total space in bytes.
    pub total_space: u64,
    /// Free space in bytes.
    pub free_space: u64,
    /// Plugin private data, ignored by the client.
    #[serde(default)]
    pub plugin_data: Option<String>,
    /// Identifier of owner system.
    pub system_id: String,
    /// Identifier of owner pool.
    pub pool_id: String,
}

impl FileSystem {
    pub(crate) const CLASS: &'static str = "FileSystem";

    pub fn new(
        id: &str,
        name: &str,
        total_space: u64,
        free_space: u64,
        system_id: &str,
        pool_id: &str,
    ) -> FileSystem {
        FileSystem {
            class: gen_fs_class_string(),
            id: id.to_string(),
            name: name.to_string(),
            total_space,
            free_space,
            plugin_data: None,
            system_id: system_id.to_string(),
            pool_id: pool_id.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileSystemSnapShot {
    #[serde(default = "gen_fs_snap_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Human friendly name.
    pub name: String,
    /// POSIX time(epoch time) on creation.
    pub ts: u64,
    /// Plugin private data, ignored by the client.
    #[serde(default)]
    pub plugin_data: Option<String>,
}

impl FileSystemSnapShot {
    pub(crate) const CLASS: &'static str = "FsSnapshot";

    pub fn new(id: &str, name: &str, ts: u64) -> FileSystemSnapShot {
        FileSystemSnapShot {
            class: gen_fs_snap_class_string(),
            id: id.to_string(),
            name: name.to_string(),
            ts,
            plugin_data: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NfsExport {
    #[serde(default = "gen_exp_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Identifier of file system.
    pub fs_id: String,
    /// NFS export path.
    pub export_path: String,
    /// NFS authentication type.
    pub auth: String,
    /// Host list with root access.
    pub root: Vec<String>,
    /// Host list with read and write access.
    pub rw: Vec<String>,
    /// Host list with read only access.
    pub ro: Vec<String>,
    /// User ID for anonymous access.
    pub anonuid: i64,
    /// Group ID for anonymous access.
    pub anongid: i64,
    /// NFS extra options.
    pub options: String,
    /// Plugin private data, ignored by the client.
    #[serde(default)]
    pub plugin_data: Option<String>,
}

impl NfsExport {
    pub(crate) const CLASS: &'static str = "NfsExport";

    /// Default user and group ID for anonymous access.
    pub const ANON_UID_GID_NA: i64 = -1;

    /// Create an export record with empty host lists.
    pub fn new(id: &str, fs_id: &str, export_path: &str) -> NfsExport {
        NfsExport {
            class: gen_exp_class_string(),
            id: id.to_string(),
            fs_id: fs_id.to_string(),
            export_path: export_path.to_string(),
            auth: String::new(),
            root: Vec::new(),
            rw: Vec::new(),
            ro: Vec::new(),
            anonuid: NfsExport::ANON_UID_GID_NA,
            anongid: NfsExport::ANON_UID_GID_NA,
            options: String::new(),
            plugin_data: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Access group is also known as host group on some storage system, it defines
/// a group of initiators sharing the same access to the volume.
pub struct AccessGroup {
    #[serde(default = "gen_ag_class_string")]
    class: String,
    /// Identifier
    pub id: String,
    /// Human friendly name.
    pub name: String,
    /// Initiator list.
    pub init_ids: Vec<String>,
    /// Initiator type.
    pub init_type: InitiatorType,
    /// Plugin private data, ignored by the client.
    #[serde(default)]
    pub plugin_data: Option<String>,
    pub system_id: String,
}

impl AccessGroup {
    pub(crate) const CLASS: &'static str = "AccessGroup";

    pub fn new(
        id: &str,
        name: &str,
        init_ids: Vec<String>,
        init_type: InitiatorType,
        system_id: &str,
    ) -> AccessGroup {
        AccessGroup {
            class: gen_ag_class_string(),
            id: id.to_string(),
            name: name.to_string(),
            init_ids,
            init_type,
            plugin_data: None,
            system_id: system_id.to_string(),
        }
    }
}

int_enum! {
    pub enum InitiatorType: i32, fallback Unknown {
        /// Plugin failed to query initiator type.
        Unknown = 0,
        /// Vendor specific initiator type.
        Other = 1,
        /// FC or FCoE WWPN
        Wwpn = 2,
        /// iSCSI IQN
        IscsiIqn = 5,
        /// This access group contains more 1 type of initiator.
        Mixed = 7,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Represent a target port which is the front-end port of storage system which
/// storage user/client connect to and get storage service from.
pub struct TargetPort {
    #[serde(default = "gen_tgt_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Type of port.
    pub port_type: PortType,
    /// The address used by upper layer like FC and iSCSI:
    ///
    ///  * FC and FCoE:    WWPN
    ///
    ///  * iSCSI:          IQN
    /// The string is in lower case, split with `:` every two digits if WWPN.
    pub service_address: String,
    /// The address used by network layer like FC and TCP/IP:
    ///
    ///  * FC/FCoE:        WWPN
    ///
    ///  * iSCSI:          `IPv4:Port` or `[IPv6]:Port`
    /// The string is in lower case, split with `:` every two digits if WWPN.
    pub network_address: String,
    /// The address used by physical layer like FC-0 and MAC:
    ///
    ///  * FC and FCoE :   WWPN
    ///
    ///  * iSCSI:          MAC
    /// The string is in Lower case, split with `:` every two digits.
    pub physical_address: String,
    /// The name of physical port. Administrator could use this name to locate
    /// the port on storage system. E.g. 'eth0'
    pub physical_name: String,
    /// Plugin private data, ignored by the client.
    #[serde(default)]
    pub plugin_data: Option<String>,
    /// Identifier of owner system.
    pub system_id: String,
}

impl TargetPort {
    pub(crate) const CLASS: &'static str = "TargetPort";

    pub fn new(
        id: &str,
        port_type: PortType,
        service_address: &str,
        network_address: &str,
        physical_address: &str,
        physical_name: &str,
        system_id: &str,
    ) -> TargetPort {
        TargetPort {
            class: gen_tgt_class_string(),
            id: id.to_string(),
            port_type,
            service_address: service_address.to_string(),
            network_address: network_address.to_string(),
            physical_address: physical_address.to_string(),
            physical_name: physical_name.to_string(),
            plugin_data: None,
            system_id: system_id.to_string(),
        }
    }
}

int_enum! {
    pub enum PortType: i32, fallback Other {
        /// Vendor specific initiator type.
        Other = 1,
        /// FC port
        Fc = 2,
        /// FCoE port
        FCoE = 3,
        /// iSCSI port
        Iscsi = 4,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Represent a battery.
pub struct Battery {
    #[serde(default = "gen_bat_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Human friendly name.
    pub name: String,
    #[serde(rename = "type")]
    /// Battery type.
    pub battery_type: BatteryType,
    /// Battery status stored in bitmap. Valid status value are:
    ///
    ///  * [`Battery::STATUS_UNKNOWN`][1]
    ///  * [`Battery::STATUS_OTHER`][2]
    ///  * [`Battery::STATUS_OK`][3]
    ///  * [`Battery::STATUS_DISCHARGING`][4]
    ///  * [`Battery::STATUS_CHARGING`][5]
    ///  * [`Battery::STATUS_LEARNING`][6]
    ///  * [`Battery::STATUS_DEGRADED`][7]
    ///  * [`Battery::STATUS_ERROR`][8]
    ///
    /// [1]: #associatedconstant.STATUS_UNKNOWN
    /// [2]: #associatedconstant.STATUS_OTHER
    /// [3]: #associatedconstant.STATUS_OK
    /// [4]: #associatedconstant.STATUS_DISCHARGING
    /// [5]: #associatedconstant.STATUS_CHARGING
    /// [6]: #associatedconstant.STATUS_LEARNING
    /// [7]: #associatedconstant.STATUS_DEGRADED
    /// [8]: #associatedconstant.STATUS_ERROR
    pub status: u64,
    /// Plugin private data, ignored by the client.
    #[serde(default)]
    pub plugin_data: Option<String>,
    /// Identifier of owner system.
    pub system_id: String,
}

impl Battery {
    pub(crate) const CLASS: &'static str = "Battery";

    /// Plugin failed to query battery status.
    pub const STATUS_UNKNOWN: u64 = 1;
    /// Vendor specific status.
    pub const STATUS_OTHER: u64 = 1 << 1;
    /// Battery is healthy and charged.
    pub const STATUS_OK: u64 = 1 << 2;
    /// Battery is disconnected from power source and discharging.
    pub const STATUS_DISCHARGING: u64 = 1 << 3;
    /// Battery is not fully charged and charging.
    pub const STATUS_CHARGING: u64 = 1 << 4;
    /// System is trying to discharge and recharge the battery to learn its
    /// capability.
    pub const STATUS_LEARNING: u64 = 1 << 5;
    /// Battery is degraded and should be checked or replaced.
    pub const STATUS_DEGRADED: u64 = 1 << 6;
    /// Battery is dead and should be replaced.
    pub const STATUS_ERROR: u64 = 1 << 7;

    pub fn new(
        id: &str,
        name: &str,
        battery_type: BatteryType,
        status: u64,
        system_id: &str,
    ) -> Battery {
        Battery {
            class: gen_bat_class_string(),
            id: id.to_string(),
            name: name.to_string(),
            battery_type,
            status,
            plugin_data: None,
            system_id: system_id.to_string(),
        }
    }
}

int_enum! {
    pub enum BatteryType: i32, fallback Unknown {
        /// Plugin failed to detect battery type.
        Unknown = 1,
        /// Vendor specific battery type.
        Other = 2,
        /// Chemical battery, e.g. Li-ion battery.
        Chemical = 3,
        /// Super capacitor.
        Capacitor = 4,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Represent a block range used by
/// [`Client::volume_replicate_range()`](struct.Client.html#method.volume_replicate_range).
pub struct BlockRange {
    #[serde(default = "gen_blk_range_class_string")]
    class: String,
    /// Starting block address on source volume.
    #[serde(rename = "src_block")]
    pub src_blk_addr: u64,
    /// Starting block address on destination volume.
    #[serde(rename = "dest_block")]
    pub dst_blk_addr: u64,
    /// Count of blocks to copy.
    #[serde(rename = "block_count")]
    pub blk_count: u64,
}

impl BlockRange {
    pub(crate) const CLASS: &'static str = "BlockRange";

    /// Create a block range.
    pub fn new(
        src_blk_addr: u64,
        dst_blk_addr: u64,
        blk_count: u64,
    ) -> BlockRange {
        BlockRange {
            class: gen_blk_range_class_string(),
            src_blk_addr,
            dst_blk_addr,
            blk_count,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Copy)]
/// Represent a volume cache policy.
pub enum CachePolicy {
    /// Cache is enabled.
    Enabled,
    /// Storage system will determin whethere to use cache based on
    /// battery/capacitor health.
    Auto, // Only for write cache
    /// Cache is disabeld.
    Disabled,
    /// Plugin failed to query cache setting.
    Unknown,
    /// Physical disk cache is determined by the disk vendor via physical
    /// disks' SCSI caching mode page(`0x08` page).
    UseDiskSetting, // Only for physical disk cache
}

const WRITE_CACHE_POLICY_UNKNOWN: u8 = 1;
const WRITE_CACHE_POLICY_WRITE_BACK: u8 = 2;
const WRITE_CACHE_POLICY_AUTO: u8 = 3;
const WRITE_CACHE_POLICY_WRITE_THROUGH: u8 = 4;

const WRITE_CACHE_STATUS_UNKNOWN: u8 = 1;
const WRITE_CACHE_STATUS_WRITE_BACK: u8 = 2;
const WRITE_CACHE_STATUS_WRITE_THROUGH: u8 = 3;

const READ_CACHE_POLICY_UNKNOWN: u8 = 1;
const READ_CACHE_POLICY_ENABLED: u8 = 2;
const READ_CACHE_POLICY_DISABLED: u8 = 3;

const READ_CACHE_STATUS_UNKNOWN: u8 = 1;
const READ_CACHE_STATUS_ENABLED: u8 = 2;
const READ_CACHE_STATUS_DISABLED: u8 = 3;

const PHYSICAL_DISK_CACHE_UNKNOWN: u8 = 1;
const PHYSICAL_DISK_CACHE_ENABLED: u8 = 2;
const PHYSICAL_DISK_CACHE_DISABLED: u8 = 3;
const PHYSICAL_DISK_CACHE_USE_DISK_SETTING: u8 = 4;

impl CachePolicy {
    pub(crate) fn write_policy_to_int(self) -> Option<u8> {
        match self {
            CachePolicy::Enabled => Some(WRITE_CACHE_POLICY_WRITE_BACK),
            CachePolicy::Disabled => Some(WRITE_CACHE_POLICY_WRITE_THROUGH),
            CachePolicy::Auto => Some(WRITE_CACHE_POLICY_AUTO),
            _ => None,
        }
    }

    pub(crate) fn write_policy_from_int(i: u8) -> CachePolicy {
        match i {
            WRITE_CACHE_POLICY_WRITE_BACK => CachePolicy::Enabled,
            WRITE_CACHE_POLICY_WRITE_THROUGH => CachePolicy::Disabled,
            WRITE_CACHE_POLICY_AUTO => CachePolicy::Auto,
            _ => CachePolicy::Unknown,
        }
    }

    pub(crate) fn read_policy_to_int(self) -> Option<u8> {
        match self {
            CachePolicy::Enabled => Some(READ_CACHE_POLICY_ENABLED),
            CachePolicy::Disabled => Some(READ_CACHE_POLICY_DISABLED),
            _ => None,
        }
    }

    pub(crate) fn read_policy_from_int(i: u8) -> CachePolicy {
        match i {
            READ_CACHE_POLICY_ENABLED => CachePolicy::Enabled,
            READ_CACHE_POLICY_DISABLED => CachePolicy::Disabled,
            _ => CachePolicy::Unknown,
        }
    }

    pub(crate) fn phy_disk_policy_to_int(self) -> Option<u8> {
        match self {
            CachePolicy::Enabled => Some(PHYSICAL_DISK_CACHE_ENABLED),
            CachePolicy::Disabled => Some(PHYSICAL_DISK_CACHE_DISABLED),
            CachePolicy::UseDiskSetting => {
                Some(PHYSICAL_DISK_CACHE_USE_DISK_SETTING)
            }
            _ => None,
        }
    }

    pub(crate) fn phy_disk_policy_from_int(i: u8) -> CachePolicy {
        match i {
            PHYSICAL_DISK_CACHE_ENABLED => CachePolicy::Enabled,
            PHYSICAL_DISK_CACHE_DISABLED => CachePolicy::Disabled,
            PHYSICAL_DISK_CACHE_USE_DISK_SETTING => CachePolicy::UseDiskSetting,
            _ => CachePolicy::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Represent volume cache informtion.
pub struct VolumeCacheInfo {
    /// Write cache setting.
    pub write_cache_setting: CachePolicy,
    /// Write cache status.
    pub write_cache_status: CachePolicy,
    /// Read cache setting.
    pub read_cache_setting: CachePolicy,
    /// Read cache status
    pub read_cache_status: CachePolicy,
    /// Physcial disk cache status.
    pub physical_disk_cache_status: CachePolicy,
}

impl VolumeCacheInfo {
    pub(crate) fn to_value(&self) -> Value {
        let write_status = match self.write_cache_status {
            CachePolicy::Enabled => WRITE_CACHE_STATUS_WRITE_BACK,
            CachePolicy::Disabled => WRITE_CACHE_STATUS_WRITE_THROUGH,
            _ => WRITE_CACHE_STATUS_UNKNOWN,
        };
        let read_status = match self.read_cache_status {
            CachePolicy::Enabled => READ_CACHE_STATUS_ENABLED,
            CachePolicy::Disabled => READ_CACHE_STATUS_DISABLED,
            _ => READ_CACHE_STATUS_UNKNOWN,
        };
        json!([
            self.write_cache_setting
                .write_policy_to_int()
                .unwrap_or(WRITE_CACHE_POLICY_UNKNOWN),
            write_status,
            self.read_cache_setting
                .read_policy_to_int()
                .unwrap_or(READ_CACHE_POLICY_UNKNOWN),
            read_status,
            self.physical_disk_cache_status
                .phy_disk_policy_to_int()
                .unwrap_or(PHYSICAL_DISK_CACHE_UNKNOWN),
        ])
    }

    pub(crate) fn from_value(val: &Value) -> Result<VolumeCacheInfo> {
        let ret: Vec<u8> = serde_json::from_value(val.clone())?;
        if ret.len() != 5 {
            return Err(LsmError::PluginBug(format!(
                "vol_cache_info() is expecting 5 u8 from plugin, \
                 but got '{:?}'",
                ret
            )));
        }
        Ok(VolumeCacheInfo {
            write_cache_setting: CachePolicy::write_policy_from_int(ret[0]),
            write_cache_status: match ret[1] {
                WRITE_CACHE_STATUS_WRITE_BACK => CachePolicy::Enabled,
                WRITE_CACHE_STATUS_WRITE_THROUGH => CachePolicy::Disabled,
                _ => CachePolicy::Unknown,
            },
            read_cache_setting: CachePolicy::read_policy_from_int(ret[2]),
            read_cache_status: match ret[3] {
                READ_CACHE_STATUS_ENABLED => CachePolicy::Enabled,
                READ_CACHE_STATUS_DISABLED => CachePolicy::Disabled,
                _ => CachePolicy::Unknown,
            },
            physical_disk_cache_status: CachePolicy::phy_disk_policy_from_int(
                ret[4],
            ),
        })
    }
}

#[derive(Debug, Clone)]
/// Represent NFS access control information.
pub struct NfsAccess<'a> {
    /// List of hosts with root access.
    pub root_list: &'a [&'a str],
    /// List of hosts with read and write access.
    pub rw_list: &'a [&'a str],
    /// List of hosts with read only access.
    pub ro_list: &'a [&'a str],
    /// UID to map to anonymous
    pub anon_uid: Option<i64>,
    /// GID to map to anonymous
    pub anon_gid: Option<i64>,
}

/// For argument `thinp` of
/// [`Client::volume_create()`](struct.Client.html#method.volume_create).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeCreateArgThinP {
    /// Create fully allocationed volume.
    Full,
    /// Create thin provisioning volume.
    Thin,
    /// Let storage array to decide the volume provisioning type.
    Default,
}

const VOLUME_THINP_YES: u32 = 1;
const VOLUME_THINP_NO: u32 = 2;
const VOLUME_THINP_DEFAULT: u32 = 3;

impl VolumeCreateArgThinP {
    pub(crate) fn to_int(self) -> u32 {
        match self {
            VolumeCreateArgThinP::Thin => VOLUME_THINP_YES,
            VolumeCreateArgThinP::Full => VOLUME_THINP_NO,
            VolumeCreateArgThinP::Default => VOLUME_THINP_DEFAULT,
        }
    }

    pub(crate) fn from_int(i: u32) -> Option<VolumeCreateArgThinP> {
        match i {
            VOLUME_THINP_YES => Some(VolumeCreateArgThinP::Thin),
            VOLUME_THINP_NO => Some(VolumeCreateArgThinP::Full),
            VOLUME_THINP_DEFAULT => Some(VolumeCreateArgThinP::Default),
            _ => None,
        }
    }
}

/// Discriminator of [`Record`](enum.Record.html), also the type tag of job
/// result.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    None,
    AccessGroup,
    BlockRange,
    FileSystem,
    NfsExport,
    Pool,
    FsSnapshot,
    StringList,
    System,
    Volume,
    Disk,
    TargetPort,
    Battery,
    Capabilities,
}

impl DataType {
    /// The `class` tag used on the wire, `None` for types without one.
    pub fn class_name(self) -> Option<&'static str> {
        match self {
            DataType::AccessGroup => Some(AccessGroup::CLASS),
            DataType::BlockRange => Some(BlockRange::CLASS),
            DataType::FileSystem => Some(FileSystem::CLASS),
            DataType::NfsExport => Some(NfsExport::CLASS),
            DataType::Pool => Some(Pool::CLASS),
            DataType::FsSnapshot => Some(FileSystemSnapShot::CLASS),
            DataType::System => Some(System::CLASS),
            DataType::Volume => Some(Volume::CLASS),
            DataType::Disk => Some(Disk::CLASS),
            DataType::TargetPort => Some(TargetPort::CLASS),
            DataType::Battery => Some(Battery::CLASS),
            DataType::Capabilities => Some(Capabilities::CLASS),
            DataType::None | DataType::StringList => None,
        }
    }

    fn from_class(class: &str) -> Option<DataType> {
        [
            DataType::AccessGroup,
            DataType::BlockRange,
            DataType::FileSystem,
            DataType::NfsExport,
            DataType::Pool,
            DataType::FsSnapshot,
            DataType::System,
            DataType::Volume,
            DataType::Disk,
            DataType::TargetPort,
            DataType::Battery,
            DataType::Capabilities,
        ]
        .iter()
        .find(|t| t.class_name() == Some(class))
        .cloned()
    }
}

/// Generic record, used where the concrete type is only known through a
/// [`DataType`](enum.DataType.html) tag, e.g. job result.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    AccessGroup(AccessGroup),
    BlockRange(BlockRange),
    FileSystem(FileSystem),
    NfsExport(NfsExport),
    Pool(Pool),
    FsSnapshot(FileSystemSnapShot),
    StringList(Vec<String>),
    System(System),
    Volume(Volume),
    Disk(Disk),
    TargetPort(TargetPort),
    Battery(Battery),
    Capabilities(Capabilities),
}

impl Record {
    pub fn data_type(&self) -> DataType {
        match self {
            Record::AccessGroup(_) => DataType::AccessGroup,
            Record::BlockRange(_) => DataType::BlockRange,
            Record::FileSystem(_) => DataType::FileSystem,
            Record::NfsExport(_) => DataType::NfsExport,
            Record::Pool(_) => DataType::Pool,
            Record::FsSnapshot(_) => DataType::FsSnapshot,
            Record::StringList(_) => DataType::StringList,
            Record::System(_) => DataType::System,
            Record::Volume(_) => DataType::Volume,
            Record::Disk(_) => DataType::Disk,
            Record::TargetPort(_) => DataType::TargetPort,
            Record::Battery(_) => DataType::Battery,
            Record::Capabilities(_) => DataType::Capabilities,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(match self {
            Record::AccessGroup(r) => serde_json::to_value(r)?,
            Record::BlockRange(r) => serde_json::to_value(r)?,
            Record::FileSystem(r) => serde_json::to_value(r)?,
            Record::NfsExport(r) => serde_json::to_value(r)?,
            Record::Pool(r) => serde_json::to_value(r)?,
            Record::FsSnapshot(r) => serde_json::to_value(r)?,
            Record::StringList(r) => serde_json::to_value(r)?,
            Record::System(r) => serde_json::to_value(r)?,
            Record::Volume(r) => serde_json::to_value(r)?,
            Record::Disk(r) => serde_json::to_value(r)?,
            Record::TargetPort(r) => serde_json::to_value(r)?,
            Record::Battery(r) => serde_json::to_value(r)?,
            Record::Capabilities(r) => serde_json::to_value(r)?,
        })
    }

    /// Decode `val` as record of type `expected`. The `class` tag of `val`
    /// must match, otherwise [`LsmError::PluginBug`][1] is returned.
    ///
    /// [1]: enum.LsmError.html#variant.PluginBug
    pub fn from_value(
        val: Value,
        expected: DataType,
    ) -> Result<Option<Record>> {
        if expected == DataType::None {
            return match val {
                Value::Null => Ok(None),
                _ => Err(LsmError::PluginBug(format!(
                    "Expecting no data, but got {:?}",
                    val
                ))),
            };
        }
        if val.is_null() {
            return Err(LsmError::PluginBug(format!(
                "Expecting {:?}, but got null",
                expected
            )));
        }
        if let Some(class) = expected.class_name() {
            let got = val.get("class").and_then(Value::as_str).unwrap_or("");
            if got != class {
                return Err(LsmError::PluginBug(format!(
                    "Expecting {} record, but got '{}'",
                    class, got
                )));
            }
        }
        Ok(Some(match expected {
            DataType::AccessGroup => {
                Record::AccessGroup(serde_json::from_value(val)?)
            }
            DataType::BlockRange => {
                Record::BlockRange(serde_json::from_value(val)?)
            }
            DataType::FileSystem => {
                Record::FileSystem(serde_json::from_value(val)?)
            }
            DataType::NfsExport => Record::NfsExport(serde_json::from_value(val)?),
            DataType::Pool => Record::Pool(serde_json::from_value(val)?),
            DataType::FsSnapshot => {
                Record::FsSnapshot(serde_json::from_value(val)?)
            }
            DataType::StringList => {
                Record::StringList(serde_json::from_value(val)?)
            }
            DataType::System => Record::System(serde_json::from_value(val)?),
            DataType::Volume => Record::Volume(serde_json::from_value(val)?),
            DataType::Disk => Record::Disk(serde_json::from_value(val)?),
            DataType::TargetPort => {
                Record::TargetPort(serde_json::from_value(val)?)
            }
            DataType::Battery => Record::Battery(serde_json::from_value(val)?),
            DataType::Capabilities => {
                Record::Capabilities(serde_json::from_value(val)?)
            }
            DataType::None => return Ok(None),
        }))
    }

    /// Decode `val` using its own `class` tag. JSON array is treated as
    /// string list, `null` as no data.
    pub fn from_tagged_value(val: Value) -> Result<Option<Record>> {
        let data_type = match val {
            Value::Null => DataType::None,
            Value::Array(_) => DataType::StringList,
            _ => {
                let class = val.get("class").and_then(Value::as_str);
                class.and_then(DataType::from_class).ok_or_else(|| {
                    LsmError::PluginBug(format!(
                        "Got record with unknown class: {:?}",
                        val
                    ))
                })?
            }
        };
        Record::from_value(val, data_type)
    }
}

/// Record which could be filtered by `search_key` and `search_value` in list
/// methods like [`Client::volumes_search()`][1].
///
/// [1]: struct.Client.html#method.volumes_search
pub trait Searchable {
    /// Supported search keys.
    const SEARCH_KEYS: &'static [&'static str];

    /// Value of the property named by `key`, `None` if not searchable.
    fn search_field(&self, key: &str) -> Option<&str>;
}

macro_rules! impl_searchable {
    ($name:ident, [$($key:ident),+]) => {
        impl Searchable for $name {
            const SEARCH_KEYS: &'static [&'static str] =
                &[$(stringify!($key)),+];

            fn search_field(&self, key: &str) -> Option<&str> {
                match key {
                    $(stringify!($key) => Some(self.$key.as_str()),)+
                    _ => None,
                }
            }
        }
    };
}

impl_searchable!(Pool, [id, system_id]);
impl_searchable!(Volume, [id, system_id, pool_id]);
impl_searchable!(Disk, [id, system_id]);
impl_searchable!(AccessGroup, [id, system_id]);
impl_searchable!(FileSystem, [id, system_id, pool_id]);
impl_searchable!(NfsExport, [id, fs_id]);
impl_searchable!(TargetPort, [id, system_id]);
impl_searchable!(Battery, [id, system_id]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_wire_format() {
        let raw = r#"{"class": "Volume", "id": "VOL_ID_00001",
                      "name": "vol1", "admin_state": 1, "block_size": 512,
                      "num_of_blocks": 2048, "vpd83": "600508b1",
                      "system_id": "sim-01", "pool_id": "POOL_ID_00001",
                      "plugin_data": null}"#;
        let vol: Volume = serde_json::from_str(raw).unwrap();
        assert!(vol.enabled);
        assert_eq!(1048576, vol.size_bytes());

        let val = serde_json::to_value(&vol).unwrap();
        assert_eq!("Volume", val["class"]);
        assert_eq!(1, val["admin_state"]);
    }

    #[test]
    fn unknown_enum_value_falls_back() {
        let t: DiskType = serde_json::from_str("42").unwrap();
        assert_eq!(DiskType::Unknown, t);
        let t: PortType = serde_json::from_str("99").unwrap();
        assert_eq!(PortType::Other, t);
        assert_eq!(RaidType::Raid60, RaidType::from(60));
        assert_eq!(RaidType::Unknown, RaidType::from(2));
        assert_eq!("-2", serde_json::to_string(&SystemMode::Unknown).unwrap());
    }

    #[test]
    fn record_tag_must_match() {
        let vol = Volume::new("VOL_ID_00001", "v", 512, 1, "sim-01", "P");
        let val = serde_json::to_value(&vol).unwrap();

        match Record::from_value(val.clone(), DataType::Volume).unwrap() {
            Some(Record::Volume(v)) => assert_eq!(vol, v),
            r => panic!("unexpected record {:?}", r),
        }
        match Record::from_value(val.clone(), DataType::Pool) {
            Err(LsmError::PluginBug(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        match Record::from_value(val, DataType::None) {
            Err(LsmError::PluginBug(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        assert_eq!(None, Record::from_value(Value::Null, DataType::None).unwrap());
        assert!(Record::from_value(Value::Null, DataType::FileSystem).is_err());
    }

    #[test]
    fn snapshot_class_tag() {
        let snap = FileSystemSnapShot::new("FS_SNAP_ID_00001", "snap", 1);
        let rec = Record::FsSnapshot(snap);
        let val = rec.to_value().unwrap();
        assert_eq!("FsSnapshot", val["class"]);
        assert_eq!(DataType::FsSnapshot, rec.data_type());
    }

    #[test]
    fn search_fields() {
        let vol = Volume::new("VOL_ID_00001", "v", 512, 1, "sim-01", "P1");
        assert_eq!(Some("P1"), vol.search_field("pool_id"));
        assert_eq!(None, vol.search_field("name"));
        assert_eq!(&["id", "fs_id"], NfsExport::SEARCH_KEYS);
    }

    #[test]
    fn cache_info_wire_layout() {
        let info = VolumeCacheInfo {
            write_cache_setting: CachePolicy::Auto,
            write_cache_status: CachePolicy::Enabled,
            read_cache_setting: CachePolicy::Enabled,
            read_cache_status: CachePolicy::Disabled,
            physical_disk_cache_status: CachePolicy::UseDiskSetting,
        };
        let val = info.to_value();
        assert_eq!(json!([3, 2, 2, 3, 4]), val);
        assert_eq!(info, VolumeCacheInfo::from_value(&val).unwrap());
    }

    #[test]
    fn thinp_wire_values() {
        assert_eq!(1, VolumeCreateArgThinP::Thin.to_int());
        assert_eq!(2, VolumeCreateArgThinP::Full.to_int());
        assert_eq!(None, VolumeCreateArgThinP::from_int(0));
    }
}
