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

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serializer};
use std::fmt::Write;

const CAP_MAX: usize = 512;
const CAP_SUPPORTED: u8 = 1;
const CAP_UNSUPPORTED: u8 = 0;

fn gen_cap_class_string() -> String {
    Capabilities::CLASS.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Represent capabilities supported by specific system.
pub struct Capabilities {
    #[serde(default = "gen_cap_class_string")]
    class: String,
    #[serde(deserialize_with = "hex_to_caps")]
    #[serde(serialize_with = "caps_to_hex")]
    cap: Vec<u8>,
}

// Two hex digits per capability, indexed by capability ID.
fn hex_to_caps<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<Vec<u8>, D::Error> {
    let s: String = Deserialize::deserialize(deserializer)?;
    if s.len() % 2 != 0 || !s.is_ascii() {
        return Err(D::Error::custom(format!(
            "Invalid capability string: '{}'",
            s
        )));
    }
    let mut caps = Vec::with_capacity(s.len() / 2);
    for i in (0..s.len()).step_by(2) {
        let v = u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| {
            D::Error::custom(format!("Invalid capability string: {}", e))
        })?;
        caps.push(v);
    }
    Ok(caps)
}

fn caps_to_hex<S: Serializer>(
    caps: &[u8],
    serializer: S,
) -> ::std::result::Result<S::Ok, S::Error> {
    let mut s = String::with_capacity(caps.len() * 2);
    for c in caps {
        // Writing into String never fails.
        let _ = write!(s, "{:02x}", c);
    }
    serializer.serialize_str(&s)
}

#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Represent a capability supported by specific system.
///
/// The integer values are shared with every LibStorageMgmt implementation.
/// New capabilities are only appended.
pub enum Capability {
    /// Support `Client::volumes()`.
    Volumes = 20,
    /// Support `Client::volume_create()`.
    VolumeCreate = 21,
    /// Support `Client::volume_resize()`.
    VolumeResize = 22,
    /// Support `Client::volume_replicate()`.
    VolumeReplicate = 23,
    /// Support `Client::volume_replicate()` with
    /// `VolumeReplicateType::Clone`.
    VolumeReplicateClone = 24,
    /// Support `Client::volume_replicate()` with
    /// `VolumeReplicateType::Copy`.
    VolumeReplicateCopy = 25,
    /// Support `Client::volume_replicate()` with
    /// `VolumeReplicateType::MirrorAsync`.
    VolumeReplicateMirrorAsync = 26,
    /// Support `Client::volume_replicate()` with
    /// `VolumeReplicateType::MirrorSync`.
    VolumeReplicateMirrorSync = 27,
    /// Support `Client::volume_rep_range_blk_size()`.
    VolumeRepRangeBlockSize = 28,
    /// Support `Client::volume_replicate_range()`.
    VolumeRepRange = 29,
    /// Support `Client::volume_replicate_range()` with
    /// `VolumeReplicateType::Clone`.
    VolumeRepRangeClone = 30,
    /// Support `Client::volume_replicate_range()` with
    /// `VolumeReplicateType::Copy`.
    VolumeRepRangeCopy = 31,
    /// Support `Client::volume_delete()`.
    VolumeDelete = 33,
    /// Support `Client::volume_enable()`.
    VolumeEnable = 34,
    /// Support `Client::volume_disable()`.
    VolumeDisable = 35,
    /// Support `Client::volume_mask()`.
    VolumeMask = 36,
    /// Support `Client::volume_unmask()`.
    VolumeUnmask = 37,
    /// Support `Client::access_groups()`.
    AccessGroups = 38,
    /// Support `Client::access_group_create()` with `InitiatorType::Wwpn`.
    AccessGroupCreateWwpn = 39,
    /// Support `Client::access_group_delete()`.
    AccessGroupDelete = 40,
    /// Support `Client::access_group_init_add()` with `InitiatorType::Wwpn`.
    AccessGroupInitAddWwpn = 41,
    /// Support `Client::access_group_init_del()`.
    AccessGroupInitDel = 42,
    /// Support `Client::vols_masked_to_ag()`.
    VolsMaskedToAg = 43,
    /// Support `Client::ags_granted_to_vol()`.
    AgsGrantedToVol = 44,
    /// Support `Client::vol_has_child_dep()`.
    VolHasChildDep = 45,
    /// Support `Client::vol_child_dep_rm()`.
    VolChildDepRm = 46,
    /// Support `Client::access_group_create()` with `InitiatorType::IscsiIqn`.
    AccessGroupCreateIscsiIqn = 47,
    /// Support `Client::access_group_init_add()` with
    /// `InitiatorType::IscsiIqn`.
    AccessGroupInitAddIscsiIqn = 48,
    /// Support `Client::iscsi_chap_auth_set()`.
    IscsiChapAuthSet = 53,
    /// Support `Client::vol_raid_info()`.
    VolRaidInfo = 54,
    /// Support `Client::volume_create()` with
    /// `thinp=VolumeCreateArgThinP::Thin` argument.
    VolumeThin = 55,
    /// Support `Client::batteries()`.
    Batteries = 56,
    /// Support `Client::vol_cache_info()`.
    VolCacheInfo = 57,
    /// Support `Client::vol_phy_disk_cache_set().`
    VolPhyDiskCacheSet = 58,
    /// Indicate the `Client::vol_phy_disk_cache_set()` will change system
    /// settings which are effective on all volumes in this storage system.
    VolPhysicalDiskCacheSetSystemLevel = 59,
    /// Support `Client::vol_write_cache_set()` with
    /// `wcp=CachePolicy::Enabled`.
    VolWriteCacheSetEnable = 60,
    /// Support `Client::vol_write_cache_set()` with
    /// `wcp=CachePolicy::Auto`.
    VolWriteCacheSetAuto = 61,
    /// Support `Client::vol_write_cache_set()` with
    /// `wcp=CachePolicy::Disabled`.
    VolWriteCacheSetDisabled = 62,
    /// Indicate the `Client::vol_write_cache_set()` might also impact read
    /// cache policy.
    VolWriteCacheSetImpactRead = 63,
    /// Indicate the `Client::vol_write_cache_set()` with
    /// `wcp=CachePolicy::Enabled` might impact other volumes in the same
    /// system.
    VolWriteCacheSetWbImpactOther = 64,
    /// Support `Client::vol_read_cache_set()`.
    VolReadCacheSet = 65,
    /// Indicate the `Client::vol_read_cache_set()` might also impact write
    /// cache policy.
    VolReadCacheSetImpactWrite = 66,
    /// Support `Client::fs()`.
    Fs = 100,
    /// Support `Client::fs_delete()`.
    FsDelete = 101,
    /// Support `Client::fs_resize()`.
    FsResize = 102,
    /// Support `Client::fs_create()`.
    FsCreate = 103,
    /// Support `Client::fs_clone()`.
    FsClone = 104,
    /// Support `Client::fs_file_clone()`.
    FsFileClone = 105,
    /// Support `Client::fs_snapshots()`.
    FsSnapshots = 106,
    /// Support `Client::fs_snapshot_create()`.
    FsSnapshotCreate = 107,
    /// Support `Client::fs_snapshot_delete()`.
    FsSnapshotDelete = 109,
    /// Support `Client::fs_snapshot_restore()`.
    FsSnapshotRestore = 110,
    /// Support `Client::fs_snapshot_restore()` with `files` arugment.
    FsSnapshotRestoreSpecificFiles = 111,
    /// Support `Client::fs_has_child_dep()`.
    FsHasChildDep = 112,
    /// Support `Client::fs_child_dep_rm()`.
    FsChildDepRm = 113,
    /// Support `Client::fs_child_dep_rm()` with `files` argument.
    FsChildDepRmSpecificFiles = 114,
    /// Support `Client:::nfs_exp_auth_type_list()`.
    NfsExportAuthTypeList = 120,
    /// Support `Client::nfs_exports()`.
    NfsExports = 121,
    /// Support `Client::fs_export()`.
    FsExport = 122,
    /// Support `Client::fs_unexport()`.
    FsUnexport = 123,
    /// Support `Client::fs_export()` with `export_path` argument.
    FsExportCustomPath = 124,
    /// Support `Client::sys_read_cache_pct_set()`
    SysReadCachePctSet = 158,
    /// Support `Client::systems()` with valid `read_cache_pct` property.
    SysReadCachePctGet = 159,
    /// Support `Client::systems()` with valid `fw_version` property.
    SysFwVersionGet = 160,
    /// Support `Client::systems()` with valid `mode` property.
    SysModeGet = 161,
    /// Support `Client::disks()` with valid `location` property.
    DiskLocation = 163,
    /// Support `Client::disks()` with valid `rpm` property.
    DiskRpm = 164,
    /// Support `Client::disks()` with valid `link_type` property.
    DiskLinkType = 165,
    /// Support `Client::vol_ident_led_on()` and `Client::vol_ident_led_off()`.
    VolumeLed = 171,
    /// Plugin filters `Client::pools_search()` natively.
    PoolsQuickSearch = 210,
    /// Plugin filters `Client::volumes_search()` natively.
    VolumesQuickSearch = 211,
    /// Plugin filters `Client::disks_search()` natively.
    DisksQuickSearch = 212,
    /// Plugin filters `Client::access_groups_search()` natively.
    AccessGroupsQuickSearch = 213,
    /// Plugin filters `Client::fs_search()` natively.
    FsQuickSearch = 214,
    /// Plugin filters `Client::nfs_exports_search()` natively.
    NfsExportsQuickSearch = 215,
    /// Support `Client::target_ports()`.
    TargetPorts = 216,
    /// Plugin filters `Client::target_ports_search()` natively.
    TargetPortsQuickSearch = 217,
    /// Support `Client::disks()`.
    Disks = 220,
    /// Support `Client::pool_member_info()`.
    PoolMemberInfo = 221,
    /// Support `Client::vol_raid_create_cap_get()` and
    /// `Client::vol_raid_create()`.
    VolumeRaidCreate = 222,
    /// Support `Client::disks()` with valid `vpd83` property.
    DiskVpd83Get = 223,
}

impl Capabilities {
    pub(crate) const CLASS: &'static str = "Capabilities";

    /// Create a capability set with every capability unsupported.
    pub fn new() -> Capabilities {
        Capabilities {
            class: gen_cap_class_string(),
            cap: vec![CAP_UNSUPPORTED; CAP_MAX],
        }
    }

    /// Mark capability as supported.
    pub fn set(&mut self, cap: Capability) {
        self.set_value(cap, CAP_SUPPORTED);
    }

    /// Mark capability as unsupported.
    pub fn unset(&mut self, cap: Capability) {
        self.set_value(cap, CAP_UNSUPPORTED);
    }

    /// Mark all listed capabilities as supported.
    pub fn set_all(&mut self, caps: &[Capability]) {
        for cap in caps {
            self.set(*cap);
        }
    }

    fn set_value(&mut self, cap: Capability, value: u8) {
        let index = cap as usize;
        if index >= self.cap.len() {
            self.cap.resize(index + 1, CAP_UNSUPPORTED);
        }
        self.cap[index] = value;
    }

    /// Check wether certain [`Capability`][1] is supported or not.
    /// Capability unknown to plugin is treated as not supported.
    ///
    /// [1]: enum.Capability.html
    pub fn is_supported(&self, cap: Capability) -> bool {
        self.cap.get(cap as usize) == Some(&CAP_SUPPORTED)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_capability_is_unsupported() {
        let caps = Capabilities::new();
        assert!(!caps.is_supported(Capability::Volumes));
        assert!(!caps.is_supported(Capability::DiskVpd83Get));
    }

    #[test]
    fn short_capability_string_from_old_plugin() {
        // Old plugin only knows first 22 capabilities.
        let mut hex = "00".repeat(20);
        hex.push_str("0100");
        let raw = format!(r#"{{"class": "Capabilities", "cap": "{}"}}"#, hex);
        let caps: Capabilities = serde_json::from_str(&raw).unwrap();
        assert!(caps.is_supported(Capability::Volumes));
        assert!(!caps.is_supported(Capability::VolumeCreate));
        assert!(!caps.is_supported(Capability::DiskVpd83Get));
    }

    #[test]
    fn hex_encoding() {
        let mut caps = Capabilities::new();
        caps.set_all(&[Capability::Volumes, Capability::TargetPorts]);
        caps.unset(Capability::TargetPorts);
        let val = serde_json::to_value(&caps).unwrap();
        let hex = val["cap"].as_str().unwrap();
        assert_eq!(CAP_MAX * 2, hex.len());
        assert_eq!("01", &hex[40..42]);
        assert_eq!("00", &hex[432..434]);
        assert_eq!("Capabilities", val["class"]);

        let back: Capabilities = serde_json::from_value(val).unwrap();
        assert_eq!(caps, back);
    }

    #[test]
    fn invalid_hex_is_rejected() {
        let raw = r#"{"class": "Capabilities", "cap": "0g"}"#;
        assert!(serde_json::from_str::<Capabilities>(raw).is_err());
        let raw = r#"{"class": "Capabilities", "cap": "010"}"#;
        assert!(serde_json::from_str::<Capabilities>(raw).is_err());
    }
}
