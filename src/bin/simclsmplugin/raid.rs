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
    Battery, CachePolicy, LsmError, Pool, PoolMember, PoolMemberInfo,
    RaidType, Result, VolumeCacheInfo, VolumeRaidInfo,
};

use super::state::{
    find, PoolSource, SimPool, SimState, BLOCK_SIZE, SUPPORTED_RAID_TYPES,
    SUPPORTED_STRIP_SIZES,
};

impl SimState {
    // Sub-pools share RAID layout of the pool they are allocated from.
    fn disk_pool_of<'a>(&'a self, pool: &'a SimPool) -> Result<&'a SimPool> {
        let mut cur = pool;
        while let PoolSource::Parent { pool_id, .. } = &cur.source {
            cur = find(&self.pools, pool_id, LsmError::NotFoundPool, "Pool")?;
        }
        Ok(cur)
    }

    pub(crate) fn volume_raid_info(
        &self,
        vol_id: &str,
    ) -> Result<VolumeRaidInfo> {
        let vol = self.volume(vol_id)?;
        let pool =
            find(&self.pools, &vol.pool_id, LsmError::NotFoundPool, "Pool")?;
        let pool = self.disk_pool_of(pool)?;
        let (disk_count, data_disk_count) = match &pool.source {
            PoolSource::Disks {
                disk_ids,
                data_disk_count,
            } => (disk_ids.len() as u32, *data_disk_count),
            PoolSource::Parent { .. } => (0, 0),
        };
        let opt_io_size = match pool.raid_type {
            RaidType::Raid1 | RaidType::Jbod => BLOCK_SIZE as u32,
            _ => pool.strip_size * data_disk_count,
        };
        Ok(VolumeRaidInfo {
            raid_type: pool.raid_type,
            strip_size: pool.strip_size,
            disk_count,
            min_io_size: pool.strip_size,
            opt_io_size,
        })
    }

    pub(crate) fn pool_member_info(
        &self,
        pool_id: &str,
    ) -> Result<PoolMemberInfo> {
        let pool = find(&self.pools, pool_id, LsmError::NotFoundPool, "Pool")?;
        let members = match &pool.source {
            PoolSource::Disks { disk_ids, .. } => self
                .disks
                .iter()
                .filter(|d| disk_ids.contains(&d.id))
                .map(|d| PoolMember::Disk(self.disk_record(d)))
                .collect(),
            PoolSource::Parent { pool_id, .. } => {
                let parent =
                    find(&self.pools, pool_id, LsmError::NotFoundPool, "Pool")?;
                vec![PoolMember::Pool(self.pool_record(parent))]
            }
        };
        Ok(PoolMemberInfo {
            raid_type: pool.raid_type,
            members,
        })
    }

    pub(crate) fn volume_raid_create_cap(
        &self,
        sys_id: &str,
    ) -> Result<(Vec<RaidType>, Vec<u32>)> {
        self.check_system(sys_id)?;
        Ok((SUPPORTED_RAID_TYPES.to_vec(), SUPPORTED_STRIP_SIZES.to_vec()))
    }

    /// Create a pool holding all `disk_ids` and a volume using all of its
    /// space. Deleting the volume also deletes the pool.
    pub(crate) fn volume_raid_create(
        &mut self,
        name: &str,
        raid_type: RaidType,
        disk_ids: &[String],
        strip_size: u32,
    ) -> Result<String> {
        if disk_ids.is_empty() {
            return Err(LsmError::InvalidArgument(
                "Got empty disk list".to_string(),
            ));
        }
        if self.volumes.iter().any(|v| v.name == name) {
            return Err(LsmError::NameConflict(format!(
                "Volume name '{}' in use",
                name
            )));
        }
        let pool_id = self.pool_create_from_disks(
            &format!("RAID Pool for volume {}", name),
            disk_ids,
            raid_type,
            Pool::ELEMENT_TYPE_VOLUME,
            0,
            strip_size,
        )?;
        let pool = find(&self.pools, &pool_id, LsmError::NotFoundPool, "Pool")?;
        let size = self.pool_free_space(pool) / BLOCK_SIZE * BLOCK_SIZE;
        self.volume_create(&pool_id, name, size, true)
    }

    pub(crate) fn read_cache_pct_update(
        &mut self,
        sys_id: &str,
        pct: u32,
    ) -> Result<()> {
        self.check_system(sys_id)?;
        if pct > 100 {
            return Err(LsmError::InvalidArgument(format!(
                "Invalid read cache percentage {}",
                pct
            )));
        }
        self.read_cache_pct = pct as i8;
        Ok(())
    }

    // Write back caching is only safe when some battery is healthy.
    fn has_good_battery(&self) -> bool {
        self.batteries
            .iter()
            .any(|b| b.status & Battery::STATUS_OK != 0)
    }

    pub(crate) fn volume_cache_info(
        &self,
        vol_id: &str,
    ) -> Result<VolumeCacheInfo> {
        let vol = self.volume(vol_id)?;
        let write_cache_status = match vol.write_cache {
            CachePolicy::Enabled => CachePolicy::Enabled,
            CachePolicy::Auto if self.has_good_battery() => {
                CachePolicy::Enabled
            }
            _ => CachePolicy::Disabled,
        };
        Ok(VolumeCacheInfo {
            write_cache_setting: vol.write_cache,
            write_cache_status,
            read_cache_setting: vol.read_cache,
            read_cache_status: vol.read_cache,
            physical_disk_cache_status: vol.phy_disk_cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_disks(state: &SimState, count: usize) -> Vec<String> {
        state
            .disks
            .iter()
            .filter(|d| d.owner.is_none() && d.name.starts_with("2TiB SAS"))
            .take(count)
            .map(|d| d.id.clone())
            .collect()
    }

    #[test]
    fn raid_info_of_sub_pool_volume() {
        let mut state = SimState::seed().unwrap();
        let sub_pool = state.pools[1].id.clone();
        let vol = state.volume_create(&sub_pool, "v", 1 << 20, false).unwrap();
        let info = state.volume_raid_info(&vol).unwrap();
        assert_eq!(RaidType::Raid1, info.raid_type);
        assert_eq!(2, info.disk_count);
        assert_eq!(512, info.opt_io_size);

        let member = state.pool_member_info(&sub_pool).unwrap();
        match member.members.as_slice() {
            [PoolMember::Pool(p)] => assert_eq!("Pool 1", p.name),
            m => panic!("unexpected members {:?}", m),
        }
    }

    #[test]
    fn raid_create_and_delete() {
        let mut state = SimState::seed().unwrap();
        let disks = free_disks(&state, 3);
        let vol = state
            .volume_raid_create("raid5", RaidType::Raid5, &disks, 64 * 1024)
            .unwrap();
        let info = state.volume_raid_info(&vol).unwrap();
        assert_eq!(RaidType::Raid5, info.raid_type);
        assert_eq!(3, info.disk_count);
        assert_eq!(64 * 1024 * 2, info.opt_io_size);
        assert!(state.volume(&vol).unwrap().size > 0);

        match state.volume_raid_create("again", RaidType::Raid0, &disks, 0) {
            Err(LsmError::DiskNotFree(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        let pool_count = state.pools.len();
        state.volume_delete(&vol).unwrap();
        assert_eq!(pool_count - 1, state.pools.len());
        assert_eq!(3, free_disks(&state, 3).len());
    }

    #[test]
    fn raid_create_invalid() {
        let mut state = SimState::seed().unwrap();
        let disks = free_disks(&state, 2);
        match state.volume_raid_create("r", RaidType::Raid0, &[], 0) {
            Err(LsmError::InvalidArgument(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        match state.volume_raid_create("r", RaidType::Raid3, &disks, 0) {
            Err(LsmError::NoSupport(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        match state.volume_raid_create("r", RaidType::Raid0, &disks, 1000) {
            Err(LsmError::NoSupport(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn write_cache_status_follows_battery() {
        let mut state = SimState::seed().unwrap();
        let pool_id = state.pools[2].id.clone();
        let vol = state.volume_create(&pool_id, "v", 4096, false).unwrap();
        let info = state.volume_cache_info(&vol).unwrap();
        assert_eq!(CachePolicy::Auto, info.write_cache_setting);
        assert_eq!(CachePolicy::Enabled, info.write_cache_status);

        for bat in state.batteries.iter_mut() {
            bat.status = Battery::STATUS_ERROR;
        }
        let info = state.volume_cache_info(&vol).unwrap();
        assert_eq!(CachePolicy::Disabled, info.write_cache_status);
    }
}
