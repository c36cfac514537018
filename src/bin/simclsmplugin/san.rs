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

use lsm::{CachePolicy, InitiatorType, LsmError, Pool, Result};
use lsm::VolumeReplicateType;

use super::state::{
    find, find_mut, random_vpd83, remove, round_to_block, SimAccessGroup,
    SimMask, SimReplica, SimState, SimVolume, BLOCK_SIZE,
};

impl SimState {
    fn check_vol_name(&self, name: &str) -> Result<()> {
        if self.volumes.iter().any(|v| v.name == name) {
            return Err(LsmError::NameConflict(format!(
                "Volume name '{}' in use",
                name
            )));
        }
        Ok(())
    }

    fn check_pool_element(&self, pool_id: &str, element: u64) -> Result<()> {
        let pool = find(&self.pools, pool_id, LsmError::NotFoundPool, "Pool")?;
        if pool.element_type & element == 0 {
            return Err(LsmError::NoSupport(format!(
                "Pool {} cannot create this kind of element",
                pool_id
            )));
        }
        Ok(())
    }

    /// Create volume and return its ID.
    pub(crate) fn volume_create(
        &mut self,
        pool_id: &str,
        name: &str,
        size: u64,
        is_hw_raid: bool,
    ) -> Result<String> {
        let size = round_to_block(size)?;
        self.check_pool_element(pool_id, Pool::ELEMENT_TYPE_VOLUME)?;
        self.check_vol_name(name)?;
        self.check_pool_space(pool_id, size)?;
        let id = self.next_id("VOL_ID");
        debug!("Creating volume {} '{}' of {} bytes", id, name, size);
        self.volumes.push(SimVolume {
            id: id.clone(),
            name: name.to_string(),
            vpd83: random_vpd83(),
            pool_id: pool_id.to_string(),
            size,
            enabled: true,
            is_hw_raid,
            write_cache: CachePolicy::Auto,
            read_cache: CachePolicy::Enabled,
            phy_disk_cache: CachePolicy::Disabled,
        });
        Ok(id)
    }

    fn volume_has_child(&self, vol_id: &str) -> bool {
        self.replicas
            .iter()
            .any(|r| r.src_vol_id == vol_id && r.dst_vol_id != vol_id)
    }

    pub(crate) fn volume_delete(&mut self, vol_id: &str) -> Result<()> {
        let vol = self.volume(vol_id)?;
        let (pool_id, is_hw_raid) = (vol.pool_id.clone(), vol.is_hw_raid);
        if self.masks.iter().any(|m| m.vol_id == vol_id) {
            return Err(LsmError::IsMasked(
                "Volume is masked to access group".to_string(),
            ));
        }
        if self.volume_has_child(vol_id) {
            return Err(LsmError::HasChildDependency(
                "Requested volume has child dependency".to_string(),
            ));
        }
        remove(&mut self.volumes, vol_id);
        self.replicas.retain(|r| r.dst_vol_id != vol_id);
        if is_hw_raid {
            remove(&mut self.pools, &pool_id);
            for disk in self.disks.iter_mut() {
                if disk.owner.as_deref() == Some(pool_id.as_str()) {
                    disk.owner = None;
                }
            }
        }
        Ok(())
    }

    /// Replicate volume, target pool defaults to the pool of source.
    pub(crate) fn volume_replicate(
        &mut self,
        pool_id: Option<&str>,
        rep_type: VolumeReplicateType,
        src_vol_id: &str,
        name: &str,
    ) -> Result<String> {
        let src = self.volume(src_vol_id)?;
        let size = src.size;
        let pool_id = pool_id.unwrap_or(&src.pool_id).to_string();
        let dst_vol_id = self.volume_create(&pool_id, name, size, false)?;
        self.replicas.push(SimReplica {
            src_vol_id: src_vol_id.to_string(),
            dst_vol_id: dst_vol_id.clone(),
            rep_type,
        });
        Ok(dst_vol_id)
    }

    pub(crate) fn volume_replicate_range(
        &mut self,
        rep_type: VolumeReplicateType,
        src_vol_id: &str,
        dst_vol_id: &str,
    ) -> Result<()> {
        self.volume(src_vol_id)?;
        self.volume(dst_vol_id)?;
        if dst_vol_id != src_vol_id
            && self.replicas.iter().any(|r| r.src_vol_id == dst_vol_id)
        {
            return Err(LsmError::PluginBug(
                "Replicating to a volume which is replication source is \
                 not supported"
                    .to_string(),
            ));
        }
        let rep = SimReplica {
            src_vol_id: src_vol_id.to_string(),
            dst_vol_id: dst_vol_id.to_string(),
            rep_type,
        };
        if !self.replicas.contains(&rep) {
            self.replicas.push(rep);
        }
        Ok(())
    }

    pub(crate) fn volume_resize(
        &mut self,
        vol_id: &str,
        new_size: u64,
    ) -> Result<()> {
        let new_size = round_to_block(new_size)?;
        let vol = self.volume(vol_id)?;
        let (cur_size, pool_id) = (vol.size, vol.pool_id.clone());
        if new_size == cur_size {
            return Err(LsmError::NoStateChange(
                "Volume size is not changed".to_string(),
            ));
        }
        let pool = find(&self.pools, &pool_id, LsmError::NotFoundPool, "Pool")?;
        let unsupported = if new_size > cur_size {
            Pool::UNSUPPORTED_VOLUME_GROW
        } else {
            Pool::UNSUPPORTED_VOLUME_SHRINK
        };
        if pool.unsupported_actions & unsupported != 0 {
            return Err(LsmError::NoSupport(format!(
                "Pool {} does not support this volume resize",
                pool_id
            )));
        }
        if new_size > cur_size {
            self.check_pool_space(&pool_id, new_size - cur_size)?;
        }
        find_mut(&mut self.volumes, vol_id, LsmError::NotFoundVolume, "Volume")?
            .size = new_size;
        Ok(())
    }

    pub(crate) fn volume_set_enabled(
        &mut self,
        vol_id: &str,
        enabled: bool,
    ) -> Result<()> {
        let vol = find_mut(
            &mut self.volumes,
            vol_id,
            LsmError::NotFoundVolume,
            "Volume",
        )?;
        if vol.enabled == enabled {
            return Err(LsmError::NoStateChange(format!(
                "Volume is already {}",
                if enabled { "enabled" } else { "disabled" }
            )));
        }
        vol.enabled = enabled;
        Ok(())
    }

    fn check_ag_name(&self, name: &str) -> Result<()> {
        if self.access_groups.iter().any(|a| a.name == name) {
            return Err(LsmError::NameConflict(format!(
                "Access group name '{}' in use",
                name
            )));
        }
        Ok(())
    }

    // Initiator could only be in one access group.
    fn ag_of_init(&self, init_id: &str) -> Option<&SimAccessGroup> {
        self.access_groups
            .iter()
            .find(|a| a.init_ids.iter().any(|i| i == init_id))
    }

    pub(crate) fn access_group_create(
        &mut self,
        name: &str,
        init_id: &str,
        init_type: InitiatorType,
        sys_id: &str,
    ) -> Result<String> {
        self.check_system(sys_id)?;
        if name.is_empty() || init_id.is_empty() {
            return Err(LsmError::InvalidArgument(
                "Access group name and initiator ID should not be empty"
                    .to_string(),
            ));
        }
        self.check_ag_name(name)?;
        if let Some(ag) = self.ag_of_init(init_id) {
            return Err(LsmError::ExistsInitiator(format!(
                "Initiator {} is already in access group {}",
                init_id, ag.id
            )));
        }
        let id = self.next_id("AG_ID");
        self.access_groups.push(SimAccessGroup {
            id: id.clone(),
            name: name.to_string(),
            init_type,
            init_ids: vec![init_id.to_string()],
        });
        Ok(id)
    }

    pub(crate) fn access_group_delete(&mut self, ag_id: &str) -> Result<()> {
        self.access_group(ag_id)?;
        if self.masks.iter().any(|m| m.ag_id == ag_id) {
            return Err(LsmError::IsMasked(
                "Access group has volume masked".to_string(),
            ));
        }
        remove(&mut self.access_groups, ag_id);
        Ok(())
    }

    pub(crate) fn access_group_initiator_add(
        &mut self,
        ag_id: &str,
        init_id: &str,
        init_type: InitiatorType,
    ) -> Result<()> {
        self.access_group(ag_id)?;
        if let Some(ag) = self.ag_of_init(init_id) {
            if ag.id == ag_id {
                return Err(LsmError::NoStateChange(format!(
                    "Initiator {} is already in access group {}",
                    init_id, ag_id
                )));
            }
            return Err(LsmError::ExistsInitiator(format!(
                "Initiator {} is used by access group {}",
                init_id, ag.id
            )));
        }
        let ag = find_mut(
            &mut self.access_groups,
            ag_id,
            LsmError::NotFoundAccessGroup,
            "Access group",
        )?;
        ag.init_ids.push(init_id.to_string());
        if ag.init_type != init_type {
            ag.init_type = InitiatorType::Mixed;
        }
        Ok(())
    }

    pub(crate) fn access_group_initiator_delete(
        &mut self,
        ag_id: &str,
        init_id: &str,
    ) -> Result<()> {
        let ag = find_mut(
            &mut self.access_groups,
            ag_id,
            LsmError::NotFoundAccessGroup,
            "Access group",
        )?;
        if !ag.init_ids.iter().any(|i| i == init_id) {
            return Err(LsmError::NoStateChange(format!(
                "Initiator {} is not in access group {}",
                init_id, ag_id
            )));
        }
        if ag.init_ids.len() == 1 {
            return Err(LsmError::LastInitInAccessGroup(
                "Refused to remove the last initiator".to_string(),
            ));
        }
        ag.init_ids.retain(|i| i != init_id);
        Ok(())
    }

    pub(crate) fn volume_mask(
        &mut self,
        vol_id: &str,
        ag_id: &str,
    ) -> Result<()> {
        self.volume(vol_id)?;
        if self.access_group(ag_id)?.init_ids.is_empty() {
            return Err(LsmError::EmptyAccessGroup(
                "Refused to mask volume to empty access group".to_string(),
            ));
        }
        let mask = SimMask {
            vol_id: vol_id.to_string(),
            ag_id: ag_id.to_string(),
        };
        if self.masks.contains(&mask) {
            return Err(LsmError::NoStateChange(
                "Volume is already masked to requested access group"
                    .to_string(),
            ));
        }
        self.masks.push(mask);
        Ok(())
    }

    pub(crate) fn volume_unmask(
        &mut self,
        vol_id: &str,
        ag_id: &str,
    ) -> Result<()> {
        self.volume(vol_id)?;
        self.access_group(ag_id)?;
        let count = self.masks.len();
        self.masks.retain(|m| !(m.vol_id == vol_id && m.ag_id == ag_id));
        if count == self.masks.len() {
            return Err(LsmError::NoStateChange(
                "Volume is not masked to requested access group".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn vol_ids_of_ag(&self, ag_id: &str) -> Result<Vec<String>> {
        self.access_group(ag_id)?;
        Ok(self
            .masks
            .iter()
            .filter(|m| m.ag_id == ag_id)
            .map(|m| m.vol_id.clone())
            .collect())
    }

    pub(crate) fn ag_ids_of_vol(&self, vol_id: &str) -> Result<Vec<String>> {
        self.volume(vol_id)?;
        Ok(self
            .masks
            .iter()
            .filter(|m| m.vol_id == vol_id)
            .map(|m| m.ag_id.clone())
            .collect())
    }

    pub(crate) fn volume_child_dependency(&self, vol_id: &str) -> Result<bool> {
        self.volume(vol_id)?;
        Ok(self.volume_has_child(vol_id))
    }

    /// Break all replications using this volume as source.
    pub(crate) fn volume_child_dependency_rm(
        &mut self,
        vol_id: &str,
    ) -> Result<()> {
        self.volume(vol_id)?;
        if !self.replicas.iter().any(|r| r.src_vol_id == vol_id) {
            return Err(LsmError::NoStateChange(
                "Volume has no child dependency".to_string(),
            ));
        }
        self.replicas.retain(|r| r.src_vol_id != vol_id);
        Ok(())
    }

    pub(crate) fn volume_cache_update<F>(
        &mut self,
        vol_id: &str,
        f: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut SimVolume),
    {
        f(find_mut(
            &mut self.volumes,
            vol_id,
            LsmError::NotFoundVolume,
            "Volume",
        )?);
        Ok(())
    }

    pub(crate) fn block_size(&self, sys_id: &str) -> Result<u32> {
        self.check_system(sys_id)?;
        Ok(BLOCK_SIZE as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SYS_ID;

    fn state_with_volume() -> (SimState, String, String) {
        let mut state = SimState::seed().unwrap();
        let pool_id = state.pools[2].id.clone();
        let vol_id = state
            .volume_create(&pool_id, "test_vol", 1024 * 1024, false)
            .unwrap();
        (state, pool_id, vol_id)
    }

    #[test]
    fn volume_space_accounting() {
        let (state, pool_id, vol_id) = state_with_volume();
        let pool = find(&state.pools, &pool_id, LsmError::NotFoundPool, "Pool")
            .unwrap();
        let total = state.pool_total_space(pool);
        assert_eq!(total - 1024 * 1024, state.pool_free_space(pool));
        assert_eq!(2048, state.volume_record(&vol_id).unwrap().num_of_blocks);
    }

    #[test]
    fn volume_name_conflict() {
        let (mut state, pool_id, _) = state_with_volume();
        match state.volume_create(&pool_id, "test_vol", 512, false) {
            Err(LsmError::NameConflict(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn volume_too_big() {
        let (mut state, pool_id, _) = state_with_volume();
        match state.volume_create(&pool_id, "huge", u64::MAX / 2, false) {
            Err(LsmError::NoEnoughSpace(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn resize_unchanged_and_unsupported() {
        let (mut state, _, vol_id) = state_with_volume();
        match state.volume_resize(&vol_id, 1024 * 1024) {
            Err(LsmError::NoStateChange(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        state.volume_resize(&vol_id, 2 * 1024 * 1024).unwrap();

        let pool_1 = state.pools[0].id.clone();
        let vol = state.volume_create(&pool_1, "v1", 4096, false).unwrap();
        match state.volume_resize(&vol, 8192) {
            Err(LsmError::NoSupport(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn replica_blocks_source_delete() {
        let (mut state, _, vol_id) = state_with_volume();
        let dst = state
            .volume_replicate(None, VolumeReplicateType::Clone, &vol_id, "dst")
            .unwrap();
        assert!(state.volume_child_dependency(&vol_id).unwrap());
        assert!(!state.volume_child_dependency(&dst).unwrap());
        match state.volume_delete(&vol_id) {
            Err(LsmError::HasChildDependency(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        state.volume_child_dependency_rm(&vol_id).unwrap();
        state.volume_delete(&vol_id).unwrap();
        state.volume_delete(&dst).unwrap();
        assert!(state.volumes.is_empty());
    }

    #[test]
    fn masking_rules() {
        let (mut state, _, vol_id) = state_with_volume();
        let ag_id = state
            .access_group_create(
                "ag",
                "iqn.1994-05.com.domain:01.89bd01",
                InitiatorType::IscsiIqn,
                SYS_ID,
            )
            .unwrap();
        state.volume_mask(&vol_id, &ag_id).unwrap();
        match state.volume_mask(&vol_id, &ag_id) {
            Err(LsmError::NoStateChange(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        match state.volume_delete(&vol_id) {
            Err(LsmError::IsMasked(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        match state.access_group_delete(&ag_id) {
            Err(LsmError::IsMasked(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        assert_eq!(vec![vol_id.clone()], state.vol_ids_of_ag(&ag_id).unwrap());
        assert_eq!(vec![ag_id.clone()], state.ag_ids_of_vol(&vol_id).unwrap());
        state.volume_unmask(&vol_id, &ag_id).unwrap();
        match state.volume_unmask(&vol_id, &ag_id) {
            Err(LsmError::NoStateChange(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        state.access_group_delete(&ag_id).unwrap();
    }

    #[test]
    fn initiator_membership() {
        let mut state = SimState::seed().unwrap();
        let iqn = "iqn.1994-05.com.domain:01.89bd01";
        let wwpn = "50:0a:09:86:99:4b:8d:c5";
        let ag_1 = state
            .access_group_create("ag1", iqn, InitiatorType::IscsiIqn, SYS_ID)
            .unwrap();
        match state.access_group_create(
            "ag2",
            iqn,
            InitiatorType::IscsiIqn,
            SYS_ID,
        ) {
            Err(LsmError::ExistsInitiator(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        match state.access_group_initiator_add(
            &ag_1,
            iqn,
            InitiatorType::IscsiIqn,
        ) {
            Err(LsmError::NoStateChange(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        match state.access_group_initiator_delete(&ag_1, iqn) {
            Err(LsmError::LastInitInAccessGroup(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        state
            .access_group_initiator_add(&ag_1, wwpn, InitiatorType::Wwpn)
            .unwrap();
        assert_eq!(
            InitiatorType::Mixed,
            state.access_group(&ag_1).unwrap().init_type
        );
        state.access_group_initiator_delete(&ag_1, iqn).unwrap();
        match state.access_group_create(
            "ag3",
            "iqn.x",
            InitiatorType::IscsiIqn,
            "bad",
        ) {
            Err(LsmError::NotFoundSystem(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }
}
