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

use lsm::{ExportArgs, LsmError, NfsExport, Pool, Result};
use rand::Rng;

use super::state::{
    find, find_mut, remove, round_to_block, SimFs, SimFsClone, SimFsSnapshot,
    SimState,
};

pub(crate) const NFS_AUTH_TYPES: [&str; 1] = ["standard"];

impl SimState {
    fn check_fs_name(&self, name: &str) -> Result<()> {
        if self.fss.iter().any(|f| f.name == name) {
            return Err(LsmError::NameConflict(format!(
                "File system name '{}' in use",
                name
            )));
        }
        Ok(())
    }

    pub(crate) fn fs_create(
        &mut self,
        pool_id: &str,
        name: &str,
        size: u64,
    ) -> Result<String> {
        let size = round_to_block(size)?;
        let pool = find(&self.pools, pool_id, LsmError::NotFoundPool, "Pool")?;
        if pool.element_type & Pool::ELEMENT_TYPE_FS == 0 {
            return Err(LsmError::NoSupport(format!(
                "Pool {} cannot create file system",
                pool_id
            )));
        }
        self.check_fs_name(name)?;
        self.check_pool_space(pool_id, size)?;
        let id = self.next_id("FS_ID");
        debug!("Creating file system {} '{}' of {} bytes", id, name, size);
        self.fss.push(SimFs {
            id: id.clone(),
            name: name.to_string(),
            pool_id: pool_id.to_string(),
            size,
        });
        Ok(id)
    }

    fn fs_has_clone(&self, fs_id: &str) -> bool {
        self.fs_clones.iter().any(|c| c.src_fs_id == fs_id)
    }

    pub(crate) fn fs_delete(&mut self, fs_id: &str) -> Result<()> {
        self.fs(fs_id)?;
        if self.fs_has_clone(fs_id) {
            return Err(LsmError::HasChildDependency(
                "Requested file system has clone".to_string(),
            ));
        }
        remove(&mut self.fss, fs_id);
        self.fs_snapshots.retain(|s| s.fs_id != fs_id);
        self.fs_clones.retain(|c| c.dst_fs_id != fs_id);
        self.exports.retain(|e| e.fs_id != fs_id);
        Ok(())
    }

    pub(crate) fn fs_resize(
        &mut self,
        fs_id: &str,
        new_size: u64,
    ) -> Result<()> {
        let new_size = round_to_block(new_size)?;
        let fs = self.fs(fs_id)?;
        let (cur_size, pool_id) = (fs.size, fs.pool_id.clone());
        if new_size == cur_size {
            return Err(LsmError::NoStateChange(
                "File system size is not changed".to_string(),
            ));
        }
        if new_size > cur_size {
            self.check_pool_space(&pool_id, new_size - cur_size)?;
        }
        find_mut(&mut self.fss, fs_id, LsmError::NotFoundFs, "File system")?
            .size = new_size;
        Ok(())
    }

    pub(crate) fn fs_clone(
        &mut self,
        src_fs_id: &str,
        name: &str,
        snap_id: Option<&str>,
    ) -> Result<String> {
        let src = self.fs(src_fs_id)?;
        let (pool_id, size) = (src.pool_id.clone(), src.size);
        if let Some(snap_id) = snap_id {
            self.fs_snapshot(snap_id)?;
        }
        let dst_fs_id = self.fs_create(&pool_id, name, size)?;
        self.fs_clones.push(SimFsClone {
            src_fs_id: src_fs_id.to_string(),
            dst_fs_id: dst_fs_id.clone(),
        });
        Ok(dst_fs_id)
    }

    /// File content is not simulated, only the references are checked.
    pub(crate) fn fs_file_clone(
        &self,
        fs_id: &str,
        snap_id: Option<&str>,
    ) -> Result<()> {
        self.fs(fs_id)?;
        if let Some(snap_id) = snap_id {
            self.fs_snapshot(snap_id)?;
        }
        Ok(())
    }

    pub(crate) fn fs_child_dependency(&self, fs_id: &str) -> Result<bool> {
        self.fs(fs_id)?;
        Ok(self.fs_has_clone(fs_id)
            || self.fs_snapshots.iter().any(|s| s.fs_id == fs_id))
    }

    /// Split clones and delete snapshots of the file system.
    pub(crate) fn fs_child_dependency_rm(&mut self, fs_id: &str) -> Result<()> {
        if !self.fs_child_dependency(fs_id)? {
            return Err(LsmError::NoStateChange(
                "File system has no child dependency".to_string(),
            ));
        }
        self.fs_clones.retain(|c| c.src_fs_id != fs_id);
        self.fs_snapshots.retain(|s| s.fs_id != fs_id);
        Ok(())
    }

    pub(crate) fn fs_snapshot_ids(&self, fs_id: &str) -> Result<Vec<String>> {
        self.fs(fs_id)?;
        Ok(self
            .fs_snapshots
            .iter()
            .filter(|s| s.fs_id == fs_id)
            .map(|s| s.id.clone())
            .collect())
    }

    pub(crate) fn fs_snapshot_create(
        &mut self,
        fs_id: &str,
        name: &str,
        ts: u64,
    ) -> Result<String> {
        self.fs(fs_id)?;
        if self
            .fs_snapshots
            .iter()
            .any(|s| s.fs_id == fs_id && s.name == name)
        {
            return Err(LsmError::NameConflict(format!(
                "Snapshot name '{}' in use",
                name
            )));
        }
        let id = self.next_id("FS_SNAP_ID");
        self.fs_snapshots.push(SimFsSnapshot {
            id: id.clone(),
            name: name.to_string(),
            fs_id: fs_id.to_string(),
            ts,
        });
        Ok(id)
    }

    fn check_snapshot_of(&self, fs_id: &str, snap_id: &str) -> Result<()> {
        self.fs(fs_id)?;
        if self.fs_snapshot(snap_id)?.fs_id != fs_id {
            return Err(LsmError::NotFoundFsSnapshot(format!(
                "Snapshot {} does not belong to file system {}",
                snap_id, fs_id
            )));
        }
        Ok(())
    }

    pub(crate) fn fs_snapshot_delete(
        &mut self,
        fs_id: &str,
        snap_id: &str,
    ) -> Result<()> {
        self.check_snapshot_of(fs_id, snap_id)?;
        remove(&mut self.fs_snapshots, snap_id);
        Ok(())
    }

    pub(crate) fn fs_snapshot_restore(
        &self,
        fs_id: &str,
        snap_id: &str,
    ) -> Result<()> {
        self.check_snapshot_of(fs_id, snap_id)
    }

    /// Create or update the NFS export. The export path is generated when
    /// not provided.
    pub(crate) fn export_fs(&mut self, args: &ExportArgs) -> Result<NfsExport> {
        self.fs(&args.fs_id)?;
        let path = match &args.export_path {
            Some(p) if !p.is_empty() => p.clone(),
            _ => format!("/nfs_exp_{:08x}", rand::thread_rng().gen::<u32>()),
        };
        let existing = match self.exports.iter().find(|e| e.export_path == path)
        {
            Some(e) if e.fs_id != args.fs_id => {
                return Err(LsmError::NameConflict(format!(
                    "Export path {} is used by file system {}",
                    path, e.fs_id
                )))
            }
            Some(e) => Some(e.id.clone()),
            None => None,
        };
        let id = match existing {
            Some(id) => {
                debug!("Updating NFS export {}", id);
                remove(&mut self.exports, &id);
                id
            }
            None => self.next_id("EXP_ID"),
        };
        let mut export = NfsExport::new(&id, &args.fs_id, &path);
        export.auth = args
            .auth_type
            .clone()
            .unwrap_or_else(|| NFS_AUTH_TYPES[0].to_string());
        export.root = args.root_list.clone();
        export.rw = args.rw_list.clone();
        export.ro = args.ro_list.clone();
        export.anonuid = args.anon_uid;
        export.anongid = args.anon_gid;
        export.options = args.options.clone().unwrap_or_default();
        self.exports.push(export.clone());
        Ok(export)
    }

    pub(crate) fn export_remove(&mut self, export_id: &str) -> Result<()> {
        find(
            &self.exports,
            export_id,
            LsmError::NotFoundNfsExport,
            "NFS export",
        )?;
        remove(&mut self.exports, export_id);
        Ok(())
    }
}
