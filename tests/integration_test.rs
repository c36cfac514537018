/*
 * Copyright (C) 2017 Red Hat, Inc.
 * This library is free software; you can redistribute it and/or
 * modify it under the terms of the GNU Lesser General Public
 * License as published by the Free Software Foundation; either
 * version 2.1 of the License, or (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General Public
 * License along with this library; If not, see <http://www.gnu.org/licenses/>.
 *
 * Author: Gris Ge <fge@redhat.com>
 */


extern crate lsm;
extern crate rand;
extern crate serde_json;
extern crate tempfile;

use lsm::{
    CachePolicy, Client, Disk, LsmError, NfsAccess, Pool, RaidType, System,
    Volume, VolumeCreateArgThinP,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tempfile::TempDir;

static SIM_SYS_ID: &'static str = "sim-01";
static SIM_PLUGIN_EXEC: &'static str = env!("CARGO_BIN_EXE_simclsmplugin");

fn setup() {
    let plugin_dir = Path::new(SIM_PLUGIN_EXEC)
        .parent()
        .expect("plugin executable has no parent folder");
    std::env::set_var("LSM_PLUGIN_DIR", plugin_dir);
    std::env::set_var("LSM_SIM_TIME", "0.2");
}

// Every test works on its own simulator state.
struct TestConn {
    _dir: TempDir,
    uri: String,
}

impl TestConn {
    fn new() -> TestConn {
        setup();
        let dir = tempfile::tempdir().unwrap();
        let uri = format!(
            "simc://?statefile={}",
            dir.path().join("state.json").display()
        );
        TestConn { _dir: dir, uri }
    }

    fn connect(&self) -> Client {
        Client::new(&self.uri, None, None).unwrap()
    }
}

fn random_string(prefix: &str) -> String {
    let rand_str: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(char::from)
        .collect();
    format!("{}{}", prefix, rand_str)
}

fn random_iqn() -> String {
    random_string("iqn.2017-11.com.example:rust-test-")
}

fn get_sys(c: &mut Client) -> System {
    let syss = c.systems().unwrap();
    assert_eq!(1, syss.len());
    syss[0].clone()
}

fn get_pool(c: &mut Client, name: &str) -> Pool {
    c.pools()
        .unwrap()
        .into_iter()
        .find(|p| p.name == name)
        .unwrap()
}

fn create_vol(c: &mut Client, pool: &Pool, name: &str) -> Volume {
    c.volume_create(
        pool,
        name,
        lsm::size_human_2_size_bytes("1GiB"),
        &VolumeCreateArgThinP::Default,
    )
    .unwrap()
}

// Talks to plugin executable directly through its stdin and stdout.
struct RawPlugin {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

impl RawPlugin {
    fn start() -> RawPlugin {
        setup();
        let mut child = Command::new(SIM_PLUGIN_EXEC)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let stdin = child.stdin.take().unwrap();
        let stdout = child.stdout.take().unwrap();
        RawPlugin {
            child,
            stdin,
            stdout,
        }
    }

    fn call(&mut self, method: &str, params: Value) -> Value {
        let msg = json!({"method": method, "id": 100, "params": params})
            .to_string();
        write!(self.stdin, "{:010}{}", msg.len(), msg).unwrap();
        self.stdin.flush().unwrap();
        let mut hdr = [0u8; 10];
        self.stdout.read_exact(&mut hdr).unwrap();
        let len: usize = std::str::from_utf8(&hdr).unwrap().parse().unwrap();
        let mut body = vec![0u8; len];
        self.stdout.read_exact(&mut body).unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn error_code(reply: &Value) -> i64 {
        reply["error"]["code"].as_i64().unwrap()
    }
}

impl Drop for RawPlugin {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn avail_plugins() {
    setup();
    let pis = lsm::available_plugins().unwrap();
    println!("got plugins '{:?}'", pis);
    assert!(pis.iter().any(|p| p.name == "simc"));
}

#[test]
fn sys() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let sys = get_sys(&mut c);
    println!("got system '{:?}'", sys);
    assert_eq!(SIM_SYS_ID, sys.id);
    assert_eq!(lsm::SystemMode::HardwareRaid, sys.mode);
    assert!(!sys.fw_version.is_empty());
}

#[test]
fn vol() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let new_vol = create_vol(&mut c, &pool, &random_string("vol_"));
    println!("new volume '{:?}'", new_vol);
    let new_size = lsm::size_human_2_size_bytes("2GiB");
    let updated_vol = c.volume_resize(&new_vol, new_size).unwrap();
    assert!(updated_vol.size_bytes() >= new_size);
    let dst_vol = c
        .volume_replicate(
            None,
            lsm::VolumeReplicateType::Clone,
            &updated_vol,
            &random_string("vol_rep_dst_"),
        )
        .unwrap();
    assert_eq!(pool.id, dst_vol.pool_id);

    let sys = get_sys(&mut c);
    assert_eq!(512, c.volume_rep_range_blk_size(&sys).unwrap());

    let dst_vol2 =
        create_vol(&mut c, &pool, &random_string("vol_rep_range_dst_"));
    let ranges = [
        lsm::BlockRange::new(10u64, 50u64, 10u64),
        lsm::BlockRange::new(100u64, 150u64, 10u64),
    ];
    c.volume_replicate_range(
        lsm::VolumeReplicateType::Clone,
        &updated_vol,
        &dst_vol2,
        &ranges,
    )
    .unwrap();

    c.volume_disable(&dst_vol).unwrap();
    match c.volume_disable(&dst_vol) {
        Err(LsmError::NoStateChange(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    c.volume_enable(&dst_vol).unwrap();

    c.volume_delete(&dst_vol2).unwrap();
    c.volume_delete(&dst_vol).unwrap();
    assert_eq!(false, c.vol_has_child_dep(&updated_vol).unwrap());
    c.volume_delete(&updated_vol).unwrap();
    assert!(c.volumes().unwrap().is_empty());
}

#[test]
fn plugin_error_detail_reaches_client() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let vol = create_vol(&mut c, &pool, &random_string("vol_"));
    c.volume_disable(&vol).unwrap();
    assert!(c.last_error().is_none());
    match c.volume_disable(&vol) {
        Err(LsmError::NoStateChange(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    let info = c.last_error().unwrap();
    assert_eq!(125, info.code);
    assert!(info.debug.unwrap().starts_with("State file: "));
    assert_eq!(None, info.exception);

    c.volume_enable(&vol).unwrap();
    assert!(c.last_error().is_none());
    c.volume_delete(&vol).unwrap();
}

#[test]
fn volume_space_bookkeeping() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let size = 1_000_000_000u64;
    let vol = c
        .volume_create(
            &pool,
            &random_string("vol_"),
            size,
            &VolumeCreateArgThinP::Full,
        )
        .unwrap();
    let rounded = (size + 511) / 512 * 512;
    assert!(vol.size_bytes() >= size);
    assert_eq!(rounded, vol.size_bytes());
    let pool_after = get_pool(&mut c, "lsm_test_aggr");
    assert_eq!(pool.free_space - rounded, pool_after.free_space);

    match c.volume_create(
        &pool_after,
        &random_string("vol_"),
        pool_after.free_space + 512,
        &VolumeCreateArgThinP::Default,
    ) {
        Err(LsmError::NoEnoughSpace(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    let pool_last = get_pool(&mut c, "lsm_test_aggr");
    assert_eq!(pool_after.free_space, pool_last.free_space);
}

#[test]
fn masked_volume_delete() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let sys = get_sys(&mut c);
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let vol = create_vol(&mut c, &pool, &random_string("vol_"));
    let ag = c
        .access_group_create(
            &random_string("ag_"),
            &random_iqn(),
            lsm::InitiatorType::IscsiIqn,
            &sys,
        )
        .unwrap();
    c.volume_mask(&vol, &ag).unwrap();
    match c.volume_delete(&vol) {
        Err(LsmError::IsMasked(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    assert_eq!(1, c.volumes().unwrap().len());
    c.volume_unmask(&vol, &ag).unwrap();
    c.volume_delete(&vol).unwrap();
    c.access_group_delete(&ag).unwrap();
}

#[test]
fn vol_child_dep() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let vol = create_vol(&mut c, &pool, &random_string("vol_"));
    let dst_vol = c
        .volume_replicate(
            None,
            lsm::VolumeReplicateType::Clone,
            &vol,
            &random_string("vol_rep_dst_"),
        )
        .unwrap();
    assert_eq!(true, c.vol_has_child_dep(&vol).unwrap());
    match c.volume_delete(&vol) {
        Err(LsmError::HasChildDependency(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    c.vol_child_dep_rm(&vol).unwrap();
    assert_eq!(false, c.vol_has_child_dep(&vol).unwrap());
    c.volume_delete(&vol).unwrap();
    c.volume_delete(&dst_vol).unwrap();
}

#[test]
fn pools() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let ps = c.pools().unwrap();
    println!("got pools '{:?}'", ps);
    assert_eq!(4, ps.len());
    let found = c.pools_search("id", &ps[0].id).unwrap();
    assert_eq!(vec![ps[0].clone()], found);
}

#[test]
fn search_key() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    match c.pools_search("bogus_field", "x") {
        Err(LsmError::UnSupportedSearchKey(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    match c.volumes_search("bogus_field", "x") {
        Err(LsmError::UnSupportedSearchKey(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    assert!(c.pools_search("system_id", "sim-02").unwrap().is_empty());
    assert_eq!(20, c.disks_search("system_id", SIM_SYS_ID).unwrap().len());
}

#[test]
fn disks() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let ds = c.disks().unwrap();
    println!("got disks '{:?}'", ds);
    assert_eq!(20, ds.len());
    for d in &ds {
        assert!(d.vpd83.as_ref().map(|v| v.len()) == Some(16));
        assert!(d.location.is_some());
    }
}

#[test]
fn file_system() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let size_1gib = lsm::size_human_2_size_bytes("1GiB");
    let fs = c.fs_create(&pool, &random_string("fs_"), size_1gib).unwrap();
    let fs = c.fs_resize(&fs, size_1gib * 2).unwrap();
    println!("Got new fs: '{:?}'", fs);
    assert!(fs.total_space >= size_1gib * 2);
    assert_eq!(1, c.fs().unwrap().len());

    let snap = c
        .fs_snapshot_create(&fs, &random_string("fs_snap_"))
        .unwrap();
    println!("Got new fs snapshot: '{:?}'", snap);
    let snaps = c.fs_snapshots(&fs).unwrap();
    assert_eq!(vec![snap.clone()], snaps);

    let dst_fs = c
        .fs_clone(&fs, &random_string("fs_clone_dst_"), Some(&snap))
        .unwrap();
    println!("Got new clone target fs: '{:?}'", dst_fs);

    c.fs_file_clone(&fs, "/root/foo", "/root/foe", Some(&snap))
        .unwrap();

    c.fs_snapshot_restore(&fs, &snap, true, None, None).unwrap();
    c.fs_snapshot_delete(&fs, &snap).unwrap();
    c.fs_delete(&dst_fs).unwrap();
    c.fs_delete(&fs).unwrap();
    assert!(c.fs().unwrap().is_empty());
}

#[test]
fn fs_child_dep() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let fs = c
        .fs_create(
            &pool,
            &random_string("fs_"),
            lsm::size_human_2_size_bytes("1GiB"),
        )
        .unwrap();
    let dst_fs = c
        .fs_clone(&fs, &random_string("fs_clone_dst_"), None)
        .unwrap();
    assert_eq!(true, c.fs_has_child_dep(&fs, None).unwrap());
    match c.fs_delete(&fs) {
        Err(LsmError::HasChildDependency(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    c.fs_child_dep_rm(&fs, None).unwrap();
    c.fs_delete(&fs).unwrap();
    c.fs_delete(&dst_fs).unwrap();
}

#[test]
fn nfs_export() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    assert_eq!(vec!["standard"], c.nfs_exp_auth_type_list().unwrap());
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let fs = c
        .fs_create(
            &pool,
            &random_string("fs_"),
            lsm::size_human_2_size_bytes("1GiB"),
        )
        .unwrap();
    let access = NfsAccess {
        root_list: &["localhost"],
        rw_list: &["abc.com", "localhost"],
        ro_list: &["b.com"],
        anon_uid: None,
        anon_gid: None,
    };
    let path = random_string("/");
    let exp = c
        .fs_export(&fs, Some(&path), &access, None, None)
        .unwrap();
    assert_eq!(path, exp.export_path);
    assert_eq!(fs.id, exp.fs_id);
    let eps = c.nfs_exports_search("fs_id", &fs.id).unwrap();
    assert_eq!(vec![exp.clone()], eps);
    c.fs_unexport(&exp).unwrap();
    match c.fs_unexport(&exp) {
        Err(LsmError::NotFoundNfsExport(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
}

#[test]
fn ag() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let sys = get_sys(&mut c);
    let init = random_iqn();
    let ag = c
        .access_group_create(
            &random_string("ag_"),
            &init,
            lsm::InitiatorType::IscsiIqn,
            &sys,
        )
        .unwrap();
    println!("Created new ag: '{:?}'", ag);
    assert_eq!(1, c.access_groups().unwrap().len());

    match c.access_group_init_del(&ag, &init, lsm::InitiatorType::IscsiIqn) {
        Err(LsmError::LastInitInAccessGroup(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    assert_eq!(vec![ag.clone()], c.access_groups().unwrap());

    let tmp_init = &random_iqn();
    let ag = c
        .access_group_init_add(&ag, tmp_init, lsm::InitiatorType::IscsiIqn)
        .unwrap();
    assert_eq!(2, ag.init_ids.len());
    let ag = c
        .access_group_init_add(
            &ag,
            "0x20:00:00:81:23:45:ac:01",
            lsm::InitiatorType::Wwpn,
        )
        .unwrap();
    assert_eq!(lsm::InitiatorType::Mixed, ag.init_type);
    let ag = c
        .access_group_init_del(&ag, tmp_init, lsm::InitiatorType::IscsiIqn)
        .unwrap();
    println!("Updated ag after del init: '{:?}'", ag);
    c.access_group_delete(&ag).unwrap();
    assert!(c.access_groups().unwrap().is_empty());
}

#[test]
fn single_init_ag_delete() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let sys = get_sys(&mut c);
    let init = random_iqn();
    let ag = c
        .access_group_create(
            &random_string("ag_"),
            &init,
            lsm::InitiatorType::IscsiIqn,
            &sys,
        )
        .unwrap();
    assert!(c
        .access_group_init_del(&ag, &init, lsm::InitiatorType::IscsiIqn)
        .is_err());
    c.access_group_delete(&ag).unwrap();
}

#[test]
fn target_ports() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let tps = c.target_ports().unwrap();
    println!("got target ports '{:?}'", tps);
    assert_eq!(5, tps.len());
}

#[test]
fn batteries() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let bs = c.batteries().unwrap();
    println!("got batteries '{:?}'", bs);
    assert_eq!(2, bs.len());
}

#[test]
fn tmo() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    c.time_out_set(10_000).unwrap();
    assert_eq!(10_000, c.time_out_get().unwrap());
}

#[test]
fn cap() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let sys = get_sys(&mut c);
    let cap = c.capabilities(&sys).unwrap();
    println!("got cap '{:?}'", cap);
    assert_eq!(true, cap.is_supported(lsm::Capability::Volumes));
    assert_eq!(true, cap.is_supported(lsm::Capability::DiskVpd83Get));
    assert_eq!(
        false,
        cap.is_supported(lsm::Capability::VolReadCacheSetImpactWrite)
    );
}

#[test]
fn plugin_info() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pi = c.plugin_info().unwrap();
    println!("got plugin_info '{:?}'", pi);
    assert_eq!("Compiled plug-in example", pi.description);
    assert_eq!("simc", pi.name);
}

#[test]
fn close_twice() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    c.close().unwrap();
    match c.close() {
        Err(LsmError::InvalidArgument(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    match c.systems() {
        Err(LsmError::InvalidArgument(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
}

#[test]
fn state_survives_reconnect() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let vol = create_vol(&mut c, &pool, &random_string("vol_"));
    c.close().unwrap();
    let mut c = conn.connect();
    assert_eq!(vec![vol], c.volumes().unwrap());
}

#[test]
fn unknown_job() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    match c.job_status("JOB_ID_99999") {
        Err(LsmError::NotFoundJob(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    assert_eq!(202, c.last_error().unwrap().code);
    match c.job_free("JOB_ID_99999") {
        Err(LsmError::NotFoundJob(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
}

#[test]
fn job_progress_over_wire() {
    let dir = tempfile::tempdir().unwrap();
    let uri = format!(
        "simc://?statefile={}",
        dir.path().join("state.json").display()
    );
    let mut p = RawPlugin::start();
    let info = p.call("plugin_info", json!({"flags": 0}));
    assert_eq!("Compiled plug-in example", info["result"][0]);
    let reply = p.call(
        "plugin_register",
        json!({"uri": uri, "password": null, "timeout": 30000, "flags": 0}),
    );
    assert!(reply["result"].is_null());

    let pools = p.call("pools", json!({"flags": 0}));
    let pool = pools["result"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "lsm_test_aggr")
        .unwrap()
        .clone();
    let reply = p.call(
        "volume_create",
        json!({
            "pool": pool,
            "volume_name": "wire_vol",
            "size_bytes": 1_000_000_000u64,
            "provisioning": 1,
            "flags": 0,
        }),
    );
    let job_id = reply["result"][0].as_str().unwrap().to_string();
    assert!(reply["result"][1].is_null());

    let mut last_pct = 0;
    let mut done = false;
    for _ in 0..100 {
        let st = p.call("job_status", json!({"job_id": job_id, "flags": 0}));
        let status = st["result"][0].as_u64().unwrap();
        let pct = st["result"][1].as_u64().unwrap();
        assert!(pct >= last_pct);
        last_pct = pct;
        if done {
            assert_eq!(2, status);
        }
        if status == 2 {
            done = true;
            assert_eq!(100, pct);
            assert_eq!("Volume", st["result"][2]["class"]);
            assert_eq!("wire_vol", st["result"][2]["name"]);
        }
        if done && pct == 100 {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    assert!(done);

    let free = json!({"job_id": job_id, "flags": 0});
    assert!(p.call("job_free", free.clone())["result"].is_null());
    assert_eq!(202, RawPlugin::error_code(&p.call("job_free", free)));

    let reply = p.call("no_such_method", json!({"flags": 0}));
    assert_eq!(153, RawPlugin::error_code(&reply));
    let reply = p.call("plugin_unregister", json!({"flags": 0}));
    assert!(reply["result"].is_null());
}

#[test]
fn sys_read_cache_pct() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let sys = get_sys(&mut c);
    c.sys_read_cache_pct_set(&sys, 99).unwrap();
    let sys = get_sys(&mut c);
    assert_eq!(99, sys.read_cache_pct);
    assert!(c.sys_read_cache_pct_set(&sys, 101).is_err());
}

#[test]
fn iscsi_auth() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    c.iscsi_chap_auth_set(&random_iqn(), None, None, None, None)
        .unwrap();
}

#[test]
fn vol_mask() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let sys = get_sys(&mut c);
    let ag = c
        .access_group_create(
            &random_string("ag_"),
            &random_iqn(),
            lsm::InitiatorType::IscsiIqn,
            &sys,
        )
        .unwrap();
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let vol = create_vol(&mut c, &pool, &random_string("vol_"));
    c.volume_mask(&vol, &ag).unwrap();
    let query_vols = c.vols_masked_to_ag(&ag).unwrap();
    assert_eq!(vec![vol.clone()], query_vols);
    let query_ags = c.ags_granted_to_vol(&vol).unwrap();
    assert_eq!(vec![ag.clone()], query_ags);
    c.volume_unmask(&vol, &ag).unwrap();
    c.volume_delete(&vol).unwrap();
    c.access_group_delete(&ag).unwrap();
}

#[test]
fn vol_raid_info() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let vol = create_vol(&mut c, &pool, &random_string("vol_"));
    let info = c.vol_raid_info(&vol).unwrap();
    println!("Volume RAID info: '{:?}'", info);
    assert_eq!(RaidType::Raid0, info.raid_type);
    assert_eq!(2, info.disk_count);
    assert_eq!(info.strip_size * 2, info.opt_io_size);
}

#[test]
fn pool_member_info() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pools = c.pools().unwrap();
    for pool in pools {
        let pmi = c.pool_member_info(&pool).unwrap();
        println!("Pool member info for {}: '{:?}'", pool.id, pmi);
        assert!(!pmi.members.is_empty());
    }
}

#[test]
fn vrc() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let sys = get_sys(&mut c);
    let (raid_types, strip_sizes) = c.vol_raid_create_cap_get(&sys).unwrap();
    assert!(raid_types.contains(&RaidType::Raid1));
    assert!(!strip_sizes.is_empty());

    let free_disks: Vec<Disk> = c
        .disks()
        .unwrap()
        .into_iter()
        .filter(|d| d.status & Disk::STATUS_FREE != 0)
        .collect();
    let chose_disks = &free_disks[..2];
    let vol = c
        .vol_raid_create(
            &random_string("vrc_"),
            RaidType::Raid1,
            chose_disks,
            None,
        )
        .unwrap();
    println!("Created RAID volume '{:?}'", vol);
    let info = c.vol_raid_info(&vol).unwrap();
    assert_eq!(RaidType::Raid1, info.raid_type);
    assert_eq!(2, info.disk_count);

    match c.vol_raid_create(
        &random_string("vrc_"),
        RaidType::Raid1,
        chose_disks,
        None,
    ) {
        Err(LsmError::DiskNotFree(_)) => (),
        r => panic!("unexpected result {:?}", r),
    }
    c.volume_delete(&vol).unwrap();
    let free_after = c
        .disks()
        .unwrap()
        .into_iter()
        .filter(|d| d.status & Disk::STATUS_FREE != 0)
        .count();
    assert_eq!(free_disks.len(), free_after);
}

#[test]
fn vci() {
    let conn = TestConn::new();
    let mut c = conn.connect();
    let pool = get_pool(&mut c, "lsm_test_aggr");
    let vol = create_vol(&mut c, &pool, &random_string("vol_"));
    c.vol_phy_disk_cache_set(&vol, CachePolicy::Enabled).unwrap();
    c.vol_write_cache_set(&vol, CachePolicy::Disabled).unwrap();
    c.vol_read_cache_set(&vol, CachePolicy::Disabled).unwrap();
    let info = c.vol_cache_info(&vol).unwrap();
    println!("Volume cache info: '{:?}'", info);
    assert_eq!(CachePolicy::Disabled, info.write_cache_setting);
    assert_eq!(CachePolicy::Disabled, info.write_cache_status);
    assert_eq!(CachePolicy::Disabled, info.read_cache_status);
    assert_eq!(CachePolicy::Enabled, info.physical_disk_cache_status);
    c.vol_ident_led_on(&vol).unwrap();
    c.vol_ident_led_off(&vol).unwrap();
    c.volume_delete(&vol).unwrap();
}

#[test]
fn test_size_human() {
    assert_eq!(lsm::size_human_2_size_bytes("1.9GB"), 1_900_000_000u64);
    assert_eq!(lsm::size_human_2_size_bytes("1KiB"), 1024u64);
    assert_eq!(lsm::size_human_2_size_bytes("1 KiB"), 1024u64);
    assert_eq!(lsm::size_human_2_size_bytes("1 B"), 1u64);
    assert_eq!(lsm::size_human_2_size_bytes("2 K"), 2048u64);
    assert_eq!(lsm::size_human_2_size_bytes("2 k"), 2048u64);
    assert_eq!(lsm::size_human_2_size_bytes("2 KB"), 2000u64);
}
