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

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde_json::{Map, Number, Value};
use std::env;
use std::io::prelude::{Read, Write};
use std::io::{self, BufReader, BufWriter};
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::str;
use std::thread::sleep;
use std::time::Duration;

use super::error::*;

const IPC_HDR_LEN: usize = 10; // length of u32 max string.
const IPC_JSON_ID: u8 = 100;
const IPC_READ_CHUNK: usize = 64 * 1024;
static UDS_PATH_DEFAULT: &'static str = "/var/run/lsm/ipc";
static UDS_PATH_VAR_NAME: &'static str = "LSM_UDS_PATH";
static PLUGIN_DIR_DEFAULT: &'static str = "/usr/bin";
static PLUGIN_DIR_VAR_NAME: &'static str = "LSM_PLUGIN_DIR";
pub(crate) static PLUGIN_EXEC_SUFFIX: &'static str = "lsmplugin";

const CHILD_EXIT_CHECK_COUNT: u32 = 50;
const CHILD_EXIT_CHECK_INTERVAL: u64 = 10; // milliseconds

pub(crate) fn write_msg<W: Write>(w: &mut W, msg: &str) -> Result<()> {
    let msg =
        format!("{:0padding$}{}", msg.len(), msg, padding = IPC_HDR_LEN);
    w.write_all(msg.as_bytes())?;
    w.flush()?;
    Ok(())
}

// Return `None` if peer closed the channel before a new message.
pub(crate) fn read_msg<R: Read>(r: &mut R) -> Result<Option<String>> {
    let mut hdr = [0u8; IPC_HDR_LEN];
    let mut got = 0;
    while got < IPC_HDR_LEN {
        match r.read(&mut hdr[got..]) {
            Ok(0) if got == 0 => return Ok(None),
            Ok(0) => {
                return Err(LsmError::PluginIpcFail(
                    "IPC channel closed in the middle of message header"
                        .to_string(),
                ))
            }
            Ok(n) => got += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let msg_len = str::from_utf8(&hdr)?.parse::<usize>()?;
    // Buffer grows with the bytes actually received, not with the header.
    let mut msg = Vec::with_capacity(msg_len.min(IPC_READ_CHUNK));
    r.by_ref().take(msg_len as u64).read_to_end(&mut msg)?;
    if msg.len() != msg_len {
        return Err(LsmError::PluginIpcFail(format!(
            "IPC channel closed after {} of {} message bytes",
            msg.len(),
            msg_len
        )));
    }
    Ok(Some(String::from_utf8(msg)?))
}

pub(crate) fn uds_path() -> String {
    match env::var(UDS_PATH_VAR_NAME) {
        Ok(v) => v,
        Err(_) => UDS_PATH_DEFAULT.to_string(),
    }
}

pub(crate) fn plugin_dir() -> String {
    match env::var(PLUGIN_DIR_VAR_NAME) {
        Ok(v) => v,
        Err(_) => PLUGIN_DIR_DEFAULT.to_string(),
    }
}

pub(crate) fn plugin_exec_path(plugin_name: &str) -> PathBuf {
    Path::new(&plugin_dir())
        .join(format!("{}{}", plugin_name, PLUGIN_EXEC_SUFFIX))
}

pub(crate) fn plugin_ipc_path(plugin_name: &str) -> PathBuf {
    Path::new(&uds_path()).join(plugin_name)
}

/// Client side of the IPC channel to one plugin process.
pub(crate) struct TransPort {
    so: UnixStream,
    child: Option<Child>,
    last_error: Option<ErrorInfo>,
}

impl TransPort {
    /// Start plugin executable if found in plugin folder, or else connect to
    /// the socket of libstoragemgmt daemon.
    pub(crate) fn new(plugin_name: &str) -> Result<TransPort> {
        let exec_path = plugin_exec_path(plugin_name);
        if exec_path.is_file() {
            return TransPort::spawn(&exec_path);
        }
        let ipc_path = plugin_ipc_path(plugin_name);
        if ipc_path.exists() {
            return TransPort::connect(&ipc_path);
        }
        Err(LsmError::PluginNotExist(format!(
            "Plugin '{}' not found in '{}' or '{}'",
            plugin_name,
            plugin_dir(),
            uds_path()
        )))
    }

    pub(crate) fn connect(ipc_path: &Path) -> Result<TransPort> {
        let so = match UnixStream::connect(ipc_path) {
            Ok(s) => s,
            Err(ref e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(LsmError::PluginSocketPermission(format!(
                    "Permission denied on socket '{}'",
                    ipc_path.display()
                )))
            }
            Err(e) => {
                return Err(LsmError::DaemonNotRunning(format!(
                    "LibStorageMgmt daemon is not running for \
                     socket '{}': {}",
                    ipc_path.display(),
                    e
                )))
            }
        };
        debug!("Connected to plugin socket {}", ipc_path.display());
        Ok(TransPort {
            so,
            child: None,
            last_error: None,
        })
    }

    // The plugin process speaks on its stdin and stdout which are both
    // connected to one end of a socket pair.
    fn spawn(exec_path: &Path) -> Result<TransPort> {
        let (so, peer) = UnixStream::pair()?;
        let peer_out = peer.try_clone()?;
        let child = Command::new(exec_path)
            .stdin(Stdio::from(OwnedFd::from(peer)))
            .stdout(Stdio::from(OwnedFd::from(peer_out)))
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                LsmError::PluginNotExist(format!(
                    "Failed to start plugin '{}': {}",
                    exec_path.display(),
                    e
                ))
            })?;
        debug!(
            "Started plugin {} with pid {}",
            exec_path.display(),
            child.id()
        );
        Ok(TransPort {
            so,
            child: Some(child),
            last_error: None,
        })
    }

    /// Set the read and write deadline in milliseconds, 0 means wait forever.
    pub(crate) fn set_timeout(&mut self, ms: u32) -> Result<()> {
        let tmo = if ms == 0 {
            None
        } else {
            Some(Duration::from_millis(u64::from(ms)))
        };
        self.so.set_read_timeout(tmo)?;
        self.so.set_write_timeout(tmo)?;
        Ok(())
    }

    pub(crate) fn last_error(&self) -> Option<&ErrorInfo> {
        self.last_error.as_ref()
    }

    pub(crate) fn set_last_error(&mut self, info: ErrorInfo) {
        self.last_error = Some(info);
    }

    fn send(&mut self, msg: &str) -> Result<()> {
        write_msg(&mut self.so, msg)
    }

    fn recv(&mut self) -> Result<String> {
        match read_msg(&mut self.so)? {
            Some(m) => Ok(m),
            None => Err(LsmError::PluginIpcFail(
                "Plugin closed the IPC channel".to_string(),
            )),
        }
    }

    pub(crate) fn invoke(
        &mut self,
        cmd: &str,
        args: Option<Map<String, Value>>,
    ) -> Result<Value> {
        let ret = self.do_invoke(cmd, args);
        if let Err(ref e) = ret {
            if self.last_error.as_ref().map(|i| i.code) != Some(e.code()) {
                self.last_error = Some(ErrorInfo::from_error(e));
            }
        }
        ret
    }

    fn do_invoke(
        &mut self,
        cmd: &str,
        args: Option<Map<String, Value>>,
    ) -> Result<Value> {
        self.last_error = None;
        let mut msg = Map::new();
        msg.insert("method".to_string(), Value::String(cmd.to_string()));
        msg.insert("id".to_string(), Value::Number(Number::from(IPC_JSON_ID)));
        let mut args = args.unwrap_or_default();
        args.insert("flags".to_string(), Value::Number(Number::from(0u8)));
        msg.insert("params".to_string(), Value::Object(args));
        let msg = &serde_json::to_string(&msg)?;
        trace!("Sending {}", msg);
        self.send(msg)?;
        let reply = self.recv()?;
        trace!("Received {}", reply);
        let val: Value = serde_json::from_str(&reply)?;
        let obj = match val.as_object() {
            Some(o) => o,
            None => {
                return Err(LsmError::PluginBug(format!(
                    "Invalid reply from plugin: {}",
                    reply
                )))
            }
        };
        if let Some(e) = obj.get("error") {
            let lsm_err_ipc: LsmErrorIpc = serde_json::from_value(e.clone())?;
            self.last_error = Some(lsm_err_ipc.info());
            return Err(From::from(lsm_err_ipc));
        };
        match obj.get("result") {
            Some(r) => Ok(r.clone()),
            None => Err(LsmError::PluginBug(format!(
                "Got no result from plugin: {}",
                reply
            ))),
        }
    }

    /// Tear down the channel. A spawned plugin gets SIGTERM if it does not
    /// exit on its own shortly after the channel is closed.
    pub(crate) fn shutdown(&mut self) {
        let _ = self.so.shutdown(::std::net::Shutdown::Both);
        if let Some(mut child) = self.child.take() {
            for _ in 0..CHILD_EXIT_CHECK_COUNT {
                match child.try_wait() {
                    Ok(Some(_)) => return,
                    Ok(None) => {
                        sleep(Duration::from_millis(CHILD_EXIT_CHECK_INTERVAL))
                    }
                    Err(_) => break,
                }
            }
            warn!("Plugin process {} did not exit, terminating", child.id());
            let pid = Pid::from_raw(child.id() as i32);
            if let Err(e) = kill(pid, Signal::SIGTERM) {
                warn!("Failed to terminate plugin process: {}", e);
            }
            let _ = child.wait();
        }
    }
}

impl Drop for TransPort {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A request received by plugin.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub id: Value,
    pub params: Map<String, Value>,
}

/// Plugin side of the IPC channel.
pub struct PluginChannel {
    reader: Box<dyn Read>,
    writer: Box<dyn Write>,
}

impl PluginChannel {
    /// Communicate through standard input and output.
    pub fn stdio() -> PluginChannel {
        PluginChannel {
            reader: Box::new(BufReader::new(io::stdin())),
            writer: Box::new(BufWriter::new(io::stdout())),
        }
    }

    /// Communicate through socket file descriptor handed over by
    /// libstoragemgmt daemon.
    ///
    /// # Safety
    ///
    /// The `fd` must be an open socket not owned by anything else in this
    /// process.
    pub unsafe fn from_raw_fd(fd: RawFd) -> Result<PluginChannel> {
        let so = UnixStream::from(OwnedFd::from_raw_fd(fd));
        let so_out = so.try_clone()?;
        Ok(PluginChannel {
            reader: Box::new(BufReader::new(so)),
            writer: Box::new(BufWriter::new(so_out)),
        })
    }

    /// Build from arbitrary reader and writer.
    pub fn new(
        reader: Box<dyn Read>,
        writer: Box<dyn Write>,
    ) -> PluginChannel {
        PluginChannel { reader, writer }
    }

    /// Receive a request, `None` if client closed the channel.
    pub fn recv(&mut self) -> Result<Option<Request>> {
        let msg = match read_msg(&mut self.reader)? {
            Some(m) => m,
            None => return Ok(None),
        };
        let mut val: Value = serde_json::from_str(&msg)?;
        let obj = val.as_object_mut().ok_or_else(|| {
            LsmError::TransportSerialization(format!(
                "Request is not a JSON object: {}",
                msg
            ))
        })?;
        let method = match obj.get("method").and_then(Value::as_str) {
            Some(m) => m.to_string(),
            None => {
                return Err(LsmError::TransportSerialization(format!(
                    "Request has no method: {}",
                    msg
                )))
            }
        };
        let id = obj.remove("id").unwrap_or(Value::Null);
        let params = match obj.remove("params") {
            Some(Value::Object(p)) => p,
            None | Some(Value::Null) => Map::new(),
            Some(p) => {
                return Err(LsmError::TransportSerialization(format!(
                    "Request params is not a JSON object: {}",
                    p
                )))
            }
        };
        Ok(Some(Request { method, id, params }))
    }

    pub fn send_result(&mut self, id: &Value, result: Value) -> Result<()> {
        let msg = json!({"id": id, "result": result});
        write_msg(&mut self.writer, &serde_json::to_string(&msg)?)
    }

    /// Reply an error, including any vendor exception and debug detail.
    pub fn send_error(&mut self, id: &Value, error: &ErrorInfo) -> Result<()> {
        let msg = json!({"id": id, "error": LsmErrorIpc::from(error)});
        write_msg(&mut self.writer, &serde_json::to_string(&msg)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frame_has_ten_digit_header() {
        let mut buf = Vec::new();
        write_msg(&mut buf, "{}").unwrap();
        assert_eq!(b"0000000002{}".to_vec(), buf);

        let mut cur = Cursor::new(buf);
        assert_eq!(Some("{}".to_string()), read_msg(&mut cur).unwrap());
        assert_eq!(None, read_msg(&mut cur).unwrap());
    }

    #[test]
    fn truncated_frame() {
        let mut cur = Cursor::new(b"00000".to_vec());
        assert!(read_msg(&mut cur).is_err());
        let mut cur = Cursor::new(b"0000000010{}".to_vec());
        assert!(read_msg(&mut cur).is_err());
        let mut cur = Cursor::new(b"abcdefghij{}".to_vec());
        match read_msg(&mut cur) {
            Err(LsmError::TransportSerialization(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn oversized_header_with_short_body() {
        let mut cur = Cursor::new(b"9999999999{\"id\": 100}".to_vec());
        match read_msg(&mut cur) {
            Err(LsmError::PluginIpcFail(msg)) => {
                assert!(msg.contains("11 of 9999999999"))
            }
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn plugin_channel_request_and_reply() {
        let mut input = Vec::new();
        write_msg(
            &mut input,
            r#"{"method": "systems", "id": 100, "params": {"flags": 0}}"#,
        )
        .unwrap();
        write_msg(&mut input, r#"[1, 2]"#).unwrap();

        let mut ch = PluginChannel::new(
            Box::new(Cursor::new(input)),
            Box::new(Vec::new()),
        );
        let req = ch.recv().unwrap().unwrap();
        assert_eq!("systems", req.method);
        assert_eq!(json!(100), req.id);
        assert_eq!(Some(&json!(0)), req.params.get("flags"));
        assert!(ch.recv().is_err());
        assert!(ch.recv().unwrap().is_none());
    }

    #[test]
    fn socket_pair_round_trip() {
        let (mut a, mut b) = UnixStream::pair().unwrap();
        write_msg(&mut a, r#"{"result": 1}"#).unwrap();
        assert_eq!(
            Some(r#"{"result": 1}"#.to_string()),
            read_msg(&mut b).unwrap()
        );
    }
}
