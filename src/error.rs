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

use serde_json::{Map, Value};
use std::io;
use std::result;
use thiserror::Error;

macro_rules! lsm_errors {
    ($($(#[$meta:meta])* $name:ident = $code:literal, $summary:expr;)+) => {
        /// Error returned by the client binding, the plugin framework and
        /// plugins. Every variant carries the human readable message and maps
        /// to a stable integer code shared by all LibStorageMgmt
        /// implementations, see [`LsmError::code()`][1].
        ///
        /// [1]: #method.code
        #[derive(Error, Debug, Clone, PartialEq)]
        pub enum LsmError {
            $(
                $(#[$meta])*
                #[error("{0}")]
                $name(String),
            )+
        }

        impl LsmError {
            /// The integer error code used on the wire.
            pub fn code(&self) -> i32 {
                match *self {
                    $(LsmError::$name(_) => $code,)+
                }
            }

            /// Generic description of this kind of error.
            pub fn summary(&self) -> &'static str {
                match *self {
                    $(LsmError::$name(_) => $summary,)+
                }
            }

            /// Build error from wire error code. Unknown code is treated as
            /// library bug.
            pub fn from_code(code: i32, msg: &str) -> LsmError {
                match code {
                    $($code => LsmError::$name(msg.to_string()),)+
                    _ => LsmError::LibBug(format!(
                        "Invalid error code {}: {}",
                        code, msg
                    )),
                }
            }
        }
    };
}

lsm_errors! {
    LibBug = 1, "Library bug";
    PluginBug = 2, "Plugin bug";
    TimeOut = 11, "Timeout";
    DaemonNotRunning = 12, "LibStoragemgmt daemon is not running";
    PermissionDenied = 13, "Permission denied";
    NameConflict = 50, "Name conflict";
    ExistsInitiator = 52, "Initiator exists and in use";
    /// Also returned when using a closed [`Client`](struct.Client.html).
    InvalidArgument = 101, "Invalid argument";
    NoStateChange = 125, "No state change";
    NetworkConRefused = 140, "Network connection refused";
    NetworkHostDown = 141, "Network host down";
    NetworkError = 142, "Network error";
    NoMemory = 152, "Plugin ran out of memory";
    NoSupport = 153, "Not supported";
    IsMasked = 160, "Volume masked to access group";
    HasChildDependency = 161, "Volume or file system has child dependency";
    NotFoundAccessGroup = 200, "Access group not found";
    NotFoundFs = 201, "File system not found";
    NotFoundJob = 202, "Job not found";
    NotFoundPool = 203, "Pool not found";
    NotFoundFsSnapshot = 204, "File system snapshot not found";
    NotFoundVolume = 205, "Volume not found";
    NotFoundNfsExport = 206, "NFS export not found";
    NotFoundSystem = 208, "System not found";
    NotFoundDisk = 209, "Disk not found";
    NotLicensed = 226, "Specified feature is not licensed in storage system";
    NoSupportOnlineChange = 250,
        "Specified action require item in offline mode";
    NoSupportOfflineChange = 251,
        "Specified action require item in online mode";
    PluginAuthFailed = 300, "Authentication failed in plugin";
    PluginIpcFail = 301, "IPC communication to plugin failed";
    PluginSocketPermission = 307,
        "Permission deny on IPC communication to plugin";
    PluginNotExist = 311, "Specified plugin does not exist";
    NoEnoughSpace = 350, "No enough space";
    TransportCommunication = 400, "Error when communicating with plug-in";
    TransportSerialization = 401, "Incorrect transport serialization";
    TransportInvalidArg = 402, "Invalid transport argument";
    LastInitInAccessGroup = 502,
        "Refused to remove the last initiator from access group";
    UnSupportedSearchKey = 510, "Specified search key is not supported";
    EmptyAccessGroup = 511, "Refused to mask volume to empty access group";
    PoolNotReady = 512, "Pool is not ready for specified action";
    DiskNotFree = 513, "Disk is not free for specified action";
}

pub type Result<T> = result::Result<T, LsmError>;

impl From<::std::string::FromUtf8Error> for LsmError {
    fn from(e: ::std::string::FromUtf8Error) -> Self {
        LsmError::TransportSerialization(format!(
            "Failed to convert IPC message to UTF-8 string: {}",
            e
        ))
    }
}

impl From<::std::num::ParseIntError> for LsmError {
    fn from(e: ::std::num::ParseIntError) -> Self {
        LsmError::TransportSerialization(format!(
            "Failed to convert IPC message to UTF-8 integer: {}",
            e
        ))
    }
}

impl From<::std::str::Utf8Error> for LsmError {
    fn from(e: ::std::str::Utf8Error) -> Self {
        LsmError::TransportSerialization(format!(
            "Failed to convert IPC message to UTF-8 string: {}",
            e
        ))
    }
}

impl From<::serde_json::Error> for LsmError {
    fn from(e: ::serde_json::Error) -> Self {
        LsmError::TransportSerialization(format!(
            "Failed to convert IPC message to libstoragemgmt \
             struct: {}",
            e
        ))
    }
}

impl From<io::Error> for LsmError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                LsmError::TimeOut(format!("Plugin reply timeout: {}", e))
            }
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => LsmError::PluginIpcFail(
                format!("IPC channel to plugin is broken: {}", e),
            ),
            _ => LsmError::TransportCommunication(format!("{}", e)),
        }
    }
}

impl From<::regex::Error> for LsmError {
    fn from(e: ::regex::Error) -> Self {
        LsmError::LibBug(format!("Regex error: {}", e))
    }
}

impl From<::url::ParseError> for LsmError {
    fn from(e: ::url::ParseError) -> Self {
        LsmError::InvalidArgument(format!("Failed to parse URI: {}", e))
    }
}

impl From<::nix::Error> for LsmError {
    fn from(e: ::nix::Error) -> Self {
        LsmError::PluginBug(format!("System call failed: {}", e))
    }
}

/// Detailed error information of the last failed call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorInfo {
    /// Integer error code.
    pub code: i32,
    /// Human friendly error message.
    pub message: String,
    /// Vendor specific exception text.
    pub exception: Option<String>,
    /// Debug text.
    pub debug: Option<String>,
    /// Opaque debug data.
    pub debug_data: Option<Vec<u8>>,
}

impl ErrorInfo {
    /// Error information without any vendor or debug detail. Plugins fill
    /// in the rest with struct update syntax:
    ///
    /// ```rust
    /// use lsm::{ErrorInfo, LsmError};
    ///
    /// let e = LsmError::PluginBug("Array firmware crashed".to_string());
    /// let info = ErrorInfo {
    ///     exception: Some("FW_PANIC 0x1f".to_string()),
    ///     ..ErrorInfo::from_error(&e)
    /// };
    /// assert_eq!(e, info.error());
    /// ```
    pub fn from_error(e: &LsmError) -> ErrorInfo {
        ErrorInfo {
            code: e.code(),
            message: e.to_string(),
            ..Default::default()
        }
    }

    /// The `LsmError` of this code and message.
    pub fn error(&self) -> LsmError {
        LsmError::from_code(self.code, &self.message)
    }
}

// Error object on the wire:
//  {"code": 205, "message": "...", "data": null | "debug text" |
//   {"exception": "...", "debug": "...", "debug_data": [u8, ...]}}
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct LsmErrorIpc {
    pub(crate) code: i32,
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) data: Option<Value>,
}

impl LsmErrorIpc {
    pub(crate) fn info(&self) -> ErrorInfo {
        let mut info = ErrorInfo {
            code: self.code,
            message: self.message.clone(),
            ..Default::default()
        };
        match self.data {
            Some(Value::String(ref s)) => info.debug = Some(s.clone()),
            Some(Value::Object(ref o)) => {
                info.exception = o
                    .get("exception")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                info.debug =
                    o.get("debug").and_then(Value::as_str).map(str::to_string);
                info.debug_data = o
                    .get("debug_data")
                    .and_then(|v| serde_json::from_value(v.clone()).ok());
            }
            _ => (),
        };
        info
    }
}

impl<'a> From<&'a ErrorInfo> for LsmErrorIpc {
    fn from(info: &'a ErrorInfo) -> Self {
        let mut data = Map::new();
        if let Some(ref s) = info.exception {
            data.insert("exception".to_string(), Value::String(s.clone()));
        }
        if let Some(ref s) = info.debug {
            data.insert("debug".to_string(), Value::String(s.clone()));
        }
        if let Some(ref d) = info.debug_data {
            data.insert(
                "debug_data".to_string(),
                Value::Array(d.iter().map(|b| Value::from(*b)).collect()),
            );
        }
        LsmErrorIpc {
            code: info.code,
            message: info.message.clone(),
            data: if data.is_empty() {
                None
            } else {
                Some(Value::Object(data))
            },
        }
    }
}

impl From<LsmErrorIpc> for LsmError {
    fn from(e: LsmErrorIpc) -> Self {
        LsmError::from_code(e.code, &e.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip_keeps_kind_and_message() {
        let e = LsmError::NotFoundJob("Job not found".to_string());
        assert_eq!(202, e.code());
        assert_eq!(e, LsmError::from_code(e.code(), "Job not found"));
        assert_eq!("Job not found", format!("{}", e));
    }

    #[test]
    fn unknown_code_is_lib_bug() {
        match LsmError::from_code(9999, "boom") {
            LsmError::LibBug(msg) => assert!(msg.contains("9999")),
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn wire_codes_are_stable() {
        let pairs: [(LsmError, i32); 8] = [
            (LsmError::LibBug(String::new()), 1),
            (LsmError::TimeOut(String::new()), 11),
            (LsmError::InvalidArgument(String::new()), 101),
            (LsmError::NoSupport(String::new()), 153),
            (LsmError::HasChildDependency(String::new()), 161),
            (LsmError::NoEnoughSpace(String::new()), 350),
            (LsmError::TransportInvalidArg(String::new()), 402),
            (LsmError::DiskNotFree(String::new()), 513),
        ];
        for (e, code) in pairs.iter() {
            assert_eq!(*code, e.code());
        }
    }

    #[test]
    fn ipc_error_detail_parsing() {
        let raw = r#"{"code": 205, "message": "no vol",
                      "data": {"exception": "VendorErr", "debug": "trace",
                               "debug_data": [1, 2, 3]}}"#;
        let ipc: LsmErrorIpc = serde_json::from_str(raw).unwrap();
        let info = ipc.info();
        assert_eq!(Some("VendorErr".to_string()), info.exception);
        assert_eq!(Some("trace".to_string()), info.debug);
        assert_eq!(Some(vec![1u8, 2, 3]), info.debug_data);
        match LsmError::from(ipc) {
            LsmError::NotFoundVolume(m) => assert_eq!("no vol", m),
            e => panic!("unexpected error {:?}", e),
        }

        let back = LsmErrorIpc::from(&info);
        assert_eq!(info, back.info());
    }

    #[test]
    fn io_timeout_maps_to_timeout() {
        let e: LsmError =
            io::Error::new(io::ErrorKind::WouldBlock, "slow").into();
        assert_eq!(11, e.code());
        let e: LsmError =
            io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert_eq!(301, e.code());
    }
}
