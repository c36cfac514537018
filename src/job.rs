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

use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

use super::data::{DataType, Record};
use super::error::*;

const JOB_STATUS_INPROGRESS: u32 = 1;
const JOB_STATUS_COMPLETE: u32 = 2;
const JOB_STATUS_ERROR: u32 = 3;

const JOB_ID_PREFIX: &str = "JOB_ID";

/// State of a job. `Complete` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    InProgress,
    Complete,
    Error,
}

impl JobState {
    pub(crate) fn to_int(self) -> u32 {
        match self {
            JobState::InProgress => JOB_STATUS_INPROGRESS,
            JobState::Complete => JOB_STATUS_COMPLETE,
            JobState::Error => JOB_STATUS_ERROR,
        }
    }

    pub(crate) fn from_int(i: u32) -> Result<JobState> {
        match i {
            JOB_STATUS_INPROGRESS => Ok(JobState::InProgress),
            JOB_STATUS_COMPLETE => Ok(JobState::Complete),
            JOB_STATUS_ERROR => Ok(JobState::Error),
            _ => Err(LsmError::PluginBug(format!(
                "Got invalid job status {}",
                i
            ))),
        }
    }
}

/// Job status reported by plugin.
///
/// The `data` is only meaningful when `state` is `JobState::Complete`, the
/// `error` and `error_detail` only when `state` is `JobState::Error`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    /// Percentage of completion, `0..=100`.
    pub percent: u8,
    pub data: Option<Record>,
    pub error: Option<LsmError>,
    /// Vendor exception and debug information of the failure, if plugin
    /// provided any.
    pub error_detail: Option<ErrorInfo>,
}

impl JobStatus {
    pub fn in_progress(percent: u8) -> JobStatus {
        JobStatus {
            state: JobState::InProgress,
            percent,
            data: None,
            error: None,
            error_detail: None,
        }
    }

    pub fn complete(data: Option<Record>) -> JobStatus {
        JobStatus {
            state: JobState::Complete,
            percent: 100,
            data,
            error: None,
            error_detail: None,
        }
    }

    pub fn failed(error: LsmError) -> JobStatus {
        JobStatus {
            state: JobState::Error,
            percent: 100,
            data: None,
            error: Some(error),
            error_detail: None,
        }
    }

    /// Failed job with vendor exception or debug information.
    pub fn failed_with_detail(info: ErrorInfo) -> JobStatus {
        let mut status = JobStatus::failed(info.error());
        status.error_detail = Some(info);
        status
    }

    // Wire layout: [status, percent, data | error]
    pub(crate) fn to_value(&self) -> Result<Value> {
        let data = match (self.state, &self.data, &self.error) {
            (JobState::Error, _, Some(e)) => {
                let info = match &self.error_detail {
                    Some(i) => i.clone(),
                    None => ErrorInfo::from_error(e),
                };
                serde_json::to_value(LsmErrorIpc::from(&info))?
            }
            (JobState::Complete, Some(r), _) => r.to_value()?,
            _ => Value::Null,
        };
        Ok(json!([self.state.to_int(), self.percent, data]))
    }

    // Decode reply of `job_status`. When `expected` is `None` the record
    // type is taken from its `class` tag.
    pub(crate) fn from_value(
        val: Value,
        expected: Option<DataType>,
    ) -> Result<JobStatus> {
        let (status, percent, data): (u32, u8, Value) =
            serde_json::from_value(val)?;
        let state = JobState::from_int(status)?;
        if percent > 100 {
            return Err(LsmError::PluginBug(format!(
                "Got invalid job percent {}",
                percent
            )));
        }
        Ok(match state {
            JobState::InProgress => JobStatus::in_progress(percent),
            JobState::Complete => JobStatus::complete(match expected {
                Some(t) => Record::from_value(data, t)?,
                None => Record::from_tagged_value(data)?,
            }),
            JobState::Error => {
                if data.is_null() {
                    return Ok(JobStatus::failed(LsmError::PluginBug(
                        "Job failed without error detail".to_string(),
                    )));
                }
                let ipc: LsmErrorIpc = serde_json::from_value(data)?;
                let mut status = if ipc.data.is_some() {
                    JobStatus::failed_with_detail(ipc.info())
                } else {
                    JobStatus::failed(ipc.into())
                };
                status.percent = percent;
                status
            }
        })
    }
}

/// Compute job state and percentage from creation time and configured
/// duration, all in seconds. Zero duration means the job is already done.
pub fn progress(now: f64, created: f64, duration: f64) -> (JobState, u8) {
    if duration <= 0.0 {
        (JobState::Complete, 100)
    } else if now <= created {
        (JobState::InProgress, 0)
    } else if now - created >= duration {
        (JobState::Complete, 100)
    } else {
        let pct = ((now - created) / duration * 100.0) as u8;
        (JobState::InProgress, pct.min(99))
    }
}

/// Seconds since UNIX epoch.
pub fn now() -> f64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(_) => 0.0,
    }
}

/// A job tracked by [`JobTable`](struct.JobTable.html).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobEntry {
    pub id: String,
    pub created: f64,
    pub duration: f64,
    /// Type of the job result.
    pub data_type: DataType,
    /// Job result in wire layout, fixed when job is created.
    #[serde(default)]
    pub data: Value,
}

impl JobEntry {
    pub fn progress(&self, now: f64) -> (JobState, u8) {
        progress(now, self.created, self.duration)
    }

    /// Status of job at `now`.
    pub fn status(&self, now: f64) -> Result<JobStatus> {
        Ok(match self.progress(now) {
            (JobState::Complete, _) => JobStatus::complete(Record::from_value(
                self.data.clone(),
                self.data_type,
            )?),
            (_, percent) => JobStatus::in_progress(percent),
        })
    }
}

/// Job storage for plugins. Serializable so plugin could persist it along
/// with other state.
///
/// Job IDs are never reused by the same table. Jobs are kept until
/// [`JobTable::free()`][1].
///
/// [1]: #method.free
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct JobTable {
    last_id: u64,
    jobs: Vec<JobEntry>,
}

impl JobTable {
    pub fn new() -> JobTable {
        JobTable::default()
    }

    /// Create a job holding `data` as its result and return its ID.
    pub fn create(
        &mut self,
        data: Option<&Record>,
        duration: f64,
    ) -> Result<String> {
        self.create_at(now(), data, duration)
    }

    pub fn create_at(
        &mut self,
        created: f64,
        data: Option<&Record>,
        duration: f64,
    ) -> Result<String> {
        let (data_type, data) = match data {
            Some(r) => (r.data_type(), r.to_value()?),
            None => (DataType::None, Value::Null),
        };
        self.last_id += 1;
        let id = format!("{}_{:05}", JOB_ID_PREFIX, self.last_id);
        debug!("Created job {} of {:?}, duration {}s", id, data_type, duration);
        self.jobs.push(JobEntry {
            id: id.clone(),
            created,
            duration,
            data_type,
            data,
        });
        Ok(id)
    }

    pub fn get(&self, job_id: &str) -> Result<&JobEntry> {
        self.jobs.iter().find(|j| j.id == job_id).ok_or_else(|| {
            LsmError::NotFoundJob(format!("Job {} not found", job_id))
        })
    }

    /// Release the job. Any later query of the same ID fails with
    /// [`LsmError::NotFoundJob`][1].
    ///
    /// [1]: enum.LsmError.html#variant.NotFoundJob
    pub fn free(&mut self, job_id: &str) -> Result<()> {
        let index = self
            .jobs
            .iter()
            .position(|j| j.id == job_id)
            .ok_or_else(|| {
                LsmError::NotFoundJob(format!("Job {} not found", job_id))
            })?;
        self.jobs.remove(index);
        debug!("Freed job {}", job_id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Volume;

    #[test]
    fn zero_duration_is_complete() {
        assert_eq!((JobState::Complete, 100), progress(10.0, 10.0, 0.0));
    }

    #[test]
    fn progress_is_monotonic() {
        let created = 1000.0;
        let duration = 3.0;
        let mut last = (JobState::InProgress, 0u8);
        let mut now = created - 1.0;
        while now < created + duration + 2.0 {
            let cur = progress(now, created, duration);
            if last.0 == JobState::Complete {
                assert_eq!(JobState::Complete, cur.0);
            }
            assert!(cur.1 >= last.1);
            last = cur;
            now += 0.05;
        }
        assert_eq!((JobState::Complete, 100), last);
    }

    #[test]
    fn half_way() {
        assert_eq!((JobState::InProgress, 50), progress(11.0, 10.0, 2.0));
        assert_eq!((JobState::InProgress, 0), progress(9.0, 10.0, 2.0));
        assert_eq!((JobState::Complete, 100), progress(12.0, 10.0, 2.0));
    }

    #[test]
    fn free_twice_is_not_found() {
        let mut table = JobTable::new();
        let id = table.create(None, 0.0).unwrap();
        assert_eq!("JOB_ID_00001", id);
        assert!(table.get(&id).is_ok());
        table.free(&id).unwrap();
        match table.free(&id) {
            Err(LsmError::NotFoundJob(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        assert!(table.get(&id).is_err());

        // Freed ID is not reused
        assert_eq!("JOB_ID_00002", table.create(None, 0.0).unwrap());
    }

    #[test]
    fn finished_job_keeps_its_result() {
        let mut table = JobTable::new();
        let vol = Volume::new("VOL_ID_00001", "v", 512, 8, "sim-01", "P");
        let id = table
            .create_at(10.0, Some(&Record::Volume(vol.clone())), 2.0)
            .unwrap();
        let job = table.get(&id).unwrap();
        assert_eq!(JobStatus::in_progress(50), job.status(11.0).unwrap());
        let done = JobStatus::complete(Some(Record::Volume(vol)));
        assert_eq!(done, job.status(12.0).unwrap());
        assert_eq!(done, job.status(100.0).unwrap());
        assert_eq!(DataType::Volume, job.data_type);
    }

    #[test]
    fn unknown_job_id() {
        let table = JobTable::new();
        match table.get("JOB_ID_99999") {
            Err(LsmError::NotFoundJob(_)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn status_wire_round_trip() {
        let vol = Volume::new("VOL_ID_00001", "v", 512, 8, "sim-01", "P");
        let status = JobStatus::complete(Some(Record::Volume(vol)));
        let val = status.to_value().unwrap();
        assert_eq!(2, val[0]);
        let back =
            JobStatus::from_value(val.clone(), Some(DataType::Volume)).unwrap();
        assert_eq!(status, back);
        assert_eq!(status, JobStatus::from_value(val.clone(), None).unwrap());
        assert!(JobStatus::from_value(val, Some(DataType::FileSystem)).is_err());

        let failed =
            JobStatus::failed(LsmError::NotFoundVolume("gone".to_string()));
        let back = JobStatus::from_value(failed.to_value().unwrap(), None);
        assert_eq!(failed, back.unwrap());

        let failed = JobStatus::failed_with_detail(ErrorInfo {
            debug: Some("disk 3 offline".to_string()),
            ..ErrorInfo::from_error(&LsmError::PluginBug("io".to_string()))
        });
        let back = JobStatus::from_value(failed.to_value().unwrap(), None);
        assert_eq!(failed, back.unwrap());
    }
}
