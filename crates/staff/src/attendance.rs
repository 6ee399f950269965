//! Daily attendance: one record per employee and day.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use shopledger_core::{AttendanceId, DomainError, DomainResult, EmployeeId, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::HalfDay => "halfday",
        }
    }
}

impl core::str::FromStr for AttendanceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "halfday" => Ok(AttendanceStatus::HalfDay),
            other => Err(DomainError::validation(format!("unknown attendance status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    /// Minutes between check-in and check-out, once both are known.
    pub worked_minutes: Option<i64>,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

impl Entity for AttendanceRecord {
    type Id = AttendanceId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Attendance listing row: the record with the employee's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub employee_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttendance {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    #[serde(default)]
    pub check_in: Option<NaiveTime>,
    #[serde(default)]
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewAttendance {
    pub fn into_record(self, id: AttendanceId) -> DomainResult<AttendanceRecord> {
        let worked_minutes = match (self.status, self.check_in, self.check_out) {
            (AttendanceStatus::Absent, Some(_), _) | (AttendanceStatus::Absent, _, Some(_)) => {
                return Err(DomainError::validation("an absence cannot carry check-in times"));
            }
            (_, None, Some(_)) => {
                return Err(DomainError::validation("check-out requires a check-in"));
            }
            (_, Some(check_in), Some(check_out)) => {
                if check_out < check_in {
                    return Err(DomainError::validation("check-out is before check-in"));
                }
                Some((check_out - check_in).num_minutes())
            }
            _ => None,
        };

        Ok(AttendanceRecord {
            id,
            employee_id: self.employee_id,
            date: self.date,
            check_in: self.check_in,
            check_out: self.check_out,
            worked_minutes,
            status: self.status,
            notes: self.notes,
        })
    }
}
