//! Employees and daily attendance.

use chrono::NaiveDate;
use tracing::{info, instrument};

use shopledger_core::{AttendanceId, EmployeeId};
use shopledger_staff::{AttendanceEntry, AttendanceRecord, Employee, NewAttendance, NewEmployee};

use crate::error::ServiceError;
use crate::store::LedgerStore;

#[derive(Debug, Clone)]
pub struct StaffRoster<S> {
    store: S,
}

impl<S: LedgerStore> StaffRoster<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub async fn hire(&self, new: NewEmployee) -> Result<Employee, ServiceError> {
        let employee = new.into_employee(EmployeeId::new())?;
        self.store.insert_employee(&employee).await?;
        info!(employee_id = %employee.id, "employee registered");
        Ok(employee)
    }

    pub async fn employee(&self, employee_id: EmployeeId) -> Result<Employee, ServiceError> {
        self.store
            .get_employee(employee_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("employee {employee_id}")))
    }

    pub async fn employees(&self) -> Result<Vec<Employee>, ServiceError> {
        Ok(self.store.list_employees().await?)
    }

    /// One record per employee and day; a second one is a `Conflict`.
    #[instrument(skip(self, new), fields(employee_id = %new.employee_id, date = %new.date), err)]
    pub async fn record_attendance(&self, new: NewAttendance) -> Result<AttendanceRecord, ServiceError> {
        let record = new.into_record(AttendanceId::new())?;
        self.employee(record.employee_id).await?;
        self.store.insert_attendance(&record).await?;
        info!(status = record.status.as_str(), "attendance recorded");
        Ok(record)
    }

    pub async fn attendance(&self, date: Option<NaiveDate>) -> Result<Vec<AttendanceEntry>, ServiceError> {
        Ok(self.store.list_attendance(date).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveTime;
    use shopledger_staff::{AttendanceStatus, EmployeeStatus};

    use crate::store::InMemoryLedgerStore;

    fn cashier(name: &str) -> NewEmployee {
        NewEmployee {
            user_id: None,
            name: name.to_string(),
            position: "Cajero".to_string(),
            email: None,
            phone: None,
            address: None,
            join_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            salary: None,
            status: EmployeeStatus::Active,
        }
    }

    fn shift(employee_id: EmployeeId, day: u32) -> NewAttendance {
        NewAttendance {
            employee_id,
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            check_in: NaiveTime::from_hms_opt(8, 0, 0),
            check_out: NaiveTime::from_hms_opt(16, 30, 0),
            status: AttendanceStatus::Present,
            notes: None,
        }
    }

    #[tokio::test]
    async fn attendance_is_listed_with_the_employee_name() {
        let roster = StaffRoster::new(Arc::new(InMemoryLedgerStore::new()));
        let rosa = roster.hire(cashier("Rosa")).await.unwrap();

        let record = roster.record_attendance(shift(rosa.id, 3)).await.unwrap();
        assert_eq!(record.worked_minutes, Some(510));

        let day = roster
            .attendance(NaiveDate::from_ymd_opt(2024, 5, 3))
            .await
            .unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].employee_name, "Rosa");
        assert!(roster.attendance(NaiveDate::from_ymd_opt(2024, 5, 4)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_record_for_the_same_day_conflicts() {
        let roster = StaffRoster::new(Arc::new(InMemoryLedgerStore::new()));
        let rosa = roster.hire(cashier("Rosa")).await.unwrap();
        roster.record_attendance(shift(rosa.id, 3)).await.unwrap();

        let err = roster.record_attendance(shift(rosa.id, 3)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(roster.attendance(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_employee_and_blank_names_are_rejected() {
        let roster = StaffRoster::new(Arc::new(InMemoryLedgerStore::new()));
        let err = roster.record_attendance(shift(EmployeeId::new(), 3)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = roster.hire(cashier("  ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(roster.employees().await.unwrap().is_empty());
    }
}
