//! Staff module (employees and daily attendance).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod attendance;
pub mod employee;

pub use attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus, NewAttendance};
pub use employee::{Employee, EmployeeStatus, NewEmployee};
