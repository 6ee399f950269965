use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, EmployeeId, Entity, Money, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
    Vacation,
}

impl EmployeeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Inactive => "inactive",
            EmployeeStatus::Vacation => "vacation",
        }
    }
}

impl core::str::FromStr for EmployeeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EmployeeStatus::Active),
            "inactive" => Ok(EmployeeStatus::Inactive),
            "vacation" => Ok(EmployeeStatus::Vacation),
            other => Err(DomainError::validation(format!("unknown employee status '{other}'"))),
        }
    }
}

/// Staff member. `user_id` links the employee to an operator login, when one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub user_id: Option<UserId>,
    pub name: String,
    pub position: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub join_date: NaiveDate,
    /// Monthly salary.
    pub salary: Option<Money>,
    pub status: EmployeeStatus,
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub join_date: NaiveDate,
    #[serde(default)]
    pub salary: Option<Money>,
    #[serde(default)]
    pub status: EmployeeStatus,
}

impl NewEmployee {
    pub fn into_employee(self, id: EmployeeId) -> DomainResult<Employee> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.position.trim().is_empty() {
            return Err(DomainError::validation("position cannot be empty"));
        }
        if self.salary.is_some_and(Money::is_negative) {
            return Err(DomainError::validation("salary cannot be negative"));
        }
        Ok(Employee {
            id,
            user_id: self.user_id,
            name: self.name.trim().to_string(),
            position: self.position.trim().to_string(),
            email: self.email,
            phone: self.phone,
            address: self.address,
            join_date: self.join_date,
            salary: self.salary,
            status: self.status,
        })
    }
}
