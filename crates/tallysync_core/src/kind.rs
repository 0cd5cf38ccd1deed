//! Entity kinds.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A synchronizable entity kind.
///
/// The wire identifier of each kind is its snake_case table name
/// (`customers`, `sale_items`, ...). Pull responses key their rows by the
/// camelCase collection name instead (`saleItems`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// Customers.
    Customers,
    /// Catalog products.
    Products,
    /// Sales.
    Sales,
    /// Sale line items.
    SaleItems,
    /// Quotes.
    Quotes,
    /// Quote line items.
    QuoteItems,
    /// Work orders.
    Operations,
    /// Field technicians.
    Technicians,
    /// Materials used by a work order.
    OperationMaterials,
    /// Evidence files attached to a work order.
    OperationEvidences,
    /// Notes on a work order.
    OperationNotes,
    /// Work order status history.
    OperationStatuses,
    /// Employees.
    Employees,
    /// Employee login attempts.
    EmployeeLogins,
    /// Payroll adjustments.
    PayrollAdjustments,
    /// Payroll payments.
    PayrollPayments,
    /// Time clock punches.
    Punches,
}

impl EntityKind {
    /// Every supported kind, in registration order.
    pub const ALL: [EntityKind; 17] = [
        EntityKind::Customers,
        EntityKind::Products,
        EntityKind::Sales,
        EntityKind::SaleItems,
        EntityKind::Quotes,
        EntityKind::QuoteItems,
        EntityKind::Operations,
        EntityKind::Technicians,
        EntityKind::OperationMaterials,
        EntityKind::OperationEvidences,
        EntityKind::OperationNotes,
        EntityKind::OperationStatuses,
        EntityKind::Employees,
        EntityKind::EmployeeLogins,
        EntityKind::PayrollAdjustments,
        EntityKind::PayrollPayments,
        EntityKind::Punches,
    ];

    /// Returns the wire identifier.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customers => "customers",
            EntityKind::Products => "products",
            EntityKind::Sales => "sales",
            EntityKind::SaleItems => "sale_items",
            EntityKind::Quotes => "quotes",
            EntityKind::QuoteItems => "quote_items",
            EntityKind::Operations => "operations",
            EntityKind::Technicians => "technicians",
            EntityKind::OperationMaterials => "operation_materials",
            EntityKind::OperationEvidences => "operation_evidences",
            EntityKind::OperationNotes => "operation_notes",
            EntityKind::OperationStatuses => "operation_statuses",
            EntityKind::Employees => "employees",
            EntityKind::EmployeeLogins => "employee_logins",
            EntityKind::PayrollAdjustments => "payroll_adjustments",
            EntityKind::PayrollPayments => "payroll_payments",
            EntityKind::Punches => "punches",
        }
    }

    /// Returns the collection name used to key pull responses.
    pub const fn collection_name(&self) -> &'static str {
        match self {
            EntityKind::Customers => "customers",
            EntityKind::Products => "products",
            EntityKind::Sales => "sales",
            EntityKind::SaleItems => "saleItems",
            EntityKind::Quotes => "quotes",
            EntityKind::QuoteItems => "quoteItems",
            EntityKind::Operations => "operations",
            EntityKind::Technicians => "technicians",
            EntityKind::OperationMaterials => "operationMaterials",
            EntityKind::OperationEvidences => "operationEvidences",
            EntityKind::OperationNotes => "operationNotes",
            EntityKind::OperationStatuses => "operationStatuses",
            EntityKind::Employees => "employees",
            EntityKind::EmployeeLogins => "employeeLogins",
            EntityKind::PayrollAdjustments => "payrollAdjustments",
            EntityKind::PayrollPayments => "payrollPayments",
            EntityKind::Punches => "punches",
        }
    }

    /// Looks up a kind by its collection name.
    pub fn from_collection_name(name: &str) -> Option<Self> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.collection_name() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }
}

impl Serialize for EntityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
