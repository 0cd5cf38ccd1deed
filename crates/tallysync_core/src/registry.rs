//! Payload schemas of every entity kind.

use crate::kind::EntityKind;
use crate::schema::{CreateDefault, FieldSpec, FieldType, KindSchema};

const fn text(min: usize, max: usize) -> FieldType {
    FieldType::Text { min, max }
}

const EMAIL: FieldType = FieldType::Email { max: 320 };
const ID: FieldType = FieldType::Uuid;
const MONEY: FieldType = FieldType::Money;
const BOOL: FieldType = FieldType::Bool;
const TIME: FieldType = FieldType::Timestamp;

const CUSTOMERS: &[FieldSpec] = &[
    FieldSpec::required("name", text(1, 200)),
    FieldSpec::nullable("email", EMAIL),
    FieldSpec::nullable("phone", text(1, 50)),
    FieldSpec::nullable("address", text(1, 500)),
];

const PRODUCTS: &[FieldSpec] = &[
    FieldSpec::required("name", text(1, 200)),
    FieldSpec::nullable("sku", text(1, 100)),
    FieldSpec::required("price", MONEY),
    FieldSpec::optional("stock", MONEY).keep(CreateDefault::ZeroMoney),
    FieldSpec::nullable("imageUrl", text(1, 2000)).keep(CreateDefault::Null),
];

const SALES: &[FieldSpec] = &[
    FieldSpec::nullable("customerId", ID),
    FieldSpec::nullable("employeeId", ID),
    FieldSpec::nullable("code", text(1, 100)),
    FieldSpec::required("total", MONEY),
    FieldSpec::optional("profit", MONEY).keep(CreateDefault::ZeroMoney),
    FieldSpec::optional("points", MONEY).keep(CreateDefault::ZeroMoney),
    FieldSpec::nullable("currency", text(1, 10)).keep(CreateDefault::Text("DOP")),
    FieldSpec::optional("saleAt", TIME).defaults_to_created_at(),
    FieldSpec::nullable("note", text(0, 500)),
];

const SALE_ITEMS: &[FieldSpec] = &[
    FieldSpec::required("saleId", ID),
    FieldSpec::nullable("productId", ID),
    FieldSpec::nullable("code", text(1, 100)),
    FieldSpec::required("name", text(1, 200)),
    FieldSpec::required("qty", MONEY),
    FieldSpec::required("price", MONEY),
    FieldSpec::required("cost", MONEY),
];

const QUOTES: &[FieldSpec] = &[
    FieldSpec::nullable("customerId", ID),
    FieldSpec::nullable("code", text(1, 100)),
    FieldSpec::required("total", MONEY),
    FieldSpec::required("currency", text(1, 10)),
    FieldSpec::required("status", text(1, 100)),
    FieldSpec::nullable("notes", text(0, 1000)),
    FieldSpec::required("itbisActive", BOOL),
    FieldSpec::required("itbisRate", FieldType::Rate),
    FieldSpec::required("discountGlobal", MONEY),
];

const QUOTE_ITEMS: &[FieldSpec] = &[
    FieldSpec::required("quoteId", ID),
    FieldSpec::nullable("productId", ID),
    FieldSpec::nullable("code", text(1, 100)),
    FieldSpec::required("name", text(1, 200)),
    FieldSpec::required("price", MONEY),
    FieldSpec::required("qty", MONEY),
    FieldSpec::required("discount", MONEY),
];

const OPERATIONS: &[FieldSpec] = &[
    FieldSpec::nullable("customerId", ID),
    FieldSpec::required("code", text(1, 100)),
    FieldSpec::nullable("title", text(0, 200)),
    FieldSpec::required("serviceType", text(1, 200)),
    FieldSpec::required("priority", text(1, 100)),
    FieldSpec::required("status", text(1, 100)),
    FieldSpec::nullable("technicianId", ID),
    FieldSpec::nullable("technicianEmployeeId", ID),
    FieldSpec::nullable("scheduledAt", TIME),
    FieldSpec::nullable("estimatedTime", text(0, 100)),
    FieldSpec::nullable("serviceAddress", text(0, 500)),
    FieldSpec::nullable("locationRef", text(0, 500)),
    FieldSpec::nullable("description", text(0, 2000)),
    FieldSpec::nullable("initialObservations", text(0, 2000)),
    FieldSpec::nullable("finalObservations", text(0, 2000)),
    FieldSpec::nullable("amount", MONEY),
    FieldSpec::nullable("paymentMethod", text(0, 100)),
    FieldSpec::nullable("paymentStatus", text(0, 100)),
    FieldSpec::nullable("paymentPaidAmount", MONEY),
    FieldSpec::optional("chkArrived", BOOL).keep(CreateDefault::False),
    FieldSpec::optional("chkMaterialInstalled", BOOL).keep(CreateDefault::False),
    FieldSpec::optional("chkSystemTested", BOOL).keep(CreateDefault::False),
    FieldSpec::optional("chkClientTrained", BOOL).keep(CreateDefault::False),
    FieldSpec::optional("chkWorkCompleted", BOOL).keep(CreateDefault::False),
    FieldSpec::nullable("warrantyType", text(0, 100)),
    FieldSpec::nullable("warrantyExpiresAt", TIME),
    FieldSpec::nullable("finishedAt", TIME),
];

const TECHNICIANS: &[FieldSpec] = &[
    FieldSpec::required("name", text(1, 200)),
    FieldSpec::nullable("phone", text(0, 50)),
    FieldSpec::required("specialty", text(1, 200)),
    FieldSpec::required("status", text(1, 50)),
];

const OPERATION_MATERIALS: &[FieldSpec] = &[
    FieldSpec::required("operationId", ID),
    FieldSpec::required("name", text(1, 200)),
];

const OPERATION_EVIDENCES: &[FieldSpec] = &[
    FieldSpec::required("operationId", ID),
    FieldSpec::required("type", text(1, 100)),
    FieldSpec::required("filePath", text(1, 2000)),
];

const OPERATION_NOTES: &[FieldSpec] = &[
    FieldSpec::required("operationId", ID),
    FieldSpec::nullable("employeeId", ID),
    FieldSpec::required("note", text(1, 2000)),
];

const OPERATION_STATUSES: &[FieldSpec] = &[
    FieldSpec::required("operationId", ID),
    FieldSpec::nullable("fromStatus", text(0, 100)),
    FieldSpec::required("toStatus", text(1, 100)),
    FieldSpec::nullable("employeeId", ID),
];

const EMPLOYEES: &[FieldSpec] = &[
    FieldSpec::required("name", text(1, 200)),
    FieldSpec::nullable("username", text(1, 100)),
    FieldSpec::required("role", text(1, 100)),
    FieldSpec::nullable("email", EMAIL),
    FieldSpec::nullable("passwordLegacy", text(0, 200)),
    FieldSpec::nullable("passwordHash", text(0, 200)),
    FieldSpec::nullable("passwordSalt", text(0, 200)),
    FieldSpec::nullable("cedula", text(0, 100)),
    FieldSpec::nullable("address", text(0, 500)),
    FieldSpec::nullable("salaryBiweekly", MONEY),
    FieldSpec::nullable("goalBiweekly", MONEY),
    FieldSpec::optional("employeeOfMonth", BOOL).keep(CreateDefault::False),
    FieldSpec::nullable("hireDate", TIME),
    FieldSpec::nullable("curriculumPath", text(0, 1000)),
    FieldSpec::nullable("licensePath", text(0, 1000)),
    FieldSpec::nullable("idCardPhotoPath", text(0, 1000)),
    FieldSpec::nullable("lastJobPath", text(0, 1000)),
    FieldSpec::optional("blocked", BOOL).keep(CreateDefault::False),
    FieldSpec::nullable("lastLoginAt", TIME),
];

const EMPLOYEE_LOGINS: &[FieldSpec] = &[
    FieldSpec::required("employeeId", ID),
    FieldSpec::required("time", TIME),
    FieldSpec::required("success", BOOL),
];

const PAYROLL_ADJUSTMENTS: &[FieldSpec] = &[
    FieldSpec::required("employeeId", ID),
    FieldSpec::required("periodStart", TIME),
    FieldSpec::required("periodEnd", TIME),
    FieldSpec::required("type", text(1, 100)),
    FieldSpec::required("amount", MONEY),
    FieldSpec::nullable("note", text(0, 1000)),
];

const PAYROLL_PAYMENTS: &[FieldSpec] = &[
    FieldSpec::required("employeeId", ID),
    FieldSpec::required("periodStart", TIME),
    FieldSpec::required("periodEnd", TIME),
    FieldSpec::required("paidAt", TIME),
    FieldSpec::required("baseSalary", MONEY),
    FieldSpec::required("commission", MONEY),
    FieldSpec::required("adjustments", MONEY),
    FieldSpec::required("net", MONEY),
    FieldSpec::required("status", text(1, 100)),
];

const PUNCHES: &[FieldSpec] = &[
    FieldSpec::nullable("employeeId", ID),
    FieldSpec::required("type", text(1, 100)),
    FieldSpec::required("time", TIME),
    FieldSpec::nullable("location", text(0, 500)),
];

const fn schema(kind: EntityKind, fields: &'static [FieldSpec]) -> KindSchema {
    KindSchema {
        kind,
        fields,
        accepts_created_at: true,
        accepts_updated_at: false,
    }
}

/// Returns the payload schema of a kind.
pub fn schema_for(kind: EntityKind) -> &'static KindSchema {
    const CUSTOMER_SCHEMA: KindSchema = KindSchema {
        accepts_created_at: false,
        ..schema(EntityKind::Customers, CUSTOMERS)
    };
    const PRODUCT_SCHEMA: KindSchema = KindSchema {
        accepts_created_at: false,
        ..schema(EntityKind::Products, PRODUCTS)
    };
    const SALE_SCHEMA: KindSchema = schema(EntityKind::Sales, SALES);
    const SALE_ITEM_SCHEMA: KindSchema = schema(EntityKind::SaleItems, SALE_ITEMS);
    const QUOTE_SCHEMA: KindSchema = schema(EntityKind::Quotes, QUOTES);
    const QUOTE_ITEM_SCHEMA: KindSchema = schema(EntityKind::QuoteItems, QUOTE_ITEMS);
    const OPERATION_SCHEMA: KindSchema = KindSchema {
        accepts_updated_at: true,
        ..schema(EntityKind::Operations, OPERATIONS)
    };
    const TECHNICIAN_SCHEMA: KindSchema = KindSchema {
        accepts_updated_at: true,
        ..schema(EntityKind::Technicians, TECHNICIANS)
    };
    const MATERIAL_SCHEMA: KindSchema =
        schema(EntityKind::OperationMaterials, OPERATION_MATERIALS);
    const EVIDENCE_SCHEMA: KindSchema =
        schema(EntityKind::OperationEvidences, OPERATION_EVIDENCES);
    const NOTE_SCHEMA: KindSchema = schema(EntityKind::OperationNotes, OPERATION_NOTES);
    const STATUS_SCHEMA: KindSchema = schema(EntityKind::OperationStatuses, OPERATION_STATUSES);
    const EMPLOYEE_SCHEMA: KindSchema = schema(EntityKind::Employees, EMPLOYEES);
    const LOGIN_SCHEMA: KindSchema = schema(EntityKind::EmployeeLogins, EMPLOYEE_LOGINS);
    const ADJUSTMENT_SCHEMA: KindSchema =
        schema(EntityKind::PayrollAdjustments, PAYROLL_ADJUSTMENTS);
    const PAYMENT_SCHEMA: KindSchema = schema(EntityKind::PayrollPayments, PAYROLL_PAYMENTS);
    const PUNCH_SCHEMA: KindSchema = schema(EntityKind::Punches, PUNCHES);

    match kind {
        EntityKind::Customers => &CUSTOMER_SCHEMA,
        EntityKind::Products => &PRODUCT_SCHEMA,
        EntityKind::Sales => &SALE_SCHEMA,
        EntityKind::SaleItems => &SALE_ITEM_SCHEMA,
        EntityKind::Quotes => &QUOTE_SCHEMA,
        EntityKind::QuoteItems => &QUOTE_ITEM_SCHEMA,
        EntityKind::Operations => &OPERATION_SCHEMA,
        EntityKind::Technicians => &TECHNICIAN_SCHEMA,
        EntityKind::OperationMaterials => &MATERIAL_SCHEMA,
        EntityKind::OperationEvidences => &EVIDENCE_SCHEMA,
        EntityKind::OperationNotes => &NOTE_SCHEMA,
        EntityKind::OperationStatuses => &STATUS_SCHEMA,
        EntityKind::Employees => &EMPLOYEE_SCHEMA,
        EntityKind::EmployeeLogins => &LOGIN_SCHEMA,
        EntityKind::PayrollAdjustments => &ADJUSTMENT_SCHEMA,
        EntityKind::PayrollPayments => &PAYMENT_SCHEMA,
        EntityKind::Punches => &PUNCH_SCHEMA,
    }
}
