#![forbid(unsafe_code)]

//! Operation names. Each is both the dispatch name and the access rule key.

pub const INIT_LEDGER: &str = "InitLedger";

pub const RECORD_WAGE: &str = "RecordWage";
pub const READ_WAGE: &str = "ReadWage";
pub const WAGE_EXISTS: &str = "WageExists";
pub const QUERY_WAGES_BY_WORKER: &str = "QueryWagesByWorker";
pub const QUERY_WAGES_BY_EMPLOYER: &str = "QueryWagesByEmployer";
pub const CALCULATE_TOTAL_INCOME: &str = "CalculateTotalIncome";
pub const GET_WORKER_INCOME_HISTORY: &str = "GetWorkerIncomeHistory";
pub const BATCH_RECORD_WAGES: &str = "BatchRecordWages";

pub const REGISTER_USER: &str = "RegisterUser";
pub const GET_USER_PROFILE: &str = "GetUserProfile";
pub const UPDATE_USER_STATUS: &str = "UpdateUserStatus";
pub const VERIFY_USER_ROLE: &str = "VerifyUserRole";
pub const USER_EXISTS: &str = "UserExists";

pub const SET_POVERTY_THRESHOLD: &str = "SetPovertyThreshold";
pub const GET_POVERTY_THRESHOLD: &str = "GetPovertyThreshold";
pub const CHECK_POVERTY_STATUS: &str = "CheckPovertyStatus";

pub const FLAG_ANOMALY: &str = "FlagAnomaly";
pub const GET_FLAGGED_WAGES: &str = "GetFlaggedWages";
pub const UPDATE_ANOMALY_STATUS: &str = "UpdateAnomalyStatus";
pub const GENERATE_COMPLIANCE_REPORT: &str = "GenerateComplianceReport";

pub const GET_AUDIT_LOGS: &str = "GetAuditLogs";
pub const GET_AUDIT_SUMMARY: &str = "GetAuditSummary";
pub const GET_HIGH_RISK_EVENTS: &str = "GetHighRiskEvents";
pub const GET_ACCESS_DENIALS: &str = "GetAccessDenials";
pub const GET_USER_ACTIVITY_LOG: &str = "GetUserActivityLog";

pub const ALL: [&str; 26] = [
    INIT_LEDGER,
    RECORD_WAGE,
    READ_WAGE,
    WAGE_EXISTS,
    QUERY_WAGES_BY_WORKER,
    QUERY_WAGES_BY_EMPLOYER,
    CALCULATE_TOTAL_INCOME,
    GET_WORKER_INCOME_HISTORY,
    BATCH_RECORD_WAGES,
    REGISTER_USER,
    GET_USER_PROFILE,
    UPDATE_USER_STATUS,
    VERIFY_USER_ROLE,
    USER_EXISTS,
    SET_POVERTY_THRESHOLD,
    GET_POVERTY_THRESHOLD,
    CHECK_POVERTY_STATUS,
    FLAG_ANOMALY,
    GET_FLAGGED_WAGES,
    UPDATE_ANOMALY_STATUS,
    GENERATE_COMPLIANCE_REPORT,
    GET_AUDIT_LOGS,
    GET_AUDIT_SUMMARY,
    GET_HIGH_RISK_EVENTS,
    GET_ACCESS_DENIALS,
    GET_USER_ACTIVITY_LOG,
];
