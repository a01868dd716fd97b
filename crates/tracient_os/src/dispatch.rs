#![forbid(unsafe_code)]

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracient_kernel_contracts::audit::AuditQuery;
use tracient_kernel_contracts::wage::WageRecord;
use tracient_kernel_contracts::{ops, ContractViolation};
use tracient_storage::StateStore;

use crate::error::LedgerError;
use crate::identity::RegisterUserRequest;
use crate::ledger::TracientLedger;

fn to_json<T: Serialize>(v: T) -> Result<Value, LedgerError> {
    Ok(serde_json::to_value(v)?)
}

fn arity(args: &[String], min: usize, max: usize) -> Result<(), LedgerError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{min}..={max}")
        };
        return Err(LedgerError::Validation(ContractViolation::InvalidFormat {
            field: "args",
            detail: format!("expected {expected} arguments, got {}", args.len()),
        }));
    }
    Ok(())
}

fn parse_decimal(field: &'static str, s: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(s.trim()).map_err(|e| {
        LedgerError::Validation(ContractViolation::InvalidFormat {
            field,
            detail: e.to_string(),
        })
    })
}

/// Lenient count argument: empty or unparseable selects the default (0).
fn count_or_default(s: &str) -> usize {
    s.trim().parse().unwrap_or(0)
}

fn optional_clearance(s: Option<&String>) -> Result<Option<u8>, LedgerError> {
    match s.map(|s| s.trim()) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| {
            LedgerError::Validation(ContractViolation::InvalidFormat {
                field: "clearance_level",
                detail: format!("not a clearance level: {v}"),
            })
        }),
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(field: &'static str, s: &str) -> Result<T, LedgerError> {
    serde_json::from_str(s).map_err(|e| {
        LedgerError::Validation(ContractViolation::InvalidFormat {
            field,
            detail: e.to_string(),
        })
    })
}

impl TracientLedger {
    /// Positional-string entry point. `name` is the operation name, which is
    /// also its access rule key; results are returned as JSON.
    pub fn invoke<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        name: &str,
        args: &[String],
    ) -> Result<Value, LedgerError> {
        match name {
            ops::INIT_LEDGER => {
                arity(args, 0, 0)?;
                to_json(self.init_ledger(store)?)
            }

            ops::RECORD_WAGE => {
                arity(args, 8, 8)?;
                let wage = WageRecord {
                    wage_id: args[0].clone(),
                    worker_id_hash: args[1].clone(),
                    employer_id_hash: args[2].clone(),
                    amount: parse_decimal("amount", &args[3])?,
                    currency: args[4].clone(),
                    job_type: args[5].clone(),
                    timestamp: args[6].clone(),
                    policy_version: args[7].clone(),
                };
                to_json(self.record_wage(store, wage)?)
            }
            ops::READ_WAGE => {
                arity(args, 1, 1)?;
                to_json(self.read_wage(store, &args[0])?)
            }
            ops::WAGE_EXISTS => {
                arity(args, 1, 1)?;
                to_json(self.wage_exists(store, &args[0])?)
            }
            ops::QUERY_WAGES_BY_WORKER => {
                arity(args, 1, 1)?;
                to_json(self.query_wages_by_worker(store, &args[0])?)
            }
            ops::QUERY_WAGES_BY_EMPLOYER => {
                arity(args, 1, 1)?;
                to_json(self.query_wages_by_employer(store, &args[0])?)
            }
            ops::CALCULATE_TOTAL_INCOME => {
                arity(args, 3, 3)?;
                to_json(self.calculate_total_income(store, &args[0], &args[1], &args[2])?)
            }
            ops::GET_WORKER_INCOME_HISTORY => {
                arity(args, 1, 2)?;
                let months = args.get(1).map(|m| count_or_default(m)).unwrap_or(0);
                to_json(self.get_worker_income_history(store, &args[0], months)?)
            }
            ops::BATCH_RECORD_WAGES => {
                arity(args, 1, 1)?;
                let wages: Vec<WageRecord> = parse_json("wages", &args[0])?;
                to_json(self.batch_record_wages(store, wages)?)
            }

            ops::REGISTER_USER => {
                arity(args, 6, 7)?;
                let req = RegisterUserRequest {
                    user_id: args[0].clone(),
                    user_id_hash: args[1].clone(),
                    role: args[2].clone(),
                    organization_id: args[3].clone(),
                    name: args[4].clone(),
                    contact_hash: args[5].clone(),
                    clearance_level: optional_clearance(args.get(6))?,
                };
                to_json(self.register_user(store, req)?)
            }
            ops::GET_USER_PROFILE => {
                arity(args, 1, 1)?;
                to_json(self.get_user_profile(store, &args[0])?)
            }
            ops::UPDATE_USER_STATUS => {
                arity(args, 3, 3)?;
                to_json(self.update_user_status(store, &args[0], &args[1], &args[2])?)
            }
            ops::VERIFY_USER_ROLE => {
                arity(args, 2, 2)?;
                to_json(self.verify_user_role(store, &args[0], &args[1])?)
            }
            ops::USER_EXISTS => {
                arity(args, 1, 1)?;
                to_json(self.user_exists(store, &args[0])?)
            }

            ops::SET_POVERTY_THRESHOLD => {
                arity(args, 4, 4)?;
                let amount = parse_decimal("amount", &args[2])?;
                to_json(self.set_poverty_threshold(store, &args[0], &args[1], amount, &args[3])?)
            }
            ops::GET_POVERTY_THRESHOLD => {
                arity(args, 2, 2)?;
                to_json(self.get_poverty_threshold(store, &args[0], &args[1])?)
            }
            ops::CHECK_POVERTY_STATUS => {
                arity(args, 4, 4)?;
                to_json(self.check_poverty_status(store, &args[0], &args[1], &args[2], &args[3])?)
            }

            ops::FLAG_ANOMALY => {
                arity(args, 4, 4)?;
                let score: f64 = args[1].trim().parse().map_err(|_| {
                    LedgerError::Validation(ContractViolation::InvalidFormat {
                        field: "anomaly_score",
                        detail: format!("not a number: {}", args[1]),
                    })
                })?;
                to_json(self.flag_anomaly(store, &args[0], score, &args[2], &args[3])?)
            }
            ops::GET_FLAGGED_WAGES => {
                arity(args, 0, 1)?;
                let min_score = args
                    .first()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|s| s.is_finite())
                    .unwrap_or(self.config.flagged_default_min_score);
                to_json(self.get_flagged_wages(store, min_score)?)
            }
            ops::UPDATE_ANOMALY_STATUS => {
                arity(args, 3, 3)?;
                to_json(self.update_anomaly_status(store, &args[0], &args[1], &args[2])?)
            }
            ops::GENERATE_COMPLIANCE_REPORT => {
                arity(args, 2, 3)?;
                let report_type = args.get(2).map(String::as_str).unwrap_or("");
                to_json(self.generate_compliance_report(store, &args[0], &args[1], report_type)?)
            }

            ops::GET_AUDIT_LOGS => {
                arity(args, 0, 1)?;
                let query = match args.first().map(|s| s.trim()) {
                    None | Some("") => AuditQuery::default(),
                    Some(raw) => parse_json("query", raw)?,
                };
                to_json(self.get_audit_logs(store, &query)?)
            }
            ops::GET_AUDIT_SUMMARY => {
                arity(args, 2, 2)?;
                to_json(self.get_audit_summary(store, &args[0], &args[1])?)
            }
            ops::GET_HIGH_RISK_EVENTS => {
                arity(args, 0, 1)?;
                let limit = args.first().map(|s| count_or_default(s)).unwrap_or(0);
                to_json(self.get_high_risk_events(store, limit)?)
            }
            ops::GET_ACCESS_DENIALS => {
                arity(args, 2, 2)?;
                to_json(self.get_access_denials(store, &args[0], &args[1])?)
            }
            ops::GET_USER_ACTIVITY_LOG => {
                arity(args, 1, 1)?;
                to_json(self.get_user_activity_log(store, &args[0])?)
            }

            other => Err(LedgerError::Validation(ContractViolation::InvalidFormat {
                field: "operation",
                detail: format!("unknown operation: {other}"),
            })),
        }
    }
}
