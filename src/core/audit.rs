//! CRM data-quality audit
//!
//! A static rule table says which fields a deal must have filled in once it
//! reaches a given stage. Date fields that cannot be read count as missing.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::consts::CRM_DEAL_URL;
use crate::core::classify::stage_sort_key;
use crate::core::math::percent;
use crate::core::types::CrmRecord;

struct FieldCheck {
    label: &'static str,
    is_missing: fn(&CrmRecord) -> bool,
}

struct AuditRule {
    applies: fn(&CrmRecord) -> bool,
    checks: &'static [FieldCheck],
}

const PROTOCOL_DATE: FieldCheck = FieldCheck {
    label: "Data do 1º protocolo",
    is_missing: |r| !r.protocol_date.is_present(),
};
const ALLOCATED_PLANT: FieldCheck = FieldCheck {
    label: "Usina Alocada",
    is_missing: |r| r.allocated_plant.is_none(),
};
const FIRST_SAVINGS: FieldCheck = FieldCheck {
    label: "Data de 1ª Economia da UC",
    is_missing: |r| !r.first_savings_date.is_present(),
};
const FIRST_INVOICE: FieldCheck = FieldCheck {
    label: "Data da 1ª fatura",
    is_missing: |r| !r.first_invoice_date.is_present(),
};
const CANCELLATION_DATE: FieldCheck = FieldCheck {
    label: "Data de pedido de cancelamento",
    is_missing: |r| !r.cancellation_date.is_present(),
};
const CANCELLATION_REASON: FieldCheck = FieldCheck {
    label: "Motivo do cancelamento",
    is_missing: |r| r.cancellation_reason.is_none(),
};
const LAST_BILLING: FieldCheck = FieldCheck {
    label: "Data do último faturamento",
    is_missing: |r| !r.last_billing_date.is_present(),
};
const MONITORING: FieldCheck = FieldCheck {
    label: "Monitoramento - Operação",
    is_missing: |r| r.monitoring.is_none(),
};

const RULES: &[AuditRule] = &[
    AuditRule {
        applies: |r| r.stage.contains("Protocolados"),
        checks: &[PROTOCOL_DATE, ALLOCATED_PLANT],
    },
    AuditRule {
        applies: |r| r.stage.contains("Operacional"),
        checks: &[PROTOCOL_DATE, ALLOCATED_PLANT, FIRST_SAVINGS, FIRST_INVOICE],
    },
    AuditRule {
        applies: |r| r.stage.contains("Em Exclusão") || r.stage.contains("Excluído"),
        checks: &[CANCELLATION_DATE, CANCELLATION_REASON],
    },
    AuditRule {
        applies: |r| r.stage.contains("Excluído"),
        checks: &[LAST_BILLING],
    },
    AuditRule {
        applies: |r| r.status == "Stand-by",
        checks: &[MONITORING],
    },
];

/// Labels of every required field the deal is missing, each listed once.
pub(crate) fn missing_fields(record: &CrmRecord) -> Vec<&'static str> {
    let mut missing: Vec<&'static str> = Vec::new();
    for rule in RULES.iter().filter(|rule| (rule.applies)(record)) {
        for check in rule.checks {
            if (check.is_missing)(record) && !missing.contains(&check.label) {
                missing.push(check.label);
            }
        }
    }
    missing
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AuditIssue {
    pub(crate) uc: String,
    pub(crate) business_name: String,
    pub(crate) stage: String,
    pub(crate) status: String,
    pub(crate) missing: Vec<&'static str>,
    pub(crate) deal_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AuditOptions {
    pub(crate) stages: Vec<String>,
    pub(crate) labels: Vec<&'static str>,
}

/// Narrows the issue list; empty sets match everything.
#[derive(Debug, Clone, Default)]
pub(crate) struct AuditQuery {
    pub(crate) search: Option<String>,
    pub(crate) stages: Vec<String>,
    pub(crate) labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AuditReport {
    pub(crate) analyzed: usize,
    pub(crate) integrity_pct: f64,
    pub(crate) issues: Vec<AuditIssue>,
}

impl AuditReport {
    pub(crate) fn options(&self) -> AuditOptions {
        let mut stages: Vec<String> = self
            .issues
            .iter()
            .map(|i| i.stage.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        stages.sort_by(|a, b| stage_sort_key(a).cmp(&stage_sort_key(b)));
        let labels = self
            .issues
            .iter()
            .flat_map(|i| i.missing.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        AuditOptions { stages, labels }
    }

    pub(crate) fn query(&self, query: &AuditQuery) -> Vec<&AuditIssue> {
        let term = query
            .search
            .as_deref()
            .map(str::to_lowercase)
            .filter(|t| !t.is_empty());
        self.issues
            .iter()
            .filter(|issue| {
                term.as_ref().is_none_or(|t| {
                    issue.uc.to_lowercase().contains(t)
                        || issue.business_name.to_lowercase().contains(t)
                })
            })
            .filter(|issue| query.stages.is_empty() || query.stages.contains(&issue.stage))
            .filter(|issue| {
                query.labels.is_empty()
                    || issue
                        .missing
                        .iter()
                        .any(|label| query.labels.iter().any(|l| l == label))
            })
            .collect()
    }
}

pub(crate) fn audit(records: &[&CrmRecord]) -> AuditReport {
    let issues: Vec<AuditIssue> = records
        .iter()
        .filter_map(|record| {
            let missing = missing_fields(record);
            if missing.is_empty() {
                return None;
            }
            Some(AuditIssue {
                uc: record.uc.clone(),
                business_name: record.business_name.clone(),
                stage: record.stage.clone(),
                status: record.status.clone(),
                missing,
                deal_link: record
                    .deal_id
                    .as_ref()
                    .map(|id| format!("{CRM_DEAL_URL}{id}")),
            })
        })
        .collect();

    let analyzed = records.len();
    AuditReport {
        analyzed,
        integrity_pct: percent(analyzed - issues.len(), analyzed).round(),
        issues,
    }
}
