//! Field normalization
//!
//! Exports from the billing platform, the CRM and the materialized analytics
//! view all name the same column differently. Every canonical field is read
//! through an ordered alias list, first usable value wins. Nothing here fails:
//! unreadable numbers become 0 and unreadable dates become absent.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde_json::Value;

use crate::consts::{
    DEFAULT_AREA, DEFAULT_CRM_STATUS, DEFAULT_NAME, DEFAULT_OWNER, DEFAULT_STAGE,
    DEFAULT_UTILITY, UNDEFINED_STATUS,
};
use crate::core::types::{
    BillingRecord, CrmRecord, DateField, RawRecord, RawSnapshot, RefMonth, Snapshot,
};
use crate::utils::parse_flexible_date;

#[derive(Debug, Clone, Copy)]
enum Unit {
    Kwh,
    Mwh,
}

/// An energy column and the unit it is denominated in.
struct EnergyAlias {
    key: &'static str,
    unit: Unit,
}

const fn mwh(key: &'static str) -> EnergyAlias {
    EnergyAlias {
        key,
        unit: Unit::Mwh,
    }
}

const fn kwh(key: &'static str) -> EnergyAlias {
    EnergyAlias {
        key,
        unit: Unit::Kwh,
    }
}

// Billing / analytics view
const UC: &[&str] = &["uc"];
const NAME: &[&str] = &["nome", "nome_cliente"];
const UTILITY: &[&str] = &["concessionária", "concessionaria", "concessionaria_rd"];
const AREA: &[&str] = &["área_de_gestão", "area_de_gestao"];
const STAGE: &[&str] = &["objetivo_etapa"];
const OWNER: &[&str] = &["quem_indicou"];
const MONTH: &[&str] = &["mês_referência", "mes_referencia_formatado", "mes_referencia"];
const STATUS: &[&str] = &["status", "Status Pagamento"];
const INVOICED: &[&str] = &["total_cobranca", "total_cobrança_r$"];
const ESTIMATED: &[&str] = &["valor_estimado"];
const SETTLED: &[&str] = &["valor_real_cobranca", "boleto_simplifica"];
const SAVINGS: &[&str] = &["economia_rs"];
const DISTRIBUTOR_INVOICE: &[&str] = &["valor_fatura_distribuidora"];
const CONTRACTED: &[EnergyAlias] = &[
    mwh("consumo_crm_mwh"),
    mwh("consumo_médio_na_venda_mwh"),
    mwh("consumo_medio_mwh"),
];
const CONSUMED: &[EnergyAlias] = &[kwh("consumo_kwh"), kwh("consumo_real_kwh")];
const COMPENSATED: &[EnergyAlias] = &[kwh("compensacao_kwh"), kwh("compensação_total_kwh")];
const EFFICIENCY: &[&str] = &["eficiencia_compensacao"];
const DISCOUNT: &[&str] = &["perc_desconto"];
const TARIFF_GROUP: &[&str] = &["grupo_tarifario"];
const NATURE: &[&str] = &["natureza_cliente"];
const CONSORTIUM: &[&str] = &["is_consorcio"];
const SOURCE_TAG: &[&str] = &["fonte_dados"];
const CANCEL_REASON: &[&str] = &["motivo_cancelamento"];
const DUE: &[&str] = &["vencimento", "vencimento_do_boleto"];
const PREDICTED_EMISSION: &[&str] = &["data_emissao_prevista"];
const EMISSION: &[&str] = &["data_emissao", "emissão_do_boleto"];
const DISTRIBUTOR_EMISSION: &[&str] = &["data_emissao_distribuidora"];
const WIN: &[&str] = &["data_ganho"];
const PROTOCOL: &[&str] = &["data_protocolo", "data_do_1º_protocolo"];
const ENTRY: &[&str] = &["data_protocolo", "data_do_1º_protocolo", "data_ganho", "created_at"];
const CANCELLATION: &[&str] = &["data_cancelamento", "data_de_pedido_de_cancelamento"];

// CRM view
const CRM_NAME: &[&str] = &["nome_negocio", "nome"];
const CRM_UTILITY: &[&str] = &["concessionaria", "concessionária"];
const CRM_AREA: &[&str] = &["area_de_gestao", "área_de_gestão"];
const CRM_STATUS: &[&str] = &["status_rd"];
const FIRST_SAVINGS: &[&str] = &["data_primeira_economia"];
const FIRST_INVOICE: &[&str] = &["data_primeira_fatura"];
const LAST_BILLING: &[&str] = &["data_ultimo_faturamento"];
const AVG_CONSUMPTION: &[&str] = &["consumo_medio_mwh"];
const LATITUDE: &[&str] = &["latitude", "lat"];
const LONGITUDE: &[&str] = &["longitude", "lng", "lon"];
const MONITORING: &[&str] = &["monitoramento_operacao"];
const ALLOCATED_PLANT: &[&str] = &["usina_alocada"];
const DEAL_ID: &[&str] = &["id_negocio", "ID_NEGOCIO", "deal_id", "id_rd"];

/// Coerce any JSON scalar to a number; `NaN`, empty and non-numeric become 0.
pub(crate) fn parse_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

/// A field is empty if null, whitespace-only, or the literal `"null"`.
pub(crate) fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => {
            let t = s.trim();
            t.is_empty() || t.eq_ignore_ascii_case("null")
        }
        Some(_) => false,
    }
}

fn text(raw: &RawRecord, key: &str) -> Option<String> {
    let value = raw.get(key);
    if is_empty_value(value) {
        return None;
    }
    match value? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first_text(raw: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(raw, key))
}

fn text_or(raw: &RawRecord, keys: &[&str], default: &str) -> String {
    first_text(raw, keys).unwrap_or_else(|| default.to_string())
}

/// First alias whose value coerces to a non-zero number.
fn first_number(raw: &RawRecord, keys: &[&str]) -> f64 {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .map(parse_number)
        .find(|n| *n != 0.0)
        .unwrap_or(0.0)
}

fn optional_number(raw: &RawRecord, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter(|key| !is_empty_value(raw.get(**key)))
        .filter_map(|key| raw.get(*key))
        .map(parse_number)
        .next()
}

/// Energy in kWh from the first non-zero alias, whatever its unit.
fn energy_kwh(raw: &RawRecord, aliases: &[EnergyAlias]) -> f64 {
    aliases
        .iter()
        .filter_map(|alias| raw.get(alias.key).map(|v| (parse_number(v), alias.unit)))
        .find(|(n, _)| *n != 0.0)
        .map(|(n, unit)| match unit {
            Unit::Kwh => n,
            Unit::Mwh => n * 1000.0,
        })
        .unwrap_or(0.0)
}

/// First non-empty alias decides; an unreadable value does not fall through.
fn date_field(raw: &RawRecord, keys: &[&str]) -> DateField {
    match first_text(raw, keys) {
        None => DateField::Missing,
        Some(s) => parse_flexible_date(&s).map_or(DateField::Malformed, DateField::Date),
    }
}

fn date(raw: &RawRecord, keys: &[&str]) -> Option<NaiveDate> {
    date_field(raw, keys).date()
}

/// Map a billing/analytics row. Rows without an account identifier are unusable.
pub(crate) fn normalize_billing(raw: &RawRecord) -> Option<BillingRecord> {
    let uc = first_text(raw, UC)?;
    let status = first_text(raw, STATUS).unwrap_or_else(|| UNDEFINED_STATUS.to_string());

    Some(BillingRecord {
        uc,
        name: text_or(raw, NAME, DEFAULT_NAME),
        utility: text_or(raw, UTILITY, DEFAULT_UTILITY),
        area: text_or(raw, AREA, DEFAULT_AREA),
        stage: text_or(raw, STAGE, DEFAULT_STAGE),
        owner: text_or(raw, OWNER, DEFAULT_OWNER),
        month: first_text(raw, MONTH).and_then(|m| RefMonth::parse(&m)),
        status,
        invoiced: first_number(raw, INVOICED),
        estimated: first_number(raw, ESTIMATED),
        settled: first_number(raw, SETTLED),
        savings: first_number(raw, SAVINGS),
        distributor_invoice: first_number(raw, DISTRIBUTOR_INVOICE),
        contracted_kwh: energy_kwh(raw, CONTRACTED),
        consumed_kwh: energy_kwh(raw, CONSUMED),
        compensated_kwh: energy_kwh(raw, COMPENSATED),
        efficiency: first_number(raw, EFFICIENCY),
        discount_pct: first_number(raw, DISCOUNT),
        tariff_group: first_text(raw, TARIFF_GROUP),
        customer_nature: first_text(raw, NATURE),
        consortium: first_text(raw, CONSORTIUM),
        source_tag: first_text(raw, SOURCE_TAG),
        cancellation_reason: first_text(raw, CANCEL_REASON),
        due_date: date(raw, DUE),
        predicted_emission: date_field(raw, PREDICTED_EMISSION),
        emission: date_field(raw, EMISSION),
        distributor_emission: date(raw, DISTRIBUTOR_EMISSION),
        win_date: date(raw, WIN),
        protocol_date: date(raw, PROTOCOL),
        entry_date: date(raw, ENTRY),
        cancellation_date: date(raw, CANCELLATION),
    })
}

pub(crate) fn normalize_crm(raw: &RawRecord) -> CrmRecord {
    CrmRecord {
        uc: first_text(raw, UC).unwrap_or_default(),
        business_name: first_text(raw, CRM_NAME).unwrap_or_default(),
        utility: text_or(raw, CRM_UTILITY, DEFAULT_UTILITY),
        area: text_or(raw, CRM_AREA, DEFAULT_AREA),
        stage: text_or(raw, STAGE, DEFAULT_STAGE),
        status: text_or(raw, CRM_STATUS, DEFAULT_CRM_STATUS),
        owner: text_or(raw, OWNER, DEFAULT_OWNER),
        won_date: date(raw, WIN),
        protocol_date: date_field(raw, &["data_protocolo"]),
        first_savings_date: date_field(raw, FIRST_SAVINGS),
        first_invoice_date: date_field(raw, FIRST_INVOICE),
        cancellation_date: date_field(raw, CANCELLATION),
        last_billing_date: date_field(raw, LAST_BILLING),
        cancellation_reason: first_text(raw, CANCEL_REASON),
        avg_consumption_mwh: first_number(raw, AVG_CONSUMPTION),
        latitude: optional_number(raw, LATITUDE),
        longitude: optional_number(raw, LONGITUDE),
        monitoring: first_text(raw, MONITORING),
        allocated_plant: first_text(raw, ALLOCATED_PLANT),
        deal_id: first_text(raw, DEAL_ID),
    }
}

/// Normalize a whole snapshot. Row order is preserved.
pub(crate) fn normalize_snapshot(raw: &RawSnapshot) -> Snapshot {
    let billing: Vec<BillingRecord> = raw
        .billing
        .par_iter()
        .filter_map(normalize_billing)
        .collect();
    let dropped = raw.billing.len() - billing.len();
    if dropped > 0 {
        log::warn!("Skipped {dropped} billing rows without an account identifier");
    }
    let crm: Vec<CrmRecord> = raw.crm.par_iter().map(normalize_crm).collect();
    log::info!(
        "Normalized {} billing rows and {} CRM rows",
        billing.len(),
        crm.len()
    );

    Snapshot {
        billing,
        crm,
        fetched_at: raw.fetched_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_number_degrades_to_zero() {
        assert_eq!(parse_number(&json!(12.5)), 12.5);
        assert_eq!(parse_number(&json!("7.25")), 7.25);
        assert_eq!(parse_number(&json!(" 3 ")), 3.0);
        assert_eq!(parse_number(&json!("")), 0.0);
        assert_eq!(parse_number(&json!("abc")), 0.0);
        assert_eq!(parse_number(&json!("NaN")), 0.0);
        assert_eq!(parse_number(&Value::Null), 0.0);
        assert_eq!(parse_number(&json!({"nested": 1})), 0.0);
    }

    #[test]
    fn empty_value_rules() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&Value::Null)));
        assert!(is_empty_value(Some(&json!("   "))));
        assert!(is_empty_value(Some(&json!("NULL"))));
        assert!(!is_empty_value(Some(&json!("x"))));
        assert!(!is_empty_value(Some(&json!(0))));
    }

    #[test]
    fn alias_chain_first_match_wins() {
        let record = normalize_billing(&raw(json!({
            "uc": "100",
            "concessionaria": "CEMIG",
            "concessionaria_rd": "IGNORED",
            "area_de_gestao": "Sul",
            "mes_referencia": "2024-03-01",
        })))
        .unwrap();
        assert_eq!(record.utility, "CEMIG");
        assert_eq!(record.area, "Sul");
        assert_eq!(record.month, RefMonth::new(2024, 3));
        assert_eq!(record.name, DEFAULT_NAME);
        assert_eq!(record.owner, DEFAULT_OWNER);
    }

    #[test]
    fn accented_alias_has_priority() {
        let record = normalize_billing(&raw(json!({
            "uc": 42,
            "concessionária": "EQUATORIAL GO",
            "concessionaria": "OTHER",
            "mês_referência": "01/2024",
        })))
        .unwrap();
        assert_eq!(record.uc, "42");
        assert_eq!(record.utility, "EQUATORIAL GO");
        assert_eq!(record.month, RefMonth::new(2024, 1));
    }

    #[test]
    fn defaults_when_fields_absent() {
        let record = normalize_billing(&raw(json!({"uc": "1", "status": "null"}))).unwrap();
        assert_eq!(record.utility, DEFAULT_UTILITY);
        assert_eq!(record.area, DEFAULT_AREA);
        assert_eq!(record.stage, DEFAULT_STAGE);
        assert_eq!(record.status, UNDEFINED_STATUS);
        assert_eq!(record.month, None);
    }

    #[test]
    fn status_falls_back_to_payment_status_column() {
        let record =
            normalize_billing(&raw(json!({"uc": "1", "status": "", "Status Pagamento": "PAID"})))
                .unwrap();
        assert_eq!(record.status, "PAID");
    }

    #[test]
    fn missing_uc_is_dropped() {
        assert!(normalize_billing(&raw(json!({"uc": "  ", "status": "PAID"}))).is_none());
        assert!(normalize_billing(&raw(json!({"status": "PAID"}))).is_none());
    }

    #[test]
    fn energy_units_reconcile_to_kwh() {
        let record = normalize_billing(&raw(json!({
            "uc": "1",
            "consumo_crm_mwh": "1.5",
            "compensação_total_kwh": 900,
            "consumo_real_kwh": "1200",
        })))
        .unwrap();
        assert_eq!(record.contracted_kwh, 1500.0);
        assert_eq!(record.contracted_mwh(), 1.5);
        assert_eq!(record.compensated_kwh, 900.0);
        assert_eq!(record.consumed_kwh, 1200.0);
    }

    #[test]
    fn zero_alias_falls_through_to_next() {
        let record = normalize_billing(&raw(json!({
            "uc": "1",
            "total_cobranca": 0,
            "total_cobrança_r$": "350.40",
            "consumo_crm_mwh": 0,
            "consumo_médio_na_venda_mwh": 2,
        })))
        .unwrap();
        assert_eq!(record.invoiced, 350.40);
        assert_eq!(record.contracted_kwh, 2000.0);
    }

    #[test]
    fn malformed_numbers_and_dates_degrade() {
        let record = normalize_billing(&raw(json!({
            "uc": "1",
            "total_cobranca": "R$ 10",
            "vencimento": "someday",
            "data_emissao_prevista": "not a date",
        })))
        .unwrap();
        assert_eq!(record.invoiced, 0.0);
        assert_eq!(record.due_date, None);
        assert_eq!(record.predicted_emission, DateField::Malformed);
        assert_eq!(record.emission, DateField::Missing);
    }

    #[test]
    fn entry_date_priority_chain() {
        let record = normalize_billing(&raw(json!({
            "uc": "1",
            "data_ganho": "2024-01-10",
            "created_at": "2023-12-01T12:00:00Z",
        })))
        .unwrap();
        assert_eq!(record.entry_date, Some(ymd(2024, 1, 10)));

        let record = normalize_billing(&raw(json!({
            "uc": "1",
            "data_do_1º_protocolo": "15/02/2024",
            "data_ganho": "2024-01-10",
        })))
        .unwrap();
        assert_eq!(record.entry_date, Some(ymd(2024, 2, 15)));
    }

    #[test]
    fn crm_row_defaults_and_deal_id_aliases() {
        let record = normalize_crm(&raw(json!({
            "uc": "9",
            "nome_negocio": "Padaria",
            "ID_NEGOCIO": 777,
            "consumo_medio_mwh": "3.2",
            "usina_alocada": "null",
        })));
        assert_eq!(record.utility, DEFAULT_UTILITY);
        assert_eq!(record.status, DEFAULT_CRM_STATUS);
        assert_eq!(record.stage, DEFAULT_STAGE);
        assert_eq!(record.deal_id.as_deref(), Some("777"));
        assert_eq!(record.avg_consumption_mwh, 3.2);
        assert_eq!(record.allocated_plant, None);
    }

    #[test]
    fn crm_dates_keep_unreadable_apart_from_blank() {
        let record = normalize_crm(&raw(json!({
            "uc": "9",
            "data_protocolo": "2024/01/15",
            "data_primeira_fatura": " ",
        })));
        assert_eq!(record.protocol_date, DateField::Malformed);
        assert_eq!(record.first_invoice_date, DateField::Missing);
    }

    #[test]
    fn snapshot_preserves_order_and_skips_unidentified_rows() {
        let snapshot = normalize_snapshot(&RawSnapshot {
            billing: vec![
                raw(json!({"uc": "b"})),
                raw(json!({"nome": "no uc"})),
                raw(json!({"uc": "a"})),
            ],
            crm: vec![raw(json!({"uc": "c"}))],
            fetched_at: None,
        });
        let ucs: Vec<&str> = snapshot.billing.iter().map(|r| r.uc.as_str()).collect();
        assert_eq!(ucs, vec!["b", "a"]);
        assert_eq!(snapshot.crm.len(), 1);
    }
}
