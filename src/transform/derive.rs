//! Key derivation, complement-3 prefix grouping and zone codes.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::normalize::KEY_COLUMNS;
use super::{set, set_text, text};
use crate::progress::log_info;

/// Join the key components into CHAVE_LOG: `-`-separated, consecutive
/// separators collapsed, leading/trailing separators trimmed.
pub fn build_chave_log(record: &Value) -> String {
    KEY_COLUMNS
        .iter()
        .map(|&column| text(record, column))
        .collect::<Vec<_>>()
        .join("-")
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Derive keys, prefix groups and zone codes.
///
/// Every record gets CHAVE_LOG, the preserved/working complement-3 pair,
/// ORDEM/Resultado from the (CHAVE_LOG, prefix) grouping, COD_ZONA,
/// RESULTADO and COMPARATIVO. Records without a prefix are routed to the
/// no-prefix partition (ORDEM=0, empty Resultado); the partitions are
/// concatenated back prefixed-first, so the total row count is preserved.
pub fn derive_keys(records: Vec<Value>) -> Vec<Value> {
    let mut with_prefix = Vec::new();
    let mut without_prefix = Vec::new();
    let mut group_counters: HashMap<(String, String), u64> = HashMap::new();

    for mut record in records {
        let chave = build_chave_log(&record);
        set_text(&mut record, "CHAVE_LOG", chave.clone());

        let original = text(&record, "COMPLEMENTO3");
        let tratado = original.trim().to_uppercase();
        let prefixo: String = tratado.chars().take(2).collect();
        set_text(&mut record, "COMPLEMENTO3_ORIGINAL", original);
        set_text(&mut record, "COMPLEMENTO3_TRATADO", tratado);

        if prefixo.is_empty() {
            set(&mut record, "ORDEM", json!(0));
            set_text(&mut record, "Resultado", "");
            without_prefix.push(record);
        } else {
            let ordem = group_counters
                .entry((chave, prefixo.clone()))
                .and_modify(|n| *n += 1)
                .or_insert(1);
            set(&mut record, "ORDEM", json!(*ordem));
            set_text(&mut record, "Resultado", format!("{} {}", prefixo, ordem));
            with_prefix.push(record);
        }
    }

    log_info(format!("📊 Linhas com prefixo válido: {}", with_prefix.len()));
    log_info(format!("📊 Linhas sem prefixo válido: {}", without_prefix.len()));

    let mut records = with_prefix;
    records.append(&mut without_prefix);

    for record in records.iter_mut() {
        let celula = text(record, "CELULA");
        let numero_celula = celula.split(' ').next().unwrap_or("").to_string();
        let cod_zona = format!(
            "{}-{}-{}-CEOS-{}",
            text(record, "UF"),
            text(record, "LOCALIDADE_ABREV"),
            text(record, "ESTACAO_ABASTECEDORA"),
            numero_celula
        );
        set_text(record, "COD_ZONA", cod_zona);

        let resultado = text(record, "Resultado").replace(' ', "");
        let comparativo = if resultado == text(record, "COMPLEMENTO3_TRATADO") {
            "VERDADEIRO"
        } else {
            "FALSO"
        };
        set_text(record, "RESULTADO", resultado);
        set_text(record, "COMPARATIVO", comparativo);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(estacao: &str, comp3: &str) -> Value {
        json!({
            "ESTACAO_ABASTECEDORA": estacao,
            "LOCALIDADE": "GUARA",
            "LOGRADOURO": "RUA 10",
            "COMPLEMENTO": "QD 5",
            "COMPLEMENTO2": "",
            "COMPLEMENTO3": comp3,
            "UF": "DF",
            "LOCALIDADE_ABREV": "GURX",
            "CELULA": "68 NORTE"
        })
    }

    #[test]
    fn test_chave_log_has_no_separator_runs() {
        let rec = record("ETGR", "LT 1");
        let chave = build_chave_log(&rec);
        assert_eq!(chave, "ETGR-GUARA-RUA 10-QD 5");
        assert!(!chave.contains("--"));
        assert!(!chave.starts_with('-') && !chave.ends_with('-'));
    }

    #[test]
    fn test_chave_log_all_blank() {
        let rec = json!({});
        assert_eq!(build_chave_log(&rec), "");
    }

    #[test]
    fn test_row_count_preserved() {
        let records = vec![
            record("ETGR", "LT 1"),
            record("ETGR", ""),
            record("ETGR", "LT 2"),
            record("ETGR", ""),
        ];
        let out = derive_keys(records);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_ordem_first_seen_rank_per_group() {
        let records = vec![
            record("ETGR", "lt 10"),
            record("ETGR", "LT 20"),
            record("ETBV", "LT 1"),
            record("ETGR", "QD 3"),
            record("ETGR", "LT 30"),
        ];
        let out = derive_keys(records);

        // same (CHAVE_LOG, LT) group numbers 1..3 in first-seen order
        assert_eq!(out[0]["ORDEM"], 1);
        assert_eq!(out[1]["ORDEM"], 2);
        assert_eq!(out[4]["ORDEM"], 3);
        // different CHAVE_LOG restarts the count
        assert_eq!(out[2]["ORDEM"], 1);
        // different prefix restarts the count
        assert_eq!(out[3]["ORDEM"], 1);

        assert_eq!(out[0]["Resultado"], "LT 1");
        assert_eq!(out[0]["RESULTADO"], "LT1");
    }

    #[test]
    fn test_no_prefix_partition_comes_last() {
        let records = vec![record("ETGR", ""), record("ETGR", "LT 1")];
        let out = derive_keys(records);

        // prefixed partition first, then the no-prefix rows
        assert_eq!(out[0]["ORDEM"], 1);
        assert_eq!(out[1]["ORDEM"], 0);
        assert_eq!(out[1]["RESULTADO"], "");
    }

    #[test]
    fn test_working_copy_and_original_preserved() {
        let out = derive_keys(vec![record("ETGR", "  lt 2b ")]);
        assert_eq!(out[0]["COMPLEMENTO3_ORIGINAL"], "  lt 2b ");
        assert_eq!(out[0]["COMPLEMENTO3_TRATADO"], "LT 2B");
    }

    #[test]
    fn test_comparativo() {
        // RESULTADO "LT1" == tratado "LT1" → VERDADEIRO
        let out = derive_keys(vec![record("ETGR", "LT1")]);
        assert_eq!(out[0]["COMPARATIVO"], "VERDADEIRO");

        // tratado "LT 1" keeps its space, RESULTADO does not → FALSO
        let out = derive_keys(vec![record("ETGR", "LT 1")]);
        assert_eq!(out[0]["COMPARATIVO"], "FALSO");

        // no prefix: both sides empty → VERDADEIRO
        let out = derive_keys(vec![record("ETGR", "")]);
        assert_eq!(out[0]["COMPARATIVO"], "VERDADEIRO");
    }

    #[test]
    fn test_cod_zona() {
        let out = derive_keys(vec![record("ETGR", "LT 1")]);
        assert_eq!(out[0]["COD_ZONA"], "DF-GURX-ETGR-CEOS-68");
    }

    #[test]
    fn test_cod_zona_with_missing_columns() {
        let out = derive_keys(vec![json!({"COMPLEMENTO3": "LT 1"})]);
        assert_eq!(out[0]["COD_ZONA"], "---CEOS-");
    }
}
