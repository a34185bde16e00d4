//! Route-table merge and survey-code deduplication.

use serde_json::Value;
use std::collections::HashSet;

use super::{set_text, text};
use crate::progress::{log_info, log_success, log_warning};
use crate::reference::RouteLookup;

/// Left-join records onto the route lookup by COD_LOGRADOURO.
///
/// Unmatched records get empty ID_ROTEIRO/ID_LOCALIDADE. When either join
/// column is absent the merge is skipped entirely and both target columns
/// default to empty for every record; that is a logged degraded mode, not
/// an error.
pub fn merge_routes(records: &mut [Value], headers: &[String], lookup: &RouteLookup) {
    let has_left_column = headers.iter().any(|h| h == "COD_LOGRADOURO");

    if !has_left_column || !lookup.enabled {
        for record in records.iter_mut() {
            set_text(record, "ID_ROTEIRO", "");
            set_text(record, "ID_LOCALIDADE", "");
        }
        log_warning("Merge não realizado - colunas de junção não encontradas");
        return;
    }

    for record in records.iter_mut() {
        let cod = text(record, "COD_LOGRADOURO");
        match lookup.get(&cod) {
            Some(route) => {
                let (id, id_localidade) = (route.id.clone(), route.id_localidade.clone());
                set_text(record, "ID_ROTEIRO", id);
                set_text(record, "ID_LOCALIDADE", id_localidade);
            }
            None => {
                set_text(record, "ID_ROTEIRO", "");
                set_text(record, "ID_LOCALIDADE", "");
            }
        }
    }
    log_success("Merge com roteiros concluído");
}

/// Drop records sharing an already-seen COD_SURVEY, keeping the first
/// occurrence. Returns the surviving records and the removed count.
///
/// Skipped entirely when the input has no COD_SURVEY column.
pub fn dedup_by_survey(records: Vec<Value>, headers: &[String]) -> (Vec<Value>, usize) {
    if !headers.iter().any(|h| h == "COD_SURVEY") {
        return (records, 0);
    }

    let before = records.len();
    let mut seen: HashSet<String> = HashSet::new();
    let records: Vec<Value> = records
        .into_iter()
        .filter(|record| seen.insert(text(record, "COD_SURVEY")))
        .collect();
    let removed = before - records.len();
    log_info(format!("📊 Duplicatas removidas: {}", removed));

    (records, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{ReferenceRoute, RouteLookup};
    use serde_json::json;

    fn lookup() -> RouteLookup {
        RouteLookup::from_routes(vec![ReferenceRoute {
            cod_lograd: "2700035341".into(),
            id: "57149008".into(),
            id_localidade: "1894644".into(),
        }])
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_matches_and_misses() {
        let mut records = vec![
            json!({"COD_LOGRADOURO": "2700035341"}),
            json!({"COD_LOGRADOURO": "1111111111"}),
        ];
        merge_routes(&mut records, &headers(&["COD_LOGRADOURO"]), &lookup());

        assert_eq!(records[0]["ID_ROTEIRO"], "57149008");
        assert_eq!(records[0]["ID_LOCALIDADE"], "1894644");
        assert_eq!(records[1]["ID_ROTEIRO"], "");
        assert_eq!(records[1]["ID_LOCALIDADE"], "");
    }

    #[test]
    fn test_merge_skipped_without_left_column() {
        let mut records = vec![json!({"CEP": "71065071"})];
        merge_routes(&mut records, &headers(&["CEP"]), &lookup());

        assert_eq!(records[0]["ID_ROTEIRO"], "");
        assert_eq!(records[0]["ID_LOCALIDADE"], "");
    }

    #[test]
    fn test_merge_skipped_when_lookup_disabled() {
        let mut records = vec![json!({"COD_LOGRADOURO": "2700035341"})];
        merge_routes(
            &mut records,
            &headers(&["COD_LOGRADOURO"]),
            &RouteLookup::disabled(),
        );
        assert_eq!(records[0]["ID_ROTEIRO"], "");
    }

    #[test]
    fn test_dedup_keeps_first() {
        let records = vec![
            json!({"COD_SURVEY": "S1", "ORDEM": 1}),
            json!({"COD_SURVEY": "S2"}),
            json!({"COD_SURVEY": "S1", "ORDEM": 2}),
        ];
        let (records, removed) = dedup_by_survey(records, &headers(&["COD_SURVEY"]));

        assert_eq!(removed, 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["ORDEM"], 1);
    }

    #[test]
    fn test_dedup_collapses_blank_codes() {
        let records = vec![json!({"COD_SURVEY": ""}), json!({"COD_SURVEY": ""})];
        let (records, removed) = dedup_by_survey(records, &headers(&["COD_SURVEY"]));
        assert_eq!(removed, 1);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_dedup_skipped_without_column() {
        let records = vec![json!({"A": "1"}), json!({"A": "1"})];
        let (records, removed) = dedup_by_survey(records, &headers(&["A"]));
        assert_eq!(removed, 0);
        assert_eq!(records.len(), 2);
    }
}
