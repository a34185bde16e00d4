//! Record validation and conversion-input schema checking.
//!
//! Two concerns live here:
//!
//! - the per-record validation outcome derived from ORDEM and the numeric
//!   argument of the treated complement-3 value, and
//! - the required-column check run against a conversion input before a
//!   batch starts. The check returns a structured [`SchemaReport`], never
//!   an error: an invalid schema is a result the caller presents, not a
//!   failure of the pipeline.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::CsvResult;
use crate::parser::{decode_with, detect_separator, split_headers};
use crate::transform::{set, set_text, text};

// =============================================================================
// Validation outcome
// =============================================================================

/// Per-record validation outcome, mutually exclusive, first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// ORDEM == 0: the record never entered a prefix group.
    SemPrefixoValido,
    /// The treated complement-3 carries no number.
    Complemento3Vazio,
    /// The treated complement-3 number exceeds 10.
    Complemento3AcimaDe10,
    /// The group sequence number exceeds 10.
    ResultadoAcimaDe10,
    /// Everything checks out.
    Ok,
}

impl ValidationOutcome {
    /// Classify from the two derived numbers, in fixed priority order.
    pub fn classify(ordem: u64, num_argumento3: u64) -> Self {
        if ordem == 0 {
            Self::SemPrefixoValido
        } else if num_argumento3 == 0 {
            Self::Complemento3Vazio
        } else if num_argumento3 > 10 {
            Self::Complemento3AcimaDe10
        } else if ordem > 10 {
            Self::ResultadoAcimaDe10
        } else {
            Self::Ok
        }
    }

    /// The literal written to the VALIDACAO column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SemPrefixoValido => "SEM PREFIXO VÁLIDO",
            Self::Complemento3Vazio => "VERIFICAR COMPLEMENTO3-VAZIO",
            Self::Complemento3AcimaDe10 => "VERIFICAR COMPLEMENTO3 >10",
            Self::ResultadoAcimaDe10 => "VERIFICAR RESULTADO >10",
            Self::Ok => "OK",
        }
    }
}

static FIRST_DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("digit-run pattern"));

/// First run of digits in the text as a number, 0 when there is none.
/// Absurdly long runs saturate rather than fail.
pub fn first_digit_run(s: &str) -> u64 {
    FIRST_DIGIT_RUN
        .find(s)
        .map(|m| m.as_str().parse().unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Annotate every record with NUM_ARGUMENTO3_COMPLEMENTO3 and VALIDACAO.
pub fn annotate_validation(records: &mut [Value]) {
    for record in records.iter_mut() {
        let num = first_digit_run(&text(record, "COMPLEMENTO3_TRATADO"));
        let ordem = record.get("ORDEM").and_then(Value::as_u64).unwrap_or(0);
        set(record, "NUM_ARGUMENTO3_COMPLEMENTO3", json!(num));
        set_text(
            record,
            "VALIDACAO",
            ValidationOutcome::classify(ordem, num).as_str(),
        );
    }
}

// =============================================================================
// Conversion-input schema check
// =============================================================================

/// Columns a conversion input must carry (everything the pipeline consumes;
/// the derived columns are produced, not required).
pub const REQUIRED_COLUMNS: &[&str] = &[
    "CELULA",
    "ESTACAO_ABASTECEDORA",
    "UF",
    "MUNICIPIO",
    "LOCALIDADE",
    "COD_LOCALIDADE",
    "LOCALIDADE_ABREV",
    "LOGRADOURO",
    "COD_LOGRADOURO",
    "NUM_FACHADA",
    "COMPLEMENTO",
    "COMPLEMENTO2",
    "COMPLEMENTO3",
    "CEP",
    "BAIRRO",
    "COD_SURVEY",
    "QUANTIDADE_UMS",
    "COD_VIABILIDADE",
    "TIPO_VIABILIDADE",
    "TIPO_REDE",
    "UCS_RESIDENCIAIS",
    "UCS_COMERCIAIS",
    "NOME_CDO",
    "ID_ENDERECO",
    "LATITUDE",
    "LONGITUDE",
    "TIPO_SURVEY",
    "REDE_INTERNA",
    "UMS_CERTIFICADAS",
    "REDE_EDIF_CERT",
    "DISP_COMERCIAL",
    "ESTADO_CONTROLE",
    "DATA_ESTADO_CONTROLE",
    "ID_CELULA",
    "QUANTIDADE_HCS",
];

/// Outcome of the required-column check.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    pub valid: bool,
    pub missing_columns: Vec<String>,
    pub extra_columns: Vec<String>,
    pub total_columns: usize,
    pub found_columns: Vec<String>,
}

/// Check a conversion input's header line against [`REQUIRED_COLUMNS`].
///
/// The header is read in latin-1, the separator detected (`|`, `;`, then
/// `,`), and the comparison is case- and whitespace-insensitive.
pub fn validate_required_columns(path: &Path) -> CsvResult<SchemaReport> {
    let bytes = std::fs::read(path)?;
    let content = decode_with(&bytes, "latin-1").unwrap_or_default();
    let header_line = content.lines().next().unwrap_or("");

    let separator = detect_separator(header_line);
    let found: BTreeSet<String> = split_headers(header_line, separator)
        .into_iter()
        .map(|h| h.trim().to_uppercase())
        .filter(|h| !h.is_empty())
        .collect();
    let required: BTreeSet<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();

    let missing: Vec<String> = required.difference(&found).cloned().collect();
    let extra: Vec<String> = found.difference(&required).cloned().collect();

    Ok(SchemaReport {
        valid: missing.is_empty(),
        missing_columns: missing,
        extra_columns: extra,
        total_columns: found.len(),
        found_columns: found.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_table() {
        use ValidationOutcome::*;
        // ORDEM == 0 wins regardless of the argument
        assert_eq!(ValidationOutcome::classify(0, 0), SemPrefixoValido);
        assert_eq!(ValidationOutcome::classify(0, 99), SemPrefixoValido);
        // then the empty argument
        assert_eq!(ValidationOutcome::classify(1, 0), Complemento3Vazio);
        // then the argument bound
        assert_eq!(ValidationOutcome::classify(1, 11), Complemento3AcimaDe10);
        assert_eq!(ValidationOutcome::classify(20, 11), Complemento3AcimaDe10);
        // then the ORDEM bound
        assert_eq!(ValidationOutcome::classify(11, 5), ResultadoAcimaDe10);
        // else OK
        assert_eq!(ValidationOutcome::classify(10, 10), Ok);
        assert_eq!(ValidationOutcome::classify(1, 1), Ok);
    }

    #[test]
    fn test_outcome_literals() {
        assert_eq!(
            ValidationOutcome::SemPrefixoValido.as_str(),
            "SEM PREFIXO VÁLIDO"
        );
        assert_eq!(
            ValidationOutcome::Complemento3Vazio.as_str(),
            "VERIFICAR COMPLEMENTO3-VAZIO"
        );
        assert_eq!(
            ValidationOutcome::Complemento3AcimaDe10.as_str(),
            "VERIFICAR COMPLEMENTO3 >10"
        );
        assert_eq!(
            ValidationOutcome::ResultadoAcimaDe10.as_str(),
            "VERIFICAR RESULTADO >10"
        );
        assert_eq!(ValidationOutcome::Ok.as_str(), "OK");
    }

    #[test]
    fn test_first_digit_run() {
        assert_eq!(first_digit_run("LT 123B45"), 123);
        assert_eq!(first_digit_run("LT"), 0);
        assert_eq!(first_digit_run(""), 0);
        assert_eq!(first_digit_run("99999999999999999999999"), u64::MAX);
    }

    #[test]
    fn test_annotate_validation() {
        let mut records = vec![
            json!({"ORDEM": 1, "COMPLEMENTO3_TRATADO": "LT 5"}),
            json!({"ORDEM": 0, "COMPLEMENTO3_TRATADO": "LT 5"}),
            json!({"ORDEM": 2, "COMPLEMENTO3_TRATADO": "LT"}),
        ];
        annotate_validation(&mut records);

        assert_eq!(records[0]["NUM_ARGUMENTO3_COMPLEMENTO3"], 5);
        assert_eq!(records[0]["VALIDACAO"], "OK");
        assert_eq!(records[1]["VALIDACAO"], "SEM PREFIXO VÁLIDO");
        assert_eq!(records[2]["VALIDACAO"], "VERIFICAR COMPLEMENTO3-VAZIO");
    }

    #[test]
    fn test_schema_report_complete_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, format!("{}\n", REQUIRED_COLUMNS.join("|"))).unwrap();

        let report = validate_required_columns(&path).unwrap();
        assert!(report.valid);
        assert!(report.missing_columns.is_empty());
        assert!(report.extra_columns.is_empty());
        assert_eq!(report.total_columns, REQUIRED_COLUMNS.len());
    }

    #[test]
    fn test_schema_report_missing_and_extra() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        // lowercase + padding must not matter; CEP missing, SOBRA extra
        let mut columns: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|&&c| c != "CEP")
            .map(|c| format!(" {} ", c.to_lowercase()))
            .collect();
        columns.push("SOBRA".into());
        std::fs::write(&path, format!("{}\n", columns.join(";"))).unwrap();

        let report = validate_required_columns(&path).unwrap();
        assert!(!report.valid);
        assert_eq!(report.missing_columns, vec!["CEP"]);
        assert_eq!(report.extra_columns, vec!["SOBRA"]);
    }
}
