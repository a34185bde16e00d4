//! Column normalization: canonical string forms for CEP, street code and the
//! key-component fields.

use serde_json::Value;

use super::{set_text, text};

/// The five fields joined into CHAVE_LOG, in join order.
pub const KEY_COLUMNS: &[&str] = &[
    "ESTACAO_ABASTECEDORA",
    "LOCALIDADE",
    "LOGRADOURO",
    "COMPLEMENTO",
    "COMPLEMENTO2",
];

/// Keep only ASCII digits.
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Canonical CEP: digits only, truncated to 8, left-zero-padded to 8.
/// Empty stays empty.
pub fn normalize_cep(raw: &str) -> String {
    let digits: String = digits_only(raw.trim()).chars().take(8).collect();
    if digits.is_empty() {
        digits
    } else {
        format!("{:0>8}", digits)
    }
}

/// Canonical street code: digits only, truncated to 10.
pub fn normalize_street_code(raw: &str) -> String {
    digits_only(raw.trim()).chars().take(10).collect()
}

/// Normalize the raw columns in place.
///
/// CEP and COD_LOGRADOURO are rewritten only where present; the key
/// components are always written back trimmed, substituting empty string for
/// missing columns. No error conditions.
pub fn normalize_columns(records: &mut [Value]) {
    for record in records.iter_mut() {
        if record.get("CEP").is_some() {
            let cep = normalize_cep(&text(record, "CEP"));
            set_text(record, "CEP", cep);
        }
        if record.get("COD_LOGRADOURO").is_some() {
            let cod = normalize_street_code(&text(record, "COD_LOGRADOURO"));
            set_text(record, "COD_LOGRADOURO", cod);
        }
        for &column in KEY_COLUMNS {
            let value = text(record, column).trim().to_string();
            set_text(record, column, value);
        }
    }
}
