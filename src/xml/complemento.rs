//! Complement classification: free text → numeric code plus residual
//! argument.
//!
//! A complement like `"QD 12"` resolves through the first two characters of
//! its uppercased form (`QD` → quadra) and keeps everything after them as
//! the argument (`"12"`). The lookup is total: unknown prefixes and
//! empty/short input resolve to code 60 (LOTE), and a missing argument
//! resolves to `"1"`.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Code used when the prefix is unknown or the text is empty/short.
pub const DEFAULT_COMPLEMENT_CODE: u32 = 60;

/// Two-letter complement prefix → survey-system code.
static CODIGOS_COMPLEMENTO: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("AN", 7),  // ANDAR
        ("AP", 11), // APARTAMENTO
        ("BL", 14), // BLOCO
        ("CA", 22), // CASA
        ("CH", 26), // CHACARA
        ("CJ", 31), // CONJUNTO
        ("ED", 38), // EDIFICIO
        ("FU", 43), // FUNDOS
        ("GA", 46), // GALPAO
        ("KI", 50), // KITNET
        ("LJ", 55), // LOJA
        ("LT", 60), // LOTE
        ("QD", 68), // QUADRA
        ("SB", 78), // SOBRADO
        ("SL", 75), // SALA
        ("TE", 83), // TERREO
        ("VL", 88), // VILA
    ])
});

/// Resolve the complement code from the first two characters of the
/// uppercased, trimmed text.
pub fn complement_code(text: &str) -> String {
    let treated = text.trim().to_uppercase();
    let prefix: String = treated.chars().take(2).collect();
    if prefix.chars().count() < 2 {
        return DEFAULT_COMPLEMENT_CODE.to_string();
    }
    CODIGOS_COMPLEMENTO
        .get(prefix.as_str())
        .copied()
        .unwrap_or(DEFAULT_COMPLEMENT_CODE)
        .to_string()
}

/// Everything after the first two characters, trimmed; `"1"` when the text
/// is shorter than two characters or nothing remains.
pub fn complement_argument(text: &str) -> String {
    let treated = text.trim();
    if treated.chars().count() < 2 {
        return "1".to_string();
    }
    let argument: String = treated.chars().skip(2).collect();
    let argument = argument.trim();
    if argument.is_empty() {
        "1".to_string()
    } else {
        argument.to_string()
    }
}
