//! Final table projection and value cleanup.

use serde_json::{Map, Value};

use super::text;

/// The finalized output schema, in column order.
pub const FINAL_COLUMNS: [&str; 44] = [
    "CHAVE_LOG",
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
    "ID_ROTEIRO",
    "ID_LOCALIDADE",
    "COD_ZONA",
    "ORDEM",
    "RESULTADO",
    "COMPARATIVO",
    "NUM_ARGUMENTO3_COMPLEMENTO3",
    "VALIDACAO",
];

/// Project records onto the finalized schema.
///
/// The untouched complement-3 value goes back into its output column, absent
/// columns become empty strings, working columns disappear, and textual
/// null/boolean literals are rewritten so no null representation survives.
pub fn finalize_table(records: Vec<Value>) -> Vec<Value> {
    records
        .into_iter()
        .map(|record| {
            let original = text(&record, "COMPLEMENTO3_ORIGINAL");
            let mut out = Map::new();
            for &column in FINAL_COLUMNS.iter() {
                let value = if column == "COMPLEMENTO3" {
                    Value::String(original.clone())
                } else {
                    record
                        .get(column)
                        .cloned()
                        .unwrap_or_else(|| Value::String(String::new()))
                };
                out.insert(column.to_string(), clean_cell(value));
            }
            Value::Object(out)
        })
        .collect()
}

/// Rewrite textual null literals and Python-style boolean literals.
fn clean_cell(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(match s.as_str() {
            "NaN" | "nan" | "None" | "null" => String::new(),
            "True" => "VERDADEIRO".to_string(),
            "False" => "FALSO".to_string(),
            _ => s,
        }),
        Value::Null => Value::String(String::new()),
        other => other,
    }
}
