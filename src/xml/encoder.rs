//! Building-record XML encoder.
//!
//! Maps one finalized address record to an `edificio` document. Every
//! or-default field substitutes its documented literal when the source value
//! is missing or blank; COD_SURVEY has no default and is required.

use chrono::Local;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;

use super::complemento::{complement_argument, complement_code};
use crate::error::{XmlError, XmlResult};
use crate::transform::text;

/// Document version stamped on the root element.
pub const EDIFICIO_VERSAO: &str = "7.9.2";

/// Parse a coordinate written with a decimal comma.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse().ok()
}

fn field_or(record: &Value, key: &str, default: &str) -> String {
    let value = text(record, key);
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn write_text<W: std::io::Write>(writer: &mut Writer<W>, tag: &str, value: &str) -> XmlResult<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Encode one record as a complete `edificio` document.
///
/// `complemento3_vazio` is the batch-wide flag: when set, the third
/// complement block is omitted from every document regardless of the
/// record's RESULTADO.
pub fn encode_building(record: &Value, complemento3_vazio: bool) -> XmlResult<Vec<u8>> {
    let survey = text(record, "COD_SURVEY");
    if survey.trim().is_empty() {
        return Err(XmlError::MissingField("COD_SURVEY".into()));
    }

    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("edificio");
    root.push_attribute(("tipo", "M"));
    root.push_attribute(("versao", EDIFICIO_VERSAO));
    writer.write_event(Event::Start(root))?;

    write_text(&mut writer, "gravado", "false")?;
    write_text(&mut writer, "nEdificio", &survey)?;

    if let Some(longitude) = parse_coordinate(&text(record, "LONGITUDE")) {
        write_text(&mut writer, "coordX", &longitude.to_string())?;
    }
    if let Some(latitude) = parse_coordinate(&text(record, "LATITUDE")) {
        write_text(&mut writer, "coordY", &latitude.to_string())?;
    }

    let codigo_zona = field_or(record, "COD_ZONA", "DF-GURX-ETGR-CEOS-68");
    write_text(&mut writer, "codigoZona", &codigo_zona)?;
    write_text(&mut writer, "nomeZona", &codigo_zona)?;

    let localidade = field_or(record, "LOCALIDADE", "GUARA");
    write_text(&mut writer, "localidade", &localidade)?;

    writer.write_event(Event::Start(BytesStart::new("enderecoEdificio")))?;
    write_text(&mut writer, "id", &field_or(record, "ID_ENDERECO", "93128133"))?;

    let logradouro = format!(
        "{}, {}, {}, {} - {} ({})",
        text(record, "LOGRADOURO"),
        text(record, "BAIRRO"),
        text(record, "MUNICIPIO"),
        text(record, "LOCALIDADE"),
        text(record, "UF"),
        text(record, "COD_LOGRADOURO"),
    );
    write_text(&mut writer, "logradouro", &logradouro)?;
    write_text(
        &mut writer,
        "numero_fachada",
        &field_or(record, "NUM_FACHADA", "SN"),
    )?;

    let complemento1 = text(record, "COMPLEMENTO");
    write_text(&mut writer, "id_complemento1", &complement_code(&complemento1))?;
    write_text(&mut writer, "argumento1", &complement_argument(&complemento1))?;

    let complemento2 = text(record, "COMPLEMENTO2");
    write_text(&mut writer, "id_complemento2", &complement_code(&complemento2))?;
    write_text(&mut writer, "argumento2", &complement_argument(&complemento2))?;

    if !complemento3_vazio {
        let resultado = text(record, "RESULTADO");
        if !resultado.trim().is_empty() {
            write_text(&mut writer, "id_complemento3", &complement_code(&resultado))?;
            write_text(&mut writer, "argumento3", &complement_argument(&resultado))?;
        }
    }

    write_text(&mut writer, "cep", &field_or(record, "CEP", "71065071"))?;
    write_text(&mut writer, "bairro", &field_or(record, "BAIRRO", &localidade))?;
    write_text(
        &mut writer,
        "id_roteiro",
        &field_or(record, "ID_ROTEIRO", "57149008"),
    )?;
    write_text(
        &mut writer,
        "id_localidade",
        &field_or(record, "ID_LOCALIDADE", "1894644"),
    )?;
    write_text(
        &mut writer,
        "cod_lograd",
        &field_or(record, "COD_LOGRADOURO", "2700035341"),
    )?;
    writer.write_event(Event::End(BytesEnd::new("enderecoEdificio")))?;

    writer.write_event(Event::Start(BytesStart::new("tecnico")))?;
    write_text(&mut writer, "id", "1828772688")?;
    write_text(&mut writer, "nome", "NADIA CAROLINE")?;
    writer.write_event(Event::End(BytesEnd::new("tecnico")))?;

    writer.write_event(Event::Start(BytesStart::new("empresa")))?;
    write_text(&mut writer, "id", "42541126")?;
    write_text(&mut writer, "nome", "TELEMONT")?;
    writer.write_event(Event::End(BytesEnd::new("empresa")))?;

    write_text(
        &mut writer,
        "data",
        &Local::now().format("%Y%m%d%H%M%S").to_string(),
    )?;

    let total_ucs = {
        let raw = text(record, "QUANTIDADE_UMS");
        let raw = raw.trim().to_string();
        raw.parse::<i64>()
            .or_else(|_| raw.parse::<f64>().map(|f| f as i64))
            .unwrap_or(1)
    };
    write_text(&mut writer, "totalUCs", &total_ucs.to_string())?;
    write_text(&mut writer, "ocupacao", "EDIFICACAOCOMPLETA")?;
    write_text(&mut writer, "numPisos", "1")?;
    write_text(&mut writer, "destinacao", "COMERCIO")?;

    writer.write_event(Event::End(BytesEnd::new("edificio")))?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_record() -> Value {
        json!({
            "COD_SURVEY": "SVY123",
            "LATITUDE": "-16,6869",
            "LONGITUDE": "-49,2648",
            "COD_ZONA": "GO-GYN-ETGO-CEOS-12",
            "LOCALIDADE": "GOIANIA",
            "ID_ENDERECO": "12345678",
            "LOGRADOURO": "RUA 10",
            "BAIRRO": "SETOR CENTRAL",
            "MUNICIPIO": "GOIANIA",
            "UF": "GO",
            "COD_LOGRADOURO": "2700035341",
            "NUM_FACHADA": "100",
            "COMPLEMENTO": "QD 5",
            "COMPLEMENTO2": "LT 10",
            "RESULTADO": "LT1",
            "CEP": "74000000",
            "ID_ROTEIRO": "111",
            "ID_LOCALIDADE": "222",
            "QUANTIDADE_UMS": "3"
        })
    }

    fn encode_str(record: &Value, complemento3_vazio: bool) -> String {
        String::from_utf8(encode_building(record, complemento3_vazio).unwrap()).unwrap()
    }

    #[test]
    fn test_full_document() {
        let xml = encode_str(&full_record(), false);

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<edificio tipo=\"M\" versao=\"7.9.2\">"));
        assert!(xml.contains("<gravado>false</gravado>"));
        assert!(xml.contains("<nEdificio>SVY123</nEdificio>"));
        assert!(xml.contains("<coordX>-49.2648</coordX>"));
        assert!(xml.contains("<coordY>-16.6869</coordY>"));
        assert!(xml.contains("<codigoZona>GO-GYN-ETGO-CEOS-12</codigoZona>"));
        assert!(xml.contains("<nomeZona>GO-GYN-ETGO-CEOS-12</nomeZona>"));
        assert!(xml.contains(
            "<logradouro>RUA 10, SETOR CENTRAL, GOIANIA, GOIANIA - GO (2700035341)</logradouro>"
        ));
        assert!(xml.contains("<numero_fachada>100</numero_fachada>"));
        assert!(xml.contains("<id_complemento1>68</id_complemento1>"));
        assert!(xml.contains("<argumento1>5</argumento1>"));
        assert!(xml.contains("<id_complemento2>60</id_complemento2>"));
        assert!(xml.contains("<argumento2>10</argumento2>"));
        assert!(xml.contains("<id_complemento3>60</id_complemento3>"));
        assert!(xml.contains("<argumento3>1</argumento3>"));
        assert!(xml.contains("<cep>74000000</cep>"));
        assert!(xml.contains("<id>1828772688</id>"));
        assert!(xml.contains("<nome>NADIA CAROLINE</nome>"));
        assert!(xml.contains("<id>42541126</id>"));
        assert!(xml.contains("<nome>TELEMONT</nome>"));
        assert!(xml.contains("<totalUCs>3</totalUCs>"));
        assert!(xml.contains("<ocupacao>EDIFICACAOCOMPLETA</ocupacao>"));
        assert!(xml.contains("<numPisos>1</numPisos>"));
        assert!(xml.contains("<destinacao>COMERCIO</destinacao>"));
    }

    #[test]
    fn test_defaults_substituted() {
        let xml = encode_str(&json!({"COD_SURVEY": "SVY1"}), true);

        assert!(xml.contains("<codigoZona>DF-GURX-ETGR-CEOS-68</codigoZona>"));
        assert!(xml.contains("<localidade>GUARA</localidade>"));
        assert!(xml.contains("<id>93128133</id>"));
        assert!(xml.contains("<numero_fachada>SN</numero_fachada>"));
        assert!(xml.contains("<cep>71065071</cep>"));
        // BAIRRO falls back to the resolved localidade
        assert!(xml.contains("<bairro>GUARA</bairro>"));
        assert!(xml.contains("<id_roteiro>57149008</id_roteiro>"));
        assert!(xml.contains("<id_localidade>1894644</id_localidade>"));
        assert!(xml.contains("<cod_lograd>2700035341</cod_lograd>"));
        assert!(xml.contains("<totalUCs>1</totalUCs>"));
        // empty complements resolve to the default code and argument
        assert!(xml.contains("<id_complemento1>60</id_complemento1>"));
        assert!(xml.contains("<argumento1>1</argumento1>"));
    }

    #[test]
    fn test_blank_fields_are_defaulted_like_missing() {
        let xml = encode_str(&json!({"COD_SURVEY": "SVY1", "CEP": "  ", "LOCALIDADE": ""}), true);
        assert!(xml.contains("<cep>71065071</cep>"));
        assert!(xml.contains("<localidade>GUARA</localidade>"));
    }

    #[test]
    fn test_unparsable_coordinates_omitted() {
        let xml = encode_str(
            &json!({"COD_SURVEY": "SVY1", "LATITUDE": "abc", "LONGITUDE": ""}),
            true,
        );
        assert!(!xml.contains("<coordX>"));
        assert!(!xml.contains("<coordY>"));
    }

    #[test]
    fn test_complemento3_block_controlled_by_flag_and_value() {
        // flag set: block omitted even when RESULTADO is present
        let xml = encode_str(&full_record(), true);
        assert!(!xml.contains("id_complemento3"));
        assert!(!xml.contains("argumento3"));

        // flag clear but RESULTADO blank: block omitted too
        let mut record = full_record();
        record["RESULTADO"] = json!("  ");
        let xml = encode_str(&record, false);
        assert!(!xml.contains("id_complemento3"));
    }

    #[test]
    fn test_missing_survey_code_is_an_error() {
        let err = encode_building(&json!({"CEP": "71065071"}), true).unwrap_err();
        assert!(matches!(err, XmlError::MissingField(ref f) if f == "COD_SURVEY"));
    }

    #[test]
    fn test_coordinate_parsing() {
        assert_eq!(parse_coordinate("-16,6869"), Some(-16.6869));
        assert_eq!(parse_coordinate("-16.6869"), Some(-16.6869));
        assert_eq!(parse_coordinate(""), None);
        assert_eq!(parse_coordinate("n/a"), None);
    }
}
