//! CSV→CSV conversion orchestrators.
//!
//! Both paths run the same per-record pipeline
//! (normalize → derive → merge → validate → finalize) and write the
//! finalized 44-column table as a `;`-separated, quote-all, UTF-8-with-BOM
//! CSV. The chunked variant streams fixed-size row chunks for inputs too
//! large to hold comfortably, reporting progress after every chunk.
//!
//! Reference tables are loaded once per batch and shared read-only across
//! chunks. Failures are reported once through the progress channel
//! (`status=error`) and propagated to the caller.

use std::io::Write;
use std::path::Path;

use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::{derive, finalize, merge, normalize, text};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::parser::{self, ChunkedReader};
use crate::progress::{log_info, log_success, Progress, ProgressReporter, ProgressStatus};
use crate::reference::{load_reference_tables, RouteLookup};
use crate::validation::annotate_validation;

/// Rows per chunk on the large-file path.
pub const CHUNK_SIZE: usize = 50_000;

/// Result of one conversion batch.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    /// Batch identifier.
    pub job_id: Uuid,
    /// Output file name inside the download directory.
    pub file_name: String,
    /// Final row count.
    pub rows: usize,
    /// Duplicated survey codes dropped along the way.
    pub duplicates_removed: usize,
}

/// Run the full per-record pipeline over one set of rows.
///
/// Returns the finalized records and the number of survey-code duplicates
/// removed. Row order and count follow the deriver's partition contract;
/// only the dedup step ever drops rows.
pub fn process_records(
    records: Vec<Value>,
    headers: &[String],
    lookup: &RouteLookup,
) -> (Vec<Value>, usize) {
    log_info(format!("🔍 Colunas iniciais: {}", headers.len()));
    log_info(format!("📊 Total de linhas inicial: {}", records.len()));

    log_info("🔧 Aplicando correções de formatação...");
    let mut records = records;
    normalize::normalize_columns(&mut records);

    log_info("Criando CHAVE_LOG e agrupando...");
    let mut records = derive::derive_keys(records);

    log_info("Fazendo merge com roteiros...");
    merge::merge_routes(&mut records, headers, lookup);
    let (mut records, duplicates) = merge::dedup_by_survey(records, headers);

    log_info("Criando validação...");
    annotate_validation(&mut records);

    log_info("Finalizando estrutura...");
    let records = finalize::finalize_table(records);

    log_success(format!("Processamento concluído. Linhas: {}", records.len()));
    (records, duplicates)
}

/// Convert a whole `|`-separated latin-1 CSV in one pass.
pub fn convert_csv(
    input: &Path,
    config: &Config,
    progress: &ProgressReporter,
) -> PipelineResult<ConversionOutcome> {
    let result = convert_whole(input, config, progress);
    if let Err(ref e) = result {
        progress.error(format!("❌ Erro no processamento: {}", e));
    }
    result
}

fn convert_whole(
    input: &Path,
    config: &Config,
    progress: &ProgressReporter,
) -> PipelineResult<ConversionOutcome> {
    progress.send(
        Progress::msg("🕒 Iniciando processamento...")
            .progress(5.0)
            .current(0)
            .total(0)
            .status(ProgressStatus::Processing),
    );

    log_info(format!("📂 Carregando {}...", input.display()));
    let parsed = parser::read_csv_with_encoding(input, '|', "latin-1")?;
    log_success(format!("CSV carregado: {} linhas", parsed.records.len()));
    if parsed.records.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    progress.send(Progress::msg("📁 Carregando arquivos de roteiro...").progress(15.0));
    let lookup = RouteLookup::build(&load_reference_tables(&config.reference_dir)?);

    progress.send(Progress::msg("🔧 Processando arquivo...").progress(35.0));
    let (records, duplicates_removed) = process_records(parsed.records, &parsed.headers, &lookup);

    progress.send(Progress::msg("💾 Salvando arquivo final...").progress(95.0));
    let file_name = output_file_name();
    write_output_csv(&records, &config.download_dir.join(&file_name))?;
    log_success(format!("Arquivo convertido salvo: {}", file_name));

    let rows = records.len();
    progress.send(
        Progress::msg(format!("✅ Conversão concluída! Arquivo salvo: {}", file_name))
            .progress(100.0)
            .current(rows)
            .total(rows)
            .status(ProgressStatus::Completed),
    );

    Ok(ConversionOutcome {
        job_id: Uuid::new_v4(),
        file_name,
        rows,
        duplicates_removed,
    })
}

/// Convert a large `|`-separated latin-1 CSV in fixed-size chunks.
///
/// Each chunk runs the full pipeline independently (dedup included, so
/// duplicate survey codes spanning chunk boundaries survive — a documented
/// property of this path); the processed chunks are concatenated and written
/// once.
pub fn convert_csv_chunked(
    input: &Path,
    config: &Config,
    progress: &ProgressReporter,
) -> PipelineResult<ConversionOutcome> {
    let result = convert_chunked_inner(input, config, progress);
    if let Err(ref e) = result {
        progress.error(format!("❌ Erro no processamento: {}", e));
    }
    result
}

fn convert_chunked_inner(
    input: &Path,
    config: &Config,
    progress: &ProgressReporter,
) -> PipelineResult<ConversionOutcome> {
    progress.send(
        Progress::msg("📂 Iniciando carregamento do arquivo...")
            .progress(5.0)
            .status(ProgressStatus::Processing),
    );

    let file_size_mb = std::fs::metadata(input)?.len() as f64 / (1024.0 * 1024.0);
    progress.send(
        Progress::msg(format!("📊 Tamanho do arquivo: {:.2} MB", file_size_mb)).progress(10.0),
    );

    progress.send(Progress::msg("📁 Carregando arquivos de roteiro...").progress(15.0));
    let lookup = RouteLookup::build(&load_reference_tables(&config.reference_dir)?);
    progress.send(Progress::msg("✅ Roteiros carregados com sucesso").progress(20.0));

    progress.send(Progress::msg("🔢 Contando linhas totais...").progress(25.0));
    let total_rows = parser::count_data_rows(input)?;
    progress.send(
        Progress::msg(format!("📊 Total de linhas encontradas: {}", total_rows))
            .progress(30.0)
            .total(total_rows),
    );
    if total_rows == 0 {
        return Err(PipelineError::EmptyInput);
    }

    progress.send(Progress::msg("🔄 Iniciando processamento em chunks...").progress(35.0));
    let bytes = std::fs::read(input)?;
    let content =
        parser::decode_with(&bytes, "latin-1").ok_or_else(|| crate::error::CsvError::Decode {
            tried: vec!["latin-1".to_string()],
        })?;
    let mut reader = ChunkedReader::new(&content, '|', CHUNK_SIZE)?;
    let headers = reader.headers().to_vec();

    let (records, duplicates_removed) =
        run_chunks(&mut reader, &headers, &lookup, total_rows, CHUNK_SIZE, progress);

    progress.send(Progress::msg("🔗 Combinando chunks processados...").progress(92.0));

    progress.send(Progress::msg("💾 Salvando arquivo final...").progress(95.0));
    let file_name = output_file_name();
    write_output_csv(&records, &config.download_dir.join(&file_name))?;
    log_success(format!("Arquivo convertido salvo: {}", file_name));

    let rows = records.len();
    progress.send(
        Progress::msg(format!("✅ Conversão concluída! Arquivo salvo: {}", file_name))
            .progress(100.0)
            .current(total_rows)
            .status(ProgressStatus::Completed),
    );

    Ok(ConversionOutcome {
        job_id: Uuid::new_v4(),
        file_name,
        rows,
        duplicates_removed,
    })
}

/// Run every chunk through the pipeline, reporting progress per chunk.
fn run_chunks(
    reader: &mut ChunkedReader<'_>,
    headers: &[String],
    lookup: &RouteLookup,
    total_rows: usize,
    chunk_size: usize,
    progress: &ProgressReporter,
) -> (Vec<Value>, usize) {
    let mut records = Vec::new();
    let mut duplicates_total = 0;
    let mut chunk_number = 0;

    while let Some(chunk) = reader.next_chunk() {
        chunk_number += 1;
        let current = (chunk_number * chunk_size).min(total_rows);
        let pct = chunk_progress(chunk_number, total_rows, chunk_size);

        progress.send(
            Progress::msg(format!(
                "📦 Processando chunk {} ({} linhas)...",
                chunk_number,
                chunk.len()
            ))
            .progress(pct)
            .current(current),
        );

        let (processed, duplicates) = process_records(chunk, headers, lookup);
        duplicates_total += duplicates;
        records.extend(processed);

        progress.send(Progress::msg(format!("✅ Chunk {} processado", chunk_number)).progress(pct));
    }

    (records, duplicates_total)
}

/// Map a chunk index into the [35, 90] progress band.
fn chunk_progress(chunk_number: usize, total_rows: usize, chunk_size: usize) -> f32 {
    let pct = 35.0 + (chunk_number as f64 * 55.0) / (total_rows as f64 / chunk_size as f64);
    pct.min(90.0) as f32
}

/// Timestamped output file name.
fn output_file_name() -> String {
    format!(
        "Enderecos_Totais_CO_Convertido_{}.csv",
        Local::now().format("%Y%m%d%H%M%S")
    )
}

/// Write the finalized table: `;`-separated, every field quoted, UTF-8 with
/// byte-order mark, empty string for anything missing.
///
/// A failed write never leaves a partial file behind.
fn write_output_csv(records: &[Value], path: &Path) -> PipelineResult<()> {
    let result = write_records(records, path);
    if result.is_err() {
        let _ = std::fs::remove_file(path);
    }
    result
}

fn write_records(records: &[Value], path: &Path) -> PipelineResult<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(b"\xEF\xBB\xBF")?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(file);

    writer.write_record(finalize::FINAL_COLUMNS)?;
    for record in records {
        let row: Vec<String> = finalize::FINAL_COLUMNS
            .iter()
            .map(|&column| text(record, column))
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
