//! Equation conversion
//!
//! A fixed pool of workers pulls jobs from a shared cursor. Each job runs in
//! its own scratch directory under a per-batch directory, bounded by the
//! per-call timeout. Failures never escape a job: they become placeholder
//! results that carry the diagnostic.

use std::collections::BTreeMap;
use std::fs::File;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::process::Command;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::omml::omml_to_latex;
use crate::config::{ConversionConfig, INPUT_PLACEHOLDER};
use crate::document::parsing::xml;
use crate::document::{ConversionResult, DisplayType, EquationJob};
use crate::error::ConversionError;

/// Marker embedded in placeholder markup; validation treats it as invalid
pub const ERROR_MARKER: &str = "CONVERSION ERROR";

/// `program` value selecting the in-process converter
pub const BUILTIN_PROGRAM: &str = "builtin";

/// Placeholder markup standing in for a failed conversion
pub fn placeholder(diagnostic: &str) -> String {
    let diagnostic = diagnostic.replace(['{', '}', '\\'], "");
    format!("\\text{{[{ERROR_MARKER}: {diagnostic}]}}")
}

/// Result of a failed job
pub fn failure(error: &ConversionError) -> ConversionResult {
    let diagnostic = error.to_string();
    ConversionResult {
        latex: placeholder(&diagnostic),
        success: false,
        diagnostic: Some(diagnostic),
    }
}

/// Converts one equation to LaTeX.
///
/// `scratch` is an empty directory owned by this call and removed afterwards.
pub trait Converter: Send + Sync + 'static {
    fn convert(
        &self,
        job: &EquationJob,
        scratch: &Path,
    ) -> impl Future<Output = Result<String, ConversionError>> + Send;
}

/// Runs an external program on a wrapper document holding the equation
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Converter for CommandConverter {
    async fn convert(&self, job: &EquationJob, scratch: &Path) -> Result<String, ConversionError> {
        let input = scratch.join("equation.docx");
        write_wrapper_document(&input, job).map_err(ConversionError::Scratch)?;

        let input_arg = input.to_string_lossy();
        let output = Command::new(&self.program)
            .args(
                self.args
                    .iter()
                    .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input_arg)),
            )
            .current_dir(scratch)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConversionError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let latex = strip_math_delimiters(&String::from_utf8_lossy(&output.stdout));
        if latex.is_empty() {
            return Err(ConversionError::EmptyOutput);
        }
        Ok(latex)
    }
}

/// Renders OMML in-process, without a subprocess
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinConverter;

impl Converter for BuiltinConverter {
    async fn convert(&self, job: &EquationJob, _scratch: &Path) -> Result<String, ConversionError> {
        let math = xml::parse(&job.omml).map_err(ConversionError::Markup)?;
        let latex = omml_to_latex(&math);
        if latex.is_empty() {
            return Err(ConversionError::EmptyOutput);
        }
        Ok(latex)
    }
}

/// The converter named by the configuration
#[derive(Debug, Clone)]
pub enum ConfiguredConverter {
    Command(CommandConverter),
    Builtin(BuiltinConverter),
}

impl ConfiguredConverter {
    pub fn from_config(config: &ConversionConfig) -> Self {
        if config.program == BUILTIN_PROGRAM {
            ConfiguredConverter::Builtin(BuiltinConverter)
        } else {
            ConfiguredConverter::Command(CommandConverter::new(
                config.program.clone(),
                config.args.clone(),
            ))
        }
    }
}

impl Converter for ConfiguredConverter {
    async fn convert(&self, job: &EquationJob, scratch: &Path) -> Result<String, ConversionError> {
        match self {
            ConfiguredConverter::Command(converter) => converter.convert(job, scratch).await,
            ConfiguredConverter::Builtin(converter) => converter.convert(job, scratch).await,
        }
    }
}

/// Fixed-size pool of conversion workers
#[derive(Debug)]
pub struct ConversionPool<C> {
    converter: Arc<C>,
    workers: usize,
    timeout: Duration,
    batch_timeout: Option<Duration>,
}

impl<C: Converter> ConversionPool<C> {
    pub fn new(converter: C, config: &ConversionConfig) -> Self {
        Self {
            converter: Arc::new(converter),
            workers: config.workers.max(1),
            timeout: config.timeout(),
            batch_timeout: config.batch_timeout(),
        }
    }

    /// Convert every job; the map holds exactly one result per global index
    pub async fn convert_all(&self, jobs: &[EquationJob]) -> BTreeMap<usize, ConversionResult> {
        if jobs.is_empty() {
            return BTreeMap::new();
        }

        let batch_dir = match tempfile::Builder::new()
            .prefix("minutex-batch-")
            .tempdir()
        {
            Ok(dir) => dir,
            Err(err) => {
                warn!(error = %err, "failed to create batch scratch directory");
                let error = ConversionError::Scratch(err);
                return jobs
                    .iter()
                    .map(|job| (job.global_index, failure(&error)))
                    .collect();
            }
        };

        let jobs: Arc<Vec<EquationJob>> = Arc::new(jobs.to_vec());
        let cursor = Arc::new(AtomicUsize::new(0));
        let batch_path = Arc::new(batch_dir.path().to_path_buf());
        let deadline = self.batch_timeout.map(|limit| Instant::now() + limit);
        let worker_count = self.workers.min(jobs.len());

        debug!(
            jobs = jobs.len(),
            workers = worker_count,
            "starting equation conversion"
        );

        let mut workers = JoinSet::new();
        for _ in 0..worker_count {
            let jobs = Arc::clone(&jobs);
            let cursor = Arc::clone(&cursor);
            let batch_path = Arc::clone(&batch_path);
            let converter = Arc::clone(&self.converter);
            let timeout = self.timeout;

            workers.spawn(async move {
                let mut results = Vec::new();
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(job) = jobs.get(index) else {
                        break;
                    };

                    let outcome = if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        Err(ConversionError::BatchDeadline)
                    } else {
                        run_isolated(&converter, job, &batch_path, timeout).await
                    };
                    results.push((job.global_index, into_result(job, outcome)));
                }
                results
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(batch) => results.extend(batch),
                Err(err) => warn!(error = %err, "conversion worker aborted"),
            }
        }

        for job in jobs.iter() {
            results.entry(job.global_index).or_insert_with(|| {
                failure(&ConversionError::Worker(
                    "no result recorded for this equation".to_string(),
                ))
            });
        }

        if let Err(err) = batch_dir.close() {
            warn!(error = %err, "failed to remove batch scratch directory");
        }

        results
    }
}

async fn run_job<C: Converter>(
    converter: &C,
    job: &EquationJob,
    batch_path: &Path,
    timeout: Duration,
) -> Result<String, ConversionError> {
    // Removed when this function returns, whatever the outcome
    let scratch = tempfile::Builder::new()
        .prefix(&format!("eq-{:05}-", job.global_index))
        .tempdir_in(batch_path)
        .map_err(ConversionError::Scratch)?;

    match tokio::time::timeout(timeout, converter.convert(job, scratch.path())).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ConversionError::Timeout(timeout)),
    }
}

/// Run one job on its own task, so a panicking converter only loses this job
async fn run_isolated<C: Converter>(
    converter: &Arc<C>,
    job: &EquationJob,
    batch_path: &Arc<PathBuf>,
    timeout: Duration,
) -> Result<String, ConversionError> {
    let converter = Arc::clone(converter);
    let batch_path = Arc::clone(batch_path);
    let job = job.clone();

    let task =
        tokio::spawn(async move { run_job(converter.as_ref(), &job, &batch_path, timeout).await });
    match task.await {
        Ok(outcome) => outcome,
        Err(err) => Err(ConversionError::Worker(format!(
            "conversion task failed: {err}"
        ))),
    }
}

fn into_result(job: &EquationJob, outcome: Result<String, ConversionError>) -> ConversionResult {
    match outcome {
        Ok(latex) => {
            debug!(equation = job.global_index, "equation converted");
            ConversionResult {
                latex,
                success: true,
                diagnostic: None,
            }
        }
        Err(error) => {
            warn!(
                equation = job.global_index,
                paragraph = job.paragraph_index,
                error = %error,
                "equation conversion failed"
            );
            failure(&error)
        }
    }
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Main part of the wrapper document: one paragraph holding the equation
pub(crate) fn wrapper_document_xml(job: &EquationJob) -> String {
    let math = match job.display {
        DisplayType::Inline => job.omml.clone(),
        DisplayType::Block => format!("<m:oMathPara>{}</m:oMathPara>", job.omml),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math"><w:body><w:p>{math}</w:p></w:body></w:document>"#
    )
}

fn write_wrapper_document(path: &Path, job: &EquationJob) -> io::Result<()> {
    let mut zip = ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default();

    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("word/document.xml", wrapper_document_xml(job)),
    ] {
        zip.start_file(name, options).map_err(io::Error::other)?;
        zip.write_all(content.as_bytes())?;
    }

    zip.finish().map_err(io::Error::other)?;
    Ok(())
}

/// Strip the math-mode delimiters a converter wraps its output in
pub(crate) fn strip_math_delimiters(output: &str) -> String {
    let trimmed = output.trim();
    for (open, close) in [("\\[", "\\]"), ("\\(", "\\)"), ("$$", "$$"), ("$", "$")] {
        if trimmed.len() >= open.len() + close.len()
            && trimmed.starts_with(open)
            && trimmed.ends_with(close)
        {
            return trimmed[open.len()..trimmed.len() - close.len()]
                .trim()
                .to_string();
        }
    }
    trimmed.to_string()
}
