mod common;

use std::path::Path;

use common::{STYLES, math, para, run, write_docx};
use minutex::config::Config;
use minutex::document::{DisplayType, Document, EquationJob};
use minutex::equation::{ERROR_MARKER, Converter, convert_document, convert_with};
use minutex::{ConversionError, load_document};

#[cfg(test)]
mod equation_pipeline_tests {
    use super::*;

    /// Uppercases the plain text; refuses anything containing `!`
    struct ShoutingConverter;

    impl Converter for ShoutingConverter {
        async fn convert(
            &self,
            job: &EquationJob,
            _scratch: &Path,
        ) -> Result<String, ConversionError> {
            if job.plain_text.contains('!') {
                return Err(ConversionError::EmptyOutput);
            }
            Ok(job.plain_text.to_uppercase())
        }
    }

    fn equations_document() -> (common::Fixture, Document) {
        let body = [
            para("intro"),
            format!("<w:p>{}{}{}{}</w:p>", run("x="), math("y+1"), run(" and "), math("z")),
            format!("<w:p><m:oMathPara>{}</m:oMathPara></w:p>", math("e=mc2")),
            format!("<w:p>{}</w:p>", math("bad!")),
        ]
        .concat();
        let fixture = write_docx(&body, Some(STYLES));
        let document = load_document(&fixture.path).unwrap();
        (fixture, document)
    }

    #[test]
    fn test_jobs_are_collected_in_document_order() {
        let (_fixture, document) = equations_document();

        let jobs = &document.equations;
        assert_eq!(jobs.len(), 4);
        assert_eq!(
            jobs.iter().map(|job| job.global_index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );

        assert_eq!(jobs[0].paragraph_offset, 2);
        assert_eq!(jobs[0].plain_text, "y+1");
        assert_eq!(jobs[1].position_in_paragraph, 1);
        assert_eq!(jobs[1].paragraph_offset, 10);
        assert_eq!(jobs[2].display, DisplayType::Block);
        assert_eq!(jobs[0].display, DisplayType::Inline);

        let text = document.text.as_str();
        for job in jobs {
            let end = job.document_offset + job.plain_text.len();
            assert_eq!(&text[job.document_offset..end], job.plain_text);
        }
    }

    #[tokio::test]
    async fn test_records_from_custom_converter() {
        let (_fixture, document) = equations_document();

        let records = convert_with(&document, ShoutingConverter, &Config::default()).await;

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].converted_markup, "Y+1");
        assert!(records[0].is_valid);
        assert_eq!(records[0].offset, document.equations[0].document_offset);
        assert_eq!(records[2].display, DisplayType::Block);

        let failed = &records[3];
        assert!(!failed.is_valid);
        assert!(failed.converted_markup.contains(ERROR_MARKER));
        assert_eq!(failed.note.as_deref(), Some("converter produced no output"));
    }

    #[tokio::test]
    async fn test_builtin_converter_from_config() {
        let body = format!(
            "<w:p>{}</w:p>",
            "<m:oMath><m:f><m:num><m:r><m:t>a</m:t></m:r></m:num><m:den><m:r><m:t>b</m:t></m:r></m:den></m:f></m:oMath>"
        );
        let fixture = write_docx(&body, None);
        let document = load_document(&fixture.path).unwrap();
        let mut config = Config::default();
        config.conversion.program = "builtin".to_string();

        let records = convert_document(&document, &config).await;

        assert_eq!(records[0].converted_markup, "\\frac{a}{b}");
        assert_eq!(records[0].plain_text, "ab");
        assert!(records[0].is_valid);
    }

    #[cfg(unix)]
    fn shell_config(script: &str, timeout_ms: u64) -> Config {
        let mut config = Config::default();
        config.conversion.program = "sh".to_string();
        config.conversion.args = vec![
            "-c".to_string(),
            script.to_string(),
            "sh".to_string(),
            "{input}".to_string(),
        ];
        config.conversion.timeout_ms = timeout_ms;
        config.conversion.workers = 2;
        config
    }

    #[cfg(unix)]
    fn three_equations() -> (common::Fixture, Document) {
        let body = [
            format!("<w:p>{}</w:p>", math("a")),
            format!("<w:p>{}</w:p>", math("b")),
            format!("<w:p>{}</w:p>", math("c")),
        ]
        .concat();
        let fixture = write_docx(&body, None);
        let document = load_document(&fixture.path).unwrap();
        (fixture, document)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subprocess_timeout_affects_only_one_equation() {
        let (_fixture, document) = three_equations();
        let config = shell_config(
            r#"case "$(pwd -P)" in *eq-00001-*) exec sleep 10 ;; esac; test -f "$1" && printf '%s\n' '\(ok\)'"#,
            1_000,
        );

        let records = convert_document(&document, &config).await;

        assert_eq!(records.len(), 3);
        assert!(records[0].is_valid);
        assert_eq!(records[0].converted_markup, "ok");
        assert!(!records[1].is_valid);
        assert!(records[1].note.as_deref().unwrap().contains("timed out"));
        assert!(records[2].is_valid);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subprocess_failure_keeps_stderr() {
        let (_fixture, document) = three_equations();
        let config = shell_config("echo 'unsupported input' >&2; exit 3", 5_000);

        let records = convert_document(&document, &config).await;

        assert_eq!(records.len(), 3);
        for record in &records {
            assert!(!record.is_valid);
            assert!(record.note.as_deref().unwrap().contains("unsupported input"));
        }
    }
}
