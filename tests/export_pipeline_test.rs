#![cfg(unix)]

use latex_export::core::compiler::PdfLatexCompiler;
use latex_export::core::rasterizer::GhostscriptRasterizer;
use latex_export::core::runner::ToolRunner;
use latex_export::{Dpi, ExportError, Exporter, MathMode, Settings, Snippet};
use std::sync::Arc;
use std::time::Duration;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn install_tool(dir: &Path, fixture: &str) -> String {
    let source = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(fixture);
    let target = dir.join(fixture);
    std::fs::copy(&source, &target).unwrap();
    let mut perms = std::fs::metadata(&target).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&target, perms).unwrap();
    target.to_str().unwrap().to_string()
}

struct Fixture {
    _tools: TempDir,
    _root: TempDir,
    output_dir: PathBuf,
    settings: Settings,
}

fn fixture_with_gs(gs_fixture: &str) -> Fixture {
    let tools = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let output_dir = root.path().join("latex_exports");

    let settings = Settings {
        pdflatex: install_tool(tools.path(), "fake-pdflatex.sh"),
        ghostscript: install_tool(tools.path(), gs_fixture),
        output_dir: output_dir.clone(),
        timeout_seconds: 5,
        ..Settings::default()
    };

    Fixture {
        _tools: tools,
        _root: root,
        output_dir,
        settings,
    }
}

fn fixture() -> Fixture {
    fixture_with_gs("fake-gs.sh")
}

/// Exporter whose compiler keeps its `latex_*` work directories under
/// `scratch` so tests can see whether they are cleaned up.
fn exporter_with_scratch(fx: &Fixture, scratch: &Path, timeout: Duration) -> Exporter {
    let compiler = PdfLatexCompiler::new(
        ToolRunner::new("pdflatex", &fx.settings.pdflatex, timeout),
        fx.output_dir.clone(),
        Vec::new(),
    )
    .with_scratch_root(scratch);
    Exporter::new(
        Arc::new(compiler),
        Arc::new(GhostscriptRasterizer::from_config(&fx.settings)),
    )
}

fn files_in(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_valid_snippet_produces_pdf() {
    let fx = fixture();
    let exporter = Exporter::from_config(&fx.settings);
    let snippet = Snippet::new("\\frac{a}{b}", MathMode::Display).unwrap();

    let outcome = exporter.generate_pdf(&snippet).await.unwrap();

    assert!(outcome.pdf.path.starts_with(&fx.output_dir));
    let name = outcome.pdf.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("equation_") && name.ends_with(".pdf"));
    assert_eq!(
        outcome.pdf.message,
        format!("PDF generated successfully:\n{}", name)
    );

    // The fake compiler copies its input, so the "PDF" is the generated document.
    let document = std::fs::read_to_string(&outcome.pdf.path).unwrap();
    assert!(document.starts_with("\\documentclass[10pt,preview,border=1pt,varwidth]{standalone}"));
    assert!(document.contains("$\\displaystyle \\frac{a}{b}$"));
    assert_eq!(files_in(&fx.output_dir), vec![name]);
}

#[tokio::test]
async fn test_inline_mode_document() {
    let fx = fixture();
    let exporter = Exporter::from_config(&fx.settings);
    let snippet = Snippet::new("e^{i\\pi}", MathMode::Inline).unwrap();

    let outcome = exporter.generate_pdf(&snippet).await.unwrap();

    let document = std::fs::read_to_string(&outcome.pdf.path).unwrap();
    assert!(document.contains("\n$e^{i\\pi}$\n"));
    assert!(!document.contains("\\displaystyle"));
}

#[tokio::test]
async fn test_invalid_snippet_reports_log_tail_and_no_pdf() {
    let fx = fixture();
    let exporter = Exporter::from_config(&fx.settings);
    let snippet = Snippet::new("\\BROKEN{x}", MathMode::Display).unwrap();

    let err = exporter.generate_pdf(&snippet).await.unwrap_err();

    match &err {
        ExportError::CompileError { detail, tex_errors } => {
            assert!(detail.starts_with("Last 30 lines of pdflatex log:\n"));
            assert!(detail.contains("! Undefined control sequence."));
            assert_eq!(
                tex_errors,
                &vec![
                    "! Undefined control sequence.".to_string(),
                    "! Emergency stop.".to_string()
                ]
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.user_friendly_message().is_empty());
    assert!(files_in(&fx.output_dir)
        .iter()
        .all(|name| !name.ends_with(".pdf")));
}

#[tokio::test]
async fn test_failure_without_log_reports_process_output() {
    let fx = fixture();
    let exporter = Exporter::from_config(&fx.settings);
    let snippet = Snippet::new("NOLOG", MathMode::Display).unwrap();

    let err = exporter.generate_pdf(&snippet).await.unwrap_err();

    match err {
        ExportError::CompileError { detail, .. } => {
            assert!(detail.contains("stdout:\nfake stdout"));
            assert!(detail.contains("stderr:\nfake stderr"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_compiler_timeout() {
    let mut fx = fixture();
    fx.settings.timeout_seconds = 1;
    let exporter = Exporter::from_config(&fx.settings);
    let snippet = Snippet::new("SLEEPY", MathMode::Display).unwrap();

    let started = std::time::Instant::now();
    let err = exporter.generate_pdf(&snippet).await.unwrap_err();

    assert!(started.elapsed() < std::time::Duration::from_secs(8));
    match &err {
        ExportError::TimeoutError { tool, seconds } => {
            assert_eq!(tool, "pdflatex");
            assert_eq!(*seconds, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.user_friendly_message(), "Error: pdflatex timed out (>1s)");
    assert!(files_in(&fx.output_dir).is_empty());
}

#[tokio::test]
async fn test_missing_compiler_fails_before_touching_output() {
    let mut fx = fixture();
    fx.settings.pdflatex = "/no/such/dir/pdflatex".to_string();
    let exporter = Exporter::from_config(&fx.settings);
    let snippet = Snippet::new("x", MathMode::Display).unwrap();

    let err = exporter.generate_pdf(&snippet).await.unwrap_err();

    assert!(matches!(err, ExportError::ToolNotFoundError { .. }));
    assert!(err
        .user_friendly_message()
        .contains("pdflatex not found at:\n/no/such/dir/pdflatex"));
    assert!(!fx.output_dir.exists());
}

#[tokio::test]
async fn test_png_export_keeps_pdf_and_uses_dpi() {
    let fx = fixture();
    let exporter = Exporter::from_config(&fx.settings);
    let snippet = Snippet::new("\\sum_{i=1}^n i", MathMode::Display).unwrap();

    let outcome = exporter
        .generate_png(&snippet, Dpi::new(1200).unwrap())
        .await
        .unwrap();

    let png = outcome.png.as_ref().unwrap();
    assert_eq!(png.path, outcome.pdf.path.with_extension("png"));
    assert_eq!(std::fs::read_to_string(&png.path).unwrap(), "dpi=1200");
    assert!(outcome.pdf.path.exists());
    assert!(png.message.starts_with("PNG generated successfully:\n"));
    assert_eq!(files_in(&fx.output_dir).len(), 2);
}

#[tokio::test]
async fn test_rasterizer_failure_carries_output() {
    let fx = fixture_with_gs("failing-gs.sh");
    let exporter = Exporter::from_config(&fx.settings);
    let snippet = Snippet::new("x", MathMode::Display).unwrap();

    let err = exporter
        .generate_png(&snippet, Dpi::default())
        .await
        .unwrap_err();

    match err {
        ExportError::RasterizeError { output } => {
            assert!(output.contains("Unrecoverable error"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_rasterizer() {
    let mut fx = fixture();
    fx.settings.ghostscript = "/no/such/gs".to_string();
    let exporter = Exporter::from_config(&fx.settings);
    let snippet = Snippet::new("x", MathMode::Display).unwrap();

    let err = exporter
        .generate_png(&snippet, Dpi::default())
        .await
        .unwrap_err();

    match err {
        ExportError::ToolNotFoundError { tool, .. } => assert_eq!(tool, "ghostscript"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_repeated_exports_do_not_overwrite() {
    let fx = fixture();
    let exporter = Exporter::from_config(&fx.settings);

    let first = exporter
        .generate_pdf(&Snippet::new("a", MathMode::Display).unwrap())
        .await
        .unwrap();
    let second = exporter
        .generate_pdf(&Snippet::new("b", MathMode::Display).unwrap())
        .await
        .unwrap();

    assert_ne!(first.pdf.path, second.pdf.path);
    assert!(std::fs::read_to_string(&first.pdf.path).unwrap().contains("$\\displaystyle a$"));
    assert!(std::fs::read_to_string(&second.pdf.path).unwrap().contains("$\\displaystyle b$"));
}

#[tokio::test]
async fn test_scratch_directory_removed_after_timeout() {
    let fx = fixture();
    let scratch = TempDir::new().unwrap();
    let exporter = exporter_with_scratch(&fx, scratch.path(), Duration::from_secs(1));
    let snippet = Snippet::new("SLEEPY", MathMode::Display).unwrap();

    let err = exporter.generate_pdf(&snippet).await.unwrap_err();

    assert!(matches!(err, ExportError::TimeoutError { .. }));
    assert!(files_in(scratch.path()).is_empty());
}

#[tokio::test]
async fn test_scratch_directory_removed_after_compile_failure() {
    let fx = fixture();
    let scratch = TempDir::new().unwrap();
    let exporter = exporter_with_scratch(&fx, scratch.path(), Duration::from_secs(5));
    let snippet = Snippet::new("\\BROKEN{x}", MathMode::Display).unwrap();

    let err = exporter.generate_pdf(&snippet).await.unwrap_err();

    assert!(matches!(err, ExportError::CompileError { .. }));
    assert!(files_in(scratch.path()).is_empty());
}

#[tokio::test]
async fn test_scratch_directory_removed_after_success() {
    let fx = fixture();
    let scratch = TempDir::new().unwrap();
    let exporter = exporter_with_scratch(&fx, scratch.path(), Duration::from_secs(5));
    let snippet = Snippet::new("x", MathMode::Display).unwrap();

    let outcome = exporter.generate_pdf(&snippet).await.unwrap();

    assert!(outcome.pdf.path.exists());
    assert!(files_in(scratch.path()).is_empty());
}

#[tokio::test]
async fn test_stale_png_is_not_reported_as_success() {
    let fx = fixture_with_gs("failing-gs.sh");
    std::fs::create_dir_all(&fx.output_dir).unwrap();
    let pdf = fx.output_dir.join("equation_20260101_000000.pdf");
    let stale = pdf.with_extension("png");
    std::fs::write(&pdf, "pdf").unwrap();
    std::fs::write(&stale, "from an earlier run").unwrap();
    let exporter = Exporter::from_config(&fx.settings);

    let err = exporter.rasterize(&pdf, Dpi::default()).await.unwrap_err();

    assert!(matches!(err, ExportError::RasterizeError { .. }));
    assert!(!stale.exists());
}

#[tokio::test]
async fn test_failed_conversion_leaves_pdf_in_place() {
    let fx = fixture_with_gs("failing-gs.sh");
    let exporter = Exporter::from_config(&fx.settings);
    let snippet = Snippet::new("x", MathMode::Display).unwrap();

    let compiled = exporter.generate_pdf(&snippet).await.unwrap();
    let err = exporter
        .convert(compiled.pdf.clone(), Dpi::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::RasterizeError { .. }));
    assert!(compiled.pdf.path.exists());
    assert_eq!(files_in(&fx.output_dir).len(), 1);
}
