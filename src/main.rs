use anyhow::Context;
use clap::Parser;
use latex_export::app::check::check_environment;
use latex_export::app::desktop::{DesktopAction, Launcher, SystemLauncher};
use latex_export::config::cli::{Command, LogFormat};
use latex_export::core::runner::resolve_executable;
use latex_export::utils::error::ErrorSeverity;
use latex_export::utils::{logger, validation::Validate};
use latex_export::{Cli, ExportError, ExportOutcome, Exporter, Session, Settings, Snippet};
use serde::Serialize;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }
    tracing::debug!("CLI args: {:?}", cli);

    let settings = match Settings::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(settings) => settings,
        Err(e) => fail(&e),
    };
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }
    tracing::debug!("Resolved settings: {:?}", settings);

    let json = cli.json;
    let command = cli.command.unwrap_or(Command::Session);
    let exporter = Exporter::from_config(&settings);

    match command {
        Command::Pdf(args) => {
            let code = args.read_code().context("reading LaTeX input")?;
            let outcome = exporter
                .generate_pdf(&snippet_or_exit(&code, &settings))
                .await
                .unwrap_or_else(|e| fail(&e));
            print_outcome(&outcome, json)?;
        }
        Command::Png { snippet, .. } => {
            let code = snippet.read_code().context("reading LaTeX input")?;
            let compiled = exporter
                .generate_pdf(&snippet_or_exit(&code, &settings))
                .await
                .unwrap_or_else(|e| fail(&e));
            let outcome = match exporter.convert(compiled.pdf.clone(), settings.dpi).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("📄 {}", compiled.pdf.message);
                    fail(&e)
                }
            };
            print_outcome(&outcome, json)?;
        }
        Command::Rasterize { pdf, .. } => {
            let png = exporter
                .rasterize(&pdf, settings.dpi)
                .await
                .unwrap_or_else(|e| fail(&e));
            emit(&png, &png.message, json)?;
        }
        Command::Session => {
            if resolve_executable(&settings.pdflatex).is_none() {
                tracing::warn!("pdflatex not found at: {}", settings.pdflatex);
            }
            let mut session = Session::new(
                exporter,
                Arc::new(SystemLauncher),
                settings.output_dir.clone(),
                settings.mode,
                settings.dpi,
            );
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            if let Err(e) = session.run(input, tokio::io::stdout()).await {
                fail(&e);
            }
        }
        Command::OpenFolder => {
            std::fs::create_dir_all(&settings.output_dir)
                .with_context(|| format!("creating {}", settings.output_dir.display()))?;
            let action = DesktopAction::OpenFolder(settings.output_dir.clone());
            if let Err(e) = SystemLauncher.launch(&action) {
                fail(&e);
            }
            println!("{}", action.describe());
        }
        Command::Check => {
            let report = check_environment(&settings);
            emit(&report, &report.render(), json)?;
            if !report.is_ready() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn snippet_or_exit(code: &str, settings: &Settings) -> Snippet {
    Snippet::new(code, settings.mode).unwrap_or_else(|e| fail(&e))
}

fn print_outcome(outcome: &ExportOutcome, json: bool) -> anyhow::Result<()> {
    let mut text = outcome.pdf.message.clone();
    if let Some(png) = &outcome.png {
        text.push('\n');
        text.push_str(&png.message);
    }
    emit(outcome, &text, json)?;
    if !json {
        println!("📁 Output saved to: {}", outcome.primary().path.display());
    }
    Ok(())
}

fn emit<T: Serialize>(value: &T, text: &str, json: bool) -> anyhow::Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(value).context("serializing result")?;
        println!("{}", rendered);
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn fail(e: &ExportError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
