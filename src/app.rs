use std::io::{IsTerminal, Write};
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::command::{parse_command, Command, CommandError, COMMAND_HELP};
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::loader::{HttpPageLoader, LoaderOptions, PageLoader, DEFAULT_FIELDS};
use crate::output::{self, OutputFormat};
use crate::session::{LoadOutcome, SessionError, TableSession};

fn print_banner() {
    const BANNER: &str = r#"
               __       __    __
  ____ _ _____/ /_____ / /_  / /__
 / __ `// ___/ __/ __ `/ __ \/ / _ \
/ /_/ // /  / /_/ /_/ / /_/ / /  __/
\__,_//_/   \__/\__,_/_.___/_/\___/
     paginated catalog selection
    "#;
    print!("{}", BANNER);
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn print_error(message: &str) {
    eprintln!("{} {}", "[ERR]".bold().red(), message);
}

fn print_info(message: &str) {
    println!("{} {}", "[INF]".bold().blue(), message);
}

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = String::new();
    out.push_str(cmd.get_name());
    if let Some(version) = cmd.get_version() {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');
    if let Some(long_about) = cmd.get_long_about() {
        out.push_str(&long_about.to_string());
        out.push_str("\n\n");
    } else if let Some(about) = cmd.get_about() {
        out.push_str(&about.to_string());
        out.push_str("\n\n");
    }
    let mut cmd = cmd;
    out.push_str(&cmd.render_help().to_string());
    out.push('\n');
    out.push_str(COMMAND_HELP);
    out
}

#[derive(Clone, Debug)]
struct RunConfig {
    verbose: u8,
    no_color: bool,
    output_format: OutputFormat,
    script: Option<String>,
    start_page: u32,
    bulk: Option<usize>,
    loader: LoaderOptions,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let output_format_raw = args
        .output_format
        .or(cfg.output_format)
        .unwrap_or_else(|| "text".to_string());
    let output_format = OutputFormat::parse(&output_format_raw)
        .ok_or_else(|| format!("invalid output format '{output_format_raw}'"))?;

    let start_page = args.page.or(cfg.start_page).unwrap_or(1);
    if start_page == 0 {
        return Err("invalid start_page, pages start at 1".to_string());
    }

    let fields = match args.fields.as_deref() {
        Some(raw) => crate::utils::parse_fields_csv(raw)
            .map_err(|e| format!("invalid --fields '{raw}': {e}"))?,
        None => match cfg.fields {
            Some(values) => crate::utils::parse_fields_csv(&values.join(","))
                .map_err(|e| format!("invalid fields in config: {e}"))?,
            None => DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
        },
    };

    let defaults = LoaderOptions::default();
    let loader = LoaderOptions {
        api_url: args.api_url.or(cfg.api_url).unwrap_or(defaults.api_url),
        page_size: args.page_size.or(cfg.page_size),
        timeout_seconds: args.timeout.or(cfg.timeout).unwrap_or(defaults.timeout_seconds),
        rate: args.rate.or(cfg.rate).unwrap_or(defaults.rate),
        proxy: args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty()),
        user_agent: args
            .user_agent
            .or(cfg.user_agent)
            .unwrap_or(defaults.user_agent),
        fields,
    };

    Ok(RunConfig {
        verbose: args.verbose,
        no_color,
        output_format,
        script: args.script.map(|s| config::expand_tilde_string(&s)),
        start_page,
        bulk: args.bulk,
        loader,
    })
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("artable={default_level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn render<L: PageLoader>(session: &TableSession<L>, format: OutputFormat) {
    match session.view() {
        Some(view) => println!("{}", output::render_view(&view, format)),
        None => print_info("no page loaded, use 'page N'"),
    }
}

fn report_load(outcome: LoadOutcome) {
    match outcome {
        LoadOutcome::Applied | LoadOutcome::Stale => {}
        LoadOutcome::Failed(e) => print_error(&format!("{e}; keeping the previous page")),
    }
}

fn report_edit(result: Result<bool, SessionError>) {
    if let Err(e) = result {
        print_error(&e.to_string());
    }
}

fn progress_bar() -> Result<ProgressBar, String> {
    let pb = ProgressBar::new(1);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.set_style(
        ProgressStyle::with_template(
            ":: Export: [{pos}/{len}] pages :: Duration: [{elapsed_precise}] :: {msg}",
        )
        .map_err(|e| format!("failed to build progress bar style: {e}"))?
        .progress_chars(r#"#>-"#),
    );
    Ok(pb)
}

async fn export<L: PageLoader>(
    session: &TableSession<L>,
    path: Option<&str>,
    format: OutputFormat,
) -> Result<(), String> {
    let pb = progress_bar()?;
    let selected = session
        .materialize_selection(&pb)
        .await
        .map_err(|e| format!("export failed: {e}"))?;
    let records = output::build_records(&selected);

    match path {
        Some(path) => {
            let path = config::expand_tilde_string(path);
            let format = output::infer_format_from_path(&path).unwrap_or(format);
            tokio::fs::write(&path, output::render_records(&records, format))
                .await
                .map_err(|e| format!("failed to write export '{path}': {e}"))?;
            print_info(&format!("exported {} records to {path}", records.len()));
        }
        None => {
            let bytes = output::render_records(&records, format);
            print!("{}", String::from_utf8_lossy(&bytes));
        }
    }
    Ok(())
}

async fn execute<L: PageLoader>(
    session: &mut TableSession<L>,
    command: Command,
    format: OutputFormat,
) -> Result<Flow, String> {
    match command {
        Command::Page(n) => report_load(session.load_page(n).await),
        Command::Next => match session.next_page().await {
            Ok(outcome) => report_load(outcome),
            Err(e) => print_error(&e.to_string()),
        },
        Command::Prev => match session.prev_page().await {
            Ok(outcome) => report_load(outcome),
            Err(e) => print_error(&e.to_string()),
        },
        Command::Reload => match session.reload().await {
            Ok(outcome) => report_load(outcome),
            Err(e) => print_error(&e.to_string()),
        },
        Command::Toggle(ids) => {
            for id in ids {
                report_edit(session.toggle_row(id));
            }
        }
        Command::Select(ids) => report_edit(session.set_rows(&ids, true)),
        Command::Deselect(ids) => report_edit(session.set_rows(&ids, false)),
        Command::SelectPage => report_edit(session.select_page()),
        Command::ClearPage => report_edit(session.clear_page()),
        Command::Bulk(n) => {
            session.on_bulk_select(n);
        }
        Command::Clear => {
            session.clear_selection();
        }
        Command::Selected => {
            println!("{}", output::render_ids(session.visible_selection()));
            return Ok(Flow::Continue);
        }
        Command::Export(path) => {
            export(session, path.as_deref(), format).await?;
            return Ok(Flow::Continue);
        }
        Command::Show => {}
        Command::Help => {
            print!("{}", COMMAND_HELP);
            return Ok(Flow::Continue);
        }
        Command::Quit => return Ok(Flow::Quit),
    }
    render(session, format);
    Ok(Flow::Continue)
}

async fn command_loop<L: PageLoader, R: AsyncBufRead + Unpin>(
    session: &mut TableSession<L>,
    input: R,
    format: OutputFormat,
    prompt: bool,
) -> Result<(), String> {
    let mut lines = input.lines();
    loop {
        if prompt {
            print!("> ");
            let _ = std::io::stdout().flush();
        }
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return Err(format!("failed to read command: {e}")),
        };
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                print_error(&e.to_string());
                continue;
            }
        };
        match execute(session, command, format).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => print_error(&e),
        }
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    let interactive = run.script.is_none() && std::io::stdin().is_terminal();
    if interactive {
        print_banner();
        format_kv_line("Catalog", &run.loader.api_url);
        format_kv_line(
            "Page size",
            &run.loader
                .page_size
                .map(|n| n.to_string())
                .unwrap_or_else(|| "catalog default".to_string()),
        );
        format_kv_line("Rate", &format!("{}/s", run.loader.rate));
        println!();
    }

    let loader = HttpPageLoader::new(&run.loader).map_err(|e| e.to_string())?;
    let mut session = TableSession::new(loader);
    if let Some(n) = run.bulk {
        session.on_bulk_select(n);
    }
    report_load(session.load_page(run.start_page).await);
    render(&session, run.output_format);

    match run.script.as_deref() {
        Some(path) => {
            let handle = tokio::fs::File::open(path)
                .await
                .map_err(|e| format!("failed to open script '{path}': {e}"))?;
            command_loop(&mut session, BufReader::new(handle), run.output_format, false).await
        }
        None => {
            command_loop(
                &mut session,
                BufReader::new(tokio::io::stdin()),
                run.output_format,
                interactive,
            )
            .await
        }
    }
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let (config_path, allow_missing) = match args.config.as_deref() {
        Some(path) => (Some(config::expand_tilde(path)), false),
        None => (config::default_config_path(), true),
    };

    if args.init_config {
        let path = config_path.ok_or_else(|| "cannot locate home directory".to_string())?;
        if config::ensure_default_config_file(&path)? {
            println!("wrote {}", path.display());
        } else {
            println!("{} already exists", path.display());
        }
        return Ok(());
    }

    let cfg = match config_path.as_ref() {
        Some(path) => config::load_config(path, allow_missing)?,
        None => ConfigFile::default(),
    };

    let run = build_run_config(args, cfg)?;
    init_tracing(run.verbose);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_apply_without_config() {
        let args = CliArgs::parse_from(["artable"]);
        let run = build_run_config(args, ConfigFile::default()).unwrap();
        assert_eq!(run.start_page, 1);
        assert_eq!(run.output_format, OutputFormat::Text);
        assert_eq!(run.loader.api_url, crate::loader::http::DEFAULT_API_URL);
        assert_eq!(run.loader.page_size, None);
        assert_eq!(run.loader.fields.len(), DEFAULT_FIELDS.len());
        assert!(!run.no_color);
    }

    #[test]
    fn cli_flags_override_config() {
        let args = CliArgs::parse_from([
            "artable",
            "--page",
            "4",
            "--rate",
            "2",
            "--output-format",
            "json",
            "--bulk",
            "15",
        ]);
        let cfg = ConfigFile {
            start_page: Some(2),
            rate: Some(9),
            page_size: Some(24),
            output_format: Some("text".to_string()),
            ..ConfigFile::default()
        };
        let run = build_run_config(args, cfg).unwrap();
        assert_eq!(run.start_page, 4);
        assert_eq!(run.loader.rate, 2);
        assert_eq!(run.loader.page_size, Some(24));
        assert_eq!(run.output_format, OutputFormat::Json);
        assert_eq!(run.bulk, Some(15));
    }

    #[test]
    fn color_flag_overrides_config_no_color() {
        let args = CliArgs::parse_from(["artable", "--color"]);
        let cfg = ConfigFile {
            no_color: Some(true),
            ..ConfigFile::default()
        };
        assert!(!build_run_config(args, cfg).unwrap().no_color);
    }

    #[test]
    fn rejects_page_zero_and_bad_format() {
        let args = CliArgs::parse_from(["artable", "--page", "0"]);
        assert!(build_run_config(args, ConfigFile::default()).is_err());
        let args = CliArgs::parse_from(["artable", "-o", "xml"]);
        assert!(build_run_config(args, ConfigFile::default()).is_err());
    }

    #[test]
    fn config_fields_are_normalized() {
        let args = CliArgs::parse_from(["artable"]);
        let cfg = ConfigFile {
            fields: Some(vec!["title".to_string()]),
            ..ConfigFile::default()
        };
        let run = build_run_config(args, cfg).unwrap();
        assert_eq!(run.loader.fields, vec!["id", "title"]);
    }
}
