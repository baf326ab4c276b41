//! File Organizer - sort folders by file type and videos by time window
//!
//! A CLI tool that classifies files into category/subcategory folders,
//! buckets videos into named date and time windows, and writes the
//! result as a zip archive.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use file_organizer::auth::{LocalSessionService, SessionEvent, SessionService};
use file_organizer::cli::{AuthAction, Command, HistoryAction, OrganizeArgs, VideosArgs};
use file_organizer::history::{HistoryStore, JsonHistoryStore};
use file_organizer::process::download_record;
use file_organizer::session::organize_videos;
use file_organizer::{Cli, Config, Error, Processor, classify, init_locale};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// Initialize i18n for this binary
rust_i18n::i18n!("locales", fallback = "en");

// CLI Output Module
mod cli_output {
    //! CLI 输出美化模块
    //!
    //! 为命令行输出提供统一的颜色和格式样式。

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI 主题颜色
    pub struct CliTheme;

    impl CliTheme {
        /// 成功颜色（绿色）
        pub const SUCCESS: Color = Color::Green;
        /// 警告颜色（黄色）
        pub const WARNING: Color = Color::Yellow;
        /// 提示颜色（暗灰色）
        pub const HINT: Color = Color::DarkGrey;
        /// 强调颜色（青色）
        pub const ACCENT: Color = Color::Cyan;
    }

    /// 打印分隔线
    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// 打印居中的标题
    pub fn print_title(title: &str) {
        let width = 60usize;
        let padding = width.saturating_sub(title.chars().count()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(&format!(
            "{}{} {}{}\n",
            left_pad,
            "╔".bold().stylize(),
            title.bold().stylize(),
            "╗".bold().stylize(),
        )));
        let _ = stdout().execute(Print("\n"));
    }

    /// 打印成功消息
    pub fn print_success(msg: &str) {
        let _ = stdout().execute(Print(style("✓ ").with(CliTheme::SUCCESS).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// 打印警告消息
    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// 打印提示消息
    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// 打印键值对
    pub fn print_key_value(key: &str, value: &str, value_color: Option<Color>) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = match value_color {
            Some(color) => style(value).with(color),
            None => style(value).bold(),
        };
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    /// 打印统计项
    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    /// 打印结果行
    pub fn print_result(status_icon: &str, status_color: Color, subject: &str, detail: &str) {
        let icon_styled = style(status_icon).with(status_color).bold();
        let subject_styled = style(subject).italic();
        let detail_styled = style(detail).with(CliTheme::HINT);

        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(icon_styled));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(subject_styled));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(detail_styled));
        let _ = stdout().execute(Print("\n"));
    }

    /// 打印日志文件路径
    pub fn print_log_path(label: &str, path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style(format!("{}: ", label)).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    /// 打印空行
    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

/// Convenience macro for translation
macro_rules! t {
    ($key:expr) => {
        rust_i18n::t!($key)
    };
    ($key:expr, $($tt:tt)*) => {
        rust_i18n::t!($key, $($tt)*)
    };
}

fn main() -> Result<()> {
    // Initialize locale based on system settings
    init_locale();

    let cli = Cli::parse();

    // Get the executable directory for Config, Data and Log directories
    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = cli.command_name(),
        "File Organizer starting"
    );

    let config = load_config(&cli, &exe_dir)?;
    if cli.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    let data_dir = config.data_dir_or(&exe_dir.join("Data"));

    let result = match &cli.command {
        Command::Organize(args) => run_organize(args, config, &data_dir, &log_path),
        Command::Videos(args) => run_videos(args, &config, &log_path),
        Command::Classify { names } => {
            run_classify(names);
            Ok(())
        }
        Command::History { action } => run_history(action, &config, &data_dir),
        Command::Auth { action } => run_auth(action, &data_dir),
        Command::InitConfig { path } => run_init_config(path.as_deref(), &exe_dir),
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("{} {}", t!("cli_error"), e);
        std::process::exit(1);
    }

    Ok(())
}

/// Organize one folder and print the summary
fn run_organize(args: &OrganizeArgs, config: Config, data_dir: &Path, log_path: &Path) -> Result<()> {
    use cli_output::*;

    let dry_run = config.dry_run;
    let sessions = LocalSessionService::in_dir(data_dir)?;
    let mut history = JsonHistoryStore::in_dir(data_dir)?;
    let mut processor = Processor::new(config, &sessions, &mut history);
    let outcome = processor.run(&args.input)?;
    let stats = processor.stats();

    // Store translations to avoid temporary value issues
    let stat_total = t!("stat_total");
    let stat_classified = t!("stat_classified");
    let stat_unknown = t!("stat_unknown");

    print_separator();
    print_title(&t!("cli_organize_complete"));
    print_separator();

    print_blank();
    print_stat(
        &stat_total,
        &stats.total_files.load(Ordering::Relaxed).to_string(),
        CliTheme::ACCENT,
    );
    print_stat(
        &stat_classified,
        &stats.classified.load(Ordering::Relaxed).to_string(),
        CliTheme::SUCCESS,
    );
    print_stat(
        &stat_unknown,
        &stats.unknown.load(Ordering::Relaxed).to_string(),
        CliTheme::WARNING,
    );
    print_blank();

    if outcome.tree.is_empty() {
        print_warning(&t!("cli_no_files"));
    } else {
        print_key_value(&t!("summary"), &outcome.summary, None);
    }

    if let Some(record) = &outcome.record {
        print_key_value(&t!("history_id"), &record.id, Some(CliTheme::ACCENT));
    }
    if let Some(archive) = &outcome.archive {
        print_success(&t!("cli_archive_written", path = archive.display()));
    }
    if dry_run {
        print_separator();
        print_warning(&t!("cli_dry_run_notice"));
    }

    print_separator();
    print_log_path(&t!("log_file"), &log_path.display().to_string());
    info!(log_file = %log_path.display(), "Processing complete. Log saved to");
    Ok(())
}

/// Bucket videos and print where each one went
fn run_videos(args: &VideosArgs, config: &Config, log_path: &Path) -> Result<()> {
    use cli_output::*;

    let outcome = organize_videos(&args.input, config)?;
    let session = &outcome.session;

    print_separator();
    print_title(&t!("cli_videos_complete"));
    print_separator();
    print_blank();

    for bucket in session.buckets() {
        print_stat(&bucket.name, &bucket.members.len().to_string(), CliTheme::SUCCESS);
        if config.verbose {
            for video in &bucket.members {
                print_result("✓", CliTheme::SUCCESS, &video.name, &video.modified.to_string());
            }
        }
    }
    print_stat(
        &t!("remaining_videos"),
        &session.remainder().len().to_string(),
        CliTheme::WARNING,
    );
    if config.verbose {
        for video in session.remainder() {
            print_result("⊘", CliTheme::WARNING, &video.name, &video.modified.to_string());
        }
    }
    print_blank();

    if let Some(thumbnails) = &outcome.thumbnails {
        print_stat(
            &t!("stat_thumbnails"),
            &thumbnails.generated.load(Ordering::Relaxed).to_string(),
            CliTheme::ACCENT,
        );
    }
    if let Some(archive) = &outcome.archive {
        print_success(&t!("cli_archive_written", path = archive.display()));
    }
    if config.dry_run {
        print_separator();
        print_warning(&t!("cli_dry_run_notice"));
    }

    print_separator();
    print_log_path(&t!("log_file"), &log_path.display().to_string());
    Ok(())
}

fn run_classify(names: &[String]) {
    use cli_output::*;

    for name in names {
        let category = classify(name);
        let color = if category.is_unknown() {
            CliTheme::WARNING
        } else {
            CliTheme::ACCENT
        };
        print_result("•", color, name, &category.to_string());
    }
}

fn run_history(action: &HistoryAction, config: &Config, data_dir: &Path) -> Result<()> {
    use cli_output::*;

    let sessions = LocalSessionService::in_dir(data_dir)?;
    let mut history = JsonHistoryStore::in_dir(data_dir)?;
    let user = sessions.current_user().ok_or(Error::NotSignedIn)?;

    match action {
        HistoryAction::List => {
            let records = history.list(&user.id)?;
            if records.is_empty() {
                print_hint(&t!("history_empty"));
            }
            for record in records {
                let created = record.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
                print_result("•", CliTheme::ACCENT, &record.id, &created.to_string());
                print_key_value(&t!("summary"), &record.summary, None);
            }
        }
        HistoryAction::Delete { id } => {
            history.delete(&user.id, id)?;
            print_success(&t!("history_deleted", id = id));
        }
        HistoryAction::Download { id, .. } => {
            let path = download_record(&sessions, &history, id, &config.output_dir)?;
            print_success(&t!("cli_archive_written", path = path.display()));
        }
    }
    Ok(())
}

fn run_auth(action: &AuthAction, data_dir: &Path) -> Result<()> {
    use cli_output::*;

    let mut sessions = LocalSessionService::in_dir(data_dir)?;
    sessions.subscribe(Box::new(|event: &SessionEvent| match event {
        SessionEvent::SignedIn(session) => info!(user = %session.user.email, "Session started"),
        SessionEvent::SignedOut => info!("Session ended"),
    }));

    match action {
        AuthAction::SignUp(creds) => {
            let session = sessions.sign_up(&creds.email, &creds.password)?;
            print_success(&t!("auth_signed_up", email = session.user.email));
        }
        AuthAction::SignIn(creds) => {
            let session = sessions.sign_in(&creds.email, &creds.password)?;
            print_success(&t!("auth_signed_in", email = session.user.email));
        }
        AuthAction::SignOut => {
            sessions.sign_out()?;
            print_success(&t!("auth_signed_out"));
        }
        AuthAction::Status => match sessions.current_user() {
            Some(user) => print_key_value(&t!("auth_signed_in_as"), &user.email, Some(CliTheme::SUCCESS)),
            None => print_hint(&t!("auth_not_signed_in")),
        },
    }
    Ok(())
}

/// Write the sample configuration, refusing to overwrite an existing file
fn run_init_config(path: Option<&Path>, exe_dir: &Path) -> Result<()> {
    let target = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| exe_dir.join("Config").join("organizer.toml"));

    if target.exists() {
        anyhow::bail!("{}", t!("cli_config_exists", path = target.display()));
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, Config::sample_config())?;

    info!(path = %target.display(), "Sample configuration written");
    cli_output::print_success(&t!("cli_config_written", path = target.display()));
    Ok(())
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or command name
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        let config_log_dir = log_dir.join(&config_name);
        let log_filename = format!("{}_{}_{}.log", config_name, cli.command_name(), timestamp);
        config_log_dir.join(log_filename)
    } else {
        let log_filename = format!("{}_{}.log", cli.command_name(), timestamp);
        log_dir.join(log_filename)
    }
}

/// Resolve config path - supports shorthand syntax
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let config_dir = exe_dir.join("Config");
    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());

    let mut in_config_dir = config_dir.join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(Some(guard))
}
