use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use log::info;
use mediastamp_core::{
    app_paths, apply_plan, generate_plan, load_config, save_config, undo_last, AppConfig,
    EngineOptions, MetadataBackend, PlanOptions, RenameEngine, RenamePlan, DESCRIPTION,
};

#[derive(Debug, Parser)]
#[command(name = "mediastamp")]
#[command(about = DESCRIPTION)]
struct Cli {
    /// -v: info, -vv: debug, -vvv: trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Rename(RenameArgs),
    Undo,
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// 既定値で設定ファイルを作成します (既存ファイルは上書きしません)
    Init,
}

#[derive(Debug, Args)]
struct RenameArgs {
    input: String,
    #[arg(long, default_value_t = false)]
    recursive: bool,
    #[arg(long, default_value_t = false)]
    include_hidden: bool,
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,
    /// 既に yyyyMMdd_HHmmss で始まる名前も撮影日時から付け直します
    #[arg(long, default_value_t = false)]
    no_skip_canonical: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Exiftool,
    Builtin,
}

impl From<BackendArg> for MetadataBackend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Exiftool => MetadataBackend::Exiftool,
            BackendArg::Builtin => MetadataBackend::Builtin,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Rename(args) => cmd_rename(args),
        Commands::Undo => cmd_undo(),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = load_config()?;
    let options = PlanOptions {
        input: args.input.into(),
        recursive: args.recursive || config.recursive_default,
        include_hidden: args.include_hidden || config.include_hidden_default,
    };
    let backend = args
        .backend
        .map(MetadataBackend::from)
        .unwrap_or(config.metadata_backend);
    let engine_options = EngineOptions {
        skip_canonical: config.engine_options().skip_canonical && !args.no_skip_canonical,
    };
    info!("メタデータ取得: {backend:?}");

    let mut engine = RenameEngine::new(backend.reader(&config.exiftool_path), engine_options);
    let plan = generate_plan(&options, &mut engine)?;

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        OutputFormat::Table => {
            print_table(&plan);
        }
    }

    if args.apply {
        let result = apply_plan(&plan)?;
        eprintln!(
            "適用完了: {}件 (変更なし {}件)",
            result.applied, result.unchanged
        );
    } else {
        eprintln!("dry-runモード: 実ファイルは変更していません。適用するには --apply を指定してください。");
    }

    Ok(())
}

fn cmd_undo() -> Result<()> {
    let result = undo_last()?;
    println!("取り消し完了: {}件", result.restored);
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("設定ファイル: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() {
        println!("設定ファイルは既に存在します: {}", paths.config_path.display());
        return Ok(());
    }
    save_config(&AppConfig::default())?;
    println!("設定ファイルを作成しました: {}", paths.config_path.display());
    Ok(())
}

fn print_table(plan: &RenamePlan) {
    println!("元ファイル -> 新ファイル (source)");
    for candidate in &plan.candidates {
        let source = candidate
            .source
            .map(|s| format!("{s:?}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} -> {} ({})",
            candidate.original_path.display(),
            candidate.target_path.display(),
            source
        );
    }

    println!(
        "\n集計: root={} scanned={} media={} unsupported_skip={} hidden_skip={} planned={} unchanged={}",
        plan.input_root.display(),
        plan.stats.scanned_files,
        plan.stats.media_files,
        plan.stats.skipped_unsupported,
        plan.stats.skipped_hidden,
        plan.stats.planned,
        plan.stats.unchanged
    );
}
