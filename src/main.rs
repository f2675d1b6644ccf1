// main.rs — 程序入口
// 负责初始化日志、异步运行时、解析命令行参数、分发子命令

mod acquire;
mod app;
mod cli;
mod config;
mod error;
mod scheduler;
mod select;
mod session;
mod setter;
mod source;

// 初始化多语言支持，嵌入 locales 目录下的所有翻译
rust_i18n::i18n!("locales");

use app::{ConsoleObserver, Slideshow};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands, SearchArgs};
use config::AppConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_i18n::t;
use session::Session;
use source::SiteRegistry;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // 自动检测系统语言并设置
    let locale = std::env::var("LANG").unwrap_or_else(|_| "en".to_string());
    if locale.starts_with("zh") {
        rust_i18n::set_locale("zh-CN");
    } else {
        rust_i18n::set_locale("en");
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Set {
            search,
            resolution,
            no_apply,
        } => {
            let mut config = AppConfig::load();
            if let Some(resolution) = resolution {
                config.resolution = resolution;
            }
            handle_set(config, &search, !no_apply).await?;
        }

        Commands::Slideshow {
            search,
            interval,
            no_apply,
        } => {
            let mut config = AppConfig::load();
            if let Some(minutes) = interval {
                config.set_interval_minutes(minutes)?;
            }
            handle_slideshow(config, &search, !no_apply).await?;
        }

        Commands::Info { search } => {
            handle_info(&search).await?;
        }

        Commands::Sites => {
            let registry = SiteRegistry::new()?;
            println!("{}", t!("sites_title"));
            for parser in registry.parsers() {
                println!("  {:<12} {}", parser.name(), parser.url());
            }
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "wallpaster", &mut std::io::stdout());
        }

        Commands::Config { action } => {
            handle_config(&mut AppConfig::load(), &action)?;
        }
    }

    Ok(())
}

/// 初始化日志，默认只输出 warn，RUST_LOG 可覆盖
fn init_logging() {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    for directive in [
        "hyper=info",
        "reqwest=info",
        "html5ever=info",
        "selectors=info",
    ] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// 按命令行参数创建会话并拉取第一批候选
async fn open_session(
    config: AppConfig,
    search: &SearchArgs,
) -> Result<
    (Session, tokio::sync::mpsc::UnboundedReceiver<acquire::CycleEvent>),
    Box<dyn std::error::Error>,
> {
    let registry = SiteRegistry::new()?;
    let (mut session, events) = Session::new(registry, config, StdRng::from_entropy());
    let query = source::Query::new(search.query.trim(), search.orientation);
    session.prepare(search.site.as_deref(), query)?;
    println!("{}", t!("search_start", site => session.parser().name()));
    // 拉取失败不退出，之后的获取会以 NoCandidates 报告
    match session.refresh().await {
        Ok(()) => println!(
            "{}",
            t!("candidates_found", count => session.candidates().len(), page => session.query().page)
        ),
        Err(e) => eprintln!("{}", t!("warning", message => e.user_message())),
    }
    Ok((session, events))
}

/// 处理 set 子命令：单次获取并设置壁纸
async fn handle_set(
    config: AppConfig,
    search: &SearchArgs,
    apply: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, mut events) = open_session(config, search).await?;
    let mut observer = ConsoleObserver::new(apply);

    println!(
        "{}",
        t!("download_info", res => session.config().resolution, dir => session.config().directory.display())
    );
    app::run_once(&mut session, &mut events, &mut observer).await?;

    if observer.failures > 0 {
        return Err(t!("error_cycle_failed").into());
    }
    Ok(())
}

/// 处理 slideshow 子命令：进入主循环
async fn handle_slideshow(
    config: AppConfig,
    search: &SearchArgs,
    apply: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let minutes = config.interval_minutes();
    let (session, events) = open_session(config, search).await?;
    println!("{}", t!("slideshow_start", minutes => minutes));
    println!("{}", t!("slideshow_help"));

    Slideshow::new(session, events, ConsoleObserver::new(apply))
        .run()
        .await?;
    Ok(())
}

/// 处理 info 子命令：打印结果总数与页数
async fn handle_info(search: &SearchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let registry = SiteRegistry::new()?;
    let parser = match &search.site {
        Some(site) => registry.get(site)?,
        None => registry.default_parser(),
    };
    let query = source::Query::new(search.query.trim(), search.orientation);

    let quantity = parser.get_quantity(&query).await?;
    let pages = parser.get_pages(&query).await?;
    println!(
        "{}",
        t!("info_result", site => parser.name(), count => quantity, pages => pages)
    );
    Ok(())
}

/// 处理 config 子命令：查看或修改配置
fn handle_config(
    config: &mut AppConfig,
    action: &cli::ConfigAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        cli::ConfigAction::Show => {
            println!("{}", t!("config_title"));
            println!(
                "{}",
                t!("config_path", path => config.config_path.display())
            );
            println!(
                "{}",
                t!("config_dir", path => config.directory.display())
            );
            println!(
                "{}",
                t!("config_interval", minutes => config.interval_minutes())
            );
            println!("{}", t!("config_res", res => config.resolution));
        }
        cli::ConfigAction::Schema => {
            println!("{}", AppConfig::get_schema());
        }
        cli::ConfigAction::Dump => {
            println!("{}", config.to_json());
        }
        cli::ConfigAction::Set { key, value } => {
            match key.as_str() {
                "dir" | "directory" => config.set_directory(value)?,
                "interval" => {
                    let minutes = value
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| t!("config_error_minutes", value => value))?;
                    config.set_interval_minutes(minutes)?;
                }
                "res" | "resolution" => config.set_resolution(value.parse()?)?,
                _ => return Err(t!("config_error_unknown_key", key => key).into()),
            }
            println!("{}", t!("config_updated", key => key, value => value));
        }
    }
    Ok(())
}
