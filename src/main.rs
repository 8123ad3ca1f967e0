use clap::Parser;
use color_eyre::Result;
use log::LevelFilter;
use stockscope::error_display::user_message_from_report;
use stockscope::{open_session, pages, render, AppConfig, Args, ConfigManager};

fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    // RUST_LOG, when set, refines the default level.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let config_manager = ConfigManager::new(stockscope::APP_NAME)?;
        let path = config_manager.write_default_config(args.force)?;
        println!("Config file written to {}", path.display());
        return Ok(Some(()));
    }
    Ok(None)
}

fn run(args: &Args, config: &AppConfig) -> Result<()> {
    let session = open_session(args, &config.file_loading)?;

    let request = pages::PageRequest::from_args(args, &config.analysis)?;
    let report = pages::run(&session, &request)?;
    for warning in report.warnings() {
        log::warn!("{}", warning);
    }

    let format = match args.output {
        Some(format) => format,
        None => config.output.output_format()?,
    };
    println!("{}", render::render(&report, format)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let config = match AppConfig::load(stockscope::APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", user_message_from_report(&e, None));
            std::process::exit(1);
        }
    };
    init_logging(args.debug || config.debug.enabled);

    if let Err(e) = run(&args, &config) {
        eprintln!("Error: {}", user_message_from_report(&e, args.path.as_deref()));
        std::process::exit(1);
    }
    Ok(())
}
