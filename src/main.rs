use clap::{Arg, ArgAction, ArgMatches};
use slideshow_seed::{ConfigOverrides, SeedConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "slideshow_seed=info";
const EXIT_ABORTED: u8 = 1;
const EXIT_UPLOADS_FAILED: u8 = 2;

fn cli() -> clap::Command {
    clap::Command::new("slideshow-seed")
        .about("Seed a photo frame backend with a test user and ordered placeholder images")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG")
                .help("Path to a YAML file with seeding options"),
        )
        .arg(
            Arg::new("base_url")
                .short('u')
                .long("base-url")
                .value_name("URL")
                .help("Backend base URL"),
        )
        .arg(
            Arg::new("admin_identity")
                .long("admin-identity")
                .value_name("EMAIL")
                .help("Superuser identity"),
        )
        .arg(
            Arg::new("admin_password")
                .long("admin-password")
                .value_name("PASSWORD")
                .help("Superuser password"),
        )
        .arg(
            Arg::new("user_email")
                .long("user-email")
                .value_name("EMAIL")
                .help("Email of the user to create or reuse"),
        )
        .arg(
            Arg::new("user_password")
                .long("user-password")
                .value_name("PASSWORD")
                .help("Password for a newly created user"),
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory for generated placeholder images"),
        )
        .arg(
            Arg::new("no_cleanup")
                .long("no-cleanup")
                .action(ArgAction::SetTrue)
                .help("Keep the user's existing images instead of deleting them first"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Exit non-zero when any upload failed"),
        )
        .arg(
            Arg::new("print_config")
                .long("print-config")
                .action(ArgAction::SetTrue)
                .help("Print the effective configuration as YAML and exit"),
        )
}

fn overrides_from(matches: &ArgMatches) -> ConfigOverrides {
    let string = |id: &str| matches.get_one::<String>(id).cloned();
    ConfigOverrides {
        base_url: string("base_url"),
        admin_identity: string("admin_identity"),
        admin_password: string("admin_password"),
        user_email: string("user_email"),
        user_password: string("user_password"),
        output_dir: string("output_dir").map(PathBuf::from),
        no_cleanup: matches.get_flag("no_cleanup"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt().with_env_filter(filter).init();

    let matches = cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(Path::new);
    let mut config = SeedConfig::load(config_path)?;
    config.apply_env();
    config.apply_overrides(overrides_from(&matches));

    if matches.get_flag("print_config") {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    let report = match slideshow_seed::run(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("{}", e);
            return Ok(ExitCode::from(EXIT_ABORTED));
        }
    };

    report.log_summary();
    tracing::info!("Done");

    if matches.get_flag("strict") && !report.all_uploaded() {
        return Ok(ExitCode::from(EXIT_UPLOADS_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}
