use clap::{Parser, Subcommand};
use log::info;
use s3_import::{config::ENDPOINT_ENV, copy_bucket, copy_file, init_logger, report, S3Config, S3Fetcher};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Storage hostname, `https://` is prepended
    #[arg(long, env = ENDPOINT_ENV)]
    endpoint: Option<String>,
    /// JSON file with the connection settings
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    tries: Option<u32>,
    #[arg(long)]
    log_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy a bucket or prefix to a local folder
    Bucket {
        #[arg(long)]
        source: String,
        #[arg(long)]
        destination: PathBuf,
        #[arg(long)]
        no_recursive: bool,
    },
    /// Copy one object to a local file
    File {
        #[arg(long)]
        source: String,
        #[arg(long)]
        destination: PathBuf,
    },
    /// Run the example imports
    Demo,
}

fn load_config(args: &Args) -> Result<S3Config, Box<dyn std::error::Error>> {
    let mut config = match (&args.config, &args.endpoint) {
        (Some(path), _) => S3Config::from_json_file(path)?,
        (None, Some(endpoint)) => S3Config::with_env_credentials(endpoint.as_str()),
        (None, None) => S3Config::from_env()?,
    };
    // an explicit flag wins over the config file
    if let (Some(_), Some(endpoint)) = (&args.config, &args.endpoint) {
        config.endpoint = endpoint.clone();
    }
    if args.region.is_some() {
        config.region = args.region.clone();
    }
    if args.tries.is_some() {
        config.tries = args.tries;
    }
    Ok(config)
}

fn run_demo(fetcher: &S3Fetcher) -> Result<(), Box<dyn std::error::Error>> {
    report(&copy_bucket(fetcher, "maximerichaudeau1/data", "./data", true)?);
    report(&copy_bucket(fetcher, "maximerichaudeau1/json", "./json", true)?);
    report(&copy_file(
        fetcher,
        "maximerichaudeau1/cross_entropy_weighted10_batch64_32_16.pth",
        "./cross_entropy_weighted10_batch64_32_16.pth",
    )?);
    report(&copy_file(fetcher, "maximerichaudeau1/test.txt", "./test.txt")?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let _logger = init_logger(args.log_path.as_deref())?;
    let config = load_config(&args)?;
    info!("using endpoint {}", config.endpoint_url());
    let fetcher = S3Fetcher::new(&config)?;
    match args.command {
        Command::Bucket {
            source,
            destination,
            no_recursive,
        } => {
            report(&copy_bucket(&fetcher, &source, &destination, !no_recursive)?);
        }
        Command::File {
            source,
            destination,
        } => {
            report(&copy_file(&fetcher, &source, &destination)?);
        }
        Command::Demo => run_demo(&fetcher)?,
    }
    Ok(())
}
