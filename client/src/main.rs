use anyhow::{Context, Result};
use baron_wx_client::api::Payload;
use baron_wx_client::{ApiClient, Config, FixedClock, SignedUrl, UrlSigner};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "baronwx", about = "Signed-URL client for the Baron weather API")]
struct Cli {
    /// Load config from a specific .env file (default: local.env, then .env)
    #[arg(long, global = true)]
    config_file: Option<String>,

    /// Strip trailing '=' padding from signatures
    #[arg(long, global = true)]
    strip_padding: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign an arbitrary URL and print it
    Sign {
        url: String,

        /// Sign at this epoch second instead of now
        #[arg(long)]
        timestamp: Option<u64>,

        /// Print url, signature and timestamp as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the signed URL for an API path, e.g. /reports/metar/station/egll.json
    Url { api: String },

    /// Perform a signed GET of an API path (or full URL) and print the response
    Get { api: String },

    /// Check a signed URL against the configured credentials
    Verify {
        url: String,

        /// Accepted distance between ts and now, in seconds
        #[arg(long)]
        max_skew: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // missing or empty credentials are fatal at startup
    let mut cfg = match Config::from_env_file(cli.config_file.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {e:#}");
            std::process::exit(1);
        }
    };
    if cli.strip_padding {
        cfg.strip_padding = true;
    }

    debug!(
        "Host: {} | Key: {} | Strip padding: {}",
        cfg.api_host,
        cfg.credentials.api_key(),
        cfg.strip_padding
    );

    match cli.command {
        Command::Sign { url, timestamp, json } => {
            let parts = sign(&cfg, &url, timestamp)?;
            if json {
                println!("{}", serde_json::to_string(&parts)?);
            } else {
                println!("{}", parts.url);
            }
        }
        Command::Url { api } => {
            let client = build_client(&cfg)?;
            println!("{}", client.make_url(&api));
        }
        Command::Get { api } => {
            let client = build_client(&cfg)?;
            let payload = if api.starts_with("http://") || api.starts_with("https://") {
                client.get_url(&api).await?
            } else {
                client.get(&api).await?
            };
            print_payload(&payload);
        }
        Command::Verify { url, max_skew } => {
            let signer = UrlSigner::new(cfg.signer_config());
            let max_skew = max_skew.unwrap_or(cfg.max_clock_skew_secs);
            let creds = &cfg.credentials;

            match signer.verify(&url, creds.api_key(), creds.expose_secret(), max_skew) {
                Ok(verified) => {
                    info!("Signature valid (ts={})", verified.timestamp);
                    println!("{}", verified.base_url);
                }
                Err(e) => {
                    error!("Verification failed: {e}");
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}

fn sign(cfg: &Config, url: &str, timestamp: Option<u64>) -> Result<SignedUrl> {
    let key = cfg.credentials.api_key();
    let secret = cfg.credentials.expose_secret();

    let parts = match timestamp {
        Some(ts) => {
            let ts = i64::try_from(ts).context("--timestamp is out of range")?;
            UrlSigner::with_clock(cfg.signer_config(), FixedClock(ts))
                .sign_parts(url, key, secret)?
        }
        None => UrlSigner::new(cfg.signer_config()).sign_parts(url, key, secret)?,
    };
    Ok(parts)
}

fn build_client(cfg: &Config) -> Result<ApiClient> {
    ApiClient::new(
        &cfg.api_host,
        cfg.credentials.clone(),
        UrlSigner::new(cfg.signer_config()),
        cfg.http_timeout_secs,
    )
}

/// Text bodies go to stdout as received; binary bodies (tiles, WMS images) are only summarized.
fn print_payload(payload: &Payload) {
    let is_image = payload
        .content_type
        .as_deref()
        .map(|ct| ct.starts_with("image/"))
        .unwrap_or(false);

    match payload.as_text() {
        Some(text) if !is_image => println!("{text}"),
        _ => println!(
            "{} bytes ({})",
            payload.len(),
            payload.content_type.as_deref().unwrap_or("unknown content type")
        ),
    }
}
