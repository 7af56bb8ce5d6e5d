//! murmur: passphrase-encrypted group chat over NATS
//!
//! Usage:
//!   murmur [--config murmur.toml] [--name alice] [--nats-url URL] [--topic SUBJECT]
//!
//! Everyone who enters the same passphrase on the same topic can read the
//! room. Anyone else, including the NATS operator, only sees opaque envelopes.
//!
//! Two loops run per session, each with its own NATS connection:
//!   producer - reads stdin lines, seals and publishes them
//!   consumer - pulls envelopes from the subscription, opens and prints them

mod display;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::style::{Color, Stylize};
use murmur_core::config::{BusConfig, ChatConfig, MurmurConfig};
use murmur_crypto::KdfParams;
use murmur_relay::{Bus, Consumer, NatsBus, Publisher};
use secrecy::SecretString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "murmur",
    version,
    about = "Passphrase-encrypted group chat",
    long_about = "murmur: exchange short messages over a NATS fanout subject, readable only by holders of a shared passphrase"
)]
struct Cli {
    /// Path to murmur.toml configuration file
    #[arg(long, short = 'c', env = "MURMUR_CONFIG", default_value = "murmur.toml")]
    config: PathBuf,

    /// Display name sent with every message (prompted when omitted)
    #[arg(long, short = 'n')]
    name: Option<String>,

    /// NATS endpoint (overrides config)
    #[arg(long, env = "MURMUR_NATS_URL")]
    nats_url: Option<String>,

    /// Room subject (overrides config)
    #[arg(long, env = "MURMUR_TOPIC")]
    topic: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MURMUR_LOG")]
    log: Option<String>,

    /// Log format (json, text)
    #[arg(long, env = "MURMUR_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

type InputLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = MurmurConfig::read(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    let config_found = file_config.is_some();
    let mut config = file_config.unwrap_or_default();
    if let Some(url) = cli.nats_url {
        config.bus.nats_url = url;
    }
    if let Some(topic) = cli.topic {
        config.bus.topic = topic;
    }
    config.validate()?;

    let level = cli.log.unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        topic = %config.bus.topic,
        "murmur starting"
    );
    if !config_found {
        warn_config_missing(&cli.config);
    }

    let kdf = KdfParams::new(config.crypto.kdf_iterations)?;

    let passphrase = rpassword::prompt_password("Passphrase: ").context("reading passphrase")?;
    if passphrase.is_empty() {
        warn!("empty passphrase: anyone who also leaves it empty can read this room");
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let name = match cli.name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => prompt_name(&mut input).await?,
    };
    let hint = display::random_hint();

    let publisher = Publisher::new(
        connect(&config.bus, true).await?,
        config.bus.topic.clone(),
        SecretString::from(passphrase.clone()),
        kdf,
    );
    let consumer = Consumer::new(SecretString::from(passphrase), kdf);
    info!(topic = publisher.topic(), "publisher ready");

    let subscriber_bus = connect(&config.bus, false).await?;
    let deliveries = subscriber_bus.subscribe(&config.bus.topic).await?;

    let own_color = display::color_for(hint).unwrap_or(Color::Reset);
    println!("{}", format!("Connected as {name}...").with(own_color));

    publisher
        .publish(&name, &config.chat.greeting, hint)
        .await
        .context("publishing greeting")?;

    let mut consume = tokio::spawn(async move {
        let _connection = subscriber_bus;
        consumer
            .run(deliveries, |received| {
                println!("{}", display::render(&received));
            })
            .await
    });

    tokio::select! {
        produced = produce(&publisher, &mut input, &name, hint, &config.chat) => {
            consume.abort();
            produced
        }
        consumed = &mut consume => {
            consumed
                .context("consumer task failed")?
                .context("receiving messages")
        }
    }
}

/// Read local lines and publish them until the quit command or end of input.
async fn produce<B: Bus>(
    publisher: &Publisher<B>,
    input: &mut InputLines,
    name: &str,
    hint: &str,
    chat: &ChatConfig,
) -> Result<()> {
    while let Some(line) = input.next_line().await.context("reading input")? {
        if line.trim() == chat.quit_command {
            println!("Leaving the room...");
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let chars = line.chars().count();
        if chars > chat.max_message_chars {
            println!(
                "{}",
                format!(
                    "Message is {chars} characters; the limit is {}. Try again.",
                    chat.max_message_chars
                )
                .red()
            );
            continue;
        }

        publisher
            .publish(name, &line, hint)
            .await
            .context("publishing message")?;
    }
    Ok(())
}

async fn prompt_name(input: &mut InputLines) -> Result<String> {
    loop {
        print!("Name: ");
        std::io::stdout().flush().context("flushing stdout")?;

        let Some(line) = input.next_line().await.context("reading name")? else {
            anyhow::bail!("input closed before a name was entered");
        };
        let name = line.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }
}

async fn connect(bus: &BusConfig, publishing: bool) -> Result<NatsBus> {
    let nats = NatsBus::connect(&bus.nats_url).await?;
    if publishing && bus.persist {
        return Ok(nats
            .with_persistence(
                &bus.stream_name,
                &bus.topic,
                Duration::from_secs(bus.stream_max_age_secs),
            )
            .await);
    }
    Ok(nats)
}

/// Emitted after logging is initialised; config is read before the level is known.
fn warn_config_missing(path: &Path) {
    warn!("config file not found: {}  (using defaults)", path.display());
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
