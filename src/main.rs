use chrono::Utc;
use clap::Parser;
use gossip_kv::{GossipClient, GossipClientConfig, GossipOptions, StorageConfig};
use slog::Drain;
use std::error::Error;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "gossip-kv")]
#[command(about = "Eventually consistent key-value replica that spreads updates by gossip", long_about = None)]
struct Cli {
    /// UDP address to listen on
    #[arg(short, long, default_value = "127.0.0.1:7000")]
    bind: SocketAddr,

    /// Address peers should use to reach this replica, if different from --bind
    #[arg(long)]
    advertise: Option<SocketAddr>,

    /// A peer replica. Repeat for each neighbor.
    #[arg(short, long = "neighbor")]
    neighbors: Vec<SocketAddr>,

    /// Store one file per key in this directory. Values are kept in memory if omitted.
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Write logs into this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let logger = match &cli.log_dir {
        Some(directory) => create_root_logger_for_file(directory, cli.bind)?,
        None => create_root_logger_for_stderr(),
    };
    let storage = match cli.data_dir {
        Some(directory) => StorageConfig::Directory(directory),
        None => StorageConfig::InMemory,
    };

    let client = gossip_kv::try_create_gossip_client(GossipClientConfig {
        bind_addr: cli.bind,
        advertised_addr: cli.advertise,
        neighbors: cli.neighbors,
        storage,
        info_logger: logger,
        options: GossipOptions::default(),
        rng_seed: None,
    })
    .await?;

    println!("Replica listening on {}", client.local_addr());
    println!("Commands: put <key> <value> | get <key> | delete <key> | local <key> | quit");
    run_console(client).await?;

    Ok(())
}

async fn run_console(client: GossipClient) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = match line.find(char::is_whitespace) {
            Some(i) => (&line[..i], line[i..].trim_start()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "put" => {
                let (key, value) = match rest.find(char::is_whitespace) {
                    Some(i) => (&rest[..i], rest[i..].trim_start()),
                    None => {
                        println!("usage: put <key> <value>");
                        continue;
                    }
                };
                match client.put(key, value).await {
                    Ok(version) => println!("ok {}", version),
                    Err(e) => println!("error: {}", e),
                }
            }
            "get" => match client.get(rest).await {
                Ok(output) => println!(
                    "{} (version {}, {} votes)",
                    output.value, output.version, output.votes
                ),
                Err(e) => println!("error: {}", e),
            },
            "delete" => match client.delete(rest).await {
                Ok(()) => println!("ok"),
                Err(e) => println!("error: {}", e),
            },
            "local" => match client.local_entry(rest).await {
                Ok(Some(entry)) => println!("{} (version {})", entry.value, entry.version),
                Ok(None) => println!("(not found)"),
                Err(e) => println!("error: {}", e),
            },
            "quit" | "exit" => break,
            other => println!("unknown command {:?}", other),
        }
    }

    Ok(())
}

fn create_root_logger_for_file(directory: &Path, bind: SocketAddr) -> Result<slog::Logger, Box<dyn Error>> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let log_path = directory.join(format!("{}_{}_info.log", bind.port(), now));
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Ok(slog::Logger::root(drain, slog::o!()))
}

fn create_root_logger_for_stderr() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).use_file_location().build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!())
}
