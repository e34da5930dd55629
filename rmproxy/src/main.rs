use std::collections::HashMap;
use std::fs::File;
use std::net::Ipv4Addr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use broadlink_client::Registry;
use rmproxy::config::{self, Args};
use rmproxy::dispatcher::Dispatcher;
use rmproxy::homeassistant::HomeAssistant;
use rmproxy::server::{self, ProxyState};
use rmproxy::{macros, Catalog, Message};

const SHUTDOWN_CEILING: Duration = Duration::from_secs(30);

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // clap renders --help and errors alike; only the latter are fatal
            if e.use_stderr() {
                eprintln!("{e}");
                return ExitCode::from(1);
            }
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[tokio::main]
async fn run(args: Args) -> Result<()> {
    let catalog = load_catalog(&args)?;
    info!("processed {} rooms", catalog.room_count());

    let macros = load_macros(&args, &catalog)?;
    if macros.is_empty() {
        info!("no macros");
    } else {
        info!("processed {} macros", macros.len());
    }

    let homeassistant = load_homeassistant(&args)?;

    let registry = initialize_registry(&args)?;
    info!("{} devices available", registry.len());

    let dispatcher = Dispatcher::spawn(registry);
    let state = Arc::new(ProxyState {
        key: args.key.clone(),
        catalog,
        macros,
        homeassistant,
        queue: dispatcher.sender(),
    });

    let (halt_tx, halt_rx) = tokio::sync::oneshot::channel::<()>();
    let (addr, serving) = warp::serve(server::routes(state))
        .bind_with_graceful_shutdown((Ipv4Addr::UNSPECIFIED, args.port), async {
            let _ = halt_rx.await;
        });
    let server = tokio::spawn(serving);
    info!("web server listening on {addr}");

    tokio::signal::ctrl_c()
        .await
        .context("could not listen for the interrupt signal")?;
    info!("interrupt signal received, initiating shutdown process...");

    let _ = halt_tx.send(());
    if tokio::time::timeout(SHUTDOWN_CEILING, server).await.is_err() {
        warn!("web server did not drain within {SHUTDOWN_CEILING:?}");
    }

    dispatcher.shutdown().await;
    info!("shutdown successful");
    Ok(())
}

fn open(path: &Path, what: &str) -> Result<File> {
    File::open(path).with_context(|| format!("could not open {what} JSON file {}", path.display()))
}

fn load_catalog(args: &Args) -> Result<Catalog> {
    let commands = open(&args.commands, "commands")?;
    let rooms = open(&args.rooms, "rooms")?;
    Catalog::load(commands, rooms).context("error while processing the command catalog")
}

fn load_macros(args: &Args, catalog: &Catalog) -> Result<HashMap<String, Message>> {
    let Some(path) = &args.macros else {
        return Ok(HashMap::new());
    };
    let file = open(path, "macros")?;
    macros::compile(file, catalog).context("error while processing macros")
}

fn load_homeassistant(args: &Args) -> Result<Option<HomeAssistant>> {
    let Some(path) = &args.homeassistant else {
        info!("no Home Assistant config");
        return Ok(None);
    };
    let file = open(path, "Home Assistant")?;
    let bridge =
        HomeAssistant::load(file).context("error while processing the Home Assistant config")?;
    info!("successfully imported Home Assistant configuration");
    Ok(Some(bridge))
}

fn initialize_registry(args: &Args) -> Result<Registry> {
    let mut registry = Registry::new();

    if let Some(path) = &args.deviceconfig {
        let file = open(path, "device configurations")?;
        let configs = config::load_device_configs(file)
            .context("error while processing device configurations")?;
        for device in configs {
            registry
                .add_manual(
                    &device.ip,
                    &device.mac,
                    &device.key,
                    &device.id,
                    device.device_type,
                )
                .with_context(|| format!("error adding manual device {}", device.ip))?;
        }
        info!("added {} devices manually", registry.len());
        return Ok(registry);
    }

    if !args.skipdiscovery {
        let found = registry.discover().context("device discovery failed")?;
        info!("discovered {found} devices");
    }
    if registry.is_empty() {
        anyhow::bail!("did not discover any devices");
    }
    Ok(registry)
}
