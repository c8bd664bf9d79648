//! Harbor - cluster package manager
//!
//! Usage:
//!   harbor packages               # List catalog packages
//!   harbor install kafka          # Install the current version of a package
//!   harbor uninstall kafka --id /kafka
//!   harbor watch                  # Consume the pending-install queue

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use harbor_core::backend::{
    MarathonClient, MesosClient, ResourceManager, Scheduler, coordinator_for,
};
use harbor_core::catalog::Catalog;
use harbor_core::config::{ConfigMap, PlatformConfig};
use harbor_core::error::{ErrorKind, HarborError};
use harbor_core::kv::{ConsulKv, KvStore};
use harbor_core::orchestration::{PackageRequest, PackageService, PendingInstallPoller};
use harbor_core::settings::{LogFormat, Settings};

const DEFAULT_MARATHON: &str = "http://localhost:8080";
const DEFAULT_MESOS: &str = "http://localhost:5050";

#[derive(Parser)]
#[command(name = "harbor")]
#[command(about = "Cluster package manager", long_about = None)]
struct Cli {
    /// Settings file (defaults to <config dir>/harbor/harbor.toml)
    #[arg(long, env = "HARBOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Consul HTTP address
    #[arg(long, env = "HARBOR_CONSUL", global = true)]
    consul: Option<String>,

    /// Marathon URL
    #[arg(long, env = "HARBOR_MARATHON", global = true)]
    marathon: Option<String>,

    /// Mesos master URL
    #[arg(long, env = "HARBOR_MESOS", global = true)]
    mesos: Option<String>,

    /// ZooKeeper servers, comma separated
    #[arg(long, env = "HARBOR_ZOOKEEPER", value_delimiter = ',', global = true)]
    zookeeper: Vec<String>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, env = "HARBOR_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog repositories
    Repositories,

    /// List catalog packages
    Packages,

    /// Show one package
    Package {
        name: String,
    },

    /// Install a package
    Install {
        name: String,
        /// Package version (defaults to the current version)
        #[arg(long)]
        version: Option<String>,
        /// Scheduler app id
        #[arg(long)]
        id: Option<String>,
        /// Configuration overrides as a JSON object
        #[arg(long)]
        config: Option<String>,
    },

    /// Uninstall a package
    #[command(alias = "rm")]
    Uninstall {
        name: String,
        /// Scheduler app id, required when the package is installed more than once
        #[arg(long)]
        id: Option<String>,
    },

    /// List installed packages
    Installed,

    /// List resource-manager frameworks
    Frameworks {
        /// Include completed frameworks
        #[arg(long)]
        completed: bool,
    },

    /// Shut down a framework by id
    Teardown {
        framework_id: String,
    },

    /// Poll the pending-install queue until interrupted
    Watch,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<HarborError>().map(HarborError::kind) {
        Some(ErrorKind::Validation) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::Conflict) => 4,
        Some(ErrorKind::Upstream) | None => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = apply_overrides(Settings::load(cli.config.as_deref())?, &cli);
    init_tracing(&settings);

    match cli.command {
        Commands::Repositories => print_json(&catalog(&settings)?.list_repositories()?),
        Commands::Packages => print_json(&catalog(&settings)?.list_packages()?),
        Commands::Package { name } => {
            let package = catalog(&settings)?
                .get_package(&name)?
                .ok_or_else(|| HarborError::NotFound(format!("package {} not found", name)))?;
            print_json(&package)
        }
        Commands::Install {
            name,
            version,
            id,
            config,
        } => {
            let mut request = PackageRequest::new(name);
            request.version = version;
            request.app_id = id;
            if let Some(raw) = config {
                let overrides: ConfigMap = serde_json::from_str(&raw)
                    .map_err(|e| HarborError::validation("config", e.to_string()))?;
                request.config = Some(overrides);
            }
            print_json(&service(&settings)?.install(&request)?)
        }
        Commands::Uninstall { name, id } => {
            let mut request = PackageRequest::new(name);
            request.app_id = id;
            print_json(&service(&settings)?.uninstall(&request)?)
        }
        Commands::Installed => print_json(&service(&settings)?.installed()?),
        Commands::Frameworks { completed } => {
            print_json(&service(&settings)?.frameworks(completed)?)
        }
        Commands::Teardown { framework_id } => {
            service(&settings)?.teardown_framework(&framework_id)?;
            Ok(())
        }
        Commands::Watch => watch(&settings),
    }
}

fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(consul) = &cli.consul {
        settings.consul = consul.clone();
    }
    if let Some(url) = &cli.marathon {
        settings.marathon.url = Some(url.clone());
    }
    if let Some(url) = &cli.mesos {
        settings.mesos.url = Some(url.clone());
    }
    if !cli.zookeeper.is_empty() {
        settings.zookeeper = cli.zookeeper.clone();
    }
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    if cli.log_json {
        settings.log_format = LogFormat::Json;
    }
    settings
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let json = settings.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", rendered);
    Ok(())
}

fn kv(settings: &Settings) -> Result<Arc<dyn KvStore>> {
    let consul = ConsulKv::new(&settings.consul, settings.accept_invalid_certs)
        .with_context(|| format!("Failed to configure Consul at {}", settings.consul))?;
    Ok(Arc::new(consul))
}

fn catalog(settings: &Settings) -> Result<Catalog> {
    Ok(Catalog::new(kv(settings)?, settings.keyspace()))
}

fn service(settings: &Settings) -> Result<PackageService> {
    let marathon = MarathonClient::new(
        settings.marathon.url.as_deref().unwrap_or(DEFAULT_MARATHON),
        settings.marathon.user.clone(),
        settings.marathon.password.clone(),
        settings.accept_invalid_certs,
    )?;
    let credentials = settings.mesos_credentials()?;
    let mesos = MesosClient::new(
        settings.mesos.url.as_deref().unwrap_or(DEFAULT_MESOS),
        Some(credentials.principal.clone()),
        Some(credentials.secret.clone()),
        settings.accept_invalid_certs,
    )?;

    let zookeeper_hosts = settings.zookeeper_hosts();
    let platform = PlatformConfig::discover(&mesos, &credentials, zookeeper_hosts.as_deref())
        .context("Failed to read cluster authentication state")?;
    let coordinator = coordinator_for(&settings.zookeeper);
    let scheduler: Arc<dyn Scheduler> = Arc::new(marathon);
    let resources: Arc<dyn ResourceManager> = Arc::new(mesos);

    Ok(PackageService::new(
        catalog(settings)?,
        scheduler,
        resources,
        coordinator,
        platform,
    ))
}

fn watch(settings: &Settings) -> Result<()> {
    let service = service(settings)?;
    let poller = Arc::new(PendingInstallPoller::new(kv(settings)?, service));
    let interval = settings.refresh_interval();
    info!(interval_secs = interval.as_secs(), "watching for pending installs");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(poller.run(interval));
    Ok(())
}
