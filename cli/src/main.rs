use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use localdb_core::{InstanceInfo, NamedArgs, Operation, Request};
use localdb_host::{
    HostConfig, HostError, Info, InstanceManager, StopMode, compatible_drivers, find_executables,
};
use serde::Serialize;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliOutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "localdb")]
#[command(about = "Manage SQL Server Express LocalDB instances through SqlLocalDB")]
struct Cli {
    /// YAML configuration file (executable path, drivers, timeout).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    format: CliOutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an instance.
    Create(CreateArgs),
    /// Stop and delete an instance.
    Delete(NameArgs),
    /// Start an instance.
    Start(NameArgs),
    /// Stop an instance.
    Stop(StopArgs),
    /// Share an instance under a shared name.
    Share(ShareArgs),
    /// Stop sharing an instance.
    Unshare(UnshareArgs),
    /// List instance names, or describe one instance.
    Info(InfoArgs),
    /// List installed LocalDB versions.
    Versions,
    /// Turn SqlLocalDB API tracing on or off.
    Trace(TraceArgs),
    /// Stop, delete and recreate an instance with the same version.
    Reset(NameArgs),
    /// Print the ODBC connection string for an instance.
    ConnectionString(ConnectionStringArgs),
    /// List installed ODBC drivers and those usable with LocalDB.
    Drivers,
    /// List discovered SqlLocalDB executables, newest first.
    Executables,
    /// Run an operation from name=value arguments and print the raw output.
    Call(CallArgs),
}

#[derive(Debug, Args)]
struct NameArgs {
    /// Instance name.
    name: String,
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// Instance name.
    name: String,
    /// Version as major.minor (default: newest installed).
    #[arg(long = "server-version")]
    server_version: Option<String>,
    /// Start the instance after creating it.
    #[arg(long)]
    start: bool,
}

#[derive(Debug, Args)]
struct StopArgs {
    /// Instance name.
    name: String,
    /// Shut down with NOWAIT.
    #[arg(long, conflicts_with = "kill")]
    nowait: bool,
    /// Kill the instance process.
    #[arg(long)]
    kill: bool,
}

#[derive(Debug, Args)]
struct ShareArgs {
    /// Instance name.
    name: String,
    /// Name the instance is shared under.
    shared_name: String,
    /// Owning account (default: current user).
    #[arg(long)]
    owner: Option<String>,
}

#[derive(Debug, Args)]
struct UnshareArgs {
    /// Shared name to remove.
    shared_name: String,
}

#[derive(Debug, Args)]
struct InfoArgs {
    /// Instance to describe; omit to list all instance names.
    name: Option<String>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum TraceState {
    On,
    Off,
}

#[derive(Debug, Args)]
struct TraceArgs {
    state: TraceState,
}

#[derive(Debug, Args)]
struct ConnectionStringArgs {
    /// Instance name.
    name: String,
    /// Database to connect to.
    #[arg(long)]
    database: Option<String>,
}

#[derive(Debug, Args)]
struct CallArgs {
    /// Operation name or one-letter alias (e.g. `info`, `i`).
    operation: String,
    /// Arguments as name=value pairs.
    args: Vec<String>,
}

/// Confirmation printed for operations with no other result.
#[derive(Debug, Serialize)]
struct Done<'a> {
    operation: &'a str,
    target: &'a str,
}

#[derive(Debug, Serialize)]
struct Drivers {
    installed: Vec<String>,
    compatible: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ConnectionString {
    instance: String,
    connection_string: String,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let result = load_config(cli.config.as_ref()).and_then(|config| {
        let ctx = Context {
            manager: InstanceManager::from_config(&config),
            config,
            format: cli.format,
        };
        run(ctx, cli.command)
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

struct Context {
    config: HostConfig,
    manager: InstanceManager,
    format: CliOutputFormat,
}

fn load_config(path: Option<&PathBuf>) -> Result<HostConfig, String> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration");
            HostConfig::load(path)
                .map_err(|e| format!("failed to load config '{}': {e}", path.display()))
        }
        None => Ok(HostConfig::default()),
    }
}

fn run(mut ctx: Context, command: Command) -> Result<(), String> {
    match command {
        Command::Create(args) => run_create(&mut ctx, args),
        Command::Delete(args) => {
            ctx.manager.delete(&args.name).map_err(describe)?;
            ctx.done("delete", &args.name)
        }
        Command::Start(args) => {
            ctx.manager.start(&args.name).map_err(describe)?;
            ctx.done("start", &args.name)
        }
        Command::Stop(args) => run_stop(&ctx, args),
        Command::Share(args) => {
            ctx.manager
                .share(&args.name, &args.shared_name, args.owner.as_deref())
                .map_err(describe)?;
            ctx.done("share", &args.name)
        }
        Command::Unshare(args) => {
            ctx.manager.unshare(&args.shared_name).map_err(describe)?;
            ctx.done("unshare", &args.shared_name)
        }
        Command::Info(args) => run_info(&ctx, args),
        Command::Versions => run_versions(&ctx),
        Command::Trace(args) => {
            let (enable, label) = match args.state {
                TraceState::On => (true, "on"),
                TraceState::Off => (false, "off"),
            };
            ctx.manager.trace(enable).map_err(describe)?;
            ctx.done("trace", label)
        }
        Command::Reset(args) => run_reset(&mut ctx, args),
        Command::ConnectionString(args) => run_connection_string(&mut ctx, args),
        Command::Drivers => run_drivers(&ctx),
        Command::Executables => {
            let found = find_executables(&ctx.config);
            ctx.emit(&found, || {
                found
                    .iter()
                    .map(|exe| {
                        if exe.version.is_empty() {
                            format!("{}\n", exe.path.display())
                        } else {
                            format!("{}\t{}\n", exe.version, exe.path.display())
                        }
                    })
                    .collect()
            })
        }
        Command::Call(args) => run_call(&ctx, args),
    }
}

fn run_create(ctx: &mut Context, args: CreateArgs) -> Result<(), String> {
    let info = ctx
        .manager
        .create(&args.name, args.server_version.as_deref(), args.start)
        .map_err(describe)?
        .info()
        .clone();
    ctx.emit(&info, || format_record(&info))
}

fn run_stop(ctx: &Context, args: StopArgs) -> Result<(), String> {
    let mode = if args.kill {
        StopMode::Kill
    } else if args.nowait {
        StopMode::NoWait
    } else {
        StopMode::Graceful
    };
    ctx.manager.stop(&args.name, mode).map_err(describe)?;
    ctx.done("stop", &args.name)
}

fn run_info(ctx: &Context, args: InfoArgs) -> Result<(), String> {
    let info = ctx.manager.info(args.name.as_deref()).map_err(describe)?;
    ctx.emit(&info, || match &info {
        Info::Names(names) => names.iter().map(|name| format!("{name}\n")).collect(),
        Info::Instance(record) => format_record(record),
    })
}

fn run_versions(ctx: &Context) -> Result<(), String> {
    let versions = ctx.manager.versions().map_err(describe)?;
    ctx.emit(&versions, || {
        versions
            .iter()
            .map(|v| format!("{}\t{}\n", v.short_version(), v.name))
            .collect()
    })
}

fn run_reset(ctx: &mut Context, args: NameArgs) -> Result<(), String> {
    let instance = ctx
        .manager
        .get(&args.name, false)
        .map_err(describe)?
        .ok_or_else(|| describe(HostError::KeyNotFound(args.name.clone())))?;
    instance.reset().map_err(describe)?;
    let info = instance.info().clone();
    ctx.emit(&info, || format_record(&info))
}

fn run_connection_string(ctx: &mut Context, args: ConnectionStringArgs) -> Result<(), String> {
    let instance = ctx
        .manager
        .get(&args.name, false)
        .map_err(describe)?
        .ok_or_else(|| describe(HostError::KeyNotFound(args.name.clone())))?;
    let result = ConnectionString {
        instance: instance.name().to_string(),
        connection_string: instance
            .connection_string(args.database.as_deref())
            .map_err(describe)?,
    };
    ctx.emit(&result, || format!("{}\n", result.connection_string))
}

fn run_drivers(ctx: &Context) -> Result<(), String> {
    let installed = ctx
        .config
        .driver_source()
        .installed_drivers()
        .map_err(describe)?;
    let drivers = Drivers {
        compatible: compatible_drivers(&installed),
        installed,
    };
    ctx.emit(&drivers, || {
        drivers
            .compatible
            .iter()
            .map(|name| format!("{name}\n"))
            .collect()
    })
}

fn run_call(ctx: &Context, args: CallArgs) -> Result<(), String> {
    let operation = Operation::from_str(&args.operation).map_err(|e| e.to_string())?;
    let named = parse_named_args(&args.args)?;
    let request = Request::from_named(operation, &named).map_err(|e| e.to_string())?;
    debug!(?request, "Running raw request");
    let output = ctx.manager.execute(&request).map_err(describe)?;
    print!("{output}");
    Ok(())
}

impl Context {
    /// Prints `value` in the selected format; `text` renders the plain form.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<(), String> {
        let rendered = match self.format {
            CliOutputFormat::Text => text(),
            CliOutputFormat::Json => serde_json::to_string_pretty(value)
                .map(|json| format!("{json}\n"))
                .map_err(|e| format!("JSON serialization failed: {e}"))?,
            CliOutputFormat::Yaml => serde_yaml::to_string(value)
                .map_err(|e| format!("YAML serialization failed: {e}"))?,
        };
        print!("{rendered}");
        Ok(())
    }

    fn done(&self, operation: &str, target: &str) -> Result<(), String> {
        let done = Done { operation, target };
        self.emit(&done, || format!("{operation}: {target}\n"))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Renders an error, with the details block for attach/detach failures.
fn describe(err: HostError) -> String {
    match err {
        HostError::LocalDb(err) if err.is_translated() => {
            format!("{err}\n{}", err.summary().trim_end())
        }
        other => other.to_string(),
    }
}

fn format_record(info: &InstanceInfo) -> String {
    [
        ("Name", &info.name),
        ("Version", &info.version),
        ("Shared name", &info.shared_name),
        ("Owner", &info.owner),
        ("Auto-create", &info.auto_create),
        ("State", &info.state),
        ("Last start time", &info.last_start),
        ("Instance pipe name", &info.pipe_name),
    ]
    .iter()
    .map(|(key, value)| format!("{:<20}{value}\n", format!("{key}:")))
    .collect()
}

/// Splits `name=value` pairs; keys are lower-cased.
fn parse_named_args(raw: &[String]) -> Result<NamedArgs, String> {
    raw.iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected name=value, got '{pair}'"))?;
            Ok((key.trim().to_lowercase(), value.to_string()))
        })
        .collect()
}
