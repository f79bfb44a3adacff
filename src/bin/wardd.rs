use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use ward::cli::Cli;
use ward::config::{ConfigProvider, ServerConfig, TransportKind, YamlConfigProvider};
use ward::context::Context;
use ward::daemon;
use ward::dispatcher::Dispatcher;
use ward::logging::Logging;
use ward::monitor::Monitor;
use ward::notify::TracingSink;
use ward::supervisor::Supervisor;
use ward::transport::{bind_http_transport, SocketTransport};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = Logging::try_init() {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::init();

    if cli.print_debug_info {
        println!("CLI: {cli:#?}");
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "wardd failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let pid_guard = daemon::acquire_pid_file()?;

    // Resolve the configuration path to absolute, and capture the launch
    // directory, before any chdir — mirroring the original implementation's
    // taskmasterd.py, which captures `os.getcwd()` before forking so it can
    // chdir the daemonised process back into the directory it was launched
    // from rather than losing it to `/`.
    let config_path = std::fs::canonicalize(&cli.config).unwrap_or_else(|_| cli.config.clone());
    let launch_dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("/"));

    if !cli.foreground {
        daemon::daemonize(&launch_dir)?;
        pid_guard.rewrite_current_pid()?;
    }

    info!(config = %config_path.display(), "loading configuration");
    let config_provider = Arc::new(YamlConfigProvider::new(&config_path));
    let server_config = config_provider.load()?.server;

    let notifier = Arc::new(TracingSink);
    let supervisor = Arc::new(Supervisor::new(config_provider, notifier)?);
    supervisor.start_autostart_programs();

    let monitor = Monitor::spawn(supervisor.clone());

    let shutdown: Context<bool> = Context::new();
    let dispatcher = Arc::new(Dispatcher::new(supervisor.clone()));

    let shutdown_trigger = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_trigger.cancel_all(true).ok();
    })?;

    spawn_transport(&server_config, dispatcher)?;

    info!("wardd is running, waiting for shutdown signal");
    shutdown.wait_condvar()?;

    info!("shutting down, stopping all workers");
    supervisor.shutdown();
    monitor.stop();
    drop(pid_guard);

    Ok(())
}

/// Binds the configured transport's listener and starts serving it on its
/// own thread/task. Binding happens here, before returning, so a port
/// already in use surfaces as the fatal daemon error SPEC_FULL.md §7.6
/// requires and aborts startup — not as a silently logged error from a
/// thread nobody is waiting on. Once bound, the socket transport blocks a
/// dedicated OS thread on `accept`; the HTTP transport runs as a task on
/// the current tokio runtime. Either way the process exits (ending the
/// listener) once `shutdown()` returns in `run`, per SPEC_FULL.md §4.6's
/// "daemon exits within max(stoptsecs)+ε" requirement.
fn spawn_transport(server: &ServerConfig, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    let host = server.host.clone();
    let port = server.effective_port();

    match server.kind {
        TransportKind::Socket => {
            let transport = SocketTransport::bind(&host, port)?;
            std::thread::spawn(move || transport.serve(dispatcher));
        }
        TransportKind::Http => {
            let server = bind_http_transport(host, port, dispatcher)?;
            tokio::spawn(async move {
                if let Err(err) = server.await {
                    error!(error = %err, "http transport exited with error");
                }
            });
        }
    }

    Ok(())
}
