//! Ladle command-line interface

use std::io::Write;
use std::sync::atomic::Ordering;
use std::{env, panic, process};

use clap::{Parser, Subcommand};
use log::{debug, warn};

use ladle::exceptions::LadleError;
use ladle::exec::{self, Invocation, StderrMode, popen_read, safe_popen_read};
use ladle::exit_codes::{
    EXIT_EXEC_FAILED, EXIT_IO_ERROR, EXIT_PANIC, EXIT_SERVICE_ERROR, EXIT_SUCCESS,
};
use ladle::services::{ServiceRoot, cleanup, services_list};

const VERSION: &str = ladle::version::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "ladle",
    version = VERSION,
    about = "Run commands through a capture pipe and manage services"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error, or json:<level>)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Replace this process with the given command (or spawn and wait when
    /// LADLE_EXEC_MODE=spawn)
    Run {
        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,

        /// Keep the command's stderr attached instead of the null sink
        #[arg(long)]
        stderr: bool,
    },

    /// Capture a command's output and print it
    Output {
        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,

        /// Keep the command's stderr attached instead of the null sink
        #[arg(long)]
        stderr: bool,
    },

    /// Service listing and cleanup
    Services {
        #[command(subcommand)]
        command: ServicesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ServicesCommand {
    /// List installed services with their loaded state
    List,

    /// Kill orphaned services and remove stale unit files
    #[command(aliases = ["clean", "cl", "rm"])]
    Cleanup,
}

fn main() {
    // Set up panic handler to return specific exit code
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        process::exit(EXIT_PANIC);
    }));

    // Wrap main logic in catch_unwind for extra safety
    let result = panic::catch_unwind(run);

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(_) => {
            eprintln!("Fatal: Unhandled panic in ladle");
            process::exit(EXIT_PANIC);
        }
    }
}

fn run() -> i32 {
    let args = Args::parse();

    if let Some(ref level) = args.log_level {
        ladle::logger::JsonLogger::init_with_level(level);
    } else {
        ladle::logger::JsonLogger::init();
    }

    match args.command {
        CliCommand::Run { argv, stderr } => cmd_run(argv, stderr),
        CliCommand::Output { argv, stderr } => cmd_output(argv, stderr),
        CliCommand::Services { command } => match command {
            ServicesCommand::List => cmd_services_list(),
            ServicesCommand::Cleanup => cmd_services_cleanup(),
        },
    }
}

fn build_invocation(mut argv: Vec<String>, keep_stderr: bool) -> Invocation {
    argv[0] = resolve_executable(&argv[0]);
    let invocation = Invocation::new(argv);
    if keep_stderr {
        invocation.stderr(StderrMode::Inherit)
    } else {
        invocation
    }
}

/// Resolve a bare executable name against the search path
///
/// Names containing a path separator are taken as given. Resolution
/// failures fall back to the name itself, so the launch-failure mapping
/// still produces its diagnostics.
fn resolve_executable(executable: &str) -> String {
    if executable.contains('/') {
        return executable.to_string();
    }
    match which::which(executable) {
        Ok(path) => {
            let resolved = path.to_string_lossy().to_string();
            debug!("resolved executable '{executable}' to '{resolved}'");
            resolved
        }
        Err(_) => executable.to_string(),
    }
}

fn cmd_run(argv: Vec<String>, keep_stderr: bool) -> i32 {
    let invocation = build_invocation(argv, keep_stderr);

    let spawn_mode =
        env::var("LADLE_EXEC_MODE").is_ok_and(|mode| mode.eq_ignore_ascii_case("spawn"));
    if !spawn_mode {
        // Replaces the process image; only a launch failure comes back, and
        // exec_replace terminates with the contract status itself.
        exec::exec_replace(&invocation);
    }

    spawn_signal_forwarder();
    match exec::run_attached(&invocation) {
        Ok(status) => status.code().unwrap_or(EXIT_EXEC_FAILED),
        Err(err) => {
            eprintln!("ladle: {err}");
            EXIT_IO_ERROR
        }
    }
}

/// Forward SIGINT/SIGTERM to the attached child while it runs
fn spawn_signal_forwarder() {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(err) => {
            warn!("signal forwarding unavailable: {err}");
            return;
        }
    };

    std::thread::spawn(move || {
        for signal in signals.forever() {
            let pid = ladle::CHILD_PID.load(Ordering::SeqCst);
            if pid == 0 {
                continue;
            }
            let flag = if signal == SIGTERM { "-TERM" } else { "-INT" };
            let pid_arg = pid.to_string();
            let kill =
                Invocation::new(["kill", flag, pid_arg.as_str()]).stderr(StderrMode::Discard);
            if let Err(err) = popen_read(&kill) {
                warn!("failed to forward signal to pid {pid}: {err}");
            }
        }
    });
}

fn cmd_output(argv: Vec<String>, keep_stderr: bool) -> i32 {
    let invocation = build_invocation(argv, keep_stderr);

    match safe_popen_read(&invocation) {
        Ok(output) => {
            let mut stdout = std::io::stdout();
            if stdout.write_all(&output).and_then(|_| stdout.flush()).is_err() {
                return EXIT_IO_ERROR;
            }
            EXIT_SUCCESS
        }
        Err(LadleError::ExecutionFailed { status, output, .. }) => {
            for (_, bytes) in &output {
                let _ = std::io::stdout().write_all(bytes);
            }
            eprintln!("ladle: command exited with {status}");
            status.code().unwrap_or(EXIT_EXEC_FAILED)
        }
        Err(err) => {
            eprintln!("ladle: {err}");
            EXIT_IO_ERROR
        }
    }
}

fn cmd_services_list() -> i32 {
    let root = ServiceRoot::from_env();
    match services_list(&root) {
        Ok(list) => {
            if list.is_empty() {
                println!("No services installed.");
                return EXIT_SUCCESS;
            }
            println!("{:<24} {:<8} {:<8} FILE", "NAME", "STATUS", "PID");
            for info in list {
                let status = if info.loaded { "loaded" } else { "-" };
                let pid = info
                    .pid
                    .map(|pid| pid.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} {:<8} {:<8} {}",
                    info.name,
                    status,
                    pid,
                    info.definition_path.display()
                );
            }
            EXIT_SUCCESS
        }
        Err(err) => {
            eprintln!("ladle: {err}");
            EXIT_SERVICE_ERROR
        }
    }
}

fn cmd_services_cleanup() -> i32 {
    let root = ServiceRoot::from_env();
    match cleanup(&root) {
        Ok(cleaned) => {
            if cleaned.is_empty() {
                println!("All services OK, nothing cleaned...");
            } else {
                for name in cleaned {
                    println!("Cleaned {name}");
                }
            }
            EXIT_SUCCESS
        }
        Err(err) => {
            eprintln!("ladle: {err}");
            EXIT_SERVICE_ERROR
        }
    }
}
