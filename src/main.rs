/*!
# doublewrap - a wrapper for duplicity

doublewrap keeps encrypted, incremental backups of a set of local directories
on a remote host, and can turn the backup chain of a single file back into a
browsable git history.

## Usage

```
doublewrap [OPTIONS] <COMMAND>

Commands:
  backup      Run backup
  list        List backed up files
  restore     Restore file(s)
  verify      Compare the backup with the local files
  status      Show the backup chain status
  gitrestore  Restore all backed up versions of a file to a git repository

Options:
  -c, --config <FILE>          Config file location
  -v, --verbosity <VERBOSITY>  Between 0 (no output) and 9 (full output) [default: 0]
      --log-format <FORMAT>    Log output format [default: text] [possible values: text, json]
```

## Configuration

See [`doublewrap::config`] for the TOML layout. `DOUBLEWRAP_CONFIG` overrides
the default file location and `DOUBLEWRAP_PASSPHRASE` supplies the passphrase
without prompting.
*/

use doublewrap::cli::{CliArgs, Command};
use doublewrap::constants::TRACING_ROOT_SPAN_NAME;
use doublewrap::engine::Duplicity;
use doublewrap::errors::AppResult;
use doublewrap::ops::restore_history;
use doublewrap::process::{CommandRunner, SystemRunner};
use doublewrap::remote::RemoteShell;
use doublewrap::vcs::GitRepo;
use doublewrap::{Config, Passphrase};
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info, info_span};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// The main entry point for the doublewrap application.
///
/// Sets up logging, opens the root span for this invocation and reports any
/// error as a single `Error:` line with exit status 1.
fn main() {
    let args = CliArgs::parse();
    init_tracing(&args);

    let correlation_id = Uuid::new_v4();
    let span = info_span!(TRACING_ROOT_SPAN_NAME, correlation_id = %correlation_id);
    let _guard = span.enter();

    if let Err(e) = run(args) {
        debug!(error = ?e, "Command failed");
        eprintln!("Error: {}", e.one_line());
        std::process::exit(1);
    }
}

/// Installs the stderr subscriber. `RUST_LOG` overrides the level chosen by
/// `--verbosity`.
fn init_tracing(args: &CliArgs) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);

    if args.json_logs() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .init();
    }
}

/// Loads settings, prepares the remote root and dispatches the subcommand.
fn run(args: CliArgs) -> AppResult<()> {
    let config_path = Config::resolve_path(args.config.as_deref())?;
    let config = Config::load(&config_path)?;
    debug!("Configuration: {:?}", config);

    let passphrase = Passphrase::resolve(config.prompt_for_passphrase)?;

    let runner: Rc<dyn CommandRunner> = Rc::new(SystemRunner);
    let dest = config.to_destination();
    let remote = RemoteShell::new(config.tools.ssh.as_str(), &dest, runner.clone());
    if let Some((parent, name)) = dest.root_components() {
        if !remote.ensure(&parent, &name)? {
            info!("Created backup root {}", dest.root);
        }
    }

    let engine = Duplicity::new(dest, config.include.clone(), remote, runner.clone())
        .with_program(config.tools.duplicity.as_str())
        .with_verbosity(args.verbosity)
        .with_passphrase(passphrase);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Backup { extra_args } => {
            let mode = engine.backup(&extra_args)?;
            writeln!(out, "Completed {} backup", mode)?;
        }
        Command::List => {
            for line in engine.list_files(None)? {
                writeln!(out, "{}", line?)?;
            }
        }
        Command::Restore { file, time, target } => {
            engine.restore(&target, file.as_deref(), time.as_deref())?;
        }
        Command::Verify => {
            engine.verify()?;
            writeln!(out, "Verify complete: backup matches local files")?;
        }
        Command::Status => {
            for line in engine.collection_status()? {
                writeln!(out, "{}", line?)?;
            }
        }
        Command::Gitrestore {
            file_to_restore,
            git_directory,
            target,
        } => {
            let git_directory = absolute(git_directory)?;
            let repo = GitRepo::new(config.tools.git.as_str(), git_directory, runner);
            let report = restore_history(&engine, &repo, &file_to_restore, &target)?;
            writeln!(
                out,
                "Recorded {} versions from {} snapshots ({} contained {})",
                report.commits, report.examined, report.present, file_to_restore
            )?;
        }
    }
    Ok(())
}

fn absolute(path: PathBuf) -> AppResult<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
