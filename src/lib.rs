/*!
# doublewrap

doublewrap drives duplicity to keep encrypted, incremental backups of local
directories on a remote host reached over ssh, and rebuilds the version
history of a single backed-up path as a git repository.

## Core Features

- Full backup on an empty backup root, incremental ones afterwards
- Restore of the whole tree or one path, at the latest or a past time
- Verification of the backup against the local files
- Listing of backed-up files and of the snapshot chain
- Replay of every snapshot holding a path into git, one commit per version

## Architecture

- `process`: Runs external programs and streams their output
- `remote`: Lists and creates directories on the backup host
- `engine`: Builds duplicity invocations and parses its collection status
- `vcs`: The git working tree receiving reconstructed history
- `ops`: Multi-step workflows such as history reconstruction
- `config`, `passphrase`, `cli`: Settings, secret input and argument parsing
- `errors`: Error handling infrastructure

## Usage Example

```rust,no_run
use doublewrap::engine::Duplicity;
use doublewrap::process::{CommandRunner, SystemRunner};
use doublewrap::remote::RemoteShell;
use doublewrap::{Config, Passphrase};
use std::rc::Rc;

fn main() -> doublewrap::AppResult<()> {
    let config = Config::load(&Config::resolve_path(None)?)?;
    let runner: Rc<dyn CommandRunner> = Rc::new(SystemRunner);
    let dest = config.to_destination();
    let remote = RemoteShell::new("ssh", &dest, runner.clone());

    let engine = Duplicity::new(dest, config.include.clone(), remote, runner)
        .with_passphrase(Passphrase::resolve(config.prompt_for_passphrase)?);

    for time in engine.chain_timestamps()? {
        println!("{}", time);
    }
    Ok(())
}
```
*/

/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Configuration loading and management
pub mod config;
/// Application-wide constants
pub mod constants;
/// Backup engine invocations and collection-status parsing
pub mod engine;
/// Error types and utilities for error handling
pub mod errors;
/// Multi-step operations
pub mod ops;
/// Encryption passphrase handling
pub mod passphrase;
/// External process execution
pub mod process;
/// Remote directory queries
pub mod remote;
/// Git repository wrapper
pub mod vcs;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use passphrase::Passphrase;
