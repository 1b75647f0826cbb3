mod cli;
mod paths;
mod run;
mod state;

use anyhow::Result;
use cli::{Command, ConfigAction};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        None | Some(Command::Window) => run::run_window(&cli.run),
        Some(Command::Snapshot) => {
            let path = run::run_snapshot(&cli.run)?;
            println!("{}", path.display());
            Ok(())
        }
        Some(Command::Config(config)) => match config.action {
            ConfigAction::Export => {
                let path = run::run_config_export(&cli.run)?;
                println!("{}", path.display());
                Ok(())
            }
            ConfigAction::Check { file } => {
                println!("{}", run::run_config_check(&file)?);
                Ok(())
            }
        },
    }
}
