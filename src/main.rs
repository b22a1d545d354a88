use clap::Parser;
use form_preview::cli::commands::{cmd_forms, cmd_import, cmd_preview, cmd_show};
use form_preview::cli::config::{Cli, Commands, load_config, log_filter, resolve_settings};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose))))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Resolve settings: CLI > config > defaults
    let config = load_config(cli.config.as_deref());
    let settings = resolve_settings(&cli, &config);

    match cli.command {
        Commands::Forms => cmd_forms(&settings)?,
        Commands::Show { form } => cmd_show(&settings, &form)?,
        Commands::Import { file, name } => {
            cmd_import(&settings, &file, name.as_deref(), cli.verbose)?;
        }
        Commands::Preview {
            form,
            set,
            check,
            submit,
        } => {
            let accepted = cmd_preview(&settings, &form, &set, &check, submit)?;
            if !accepted {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
