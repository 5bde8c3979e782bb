use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::info;

use measles_forecast::{
    config::{RunConfig, load as load_config},
    fetch::fetch,
    filter::FilterConfig,
    run,
};

#[derive(Parser)]
#[command(version, about = "Measles incidence forecasting with a feed-forward network")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download a dataset file
    Fetch {
        #[arg(long)]
        url: String,
        #[arg(long, value_name = "PATH")]
        output: PathBuf,
    },
    /// Keep the most populous cities and drop the non feature columns
    Filter {
        /// Tables sharing the same columns, concatenated in order
        #[arg(long = "input", value_name = "PATH", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        /// Written as gzip compressed CSV
        #[arg(long, value_name = "PATH")]
        output: PathBuf,
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Prepare the data, train the network and write its predictions
    Train {
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        /// Overrides the data path of the config
        #[arg(long, value_name = "PATH")]
        data: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    match args.command {
        Command::Fetch { url, output } => {
            fetch(&url, &output).await?;
        }
        Command::Filter {
            inputs,
            output,
            config,
        } => {
            let config: FilterConfig = match config {
                Some(path) => load_config(&path)
                    .with_context(|| format!("cannot load {}", path.display()))?,
                None => FilterConfig::default(),
            };

            run::filter(&inputs, &output, &config)?;
        }
        Command::Train { config, data } => {
            let config: RunConfig = match config {
                Some(path) => load_config(&path)
                    .with_context(|| format!("cannot load {}", path.display()))?,
                None => RunConfig::default(),
            };

            let Some(data) = data.or_else(|| config.data.path.clone()) else {
                bail!("no data file given, pass --data or set data.path in the config");
            };

            let summary = run::train(&config, &data)?;
            run::write_outputs(&summary, &config.output)?;
            info!(
                "done after {} epochs: train mse {:.4}, test mse {:.4}",
                summary.history.len(),
                summary.train_mse,
                summary.test_mse
            );
        }
    }

    Ok(())
}
