use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use crate::config::{AzureDevOpsConfig, Config};
use crate::output;
use crate::providers::AzureDevOpsProvider;
use crate::report::LeadTimeReport;

#[derive(Parser)]
#[command(name = "ado-leadtime")]
#[command(author, version, about = "Lead Time to Production for Azure DevOps releases", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./leadtime.toml or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Suppress the banner, progress and summary
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure lead time to production for a release definition
    Collect(CollectArgs),

    /// Write a default configuration file
    InitConfig { path: PathBuf },
}

#[derive(Args, Default)]
struct CollectArgs {
    /// Organisation URL, e.g. https://dev.azure.com/contoso
    #[arg(long)]
    org_url: Option<String>,

    /// Release management URL, derived from the organisation URL when omitted
    #[arg(long)]
    release_url: Option<String>,

    #[arg(long, env = "AZURE_DEVOPS_PAT", hide_env_values = true)]
    token: Option<String>,

    #[arg(short = 'P', long)]
    project: Option<String>,

    /// Release definition name
    #[arg(short, long)]
    definition: Option<String>,

    /// Only measure deployments to this environment
    #[arg(short, long)]
    environment: Option<String>,

    /// Number of most recent releases to inspect
    #[arg(short = 'l', long)]
    top: Option<usize>,

    #[arg(long)]
    concurrency: Option<usize>,

    /// Report commit-to-production for artifacts no pull request merged
    #[arg(long, default_value_t = false)]
    include_unmerged: bool,
}

impl CollectArgs {
    fn apply(&self, config: &mut AzureDevOpsConfig) {
        fn set(target: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        set(&mut config.organization_url, &self.org_url);
        set(&mut config.release_url, &self.release_url);
        set(&mut config.token, &self.token);
        set(&mut config.project, &self.project);
        set(&mut config.release_definition, &self.definition);
        set(&mut config.environment, &self.environment);

        if let Some(top) = self.top {
            config.top = top;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        config.include_unmerged |= self.include_unmerged;
    }
}

impl Cli {
    /// Loads the configuration file and folds command line flags over it.
    pub fn load_config(&self) -> Result<Config> {
        if let Commands::InitConfig { .. } = self.command {
            return Ok(Config::default());
        }

        let mut config = Config::load(self.config.as_deref())?;
        if let Commands::Collect(args) = &self.command {
            args.apply(&mut config.azure_devops);
        }
        if let Some(level) = &self.log_level {
            config.output.log_level.clone_from(level);
        }
        config.output.pretty |= self.pretty;
        Ok(config)
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    async fn execute_collect(&self, config: &Config) -> Result<()> {
        let provider = AzureDevOpsProvider::new(&config.azure_devops, !self.quiet)?;

        let report = provider.collect_lead_times().await?;

        self.write_report(&report, config.output.pretty)?;

        if !self.quiet {
            output::print_summary(&report);
        }

        Ok(())
    }

    fn write_report(&self, report: &LeadTimeReport, pretty: bool) -> Result<()> {
        let json_output = if pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output).with_context(|| {
                format!("Failed to write report: {}", output_path.display())
            })?;
            info!("Report written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }

    fn execute_init_config(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Refusing to overwrite existing file: {}", path.display());
        }
        Config::default().save(path)?;
        info!("Configuration written to: {}", path.display());
        Ok(())
    }

    pub async fn execute(&self, config: &Config) -> Result<()> {
        match &self.command {
            Commands::Collect(_) => self.execute_collect(config).await,
            Commands::InitConfig { path } => Self::execute_init_config(path),
        }
    }
}
