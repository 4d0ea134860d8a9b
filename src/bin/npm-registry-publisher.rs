//! npm-registry-publisher CLI
//!
//! Packs a directory and publishes it to an npm registry

use anyhow::Result;
use clap::{Parser, Subcommand};
use npm_registry_publisher::{
    CONFIG_FILENAME, ConfigLoadOptions, ConfigLoader, HttpRegistryClient, NpmAccess,
    PackageSourceConfig, PublishBehaviorConfig, PublishConfig, PublishError, PublishReport,
    Publisher, RegistryConfig, ResponsePolicy, pack_to_directory,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Pack a directory and publish it to an npm registry
#[derive(Parser)]
#[command(name = "npm-registry-publisher")]
#[command(version)]
#[command(about = "Pack a directory and publish it to an npm registry", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a package to the registry
    Publish {
        /// Directory to pack, also searched for .npm-publish.yaml (defaults to current directory)
        #[arg(value_name = "SOURCE_DIR")]
        project_path: Option<PathBuf>,

        /// Config file (defaults to SOURCE_DIR/.npm-publish.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Metadata descriptor (defaults to SOURCE_DIR/package.json)
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Registry URL
        #[arg(short, long)]
        registry: Option<String>,

        /// Auth token (prefer NPM_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Publish with dist-tag
        #[arg(long)]
        tag: Option<String>,

        /// Access level (public|restricted)
        #[arg(long)]
        access: Option<NpmAccess>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Pack and build the request without sending it
        #[arg(long)]
        dry_run: bool,

        /// Treat registry rejections and network failures as errors
        #[arg(long)]
        strict: bool,
    },

    /// Write the package tarball to disk
    Pack {
        /// Directory to pack (defaults to current directory)
        #[arg(value_name = "SOURCE_DIR")]
        source_dir: Option<PathBuf>,

        /// Metadata descriptor (defaults to SOURCE_DIR/package.json)
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Output directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Initialize npm-registry-publisher configuration
    Init {
        /// Directory to write .npm-publish.yaml into (defaults to current directory)
        #[arg(value_name = "DIR")]
        project_path: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

const CONFIG_TEMPLATE: &str = r#"version: "1.0"

registry:
  # e.g. https://gitlab.com/api/v4/projects/<id>/packages/npm/
  url: https://registry.example.com/
  token: ${NPM_TOKEN}
  tag: latest
  # access: public
  # timeoutSecs: 60

package:
  sourceDir: .
  # metadata: ./package.json

publish:
  dryRun: false
  # lenient: report success once the request completes
  # strict: fail on registry rejections
  responsePolicy: lenient

security:
  envVarExpansion:
    enabled: true
    allowedPrefixes: [NPM_]
"#;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("npm_registry_publisher=debug,info")
    } else {
        EnvFilter::new("npm_registry_publisher=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Publish {
            project_path,
            config,
            metadata,
            registry,
            token,
            tag,
            access,
            timeout,
            dry_run,
            strict,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            let cli_config = cli_config(
                registry, token, tag, access, timeout, metadata, dry_run, strict,
            );
            publish_command(path, config, cli_config).await
        }
        Commands::Pack {
            source_dir,
            metadata,
            out_dir,
        } => {
            let source_dir = source_dir.unwrap_or_else(|| PathBuf::from("."));
            pack_command(source_dir, metadata, out_dir).await
        }
        Commands::Init {
            project_path,
            force,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            init_command(path, force).await
        }
    }
}

/// Turn CLI flags into the highest-priority config layer
#[allow(clippy::too_many_arguments)]
fn cli_config(
    registry: Option<String>,
    token: Option<String>,
    tag: Option<String>,
    access: Option<NpmAccess>,
    timeout: Option<u64>,
    metadata: Option<PathBuf>,
    dry_run: bool,
    strict: bool,
) -> PublishConfig {
    let registry_config = RegistryConfig {
        url: registry,
        token,
        tag,
        access,
        timeout_secs: timeout,
    };
    let package_config = PackageSourceConfig {
        source_dir: None,
        metadata,
    };
    let publish_config = PublishBehaviorConfig {
        dry_run: dry_run.then_some(true),
        response_policy: strict.then_some(ResponsePolicy::Strict),
    };

    PublishConfig {
        registry: (registry_config != RegistryConfig::default()).then_some(registry_config),
        package: (package_config != PackageSourceConfig::default()).then_some(package_config),
        publish: (publish_config != PublishBehaviorConfig::default()).then_some(publish_config),
        ..Default::default()
    }
}

async fn publish_command(
    project_path: PathBuf,
    config_file: Option<PathBuf>,
    cli_config: PublishConfig,
) -> Result<i32> {
    let mut options = ConfigLoadOptions::from_env(&project_path);
    options.config_file = config_file;
    options.cli_args = Some(cli_config);

    let settings = match ConfigLoader::load(options)
        .await
        .and_then(|config| ConfigLoader::resolve(config, &project_path))
    {
        Ok(settings) => settings,
        Err(e) => return Ok(report_error(&e)),
    };

    let client = HttpRegistryClient::new(settings.timeout)?;
    let publisher = Publisher::new(Box::new(client), settings);

    match publisher.publish().await {
        Ok(report) => {
            print_report(&report);
            Ok(0)
        }
        Err(e) => Ok(report_error(&e)),
    }
}

fn print_report(report: &PublishReport) {
    if report.dry_run {
        println!(
            "\n🔍 Dry run: {}@{} → {} (tag: {})",
            report.package_name, report.version, report.registry, report.tag
        );
        println!(
            "   {} files, {} bytes packed ({} bytes unpacked)",
            report.tarball.entry_count, report.tarball.size, report.tarball.unpacked_size
        );
        for entry in &report.tarball.entries {
            println!("   - {}", entry);
        }
        println!("   shasum: {}", report.tarball.shasum);
        println!("   integrity: {}", report.tarball.integrity);
        return;
    }

    for warning in &report.warnings {
        eprintln!("⚠️  {}", warning);
    }

    if let Some(confirmation) = &report.confirmation {
        println!("{}", confirmation);
    }
}

fn report_error(error: &PublishError) -> i32 {
    eprintln!("\n❌ [{}] {}", error.code(), error);
    for action in error.suggested_actions() {
        eprintln!("  💡 {}", action);
    }
    1
}

async fn pack_command(
    source_dir: PathBuf,
    metadata: Option<PathBuf>,
    out_dir: PathBuf,
) -> Result<i32> {
    let metadata_path = metadata.unwrap_or_else(|| source_dir.join("package.json"));

    match pack_to_directory(&metadata_path, &source_dir, &out_dir).await {
        Ok(output) => {
            println!("📦 {}@{}", output.package_name, output.version);
            for entry in &output.tarball.entries {
                println!("   {}", entry);
            }
            println!("{}", output.archive_path.display());
            Ok(0)
        }
        Err(e) => Ok(report_error(&e)),
    }
}

async fn init_command(project_path: PathBuf, force: bool) -> Result<i32> {
    let config_path = project_path.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        eprintln!(
            "⚠️  {} already exists (use --force to overwrite)",
            config_path.display()
        );
        return Ok(1);
    }

    tokio::fs::write(&config_path, CONFIG_TEMPLATE).await?;
    println!("✅ Created {}", config_path.display());
    Ok(0)
}
