use anyhow::Result;
use clap::{Parser, Subcommand};
use manifestctl::{
	commands::{self, util::{BrokenPipeGuard, ConnectionArgs}},
	telemetry,
};

#[cfg(all(
	target_os = "linux",
	feature = "mimalloc",
	not(feature = "system-alloc")
))]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

#[derive(Parser)]
#[command(name = "manifestctl")]
#[command(about = "Create, list and delete Kubernetes resources from YAML manifests", long_about = None)]
#[command(version = env!("MANIFESTCTL_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[command(flatten)]
	connection: ConnectionArgs,

	/// Log level: trace, debug, info, warn or error. Falls back to RUST_LOG
	#[arg(long, global = true)]
	log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// Create the object described by a manifest file
	Create(commands::create::CreateArgs),

	/// List objects of one kind
	List(commands::list::ListArgs),

	/// Delete an object by kind and name
	Delete(commands::delete::DeleteArgs),

	/// Decode a manifest locally and print the typed object
	Show(commands::show::ShowArgs),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	let _telemetry = telemetry::init(cli.log_level.as_deref().and_then(telemetry::parse_level))?;

	let stdout = BrokenPipeGuard::new(std::io::stdout());

	match cli.command {
		Commands::Create(args) => commands::create::run(args, &cli.connection, stdout),
		Commands::List(args) => commands::list::run(args, &cli.connection, stdout),
		Commands::Delete(args) => commands::delete::run(args, &cli.connection, stdout),
		Commands::Show(args) => commands::show::run(args, stdout),
	}
}
