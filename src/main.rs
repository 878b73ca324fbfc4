use anyhow::Result;
use apigee_edge::commands::{self, BodySource, Config, Connection, virtual_host};
use apigee_edge::runtime::RealRuntime;
use clap::Parser;
use reqwest::Method;
use std::path::PathBuf;
use std::time::Duration;

/// apigee-edge - Apigee Edge management API client
///
/// Paths are relative to the organization, e.g. `apis` or
/// `environments/test/VirtualHosts/default`.
///
/// Without a token or password, credentials are read from the `.netrc`
/// entry of the management host.
///
/// Examples:
///   apigee-edge --org acme get apis
///   apigee-edge --org acme virtual-host get test default
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(clap::Args, Debug)]
struct ConnectionArgs {
    /// Management API base URL (defaults to https://api.enterprise.apigee.com/)
    #[arg(long = "mgmt-url", env = "EDGE_MGMT_URL", value_name = "URL", global = true)]
    mgmt_url: Option<String>,

    /// Organization to operate on
    #[arg(long, short = 'o', env = "EDGE_ORG", value_name = "ORG", global = true, default_value = "")]
    org: String,

    /// OAuth access token
    #[arg(long, env = "EDGE_TOKEN", value_name = "TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[arg(long, short = 'u', env = "EDGE_USERNAME", global = true)]
    username: Option<String>,

    #[arg(long, short = 'p', env = "EDGE_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    /// Credential store to use instead of ~/.netrc
    #[arg(long, env = "EDGE_NETRC", value_name = "PATH", global = true)]
    netrc: Option<PathBuf>,

    /// Total attempts per request when the connection fails
    #[arg(long, value_name = "N", global = true)]
    retries: Option<usize>,

    /// Per-attempt timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Dump every request and response (credentials included)
    #[arg(long, short = 'd', global = true)]
    debug: bool,
}

impl From<ConnectionArgs> for Connection {
    fn from(args: ConnectionArgs) -> Self {
        Connection {
            mgmt_url: args.mgmt_url,
            org: args.org,
            token: args.token,
            username: args.username,
            password: args.password,
            netrc: args.netrc,
            debug: args.debug,
            retries: args.retries,
            timeout: args.timeout.map(Duration::from_secs),
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// GET a resource and print it
    Get(GetArgs),

    /// DELETE a resource
    Delete(PathArgs),

    /// POST a body to a resource
    Post(SendArgs),

    /// PUT a body to a resource
    Put(SendArgs),

    /// Manage virtual hosts
    #[command(subcommand)]
    VirtualHost(VirtualHostCommands),
}

#[derive(clap::Args, Debug)]
struct PathArgs {
    /// Resource path relative to the organization
    #[arg(value_name = "PATH")]
    path: String,
}

#[derive(clap::Args, Debug)]
struct GetArgs {
    #[arg(value_name = "PATH")]
    path: String,

    /// Ask for expanded entities
    #[arg(long)]
    expand: bool,

    /// Save the raw response body to a file
    #[arg(long, short = 'O', value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct SendArgs {
    #[arg(value_name = "PATH")]
    path: String,

    /// JSON document to send
    #[arg(long, value_name = "FILE", conflicts_with = "raw")]
    data: Option<PathBuf>,

    /// File to send unmodified
    #[arg(long, value_name = "FILE")]
    raw: Option<PathBuf>,

    /// Content type to send instead of the default one
    #[arg(long = "content-type", value_name = "TYPE")]
    content_type: Option<String>,
}

impl SendArgs {
    fn source(&self) -> BodySource {
        match (&self.data, &self.raw) {
            (Some(path), _) => BodySource::Json(path.clone()),
            (None, Some(path)) => BodySource::Raw(path.clone()),
            (None, None) => BodySource::Empty,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum VirtualHostCommands {
    /// List virtual host names of an environment
    List {
        #[arg(value_name = "ENV")]
        env: String,
    },

    /// Show one virtual host
    Get {
        #[arg(value_name = "ENV")]
        env: String,
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Delete one virtual host
    Delete {
        #[arg(value_name = "ENV")]
        env: String,
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.connection.debug {
        "apigee_edge=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let connection = Connection::from(cli.connection);
    let config = Config::new(RealRuntime, &connection)?;
    let mut stdout = std::io::stdout();
    let out = &mut stdout;

    match cli.command {
        Commands::Get(args) => {
            commands::get(&config, &args.path, args.expand, args.output.as_deref(), out).await?
        }
        Commands::Delete(args) => commands::delete(&config, &args.path, out).await?,
        Commands::Post(args) => send(&config, Method::POST, &args, out).await?,
        Commands::Put(args) => send(&config, Method::PUT, &args, out).await?,
        Commands::VirtualHost(command) => match command {
            VirtualHostCommands::List { env } => virtual_host::list(&config, &env, out).await?,
            VirtualHostCommands::Get { env, name } => {
                virtual_host::get(&config, &env, &name, out).await?
            }
            VirtualHostCommands::Delete { env, name } => {
                virtual_host::delete(&config, &env, &name, out).await?
            }
        },
    }
    Ok(())
}

async fn send(
    config: &Config<RealRuntime>,
    method: Method,
    args: &SendArgs,
    out: &mut std::io::Stdout,
) -> Result<()> {
    commands::send(
        config,
        method,
        &args.path,
        &args.source(),
        args.content_type.as_deref(),
        out,
    )
    .await
}
