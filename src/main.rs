use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use iqe::{Expectation, InferenceClient, Target};
use iqe_core::config::Config;
use iqe_core::status::netloc;
use iqe_core::{Catalog, Protocol, Scheme, ServingStatus};
use iqe_transport::Transport;

#[derive(Parser)]
#[command(name = "iqe", about = "Inference Query Engine: query and verify model-serving endpoints")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ~/.config/iqe/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List runtimes, inference types and protocols in the catalog.
    Catalog {
        /// Only show this runtime.
        #[arg(long)]
        runtime: Option<String>,
    },
    /// Print the rendered request without sending it.
    Render(RequestArgs),
    /// Send a query, print the parsed response and optionally verify it.
    Query(QueryArgs),
}

#[derive(Args)]
struct RequestArgs {
    #[arg(long)]
    runtime: String,

    #[arg(long)]
    inference_type: String,

    /// http, https or grpc.
    #[arg(long)]
    protocol: Protocol,

    #[arg(long)]
    model: String,

    #[command(flatten)]
    target: TargetArgs,

    /// Query text.
    #[arg(long, conflicts_with = "default_query")]
    text: Option<String>,

    /// Use the runtime's default query (and its expected output).
    #[arg(long)]
    default_query: bool,

    /// Bearer token.
    #[arg(long)]
    token: Option<String>,

    /// Skip TLS certificate verification.
    #[arg(long)]
    insecure: bool,

    /// Use http:// instead of https:// for HTTP targets.
    #[arg(long)]
    plain_http: bool,

    /// Override the target port.
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TargetArgs {
    /// Service URL or host[:port].
    #[arg(long)]
    url: Option<String>,

    /// InferenceService JSON (`oc get isvc <name> -o json`).
    #[arg(long)]
    status_file: Option<PathBuf>,
}

#[derive(Args)]
struct QueryArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Expected response text.
    #[arg(long, conflicts_with = "unauthorized")]
    expect: Option<String>,

    /// Expect the request to be denied by the auth proxy.
    #[arg(long)]
    unauthorized: bool,

    /// Run the query this many times, verifying each result.
    #[arg(long, default_value_t = 1)]
    iterations: usize,

    /// Run the iterations concurrently.
    #[arg(long)]
    parallel: bool,

    /// Per-request timeout in seconds (overrides the config file).
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if cli.debug { "debug" } else { "warn" })
            }),
        )
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;
    let catalog = config.catalog().context("failed to load catalog")?;

    match cli.command {
        Command::Catalog { runtime } => print_catalog(&catalog, runtime.as_deref()),
        Command::Render(args) => render(&config, &catalog, &args),
        Command::Query(args) => query(&config, &catalog, args).await,
    }
}

fn print_catalog(catalog: &Catalog, only: Option<&str>) -> anyhow::Result<()> {
    if let Some(runtime) = only {
        catalog.runtime(runtime)?;
    }
    for (name, formats) in catalog.runtimes() {
        if only.is_some_and(|r| r != name) {
            continue;
        }
        println!("{name}");
        if !formats.containers.is_empty() {
            println!("  containers: {}", formats.containers.join(", "));
        }
        if let Some(query) = &formats.default_query {
            println!("  default query: {:?} -> {:?}", query.query_text, query.query_output);
        }
        for (inference_type, protocols) in &formats.inference_types {
            let protocols: Vec<_> = protocols.keys().map(Protocol::as_str).collect();
            println!("  {inference_type}: {}", protocols.join(", "));
        }
    }
    Ok(())
}

fn client(
    config: &Config,
    catalog: &Catalog,
    args: &RequestArgs,
    transport: Arc<dyn Transport>,
) -> anyhow::Result<InferenceClient> {
    let host = match (&args.target.url, &args.target.status_file) {
        (Some(url), _) => netloc(url).unwrap_or_else(|| url.clone()),
        (None, Some(path)) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Target::from_status(&ServingStatus::from_json(&json)?)?.host
        }
        (None, None) => bail!("one of --url or --status-file is required"),
    };

    let scheme = if args.plain_http { Scheme::Http } else { Scheme::Https };
    let target = Target::new(host).with_port(args.port).with_scheme(scheme);

    Ok(InferenceClient::new(
        catalog,
        &args.runtime,
        &args.inference_type,
        args.protocol,
        target,
        transport,
    )?
    .with_config(config))
}

fn query_text<'a>(client: &'a InferenceClient, args: &'a RequestArgs) -> anyhow::Result<&'a str> {
    if args.default_query {
        let query = client
            .default_query()
            .with_context(|| format!("{} has no default query", args.runtime))?;
        return Ok(&query.query_text);
    }
    args.text
        .as_deref()
        .context("either --text or --default-query is required")
}

fn render(config: &Config, catalog: &Catalog, args: &RequestArgs) -> anyhow::Result<()> {
    let transport = iqe_transport::from_config(&config.transport)?;
    let client = client(config, catalog, args, transport.clone())?;
    let rendered = client.render_request(
        &args.model,
        query_text(&client, args)?,
        args.token.as_deref(),
        args.insecure,
    );

    println!("endpoint: {}", rendered.endpoint);
    println!("target:   {}", rendered.full_target());
    println!("header:   {}", rendered.header);
    println!("body:     {}", rendered.body);
    println!("command:  {}", transport.describe(&rendered));
    Ok(())
}

async fn query(config: &Config, catalog: &Catalog, args: QueryArgs) -> anyhow::Result<()> {
    let transport = iqe_transport::from_config(&config.transport)?;
    let mut client = client(config, catalog, &args.request, transport)?;
    if let Some(secs) = args.timeout {
        client = client.with_timeout(Duration::from_secs(secs));
    }

    let request = &args.request;
    let token = request.token.as_deref();
    let text = query_text(&client, request)?;

    let expectation = if args.unauthorized {
        Some(Expectation::Denied)
    } else if let Some(text) = &args.expect {
        Some(Expectation::text(text))
    } else if request.default_query {
        Some(client.default_expectation(&request.model)?)
    } else {
        None
    };

    if args.iterations > 1 || args.parallel {
        let expected = expectation
            .context("repeated runs need --expect, --unauthorized or --default-query")?;
        let results = client
            .run_verified_multiple_times(
                &request.model,
                text,
                &expected,
                token,
                request.insecure,
                args.iterations,
                args.parallel,
            )
            .await
            .context("repeated inference failed")?;
        println!("{} inference requests verified", results.len());
        return Ok(());
    }

    let result = client
        .run_inference(&request.model, text, token, request.insecure)
        .await?;

    println!("{}", serde_json::to_string_pretty(&result.parsed)?);

    if let Some(expected) = expectation {
        client
            .verify(&result, &expected, token)
            .context("verification failed")?;
        eprintln!("verified");
    }
    Ok(())
}
