use axum::Router;
use clap::{Parser, ValueEnum};
use logchef_mcp_runtime::categories::DEFAULT_ENABLED_TOOLS;
use logchef_mcp_runtime::context::{http_pipeline, sse_pipeline, stdio_pipeline};
use logchef_mcp_runtime::{
    EnvSnapshot, McpServer, ToolCategory, ToolCategoryEnablement, stdio, to_pretty_json,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod http;
mod sse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Sse,
    StreamableHttp,
}

#[derive(Debug, Parser)]
#[command(
    name = "logchef-mcp",
    version,
    about = "MCP server exposing the Logchef log analytics API as tools"
)]
struct Cli {
    /// Transport to serve MCP over
    #[arg(short = 't', long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// Host and port the SSE or streamable HTTP server listens on
    #[arg(long, default_value = "localhost:8000")]
    address: String,

    /// Path prefix for the SSE endpoints
    #[arg(long, default_value = "")]
    base_path: String,

    /// Path of the streamable HTTP endpoint
    #[arg(long, default_value = "/mcp")]
    endpoint_path: String,

    /// Log level: debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Enable debug mode for the Logchef transport
    #[arg(long)]
    debug: bool,

    /// A comma separated list of tools enabled for this server. Can be
    /// overwritten entirely or by disabling specific components, e.g.
    /// --disable-profile.
    #[arg(long, default_value = DEFAULT_ENABLED_TOOLS)]
    enabled_tools: String,

    /// Disable profile tools
    #[arg(long)]
    disable_profile: bool,

    /// Disable source tools
    #[arg(long)]
    disable_sources: bool,

    /// Disable log query tools
    #[arg(long)]
    disable_logs: bool,

    /// Disable admin tools
    #[arg(long)]
    disable_admin: bool,
}

impl Cli {
    fn enablement(&self) -> ToolCategoryEnablement {
        let disabled = [
            (self.disable_profile, ToolCategory::Profile),
            (self.disable_sources, ToolCategory::Sources),
            (self.disable_logs, ToolCategory::Logs),
            (self.disable_admin, ToolCategory::Admin),
        ]
        .into_iter()
        .filter_map(|(off, category)| off.then_some(category));
        ToolCategoryEnablement::new(&self.enabled_tools, disabled)
    }
}

/// Maps `--log-level` to a filter directive; unknown levels mean info.
fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&cli.log_level)));
    let registry = tracing_subscriber::registry().with(filter);
    // stdout is reserved for the stdio transport.
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn fatal(code: &str, message: impl std::fmt::Display) -> ! {
    let payload = json!({
        "error": code,
        "message": message.to_string(),
    });
    eprintln!("{}", to_pretty_json(&payload));
    std::process::exit(1);
}

fn with_http_layers(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
}

async fn serve_http(address: &str, app: Router, transport: &str) {
    let listener = match tokio::net::TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(e) => fatal("bind_failed", format!("bind {address}: {e}")),
    };
    tracing::info!(
        event = "mcp.server.listening",
        transport,
        address,
        "logchef-mcp listening"
    );
    if let Err(e) = axum::serve(listener, app).await {
        fatal("server_failed", e);
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli);

    let server = McpServer::new(&cli.enablement());
    let env = EnvSnapshot::from_process();

    match cli.transport {
        Transport::Stdio => {
            let ctx = match stdio_pipeline(cli.debug, env).run(&()) {
                Ok(ctx) => ctx,
                Err(err) => fatal(err.code(), err),
            };
            if let Err(e) = stdio::serve_stdio(server, ctx).await {
                fatal("stdio_failed", e);
            }
        }
        Transport::Sse => {
            let app = sse::router(server, sse_pipeline(cli.debug, env), &cli.base_path);
            serve_http(&cli.address, with_http_layers(app), "sse").await;
        }
        Transport::StreamableHttp => {
            let app = http::router(server, http_pipeline(cli.debug, env), &cli.endpoint_path);
            serve_http(&cli.address, with_http_layers(app), "streamable-http").await;
        }
    }
}
