use std::fmt;
use std::sync::Arc;

use logchef_core::{ClientConfig, LogchefClient};
use reqwest::header::HeaderMap;

use crate::ToolError;
use crate::config::{
    ConfigError, Credentials, DEFAULT_URL, EnvSnapshot, credentials_from_env,
    credentials_from_headers,
};

/// Everything a tool invocation needs to know about who it is acting for.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    debug: bool,
    credentials: Option<Credentials>,
    client: Option<Arc<LogchefClient>>,
}

impl SessionContext {
    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn client(&self) -> Result<&LogchefClient, ToolError> {
        self.client.as_deref().ok_or_else(|| {
            ToolError::new("client_missing", "Logchef client not found in context")
                .with_docs_hint("The transport did not attach a client for this request.")
        })
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_client(mut self, client: LogchefClient) -> Self {
        self.client = Some(Arc::new(client));
        self
    }
}

pub type ContextStep<I> =
    Box<dyn Fn(SessionContext, &I) -> Result<SessionContext, ConfigError> + Send + Sync>;

/// Ordered context decorators. Each step sees the previous step's output and
/// the same inbound input `I` (unit for stdio, request headers for HTTP).
pub struct ContextPipeline<I> {
    steps: Vec<ContextStep<I>>,
}

impl<I> Default for ContextPipeline<I> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<I> fmt::Debug for ContextPipeline<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPipeline")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl<I> ContextPipeline<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step<F>(mut self, step: F) -> Self
    where
        F: Fn(SessionContext, &I) -> Result<SessionContext, ConfigError> + Send + Sync + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the steps left to right from an empty context.
    pub fn run(&self, input: &I) -> Result<SessionContext, ConfigError> {
        self.steps
            .iter()
            .try_fold(SessionContext::default(), |ctx, step| step(ctx, input))
    }
}

pub fn attach_debug<I: 'static>(
    debug: bool,
) -> impl Fn(SessionContext, &I) -> Result<SessionContext, ConfigError> + Send + Sync + 'static {
    move |ctx, _| {
        if debug {
            tracing::info!(event = "mcp.context.debug", "debug mode enabled");
        }
        Ok(ctx.with_debug(debug))
    }
}

pub fn env_credentials<I: 'static>(
    env: EnvSnapshot,
) -> impl Fn(SessionContext, &I) -> Result<SessionContext, ConfigError> + Send + Sync + 'static {
    move |ctx, _| Ok(ctx.with_credentials(credentials_from_env(&env)?))
}

pub fn header_credentials(
    env: EnvSnapshot,
) -> impl Fn(SessionContext, &HeaderMap) -> Result<SessionContext, ConfigError> + Send + Sync + 'static
{
    move |ctx, headers| Ok(ctx.with_credentials(credentials_from_headers(headers, &env)?))
}

/// Builds the client from whatever credentials earlier steps attached,
/// or the default URL with no key when none were.
pub fn attach_client<I: 'static>()
-> impl Fn(SessionContext, &I) -> Result<SessionContext, ConfigError> + Send + Sync + 'static {
    |ctx, _| {
        let (base_url, api_key) = match ctx.credentials() {
            Some(creds) => (creds.base_url.clone(), creds.api_key.clone()),
            None => (DEFAULT_URL.to_string(), String::new()),
        };
        let client = LogchefClient::new(ClientConfig::new(base_url, api_key))?;
        Ok(ctx.with_client(client))
    }
}

pub fn stdio_pipeline(debug: bool, env: EnvSnapshot) -> ContextPipeline<()> {
    ContextPipeline::new()
        .step(attach_debug(debug))
        .step(env_credentials(env))
        .step(attach_client())
}

pub fn sse_pipeline(debug: bool, env: EnvSnapshot) -> ContextPipeline<HeaderMap> {
    ContextPipeline::new()
        .step(attach_debug(debug))
        .step(header_credentials(env))
        .step(attach_client())
}

pub fn http_pipeline(debug: bool, env: EnvSnapshot) -> ContextPipeline<HeaderMap> {
    ContextPipeline::new()
        .step(attach_debug(debug))
        .step(header_credentials(env))
        .step(attach_client())
}
