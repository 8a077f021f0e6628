//!  Ferdir Trip Search
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Unified MCP Server Entry Point
//!
//! Supports stdio and HTTP transports via subcommand.

use anyhow::{Context, Error, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ferdir_trip_search::{
    AgencyOrder, ClientConfig, DateFormatConfig, DateLocale, OrderBy, SearchKind, SearchOptions,
    SearchSession, SpecificDates, TripsApiClient, TripsFilter, start_of_month,
};
use rmcp::handler::server::{ServerHandler, tool::ToolRouter, wrapper::Parameters};
use rmcp::service::serve_server;
use rmcp::tool;
use rmcp::tool_router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on pages a single tool call may load.
const MAX_TOOL_PAGES: u32 = 10;

#[derive(Parser, Debug)]
#[command(name = "ferdir-travel-mcp")]
#[command(
    author,
    version,
    about = "MCP server for package trip and flight search across travel agencies"
)]
struct Args {
    /// Backend API root (defaults to FERDIR_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run MCP server over stdio (for Claude Desktop, etc.)
    Stdio,

    /// Run MCP server over HTTP
    Http {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,

        /// Maximum in-flight HTTP requests
        #[arg(long, default_value = "64")]
        max_connections: usize,
    },
}

#[derive(Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub struct TripsInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adults: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<u32>,
    /// First travel month, YYYY-MM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_month: Option<String>,
    /// Last travel month, YYYY-MM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_month: Option<String>,
    /// Exact departure window, YYYY-MM-DD; both bounds required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nights_from: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nights_to: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stars: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tripadvisor: Option<f64>,
    #[serde(default)]
    pub agencies: Vec<String>,
    #[serde(default)]
    pub places: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// price, stars or tripadvisor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    /// Use a shared filter instead of the fields above
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    /// insertion or descending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_order: Option<String>,
}

#[derive(Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub struct OptionsInput {
    /// is or en
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct FilterCodeInput {
    pub code: String,
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").context(format!("Invalid date: {}. Use YYYY-MM-DD", s))
}

fn parse_month(s: &str) -> Result<NaiveDate> {
    parse_day(&format!("{}-01", s.trim())).context(format!("Invalid month: {}. Use YYYY-MM", s))
}

fn filter_from_input(input: &TripsInput, today: NaiveDate) -> Result<TripsFilter> {
    let defaults = TripsFilter::builder(today).build()?;
    let mut builder = TripsFilter::builder(today)
        .adults(input.adults.unwrap_or(defaults.adults))
        .children(input.children.unwrap_or(defaults.children))
        .nights(
            input.nights_from.unwrap_or(defaults.nights_from),
            input.nights_to.unwrap_or(defaults.nights_to),
        )
        .prices(
            input.min_price.unwrap_or(defaults.price_from),
            input.max_price.unwrap_or(defaults.price_to),
        )
        .min_stars(input.min_stars.unwrap_or(defaults.min_stars))
        .min_tripadvisor(input.min_tripadvisor.unwrap_or(defaults.min_tripadvisor))
        .agencies(input.agencies.clone())
        .places(input.places.clone())
        .search(input.search.clone().unwrap_or_default());

    match (&input.date_from, &input.date_to) {
        (Some(from), Some(to)) => {
            builder = builder
                .date_range(parse_day(from)?, parse_day(to)?)
                .specific_dates(SpecificDates::Exact);
        }
        (None, None) => {
            let from = match &input.from_month {
                Some(m) => parse_month(m)?,
                None => start_of_month(today),
            };
            let to = match &input.to_month {
                Some(m) => parse_month(m)?,
                None => parse_day(&defaults.date_to)?,
            };
            builder = builder.travel_period(from, to);
        }
        _ => anyhow::bail!("date_from and date_to must be given together"),
    }

    if let Some(order) = &input.order_by {
        let order = OrderBy::from_str_name(order).with_context(|| {
            format!("Unknown order_by: {}. Valid: price, stars, tripadvisor", order)
        })?;
        builder = builder.order_by(Some(order));
    }
    builder.build()
}

#[derive(Serialize)]
struct SearchResponse<'a> {
    kind: &'static str,
    pages_loaded: u32,
    has_more: bool,
    count: usize,
    filter: &'a TripsFilter,
    results: &'a [ferdir_trip_search::GroupedTrip],
}

#[derive(Clone)]
pub struct TripSearchServer {
    client: Arc<TripsApiClient>,
    tool_router: ToolRouter<Self>,
}

impl TripSearchServer {
    pub fn new(client: Arc<TripsApiClient>) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    async fn run_search(&self, kind: SearchKind, input: TripsInput) -> Result<String> {
        let today = chrono::Local::now().date_naive();
        let filter = match &input.filter_code {
            Some(code) => self.client.get_filter(code).await?,
            None => filter_from_input(&input, today)?,
        };
        let order = match &input.agency_order {
            Some(o) => AgencyOrder::from_str_name(o)
                .with_context(|| format!("Unknown agency_order: {}. Valid: insertion, descending", o))?,
            None => AgencyOrder::default(),
        };
        let pages = input.pages.unwrap_or(1).clamp(1, MAX_TOOL_PAGES);

        let mut session = SearchSession::new(self.client.as_ref().clone(), kind).agency_order(order);
        session.load_pages(filter, pages).await?;

        let Some(filter) = session.filter() else {
            anyhow::bail!("Search produced no filter");
        };
        let response = SearchResponse {
            kind: kind.endpoint(),
            pages_loaded: session.page(),
            has_more: session.has_more(),
            count: session.results().len(),
            filter,
            results: session.results(),
        };
        Ok(serde_json::to_string(&response)?)
    }
}

#[tool_router]
impl TripSearchServer {
    #[tool(
        name = "search_trips",
        description = "Search package trips (flight + hotel) across Icelandic travel agencies. Offers for the same hotel, price, departure date and nights are grouped with all agencies that sell them. Parameters: adults, children, from_month/to_month (YYYY-MM), date_from/date_to (YYYY-MM-DD, exact window), nights_from, nights_to, min_price, max_price, min_stars (1-5), min_tripadvisor (0-5), agencies (codes), places (destination codes), search (free text), order_by (price/stars/tripadvisor), filter_code, pages (1-10), agency_order (insertion/descending)."
    )]
    async fn search_trips(&self, params: Parameters<TripsInput>) -> Result<String, String> {
        self.run_search(SearchKind::Package, params.0)
            .await
            .map_err(|e| format!("Trip search failed: {e:#}"))
    }

    #[tool(
        name = "search_flights",
        description = "Search flight-only offers. Same parameters as search_trips; agencies, min_stars, min_tripadvisor, search and order_by are ignored by the flights endpoint."
    )]
    async fn search_flights(&self, params: Parameters<TripsInput>) -> Result<String, String> {
        self.run_search(SearchKind::Flight, params.0)
            .await
            .map_err(|e| format!("Flight search failed: {e:#}"))
    }

    #[tool(name = "list_places", description = "List package trip destinations (code, country, name).")]
    async fn list_places(&self) -> Result<String, String> {
        let places = self
            .client
            .get_places()
            .await
            .map_err(|e| format!("Listing places failed: {e:#}"))?;
        serde_json::to_string(&places).map_err(|e| e.to_string())
    }

    #[tool(name = "list_flight_places", description = "List flight-only destinations (code, country, name).")]
    async fn list_flight_places(&self) -> Result<String, String> {
        let places = self
            .client
            .get_flight_places()
            .await
            .map_err(|e| format!("Listing flight places failed: {e:#}"))?;
        serde_json::to_string(&places).map_err(|e| e.to_string())
    }

    #[tool(name = "list_agencies", description = "List travel agencies (code, name, logo).")]
    async fn list_agencies(&self) -> Result<String, String> {
        let agencies = self
            .client
            .get_agencies()
            .await
            .map_err(|e| format!("Listing agencies failed: {e:#}"))?;
        serde_json::to_string(&agencies).map_err(|e| e.to_string())
    }

    #[tool(
        name = "search_options",
        description = "Selectable filter values: travel months, nights, prices, stars and Tripadvisor ratings. Parameters: locale (is/en, default is)."
    )]
    async fn search_options(&self, params: Parameters<OptionsInput>) -> Result<String, String> {
        let locale = match params.0.locale.as_deref() {
            Some(name) => DateLocale::from_str_name(name)
                .ok_or_else(|| format!("Unknown locale: {name}. Valid: is, en"))?,
            None => DateLocale::ICELANDIC,
        };
        let today = chrono::Local::now().date_naive();
        let options = SearchOptions::new(today, &DateFormatConfig::new(locale));
        serde_json::to_string(&options).map_err(|e| e.to_string())
    }

    #[tool(
        name = "create_filter",
        description = "Store a search filter and return its share code. Takes the same parameters as search_trips."
    )]
    async fn create_filter(&self, params: Parameters<TripsInput>) -> Result<String, String> {
        let today = chrono::Local::now().date_naive();
        let filter = filter_from_input(&params.0, today).map_err(|e| format!("{e:#}"))?;
        let code = self
            .client
            .create_filter(&filter)
            .await
            .map_err(|e| format!("Creating filter failed: {e:#}"))?;
        serde_json::to_string(&serde_json::json!({ "code": code })).map_err(|e| e.to_string())
    }

    #[tool(name = "get_filter", description = "Load the search filter stored under a share code.")]
    async fn get_filter(&self, params: Parameters<FilterCodeInput>) -> Result<String, String> {
        let filter = self
            .client
            .get_filter(&params.0.code)
            .await
            .map_err(|e| format!("Loading filter failed: {e:#}"))?;
        serde_json::to_string(&filter).map_err(|e| e.to_string())
    }
}

impl ServerHandler for TripSearchServer {
    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl Future<Output = Result<rmcp::model::ListToolsResult, rmcp::ErrorData>> + Send + '_
    {
        Box::pin(async move {
            let tools = self.tool_router.list_all();
            tracing::debug!("Returning {} tools", tools.len());
            Ok(rmcp::model::ListToolsResult::with_all_items(tools))
        })
    }

    fn call_tool(
        &self,
        request: rmcp::model::CallToolRequestParam,
        context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl Future<Output = Result<rmcp::model::CallToolResult, rmcp::ErrorData>> + Send + '_
    {
        let router = self.tool_router.clone();
        let self_clone = self.clone();
        Box::pin(async move {
            tracing::debug!("call_tool: {}", request.name);
            let context =
                rmcp::handler::server::tool::ToolCallContext::new(&self_clone, request, context);
            router.call(context).await
        })
    }

    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2025_03_26,
            capabilities: rmcp::model::ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                ..Default::default()
            },
            server_info: rmcp::model::Implementation::from_build_env(),
            instructions: Some(
                "Search package trips and flights. Results are grouped per hotel stay with every agency selling it."
                    .to_string(),
            ),
        }
    }
}

async fn health() -> http::StatusCode {
    http::StatusCode::OK
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".to_string().into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();
    tracing::debug!("Parsed args: {:?}", args);

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.api_url {
        config = config.with_base_url(url);
    }
    tracing::info!("Using trips API at {}", config.api_root());
    let client = Arc::new(TripsApiClient::new(config).context("Failed to create trips client")?);

    match args.command {
        Command::Stdio => {
            eprintln!("Starting MCP server over stdio...");
            let server = TripSearchServer::new(client);
            let (stdin, stdout) = rmcp::transport::io::stdio();
            let running = serve_server(Arc::new(server), (stdin, stdout))
                .await
                .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
            let reason = running.waiting().await?;
            tracing::info!("MCP server stopped: {:?}", reason);
        }
        Command::Http {
            host,
            port,
            max_connections,
        } => {
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .context("Invalid host:port")?;
            tracing::info!("Starting MCP server over HTTP on {}", addr);
            let server = TripSearchServer::new(client);
            let session_manager = Arc::new(LocalSessionManager::default());
            let config = StreamableHttpServerConfig {
                stateful_mode: true,
                ..Default::default()
            };
            let service =
                StreamableHttpService::new(move || Ok(server.clone()), session_manager, config);
            let app = axum::Router::new()
                .route("/health", axum::routing::get(health))
                .nest_service("/mcp", service)
                .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections.max(1)));

            let shutdown = CancellationToken::new();
            let on_signal = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                    return;
                }
                tracing::info!("Shutting down");
                on_signal.cancel();
            });

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .context("HTTP server error")?;
        }
    }

    Ok(())
}
