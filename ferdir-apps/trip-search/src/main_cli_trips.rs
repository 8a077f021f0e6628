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
//!
//! # Examples
//!
//! ## Package trips with default filters
//!
//! ```bash
//! ferdir-trips trips
//! ```
//!
//! ## Filtered search over three pages
//!
//! ```bash
//! # 4+ star hotels in Tenerife and Alicante, 7-14 nights, June to August
//! ferdir-trips trips --places TFS,ALC --stars 4 --nights 7-14 --from-month 2026-06 --to-month 2026-08 --pages 3
//! ```
//!
//! ## Share a search
//!
//! ```bash
//! ferdir-trips share -a 2 -c 2 --search "allt innifalið"
//! ferdir-trips trips --filter-code Xk3p9a
//! ```
//!
//! ## Flights only
//!
//! ```bash
//! ferdir-trips flights --places ALC --max-price 80000
//! ```
//!
//! ## Dry run (show request URL only)
//!
//! ```bash
//! ferdir-trips trips --places TFS --dry-run
//! ```

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use ferdir_trip_search::{
    AgencyOrder, ClientConfig, DateFormatConfig, DateLocale, GroupedTrip, OrderBy, Place,
    SearchKind, SearchOptions, SearchSession, SpecificDates, TripCard, TripsApiClient, TripsFilter,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing_subscriber::EnvFilter;

static MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})$").expect("valid month regex"));
static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*-\s*(\d+)$").expect("valid range regex"));

#[derive(Parser, Debug)]
#[command(name = "ferdir-trips")]
#[command(author, version, about = "Search package trips and flights across travel agencies")]
struct Cli {
    /// Backend API root (defaults to FERDIR_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Display locale: is, en
    #[arg(long, global = true, default_value = "is")]
    locale: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search package trips (hotel + flight)
    Trips(SearchArgs),
    /// Search flight-only offers
    Flights(SearchArgs),
    /// Store a filter on the backend and print its share code
    Share(SearchArgs),
    /// List package destinations
    Places,
    /// List flight destinations
    FlightPlaces,
    /// List travel agencies
    Agencies,
    /// Show the selectable filter values
    Options,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[arg(short = 'a', long, default_value = "2")]
    adults: u32,
    #[arg(short = 'c', long, default_value = "0")]
    children: u32,
    /// First month of the travel period (YYYY-MM)
    #[arg(long)]
    from_month: Option<String>,
    /// Last month of the travel period (YYYY-MM)
    #[arg(long)]
    to_month: Option<String>,
    /// Exact departure window start (YYYY-MM-DD), overrides --from-month
    #[arg(long, requires = "date_to")]
    date_from: Option<String>,
    /// Exact departure window end (YYYY-MM-DD)
    #[arg(long, requires = "date_from")]
    date_to: Option<String>,
    /// Night range, e.g. 7-21
    #[arg(short = 'n', long)]
    nights: Option<String>,
    #[arg(long, help = "Minimum price per person")]
    min_price: Option<u32>,
    #[arg(short = 'p', long, help = "Maximum price per person")]
    max_price: Option<u32>,
    #[arg(short = 's', long, help = "Minimum hotel stars (1-5)")]
    stars: Option<u32>,
    #[arg(long, help = "Minimum Tripadvisor rating (0-5, half steps)")]
    rating: Option<f64>,
    #[arg(long, help = "Agency codes (comma-separated)")]
    agencies: Option<String>,
    #[arg(short = 'P', long, help = "Destination codes (comma-separated)")]
    places: Option<String>,
    #[arg(short = 'q', long, help = "Free text search, e.g. hotel or room type")]
    search: Option<String>,
    #[arg(short = 'S', long, help = "Sort by: price, stars, tripadvisor")]
    sort: Option<String>,
    /// Load a previously shared filter instead of the flags above
    #[arg(long)]
    filter_code: Option<String>,
    /// Store the filter on the backend and print its share code
    #[arg(long)]
    share: bool,
    /// Number of result pages to load
    #[arg(long, default_value = "1")]
    pages: u32,
    /// Maximum results to print
    #[arg(short = 'l', long, default_value = "20")]
    limit: usize,
    /// Agency order inside a result: insertion, descending
    #[arg(long, default_value = "insertion")]
    agency_order: String,
    /// Print grouped results as JSON
    #[arg(long)]
    json: bool,
    #[arg(long, help = "Show the first page URL without making requests")]
    dry_run: bool,
}

/// Configure logging based on verbosity level; RUST_LOG wins when set.
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
}

fn parse_month(s: &str) -> Result<NaiveDate> {
    let caps = MONTH_RE
        .captures(s.trim())
        .with_context(|| format!("Invalid month: {}. Use YYYY-MM", s))?;
    let year: i32 = caps[1].parse()?;
    let month: u32 = caps[2].parse()?;
    NaiveDate::from_ymd_opt(year, month, 1).with_context(|| format!("Invalid month: {}", s))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .context(format!("Invalid date format: {}. Use YYYY-MM-DD", s))
}

fn parse_range(s: &str) -> Result<(u32, u32)> {
    if let Some(caps) = RANGE_RE.captures(s.trim()) {
        return Ok((caps[1].parse()?, caps[2].parse()?));
    }
    let single: u32 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid range: {}. Use e.g. 7-21", s))?;
    Ok((single, single))
}

fn parse_codes(s: &str) -> Vec<String> {
    s.split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn build_filter(args: &SearchArgs, today: NaiveDate) -> Result<TripsFilter> {
    let defaults = TripsFilter::builder(today).build()?;
    let mut builder = TripsFilter::builder(today)
        .adults(args.adults)
        .children(args.children);

    if let (Some(from), Some(to)) = (&args.date_from, &args.date_to) {
        builder = builder
            .date_range(parse_date(from)?, parse_date(to)?)
            .specific_dates(SpecificDates::Exact);
    } else if args.from_month.is_some() || args.to_month.is_some() {
        let from = match &args.from_month {
            Some(m) => parse_month(m)?,
            None => parse_date(&defaults.date_from)?,
        };
        let to = match &args.to_month {
            Some(m) => parse_month(m)?,
            None => parse_date(&defaults.date_to)?,
        };
        builder = builder.travel_period(from, to);
    }

    if let Some(nights) = &args.nights {
        let (from, to) = parse_range(nights)?;
        builder = builder.nights(from, to);
    }
    builder = builder.prices(
        args.min_price.unwrap_or(defaults.price_from),
        args.max_price.unwrap_or(defaults.price_to),
    );
    if let Some(stars) = args.stars {
        builder = builder.min_stars(stars);
    }
    if let Some(rating) = args.rating {
        builder = builder.min_tripadvisor(rating);
    }
    if let Some(agencies) = &args.agencies {
        builder = builder.agencies(parse_codes(agencies));
    }
    if let Some(places) = &args.places {
        builder = builder.places(parse_codes(places));
    }
    if let Some(search) = &args.search {
        builder = builder.search(search.clone());
    }
    let order = match &args.sort {
        Some(s) => Some(
            OrderBy::from_str_name(s)
                .with_context(|| format!("Invalid sort: {}. Use: price, stars, tripadvisor", s))?,
        ),
        None => None,
    };
    builder.order_by(order).build()
}

/// Get terminal width for separators
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(100)
}

fn dash_bar() -> String {
    "-".repeat(get_terminal_width().min(100))
}

fn render_places(places: &[Place]) {
    for place in places {
        println!("{:<8} {} - {}", place.code, place.country, place.name);
    }
}

fn render_card(index: usize, card: &TripCard) {
    println!("{}. {}", index + 1, card.title);
    if let Some(dates) = &card.dates {
        println!("   {}", dates);
    }
    if let Some(hotel) = card.hotel_line() {
        println!("   {}", hotel);
    }
    if let Some(room) = &card.room {
        println!("   {}", room);
    }
    println!("   {} / {}", card.price_per_person, card.total_price);
    let agencies: Vec<&str> = card.agencies.iter().map(|a| a.agency.as_str()).collect();
    println!("   Agencies: {}", agencies.join(", "));
    println!("   🔗 {}", card.url);
    println!();
}

fn render_results(results: &[GroupedTrip], limit: usize, config: &DateFormatConfig) {
    println!("{}", dash_bar());
    for (i, trip) in results.iter().take(limit).enumerate() {
        render_card(i, &TripCard::from_grouped(trip, config));
    }
    if results.len() > limit {
        println!("... {} more result(s), raise --limit to show them", results.len() - limit);
    }
}

async fn run_search(
    client: TripsApiClient,
    kind: SearchKind,
    args: SearchArgs,
    format: &DateFormatConfig,
) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let filter = match &args.filter_code {
        Some(code) => {
            let filter = client.get_filter(code).await?;
            tracing::info!("Loaded shared filter {}", code);
            filter
        }
        None => build_filter(&args, today)?,
    };

    if args.dry_run {
        println!("\n🔗 Page 1 URL:\n{}", client.page_url(kind, &filter, 1));
        return Ok(());
    }

    if args.share {
        let code = client.create_filter(&filter).await?;
        println!("🔖 Filter code: {}", code);
    }

    let agency_order = AgencyOrder::from_str_name(&args.agency_order).with_context(|| {
        format!(
            "Invalid agency order: {}. Use: insertion, descending",
            args.agency_order
        )
    })?;

    let mut session = SearchSession::new(client, kind).agency_order(agency_order);
    if let Err(e) = session.load_pages(filter, args.pages.max(1)).await {
        eprintln!("Search failed: {:#}", e);
        std::process::exit(1);
    }
    let results = session.results();

    if args.json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    let title = match kind {
        SearchKind::Package => "🌴 Package trips",
        SearchKind::Flight => "✈️  Flights",
    };
    println!("\n{}", title);
    if results.is_empty() {
        println!("No trips match the selected criteria.");
        return Ok(());
    }
    println!(
        "Found {} result(s) over {} page(s){}",
        results.len(),
        session.page(),
        if session.has_more() { ", more available" } else { "" }
    );
    render_results(results, args.limit, format);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    tracing::debug!("Args: {:?}", cli);

    let locale = match DateLocale::from_str_name(&cli.locale) {
        Some(l) => l,
        None => bail!("Unknown locale: {}. Use: is, en", cli.locale),
    };
    let format = DateFormatConfig::new(locale);

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config = config.with_base_url(url);
    }

    let client = TripsApiClient::new(config)?;

    match cli.command {
        Command::Trips(args) => run_search(client, SearchKind::Package, args, &format).await?,
        Command::Flights(args) => run_search(client, SearchKind::Flight, args, &format).await?,
        Command::Share(args) => {
            let filter = build_filter(&args, chrono::Local::now().date_naive())?;
            let code = client.create_filter(&filter).await?;
            println!("🔖 Filter code: {}", code);
            println!("   ferdir-trips trips --filter-code {}", code);
        }
        Command::Places => render_places(&client.get_places().await?),
        Command::FlightPlaces => render_places(&client.get_flight_places().await?),
        Command::Agencies => {
            for agency in client.get_agencies().await? {
                println!("{:<8} {}", agency.code, agency.name);
            }
        }
        Command::Options => {
            let today = chrono::Local::now().date_naive();
            println!(
                "{}",
                serde_json::to_string_pretty(&SearchOptions::new(today, &format))?
            );
        }
    }
    Ok(())
}
