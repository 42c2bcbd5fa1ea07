//!  Tripwise Flight Client
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

//! CLI for the Tripwise flight-search backend.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tripwise_flight_client::{
    AuthTokenPair, ClientConfig, FileTokenStore, FlightDetailsOptions, FlightsApiClient,
    LoggingNavigator, QueryParams, SearchResponse, SessionContext,
};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "tripwise-flights")]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Backend base URL
    #[arg(long, global = true, default_value = "http://localhost:8000")]
    base_url: String,

    /// JSON file holding the access and refresh tokens
    #[arg(long, global = true, default_value = ".tripwise-tokens.json")]
    token_store: PathBuf,

    /// Request timeout in seconds (transport default if omitted)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search flights
    Search {
        /// Origin entity id (e.g., ICN, NYCA)
        #[arg(short, long)]
        from: String,

        /// Destination entity id; omit to search everywhere
        #[arg(short, long)]
        to: Option<String>,

        /// Departure date (YYYY-MM-DD or YYYY/MM/DD)
        #[arg(short, long)]
        date: String,

        /// Return date for round trips (YYYY-MM-DD or YYYY/MM/DD)
        #[arg(short = 'R', long)]
        return_date: Option<String>,

        /// Cabin class: economy, premium_economy, business, first
        #[arg(short, long, default_value = "economy")]
        cabin: String,

        /// Number of adults
        #[arg(short, long, default_value = "1")]
        adults: u32,

        /// Number of children
        #[arg(long, default_value = "0")]
        children: u32,

        /// Number of infants
        #[arg(long, default_value = "0")]
        infants: u32,

        /// Extra backend parameter, repeatable (key=value)
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },

    /// Fetch the complete results of a search session
    Complete {
        /// Session token returned by `search`
        #[arg(short, long)]
        session_id: String,

        /// Extra backend parameter, repeatable (key=value)
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },

    /// Show the details of one itinerary
    Details {
        /// Session token returned by `search` or `complete`
        #[arg(long)]
        token: String,

        #[arg(long)]
        itinerary_id: String,

        #[arg(long)]
        market: Option<String>,

        #[arg(long)]
        locale: Option<String>,

        #[arg(long)]
        currency: Option<String>,

        /// Upstream cookie forwarded as is
        #[arg(long)]
        cookie: Option<String>,
    },

    /// Airport autocomplete
    Airports { query: String },

    /// Search history of the logged-in user
    History,

    /// Store a token pair obtained from the login endpoint
    Login {
        #[arg(long)]
        access_token: String,

        #[arg(long)]
        refresh_token: String,
    },

    /// Forget the stored tokens
    Logout,
}

/// Configure logging based on verbosity level
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .init();
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid parameter '{}', expected key=value", s))?;
    if key.is_empty() {
        return Err(format!("Invalid parameter '{}', key is empty", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse date string to NaiveDate
fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .context(format!(
            "Invalid date format: {}. Use YYYY-MM-DD or YYYY/MM/DD",
            s
        ))
}

fn parse_future_date(s: &str, what: &str) -> Result<String> {
    let date = parse_date(s)?;
    let today = chrono::Local::now().date_naive();
    anyhow::ensure!(date >= today, "{} cannot be in the past", what);
    Ok(date.format("%Y-%m-%d").to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn report_search(result: &SearchResponse) -> Result<()> {
    match result.session_token() {
        Some(token) if !token.is_empty() => tracing::info!(
            "{} result(s), session token: {}",
            result.itineraries().len(),
            token
        ),
        _ => tracing::info!("Result kind: {}", result.kind()),
    }
    print_json(result)?;
    if let SearchResponse::Error { message } = result {
        anyhow::bail!("{}", message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    setup_logging(args.verbose);
    tracing::debug!("Parsed args: {:?}", args);

    let store = Arc::new(FileTokenStore::new(&args.token_store));
    let session = Arc::new(SessionContext::init(store));

    let config = ClientConfig {
        timeout_secs: args.timeout,
        ..ClientConfig::default().with_base_url(args.base_url)
    };
    let client = FlightsApiClient::connect(config, session.clone(), Arc::new(LoggingNavigator))
        .context("Failed to create flights client")?;

    match args.command {
        Command::Search {
            from,
            to,
            date,
            return_date,
            cabin,
            adults,
            children,
            infants,
            params,
        } => {
            anyhow::ensure!(adults > 0, "At least one adult is required");
            let depart_date = parse_future_date(&date, "Departure date")?;
            let return_date = return_date
                .map(|d| parse_future_date(&d, "Return date"))
                .transpose()?;

            let mut query = QueryParams::new()
                .with(
                    "trip_type",
                    if return_date.is_some() { "round" } else { "one-way" },
                )
                .with("fromEntityId", from)
                .with("toEntityId", to.unwrap_or_default())
                .with("departDate", depart_date)
                .with("returnDate", return_date.unwrap_or_default())
                .with("cabinClass", cabin)
                .with("adults", adults)
                .with("children", children)
                .with("infants", infants);
            let extra: QueryParams = params.into_iter().collect();
            query.merge(&extra);

            let result = client.search_flights(&query).await;
            report_search(&result)?;
        }
        Command::Complete { session_id, params } => {
            let options: QueryParams = params.into_iter().collect();
            let result = client.get_complete_results(&session_id, &options).await;
            report_search(&result)?;
        }
        Command::Details {
            token,
            itinerary_id,
            market,
            locale,
            currency,
            cookie,
        } => {
            let options = FlightDetailsOptions {
                market,
                locale,
                currency,
                cookie,
            };
            let details = client
                .get_flight_details(&token, &itinerary_id, &options)
                .await;
            print_json(&details)?;
            if let Some(message) = details.failure_message() {
                anyhow::bail!("{}", message);
            }
        }
        Command::Airports { query } => {
            let airports = client.search_airports(&query).await;
            tracing::info!("{} airport(s) found", airports.len());
            print_json(&airports)?;
        }
        Command::History => {
            let history = client.get_search_history().await;
            print_json(&history)?;
        }
        Command::Login {
            access_token,
            refresh_token,
        } => {
            session
                .login(&AuthTokenPair {
                    access_token,
                    refresh_token,
                })
                .context("Failed to store tokens")?;
            println!("Tokens stored in {}", args.token_store.display());
        }
        Command::Logout => {
            session.logout();
            println!("Logged out");
        }
    }

    Ok(())
}
