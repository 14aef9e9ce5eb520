use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use hotel_scout::models::{GuestRoom, PricingStatus, SearchParams, SearchTarget};
use hotel_scout::providers::{CatalogClient, PricingClient};
use hotel_scout::{EngineConfig, FilterState, PriceRange, ProviderConfig, SearchSession, SortOrder};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Search hotels and print one page of results
#[derive(Debug, Parser)]
#[command(name = "hotel-scout", version)]
struct Args {
    /// Region to search in
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    region: Option<String>,

    /// Latitude for a nearby search
    #[arg(long, requires = "lon")]
    lat: Option<f64>,

    /// Longitude for a nearby search
    #[arg(long, requires = "lat")]
    lon: Option<f64>,

    /// Radius in meters for a nearby search
    #[arg(long, default_value_t = 2000)]
    radius: u32,

    #[arg(long)]
    checkin: NaiveDate,

    #[arg(long)]
    checkout: NaiveDate,

    #[arg(long, default_value_t = 2)]
    adults: u8,

    /// Ages of children, comma separated
    #[arg(long, value_delimiter = ',')]
    children: Vec<u8>,

    #[arg(long, default_value = "EUR")]
    currency: String,

    #[arg(long, default_value = "gb")]
    residency: String,

    /// recommended, price-asc or price-desc
    #[arg(long, default_value = "recommended")]
    sort: SortOrder,

    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Star ratings to keep, comma separated
    #[arg(long, value_delimiter = ',')]
    stars: Vec<u8>,

    #[arg(long)]
    min_price: Option<f64>,

    #[arg(long)]
    max_price: Option<f64>,

    /// Amenities every hotel must have, comma separated
    #[arg(long, value_delimiter = ',')]
    amenities: Vec<String>,

    /// Meal plans, any of which will do, comma separated
    #[arg(long, value_delimiter = ',')]
    meals: Vec<String>,

    /// Write the final view to this file as JSON
    #[arg(long)]
    json: Option<String>,
}

impl Args {
    fn target(&self) -> Result<SearchTarget> {
        match (&self.region, self.lat, self.lon) {
            (Some(region_id), _, _) => Ok(SearchTarget::Region {
                region_id: region_id.clone(),
            }),
            (None, Some(latitude), Some(longitude)) => Ok(SearchTarget::Geo {
                latitude,
                longitude,
                radius_m: self.radius,
            }),
            _ => bail!("either --region or --lat/--lon is required"),
        }
    }

    fn filters(&self) -> FilterState {
        FilterState {
            stars: self.stars.iter().copied().collect(),
            price: PriceRange {
                min: self.min_price.unwrap_or(0.0),
                max: self.max_price,
            },
            amenities: self.amenities.iter().cloned().collect(),
            meal_plans: self.meals.iter().map(|m| m.to_lowercase()).collect(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    info!("🏨 Hotel Scout");
    info!("==============");

    let providers = ProviderConfig::from_env().context("Failed to read provider configuration")?;
    let catalog = Arc::new(CatalogClient::new(&providers)?);
    let pricing = Arc::new(PricingClient::new(&providers)?);
    let session = SearchSession::new(catalog, pricing, EngineConfig::default());

    let params = SearchParams {
        target: args.target()?,
        checkin: args.checkin,
        checkout: args.checkout,
        guests: vec![GuestRoom {
            adults: args.adults,
            children: args.children.clone(),
        }],
        residency: args.residency.to_lowercase(),
        currency: args.currency.to_uppercase(),
    };

    let outcome = session.search(params).await.context("Search failed")?;
    info!("Search finished: {:?}", outcome);

    info!("Waiting for catalog data...");
    session.settle().await;

    let filters = args.filters();
    if filters != FilterState::default() {
        let mut merged = filters;
        if merged.price.max.is_none() {
            merged.price.max = session.view().filters.price.max;
        }
        session.set_filter(merged).await;
    }
    session.set_sort(args.sort).await;
    let view = session.set_page(args.page).await;

    info!(
        "\n✅ Page {}/{} ({} results)\n",
        view.page, view.total_pages, view.total_results
    );

    for (i, hotel) in view.records.iter().enumerate() {
        let stars = "★".repeat(hotel.star_rating as usize);
        println!("{}. {} {}", i + 1, hotel.name, stars);
        if !hotel.address.is_empty() {
            println!("   {}", hotel.address);
        }
        match (hotel.pricing_status, hotel.rates.first()) {
            (PricingStatus::Priced, Some(rate)) => println!(
                "   from {} {} ({})",
                rate.amount.map(|a| format!("{a:.2}")).unwrap_or_else(|| "?".to_string()),
                rate.currency.as_deref().unwrap_or(""),
                rate.meal.as_deref().unwrap_or("room only")
            ),
            (PricingStatus::SoldOut, _) => println!("   sold out"),
            _ => println!("   price loading"),
        }
        if !hotel.amenities.is_empty() {
            println!("   Amenities: {}", hotel.amenities.join(", "));
        }
        println!("   ID: {}", hotel.id);
        println!();
    }

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&view)?;
        tokio::fs::write(path, json).await?;
        info!("💾 Saved view to {}", path);
    }

    Ok(())
}
