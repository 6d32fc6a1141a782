use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use drape_cli::{Command, Config};
use drape_client::{JwtIdentity, OpenAiClient, OpenWeatherClient};
use drape_core::{
    load_catalog, AppError, Catalog, ClothingRecommendation, DbConfig, EnrichmentService,
    ErrorClass, FallbackCoordinator, HttpConfig, IdentityProvider, LocationResolver,
    OutfitAnalyzer, PipelineConfig, RecommendationRequest, RecommendationResponse,
    RecommendationService, SearchRecord, SearchStore,
};
use drape_db::SearchRepository;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv().ok();

    // Parse command line arguments
    let config = Config::parse();

    // Setup logging (stderr to keep stdout clean for --json)
    let level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {}", e);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<AppError>() {
            Some(app_error) => {
                eprintln!("\n❌ {}\n", app_error.user_message());
                match app_error.class() {
                    ErrorClass::Client => ExitCode::from(2),
                    ErrorClass::Unauthorized => ExitCode::from(3),
                    ErrorClass::Server => ExitCode::FAILURE,
                }
            }
            None => {
                eprintln!("\n❌ {:#}\n", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let db_config = DbConfig::default();
    let http = HttpConfig::default();
    let pipeline = PipelineConfig::default();

    // Lazy pool: an unreachable database only costs the best-effort writes
    let pool = PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .connect_lazy(&config.database_url)
        .context("Invalid DATABASE_URL")?;
    let repo = SearchRepository::new(pool);

    match config.command {
        Command::Recommend {
            ref location,
            ref start,
            ref end,
            ref token,
            json,
        } => {
            let user_id = match token {
                Some(token) => Some(identity(&config)?.verify(token)?),
                None => None,
            };
            let catalog = load_catalog(config.catalog.as_deref())?;
            let service = recommendation_service(&config, &http, &pipeline, catalog, repo)?;

            let request = RecommendationRequest {
                location: location.clone(),
                start_date: start.clone(),
                end_date: end.clone(),
                user_id,
            };
            let response = service.recommend(&request).await?;
            print_recommendations(&response, json)?;
        }
        Command::Locate { ref location } => {
            let catalog = load_catalog(config.catalog.as_deref())?;
            let text = OpenAiClient::new(
                require(&config.openai_api_key, "OPENAI_API_KEY")?,
                &pipeline.text_model,
                &http,
            )?;
            let resolver = LocationResolver::new(catalog.landmarks, text);

            match resolver.resolve(location).await {
                Ok(resolved) => println!("{}", resolved),
                Err(soft_failure) => {
                    warn!("{}", soft_failure);
                    println!("{} (uninterpreted)", soft_failure.into_fallback());
                }
            }
        }
        Command::AnalyzeOutfit {
            ref image_url,
            temperature,
            ref weather,
            ref token,
            json,
        } => {
            let user_id = identity(&config)?.verify(token)?;
            let vision = OpenAiClient::new(
                require(&config.openai_api_key, "OPENAI_API_KEY")?,
                &pipeline.vision_model,
                &http,
            )?;
            let analyzer = OutfitAnalyzer::new(vision, repo);

            let verdict = analyzer
                .analyze(image_url, temperature, weather, &user_id)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                let mark = if verdict.is_appropriate { "✓" } else { "✗" };
                println!("\n{} Appropriate: {}\n", mark, verdict.is_appropriate);
                println!("{}\n", verdict.feedback_text);
            }
        }
        Command::History {
            ref token,
            limit,
            json,
        } => {
            let user_id = identity(&config)?.verify(token)?;
            let searches = repo.list_recent_searches(&user_id, limit).await?;
            print_history(&searches, json)?;
        }
        Command::InitDb => {
            info!("Creating schema...");
            repo.ensure_schema().await?;
            println!("Database schema is ready.");
        }
    }

    Ok(())
}

/// Wires the production collaborators into the recommendation pipeline.
fn recommendation_service(
    config: &Config,
    http: &HttpConfig,
    pipeline: &PipelineConfig,
    catalog: Catalog,
    repo: SearchRepository,
) -> anyhow::Result<RecommendationService<OpenWeatherClient, OpenAiClient, SearchRepository>> {
    let weather = OpenWeatherClient::new(
        require(&config.openweather_api_key, "OPENWEATHER_API_KEY")?,
        http,
    )?;
    let text = OpenAiClient::new(
        require(&config.openai_api_key, "OPENAI_API_KEY")?,
        &pipeline.text_model,
        http,
    )?;

    let resolver = LocationResolver::new(catalog.landmarks, text.clone());
    let coordinator = FallbackCoordinator::new(
        weather,
        EnrichmentService::new(text),
        catalog.fallback_cities,
        pipeline.enrichment_concurrency,
    );
    Ok(RecommendationService::new(resolver, coordinator, repo))
}

fn identity(config: &Config) -> anyhow::Result<JwtIdentity> {
    Ok(JwtIdentity::new(require(&config.jwt_secret, "JWT_SECRET")?))
}

fn require<'a>(value: &'a Option<String>, name: &str) -> anyhow::Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::ConfigError(format!("{} is not set", name)).into())
}

fn print_recommendations(response: &RecommendationResponse, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!("\n👕 Clothing recommendations for {}\n", response.location);
    if let Some(substitute) = &response.substitute {
        println!("   ⚠ Forecast unavailable for your location; showing {}\n", substitute);
    }
    if response.recommendations.is_empty() {
        println!("No forecast points fall inside the requested dates.\n");
        return Ok(());
    }

    for rec in &response.recommendations {
        print_recommendation(rec);
    }
    if let Some(id) = response.search_id {
        info!("Saved as search {}", id);
    }
    Ok(())
}

fn print_recommendation(rec: &ClothingRecommendation) {
    println!(
        "{}  {:<15} {:>6.1}°C  {}",
        rec.timestamp.format("%a %d %b %H:%M"),
        rec.time_of_day.as_str(),
        rec.temperature_celsius,
        rec.weather_description
    );
    println!("   {}", rec.advice_text);
    println!("   🛒 {}", rec.shopping_link);
    println!();
}

fn print_history(searches: &[SearchRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(searches)?);
        return Ok(());
    }

    if searches.is_empty() {
        println!("\nNo searches yet. Try: drape recommend \"Boston, US\" --token <TOKEN>\n");
        return Ok(());
    }

    println!("\n🕘 Recent searches\n");
    for (i, search) in searches.iter().enumerate() {
        println!(
            "{}. {} ({} recommendations) on {}",
            i + 1,
            search.location_label,
            search.recommendations.len(),
            search.created_at.format("%Y-%m-%d %H:%M")
        );
        if let (Some(start), Some(end)) = (search.start_date, search.end_date) {
            println!("   {} → {}", start, end);
        }
    }
    println!();
    Ok(())
}
