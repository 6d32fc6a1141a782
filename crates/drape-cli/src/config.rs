use clap::{Parser, Subcommand};
use std::path::PathBuf;

use drape_core::service::DEFAULT_HISTORY_LIMIT;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "drape")]
#[command(
    author,
    version,
    about = "Weather-aware clothing recommendations"
)]
#[command(after_help = "Examples:
  drape recommend \"Boston, US\" --start 2024-03-01 --end 2024-03-02
  drape recommend \"home of the red sox\"
  drape recommend lat:40.7128,lon:-74.0060 --json
  drape analyze-outfit --image-url https://img.example/coat.jpg --temperature 4 --weather \"light snow\" --token $TOKEN
  drape history --token $TOKEN")]
pub struct Config {
    /// PostgreSQL database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// OpenWeatherMap API key for forecasts
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub openweather_api_key: Option<String>,

    /// OpenAI API key for location interpretation, shopping links and outfit analysis
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Secret used to verify session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Custom path to catalog.toml (landmarks and fallback cities)
    #[arg(long, env = "DRAPE_CATALOG", value_name = "PATH", global = true)]
    pub catalog: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clothing recommendations for a location and optional date range
    #[command(after_help = "Location forms:
  lat:<float>,lon:<float>       coordinates
  City, Country                 canonical place name
  a free-form description       interpreted, e.g. \"home of the red sox\"

Dates accept YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS.")]
    Recommend {
        /// Location text
        location: String,
        /// Earliest forecast time to include
        #[arg(long, value_name = "DATE")]
        start: Option<String>,
        /// Latest forecast time to include
        #[arg(long, value_name = "DATE")]
        end: Option<String>,
        /// Session token; the search is stored under this user
        #[arg(long, env = "DRAPE_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how a location text would be interpreted
    Locate {
        /// Location text
        location: String,
    },
    /// Judge whether an outfit photo suits the weather
    AnalyzeOutfit {
        /// Public URL of the outfit photo
        #[arg(long, value_name = "URL")]
        image_url: String,
        /// Temperature in degrees Celsius
        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,
        /// Weather description, e.g. "light rain"
        #[arg(long)]
        weather: String,
        /// Session token
        #[arg(long, env = "DRAPE_TOKEN", hide_env_values = true)]
        token: String,
        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },
    /// List your most recent searches
    History {
        /// Session token
        #[arg(long, env = "DRAPE_TOKEN", hide_env_values = true)]
        token: String,
        /// Maximum number of searches to return
        #[arg(short, long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
        /// Print the searches as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create the database tables if they do not exist
    InitDb,
}
