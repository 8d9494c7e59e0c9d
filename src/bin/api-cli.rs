use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Command-line client for the EarnMadu API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Session token, sent as a bearer credential.
    #[arg(short, long, env = "EARNMADU_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server and database liveness
    Health,
    /// Show the authenticated user
    Me,
    /// Send a test email to the authenticated user
    TestEmail,
    /// List videos
    Videos {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// List the authenticated user's earnings
    Earnings,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
    }

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
        Commands::Me => {
            client
                .get(format!("{}/api/v1/auth/me", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::TestEmail => {
            client
                .post(format!("{}/api/v1/auth/test-email", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Videos { category, limit } => {
            let mut query = Vec::new();
            if let Some(category) = category {
                query.push(("category", category));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            client
                .get(format!("{}/api/v1/videos", cli.url))
                .query(&query)
                .send()
                .await?
        }
        Commands::Earnings => {
            client
                .get(format!("{}/api/v1/earnings", cli.url))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{body}");
    } else {
        eprintln!("Error: API returned status {status}");
        eprintln!("Response: {body}");
        std::process::exit(1);
    }
    Ok(())
}
