//! Operator tool: print a bearer token for an existing user.
//!
//! ```text
//! issue-token --email admin@example.org
//! ```

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use solidarity_api::auth::issue_token;
use solidarity_api::config::Config;
use solidarity_api::{db, users};

#[derive(Parser, Debug)]
#[command(name = "issue-token")]
#[command(about = "Issue a bearer token for a registered Solidarity user")]
struct Args {
    /// Email address of the user to authenticate as
    #[arg(short, long)]
    email: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    let pool = db::init_pool(&config.database_url, 1).await?;

    let user = users::find_by_email(&pool, &args.email)
        .await?
        .with_context(|| format!("no user registered with email {}", args.email))?;

    println!("{}", issue_token(&config, user.id)?);
    Ok(())
}
