//! Perkhub Admin - operator commands against the MongoDB store
//!
//! Usage:
//!   perkhub-admin seed                 replace the deal catalog with the sample deals
//!   perkhub-admin verify <email>       mark a user as verified
//!
//! Environment variables:
//!   MONGODB_URI - MongoDB connection URI (default: mongodb://localhost:27017)
//!   MONGODB_DB - Database name (default: startup-benefits)

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use perkhub::{db::MongoClient, seed, store::Stores, validation::normalize_email};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "perkhub-admin")]
#[command(about = "Operator commands for Perkhub")]
#[command(version)]
struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "startup-benefits")]
    mongodb_db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the deal catalog with the sample deals
    Seed,
    /// Mark a user as verified so they can claim locked deals
    Verify {
        /// Email of the user to verify
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let client = MongoClient::new(&args.mongodb_uri, &args.mongodb_db)
        .await
        .context("Failed to connect to MongoDB")?;
    let stores = Stores::mongo(&client).await?;

    match args.command {
        Command::Seed => {
            let count = seed::seed_deals(stores.deals.as_ref()).await?;
            info!("Seeded {} deals into {}", count, client.db_name());
        }
        Command::Verify { email } => {
            let email = normalize_email(&email);
            let Some(user) = stores.users.find_by_email(&email).await? else {
                bail!("No user with email {}", email);
            };
            let Some(id) = user._id else {
                bail!("User {} has no id", email);
            };

            if user.is_verified {
                info!("User {} is already verified", email);
            } else if stores.users.mark_verified(&id).await? {
                info!("User {} is now verified", email);
            } else {
                bail!("User {} disappeared before it could be verified", email);
            }
        }
    }

    Ok(())
}
