use std::time::Duration as StdDuration;

use chrono::Duration;
use mongodb::{bson::doc, error::Error as DbError, Client as MongoClient};
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::time::sleep,
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    poll_options: Vec<String>,
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// The closed set of votable options.
    ///
    /// The order here is the declared display order, which also breaks ties
    /// in the results.
    pub fn poll_options(&self) -> &[String] {
        &self.poll_options
    }

    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config, sanity-checks it, and puts it
/// in managed state. This could easily be achieved using `AdHoc::config`, but
/// is written out explicitly for symmetry with the other fairings and control
/// over error messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // A poll without options is unusable, and a repeated option would
        // show up twice in the results.
        if config.poll_options.is_empty() {
            error!("Invalid application config: `poll_options` must not be empty");
            return Err(rocket);
        }
        let mut seen = std::collections::HashSet::new();
        if !config.poll_options.iter().all(|option| seen.insert(option)) {
            error!("Invalid application config: `poll_options` contains duplicates");
            return Err(rocket);
        }

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// Connection attempts made before giving up on launch.
const DB_CONNECT_ATTEMPTS: u32 = 10;
/// Pause between launch connection attempts.
const DB_CONNECT_RETRY_DELAY: StdDuration = StdDuration::from_secs(3);

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection, tolerating the database coming up later
        // than us. Only launch retries; once serving, requests fail fast.
        let client = match connect_with_retries(&config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to prepare database indexes: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Connect to the database, retrying on failure up to the attempt limit.
async fn connect_with_retries(uri: &str) -> Result<MongoClient, DbError> {
    let mut attempt = 1;
    loop {
        match try_connect(uri).await {
            Ok(client) => return Ok(client),
            Err(err) if attempt < DB_CONNECT_ATTEMPTS => {
                warn!("Database connection attempt {attempt}/{DB_CONNECT_ATTEMPTS} failed: {err}");
                attempt += 1;
                sleep(DB_CONNECT_RETRY_DELAY).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Connect to the database and check the connection actually works.
async fn try_connect(uri: &str) -> Result<MongoClient, DbError> {
    let client = MongoClient::with_uri_str(uri).await?;
    // `with_uri_str` only parses the URI; a ping forces a real round-trip.
    client
        .database("admin")
        .run_command(doc! {"ping": 1}, None)
        .await?;
    Ok(client)
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
pub(crate) fn get_database_name() -> String {
    "poll".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
pub(crate) fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}
