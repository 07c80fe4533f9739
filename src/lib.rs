#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use mongodb::{error::Error as DbError, Client};
use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;
use model::mongodb::ensure_indexes_exist;

/// Build the server. Configuration loading and the database connection are
/// deferred to fairings, so failures surface at ignition with clear errors.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(LoggerFairing)
}

/// Build the server against an existing database connection, skipping the
/// `DatabaseFairing`. Used by tests, which manage their own databases.
pub async fn rocket_for_db(client: Client, db_name: &str) -> Result<Rocket<Build>, DbError> {
    let db = client.database(db_name);
    ensure_indexes_exist(&db).await?;
    Ok(rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
        .manage(client)
        .manage(db))
}

/// Connect to the database configured in `Rocket.toml` (test version).
#[cfg(test)]
pub(crate) async fn db_client() -> Client {
    let db_uri = rocket::build()
        .figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to database")
}

/// Generate the name of a fresh test database.
#[cfg(test)]
pub(crate) fn database() -> String {
    config::get_database_name()
}
