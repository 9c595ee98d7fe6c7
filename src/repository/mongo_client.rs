use mongodb::{
    options::{ClientOptions, Credential, ResolverConfig},
    Client, Database,
};
use tracing::info;

use crate::config::mongo_conf::MongoConfig;

/// Open one client for the whole process and hand out its database handle;
/// the driver pools connections behind it.
pub async fn connect(config: &MongoConfig) -> Result<Database, mongodb::error::Error> {
    let mut client_options =
        ClientOptions::parse_with_resolver_config(config.get_uri(), ResolverConfig::cloudflare()).await?;
    client_options.app_name = Some("QuoteEngine".to_string());
    client_options.max_pool_size = Some(config.pool_size);
    client_options.connect_timeout = Some(config.connection_timeout());

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        client_options.credential = Some(
            Credential::builder()
                .username(username.clone())
                .password(password.clone())
                .build(),
        );
    }

    let client = Client::with_options(client_options)?;
    info!(database = %config.get_database(), "MongoDB client created");
    Ok(client.database(config.get_database()))
}
