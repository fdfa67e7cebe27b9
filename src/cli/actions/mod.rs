pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        access_secret: SecretString,
        access_ttl_seconds: i64,
        refresh_secret: SecretString,
        refresh_ttl_seconds: i64,
    },
}
