use std::{env, net::{SocketAddr, ToSocketAddrs as _}, time::Duration};

use sea_orm::ConnectOptions;
use tracing::{info, warn};

use crate::{consts::DEFAULT_CALL_TIMEOUT_SECS, reconcile::CallTimeout};

pub struct Config {
    pub host_address: SocketAddr,

    pub database_opt: ConnectOptions,

    pub jwt_key: String,

    pub call_timeout: CallTimeout,
}

pub fn load() -> Config {
    Config {
        host_address: load_host_address(),
        database_opt: load_database_opt().into(),
        jwt_key: load_jwt_key(),
        call_timeout: load_call_timeout(),
    }
}

fn load_host_address() -> SocketAddr {
    info!("Loading environment `HOST_ADDRESS`");

    let var = env::var("HOST_ADDRESS").unwrap_or_else(|_| "127.0.0.1:0".to_string());

    var.to_socket_addrs()
        .expect("`HOST_ADDRESS` is not in a valid format").nth(0)
        .expect("unable to resolve host from `HOST_ADDRESS`")
}

fn load_database_opt() -> impl Into<ConnectOptions> {
    info!("Loading environment `DATABASE_URL`");

    let var = env::var("DATABASE_URL").expect("Environment `DATABASE_URL` is required to be set");

    var
}

fn load_jwt_key() -> String {
    info!("Loading environment `JWT_SECRET`");

    let var = env::var("JWT_SECRET").expect("Environment `JWT_SECRET` is required to be set");

    var
}

fn load_call_timeout() -> CallTimeout {
    info!("Loading environment `CALL_TIMEOUT_SECS`");

    let secs = match env::var("CALL_TIMEOUT_SECS") {
        Ok(var) => parse_timeout_secs(&var).unwrap_or_else(|| {
            warn!(value = %var, "`CALL_TIMEOUT_SECS` is not a positive integer, using {DEFAULT_CALL_TIMEOUT_SECS}");
            DEFAULT_CALL_TIMEOUT_SECS
        }),
        Err(_) => DEFAULT_CALL_TIMEOUT_SECS,
    };

    CallTimeout(Duration::from_secs(secs))
}

fn parse_timeout_secs(var: &str) -> Option<u64> {
    var.trim().parse().ok().filter(|secs| *secs > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout_secs() {
        assert_eq!(parse_timeout_secs("30"), Some(30));
        assert_eq!(parse_timeout_secs(" 5 "), Some(5));
        assert_eq!(parse_timeout_secs("0"), None);
        assert_eq!(parse_timeout_secs("-3"), None);
        assert_eq!(parse_timeout_secs("soon"), None);
    }
}
