use once_cell::sync::Lazy;
use oping_probe::DEFAULT_PORT;
use std::collections::HashMap;
use std::fs;
use tracing::warn;

const SERVICES_PATH: &str = "/etc/services";

/// TCP services from the system database, names and aliases alike.
static SYSTEM_SERVICES: Lazy<HashMap<String, u16>> = Lazy::new(|| {
    fs::read_to_string(SERVICES_PATH)
        .map(|text| parse_services(&text))
        .unwrap_or_default()
});

/// Fallback for hosts without a usable services database.
static WELL_KNOWN_SERVICES: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("ftp", 21);
    map.insert("ssh", 22);
    map.insert("telnet", 23);
    map.insert("smtp", 25);
    map.insert("domain", 53);
    map.insert("http", 80);
    map.insert("www", 80);
    map.insert("pop3", 110);
    map.insert("imap", 143);
    map.insert("ldap", 389);
    map.insert("https", 443);
    map.insert("submission", 587);
    map.insert("ldaps", 636);
    map.insert("imaps", 993);
    map.insert("pop3s", 995);
    map.insert("ms-sql-s", 1433);
    map.insert("mysql", 3306);
    map.insert("rdp", 3389);
    map.insert("postgresql", 5432);
    map.insert("redis", 6379);
    map.insert("http-alt", 8080);
    map
});

/// Parses `services(5)` text into a name -> port map of its tcp entries.
/// The first entry for a name wins.
pub fn parse_services(text: &str) -> HashMap<String, u16> {
    let mut services = HashMap::new();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or_default();
        let mut fields = line.split_whitespace();
        let (Some(name), Some(port_proto)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Some((port, proto)) = port_proto.split_once('/') else {
            continue;
        };
        if proto != "tcp" {
            continue;
        }
        let Ok(port) = port.parse::<u16>() else {
            continue;
        };
        for alias in std::iter::once(name).chain(fields) {
            services.entry(alias.to_string()).or_insert(port);
        }
    }
    services
}

pub fn lookup_service(name: &str) -> Option<u16> {
    SYSTEM_SERVICES
        .get(name)
        .or_else(|| WELL_KNOWN_SERVICES.get(name))
        .copied()
}

/// Resolves a `--port` value: a number, or a service name. Port 0 and
/// unknown names fall back to port 80.
pub fn parse_port(value: &str) -> u16 {
    resolve_port_with(value, lookup_service)
}

fn resolve_port_with(value: &str, lookup: impl Fn(&str) -> Option<u16>) -> u16 {
    match value.parse::<u16>() {
        Ok(0) => {
            warn!("port 0 cannot be probed, defaulting to port {DEFAULT_PORT}");
            return DEFAULT_PORT;
        }
        Ok(port) => return port,
        Err(_) => {}
    }
    match lookup(value) {
        Some(port) => port,
        None => {
            warn!(service = %value, "unknown service, defaulting to port {DEFAULT_PORT}");
            DEFAULT_PORT
        }
    }
}
