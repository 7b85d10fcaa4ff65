use std::process::Command;
use tracing::{debug, info};

/// The interface carrying the default route, for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub ip: Option<String>,
}

pub trait InterfaceSource {
    fn discover(&self) -> Option<Interface>;
}

/// Asks the operating system's routing tools on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn discover(&self) -> Option<Interface> {
        let Some(name) = default_interface() else {
            debug!("no default route interface found");
            return None;
        };
        let ip = interface_address(&name);
        Some(describe(name, ip))
    }
}

/// Tells the operator when the default interface has no IPv4 address.
fn describe(name: String, ip: Option<String>) -> Interface {
    if ip.is_none() {
        info!("Could not get IP address for interface: {name}");
    }
    Interface { name, ip }
}

#[cfg(target_os = "macos")]
fn default_interface() -> Option<String> {
    parse_route_get(&command_output("route", &["-n", "get", "default"])?)
}

#[cfg(target_os = "macos")]
fn interface_address(name: &str) -> Option<String> {
    let out = command_output("ipconfig", &["getifaddr", name])?;
    let ip = out.trim();
    (!ip.is_empty()).then(|| ip.to_string())
}

#[cfg(target_os = "linux")]
fn default_interface() -> Option<String> {
    parse_ip_route(&command_output("ip", &["route", "show", "default"])?)
}

#[cfg(target_os = "linux")]
fn interface_address(name: &str) -> Option<String> {
    parse_ip_addr(&command_output("ip", &["-4", "-o", "addr", "show", "dev", name])?)
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn default_interface() -> Option<String> {
    None
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn interface_address(_name: &str) -> Option<String> {
    None
}

#[cfg_attr(not(any(target_os = "macos", target_os = "linux")), allow(dead_code))]
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = match Command::new(program).args(args).output() {
        Ok(output) => output,
        Err(err) => {
            debug!(program, error = %err, "failed to run");
            return None;
        }
    };
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `route -n get default`: the value of the `interface:` line.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_route_get(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.trim().strip_prefix("interface:"))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// `ip route show default`: the word after `dev`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_ip_route(text: &str) -> Option<String> {
    word_after(text, "dev")
}

/// `ip -4 -o addr show dev X`: the address after `inet`, without its prefix length.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_ip_addr(text: &str) -> Option<String> {
    let cidr = word_after(text, "inet")?;
    cidr.split('/').next().map(str::to_string)
}

fn word_after(text: &str, key: &str) -> Option<String> {
    let mut words = text.split_whitespace();
    words.find(|word| *word == key)?;
    words.next().map(str::to_string)
}
