use crate::netenv::Interface;
use chrono::NaiveDateTime;
use oping_model::{ProbeId, ProbeMode, ProbeResult};
use oping_stats::ReportRow;
use serde::Serialize;
use std::time::Duration;

const RULE_WIDTH: usize = 40;

/// Per-cycle values needed to render a result line.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub interface: &'a str,
    pub pass: u32,
    pub timeout: Duration,
    pub mode: ProbeMode,
}

pub fn interface_label(interface: Option<&Interface>) -> String {
    match interface {
        Some(Interface { name, ip: Some(ip) }) => format!("({name}) {ip}"),
        Some(Interface { name, ip: None }) => format!("({name}) NO IP"),
        None => "(IFACE UNKNOWN)".to_string(),
    }
}

/// Whether a result is printed. Lost probes always are; with the lost-only
/// filter on, successes are printed only when slower than `threshold_ms`.
pub fn should_emit(result: &ProbeResult, lost_only: bool, threshold_ms: f64) -> bool {
    match result.rtt_ms {
        None => true,
        Some(_) if !lost_only => true,
        Some(rtt) => rtt > threshold_ms,
    }
}

pub fn result_line(result: &ProbeResult, ctx: &LineContext<'_>) -> String {
    match result.rtt_ms {
        Some(rtt) => {
            let ip = result
                .ip
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| result.target.clone());
            format!(
                "{:>20} {:>20}: {:6.2}ms  pass={:<3}",
                ctx.interface, ip, rtt, ctx.pass
            )
        }
        None => format!(
            "{:>20} {:>30}: LOST     pass={:<3}",
            ctx.interface, result.target, ctx.pass
        ),
    }
}

pub fn verbose_suffix(result: &ProbeResult, ctx: &LineContext<'_>, at: NaiveDateTime) -> String {
    let mut suffix = format!(" timeout={} proto={}", ctx.timeout.as_secs(), ctx.mode);
    if let Some(port) = result.port {
        suffix.push_str(&format!(" port={port}"));
    }
    suffix.push_str(&format!(" timestamp={}", at.format("%Y-%m-%d %H:%M:%S%.6f")));
    suffix
}

pub fn stats_table(rows: &[ReportRow]) -> Vec<String> {
    let rule = "-".repeat(RULE_WIDTH);
    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push("Ping statistics:".to_string());
    lines.push(rule.clone());
    for row in rows {
        let probe = match row.probe {
            ProbeId::Icmp => "proto=icmp".to_string(),
            ProbeId::Port(port) => format!("port={port:5}"),
        };
        lines.push(format!(
            "{:>30}: {:<10} {:3} succ {:3} unsucc {:5.1}% loss {:6.2}ms/avg",
            row.target,
            probe,
            row.summary.successful,
            row.summary.unsuccessful,
            row.summary.loss_percent,
            row.summary.mean_rtt_ms
        ));
    }
    lines.push(rule);
    lines
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    finished_at_utc: &'a str,
    series: &'a [ReportRow],
}

pub fn stats_json(rows: &[ReportRow], finished_at_utc: &str) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        finished_at_utc,
        series: rows,
    })
}

pub fn help_text() -> Vec<String> {
    let rule = "-".repeat(RULE_WIDTH);
    vec![
        rule.clone(),
        "[q]uit, [v]erbose toggle, [p]ause, [s]tats up to now".to_string(),
        "[l]ost packets only, [1-9] set extra sleep time".to_string(),
        "[+/-] adjust sleep time, [d]ebug toggle".to_string(),
        rule,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use oping_model::SeriesSummary;
    use std::net::Ipv4Addr;

    fn ctx(interface: &str, pass: u32, mode: ProbeMode) -> LineContext<'_> {
        LineContext {
            interface,
            pass,
            timeout: Duration::from_secs(1),
            mode,
        }
    }

    #[test]
    fn success_line_layout() {
        let result = ProbeResult::reply("example.net", 12.5, Ipv4Addr::new(192, 0, 2, 1), None);
        let line = result_line(&result, &ctx("(eth0) 10.0.0.2", 7, ProbeMode::Icmp));

        let expected = format!(
            "{}(eth0) 10.0.0.2 {}192.0.2.1:  12.50ms  pass=7  ",
            " ".repeat(5),
            " ".repeat(11)
        );
        assert_eq!(line, expected);
    }

    #[test]
    fn lost_line_layout() {
        let result = ProbeResult::lost("example.net", None, None);
        let line = result_line(&result, &ctx("(IFACE UNKNOWN)", 12, ProbeMode::Icmp));

        assert!(line.starts_with("     (IFACE UNKNOWN) "));
        assert!(line.contains(&format!("{}example.net: LOST", " ".repeat(19))));
        assert!(line.ends_with("LOST     pass=12 "));
    }

    #[test]
    fn verbose_suffix_names_port_for_syn() {
        let at = NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let result = ProbeResult::reply("h", 1.0, Ipv4Addr::LOCALHOST, Some(443));
        let suffix = verbose_suffix(&result, &ctx("x", 1, ProbeMode::Syn), at);
        assert_eq!(
            suffix,
            " timeout=1 proto=syn port=443 timestamp=2026-01-02 03:04:05.000000"
        );

        let icmp = ProbeResult::lost("h", None, None);
        let suffix = verbose_suffix(&icmp, &ctx("x", 1, ProbeMode::Icmp), at);
        assert!(suffix.starts_with(" timeout=1 proto=icmp timestamp="));
    }

    #[test]
    fn lost_only_filter_keeps_slow_successes() {
        let lost = ProbeResult::lost("h", None, None);
        let fast = ProbeResult::reply("h", 20.0, Ipv4Addr::LOCALHOST, None);
        let edge = ProbeResult::reply("h", 200.0, Ipv4Addr::LOCALHOST, None);
        let slow = ProbeResult::reply("h", 250.0, Ipv4Addr::LOCALHOST, None);

        assert!(should_emit(&lost, true, 200.0));
        assert!(should_emit(&fast, false, 200.0));
        assert!(!should_emit(&fast, true, 200.0));
        assert!(!should_emit(&edge, true, 200.0));
        assert!(should_emit(&slow, true, 200.0));
    }

    #[test]
    fn interface_labels() {
        let with_ip = Interface {
            name: "en0".to_string(),
            ip: Some("192.0.2.4".to_string()),
        };
        let without_ip = Interface {
            name: "en0".to_string(),
            ip: None,
        };
        assert_eq!(interface_label(Some(&with_ip)), "(en0) 192.0.2.4");
        assert_eq!(interface_label(Some(&without_ip)), "(en0) NO IP");
        assert_eq!(interface_label(None), "(IFACE UNKNOWN)");
    }

    fn row(target: &str, probe: ProbeId, successful: u64, unsuccessful: u64) -> ReportRow {
        let total = successful + unsuccessful;
        ReportRow {
            target: target.to_string(),
            probe,
            summary: SeriesSummary {
                successful,
                unsuccessful,
                loss_percent: if total == 0 {
                    0.0
                } else {
                    unsuccessful as f64 / total as f64 * 100.0
                },
                mean_rtt_ms: 10.0,
                min_rtt_ms: Some(10.0),
                max_rtt_ms: Some(10.0),
            },
        }
    }

    #[test]
    fn stats_table_is_framed_by_rules() {
        let lines = stats_table(&[
            row("a.example", ProbeId::Icmp, 3, 0),
            row("b.example", ProbeId::Port(443), 1, 1),
        ]);

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Ping statistics:");
        assert_eq!(lines[1], "-".repeat(40));
        assert_eq!(lines[4], "-".repeat(40));

        assert!(lines[2].starts_with(&format!("{}a.example: proto=icmp ", " ".repeat(21))));
        assert!(lines[2].contains("  3 succ   0 unsucc   0.0% loss  10.00ms/avg"));
        assert!(lines[3].contains("port=  443 "));
        assert!(lines[3].contains("  1 succ   1 unsucc  50.0% loss"));
    }

    #[test]
    fn empty_report_still_prints_frame() {
        assert_eq!(stats_table(&[]).len(), 3);
    }

    #[test]
    fn json_report_lists_series() {
        let text = stats_json(&[row("a.example", ProbeId::Port(80), 2, 0)], "2026-01-02T03:04:05Z")
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["finished_at_utc"], "2026-01-02T03:04:05Z");
        assert_eq!(value["series"][0]["target"], "a.example");
        assert_eq!(value["series"][0]["successful"], 2);
    }

    #[test]
    fn help_mentions_every_command() {
        let text = help_text().join("\n");
        for needle in ["[q]uit", "[v]erbose", "[p]ause", "[s]tats", "[l]ost", "[1-9]", "[+/-]", "[d]ebug"] {
            assert!(text.contains(needle), "missing {needle}");
        }
    }
}
