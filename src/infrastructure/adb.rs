//! adb connection driver.
//!
//! Each operation is a single invocation of the device-management tool,
//! parsed into domain types. Decision logic lives in the reconciler; this
//! module only knows how to ask adb things and how to read its answers.

use std::net::Ipv4Addr;

use async_trait::async_trait;

use crate::domain::{AppError, DeviceRecord, Result};

use super::runner::{clean, CommandRunner};
use super::DeviceTransport;

/// adb-backed implementation of [`DeviceTransport`].
#[derive(Debug, Clone)]
pub struct AdbDriver<R> {
    runner: R,
    port: u16,
    interface: String,
}

impl<R: CommandRunner> AdbDriver<R> {
    /// Create a driver for devices listening on `port`, reading the address
    /// of `interface`.
    #[must_use]
    pub fn new(runner: R, port: u16, interface: impl Into<String>) -> Self {
        Self {
            runner,
            port,
            interface: interface.into(),
        }
    }

    /// Run arbitrary adb arguments and return raw stdout.
    pub async fn passthrough(&self, args: &[&str]) -> Result<String> {
        self.runner.run(args).await
    }
}

#[async_trait]
impl<R: CommandRunner> DeviceTransport for AdbDriver<R> {
    fn port(&self) -> u16 {
        self.port
    }

    async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        let out = self.runner.run(&["devices"]).await?;
        Ok(parse_devices(&out))
    }

    async fn enable_network_mode(&self) -> Result<()> {
        let port = self.port.to_string();
        self.runner.run(&["tcpip", &port]).await?;
        tracing::debug!(port = self.port, "Enabled network mode");
        Ok(())
    }

    async fn query_network_address(&self) -> Result<String> {
        let out = self
            .runner
            .run(&["shell", "ip", "-f", "inet", "addr", "show", &self.interface])
            .await?;

        parse_inet_address(&out).ok_or_else(|| {
            AppError::transport(format!("No IPv4 address reported for {}", self.interface))
        })
    }

    async fn connect(&self, address: &str) -> Result<()> {
        let target = format!("{address}:{}", self.port);
        let out = match self.runner.run(&["connect", &target]).await {
            Ok(out) => out,
            Err(e) => {
                tracing::debug!(address, error = %e, "Connect invocation failed");
                return Err(AppError::connect(address));
            }
        };

        if connect_confirmed(&out, address) {
            Ok(())
        } else {
            tracing::debug!(address, output = %clean(&out), "Connect not confirmed");
            Err(AppError::connect(address))
        }
    }

    async fn disconnect_all(&self) -> Result<()> {
        self.runner.run(&["disconnect"]).await.map(drop)
    }

    async fn reset_daemon(&self) -> Result<()> {
        self.runner.run(&["kill-server"]).await.map(drop)
    }
}

/// Parse `adb devices` output into records.
///
/// The first line is the listing header. Lines without a tab-separated
/// state are dropped.
pub fn parse_devices(output: &str) -> Vec<DeviceRecord> {
    clean(output)
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split('\t');
            match (parts.next().map(str::trim), parts.next()) {
                (Some(serial), Some(state)) if !serial.is_empty() => {
                    Some(DeviceRecord::new(serial, state))
                }
                _ => {
                    if !line.trim().is_empty() {
                        tracing::debug!(line, "Skipping malformed device line");
                    }
                    None
                }
            }
        })
        .collect()
}

/// Extract the IPv4 address from `ip -f inet addr show <iface>` output.
pub fn parse_inet_address(output: &str) -> Option<String> {
    clean(output).lines().find_map(|line| {
        let mut words = line.split_whitespace();
        if words.next()? != "inet" {
            return None;
        }
        let cidr = words.next()?;
        let host = cidr.split('/').next()?;
        host.parse::<Ipv4Addr>().ok().map(|ip| ip.to_string())
    })
}

/// Whether connect output confirms a connection to exactly `address`.
///
/// The output must start with `connected to <address>` (any case) and the
/// address must end there: `connected to 10.0.0.50` does not confirm
/// `10.0.0.5`.
pub fn connect_confirmed(output: &str, address: &str) -> bool {
    let text = clean(output).to_lowercase();
    let expected = format!("connected to {}", address.to_lowercase());

    text.strip_prefix(&expected).is_some_and(|rest| {
        rest.chars()
            .next()
            .is_none_or(|c| c == ':' || c.is_whitespace())
    })
}

#[cfg(test)]
mod tests {
    use super::super::runner::scripted::ScriptedRunner;
    use super::*;
    use crate::domain::DeviceState;

    const IP_OUTPUT: &str = "17: wlan0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc mq state UP group default qlen 3000\r\n    inet 192.168.1.42/24 brd 192.168.1.255 scope global wlan0\r\n       valid_lft forever preferred_lft forever\r\n";

    fn driver(responses: Vec<std::result::Result<&str, &str>>) -> AdbDriver<ScriptedRunner> {
        AdbDriver::new(ScriptedRunner::with_responses(responses), 5555, "wlan0")
    }

    #[test]
    fn test_parse_devices_skips_header() {
        let out = "List of devices attached\n1WMHH815\tdevice\n192.168.1.42:5555\toffline\n\n";
        let devices = parse_devices(out);

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0], DeviceRecord::new("1WMHH815", "device"));
        assert_eq!(devices[1].serial, "192.168.1.42:5555");
        assert_eq!(devices[1].state, DeviceState::Offline);
    }

    #[test]
    fn test_parse_devices_drops_malformed_lines() {
        let out = "List of devices attached\r\ngarbage\r\n1WMHH815\tunauthorized\r\n";
        let devices = parse_devices(out);

        assert_eq!(devices.len(), 1);
        assert_eq!(
            devices[0].state,
            DeviceState::Other("unauthorized".into())
        );
    }

    #[test]
    fn test_parse_devices_empty_listing() {
        assert!(parse_devices("List of devices attached\n\n").is_empty());
        assert!(parse_devices("").is_empty());
    }

    #[test]
    fn test_parse_inet_address() {
        assert_eq!(parse_inet_address(IP_OUTPUT).as_deref(), Some("192.168.1.42"));
    }

    #[test]
    fn test_parse_inet_address_missing() {
        assert_eq!(parse_inet_address(""), None);
        assert_eq!(
            parse_inet_address("Device \"wlan0\" does not exist."),
            None
        );
    }

    #[test]
    fn test_connect_confirmed_any_case() {
        assert!(connect_confirmed("connected to 10.0.0.5:5555\n", "10.0.0.5"));
        assert!(connect_confirmed("Connected To 10.0.0.5:5555", "10.0.0.5"));
        assert!(connect_confirmed("connected to 10.0.0.5", "10.0.0.5"));
    }

    #[test]
    fn test_connect_confirmed_rejects_longer_address() {
        assert!(!connect_confirmed("connected to 10.0.0.50:5555", "10.0.0.5"));
        assert!(!connect_confirmed("connected to 10.0.0.50", "10.0.0.5"));
    }

    #[test]
    fn test_connect_confirmed_rejects_other_messages() {
        assert!(!connect_confirmed(
            "failed to connect to '10.0.0.5:5555': Connection refused",
            "10.0.0.5"
        ));
        assert!(!connect_confirmed("already connected to 10.0.0.5:5555", "10.0.0.5"));
        assert!(!connect_confirmed("", "10.0.0.5"));
    }

    #[tokio::test]
    async fn test_connect_sends_host_and_port() {
        let adb = driver(vec![Ok("connected to 10.0.0.5:5555\n")]);
        adb.connect("10.0.0.5").await.unwrap();

        assert_eq!(adb.runner.calls(), vec![vec!["connect", "10.0.0.5:5555"]]);
    }

    #[tokio::test]
    async fn test_connect_failure_names_address() {
        let adb = driver(vec![Ok("failed to connect to 10.0.0.5:5555\n")]);
        let err = adb.connect("10.0.0.5").await.unwrap_err();
        assert!(matches!(err, AppError::Connect { ref address } if address == "10.0.0.5"));
    }

    #[tokio::test]
    async fn test_connect_transport_error_is_connect_failure() {
        let adb = driver(vec![Err("cannot connect to daemon")]);
        let err = adb.connect("10.0.0.5").await.unwrap_err();
        assert!(matches!(err, AppError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_query_network_address() {
        let adb = driver(vec![Ok(IP_OUTPUT)]);
        assert_eq!(adb.query_network_address().await.unwrap(), "192.168.1.42");
        assert_eq!(
            adb.runner.calls()[0],
            vec!["shell", "ip", "-f", "inet", "addr", "show", "wlan0"]
        );
    }

    #[tokio::test]
    async fn test_query_network_address_without_inet_fails() {
        let adb = driver(vec![Ok("17: wlan0: <NO-CARRIER> mtu 1500\n")]);
        let err = adb.query_network_address().await.unwrap_err();
        assert!(matches!(err, AppError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_primitive_commands() {
        let adb = driver(vec![]);
        adb.enable_network_mode().await.unwrap();
        adb.disconnect_all().await.unwrap();
        adb.reset_daemon().await.unwrap();

        assert_eq!(
            adb.runner.calls(),
            vec![
                vec!["tcpip".to_string(), "5555".to_string()],
                vec!["disconnect".to_string()],
                vec!["kill-server".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_list_devices_propagates_failure() {
        let adb = driver(vec![Err("adb: command not found")]);
        assert!(adb.list_devices().await.is_err());
    }
}
