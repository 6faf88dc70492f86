//! BLE-PKAP initiator: authenticates a BLE device and pairs with it using
//! OOB data signed with pre-provisioned P-256 keys.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use pkap_crypto::keys::test_keys::{TEST_PRIVATE_KEY_HEX, TEST_PUBLIC_KEY_HEX};
use pkap_crypto::{PeerKey, SigningIdentity};
use pkap_handshake::{HandshakeConfig, DEFAULT_WATCHDOG};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Command-line arguments
#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    /// Adapter name, e.g. hci0
    adapter: String,
    /// Address of the responder device
    device: String,
    local_key_id: u16,
    peer_key_id: u16,
    /// Hex-encoded initiator private key
    init_key: Option<String>,
    /// Hex-encoded SEC1 responder public key
    resp_key: Option<String>,
    /// Handshake watchdog; `None` disables it
    watchdog: Option<Duration>,
    scan_timeout: Duration,
    debug: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            adapter: "hci0".to_string(),
            device: String::new(),
            local_key_id: 1,
            peer_key_id: 1,
            init_key: None,
            resp_key: None,
            watchdog: Some(DEFAULT_WATCHDOG),
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            debug: false,
        }
    }
}

enum Command {
    Run(Args),
    Help,
}

fn parse_args<I: IntoIterator<Item = String>>(argv: I) -> Result<Command> {
    let mut args = Args::default();
    let mut device = None;
    let mut iter = argv.into_iter();

    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .ok_or_else(|| anyhow!("Missing value for {}", name))
        };
        match arg.as_str() {
            "--adapter" | "-a" => args.adapter = value("--adapter")?,
            "--key-id" => args.local_key_id = parse_number(&value("--key-id")?, "--key-id")?,
            "--peer-key-id" => {
                args.peer_key_id = parse_number(&value("--peer-key-id")?, "--peer-key-id")?
            }
            "--init-key" | "-i" => args.init_key = Some(value("--init-key")?),
            "--resp-key" | "-r" => args.resp_key = Some(value("--resp-key")?),
            "--timeout" | "-t" => {
                let secs: u64 = parse_number(&value("--timeout")?, "--timeout")?;
                args.watchdog = (secs > 0).then(|| Duration::from_secs(secs));
            }
            "--scan-timeout" => {
                let secs: u64 = parse_number(&value("--scan-timeout")?, "--scan-timeout")?;
                args.scan_timeout = Duration::from_secs(secs);
            }
            "--debug" | "-d" => args.debug = true,
            "--help" | "-h" => return Ok(Command::Help),
            other if other.starts_with('-') => return Err(anyhow!("Unknown argument: {}", other)),
            other => {
                if device.replace(other.to_string()).is_some() {
                    return Err(anyhow!("Unexpected argument: {}", other));
                }
            }
        }
    }

    args.device = device.ok_or_else(|| anyhow!("Device address is required"))?;
    Ok(Command::Run(args))
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid value for {}: {}", name, value))
}

fn print_help() {
    println!("BLE-PKAP initiator - authenticated BLE OOB pairing");
    println!();
    println!("Usage: ble-pkap [OPTIONS] <DEVICE-ADDRESS>");
    println!();
    println!("Options:");
    println!("  -a, --adapter NAME      BLE adapter to use (default: hci0)");
    println!("      --key-id ID         Initiator key id (default: 1)");
    println!("      --peer-key-id ID    Expected responder key id (default: 1)");
    println!("  -i, --init-key HEX      Initiator private key (32 bytes, hex)");
    println!("  -r, --resp-key HEX      Responder public key (SEC1, hex)");
    println!("  -t, --timeout SECS      Handshake timeout, 0 disables (default: 30)");
    println!("      --scan-timeout SECS Device scan timeout (default: 30)");
    println!("  -d, --debug             Enable debug logging");
    println!("  -h, --help              Show this help message");
    println!();
    println!("Without --init-key/--resp-key the built-in test key pair is used.");
}

fn setup_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .init();
}

/// Signing identity and expected responder key, under the configured key ids.
fn load_keys(args: &Args, config: &HandshakeConfig) -> Result<(SigningIdentity, PeerKey)> {
    let init_key = args.init_key.as_deref().unwrap_or(TEST_PRIVATE_KEY_HEX);
    let resp_key = args.resp_key.as_deref().unwrap_or(TEST_PUBLIC_KEY_HEX);

    let identity = SigningIdentity::from_hex(config.local_key_id, init_key)
        .context("Invalid initiator private key")?;
    let responder = PeerKey::from_hex(config.peer_key_id, resp_key)
        .context("Invalid responder public key")?;
    Ok((identity, responder))
}

fn handshake_config(args: &Args, controller_index: u16) -> HandshakeConfig {
    HandshakeConfig::builder()
        .controller_index(controller_index)
        .local_key_id(args.local_key_id)
        .peer_key_id(args.peer_key_id)
        .watchdog(args.watchdog)
        .socket_read_timeout(args.watchdog)
        .build()
}

#[cfg(target_os = "linux")]
async fn run(args: Args) -> Result<()> {
    use pkap_bluetooth::{
        controller_index, parse_address, spawn_disconnect_monitor, BluerTransport, PkapAdapter,
    };
    use pkap_handshake::{HandshakeDriver, ManagementOobSource};
    use pkap_mgmt::ManagementClient;

    let index = controller_index(&args.adapter)
        .ok_or_else(|| anyhow!("Adapter name must look like hciN: {}", args.adapter))?;
    let config = handshake_config(&args, index);
    let (identity, responder_key) = load_keys(&args, &config)?;
    let address = parse_address(&args.device)?;

    let adapter = PkapAdapter::open(&args.adapter).await?;
    let device = adapter.find_device(address, args.scan_timeout).await?;

    let client = ManagementClient::open_with_timeout(config.socket_read_timeout)
        .context("Failed to open management socket")?;
    let read_interrupt = client
        .get_ref()
        .shutdown_handle()
        .context("Failed to duplicate management socket")?;
    let oob_source = ManagementOobSource::new(client, config.controller_index, config.address_types);

    let driver = HandshakeDriver::from_config(
        identity,
        responder_key,
        BluerTransport::new(device.clone()),
        oob_source,
        &config,
    )?
    .with_read_interrupt(read_interrupt);
    let monitor = spawn_disconnect_monitor(device, driver.event_sender());

    let result = driver.run().await;
    monitor.abort();
    result?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn run(args: Args) -> Result<()> {
    load_keys(&args, &handshake_config(&args, 0))?;
    Err(anyhow!("BLE-PKAP requires Linux with BlueZ"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{}", e);
            print_help();
            std::process::exit(1);
        }
    };

    setup_logging(args.debug);
    info!("Authenticating {} via {}", args.device, args.adapter);

    if let Err(e) = run(args).await {
        eprintln!("BLE-PKAP authentication FAILED: {:#}", e);
        std::process::exit(1);
    }

    println!("BLE-PKAP authentication SUCCEEDED");
    Ok(())
}
