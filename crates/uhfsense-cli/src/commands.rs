//! Subcommand handlers.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uhfsense_controller::{Config, ControllerEvent, IntegratedController};
use uhfsense_core::Epc;
use uhfsense_core::encoding::{parse_hex, to_hex};
use uhfsense_hardware::mock::{MockReader, MockTag, MockTransport};
use uhfsense_hardware::{
    AnyReaderDevice, AnySerialTransport, ReaderDevice, SerialConfig, SerialPortTransport,
    SerialTransport, available_ports,
};
use uhfsense_rfid::{InventoryScanner, ReaderHandle, TagAccessController, run_acceptance};

use crate::cli::{GlobalOpts, InventoryArgs, ReaderArgs, RunArgs, SendArgs, VerifyArgs};

/// How long `send` waits for a reply before closing the port.
const REPLY_WINDOW: Duration = Duration::from_millis(500);

pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    match &global.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Build the reader. Only the simulated reader is available in this build.
fn simulated_reader(args: &ReaderArgs) -> Result<AnyReaderDevice> {
    warn!("No vendor reader driver is linked; using the simulated reader");
    let (reader, handle) = MockReader::with_name("Simulated UHF Reader".to_string());
    for tag in &args.tags {
        let epc = Epc::from_hex(tag).with_context(|| format!("invalid tag EPC {tag:?}"))?;
        handle.add_tag(MockTag::new(epc));
    }
    Ok(AnyReaderDevice::Mock(reader))
}

/// A token cancelled on Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            trigger.cancel();
        }
    });
    token
}

async fn open_reader(config: &Config, args: &ReaderArgs) -> Result<ReaderHandle<AnyReaderDevice>> {
    let mut reader = simulated_reader(args)?;
    reader
        .initialize(&config.reader.port)
        .await
        .with_context(|| format!("reader initialization on {} failed", config.reader.port))?;
    Ok(ReaderHandle::new(reader))
}

async fn close_reader(reader: &ReaderHandle<AnyReaderDevice>) {
    if let Err(e) = reader.lock().await.deinitialize().await {
        warn!("Reader deinitialization failed: {}", e);
    }
}

pub async fn run(config: Config, args: RunArgs) -> Result<()> {
    let reader = simulated_reader(&args.reader)?;
    let transport = if args.mock_sensor {
        AnySerialTransport::Mock(MockTransport::default())
    } else {
        AnySerialTransport::Serial(SerialPortTransport::new())
    };

    let mut handle = IntegratedController::start(&config, reader, transport).await?;
    let cancel = ctrl_c_token();
    println!("Running. Press Ctrl-C to stop.");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = handle.next_event() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
        }
    }

    let windows = handle.stop().await;
    println!("Stopped after {windows} scan windows.");
    Ok(())
}

fn print_event(event: &ControllerEvent) {
    match event {
        ControllerEvent::WindowCompleted {
            distinct_tags,
            total_detections,
            rate_per_sec,
            ..
        } => println!(
            "window: {distinct_tags} tags, {total_detections} detections, {rate_per_sec} tags/s"
        ),
        ControllerEvent::LedCommandSent { epc, command, lux } => {
            println!("{epc}: {command} at {lux:.2} lux")
        }
        ControllerEvent::CommandFailed {
            epc,
            command,
            reason,
        } => println!("{epc}: {command} failed: {reason}"),
        ControllerEvent::ScanFailed { reason } => println!("scan failed: {reason}"),
    }
}

pub async fn inventory(config: Config, args: InventoryArgs) -> Result<()> {
    let reader = open_reader(&config, &args.reader).await?;
    let mut scanner = InventoryScanner::new(reader.clone());
    let cancel = ctrl_c_token();

    let scanned = match scanner.configure_area(config.reader.inventory_area).await {
        Ok(_) => scanner.run_scan(config.scan_limits(), &cancel).await,
        Err(e) => Err(e),
    };
    close_reader(&reader).await;
    let report = scanned?;

    if args.json {
        let body = serde_json::json!({
            "exit": report.exit,
            "stats": report.stats,
            "tags": report.session.tags,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    for (index, tag) in report.session.tags.iter().enumerate() {
        println!(
            "{:>3}  {}  antenna {}  rssi {}  reads {}  data {}",
            index + 1,
            tag.epc,
            tag.antenna_port,
            tag.rssi,
            tag.read_count,
            to_hex(&tag.external_data)
        );
    }
    println!(
        "{} tags, {} detections, {} tags/s, elapsed {}",
        report.stats.distinct_tags,
        report.stats.total_detections,
        report.stats.rate_per_sec,
        report.stats.elapsed_display()
    );
    Ok(())
}

pub async fn verify(config: Config, args: VerifyArgs) -> Result<()> {
    let reader = open_reader(&config, &args.reader).await?;
    let mut scanner = InventoryScanner::new(reader.clone());
    let access =
        TagAccessController::new(reader.clone(), config.password()?, config.access_policy());
    let cancel = ctrl_c_token();

    let report = run_acceptance(
        &mut scanner,
        &access,
        config.scan_limits(),
        &args.data,
        &cancel,
    )
    .await;
    close_reader(&reader).await;

    if let Some(area) = &report.inventory_area {
        println!(
            "inventory area: {} start {} length {}",
            area.area, area.start_word, area.word_length
        );
    }
    if let Some(scan) = &report.inventory {
        println!(
            "inventory: {} tags in {}",
            scan.stats.distinct_tags,
            scan.stats.elapsed_display()
        );
    }
    if let Some(epc) = &report.epc {
        println!("EPC: {}", to_hex(&epc.data));
    }
    if let Some(user) = &report.user {
        let before = user.before.as_ref().map(|b| to_hex(b)).unwrap_or_default();
        let after = user.after.as_ref().map(|a| to_hex(a)).unwrap_or_default();
        println!(
            "USER: before {before}, wrote {}, after {after}, verified {}",
            user.target,
            user.verified()
        );
    }
    if let Some(tid) = &report.tid {
        println!("TID: {}", to_hex(&tid.data));
    }

    if !report.passed() {
        for (step, reason) in &report.failures {
            eprintln!("{step} failed: {reason}");
        }
        bail!("acceptance failed in {} step(s)", report.failures.len());
    }
    println!("Acceptance passed.");
    Ok(())
}

pub fn ports() -> Result<()> {
    let ports = available_ports().context("failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        println!("{}\t{}", port.name, port.kind);
    }
    Ok(())
}

pub async fn send(args: SendArgs) -> Result<()> {
    let bytes = parse_hex(&args.hex)?;
    if bytes.is_empty() {
        bail!("nothing to send");
    }

    let mut transport = SerialPortTransport::new();
    let mut frames = transport
        .open(&SerialConfig::new(&args.port, args.baud))
        .await?;

    let sent = transport.send(&bytes).await;
    if sent.is_ok() {
        println!("sent {}", to_hex(&bytes));
        if let Ok(Some(reply)) = tokio::time::timeout(REPLY_WINDOW, frames.recv()).await {
            println!("received {}", to_hex(&reply));
        }
    }
    transport.close().await?;
    sent?;
    Ok(())
}

pub fn show_config(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
