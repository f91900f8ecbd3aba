use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "uhfsense", version, about = "UHF RFID reader and sensor node controller")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(long, short = 'c', global = true, env = "UHFSENSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run continuous inventory and drive the sensor LED until Ctrl-C.
    Run(RunArgs),

    /// Run one inventory window and print the tags seen.
    Inventory(InventoryArgs),

    /// Run the reader acceptance sequence.
    Verify(VerifyArgs),

    /// List serial ports.
    Ports,

    /// Send a hex command to a serial port.
    Send(SendArgs),

    /// Print the effective configuration.
    Config,
}

#[derive(Debug, Args)]
pub struct ReaderArgs {
    /// EPC (hex) of a simulated tag in the reader field. Repeatable.
    #[arg(long = "tag", value_name = "EPC", default_value = "E2000017221101441890A3B4")]
    pub tags: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub reader: ReaderArgs,

    /// Use a simulated sensor link instead of the configured serial port.
    #[arg(long)]
    pub mock_sensor: bool,
}

#[derive(Debug, Args)]
pub struct InventoryArgs {
    #[command(flatten)]
    pub reader: ReaderArgs,

    /// Print the session as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub reader: ReaderArgs,

    /// Value written to USER memory and read back (4 bytes of hex).
    #[arg(long, default_value = "12345678")]
    pub data: String,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Serial port name.
    #[arg(long)]
    pub port: String,

    /// Baud rate.
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,

    /// Bytes to send, as hex. Spaces are allowed.
    pub hex: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["uhfsense", "verify"], "12345678")]
    #[case(&["uhfsense", "verify", "--data", "DEADBEEF"], "DEADBEEF")]
    fn test_verify_data(#[case] argv: &[&str], #[case] expected: &str) {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Verify(args) => assert_eq!(args.data, expected),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_repeated_tags_and_verbosity() {
        let cli = Cli::try_parse_from([
            "uhfsense", "-vv", "inventory", "--tag", "E200", "--tag", "E201", "--json",
        ])
        .unwrap();
        assert_eq!(cli.global.verbose, 2);
        match cli.command {
            Command::Inventory(args) => {
                assert_eq!(args.reader.tags, vec!["E200", "E201"]);
                assert!(args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_send_requires_port() {
        assert!(Cli::try_parse_from(["uhfsense", "send", "FFFF"]).is_err());
        let cli = Cli::try_parse_from(["uhfsense", "send", "--port", "COM3", "FF FF B6 24"]).unwrap();
        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.baud, 9600);
                assert_eq!(args.hex, "FF FF B6 24");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
