//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Mapiprobe.
//
// Mapiprobe is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mapiprobe is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mapiprobe. If not, see <http://www.gnu.org/licenses/>.

use std::path::{Path, PathBuf};

use log::LevelFilter;
use structopt::StructOpt;

use super::probe::{HexBytes, Probe};
use crate::mapihttp::request_type::ServerEndpoint;
use crate::support::sysexits::*;
use crate::support::system_config::ProbeConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
pub(super) struct Options {
    /// The configuration file describing the server under test.
    #[structopt(
        short,
        long,
        parse(from_os_str),
        default_value = "mapiprobe.toml"
    )]
    config: PathBuf,

    /// Log more detail. Give twice for request tracing, three times for
    /// full HTTP dumps.
    ///
    /// Ignored if `logging.toml` exists next to the configuration file.
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u32,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub(super) enum Command {
    /// Query Autodiscover and print the MAPI/HTTP endpoint URLs.
    Autodiscover,
    /// Send a PING request, which needs no session.
    Ping(PingSubcommand),
    /// Connect to the mailbox endpoint and run a session against it.
    Mailbox(MailboxSubcommand),
    /// Bind to the address book endpoint and browse it.
    AddressBook(AddressBookSubcommand),
}

#[derive(StructOpt)]
pub(super) struct PingSubcommand {
    /// Which endpoint to ping (`mailbox` or `address-book`).
    #[structopt(long, default_value = "mailbox")]
    pub endpoint: ServerEndpoint,
}

#[derive(StructOpt)]
pub(super) struct MailboxSubcommand {
    /// A ROP request buffer, in hex, to send in an Execute request.
    ///
    /// The RPC_HEADER_EXT framing is added automatically.
    #[structopt(long)]
    pub rop_hex: Option<HexBytes>,

    /// Send a NotificationWait request before disconnecting.
    #[structopt(long)]
    pub wait: bool,
}

#[derive(StructOpt)]
pub(super) struct AddressBookSubcommand {
    /// A name to resolve. May be given more than once.
    #[structopt(long, number_of_values(1))]
    pub resolve: Vec<String>,

    /// List the columns the server supports.
    #[structopt(long)]
    pub columns: bool,

    /// Read this many rows from the start of the Global Address List.
    #[structopt(long)]
    pub rows: Option<u32>,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let options =
        Options::from_clap(&match Options::clap().get_matches_safe() {
            Ok(matches) => matches,
            Err(
                e @ clap::Error {
                    kind: clap::ErrorKind::HelpDisplayed,
                    ..
                },
            )
            | Err(
                e @ clap::Error {
                    kind: clap::ErrorKind::VersionDisplayed,
                    ..
                },
            ) => {
                println!("{}", e.message);
                return;
            }
            Err(e) => {
                eprintln!("{}", e.message);
                EX_USAGE.exit()
            }
        });

    let config = match ProbeConfig::load(&options.config) {
        Ok(config) => config,
        Err(e) => die!(
            EX_CONFIG,
            "Error in config file at '{}': {}",
            options.config.display(),
            e
        ),
    };

    init_logging(&options.config, options.verbose);

    let mut probe = match Probe::new(config) {
        Ok(probe) => probe,
        Err(e) => die!(e.exit_code(), "Error: {}", e),
    };

    let result = match options.command {
        Command::Autodiscover => probe.autodiscover(),
        Command::Ping(cmd) => probe.ping(cmd.endpoint),
        Command::Mailbox(cmd) => probe.mailbox(cmd),
        Command::AddressBook(cmd) => probe.address_book(cmd),
    };

    if let Err(e) = result {
        die!(e.exit_code(), "Error: {}", e);
    }

    let deviations = probe.deviation_count();
    if deviations > 0 {
        die!(
            EX_PROTOCOL,
            "{} deviation(s) from the protocol were found",
            deviations
        );
    }
}

fn init_logging(config_path: &Path, verbose: u32) {
    let log_config_file = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("logging.toml");
    if log_config_file.is_file() {
        if let Err(e) = log4rs::init_file(
            &log_config_file,
            log4rs::file::Deserializers::default(),
        ) {
            die!(
                EX_CONFIG,
                "Error in logging config at '{}': {}",
                log_config_file.display(),
                e
            );
        }
        return;
    }

    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = init_console_log(level) {
        die!(EX_SOFTWARE, "Failed to initialise logging: {}", e);
    }
}

fn init_console_log(
    level: LevelFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{h([{l}])} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}
