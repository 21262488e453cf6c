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

//! The flows behind each CLI subcommand.
//!
//! Every response is reported on stdout along with any deviations from the
//! protocol found in it. Deviations do not abort a run; `main` turns a
//! nonzero count into the exit status at the end.

use std::fmt::Write as _;
use std::io;
use std::str::FromStr;

use log::{info, warn};

use super::main::{AddressBookSubcommand, MailboxSubcommand};
use crate::mapihttp::autodiscover::{
    AutodiscoverResolver, EndpointCache, EndpointResolver, StaticEndpoints,
};
use crate::mapihttp::body::address_book::*;
use crate::mapihttp::body::address_book_table::*;
use crate::mapihttp::body::mailbox::*;
use crate::mapihttp::body::ResponseBody;
use crate::mapihttp::extended_buffer;
use crate::mapihttp::headers::ClientInstance;
use crate::mapihttp::property::{LargePropertyTagArray, PropertyTag};
use crate::mapihttp::request_type::{RequestType, ServerEndpoint};
use crate::mapihttp::row::ColumnsAndRows;
use crate::mapihttp::session::{
    AddressBookSession, Connection, MailboxSession, Response,
};
use crate::mapihttp::stat::Stat;
use crate::mapihttp::transport::{Credentials, HttpTransport};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::ProbeConfig;

pub(super) struct Probe {
    config: ProbeConfig,
    transport: HttpTransport,
    endpoints: EndpointCache<Box<dyn EndpointResolver>>,
    deviations: usize,
}

impl Probe {
    pub fn new(config: ProbeConfig) -> Result<Self, Error> {
        let password = match config.server.password.clone() {
            Some(password) => password,
            None => rpassword::read_password_from_tty(Some("Password: "))?,
        };

        let transport = HttpTransport::new(
            config.client.request_timeout(),
            config.client.accept_invalid_certs,
            Some(Credentials {
                user: format!(
                    "{}\\{}",
                    config.server.domain, config.server.user
                ),
                password,
            }),
        )?;

        let resolver: Box<dyn EndpointResolver> =
            match config.server.static_endpoints() {
                Some(urls) => Box::new(StaticEndpoints(urls)),
                None => Box::new(AutodiscoverResolver::new(
                    transport.clone(),
                    &config.server.autodiscover_url_format,
                    &config.server.sut_computer_name,
                    config.server.user.clone(),
                    config.server.domain.clone(),
                )),
            };

        Ok(Probe {
            config,
            transport,
            endpoints: EndpointCache::new(resolver),
            deviations: 0,
        })
    }

    /// The total number of deviations seen so far.
    pub fn deviation_count(&self) -> usize {
        self.deviations
    }

    pub fn autodiscover(&mut self) -> Result<(), Error> {
        let urls = self.endpoints.get()?;
        println!("{}: {}", ServerEndpoint::Mailbox, urls.mailbox);
        println!("{}: {}", ServerEndpoint::AddressBook, urls.address_book);
        Ok(())
    }

    pub fn ping(&mut self, endpoint: ServerEndpoint) -> Result<(), Error> {
        let mut connection = self.connection(endpoint)?;
        let response = connection.ping()?;
        self.report(&response);
        response.into_success()
    }

    pub fn mailbox(&mut self, cmd: MailboxSubcommand) -> Result<(), Error> {
        let user_dn = match self.config.server.user_dn.clone() {
            Some(dn) => dn,
            None => self.lookup_user_dn()?,
        };

        let connect = &self.config.connect;
        let request = ConnectRequestBody {
            user_dn,
            flags: connect.flags,
            default_code_page: connect.code_page,
            lcid_sort: connect.lcid_sort,
            lcid_string: connect.lcid_string,
            auxiliary_buffer: vec![],
        };

        let mut session =
            MailboxSession::new(self.connection(ServerEndpoint::Mailbox)?);
        let response = session.connect(&request)?;
        let connected = self.checked(response)?;
        println!(
            "Connected as {:?}; DN prefix {:?}, polls max {} ms, \
             retry {} x {} ms",
            connected.display_name,
            connected.dn_prefix,
            connected.polls_max,
            connected.retry_count,
            connected.retry_delay
        );
        self.log_auxiliary(RequestType::Connect, &connected.auxiliary_buffer);

        let result = self.mailbox_requests(&mut session, cmd);

        if session.is_active() {
            match session.disconnect(&DisconnectRequestBody::default()) {
                Ok(response) => {
                    if let Err(e) = self.checked(response) {
                        warn!("Disconnect failed: {}", e);
                    }
                }
                Err(e) => warn!("Disconnect failed: {}", e),
            }
        }

        result
    }

    fn mailbox_requests(
        &mut self,
        session: &mut MailboxSession<HttpTransport>,
        cmd: MailboxSubcommand,
    ) -> Result<(), Error> {
        if let Some(HexBytes(rop)) = cmd.rop_hex {
            let request =
                ExecuteRequestBody::new(extended_buffer::wrap(&rop)?);
            let response = session.execute(&request)?;
            let executed = self.checked(response)?;
            let rop_response = extended_buffer::decode(&executed.rop_buffer)?;
            println!("ROP response: {}", to_hex(&rop_response));
            self.log_auxiliary(
                RequestType::Execute,
                &executed.auxiliary_buffer,
            );
        }

        if cmd.wait {
            let response = session
                .notification_wait(&NotificationWaitRequestBody::default())?;
            let waited = self.checked(response)?;
            println!(
                "Event pending: {}",
                if 0 != waited.event_pending { "yes" } else { "no" }
            );
        }

        Ok(())
    }

    pub fn address_book(
        &mut self,
        cmd: AddressBookSubcommand,
    ) -> Result<(), Error> {
        let stat = self.beginning_stat();
        let mut session = self.bind()?;
        let result = self.address_book_requests(&mut session, stat, cmd);
        self.unbind(&mut session);
        result
    }

    fn address_book_requests(
        &mut self,
        session: &mut AddressBookSession<HttpTransport>,
        stat: Stat,
        cmd: AddressBookSubcommand,
    ) -> Result<(), Error> {
        if cmd.columns {
            let response = session.query_columns(&QueryColumnsRequestBody {
                reserved: 0,
                mapi_flags: 0,
                auxiliary_buffer: vec![],
            })?;
            let queried = self.checked(response)?;
            for tag in queried.columns.map(|c| c.0).unwrap_or_default() {
                println!("column {:?}", tag);
            }
        }

        if !cmd.resolve.is_empty() {
            let resolved = self.resolve_names(
                session,
                stat,
                cmd.resolve.clone(),
                vec![PropertyTag::DISPLAY_NAME, PropertyTag::SMTP_ADDRESS],
            )?;
            let minimal_ids = resolved.minimal_ids.unwrap_or_default();
            let mut rows = resolved
                .rows_and_columns
                .map(|cr| cr.rows)
                .unwrap_or_default()
                .into_iter();
            for (name, &mid) in cmd.resolve.iter().zip(&minimal_ids) {
                match mid {
                    MID_UNRESOLVED => println!("{:?}: unresolved", name),
                    MID_AMBIGUOUS => println!("{:?}: ambiguous", name),
                    _ => {
                        let row = rows.next();
                        let cell = |ix| {
                            row.as_ref()
                                .and_then(|r| r.get(ix))
                                .and_then(|v| v.as_str())
                                .unwrap_or("")
                        };
                        println!(
                            "{:?}: MId {} {:?} <{}>",
                            name,
                            mid,
                            cell(0),
                            cell(1)
                        );
                    }
                }
            }
        }

        if let Some(row_count) = cmd.rows {
            let response = session.query_rows(&QueryRowsRequestBody {
                flags: 0,
                state: Some(stat),
                explicit_table: vec![],
                row_count,
                columns: Some(LargePropertyTagArray(vec![
                    PropertyTag::DISPLAY_NAME,
                    PropertyTag::SMTP_ADDRESS,
                ])),
                auxiliary_buffer: vec![],
            })?;
            let queried = self.checked(response)?;
            print_rows(queried.columns_and_rows.as_ref());
        }

        Ok(())
    }

    /// Find the user's DN by resolving their address in the address book.
    fn lookup_user_dn(&mut self) -> Result<String, Error> {
        let email = self.config.server.email();
        info!("Looking up the DN of {}", email);

        let stat = self.beginning_stat();
        let mut session = self.bind()?;
        let result = self.resolve_names(
            &mut session,
            stat,
            vec![email.clone()],
            vec![PropertyTag::EMAIL_ADDRESS],
        );
        self.unbind(&mut session);

        let resolved = result?;
        let unique = matches!(
            resolved.minimal_ids.as_deref(),
            Some(&[mid]) if MID_UNRESOLVED != mid && MID_AMBIGUOUS != mid
        );
        if !unique {
            return Err(Error::RequestFailed {
                request_type: RequestType::ResolveNames,
                detail: format!("{} did not resolve to one entry", email),
            });
        }

        resolved
            .rows_and_columns
            .and_then(|cr| cr.rows.into_iter().next())
            .and_then(|row| {
                row.get(0).and_then(|v| v.as_str()).map(str::to_owned)
            })
            .ok_or_else(|| Error::RequestFailed {
                request_type: RequestType::ResolveNames,
                detail: format!("no DN returned for {}", email),
            })
    }

    fn bind(&mut self) -> Result<AddressBookSession<HttpTransport>, Error> {
        let mut session = AddressBookSession::new(
            self.connection(ServerEndpoint::AddressBook)?,
        );
        let response = session.bind(&BindRequestBody {
            flags: 0,
            state: Some(self.beginning_stat()),
            auxiliary_buffer: vec![],
        })?;
        let bound = self.checked(response)?;
        info!("Bound to address book server {}", bound.server_guid);
        Ok(session)
    }

    fn unbind(&mut self, session: &mut AddressBookSession<HttpTransport>) {
        if !session.is_active() {
            return;
        }

        match session.unbind(&UnbindRequestBody::default()) {
            Ok(response) => {
                if let Err(e) = self.checked(response) {
                    warn!("Unbind failed: {}", e);
                }
            }
            Err(e) => warn!("Unbind failed: {}", e),
        }
    }

    fn resolve_names(
        &mut self,
        session: &mut AddressBookSession<HttpTransport>,
        stat: Stat,
        names: Vec<String>,
        property_tags: Vec<PropertyTag>,
    ) -> Result<ResolveNamesSuccessResponseBody, Error> {
        let response = session.resolve_names(&ResolveNamesRequestBody {
            reserved: 0,
            state: Some(stat),
            property_tags: Some(LargePropertyTagArray(property_tags)),
            names: Some(names),
            auxiliary_buffer: vec![],
        })?;
        self.checked(response)
    }

    fn beginning_stat(&self) -> Stat {
        Stat::beginning(
            self.config.connect.code_page,
            self.config.connect.lcid_string,
        )
    }

    fn connection(
        &mut self,
        endpoint: ServerEndpoint,
    ) -> Result<Connection<HttpTransport>, Error> {
        let url = self.endpoints.url(endpoint)?;
        // A fresh GUID per connection; counters restart with it
        let client = ClientInstance::new();

        let log_prefix = LogPrefix::new(endpoint.to_string());
        log_prefix.set_user(self.config.server.email());
        log_prefix.set_client(client.guid().to_string());

        let mut connection = Connection::new(
            self.transport.clone(),
            endpoint,
            url,
            client,
            log_prefix,
        );
        connection
            .set_client_application(self.config.client.client_application.clone());
        Ok(connection)
    }

    fn report<B>(&mut self, response: &Response<B>) {
        println!(
            "{} [{}]: X-ResponseCode {}",
            response.request_type,
            response.request_id,
            response.response_code()
        );
        for deviation in &response.deviations {
            println!("  deviation: {}", deviation);
        }
        self.deviations += response.deviations.len();
    }

    /// Report `response`, then extract its success body, treating a nonzero
    /// `ErrorCode` as failure.
    fn checked<B: ResponseBody>(
        &mut self,
        response: Response<B>,
    ) -> Result<B, Error> {
        self.report(&response);
        let request_type = response.request_type;
        let body = response.into_success()?;
        if 0 != body.error_code() {
            return Err(Error::RequestFailed {
                request_type,
                detail: format!("ErrorCode 0x{:08X}", body.error_code()),
            });
        }

        Ok(body)
    }

    fn log_auxiliary(&self, request_type: RequestType, data: &[u8]) {
        match extended_buffer::decode_auxiliary_buffer(data) {
            Ok(blocks) => {
                for block in blocks {
                    info!(
                        "{} auxiliary block {} v{}: {} bytes",
                        request_type,
                        block
                            .type_name()
                            .map(str::to_owned)
                            .unwrap_or_else(|| format!(
                                "0x{:02X}",
                                block.block_type
                            )),
                        block.version,
                        block.payload.len()
                    );
                }
            }
            Err(e) => warn!("{} bad auxiliary buffer: {}", request_type, e),
        }
    }
}

fn print_rows(columns_and_rows: Option<&ColumnsAndRows>) {
    let columns_and_rows = match columns_and_rows {
        Some(cr) => cr,
        None => {
            println!("(no rows)");
            return;
        }
    };

    for row in &columns_and_rows.rows {
        let mut line = String::new();
        for ix in 0..row.len() {
            if ix > 0 {
                line.push_str(" | ");
            }
            match row.get(ix) {
                Some(v) => match v.as_str() {
                    Some(s) => line.push_str(s),
                    None => {
                        let _ = write!(line, "{:?}", v);
                    }
                },
                None => line.push('-'),
            }
        }
        println!("{}", line);
    }
}

/// Binary data given on the command line in hex.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = io::Error;

    fn from_str(s: &str) -> io::Result<Self> {
        let digits = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| {
                c.to_digit(16).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{:?} is not a hex digit", c),
                    )
                })
            })
            .collect::<io::Result<Vec<u32>>>()?;

        if 0 != digits.len() % 2 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "odd number of hex digits",
            ));
        }

        Ok(HexBytes(
            digits
                .chunks(2)
                .map(|pair| (pair[0] << 4 | pair[1]) as u8)
                .collect(),
        ))
    }
}

fn to_hex(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(s, "{:02X}", b);
    }
    s
}

#[cfg(test)]
mod test {
    use super::*;

    fn static_probe() -> Probe {
        let config: ProbeConfig = toml::from_str(
            r#"
[server]
sut_computer_name = "ex01"
domain = "contoso.com"
user = "user1"
password = "hunter2"
mailbox_url = "https://ex01/mapi/emsmdb/"
address_book_url = "https://ex01/mapi/nspi/"
"#,
        )
        .unwrap();
        Probe::new(config).unwrap()
    }

    #[test]
    fn connections_never_share_request_ids() {
        let mut probe = static_probe();
        let address_book =
            probe.connection(ServerEndpoint::AddressBook).unwrap();
        let mailbox = probe.connection(ServerEndpoint::Mailbox).unwrap();

        assert_eq!("https://ex01/mapi/nspi/", address_book.url());
        assert_eq!("https://ex01/mapi/emsmdb/", mailbox.url());
        assert_ne!(address_book.client().guid(), mailbox.client().guid());

        let mut address_book_client = address_book.client().clone();
        let mut mailbox_client = mailbox.client().clone();
        let address_book_ids = (0..3)
            .map(|_| address_book_client.next_request_id().to_string())
            .collect::<Vec<_>>();
        let first_mailbox_id = mailbox_client.next_request_id().to_string();
        assert!(
            !address_book_ids.contains(&first_mailbox_id),
            "{} reused from {:?}",
            first_mailbox_id,
            address_book_ids
        );
    }

    #[test]
    fn hex_bytes() {
        assert_eq!(
            HexBytes(vec![0x01, 0xAB, 0xff]),
            "01ab FF".parse::<HexBytes>().unwrap()
        );
        assert_eq!(HexBytes(vec![]), "".parse::<HexBytes>().unwrap());
        assert!("abc".parse::<HexBytes>().is_err());
        assert!("zz".parse::<HexBytes>().is_err());
        assert_eq!("01ABFF", to_hex(&[0x01, 0xAB, 0xFF]));
    }
}
