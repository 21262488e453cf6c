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

//! Discovery of the mailbox and address book endpoint URLs.
//!
//! A POX Autodiscover request carrying `X-MapiHttpCapability` gets back
//! `mapiHttp` protocol sections whose `MailStore` and `AddressBook` elements
//! hold the URLs. The result is resolved once and cached; there is no
//! automatic re-resolution when an endpoint later fails.

use log::{debug, info};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::headers::{Headers, CONTENT_TYPE};
use super::request_type::ServerEndpoint;
use super::transport::{HttpRequest, Transport};
use crate::support::error::Error;

const REQUEST_SCHEMA: &str =
    "http://schemas.microsoft.com/exchange/autodiscover/outlook/requestschema/2006";
const RESPONSE_SCHEMA: &str =
    "http://schemas.microsoft.com/exchange/autodiscover/outlook/responseschema/2006a";

/// Placeholder in the Autodiscover URL format replaced by the server name.
pub const SERVER_NAME_PLACEHOLDER: &str = "[ServerName]";
pub const DEFAULT_URL_FORMAT: &str =
    "https://[ServerName]/autodiscover/autodiscover.xml";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointUrls {
    pub mailbox: String,
    pub address_book: String,
}

impl EndpointUrls {
    pub fn url(&self, endpoint: ServerEndpoint) -> &str {
        match endpoint {
            ServerEndpoint::Mailbox => &self.mailbox,
            ServerEndpoint::AddressBook => &self.address_book,
        }
    }
}

pub trait EndpointResolver {
    fn resolve(&mut self) -> Result<EndpointUrls, Error>;
}

impl<R: EndpointResolver + ?Sized> EndpointResolver for Box<R> {
    fn resolve(&mut self) -> Result<EndpointUrls, Error> {
        (**self).resolve()
    }
}

/// Endpoints fixed by configuration.
pub struct StaticEndpoints(pub EndpointUrls);

impl EndpointResolver for StaticEndpoints {
    fn resolve(&mut self) -> Result<EndpointUrls, Error> {
        Ok(self.0.clone())
    }
}

pub struct AutodiscoverResolver<T> {
    transport: T,
    url: String,
    user: String,
    domain: String,
}

impl<T: Transport> AutodiscoverResolver<T> {
    /// `url_format` is an Autodiscover URL with `[ServerName]` standing in
    /// for `server`.
    pub fn new(
        transport: T,
        url_format: &str,
        server: &str,
        user: String,
        domain: String,
    ) -> Self {
        AutodiscoverResolver {
            transport,
            url: url_format.replace(SERVER_NAME_PLACEHOLDER, server),
            user,
            domain,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<T: Transport> EndpointResolver for AutodiscoverResolver<T> {
    fn resolve(&mut self) -> Result<EndpointUrls, Error> {
        let email = format!("{}@{}", self.user, self.domain);
        let mut headers = Headers::new();
        headers.push(CONTENT_TYPE, "text/xml");
        headers.push("Accept", "*/*");
        headers.push("X-MapiHttpCapability", "2");
        headers.push("X-AnchorMailbox", email.clone());

        debug!("Autodiscover for {} via {}", email, self.url);
        let response = self.transport.post(&HttpRequest {
            url: self.url.clone(),
            headers,
            body: request_xml(&email).into_bytes(),
        })?;

        if 200 != response.status {
            return Err(Error::HttpStatus {
                status: response.status,
                url: self.url.clone(),
            });
        }

        let xml = String::from_utf8_lossy(&response.body);
        let urls = parse_response(&xml)?;
        info!(
            "Autodiscover: mailbox at {}, address book at {}",
            urls.mailbox, urls.address_book
        );
        Ok(urls)
    }
}

/// Resolves endpoints on first use and remembers them.
pub struct EndpointCache<R> {
    resolver: R,
    cached: Option<EndpointUrls>,
}

impl<R: EndpointResolver> EndpointCache<R> {
    pub fn new(resolver: R) -> Self {
        EndpointCache {
            resolver,
            cached: None,
        }
    }

    pub fn get(&mut self) -> Result<&EndpointUrls, Error> {
        let urls = match self.cached.take() {
            Some(urls) => urls,
            None => self.resolver.resolve()?,
        };
        Ok(self.cached.insert(urls))
    }

    pub fn url(&mut self, endpoint: ServerEndpoint) -> Result<String, Error> {
        self.get().map(|urls| urls.url(endpoint).to_owned())
    }
}

pub fn request_xml(email: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <Autodiscover xmlns=\"{}\"><Request>\
         <EMailAddress>{}</EMailAddress>\
         <AcceptableResponseSchema>{}</AcceptableResponseSchema>\
         </Request></Autodiscover>",
        REQUEST_SCHEMA,
        escape(email),
        RESPONSE_SCHEMA,
    )
}

#[derive(Default)]
struct UrlPair {
    internal: Option<String>,
    external: Option<String>,
}

impl UrlPair {
    fn set(&mut self, leaf: &str, text: &str) {
        let slot = match leaf {
            "InternalUrl" => &mut self.internal,
            "ExternalUrl" => &mut self.external,
            _ => return,
        };

        if slot.is_none() {
            *slot = Some(text.to_owned());
        }
    }

    fn take(self) -> Option<String> {
        self.internal.or(self.external)
    }
}

/// Extract the endpoint URLs from an Autodiscover response.
///
/// The first `MailStore` and `AddressBook` elements win. Each prefers its
/// `InternalUrl`, falling back to `ExternalUrl`.
pub fn parse_response(xml: &str) -> Result<EndpointUrls, Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path = Vec::<String>::new();
    let mut mailbox = UrlPair::default();
    let mut address_book = UrlPair::default();
    let mut error_message = None::<String>;

    loop {
        match reader.read_event()? {
            Event::Start(e) => path.push(
                String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            ),
            Event::End(_) => {
                path.pop();
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                if let [.., parent, leaf] = &path[..] {
                    match parent.as_str() {
                        "MailStore" => mailbox.set(leaf, &text),
                        "AddressBook" => address_book.set(leaf, &text),
                        "Error" if leaf == "Message" => {
                            error_message = Some(text.into_owned())
                        }
                        _ => (),
                    }
                }
            }
            Event::Eof => break,
            _ => (),
        }
    }

    match (mailbox.take(), address_book.take(), error_message) {
        (Some(mailbox), Some(address_book), _) => Ok(EndpointUrls {
            mailbox,
            address_book,
        }),
        (None, _, Some(message)) => Err(Error::Autodiscover(message)),
        (None, _, None) => Err(Error::Autodiscover(
            "response has no MailStore URL".to_owned(),
        )),
        (_, None, _) => Err(Error::Autodiscover(
            "response has no AddressBook URL".to_owned(),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mapihttp::transport::{HttpResponse, ScriptedTransport};

    const RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Autodiscover xmlns="http://schemas.microsoft.com/exchange/autodiscover/responseschema/2006">
  <Response xmlns="http://schemas.microsoft.com/exchange/autodiscover/outlook/responseschema/2006a">
    <User><DisplayName>User One</DisplayName></User>
    <Account>
      <Protocol Type="mapiHttp" Version="1">
        <MailStore>
          <InternalUrl>https://ex.contoso.com/mapi/emsmdb/?MailboxId=a@contoso.com</InternalUrl>
          <ExternalUrl>https://mail.contoso.com/mapi/emsmdb/?MailboxId=a@contoso.com</ExternalUrl>
        </MailStore>
        <AddressBook>
          <ExternalUrl>https://mail.contoso.com/mapi/nspi/?MailboxId=a@contoso.com&amp;x=1</ExternalUrl>
        </AddressBook>
      </Protocol>
    </Account>
  </Response>
</Autodiscover>"#;

    #[test]
    fn parse_mapi_http_protocol() {
        let urls = parse_response(RESPONSE).unwrap();
        assert_eq!(
            "https://ex.contoso.com/mapi/emsmdb/?MailboxId=a@contoso.com",
            urls.mailbox
        );
        assert_eq!(
            "https://mail.contoso.com/mapi/nspi/?MailboxId=a@contoso.com&x=1",
            urls.address_book
        );
        assert_eq!(urls.address_book, urls.url(ServerEndpoint::AddressBook));
    }

    #[test]
    fn parse_error_response() {
        let xml = r#"<Autodiscover><Response><Error>
            <ErrorCode>500</ErrorCode><Message>The e-mail address cannot be found.</Message>
            </Error></Response></Autodiscover>"#;
        match parse_response(xml) {
            Err(Error::Autodiscover(m)) => assert!(m.contains("cannot be found")),
            r => panic!("Unexpected result: {:?}", r),
        }

        assert_matches!(
            Err(Error::Autodiscover(_)),
            parse_response("<Autodiscover><MailStore><InternalUrl>x</InternalUrl></MailStore></Autodiscover>")
        );
    }

    #[test]
    fn resolve_once() {
        let mut transport = ScriptedTransport::new();
        transport.push(HttpResponse {
            status: 200,
            headers: Headers::new(),
            body: RESPONSE.as_bytes().to_vec(),
        });

        let resolver = AutodiscoverResolver::new(
            &mut transport,
            DEFAULT_URL_FORMAT,
            "ex.contoso.com",
            "a".to_owned(),
            "contoso.com".to_owned(),
        );
        assert_eq!(
            "https://ex.contoso.com/autodiscover/autodiscover.xml",
            resolver.url()
        );

        let mut cache = EndpointCache::new(resolver);
        let first = cache.get().unwrap().clone();
        // A second lookup must not hit the (now exhausted) transport
        assert_eq!(first, *cache.get().unwrap());
        drop(cache);

        assert_eq!(1, transport.requests.len());
        let request = &transport.requests[0];
        assert_eq!(Some("2"), request.headers.get("X-MapiHttpCapability"));
        assert_eq!(
            Some("a@contoso.com"),
            request.headers.get("X-AnchorMailbox")
        );
        assert_eq!(Some("text/xml"), request.headers.get(CONTENT_TYPE));
        let body = String::from_utf8(request.body.clone()).unwrap();
        assert!(body.contains("<EMailAddress>a@contoso.com</EMailAddress>"));
    }

    #[test]
    fn autodiscover_http_failure() {
        let mut transport = ScriptedTransport::new();
        transport.push(HttpResponse {
            status: 401,
            headers: Headers::new(),
            body: vec![],
        });

        let mut resolver = AutodiscoverResolver::new(
            &mut transport,
            "https://[ServerName]/ad.xml",
            "srv",
            "a".to_owned(),
            "b".to_owned(),
        );
        assert_matches!(
            Err(Error::HttpStatus { status: 401, .. }),
            resolver.resolve()
        );
    }
}
