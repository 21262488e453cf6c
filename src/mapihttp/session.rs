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

//! Driving request/response exchanges against one endpoint.
//!
//! A `Connection` owns everything a session needs: the transport, the
//! client instance that numbers requests, and the cookie jar carrying the
//! Session Context. Nothing is shared between connections, and every call
//! takes `&mut self`, so a session has at most one request in flight.
//!
//! ```text
//! [NoSession] --Connect/Bind success--> [Active]
//! [Active]    --other request types-->  [Active]
//! [Active]    --Disconnect/Unbind success--> [NoSession]
//! ```

use log::{debug, info, warn};

use super::body::*;
use super::conformance::{self, Deviation};
use super::cookies::CookieJar;
use super::envelope::{self, ResponseEnvelope};
use super::headers::*;
use super::request_type::{CookiePolicy, RequestType, ServerEndpoint};
use super::transport::{HttpRequest, Transport};
use super::wire::DecodeError;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Active,
}

/// What came back for a request, after the envelope was unwrapped.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<B> {
    /// `X-ResponseCode` and `StatusCode` were both 0.
    Success(B),
    /// `X-ResponseCode` was 0 but `StatusCode` was not.
    Failure(FailureResponseBody),
    /// `X-ResponseCode` was nonzero, so there is no body.
    NoBody,
}

#[derive(Clone, Debug)]
pub struct Response<B> {
    pub request_type: RequestType,
    pub request_id: RequestId,
    pub headers: Headers,
    pub envelope: ResponseEnvelope,
    pub outcome: Outcome<B>,
    pub deviations: Vec<Deviation>,
}

impl<B> Response<B> {
    pub fn response_code(&self) -> u32 {
        self.envelope.response_code
    }

    pub fn success(&self) -> Option<&B> {
        match self.outcome {
            Outcome::Success(ref b) => Some(b),
            _ => None,
        }
    }

    /// The milliseconds between PENDING keep-alives the server announced.
    pub fn pending_period_ms(&self) -> u32 {
        conformance::pending_period_ms(&self.headers)
    }

    /// Convert a failure outcome into an `Error`.
    pub fn into_success(self) -> Result<B, Error> {
        match self.outcome {
            Outcome::Success(b) => Ok(b),
            Outcome::Failure(f) => Err(Error::RequestFailed {
                request_type: self.request_type,
                detail: format!("StatusCode {}", f.status_code),
            }),
            Outcome::NoBody => Err(Error::RequestFailed {
                request_type: self.request_type,
                detail: format!(
                    "X-ResponseCode {}{}",
                    self.envelope.response_code,
                    self.envelope
                        .failure_text
                        .as_deref()
                        .map(|t| format!(": {}", t.trim()))
                        .unwrap_or_default(),
                ),
            }),
        }
    }
}

pub struct Connection<T> {
    transport: T,
    endpoint: ServerEndpoint,
    url: String,
    client: ClientInstance,
    client_application: String,
    cookies: CookieJar,
    state: SessionState,
    log_prefix: LogPrefix,
}

impl<T: Transport> Connection<T> {
    pub fn new(
        transport: T,
        endpoint: ServerEndpoint,
        url: String,
        client: ClientInstance,
        log_prefix: LogPrefix,
    ) -> Self {
        log_prefix.set_client(client.guid().to_string());
        Connection {
            transport,
            endpoint,
            url,
            client,
            client_application: DEFAULT_CLIENT_APPLICATION.to_owned(),
            cookies: CookieJar::new(),
            state: SessionState::NoSession,
            log_prefix,
        }
    }

    pub fn set_client_application(&mut self, client_application: String) {
        self.client_application = client_application;
    }

    pub fn endpoint(&self) -> ServerEndpoint {
        self.endpoint
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn client(&self) -> &ClientInstance {
        &self.client
    }

    pub fn log_prefix(&self) -> &LogPrefix {
        &self.log_prefix
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send `request` regardless of session state.
    ///
    /// This is the raw form, which lets a probe send requests the server is
    /// expected to reject. Use `call_in_session` to refuse requests that
    /// cannot succeed without a Session Context.
    pub fn call<Q: RequestBody>(
        &mut self,
        request: &Q,
    ) -> Result<Response<Q::Response>, Error> {
        let body = request.serialize()?;
        let (request_id, headers, envelope) =
            self.exchange(Q::REQUEST_TYPE, body)?;

        let outcome = if envelope.is_success() {
            match parse_response_body::<Q::Response>(&envelope.body)? {
                ParsedBody::Success(b) => Outcome::Success(b),
                ParsedBody::Failure(f) => Outcome::Failure(f),
            }
        } else {
            Outcome::NoBody
        };

        self.update_session(Q::REQUEST_TYPE, &headers, &outcome);
        let deviations = self.check(Q::REQUEST_TYPE, &headers, &envelope);

        Ok(Response {
            request_type: Q::REQUEST_TYPE,
            request_id,
            headers,
            envelope,
            outcome,
            deviations,
        })
    }

    /// Like `call`, but fail without sending anything if the request type
    /// needs a Session Context and there is none.
    pub fn call_in_session<Q: RequestBody>(
        &mut self,
        request: &Q,
    ) -> Result<Response<Q::Response>, Error> {
        if Q::REQUEST_TYPE.requires_session()
            && SessionState::Active != self.state
        {
            return Err(Error::NoSession(Q::REQUEST_TYPE));
        }

        self.call(request)
    }

    /// Send a PING, which has no body in either direction and does not
    /// touch the Session Context.
    pub fn ping(&mut self) -> Result<Response<()>, Error> {
        let (request_id, headers, envelope) =
            self.exchange(RequestType::Ping, Vec::new())?;

        let outcome = if envelope.is_success() {
            if !envelope.body.is_empty() {
                return Err(DecodeError::UnexpectedBody(
                    RequestType::Ping,
                    envelope.body.len(),
                )
                .into());
            }
            Outcome::Success(())
        } else {
            Outcome::NoBody
        };

        let deviations = self.check(RequestType::Ping, &headers, &envelope);
        Ok(Response {
            request_type: RequestType::Ping,
            request_id,
            headers,
            envelope,
            outcome,
            deviations,
        })
    }

    fn exchange(
        &mut self,
        request_type: RequestType,
        body: Vec<u8>,
    ) -> Result<(RequestId, Headers, ResponseEnvelope), Error> {
        if !request_type.is_served_by(self.endpoint) {
            return Err(Error::WrongEndpoint {
                request_type,
                endpoint: self.endpoint,
            });
        }

        let request_id = self.client.next_request_id();
        let mut headers = Headers::new();
        headers.push(CONTENT_TYPE, MAPI_HTTP_CONTENT_TYPE);
        headers.push(ACCEPT, MAPI_HTTP_CONTENT_TYPE);
        headers.push(X_REQUEST_TYPE, request_type.as_str());
        headers.push(X_CLIENT_INFO, request_id.to_string());
        headers.push(X_REQUEST_ID, request_id.to_string());
        headers.push(X_CLIENT_APPLICATION, self.client_application.clone());
        if let Some(cookie) = self.cookies.header_value() {
            headers.push(COOKIE, cookie);
        }

        debug!(
            "{} {} request {} ({} bytes)",
            self.log_prefix,
            request_type,
            request_id.counter,
            body.len()
        );
        let response = self.transport.post(&HttpRequest {
            url: self.url.clone(),
            headers,
            body,
        })?;

        if 200 != response.status {
            warn!(
                "{} {} got HTTP status {}",
                self.log_prefix, request_type, response.status
            );
            return Err(Error::HttpStatus {
                status: response.status,
                url: self.url.clone(),
            });
        }

        let header_code = match response.headers.get(X_RESPONSE_CODE) {
            None => 0,
            Some(v) => envelope::parse_response_code(v).map_err(|_| {
                Error::BadResponseHeader {
                    name: X_RESPONSE_CODE,
                    value: v.to_owned(),
                }
            })?,
        };
        let envelope = ResponseEnvelope::parse(&response.body, header_code)?;

        debug!(
            "{} {} response: code {}, {} body bytes",
            self.log_prefix,
            request_type,
            envelope.response_code,
            envelope.body.len()
        );
        Ok((request_id, response.headers, envelope))
    }

    fn update_session<B: ResponseBody>(
        &mut self,
        request_type: RequestType,
        headers: &Headers,
        outcome: &Outcome<B>,
    ) {
        let policy = request_type.cookie_policy();
        let succeeded = match *outcome {
            Outcome::Success(ref b) => 0 == b.error_code(),
            _ => false,
        };

        match policy {
            CookiePolicy::Establish if succeeded => {
                self.cookies.apply(policy, headers);
                self.set_state(SessionState::Active);
            }
            CookiePolicy::Invalidate if succeeded => {
                self.cookies.apply(policy, headers);
                self.set_state(SessionState::NoSession);
            }
            CookiePolicy::Refresh if !matches!(*outcome, Outcome::NoBody) => {
                self.cookies.apply(policy, headers);
            }
            _ => (),
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if state != self.state {
            info!("{} session {:?} -> {:?}", self.log_prefix, self.state, state);
            self.state = state;
            self.log_prefix
                .set_in_session(SessionState::Active == state);
        }
    }

    fn check(
        &self,
        request_type: RequestType,
        headers: &Headers,
        envelope: &ResponseEnvelope,
    ) -> Vec<Deviation> {
        let deviations =
            conformance::check_response(request_type, headers, Some(envelope));
        for deviation in &deviations {
            warn!("{} {} {}", self.log_prefix, request_type, deviation);
        }
        deviations
    }
}

macro_rules! session_calls {
    ($($(#[$meta:meta])* $method:ident($request:ty);)*) => {
        $(
            $(#[$meta])*
            pub fn $method(
                &mut self,
                request: &$request,
            ) -> Result<
                Response<<$request as RequestBody>::Response>,
                Error,
            > {
                self.connection.call_in_session(request)
            }
        )*
    };
}

/// A session against the mailbox (EMSMDB) endpoint.
pub struct MailboxSession<T> {
    pub connection: Connection<T>,
}

impl<T: Transport> MailboxSession<T> {
    pub fn new(connection: Connection<T>) -> Self {
        MailboxSession { connection }
    }

    pub fn is_active(&self) -> bool {
        SessionState::Active == self.connection.state()
    }

    pub fn ping(&mut self) -> Result<Response<()>, Error> {
        self.connection.ping()
    }

    session_calls! {
        /// Establish the Session Context.
        connect(ConnectRequestBody);
        execute(ExecuteRequestBody);
        /// Tear down the Session Context.
        disconnect(DisconnectRequestBody);
        /// Wait for an event on the Session Context. The server holds the
        /// request open, sending PENDING keep-alives, until one arrives.
        notification_wait(NotificationWaitRequestBody);
    }
}

/// A session against the address book (NSPI) endpoint.
pub struct AddressBookSession<T> {
    pub connection: Connection<T>,
}

impl<T: Transport> AddressBookSession<T> {
    pub fn new(connection: Connection<T>) -> Self {
        AddressBookSession { connection }
    }

    pub fn is_active(&self) -> bool {
        SessionState::Active == self.connection.state()
    }

    pub fn ping(&mut self) -> Result<Response<()>, Error> {
        self.connection.ping()
    }

    session_calls! {
        bind(BindRequestBody);
        unbind(UnbindRequestBody);
        compare_min_ids(CompareMinIdsRequestBody);
        dn_to_min_id(DnToMinIdRequestBody);
        get_matches(GetMatchesRequestBody);
        get_prop_list(GetPropListRequestBody);
        get_props(GetPropsRequestBody);
        get_special_table(GetSpecialTableRequestBody);
        get_template_info(GetTemplateInfoRequestBody);
        mod_link_att(ModLinkAttRequestBody);
        mod_props(ModPropsRequestBody);
        query_columns(QueryColumnsRequestBody);
        query_rows(QueryRowsRequestBody);
        resolve_names(ResolveNamesRequestBody);
        resort_restriction(ResortRestrictionRequestBody);
        seek_entries(SeekEntriesRequestBody);
        update_stat(UpdateStatRequestBody);
        /// Look up the mailbox URL for a server DN. Needs no session.
        get_mailbox_url(GetMailboxUrlRequestBody);
        /// Look up the address book URL for a user DN. Needs no session.
        get_address_book_url(GetAddressBookUrlRequestBody);
    }
}
