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

//! Exercises sessions against a scripted server.

use super::body::*;
use super::envelope::{MetaTag, ResponseEnvelope};
use super::headers::*;
use super::request_type::{RequestType, ServerEndpoint};
use super::session::*;
use super::stat::Stat;
use super::transport::{HttpResponse, ScriptedTransport};
use super::wire::{DecodeError, Guid};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

const GUID: Guid = Guid([0x42; 16]);

fn connection(endpoint: ServerEndpoint) -> Connection<ScriptedTransport> {
    crate::init_test_log();
    Connection::new(
        ScriptedTransport::new(),
        endpoint,
        format!("https://ex.contoso.com/mapi/{}/", endpoint),
        ClientInstance::with_guid(GUID),
        LogPrefix::new(endpoint.to_string()),
    )
}

fn envelope_bytes(body: Vec<u8>) -> Vec<u8> {
    let mut envelope = ResponseEnvelope {
        meta_tags: vec![MetaTag::Processing, MetaTag::Done],
        body,
        ..ResponseEnvelope::default()
    };
    envelope
        .additional_headers
        .insert(X_ELAPSED_TIME.to_owned(), "42".to_owned());
    envelope
        .additional_headers
        .insert(X_START_TIME.to_owned(), "2024-01-01T00:00:00Z".to_owned());

    let mut out = Vec::new();
    envelope.write_to(&mut out).unwrap();
    out
}

fn http_response(
    request_type: RequestType,
    response_code: u32,
    body: Vec<u8>,
    set_cookies: &[&str],
) -> HttpResponse {
    let mut headers = Headers::new();
    headers.push(X_RESPONSE_CODE, response_code.to_string());
    headers.push(
        CONTENT_TYPE,
        if 0 == response_code {
            MAPI_HTTP_CONTENT_TYPE
        } else {
            FAILURE_CONTENT_TYPE
        },
    );
    headers.push(X_SERVER_APPLICATION, "Exchange/15.01.2507.006");
    headers.push(X_PENDING_PERIOD, "15000");
    headers.push(X_EXPIRATION_INFO, "900000");
    headers.push(X_REQUEST_TYPE, request_type.as_str());
    for &cookie in set_cookies {
        headers.push(SET_COOKIE, cookie);
    }

    HttpResponse {
        status: 200,
        headers,
        body: if 0 == response_code {
            envelope_bytes(body)
        } else {
            body
        },
    }
}

fn connect_success() -> Vec<u8> {
    ConnectSuccessResponseBody {
        error_code: 0,
        polls_max: 60000,
        retry_count: 3,
        retry_delay: 1000,
        dn_prefix: "/o=Contoso".to_owned(),
        display_name: "User One".to_owned(),
        auxiliary_buffer: vec![],
    }
    .serialize()
    .unwrap()
}

fn empty_success(request_type: RequestType) -> Vec<u8> {
    match request_type {
        RequestType::Execute => ExecuteSuccessResponseBody {
            error_code: 0,
            flags: 0,
            rop_buffer: vec![],
            auxiliary_buffer: vec![],
        }
        .serialize(),
        RequestType::Disconnect => DisconnectSuccessResponseBody {
            error_code: 0,
            auxiliary_buffer: vec![],
        }
        .serialize(),
        RequestType::Unbind => UnbindSuccessResponseBody {
            error_code: 0,
            auxiliary_buffer: vec![],
        }
        .serialize(),
        RequestType::Bind => BindSuccessResponseBody {
            error_code: 0,
            server_guid: Guid([7; 16]),
            auxiliary_buffer: vec![],
        }
        .serialize(),
        _ => panic!("No canned body for {}", request_type),
    }
    .unwrap()
}

fn sent_header(
    conn: &mut Connection<ScriptedTransport>,
    ix: usize,
    name: &str,
) -> Option<String> {
    conn.transport_mut().requests[ix]
        .headers
        .get(name)
        .map(str::to_owned)
}

#[test]
fn mailbox_session_lifecycle() {
    let mut session = MailboxSession::new(connection(ServerEndpoint::Mailbox));
    {
        let t = session.connection.transport_mut();
        t.push(http_response(
            RequestType::Connect,
            0,
            connect_success(),
            &["MapiContext=ctx1; path=/mapi/emsmdb", "MapiSequence=1"],
        ));
        t.push(http_response(
            RequestType::Execute,
            0,
            empty_success(RequestType::Execute),
            &["MapiSequence=2"],
        ));
        t.push(http_response(
            RequestType::Disconnect,
            0,
            empty_success(RequestType::Disconnect),
            &[],
        ));
    }

    assert!(!session.is_active());
    let connect = session
        .connect(&ConnectRequestBody::new("/o=Contoso/cn=user1".to_owned()))
        .unwrap();
    assert_eq!(60000, connect.success().unwrap().polls_max);
    assert!(connect.deviations.is_empty(), "{:?}", connect.deviations);
    assert!(session.is_active());
    assert_eq!(
        Some("MapiContext=ctx1; MapiSequence=1".to_owned()),
        session.connection.cookies().header_value()
    );

    let execute = session.execute(&ExecuteRequestBody::new(vec![])).unwrap();
    assert_matches!(Outcome::Success(_), execute.outcome);
    assert_eq!(Some("2"), session.connection.cookies().get("MapiSequence"));

    session.disconnect(&DisconnectRequestBody::default()).unwrap();
    assert!(!session.is_active());
    assert!(session.connection.cookies().is_empty());

    let conn = &mut session.connection;
    assert_eq!(3, conn.transport_mut().requests.len());

    assert_eq!(
        Some("Connect".to_owned()),
        sent_header(conn, 0, X_REQUEST_TYPE)
    );
    assert_eq!(None, sent_header(conn, 0, COOKIE));
    assert_eq!(
        Some("{42424242-4242-4242-4242-424242424242}:1".to_owned()),
        sent_header(conn, 0, X_CLIENT_INFO)
    );
    assert_eq!(
        Some(MAPI_HTTP_CONTENT_TYPE.to_owned()),
        sent_header(conn, 0, CONTENT_TYPE)
    );
    assert_eq!(
        Some(DEFAULT_CLIENT_APPLICATION.to_owned()),
        sent_header(conn, 0, X_CLIENT_APPLICATION)
    );

    assert_eq!(
        Some("MapiContext=ctx1; MapiSequence=1".to_owned()),
        sent_header(conn, 1, COOKIE)
    );
    assert_eq!(
        Some("{42424242-4242-4242-4242-424242424242}:2".to_owned()),
        sent_header(conn, 1, X_REQUEST_ID)
    );
    assert_eq!(
        Some("MapiContext=ctx1; MapiSequence=2".to_owned()),
        sent_header(conn, 2, COOKIE)
    );
    assert_eq!(3, conn.client().counter());
}

#[test]
fn session_calls_refused_without_session() {
    let mut session = MailboxSession::new(connection(ServerEndpoint::Mailbox));
    assert_matches!(
        Err(Error::NoSession(RequestType::Execute)),
        session.execute(&ExecuteRequestBody::new(vec![]))
    );
    assert_matches!(
        Err(Error::NoSession(RequestType::Disconnect)),
        session.disconnect(&DisconnectRequestBody::default())
    );
    assert!(session.connection.transport_mut().requests.is_empty());
    assert_eq!(0, session.connection.client().counter());
}

#[test]
fn raw_call_ignores_session_state() {
    let mut conn = connection(ServerEndpoint::Mailbox);
    conn.transport_mut().push(http_response(
        RequestType::Execute,
        0,
        FailureResponseBody {
            status_code: 0x80040111,
            auxiliary_buffer: vec![],
        }
        .serialize()
        .unwrap(),
        &[],
    ));

    let response = conn.call(&ExecuteRequestBody::new(vec![])).unwrap();
    assert_eq!(
        Outcome::Failure(FailureResponseBody {
            status_code: 0x80040111,
            auxiliary_buffer: vec![],
        }),
        response.outcome
    );
    assert_matches!(
        Err(Error::RequestFailed {
            request_type: RequestType::Execute,
            ..
        }),
        response.into_success()
    );
    assert_eq!(SessionState::NoSession, conn.state());
}

#[test]
fn request_type_checked_against_endpoint() {
    let mut conn = connection(ServerEndpoint::AddressBook);
    assert_matches!(
        Err(Error::WrongEndpoint {
            request_type: RequestType::Connect,
            endpoint: ServerEndpoint::AddressBook,
        }),
        conn.call(&ConnectRequestBody::new(String::new()))
    );
    assert!(conn.transport_mut().requests.is_empty());
}

#[test]
fn nonzero_response_code_has_no_body() {
    let mut conn = connection(ServerEndpoint::Mailbox);
    conn.transport_mut().push(http_response(
        RequestType::Connect,
        4,
        b"<html>Invalid request</html>".to_vec(),
        &["MapiContext=nope"],
    ));

    let response = conn
        .call(&ConnectRequestBody::new("/o=Contoso".to_owned()))
        .unwrap();
    assert_eq!(4, response.response_code());
    assert_eq!(Outcome::NoBody, response.outcome);
    assert_eq!(
        Some("<html>Invalid request</html>"),
        response.envelope.failure_text.as_deref()
    );
    assert!(response.deviations.is_empty(), "{:?}", response.deviations);
    assert_eq!(SessionState::NoSession, conn.state());
    assert!(conn.cookies().is_empty());
}

#[test]
fn failed_connect_does_not_establish() {
    let mut conn = connection(ServerEndpoint::Mailbox);
    let body = ConnectSuccessResponseBody {
        error_code: 0x3F0,
        polls_max: 0,
        retry_count: 0,
        retry_delay: 0,
        dn_prefix: String::new(),
        display_name: String::new(),
        auxiliary_buffer: vec![],
    };
    conn.transport_mut().push(http_response(
        RequestType::Connect,
        0,
        body.serialize().unwrap(),
        &["MapiContext=ctx"],
    ));

    let response = conn
        .call(&ConnectRequestBody::new("/o=Contoso".to_owned()))
        .unwrap();
    assert_eq!(0x3F0, response.success().unwrap().error_code);
    assert_eq!(SessionState::NoSession, conn.state());
    assert!(conn.cookies().is_empty());
}

#[test]
fn ping_is_read_only() {
    let mut session =
        AddressBookSession::new(connection(ServerEndpoint::AddressBook));
    {
        let t = session.connection.transport_mut();
        t.push(http_response(
            RequestType::Bind,
            0,
            empty_success(RequestType::Bind),
            &["MapiContext=ab"],
        ));
        t.push(http_response(
            RequestType::Ping,
            0,
            vec![],
            &["MapiContext=changed"],
        ));
        t.push(http_response(RequestType::Ping, 0, vec![0], &[]));
    }

    session
        .bind(&BindRequestBody {
            flags: 0,
            state: Some(Stat::beginning(1252, 0x409)),
            auxiliary_buffer: vec![],
        })
        .unwrap();

    let ping = session.ping().unwrap();
    assert_eq!(Outcome::Success(()), ping.outcome);
    assert_eq!(Some("ab"), session.connection.cookies().get("MapiContext"));
    assert_eq!(
        Some("MapiContext=ab".to_owned()),
        sent_header(&mut session.connection, 1, COOKIE)
    );
    assert_eq!(
        Some("PING".to_owned()),
        sent_header(&mut session.connection, 1, X_REQUEST_TYPE)
    );
    assert!(session.connection.transport_mut().requests[1].body.is_empty());

    assert_matches!(
        Err(Error::Decode(DecodeError::UnexpectedBody(RequestType::Ping, 1))),
        session.ping()
    );
}

#[test]
fn address_book_query_without_state() {
    let mut session =
        AddressBookSession::new(connection(ServerEndpoint::AddressBook));
    let rows = QueryRowsSuccessResponseBody {
        error_code: 0,
        state: None,
        columns_and_rows: None,
        auxiliary_buffer: vec![],
    };
    {
        let t = session.connection.transport_mut();
        t.push(http_response(
            RequestType::Bind,
            0,
            empty_success(RequestType::Bind),
            &["MapiContext=ab"],
        ));
        t.push(http_response(
            RequestType::QueryRows,
            0,
            rows.serialize().unwrap(),
            &[],
        ));
        t.push(http_response(
            RequestType::Unbind,
            0,
            empty_success(RequestType::Unbind),
            &[],
        ));
    }

    let bind = session
        .bind(&BindRequestBody {
            flags: 0,
            state: None,
            auxiliary_buffer: vec![],
        })
        .unwrap()
        .into_success()
        .unwrap();
    assert_eq!(Guid([7; 16]), bind.server_guid);

    let response = session
        .query_rows(&QueryRowsRequestBody {
            flags: 0,
            state: None,
            explicit_table: vec![],
            row_count: 10,
            columns: None,
            auxiliary_buffer: vec![],
        })
        .unwrap();
    let result = response.success().unwrap();
    assert_eq!(None, result.state);
    assert_eq!(None, result.columns_and_rows);

    session.unbind(&UnbindRequestBody::default()).unwrap();
    assert!(!session.is_active());
}

#[test]
fn additional_headers_reach_caller() {
    let mut session =
        AddressBookSession::new(connection(ServerEndpoint::AddressBook));
    session.connection.transport_mut().push(http_response(
        RequestType::Ping,
        0,
        vec![],
        &[],
    ));

    let response = session.ping().unwrap();
    assert_eq!(Some("42"), response.envelope.additional_header(X_ELAPSED_TIME));
    assert_eq!(
        Some("2024-01-01T00:00:00Z"),
        response.envelope.additional_header(X_START_TIME)
    );
    assert_eq!(DEFAULT_PENDING_PERIOD_MS, response.pending_period_ms());
}

#[test]
fn deviations_are_reported() {
    let mut conn = connection(ServerEndpoint::Mailbox);
    let mut response = http_response(RequestType::Ping, 0, vec![], &[]);
    response.headers.set(X_SERVER_APPLICATION, "IIS/10.0");
    response.headers.push(X_DEVICE_INFO, "leak");
    conn.transport_mut().push(response);

    let response = conn.ping().unwrap();
    assert_eq!(
        vec![X_SERVER_APPLICATION, X_DEVICE_INFO],
        response
            .deviations
            .iter()
            .map(|d| d.header)
            .collect::<Vec<_>>()
    );
}

#[test]
fn transport_level_failures() {
    let mut conn = connection(ServerEndpoint::Mailbox);
    conn.transport_mut().push(HttpResponse {
        status: 401,
        headers: Headers::new(),
        body: vec![],
    });
    assert_matches!(Err(Error::HttpStatus { status: 401, .. }), conn.ping());

    let mut bad_code = http_response(RequestType::Ping, 0, vec![], &[]);
    bad_code.headers.set(X_RESPONSE_CODE, "zero");
    conn.transport_mut().push(bad_code);
    assert_matches!(
        Err(Error::BadResponseHeader {
            name: "X-ResponseCode",
            ..
        }),
        conn.ping()
    );

    let mut truncated =
        http_response(RequestType::Connect, 0, connect_success(), &[]);
    let len = truncated.body.len();
    truncated.body.truncate(len - 1);
    conn.transport_mut().push(truncated);
    assert_matches!(
        Err(Error::Decode(DecodeError::Truncated { .. })),
        conn.call(&ConnectRequestBody::new("/o=Contoso".to_owned()))
    );
    assert_eq!(SessionState::NoSession, conn.state());

    // Script exhausted
    assert_matches!(Err(Error::Io(_)), conn.ping());
}
