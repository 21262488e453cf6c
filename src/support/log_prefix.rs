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

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex};

/// Tracks text that should be included in at the start of every log statement.
///
/// Clones of a `LogPrefix` share the same underlying data.
#[derive(Clone)]
pub struct LogPrefix {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Clone)]
struct Inner {
    endpoint: String,
    user: Option<String>,
    client: Option<String>,
    in_session: bool,
}

impl LogPrefix {
    pub fn new(endpoint: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                endpoint,
                user: None,
                client: None,
                in_session: false,
            })),
        }
    }

    pub fn deep_clone(&self) -> Self {
        let inner = self.lock().clone();
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn set_user(&self, user: String) {
        self.lock().user = Some(sanitise(user));
    }

    pub fn set_client(&self, client: String) {
        self.lock().client = Some(sanitise(client));
    }

    pub fn set_in_session(&self, in_session: bool) {
        self.lock().in_session = in_session;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.lock();
        write!(f, "{}", inner.endpoint)?;
        if inner.user.is_some() || inner.client.is_some() || inner.in_session
        {
            write!(f, "[")?;
            let mut first = true;
            if let Some(ref user) = inner.user {
                write!(f, "{}", user)?;
                first = false;
            }

            if let Some(ref client) = inner.client {
                if !mem::take(&mut first) {
                    write!(f, " ")?;
                }
                write!(f, "client={}", client)?;
            }

            if inner.in_session {
                if !mem::take(&mut first) {
                    write!(f, " ")?;
                }
                write!(f, "session")?;
            }
            write!(f, "]")?;
        }

        Ok(())
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}
