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

//! The subset of `sysexits.h` used as the exit status of a probe run.
//!
//! A script driving the probe can tell a server which could not be reached
//! (`EX_UNAVAILABLE`, `EX_NOHOST`) apart from one which answered but broke
//! the protocol (`EX_PROTOCOL`).

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Sysexit(pub i32);

pub const EX_USAGE: Sysexit = Sysexit(64);
pub const EX_NOHOST: Sysexit = Sysexit(68);
pub const EX_UNAVAILABLE: Sysexit = Sysexit(69);
pub const EX_SOFTWARE: Sysexit = Sysexit(70);
pub const EX_IOERR: Sysexit = Sysexit(74);
pub const EX_PROTOCOL: Sysexit = Sysexit(76);
pub const EX_CONFIG: Sysexit = Sysexit(78);

impl Sysexit {
    pub fn name(self) -> &'static str {
        match self {
            EX_USAGE => "EX_USAGE",
            EX_NOHOST => "EX_NOHOST",
            EX_UNAVAILABLE => "EX_UNAVAILABLE",
            EX_SOFTWARE => "EX_SOFTWARE",
            EX_IOERR => "EX_IOERR",
            EX_PROTOCOL => "EX_PROTOCOL",
            EX_CONFIG => "EX_CONFIG",
            _ => "EX_?",
        }
    }

    pub fn exit(self) -> ! {
        log::logger().flush();
        std::process::exit(self.0)
    }
}

impl fmt::Display for Sysexit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}
