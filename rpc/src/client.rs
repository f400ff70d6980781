// LNP Node: node running lightning network protocol and generalized lightning
// channels.
// Written in 2020-2022 by
//     Dr. Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the MIT License along with this software.
// If not, see <https://opensource.org/licenses/MIT>.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use serde_json::Value;

use crate::{Error, Id, Request, Response};

/// Blocking client for the node control socket.
///
/// Requests are written one per line and responses are read back in the
/// same order, so a single client may pipeline requests.
pub struct Client {
    next_id: u64,
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl Client {
    pub fn with(connect: impl AsRef<Path>) -> Result<Self, Error> {
        let connect = connect.as_ref();
        debug!("Connecting control socket {}", connect.display());
        let writer = UnixStream::connect(connect)?;
        let reader = BufReader::new(writer.try_clone()?);
        Ok(Client { next_id: 0, reader, writer })
    }

    /// Limits time spent waiting for a node response
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<(), Error> {
        self.writer.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Sends request without waiting for the response, returning request id
    pub fn send(&mut self, method: &str, params: Value) -> Result<Id, Error> {
        let id = Id::Num(self.next_id);
        self.next_id += 1;
        let request = Request::with(id.clone(), method, params);
        trace!("Sending {}", request);
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        Ok(id)
    }

    /// Reads next response from the socket
    pub fn recv(&mut self) -> Result<Response, Error> {
        let mut line = s!("");
        if self.reader.read_line(&mut line)? == 0 {
            return Err(Error::ConnectionClosed);
        }
        let response: Response = serde_json::from_str(line.trim_end())?;
        trace!("Received {:?}", response);
        Ok(response)
    }

    /// Performs request and returns the raw response envelope
    pub fn request(&mut self, method: &str, params: Value) -> Result<Response, Error> {
        debug!("Executing {}", method);
        let id = self.send(method, params)?;
        let response = self.recv()?;
        match response.id {
            Some(ref resp_id) if *resp_id != id => {
                Err(Error::IdMismatch(id, resp_id.clone()))
            }
            _ => Ok(response),
        }
    }

    /// Performs request and converts node failures into [`Error::Failure`]
    pub fn call(&mut self, method: &str, params: Value) -> Result<Value, Error> {
        self.request(method, params)?.into_result().map_err(Error::from)
    }

    /// Performs request, printing either the result as YAML or the failure
    pub fn report_response(&mut self, method: &str, params: Value) -> Result<(), Error> {
        match self.request(method, params)?.into_result() {
            Ok(Value::Null) => println!("{}", "Success".bright_green()),
            Ok(value) => {
                let yaml = serde_yaml::to_string(&value)
                    .map_err(|err| Error::Other(err.to_string()))?;
                println!("{}", yaml);
            }
            Err(failure) => {
                eprintln!("{}: {}", "Request failure".bright_red(), failure.to_string().red());
                return Err(failure.into());
            }
        }
        Ok(())
    }
}
