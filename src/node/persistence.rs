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

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Error;

/// File-backed storage of node documents inside the data directory.
///
/// Documents are JSON files replaced atomically: the new content is written
/// to a temporary file which is then renamed over the old one. Writes are
/// serialized, so concurrent stores of the same document never share the
/// temporary file.
#[derive(Debug)]
pub struct Persistence {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl Persistence {
    pub fn open(root: &Path) -> Result<Persistence, Error> {
        fs::create_dir_all(root).map_err(|err| Error::DataDir(root.to_owned(), err.into()))?;
        let meta = fs::metadata(root).map_err(|err| Error::DataDir(root.to_owned(), err.into()))?;
        if meta.permissions().readonly() {
            return Err(Error::DataDir(
                root.to_owned(),
                io::Error::new(io::ErrorKind::PermissionDenied, "data directory is read-only")
                    .into(),
            ));
        }
        Ok(Persistence { root: root.to_owned(), write_lock: Mutex::new(()) })
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Reads raw document contents, returning `None` if it was never stored
    pub fn read_raw(&self, path: &Path) -> Result<Option<Vec<u8>>, Error> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Storage(path.to_owned(), err.to_string())),
        }
    }

    pub fn write_raw(&self, path: &Path, data: &[u8]) -> Result<(), Error> {
        let tmp = path.with_extension("tmp");
        let _guard = self.write_lock.lock();
        let res = fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(data)?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&tmp, path));
        res.map_err(|err| Error::Storage(path.to_owned(), err.to_string()))
    }

    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, Error> {
        match self.read_raw(path)? {
            None => Ok(None),
            Some(data) => serde_json::from_slice(&data)
                .map(Some)
                .map_err(|err| Error::Storage(path.to_owned(), err.to_string())),
        }
    }

    pub fn store<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), Error> {
        let data = serde_json::to_vec_pretty(value)
            .map_err(|err| Error::Storage(path.to_owned(), err.to_string()))?;
        self.write_raw(path, &data)?;
        trace!("Stored {}", path.display());
        Ok(())
    }
}
