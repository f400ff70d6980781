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

use bitcoin::hashes::hex::{FromHex, ToHex};
use bitcoin::secp256k1::{rand, PublicKey, Secp256k1, SecretKey};

use super::Persistence;
use crate::{Config, Error};

/// Node identity key
#[derive(Clone, Debug)]
pub struct NodeKeys {
    secret: SecretKey,
    node_id: PublicKey,
}

impl NodeKeys {
    /// Takes development key from the configuration; otherwise reads node key
    /// file or creates it on the first start.
    pub fn load_or_create(config: &Config, persister: &Persistence) -> Result<NodeKeys, Error> {
        if let Some(ref hex) = config.dev_private_key {
            warn!("Using node key provided by configuration, this is for development only");
            return NodeKeys::from_hex(hex.trim());
        }

        let key_file = config.key_file();
        match persister.read_raw(&key_file)? {
            Some(data) => {
                debug!("Reading node key from {}", key_file.display());
                let hex = String::from_utf8(data).map_err(|_| {
                    Error::Keys(format!("{} is not a text file", key_file.display()))
                })?;
                NodeKeys::from_hex(hex.trim())
            }
            None => {
                info!("Generating new node key in {}", key_file.display());
                let keys = NodeKeys::generate();
                persister.write_raw(&key_file, keys.secret_hex().as_bytes())?;
                Ok(keys)
            }
        }
    }

    fn generate() -> NodeKeys { NodeKeys::with(SecretKey::new(&mut rand::thread_rng())) }

    fn from_hex(hex: &str) -> Result<NodeKeys, Error> {
        let bytes = Vec::<u8>::from_hex(hex)
            .map_err(|err| Error::Keys(format!("node key is not a hex string: {}", err)))?;
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|err| Error::Keys(format!("invalid node key: {}", err)))?;
        Ok(NodeKeys::with(secret))
    }

    fn with(secret: SecretKey) -> NodeKeys {
        let secp = Secp256k1::signing_only();
        let node_id = PublicKey::from_secret_key(&secp, &secret);
        NodeKeys { secret, node_id }
    }

    fn secret_hex(&self) -> String { self.secret.secret_bytes().to_hex() }

    pub fn node_id(&self) -> PublicKey { self.node_id }
}
