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
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bitcoin::Network;
use log::LevelFilter;
use lnp_ctl::LNP_NODE_CTL_SOCKET;
use serde::Deserialize;
use serde_with::DisplayFromStr;
use settings::{Environment, File, FileFormat};

use crate::Error;

/// Name of the configuration file looked up inside a node directory
pub const LNP_NODE_CONFIG: &str = "lnp_node.toml";
/// Prefix of environment variables overriding configuration file values
pub const LNP_NODE_ENV_PREFIX: &str = "LNP_NODE";
/// Native lightning network peer port
pub const LNP_NODE_PEER_PORT: u16 = 9735;
pub const LNP_NODE_ALIAS: &str = "lnp-node";

const KEY_FILE: &str = "node.key";
const WALLET_FILE: &str = "wallet.json";
const CHANNELS_FILE: &str = "channels.json";

/// Values as they are written in the configuration file
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(crate = "serde_crate")]
struct ConfigFile {
    #[serde_as(as = "DisplayFromStr")]
    network: Network,
    alias: Option<String>,
    data_dir: Option<String>,
    listen_addr: Option<IpAddr>,
    listen_port: Option<u16>,
    ctl_socket: Option<String>,
    #[serde(default)]
    funds_sat: u64,
    dev_private_key: Option<String>,
    log_level: Option<String>,
}

/// Final node configuration resulting from data contained in the config file
/// and environment variables.
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub struct Config {
    /// Bitcoin blockchain to use (mainnet, testnet, signet, regtest)
    pub network: Network,

    /// Human-readable node name
    pub alias: String,

    /// Directory for data files, like node key, wallet and channels
    pub data_dir: PathBuf,

    /// Address for the peer network listener
    pub listen_addr: SocketAddr,

    /// Control socket used by the daemon binary
    pub ctl_socket: PathBuf,

    /// Balance of the on-chain wallet when it is created for the first time
    pub funds_sat: u64,

    /// Node secret key in hex; for development setups only
    pub dev_private_key: Option<String>,

    /// Default logging level
    pub log_level: LevelFilter,
}

impl Config {
    /// Loads configuration from `path`, which can be either a node directory
    /// containing [`LNP_NODE_CONFIG`] or a configuration file itself.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, Error> {
        let path = path.as_ref();
        let meta =
            fs::metadata(path).map_err(|err| Error::ConfigRead(path.to_owned(), err.to_string()))?;
        let (file, base_dir) = if meta.is_dir() {
            (path.join(LNP_NODE_CONFIG), path.to_owned())
        } else {
            let base = match path.parent() {
                Some(parent) if parent != Path::new("") => parent.to_owned(),
                _ => PathBuf::from("."),
            };
            (path.to_owned(), base)
        };
        if !file.is_file() {
            return Err(Error::ConfigRead(file, s!("configuration file does not exist")));
        }
        debug!("Reading configuration from {}", file.display());

        let raw = settings::Config::builder()
            .add_source(File::new(&file.to_string_lossy(), FileFormat::Toml))
            .add_source(Environment::with_prefix(LNP_NODE_ENV_PREFIX))
            .build()
            .map_err(|err| Error::ConfigMalformed(file.clone(), err.to_string()))?
            .try_deserialize::<ConfigFile>()
            .map_err(|err| Error::ConfigMalformed(file.clone(), err.to_string()))?;
        trace!("Raw configuration: {:?}", raw);

        Config::with(raw, &base_dir).map_err(|msg| Error::ConfigMalformed(file, msg))
    }

    fn with(raw: ConfigFile, base_dir: &Path) -> Result<Config, String> {
        let data_dir = match raw.data_dir {
            Some(dir) => resolve(base_dir, &dir),
            None => base_dir.to_owned(),
        };
        let ctl_socket = match raw.ctl_socket {
            Some(socket) => resolve(&data_dir, &socket),
            None => data_dir.join(LNP_NODE_CTL_SOCKET),
        };
        let log_level = match raw.log_level {
            Some(level) => LevelFilter::from_str(&level)
                .map_err(|_| format!("unknown log level `{}`", level))?,
            None => LevelFilter::Info,
        };
        Ok(Config {
            network: raw.network,
            alias: raw.alias.unwrap_or_else(|| LNP_NODE_ALIAS.to_owned()),
            data_dir,
            listen_addr: SocketAddr::new(
                raw.listen_addr.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
                raw.listen_port.unwrap_or(LNP_NODE_PEER_PORT),
            ),
            ctl_socket,
            funds_sat: raw.funds_sat,
            dev_private_key: raw.dev_private_key,
            log_level,
        })
    }

    pub fn key_file(&self) -> PathBuf { self.data_dir.join(KEY_FILE) }

    pub fn wallet_file(&self) -> PathBuf { self.data_dir.join(WALLET_FILE) }

    pub fn channels_file(&self) -> PathBuf { self.data_dir.join(CHANNELS_FILE) }
}

fn resolve(base: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(shellexpand::tilde(path).as_ref());
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}
