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

use std::path::PathBuf;

use lnp_ctl::{Failure, FailureCode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::Persistence;
use crate::Error;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
struct WalletState {
    balance_sat: u64,
}

/// On-chain funds available for channel funding
#[derive(Debug)]
pub struct Wallet {
    file: PathBuf,
    state: Mutex<WalletState>,
}

impl Wallet {
    /// Opens wallet storage, creating it with `initial_sat` balance if absent
    pub fn open(file: PathBuf, persister: &Persistence, initial_sat: u64) -> Result<Wallet, Error> {
        let state = match persister.load::<WalletState>(&file)? {
            Some(state) => state,
            None => {
                info!("Creating wallet with {} sat in {}", initial_sat, file.display());
                let state = WalletState { balance_sat: initial_sat };
                persister.store(&file, &state)?;
                state
            }
        };
        debug!("Wallet balance {} sat", state.balance_sat);
        Ok(Wallet { file, state: Mutex::new(state) })
    }

    pub fn balance(&self) -> u64 { self.state.lock().balance_sat }

    /// Takes `amount` sat from the wallet balance
    pub fn withdraw(&self, amount: u64) -> Result<u64, Failure> {
        let mut state = self.state.lock();
        if state.balance_sat < amount {
            return Err(Failure::with(
                FailureCode::InsufficientFunds,
                format!(
                    "wallet has {} sat while {} sat were requested",
                    state.balance_sat, amount
                ),
            ));
        }
        state.balance_sat -= amount;
        Ok(state.balance_sat)
    }

    pub fn deposit(&self, amount: u64) -> u64 {
        let mut state = self.state.lock();
        state.balance_sat = state.balance_sat.saturating_add(amount);
        state.balance_sat
    }

    pub fn flush(&self, persister: &Persistence) -> Result<(), Error> {
        // lock is held while storing, so an older state never overwrites a newer one
        let state = self.state.lock();
        persister.store(&self.file, &*state)
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn withdraw_and_reopen() {
        let dir = TempDir::new().unwrap();
        let store = Persistence::open(dir.path()).unwrap();
        let file = dir.path().join("wallet.json");
        let wallet = Wallet::open(file.clone(), &store, 5_000).unwrap();
        assert_eq!(wallet.withdraw(2_000).unwrap(), 3_000);
        let failure = wallet.withdraw(4_000).unwrap_err();
        assert_eq!(failure.code, FailureCode::InsufficientFunds);
        assert_eq!(wallet.balance(), 3_000);
        wallet.flush(&store).unwrap();

        // initial balance is ignored once the wallet exists
        let wallet = Wallet::open(file, &store, 5_000).unwrap();
        assert_eq!(wallet.balance(), 3_000);
        assert_eq!(wallet.deposit(500), 3_500);
    }
}
