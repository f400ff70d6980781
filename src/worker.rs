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

//! Background threads with cooperative stop and bounded join

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::Error;

/// Interval at which worker loops re-check their stop flag
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Flag observed by the worker loop; set once the worker is asked to stop
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn is_set(&self) -> bool { self.0.load(Ordering::Acquire) }

    pub fn set(&self) { self.0.store(true, Ordering::Release) }
}

/// Named thread running a loop until its [`StopFlag`] is raised.
///
/// The thread reports completion through a channel, so [`Worker::stop`] can
/// wait for it with a timeout instead of blocking on `join` forever.
#[derive(Debug)]
pub struct Worker {
    name: String,
    stop: StopFlag,
    done: mpsc::Receiver<()>,
    thread: JoinHandle<()>,
}

impl Worker {
    pub fn spawn<F>(name: impl ToString, routine: F) -> Result<Worker, Error>
    where
        F: FnOnce(StopFlag) + Send + 'static,
    {
        let name = name.to_string();
        let stop = StopFlag::default();
        let (tx, done) = mpsc::sync_channel::<()>(1);
        let flag = stop.clone();
        let thread = thread::Builder::new().name(name.clone()).spawn(move || {
            routine(flag);
            // receiver may be gone if the owner gave up waiting
            let _ = tx.send(());
        })?;
        trace!("Worker {} started", name);
        Ok(Worker { name, stop, done, thread })
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn is_finished(&self) -> bool { self.thread.is_finished() }

    /// Signals the worker without waiting for it
    pub fn signal(&self) { self.stop.set() }

    /// Signals the worker and waits up to `timeout` for it to finish. A worker
    /// which does not finish in time is left detached.
    pub fn stop(self, timeout: Duration) -> Result<(), Error> {
        self.stop.set();
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("Worker {} has not stopped within {:?}, detaching", self.name, timeout);
                return Err(Error::StopTimeout(self.name, timeout));
            }
        }
        self.thread.join().map_err(|_| Error::WorkerPanic(self.name.clone()))?;
        trace!("Worker {} stopped", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;

    #[test]
    fn stops_on_flag() {
        let worker = Worker::spawn("looping", |stop| {
            while !stop.is_set() {
                thread::sleep(POLL_INTERVAL);
            }
        })
        .unwrap();
        assert_eq!(worker.name(), "looping");
        worker.stop(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn stuck_worker_times_out() {
        let worker = Worker::spawn("stuck", |_| thread::sleep(Duration::from_secs(2))).unwrap();
        let err = worker.stop(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, Error::StopTimeout(ref name, _) if name == "stuck"));
    }

    #[test]
    fn panicking_worker() {
        let worker = Worker::spawn("panicking", |_| panic!("worker failure")).unwrap();
        let err = worker.stop(Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, Error::WorkerPanic(_)));
    }
}
