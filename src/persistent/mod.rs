use std::time::Duration;

use crossbeam::channel::{Sender, TryRecvError};
use tokio::task::JoinHandle;

mod data;
mod json;

pub use data::{Data, DeliverySchedule, MainButton, UserProfile};
pub use json::Storage;

const IDLE_DELAY: Duration = Duration::from_millis(200);

pub enum DBAction {
    Save(Box<Data>),
    Stop,
}

/// Spawns the single writer of the data file. Snapshots arriving in a burst are
/// coalesced, only the latest one is written.
pub fn worker(storage: Storage) -> (Sender<DBAction>, JoinHandle<()>) {
    let (s, r) = crossbeam::channel::unbounded();
    let handle = tokio::spawn(async move {
        let mut pending: Option<Box<Data>> = None;
        loop {
            let mut stop = false;
            loop {
                match r.try_recv() {
                    Ok(DBAction::Save(data)) => pending = Some(data),
                    Ok(DBAction::Stop) | Err(TryRecvError::Disconnected) => {
                        stop = true;
                        break;
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }
            if let Some(data) = pending.take() {
                if let Err(e) = storage.save(&data) {
                    log::error!("error on saving {}: {:#}", storage.path().display(), e);
                    if !stop {
                        // keep it for the next round unless a newer snapshot shows up
                        pending = Some(data);
                    }
                }
            }
            if stop {
                log::info!("db worker stopped");
                break;
            }
            tokio::time::sleep(IDLE_DELAY).await;
        }
    });
    (s, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn latest_snapshot_wins() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("data.json"));
        let (sender, handle) = worker(storage.clone());

        let mut first = Data::default();
        first.blacklist.push(1);
        let mut second = first.clone();
        second.blacklist.push(2);
        sender.send(DBAction::Save(Box::new(first))).unwrap();
        sender.send(DBAction::Save(Box::new(second.clone()))).unwrap();
        sender.send(DBAction::Stop).unwrap();
        handle.await.unwrap();

        assert_eq!(storage.load().unwrap(), second);
    }

    #[tokio::test]
    async fn dropping_the_sender_flushes_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("data.json"));
        let (sender, handle) = worker(storage.clone());

        let mut data = Data::default();
        data.file_submission_buttons.push("Netflix".into());
        sender.send(DBAction::Save(Box::new(data.clone()))).unwrap();
        drop(sender);
        handle.await.unwrap();

        assert_eq!(storage.load().unwrap(), data);
    }
}
