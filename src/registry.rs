use std::collections::btree_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam::channel::Sender;
use teloxide::types::UserId;

use crate::impls::LoggableErrorResult;
use crate::persistent::{DBAction, Data, DeliverySchedule, MainButton, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Added {
    Added,
    AlreadyExists,
    /// the parent the item should be added to does not exist
    NoParent,
}

/// In-memory copy of the data file. Every change is forwarded to the db worker.
pub struct Registry {
    data: Mutex<Data>,
    sender: Sender<DBAction>,
}

impl Registry {
    pub fn new(data: Data, sender: Sender<DBAction>) -> Self {
        Self { data: Mutex::new(data), sender }
    }

    fn lock(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, f: impl FnOnce(&Data) -> R) -> R {
        f(&self.lock())
    }

    fn update<R>(&self, f: impl FnOnce(&mut Data) -> R) -> R {
        let (result, snapshot) = {
            let mut data = self.lock();
            let result = f(&mut data);
            (result, data.clone())
        };
        self.sender.send(DBAction::Save(Box::new(snapshot))).ok_or_log();
        result
    }

    /// Checks and changes under one lock. Nothing is saved when `f` returns `Err`.
    fn try_update<R, E>(&self, f: impl FnOnce(&mut Data) -> Result<R, E>) -> Result<R, E> {
        let (result, snapshot) = {
            let mut data = self.lock();
            let result = f(&mut data)?;
            (result, data.clone())
        };
        self.sender.send(DBAction::Save(Box::new(snapshot))).ok_or_log();
        Ok(result)
    }

    /// Returns `false` and saves nothing when `f` made no change.
    fn update_if(&self, f: impl FnOnce(&mut Data) -> bool) -> bool {
        self.try_update(|data| if f(data) { Ok(()) } else { Err(()) }).is_ok()
    }

    /// Asks the db worker to write what it has and stop.
    pub fn shutdown(&self) {
        self.sender.send(DBAction::Stop).ok_or_log();
    }

    // users

    /// Returns `true` if the user was not known before.
    pub fn register_user(&self, user_id: UserId, profile: UserProfile) -> bool {
        self.update_if(|data| match data.users.entry(user_id.0) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(profile);
                true
            }
        })
    }

    pub fn users(&self) -> Vec<(UserId, UserProfile)> {
        self.read(|data| data.users.iter().map(|(id, p)| (UserId(*id), p.clone())).collect())
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        self.read(|data| data.users.keys().copied().map(UserId).collect())
    }

    pub fn is_blacklisted(&self, user_id: UserId) -> bool {
        self.read(|data| data.blacklist.contains(&user_id.0))
    }

    /// Returns `false` if the user was already blocked.
    pub fn block(&self, user_id: UserId) -> bool {
        self.update_if(|data| {
            if data.blacklist.contains(&user_id.0) {
                return false;
            }
            data.blacklist.push(user_id.0);
            true
        })
    }

    /// Returns `false` if the user was not blocked.
    pub fn unblock(&self, user_id: UserId) -> bool {
        self.update_if(|data| {
            let before = data.blacklist.len();
            data.blacklist.retain(|id| *id != user_id.0);
            data.blacklist.len() != before
        })
    }

    // number categories

    pub fn main_buttons(&self) -> Vec<String> {
        self.read(|data| data.buttons.iter().map(|b| b.name.clone()).collect())
    }

    /// Sub buttons of the main button, `None` if there is no such main button.
    pub fn sub_buttons(&self, main: &str) -> Option<Vec<String>> {
        self.read(|data| data.buttons.iter().find(|b| b.name == main).map(|b| b.sub_buttons.clone()))
    }

    pub fn has_sub_button(&self, main: &str, sub: &str) -> bool {
        self.sub_buttons(main).map(|subs| subs.iter().any(|s| s == sub)).unwrap_or(false)
    }

    pub fn add_main_button(&self, name: &str) -> Added {
        self.try_update(|data| {
            if data.buttons.iter().any(|b| b.name == name) {
                return Err(Added::AlreadyExists);
            }
            data.buttons.push(MainButton::new(name));
            Ok(Added::Added)
        })
        .unwrap_or_else(|not_added| not_added)
    }

    pub fn add_sub_button(&self, main: &str, sub: &str) -> Added {
        self.try_update(|data| {
            let button = data.buttons.iter_mut().find(|b| b.name == main).ok_or(Added::NoParent)?;
            if button.sub_buttons.iter().any(|s| s == sub) {
                return Err(Added::AlreadyExists);
            }
            button.sub_buttons.push(sub.to_owned());
            Ok(Added::Added)
        })
        .unwrap_or_else(|not_added| not_added)
    }

    /// Removes the main button together with the progress of its pools.
    pub fn remove_main_button(&self, name: &str) -> Option<MainButton> {
        self.try_update(|data| {
            let index = data.buttons.iter().position(|b| b.name == name).ok_or(())?;
            data.number_progress.remove(name);
            Ok::<_, ()>(data.buttons.remove(index))
        })
        .ok()
    }

    /// Returns `false` if there was nothing to remove.
    pub fn remove_sub_button(&self, main: &str, sub: &str) -> bool {
        self.update_if(|data| {
            let Some(button) = data.buttons.iter_mut().find(|b| b.name == main) else {
                return false;
            };
            let before = button.sub_buttons.len();
            button.sub_buttons.retain(|s| s != sub);
            if button.sub_buttons.len() == before {
                return false;
            }
            if let Some(progress) = data.number_progress.get_mut(main) {
                progress.remove(sub);
            }
            true
        })
    }

    // number progress

    pub fn progress(&self, main: &str, sub: &str) -> usize {
        self.read(|data| data.number_progress.get(main).and_then(|p| p.get(sub)).copied().unwrap_or(0))
    }

    pub fn set_progress(&self, main: &str, sub: &str, next: usize) {
        self.update(|data| {
            data.number_progress.entry(main.to_owned()).or_default().insert(sub.to_owned(), next);
        })
    }

    /// A freshly uploaded pool starts from its first line.
    pub fn reset_progress(&self, main: &str, sub: &str) {
        self.set_progress(main, sub, 0)
    }

    // otp group

    /// Empty string means the link is turned off.
    pub fn otp_group_link(&self) -> String {
        self.read(|data| data.otp_group_link.clone())
    }

    pub fn set_otp_group_link(&self, link: &str) {
        self.update(|data| data.otp_group_link = link.to_owned())
    }

    // file submission categories

    pub fn submission_categories(&self) -> Vec<String> {
        self.read(|data| data.file_submission_buttons.clone())
    }

    pub fn has_submission_category(&self, name: &str) -> bool {
        self.read(|data| data.file_submission_buttons.iter().any(|c| c == name))
    }

    pub fn add_submission_category(&self, name: &str) -> Added {
        self.try_update(|data| {
            if data.file_submission_buttons.iter().any(|c| c == name) {
                return Err(Added::AlreadyExists);
            }
            data.file_submission_buttons.push(name.to_owned());
            Ok(Added::Added)
        })
        .unwrap_or_else(|not_added| not_added)
    }

    pub fn remove_submission_category(&self, name: &str) -> bool {
        self.update_if(|data| {
            let before = data.file_submission_buttons.len();
            data.file_submission_buttons.retain(|c| c != name);
            data.file_submission_buttons.len() != before
        })
    }

    // 2fa

    pub fn saved_secret(&self, user_id: UserId) -> Option<String> {
        self.read(|data| data.user_2fa_secrets.get(&user_id.0).cloned())
    }

    pub fn save_secret(&self, user_id: UserId, secret: &str) {
        self.update(|data| {
            data.user_2fa_secrets.insert(user_id.0, secret.to_owned());
        })
    }

    // daily delivery

    pub fn delivery_schedule(&self) -> DeliverySchedule {
        self.read(|data| data.delivery_schedule.clone())
    }

    /// `time` is the stored `HH:MM` form.
    pub fn set_delivery_time(&self, time: String) {
        self.update(|data| data.delivery_schedule.time = Some(time))
    }
}

#[cfg(test)]
pub(crate) fn test_registry() -> (Registry, crossbeam::channel::Receiver<DBAction>) {
    let (sender, receiver) = crossbeam::channel::unbounded();
    (Registry::new(Data::default(), sender), receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> UserProfile {
        UserProfile { first_name: name.into(), last_name: None, username: None }
    }

    fn last_snapshot(receiver: &crossbeam::channel::Receiver<DBAction>) -> Option<Data> {
        receiver.try_iter().filter_map(|a| match a {
            DBAction::Save(data) => Some(*data),
            DBAction::Stop => None,
        }).last()
    }

    #[test]
    fn users_register_once() {
        let (registry, receiver) = test_registry();
        assert!(registry.register_user(UserId(1), profile("Rafi")));
        assert!(!registry.register_user(UserId(1), profile("Someone else")));
        assert_eq!(registry.users(), vec![(UserId(1), profile("Rafi"))]);
        assert_eq!(receiver.try_iter().count(), 1);
    }

    #[test]
    fn block_and_unblock() {
        let (registry, _receiver) = test_registry();
        assert!(registry.block(UserId(3)));
        assert!(!registry.block(UserId(3)));
        assert!(registry.is_blacklisted(UserId(3)));
        assert!(registry.unblock(UserId(3)));
        assert!(!registry.unblock(UserId(3)));
        assert!(!registry.is_blacklisted(UserId(3)));
    }

    #[test]
    fn button_names_are_unique() {
        let (registry, _receiver) = test_registry();
        assert_eq!(registry.add_main_button("OTT"), Added::Added);
        assert_eq!(registry.add_main_button("OTT"), Added::AlreadyExists);
        assert_eq!(registry.add_sub_button("OTT", "Netflix"), Added::Added);
        assert_eq!(registry.add_sub_button("OTT", "Netflix"), Added::AlreadyExists);
        assert_eq!(registry.add_sub_button("Mail", "Gmail"), Added::NoParent);
        assert_eq!(registry.sub_buttons("OTT"), Some(vec!["Netflix".to_owned()]));
    }

    #[test]
    fn concurrent_adds_keep_names_unique() {
        let (registry, receiver) = test_registry();
        let added: Vec<Added> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        registry.add_main_button("OTT");
                        registry.block(UserId(3));
                        registry.add_submission_category("Netflix")
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(added.iter().filter(|a| **a == Added::Added).count(), 1);
        let data = last_snapshot(&receiver).unwrap();
        assert_eq!(data.buttons.len(), 1);
        assert_eq!(data.blacklist, vec![3]);
        assert_eq!(data.file_submission_buttons, vec!["Netflix".to_owned()]);
    }

    #[test]
    fn unchanged_data_is_not_saved() {
        let (registry, receiver) = test_registry();
        registry.add_main_button("OTT");
        receiver.try_iter().count();
        assert_eq!(registry.add_main_button("OTT"), Added::AlreadyExists);
        assert_eq!(registry.add_sub_button("Mail", "Gmail"), Added::NoParent);
        assert!(registry.remove_main_button("Mail").is_none());
        assert!(!registry.remove_sub_button("OTT", "Netflix"));
        assert!(!registry.unblock(UserId(1)));
        assert!(!registry.remove_submission_category("Netflix"));
        assert_eq!(receiver.try_iter().count(), 0);
    }

    #[test]
    fn removing_buttons_drops_their_progress() {
        let (registry, receiver) = test_registry();
        registry.add_main_button("OTT");
        registry.add_sub_button("OTT", "Netflix");
        registry.add_sub_button("OTT", "Hulu");
        registry.set_progress("OTT", "Netflix", 5);
        registry.set_progress("OTT", "Hulu", 2);

        assert!(registry.remove_sub_button("OTT", "Netflix"));
        assert!(!registry.remove_sub_button("OTT", "Netflix"));
        assert_eq!(registry.progress("OTT", "Netflix"), 0);
        assert_eq!(registry.progress("OTT", "Hulu"), 2);

        registry.reset_progress("OTT", "Hulu");
        assert_eq!(registry.progress("OTT", "Hulu"), 0);
        registry.set_progress("OTT", "Hulu", 2);

        let removed = registry.remove_main_button("OTT").unwrap();
        assert_eq!(removed.sub_buttons, vec!["Hulu".to_owned()]);
        assert!(registry.remove_main_button("OTT").is_none());

        let data = last_snapshot(&receiver).unwrap();
        assert!(data.buttons.is_empty());
        assert!(data.number_progress.is_empty());
    }

    #[test]
    fn submission_categories() {
        let (registry, _receiver) = test_registry();
        assert_eq!(registry.add_submission_category("Netflix"), Added::Added);
        assert_eq!(registry.add_submission_category("Netflix"), Added::AlreadyExists);
        assert!(registry.has_submission_category("Netflix"));
        assert!(registry.remove_submission_category("Netflix"));
        assert!(!registry.remove_submission_category("Netflix"));
    }

    #[test]
    fn secrets_and_schedule() {
        let (registry, receiver) = test_registry();
        assert_eq!(registry.saved_secret(UserId(9)), None);
        registry.save_secret(UserId(9), "JBSWY3DPEHPK3PXP");
        assert_eq!(registry.saved_secret(UserId(9)).as_deref(), Some("JBSWY3DPEHPK3PXP"));

        registry.set_delivery_time("19:45".into());
        assert_eq!(registry.delivery_schedule().time.as_deref(), Some("19:45"));
        let data = last_snapshot(&receiver).unwrap();
        assert_eq!(data.delivery_schedule.time.as_deref(), Some("19:45"));
    }
}
