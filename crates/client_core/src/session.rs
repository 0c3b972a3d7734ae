use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shared::{
    domain::{User, UserId},
    protocol::Profile,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    me: Option<User>,
    friends: Vec<User>,
    sent_requests: Vec<User>,
    received_requests: Vec<User>,
    online: BTreeSet<UserId>,
}

fn contains(list: &[User], user_id: UserId) -> bool {
    list.iter().any(|u| u.id == user_id)
}

fn remove(list: &mut Vec<User>, user_id: UserId) -> Option<User> {
    let index = list.iter().position(|u| u.id == user_id)?;
    Some(list.remove(index))
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_profile(&mut self, profile: Profile) {
        *self = Self::default();
        self.me = Some(profile.user);
        for user in profile.friends {
            self.add_friend(user);
        }
        for user in profile.received_requests {
            self.add_received_request(user);
        }
        for user in profile.sent_requests {
            self.add_sent_request(user);
        }
    }

    /// Logged-out signal: nothing survives.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn me(&self) -> Option<&User> {
        self.me.as_ref()
    }

    pub fn my_id(&self) -> Option<UserId> {
        self.me.as_ref().map(|u| u.id)
    }

    pub fn friends(&self) -> &[User] {
        &self.friends
    }

    pub fn sent_requests(&self) -> &[User] {
        &self.sent_requests
    }

    pub fn received_requests(&self) -> &[User] {
        &self.received_requests
    }

    pub fn friend_ids(&self) -> Vec<UserId> {
        self.friends.iter().map(|u| u.id).collect()
    }

    pub fn is_friend(&self, user_id: UserId) -> bool {
        contains(&self.friends, user_id)
    }

    /// Looks the user up in either request list.
    pub fn pending_request(&self, user_id: UserId) -> Option<&User> {
        self.received_requests
            .iter()
            .chain(self.sent_requests.iter())
            .find(|u| u.id == user_id)
    }

    pub fn add_friend(&mut self, user: User) -> bool {
        remove(&mut self.sent_requests, user.id);
        remove(&mut self.received_requests, user.id);
        if contains(&self.friends, user.id) {
            return false;
        }
        self.friends.push(user);
        true
    }

    pub fn remove_friend(&mut self, user_id: UserId) -> bool {
        self.online.remove(&user_id);
        remove(&mut self.friends, user_id).is_some()
    }

    /// Ignored for existing friends and for the opposite pending direction.
    pub fn add_sent_request(&mut self, user: User) -> bool {
        if contains(&self.friends, user.id) || contains(&self.received_requests, user.id) {
            return false;
        }
        if contains(&self.sent_requests, user.id) {
            return false;
        }
        self.sent_requests.push(user);
        true
    }

    pub fn add_received_request(&mut self, user: User) -> bool {
        if contains(&self.friends, user.id) || contains(&self.sent_requests, user.id) {
            return false;
        }
        if contains(&self.received_requests, user.id) {
            return false;
        }
        self.received_requests.push(user);
        true
    }

    fn drop_requests(&mut self, user_id: UserId) -> bool {
        let sent = remove(&mut self.sent_requests, user_id).is_some();
        let received = remove(&mut self.received_requests, user_id).is_some();
        sent || received
    }

    /// Ends up in `friends` whatever list (if any) the user was in before.
    pub fn accept_friend_request(&mut self, user: User) {
        self.drop_requests(user.id);
        self.add_friend(user);
    }

    pub fn decline_friend_request(&mut self, user_id: UserId) -> bool {
        self.drop_requests(user_id)
    }

    pub fn cancel_friend_request(&mut self, user_id: UserId) -> bool {
        self.drop_requests(user_id)
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.online.contains(&user_id)
    }

    pub fn online_ids(&self) -> Vec<UserId> {
        self.online.iter().copied().collect()
    }

    /// Bulk replacement from a presence poll. Non-friends are dropped.
    pub fn set_online_friends(&mut self, online: &[UserId]) {
        self.online = online
            .iter()
            .copied()
            .filter(|id| contains(&self.friends, *id))
            .collect();
    }

    pub fn set_friend_online(&mut self, user_id: UserId) -> bool {
        if !contains(&self.friends, user_id) {
            return false;
        }
        self.online.insert(user_id)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
