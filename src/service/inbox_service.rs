//! Inbox service: a user's stored notifications.

use std::sync::Arc;

use crate::domain::{Notification, NotificationId, UserId};
use crate::error::CareError;
use crate::persistence::SlotStore;

/// Read-side operations on a user's notifications.
#[derive(Debug, Clone)]
pub struct InboxService {
    store: Arc<dyn SlotStore>,
}

impl InboxService {
    /// Creates a new `InboxService`.
    #[must_use]
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Returns the notifications of `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    pub async fn notifications(&self, user: UserId) -> Result<Vec<Notification>, CareError> {
        self.store.notifications_for(user).await
    }

    /// Marks every notification of `user` as read and returns how many
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    pub async fn mark_all_read(&self, user: UserId) -> Result<u64, CareError> {
        let changed = self.store.mark_all_read(user).await?;
        tracing::debug!(user_id = %user, changed, "notifications marked read");
        Ok(changed)
    }

    /// Marks one notification of `user` as read.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::NotificationNotFound`] if the notification does
    /// not exist or belongs to another user, or [`CareError::Persistence`]
    /// on datastore failure.
    pub async fn mark_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> Result<Notification, CareError> {
        self.store
            .mark_read(user, id)
            .await?
            .ok_or(CareError::NotificationNotFound(id))
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::NewNotification;
    use crate::persistence::MemoryStore;

    #[tokio::test]
    async fn inbox_is_newest_first_and_owned() {
        let store = MemoryStore::new(Duration::from_millis(50));
        let doctor = UserId::new(1);
        for name in ["Asha", "Ben"] {
            let Ok(_) = store
                .insert_notification(&NewNotification::appointment_request(doctor, name))
                .await
            else {
                panic!("insert failed");
            };
        }
        let inbox = InboxService::new(Arc::new(store));

        let Ok(list) = inbox.notifications(doctor).await else {
            panic!("listing failed");
        };
        assert_eq!(list.len(), 2);
        assert!(list[0].message.contains("Ben"));

        let foreign = inbox.mark_read(UserId::new(2), list[0].id).await;
        assert!(matches!(foreign, Err(CareError::NotificationNotFound(_))));

        let Ok(read) = inbox.mark_read(doctor, list[0].id).await else {
            panic!("mark failed");
        };
        assert!(read.is_read);
        assert_eq!(inbox.mark_all_read(doctor).await.ok(), Some(1));
        assert_eq!(inbox.mark_all_read(doctor).await.ok(), Some(0));
    }
}
