use crate::config::LibraryConfig;
use crate::contract::model::UserId;
use crate::domain::ports::CollectionPath;

/// Where a user's items and images live: `{users_root}/{uid}/{collection}`.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    users_root: String,
    collection: String,
    order_by: String,
}

impl StorageLayout {
    pub fn new(cfg: &LibraryConfig) -> Self {
        Self {
            users_root: cfg.users_root.clone(),
            collection: cfg.collection.clone(),
            order_by: cfg.order_by.clone(),
        }
    }

    pub fn items_of(&self, owner: &UserId) -> CollectionPath {
        CollectionPath::from_segments([
            self.users_root.as_str(),
            owner.as_str(),
            self.collection.as_str(),
        ])
    }

    pub fn order_by(&self) -> &str {
        &self.order_by
    }

    /// Blob path of an uploaded image.
    pub fn image_object(&self, owner: &UserId, name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.users_root,
            owner.as_str(),
            self.collection,
            name
        )
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(&LibraryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_partitioned_by_user() {
        let layout = StorageLayout::default();
        let u = UserId::new("u1");
        assert_eq!(layout.items_of(&u).as_str(), "users/u1/library");
        assert_eq!(
            layout.image_object(&u, "a.png"),
            "users/u1/library/a.png"
        );
        assert_ne!(layout.items_of(&u), layout.items_of(&UserId::new("u2")));
    }
}
