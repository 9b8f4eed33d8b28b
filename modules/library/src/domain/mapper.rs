//! Field names and conversions between item drafts/documents.

use crate::contract::model::{ItemDraft, ItemId, LibraryItem};
use crate::domain::ports::{Document, DocumentWrite};

pub const TITLE: &str = "title";
pub const DESCRIPTION: &str = "description";
pub const READ_LINK: &str = "readLink";
pub const STORY_IMAGE_URL: &str = "storyImageUrl";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// New record: absent optionals become empty strings, both timestamps from the server.
pub fn creation_write(draft: &ItemDraft) -> DocumentWrite {
    DocumentWrite::new()
        .text(TITLE, &draft.title)
        .text(DESCRIPTION, &draft.description)
        .text(READ_LINK, draft.read_link.clone().unwrap_or_default())
        .text(
            STORY_IMAGE_URL,
            draft.story_image_url.clone().unwrap_or_default(),
        )
        .server_timestamp(CREATED_AT)
        .server_timestamp(UPDATED_AT)
}

/// Update: `createdAt` untouched; the cover only changes when a new one is supplied.
pub fn update_write(draft: &ItemDraft) -> DocumentWrite {
    let write = DocumentWrite::new()
        .text(TITLE, &draft.title)
        .text(DESCRIPTION, &draft.description)
        .text(READ_LINK, draft.read_link.clone().unwrap_or_default())
        .server_timestamp(UPDATED_AT);

    match &draft.story_image_url {
        Some(url) => write.text(STORY_IMAGE_URL, url),
        None => write,
    }
}

pub fn item_from_document(doc: &Document) -> LibraryItem {
    let story_image_url = doc
        .text(STORY_IMAGE_URL)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    LibraryItem {
        id: ItemId::new(doc.id.clone()),
        title: doc.text(TITLE).unwrap_or_default().to_string(),
        description: doc.text(DESCRIPTION).unwrap_or_default().to_string(),
        read_link: doc.text(READ_LINK).unwrap_or_default().to_string(),
        story_image_url,
        created_at: doc.timestamp(CREATED_AT),
        updated_at: doc.timestamp(UPDATED_AT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{FieldValue, StoredValue};
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn creation_normalizes_absent_optionals() {
        let w = creation_write(&ItemDraft::new("Paper A", ""));
        assert_eq!(w.fields[READ_LINK], FieldValue::Text(String::new()));
        assert_eq!(w.fields[STORY_IMAGE_URL], FieldValue::Text(String::new()));
        assert_eq!(w.fields[CREATED_AT], FieldValue::ServerTimestamp);
        assert_eq!(w.fields[UPDATED_AT], FieldValue::ServerTimestamp);
    }

    #[test]
    fn update_keeps_created_at_and_cover_unless_supplied() {
        let w = update_write(&ItemDraft::new("t", "d"));
        assert!(!w.fields.contains_key(CREATED_AT));
        assert!(!w.fields.contains_key(STORY_IMAGE_URL));
        assert_eq!(w.fields[UPDATED_AT], FieldValue::ServerTimestamp);

        let w = update_write(&ItemDraft::new("t", "d").with_image_url("http://img"));
        assert_eq!(
            w.fields[STORY_IMAGE_URL],
            FieldValue::Text("http://img".into())
        );
    }

    #[test]
    fn missing_fields_map_to_defaults() {
        let now = Utc::now();
        let mut fields = BTreeMap::new();
        fields.insert(TITLE.to_string(), StoredValue::Text("T".into()));
        fields.insert(STORY_IMAGE_URL.to_string(), StoredValue::Text(String::new()));
        fields.insert(CREATED_AT.to_string(), StoredValue::Timestamp(now));
        let doc = Document {
            id: "d1".into(),
            fields,
        };

        let item = item_from_document(&doc);
        assert_eq!(item.id.as_str(), "d1");
        assert_eq!(item.title, "T");
        assert_eq!(item.description, "");
        assert_eq!(item.read_link, "");
        assert_eq!(item.story_image_url, None);
        assert_eq!(item.created_at, Some(now));
        assert_eq!(item.updated_at, None);
    }
}
