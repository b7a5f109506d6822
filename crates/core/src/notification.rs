//! Change-notification payloads from the DAM delta feed.
//!
//! The feed mixes many activity kinds; only a fixed set of actions and
//! source types indicates that an asset's local mirror may be stale.
//! [`changed_asset_ids`] extracts exactly those asset ids from a batch.

use serde::Deserialize;

/// Actions that signal a tracked asset change.
///
/// Membership is an exact string match: suffixed variants such as
/// `asset_version_bar` are distinct actions and do not match.
pub const TRACKED_ACTIONS: &[&str] = &["asset_version", "asset_property", "asset_delete"];

/// Source types whose ids refer to assets the engine mirrors.
pub const TRACKED_SOURCE_TYPES: &[&str] = &["asset", "video", "image", "document", "audio"];

/// The object a notification (or one of its subitems) refers to.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// One entry from the notifications endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    pub action: String,
    pub source: Option<NotificationSource>,
    /// Secondary objects affected by the same action (e.g. the assets
    /// inside a changed folder).
    #[serde(default)]
    pub subitems: Vec<NotificationSource>,
}

/// Extract the ids of assets affected by a notification batch.
///
/// A notification contributes ids only when its `action` is one of
/// [`TRACKED_ACTIONS`]; the main source and each subitem contribute
/// their id when their type is one of [`TRACKED_SOURCE_TYPES`].
/// Duplicates are removed within this call, preserving first-seen
/// order. Duplicates across separate calls (separate pages) are not
/// filtered here.
pub fn changed_asset_ids(batch: &[Notification]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();

    for notification in batch {
        if !TRACKED_ACTIONS.contains(&notification.action.as_str()) {
            continue;
        }

        let candidates = notification
            .source
            .iter()
            .chain(notification.subitems.iter());

        for source in candidates {
            if !TRACKED_SOURCE_TYPES.contains(&source.kind.as_str()) {
                continue;
            }
            if !ids.iter().any(|seen| seen == &source.id) {
                ids.push(source.id.clone());
            }
        }
    }

    ids
}
