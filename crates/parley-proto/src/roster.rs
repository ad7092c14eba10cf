//! Profile and room-list normalization.
//!
//! Same ingestion posture as the message module: the backend's profile and
//! room-list records carry the counterpart under half a dozen historical
//! names, so everything is probed once into [`UserProfile`] / [`RoomEntry`]
//! and the rest of the client never touches raw records. All fields are
//! best-effort; an unrecognizable record normalizes to an empty profile
//! rather than an error.

use serde_json::Value;

use crate::{
    ids::{RoomId, UserId},
    probe::{as_id, probe, probe_str},
};

/// A participant profile, every field best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    /// Numeric id (primary key).
    pub id: Option<UserId>,
    /// Login handle.
    pub login: Option<String>,
    /// Real or display name.
    pub name: Option<String>,
    /// Nickname.
    pub nickname: Option<String>,
    /// Avatar URL, possibly relative to the API base.
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Normalize one raw profile object.
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: probe(value, &["id", "userPk"]).and_then(as_id),
            login: probe_str(value, &["userId", "loginId", "username"]),
            name: probe_str(value, &["name"]),
            nickname: probe_str(value, &["nickname"]),
            avatar: probe_str(value, &[
                "avatar",
                "profileImageUrl",
                "authorProfileImageUrl",
                "avatarUrl",
                "photoUrl",
                "imageUrl",
            ]),
        }
    }

    /// Display name: name, then nickname, then login handle.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.nickname.as_deref())
            .or(self.login.as_deref())
            .unwrap_or("unknown")
    }

    /// Avatar URL absolutized against the API base.
    pub fn avatar_url(&self, base: &str) -> Option<String> {
        self.avatar.as_deref().map(|raw| absolute_url(base, raw))
    }
}

/// One record of the viewer's room list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomEntry {
    /// Room this entry describes.
    pub room_id: Option<RoomId>,
    /// The other participant, when the record carries one.
    pub counterpart: Option<UserProfile>,
    /// Receiver-id hint for addressing outbound messages.
    pub receiver_hint: Option<UserId>,
}

impl RoomEntry {
    /// Normalize one raw room-list record.
    pub fn from_value(value: &Value) -> Self {
        let counterpart = probe(value, &[
            "counterpart",
            "partner",
            "partnerUser",
            "otherUser",
            "otherUserInfo",
            "peerUser",
            "receiverUser",
            "targetUser",
            "ownerUser",
        ])
        .filter(|candidate| candidate.is_object())
        .map(UserProfile::from_value);

        let receiver_hint = probe(value, &[
            "counterpartId",
            "partnerUserId",
            "otherUserId",
            "receiverUserId",
            "targetUserId",
        ])
        .and_then(as_id)
        .or_else(|| counterpart.as_ref().and_then(|profile| profile.id));

        Self {
            room_id: probe(value, &["roomId", "chatRoomId", "id"]).and_then(as_id),
            counterpart,
            receiver_hint,
        }
    }
}

/// Absolutize a possibly-relative URL against an API base.
pub fn absolute_url(base: &str, raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), raw.trim_start_matches('/'))
    }
}
