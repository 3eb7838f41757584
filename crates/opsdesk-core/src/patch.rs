//! Serde support for nullable patch fields.
//!
//! Patch structs use `Option<Option<T>>` for fields that can be cleared:
//! the outer `None` means "leave unchanged", `Some(None)` means "set to
//! NULL". Stock serde collapses both to the outer `None` on the way in,
//! because a JSON `null` hits the field's default just like an absent key,
//! so a clear sent over the wire would be silently dropped. Fields marked
//! with
//!
//! ```text
//! #[serde(
//!     default,
//!     deserialize_with = "crate::patch::double_option",
//!     skip_serializing_if = "Option::is_none"
//! )]
//! ```
//!
//! keep the distinction: an absent key stays `None`, an explicit `null`
//! becomes `Some(None)`, and "leave unchanged" is never serialized as
//! `null` in the first place.

use serde::{Deserialize, Deserializer};

pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::project::UpdateProject;
    use crate::task::UpdateTask;
    use crate::time_entry::UpdateTimeEntry;

    #[test]
    fn null_means_clear_and_absent_means_unchanged() {
        let patch: UpdateProject = serde_json::from_str(r#"{"due_at":null}"#).unwrap();
        assert_eq!(patch.due_at, Some(None));
        assert_eq!(patch.starts_at, None);

        let patch: UpdateTask =
            serde_json::from_str(r#"{"estimated_minutes":null,"due_at":"2026-03-01T09:00:00Z"}"#)
                .unwrap();
        assert_eq!(patch.estimated_minutes, Some(None));
        assert_eq!(
            patch.due_at,
            Some(Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()))
        );
        assert_eq!(patch.completed_at, None);
    }

    #[test]
    fn clear_survives_a_json_round_trip() {
        let patch = UpdateProject {
            due_at: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        let back: UpdateProject = serde_json::from_str(&json).unwrap();
        assert_eq!(back.due_at, Some(None));
        assert_eq!(back.starts_at, None);
    }

    #[test]
    fn unchanged_fields_are_not_serialized_as_null() {
        let json = serde_json::to_value(UpdateTimeEntry::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("task_id"));
        assert!(!obj.contains_key("ended_at"));
        assert!(!obj.contains_key("hourly_rate_cents"));
    }

    #[test]
    fn clearing_ended_at_round_trips() {
        let patch = UpdateTimeEntry {
            ended_at: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"ended_at":null}"#);
        let back: UpdateTimeEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ended_at, Some(None));
        assert_eq!(back.started_at, None);
    }
}
