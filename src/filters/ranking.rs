use std::cmp::Ordering;

use chrono::{NaiveDate, TimeZone, Utc};

use crate::models::NormalizedConversation;

/// When a conversation was last active, epoch milliseconds
///
/// The end of the last message's timing window. Trailing messages without
/// timing (an unanswered follow-up, a tool-only turn) do not reset activity to
/// `created_at`: the scan walks back to the last message that has timing, and
/// only falls back to `created_at` when no message carries any.
pub fn effective_activity_time(conversation: &NormalizedConversation) -> i64 {
    conversation
        .messages
        .iter()
        .rev()
        .find_map(|m| m.timing.map(|t| t.end))
        .unwrap_or(conversation.created_at)
}

/// Most recently active first; ties by `created_at` (newest first), then by id
pub fn compare(a: &NormalizedConversation, b: &NormalizedConversation) -> Ordering {
    effective_activity_time(b)
        .cmp(&effective_activity_time(a))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn rank(conversations: &mut [NormalizedConversation]) {
    conversations.sort_by(compare);
}

pub fn ranked(mut conversations: Vec<NormalizedConversation>) -> Vec<NormalizedConversation> {
    rank(&mut conversations);
    conversations
}

/// Keep only conversations with at least one assistant message
///
/// Meant for bulk export. Interactive browsing should not apply it: a
/// conversation the user only typed into is still one they may recognize.
pub fn filter_exportable(conversations: Vec<NormalizedConversation>) -> Vec<NormalizedConversation> {
    conversations.into_iter().filter(NormalizedConversation::has_assistant_content).collect()
}

/// Keep conversations active on or after the start of `date` (UTC)
pub fn filter_since(conversations: Vec<NormalizedConversation>, date: NaiveDate) -> Vec<NormalizedConversation> {
    let Some(start) = date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt).timestamp_millis()) else {
        return conversations;
    };
    conversations.into_iter().filter(|c| effective_activity_time(c) >= start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NormalizedMessage, Role, SourceTier, Timing};

    fn conversation(id: &str, created_at: i64, last_end: Option<i64>) -> NormalizedConversation {
        let messages = vec![NormalizedMessage {
            role: Role::Assistant,
            text: "answer".into(),
            code_blocks: Vec::new(),
            timing: last_end.map(|end| Timing { start: end - 10, end }),
        }];
        NormalizedConversation::new(id, created_at, SourceTier::Direct).with_messages(messages)
    }

    #[test]
    fn test_effective_time_prefers_message_timing() {
        assert_eq!(effective_activity_time(&conversation("a", 100, Some(5000))), 5000);
        assert_eq!(effective_activity_time(&conversation("a", 100, None)), 100);
        assert_eq!(effective_activity_time(&NormalizedConversation::new("m", 42, SourceTier::LocalRegistry)), 42);
    }

    #[test]
    fn test_effective_time_scans_back_to_last_timed_message() {
        let timed = conversation("a", 100, Some(700));
        let untimed = NormalizedMessage { role: Role::User, text: "q".into(), code_blocks: Vec::new(), timing: None };
        let mut messages = timed.messages.clone();
        messages.push(untimed);
        assert_eq!(effective_activity_time(&timed.with_messages(messages)), 700);
    }

    #[test]
    fn test_rank_by_effective_time_not_created_at() {
        // "old" was created first but was active most recently
        let old = conversation("old", 1000, Some(9000));
        let new = conversation("new", 5000, None);
        let ranked = ranked(vec![new, old]);
        assert_eq!(ranked[0].id, "old");
        assert_eq!(ranked[1].id, "new");
    }

    #[test]
    fn test_rank_tie_breaks() {
        let a = conversation("a", 100, Some(500));
        let b = conversation("b", 200, Some(500));
        let c = conversation("c", 200, Some(500));
        let ranked = ranked(vec![a, c, b]);
        let ids: Vec<&str> = ranked.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_rank_ignores_input_order() {
        let convs = vec![conversation("x", 1, Some(3)), conversation("y", 2, None), conversation("z", 5, None)];
        let mut reversed = convs.clone();
        reversed.reverse();
        let ids = |v: Vec<NormalizedConversation>| ranked(v).into_iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids(convs), vec!["z", "x", "y"]);
        assert_eq!(ids(reversed), vec!["z", "x", "y"]);
    }

    #[test]
    fn test_filter_exportable() {
        let with_answer = conversation("a", 1, None);
        let question_only = NormalizedConversation::new("q", 2, SourceTier::Direct).with_messages(vec![NormalizedMessage {
            role: Role::User,
            text: "hello?".into(),
            code_blocks: Vec::new(),
            timing: None,
        }]);
        let kept = filter_exportable(vec![with_answer, question_only]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "a");
    }

    #[test]
    fn test_filter_since() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap()).timestamp_millis();
        let before = conversation("before", start - 1, None);
        let after = conversation("after", 0, Some(start));
        let kept = filter_since(vec![before, after], day);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "after");
    }
}
