use chrono::{DateTime, Utc};
use memory_window::SlidingWindow;

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
}

/// W=4, D=1. Four turns posted one at a time, picking and marking the
/// processing target after each append: the cursor always trails the tail
/// by exactly D, so only the newest turn is ever held back from commit.
#[test]
fn cursor_always_trails_tail_by_delay() {
    let mut w = SlidingWindow::new(4, 1).unwrap();

    for i in 1..=4 {
        w.append(format!("u{i}"), format!("a{i}"), now());
        if let Some(target) = w.pick_processing_target() {
            let id = target.turn_id;
            w.mark_processed(id, true, now());
        }
    }

    let info = w.info();
    assert_eq!(info.len, 4);
    // T1, T2, T3 committed; only the newest turn (T4) is held back by D=1.
    assert_eq!(info.processed, 3);

    let processed_sequences: Vec<u64> = w.all_turns().filter(|t| t.processed).map(|t| t.sequence).collect();
    assert_eq!(processed_sequences, vec![1, 2, 3]);
}
