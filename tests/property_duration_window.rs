//! Property: a duration goal's progress is exactly the sum of the completed
//! sessions of its user that finished inside the goal window.

mod common;

use chrono::Duration;
use proptest::prelude::*;
use uuid::Uuid;

use common::{at, january_goal, Harness};
use practice_tracker::domain::models::{GoalTarget, GoalType, Session, SessionStatus};

#[derive(Debug, Clone)]
struct SessionCase {
    offset_minutes: i64,
    duration_secs: i64,
    own_user: bool,
    completed: bool,
}

fn session_case() -> impl Strategy<Value = SessionCase> {
    // Offsets span December through February relative to 2024-01-01 00:00.
    (-(31 * 24 * 60_i64)..(62 * 24 * 60_i64), 0..7200_i64, any::<bool>(), prop::bool::weighted(0.8))
        .prop_map(|(offset_minutes, duration_secs, own_user, completed)| SessionCase {
            offset_minutes,
            duration_secs,
            own_user,
            completed,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn duration_progress_matches_in_window_sum(cases in prop::collection::vec(session_case(), 0..25)) {
        let (stored, expected) = tokio_test::block_on(async {
            let h = Harness::new().await;
            let user = Uuid::new_v4();
            let stranger = Uuid::new_v4();
            let goal = january_goal(user, GoalType::PracticeDuration, GoalTarget::new().with("minutes", 1_000_000));
            h.insert_goal(&goal).await;

            let window = goal.progress_window(chrono::Utc::now()).unwrap().unwrap();
            let origin = at(2024, 1, 1, 0, 0, 0);
            let mut expected = 0;

            for case in &cases {
                let owner = if case.own_user { user } else { stranger };
                let completed_at = origin + Duration::minutes(case.offset_minutes);
                let mut session = Session::completed(owner, case.duration_secs, completed_at);
                if !case.completed {
                    session.status = SessionStatus::Paused;
                    session.completed_at = None;
                }
                h.insert_session(&session).await;

                if case.own_user && case.completed && window.contains(completed_at) {
                    expected += case.duration_secs;
                }
            }

            h.service.recalculate_goal(goal.id, None).await.unwrap();
            (h.reload(goal.id).await.current_value, expected)
        });

        prop_assert_eq!(stored, expected);
    }
}
