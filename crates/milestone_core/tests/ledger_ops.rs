use milestone_core::db::open_db_in_memory;
use milestone_core::{
    CallContext, Identity, LedgerError, MilestoneInspection, MilestoneLedger,
    MilestoneValidationError, PriorityLevel, SqliteMilestoneRepository, TemporalBoundary,
};
use rusqlite::Connection;

fn identity(value: &str) -> Identity {
    Identity::new(value).unwrap()
}

fn ctx(caller: &str, height: u64) -> CallContext {
    CallContext::new(identity(caller), height)
}

fn ledger(conn: &mut Connection) -> MilestoneLedger<SqliteMilestoneRepository<'_>> {
    MilestoneLedger::new(SqliteMilestoneRepository::try_new(conn).unwrap())
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn register_then_get_roundtrip() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 10);

    ledger.register(&alice, "Run 5k").unwrap();

    let record = ledger.get(&alice.caller).unwrap();
    assert_eq!(record.description, "Run 5k");
    assert!(!record.completed);
    assert!(!ledger.is_completed(&alice.caller).unwrap());
}

#[test]
fn register_twice_is_duplicate() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);

    ledger.register(&alice, "first").unwrap();
    let err = ledger.register(&alice, "second").unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateMilestone(ref id) if *id == alice.caller));
    assert_eq!(ledger.get(&alice.caller).unwrap().description, "first");
}

#[test]
fn transfer_onto_registered_identity_is_duplicate() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);
    let mallory = ctx("mallory", 1);

    ledger.register(&alice, "mine").unwrap();
    let err = ledger
        .transfer(&mallory, &alice.caller, "overwrite attempt")
        .unwrap_err();
    assert_eq!(err.code(), "duplicate_milestone");
    assert_eq!(ledger.get(&alice.caller).unwrap().description, "mine");
}

#[test]
fn duplicate_is_reported_before_invalid_description() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);

    ledger.register(&alice, "mine").unwrap();
    assert!(matches!(
        ledger.register(&alice, "").unwrap_err(),
        LedgerError::DuplicateMilestone(_)
    ));
    assert!(matches!(
        ledger.transfer(&ctx("bob", 1), &alice.caller, "").unwrap_err(),
        LedgerError::DuplicateMilestone(_)
    ));
    assert_eq!(ledger.get(&alice.caller).unwrap().description, "mine");
}

#[test]
fn empty_description_creates_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut ledger = ledger(&mut conn);
        let alice = ctx("alice", 1);

        let err = ledger.register(&alice, "").unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ParameterViolation(MilestoneValidationError::EmptyDescription)
        ));
        assert!(matches!(
            ledger.get(&alice.caller).unwrap_err(),
            LedgerError::ObjectiveNotFound(_)
        ));
    }
    assert_eq!(count_rows(&conn, "milestones"), 0);
}

#[test]
fn oversized_or_non_ascii_description_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);

    let err = ledger.register(&alice, &"x".repeat(101)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::ParameterViolation(MilestoneValidationError::DescriptionTooLong { len: 101 })
    ));

    let err = ledger.register(&alice, "Lauf 5 km schnell \u{00fc}").unwrap_err();
    assert!(matches!(
        err,
        LedgerError::ParameterViolation(MilestoneValidationError::NonAsciiDescription)
    ));

    ledger.register(&alice, &"x".repeat(100)).unwrap();
}

#[test]
fn modify_overwrites_description_and_flag() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);

    ledger.register(&alice, "A").unwrap();
    ledger.modify(&alice, "B", true).unwrap();

    let record = ledger.get(&alice.caller).unwrap();
    assert_eq!(record.description, "B");
    assert!(record.completed);
    assert!(ledger.is_completed(&alice.caller).unwrap());

    ledger.modify(&alice, "B", false).unwrap();
    assert!(!ledger.is_completed(&alice.caller).unwrap());
}

#[test]
fn modify_without_record_or_with_empty_text_fails() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);

    let err = ledger.modify(&alice, "", true).unwrap_err();
    assert!(matches!(err, LedgerError::ObjectiveNotFound(_)));

    ledger.register(&alice, "keep me").unwrap();
    let err = ledger.modify(&alice, "", true).unwrap_err();
    assert_eq!(err.code(), "parameter_violation");

    let record = ledger.get(&alice.caller).unwrap();
    assert_eq!(record.description, "keep me");
    assert!(!record.completed);
}

#[test]
fn delete_removes_record_and_second_delete_fails() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);

    ledger.register(&alice, "short lived").unwrap();
    ledger.delete(&alice).unwrap();

    assert!(matches!(
        ledger.get(&alice.caller).unwrap_err(),
        LedgerError::ObjectiveNotFound(_)
    ));
    assert!(matches!(
        ledger.delete(&alice).unwrap_err(),
        LedgerError::ObjectiveNotFound(_)
    ));

    ledger.register(&alice, "second attempt").unwrap();
}

#[test]
fn priority_bounds_and_presence() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);

    for level in 1..=3 {
        assert!(matches!(
            ledger.set_priority(&alice, level).unwrap_err(),
            LedgerError::ObjectiveNotFound(_)
        ));
    }

    ledger.register(&alice, "prioritized").unwrap();
    for level in [0, 4, u32::MAX] {
        let err = ledger.set_priority(&alice, level).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ParameterViolation(MilestoneValidationError::PriorityOutOfRange { .. })
        ));
    }
    assert_eq!(ledger.priority_of(&alice.caller).unwrap(), None);

    for level in 1..=3 {
        ledger.set_priority(&alice, level).unwrap();
        assert_eq!(
            ledger.priority_of(&alice.caller).unwrap().map(PriorityLevel::get),
            Some(level)
        );
    }
}

#[test]
fn deadline_is_absolute_and_upserted() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);

    ledger.register(&ctx("alice", 100), "ship it").unwrap();
    ledger.set_deadline(&ctx("alice", 100), 50).unwrap();
    assert_eq!(
        ledger.deadline_of(&identity("alice")).unwrap(),
        Some(TemporalBoundary {
            target_height: 150,
            alerted: false
        })
    );

    ledger.set_deadline(&ctx("alice", 400), 5).unwrap();
    let boundary = ledger.deadline_of(&identity("alice")).unwrap().unwrap();
    assert_eq!(boundary.target_height, 405);
    assert!(!boundary.alerted);
}

#[test]
fn deadline_rejects_zero_offset_and_overflow() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 7);

    assert!(matches!(
        ledger.set_deadline(&alice, 0).unwrap_err(),
        LedgerError::ObjectiveNotFound(_)
    ));

    ledger.register(&alice, "bounded").unwrap();
    assert!(matches!(
        ledger.set_deadline(&alice, 0).unwrap_err(),
        LedgerError::ParameterViolation(MilestoneValidationError::ZeroDeadlineOffset)
    ));
    assert!(matches!(
        ledger.set_deadline(&alice, u64::MAX).unwrap_err(),
        LedgerError::ParameterViolation(MilestoneValidationError::DeadlineOverflow { .. })
    ));
    assert_eq!(ledger.deadline_of(&alice.caller).unwrap(), None);
}

#[test]
fn delete_leaves_orphan_priority_and_deadline() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut ledger = ledger(&mut conn);
        let alice = ctx("alice", 20);

        ledger.register(&alice, "orphan source").unwrap();
        ledger.set_priority(&alice, 2).unwrap();
        ledger.set_deadline(&alice, 10).unwrap();
        ledger.delete(&alice).unwrap();

        assert_eq!(
            ledger.priority_of(&alice.caller).unwrap().map(u32::from),
            Some(2)
        );
        assert_eq!(
            ledger
                .deadline_of(&alice.caller)
                .unwrap()
                .map(|boundary| boundary.target_height),
            Some(30)
        );

        // Orphans cannot be refreshed without a live record.
        assert!(matches!(
            ledger.set_priority(&alice, 3).unwrap_err(),
            LedgerError::ObjectiveNotFound(_)
        ));
        assert_eq!(
            ledger.priority_of(&alice.caller).unwrap().map(u32::from),
            Some(2)
        );
    }
    assert_eq!(count_rows(&conn, "milestones"), 0);
    assert_eq!(count_rows(&conn, "priorities"), 1);
    assert_eq!(count_rows(&conn, "deadlines"), 1);
}

#[test]
fn re_registered_identity_sees_earlier_orphans() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 20);

    ledger.register(&alice, "first round").unwrap();
    ledger.set_priority(&alice, 2).unwrap();
    ledger.set_deadline(&alice, 10).unwrap();
    ledger.delete(&alice).unwrap();

    ledger.register(&ctx("alice", 90), "second round").unwrap();

    assert_eq!(ledger.get(&alice.caller).unwrap().description, "second round");
    assert_eq!(
        ledger.priority_of(&alice.caller).unwrap().map(u32::from),
        Some(2)
    );
    assert_eq!(
        ledger.deadline_of(&alice.caller).unwrap(),
        Some(TemporalBoundary {
            target_height: 30,
            alerted: false
        })
    );
}

#[test]
fn keys_differing_only_by_whitespace_stay_independent() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let padded = ctx(" alice", 1);
    let plain = ctx("alice", 1);

    ledger.register(&padded, "mine").unwrap();
    ledger.register(&plain, "other").unwrap();
    ledger.set_priority(&padded, 1).unwrap();
    ledger.delete(&plain).unwrap();

    assert_eq!(ledger.get(&padded.caller).unwrap().description, "mine");
    assert!(matches!(
        ledger.get(&plain.caller).unwrap_err(),
        LedgerError::ObjectiveNotFound(_)
    ));
    assert_eq!(ledger.priority_of(&plain.caller).unwrap(), None);
}

#[test]
fn transfer_creates_record_for_unrelated_identity() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let x = ctx("caller-x", 3);
    let y = identity("target-y");

    ledger.transfer(&x, &y, "desc").unwrap();

    let record = ledger.get(&y).unwrap();
    assert_eq!(record.description, "desc");
    assert!(!record.completed);
    assert!(matches!(
        ledger.get(&x.caller).unwrap_err(),
        LedgerError::ObjectiveNotFound(_)
    ));

    // The target owns the record from now on.
    let y_ctx = CallContext::new(y.clone(), 3);
    ledger.modify(&y_ctx, "desc v2", true).unwrap();
    assert!(ledger.is_completed(&y).unwrap());
}

#[test]
fn transfer_to_self_and_empty_description() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);

    let err = ledger.transfer(&alice, &alice.caller, "").unwrap_err();
    assert_eq!(err.code(), "parameter_violation");

    ledger
        .transfer(&alice, &alice.caller.clone(), "self target")
        .unwrap();
    assert_eq!(ledger.get(&alice.caller).unwrap().description, "self target");
}

#[test]
fn absence_queries_are_stable_and_read_only() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let ledger = ledger(&mut conn);
        let ghost = ctx("ghost", 1);

        for _ in 0..3 {
            assert!(matches!(
                ledger.get(&ghost.caller).unwrap_err(),
                LedgerError::ObjectiveNotFound(_)
            ));
            assert!(matches!(
                ledger.is_completed(&ghost.caller).unwrap_err(),
                LedgerError::ObjectiveNotFound(_)
            ));
            assert_eq!(ledger.inspect(&ghost).unwrap(), MilestoneInspection::absent());
        }
    }
    for table in ["milestones", "priorities", "deadlines"] {
        assert_eq!(count_rows(&conn, table), 0, "{table} should stay empty");
    }
}

#[test]
fn inspect_reports_live_length_and_flag() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);

    ledger.register(&alice, "Run 5k").unwrap();
    assert_eq!(
        ledger.inspect(&alice).unwrap(),
        MilestoneInspection {
            exists: true,
            content_length: 6,
            is_finished: false,
        }
    );

    ledger.modify(&alice, "Run 10k today", true).unwrap();
    let inspection = ledger.inspect(&alice).unwrap();
    assert_eq!(inspection.content_length, 13);
    assert!(inspection.is_finished);
}

#[test]
fn stores_are_isolated_per_identity() {
    let mut conn = open_db_in_memory().unwrap();
    let mut ledger = ledger(&mut conn);
    let alice = ctx("alice", 1);
    let bob = ctx("bob", 1);

    ledger.register(&alice, "alice goal").unwrap();
    ledger.register(&bob, "bob goal").unwrap();
    ledger.set_priority(&alice, 1).unwrap();
    ledger.modify(&bob, "bob goal", true).unwrap();
    ledger.delete(&alice).unwrap();

    assert!(ledger.is_completed(&bob.caller).unwrap());
    assert_eq!(ledger.priority_of(&bob.caller).unwrap(), None);
    assert!(ledger.get(&alice.caller).is_err());
}
