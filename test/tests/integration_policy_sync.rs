/// Integration tests for the three synchronization policies across several
/// participants sharing one relay

use std::sync::{Arc, Mutex};

use kgame_shared::{PropertyConfig, PropertyInt, PropertyPolicy, PropertyString, ID_USER};
use kgame_test::TestSession;

fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

fn register_scores(session: &TestSession) -> Vec<PropertyInt> {
    session
        .participants()
        .iter()
        .map(|participant| PropertyInt::new(ID_USER, participant.handler(), 0).unwrap())
        .collect()
}

#[test]
fn clean_values_change_only_on_delivery() {
    init_logging();
    let session = TestSession::new(3, 10, PropertyPolicy::Clean);
    let scores = register_scores(&session);

    assert!(scores[0].set_value(5));
    for score in &scores {
        assert_eq!(score.value(), 0, "no participant may see the value before delivery");
    }

    session.pump();
    for score in &scores {
        assert_eq!(score.value(), 5);
        assert!(!score.is_dirty());
    }
}

#[test]
fn clean_concurrent_writes_converge_to_relay_order() {
    init_logging();
    let session = TestSession::new(3, 10, PropertyPolicy::Clean);
    let scores = register_scores(&session);

    scores[2].set_value(1);
    scores[0].set_value(2);
    scores[1].set_value(3);
    session.pump();

    for score in &scores {
        assert_eq!(score.value(), 3);
    }
}

#[test]
fn clean_participants_see_the_same_history() {
    let session = TestSession::new(2, 10, PropertyPolicy::Clean);
    let histories: Vec<Arc<Mutex<Vec<i32>>>> = (0..2).map(|_| Arc::default()).collect();

    let viewers: Vec<Arc<PropertyInt>> = session
        .participants()
        .iter()
        .map(|participant| {
            Arc::new(PropertyInt::new(ID_USER + 1, participant.handler(), 0).unwrap())
        })
        .collect();
    for ((participant, history), viewer) in session
        .participants()
        .iter()
        .zip(&histories)
        .zip(&viewers)
    {
        let (history, viewer) = (history.clone(), viewer.clone());
        participant.handler().on_property_changed(move |id| {
            if id == ID_USER + 1 {
                history.lock().unwrap().push(viewer.value());
            }
        });
    }

    viewers[0].set_value(1);
    viewers[1].set_value(2);
    viewers[0].set_value(3);
    session.pump();

    assert_eq!(*histories[0].lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(*histories[1].lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn dirty_applies_immediately_and_converges() {
    let session = TestSession::new(2, 10, PropertyPolicy::Dirty);
    let scores = register_scores(&session);

    assert!(scores[0].set_value(9));
    assert_eq!(scores[0].value(), 9);
    assert!(scores[0].is_dirty());
    assert_eq!(scores[1].value(), 0);

    session.pump();
    assert_eq!(scores[0].value(), 9);
    assert_eq!(scores[1].value(), 9);
    assert!(!scores[1].is_dirty());
    // the originator skipped its own echo
    assert!(scores[0].is_dirty());
}

#[test]
fn local_values_stay_local() {
    let session = TestSession::new(2, 10, PropertyPolicy::Local);
    let scores = register_scores(&session);

    assert!(scores[0].set_value(4));
    assert_eq!(session.relay().pending(), 0);
    session.pump();
    assert_eq!(scores[0].value(), 4);
    assert_eq!(scores[1].value(), 0);
}

#[test]
fn flush_publishes_local_changes() {
    let session = TestSession::new(2, 10, PropertyPolicy::Local);
    let names: Vec<PropertyString> = session
        .participants()
        .iter()
        .map(|participant| {
            PropertyString::with_config(
                ID_USER,
                participant.handler(),
                String::new(),
                PropertyConfig::default().named("Name"),
            )
            .unwrap()
        })
        .collect();

    names[0].set_value("Alice".to_string());
    session.participant(0).handler().flush();
    session.pump();

    assert_eq!(names[1].value(), "Alice");
    assert!(!names[1].is_dirty());
}

#[test]
fn optimized_property_sends_nothing_for_equal_value() {
    let session = TestSession::new(2, 10, PropertyPolicy::Clean);
    let score = PropertyInt::with_config(
        ID_USER,
        session.participant(0).handler(),
        3,
        PropertyConfig::default().optimized(true),
    )
    .unwrap();

    assert!(score.set_value(3));
    assert_eq!(session.relay().pending(), 0);
}

#[test]
fn read_only_property_sends_nothing() {
    let session = TestSession::new(2, 10, PropertyPolicy::Clean);
    let scores = register_scores(&session);
    session.participant(0).handler().lock_properties();

    assert!(!scores[0].set_value(3));
    assert_eq!(session.relay().pending(), 0);

    session.participant(0).handler().unlock_properties();
    assert!(scores[0].set_value(3));
    session.pump();
    assert_eq!(scores[1].value(), 3);
}

#[test]
fn other_handlers_ignore_foreign_messages() {
    let session = TestSession::new(1, 10, PropertyPolicy::Clean);
    let other = kgame_test::Participant::connect(session.relay(), 11, PropertyPolicy::Clean);
    let mine = PropertyInt::new(ID_USER, session.participant(0).handler(), 0).unwrap();
    let theirs = PropertyInt::new(ID_USER, other.handler(), 0).unwrap();

    mine.set_value(8);
    session.pump();
    assert_eq!(mine.value(), 8);
    // the outside client's queue is left alone
    assert_eq!(session.relay().pending(), 1);

    assert_eq!(other.receive_all(), 1);
    assert_eq!(theirs.value(), 0);
    assert_eq!(session.relay().pending(), 0);
}
