/// Integration tests for list properties replicated through commands

use kgame_shared::{PropertyList, PropertyPolicy, ID_USER};
use kgame_test::TestSession;

fn register_lists(session: &TestSession) -> Vec<PropertyList<String>> {
    session
        .participants()
        .iter()
        .map(|participant| PropertyList::new(ID_USER, participant.handler()).unwrap())
        .collect()
}

fn s(value: &str) -> String {
    value.to_string()
}

#[test]
fn append_append_remove_append_gives_b_c() {
    for policy in [PropertyPolicy::Clean, PropertyPolicy::Dirty] {
        let session = TestSession::new(2, 1, policy);
        let lists = register_lists(&session);

        lists[0].append(s("a")).unwrap();
        lists[0].append(s("b")).unwrap();
        if policy == PropertyPolicy::Clean {
            // remove validates on delivery, so let the appends arrive first
            session.pump();
        }
        lists[0].remove(0).unwrap();
        lists[0].append(s("c")).unwrap();
        session.pump();

        for list in &lists {
            assert_eq!(list.to_vec(), vec![s("b"), s("c")], "policy {:?}", policy);
        }
    }
}

#[test]
fn interleaved_writers_converge_under_clean() {
    let session = TestSession::new(3, 1, PropertyPolicy::Clean);
    let lists = register_lists(&session);

    lists[0].append(s("x")).unwrap();
    lists[1].prepend(s("y")).unwrap();
    lists[2].append(s("z")).unwrap();
    lists[1].insert(1, s("w")).unwrap();
    session.pump();

    let expected = vec![s("y"), s("w"), s("x"), s("z")];
    for list in &lists {
        assert_eq!(list.to_vec(), expected);
    }
}

#[test]
fn remove_value_and_clear_replicate() {
    let session = TestSession::new(2, 1, PropertyPolicy::Dirty);
    let lists = register_lists(&session);

    for item in ["a", "b", "c"] {
        lists[1].append(s(item)).unwrap();
    }
    assert_eq!(lists[1].remove_value(&s("b")), Ok(true));
    session.pump();
    assert_eq!(lists[0].to_vec(), vec![s("a"), s("c")]);

    lists[0].clear().unwrap();
    session.pump();
    assert!(lists[0].is_empty());
    assert!(lists[1].is_empty());
}

#[test]
fn stale_index_is_dropped_everywhere() {
    let session = TestSession::new(2, 1, PropertyPolicy::Clean);
    let lists = register_lists(&session);

    lists[0].append(s("only")).unwrap();
    session.pump();

    // both participants remove the last element before seeing the other's
    lists[0].remove(0).unwrap();
    lists[1].remove(0).unwrap();
    session.pump();

    assert!(lists[0].is_empty());
    assert!(lists[1].is_empty());
}

#[test]
fn whole_list_resend_replaces_contents() {
    let session = TestSession::new(2, 1, PropertyPolicy::Local);
    let lists = register_lists(&session);

    lists[0].append(s("local")).unwrap();
    assert_eq!(session.relay().pending(), 0);

    assert!(lists[0].send_current());
    session.pump();
    assert_eq!(lists[1].to_vec(), vec![s("local")]);
}
