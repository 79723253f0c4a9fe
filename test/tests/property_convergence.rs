/// PROPERTY-BASED TESTS: replication invariants
///
/// Uses proptest to drive random operation sequences through several
/// participants.
///
/// Key invariants:
/// 1. Clean values converge to the last value the relay delivered
/// 2. Identical command streams give identical lists
/// 3. Bulk save then load reproduces every value

use proptest::prelude::*;

use kgame_shared::{
    BitReader, BitWriter, PropertyHandler, PropertyInt, PropertyList, PropertyPolicy, ID_USER,
};
use kgame_test::TestSession;

#[derive(Debug, Clone)]
enum ListOp {
    Append(i32),
    Prepend(i32),
    Remove(usize),
    Clear,
}

fn list_op_strategy() -> impl Strategy<Value = ListOp> {
    prop_oneof![
        4 => any::<i32>().prop_map(ListOp::Append),
        2 => any::<i32>().prop_map(ListOp::Prepend),
        3 => (0usize..8).prop_map(ListOp::Remove),
        1 => Just(ListOp::Clear),
    ]
}

proptest! {
    /// Whatever the order of writers, every participant ends on the value the
    /// relay delivered last
    #[test]
    fn prop_clean_values_converge(
        writes in prop::collection::vec((0usize..3, any::<i32>()), 1..20)
    ) {
        let session = TestSession::new(3, 1, PropertyPolicy::Clean);
        let scores: Vec<PropertyInt> = session
            .participants()
            .iter()
            .map(|participant| PropertyInt::new(ID_USER, participant.handler(), 0).unwrap())
            .collect();

        for (writer, value) in &writes {
            prop_assert!(scores[*writer].set_value(*value));
        }
        session.pump();

        let last = writes.last().map(|(_, value)| *value).unwrap();
        for score in &scores {
            prop_assert_eq!(score.value(), last);
        }
    }

    /// Lists stay identical across participants whoever issues the commands,
    /// including commands whose index turns out to be stale
    #[test]
    fn prop_clean_lists_converge(
        ops in prop::collection::vec((0usize..3, list_op_strategy()), 0..30)
    ) {
        let session = TestSession::new(3, 1, PropertyPolicy::Clean);
        let lists: Vec<PropertyList<i32>> = session
            .participants()
            .iter()
            .map(|participant| PropertyList::new(ID_USER, participant.handler()).unwrap())
            .collect();

        for (issuer, op) in &ops {
            let list = &lists[*issuer];
            let result = match op {
                ListOp::Append(value) => list.append(*value),
                ListOp::Prepend(value) => list.prepend(*value),
                ListOp::Remove(index) => list.remove(*index),
                ListOp::Clear => list.clear(),
            };
            prop_assert!(result.is_ok());
        }
        session.pump();

        let expected = lists[0].to_vec();
        for list in &lists[1..] {
            prop_assert_eq!(list.to_vec(), expected.clone());
        }
    }

    /// A Dirty list matches a plain Vec given the same operations
    #[test]
    fn prop_dirty_list_matches_vec(ops in prop::collection::vec(list_op_strategy(), 0..30)) {
        let session = TestSession::new(2, 1, PropertyPolicy::Dirty);
        let lists: Vec<PropertyList<i32>> = session
            .participants()
            .iter()
            .map(|participant| PropertyList::new(ID_USER, participant.handler()).unwrap())
            .collect();
        let mut model: Vec<i32> = Vec::new();

        for op in &ops {
            match op {
                ListOp::Append(value) => {
                    lists[0].append(*value).unwrap();
                    model.push(*value);
                }
                ListOp::Prepend(value) => {
                    lists[0].prepend(*value).unwrap();
                    model.insert(0, *value);
                }
                ListOp::Remove(index) => {
                    let result = lists[0].remove(*index);
                    if *index < model.len() {
                        prop_assert!(result.is_ok());
                        model.remove(*index);
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
                ListOp::Clear => {
                    lists[0].clear().unwrap();
                    model.clear();
                }
            }
            prop_assert_eq!(lists[0].to_vec(), model.clone());
        }
        session.pump();
        prop_assert_eq!(lists[1].to_vec(), model);
    }

    /// Saving a handler and loading the stream elsewhere reproduces its values
    #[test]
    fn prop_bulk_round_trip(values in prop::collection::vec(any::<i32>(), 0..16)) {
        let source = PropertyHandler::new(2);
        let target = PropertyHandler::new(2);
        let mut pairs = Vec::new();
        for (offset, value) in values.iter().enumerate() {
            let id = ID_USER + offset as u16;
            let original = PropertyInt::new(id, &source, 0).unwrap();
            original.set_local(*value);
            let copy = PropertyInt::new(id, &target, 0).unwrap();
            pairs.push((original, copy));
        }

        let mut writer = BitWriter::new();
        source.save(&mut writer);
        let bytes = writer.to_bytes();
        prop_assert!(target.load(&mut BitReader::new(&bytes)).is_ok());

        for (original, copy) in &pairs {
            prop_assert_eq!(original.value(), copy.value());
        }
    }
}
