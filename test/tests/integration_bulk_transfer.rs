/// Integration tests for bulk transfer: bringing a late joiner up to date
/// and moving players between participants

use std::sync::Arc;

use kgame_shared::{
    BitReader, BitWriter, LocalRelay, Player, PropertyInt, PropertyList, PropertyPolicy,
    PropertyString, ID_USER,
};
use kgame_test::TestSession;

#[test]
fn late_joiner_loads_full_state() {
    let session = TestSession::new(2, 4, PropertyPolicy::Clean);
    let host = session.participant(0).handler();
    let joiner = session.participant(1).handler();

    let host_score = PropertyInt::new(ID_USER, host, 0).unwrap();
    let host_moves: PropertyList<u32> = PropertyList::new(ID_USER + 1, host).unwrap();
    let host_title = PropertyString::new(ID_USER + 2, host, String::new()).unwrap();

    host_score.set_value(12);
    host_moves.append(3).unwrap();
    host_moves.append(4).unwrap();
    host_title.set_value("Final".to_string());
    // the joiner registers nothing yet, so its copy of the traffic is dropped
    session.pump();

    let mut writer = BitWriter::new();
    host.save(&mut writer);
    let snapshot = writer.to_bytes();

    let score = PropertyInt::new(ID_USER, joiner, 0).unwrap();
    let moves: PropertyList<u32> = PropertyList::new(ID_USER + 1, joiner).unwrap();
    let title = PropertyString::new(ID_USER + 2, joiner, String::new()).unwrap();
    joiner.load(&mut BitReader::new(&snapshot)).unwrap();

    assert_eq!(score.value(), 12);
    assert_eq!(moves.to_vec(), vec![3, 4]);
    assert_eq!(title.value(), "Final");

    // later traffic keeps both in step
    host_moves.append(5).unwrap();
    session.pump();
    assert_eq!(moves.to_vec(), vec![3, 4, 5]);
}

#[test]
fn players_replicate_and_transfer() {
    let relay = LocalRelay::new();
    let links = [Arc::new(relay.connect()), Arc::new(relay.connect())];
    let players: Vec<Player> = links
        .iter()
        .map(|link| {
            let player = Player::new(100).unwrap();
            player.set_transport(link.clone());
            player
        })
        .collect();

    players[0].set_name("Alice");
    players[0].set_turn(true);
    for (player, link) in players.iter().zip(&links) {
        for envelope in link.drain() {
            assert!(player.network_transmission(
                &envelope.payload,
                envelope.is_from(link.client_id())
            ));
        }
    }
    assert_eq!(players[1].name(), "Alice");
    assert!(players[1].my_turn());

    let mut writer = BitWriter::new();
    players[1].save(&mut writer);
    let bytes = writer.to_bytes();

    let restored = Player::new(100).unwrap();
    restored.load(&mut BitReader::new(&bytes)).unwrap();
    assert_eq!(restored.name(), "Alice");
    assert!(restored.my_turn());
}
