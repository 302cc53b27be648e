//! Property-based roster tests.
//!
//! Uses proptest to verify:
//! 1. `PresenceStore` never holds duplicates and keeps first-seen order
//!    under any sequence of adds, removes, and clears.
//! 2. Driving a controller with any sequence of server events leaves it
//!    with a roster that matches a simple model and a view whose member
//!    notifications replay to the same roster.

use chatline::controller::ChatSessionController;
use chatline::presence::PresenceStore;
use chatline::transport::loopback::LoopbackTransport;
use chatline::view::ViewEvent;
use chatline_proto::codec;
use chatline_proto::event::ServerEvent;
use chatline_proto::room::RoomName;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Remove(String),
    Clear,
}

/// A small name pool so adds and removes collide often.
fn arb_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["alice", "bob", "carol", "dave", "erin"]).prop_map(str::to_string)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arb_name().prop_map(Op::Add),
        3 => arb_name().prop_map(Op::Remove),
        1 => Just(Op::Clear),
    ]
}

fn arb_server_event() -> impl Strategy<Value = ServerEvent> {
    prop_oneof![
        arb_name().prop_map(|username| ServerEvent::Join { username }),
        arb_name().prop_map(|username| ServerEvent::Leave { username }),
        prop::collection::vec(arb_name(), 0..5)
            .prop_map(|usernames| ServerEvent::Presence { usernames }),
        Just(ServerEvent::Pong),
        (arb_name(), ".{0,10}")
            .prop_map(|(username, message)| ServerEvent::Broadcast { username, message }),
    ]
}

/// Reference model: ordered list with first-seen semantics.
fn model_apply(model: &mut Vec<String>, event: &ServerEvent) {
    match event {
        ServerEvent::Join { username } => {
            if !model.contains(username) {
                model.push(username.clone());
            }
        }
        ServerEvent::Leave { username } => model.retain(|m| m != username),
        ServerEvent::Presence { usernames } => {
            for u in usernames {
                if !model.contains(u) {
                    model.push(u.clone());
                }
            }
        }
        ServerEvent::Pong | ServerEvent::Broadcast { .. } => {}
    }
}

fn has_duplicates(names: &[String]) -> bool {
    names
        .iter()
        .enumerate()
        .any(|(i, n)| names[..i].contains(n))
}

proptest! {
    #[test]
    fn store_is_duplicate_free_and_ordered(ops in prop::collection::vec(arb_op(), 0..64)) {
        let mut store = PresenceStore::new();
        let mut model: Vec<String> = Vec::new();

        for op in &ops {
            match op {
                Op::Add(name) => {
                    let changed = store.add_member(name);
                    prop_assert_eq!(changed, !model.contains(name));
                    if changed {
                        model.push(name.clone());
                    }
                }
                Op::Remove(name) => {
                    let changed = store.remove_member(name);
                    prop_assert_eq!(changed, model.contains(name));
                    model.retain(|m| m != name);
                }
                Op::Clear => {
                    store.clear();
                    model.clear();
                }
            }
            prop_assert!(!has_duplicates(store.members()));
        }

        prop_assert_eq!(store.members(), model.as_slice());
    }

    #[test]
    fn controller_roster_matches_model(events in prop::collection::vec(arb_server_event(), 0..48)) {
        let transport = LoopbackTransport::auto_open();
        let mut controller = ChatSessionController::new(
            transport.clone(),
            Vec::<ViewEvent>::new(),
            RoomName::general(),
        );
        controller.pump();

        let conn = transport.latest().unwrap();
        let mut model: Vec<String> = Vec::new();
        for event in &events {
            conn.push_frame(codec::encode(event).unwrap());
            model_apply(&mut model, event);
        }
        controller.pump();

        prop_assert_eq!(controller.members(), model.as_slice());
        prop_assert!(!has_duplicates(controller.members()));

        // Replaying the view's member notifications rebuilds the same roster.
        let mut replayed: Vec<String> = Vec::new();
        for update in controller.view() {
            match update {
                ViewEvent::MemberAdded(name) => {
                    prop_assert!(!replayed.contains(name));
                    replayed.push(name.clone());
                }
                ViewEvent::MemberRemoved(name) => {
                    prop_assert!(replayed.contains(name));
                    replayed.retain(|m| m != name);
                }
                ViewEvent::MembersCleared => replayed.clear(),
                ViewEvent::Message { .. } | ViewEvent::Status(_) => {}
            }
        }
        prop_assert_eq!(replayed, model);
    }
}
