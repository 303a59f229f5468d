//! Property tests for `--room NAME=DESCRIPTION` parsing.

use natter_proto::{Config, Payload, Room};
use natter_server::parse_room;
use proptest::prelude::*;

proptest! {
    #[test]
    fn parsed_rooms_encode(
        name in "[A-Za-z0-9_-]{1,16}",
        description in "[A-Za-z0-9][A-Za-z0-9 =]{0,30}[A-Za-z0-9]",
    ) {
        let room = parse_room(&format!("{name}={description}")).expect("valid room");
        prop_assert_eq!(&room, &Room::new(name, description));

        let frame = Payload::Config(Config::new(vec![room])).into_frame();
        prop_assert!(frame.is_ok());
    }

    #[test]
    fn missing_separator_is_rejected(spec in "[A-Za-z0-9 ]{0,32}") {
        prop_assert!(parse_room(&spec).is_err());
    }
}
