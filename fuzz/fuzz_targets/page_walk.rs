#![no_main]

use chanstore::{Direction, Message, Store};
use libfuzzer_sys::fuzz_target;

// Each input byte adds one message at height `byte % 8` citing the previous
// message; the walk then checks forward paging sees every row exactly once.
fuzz_target!(|data: &[u8]| {
    let Some((&limit, rest)) = data.split_first() else {
        return;
    };
    let store = Store::open_ephemeral().expect("open store");
    let mut previous: Option<Vec<u8>> = None;
    for (i, byte) in rest.iter().take(64).enumerate() {
        let hash = vec![*byte, u8::try_from(i).unwrap_or(u8::MAX)];
        store
            .add_message(&Message {
                channel_id: b"fuzz".to_vec(),
                hash: hash.clone(),
                height: u64::from(byte % 8),
                parents: previous.take().into_iter().collect(),
                content: Vec::new(),
            })
            .expect("insert");
        previous = Some(hash);
    }

    let limit = i64::from(limit % 9) + 1;
    let mut seen = 0_u64;
    let mut cursor = None;
    loop {
        let page = store
            .query(b"fuzz", cursor.as_ref(), Direction::Forward, limit)
            .expect("page");
        assert!(page.messages.windows(2).all(|w| w[0].order_key() < w[1].order_key()));
        seen += page.messages.len() as u64;
        cursor = page.next_cursor(Direction::Forward);
        if cursor.is_none() {
            break;
        }
    }
    assert_eq!(seen, store.message_count(b"fuzz").expect("count"));
});
