use std::fs;

use keypunch::{CardDeck, DeckError, DeckLayout, GrowthContext};
use pretty_assertions::assert_eq;

fn rendered(deck: &CardDeck) -> Vec<String> {
    deck.list()
        .map(|(_, text)| String::from_utf8_lossy(text).into_owned())
        .collect()
}

#[test]
fn save_load_save_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");

    let mut deck = CardDeck::new();
    for line in ["//HELLO JOB 1\n", "//STEP EXEC PGM=IEFBR14\n", "\n", "short"] {
        deck.append(line.as_bytes()).unwrap();
    }
    deck.append(&[b'9'; 80]).unwrap();
    assert_eq!(deck.save(&first).unwrap(), 5);

    let mut reloaded = CardDeck::new();
    assert_eq!(reloaded.load(&first).unwrap(), 5);
    reloaded.save(&second).unwrap();

    let expected = format!(
        "//HELLO JOB 1\n//STEP EXEC PGM=IEFBR14\n\nshort\n{}\n",
        "9".repeat(80)
    );
    assert_eq!(fs::read_to_string(&first).unwrap(), expected);
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn long_lines_lose_everything_past_column_80() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.txt");
    fs::write(&path, format!("{}\nSECOND\n", "A".repeat(100))).unwrap();

    let mut deck = CardDeck::new();
    assert_eq!(deck.load(&path).unwrap(), 2);
    assert_eq!(rendered(&deck), vec!["A".repeat(80), "SECOND".to_string()]);
}

#[test]
fn unterminated_last_line_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tail.txt");
    fs::write(&path, "ONE\nTWO").unwrap();

    let mut deck = CardDeck::new();
    assert_eq!(deck.load(&path).unwrap(), 2);
    assert_eq!(rendered(&deck), vec!["ONE", "TWO"]);
}

#[test]
fn missing_file_leaves_deck_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let mut deck = CardDeck::new();
    deck.append(b"KEEP ME?\n").unwrap();

    let err = deck.load(&dir.path().join("absent.txt")).unwrap_err();
    assert!(matches!(err, DeckError::FileOpen { .. }));
    assert!(!err.is_fatal());
    assert!(deck.is_empty());
    assert!(deck.slot(0).unwrap().is_blank());
}

#[test]
fn load_grows_in_steps_of_ten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("many.txt");
    let body: String = (1..=25).map(|n| format!("CARD {n:02}\n")).collect();
    fs::write(&path, body).unwrap();

    let mut deck = CardDeck::with_layout(DeckLayout {
        initial_cards: 3,
        growth_step: 10,
        max_cards: None,
    })
    .unwrap();
    assert_eq!(deck.load(&path).unwrap(), 25);
    assert_eq!(deck.capacity(), 33);
    assert_eq!(rendered(&deck)[24], "CARD 25");
}

#[test]
fn running_out_of_slots_while_loading_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.txt");
    fs::write(&path, "1\n2\n3\n4\n").unwrap();

    let mut deck = CardDeck::with_layout(DeckLayout {
        initial_cards: 2,
        growth_step: 10,
        max_cards: Some(2),
    })
    .unwrap();
    let err = deck.load(&path).unwrap_err();
    assert!(matches!(
        err,
        DeckError::AllocationFailure {
            context: GrowthContext::Load,
            ..
        }
    ));
    assert!(err.is_fatal());
    assert!(deck.capacity() >= deck.len());
}

#[test]
fn save_into_a_directory_fails_without_touching_deck() {
    let dir = tempfile::tempdir().unwrap();
    let mut deck = CardDeck::new();
    deck.append(b"DATA\n").unwrap();

    let err = deck.save(dir.path()).unwrap_err();
    assert!(matches!(err, DeckError::FileCreate { .. }));
    assert_eq!(rendered(&deck), vec!["DATA"]);
}
