//! Troop catalog and credential store loading.

use tcr_server::{auth::UserStore, catalog::TroopCatalog};

const SPECS: &str = r#"{
  "troops": {
    "Pawn":   { "HP": 50,   "ATK": 150.0, "DEF": 100, "MANA": 3, "EXP": 5,  "Special": "" },
    "Queen":  { "HP": 1,    "ATK": 0,     "DEF": 0,   "MANA": 5, "EXP": 30, "Special": "heal" }
  }
}"#;

#[test]
fn loads_troops_keyed_by_lowercase_name() {
    let catalog = TroopCatalog::from_json(SPECS).expect("valid specs");

    assert_eq!(catalog.len(), 2);
    let pawn = catalog.get("PAWN").expect("pawn present");
    assert_eq!(pawn.name, "Pawn");
    assert_eq!((pawn.hp, pawn.atk, pawn.def, pawn.mana, pawn.exp), (50, 150, 100, 3, 5));
    assert_eq!(catalog.get("queen").map(|q| q.special.as_str()), Some("heal"));
    assert!(catalog.get("rook").is_none());
    assert_eq!(catalog.names(), vec!["Pawn", "Queen"]);
}

#[test]
fn rejects_fractional_or_negative_stats() {
    let fractional = r#"{"troops":{"X":{"HP":1.5,"ATK":1,"DEF":1,"MANA":1,"EXP":1,"Special":""}}}"#;
    let negative = r#"{"troops":{"X":{"HP":1,"ATK":-1,"DEF":1,"MANA":1,"EXP":1,"Special":""}}}"#;
    assert!(TroopCatalog::from_json(fractional).is_err());
    assert!(TroopCatalog::from_json(negative).is_err());
}

#[test]
fn rejects_documents_without_troops_section() {
    assert!(TroopCatalog::from_json(r#"{"units":{}}"#).is_err());
}

#[test]
fn missing_file_reports_path() {
    let err = TroopCatalog::load("does/not/exist.json").unwrap_err();
    assert!(format!("{err:#}").contains("does/not/exist.json"));
}

#[test]
fn user_store_checks_exact_credentials() {
    let users = UserStore::from_json(
        r#"{"users":[{"username":"alice","password":"alice123"}]}"#,
    )
    .expect("valid users");

    assert!(users.check("alice", "alice123"));
    assert!(!users.check("alice", "ALICE123"));
    assert!(!users.check("mallory", "alice123"));
}
