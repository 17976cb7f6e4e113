use super::IdentityRegistry;

#[test]
pub fn plain_names_without_anonymization() {
    let mut registry = IdentityRegistry::new();

    assert_eq!(registry.register("postgres", Some("X"), false), "postgres");
    assert_eq!(registry.display_name("postgres"), "postgres");
    assert_eq!(registry.real_name("postgres"), Some("postgres"));
}

#[test]
pub fn generic_names_take_ascending_letters() {
    let mut registry = IdentityRegistry::new();

    assert_eq!(registry.register("postgres", None, true), "DBMS A");
    assert_eq!(registry.register("mysql", Some(""), true), "DBMS B");
    assert_eq!(registry.display_name("mysql"), "DBMS B");
    assert_eq!(registry.real_name("DBMS A"), Some("postgres"));
}

#[test]
pub fn colliding_alias_renames_earlier_registration() {
    let mut registry = IdentityRegistry::new();

    assert_eq!(registry.register("postgres-12", Some("X"), true), "X");
    assert_eq!(registry.register("postgres-13", Some("X"), true), "X B");

    assert_eq!(registry.display_name("postgres-12"), "X A");
    assert_eq!(registry.display_name("postgres-13"), "X B");
    assert_eq!(registry.real_name("X A"), Some("postgres-12"));
    assert_eq!(registry.real_name("X B"), Some("postgres-13"));
    assert_eq!(registry.real_name("X"), None);

    // a third collision keeps counting
    assert_eq!(registry.register("postgres-14", Some("X"), true), "X C");
    assert_eq!(registry.len(), 3);
}

#[test]
pub fn reset_restarts_lettering() {
    let mut registry = IdentityRegistry::new();
    registry.register("postgres", None, true);
    registry.reset();

    assert!(registry.is_empty());
    assert_eq!(registry.register("mysql", None, true), "DBMS A");
}

#[test]
pub fn many_generic_names_stay_unique() {
    let mut registry = IdentityRegistry::new();

    let names = (0..300)
        .map(|number| registry.register(&format!("dbms-{number}"), None, true))
        .collect::<Vec<_>>();

    assert_eq!(registry.len(), 300);
    for (number, name) in names.iter().enumerate() {
        assert_eq!(registry.real_name(name), Some(format!("dbms-{number}").as_str()));
    }
    let mut unique = names.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 300);
}
