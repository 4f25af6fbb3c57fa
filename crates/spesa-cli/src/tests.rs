use spesa_core::{
    Candidate, DriveId, ServiceFlags, StoreContext, StoreDirectory, StoreEntry, StoreRef,
    StreetDirectory, StreetEntry, StreetId,
};

use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["spesa"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn help_is_answered_by_the_parser() {
    let err = Cli::try_parse_from(["spesa", "--help"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

    let err = Cli::try_parse_from(["spesa", "harvest", "--help"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
}

#[test]
fn parses_repeated_postcodes() {
    let cli = Cli::try_parse_from([
        "spesa",
        "discover",
        "--postcode",
        "20121",
        "--postcode",
        "20122",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Discover { ref postcodes }) if postcodes == &["20121", "20122"]
    ));
}

#[test]
fn discover_requires_a_postcode() {
    assert!(Cli::try_parse_from(["spesa", "discover"]).is_err());
}

#[test]
fn topology_without_streets_defaults_to_empty() {
    let cli = Cli::try_parse_from(["spesa", "topology"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Topology { ref streets }) if streets.is_empty()
    ));
}

#[test]
fn topology_rejects_non_numeric_street() {
    assert!(Cli::try_parse_from(["spesa", "topology", "--street", "via-roma"]).is_err());
}

#[test]
fn harvest_defaults() {
    let cli = Cli::try_parse_from(["spesa", "harvest"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Harvest {
            store: None,
            dry_run: false
        })
    ));
}

#[test]
fn harvest_with_store_and_dry_run() {
    let cli = Cli::try_parse_from(["spesa", "harvest", "--store", "123", "--dry-run"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Harvest {
            store: Some(ref s),
            dry_run: true
        }) if s == "123"
    ));
}

#[test]
fn resolve_with_store_filter() {
    let cli = Cli::try_parse_from(["spesa", "resolve", "--store", "S1"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Resolve { store: Some(ref s) }) if s == "S1"
    ));
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["spesa", "collect"]).is_err());
}

fn entry(store_id: &str, street: u64, drive: Option<u64>, postal_code: &str) -> StoreEntry {
    StoreEntry {
        store_id: StoreRef::new(store_id),
        name: format!("store {store_id}"),
        postal_code: postal_code.to_owned(),
        town: None,
        coordinates: None,
        services: ServiceFlags {
            home_delivery: drive.is_none(),
            click_and_collect: drive.is_some(),
        },
        street_id: Some(StreetId(street)),
        drive_id: drive.map(DriveId),
        description: None,
    }
}

fn sample_directory() -> StoreDirectory {
    StoreDirectory {
        stores: vec![
            entry("S1", 1, None, "20121"),
            entry("S1", 2, None, "20121"),
            entry("L1", 1, Some(10), "20121"),
            entry("S2", 3, None, "20135"),
            entry("L2", 3, Some(20), "99999"),
        ],
    }
}

#[test]
fn explicit_streets_take_precedence() {
    let directory = StreetDirectory::from_entries([StreetEntry {
        street_id: StreetId(9),
        postal_code: "20121".to_owned(),
        display_name: "Via Roma".to_owned(),
        town: None,
    }])
    .unwrap();

    let streets = topology::select_streets(&[4, 5], Some(&directory)).unwrap();
    assert_eq!(streets, vec![StreetId(4), StreetId(5)]);

    let streets = topology::select_streets(&[], Some(&directory)).unwrap();
    assert_eq!(streets, vec![StreetId(9)]);
}

#[test]
fn no_streets_anywhere_is_an_error() {
    assert!(topology::select_streets(&[], None).is_err());
    assert!(topology::select_streets(&[], Some(&StreetDirectory::default())).is_err());
}

#[test]
fn harvest_filter_narrows_plan() {
    let directory = sample_directory();

    let all = harvest::select_targets(&directory, None).unwrap();
    assert_eq!(all.len(), 4, "S1 once, plus L1, S2, L2");

    let only = harvest::select_targets(&directory, Some("L1")).unwrap();
    assert_eq!(only.len(), 1);
    assert_eq!(only[0].context, StoreContext::pickup(StreetId(1), DriveId(10)));

    assert!(harvest::select_targets(&directory, Some("missing")).is_err());
}

#[test]
fn resolve_requests_cover_every_delivery_store() {
    let directory = sample_directory();

    let requests = resolve::build_requests(&directory, None).unwrap();
    let references: Vec<&str> = requests.iter().map(|r| r.reference.as_str()).collect();
    assert_eq!(references, vec!["S1", "S2"]);

    assert_eq!(
        requests[0].candidates,
        vec![Candidate::new(
            StoreContext::pickup(StreetId(1), DriveId(10)),
            "store L1"
        )]
    );
    assert!(requests[1].candidates.is_empty(), "no pickup point shares 20135");
}

#[test]
fn resolve_unknown_store_is_an_error() {
    let directory = sample_directory();
    assert!(resolve::build_requests(&directory, Some("nope")).is_err());
}
