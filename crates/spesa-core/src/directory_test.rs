use std::io::Write;

use super::*;

fn delivery(store: &str, street: u64, postal_code: &str) -> StoreEntry {
    StoreEntry {
        store_id: StoreRef::new(store),
        name: format!("Esselunga {store}"),
        postal_code: postal_code.to_owned(),
        town: Some("Milano".to_owned()),
        coordinates: None,
        services: ServiceFlags {
            home_delivery: true,
            click_and_collect: false,
        },
        street_id: Some(StreetId(street)),
        drive_id: None,
        description: None,
    }
}

fn locker(store: &str, street: u64, drive: u64, postal_code: &str, description: &str) -> StoreEntry {
    StoreEntry {
        store_id: StoreRef::new(store),
        name: format!("Locker {store}"),
        postal_code: postal_code.to_owned(),
        town: Some("Milano".to_owned()),
        coordinates: None,
        services: ServiceFlags::default(),
        street_id: Some(StreetId(street)),
        drive_id: Some(DriveId(drive)),
        description: Some(description.to_owned()),
    }
}

fn sample_directory() -> StoreDirectory {
    StoreDirectory {
        stores: vec![
            delivery("115", 1001, "20121"),
            delivery("115", 1002, "20121"),
            delivery("230", 2001, "20900"),
            locker("L1", 1001, 51, "20121", "LOCKER VIA ROMA"),
            locker("L2", 1003, 52, "20121", "Clicca e Vai Piazza"),
            locker("L3", 2001, 53, "20900", "LOCKER MONZA"),
            locker("X9", 1004, 54, "20121", "punto ritiro generico"),
        ],
    }
}

#[test]
fn resolution_request_collects_candidates_by_postal_code() {
    let dir = sample_directory();
    let request = dir.resolution_request(&StoreRef::new("115")).unwrap();

    assert_eq!(request.reference_contexts.len(), 2);
    assert_eq!(
        request.reference_contexts[0],
        StoreContext::home_delivery(StreetId(1001))
    );
    let labels: Vec<&str> = request.candidates.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Locker L1", "Locker L2"]);
}

#[test]
fn resolution_request_unknown_store_fails() {
    let dir = sample_directory();
    let err = dir.resolution_request(&StoreRef::new("999")).unwrap_err();
    assert!(matches!(err, DirectoryError::UnknownStore(ref s) if s.as_str() == "999"));
}

#[test]
fn resolution_request_pickup_only_store_fails() {
    let dir = sample_directory();
    let err = dir.resolution_request(&StoreRef::new("L1")).unwrap_err();
    assert!(matches!(err, DirectoryError::NoReferenceStreet(_)));
}

#[test]
fn pickup_point_detected_by_service_flag() {
    let mut entry = locker("L9", 1, 2, "20121", "generic");
    assert!(!entry.is_pickup_point());
    entry.services.click_and_collect = true;
    assert!(entry.is_pickup_point());
    entry.drive_id = None;
    assert!(!entry.is_pickup_point());
}

#[test]
fn delivery_store_ids_are_unique_and_ordered() {
    let dir = sample_directory();
    let ids: Vec<String> = dir
        .delivery_store_ids()
        .into_iter()
        .map(|s| s.0)
        .collect();
    assert_eq!(ids, vec!["115", "230"]);
}

#[test]
fn harvest_plan_uses_first_street_per_delivery_store() {
    let dir = sample_directory();
    let plan = dir.harvest_plan();
    let store_115: Vec<&HarvestTarget> = plan
        .iter()
        .filter(|t| t.store_id.as_str() == "115")
        .collect();
    assert_eq!(store_115.len(), 1);
    assert_eq!(store_115[0].context, StoreContext::home_delivery(StreetId(1001)));

    let l2 = plan.iter().find(|t| t.store_id.as_str() == "L2").unwrap();
    assert_eq!(l2.context, StoreContext::pickup(StreetId(1003), DriveId(52)));
    assert_eq!(plan.len(), 6);
}

#[test]
fn validate_rejects_drive_without_street() {
    let mut entry = locker("L1", 1, 2, "20121", "LOCKER");
    entry.street_id = None;
    let dir = StoreDirectory {
        stores: vec![entry],
    };
    assert!(matches!(dir.validate(), Err(DirectoryError::Validation(_))));
}

#[test]
fn load_store_directory_from_yaml() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        r#"stores:
  - store_id: "115"
    name: Esselunga Viale Piave
    postal_code: "20129"
    street_id: 1001
    services:
      home_delivery: true
  - store_id: "L1"
    name: Locker Piave
    postal_code: "20129"
    street_id: 1001
    drive_id: 51
    description: LOCKER VIALE PIAVE
"#
    )
    .unwrap();

    let dir = StoreDirectory::load(file.path()).unwrap();
    assert_eq!(dir.stores.len(), 2);
    assert!(dir.stores[1].is_pickup_point());
    assert!(dir.stores[0].services.home_delivery);
}

#[test]
fn load_street_directory_from_json() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"streets": [
            {{"street_id": 7, "postal_code": "20121", "display_name": "VIA ROMA"}},
            {{"street_id": 3, "postal_code": "20121", "display_name": "VIA VERDI", "town": "Milano"}}
        ]}}"#
    )
    .unwrap();

    let dir = StreetDirectory::load(file.path()).unwrap();
    assert_eq!(dir.len(), 2);
    let ids: Vec<StreetId> = dir.ids().collect();
    assert_eq!(ids, vec![StreetId(3), StreetId(7)]);
    assert_eq!(dir.get(StreetId(3)).unwrap().town.as_deref(), Some("Milano"));
}

#[test]
fn street_directory_rejects_duplicates() {
    let entry = StreetEntry {
        street_id: StreetId(1),
        postal_code: "20121".to_owned(),
        display_name: "VIA ROMA".to_owned(),
        town: None,
    };
    let err = StreetDirectory::from_entries([entry.clone(), entry]).unwrap_err();
    assert!(matches!(err, DirectoryError::Validation(ref m) if m.contains("duplicate")));
}

#[test]
fn street_directory_insert_keeps_first_entry() {
    let street = |name: &str| StreetEntry {
        street_id: StreetId(1),
        postal_code: "20121".to_owned(),
        display_name: name.to_owned(),
        town: None,
    };
    let mut dir = StreetDirectory::default();

    assert!(dir.insert(street("VIA ROMA")));
    assert!(!dir.insert(street("VIA ROMA BIS")));
    assert_eq!(dir.len(), 1);
    assert_eq!(dir.get(StreetId(1)).unwrap().display_name, "VIA ROMA");
}

#[test]
fn street_directory_yaml_round_trips_through_load() {
    let dir = StreetDirectory::from_entries([StreetEntry {
        street_id: StreetId(9),
        postal_code: "20900".to_owned(),
        display_name: "VIA MONZA".to_owned(),
        town: Some("Monza".to_owned()),
    }])
    .unwrap();
    let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
    file.write_all(dir.to_yaml().unwrap().as_bytes()).unwrap();
    assert_eq!(StreetDirectory::load(file.path()).unwrap(), dir);
}

#[test]
fn load_missing_file_is_io_error() {
    let err = StoreDirectory::load(Path::new("/nonexistent/stores.yaml")).unwrap_err();
    assert!(matches!(err, DirectoryError::Io { .. }));
}
