//! End-to-end URL assembly tests against the public API

use chrono::NaiveDate;
use cmk_admin::urls::{
    inventory_url, masked_inventory_url, masked_view_url, view_url, InventoryAction,
    InventoryOptions, ReportAction, ViewOptions,
};
use cmk_admin::{ConnectionConfig, TargetType};

fn config() -> ConnectionConfig {
    ConnectionConfig {
        server: "mon1.example.com".to_string(),
        site: "prod".to_string(),
        user: "automation".to_string(),
        apikey: "sekrit-key".to_string(),
        debug: false,
    }
}

#[test]
fn add_host_url_matches_the_wire_format() {
    let opts = InventoryOptions {
        create_folders: true,
        ..Default::default()
    };
    let url = inventory_url(&config(), InventoryAction::AddHost, &opts);
    assert_eq!(
        url,
        "https://mon1.example.com/prod/check_mk/webapi.py?_username=automation\
         &action=add_host&create_folders=0&_secret=sekrit-key"
    );
}

#[test]
fn activate_changes_url_matches_the_wire_format() {
    let url = inventory_url(
        &config(),
        InventoryAction::ActivateChanges,
        &InventoryOptions::default(),
    );
    assert_eq!(
        url,
        "https://mon1.example.com/prod/check_mk/webapi.py?_username=automation\
         &action=activate_changes&mode=dirty&_secret=sekrit-key"
    );
}

#[test]
fn hostreport_url_matches_the_wire_format() {
    let url = view_url(
        &config(),
        ReportAction::HostReport,
        &ViewOptions::default(),
    )
    .unwrap();
    assert_eq!(
        url,
        "https://mon1.example.com/prod/check_mk/view.py?_username=automation\
         &_secret=sekrit-key&output_format=json&view_name=hostproblems_expanded"
    );
}

#[test]
fn downtime_url_matches_the_wire_format() {
    let opts = ViewOptions {
        target: Some(TargetType::Host),
        host: Some("h1".to_string()),
        comment: Some("kernel upgrade".to_string()),
        start: Some(
            NaiveDate::from_ymd_opt(2026, 8, 6)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        ),
        hours: Some(2),
        ..Default::default()
    };
    let url = view_url(&config(), ReportAction::Downtime, &opts).unwrap();
    assert_eq!(
        url,
        "https://mon1.example.com/prod/check_mk/view.py?_username=automation\
         &_secret=sekrit-key&output_format=json&_transid=-1&_do_confirm=yes\
         &_do_actions=yes&_down_custom=Custom%2Btime_range\
         &_down_from_date=2026-08-06&_down_from_time=10%3A00\
         &_down_to_date=2026-08-06&_down_to_time=12%3A00\
         &_down_comment=kernel%20upgrade&host=h1&view_name=hoststatus"
    );
}

#[test]
fn masked_renderings_never_leak_the_key() {
    let masked = masked_inventory_url(
        &config(),
        InventoryAction::GetAllHosts,
        &InventoryOptions::default(),
    );
    assert!(!masked.contains("sekrit-key"), "{masked}");

    let masked = masked_view_url(
        &config(),
        ReportAction::SvcReport,
        &ViewOptions::default(),
    )
    .unwrap();
    assert!(!masked.contains("sekrit-key"), "{masked}");
}
