//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `checkin_core` linkage with a deterministic probe.
//! - `demo` walks one meeting through check-in, a failed sync and a
//!   successful sync against the in-process attendance store.

use checkin_core::{
    open_db_in_memory, AttendeeSelection, CheckInRequest, CheckinConfig, CheckinSession,
    InMemoryAttendanceStore, MeetingContext, MeetingDetails, MeetingType, OwnerContactInfo,
    OwnerDirectoryEntry,
};
use std::process::ExitCode;

const DEMO_PLAN: &str = "SP1001";
const DEMO_DATE: &str = "2026-10-19";

fn main() -> ExitCode {
    println!("checkin_core ping={}", checkin_core::ping());
    println!("checkin_core version={}", checkin_core::core_version());

    match std::env::args().nth(1).as_deref() {
        None => ExitCode::SUCCESS,
        Some("demo") => match run_demo() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("demo failed: {err}");
                ExitCode::FAILURE
            }
        },
        Some(other) => {
            eprintln!("unknown command `{other}`; expected `demo`");
            ExitCode::from(2)
        }
    }
}

fn run_demo() -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let store = InMemoryAttendanceStore::new();
    store.set_owners(
        DEMO_PLAN,
        vec![
            owner(1, Some("Mr J S Smith"), Some("John Smith & Jane Smith"), "1"),
            owner(2, Some("Harbour Investments Pty Ltd"), None, "2"),
            owner(3, Some("Alex Chen"), None, "3A"),
        ],
    );

    let context = MeetingContext::for_date(
        DEMO_PLAN,
        DEMO_DATE,
        MeetingDetails {
            meeting_type: MeetingType::Agm,
            quorum_total: 10,
        },
    )?;
    store.register_meeting(context.meeting_id(), DEMO_PLAN, DEMO_DATE);

    let session = CheckinSession::open(&conn, &store, context, CheckinConfig::default(), 0)?;
    session.load_reference_data(0);
    for lot in 1..=3 {
        println!("lot {lot} identity={:?}", session.owner_identity(lot));
    }

    session.check_in(&CheckInRequest {
        lot: 1,
        selection: AttendeeSelection::Owners {
            names: vec!["John Smith".to_string(), "Jane Smith".to_string()],
        },
        is_financial: true,
    })?;
    session.check_in(&CheckInRequest {
        lot: 2,
        selection: AttendeeSelection::Company {
            company_name: "Harbour Investments Pty Ltd".to_string(),
            representative: "Sam Rep".to_string(),
        },
        is_financial: true,
    })?;

    store.set_online(false);
    print_report("offline sync", &session.sync_now()?);

    session.check_in(&CheckInRequest {
        lot: 3,
        selection: AttendeeSelection::Proxy {
            owner_names: vec!["Alex Chen".to_string()],
            proxy_holder: "Pat Proxy".to_string(),
        },
        is_financial: false,
    })?;

    store.set_online(true);
    if let Some(report) = session.tick(60_000)? {
        print_report("scheduled sync", &report);
    }

    let view = session.view()?;
    for row in &view.rows {
        println!(
            "lot={} unit={} status={:?} role={:?} owner={}",
            row.attendee.lot(),
            row.unit_number.as_deref().unwrap_or("-"),
            row.status(),
            row.role,
            row.attendee.owner_name()
        );
    }
    println!(
        "quorum {}%: {} of {} ({}) met={} synced_people={} sync=\"{}\"",
        view.quorum.percentage,
        view.quorum.attended,
        view.quorum.total,
        view.quorum_label,
        view.quorum.threshold_met,
        view.synced_person_count,
        view.sync.label
    );

    session.end();
    Ok(())
}

fn owner(
    lot: u32,
    main_contact: Option<&str>,
    title_name: Option<&str>,
    unit: &str,
) -> OwnerDirectoryEntry {
    OwnerDirectoryEntry {
        lot,
        contact: OwnerContactInfo {
            main_contact_raw: main_contact.map(str::to_string),
            title_name_raw: title_name.map(str::to_string),
            unit_number: Some(unit.to_string()),
        },
    }
}

fn print_report(label: &str, report: &checkin_core::FlushReport) {
    let notice = report
        .notice
        .as_ref()
        .map(|notice| notice.message.as_str())
        .unwrap_or("-");
    println!(
        "{label}: outcome={:?} queue_len={} notice=\"{notice}\"",
        report.outcome, report.queue_len
    );
}
