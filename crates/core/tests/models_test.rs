use chrono::{NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{from_str, json, to_string, to_value};
use serde_test::{Token, assert_tokens};
use slotbook_core::{
    models::{
        appointment::{Appointment, NewAppointment, end_of_day, start_of_day},
        availability::{Availability, SlotState, SlotStatus, date_key, parse_date_key},
        policy::WorkingHoursPolicy,
        time_slot::TimeSlot,
    },
    store::{AppointmentQuery, SortKey},
};

fn slot(label: &str) -> TimeSlot {
    label.parse().expect("valid slot")
}

fn appointment(id: &str, date: NaiveDate, time: &str) -> Appointment {
    Appointment {
        id: id.to_string(),
        client_name: format!("Client {id}"),
        client_email: format!("{id}@example.com"),
        date: start_of_day(date),
        time: slot(time),
        created_at: Utc::now(),
    }
}

#[test]
fn test_time_slot_serializes_as_label() {
    assert_tokens(&slot("09:30"), &[Token::Str("09:30")]);
    assert_tokens(&slot("00:00"), &[Token::Str("00:00")]);
}

#[rstest]
#[case("9:30")]
#[case("24:00")]
#[case("12:60")]
#[case("12-30")]
#[case("ab:cd")]
#[case("")]
#[case("+1:30")]
fn test_time_slot_rejects_malformed_labels(#[case] label: &str) {
    assert!(label.parse::<TimeSlot>().is_err());
    assert!(from_str::<TimeSlot>(&format!("{label:?}")).is_err());
}

#[rstest]
#[case("00:00", "12:00 AM")]
#[case("09:05", "09:05 AM")]
#[case("12:30", "12:30 PM")]
#[case("16:30", "04:30 PM")]
#[case("23:59", "11:59 PM")]
fn test_time_slot_display_12h(#[case] label: &str, #[case] expected: &str) {
    assert_eq!(slot(label).display_12h(), expected);
}

#[test]
fn test_time_slot_orders_by_time_of_day() {
    let mut slots = vec![slot("16:30"), slot("09:00"), slot("12:00")];
    slots.sort();
    assert_eq!(slots, vec![slot("09:00"), slot("12:00"), slot("16:30")]);
}

#[test]
fn test_date_key_round_trip_and_rejection() {
    let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
    assert_eq!(date_key(date), "2026-03-07");
    assert_eq!(parse_date_key("2026-03-07").unwrap(), date);
    assert!(parse_date_key("07/03/2026").is_err());
}

#[test]
fn test_availability_missing_blocked_times_defaults_empty() {
    let availability: Availability = from_str(r#"{"id":"2026-03-07"}"#).unwrap();
    assert!(availability.blocked_times.is_empty());
}

#[test]
fn test_new_appointment_request_shape() {
    let request: NewAppointment = from_str(
        r#"{"client_name":"Ana","client_email":"ana@example.com","date":"2026-03-07","time":"10:00"}"#,
    )
    .unwrap();

    assert_eq!(request.time, slot("10:00"));
    assert_eq!(request.date_instant(), Utc.with_ymd_and_hms(2026, 3, 7, 0, 0, 0).unwrap());
    assert!(to_string(&request).unwrap().contains(r#""time":"10:00""#));
}

#[test]
fn test_slot_status_serialization() {
    let booked = SlotStatus {
        time: slot("10:00"),
        state: SlotState::Booked {
            appointment_id: "a1".to_string(),
            client_name: "Ana".to_string(),
        },
    };
    let blocked = SlotStatus { time: slot("10:30"), state: SlotState::Blocked };

    assert_eq!(
        to_value(&booked).unwrap(),
        json!({"time": "10:00", "status": "booked", "appointment_id": "a1", "client_name": "Ana"})
    );
    assert_eq!(to_value(&blocked).unwrap(), json!({"time": "10:30", "status": "blocked"}));
    assert!(!booked.can_toggle_block());
    assert!(blocked.can_toggle_block());
}

#[rstest]
#[case(9, 17, 30, true)]
#[case(0, 24, 15, true)]
#[case(17, 9, 30, false)]
#[case(9, 9, 30, false)]
#[case(9, 25, 30, false)]
#[case(9, 17, 0, false)]
fn test_policy_validation(#[case] start: u8, #[case] end: u8, #[case] interval: u16, #[case] ok: bool) {
    assert_eq!(WorkingHoursPolicy::new(start, end, interval).is_ok(), ok);
}

#[test]
fn test_policy_contains_only_grid_slots() {
    let policy = WorkingHoursPolicy::default();
    assert!(policy.contains(slot("09:00")));
    assert!(policy.contains(slot("16:30")));
    assert!(!policy.contains(slot("17:00")));
    assert!(!policy.contains(slot("08:30")));
    assert!(!policy.contains(slot("09:15")));
}

#[test]
fn test_day_query_bounds_and_ordering() {
    let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
    let query = AppointmentQuery::for_day(day);

    assert_eq!(query.from, Utc.with_ymd_and_hms(2026, 3, 7, 0, 0, 0).unwrap());
    assert_eq!(query.to, end_of_day(day));
    assert_eq!(query.to, Utc.with_ymd_and_hms(2026, 3, 7, 23, 59, 59).unwrap());
    assert_eq!(query.order_by, vec![SortKey::Date, SortKey::Time]);

    let inside = appointment("a", day, "10:00");
    let next_day = appointment("b", day.succ_opt().unwrap(), "10:00");
    assert!(query.matches(&inside));
    assert!(!query.matches(&next_day));
    assert!(query.covers_day(day));
    assert!(!query.covers_day(day.succ_opt().unwrap()));

    let mut appointments = vec![
        appointment("c", day, "15:00"),
        appointment("d", day, "09:00"),
        appointment("e", day, "11:30"),
    ];
    query.sort(&mut appointments);
    let times: Vec<String> = appointments.iter().map(|a| a.time.to_string()).collect();
    assert_eq!(times, vec!["09:00", "11:30", "15:00"]);
}
