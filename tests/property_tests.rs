//! Property-based tests for the date parser
//!
//! These tests verify that:
//! - Well-formed dates parse back to the components they were built from
//! - Displayed dates parse back to the same value
//! - Out-of-range components and garbage are rejected
//! - Julian normalization is linear in days and honours timezone offsets

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use stddb::core::date::{parse_date, parse_datetime};
    use stddb::CalendarDate;

    const MS_PER_DAY: i64 = 86_400_000;

    fn arb_date() -> impl Strategy<Value = (i32, u32, u32)> {
        (0i32..=9999, 1u32..=12, 1u32..=31)
    }

    /// Days from CE covering years 1644 to 8214, well inside the gregorian range
    fn arb_gregorian() -> impl Strategy<Value = chrono::NaiveDate> {
        (600_000i32..3_000_000).prop_map(|n| {
            chrono::NaiveDate::from_num_days_from_ce_opt(n).unwrap()
        })
    }

    fn julian(d: chrono::NaiveDate) -> i64 {
        parse_datetime(&d.format("%Y-%m-%d").to_string())
            .unwrap()
            .julian_ms()
            .unwrap()
    }

    proptest! {
        #[test]
        fn prop_well_formed_dates_parse((y, m, d) in arb_date()) {
            let text = format!("{:04}-{:02}-{:02}", y, m, d);
            prop_assert_eq!(parse_date(&text).unwrap(), CalendarDate::new(y, m, d));

            let negative = format!("-{}", text);
            prop_assert_eq!(parse_date(&negative).unwrap().year(), -y);
        }

        #[test]
        fn prop_display_round_trips((y, m, d) in arb_date(), negative in any::<bool>()) {
            let date = CalendarDate::new(if negative { -y } else { y }, m, d);
            prop_assert_eq!(date.to_string().parse::<CalendarDate>().unwrap(), date);
        }

        #[test]
        fn prop_time_suffix_keeps_date((y, m, d) in arb_date(), h in 0u32..=23, min in 0u32..=59, sep in prop_oneof![Just("T"), Just(" ")]) {
            let text = format!("{:04}-{:02}-{:02}{}{:02}:{:02}", y, m, d, sep, h, min);
            prop_assert_eq!(parse_date(&text).unwrap(), CalendarDate::new(y, m, d));
        }

        #[test]
        fn prop_bad_month_rejected(y in 0i32..=9999, m in 13u32..=99, d in 1u32..=31) {
            let text = format!("{:04}-{:02}-{:02}", y, m, d);
            prop_assert!(parse_date(&text).unwrap_err().is_date_parse());
        }

        #[test]
        fn prop_garbage_rejected(s in "[a-zA-Z:/ ]{0,16}") {
            prop_assert!(parse_date(&s).is_err());
        }

        #[test]
        fn prop_julian_days_are_consecutive(d in arb_gregorian()) {
            let next = d.succ_opt().unwrap();
            prop_assert_eq!(julian(next) - julian(d), MS_PER_DAY);
        }

        #[test]
        fn prop_timezone_offset_shifts_julian(d in arb_gregorian(), h in 1u32..=23) {
            let day = d.format("%Y-%m-%d");
            let local = parse_datetime(&format!("{}T{:02}:00+01:00", day, h)).unwrap();
            let utc = parse_datetime(&format!("{}T{:02}:00Z", day, h - 1)).unwrap();
            prop_assert_eq!(local.julian_ms().unwrap(), utc.julian_ms().unwrap());
        }
    }

    #[test]
    fn test_known_julian_values() {
        let j2000 = parse_datetime("2000-01-01T12:00Z").unwrap();
        assert_eq!(j2000.julian_ms().unwrap(), 2_451_545 * MS_PER_DAY);
    }
}
