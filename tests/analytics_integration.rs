//! Integration tests for the analytics pipeline
//!
//! These tests drive the service end to end through the in-memory record
//! source: records → observations → analysis → response body. No database
//! or network access is needed.
//!
//! Run with: cargo test --test analytics_integration

use chrono::{Datelike, NaiveDate};
use malaria_service::analysis::{ForecastConfig, compute_heatmap};
use malaria_service::dev_mode::InMemorySource;
use malaria_service::measures::{GroupBy, Measure};
use malaria_service::model::{
    AnalyticsError, GroupedObservation, MalariaRecord, ObservationFilter, TimeBucket,
};
use malaria_service::response;
use malaria_service::service::{AnalyticsService, ServiceError};
use malaria_service::{compute_forecast, compute_grouped_distribution, compute_summary};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Two sites per region, monthly from Jan 2021 for `months` months, with a
/// seasonal incidence peak mid-year.
fn surveillance_records(months: u32) -> Vec<MalariaRecord> {
    let sites = [("Apac", "North"), ("Lira", "North"), ("Tororo", "East"), ("Mbale", "East")];
    let mut records = Vec::new();
    let mut id = 1;
    for m in 0..months {
        let month_year = date(2021 + (m / 12) as i32, m % 12 + 1, 1);
        let season = ((m % 12) as f64 * std::f64::consts::PI / 6.0).sin();
        for (s, (site, region)) in sites.iter().enumerate() {
            let base = 30.0 + s as f64 * 5.0;
            records.push(MalariaRecord {
                id,
                month_year: Some(month_year),
                site: Some(site.to_string()),
                new_site_id: Some(format!("S{:02}", s + 1)),
                region: Some(region.to_string()),
                malinc: Some(base + season * 8.0 + m as f64 * 0.2),
                propsuspected: Some(0.3 + season * 0.05),
                tpr: if m % 5 == 4 { None } else { Some(0.5 + season * 0.1) },
            });
            id += 1;
        }
    }
    records
}

fn service(records: Vec<MalariaRecord>) -> AnalyticsService<InMemorySource> {
    AnalyticsService::new(InMemorySource::new(records), ForecastConfig::default())
}

// ---------------------------------------------------------------------------
// 1. Summary Statistics
// ---------------------------------------------------------------------------

#[test]
fn test_summary_of_four_values() {
    let summary = compute_summary(
        Measure::Malinc,
        &[1.0, 2.0, 3.0, 4.0],
        &ObservationFilter::default(),
    )
    .unwrap();
    assert_eq!(summary.mean, 2.5);
    assert_eq!(summary.median, 2.5);
    assert_eq!(summary.min, 1.0);
    assert_eq!(summary.max, 4.0);
    assert_eq!(summary.std, 1.12);
}

#[test]
fn test_summary_of_nothing_is_no_data() {
    let result = compute_summary(Measure::Malinc, &[], &ObservationFilter::default());
    assert_eq!(result, Err(AnalyticsError::NoData));
}

#[test]
fn test_summary_bounds_hold_across_measures_and_filters() {
    let mut svc = service(surveillance_records(24));
    let filters = [
        ObservationFilter::default(),
        ObservationFilter::region("North"),
        ObservationFilter::site("Mbale"),
    ];
    for measure in Measure::all() {
        for filter in &filters {
            let s = svc.summary_stats(measure, filter).unwrap();
            assert!(s.count > 0);
            assert!(s.min <= s.mean && s.mean <= s.max, "{:?}", s);
            assert!(s.min <= s.median && s.median <= s.max, "{:?}", s);
            assert!(s.std >= 0.0);
        }
    }
}

#[test]
fn test_summary_counts_only_rows_with_values() {
    let mut svc = service(surveillance_records(10));
    let s = svc
        .summary_stats(Measure::Tpr, &ObservationFilter::site("Apac"))
        .unwrap();
    // TPR is missing in months 5 and 10.
    assert_eq!(s.count, 8);
    assert_eq!(s.site_filter.as_deref(), Some("Apac"));
}

#[test]
fn test_summary_for_unknown_region_maps_to_404() {
    let mut svc = service(surveillance_records(6));
    let result = svc.summary_stats(Measure::Malinc, &ObservationFilter::region("Atlantis"));
    let resp = response::respond(result, response::summary_body);
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body, json!({"error": "No data found for given filters."}));
}

// ---------------------------------------------------------------------------
// 2. Grouped Distribution
// ---------------------------------------------------------------------------

#[test]
fn test_distribution_is_a_stable_partition() {
    let mut svc = service(surveillance_records(12));
    let dist = svc.box_data(Measure::Malinc, GroupBy::Site).unwrap();

    let keys: Vec<&str> = dist.keys().collect();
    assert_eq!(keys, vec!["Apac", "Lira", "Tororo", "Mbale"]);

    let total: usize = dist.groups.iter().map(|(_, v)| v.len()).sum();
    assert_eq!(total, 48);

    let apac = dist.get("Apac").unwrap();
    let expected: Vec<f64> = surveillance_records(12)
        .iter()
        .filter(|r| r.site.as_deref() == Some("Apac"))
        .filter_map(|r| r.malinc)
        .collect();
    assert_eq!(apac, expected.as_slice());
}

#[test]
fn test_distribution_union_equals_input_multiset() {
    let obs: Vec<GroupedObservation> = [("b", 2.0), ("a", 1.0), ("b", 2.0), ("c", -1.0), ("a", 0.0)]
        .iter()
        .map(|(k, v)| GroupedObservation::new(date(2022, 1, 1), *k, *v))
        .collect();
    let dist = compute_grouped_distribution(&obs);
    let mut union: Vec<f64> = dist.groups.into_iter().flat_map(|(_, v)| v).collect();
    union.sort_by(f64::total_cmp);
    assert_eq!(union, vec![-1.0, 0.0, 1.0, 2.0, 2.0]);
}

#[test]
fn test_box_body_shape() {
    let mut svc = service(surveillance_records(2));
    let dist = svc.box_data(Measure::PropSuspected, GroupBy::Region).unwrap();
    let body = response::box_body(&dist, Measure::PropSuspected, GroupBy::Region);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["region"], json!("North"));
    assert_eq!(rows[0]["propsuspected"].as_array().unwrap().len(), 4);
}

// ---------------------------------------------------------------------------
// 3. Heatmap
// ---------------------------------------------------------------------------

#[test]
fn test_heatmap_two_groups_two_months() {
    let obs = vec![
        GroupedObservation::new(date(2023, 1, 15), "north", 5.0),
        GroupedObservation::new(date(2023, 1, 20), "north", 7.0),
        GroupedObservation::new(date(2023, 2, 10), "south", 3.0),
    ];
    let heat = compute_heatmap(&obs, true);
    assert_eq!(heat.groups, vec!["north", "south"]);
    assert_eq!(heat.buckets, vec![TimeBucket::Month(1), TimeBucket::Month(2)]);
    assert_eq!(heat.matrix, vec![vec![6.0, 0.0], vec![0.0, 3.0]]);
}

#[test]
fn test_heatmap_by_month_over_two_years() {
    let mut svc = service(surveillance_records(24));
    let heat = svc.heatmap_data(Measure::Malinc, GroupBy::Region, true).unwrap();
    assert_eq!(heat.groups, vec!["East", "North"]);
    assert_eq!(heat.buckets.len(), 12);
    for row in &heat.counts {
        // 2 sites x 2 years in every month.
        assert!(row.iter().all(|&n| n == 4), "{:?}", row);
    }

    let body = response::heatmap_body(&heat);
    assert_eq!(body["months"][0], json!(1));
    assert_eq!(body["months"][11], json!(12));
}

#[test]
fn test_heatmap_by_date_keeps_each_month() {
    let mut svc = service(surveillance_records(18));
    let heat = svc.heatmap_data(Measure::Malinc, GroupBy::Site, false).unwrap();
    assert_eq!(heat.groups, vec!["Apac", "Lira", "Mbale", "Tororo"]);
    assert_eq!(heat.buckets.len(), 18);
    assert_eq!(heat.buckets[0], TimeBucket::Date(date(2021, 1, 1)));
    for (i, row) in heat.matrix.iter().enumerate() {
        for j in 0..row.len() {
            assert_eq!(heat.cell(i, j), Some(row[j]));
        }
    }
}

// ---------------------------------------------------------------------------
// 4. Forecast
// ---------------------------------------------------------------------------

#[test]
fn test_forecast_six_months_after_two_years() {
    let mut svc = service(surveillance_records(24));
    let forecast = svc.forecast(Measure::Malinc, Some(6)).unwrap();
    assert_eq!(forecast.points.len(), 6);
    assert_eq!(forecast.points[0].date, date(2023, 1, 1));
    for pair in forecast.points.windows(2) {
        let (a, b) = (pair[0].date, pair[1].date);
        assert_eq!(b.day(), 1);
        assert_eq!(
            (b.year() * 12 + b.month() as i32) - (a.year() * 12 + a.month() as i32),
            1
        );
    }
}

#[test]
fn test_forecast_default_steps_and_body() {
    let mut svc = service(surveillance_records(24));
    let result = svc.forecast(Measure::PropSuspected, None);
    let resp = response::respond(result, response::forecast_body);
    assert!(resp.is_success(), "{:?}", resp);
    assert_eq!(resp.body["steps"], json!(12));
    assert_eq!(resp.body["forecast"].as_object().unwrap().len(), 12);
    assert!(resp.body["forecast"].get("2023-01-01").is_some());
    assert!(resp.body["forecast"].get("2023-12-01").is_some());
}

#[test]
fn test_forecast_two_months_is_insufficient_history() {
    let mut svc = service(surveillance_records(2));
    let result = svc.forecast(Measure::Malinc, Some(3));
    assert!(matches!(
        result,
        Err(ServiceError::Analytics(AnalyticsError::InsufficientHistory {
            required: 3,
            actual: 2
        }))
    ));
}

#[test]
fn test_forecast_of_mid_month_dates_starts_on_first() {
    let obs: Vec<_> = (1..=10)
        .map(|m| {
            malaria_service::model::Observation::new(date(2022, m, 17), 5.0 + (m as f64 * 0.9).cos())
        })
        .collect();
    let forecast = compute_forecast(Measure::Tpr, &obs, 4).unwrap();
    assert_eq!(forecast.points[0].date, date(2022, 11, 1));
    assert_eq!(forecast.points[3].date, date(2023, 2, 1));
}

#[test]
fn test_forecast_of_constant_series_reports_fit_failure() {
    let records: Vec<MalariaRecord> = surveillance_records(12)
        .into_iter()
        .map(|mut r| {
            r.malinc = Some(10.0);
            r
        })
        .collect();
    let mut svc = service(records);
    let resp = response::respond(svc.forecast(Measure::Malinc, Some(3)), response::forecast_body);
    assert_eq!(resp.status, 500);
    assert!(
        resp.body["error"]
            .as_str()
            .unwrap()
            .starts_with("Model fitting failed"),
        "{:?}",
        resp.body
    );
}

// ---------------------------------------------------------------------------
// 5. Selectors and records
// ---------------------------------------------------------------------------

#[test]
fn test_request_strings_parse_into_selectors() {
    let measure: Measure = "TPR".parse().unwrap();
    let group_by: GroupBy = "site".parse().unwrap();
    let mut svc = service(surveillance_records(3));
    assert!(svc.box_data(measure, group_by).is_ok());

    let bad = "malinc FROM malaria_records; --".parse::<Measure>();
    let resp = response::error_response(&ServiceError::Analytics(bad.unwrap_err()));
    assert_eq!(resp.status, 400);
}

#[test]
fn test_records_round_trip_through_json_body() {
    let mut svc = service(surveillance_records(1));
    let records = svc.records().unwrap();
    let resp = response::respond_with(Ok(records), |r: &Vec<_>| response::records_body(r));
    assert_eq!(resp.status, 200);
    let body = resp.body;
    let first = &body.as_array().unwrap()[0];
    assert_eq!(first["monthyear"], json!("2021-01-01"));
    assert_eq!(first["NEWsiteID"], json!("S01"));
    assert!(first.get("TPR").is_some());

    let reloaded = InMemorySource::from_json_str(&body.to_string()).unwrap();
    assert_eq!(reloaded.len(), 4);
}
