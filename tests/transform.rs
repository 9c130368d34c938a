// tests/transform.rs
use chrono::Utc;

use brand_weather_aggregator::aggregate::{transform, SourceResults, Summaries};
use brand_weather_aggregator::error::Error;
use brand_weather_aggregator::ingest::types::{SocialPost, SocialSnapshot, WeatherReading};
use brand_weather_aggregator::{RawSourceResult, RunSummary};

fn weather_ok() -> RawSourceResult<WeatherReading> {
    RawSourceResult::Success {
        payload: WeatherReading {
            source: "open-meteo".into(),
            city: "Tel Aviv Yafo".into(),
            timestamp: Utc::now(),
            temperature_c: 26.1,
            weather_code: Some(3),
            description: "Overcast".into(),
        },
        count: 1,
    }
}

fn osint_ok() -> RawSourceResult<SocialSnapshot> {
    RawSourceResult::Success {
        payload: SocialSnapshot {
            brand_name: "Gymshark".into(),
            posts: vec![SocialPost {
                title: "Gymshark haul".into(),
                text: "Love the new hoodie".into(),
            }],
        },
        count: 1,
    }
}

fn gemini_ok() -> RawSourceResult<Summaries> {
    RawSourceResult::Success {
        payload: Summaries {
            sentiment_summary: "Mostly positive.".into(),
            news_summary: "New hoodie line.".into(),
        },
        count: 2,
    }
}

fn summary(
    weather: RawSourceResult<WeatherReading>,
    osint: RawSourceResult<SocialSnapshot>,
    gemini: RawSourceResult<Summaries>,
) -> RunSummary {
    RunSummary::new(
        Utc::now(),
        SourceResults {
            weather,
            osint,
            gemini,
        },
    )
}

#[test]
fn maps_all_fields_from_successful_stages() {
    let s = summary(weather_ok(), osint_ok(), gemini_ok());
    let rec = transform(&s).expect("eligible");

    assert_eq!(rec.city_name, "Tel Aviv Yafo");
    assert!((rec.current_temperature_c - 26.1).abs() < 1e-9);
    assert_eq!(rec.brand_name, "Gymshark");
    assert_eq!(rec.sentiment_summary, "Mostly positive.");
    assert_eq!(rec.news_summary, "New hoodie line.");
    assert!(rec.popularity_score.is_none());

    let raw_weather: serde_json::Value = serde_json::from_str(&rec.raw_weather_response).unwrap();
    assert_eq!(raw_weather["city"], "Tel Aviv Yafo");
    let raw_osint: serde_json::Value = serde_json::from_str(&rec.raw_osint_response).unwrap();
    assert_eq!(raw_osint["posts"][0]["title"], "Gymshark haul");
    let raw_gemini: serde_json::Value =
        serde_json::from_str(rec.raw_gemini_response.as_deref().unwrap()).unwrap();
    assert_eq!(raw_gemini["news_summary"], "New hoodie line.");
}

#[test]
fn repeated_transform_differs_only_in_timestamp() {
    let s = summary(weather_ok(), osint_ok(), gemini_ok());
    let mut a = transform(&s).unwrap();
    let b = transform(&s).unwrap();
    assert!(b.aggregation_timestamp_utc >= a.aggregation_timestamp_utc);
    a.aggregation_timestamp_utc = b.aggregation_timestamp_utc;
    assert_eq!(a, b);
}

#[test]
fn non_successful_summaries_become_empty() {
    for gemini in [
        RawSourceResult::Failure {
            error: "HTTP 500".into(),
        },
        RawSourceResult::Skipped {
            reason: "no posts".into(),
        },
    ] {
        let rec = transform(&summary(weather_ok(), osint_ok(), gemini)).unwrap();
        assert_eq!(rec.sentiment_summary, "");
        assert_eq!(rec.news_summary, "");
        assert!(rec.raw_gemini_response.is_none());
    }
}

#[test]
fn missing_weather_or_osint_is_rejected() {
    let no_weather = summary(
        RawSourceResult::Failure {
            error: "down".into(),
        },
        osint_ok(),
        gemini_ok(),
    );
    assert!(matches!(
        transform(&no_weather),
        Err(Error::MissingRequiredSource("weather"))
    ));

    let no_osint = summary(
        weather_ok(),
        RawSourceResult::Failure {
            error: "429".into(),
        },
        RawSourceResult::Skipped {
            reason: "social failed".into(),
        },
    );
    assert!(matches!(
        transform(&no_osint),
        Err(Error::MissingRequiredSource("osint"))
    ));
}
