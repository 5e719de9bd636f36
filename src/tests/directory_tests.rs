use super::{base_time, new_profile};
use crate::directory::{summarize_countries, CountrySummary, PublicDirectory, PublicFilter, UNKNOWN_COUNTRY};
use crate::memory_store::MemoryProfileStore;
use crate::profile::{Gender, NewProfile, Profile, ProfileStatus};
use crate::store::ProfileStore;
use std::sync::Arc;
use uuid::Uuid;

fn located(slug: &str, gender: Gender, city: &str, country: Option<&str>, minutes: i64) -> NewProfile {
    let mut profile = new_profile(slug, gender, ProfileStatus::Approved, minutes);
    profile.city = city.to_string();
    profile.country = country.map(str::to_string);
    profile
}

async fn seeded_directory() -> PublicDirectory {
    let store = Arc::new(MemoryProfileStore::new());
    let rows = [
        located("ana", Gender::Girl, "Lisbon", Some("Portugal"), 0),
        located("bruno", Gender::Boy, "Porto", Some("Portugal"), 10),
        located("carla", Gender::Girl, "Madrid", Some("Spain"), 20),
        located("dmitri", Gender::Boy, "Nowhere", None, 30),
        new_profile("pending-one", Gender::Girl, ProfileStatus::Pending, 40),
        new_profile("rejected-one", Gender::Girl, ProfileStatus::Rejected, 50),
    ];
    for row in rows {
        store.insert(row).await.unwrap();
    }
    PublicDirectory::new(store)
}

fn slugs(profiles: &[Profile]) -> Vec<&str> {
    profiles.iter().map(|p| p.slug.as_str()).collect()
}

#[tokio::test]
async fn test_list_returns_only_approved_newest_first() {
    let directory = seeded_directory().await;

    let profiles = directory.list(PublicFilter::default()).await.unwrap();

    assert_eq!(slugs(&profiles), vec!["dmitri", "carla", "bruno", "ana"]);
    assert!(profiles.iter().all(|p| p.status == ProfileStatus::Approved));
}

#[tokio::test]
async fn test_list_filters_are_exact_and_combined() {
    let directory = seeded_directory().await;

    let girls = directory
        .list(PublicFilter {
            gender: Some(Gender::Girl),
            ..PublicFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(slugs(&girls), vec!["carla", "ana"]);

    let portugal_boys = directory
        .list(PublicFilter {
            gender: Some(Gender::Boy),
            country: Some("Portugal".to_string()),
            ..PublicFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(slugs(&portugal_boys), vec!["bruno"]);

    let lowercase_city = directory
        .list(PublicFilter {
            city: Some("lisbon".to_string()),
            ..PublicFilter::default()
        })
        .await
        .unwrap();
    assert!(lowercase_city.is_empty());
}

#[tokio::test]
async fn test_get_by_slug_hides_unapproved() {
    let directory = seeded_directory().await;

    assert_eq!(
        directory.get_by_slug("carla").await.unwrap().map(|p| p.city),
        Some("Madrid".to_string())
    );
    assert!(directory.get_by_slug("pending-one").await.unwrap().is_none());
    assert!(directory.get_by_slug("rejected-one").await.unwrap().is_none());
    assert!(directory.get_by_slug("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_countries_summary() {
    let directory = seeded_directory().await;

    let countries = directory.countries().await.unwrap();

    assert_eq!(
        countries,
        vec![
            CountrySummary {
                country: "Portugal".to_string(),
                girls: 1,
                boys: 1,
                total: 2,
            },
            CountrySummary {
                country: "Spain".to_string(),
                girls: 1,
                boys: 0,
                total: 1,
            },
            CountrySummary {
                country: UNKNOWN_COUNTRY.to_string(),
                girls: 0,
                boys: 1,
                total: 1,
            },
        ]
    );
}

#[test]
fn test_summarize_countries_breaks_ties_by_name() {
    let profile = |country: &str| {
        let row = new_profile("x", Gender::Girl, ProfileStatus::Approved, 0).into_row(Uuid::new_v4());
        let mut profile = Profile::from(row);
        profile.country = Some(country.to_string());
        profile.created_at = base_time();
        profile
    };

    let summaries = summarize_countries(&[profile("Zambia"), profile("Austria"), profile("Malta")]);

    let names: Vec<&str> = summaries.iter().map(|s| s.country.as_str()).collect();
    assert_eq!(names, vec!["Austria", "Malta", "Zambia"]);
    assert!(summarize_countries(&[]).is_empty());
}
