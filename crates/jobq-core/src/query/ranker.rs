use std::cmp::Ordering;

use crate::filters::{FilterSet, SortField, SortOrder, SortSpec};
use crate::query::predicate::keyword_haystack;
use crate::Listing;

/// Integer relevance signal for one listing against one query.
///
/// +10 per whitespace keyword token found case-insensitively in
/// title ⊕ company ⊕ description, +20 for a location substring match,
/// +15 when `remote_only` is set and the listing is remote. No other
/// terms.
pub fn relevance_score(listing: &Listing, filters: &FilterSet) -> i64 {
    let mut score = 0;

    if !filters.keywords.trim().is_empty() {
        let haystack = keyword_haystack(listing);
        for token in filters.keywords.split_whitespace() {
            if haystack.contains(&token.to_lowercase()) {
                score += 10;
            }
        }
    }

    if !filters.location.trim().is_empty()
        && listing
            .location
            .to_lowercase()
            .contains(&filters.location.to_lowercase())
    {
        score += 20;
    }

    if filters.remote_only && listing.remote {
        score += 15;
    }

    score
}

/// Comparator for one sort mode. The order field acts as a plain
/// direction flip; `relevance` with `asc` is legal and honored.
pub fn compare(a: &Listing, b: &Listing, filters: &FilterSet, sort: SortSpec) -> Ordering {
    let ascending = match sort.field {
        SortField::Relevance => relevance_score(a, filters).cmp(&relevance_score(b, filters)),
        SortField::Date => a.posted_at.cmp(&b.posted_at),
        SortField::Salary => a.salary_max.cmp(&b.salary_max),
    };

    match sort.order {
        SortOrder::Asc => ascending,
        SortOrder::Desc => ascending.reverse(),
    }
}

/// Stable sort of the filtered candidates. Ties keep their input order,
/// which keeps pagination reproducible across identical queries.
pub fn sort_listings(listings: &mut [Listing], filters: &FilterSet, sort: SortSpec) {
    match sort.field {
        SortField::Relevance => {
            // Decorate with precomputed scores so the comparator does
            // not rescan listing text on every comparison.
            let scores: Vec<i64> = listings
                .iter()
                .map(|listing| relevance_score(listing, filters))
                .collect();
            let mut order: Vec<usize> = (0..listings.len()).collect();
            order.sort_by(|&left, &right| {
                let ascending = scores[left].cmp(&scores[right]);
                match sort.order {
                    SortOrder::Asc => ascending,
                    SortOrder::Desc => ascending.reverse(),
                }
            });

            apply_order(listings, &order);
        }
        _ => listings.sort_by(|a, b| compare(a, b, filters, sort)),
    }
}

fn apply_order(listings: &mut [Listing], order: &[usize]) {
    let reordered: Vec<Listing> = order.iter().map(|&index| listings[index].clone()).collect();
    for (slot, listing) in listings.iter_mut().zip(reordered) {
        *slot = listing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExperienceLevel, JobType};
    use chrono::{Duration, Utc};

    fn listing(id: i64, title: &str) -> Listing {
        Listing {
            id,
            title: title.into(),
            company: "Acme".into(),
            location: "Austin, TX".into(),
            salary_min: 80_000,
            salary_max: 100_000,
            job_type: JobType::FullTime,
            experience_level: ExperienceLevel::Mid,
            posted_at: Utc::now(),
            remote: false,
            skills: vec![],
            description: "builds things".into(),
        }
    }

    #[test]
    fn scores_ten_per_matched_keyword_token() {
        let mut filters = FilterSet::default();
        filters.keywords = "senior rust developer".into();

        let subject = listing(1, "Senior Rust Engineer");
        // "senior" and "rust" match, "developer" does not.
        assert_eq!(relevance_score(&subject, &filters), 20);
    }

    #[test]
    fn location_and_remote_terms_add_fixed_boosts() {
        let mut filters = FilterSet::default();
        filters.location = "austin".into();
        filters.remote_only = true;

        let mut subject = listing(1, "Engineer");
        subject.remote = true;

        assert_eq!(relevance_score(&subject, &filters), 35);
    }

    #[test]
    fn relevance_ties_keep_input_order() {
        let mut filters = FilterSet::default();
        filters.keywords = "developer tools".into();

        // Scores: [10, 10, 20]. The two tied listings must keep their
        // relative input order after the sort.
        let mut listings = vec![
            listing(1, "Developer"),
            listing(2, "Developer"),
            listing(3, "Developer tools team"),
        ];

        sort_listings(&mut listings, &filters, SortSpec::default());

        let ids: Vec<i64> = listings.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn relevance_ascending_is_honored() {
        let mut filters = FilterSet::default();
        filters.keywords = "developer tools".into();

        let mut listings = vec![
            listing(3, "Senior Developer developer tools"),
            listing(1, "Developer"),
            listing(2, "Developer"),
        ];

        sort_listings(
            &mut listings,
            &filters,
            SortSpec::new(SortField::Relevance, SortOrder::Asc),
        );

        let ids: Vec<i64> = listings.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn date_sort_defaults_to_newest_first() {
        let filters = FilterSet::default();
        let mut older = listing(1, "Old");
        older.posted_at = Utc::now() - Duration::days(10);
        let newer = listing(2, "New");

        let mut listings = vec![older, newer];
        sort_listings(
            &mut listings,
            &filters,
            SortSpec::new(SortField::Date, SortOrder::Desc),
        );

        assert_eq!(listings[0].id, 2);
    }

    #[test]
    fn salary_sort_uses_salary_max() {
        let filters = FilterSet::default();
        let mut low = listing(1, "Low");
        low.salary_max = 90_000;
        let mut high = listing(2, "High");
        high.salary_max = 150_000;

        let mut listings = vec![low, high];
        sort_listings(
            &mut listings,
            &filters,
            SortSpec::new(SortField::Salary, SortOrder::Desc),
        );
        assert_eq!(listings[0].id, 2);

        sort_listings(
            &mut listings,
            &filters,
            SortSpec::new(SortField::Salary, SortOrder::Asc),
        );
        assert_eq!(listings[0].id, 1);
    }
}
