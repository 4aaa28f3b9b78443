use std::collections::HashSet;

use crate::filters::FilterSet;
use crate::Listing;

/// Pass/fail filter stage, independent of ranking.
///
/// The criteria below are exhaustive: `date_posted`, `radius`,
/// `company_size`, `industry` and `benefits` participate in the cache
/// key and active-filter display but do not filter.
pub fn matches(listing: &Listing, filters: &FilterSet) -> bool {
    if !filters.keywords.trim().is_empty() {
        let haystack = keyword_haystack(listing);
        let all_tokens_match = filters
            .keywords
            .split_whitespace()
            .all(|token| haystack.contains(&token.to_lowercase()));
        if !all_tokens_match {
            return false;
        }
    }

    // Remote listings bypass the location text filter. Deliberate
    // carve-out, not a bug: a "Remote" listing is reachable from any
    // searched location.
    if !filters.location.trim().is_empty() && !listing.remote {
        let wanted = filters.location.to_lowercase();
        if !listing.location.to_lowercase().contains(&wanted) {
            return false;
        }
    }

    if !filters.job_type.is_empty() && !filters.job_type.contains(&listing.job_type) {
        return false;
    }

    // Range overlap, not containment.
    if listing.salary_max < filters.salary_min || listing.salary_min > filters.salary_max {
        return false;
    }

    if !filters.experience_level.is_empty()
        && !filters.experience_level.contains(&listing.experience_level)
    {
        return false;
    }

    if filters.remote_only && !listing.remote {
        return false;
    }

    if !filters.skills.is_empty() {
        let possessed: HashSet<String> = listing
            .skills
            .iter()
            .map(|skill| skill.to_lowercase())
            .collect();
        let has_all = filters
            .skills
            .iter()
            .all(|skill| possessed.contains(&skill.to_lowercase()));
        if !has_all {
            return false;
        }
    }

    true
}

/// Case-folded `title ⊕ company ⊕ description` searched by both the
/// keyword filter and the relevance scorer.
pub(crate) fn keyword_haystack(listing: &Listing) -> String {
    format!(
        "{} {} {}",
        listing.title, listing.company, listing.description
    )
    .to_lowercase()
}
