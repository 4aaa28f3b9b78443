use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::error::{Result, SearchError};
use crate::{ExperienceLevel, JobType};

/// Upper clamp for salary bounds. Values above this are clamped, not rejected.
pub const MAX_SALARY: u32 = 2_000_000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatePosted {
    #[default]
    Any,
    Day,
    Week,
    Month,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortField {
    #[default]
    Relevance,
    Date,
    Salary,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Stable text form used as a cache key component.
    pub fn serialize_key(&self) -> String {
        format!("{}:{}", self.field.as_ref(), self.order.as_ref())
    }
}

/// Addressable criteria of a [`FilterSet`]. The HTTP layer parses field
/// names into this enum, so an unknown field is rejected before any
/// state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FilterField {
    Keywords,
    Location,
    RemoteOnly,
    Radius,
    JobType,
    ExperienceLevel,
    SalaryRange,
    DatePosted,
    CompanySize,
    Industry,
    Benefits,
    Skills,
}

/// Wire value for a filter mutation. Untagged so JSON callers pass the
/// natural type for each field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(u32),
    Range { min: u32, max: u32 },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveFilter {
    pub label: String,
    pub value: String,
}

/// The canonical representation of what the user is looking for.
///
/// Set-valued fields hold no duplicates; salary bounds are clamped to
/// `[0, MAX_SALARY]` on every write. `skills` preserves insertion order
/// for display, with case-sensitive uniqueness as entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    pub keywords: String,
    pub location: String,
    pub remote_only: bool,
    pub radius: u32,
    pub job_type: BTreeSet<JobType>,
    pub experience_level: BTreeSet<ExperienceLevel>,
    pub salary_min: u32,
    pub salary_max: u32,
    pub date_posted: DatePosted,
    pub company_size: BTreeSet<String>,
    pub industry: BTreeSet<String>,
    pub benefits: BTreeSet<String>,
    pub skills: Vec<String>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            location: String::new(),
            remote_only: false,
            radius: 0,
            job_type: BTreeSet::new(),
            experience_level: BTreeSet::new(),
            salary_min: 0,
            salary_max: MAX_SALARY,
            date_posted: DatePosted::Any,
            company_size: BTreeSet::new(),
            industry: BTreeSet::new(),
            benefits: BTreeSet::new(),
            skills: Vec::new(),
        }
    }
}

fn expect_text(field: FilterField, value: FilterValue) -> Result<String> {
    match value {
        FilterValue::Text(text) => Ok(text),
        other => Err(SearchError::Validation(format!(
            "{} expects a text value, got {other:?}",
            field.as_ref()
        ))),
    }
}

fn parse_member<T>(field: FilterField, raw: &str) -> Result<T>
where
    T: FromStr,
{
    T::from_str(raw).map_err(|_| {
        SearchError::Validation(format!("unknown {} value: {raw}", field.as_ref()))
    })
}

impl FilterSet {
    /// Applies a single mutation. Scalar fields are overwritten; for
    /// set-valued fields the value is inserted as a member.
    pub fn set(&mut self, field: FilterField, value: FilterValue) -> Result<()> {
        match field {
            FilterField::Keywords => self.keywords = expect_text(field, value)?,
            FilterField::Location => self.location = expect_text(field, value)?,
            FilterField::RemoteOnly => match value {
                FilterValue::Bool(flag) => self.remote_only = flag,
                other => {
                    return Err(SearchError::Validation(format!(
                        "remote_only expects a boolean, got {other:?}"
                    )))
                }
            },
            FilterField::Radius => match value {
                FilterValue::Int(distance) => self.radius = distance,
                other => {
                    return Err(SearchError::Validation(format!(
                        "radius expects an integer, got {other:?}"
                    )))
                }
            },
            FilterField::JobType => {
                let member = parse_member::<JobType>(field, &expect_text(field, value)?)?;
                self.job_type.insert(member);
            }
            FilterField::ExperienceLevel => {
                let member = parse_member::<ExperienceLevel>(field, &expect_text(field, value)?)?;
                self.experience_level.insert(member);
            }
            FilterField::SalaryRange => match value {
                FilterValue::Range { min, max } => self.set_salary_range(min, max)?,
                other => {
                    return Err(SearchError::Validation(format!(
                        "salary_range expects {{min, max}}, got {other:?}"
                    )))
                }
            },
            FilterField::DatePosted => {
                self.date_posted = parse_member::<DatePosted>(field, &expect_text(field, value)?)?;
            }
            FilterField::CompanySize => {
                self.company_size.insert(expect_text(field, value)?);
            }
            FilterField::Industry => {
                self.industry.insert(expect_text(field, value)?);
            }
            FilterField::Benefits => {
                self.benefits.insert(expect_text(field, value)?);
            }
            FilterField::Skills => {
                let skill = expect_text(field, value)?;
                self.add_skill(&skill);
            }
        }

        Ok(())
    }

    /// Salary bounds are clamped into `[0, MAX_SALARY]`; an inverted
    /// range is malformed and rejected without partial application.
    pub fn set_salary_range(&mut self, min: u32, max: u32) -> Result<()> {
        let min = min.min(MAX_SALARY);
        let max = max.min(MAX_SALARY);
        if min > max {
            return Err(SearchError::Validation(format!(
                "salary range is inverted: {min} > {max}"
            )));
        }

        self.salary_min = min;
        self.salary_max = max;
        Ok(())
    }

    /// Inserts a skill if absent, keeping insertion order. Uniqueness is
    /// case-sensitive as entered.
    pub fn add_skill(&mut self, skill: &str) {
        if !self.skills.iter().any(|existing| existing == skill) {
            self.skills.push(skill.to_string());
        }
    }

    /// Toggles membership for a set-valued field. Scalar fields reject.
    pub fn toggle_set_member(&mut self, field: FilterField, raw: &str) -> Result<()> {
        match field {
            FilterField::JobType => {
                let member = parse_member::<JobType>(field, raw)?;
                if !self.job_type.remove(&member) {
                    self.job_type.insert(member);
                }
            }
            FilterField::ExperienceLevel => {
                let member = parse_member::<ExperienceLevel>(field, raw)?;
                if !self.experience_level.remove(&member) {
                    self.experience_level.insert(member);
                }
            }
            FilterField::CompanySize => toggle_text_member(&mut self.company_size, raw),
            FilterField::Industry => toggle_text_member(&mut self.industry, raw),
            FilterField::Benefits => toggle_text_member(&mut self.benefits, raw),
            FilterField::Skills => {
                if let Some(position) = self.skills.iter().position(|skill| skill == raw) {
                    self.skills.remove(position);
                } else {
                    self.skills.push(raw.to_string());
                }
            }
            other => {
                return Err(SearchError::Validation(format!(
                    "{} is not a set-valued field",
                    other.as_ref()
                )))
            }
        }

        Ok(())
    }

    /// Removes one member from a set-valued field, or resets a scalar
    /// field (and a set-valued field given no member) to its default.
    pub fn remove(&mut self, field: FilterField, member: Option<&str>) -> Result<()> {
        let defaults = FilterSet::default();

        match (field, member) {
            (FilterField::Keywords, _) => self.keywords = defaults.keywords,
            (FilterField::Location, _) => self.location = defaults.location,
            (FilterField::RemoteOnly, _) => self.remote_only = defaults.remote_only,
            (FilterField::Radius, _) => self.radius = defaults.radius,
            (FilterField::SalaryRange, _) => {
                self.salary_min = defaults.salary_min;
                self.salary_max = defaults.salary_max;
            }
            (FilterField::DatePosted, _) => self.date_posted = defaults.date_posted,
            (FilterField::JobType, Some(raw)) => {
                let member = parse_member::<JobType>(field, raw)?;
                self.job_type.remove(&member);
            }
            (FilterField::JobType, None) => self.job_type.clear(),
            (FilterField::ExperienceLevel, Some(raw)) => {
                let member = parse_member::<ExperienceLevel>(field, raw)?;
                self.experience_level.remove(&member);
            }
            (FilterField::ExperienceLevel, None) => self.experience_level.clear(),
            (FilterField::CompanySize, Some(raw)) => {
                self.company_size.remove(raw);
            }
            (FilterField::CompanySize, None) => self.company_size.clear(),
            (FilterField::Industry, Some(raw)) => {
                self.industry.remove(raw);
            }
            (FilterField::Industry, None) => self.industry.clear(),
            (FilterField::Benefits, Some(raw)) => {
                self.benefits.remove(raw);
            }
            (FilterField::Benefits, None) => self.benefits.clear(),
            (FilterField::Skills, Some(raw)) => {
                self.skills.retain(|skill| skill != raw);
            }
            (FilterField::Skills, None) => self.skills.clear(),
        }

        Ok(())
    }

    /// Resets every criterion to its cleared value.
    pub fn clear(&mut self) {
        *self = FilterSet::default();
    }

    /// Non-default criteria in a fixed field order, for UI feedback.
    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        let mut active = Vec::new();
        let mut push = |label: &str, value: String| {
            active.push(ActiveFilter {
                label: label.to_string(),
                value,
            });
        };

        if !self.keywords.trim().is_empty() {
            push("keywords", self.keywords.clone());
        }
        if !self.location.trim().is_empty() {
            push("location", self.location.clone());
        }
        if self.remote_only {
            push("remote_only", "yes".into());
        }
        if self.radius > 0 {
            push("radius", self.radius.to_string());
        }
        if !self.job_type.is_empty() {
            push("job_type", join_members(self.job_type.iter().map(AsRef::as_ref)));
        }
        if !self.experience_level.is_empty() {
            push(
                "experience_level",
                join_members(self.experience_level.iter().map(AsRef::as_ref)),
            );
        }
        if self.salary_min > 0 || self.salary_max < MAX_SALARY {
            push("salary_range", format!("{}-{}", self.salary_min, self.salary_max));
        }
        if self.date_posted != DatePosted::Any {
            push("date_posted", self.date_posted.as_ref().to_string());
        }
        if !self.company_size.is_empty() {
            push("company_size", join_members(self.company_size.iter().map(String::as_str)));
        }
        if !self.industry.is_empty() {
            push("industry", join_members(self.industry.iter().map(String::as_str)));
        }
        if !self.benefits.is_empty() {
            push("benefits", join_members(self.benefits.iter().map(String::as_str)));
        }
        if !self.skills.is_empty() {
            push("skills", join_members(self.skills.iter().map(String::as_str)));
        }

        active
    }

    /// Stable, order-independent serialization used as the cache key
    /// component. Set-valued fields are sorted first so member order
    /// never changes the key; `skills` display order is ignored here.
    /// Free-text components have the delimiter characters escaped, so
    /// distinct filter sets never collapse onto one key.
    pub fn serialize_key(&self) -> String {
        let mut skills: Vec<String> =
            self.skills.iter().map(|skill| escape_component(skill)).collect();
        skills.sort_unstable();

        format!(
            "kw={}|loc={}|remote={}|radius={}|type={}|exp={}|salary={}-{}|date={}|size={}|industry={}|benefits={}|skills={}",
            escape_component(&self.keywords),
            escape_component(&self.location),
            self.remote_only,
            self.radius,
            join_members(self.job_type.iter().map(AsRef::as_ref)),
            join_members(self.experience_level.iter().map(AsRef::as_ref)),
            self.salary_min,
            self.salary_max,
            self.date_posted.as_ref(),
            join_members(self.company_size.iter().map(String::as_str)),
            join_members(self.industry.iter().map(String::as_str)),
            join_members(self.benefits.iter().map(String::as_str)),
            skills.join(","),
        )
    }
}

fn toggle_text_member(set: &mut BTreeSet<String>, raw: &str) {
    if !set.remove(raw) {
        set.insert(raw.to_string());
    }
}

/// Backslash-escapes the key delimiters (`|`, `=`, `,`) and the escape
/// character itself inside a free-text key component.
fn escape_component(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '|' | '=' | ',') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn join_members<'a>(members: impl Iterator<Item = &'a str>) -> String {
    members
        .map(escape_component)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salary_bounds_are_clamped_not_rejected() {
        let mut filters = FilterSet::default();
        filters.set_salary_range(50_000, MAX_SALARY + 1).unwrap();

        assert_eq!(filters.salary_min, 50_000);
        assert_eq!(filters.salary_max, MAX_SALARY);
    }

    #[test]
    fn inverted_salary_range_is_rejected_without_partial_application() {
        let mut filters = FilterSet::default();
        filters.set_salary_range(40_000, 90_000).unwrap();

        let result = filters.set_salary_range(120_000, 60_000);

        assert!(matches!(result, Err(SearchError::Validation(_))));
        assert_eq!(filters.salary_min, 40_000);
        assert_eq!(filters.salary_max, 90_000);
    }

    #[test]
    fn skills_preserve_insertion_order_and_reject_duplicates() {
        let mut filters = FilterSet::default();
        filters.add_skill("Rust");
        filters.add_skill("Postgres");
        filters.add_skill("Rust");

        assert_eq!(filters.skills, vec!["Rust", "Postgres"]);
    }

    #[test]
    fn skill_uniqueness_is_case_sensitive() {
        let mut filters = FilterSet::default();
        filters.add_skill("rust");
        filters.add_skill("Rust");

        assert_eq!(filters.skills, vec!["rust", "Rust"]);
    }

    #[test]
    fn toggle_inserts_then_removes_members() {
        let mut filters = FilterSet::default();
        filters
            .toggle_set_member(FilterField::JobType, "full_time")
            .unwrap();
        assert!(filters.job_type.contains(&JobType::FullTime));

        filters
            .toggle_set_member(FilterField::JobType, "full_time")
            .unwrap();
        assert!(filters.job_type.is_empty());
    }

    #[test]
    fn toggle_rejects_scalar_fields_and_unknown_members() {
        let mut filters = FilterSet::default();

        assert!(matches!(
            filters.toggle_set_member(FilterField::Keywords, "rust"),
            Err(SearchError::Validation(_))
        ));
        assert!(matches!(
            filters.toggle_set_member(FilterField::JobType, "gig"),
            Err(SearchError::Validation(_))
        ));
    }

    #[test]
    fn set_rejects_type_mismatches() {
        let mut filters = FilterSet::default();
        let result = filters.set(FilterField::RemoteOnly, FilterValue::Text("yes".into()));

        assert!(matches!(result, Err(SearchError::Validation(_))));
        assert!(!filters.remote_only);
    }

    #[test]
    fn serialize_key_is_member_order_independent() {
        let mut first = FilterSet::default();
        first.add_skill("rust");
        first.add_skill("aws");
        first.set(FilterField::JobType, FilterValue::Text("contract".into())).unwrap();
        first.set(FilterField::JobType, FilterValue::Text("full_time".into())).unwrap();

        let mut second = FilterSet::default();
        second.add_skill("aws");
        second.add_skill("rust");
        second.set(FilterField::JobType, FilterValue::Text("full_time".into())).unwrap();
        second.set(FilterField::JobType, FilterValue::Text("contract".into())).unwrap();

        assert_eq!(first.serialize_key(), second.serialize_key());
    }

    #[test]
    fn serialize_key_escapes_delimiters_in_free_text() {
        let mut first = FilterSet::default();
        first.keywords = "a|loc=b".into();

        let mut second = FilterSet::default();
        second.keywords = "a".into();
        second.location = "b|loc=".into();

        assert_ne!(first.serialize_key(), second.serialize_key());

        // Member text containing the join character must not read as
        // two members.
        let mut third = FilterSet::default();
        third.add_skill("c,d");

        let mut fourth = FilterSet::default();
        fourth.add_skill("c");
        fourth.add_skill("d");

        assert_ne!(third.serialize_key(), fourth.serialize_key());
    }

    #[test]
    fn remove_resets_scalars_and_drops_members() {
        let mut filters = FilterSet::default();
        filters.keywords = "rust developer".into();
        filters.set_salary_range(80_000, 150_000).unwrap();
        filters.add_skill("rust");
        filters.add_skill("sql");

        filters.remove(FilterField::Keywords, None).unwrap();
        filters.remove(FilterField::SalaryRange, None).unwrap();
        filters.remove(FilterField::Skills, Some("rust")).unwrap();

        assert!(filters.keywords.is_empty());
        assert_eq!(filters.salary_max, MAX_SALARY);
        assert_eq!(filters.skills, vec!["sql"]);
    }

    #[test]
    fn active_filters_keep_fixed_field_order() {
        let mut filters = FilterSet::default();
        filters.add_skill("rust");
        filters.keywords = "engineer".into();
        filters.remote_only = true;

        let labels: Vec<_> = filters
            .active_filters()
            .into_iter()
            .map(|filter| filter.label)
            .collect();

        assert_eq!(labels, vec!["keywords", "remote_only", "skills"]);
    }

    #[test]
    fn cleared_filter_set_reports_nothing_active() {
        let mut filters = FilterSet::default();
        filters.keywords = "rust".into();
        filters.clear();

        assert!(filters.active_filters().is_empty());
        assert_eq!(filters, FilterSet::default());
    }
}
