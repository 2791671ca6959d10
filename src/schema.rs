use crate::calendar::{validate_week, week_lock, MonthKey, WEEKS_PER_MONTH};
use crate::error::{ReportingError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// One transactional row as delivered by the analytics endpoint. A single row can
/// describe an inquiry, a quotation and a registration at the same time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    #[serde(default)]
    pub bd_name: Option<String>,

    #[serde(default)]
    pub client_name: Option<String>,

    #[serde(default)]
    pub client_code: Option<String>,

    #[serde(default)]
    pub vertical: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    #[schemars(
        with = "Option<NaiveDate>",
        description = "Inquiry date, YYYY-MM-DD or an RFC 3339 timestamp"
    )]
    pub inq_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Quotation number, the natural key of a quotation")]
    pub quot_no: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    #[schemars(with = "Option<NaiveDate>")]
    pub quot_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Quotation value after discount")]
    pub quot_val_after_dis: Option<f64>,

    #[serde(default)]
    pub quot_status: Option<String>,

    #[serde(default)]
    #[schemars(description = "Registration number, the natural key of a registration")]
    pub regis_no: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    #[schemars(with = "Option<NaiveDate>")]
    pub regis_date: Option<NaiveDate>,

    #[serde(default)]
    pub regis_val: Option<f64>,
}

impl AnalyticsRecord {
    /// Date and value of the registration carried by this row, if it carries one.
    pub fn registration(&self) -> Option<(NaiveDate, f64)> {
        match (self.regis_date, self.regis_val) {
            (Some(date), Some(value)) if value.is_finite() => Some((date, value)),
            _ => None,
        }
    }

    /// Key used to count a registration once. Rows without a registration
    /// number are only distinct by their position, so callers get `None`.
    pub fn registration_key(&self) -> Option<&str> {
        non_blank(self.regis_no.as_deref())
    }

    pub fn quotation_key(&self) -> Option<&str> {
        non_blank(self.quot_no.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp; the UTC calendar date is kept.
pub fn parse_flexible_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

fn deserialize_flexible_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_flexible_date(text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", text))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekSlot {
    #[serde(default)]
    pub value: Option<f64>,

    #[serde(default)]
    pub date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub remarks: Option<String>,
}

impl WeekSlot {
    /// Projected amount for totals: missing, negative or non-finite values count as 0.
    pub fn amount(&self) -> f64 {
        match self.value {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => 0.0,
        }
    }
}

/// A BD's weekly forecast for one client in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyProjection {
    #[serde(default)]
    pub id: Option<String>,

    pub bd_code: String,

    pub client_code: String,

    #[serde(default)]
    pub client_name: Option<String>,

    #[schemars(range(min = 1, max = 12))]
    pub month: u32,

    pub year: i32,

    #[serde(default)]
    #[schemars(description = "Positional week slots: week 1 covers days 1-7, week 5 covers 29-31")]
    pub weeks: [WeekSlot; WEEKS_PER_MONTH],
}

impl WeeklyProjection {
    pub fn month_key(&self) -> Result<MonthKey> {
        MonthKey::new(self.year, self.month)
    }

    /// Slot for `week` (1..=5).
    pub fn slot(&self, week: u8) -> Option<&WeekSlot> {
        (week as usize)
            .checked_sub(1)
            .and_then(|idx| self.weeks.get(idx))
    }

    pub fn total(&self) -> f64 {
        self.weeks.iter().map(WeekSlot::amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default)]
    pub id: Option<String>,

    pub bd_code: String,

    #[schemars(range(min = 1, max = 12))]
    pub month: u32,

    pub year: i32,

    pub value: f64,
}

/// Which months a report covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum TimeRangeSpec {
    /// The current month plus `months_back` full months before it.
    Relative {
        #[serde(rename = "monthsBack")]
        months_back: u32,
    },

    /// One full calendar month, e.g. "March 2025".
    Month { label: String },

    /// Two full months compared against each other, in any order.
    Comparison {
        #[serde(rename = "labelA")]
        label_a: String,
        #[serde(rename = "labelB")]
        label_b: String,
    },
}

impl TimeRangeSpec {
    pub fn is_comparison(&self) -> bool {
        matches!(self, TimeRangeSpec::Comparison { .. })
    }
}

/// One entity's totals for one period, as returned by the per-period summary fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawPeriodRow {
    pub entity: String,

    #[serde(default)]
    pub registrations: u64,

    #[serde(default)]
    pub regis_value: f64,

    #[serde(default)]
    #[schemars(description = "Serialized per-vertical breakdown: 'Name: N regs/Value, ...'")]
    pub vertical_summary: Option<String>,

    #[serde(default)]
    #[schemars(description = "Serialized per-client breakdown: 'Name: N regs/Value, ...'")]
    pub client_summary: Option<String>,

    #[serde(default)]
    pub month: Option<u32>,

    #[serde(default)]
    pub year: Option<i32>,
}

impl RawPeriodRow {
    /// The period this row is stamped with, when it carries a valid one.
    pub fn period(&self) -> Option<MonthKey> {
        match (self.year, self.month) {
            (Some(year), Some(month)) => MonthKey::new(year, month).ok(),
            _ => None,
        }
    }
}

/// The BD a report is computed for. Passed explicitly to every computation that
/// is scoped to one BD.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BdContext {
    pub bd_code: String,
    pub bd_name: String,
}

impl BdContext {
    pub fn new(bd_code: impl Into<String>, bd_name: impl Into<String>) -> Self {
        Self {
            bd_code: bd_code.into(),
            bd_name: bd_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum EditAction {
    Create,
    Update,
    Delete,
}

impl EditAction {
    fn verb(&self) -> &'static str {
        match self {
            EditAction::Create => "create",
            EditAction::Update => "update",
            EditAction::Delete => "delete",
        }
    }
}

/// A pending change to one week of a projection, checked before it is handed
/// to the persistence API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionEdit {
    pub action: EditAction,

    #[serde(default)]
    pub id: Option<String>,

    pub client_code: String,

    pub month: u32,

    pub year: i32,

    pub week: u8,

    #[serde(default)]
    pub value: Option<f64>,

    #[serde(default)]
    pub remarks: Option<String>,
}

impl ProjectionEdit {
    /// The id of the projection being mutated. Updates and deletes without one
    /// would hit the wrong record, so they fail here.
    pub fn require_id(&self) -> Result<&str> {
        non_blank(self.id.as_deref()).ok_or_else(|| ReportingError::MissingProjectionId {
            client_code: self.client_code.clone(),
            action: self.action.verb(),
        })
    }

    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        validate_week(self.week)?;

        if self.action != EditAction::Create {
            self.require_id()?;
        }
        if self.action == EditAction::Delete {
            return Ok(());
        }

        let lock = week_lock(self.month, self.year, self.week, today)?;
        let touches_value = self.value.is_some();
        let touches_remarks = self.remarks.is_some();

        if (touches_value && !lock.value_editable()) || (touches_remarks && !lock.remarks_editable())
        {
            return Err(ReportingError::WeekLocked {
                week: self.week,
                month: self.month,
                year: self.year,
            });
        }

        Ok(())
    }
}

/// Everything the fetch layer hands to the engine for one screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportingInput {
    #[serde(default)]
    pub records: Vec<AnalyticsRecord>,

    #[serde(default)]
    pub projections: Vec<WeeklyProjection>,

    #[serde(default)]
    pub targets: Vec<Target>,
}

impl ReportingInput {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportingInput)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
